//! Soft-capacity packet queues and the back-pressure gate.
//!
//! Each queue is an unbounded channel: a push never blocks and never
//! fails. Boundedness comes from the pump's cooperative discipline — it
//! waits on the [`BackpressureGate`] while both queues sit above
//! [`PACKET_BUFFER_COUNT`], and every consumer pop rings the gate.

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use pm_common::Packet;

/// Soft capacity of each packet queue. The pump suspends once both
/// queues exceed this count.
pub const PACKET_BUFFER_COUNT: usize = 50;

/// FIFO queue of owned packets, safe for concurrent producers and
/// consumers (used 1:1 in practice).
pub struct PacketQueue {
    tx: Sender<Packet>,
    rx: Receiver<Packet>,
}

impl PacketQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Enqueue a packet. Never blocks; the soft capacity is enforced by
    /// the producer's gate wait, not here.
    pub fn push(&self, packet: Packet) {
        // The queue owns both channel ends, so the send cannot fail.
        let _ = self.tx.send(packet);
    }

    /// Dequeue the oldest packet, or `None` if the queue is empty.
    pub fn try_pop(&self) -> Option<Packet> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for PacketQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Condvar gate the pump parks on while its queues are saturated.
///
/// `notify_all` takes the internal lock before signalling, which closes
/// the window between a waiter's predicate check and its wait.
pub struct BackpressureGate {
    lock: Mutex<()>,
    cond: Condvar,
}

impl BackpressureGate {
    pub fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    /// Block while `pred` returns true. Re-evaluates after every
    /// notification.
    pub fn wait_while(&self, mut pred: impl FnMut() -> bool) {
        let mut guard = self.lock.lock();
        while pred() {
            self.cond.wait(&mut guard);
        }
    }

    /// Wake all waiters so they re-evaluate their predicates.
    pub fn notify_all(&self) {
        let _guard = self.lock.lock();
        self.cond.notify_all();
    }
}

impl Default for BackpressureGate {
    fn default() -> Self {
        Self::new()
    }
}
