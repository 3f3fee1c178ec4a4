//! Single-threaded task executor with a bounded input queue.
//!
//! Each pipeline subsystem owns exactly one `Executor`: work submitted to
//! it runs serialized on a dedicated worker thread, so the state owned by
//! that worker needs no locking. The input queue is a bounded crossbeam
//! channel — when it is full, [`spawn`](Executor::spawn) blocks the
//! caller, which is how back-pressure propagates upstream.
//!
//! Tasks receive `&mut S`, the worker-owned state. A task that needs to
//! re-enqueue follow-up work (the input pump's read loop) captures a
//! [`Spawner`] handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{bounded, Receiver, Sender};
use tracing::debug;

use crate::error::ExecError;

type Task<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// A serialized task runner owning state `S` on a dedicated worker thread.
pub struct Executor<S> {
    label: String,
    tx: Sender<Task<S>>,
    rx: Receiver<Task<S>>,
    running: Arc<AtomicBool>,
    capacity: usize,
    worker: Option<JoinHandle<()>>,
}

impl<S: Send + 'static> Executor<S> {
    /// Start a worker thread owning `state`, with a task queue holding at
    /// most `capacity` pending tasks.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(label: impl Into<String>, capacity: usize, state: S) -> Self {
        assert!(capacity > 0, "executor capacity must be > 0");
        let label = label.into();
        let (tx, rx) = bounded::<Task<S>>(capacity);
        let running = Arc::new(AtomicBool::new(true));

        let worker_rx = rx.clone();
        let worker_running = Arc::clone(&running);
        let worker = std::thread::Builder::new()
            .name(label.clone())
            .spawn(move || {
                let mut state = state;
                loop {
                    if !worker_running.load(Ordering::Acquire) {
                        break;
                    }
                    match worker_rx.recv() {
                        Ok(task) => {
                            if !worker_running.load(Ordering::Acquire) {
                                break;
                            }
                            task(&mut state);
                        }
                        Err(_) => break,
                    }
                }
            })
            .expect("spawn executor worker thread");

        debug!(label = %label, capacity, "Executor started");

        Self {
            label,
            tx,
            rx,
            running,
            capacity,
            worker: Some(worker),
        }
    }

    /// Enqueue a task, blocking while the input queue is full.
    pub fn spawn(&self, f: impl FnOnce(&mut S) + Send + 'static) -> Result<(), ExecError> {
        if !self.is_running() {
            return Err(ExecError::Stopped(self.label.clone()));
        }
        self.tx
            .send(Box::new(f))
            .map_err(|_| ExecError::Stopped(self.label.clone()))
    }

    /// Run a task on the worker and block until its result is available.
    ///
    /// Tasks submitted earlier are executed first (FIFO), so an `invoke`
    /// observes the effect of every previously spawned task. Must not be
    /// called from the worker thread itself.
    pub fn invoke<R: Send + 'static>(
        &self,
        f: impl FnOnce(&mut S) -> R + Send + 'static,
    ) -> Result<R, ExecError> {
        let (rtx, rrx) = bounded::<R>(1);
        self.spawn(move |state| {
            let _ = rtx.send(f(state));
        })?;
        rrx.recv().map_err(|_| ExecError::Stopped(self.label.clone()))
    }

    /// Handle for enqueueing work from inside tasks or other threads.
    pub fn spawner(&self) -> Spawner<S> {
        Spawner {
            label: self.label.clone(),
            tx: self.tx.clone(),
            running: Arc::clone(&self.running),
        }
    }

    /// Number of tasks waiting in the input queue.
    pub fn size(&self) -> usize {
        self.tx.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Drop all pending tasks without running them.
    pub fn clear(&self) {
        while self.rx.try_recv().is_ok() {}
    }

    /// Stop accepting work and wake the worker if it is idle. Does not
    /// join; pending tasks are dropped on [`stop`](Self::stop).
    pub fn halt(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            // Wake a recv-blocked worker; if the queue is full the worker
            // is busy and will observe the flag on its next iteration.
            let _ = self.tx.try_send(Box::new(|_| {}));
        }
    }

    /// Halt, drop pending tasks, and join the worker thread. The task in
    /// flight runs to completion.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.clear();
        // Wake a recv-blocked worker. Sent after the drain so the wake
        // cannot be swallowed by it.
        let _ = self.tx.try_send(Box::new(|_| {}));
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
            debug!(label = %self.label, "Executor stopped");
        }
    }
}

impl<S> Drop for Executor<S> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        while self.rx.try_recv().is_ok() {}
        let _ = self.tx.try_send(Box::new(|_| {}));
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Cloneable handle for submitting tasks to an [`Executor`].
pub struct Spawner<S> {
    label: String,
    tx: Sender<Task<S>>,
    running: Arc<AtomicBool>,
}

impl<S> Clone for Spawner<S> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            tx: self.tx.clone(),
            running: Arc::clone(&self.running),
        }
    }
}

impl<S: Send + 'static> Spawner<S> {
    /// Enqueue a task, blocking while the input queue is full.
    pub fn spawn(&self, f: impl FnOnce(&mut S) + Send + 'static) -> Result<(), ExecError> {
        if !self.is_running() {
            return Err(ExecError::Stopped(self.label.clone()));
        }
        self.tx
            .send(Box::new(f))
            .map_err(|_| ExecError::Stopped(self.label.clone()))
    }

    /// Stop the executor from within a task (or any thread) without
    /// joining it.
    pub fn halt(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            let _ = self.tx.try_send(Box::new(|_| {}));
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Number of tasks waiting in the input queue.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}
