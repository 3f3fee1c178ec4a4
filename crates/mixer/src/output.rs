//! Output hub — fan-out of composited frames to subscribers.
//!
//! Replaces a signal/slot coupling with an explicit subscriber list:
//! [`connect`](OutputHub::connect) returns a [`Subscription`] whose drop
//! removes the slot. Emission is synchronous on the mixer worker, so
//! subscribers must hand frames off quickly rather than do long work
//! inline. A panicking subscriber is isolated and logged; it never tears
//! down the mixer.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::error;

use crate::image::ImageBuffer;

/// One composited output tick: an image buffer plus the matching
/// interleaved stereo PCM.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputFrame {
    pub image: ImageBuffer,
    pub audio: Vec<i16>,
}

type Slot = Box<dyn Fn(&Arc<OutputFrame>) + Send>;

#[derive(Default)]
struct Slots {
    next_id: u64,
    entries: Vec<(u64, Slot)>,
}

/// Subscriber registry shared between the mixer handle and its worker.
#[derive(Clone, Default)]
pub struct OutputHub {
    slots: Arc<Mutex<Slots>>,
}

impl OutputHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Dropping the returned handle removes it.
    pub fn connect(&self, subscriber: impl Fn(&Arc<OutputFrame>) + Send + 'static) -> Subscription {
        let mut slots = self.slots.lock();
        let id = slots.next_id;
        slots.next_id += 1;
        slots.entries.push((id, Box::new(subscriber)));
        Subscription {
            id,
            slots: Arc::downgrade(&self.slots),
        }
    }

    /// Deliver a frame to every live subscriber, in connection order.
    pub fn emit(&self, frame: &Arc<OutputFrame>) {
        let slots = self.slots.lock();
        for (id, slot) in &slots.entries {
            if catch_unwind(AssertUnwindSafe(|| slot(frame))).is_err() {
                error!(subscriber = id, "Output subscriber panicked");
            }
        }
    }

    /// Number of live subscribers.
    pub fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().entries.is_empty()
    }
}

/// RAII handle controlling subscription membership.
pub struct Subscription {
    id: u64,
    slots: Weak<Mutex<Slots>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(slots) = self.slots.upgrade() {
            slots.lock().entries.retain(|(id, _)| *id != self.id);
        }
    }
}
