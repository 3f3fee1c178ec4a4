//! Demuxed media packets and stream descriptors.

use serde::{Deserialize, Serialize};
use std::alloc::{self, Layout};
use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;

use crate::types::Rational;

/// Kind of an elementary stream within a container.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    Video,
    Audio,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Video => write!(f, "video"),
            StreamKind::Audio => write!(f, "audio"),
        }
    }
}

/// Stream metadata exposed by the demux collaborator during probing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDesc {
    /// Stream index within the container (stable demux order).
    pub index: usize,
    pub kind: StreamKind,
    /// Seconds per timestamp unit, as reported by the container.
    pub time_base: Rational,
}

/// One compressed packet as read from the demux layer, tagged with the
/// stream it belongs to. The pump copies the payload into an aligned
/// [`Packet`] before queueing.
#[derive(Clone, Debug)]
pub struct RawPacket {
    pub data: Vec<u8>,
    pub stream_index: usize,
}

/// An owned, immutable packet buffer with 32-byte-aligned storage.
///
/// The alignment satisfies the SIMD requirements of downstream codec
/// bindings. Packets are move-only: the queues transfer unique ownership
/// on pop, so no reference counting is involved.
///
/// A zero-length packet doubles as the "queue was empty" sentinel
/// returned by the input pump's non-blocking getters.
pub struct Packet {
    ptr: Option<NonNull<u8>>,
    len: usize,
}

impl Packet {
    /// Storage alignment in bytes.
    pub const ALIGNMENT: usize = 32;

    /// The empty sentinel packet.
    pub fn empty() -> Self {
        Self { ptr: None, len: 0 }
    }

    /// Allocate an aligned packet holding a copy of `data`.
    pub fn copy_from(data: &[u8]) -> Self {
        if data.is_empty() {
            return Self::empty();
        }
        let layout = Layout::from_size_align(data.len(), Self::ALIGNMENT)
            .expect("packet layout within address space");
        // SAFETY: layout has non-zero size; the allocation is owned
        // exclusively by this Packet and freed with the same layout.
        unsafe {
            let raw = alloc::alloc(layout);
            let Some(ptr) = NonNull::new(raw) else {
                alloc::handle_alloc_error(layout);
            };
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr(), data.len());
            Self {
                ptr: Some(ptr),
                len: data.len(),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        match self.ptr {
            // SAFETY: ptr covers len initialized bytes owned by self.
            Some(ptr) => unsafe { std::slice::from_raw_parts(ptr.as_ptr(), self.len) },
            None => &[],
        }
    }
}

impl Drop for Packet {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr {
            let layout = Layout::from_size_align(self.len, Self::ALIGNMENT)
                .expect("packet layout within address space");
            // SAFETY: allocated in copy_from with this exact layout.
            unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
        }
    }
}

impl Deref for Packet {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet").field("len", &self.len).finish()
    }
}

// SAFETY: Packet exclusively owns its allocation and exposes only
// immutable access, so transferring or sharing it across threads is sound.
unsafe impl Send for Packet {}
unsafe impl Sync for Packet {}
