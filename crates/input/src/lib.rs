//! `pm-input` — Demux input stage for the playmix compositing core.
//!
//! Turns a media container into two back-pressured packet queues:
//!
//! - **Traits**: [`Demuxer`] — the contract consumed from the container
//!   layer (probe, per-packet read, seek)
//! - **Queues**: [`PacketQueue`] + [`BackpressureGate`] — soft-capacity
//!   FIFO buffers with consumer-driven producer throttling
//! - **Pump**: [`InputPump`] — owns the demuxer, loops the source,
//!   exposes non-blocking per-kind packet getters

pub mod pump;
pub mod queue;
pub mod traits;

pub use pump::InputPump;
pub use queue::{BackpressureGate, PacketQueue, PACKET_BUFFER_COUNT};
pub use traits::Demuxer;
