//! `pm-common` — Shared types, transforms, and errors for the playmix
//! compositing core.
//!
//! This crate is the foundation that the other pipeline crates depend on.
//! It defines the core abstractions:
//!
//! - **Types**: `Rational`, `VideoMode`, `VideoFormatDesc`, `PixelFormatDesc`
//! - **Packets**: `Packet` (aligned buffer), `StreamKind`, `StreamDesc`
//! - **Transforms**: `ImageTransform`, `AudioTransform` (composable values)
//! - **Errors**: `DemuxError`, `InputError` (thiserror-based)
//! - **Config**: `InputConfig`, `MixerConfig`

pub mod config;
pub mod error;
pub mod packet;
pub mod transform;
pub mod types;

// Re-export commonly used items at crate root
pub use config::{join_label, InputConfig, MixerConfig};
pub use error::{DemuxError, InputError, InputResult};
pub use packet::{Packet, RawPacket, StreamDesc, StreamKind};
pub use transform::{AudioTransform, ImageTransform, Rect};
pub use types::{PixelFormat, PixelFormatDesc, PlaneDesc, Rational, VideoFormatDesc, VideoMode};
