//! `pm-mixer` — Frame compositing stage of the playmix pipeline.
//!
//! On every tick the [`MixerDevice`] pulls a batch of layer frames,
//! advances the transforms touched this tick, runs an image pass and an
//! audio pass, and broadcasts one [`OutputFrame`] to subscribers:
//!
//! - **Frames**: [`LayerFrame`] with empty/eof sentinels, [`WriteFrame`]
//!   allocation helpers
//! - **Passes**: [`ImageMixer`] / [`AudioMixer`] reference CPU mixers
//! - **Output**: [`OutputHub`] subscriber fan-out with RAII handles
//! - **Device**: [`MixerDevice`] — per-tick protocol, tweened transform
//!   tables, executor-serialized mutation API

pub mod audio;
pub mod device;
pub mod frame;
pub mod image;
pub mod output;

pub use audio::{AudioMixer, AudioPass};
pub use device::MixerDevice;
pub use frame::{FrameData, LayerFrame, WriteFrame};
pub use image::{ImageBuffer, ImageMixer, ImagePass, PendingImage, RenderItem};
pub use output::{OutputFrame, OutputHub, Subscription};
