//! Configuration structs for the input pump and mixer device.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::VideoFormatDesc;

/// Input pump configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// Path of the media container to open.
    pub filename: PathBuf,
    /// Restart from the beginning on end-of-stream.
    pub looping: bool,
    /// Label of the owning channel, prepended to log output.
    pub parent_label: String,
}

impl InputConfig {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            looping: false,
            parent_label: String::new(),
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn parent_label(mut self, label: impl Into<String>) -> Self {
        self.parent_label = label.into();
        self
    }
}

/// Mixer device configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MixerConfig {
    /// Output video format.
    pub format: VideoFormatDesc,
    /// Label of the owning channel, prepended to log output.
    pub parent_label: String,
}

impl MixerConfig {
    pub fn new(format: VideoFormatDesc) -> Self {
        Self {
            format,
            parent_label: String::new(),
        }
    }

    pub fn parent_label(mut self, label: impl Into<String>) -> Self {
        self.parent_label = label.into();
        self
    }
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self::new(VideoFormatDesc::HD_1080P50)
    }
}

/// Join a parent label and a component name ("channel-1" + "input" →
/// "channel-1/input").
pub fn join_label(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}
