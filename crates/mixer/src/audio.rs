//! CPU audio mixer — sums transformed layer audio into one PCM buffer
//! per pass.
//!
//! Output is interleaved stereo i16, `samples_per_tick` frames long.
//! Inputs accumulate into i32 and are clamped once at the end of the
//! pass, so transient overshoot between layers does not hard-clip.
//! Panning uses constant-power cos/sin gains, which keeps perceived
//! loudness stable as a source moves across the stereo field.

use pm_common::{AudioTransform, VideoFormatDesc};

use crate::frame::FrameData;

/// Stateless factory for audio passes at the output format.
pub struct AudioMixer {
    format: VideoFormatDesc,
}

impl AudioMixer {
    pub fn new(format: VideoFormatDesc) -> Self {
        Self { format }
    }

    /// Open a pass over a silent accumulator.
    pub fn begin_pass(&self) -> AudioPass {
        AudioPass {
            accum: vec![0i32; self.format.samples_per_tick * 2],
        }
    }
}

/// An open mixing pass.
pub struct AudioPass {
    accum: Vec<i32>,
}

impl AudioPass {
    /// Mix one frame's audio into the accumulator under a transform.
    ///
    /// The frame's samples are interleaved stereo; shorter inputs are
    /// zero-padded, longer ones truncated at the tick boundary.
    pub fn accept(&mut self, data: &FrameData, transform: &AudioTransform) {
        let (gain_left, gain_right) = pan_gains(transform);
        if gain_left == 0.0 && gain_right == 0.0 {
            return;
        }
        let out_frames = self.accum.len() / 2;
        let in_frames = data.audio.len() / 2;
        for i in 0..out_frames.min(in_frames) {
            let left = data.audio[i * 2] as f64;
            let right = data.audio[i * 2 + 1] as f64;
            self.accum[i * 2] += (left * gain_left).round() as i32;
            self.accum[i * 2 + 1] += (right * gain_right).round() as i32;
        }
    }

    /// Close the pass, clamping the accumulated mix to i16 range.
    pub fn end_pass(self) -> Vec<i16> {
        self.accum
            .into_iter()
            .map(|s| s.clamp(i16::MIN as i32, i16::MAX as i32) as i16)
            .collect()
    }
}

/// Left/right gains for a transform: constant-power pan scaled by gain.
/// Pan accumulates unbounded under composition and is clamped here.
fn pan_gains(transform: &AudioTransform) -> (f64, f64) {
    let pan = transform.pan.clamp(-1.0, 1.0);
    let theta = (pan + 1.0) * std::f64::consts::FRAC_PI_4;
    let gain = transform.gain.max(0.0);
    (theta.cos() * gain, theta.sin() * gain)
}
