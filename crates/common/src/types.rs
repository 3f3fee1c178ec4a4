//! Core value types: rationals, output modes, and format descriptions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rational number used for stream time bases and frame rates
/// (e.g., 1/50 for a 50Hz time base, 30000/1001 for 29.97fps).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    pub num: u32,
    pub den: u32,
}

impl Rational {
    /// The microsecond time base used as the seek reference (1/1_000_000).
    pub const MICROSECONDS: Self = Self {
        num: 1,
        den: 1_000_000,
    };

    pub fn new(num: u32, den: u32) -> Self {
        assert!(den > 0, "Rational denominator must be > 0");
        Self { num, den }
    }

    pub fn as_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Ticks per second for a time base of `num/den` seconds per tick.
    pub fn ticks_per_second(self) -> f64 {
        self.den as f64 / self.num as f64
    }

    /// Rescale a timestamp expressed in `from` units into `to` units,
    /// rounding toward zero.
    pub fn rescale(ts: i64, from: Rational, to: Rational) -> i64 {
        let n = ts as i128 * from.num as i128 * to.den as i128;
        let d = from.den as i128 * to.num as i128;
        (n / d) as i64
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Scan mode of the output format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoMode {
    /// One full frame per tick.
    Progressive,
    /// Two sub-fields per tick, upper (even rows) first.
    InterlacedUpper,
    /// Two sub-fields per tick, lower (odd rows) first.
    InterlacedLower,
}

impl VideoMode {
    pub fn is_interlaced(self) -> bool {
        !matches!(self, VideoMode::Progressive)
    }

    /// Number of tween sub-ticks consumed per output tick.
    pub fn sub_ticks(self) -> u32 {
        if self.is_interlaced() {
            2
        } else {
            1
        }
    }
}

/// Description of the mixer's output format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoFormatDesc {
    pub width: u32,
    pub height: u32,
    pub mode: VideoMode,
    /// Seconds per output tick.
    pub interval: f64,
    /// Audio frames produced per tick, per channel.
    pub samples_per_tick: usize,
}

impl VideoFormatDesc {
    /// 720x576 interlaced 25Hz, 48kHz audio.
    pub const PAL: Self = Self {
        width: 720,
        height: 576,
        mode: VideoMode::InterlacedUpper,
        interval: 1.0 / 25.0,
        samples_per_tick: 1920,
    };

    /// 1920x1080 progressive 50Hz, 48kHz audio.
    pub const HD_1080P50: Self = Self {
        width: 1920,
        height: 1080,
        mode: VideoMode::Progressive,
        interval: 1.0 / 50.0,
        samples_per_tick: 960,
    };

    pub fn new(width: u32, height: u32, mode: VideoMode, interval: f64) -> Self {
        let samples_per_tick = (48_000.0 * interval).round() as usize;
        Self {
            width,
            height,
            mode,
            interval,
            samples_per_tick,
        }
    }
}

impl fmt::Display for VideoFormatDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            VideoMode::Progressive => "p",
            VideoMode::InterlacedUpper | VideoMode::InterlacedLower => "i",
        };
        write!(
            f,
            "{}x{}{}{}",
            self.width,
            self.height,
            mode,
            (1.0 / self.interval).round()
        )
    }
}

/// Pixel layout of a frame buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Bgra,
    Rgba,
    Gray,
}

impl PixelFormat {
    /// Bytes per pixel for a single-plane layout of this format.
    pub fn channels(self) -> u32 {
        match self {
            PixelFormat::Bgra | PixelFormat::Rgba => 4,
            PixelFormat::Gray => 1,
        }
    }
}

/// One plane of a planar (or packed) frame buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaneDesc {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl PlaneDesc {
    pub fn new(width: u32, height: u32, channels: u32) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    /// Row stride in bytes.
    pub fn linesize(self) -> usize {
        self.width as usize * self.channels as usize
    }

    /// Total byte size of the plane.
    pub fn byte_size(self) -> usize {
        self.linesize() * self.height as usize
    }
}

/// Full description of a frame buffer's geometry and pixel layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelFormatDesc {
    pub format: PixelFormat,
    pub planes: Vec<PlaneDesc>,
}

impl PixelFormatDesc {
    /// Single-plane RGBA frame of the given geometry.
    pub fn rgba(width: u32, height: u32) -> Self {
        Self {
            format: PixelFormat::Rgba,
            planes: vec![PlaneDesc::new(width, height, 4)],
        }
    }

    /// Single-plane BGRA frame of the given geometry.
    pub fn bgra(width: u32, height: u32) -> Self {
        Self {
            format: PixelFormat::Bgra,
            planes: vec![PlaneDesc::new(width, height, 4)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rational_ticks_per_second() {
        assert!((Rational::new(1, 50).ticks_per_second() - 50.0).abs() < 1e-9);
        assert!((Rational::new(1001, 30000).ticks_per_second() - 29.97).abs() < 0.01);
    }

    #[test]
    fn rescale_microseconds_to_stream_base() {
        // 2 seconds in microseconds into a 1/90000 time base.
        let ts = Rational::rescale(2_000_000, Rational::MICROSECONDS, Rational::new(1, 90_000));
        assert_eq!(ts, 180_000);
    }

    #[test]
    fn rescale_zero_is_zero() {
        let ts = Rational::rescale(0, Rational::MICROSECONDS, Rational::new(1, 48_000));
        assert_eq!(ts, 0);
    }

    #[test]
    fn mode_sub_ticks() {
        assert_eq!(VideoMode::Progressive.sub_ticks(), 1);
        assert_eq!(VideoMode::InterlacedUpper.sub_ticks(), 2);
        assert_eq!(VideoMode::InterlacedLower.sub_ticks(), 2);
    }

    #[test]
    fn format_presets() {
        assert_eq!(VideoFormatDesc::PAL.samples_per_tick, 1920);
        assert!(VideoFormatDesc::PAL.mode.is_interlaced());
        assert_eq!(VideoFormatDesc::HD_1080P50.samples_per_tick, 960);
        assert_eq!(VideoFormatDesc::HD_1080P50.to_string(), "1920x1080p50");
    }

    #[test]
    fn plane_byte_size() {
        let plane = PlaneDesc::new(1920, 1080, 4);
        assert_eq!(plane.linesize(), 1920 * 4);
        assert_eq!(plane.byte_size(), 1920 * 1080 * 4);
    }
}
