//! Layer transforms — composable image and audio modifications.
//!
//! Both transform types form a monoid under [`compose`](ImageTransform::compose)
//! (written `a * b`): the operation is associative with the default value
//! as identity, but not commutative — the left operand acts as the outer
//! (parent) transform.

use serde::{Deserialize, Serialize};
use std::ops::Mul;

/// Axis-aligned rectangle in normalized output coordinates
/// (0.0..1.0 on both axes).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// The full output surface.
    pub const UNIT: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersection of two rectangles; degenerate results have zero size.
    pub fn intersect(self, other: Rect) -> Rect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.width).min(other.x + other.width);
        let y1 = (self.y + self.height).min(other.y + other.height);
        Rect {
            x: x0,
            y: y0,
            width: (x1 - x0).max(0.0),
            height: (y1 - y0).max(0.0),
        }
    }

    pub fn is_degenerate(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self::UNIT
    }
}

/// Geometric and photometric parameters of an image layer.
///
/// `position` and `scale` place the layer within normalized output space:
/// the layer occupies the rectangle `(position, position + scale)`.
/// `clip` restricts drawing to a region of the output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageTransform {
    /// Blend opacity, 0.0 (transparent) to 1.0 (opaque).
    pub opacity: f64,
    /// Color gain multiplier.
    pub gain: f64,
    /// Layer origin in normalized output coordinates.
    pub position: [f64; 2],
    /// Layer extent as a fraction of the output surface.
    pub scale: [f64; 2],
    /// Clipping rectangle in normalized output coordinates.
    pub clip: Rect,
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            gain: 1.0,
            position: [0.0, 0.0],
            scale: [1.0, 1.0],
            clip: Rect::UNIT,
        }
    }
}

impl ImageTransform {
    /// Compose with an inner transform: `self` frames the coordinate
    /// space in which `inner` is interpreted.
    pub fn compose(&self, inner: &ImageTransform) -> ImageTransform {
        ImageTransform {
            opacity: self.opacity * inner.opacity,
            gain: self.gain * inner.gain,
            position: [
                self.position[0] + self.scale[0] * inner.position[0],
                self.position[1] + self.scale[1] * inner.position[1],
            ],
            scale: [
                self.scale[0] * inner.scale[0],
                self.scale[1] * inner.scale[1],
            ],
            clip: self.clip.intersect(self.map_rect(inner.clip)),
        }
    }

    /// Map a rectangle from `self`'s inner space into output space.
    fn map_rect(&self, r: Rect) -> Rect {
        Rect {
            x: self.position[0] + self.scale[0] * r.x,
            y: self.position[1] + self.scale[1] * r.y,
            width: self.scale[0] * r.width,
            height: self.scale[1] * r.height,
        }
    }
}

impl Mul for ImageTransform {
    type Output = ImageTransform;

    fn mul(self, rhs: ImageTransform) -> ImageTransform {
        self.compose(&rhs)
    }
}

/// Gain and stereo placement of an audio layer.
///
/// `pan` accumulates unbounded under composition and is clamped to
/// [-1.0, 1.0] only when applied by the audio mixer, which keeps the
/// composition associative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioTransform {
    /// Linear gain multiplier.
    pub gain: f64,
    /// Stereo pan offset: -1.0 full left, 0.0 center, 1.0 full right.
    pub pan: f64,
}

impl Default for AudioTransform {
    fn default() -> Self {
        Self {
            gain: 1.0,
            pan: 0.0,
        }
    }
}

impl AudioTransform {
    pub fn compose(&self, inner: &AudioTransform) -> AudioTransform {
        AudioTransform {
            gain: self.gain * inner.gain,
            pan: self.pan + inner.pan,
        }
    }
}

impl Mul for AudioTransform {
    type Output = AudioTransform;

    fn mul(self, rhs: AudioTransform) -> AudioTransform {
        self.compose(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ImageTransform {
        ImageTransform {
            opacity: 0.5,
            gain: 2.0,
            position: [0.1, 0.2],
            scale: [0.5, 0.5],
            clip: Rect::new(0.0, 0.0, 0.8, 0.8),
        }
    }

    #[test]
    fn identity_composes_neutrally() {
        let t = sample();
        let id = ImageTransform::default();
        assert_eq!(id.compose(&t), t);
        assert_eq!(t.compose(&id), t);
    }

    #[test]
    fn composition_is_associative() {
        let a = sample();
        let b = ImageTransform {
            opacity: 0.8,
            gain: 1.5,
            position: [0.3, 0.0],
            scale: [2.0, 0.5],
            clip: Rect::new(0.1, 0.1, 0.9, 0.9),
        };
        let c = ImageTransform {
            opacity: 0.9,
            gain: 0.5,
            position: [-0.1, 0.4],
            scale: [0.25, 4.0],
            clip: Rect::new(0.0, 0.2, 1.0, 0.5),
        };
        let left = a.compose(&b).compose(&c);
        let right = a.compose(&b.compose(&c));
        assert!((left.opacity - right.opacity).abs() < 1e-12);
        assert!((left.position[0] - right.position[0]).abs() < 1e-12);
        assert!((left.position[1] - right.position[1]).abs() < 1e-12);
        assert!((left.scale[0] - right.scale[0]).abs() < 1e-12);
        assert!((left.clip.x - right.clip.x).abs() < 1e-12);
        assert!((left.clip.width - right.clip.width).abs() < 1e-12);
    }

    #[test]
    fn composition_is_not_commutative() {
        let a = sample();
        let b = ImageTransform {
            position: [0.5, 0.5],
            ..Default::default()
        };
        assert_ne!(a.compose(&b).position, b.compose(&a).position);
    }

    #[test]
    fn opacity_and_gain_multiply() {
        let a = sample();
        let composed = a.compose(&a);
        assert!((composed.opacity - 0.25).abs() < 1e-12);
        assert!((composed.gain - 4.0).abs() < 1e-12);
    }

    #[test]
    fn rect_intersection_clamps_to_overlap() {
        let a = Rect::new(0.0, 0.0, 0.5, 0.5);
        let b = Rect::new(0.25, 0.25, 0.5, 0.5);
        let i = a.intersect(b);
        assert!((i.x - 0.25).abs() < 1e-12);
        assert!((i.width - 0.25).abs() < 1e-12);
    }

    #[test]
    fn disjoint_rects_intersect_to_degenerate() {
        let a = Rect::new(0.0, 0.0, 0.2, 0.2);
        let b = Rect::new(0.5, 0.5, 0.2, 0.2);
        assert!(a.intersect(b).is_degenerate());
    }

    #[test]
    fn audio_pan_adds_unclamped() {
        let a = AudioTransform {
            gain: 1.0,
            pan: 0.8,
        };
        let b = AudioTransform {
            gain: 0.5,
            pan: 0.8,
        };
        let composed = a.compose(&b);
        assert!((composed.pan - 1.6).abs() < 1e-12);
        assert!((composed.gain - 0.5).abs() < 1e-12);
    }

    #[test]
    fn audio_composition_is_associative() {
        let a = AudioTransform {
            gain: 2.0,
            pan: 0.5,
        };
        let b = AudioTransform {
            gain: 0.25,
            pan: -1.5,
        };
        let c = AudioTransform {
            gain: 3.0,
            pan: 0.75,
        };
        let left = a.compose(&b).compose(&c);
        let right = a.compose(&b.compose(&c));
        assert!((left.gain - right.gain).abs() < 1e-12);
        assert!((left.pan - right.pan).abs() < 1e-12);
    }
}
