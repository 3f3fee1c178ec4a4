//! CPU image mixer — composites transformed layer frames into one
//! output buffer per pass.
//!
//! A pass accumulates [`RenderItem`]s onto an RGBA canvas with standard
//! alpha-over blending. Interlaced pairs draw the same source twice with
//! different transforms, each restricted to its field's scan lines.

use std::sync::Arc;

use pm_common::{ImageTransform, VideoFormatDesc, VideoMode};

use crate::frame::FrameData;

/// A composited RGBA output buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Which scan lines of the canvas a draw is restricted to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Field {
    /// Even rows (0, 2, 4, ...).
    Upper,
    /// Odd rows (1, 3, 5, ...).
    Lower,
}

/// One submission to an image pass.
pub enum RenderItem {
    /// A frame drawn once with a single transform.
    Single {
        data: Arc<FrameData>,
        transform: ImageTransform,
    },
    /// The same frame drawn as two time-offset sub-fields. `first` is
    /// the temporally earlier transform; the mode decides which scan
    /// lines it lands on.
    InterlacedPair {
        data: Arc<FrameData>,
        first: ImageTransform,
        second: ImageTransform,
        mode: VideoMode,
    },
}

/// Stateless factory for image passes at the output geometry.
pub struct ImageMixer {
    format: VideoFormatDesc,
}

impl ImageMixer {
    pub fn new(format: VideoFormatDesc) -> Self {
        Self { format }
    }

    /// Open a pass over a fresh transparent canvas.
    pub fn begin_pass(&self) -> ImagePass {
        let size = self.format.width as usize * self.format.height as usize * 4;
        ImagePass {
            width: self.format.width,
            height: self.format.height,
            canvas: vec![0u8; size],
            accepted: 0,
        }
    }
}

/// An open compositing pass.
pub struct ImagePass {
    width: u32,
    height: u32,
    canvas: Vec<u8>,
    accepted: usize,
}

impl ImagePass {
    /// Composite one item onto the canvas. Items are blended in
    /// submission order (back to front).
    pub fn accept(&mut self, item: RenderItem) {
        self.accepted += 1;
        match item {
            RenderItem::Single { data, transform } => {
                self.draw(&data, &transform, None);
            }
            RenderItem::InterlacedPair {
                data,
                first,
                second,
                mode,
            } => {
                let (first_field, second_field) = match mode {
                    VideoMode::InterlacedLower => (Field::Lower, Field::Upper),
                    _ => (Field::Upper, Field::Lower),
                };
                self.draw(&data, &first, Some(first_field));
                self.draw(&data, &second, Some(second_field));
            }
        }
    }

    /// Number of items accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Close the pass. The result resolves to the composited buffer.
    pub fn end_pass(self) -> PendingImage {
        PendingImage {
            image: ImageBuffer {
                width: self.width,
                height: self.height,
                data: self.canvas,
            },
        }
    }

    fn draw(&mut self, data: &FrameData, transform: &ImageTransform, field: Option<Field>) {
        let Some(plane) = data.desc.planes.first() else {
            return;
        };
        if plane.channels != 4 || transform.opacity <= 0.0 {
            return;
        }
        let src = data.plane(0);
        let (src_w, src_h) = (plane.width as f64, plane.height as f64);
        if src_w <= 0.0 || src_h <= 0.0 {
            return;
        }

        let out_w = self.width as f64;
        let out_h = self.height as f64;

        // Destination rectangle in output pixels.
        let x0f = transform.position[0] * out_w;
        let y0f = transform.position[1] * out_h;
        let x1f = x0f + transform.scale[0] * out_w;
        let y1f = y0f + transform.scale[1] * out_h;
        if x1f <= x0f || y1f <= y0f {
            return;
        }

        // Drawable region: destination ∩ clip ∩ canvas.
        let clip = transform.clip;
        let rx0 = x0f.max(clip.x * out_w).max(0.0).floor() as i64;
        let ry0 = y0f.max(clip.y * out_h).max(0.0).floor() as i64;
        let rx1 = x1f
            .min((clip.x + clip.width) * out_w)
            .min(out_w)
            .ceil() as i64;
        let ry1 = y1f
            .min((clip.y + clip.height) * out_h)
            .min(out_h)
            .ceil() as i64;

        let gain = transform.gain.max(0.0);
        let opacity = transform.opacity.min(1.0);

        for y in ry0..ry1 {
            if let Some(field) = field {
                let upper_row = y % 2 == 0;
                if (field == Field::Upper) != upper_row {
                    continue;
                }
            }
            let v = (y as f64 + 0.5 - y0f) / (y1f - y0f);
            if !(0.0..1.0).contains(&v) {
                continue;
            }
            let sy = ((v * src_h) as usize).min(src_h as usize - 1);

            for x in rx0..rx1 {
                let u = (x as f64 + 0.5 - x0f) / (x1f - x0f);
                if !(0.0..1.0).contains(&u) {
                    continue;
                }
                let sx = ((u * src_w) as usize).min(src_w as usize - 1);

                let si = (sy * plane.width as usize + sx) * 4;
                let alpha = src[si + 3] as f64 / 255.0 * opacity;
                if alpha <= 0.0 {
                    continue;
                }
                let di = (y as usize * self.width as usize + x as usize) * 4;
                for c in 0..3 {
                    let src_c = (src[si + c] as f64 * gain).min(255.0);
                    let blended = src_c * alpha + self.canvas[di + c] as f64 * (1.0 - alpha);
                    self.canvas[di + c] = blended.round().min(255.0) as u8;
                }
                let blended_a = 255.0 * alpha + self.canvas[di + 3] as f64 * (1.0 - alpha);
                self.canvas[di + 3] = blended_a.round().min(255.0) as u8;
            }
        }
    }
}

/// Result of a closed pass; [`wait`](Self::wait) yields the buffer.
pub struct PendingImage {
    image: ImageBuffer,
}

impl PendingImage {
    pub fn wait(self) -> ImageBuffer {
        self.image
    }
}
