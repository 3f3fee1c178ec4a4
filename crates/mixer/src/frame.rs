//! Layer frames — the unit of input to the mixer's per-tick passes.

use std::sync::Arc;

use pm_common::PixelFormatDesc;

/// Pixel and audio payload of a layer frame.
///
/// `planes` follows `desc.planes`; `audio` is interleaved stereo i16 at
/// the output sample rate.
#[derive(Clone, Debug)]
pub struct FrameData {
    pub desc: PixelFormatDesc,
    pub planes: Vec<Vec<u8>>,
    pub audio: Vec<i16>,
}

impl FrameData {
    /// Allocate zeroed planes for the given description.
    pub fn new(desc: PixelFormatDesc) -> Self {
        let planes = desc
            .planes
            .iter()
            .map(|plane| vec![0u8; plane.byte_size()])
            .collect();
        Self {
            desc,
            planes,
            audio: Vec::new(),
        }
    }

    pub fn plane(&self, index: usize) -> &[u8] {
        &self.planes[index]
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FrameKind {
    Normal,
    Empty,
    Eof,
}

/// A frame placed on a compositing layer, or one of the two sentinel
/// values producers use to signal "nothing this tick" (`empty`) and
/// "source exhausted" (`eof`). The mixer filters sentinels out before
/// compositing.
#[derive(Clone, Debug)]
pub struct LayerFrame {
    kind: FrameKind,
    data: Option<Arc<FrameData>>,
    layer: i32,
}

impl LayerFrame {
    pub fn new(data: Arc<FrameData>, layer: i32) -> Self {
        Self {
            kind: FrameKind::Normal,
            data: Some(data),
            layer,
        }
    }

    /// The "nothing this tick" sentinel.
    pub fn empty() -> Self {
        Self {
            kind: FrameKind::Empty,
            data: None,
            layer: 0,
        }
    }

    /// The "source exhausted" sentinel.
    pub fn eof() -> Self {
        Self {
            kind: FrameKind::Eof,
            data: None,
            layer: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind == FrameKind::Empty
    }

    pub fn is_eof(&self) -> bool {
        self.kind == FrameKind::Eof
    }

    pub fn layer(&self) -> i32 {
        self.layer
    }

    pub fn data(&self) -> Option<&Arc<FrameData>> {
        self.data.as_ref()
    }
}

/// A writable frame handed out by the mixer's allocation helpers.
/// Producers fill the planes and audio, then turn it into a
/// [`LayerFrame`] for a compositing layer.
pub struct WriteFrame {
    data: FrameData,
}

impl WriteFrame {
    pub fn new(desc: PixelFormatDesc) -> Self {
        Self {
            data: FrameData::new(desc),
        }
    }

    pub fn desc(&self) -> &PixelFormatDesc {
        &self.data.desc
    }

    pub fn plane_mut(&mut self, index: usize) -> &mut [u8] {
        &mut self.data.planes[index]
    }

    pub fn audio_mut(&mut self) -> &mut Vec<i16> {
        &mut self.data.audio
    }

    /// Freeze the frame and place it on a layer.
    pub fn into_frame(self, layer: i32) -> LayerFrame {
        LayerFrame::new(Arc::new(self.data), layer)
    }
}
