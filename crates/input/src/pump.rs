//! Input pump — demultiplexes a media container into bounded packet
//! queues at a rate governed by downstream consumption.
//!
//! The pump owns its demuxer and drives it from a dedicated executor
//! worker, one packet per iteration. Video and audio packets are routed
//! into separate queues; anything else is dropped. At end-of-stream the
//! pump either rewinds the source (when looping) or halts its executor.
//! Between iterations it parks on the back-pressure gate while both
//! queues sit above the soft capacity, and every consumer pop rings the
//! gate.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use pm_common::{
    join_label, DemuxError, InputConfig, InputError, InputResult, Packet, Rational, StreamDesc,
    StreamKind,
};
use pm_diag::{Color, Graph};
use pm_exec::{Executor, Spawner};

use crate::queue::{BackpressureGate, PacketQueue, PACKET_BUFFER_COUNT};
use crate::traits::Demuxer;

/// Capacity of the pump's executor task queue. One pending iteration is
/// enough; the extra headroom absorbs control tasks.
const PUMP_QUEUE_CAPACITY: usize = 4;

/// State owned by the pump's worker thread. Only pump iterations touch
/// the demuxer after construction, so it needs no locking.
struct PumpState {
    demuxer: Box<dyn Demuxer>,
}

/// State shared between the worker, the consumer-facing getters, and the
/// pump handle.
struct PumpShared {
    label: String,
    graph: Graph,
    looping: bool,
    video_index: Option<usize>,
    audio_index: Option<usize>,
    /// Reference stream for rescaling seek targets (video if open,
    /// otherwise audio).
    seek_ref: Option<StreamDesc>,
    video_queue: PacketQueue,
    audio_queue: PacketQueue,
    gate: BackpressureGate,
}

/// Demultiplexes one media source into per-kind packet queues.
pub struct InputPump {
    label: String,
    shared: Arc<PumpShared>,
    executor: Executor<PumpState>,
    video_stream: Option<StreamDesc>,
    audio_stream: Option<StreamDesc>,
    stopped: bool,
}

impl std::fmt::Debug for InputPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputPump")
            .field("label", &self.label)
            .field("video_stream", &self.video_stream)
            .field("audio_stream", &self.audio_stream)
            .field("stopped", &self.stopped)
            .finish()
    }
}

impl InputPump {
    /// Open a container through `open` and start pumping it.
    ///
    /// A failure to open surfaces as [`InputError::OpenFailed`] with the
    /// filename attached.
    pub fn open<F>(config: InputConfig, graph: Graph, open: F) -> InputResult<Self>
    where
        F: FnOnce(&Path) -> Result<Box<dyn Demuxer>, DemuxError>,
    {
        let demuxer = open(&config.filename).map_err(|source| InputError::OpenFailed {
            path: config.filename.display().to_string(),
            source,
        })?;
        Self::new(demuxer, config, graph)
    }

    /// Start pumping an already opened demuxer.
    pub fn new(
        mut demuxer: Box<dyn Demuxer>,
        config: InputConfig,
        graph: Graph,
    ) -> InputResult<Self> {
        let label = join_label(&config.parent_label, "input");
        graph.set_color("input-buffer", Color::new(1.0, 1.0, 0.0));
        graph.set_color("seek", Color::new(0.5, 1.0, 0.5));

        let path = config.filename.display().to_string();
        let streams: Vec<StreamDesc> = demuxer.streams().to_vec();
        if streams.is_empty() {
            return Err(InputError::StreamInfoFailed { path });
        }

        let video_stream = open_stream(demuxer.as_mut(), &streams, StreamKind::Video, &label);
        let audio_stream = open_stream(demuxer.as_mut(), &streams, StreamKind::Audio, &label);
        if video_stream.is_none() && audio_stream.is_none() {
            return Err(InputError::NoUsableStream { path });
        }

        let shared = Arc::new(PumpShared {
            label: label.clone(),
            graph,
            looping: config.looping,
            video_index: video_stream.map(|s| s.index),
            audio_index: audio_stream.map(|s| s.index),
            seek_ref: video_stream.or(audio_stream),
            video_queue: PacketQueue::new(),
            audio_queue: PacketQueue::new(),
            gate: BackpressureGate::new(),
        });

        let executor = Executor::new(label.clone(), PUMP_QUEUE_CAPACITY, PumpState { demuxer });
        let first_shared = Arc::clone(&shared);
        let first_spawner = executor.spawner();
        executor
            .spawn(move |state| pump_iteration(state, &first_shared, &first_spawner))
            .expect("executor just started");

        info!(label = %label, file = %path, "Started");

        Ok(Self {
            label,
            shared,
            executor,
            video_stream,
            audio_stream,
            stopped: false,
        })
    }

    /// Pop the next video packet, or the empty sentinel if none is
    /// buffered. Rings the back-pressure gate so a stalled pump resumes.
    pub fn get_video_packet(&self) -> Packet {
        self.shared.gate.notify_all();
        self.shared.video_queue.try_pop().unwrap_or_else(Packet::empty)
    }

    /// Pop the next audio packet, or the empty sentinel if none is
    /// buffered. Rings the back-pressure gate so a stalled pump resumes.
    pub fn get_audio_packet(&self) -> Packet {
        self.shared.gate.notify_all();
        self.shared.audio_queue.try_pop().unwrap_or_else(Packet::empty)
    }

    /// True once the pump has stopped and both queues have drained.
    pub fn is_eof(&self) -> bool {
        !self.executor.is_running()
            && self.shared.video_queue.is_empty()
            && self.shared.audio_queue.is_empty()
    }

    /// Output frame rate derived from the video stream's repaired time
    /// base (the audio time base when no video stream opened).
    pub fn fps(&self) -> f64 {
        self.video_stream
            .or(self.audio_stream)
            .map(|s| s.time_base.ticks_per_second())
            .unwrap_or(0.0)
    }

    /// The selected video stream, with its repaired time base.
    pub fn video_stream(&self) -> Option<&StreamDesc> {
        self.video_stream.as_ref()
    }

    /// The selected audio stream, with its repaired time base.
    pub fn audio_stream(&self) -> Option<&StreamDesc> {
        self.audio_stream.as_ref()
    }

    /// Number of buffered video packets.
    pub fn video_queue_len(&self) -> usize {
        self.shared.video_queue.len()
    }

    /// Number of buffered audio packets.
    pub fn audio_queue_len(&self) -> usize {
        self.shared.audio_queue.len()
    }

    /// Stop pumping: pending iterations are dropped, the in-flight one
    /// runs to completion, and the worker is joined.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.executor.clear();
        self.executor.halt();
        self.shared.gate.notify_all();
        self.executor.stop();
        info!(label = %self.label, "Stopped");
    }
}

impl Drop for InputPump {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Select the first stream of `kind` and try to open its decoder.
/// Returns the stream with a repaired time base, or `None` (logged) when
/// no stream of the kind opens.
fn open_stream(
    demuxer: &mut dyn Demuxer,
    streams: &[StreamDesc],
    kind: StreamKind,
    label: &str,
) -> Option<StreamDesc> {
    let desc = streams.iter().find(|s| s.kind == kind)?;
    match demuxer.open_decoder(desc.index) {
        Ok(()) => Some(StreamDesc {
            time_base: repair_time_base(desc.time_base),
            ..*desc
        }),
        Err(e) => {
            warn!(label = %label, error = %e, "Could not open any {kind} stream");
            None
        }
    }
}

/// Some containers misreport a frame rate of `1/den`; rebuild the
/// numerator as `10^(⌊log10(den)⌋ − 1)`.
fn repair_time_base(tb: Rational) -> Rational {
    if tb.num != 1 {
        return tb;
    }
    let exponent = (tb.den as f64).log10().floor() as i32 - 1;
    if exponent <= 0 {
        return tb;
    }
    Rational {
        num: 10u32.pow(exponent as u32),
        den: tb.den,
    }
}

/// One pump step: read a packet, route or handle end-of-stream, publish
/// metrics, re-enqueue, then park while both queues are saturated.
fn pump_iteration(state: &mut PumpState, shared: &Arc<PumpShared>, spawner: &Spawner<PumpState>) {
    match state.demuxer.read_packet() {
        Ok(Some(raw)) => {
            if shared.video_index == Some(raw.stream_index) {
                shared.video_queue.push(Packet::copy_from(&raw.data));
            } else if shared.audio_index == Some(raw.stream_index) {
                shared.audio_queue.push(Packet::copy_from(&raw.data));
            }
        }
        end => {
            if let Err(e) = end {
                warn!(label = %shared.label, error = %e, "Packet read failed, treating as end of stream");
            }
            if shared.looping && seek_to(state, shared, 0.0) {
                shared.graph.tag("seek");
            } else {
                spawner.halt();
                return;
            }
        }
    }

    std::thread::yield_now();

    shared.graph.update_value(
        "input-buffer",
        shared.video_queue.len() as f64 / PACKET_BUFFER_COUNT as f64,
    );

    let next_shared = Arc::clone(shared);
    let next_spawner = spawner.clone();
    if spawner
        .spawn(move |state| pump_iteration(state, &next_shared, &next_spawner))
        .is_err()
    {
        return;
    }

    shared.gate.wait_while(|| {
        spawner.is_running()
            && shared.video_queue.len() > PACKET_BUFFER_COUNT
            && shared.audio_queue.len() > PACKET_BUFFER_COUNT
    });
}

/// Seek the demuxer to `seconds`, rescaling the microsecond target into
/// the reference stream's time base. Failures are logged and non-fatal;
/// the caller decides whether a failed rewind is terminal.
fn seek_to(state: &mut PumpState, shared: &PumpShared, seconds: f64) -> bool {
    let Some(reference) = shared.seek_ref else {
        return false;
    };
    let micros = (seconds * 1_000_000.0) as i64;
    let target = Rational::rescale(micros, Rational::MICROSECONDS, reference.time_base);
    match state.demuxer.seek(reference.index, target, true) {
        Ok(()) => true,
        Err(e) => {
            warn!(label = %shared.label, error = %e, "Failed to seek frame");
            false
        }
    }
}
