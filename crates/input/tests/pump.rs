//! Integration tests for the input pump against a scripted demuxer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pm_common::{DemuxError, InputConfig, InputError, Rational, RawPacket, StreamDesc, StreamKind};
use pm_diag::Graph;
use pm_input::{Demuxer, InputPump, PACKET_BUFFER_COUNT};

/// In-memory demuxer playing back a fixed packet script.
struct ScriptedDemuxer {
    streams: Vec<StreamDesc>,
    packets: Vec<RawPacket>,
    pos: usize,
    fail_decoders: Vec<usize>,
    seekable: bool,
    fail_read_at: Option<usize>,
    seeks: Arc<AtomicUsize>,
}

impl ScriptedDemuxer {
    fn new(streams: Vec<StreamDesc>, packets: Vec<RawPacket>) -> Self {
        Self {
            streams,
            packets,
            pos: 0,
            fail_decoders: Vec::new(),
            seekable: true,
            fail_read_at: None,
            seeks: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn fail_decoder(mut self, stream_index: usize) -> Self {
        self.fail_decoders.push(stream_index);
        self
    }

    fn unseekable(mut self) -> Self {
        self.seekable = false;
        self
    }

    fn fail_read_at(mut self, pos: usize) -> Self {
        self.fail_read_at = Some(pos);
        self
    }

    fn seek_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.seeks)
    }
}

impl Demuxer for ScriptedDemuxer {
    fn streams(&self) -> &[StreamDesc] {
        &self.streams
    }

    fn open_decoder(&mut self, stream_index: usize) -> Result<(), DemuxError> {
        if self.fail_decoders.contains(&stream_index) {
            return Err(DemuxError::DecoderInit {
                stream: stream_index,
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    fn read_packet(&mut self) -> Result<Option<RawPacket>, DemuxError> {
        if self.fail_read_at == Some(self.pos) {
            self.fail_read_at = None;
            return Err(DemuxError::Read {
                code: -1,
                reason: "scripted read failure".to_string(),
            });
        }
        match self.packets.get(self.pos) {
            Some(packet) => {
                self.pos += 1;
                Ok(Some(packet.clone()))
            }
            None => Ok(None),
        }
    }

    fn seek(
        &mut self,
        _stream_index: usize,
        timestamp: i64,
        _backward: bool,
    ) -> Result<(), DemuxError> {
        if !self.seekable {
            return Err(DemuxError::Seek {
                timestamp,
                reason: "scripted failure".to_string(),
            });
        }
        self.pos = 0;
        self.seeks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn video_stream(index: usize) -> StreamDesc {
    StreamDesc {
        index,
        kind: StreamKind::Video,
        time_base: Rational::new(1, 25),
    }
}

fn audio_stream(index: usize) -> StreamDesc {
    StreamDesc {
        index,
        kind: StreamKind::Audio,
        time_base: Rational::new(1, 48_000),
    }
}

fn video_packet(index: usize, byte: u8) -> RawPacket {
    RawPacket {
        data: vec![byte],
        stream_index: index,
    }
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}

/// Pop video packets until `count` have arrived or the timeout expires.
fn pop_video(pump: &InputPump, count: usize, timeout: Duration) -> Vec<u8> {
    let deadline = Instant::now() + timeout;
    let mut got = Vec::new();
    while got.len() < count && Instant::now() < deadline {
        let packet = pump.get_video_packet();
        if packet.is_empty() {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            got.push(packet[0]);
        }
    }
    got
}

#[test]
fn packets_arrive_in_demux_order() {
    let streams = vec![video_stream(0), audio_stream(1)];
    let mut packets = Vec::new();
    for i in 0..10u8 {
        packets.push(video_packet(0, i));
        packets.push(RawPacket {
            data: vec![100 + i],
            stream_index: 1,
        });
    }
    let demuxer = ScriptedDemuxer::new(streams, packets);
    let pump = InputPump::new(
        Box::new(demuxer),
        InputConfig::new("ordered.mov"),
        Graph::new("input"),
    )
    .unwrap();

    let video = pop_video(&pump, 10, Duration::from_secs(2));
    assert_eq!(video, (0..10).collect::<Vec<_>>());

    let mut audio = Vec::new();
    assert!(wait_until(Duration::from_secs(2), || {
        let packet = pump.get_audio_packet();
        if !packet.is_empty() {
            audio.push(packet[0]);
        }
        audio.len() == 10
    }));
    assert_eq!(audio, (100..110).collect::<Vec<_>>());
}

#[test]
fn no_loop_reaches_eof_after_drain() {
    let packets = (0..10u8).map(|i| video_packet(0, i)).collect();
    let demuxer = ScriptedDemuxer::new(vec![video_stream(0)], packets);
    let pump = InputPump::new(
        Box::new(demuxer),
        InputConfig::new("short.mov"),
        Graph::new("input"),
    )
    .unwrap();

    let video = pop_video(&pump, 10, Duration::from_secs(2));
    assert_eq!(video.len(), 10);

    assert!(wait_until(Duration::from_secs(2), || pump.is_eof()));

    // Subsequent pops return the empty sentinel.
    for _ in 0..5 {
        assert!(pump.get_video_packet().is_empty());
    }
    assert!(pump.is_eof());
}

#[test]
fn loop_wraps_and_tags_seek() {
    let packets = (0..10u8).map(|i| video_packet(0, i)).collect();
    let demuxer = ScriptedDemuxer::new(vec![video_stream(0)], packets);
    let seeks = demuxer.seek_counter();
    let graph = Graph::new("input");
    let mut pump = InputPump::new(
        Box::new(demuxer),
        InputConfig::new("looped.mov").looping(true),
        graph.clone(),
    )
    .unwrap();

    let video = pop_video(&pump, 25, Duration::from_secs(5));
    assert_eq!(video.len(), 25);
    // 25 packets out of a 10-packet file needs at least two rewinds.
    assert!(seeks.load(Ordering::SeqCst) >= 2);
    assert!(graph.tag_count("seek") >= 2);
    assert!(!pump.is_eof());

    pump.stop();
}

#[test]
fn looped_sequence_repeats_source_order() {
    let packets = (0..5u8).map(|i| video_packet(0, i)).collect();
    let demuxer = ScriptedDemuxer::new(vec![video_stream(0)], packets);
    let pump = InputPump::new(
        Box::new(demuxer),
        InputConfig::new("looped.mov").looping(true),
        Graph::new("input"),
    )
    .unwrap();

    let video = pop_video(&pump, 15, Duration::from_secs(5));
    let expected: Vec<u8> = (0..15).map(|i| (i % 5) as u8).collect();
    assert_eq!(video, expected);
}

#[test]
fn backpressure_bounds_queue_growth() {
    let streams = vec![video_stream(0), audio_stream(1)];
    let mut packets = Vec::new();
    for i in 0..500usize {
        packets.push(video_packet(0, (i % 256) as u8));
        packets.push(RawPacket {
            data: vec![0],
            stream_index: 1,
        });
    }
    let demuxer = ScriptedDemuxer::new(streams, packets);
    let pump = InputPump::new(
        Box::new(demuxer),
        InputConfig::new("big.mov"),
        Graph::new("input"),
    )
    .unwrap();

    // Let the pump run into the gate without consuming anything.
    assert!(wait_until(Duration::from_secs(2), || {
        pump.video_queue_len() > PACKET_BUFFER_COUNT
            && pump.audio_queue_len() > PACKET_BUFFER_COUNT
    }));
    std::thread::sleep(Duration::from_millis(50));

    // One in-flight packet beyond the soft capacity, never more.
    assert!(pump.video_queue_len() <= PACKET_BUFFER_COUNT + 1);
    assert!(pump.audio_queue_len() <= PACKET_BUFFER_COUNT + 1);

    // Draining one side releases the gate and the pump resumes.
    let before = pump.video_queue_len() + pump.audio_queue_len();
    for _ in 0..20 {
        let _ = pump.get_video_packet();
    }
    assert!(wait_until(Duration::from_secs(2), || {
        pump.video_queue_len() > PACKET_BUFFER_COUNT
    }));
    let _ = before;
}

#[test]
fn failed_video_decoder_is_tolerated() {
    let streams = vec![video_stream(0), audio_stream(1)];
    let packets = vec![
        video_packet(0, 1),
        RawPacket {
            data: vec![42],
            stream_index: 1,
        },
    ];
    let demuxer = ScriptedDemuxer::new(streams, packets).fail_decoder(0);
    let pump = InputPump::new(
        Box::new(demuxer),
        InputConfig::new("audio-only.mov"),
        Graph::new("input"),
    )
    .unwrap();

    assert!(pump.video_stream().is_none());
    assert!(pump.audio_stream().is_some());
    // fps falls back to the audio time base.
    assert!((pump.fps() - 48_000.0).abs() < 1e-9);

    assert!(wait_until(Duration::from_secs(2), || {
        !pump.get_audio_packet().is_empty()
    }));
}

#[test]
fn both_decoders_failing_is_fatal() {
    let streams = vec![video_stream(0), audio_stream(1)];
    let demuxer = ScriptedDemuxer::new(streams, Vec::new())
        .fail_decoder(0)
        .fail_decoder(1);
    let err = InputPump::new(
        Box::new(demuxer),
        InputConfig::new("broken.mov"),
        Graph::new("input"),
    )
    .unwrap_err();
    assert!(matches!(err, InputError::NoUsableStream { .. }));
}

#[test]
fn empty_stream_table_is_fatal() {
    let demuxer = ScriptedDemuxer::new(Vec::new(), Vec::new());
    let err = InputPump::new(
        Box::new(demuxer),
        InputConfig::new("empty.mov"),
        Graph::new("input"),
    )
    .unwrap_err();
    assert!(matches!(err, InputError::StreamInfoFailed { .. }));
}

#[test]
fn open_failure_is_annotated_with_path() {
    let err = InputPump::open(
        InputConfig::new("/missing/clip.mov"),
        Graph::new("input"),
        |_| {
            Err(DemuxError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            )))
        },
    )
    .unwrap_err();
    assert!(matches!(err, InputError::OpenFailed { .. }));
    assert!(err.to_string().contains("/missing/clip.mov"));
}

#[test]
fn read_error_folds_into_eof() {
    let packets = (0..10u8).map(|i| video_packet(0, i)).collect();
    let demuxer = ScriptedDemuxer::new(vec![video_stream(0)], packets).fail_read_at(5);
    let pump = InputPump::new(
        Box::new(demuxer),
        InputConfig::new("corrupt.mov"),
        Graph::new("input"),
    )
    .unwrap();

    let video = pop_video(&pump, 5, Duration::from_secs(2));
    assert_eq!(video, vec![0, 1, 2, 3, 4]);
    assert!(wait_until(Duration::from_secs(2), || pump.is_eof()));
}

#[test]
fn unseekable_looped_source_terminates() {
    let packets = (0..4u8).map(|i| video_packet(0, i)).collect();
    let demuxer = ScriptedDemuxer::new(vec![video_stream(0)], packets).unseekable();
    let graph = Graph::new("input");
    let pump = InputPump::new(
        Box::new(demuxer),
        InputConfig::new("pipe.mov").looping(true),
        graph.clone(),
    )
    .unwrap();

    let video = pop_video(&pump, 4, Duration::from_secs(2));
    assert_eq!(video.len(), 4);
    assert!(wait_until(Duration::from_secs(2), || pump.is_eof()));
    assert_eq!(graph.tag_count("seek"), 0);
}

#[test]
fn fps_uses_repaired_time_base() {
    let streams = vec![StreamDesc {
        index: 0,
        kind: StreamKind::Video,
        time_base: Rational::new(1, 90_000),
    }];
    let demuxer = ScriptedDemuxer::new(streams, Vec::new());
    let pump = InputPump::new(
        Box::new(demuxer),
        InputConfig::new("ts.mov"),
        Graph::new("input"),
    )
    .unwrap();
    assert!((pump.fps() - 90.0).abs() < 1e-9);
    assert_eq!(
        pump.video_stream().unwrap().time_base,
        Rational::new(1000, 90_000)
    );
}

#[test]
fn input_buffer_metric_is_published() {
    let packets = (0..20u8).map(|i| video_packet(0, i)).collect();
    let demuxer = ScriptedDemuxer::new(vec![video_stream(0)], packets);
    let graph = Graph::new("input");
    let pump = InputPump::new(
        Box::new(demuxer),
        InputConfig::new("metric.mov"),
        graph.clone(),
    )
    .unwrap();

    assert!(wait_until(Duration::from_secs(2), || {
        graph.value("input-buffer").is_some()
    }));
    let _ = pump;
}
