//! Demuxer trait definition.

use pm_common::{DemuxError, RawPacket, StreamDesc};

/// Trait for container demuxers.
///
/// The pump drives a demuxer one packet at a time and never interprets
/// payload bytes; the packets it yields are opaque codec input, tagged by
/// the stream they belong to.
pub trait Demuxer: Send {
    /// Stream metadata in stable container order. An empty table means
    /// no stream information could be recovered.
    fn streams(&self) -> &[StreamDesc];

    /// Initialize decoding state for a stream. The pump tolerates
    /// per-stream failure as long as at least one stream of either kind
    /// opens.
    fn open_decoder(&mut self, stream_index: usize) -> Result<(), DemuxError>;

    /// Read the next packet in demux order, or `Ok(None)` at
    /// end-of-stream.
    fn read_packet(&mut self) -> Result<Option<RawPacket>, DemuxError>;

    /// Seek to a timestamp expressed in the given stream's time base.
    /// `backward` requests the nearest position at or before the target.
    fn seek(&mut self, stream_index: usize, timestamp: i64, backward: bool)
        -> Result<(), DemuxError>;
}
