//! Central error types for the pipeline core (thiserror-based).

use thiserror::Error;

/// Errors raised at the demux collaborator boundary.
#[derive(Error, Debug)]
pub enum DemuxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported container format")]
    UnsupportedContainer,

    #[error("Decoder init failed for stream {stream}: {reason}")]
    DecoderInit { stream: usize, reason: String },

    #[error("Packet read failed (code {code}): {reason}")]
    Read { code: i32, reason: String },

    #[error("Seek to timestamp {timestamp} failed: {reason}")]
    Seek { timestamp: i64, reason: String },
}

/// Input pump construction errors.
///
/// Runtime per-packet failures are not represented here: the pump folds
/// them into end-of-stream handling (see the pump loop).
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Could not open '{path}': {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: DemuxError,
    },

    #[error("No stream metadata in '{path}'")]
    StreamInfoFailed { path: String },

    #[error("No usable video or audio stream in '{path}'")]
    NoUsableStream { path: String },
}

/// Convenience Result alias for input operations.
pub type InputResult<T> = Result<T, InputError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_failed_includes_path_and_source() {
        let err = InputError::OpenFailed {
            path: "clip.mov".to_string(),
            source: DemuxError::UnsupportedContainer,
        };
        let msg = err.to_string();
        assert!(msg.contains("clip.mov"));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("Unsupported"));
    }

    #[test]
    fn demux_read_carries_native_code() {
        let err = DemuxError::Read {
            code: -541478725,
            reason: "end of file".to_string(),
        };
        assert!(err.to_string().contains("-541478725"));
    }
}
