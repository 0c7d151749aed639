use thiserror::Error;

use super::format::FormatTag;

/// Errors that can occur while opening, driving or converting audio capture.
///
/// Construction-time variants (`SubsystemInitFailure`, `DeviceOpenFailure`,
/// `ConfigurationFailed`) abort sensor creation. Per-buffer variants
/// (`UnsupportedFormat`, `InvalidBuffer`, `SinkFailure`) are reported from the
/// capture thread and never stop the stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("audio subsystem initialization failed: {0}")]
    SubsystemInitFailure(String),

    #[error("couldn't open an audio device for capture: {0}")]
    DeviceOpenFailure(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(FormatTag),

    #[error("invalid capture buffer: {0}")]
    InvalidBuffer(String),

    #[error("invalid state transition: cannot {action} while {state}")]
    InvalidState { action: &'static str, state: &'static str },

    #[error("stream failure: {0}")]
    StreamFailure(String),

    #[error("sink failure: {0}")]
    SinkFailure(String),
}

impl CaptureError {
    /// Whether this error concerns a single buffer; the stream keeps running.
    pub fn is_per_buffer(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_) | Self::InvalidBuffer(_) | Self::SinkFailure(_)
        )
    }
}
