use std::time::Duration;
use thiserror::Error;

use super::Holder;

/// Failures while resolving, opening, or leasing a capture device.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no usable audio input device found")]
    NoInputDeviceFound,

    #[error("failed to open input {target}: {reason}")]
    DeviceOpen { target: String, reason: String },

    #[error("all {attempts} capture candidates failed to open")]
    DeviceExhausted { attempts: usize },

    #[error("audio device enumeration failed: {0}")]
    Enumeration(String),

    #[error("capture device still leased to the {holder} after {waited:?}")]
    LeaseBusy { holder: Holder, waited: Duration },
}

impl CaptureError {
    /// Failure scoped to one candidate rather than the host audio layer.
    pub fn is_transient(&self) -> bool {
        matches!(self, CaptureError::DeviceOpen { .. })
    }
}

/// Per-frame read failures reported by an open stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamReadError {
    #[error("no audio frame arrived within {0:?}")]
    Timeout(Duration),

    #[error("audio input device disconnected")]
    Disconnected,

    #[error("read from a closed capture stream")]
    Closed,
}

impl StreamReadError {
    /// Timeouts may recover on the next read; the other variants never do.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, StreamReadError::Timeout(_))
    }
}
