//! Audio capture, device arbitration, and voice activity detection.
//!
//! Streams deliver interleaved 16-bit frames from CPAL. The arbiter guarantees that
//! only one stream is open at a time, and the recorder turns a leased stream into an
//! utterance that ends on trailing silence.

/// Sample rate used for recording and transcription unless configured otherwise.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Samples per channel delivered by one frame read.
pub const DEFAULT_FRAME_SIZE: usize = 1024;

mod arbiter;
mod capture;
mod clock;
mod device;
mod dispatch;
mod error;
#[cfg(test)]
pub(crate) mod fake;
mod host;
mod meter;
mod recorder;
mod stream;
mod vad;

pub use arbiter::{ArbiterConfig, CaptureArbiter, CaptureLease, ChannelMode, Holder, OpenRequest};
pub use capture::{run_vad_session, CaptureMetrics, StopReason, Utterance};
#[cfg(test)]
pub(crate) use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use device::{
    resolve, DeviceDescriptor, DevicePolicy, DeviceTarget, FallbackPlan, OpenCandidate,
    Resolution, ResolvedDevice,
};
pub use dispatch::downmix_to_mono;
pub use error::{CaptureError, StreamReadError};
pub use host::{CpalBackend, CpalStream};
pub use meter::{level_dbfs, peak_amplitude, rms_level};
pub use recorder::VoiceActivityRecorder;
pub use stream::{AudioBackend, AudioFrame, CaptureStream, StreamConfig};
pub use vad::{EnergyCalibration, VadConfig, VadPhase};
