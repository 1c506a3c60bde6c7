use super::device::{DeviceDescriptor, OpenCandidate};
use super::meter::peak_amplitude;
use super::{CaptureError, StreamReadError};
use serde::Serialize;
use std::time::Duration;

/// Shape of an open capture stream. Samples are always signed 16-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_size: usize,
}

impl StreamConfig {
    pub fn new(sample_rate: u32, channels: u16, frame_size: usize) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
            frame_size: frame_size.max(1),
        }
    }

    /// Interleaved samples delivered by one `read_frame` call.
    pub fn samples_per_frame(&self) -> usize {
        self.frame_size * usize::from(self.channels)
    }

    pub fn frame_duration(&self) -> Duration {
        let nanos = (self.frame_size as u64).saturating_mul(1_000_000_000);
        Duration::from_nanos(nanos / u64::from(self.sample_rate.max(1)))
    }
}

/// One block of interleaved PCM read from a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    samples: Vec<i16>,
    channels: u16,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>, channels: u16) -> Self {
        Self {
            samples,
            channels: channels.max(1),
        }
    }

    /// Zero-filled frame used in place of a read that failed transiently.
    pub fn silent(config: &StreamConfig) -> Self {
        Self::new(vec![0; config.samples_per_frame()], config.channels)
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Largest absolute sample value across all channels.
    pub fn peak_amplitude(&self) -> u16 {
        peak_amplitude(&self.samples)
    }
}

/// An open capture handle owned by exactly one consumer.
pub trait CaptureStream {
    fn config(&self) -> &StreamConfig;

    /// Block until one full frame is available.
    fn read_frame(&mut self) -> Result<AudioFrame, StreamReadError>;

    /// Release the hardware handle. Must be idempotent and must not return until the
    /// device is free for the next opener.
    fn close(&mut self);

    fn is_closed(&self) -> bool;

    /// Frames discarded because the consumer fell behind the driver.
    fn dropped_frames(&self) -> usize {
        0
    }
}

/// Host audio layer: device enumeration plus stream creation.
pub trait AudioBackend {
    type Stream: CaptureStream;

    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, CaptureError>;

    fn open(
        &self,
        candidate: &OpenCandidate,
        config: &StreamConfig,
    ) -> Result<Self::Stream, CaptureError>;
}
