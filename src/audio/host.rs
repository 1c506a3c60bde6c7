//! CPAL-backed implementation of the capture traits.

use super::device::{DeviceDescriptor, DeviceTarget, OpenCandidate};
use super::dispatch::{f32_to_i16, u16_to_i16, FrameDispatcher};
use super::{AudioBackend, AudioFrame, CaptureError, CaptureStream, StreamConfig, StreamReadError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfigRange};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Frames buffered between the driver callback and the reader before drops start.
const DEFAULT_QUEUE_FRAMES: usize = 32;

pub struct CpalBackend {
    host: cpal::Host,
    read_timeout: Duration,
    queue_frames: usize,
}

impl CpalBackend {
    pub fn new(read_timeout: Duration) -> Self {
        Self {
            host: cpal::default_host(),
            read_timeout,
            queue_frames: DEFAULT_QUEUE_FRAMES,
        }
    }

    pub fn host_name(&self) -> &'static str {
        self.host.id().name()
    }

    fn device_for(&self, target: DeviceTarget) -> Result<cpal::Device, CaptureError> {
        match target {
            DeviceTarget::SystemDefault => {
                self.host
                    .default_input_device()
                    .ok_or_else(|| CaptureError::DeviceOpen {
                        target: target.to_string(),
                        reason: "no default input device".to_string(),
                    })
            }
            DeviceTarget::Index(index) => self
                .host
                .input_devices()
                .map_err(|err| CaptureError::DeviceOpen {
                    target: target.to_string(),
                    reason: format!("device list unavailable: {err}"),
                })?
                .nth(index)
                .ok_or_else(|| CaptureError::DeviceOpen {
                    target: target.to_string(),
                    reason: "device index no longer present".to_string(),
                }),
        }
    }
}

fn max_input_channels(device: &cpal::Device) -> u16 {
    device
        .supported_input_configs()
        .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
        .unwrap_or(0)
}

fn matching_range(
    device: &cpal::Device,
    config: &StreamConfig,
) -> Result<SupportedStreamConfigRange, String> {
    let ranges = device
        .supported_input_configs()
        .map_err(|err| err.to_string())?;
    let mut fallback = None;
    for range in ranges {
        if range.channels() != config.channels
            || range.min_sample_rate().0 > config.sample_rate
            || range.max_sample_rate().0 < config.sample_rate
        {
            continue;
        }
        // Prefer formats that need no conversion.
        if range.sample_format() == SampleFormat::I16 {
            return Ok(range);
        }
        fallback.get_or_insert(range);
    }
    fallback.ok_or_else(|| {
        format!(
            "no {} ch configuration at {} Hz",
            config.channels, config.sample_rate
        )
    })
}

impl AudioBackend for CpalBackend {
    type Stream = CpalStream;

    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, CaptureError> {
        let default_name = self
            .host
            .default_input_device()
            .and_then(|device| device.name().ok());
        let devices = self
            .host
            .input_devices()
            .map_err(|err| CaptureError::Enumeration(err.to_string()))?;
        Ok(devices
            .enumerate()
            .map(|(index, device)| {
                let name = device
                    .name()
                    .unwrap_or_else(|_| format!("input device {index}"));
                DeviceDescriptor {
                    index,
                    is_default: default_name.as_deref() == Some(name.as_str()),
                    max_input_channels: max_input_channels(&device),
                    name,
                }
            })
            .collect())
    }

    fn open(
        &self,
        candidate: &OpenCandidate,
        config: &StreamConfig,
    ) -> Result<CpalStream, CaptureError> {
        let open_error = |reason: String| CaptureError::DeviceOpen {
            target: candidate.to_string(),
            reason,
        };
        let device = self.device_for(candidate.target)?;
        let range = matching_range(&device, config).map_err(open_error)?;
        let format = range.sample_format();
        let device_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (sender, receiver) = bounded::<Vec<i16>>(self.queue_frames.max(1));
        let dropped = Arc::new(AtomicUsize::new(0));
        let disconnected = Arc::new(AtomicBool::new(false));
        let mut dispatcher =
            FrameDispatcher::new(config.samples_per_frame(), sender, dropped.clone());

        let err_flag = disconnected.clone();
        let err_fn = move |err: cpal::StreamError| {
            tracing::warn!(error = %err, "audio stream error");
            if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                err_flag.store(true, Ordering::Relaxed);
            }
        };

        let stream = match format {
            SampleFormat::I16 => device.build_input_stream(
                &device_config,
                move |data: &[i16], _| dispatcher.push(data, |sample| sample),
                err_fn,
                None,
            ),
            SampleFormat::F32 => device.build_input_stream(
                &device_config,
                move |data: &[f32], _| dispatcher.push(data, f32_to_i16),
                err_fn,
                None,
            ),
            SampleFormat::U16 => device.build_input_stream(
                &device_config,
                move |data: &[u16], _| dispatcher.push(data, u16_to_i16),
                err_fn,
                None,
            ),
            other => return Err(open_error(format!("unsupported sample format: {other:?}"))),
        }
        .map_err(|err| open_error(err.to_string()))?;

        stream.play().map_err(|err| open_error(err.to_string()))?;
        tracing::debug!(
            %candidate,
            format = ?format,
            sample_rate = config.sample_rate,
            frame_size = config.frame_size,
            "capture stream opened"
        );

        Ok(CpalStream {
            stream: Some(stream),
            receiver,
            config: *config,
            read_timeout: self.read_timeout,
            dropped,
            disconnected,
        })
    }
}

pub struct CpalStream {
    stream: Option<cpal::Stream>,
    receiver: Receiver<Vec<i16>>,
    config: StreamConfig,
    read_timeout: Duration,
    dropped: Arc<AtomicUsize>,
    disconnected: Arc<AtomicBool>,
}

impl CaptureStream for CpalStream {
    fn config(&self) -> &StreamConfig {
        &self.config
    }

    fn read_frame(&mut self) -> Result<AudioFrame, StreamReadError> {
        if self.stream.is_none() {
            return Err(StreamReadError::Closed);
        }
        if self.disconnected.load(Ordering::Relaxed) {
            return Err(StreamReadError::Disconnected);
        }
        match self.receiver.recv_timeout(self.read_timeout) {
            Ok(samples) => Ok(AudioFrame::new(samples, self.config.channels)),
            Err(RecvTimeoutError::Timeout) => Err(StreamReadError::Timeout(self.read_timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(StreamReadError::Disconnected),
        }
    }

    fn close(&mut self) {
        let Some(stream) = self.stream.take() else {
            return;
        };
        if let Err(err) = stream.pause() {
            tracing::debug!(error = %err, "failed to pause audio stream");
        }
        drop(stream);
        while self.receiver.try_recv().is_ok() {}
        tracing::debug!(dropped = self.dropped_frames(), "capture stream closed");
    }

    fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    fn dropped_frames(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.close();
    }
}
