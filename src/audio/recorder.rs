//! Voice-activity recording on top of an arbitrated capture lease.

use super::arbiter::{CaptureArbiter, Holder, OpenRequest};
use super::capture::{run_vad_session, Utterance};
use super::vad::VadConfig;
use super::{AudioBackend, CaptureError};
use std::time::Duration;

/// Records one utterance per call, ending on trailing silence or the duration cap.
#[derive(Debug, Clone)]
pub struct VoiceActivityRecorder {
    cfg: VadConfig,
    sample_rate: u32,
    frame_size: usize,
}

impl VoiceActivityRecorder {
    pub fn new(cfg: VadConfig, sample_rate: u32, frame_size: usize) -> Self {
        Self {
            cfg,
            sample_rate,
            frame_size,
        }
    }

    pub fn config(&self) -> &VadConfig {
        &self.cfg
    }

    /// Record with the configured session settings.
    pub fn record<B: AudioBackend>(
        &self,
        arbiter: &CaptureArbiter<B>,
    ) -> Result<Utterance, CaptureError> {
        self.record_with(arbiter, &self.cfg)
    }

    /// Record with per-call overrides for the silence window, the cap, and the floor.
    pub fn record_until_silence<B: AudioBackend>(
        &self,
        arbiter: &CaptureArbiter<B>,
        silence_duration: Duration,
        max_duration: Duration,
        volume_threshold: f32,
    ) -> Result<Utterance, CaptureError> {
        let cfg = VadConfig {
            silence_duration,
            max_duration,
            volume_threshold,
            ..self.cfg.clone()
        };
        self.record_with(arbiter, &cfg)
    }

    fn record_with<B: AudioBackend>(
        &self,
        arbiter: &CaptureArbiter<B>,
        cfg: &VadConfig,
    ) -> Result<Utterance, CaptureError> {
        let request = OpenRequest::resolved(self.sample_rate, self.frame_size);
        let mut lease = arbiter.acquire(Holder::Recorder, request)?;
        tracing::info!(candidate = %lease.candidate(), "recording");

        let utterance = run_vad_session(lease.stream_mut(), cfg, arbiter.clock());
        lease.release();

        let metrics = utterance.metrics();
        tracing::info!(
            target: "capture",
            capture_ms = metrics.capture_ms,
            frames = metrics.frames_processed,
            speech_frames = metrics.speech_frames,
            degraded = metrics.frames_degraded,
            dropped = metrics.frames_dropped,
            channels = utterance.captured_channels(),
            threshold = metrics.calibration.map_or(0.0, |c| c.derived_threshold),
            stop = metrics.stop_reason.label(),
            "capture metrics"
        );
        if !utterance.speech_observed() {
            tracing::debug!("recording ended without speech");
        }
        Ok(utterance)
    }
}
