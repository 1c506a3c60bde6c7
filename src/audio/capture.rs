//! Recording state machine with voice activity detection.
//!
//! Accumulates frames into an utterance, tracks the silence streak, and decides when
//! to stop based on trailing silence after speech or the wall-clock cap.

use super::dispatch::downmix_to_mono;
use super::meter::level_dbfs;
use super::vad::{EnergyCalibration, VadConfig, VadPhase};
use super::{AudioFrame, CaptureStream, Clock, StreamConfig};
use serde::Serialize;
use std::time::Duration;

/// Why a recording session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    Silence { silent_frames: usize },
    MaxDuration,
    ReadErrors { consecutive: usize },
    Disconnected,
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::Silence { .. } => "silence",
            StopReason::MaxDuration => "max_duration",
            StopReason::ReadErrors { .. } => "read_errors",
            StopReason::Disconnected => "disconnected",
        }
    }
}

/// Per-session counters emitted with every recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureMetrics {
    pub capture_ms: u64,
    pub frames_processed: usize,
    pub speech_frames: usize,
    pub frames_degraded: usize,
    pub frames_dropped: usize,
    pub calibration: Option<EnergyCalibration>,
    pub stop_reason: StopReason,
}

impl Default for CaptureMetrics {
    fn default() -> Self {
        Self {
            capture_ms: 0,
            frames_processed: 0,
            speech_frames: 0,
            frames_degraded: 0,
            frames_dropped: 0,
            calibration: None,
            stop_reason: StopReason::MaxDuration,
        }
    }
}

/// Frames captured during one session, handed to the caller by value.
#[derive(Debug, Clone)]
pub struct Utterance {
    frames: Vec<AudioFrame>,
    sample_rate: u32,
    channels: u16,
    captured_channels: u16,
    speech_observed: bool,
    metrics: CaptureMetrics,
}

impl Utterance {
    pub(super) fn new(config: &StreamConfig) -> Self {
        Self {
            frames: Vec::new(),
            sample_rate: config.sample_rate,
            channels: config.channels,
            captured_channels: config.channels,
            speech_observed: false,
            metrics: CaptureMetrics::default(),
        }
    }

    /// Wrap already-mono samples, e.g. a speech segment held by a trigger model.
    pub fn from_mono_samples(samples: Vec<i16>, sample_rate: u32) -> Self {
        let mut utterance = Self::new(&StreamConfig::new(sample_rate, 1, samples.len()));
        utterance.frames.push(AudioFrame::new(samples, 1));
        utterance
    }

    pub(super) fn push(&mut self, frame: AudioFrame) {
        self.frames.push(frame);
    }

    /// Down-mix multi-channel capture to mono and seal the session results.
    pub(super) fn finalize(mut self, speech_observed: bool, metrics: CaptureMetrics) -> Self {
        if self.channels > 1 {
            let channels = usize::from(self.channels);
            self.frames = self
                .frames
                .into_iter()
                .map(|frame| AudioFrame::new(downmix_to_mono(frame.samples(), channels), 1))
                .collect();
            self.channels = 1;
        }
        self.frames.shrink_to_fit();
        self.speech_observed = speech_observed;
        self.metrics = metrics;
        self
    }

    pub fn frames(&self) -> &[AudioFrame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Channel layout of `frames()`; 1 once a session has finished.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Channel count the device was opened with.
    pub fn captured_channels(&self) -> u16 {
        self.captured_channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn speech_observed(&self) -> bool {
        self.speech_observed
    }

    pub fn metrics(&self) -> &CaptureMetrics {
        &self.metrics
    }

    pub fn stop_reason(&self) -> StopReason {
        self.metrics.stop_reason
    }

    /// All samples concatenated in capture order.
    pub fn samples(&self) -> Vec<i16> {
        let total = self.frames.iter().map(AudioFrame::len).sum();
        let mut samples = Vec::with_capacity(total);
        for frame in &self.frames {
            samples.extend_from_slice(frame.samples());
        }
        samples
    }

    pub fn duration(&self) -> Duration {
        let per_channel: usize = self.frames.iter().map(AudioFrame::len).sum::<usize>()
            / usize::from(self.channels.max(1));
        Duration::from_secs_f64(per_channel as f64 / f64::from(self.sample_rate.max(1)))
    }

    pub fn is_empty(&self) -> bool {
        self.frames.iter().all(AudioFrame::is_empty)
    }
}

/// Tracks calibration, speech, and the silence streak for one session.
///
/// Silence only stops a session after speech was heard; leading silence resets the
/// streak instead so a quiet room never ends the recording on its own.
pub(super) struct CaptureState<'a> {
    cfg: &'a VadConfig,
    phase: VadPhase,
    silence_frames_needed: usize,
    calibration_peaks: Vec<u16>,
    calibration: Option<EnergyCalibration>,
    silent_streak: usize,
    speech_frames: usize,
}

impl<'a> CaptureState<'a> {
    pub(super) fn new(cfg: &'a VadConfig, silence_frames_needed: usize) -> Self {
        let mut state = Self {
            cfg,
            phase: VadPhase::Calibrating,
            silence_frames_needed: silence_frames_needed.max(1),
            calibration_peaks: Vec::with_capacity(cfg.calibration_frames),
            calibration: None,
            silent_streak: 0,
            speech_frames: 0,
        };
        if cfg.calibration_frames == 0 {
            state.finish_calibration();
        }
        state
    }

    fn finish_calibration(&mut self) {
        let calibration = EnergyCalibration::from_peaks(
            &self.calibration_peaks,
            self.cfg.volume_threshold,
            self.cfg.calibration_multiplier,
        );
        tracing::debug!(
            baseline = calibration.baseline_level,
            threshold = calibration.derived_threshold,
            threshold_dbfs = level_dbfs(calibration.derived_threshold),
            "vad calibrated"
        );
        self.calibration = Some(calibration);
        self.phase = VadPhase::WaitingForSpeech;
    }

    /// Feed one frame's peak amplitude; returns a stop reason once capture should end.
    pub(super) fn on_frame(&mut self, peak: u16) -> Option<StopReason> {
        let calibration = match (self.phase, self.calibration) {
            (VadPhase::Stopped, _) => return None,
            (VadPhase::Calibrating, _) | (_, None) => {
                self.calibration_peaks.push(peak);
                if self.calibration_peaks.len() >= self.cfg.calibration_frames {
                    self.finish_calibration();
                }
                return None;
            }
            (_, Some(calibration)) => calibration,
        };

        if calibration.is_speech(peak) {
            if self.phase == VadPhase::WaitingForSpeech {
                tracing::debug!(peak, "speech started");
            }
            self.phase = VadPhase::Recording;
            self.speech_frames += 1;
            self.silent_streak = 0;
            return None;
        }

        self.silent_streak += 1;
        if self.silent_streak < self.silence_frames_needed {
            return None;
        }
        if self.speech_observed() {
            self.phase = VadPhase::Stopped;
            return Some(StopReason::Silence {
                silent_frames: self.silent_streak,
            });
        }
        self.silent_streak = 0;
        None
    }

    pub(super) fn phase(&self) -> VadPhase {
        self.phase
    }

    pub(super) fn speech_observed(&self) -> bool {
        self.speech_frames > 0
    }

    pub(super) fn speech_frames(&self) -> usize {
        self.speech_frames
    }

    /// Calibration result, computed from whatever was seen if the session ended early.
    pub(super) fn calibration(&self) -> EnergyCalibration {
        self.calibration.unwrap_or_else(|| {
            EnergyCalibration::from_peaks(
                &self.calibration_peaks,
                self.cfg.volume_threshold,
                self.cfg.calibration_multiplier,
            )
        })
    }
}

/// Pull frames from `stream` until trailing silence, the wall-clock cap, or a
/// persistent read failure ends the session. The stream is left open.
pub fn run_vad_session(
    stream: &mut dyn CaptureStream,
    cfg: &VadConfig,
    clock: &dyn Clock,
) -> Utterance {
    let stream_cfg = *stream.config();
    let silence_frames_needed = cfg.silence_frames_needed(&stream_cfg);
    let mut state = CaptureState::new(cfg, silence_frames_needed);
    let mut utterance = Utterance::new(&stream_cfg);
    let mut metrics = CaptureMetrics::default();
    let mut consecutive_errors = 0usize;
    let started = clock.now();

    let stop_reason = loop {
        if clock.now().saturating_sub(started) >= cfg.max_duration {
            break StopReason::MaxDuration;
        }
        let frame = match stream.read_frame() {
            Ok(frame) => {
                consecutive_errors = 0;
                frame
            }
            Err(err) if err.is_persistent() => {
                tracing::warn!(error = %err, "capture stream lost; ending session");
                break StopReason::Disconnected;
            }
            Err(err) => {
                consecutive_errors += 1;
                metrics.frames_degraded += 1;
                if consecutive_errors >= cfg.max_read_errors.max(1) {
                    tracing::warn!(
                        error = %err,
                        consecutive = consecutive_errors,
                        "persistent read errors; ending session"
                    );
                    break StopReason::ReadErrors {
                        consecutive: consecutive_errors,
                    };
                }
                tracing::debug!(error = %err, "substituting silent frame");
                AudioFrame::silent(&stream_cfg)
            }
        };
        metrics.frames_processed += 1;
        let peak = frame.peak_amplitude();
        utterance.push(frame);
        if let Some(reason) = state.on_frame(peak) {
            break reason;
        }
    };

    metrics.capture_ms = clock.now().saturating_sub(started).as_millis() as u64;
    metrics.speech_frames = state.speech_frames();
    metrics.frames_dropped = stream.dropped_frames();
    metrics.calibration = Some(state.calibration());
    metrics.stop_reason = stop_reason;
    tracing::debug!(phase = ?state.phase(), stop = stop_reason.label(), "vad session ended");

    utterance.finalize(state.speech_observed(), metrics)
}
