//! Energy-based voice activity detection.
//!
//! Each session calibrates once from its first few frames, then classifies every
//! following frame by its peak amplitude against the derived threshold.

use super::StreamConfig;
use crate::config::CapturePipelineConfig;
use serde::Serialize;
use std::time::Duration;

/// Tunables for one recording session.
#[derive(Debug, Clone, PartialEq)]
pub struct VadConfig {
    pub silence_duration: Duration,
    pub max_duration: Duration,
    /// Lower bound for the speech threshold on the 16-bit peak scale.
    pub volume_threshold: f32,
    pub calibration_frames: usize,
    pub calibration_multiplier: f32,
    /// Consecutive failed reads that end a session early.
    pub max_read_errors: usize,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            silence_duration: Duration::from_millis(2_000),
            max_duration: Duration::from_millis(30_000),
            volume_threshold: 50.0,
            calibration_frames: 3,
            calibration_multiplier: 3.0,
            max_read_errors: 5,
        }
    }
}

impl From<&CapturePipelineConfig> for VadConfig {
    fn from(cfg: &CapturePipelineConfig) -> Self {
        Self {
            silence_duration: Duration::from_millis(cfg.silence_ms),
            max_duration: Duration::from_millis(cfg.max_recording_ms),
            volume_threshold: cfg.volume_threshold,
            calibration_frames: cfg.calibration_frames,
            calibration_multiplier: cfg.calibration_multiplier,
            max_read_errors: cfg.max_read_errors,
        }
    }
}

impl VadConfig {
    /// Consecutive quiet frames that make up `silence_duration`, truncated and at
    /// least one. 2 s of 1024-sample frames at 16 kHz is 31 frames.
    pub fn silence_frames_needed(&self, stream: &StreamConfig) -> usize {
        let silence_ms = self.silence_duration.as_millis();
        let numerator = silence_ms * u128::from(stream.sample_rate);
        let denominator = (stream.frame_size as u128) * 1_000;
        ((numerator / denominator.max(1)) as usize).max(1)
    }
}

/// Ambient level measured at session start and the speech threshold derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyCalibration {
    pub baseline_level: f32,
    pub derived_threshold: f32,
}

impl EnergyCalibration {
    pub fn from_peaks(peaks: &[u16], floor: f32, multiplier: f32) -> Self {
        let baseline_level = if peaks.is_empty() {
            0.0
        } else {
            peaks.iter().map(|&p| f32::from(p)).sum::<f32>() / peaks.len() as f32
        };
        Self {
            baseline_level,
            derived_threshold: floor.max(baseline_level * multiplier),
        }
    }

    pub fn is_speech(&self, peak: u16) -> bool {
        f32::from(peak) > self.derived_threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VadPhase {
    Calibrating,
    WaitingForSpeech,
    Recording,
    Stopped,
}
