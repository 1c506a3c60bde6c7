use super::defaults::{
    ISO_639_1_CODES, MAX_COMMAND_BYTES, MAX_DEVICE_TOKENS, MAX_RECORDING_HARD_LIMIT_MS,
};
use super::{AppConfig, CapturePipelineConfig, TranscriberKind, TriggerEngine};
use crate::audio::{ArbiterConfig, DevicePolicy, VadConfig};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::time::Duration;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize paths.
    pub fn validate(&mut self) -> Result<()> {
        if !(8_000..=48_000).contains(&self.sample_rate) {
            bail!(
                "--sample-rate must be between 8000 and 48000 Hz, got {}",
                self.sample_rate
            );
        }
        if !(64..=8_192).contains(&self.frame_size) {
            bail!(
                "--frame-size must be between 64 and 8192 samples, got {}",
                self.frame_size
            );
        }
        if self.max_recording_ms == 0 || self.max_recording_ms > MAX_RECORDING_HARD_LIMIT_MS {
            bail!(
                "--max-recording-ms must be between 1 and {MAX_RECORDING_HARD_LIMIT_MS} ms, got {}",
                self.max_recording_ms
            );
        }
        if self.silence_ms < 100 || self.silence_ms > self.max_recording_ms {
            bail!(
                "--silence-ms must be >=100 and <= --max-recording-ms ({})",
                self.max_recording_ms
            );
        }
        if !(0.0..=f32::from(i16::MAX)).contains(&self.volume_threshold) {
            bail!(
                "--volume-threshold must be between 0 and 32767, got {}",
                self.volume_threshold
            );
        }
        if self.calibration_frames > 50 {
            bail!(
                "--calibration-frames must be between 0 and 50, got {}",
                self.calibration_frames
            );
        }
        if !(1.0..=20.0).contains(&self.calibration_multiplier) {
            bail!(
                "--calibration-multiplier must be between 1.0 and 20.0, got {}",
                self.calibration_multiplier
            );
        }
        if self.settle_delay_ms > 5_000 {
            bail!(
                "--settle-delay-ms must be at most 5000, got {}",
                self.settle_delay_ms
            );
        }
        if !(100..=60_000).contains(&self.lease_wait_ms) {
            bail!(
                "--lease-wait-ms must be between 100 and 60000, got {}",
                self.lease_wait_ms
            );
        }
        if !(10..=10_000).contains(&self.read_timeout_ms) {
            bail!(
                "--read-timeout-ms must be between 10 and 10000, got {}",
                self.read_timeout_ms
            );
        }
        if !(1..=100).contains(&self.max_read_errors) {
            bail!(
                "--max-read-errors must be between 1 and 100, got {}",
                self.max_read_errors
            );
        }
        if self.retry_backoff_ms > 60_000 {
            bail!(
                "--retry-backoff-ms must be at most 60000, got {}",
                self.retry_backoff_ms
            );
        }
        if !(1.0..=100.0).contains(&self.trigger_energy_ratio) {
            bail!(
                "--trigger-energy-ratio must be between 1.0 and 100.0, got {}",
                self.trigger_energy_ratio
            );
        }
        if !(0.0..=f32::from(i16::MAX)).contains(&self.trigger_floor) {
            bail!(
                "--trigger-floor must be between 0 and 32767, got {}",
                self.trigger_floor
            );
        }
        for (flag, value) in [
            ("--stt-timeout-ms", self.stt_timeout_ms),
            ("--speak-timeout-ms", self.speak_timeout_ms),
            ("--ai-timeout-ms", self.ai_timeout_ms),
        ] {
            if !(100..=300_000).contains(&value) {
                bail!("{flag} must be between 100 and 300000, got {value}");
            }
        }

        self.hardware_tokens = normalize_tokens(&self.hardware_tokens, "--hardware-token")?;
        self.audio_server_tokens =
            normalize_tokens(&self.audio_server_tokens, "--audio-server-token")?;
        self.wake_words = normalize_tokens(&self.wake_words, "--wake-word")?;
        if self.trigger_engine == TriggerEngine::Keyword && self.wake_words.is_empty() {
            bail!("--trigger-engine keyword needs at least one --wake-word");
        }

        validate_command(&self.speak_cmd, "--speak-cmd")?;
        for cmd in &self.fallback_speak_cmds {
            validate_command(cmd, "--fallback-speak-cmd")?;
        }
        if let Some(cmd) = &self.stt_cmd {
            validate_command(cmd, "--stt-cmd")?;
        }
        if let Some(cmd) = &self.ai_cmd {
            validate_command(cmd, "--ai-cmd")?;
        }

        match self.transcriber {
            TranscriberKind::Command => {
                if self.trigger_engine == TriggerEngine::Keyword && self.stt_cmd.is_none() {
                    bail!("--trigger-engine keyword with --transcriber command needs --stt-cmd");
                }
            }
            TranscriberKind::Whisper => {
                #[cfg(not(feature = "whisper"))]
                {
                    bail!("--transcriber whisper requires building with the 'whisper' feature");
                }
                #[cfg(feature = "whisper")]
                {
                    let Some(model) = &mut self.whisper_model_path else {
                        bail!("--transcriber whisper requires --whisper-model-path");
                    };
                    // Store a canonical absolute path for the model loader.
                    *model = model.canonicalize().with_context(|| {
                        format!("whisper model path '{}' does not exist", model.display())
                    })?;
                }
            }
        }
        if let Some(model) = &self.whisper_model_path {
            if !model.exists() {
                bail!("whisper model path '{}' does not exist", model.display());
            }
        }

        if self.lang.trim().is_empty() {
            bail!("--lang must not be empty");
        }
        if !self.lang.eq_ignore_ascii_case("auto") {
            if !self
                .lang
                .chars()
                .all(|ch| ch.is_ascii_alphabetic() || ch == '-' || ch == '_')
            {
                bail!("--lang must contain only alphabetic characters or '-'/'_' separators");
            }
            // Allow locale-style values but only check the leading ISO-639-1 code.
            let lang_primary = self
                .lang
                .split(['-', '_'])
                .next()
                .unwrap_or("")
                .to_ascii_lowercase();
            if !ISO_639_1_CODES.contains(&lang_primary.as_str()) {
                bail!(
                    "--lang must start with a valid ISO-639-1 code or be 'auto', got '{}'",
                    self.lang
                );
            }
        }

        Ok(())
    }

    /// Snapshot the CLI-controlled capture settings for downstream consumers.
    pub fn capture_pipeline_config(&self) -> CapturePipelineConfig {
        CapturePipelineConfig {
            sample_rate: self.sample_rate,
            frame_size: self.frame_size,
            silence_ms: self.silence_ms,
            max_recording_ms: self.max_recording_ms,
            volume_threshold: self.volume_threshold,
            calibration_frames: self.calibration_frames,
            calibration_multiplier: self.calibration_multiplier,
            settle_delay_ms: self.settle_delay_ms,
            lease_wait_ms: self.lease_wait_ms,
            read_timeout_ms: self.read_timeout_ms,
            max_read_errors: self.max_read_errors,
            retry_backoff_ms: self.retry_backoff_ms,
        }
    }

    pub fn device_policy(&self) -> DevicePolicy {
        DevicePolicy {
            preferred_index: self.input_device_index,
            hardware_tokens: self.hardware_tokens.clone(),
            audio_server_tokens: self.audio_server_tokens.clone(),
            fallback_index: self.fallback_device_index,
        }
    }

    /// Split a validated command line into program and arguments.
    pub fn command_argv(value: &str) -> Result<Vec<String>> {
        let argv = shell_words::split(value)
            .map_err(|err| anyhow!("failed to parse command '{value}': {err}"))?;
        if argv.is_empty() {
            bail!("command must not be empty");
        }
        Ok(argv)
    }
}

impl From<&CapturePipelineConfig> for ArbiterConfig {
    fn from(cfg: &CapturePipelineConfig) -> Self {
        Self {
            settle_delay: Duration::from_millis(cfg.settle_delay_ms),
            lease_wait: Duration::from_millis(cfg.lease_wait_ms),
        }
    }
}

impl CapturePipelineConfig {
    pub fn vad_config(&self) -> VadConfig {
        VadConfig::from(self)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Trim, lowercase, and dedupe name tokens; empty entries are dropped.
pub(super) fn normalize_tokens(values: &[String], flag: &str) -> Result<Vec<String>> {
    let mut tokens: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let token = value.trim().to_lowercase();
        if token.is_empty() || tokens.contains(&token) {
            continue;
        }
        if token.len() > 64 || token.chars().any(char::is_control) {
            bail!("{flag} values must be <=64 characters with no control characters");
        }
        tokens.push(token);
    }
    if tokens.len() > MAX_DEVICE_TOKENS {
        bail!(
            "{flag} repeated too many times (max {MAX_DEVICE_TOKENS}, got {})",
            tokens.len()
        );
    }
    Ok(tokens)
}

/// Commands are split with shell quoting rules but never run through a shell.
pub(super) fn validate_command(value: &str, flag: &str) -> Result<()> {
    if value.len() > MAX_COMMAND_BYTES {
        bail!("{flag} exceeds {MAX_COMMAND_BYTES} bytes");
    }
    if value.chars().any(|ch| matches!(ch, '\n' | '\r' | '\0')) {
        bail!("{flag} must be a single line");
    }
    AppConfig::command_argv(value).with_context(|| format!("invalid {flag}"))?;
    Ok(())
}
