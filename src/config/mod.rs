//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

pub use defaults::{
    DEFAULT_AI_HISTORY, DEFAULT_AI_TIMEOUT_MS, DEFAULT_CALIBRATION_FRAMES,
    DEFAULT_CALIBRATION_MULTIPLIER, DEFAULT_FALLBACK_DEVICE_INDEX, DEFAULT_FRAME_SIZE,
    DEFAULT_LEASE_WAIT_MS, DEFAULT_MAX_READ_ERRORS, DEFAULT_MAX_RECORDING_MS,
    DEFAULT_READ_TIMEOUT_MS, DEFAULT_RETRY_BACKOFF_MS, DEFAULT_SAMPLE_RATE,
    DEFAULT_SETTLE_DELAY_MS, DEFAULT_SILENCE_MS, DEFAULT_SPEAK_CMD, DEFAULT_SPEAK_TIMEOUT_MS,
    DEFAULT_STT_TIMEOUT_MS, DEFAULT_TRIGGER_ENERGY_RATIO, DEFAULT_TRIGGER_FLOOR,
    DEFAULT_VOLUME_THRESHOLD, DEFAULT_WAKE_WORD,
};

/// CLI options for the voice assistant. Validated values keep downstream subprocesses safe.
#[derive(Debug, Parser, Clone)]
#[command(about = "Wake-word voice assistant", author, version)]
pub struct AppConfig {
    /// Input device index to prefer over the name heuristics
    #[arg(long = "input-device-index", env = "VOICE_ASSISTANT_INPUT_DEVICE")]
    pub input_device_index: Option<usize>,

    /// Device index tried before the system default when everything else fails
    #[arg(long = "fallback-device-index", default_value_t = DEFAULT_FALLBACK_DEVICE_INDEX)]
    pub fallback_device_index: usize,

    /// Name fragment identifying preferred microphone hardware (repeatable)
    #[arg(
        long = "hardware-token",
        action = ArgAction::Append,
        value_name = "TOKEN",
        default_values = ["seeed", "respeaker"]
    )]
    pub hardware_tokens: Vec<String>,

    /// Name fragment identifying an audio server endpoint (repeatable)
    #[arg(
        long = "audio-server-token",
        action = ArgAction::Append,
        value_name = "TOKEN",
        default_values = ["pulse"]
    )]
    pub audio_server_tokens: Vec<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Emit machine-readable JSON where supported
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Capture sample rate (Hz)
    #[arg(long = "sample-rate", default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Samples per channel in one capture frame
    #[arg(long = "frame-size", default_value_t = DEFAULT_FRAME_SIZE)]
    pub frame_size: usize,

    /// Trailing silence that ends a recording (milliseconds)
    #[arg(long = "silence-ms", default_value_t = DEFAULT_SILENCE_MS)]
    pub silence_ms: u64,

    /// Hard cap on one recording (milliseconds)
    #[arg(long = "max-recording-ms", default_value_t = DEFAULT_MAX_RECORDING_MS)]
    pub max_recording_ms: u64,

    /// Minimum peak amplitude treated as speech (16-bit scale)
    #[arg(long = "volume-threshold", default_value_t = DEFAULT_VOLUME_THRESHOLD)]
    pub volume_threshold: f32,

    /// Frames sampled at the start of each recording to measure ambient noise
    #[arg(long = "calibration-frames", default_value_t = DEFAULT_CALIBRATION_FRAMES)]
    pub calibration_frames: usize,

    /// Ambient level multiplier used to derive the speech threshold
    #[arg(
        long = "calibration-multiplier",
        default_value_t = DEFAULT_CALIBRATION_MULTIPLIER
    )]
    pub calibration_multiplier: f32,

    /// Pause between closing one capture stream and opening the next (milliseconds)
    #[arg(long = "settle-delay-ms", default_value_t = DEFAULT_SETTLE_DELAY_MS)]
    pub settle_delay_ms: u64,

    /// How long to wait for the capture device to be released (milliseconds)
    #[arg(long = "lease-wait-ms", default_value_t = DEFAULT_LEASE_WAIT_MS)]
    pub lease_wait_ms: u64,

    /// Per-frame read timeout before a degraded frame is substituted (milliseconds)
    #[arg(long = "read-timeout-ms", default_value_t = DEFAULT_READ_TIMEOUT_MS)]
    pub read_timeout_ms: u64,

    /// Consecutive read failures that end a recording early
    #[arg(long = "max-read-errors", default_value_t = DEFAULT_MAX_READ_ERRORS)]
    pub max_read_errors: usize,

    /// Back-off after a failed trigger wait (milliseconds)
    #[arg(long = "retry-backoff-ms", default_value_t = DEFAULT_RETRY_BACKOFF_MS)]
    pub retry_backoff_ms: u64,

    /// Trigger model: `energy` fires on any loud sound over the ambient level;
    /// `keyword` listens for the wake phrase
    #[arg(long = "trigger-engine", value_enum, default_value_t = TriggerEngine::Energy)]
    pub trigger_engine: TriggerEngine,

    /// Wake phrase accepted by the keyword trigger (repeatable)
    #[arg(
        long = "wake-word",
        action = ArgAction::Append,
        value_name = "PHRASE",
        default_values = [DEFAULT_WAKE_WORD]
    )]
    pub wake_words: Vec<String>,

    /// Energy spike over the running average that fires the trigger
    #[arg(long = "trigger-energy-ratio", default_value_t = DEFAULT_TRIGGER_ENERGY_RATIO)]
    pub trigger_energy_ratio: f32,

    /// Minimum RMS level the trigger reacts to (16-bit scale)
    #[arg(long = "trigger-floor", default_value_t = DEFAULT_TRIGGER_FLOOR)]
    pub trigger_floor: f32,

    /// Speech-to-text implementation
    #[arg(long, value_enum, default_value_t = TranscriberKind::Command)]
    pub transcriber: TranscriberKind,

    /// Command that reads s16le mono PCM on stdin and prints the transcript
    #[arg(long = "stt-cmd", env = "VOICE_ASSISTANT_STT_CMD")]
    pub stt_cmd: Option<String>,

    /// Whisper model path (required for --transcriber whisper)
    #[arg(long = "whisper-model-path")]
    pub whisper_model_path: Option<PathBuf>,

    /// Language passed to the transcriber
    #[arg(long, default_value = "en")]
    pub lang: String,

    /// Transcription timeout (milliseconds)
    #[arg(long = "stt-timeout-ms", default_value_t = DEFAULT_STT_TIMEOUT_MS)]
    pub stt_timeout_ms: u64,

    /// Text-to-speech command; the response is passed as the final argument
    #[arg(long = "speak-cmd", env = "VOICE_ASSISTANT_SPEAK_CMD", default_value = DEFAULT_SPEAK_CMD)]
    pub speak_cmd: String,

    /// Text-to-speech command tried when earlier engines fail (repeatable, in order)
    #[arg(long = "fallback-speak-cmd", action = ArgAction::Append, value_name = "CMD")]
    pub fallback_speak_cmds: Vec<String>,

    /// Text-to-speech timeout (milliseconds)
    #[arg(long = "speak-timeout-ms", default_value_t = DEFAULT_SPEAK_TIMEOUT_MS)]
    pub speak_timeout_ms: u64,

    /// AI command consulted for open-ended questions; the query is the final argument and
    /// recent exchanges arrive on stdin
    #[arg(long = "ai-cmd", env = "VOICE_ASSISTANT_AI_CMD")]
    pub ai_cmd: Option<String>,

    /// AI command timeout (milliseconds)
    #[arg(long = "ai-timeout-ms", default_value_t = DEFAULT_AI_TIMEOUT_MS)]
    pub ai_timeout_ms: u64,

    /// Question/answer exchanges remembered for the AI command (0 disables)
    #[arg(long = "ai-history", default_value_t = DEFAULT_AI_HISTORY)]
    pub ai_history: usize,

    /// Enable JSON file logging
    #[arg(long = "logs", env = "VOICE_ASSISTANT_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "VOICE_ASSISTANT_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow transcripts and responses in logs
    #[arg(
        long = "log-content",
        env = "VOICE_ASSISTANT_LOG_CONTENT",
        default_value_t = false
    )]
    pub log_content: bool,

    /// Verbosity of the console log
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

/// Tunable parameters for device arbitration and recording.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturePipelineConfig {
    pub sample_rate: u32,
    pub frame_size: usize,
    pub silence_ms: u64,
    pub max_recording_ms: u64,
    pub volume_threshold: f32,
    pub calibration_frames: usize,
    pub calibration_multiplier: f32,
    pub settle_delay_ms: u64,
    pub lease_wait_ms: u64,
    pub read_timeout_ms: u64,
    pub max_read_errors: usize,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TriggerEngine {
    /// Fire on a burst of energy over the ambient level
    Energy,
    /// Transcribe short speech bursts and match the wake phrase
    Keyword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TranscriberKind {
    Command,
    Whisper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> tracing::level_filters::LevelFilter {
        use tracing::level_filters::LevelFilter;
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}
