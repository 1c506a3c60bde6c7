pub const DEFAULT_SAMPLE_RATE: u32 = crate::audio::DEFAULT_SAMPLE_RATE;
pub const DEFAULT_FRAME_SIZE: usize = crate::audio::DEFAULT_FRAME_SIZE;
pub const DEFAULT_SILENCE_MS: u64 = 2_000;
pub const DEFAULT_MAX_RECORDING_MS: u64 = 30_000;
pub const DEFAULT_VOLUME_THRESHOLD: f32 = 50.0;
pub const DEFAULT_CALIBRATION_FRAMES: usize = 3;
pub const DEFAULT_CALIBRATION_MULTIPLIER: f32 = 3.0;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;
pub const DEFAULT_LEASE_WAIT_MS: u64 = 5_000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1_000;
pub const DEFAULT_MAX_READ_ERRORS: usize = 5;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
pub const DEFAULT_FALLBACK_DEVICE_INDEX: usize = 0;
pub const DEFAULT_TRIGGER_ENERGY_RATIO: f32 = 3.0;
pub const DEFAULT_TRIGGER_FLOOR: f32 = 500.0;
pub const DEFAULT_STT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_SPEAK_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_AI_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_AI_HISTORY: usize = 10;
pub const DEFAULT_SPEAK_CMD: &str = "espeak -a 200 -s 150";
pub const DEFAULT_WAKE_WORD: &str = "hey pi";

pub(super) const MAX_RECORDING_HARD_LIMIT_MS: u64 = 120_000;
pub(super) const MAX_COMMAND_BYTES: usize = 4 * 1024;
pub(super) const MAX_DEVICE_TOKENS: usize = 16;
pub(super) const ISO_639_1_CODES: &[&str] = &[
    "af", "am", "ar", "az", "be", "bg", "bn", "bs", "ca", "cs", "cy", "da", "de", "el", "en", "es",
    "et", "eu", "fa", "fi", "fil", "fr", "ga", "gl", "gu", "he", "hi", "hr", "hu", "hy", "id",
    "is", "it", "ja", "jv", "ka", "kk", "km", "kn", "ko", "lo", "lt", "lv", "mk", "ml", "mn", "mr",
    "ms", "my", "ne", "nl", "no", "pa", "pl", "pt", "ro", "ru", "si", "sk", "sl", "sq", "sr", "sv",
    "sw", "ta", "te", "th", "tr", "uk", "ur", "vi", "zh",
];
