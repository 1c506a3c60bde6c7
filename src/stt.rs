//! Speech-to-text adapters.
//!
//! Both adapters are infallible at the [`Transcriber`] boundary: failures are logged and
//! an empty transcript is returned so the interaction loop can answer "didn't hear you".

use crate::assistant::{run_command, Transcriber};
use crate::audio::{downmix_to_mono, Utterance};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

const NON_SPEECH_PATTERN: &str = r"(?i)\[\s*\]|\(\s*\)|\[(?:\s*(?:silence|noise|inaudible|blank_audio|blank audio|music|laughter|applause|cough|breath(?:ing)?|wind|background)\s*)\]|\((?:\s*(?:silence|noise|inaudible|blank audio|music|laughter|applause|cough|breath(?:ing)?|wind|background|wind blowing)\s*)\)";

/// Strip non-speech markers such as `[BLANK_AUDIO]` or `(silence)` and collapse whitespace.
pub fn sanitize_transcript(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    static NON_SPEECH_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = NON_SPEECH_RE.get_or_init(|| match Regex::new(NON_SPEECH_PATTERN) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::error!(error = %err, "non-speech pattern failed to compile");
            None
        }
    });
    let without_markers = match re {
        Some(re) => re.replace_all(trimmed, " "),
        None => trimmed.into(),
    };
    without_markers
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Mono samples for the utterance, downmixing when `channels` says the buffer is interleaved.
fn mono_samples(utterance: &Utterance, channels: u16) -> Vec<i16> {
    let samples = utterance.samples();
    if channels > 1 {
        downmix_to_mono(&samples, usize::from(channels))
    } else {
        samples
    }
}

/// Pipes raw s16le mono PCM into an external command and reads the transcript from stdout.
pub struct CommandTranscriber {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandTranscriber {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self { argv, timeout }
    }
}

impl Transcriber for CommandTranscriber {
    fn transcribe(&self, utterance: &Utterance, channels: u16) -> String {
        let samples = mono_samples(utterance, channels);
        if samples.is_empty() {
            return String::new();
        }
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        match run_command(&self.argv, Some(pcm), self.timeout) {
            Ok(out) => sanitize_transcript(&out),
            Err(err) => {
                tracing::warn!(error = %err, "transcription command failed");
                String::new()
            }
        }
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

#[cfg(feature = "whisper")]
pub use whisper::WhisperTranscriber;

#[cfg(feature = "whisper")]
mod whisper {
    use super::{mono_samples, sanitize_transcript};
    use crate::assistant::Transcriber;
    use crate::audio::Utterance;
    use anyhow::{Context, Result};
    use std::os::raw::{c_char, c_uint, c_void};
    use std::path::Path;
    use std::sync::Once;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    /// In-process whisper.cpp. The model is loaded once and reused for every utterance.
    pub struct WhisperTranscriber {
        ctx: WhisperContext,
        lang: String,
    }

    impl WhisperTranscriber {
        pub fn new(model_path: &Path, lang: &str) -> Result<Self> {
            install_log_silencer();
            let path = model_path
                .to_str()
                .context("whisper model path is not valid UTF-8")?;
            let ctx = WhisperContext::new_with_params(path, WhisperContextParameters::default())
                .with_context(|| format!("failed to load whisper model {}", model_path.display()))?;
            Ok(Self {
                ctx,
                lang: lang.to_string(),
            })
        }

        fn run(&self, samples: &[f32]) -> Result<String> {
            let mut state = self
                .ctx
                .create_state()
                .context("failed to create whisper state")?;
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            if self.lang.eq_ignore_ascii_case("auto") {
                params.set_language(None);
                params.set_detect_language(true);
            } else {
                params.set_language(Some(&self.lang));
                params.set_detect_language(false);
            }
            params.set_n_threads(num_cpus::get().min(4) as i32);
            params.set_print_progress(false);
            params.set_print_timestamps(false);
            params.set_print_special(false);
            params.set_print_realtime(false);
            params.set_translate(false);
            state.full(params, samples).context("whisper inference failed")?;

            let segments = state
                .full_n_segments()
                .context("failed to read whisper segment count")?;
            let mut transcript = String::new();
            for i in 0..segments.max(0) {
                match state.full_get_segment_text_lossy(i) {
                    Ok(text) => transcript.push_str(&text),
                    Err(err) => tracing::debug!(segment = i, error = %err, "whisper segment unreadable"),
                }
            }
            Ok(transcript)
        }
    }

    impl Transcriber for WhisperTranscriber {
        fn transcribe(&self, utterance: &Utterance, channels: u16) -> String {
            let samples: Vec<f32> = mono_samples(utterance, channels)
                .into_iter()
                .map(|s| f32::from(s) / 32_768.0)
                .collect();
            if samples.is_empty() {
                return String::new();
            }
            match self.run(&samples) {
                Ok(text) => sanitize_transcript(&text),
                Err(err) => {
                    tracing::warn!(error = %err, "whisper transcription failed");
                    String::new()
                }
            }
        }

        fn name(&self) -> &'static str {
            "whisper"
        }
    }

    fn install_log_silencer() {
        static INSTALL: Once = Once::new();
        // SAFETY: the callback ignores its arguments and is installed exactly once.
        INSTALL.call_once(|| unsafe {
            whisper_rs::set_log_callback(Some(silent_log_callback), std::ptr::null_mut());
        });
    }

    unsafe extern "C" fn silent_log_callback(
        _level: c_uint,
        _text: *const c_char,
        _user_data: *mut c_void,
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_drops_markers_and_collapses_whitespace() {
        assert_eq!(sanitize_transcript("  [BLANK_AUDIO]  "), "");
        assert_eq!(
            sanitize_transcript("what (silence) time   is [music] it"),
            "what time is it"
        );
        assert_eq!(sanitize_transcript("[ ] hello ( )"), "hello");
    }

    #[test]
    fn sanitize_keeps_ordinary_brackets_content() {
        assert_eq!(sanitize_transcript("call [mom] now"), "call [mom] now");
    }

    #[cfg(unix)]
    #[test]
    fn command_transcriber_pipes_mono_pcm() {
        // Two stereo frames become two mono samples, four bytes of s16le.
        let utterance = Utterance::from_mono_samples(vec![100, 300, -100, -300], 16_000);
        let transcriber = CommandTranscriber::new(
            vec!["sh".to_string(), "-c".to_string(), "wc -c".to_string()],
            Duration::from_secs(5),
        );
        assert_eq!(transcriber.transcribe(&utterance, 2), "4");
        assert_eq!(transcriber.transcribe(&utterance, 1), "8");
    }

    #[cfg(unix)]
    #[test]
    fn command_transcriber_failure_is_empty() {
        let utterance = Utterance::from_mono_samples(vec![1, 2, 3], 16_000);
        let transcriber =
            CommandTranscriber::new(vec!["false".to_string()], Duration::from_secs(5));
        assert_eq!(transcriber.transcribe(&utterance, 1), "");
    }

    #[test]
    fn empty_utterance_skips_the_command() {
        let utterance = Utterance::from_mono_samples(Vec::new(), 16_000);
        let transcriber = CommandTranscriber::new(
            vec!["/definitely/not/a/binary".to_string()],
            Duration::from_secs(1),
        );
        assert_eq!(transcriber.transcribe(&utterance, 1), "");
    }
}
