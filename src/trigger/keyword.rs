use super::TriggerModel;
use crate::assistant::Transcriber;
use crate::audio::{rms_level, Utterance};
use std::sync::Arc;
use std::time::Duration;

const MIN_SPEECH: Duration = Duration::from_millis(300);
const TRAILING_SILENCE: Duration = Duration::from_millis(500);
const MAX_SEGMENT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Idle,
    Speech,
}

/// Wake-word trigger: cut speech segments on energy, transcribe them, and look for one
/// of the configured phrases in the text.
pub struct KeywordTrigger {
    transcriber: Arc<dyn Transcriber>,
    wake_words: Vec<String>,
    sample_rate: u32,
    frame_length: usize,
    floor: f32,
    segment: Segment,
    buffer: Vec<i16>,
    voiced_samples: usize,
    silent_samples: usize,
}

impl KeywordTrigger {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        wake_words: Vec<String>,
        sample_rate: u32,
        frame_length: usize,
        floor: f32,
    ) -> Self {
        let wake_words = wake_words
            .into_iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>();
        tracing::debug!(?wake_words, "keyword trigger ready");
        Self {
            transcriber,
            wake_words,
            sample_rate,
            frame_length,
            floor,
            segment: Segment::Idle,
            buffer: Vec::new(),
            voiced_samples: 0,
            silent_samples: 0,
        }
    }

    pub fn wake_words(&self) -> &[String] {
        &self.wake_words
    }

    fn samples_for(&self, duration: Duration) -> usize {
        (duration.as_millis() as u64 * u64::from(self.sample_rate) / 1000) as usize
    }

    fn matches(&self, transcript: &str) -> bool {
        let lowered = transcript.to_lowercase();
        self.wake_words.iter().any(|w| lowered.contains(w.as_str()))
    }

    fn verify_segment(&mut self) -> bool {
        let samples = std::mem::take(&mut self.buffer);
        let utterance = Utterance::from_mono_samples(samples, self.sample_rate);
        let transcript = self.transcriber.transcribe(&utterance, 1);
        let matched = self.matches(&transcript);
        if matched {
            tracing::info!(transcriber = self.transcriber.name(), "wake word heard");
        } else {
            tracing::debug!(chars = transcript.chars().count(), "segment had no wake word");
        }
        self.reset();
        matched
    }
}

impl TriggerModel for KeywordTrigger {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn process(&mut self, frame: &[i16]) -> bool {
        let voiced = rms_level(frame) > self.floor;
        match self.segment {
            Segment::Idle => {
                if voiced {
                    self.segment = Segment::Speech;
                    self.buffer.extend_from_slice(frame);
                    self.voiced_samples = frame.len();
                    self.silent_samples = 0;
                }
                false
            }
            Segment::Speech => {
                self.buffer.extend_from_slice(frame);
                if voiced {
                    self.voiced_samples += frame.len();
                    self.silent_samples = 0;
                } else {
                    self.silent_samples += frame.len();
                }

                let ended = self.silent_samples >= self.samples_for(TRAILING_SILENCE);
                let too_long = self.buffer.len() >= self.samples_for(MAX_SEGMENT);
                if !(ended || too_long) {
                    return false;
                }
                if self.voiced_samples < self.samples_for(MIN_SPEECH) {
                    tracing::trace!(voiced = self.voiced_samples, "segment too short");
                    self.reset();
                    return false;
                }
                self.verify_segment()
            }
        }
    }

    fn reset(&mut self) {
        self.segment = Segment::Idle;
        self.buffer.clear();
        self.voiced_samples = 0;
        self.silent_samples = 0;
    }
}
