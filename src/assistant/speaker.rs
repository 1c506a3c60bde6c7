use super::{run_command, Speaker};
use std::time::Duration;

/// Speaks by running an external TTS command with the text as its final argument.
pub struct CommandSpeaker {
    label: String,
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandSpeaker {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        let label = argv.first().cloned().unwrap_or_else(|| "tts".to_string());
        Self {
            label,
            argv,
            timeout,
        }
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return true;
        }
        let mut argv = self.argv.clone();
        argv.push(text.to_string());
        match run_command(&argv, None, self.timeout) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(engine = %self.label, error = %err, "speech engine failed");
                false
            }
        }
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Tries each engine in order until one succeeds.
#[derive(Default)]
pub struct SpeakerChain {
    engines: Vec<Box<dyn Speaker>>,
}

impl SpeakerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, engine: impl Speaker + 'static) -> Self {
        self.engines.push(Box::new(engine));
        self
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl Speaker for SpeakerChain {
    fn speak(&self, text: &str) -> bool {
        for engine in &self.engines {
            if engine.speak(text) {
                return true;
            }
            tracing::debug!(engine = engine.name(), "falling back to next speech engine");
        }
        false
    }

    fn name(&self) -> &str {
        "chain"
    }
}
