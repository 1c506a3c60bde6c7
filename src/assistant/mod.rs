//! Capabilities the interaction loop dispatches to once audio has been captured.
//!
//! Every capability is infallible at its boundary: transcribers return an empty string,
//! speakers return `false`, and handlers return `None` instead of surfacing errors.

mod general;
mod process;
mod responder;
mod speaker;

use crate::audio::Utterance;
use std::sync::Arc;

pub use general::GeneralCommands;
pub use process::run_command;
pub use responder::{looks_like_question, CommandResponder};
pub use speaker::{CommandSpeaker, SpeakerChain};

/// Spoken when transcription produced nothing usable.
pub const DIDNT_HEAR_RESPONSE: &str = "Sorry, I didn't hear you clearly.";

/// Spoken when no handler and no AI responder produced an answer.
pub const DIDNT_UNDERSTAND_RESPONSE: &str = "Sorry, I didn't understand that command.";

/// Speech-to-text. Failures are logged by the implementation and yield `""`.
pub trait Transcriber: Send + Sync {
    /// `channels` is the interleaved layout of `utterance.samples()`.
    fn transcribe(&self, utterance: &Utterance, channels: u16) -> String;

    fn name(&self) -> &'static str;
}

/// Text-to-speech. Returns `false` when the text could not be spoken.
pub trait Speaker: Send + Sync {
    fn speak(&self, text: &str) -> bool;

    fn name(&self) -> &str;
}

/// One entry in the handler chain.
pub trait CommandHandler: Send + Sync {
    fn handle(&self, text: &str) -> Option<String>;

    fn name(&self) -> &'static str;
}

/// Open-ended fallback consulted when no handler matched.
pub trait AiResponder: Send + Sync {
    fn should_handle(&self, text: &str) -> bool;

    fn respond(&self, text: &str) -> Option<String>;
}

/// Ordered handlers; the first non-empty response wins.
#[derive(Default)]
pub struct HandlerChain {
    handlers: Vec<Box<dyn CommandHandler>>,
}

impl HandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn push(&mut self, handler: Box<dyn CommandHandler>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn dispatch(&self, text: &str) -> Option<String> {
        self.handlers.iter().find_map(|handler| {
            let response = handler.handle(text)?;
            if response.trim().is_empty() {
                return None;
            }
            tracing::debug!(handler = handler.name(), "handler matched");
            Some(response)
        })
    }
}

/// Everything one interaction cycle needs besides the microphone.
pub struct AssistantContext {
    pub transcriber: Arc<dyn Transcriber>,
    pub handlers: HandlerChain,
    pub ai: Option<Box<dyn AiResponder>>,
    pub speaker: Box<dyn Speaker>,
    /// Allow transcripts and responses in log events.
    pub log_content: bool,
}

impl AssistantContext {
    /// Turn a transcript into the response to speak.
    pub fn respond(&self, text: &str) -> String {
        let text = text.trim();
        if text.is_empty() {
            return DIDNT_HEAR_RESPONSE.to_string();
        }
        if let Some(response) = self.handlers.dispatch(text) {
            return response;
        }
        if let Some(ai) = &self.ai {
            if ai.should_handle(text) {
                match ai.respond(text) {
                    Some(response) if !response.trim().is_empty() => return response,
                    _ => tracing::debug!("ai responder produced no answer"),
                }
            }
        }
        DIDNT_UNDERSTAND_RESPONSE.to_string()
    }

    pub fn speak(&self, text: &str) -> bool {
        let spoken = self.speaker.speak(text);
        if !spoken {
            self.log_unspoken(text);
        }
        spoken
    }

    fn log_unspoken(&self, text: &str) {
        if self.log_content {
            tracing::warn!(text, "response could not be spoken");
        } else {
            tracing::warn!(chars = text.chars().count(), "response could not be spoken");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{AiResponder, CommandHandler, Speaker, Transcriber};
    use crate::audio::Utterance;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Returns queued transcripts in order, then `""`.
    #[derive(Default)]
    pub(crate) struct ScriptedTranscriber {
        pub(crate) replies: Mutex<VecDeque<String>>,
        pub(crate) calls: Mutex<Vec<(usize, u16)>>,
    }

    impl ScriptedTranscriber {
        pub(crate) fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl Transcriber for ScriptedTranscriber {
        fn transcribe(&self, utterance: &Utterance, channels: u16) -> String {
            self.calls
                .lock()
                .unwrap()
                .push((utterance.samples().len(), channels));
            self.replies.lock().unwrap().pop_front().unwrap_or_default()
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    #[derive(Clone, Default)]
    pub(crate) struct RecordingSpeaker {
        pub(crate) spoken: Arc<Mutex<Vec<String>>>,
        pub(crate) fail: bool,
    }

    impl Speaker for RecordingSpeaker {
        fn speak(&self, text: &str) -> bool {
            if self.fail {
                return false;
            }
            self.spoken.lock().unwrap().push(text.to_string());
            true
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    pub(crate) struct Echo(pub(crate) &'static str);

    impl CommandHandler for Echo {
        fn handle(&self, text: &str) -> Option<String> {
            text.contains(self.0).then(|| format!("{}: {text}", self.0))
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    pub(crate) struct FixedAi {
        pub(crate) accept: bool,
        pub(crate) answer: Option<&'static str>,
    }

    impl AiResponder for FixedAi {
        fn should_handle(&self, _text: &str) -> bool {
            self.accept
        }

        fn respond(&self, _text: &str) -> Option<String> {
            self.answer.map(str::to_string)
        }
    }
}
