use super::{run_command, AiResponder};
use crate::lock_or_recover;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::Mutex;
use std::time::Duration;

/// Exchanges remembered between queries.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
/// Most recent exchanges replayed to the AI command with each query.
const HISTORY_REPLAYED: usize = 5;

const HARDWARE_PHRASES: &[&str] = &["turn on", "turn off", "light", "led", "play music", "weather"];

const QUESTION_PHRASES: &[&str] = &[
    "what is",
    "how do",
    "why",
    "tell me",
    "explain",
    "calculate",
    "my name",
    "remember",
    "do you know",
    "who am i",
    "what am i",
];

/// Whether an unmatched transcript reads like an open question rather than a device command.
pub fn looks_like_question(text: &str) -> bool {
    let lowered = text.to_lowercase();
    if HARDWARE_PHRASES.iter().any(|p| lowered.contains(p)) {
        return false;
    }
    if QUESTION_PHRASES.iter().any(|p| lowered.contains(p)) {
        return true;
    }
    lowered.split_whitespace().count() > 3
}

/// Asks an external AI command line tool, passing the query as its final argument.
///
/// Recent exchanges are written to the command's stdin as `User:`/`Assistant:` lines so
/// follow-ups such as "what is my name" can see earlier turns.
pub struct CommandResponder {
    argv: Vec<String>,
    timeout: Duration,
    history: Mutex<VecDeque<Exchange>>,
    history_limit: usize,
}

#[derive(Debug, Clone)]
struct Exchange {
    user: String,
    assistant: String,
}

impl CommandResponder {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self {
            argv,
            timeout,
            history: Mutex::new(VecDeque::new()),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Keep at most `limit` exchanges; zero disables the memory.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn history_len(&self) -> usize {
        lock_or_recover(&self.history, "ai history").len()
    }

    pub fn clear_history(&self) {
        lock_or_recover(&self.history, "ai history").clear();
    }

    fn transcript(&self) -> Option<Vec<u8>> {
        let history = lock_or_recover(&self.history, "ai history");
        if history.is_empty() {
            return None;
        }
        let mut out = String::new();
        for exchange in history.iter().skip(history.len().saturating_sub(HISTORY_REPLAYED)) {
            let _ = writeln!(out, "User: {}", exchange.user);
            let _ = writeln!(out, "Assistant: {}", exchange.assistant);
        }
        Some(out.into_bytes())
    }

    fn remember(&self, user: &str, assistant: &str) {
        if self.history_limit == 0 {
            return;
        }
        let mut history = lock_or_recover(&self.history, "ai history");
        history.push_back(Exchange {
            user: user.to_string(),
            assistant: assistant.to_string(),
        });
        while history.len() > self.history_limit {
            history.pop_front();
        }
    }
}

impl AiResponder for CommandResponder {
    fn should_handle(&self, text: &str) -> bool {
        looks_like_question(text)
    }

    fn respond(&self, text: &str) -> Option<String> {
        let mut argv = self.argv.clone();
        argv.push(text.to_string());
        match run_command(&argv, self.transcript(), self.timeout) {
            Ok(out) => {
                let answer = out.trim();
                if answer.is_empty() {
                    return None;
                }
                self.remember(text, answer);
                Some(answer.to_string())
            }
            Err(err) => {
                tracing::warn!(error = %err, "ai responder failed");
                None
            }
        }
    }
}
