use super::CommandHandler;
use chrono::{DateTime, Local};

const IDENTITY_RESPONSE: &str = "I am your voice assistant. You can call me Pi Assistant.";
const GREETING_RESPONSE: &str = "Hello! How can I help you today?";
const HELP_RESPONSE: &str = "I can tell you the time and the date, and answer questions. \
     Try saying 'what time is it'.";

/// Built-in small talk: identity, greetings, time, date, and help.
pub struct GeneralCommands {
    now: fn() -> DateTime<Local>,
}

impl Default for GeneralCommands {
    fn default() -> Self {
        Self { now: Local::now }
    }
}

impl GeneralCommands {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn with_clock(now: fn() -> DateTime<Local>) -> Self {
        Self { now }
    }
}

fn has_word(words: &[&str], needle: &str) -> bool {
    words.iter().any(|word| *word == needle)
}

impl CommandHandler for GeneralCommands {
    fn handle(&self, text: &str) -> Option<String> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|ch: char| !ch.is_alphanumeric() && ch != '\'')
            .filter(|word| !word.is_empty())
            .collect();

        if lowered.contains("your name") || lowered.contains("who are you") {
            return Some(IDENTITY_RESPONSE.to_string());
        }
        if ["hello", "hi", "hey"].iter().any(|w| has_word(&words, w)) {
            return Some(GREETING_RESPONSE.to_string());
        }
        if has_word(&words, "time") {
            let now = (self.now)();
            return Some(format!("The time is {}.", now.format("%H:%M")));
        }
        if has_word(&words, "date") || lowered.contains("what day is it") {
            let now = (self.now)();
            return Some(format!("Today is {}.", now.format("%A, %B %d, %Y")));
        }
        if has_word(&words, "help") || lowered.contains("what can you do") {
            return Some(HELP_RESPONSE.to_string());
        }
        None
    }

    fn name(&self) -> &'static str {
        "general"
    }
}
