//! Size-capped log files and the crash hook.

use crate::config::AppConfig;
use std::{
    env, fs,
    io::{self, Write},
    panic,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

pub(crate) const LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
const CRASH_LOG_MAX_BYTES: u64 = 256 * 1024;

/// JSON event log; `VOICE_ASSISTANT_LOG_FILE` overrides the temp-dir default.
pub fn log_file_path() -> PathBuf {
    env::var_os("VOICE_ASSISTANT_LOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("voice_assistant.jsonl"))
}

/// Path to the crash log file (metadata only unless content logging is on).
pub fn crash_log_path() -> PathBuf {
    env::temp_dir().join("voice_assistant_crash.log")
}

/// Whether file logging is on for this configuration.
pub fn file_logging_enabled(config: &AppConfig) -> bool {
    config.logs && !config.no_logs
}

/// Append-only file that truncates itself instead of growing past `max_bytes`.
pub struct LogWriter {
    path: PathBuf,
    file: fs::File,
    max_bytes: u64,
    bytes_written: u64,
}

impl LogWriter {
    pub fn open(path: &Path, max_bytes: u64) -> io::Result<Self> {
        let mut bytes_written = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        if bytes_written > max_bytes {
            let _ = fs::remove_file(path);
            bytes_written = 0;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            max_bytes,
            bytes_written,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rotate_if_needed(&mut self, next_len: usize) -> io::Result<()> {
        if self.bytes_written.saturating_add(next_len as u64) <= self.max_bytes {
            return Ok(());
        }
        self.file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.bytes_written = 0;
        Ok(())
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.rotate_if_needed(buf.len())?;
        self.file.write_all(buf)?;
        self.bytes_written = self.bytes_written.saturating_add(buf.len() as u64);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Record panics in the crash log before the default hook prints them.
pub fn install_panic_hook(config: &AppConfig) {
    if !file_logging_enabled(config) {
        return;
    }
    let log_content = config.log_content;
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        write_crash_line(&crash_log_path(), &crash_line(info, log_content));
        previous(info);
    }));
}

fn crash_line(info: &panic::PanicHookInfo<'_>, log_content: bool) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let location = info
        .location()
        .map(|loc| format!("{}:{}", loc.file(), loc.line()))
        .unwrap_or_else(|| "unknown".to_string());
    let payload = if log_content {
        if let Some(text) = info.payload().downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = info.payload().downcast_ref::<String>() {
            text.clone()
        } else {
            "non-string panic payload".to_string()
        }
    } else {
        "panic payload omitted (log-content disabled)".to_string()
    };
    format!(
        "[{timestamp}] panic at {location}: {payload} (v{})\n",
        env!("CARGO_PKG_VERSION")
    )
}

fn write_crash_line(path: &Path, line: &str) {
    if let Ok(mut writer) = LogWriter::open(path, CRASH_LOG_MAX_BYTES) {
        let _ = writer.write_all(line.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_log(name: &str) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        env::temp_dir().join(format!(
            "voice_assistant_test_{}_{n}_{name}",
            std::process::id()
        ))
    }

    #[test]
    fn writer_truncates_when_the_cap_is_reached() {
        let path = temp_log("cap.log");
        let mut writer = LogWriter::open(&path, 16).unwrap();
        writer.write_all(b"0123456789\n").unwrap();
        writer.write_all(b"abcdefghij\n").unwrap();
        writer.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "abcdefghij\n");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn oversized_existing_log_is_discarded_on_open() {
        let path = temp_log("old.log");
        fs::write(&path, vec![b'x'; 64]).unwrap();
        let mut writer = LogWriter::open(&path, 32).unwrap();
        writer.write_all(b"fresh\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn crash_lines_append_to_the_crash_log() {
        let path = temp_log("crash.log");
        write_crash_line(&path, "[1] panic at a.rs:1: omitted\n");
        write_crash_line(&path, "[2] panic at b.rs:2: omitted\n");
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        let _ = fs::remove_file(&path);
    }
}
