use anyhow::{anyhow, bail, Context, Result};
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Run `argv` without a shell, optionally feeding `input` on stdin, and return stdout.
///
/// The child is killed once `timeout` elapses. A non-zero exit status is an error that
/// carries the trimmed stderr.
pub fn run_command(argv: &[String], input: Option<Vec<u8>>, timeout: Duration) -> Result<String> {
    let Some((program, args)) = argv.split_first() else {
        bail!("command must not be empty");
    };
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to run '{program}'"))?;

    // Pipes are drained on helper threads so a chatty child cannot block on a full pipe.
    let writer = match (child.stdin.take(), input) {
        (Some(mut stdin), Some(bytes)) => Some(thread::spawn(move || {
            let _ = stdin.write_all(&bytes);
        })),
        _ => None,
    };
    let mut stdout = child
        .stdout
        .take()
        .with_context(|| format!("failed to capture '{program}' stdout"))?;
    let mut stderr = child
        .stderr
        .take()
        .with_context(|| format!("failed to capture '{program}' stderr"))?;
    let stdout_reader = thread::spawn(move || {
        let mut out = Vec::new();
        stdout.read_to_end(&mut out).map(|_| out)
    });
    let stderr_reader = thread::spawn(move || {
        let mut err = Vec::new();
        let _ = stderr.read_to_end(&mut err);
        err
    });

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if started.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                bail!("'{program}' timed out after {timeout:?}");
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => return Err(anyhow!("'{program}' wait failed: {err}")),
        }
    };

    if let Some(writer) = writer {
        let _ = writer.join();
    }
    let stdout_bytes = stdout_reader
        .join()
        .map_err(|_| anyhow!("'{program}' stdout reader panicked"))?
        .with_context(|| format!("failed to read '{program}' stdout"))?;
    let stderr_bytes = stderr_reader.join().unwrap_or_default();

    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr_bytes);
        bail!("'{program}' failed with status {status}: {}", stderr.trim());
    }
    tracing::trace!(
        program = %program,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "command finished"
    );
    Ok(String::from_utf8_lossy(&stdout_bytes).into_owned())
}
