use crate::error::{PulseError, Result};
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Run `cmd` to completion and return its stdout, killing it once `timeout`
/// has elapsed.
///
/// Both pipes are drained on background threads so a chatty child cannot
/// block on a full pipe while we wait for it.
pub fn run_with_timeout(mut cmd: Command, timeout: Duration, what: &str) -> Result<String> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| PulseError::GitCommand(format!("failed to start {what}: {e}")))?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let started = Instant::now();
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None if started.elapsed() >= timeout => {
                tracing::warn!(%what, ?timeout, "killing child process");
                let _ = child.kill();
                let _ = child.wait();
                return Err(PulseError::Timeout {
                    what: what.to_string(),
                    after: timeout,
                });
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    let out = join(stdout);
    let err = join(stderr);
    tracing::debug!(%what, elapsed = ?started.elapsed(), bytes = out.len(), "child exited");

    if !status.success() {
        let code = status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        return Err(PulseError::GitCommand(format!(
            "{what} exited with {code}: {}",
            String::from_utf8_lossy(&err).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn join(handle: Option<thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}
