//! Relays GUI subprocess output into the host's tracing system.

use std::io::{BufRead, BufReader, Read};
use std::thread::{self, JoinHandle};

use crate::errors::{BridgeError, BridgeResult};

/// Level a relayed stream is logged at.
#[derive(Debug, Clone, Copy)]
enum RelayLevel {
    Debug,
    Warn,
}

/// Owns the reader threads draining one subprocess's stdout and stderr.
///
/// Threads exit on their own when the pipes close; [`LogRelay::join`]
/// waits for that, and `Drop` is the safety net when it was never called.
pub(super) struct LogRelay {
    stdout_thread: Option<JoinHandle<()>>,
    stderr_thread: Option<JoinHandle<()>>,
}

impl LogRelay {
    pub(super) fn start(
        stdout: impl Read + Send + 'static,
        stderr: impl Read + Send + 'static,
    ) -> BridgeResult<Self> {
        let stdout_thread =
            spawn_reader(BufReader::new(stdout), "stdout", RelayLevel::Debug)?;
        let stderr_thread = spawn_reader(BufReader::new(stderr), "stderr", RelayLevel::Warn)?;

        Ok(Self {
            stdout_thread: Some(stdout_thread),
            stderr_thread: Some(stderr_thread),
        })
    }

    /// Waits for both readers to drain. Call after the subprocess exited.
    pub(super) fn join(mut self) {
        self.join_all();
    }

    fn join_all(&mut self) {
        if let Some(handle) = self.stdout_thread.take()
            && handle.join().is_err()
        {
            tracing::warn!(target: "gui:stdout", "stdout relay thread panicked");
        }
        if let Some(handle) = self.stderr_thread.take()
            && handle.join().is_err()
        {
            tracing::warn!(target: "gui:stderr", "stderr relay thread panicked");
        }
    }
}

impl Drop for LogRelay {
    fn drop(&mut self) {
        self.join_all();
    }
}

/// One reader thread: lines in, tracing events out, until EOF.
fn spawn_reader<R: BufRead + Send + 'static>(
    reader: R,
    stream_name: &'static str,
    level: RelayLevel,
) -> BridgeResult<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("pyblish-gui-{stream_name}"))
        .spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                let clean = strip_ansi_codes(&line);
                match level {
                    RelayLevel::Debug => tracing::debug!(target: "gui:stdout", "{}", clean),
                    RelayLevel::Warn => tracing::warn!(target: "gui:stderr", "{}", clean),
                }
            }
            tracing::trace!(stream = stream_name, "GUI pipe closed");
        })
        .map_err(|e| {
            BridgeError::Internal(format!(
                "failed to spawn {} relay thread: {}",
                stream_name, e
            ))
        })
}

/// Drops ANSI escape sequences so GUI color output is not re-formatted
/// by the host's own log formatter.
fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\x1b' {
            result.push(c);
            continue;
        }
        if chars.next() == Some('[') {
            // CSI sequences end at the first byte in `@`..=`~`.
            for terminator in chars.by_ref() {
                if ('@'..='~').contains(&terminator) {
                    break;
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(strip_ansi_codes("loading."), "loading.");
    }

    #[test]
    fn color_codes_are_removed() {
        assert_eq!(
            strip_ansi_codes("\x1b[31merror:\x1b[0m boom"),
            "error: boom"
        );
    }

    #[test]
    fn cursor_codes_are_removed() {
        assert_eq!(strip_ansi_codes("a\x1b[2Kb\x1b[1;1Hc"), "abc");
    }

    #[test]
    fn relay_drains_to_eof_and_joins() {
        let stdout = Cursor::new(b"one\ntwo\n".to_vec());
        let stderr = Cursor::new(b"\x1b[33mwarned\x1b[0m\n".to_vec());
        let relay = LogRelay::start(stdout, stderr).unwrap();
        relay.join();
    }
}
