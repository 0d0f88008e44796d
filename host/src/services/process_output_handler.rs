//! Helper to handle worker stdout/stderr output
//!
//! Worker output is always piped and re-emitted as log lines tagged with the
//! worker's name. A read error means the pipe went away with the process, so
//! the forwarder just stops.

use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

use shared::{process_info, process_warn};

/// Pipe stdout/stderr so the host owns the worker's output
pub fn configure_child_stdio(cmd: &mut Command) {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).stdin(Stdio::null());
}

/// Spawn one forwarding task per piped stream
pub fn spawn_output_forwarders(child: &mut Child, worker: &str) {
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, worker.to_string(), Stream::Stdout));
    }

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, worker.to_string(), Stream::Stderr));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

async fn forward_lines<R>(stream: R, worker: String, kind: Stream) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let mut forwarded = 0;

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match kind {
            Stream::Stdout => process_info!(worker, "{}", line),
            Stream::Stderr => process_warn!(worker, "{}", line),
        }
        forwarded += 1;
    }

    forwarded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forward_lines_skips_blank_lines() {
        let input: &[u8] = b"Running on http://127.0.0.1:5000\n\n   \nready\n";
        let count = forward_lines(input, "backend".to_string(), Stream::Stdout).await;
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_forward_lines_stops_on_invalid_utf8() {
        let input: &[u8] = b"ok\n\xff\xfe\nnever reached\n";
        let count = forward_lines(input, "frontend".to_string(), Stream::Stderr).await;
        assert_eq!(count, 1);
    }
}
