//! Child process plumbing for the encoder.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// Forwards every line of `reader` into `tx`.
///
/// Lines are split on both `\n` and `\r`, since ffmpeg rewrites its stats line
/// in place with carriage returns.
pub(crate) fn spawn_line_reader<R>(reader: R, tx: mpsc::Sender<String>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut segments = BufReader::new(reader).split(b'\n');
        while let Ok(Some(segment)) = segments.next_segment().await {
            let text = String::from_utf8_lossy(&segment);
            for line in text.split('\r') {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if tx.send(line.to_string()).await.is_err() {
                    return;
                }
            }
        }
    })
}

/// Asks the child to exit, then kills it if it is still alive after `grace`.
///
/// Returns once the child has been reaped.
pub(crate) async fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Ok(raw) = i32::try_from(pid) {
            match kill(Pid::from_raw(raw), Signal::SIGTERM) {
                Ok(()) => {
                    if let Ok(Ok(status)) = timeout(grace, child.wait()).await {
                        debug!(pid, ?status, "Encoder exited after SIGTERM");
                        return;
                    }
                    debug!(pid, "Encoder ignored SIGTERM, killing");
                }
                Err(e) => debug!(pid, error = %e, "Failed to send SIGTERM"),
            }
        }
    }

    #[cfg(not(unix))]
    let _ = grace;

    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill encoder process");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_line_reader_splits_carriage_returns() {
        let input: &[u8] = b"first\nframe=1 time=00:00:01.00\rframe=2 time=00:00:02.00\r\n\nlast";
        let (tx, mut rx) = mpsc::channel(16);
        let handle = spawn_line_reader(input, tx);

        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        handle.await.unwrap();

        assert_eq!(
            lines,
            vec![
                "first",
                "frame=1 time=00:00:01.00",
                "frame=2 time=00:00:02.00",
                "last"
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_reaps_child() {
        let mut child = tokio::process::Command::new("sleep")
            .arg("30")
            .kill_on_drop(true)
            .spawn()
            .unwrap();

        terminate(&mut child, Duration::from_secs(2)).await;

        let status = child.try_wait().unwrap();
        assert!(status.is_some());
        assert!(!status.unwrap().success());
    }
}
