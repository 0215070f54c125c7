//! Directory traversal.

use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Streams every regular file under `root` into `tx`, in traversal order.
///
/// Entries within a directory are visited by file name. Unreadable entries
/// are logged and skipped. The walk stops early once the receiver is gone.
pub(crate) fn spawn_walker(
    root: PathBuf,
    follow_links: bool,
    tx: mpsc::Sender<PathBuf>,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let walker = WalkDir::new(&root)
            .follow_links(follow_links)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if tx.blocking_send(entry.into_path()).is_err() {
                debug!(root = %root.display(), "Walk stopped early");
                return;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_walker_yields_regular_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("season1")).unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("b.mkv"), b"").unwrap();
        fs::write(dir.path().join("a.mp4"), b"").unwrap();
        fs::write(dir.path().join("season1/ep1.avi"), b"").unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        let handle = spawn_walker(dir.path().to_path_buf(), false, tx);

        let mut found = Vec::new();
        while let Some(path) = rx.recv().await {
            found.push(path.strip_prefix(dir.path()).unwrap().to_path_buf());
        }
        handle.await.unwrap();

        assert_eq!(
            found,
            vec![
                PathBuf::from("a.mp4"),
                PathBuf::from("b.mkv"),
                PathBuf::from("season1/ep1.avi"),
            ]
        );
    }

    #[tokio::test]
    async fn test_walker_stops_when_receiver_dropped() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..10 {
            fs::write(dir.path().join(format!("{}.mp4", i)), b"").unwrap();
        }

        let (tx, rx) = mpsc::channel(1);
        let handle = spawn_walker(dir.path().to_path_buf(), false, tx);
        drop(rx);

        handle.await.unwrap();
    }
}
