use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;

fn is_rendered_video(name: &str) -> bool {
    name.strip_prefix("video-")
        .and_then(|rest| rest.strip_suffix(".mp4"))
        .is_some_and(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
}

/// Delete rendered videos in `dir` last modified more than `max_age` before
/// `now`. Other files are left alone.
///
/// # Returns
/// The number of videos removed.
///
/// # Errors
/// If the directory cannot be listed. Failures on individual files are logged
/// and skipped.
pub async fn sweep(
    dir: &Path,
    max_age: Duration,
    now: SystemTime,
) -> std::io::Result<usize> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !is_rendered_video(&name.to_string_lossy()) {
            continue;
        }

        let modified = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!("failed to stat {}: {}", entry.path().display(), e);
                continue;
            }
        };

        let age = now.duration_since(modified).unwrap_or_default();
        if age <= max_age {
            continue;
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => {
                tracing::debug!("evicted {}", entry.path().display());
                removed += 1;
            }
            Err(e) => {
                tracing::warn!("failed to evict {}: {}", entry.path().display(), e);
            }
        }
    }

    Ok(removed)
}

/// Periodically evict old videos from `dir` for the lifetime of the process.
pub fn spawn_sweeper(
    dir: PathBuf,
    max_age: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tracing::info!(
        "evicting videos older than {:?} every {:?}",
        max_age,
        interval
    );

    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(interval.max(Duration::from_secs(1)));
        loop {
            ticker.tick().await;
            match sweep(&dir, max_age, SystemTime::now()).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!("evicted {} rendered videos", removed),
                Err(e) => tracing::warn!("video retention sweep failed: {}", e),
            }
        }
    })
}
