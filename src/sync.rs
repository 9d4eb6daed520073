use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink};
use crate::config::SyncConfig;
use crate::domain::{DownloadOutcome, DownloadTarget};
use crate::error::SyncError;
use crate::remote::RemoteClient;

#[derive(Debug, Clone, Serialize)]
pub struct SyncItemResult {
    pub file_name: String,
    pub remote_url: String,
    pub local_path: String,
    #[serde(flatten)]
    pub outcome: DownloadOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: String,
    pub finished_at: String,
    pub items: Vec<SyncItemResult>,
}

impl SyncReport {
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, DownloadOutcome::Skipped))
    }

    pub fn downloaded(&self) -> usize {
        self.count(|outcome| matches!(outcome, DownloadOutcome::Downloaded { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, DownloadOutcome::Failed { .. }))
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.items
            .iter()
            .map(|item| match item.outcome {
                DownloadOutcome::Downloaded { bytes } => bytes,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, predicate: impl Fn(&DownloadOutcome) -> bool) -> usize {
        self.items
            .iter()
            .filter(|item| predicate(&item.outcome))
            .count()
    }
}

/// Brings the download directory in line with a list of targets, one at a
/// time. A local file whose size matches the remote `Content-Length` is
/// considered complete and is left untouched.
pub struct SyncDownloader<R: RemoteClient> {
    remote: R,
    download_dir: Utf8PathBuf,
    chunk_size: usize,
}

impl<R: RemoteClient> SyncDownloader<R> {
    pub fn new(remote: R, config: &SyncConfig) -> Self {
        Self::new_with_dir(remote, config.download_dir.clone(), config.chunk_size)
    }

    pub fn new_with_dir(remote: R, download_dir: Utf8PathBuf, chunk_size: usize) -> Self {
        Self {
            remote,
            download_dir,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn download_dir(&self) -> &Utf8Path {
        &self.download_dir
    }

    pub fn prepare(&self) -> Result<(), SyncError> {
        fs::create_dir_all(self.download_dir.as_std_path()).map_err(|err| {
            SyncError::Filesystem(format!("create {}: {err}", self.download_dir))
        })
    }

    /// Creates the download directory, then syncs every target in order.
    /// Per-target failures are recorded in the report and never abort the batch.
    pub fn sync_all(
        &self,
        targets: &[DownloadTarget],
        sink: &dyn ProgressSink,
    ) -> Result<SyncReport, SyncError> {
        self.prepare()?;
        let started_at = iso_timestamp();
        let total = targets.len();
        let mut items = Vec::with_capacity(total);

        for (index, target) in targets.iter().enumerate() {
            sink.event(ProgressEvent::TargetStarted {
                index: index + 1,
                total,
                file_name: target.file_name.clone(),
            });
            let outcome = self.sync_one(target, sink);
            tracing::debug!(file = %target.file_name, outcome = outcome.label(), "target done");
            items.push(SyncItemResult {
                file_name: target.file_name.clone(),
                remote_url: target.remote_url.clone(),
                local_path: target.local_path.to_string(),
                outcome,
            });
        }

        let report = SyncReport {
            started_at,
            finished_at: iso_timestamp(),
            items,
        };
        sink.event(ProgressEvent::Finished {
            skipped: report.skipped(),
            downloaded: report.downloaded(),
            failed: report.failed(),
        });
        Ok(report)
    }

    pub fn sync_one(&self, target: &DownloadTarget, sink: &dyn ProgressSink) -> DownloadOutcome {
        let up_to_date = match self.local_size(target, sink) {
            Some(local) => self.matches_remote(target, local, sink),
            None => false,
        };
        if up_to_date {
            tracing::info!(file = %target.file_name, "sizes match, skipping");
            sink.event(ProgressEvent::Skipped {
                file_name: target.file_name.clone(),
            });
            return DownloadOutcome::Skipped;
        }

        match self.transfer(target, sink) {
            Ok(bytes) => {
                sink.event(ProgressEvent::Downloaded {
                    file_name: target.file_name.clone(),
                    bytes,
                });
                DownloadOutcome::Downloaded { bytes }
            }
            Err(err) => {
                tracing::warn!(url = %target.remote_url, error = %err, "download failed");
                let reason = err.to_string();
                sink.event(ProgressEvent::Failed {
                    url: target.remote_url.clone(),
                    reason: reason.clone(),
                });
                DownloadOutcome::Failed { reason }
            }
        }
    }

    /// Size of the existing local copy. `None` when there is none, or when it
    /// cannot be inspected; the latter is reported and forces a download.
    fn local_size(&self, target: &DownloadTarget, sink: &dyn ProgressSink) -> Option<u64> {
        match fs::metadata(target.local_path.as_std_path()) {
            Ok(metadata) => Some(metadata.len()),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                tracing::error!(path = %target.local_path, error = %err, "cannot stat local file");
                sink.event(ProgressEvent::LocalUnreadable {
                    path: target.local_path.to_string(),
                    reason: err.to_string(),
                });
                None
            }
        }
    }

    /// Compares the local size against the remote `Content-Length`. A failed
    /// probe counts as "not up to date".
    fn matches_remote(&self, target: &DownloadTarget, local: u64, sink: &dyn ProgressSink) -> bool {
        let remote = match self.remote.probe(&target.remote_url) {
            Ok(length) => length.unwrap_or(0),
            Err(err) => {
                tracing::warn!(url = %target.remote_url, error = %err, "size probe failed");
                sink.event(ProgressEvent::ProbeFailed {
                    url: target.remote_url.clone(),
                    reason: err.to_string(),
                });
                return false;
            }
        };

        if local == remote {
            return true;
        }
        tracing::debug!(file = %target.file_name, local, remote, "size mismatch");
        sink.event(ProgressEvent::SizeMismatch {
            file_name: target.file_name.clone(),
            local,
            remote,
        });
        false
    }

    /// Streams the body to `local_path` in `chunk_size` pieces. The file is
    /// only created once the request has been accepted; on a mid-stream
    /// failure whatever was written stays on disk.
    fn transfer(&self, target: &DownloadTarget, sink: &dyn ProgressSink) -> Result<u64, SyncError> {
        let body = self.remote.open(&target.remote_url)?;
        let total = body.content_length.unwrap_or(0);
        let mut reader = body.reader;

        let mut file = File::create(target.local_path.as_std_path()).map_err(|err| {
            SyncError::Filesystem(format!("create {}: {err}", target.local_path))
        })?;

        let mut buffer = vec![0u8; self.chunk_size];
        let mut received = 0u64;
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(SyncError::TransferRead {
                        url: target.remote_url.clone(),
                        received,
                        message: err.to_string(),
                    });
                }
            };
            file.write_all(&buffer[..read]).map_err(|err| {
                SyncError::Filesystem(format!("write {}: {err}", target.local_path))
            })?;
            received += read as u64;
            sink.event(ProgressEvent::Received { received, total });
        }

        file.flush()
            .map_err(|err| SyncError::Filesystem(format!("flush {}: {err}", target.local_path)))?;
        Ok(received)
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
