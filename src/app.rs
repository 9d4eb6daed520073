use serde::Serialize;

use crate::catalog::{Catalog, CatalogClient};
use crate::domain::DownloadTarget;
use crate::error::SyncError;
use crate::remote::RemoteClient;
use crate::sync::{SyncDownloader, SyncReport};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanResult {
    pub records: usize,
    pub targets: Vec<DownloadTarget>,
}

#[derive(Debug, Clone)]
pub enum RunResult {
    Planned(PlanResult),
    Synced(SyncReport),
}

/// Observations emitted while a run progresses. Sinks only watch; nothing
/// they do feeds back into the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    CatalogRecord {
        index: usize,
        record: String,
    },
    CatalogFiltered {
        records: usize,
        eligible: usize,
    },
    TargetStarted {
        index: usize,
        total: usize,
        file_name: String,
    },
    Skipped {
        file_name: String,
    },
    SizeMismatch {
        file_name: String,
        local: u64,
        remote: u64,
    },
    ProbeFailed {
        url: String,
        reason: String,
    },
    LocalUnreadable {
        path: String,
        reason: String,
    },
    /// Bytes received so far for the target last announced by `TargetStarted`.
    Received {
        received: u64,
        total: u64,
    },
    Downloaded {
        file_name: String,
        bytes: u64,
    },
    Failed {
        url: String,
        reason: String,
    },
    Finished {
        skipped: usize,
        downloaded: usize,
        failed: usize,
    },
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct App<C: CatalogClient, R: RemoteClient> {
    catalog: C,
    downloader: SyncDownloader<R>,
}

impl<C: CatalogClient, R: RemoteClient> App<C, R> {
    pub fn new(catalog: C, downloader: SyncDownloader<R>) -> Self {
        Self {
            catalog,
            downloader,
        }
    }

    pub fn downloader(&self) -> &SyncDownloader<R> {
        &self.downloader
    }

    /// Fetches the catalog, reports every record and returns the PDF targets
    /// in catalog order. Touches nothing on disk.
    pub fn plan(&self, sink: &dyn ProgressSink) -> Result<PlanResult, SyncError> {
        let catalog = self.catalog.fetch()?;
        report_catalog(&catalog, sink);

        let targets = catalog.targets(self.downloader.download_dir());
        tracing::info!(
            records = catalog.len(),
            eligible = targets.len(),
            "catalog filtered"
        );
        sink.event(ProgressEvent::CatalogFiltered {
            records: catalog.len(),
            eligible: targets.len(),
        });
        Ok(PlanResult {
            records: catalog.len(),
            targets,
        })
    }

    pub fn run(
        &self,
        options: RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, SyncError> {
        let plan = self.plan(sink)?;
        if options.dry_run {
            return Ok(RunResult::Planned(plan));
        }
        let report = self.downloader.sync_all(&plan.targets, sink)?;
        Ok(RunResult::Synced(report))
    }
}

fn report_catalog(catalog: &Catalog, sink: &dyn ProgressSink) {
    for (index, record) in catalog.records().iter().enumerate() {
        sink.event(ProgressEvent::CatalogRecord {
            index: index + 1,
            record: record.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteBody;
    use camino::Utf8PathBuf;
    use serde_json::json;
    use std::sync::Mutex;

    struct StaticCatalog(Vec<serde_json::Value>);

    impl CatalogClient for StaticCatalog {
        fn fetch(&self) -> Result<Catalog, SyncError> {
            Ok(Catalog::new(self.0.clone()))
        }
    }

    struct UnreachableRemote;

    impl RemoteClient for UnreachableRemote {
        fn probe(&self, url: &str) -> Result<Option<u64>, SyncError> {
            panic!("unexpected probe of {url}")
        }

        fn open(&self, url: &str) -> Result<RemoteBody, SyncError> {
            panic!("unexpected download of {url}")
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl ProgressSink for RecordingSink {
        fn event(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn dry_run_plans_without_touching_disk() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().join("out")).unwrap();
        let catalog = StaticCatalog(vec![
            json!({"link": "http://x/a.pdf", "title": "A", "publication_year": 2020}),
            json!({"link": "http://x/b.txt"}),
        ]);
        let app = App::new(
            catalog,
            SyncDownloader::new_with_dir(UnreachableRemote, dir.clone(), 1024),
        );
        let sink = RecordingSink::default();

        let result = app.run(RunOptions { dry_run: true }, &sink).unwrap();

        let RunResult::Planned(plan) = result else {
            panic!("expected a plan");
        };
        assert_eq!(plan.records, 2);
        assert_eq!(plan.targets.len(), 1);
        assert!(!dir.as_std_path().exists());

        let events = sink.events.lock().unwrap();
        assert_eq!(
            events.last(),
            Some(&ProgressEvent::CatalogFiltered {
                records: 2,
                eligible: 1
            })
        );
        assert!(matches!(
            events[0],
            ProgressEvent::CatalogRecord { index: 1, .. }
        ));
    }
}
