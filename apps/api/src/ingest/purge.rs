//! Delete-all: removes the uploaded resumes and the index files.
//!
//! Each target is attempted independently; a failure on one never stops the others.
//! `metadata.json` goes first since it is the commit record: once it is gone the store
//! reopens empty whatever vector files are left behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::index::{is_vector_file, METADATA_FILE};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum TargetOutcome {
    Removed,
    AlreadyAbsent,
    Failed { reason: String },
}

impl TargetOutcome {
    fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: TargetOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletionReport {
    pub resume_dir: TargetReport,
    /// Every `index.<generation>.vec` under the store directory.
    pub index_file: TargetReport,
    pub metadata_file: TargetReport,
}

impl DeletionReport {
    pub fn targets(&self) -> [&TargetReport; 3] {
        [&self.resume_dir, &self.index_file, &self.metadata_file]
    }

    /// True when no target failed. Absent targets count as success.
    pub fn success(&self) -> bool {
        self.targets().iter().all(|t| !t.outcome.is_failed())
    }

    /// True when nothing of the index store is left on disk.
    pub fn store_cleared(&self) -> bool {
        !self.index_file.outcome.is_failed() && !self.metadata_file.outcome.is_failed()
    }
}

pub async fn delete_all(resume_dir: &Path, store_dir: &Path) -> DeletionReport {
    let metadata_file = remove_file_target(&store_dir.join(METADATA_FILE)).await;
    let index_file = remove_vector_files(store_dir).await;
    let report = DeletionReport {
        resume_dir: remove_dir_target(resume_dir).await,
        index_file,
        metadata_file,
    };

    for target in report.targets() {
        match &target.outcome {
            TargetOutcome::Failed { reason } => {
                warn!("Could not delete {}: {reason}", target.path.display())
            }
            outcome => info!("{}: {outcome:?}", target.path.display()),
        }
    }
    report
}

async fn remove_dir_target(path: &Path) -> TargetReport {
    TargetReport {
        path: path.to_path_buf(),
        outcome: outcome_of(tokio::fs::remove_dir_all(path).await),
    }
}

async fn remove_file_target(path: &Path) -> TargetReport {
    TargetReport {
        path: path.to_path_buf(),
        outcome: outcome_of(tokio::fs::remove_file(path).await),
    }
}

/// Removes every vector file generation. Reported as one target.
async fn remove_vector_files(store_dir: &Path) -> TargetReport {
    let path = store_dir.join("index.*.vec");
    let mut entries = match tokio::fs::read_dir(store_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            return TargetReport {
                path,
                outcome: outcome_of(Err(e)),
            }
        }
    };

    let mut removed = 0usize;
    let mut failures = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                failures.push(format!("listing {}: {e}", store_dir.display()));
                break;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_vector_file(&name) {
            continue;
        }
        match outcome_of(tokio::fs::remove_file(entry.path()).await) {
            TargetOutcome::Removed => removed += 1,
            TargetOutcome::AlreadyAbsent => {}
            TargetOutcome::Failed { reason } => failures.push(format!("{name}: {reason}")),
        }
    }

    let outcome = if !failures.is_empty() {
        TargetOutcome::Failed {
            reason: failures.join("; "),
        }
    } else if removed > 0 {
        TargetOutcome::Removed
    } else {
        TargetOutcome::AlreadyAbsent
    };
    TargetReport { path, outcome }
}

fn outcome_of(result: std::io::Result<()>) -> TargetOutcome {
    match result {
        Ok(()) => TargetOutcome::Removed,
        Err(e) if e.kind() == ErrorKind::NotFound => TargetOutcome::AlreadyAbsent,
        Err(e) => TargetOutcome::Failed {
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_nothing_to_delete_is_success() {
        let dir = TempDir::new().unwrap();
        let report = delete_all(&dir.path().join("resumes"), &dir.path().join("store")).await;

        for target in report.targets() {
            assert_eq!(target.outcome, TargetOutcome::AlreadyAbsent);
        }
        assert!(report.success());
        assert!(report.store_cleared());
    }

    #[tokio::test]
    async fn test_existing_targets_are_removed() {
        let dir = TempDir::new().unwrap();
        let resumes = dir.path().join("resumes");
        let store = dir.path().join("store");
        std::fs::create_dir_all(&resumes).unwrap();
        std::fs::create_dir_all(&store).unwrap();
        std::fs::write(resumes.join("a.pdf"), b"%PDF").unwrap();
        std::fs::write(store.join("index.3.vec"), b"x").unwrap();
        std::fs::write(store.join("index.4.vec"), b"x").unwrap();
        std::fs::write(store.join("notes.txt"), b"keep").unwrap();

        let report = delete_all(&resumes, &store).await;

        assert_eq!(report.resume_dir.outcome, TargetOutcome::Removed);
        assert_eq!(report.index_file.outcome, TargetOutcome::Removed);
        assert_eq!(report.metadata_file.outcome, TargetOutcome::AlreadyAbsent);
        assert!(report.success());
        assert!(!resumes.exists());
        assert!(!store.join("index.4.vec").exists());
        assert!(store.join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_rest() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("store");
        // A directory where a file is expected cannot be removed with remove_file.
        std::fs::create_dir_all(store.join("index.2.vec")).unwrap();
        std::fs::write(store.join("index.3.vec"), b"x").unwrap();
        std::fs::write(store.join(METADATA_FILE), b"{}").unwrap();

        let report = delete_all(&dir.path().join("resumes"), &store).await;

        match &report.index_file.outcome {
            TargetOutcome::Failed { reason } => assert!(reason.contains("index.2.vec")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!store.join("index.3.vec").exists());
        assert_eq!(report.metadata_file.outcome, TargetOutcome::Removed);
        assert!(!report.success());
        assert!(!report.store_cleared());
    }

    #[test]
    fn test_report_serializes_status_tags() {
        let report = TargetReport {
            path: PathBuf::from("index.*.vec"),
            outcome: TargetOutcome::Failed {
                reason: "denied".to_string(),
            },
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["reason"], "denied");
    }
}
