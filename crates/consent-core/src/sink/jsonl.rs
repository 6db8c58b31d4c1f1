//! Local JSON Lines sink: one record per line, append-only.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{RecordSink, SinkError};
use crate::study::InteractionRecord;

pub struct JsonlSink {
    path: PathBuf,
    /// Serializes appends from concurrent save tasks.
    write_lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl RecordSink for JsonlSink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn save(&self, record: &InteractionRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(path = %self.path.display(), "record appended");
        Ok(())
    }
}

/// Reads every record from a JSONL file, skipping blank lines.
///
/// # Errors
/// Returns an error if the file cannot be read or a line is not a record.
pub fn read_records(path: &Path) -> Result<Vec<InteractionRecord>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read records from {}", path.display()))?;

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Invalid record on line {} of {}", n + 1, path.display()))
        })
        .collect()
}
