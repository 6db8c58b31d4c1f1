//! Record sinks.
//!
//! A sink durably stores interaction records. The study hands each record to
//! the sink exactly once and never waits on the outcome to advance; failures
//! are reported for logging only.

mod firestore;
mod jsonl;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
pub use firestore::{FirestoreSink, FirestoreSinkConfig};
pub use jsonl::{JsonlSink, read_records};
use thiserror::Error;

use crate::config::{SinkConfig, SinkKind};
use crate::study::InteractionRecord;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store rejected the write ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable destination for interaction records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Short name for logs and status messages.
    fn name(&self) -> &'static str;

    /// Stores one record. Called at most once per record; never retried.
    async fn save(&self, record: &InteractionRecord) -> Result<(), SinkError>;
}

/// Sink that discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl RecordSink for NullSink {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn save(&self, _record: &InteractionRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Builds the sink selected by configuration.
///
/// # Errors
/// Returns an error if the selected sink is missing required settings.
pub fn build_sink(config: &SinkConfig) -> Result<Arc<dyn RecordSink>> {
    let sink: Arc<dyn RecordSink> = match config.kind {
        SinkKind::Firestore => Arc::new(FirestoreSink::new(FirestoreSinkConfig::from_config(
            config,
        )?)),
        SinkKind::Jsonl => Arc::new(JsonlSink::new(config.records_path())),
        SinkKind::None => Arc::new(NullSink),
    };
    tracing::info!(sink = sink.name(), "record sink ready");
    Ok(sink)
}
