use std::sync::Arc;

use consent_core::sink::RecordSink;
use consent_core::study::InteractionRecord;

use crate::events::UiEvent;

/// Stores one record. The outcome is reported, never retried.
pub async fn save_record(sink: Arc<dyn RecordSink>, record: InteractionRecord) -> UiEvent {
    let result = sink.save(&record).await.map_err(|e| e.to_string());
    UiEvent::RecordSaved {
        site_index: record.site_index,
        sink: sink.name(),
        result,
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use consent_core::sink::{NullSink, SinkError};

    use super::*;

    struct RejectingSink;

    #[async_trait]
    impl RecordSink for RejectingSink {
        fn name(&self) -> &'static str {
            "rejecting"
        }

        async fn save(&self, _record: &InteractionRecord) -> Result<(), SinkError> {
            Err(SinkError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    fn record() -> InteractionRecord {
        InteractionRecord {
            participant_id: "user_abc".to_string(),
            timestamp: Utc::now(),
            site_index: 2,
            website: "https://c.example".to_string(),
            selection: "No Action".to_string(),
            time_spent_seconds: 0,
        }
    }

    #[tokio::test]
    async fn test_save_reports_success() {
        let event = save_record(Arc::new(NullSink), record()).await;
        assert!(matches!(
            event,
            UiEvent::RecordSaved {
                site_index: 2,
                sink: "none",
                result: Ok(())
            }
        ));
    }

    #[tokio::test]
    async fn test_save_reports_failure_text() {
        let event = save_record(Arc::new(RejectingSink), record()).await;
        match event {
            UiEvent::RecordSaved {
                result: Err(error), ..
            } => assert!(error.contains("503")),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
