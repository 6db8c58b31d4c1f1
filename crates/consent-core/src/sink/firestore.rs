//! Firestore REST sink.
//!
//! Each record becomes one document in the configured collection, written
//! with a single `documents:commit` call that also sets a server-side
//! `createdAt` timestamp.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::{Value, json};
use uuid::Uuid;

use super::{RecordSink, SinkError};
use crate::config::SinkConfig;
use crate::study::InteractionRecord;

/// Default base URL for the Firestore REST API.
const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com";

const API_KEY_ENV: &str = "CONSENT_FIRESTORE_API_KEY";
const BASE_URL_ENV: &str = "CONSENT_FIRESTORE_BASE_URL";

/// Resolved Firestore settings.
#[derive(Debug, Clone)]
pub struct FirestoreSinkConfig {
    pub project_id: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub collection: String,
}

impl FirestoreSinkConfig {
    /// Resolves settings from config and environment.
    ///
    /// API key: config value (if non-empty), then `CONSENT_FIRESTORE_API_KEY`.
    /// Base URL: `CONSENT_FIRESTORE_BASE_URL`, then config, then the default.
    ///
    /// # Errors
    /// Returns an error if `project_id` is missing or a base URL is malformed.
    pub fn from_config(sink: &SinkConfig) -> Result<Self> {
        let project_id = sink
            .firestore
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .context("Firestore sink needs sink.firestore.project_id")?
            .to_string();

        let api_key = non_empty(sink.firestore.api_key.as_deref())
            .or_else(|| non_empty(std::env::var(API_KEY_ENV).ok().as_deref()));

        let base_url = resolve_base_url(sink.firestore.base_url.as_deref())?;

        Ok(Self {
            project_id,
            api_key,
            base_url,
            collection: sink.collection.clone(),
        })
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn commit_url(&self) -> String {
        format!(
            "{}/v1/{}:commit",
            self.base_url.trim_end_matches('/'),
            self.database_path()
        )
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Resolves a base URL with precedence: env > config > default.
fn resolve_base_url(config_base_url: Option<&str>) -> Result<String> {
    let env_url = std::env::var(BASE_URL_ENV).ok();
    let Some(url) = non_empty(env_url.as_deref()).or_else(|| non_empty(config_base_url)) else {
        return Ok(DEFAULT_BASE_URL.to_string());
    };
    url::Url::parse(&url).with_context(|| format!("Invalid Firestore base URL: {url}"))?;
    Ok(url)
}

/// Firestore REST client for interaction records.
pub struct FirestoreSink {
    config: FirestoreSinkConfig,
    http: reqwest::Client,
}

impl FirestoreSink {
    pub fn new(config: FirestoreSinkConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Builds the commit request body for one record.
    fn commit_body(&self, record: &InteractionRecord, document_id: &str) -> Value {
        let name = format!(
            "{}/{}/{}",
            self.config.database_path(),
            self.config.collection,
            document_id
        );
        json!({
            "writes": [{
                "update": {
                    "name": name,
                    "fields": document_fields(record),
                },
                "currentDocument": { "exists": false },
                "updateTransforms": [{
                    "fieldPath": "createdAt",
                    "setToServerValue": "REQUEST_TIME",
                }],
            }]
        })
    }
}

/// Encodes a record as Firestore typed fields.
fn document_fields(record: &InteractionRecord) -> Value {
    json!({
        "userId": { "stringValue": record.participant_id },
        "timestamp": {
            "stringValue": record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        },
        "website": { "stringValue": record.website },
        "siteIndex": { "integerValue": record.site_index.to_string() },
        "selection": { "stringValue": record.selection },
        "timeSpent": { "integerValue": record.time_spent_seconds.to_string() },
    })
}

#[async_trait]
impl RecordSink for FirestoreSink {
    fn name(&self) -> &'static str {
        "firestore"
    }

    async fn save(&self, record: &InteractionRecord) -> Result<(), SinkError> {
        let document_id = Uuid::new_v4().simple().to_string();
        let body = self.commit_body(record, &document_id);

        let mut request = self.http.post(self.config.commit_url()).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(
            document = %document_id,
            collection = %self.config.collection,
            "record written to firestore"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{body_partial_json, method, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::FirestoreConfig;

    fn record() -> InteractionRecord {
        InteractionRecord {
            participant_id: "user_abc".to_string(),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            site_index: 1,
            website: "https://www.aa.com".to_string(),
            selection: "Accept All".to_string(),
            time_spent_seconds: 7,
        }
    }

    fn sink_for(server: &MockServer) -> FirestoreSink {
        FirestoreSink::new(FirestoreSinkConfig {
            project_id: "demo".to_string(),
            api_key: Some("test-key".to_string()),
            base_url: server.uri(),
            collection: "interactions".to_string(),
        })
    }

    #[tokio::test]
    async fn test_save_commits_document_with_server_timestamp() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/v1/projects/demo/databases/.*/documents:commit$"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "writes": [{
                    "update": {
                        "fields": {
                            "userId": { "stringValue": "user_abc" },
                            "timestamp": { "stringValue": "2023-11-14T22:13:20.000Z" },
                            "website": { "stringValue": "https://www.aa.com" },
                            "siteIndex": { "integerValue": "1" },
                            "selection": { "stringValue": "Accept All" },
                            "timeSpent": { "integerValue": "7" },
                        }
                    },
                    "updateTransforms": [{
                        "fieldPath": "createdAt",
                        "setToServerValue": "REQUEST_TIME",
                    }],
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "writeResults": [{}],
                "commitTime": "2023-11-14T22:13:21Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        sink_for(&server).save(&record()).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_write_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
            .mount(&server)
            .await;

        let err = sink_for(&server).save(&record()).await.unwrap_err();
        match err {
            SinkError::Status { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("PERMISSION_DENIED"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_document_names_live_in_collection() {
        let sink = FirestoreSink::new(FirestoreSinkConfig {
            project_id: "demo".to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            collection: "interactions".to_string(),
        });

        let body = sink.commit_body(&record(), "doc1");
        assert_eq!(
            body["writes"][0]["update"]["name"],
            "projects/demo/databases/(default)/documents/interactions/doc1"
        );
        assert_eq!(
            sink.config.commit_url(),
            "https://firestore.googleapis.com/v1/projects/demo/databases/(default)/documents:commit"
        );
    }

    #[test]
    fn test_config_uses_configured_api_key_and_collection() {
        let sink = SinkConfig {
            collection: "pilot".to_string(),
            firestore: FirestoreConfig {
                project_id: Some(" demo ".to_string()),
                api_key: Some("from-config".to_string()),
                base_url: None,
            },
            ..SinkConfig::default()
        };

        let resolved = FirestoreSinkConfig::from_config(&sink).unwrap();
        assert_eq!(resolved.project_id, "demo");
        assert_eq!(resolved.api_key.as_deref(), Some("from-config"));
        assert_eq!(resolved.collection, "pilot");
    }
}
