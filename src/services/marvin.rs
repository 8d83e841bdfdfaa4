//! Amazing Marvin unassigned-task count
//!
//! Marvin syncs through a CouchDB-compatible endpoint. One
//! `GET {server}/{database}/_all_docs?include_docs=true` returns every
//! document; the count is the number of task documents that still sit in
//! the inbox: a title is present, `db == "Tasks"`, the parent is
//! `"unassigned"`, and the task is neither done nor recurring.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{Client, Url};
use serde::{Deserialize, Deserializer};

use crate::config;
use crate::error::PollError;
use crate::service::InboxService;

/// Per-button settings entered in the settings editor
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarvinSettings {
    /// Sync server URL
    pub server: String,
    /// Sync database name
    pub database: String,
    /// Sync user
    pub user: String,
    /// Sync password
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct AllDocsResponse {
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    doc: Option<TaskDoc>,
}

/// One synced document, reduced to the fields the filter needs
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskDoc {
    /// Task title; empty for non-task documents
    pub title: String,
    /// Document collection name; tasks live in `"Tasks"`
    pub db: String,
    /// Completed flag
    pub done: bool,
    /// Recurring-template flag
    pub recurring: bool,
    /// Parent assignment; `"unassigned"` marks inbox tasks
    pub parent_id: ParentId,
}

/// Polymorphic `parentId` field
///
/// On the wire this arrives as a UUID string, the literal `"unassigned"`,
/// `null`, or an object of the form `{"op": ..., "val": ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentId(pub String);

impl<'de> Deserialize<'de> for ParentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Null => Ok(Self::default()),
            serde_json::Value::String(parent) => Ok(Self(parent)),
            serde_json::Value::Object(map) => match map.get("val") {
                Some(serde_json::Value::String(parent)) => Ok(Self(parent.clone())),
                _ => Ok(Self::default()),
            },
            other => Err(serde::de::Error::custom(format!(
                "unexpected parentId value: {other}"
            ))),
        }
    }
}

/// Inbox filter shared by the fetch path and the tests
fn is_inbox_task(doc: &TaskDoc) -> bool {
    !doc.title.is_empty()
        && doc.db == "Tasks"
        && doc.parent_id.0 == "unassigned"
        && !doc.done
        && !doc.recurring
}

/// Amazing Marvin service client
#[derive(Debug, Default)]
pub struct MarvinService;

impl MarvinService {
    /// Create a client; the server URL comes from the per-button settings
    pub fn new() -> Self {
        Self
    }

    fn all_docs_url(settings: &MarvinSettings) -> Result<Url, PollError> {
        let mut url = Url::parse(&settings.server)
            .map_err(|err| PollError::Configuration(format!("invalid server URL: {err}")))?;

        url.path_segments_mut()
            .map_err(|_| PollError::Configuration("server URL cannot be a base".to_string()))?
            .push(&settings.database)
            .push("_all_docs");
        url.query_pairs_mut().append_pair("include_docs", "true");

        Ok(url)
    }

    fn basic_authorization(settings: &MarvinSettings) -> String {
        let credentials = BASE64.encode(format!("{}:{}", settings.user, settings.password));
        format!("Basic {credentials}")
    }
}

#[async_trait]
impl InboxService for MarvinService {
    type Settings = MarvinSettings;
    type Outcome = u64;

    fn action_id(&self) -> &'static str {
        "inboxdeck.marvin"
    }

    fn refresh_interval(&self) -> Duration {
        config::default_refresh_interval()
    }

    fn check_settings(&self, settings: &Self::Settings) -> Result<(), PollError> {
        if settings.server.is_empty() {
            return Err(PollError::MissingCredentials("server"));
        }
        if settings.database.is_empty() {
            return Err(PollError::MissingCredentials("database"));
        }
        if settings.user.is_empty() {
            return Err(PollError::MissingCredentials("user"));
        }
        if settings.password.is_empty() {
            return Err(PollError::MissingCredentials("password"));
        }
        Ok(())
    }

    async fn fetch(
        &self,
        http: &Client,
        settings: &Self::Settings,
    ) -> Result<Self::Outcome, PollError> {
        let url = Self::all_docs_url(settings)?;

        let response = http
            .get(url)
            .header("Accept", "application/json")
            .header("Authorization", Self::basic_authorization(settings))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PollError::Transport(format!("HTTP {status}: {body}")));
        }

        let docs: AllDocsResponse = response.json().await?;

        let count = docs
            .rows
            .iter()
            .filter_map(|row| row.doc.as_ref())
            .filter(|doc| is_inbox_task(doc))
            .count();

        Ok(count as u64)
    }

    fn count(&self, outcome: &Self::Outcome) -> u64 {
        *outcome
    }

    fn open_url(
        &self,
        _settings: &Self::Settings,
        _outcome: Option<&Self::Outcome>,
    ) -> Option<String> {
        Some("https://app.amazingmarvin.com".to_string())
    }
}
