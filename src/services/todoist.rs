//! Todoist inbox task count via REST v2
//!
//! Two-step fetch: `GET {base}/projects` finds the projects flagged as an
//! inbox (`is_inbox_project` or `is_team_inbox`), then one
//! `GET {base}/tasks?project_id=` per inbox project sums the open tasks.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config;
use crate::error::PollError;
use crate::service::InboxService;

/// Per-button settings entered in the settings editor
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TodoistSettings {
    /// API bearer token
    pub api_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Project {
    id: String,
    is_inbox_project: bool,
    is_team_inbox: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Task {
    #[allow(dead_code)]
    id: String,
}

/// Todoist service client
pub struct TodoistService {
    base_url: String,
}

impl TodoistService {
    /// Create a client against the configured Todoist base URL
    pub fn new() -> Self {
        Self {
            base_url: config::todoist_base_url(),
        }
    }

    /// Override the base URL (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        http: &Client,
        token: &str,
        path_and_query: &str,
    ) -> Result<T, PollError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path_and_query);

        let response = http
            .get(&url)
            .header("Accept", "application/json")
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PollError::Transport(format!("HTTP {status}: {body}")));
        }

        Ok(response.json().await?)
    }
}

impl Default for TodoistService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InboxService for TodoistService {
    type Settings = TodoistSettings;
    type Outcome = u64;

    fn action_id(&self) -> &'static str {
        "inboxdeck.todoist"
    }

    fn refresh_interval(&self) -> Duration {
        config::default_refresh_interval()
    }

    fn check_settings(&self, settings: &Self::Settings) -> Result<(), PollError> {
        if settings.api_token.is_empty() {
            return Err(PollError::MissingCredentials("apiToken"));
        }
        Ok(())
    }

    async fn fetch(
        &self,
        http: &Client,
        settings: &Self::Settings,
    ) -> Result<Self::Outcome, PollError> {
        let projects: Vec<Project> = self
            .get_json(http, &settings.api_token, "/projects")
            .await?;

        let mut total: u64 = 0;
        for project in projects
            .iter()
            .filter(|project| project.is_inbox_project || project.is_team_inbox)
        {
            let tasks: Vec<Task> = self
                .get_json(
                    http,
                    &settings.api_token,
                    &format!("/tasks?project_id={}", project.id),
                )
                .await?;
            total += tasks.len() as u64;
        }

        Ok(total)
    }

    fn count(&self, outcome: &Self::Outcome) -> u64 {
        *outcome
    }

    fn open_url(
        &self,
        _settings: &Self::Settings,
        _outcome: Option<&Self::Outcome>,
    ) -> Option<String> {
        Some("https://app.todoist.com/".to_string())
    }
}
