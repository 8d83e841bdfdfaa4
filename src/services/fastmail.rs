//! Fastmail inbox count via JMAP
//!
//! Two-step fetch: `GET {base}/session` resolves the primary mail account
//! id, then a batched `POST {base}/api` calls `Mailbox/get` and the mailbox
//! whose `role` is `"inbox"` supplies the unread/total tally. The session is
//! resolved on every poll; nothing is cached between fetches.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::json;

use crate::config;
use crate::error::PollError;
use crate::service::InboxService;

/// JMAP capability URN for the core protocol
const CORE_URN: &str = "urn:ietf:params:jmap:core";

/// JMAP capability URN for mail; also the `primaryAccounts` key
const MAIL_URN: &str = "urn:ietf:params:jmap:mail";

/// Per-button settings entered in the settings editor
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FastmailSettings {
    /// API bearer token
    pub api_token: String,
}

/// Unread/total tally of the inbox mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboxTally {
    /// Unread messages
    pub unread: u64,
    /// Total messages
    pub total: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    #[serde(default)]
    primary_accounts: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    method_responses: Vec<Invocation>,
}

/// One JMAP method response, sent on the wire as a `[name, args, callId]`
/// triple rather than an object.
#[derive(Debug)]
struct Invocation {
    name: String,
    args: MailboxGetResponse,
    call_id: String,
}

impl<'de> Deserialize<'de> for Invocation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (name, args, call_id) =
            <(String, MailboxGetResponse, String)>::deserialize(deserializer)?;
        Ok(Self { name, args, call_id })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MailboxGetResponse {
    list: Vec<Mailbox>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Mailbox {
    role: Option<String>,
    total_emails: u64,
    unread_emails: u64,
}

/// Fastmail service client
pub struct FastmailService {
    base_url: String,
}

impl FastmailService {
    /// Create a client against the configured Fastmail base URL
    pub fn new() -> Self {
        Self {
            base_url: config::fastmail_base_url(),
        }
    }

    /// Override the base URL (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_session(
        &self,
        http: &Client,
        token: &str,
    ) -> Result<String, PollError> {
        let url = format!("{}/session", self.base_url.trim_end_matches('/'));

        let response = http
            .get(&url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PollError::Transport(format!("HTTP {status}: {body}")));
        }

        let session: SessionResponse = response.json().await?;
        session
            .primary_accounts
            .get(MAIL_URN)
            .cloned()
            .ok_or_else(|| {
                PollError::Configuration("session has no primary JMAP mail account".to_string())
            })
    }

    async fn fetch_mailboxes(
        &self,
        http: &Client,
        token: &str,
        account_id: &str,
    ) -> Result<Vec<Mailbox>, PollError> {
        let url = format!("{}/api", self.base_url.trim_end_matches('/'));

        let body = json!({
            "using": [CORE_URN, MAIL_URN],
            "methodCalls": [
                ["Mailbox/get", { "accountId": account_id, "ids": null }, "0"]
            ],
        });

        let response = http
            .post(&url)
            .header("Authorization", format!("Bearer {token}"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PollError::Transport(format!("HTTP {status}: {body}")));
        }

        let api: ApiResponse = response.json().await?;
        let invocation = api
            .method_responses
            .into_iter()
            .find(|invocation| invocation.name == "Mailbox/get" && invocation.call_id == "0")
            .ok_or_else(|| {
                PollError::Malformed("no Mailbox/get invocation in response".to_string())
            })?;

        Ok(invocation.args.list)
    }
}

impl Default for FastmailService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InboxService for FastmailService {
    type Settings = FastmailSettings;
    type Outcome = InboxTally;

    fn action_id(&self) -> &'static str {
        "inboxdeck.fastmail"
    }

    fn refresh_interval(&self) -> Duration {
        config::default_refresh_interval()
    }

    // The tally is rendered even at zero unread, as "0/<total>".
    fn blank_on_zero(&self) -> bool {
        false
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
        let account_id = self.fetch_session(http, &settings.api_token).await?;
        let mailboxes = self
            .fetch_mailboxes(http, &settings.api_token, &account_id)
            .await?;

        let inbox = mailboxes
            .iter()
            .find(|mailbox| mailbox.role.as_deref() == Some("inbox"))
            .ok_or_else(|| {
                PollError::Malformed("no mailbox with the inbox role".to_string())
            })?;

        Ok(InboxTally {
            unread: inbox.unread_emails,
            total: inbox.total_emails,
        })
    }

    fn count(&self, outcome: &Self::Outcome) -> u64 {
        outcome.unread
    }

    fn title(&self, outcome: &Self::Outcome) -> String {
        format!("{}/{}", outcome.unread, outcome.total)
    }

    fn open_url(
        &self,
        _settings: &Self::Settings,
        _outcome: Option<&Self::Outcome>,
    ) -> Option<String> {
        Some("https://app.fastmail.com/mail/Inbox".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invocation_decodes_from_triple() {
        let raw = json!([
            "Mailbox/get",
            {
                "accountId": "u123",
                "list": [
                    {"role": "inbox", "totalEmails": 128, "unreadEmails": 3}
                ]
            },
            "0"
        ]);

        let invocation: Invocation = serde_json::from_value(raw).unwrap();
        assert_eq!(invocation.name, "Mailbox/get");
        assert_eq!(invocation.call_id, "0");
        assert_eq!(invocation.args.list.len(), 1);
        assert_eq!(invocation.args.list[0].unread_emails, 3);
    }

    #[test]
    fn test_invocation_rejects_wrong_arity() {
        let raw = json!(["Mailbox/get", {}]);
        assert!(serde_json::from_value::<Invocation>(raw).is_err());
    }

    #[test]
    fn test_mailbox_role_may_be_null() {
        let raw = json!({"role": null, "totalEmails": 1, "unreadEmails": 0});
        let mailbox: Mailbox = serde_json::from_value(raw).unwrap();
        assert_eq!(mailbox.role, None);
    }

    #[test]
    fn test_title_shows_unread_over_total() {
        let service = FastmailService::new();
        let tally = InboxTally { unread: 3, total: 128 };
        assert_eq!(service.title(&tally), "3/128");
        assert_eq!(service.count(&tally), 3);
        assert!(!service.blank_on_zero());
    }

    #[test]
    fn test_missing_token_is_gated() {
        let service = FastmailService::new();
        let err = service.check_settings(&FastmailSettings::default()).unwrap_err();
        assert!(err.is_missing_credentials());
    }
}
