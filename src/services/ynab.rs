//! YNAB unapproved-transaction count
//!
//! One `GET {base}/budgets/{budget}/transactions?type=unapproved` lists the
//! transactions waiting for approval. Accounts whose display name starts
//! with a reserved debt/mortgage prefix are excluded, and the first
//! surviving transaction's account id is remembered so a key press can jump
//! straight to that account.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config;
use crate::display;
use crate::error::PollError;
use crate::service::InboxService;

/// Account-name prefixes marking debt/mortgage accounts excluded from the
/// count
const RESERVED_ACCOUNT_PREFIXES: [&str; 2] = ["[D]", "[MD]"];

/// Per-button settings entered in the settings editor
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct YnabSettings {
    /// Budget identifier (UUID)
    pub budget_uuid: String,
    /// Personal access token
    pub api_token: String,
}

/// Count of unapproved transactions plus the deep-link target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnapprovedSummary {
    /// Unapproved transactions on non-excluded accounts
    pub count: u64,
    /// Account id of the first counted transaction, if any
    pub next_account_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    data: TransactionsData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TransactionsData {
    transactions: Vec<Transaction>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Transaction {
    account_name: String,
    account_id: String,
}

fn is_reserved_account(transaction: &Transaction) -> bool {
    RESERVED_ACCOUNT_PREFIXES
        .iter()
        .any(|prefix| transaction.account_name.starts_with(prefix))
}

/// YNAB service client
pub struct YnabService {
    base_url: String,
}

impl YnabService {
    /// Create a client against the configured YNAB base URL
    pub fn new() -> Self {
        Self {
            base_url: config::ynab_base_url(),
        }
    }

    /// Override the base URL (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for YnabService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InboxService for YnabService {
    type Settings = YnabSettings;
    type Outcome = UnapprovedSummary;

    fn action_id(&self) -> &'static str {
        "inboxdeck.ynab"
    }

    fn refresh_interval(&self) -> Duration {
        config::ynab_refresh_interval()
    }

    // Transaction counts reach three digits after a vacation; keep an
    // extra column so the title does not run into the key edge.
    fn title_width(&self) -> usize {
        display::WIDE_TITLE_WIDTH
    }

    fn check_settings(&self, settings: &Self::Settings) -> Result<(), PollError> {
        if settings.budget_uuid.is_empty() {
            return Err(PollError::MissingCredentials("budgetUuid"));
        }
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
        let url = format!(
            "{}/budgets/{}/transactions?type=unapproved",
            self.base_url.trim_end_matches('/'),
            settings.budget_uuid
        );

        let response = http
            .get(&url)
            .header("Accept", "application/json")
            .header("Authorization", format!("Bearer {}", settings.api_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PollError::Transport(format!("HTTP {status}: {body}")));
        }

        let transactions: TransactionsResponse = response.json().await?;

        let counted: Vec<&Transaction> = transactions
            .data
            .transactions
            .iter()
            .filter(|transaction| !is_reserved_account(transaction))
            .collect();

        Ok(UnapprovedSummary {
            count: counted.len() as u64,
            next_account_id: counted.first().map(|first| first.account_id.clone()),
        })
    }

    fn count(&self, outcome: &Self::Outcome) -> u64 {
        outcome.count
    }

    fn open_url(
        &self,
        settings: &Self::Settings,
        outcome: Option<&Self::Outcome>,
    ) -> Option<String> {
        let base = "https://app.ynab.com/";
        if settings.budget_uuid.is_empty() {
            return Some(base.to_string());
        }

        let mut url = format!("{base}{}/accounts", settings.budget_uuid);
        if let Some(account_id) = outcome.and_then(|summary| summary.next_account_id.as_deref()) {
            url.push('/');
            url.push_str(account_id);
        }

        Some(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transaction(name: &str, id: &str) -> Transaction {
        serde_json::from_value(json!({"account_name": name, "account_id": id})).unwrap()
    }

    #[test]
    fn test_reserved_prefixes_are_excluded() {
        assert!(is_reserved_account(&transaction("[D] Loan", "a1")));
        assert!(is_reserved_account(&transaction("[MD] Mortgage", "a2")));
        assert!(!is_reserved_account(&transaction("Checking", "a3")));
        // The prefix must be at the start of the name
        assert!(!is_reserved_account(&transaction("Savings [D]", "a4")));
    }

    #[test]
    fn test_open_url_without_budget() {
        let service = YnabService::new();
        let url = service.open_url(&YnabSettings::default(), None);
        assert_eq!(url.as_deref(), Some("https://app.ynab.com/"));
    }

    #[test]
    fn test_open_url_deep_links_to_next_account() {
        let service = YnabService::new();
        let settings = YnabSettings {
            budget_uuid: "b-1".into(),
            api_token: "t".into(),
        };

        let summary = UnapprovedSummary {
            count: 2,
            next_account_id: Some("acct1".into()),
        };
        assert_eq!(
            service.open_url(&settings, Some(&summary)).as_deref(),
            Some("https://app.ynab.com/b-1/accounts/acct1")
        );

        let empty = UnapprovedSummary::default();
        assert_eq!(
            service.open_url(&settings, Some(&empty)).as_deref(),
            Some("https://app.ynab.com/b-1/accounts")
        );
    }

    #[test]
    fn test_wide_title_width() {
        let service = YnabService::new();
        assert_eq!(service.title_width(), display::WIDE_TITLE_WIDTH);
    }

    #[test]
    fn test_missing_budget_reported_first() {
        let service = YnabService::new();
        assert!(matches!(
            service.check_settings(&YnabSettings::default()),
            Err(PollError::MissingCredentials("budgetUuid"))
        ));
    }
}
