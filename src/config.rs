//! Configuration management via environment variables
//!
//! Per-service base URLs, refresh intervals and the shared HTTP timeout.
//! Values are read once when a service or poller is constructed and are
//! read-only afterwards.

use std::time::Duration;

/// Fastmail JMAPのデフォルトベースURL
pub const FASTMAIL_BASE_URL: &str = "https://api.fastmail.com/jmap";

/// Todoist REST v2のデフォルトベースURL
pub const TODOIST_BASE_URL: &str = "https://api.todoist.com/rest/v2";

/// YNAB APIのデフォルトベースURL
pub const YNAB_BASE_URL: &str = "https://api.ynab.com/v1";

/// HTTPリクエストのタイムアウト（秒）
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// 標準のポーリング間隔（秒）
const DEFAULT_REFRESH_SECS: u64 = 60;

/// YNABのポーリング間隔（秒）: レート制限が厳しいため長め
const YNAB_REFRESH_SECS: u64 = 120;

/// Get an environment variable, treating empty values as unset
pub fn get_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value
pub fn get_env_or(name: &str, default: &str) -> String {
    get_env(name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable, parsing to a specific type
///
/// Returns `default` if the variable is unset or fails to parse.
pub fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    get_env(name).and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Fastmail JMAPベースURL（`INBOXDECK_FASTMAIL_BASE_URL`で上書き可能）
pub fn fastmail_base_url() -> String {
    get_env_or("INBOXDECK_FASTMAIL_BASE_URL", FASTMAIL_BASE_URL)
}

/// Todoist REST v2ベースURL（`INBOXDECK_TODOIST_BASE_URL`で上書き可能）
pub fn todoist_base_url() -> String {
    get_env_or("INBOXDECK_TODOIST_BASE_URL", TODOIST_BASE_URL)
}

/// YNAB APIベースURL（`INBOXDECK_YNAB_BASE_URL`で上書き可能）
pub fn ynab_base_url() -> String {
    get_env_or("INBOXDECK_YNAB_BASE_URL", YNAB_BASE_URL)
}

/// 共有HTTPクライアントのタイムアウト
pub fn request_timeout() -> Duration {
    Duration::from_secs(get_env_parse(
        "INBOXDECK_REQUEST_TIMEOUT_SECS",
        REQUEST_TIMEOUT_SECS,
    ))
}

/// 標準のポーリング間隔（`INBOXDECK_REFRESH_SECS`で上書き可能）
pub fn default_refresh_interval() -> Duration {
    Duration::from_secs(get_env_parse("INBOXDECK_REFRESH_SECS", DEFAULT_REFRESH_SECS))
}

/// YNABのポーリング間隔（`INBOXDECK_YNAB_REFRESH_SECS`で上書き可能）
pub fn ynab_refresh_interval() -> Duration {
    Duration::from_secs(get_env_parse(
        "INBOXDECK_YNAB_REFRESH_SECS",
        YNAB_REFRESH_SECS,
    ))
}
