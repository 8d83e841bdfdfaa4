//! サービス別クライアントの統合テスト（wiremock使用）
//!
//! 各サービスの取得・フィルタリングとエラー変換をモックサーバーで検証する。

use inboxdeck::services::fastmail::{FastmailService, FastmailSettings, InboxTally};
use inboxdeck::services::marvin::{MarvinService, MarvinSettings};
use inboxdeck::services::todoist::{TodoistService, TodoistSettings};
use inboxdeck::services::ynab::{YnabService, YnabSettings};
use inboxdeck::{InboxService, PollError};
use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MAIL_URN: &str = "urn:ietf:params:jmap:mail";

#[tokio::test]
async fn test_fastmail_reports_unread_and_total() {
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/session"))
        .and(header("Authorization", "Bearer fm-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "primaryAccounts": { (MAIL_URN): "u123" }
        })))
        .mount(&mock)
        .await;

    Mock::given(method("POST"))
        .and(path("/api"))
        .and(header("Authorization", "Bearer fm-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "methodResponses": [
                ["Mailbox/get", {
                    "accountId": "u123",
                    "list": [
                        {"role": "archive", "totalEmails": 900, "unreadEmails": 0},
                        {"role": "inbox", "totalEmails": 128, "unreadEmails": 3},
                    ]
                }, "0"]
            ]
        })))
        .mount(&mock)
        .await;

    let service = FastmailService::new().with_base_url(mock.uri());
    let settings = FastmailSettings {
        api_token: "fm-token".into(),
    };

    let tally = service.fetch(&Client::new(), &settings).await.unwrap();
    assert_eq!(tally, InboxTally { unread: 3, total: 128 });
    assert_eq!(service.title(&tally), "3/128");
}

#[tokio::test]
async fn test_fastmail_missing_mail_account_is_configuration_error() {
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "primaryAccounts": {}
        })))
        .mount(&mock)
        .await;

    let service = FastmailService::new().with_base_url(mock.uri());
    let settings = FastmailSettings {
        api_token: "fm-token".into(),
    };

    let err = service.fetch(&Client::new(), &settings).await.unwrap_err();
    assert!(matches!(err, PollError::Configuration(_)));
}

#[tokio::test]
async fn test_fastmail_missing_inbox_role_is_malformed() {
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "primaryAccounts": { (MAIL_URN): "u123" }
        })))
        .mount(&mock)
        .await;

    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "methodResponses": [
                ["Mailbox/get", {"accountId": "u123", "list": [
                    {"role": "archive", "totalEmails": 1, "unreadEmails": 0}
                ]}, "0"]
            ]
        })))
        .mount(&mock)
        .await;

    let service = FastmailService::new().with_base_url(mock.uri());
    let settings = FastmailSettings {
        api_token: "fm-token".into(),
    };

    let err = service.fetch(&Client::new(), &settings).await.unwrap_err();
    assert!(matches!(err, PollError::Malformed(_)));
}

#[tokio::test]
async fn test_fastmail_unauthorized_is_transport_error() {
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&mock)
        .await;

    let service = FastmailService::new().with_base_url(mock.uri());
    let settings = FastmailSettings {
        api_token: "bad".into(),
    };

    let err = service.fetch(&Client::new(), &settings).await.unwrap_err();
    match err {
        PollError::Transport(message) => {
            assert!(message.contains("401"));
            assert!(message.contains("invalid token"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_marvin_counts_unassigned_open_tasks() {
    let mock = MockServer::start().await;

    // 5件中2件が「受信箱タスク」の条件を満たす
    Mock::given(method("GET"))
        .and(path("/db1/_all_docs"))
        .and(query_param("include_docs", "true"))
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rows": [
                {"doc": {"title": "Buy milk", "db": "Tasks", "parentId": "unassigned"}},
                {"doc": {"title": "Call dentist", "db": "Tasks", "parentId": {"op": "set", "val": "unassigned"}}},
                {"doc": {"title": "Done", "db": "Tasks", "parentId": "unassigned", "done": true}},
                {"doc": {"title": "Weekly", "db": "Tasks", "parentId": "unassigned", "recurring": true}},
                {"doc": {"db": "Categories", "parentId": null}},
            ]
        })))
        .mount(&mock)
        .await;

    let service = MarvinService::new();
    let settings = MarvinSettings {
        server: mock.uri(),
        database: "db1".into(),
        user: "user".into(),
        password: "pass".into(),
    };

    let count = service.fetch(&Client::new(), &settings).await.unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_marvin_garbage_body_is_malformed() {
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/db1/_all_docs"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&mock)
        .await;

    let service = MarvinService::new();
    let settings = MarvinSettings {
        server: mock.uri(),
        database: "db1".into(),
        user: "user".into(),
        password: "pass".into(),
    };

    let err = service.fetch(&Client::new(), &settings).await.unwrap_err();
    assert!(matches!(err, PollError::Malformed(_)));
}

#[tokio::test]
async fn test_ynab_filters_reserved_accounts_and_remembers_next() {
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/budgets/b-1/transactions"))
        .and(query_param("type", "unapproved"))
        .and(header("Authorization", "Bearer ynab-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "transactions": [
                    {"account_name": "[D] Loan", "account_id": "aD"},
                    {"account_name": "Checking", "account_id": "acct1"},
                ]
            }
        })))
        .mount(&mock)
        .await;

    let service = YnabService::new().with_base_url(mock.uri());
    let settings = YnabSettings {
        budget_uuid: "b-1".into(),
        api_token: "ynab-token".into(),
    };

    let summary = service.fetch(&Client::new(), &settings).await.unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.next_account_id.as_deref(), Some("acct1"));

    // キー押下は最初の未承認口座へ直接ジャンプする
    assert_eq!(
        service.open_url(&settings, Some(&summary)).as_deref(),
        Some("https://app.ynab.com/b-1/accounts/acct1")
    );
}

#[tokio::test]
async fn test_ynab_server_error_is_transport_error() {
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/budgets/b-1/transactions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock)
        .await;

    let service = YnabService::new().with_base_url(mock.uri());
    let settings = YnabSettings {
        budget_uuid: "b-1".into(),
        api_token: "ynab-token".into(),
    };

    let err = service.fetch(&Client::new(), &settings).await.unwrap_err();
    assert!(matches!(err, PollError::Transport(_)));
}

#[tokio::test]
async fn test_todoist_counts_tasks_in_inbox_projects_only() {
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(header("Authorization", "Bearer td-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "p1", "is_inbox_project": true},
            {"id": "p2"},
            {"id": "p3", "is_team_inbox": true},
        ])))
        .mount(&mock)
        .await;

    Mock::given(method("GET"))
        .and(path("/tasks"))
        .and(query_param("project_id", "p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "t1"}, {"id": "t2"}
        ])))
        .mount(&mock)
        .await;

    Mock::given(method("GET"))
        .and(path("/tasks"))
        .and(query_param("project_id", "p3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "t3"}
        ])))
        .mount(&mock)
        .await;

    let service = TodoistService::new().with_base_url(mock.uri());
    let settings = TodoistSettings {
        api_token: "td-token".into(),
    };

    let count = service.fetch(&Client::new(), &settings).await.unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_todoist_task_fetch_failure_propagates() {
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "p1", "is_inbox_project": true},
        ])))
        .mount(&mock)
        .await;

    Mock::given(method("GET"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&mock)
        .await;

    let service = TodoistService::new().with_base_url(mock.uri());
    let settings = TodoistSettings {
        api_token: "td-token".into(),
    };

    let err = service.fetch(&Client::new(), &settings).await.unwrap_err();
    assert!(matches!(err, PollError::Transport(_)));
}
