//! inboxdeck
//!
//! マクロキーパッド用「インボックス件数」ボタンプラグイン群。
//! 各サービス（Fastmail / Amazing Marvin / Todoist / YNAB）をタイマーで
//! ポーリングし、件数をボタンタイトルとして描画する。

#![warn(missing_docs)]

/// 設定管理（環境変数ヘルパー、サービス別ベースURL・間隔）
pub mod config;

/// ボタンタイトルの整形（右パディング、プレースホルダー・エラーグリフ）
pub mod display;

/// エラー型定義
pub mod error;

/// ホストアプリケーション側インターフェース（タイトル・状態・アラート）
pub mod host;

/// ロギング初期化ユーティリティ
pub mod logging;

/// ポーリング・描画ステートマシンとインスタンスレジストリ
pub mod poller;

/// インボックスサービス共通トレイト
pub mod service;

/// サービス別クライアント実装
pub mod services;

/// インスタンス設定ストア（部分マージ）
pub mod settings;

pub use error::PollError;
pub use host::{HostClient, IndicatorState};
pub use poller::{ButtonPoller, DisplayState};
pub use service::InboxService;
