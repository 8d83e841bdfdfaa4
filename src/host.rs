//! ホストアプリケーション側インターフェース
//!
//! キーパッドを描画するホストアプリケーションへの送信面を抽象化する。
//! トランスポート（WebSocket等）は本クレートの範囲外で、ホストランタイム
//! 側が`HostClient`を実装して注入する。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// ボタンのインジケーター状態
///
/// タイトルとは別にホストが視覚的に描画する小さな状態。`Accent`は
/// 「処理すべきものが無い」ことを示すゴールド表示に使われる。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorState {
    /// 通常表示（state index 0）
    #[default]
    Normal,
    /// 全消化表示（state index 1）
    Accent,
}

impl IndicatorState {
    /// ホストプロトコル上の状態インデックス
    pub fn index(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Accent => 1,
        }
    }

    /// IndicatorStateを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Accent => "accent",
        }
    }
}

impl std::fmt::Display for IndicatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// ホストアプリケーションへの送信呼び出し
///
/// 呼び出しはすべて単方向で、失敗は実装側で処理する（ポーリング側は
/// ホスト書き込み失敗でループを止めない）。
#[async_trait]
pub trait HostClient: Send + Sync + 'static {
    /// ボタンタイトルを設定する
    async fn set_title(&self, context: &str, title: &str);

    /// インジケーター状態を設定する
    async fn set_state(&self, context: &str, state: IndicatorState);

    /// アラート（警告フラッシュ）を表示する
    async fn show_alert(&self, context: &str);

    /// ブラウザーでURLを開く
    async fn open_url(&self, context: &str, url: &str);

    /// 保存済み設定の再送をホストへ要求する
    async fn request_settings(&self, context: &str);

    /// ホストのログチャンネルへ診断メッセージを送る
    async fn log_message(&self, message: &str);
}

/// `MemoryHost`が記録するホスト呼び出し
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    /// `set_title`呼び出し
    SetTitle {
        /// インスタンスハンドル
        context: String,
        /// 設定されたタイトル
        title: String,
    },
    /// `set_state`呼び出し
    SetState {
        /// インスタンスハンドル
        context: String,
        /// 設定されたインジケーター状態
        state: IndicatorState,
    },
    /// `show_alert`呼び出し
    ShowAlert {
        /// インスタンスハンドル
        context: String,
    },
    /// `open_url`呼び出し
    OpenUrl {
        /// インスタンスハンドル
        context: String,
        /// 開いたURL
        url: String,
    },
    /// `request_settings`呼び出し
    RequestSettings {
        /// インスタンスハンドル
        context: String,
    },
    /// `log_message`呼び出し
    LogMessage {
        /// 送信されたメッセージ
        message: String,
    },
}

/// 呼び出しをメモリに記録するホスト実装
///
/// テストスイートおよびドライランで使用する。実ホスト未接続の状態で
/// ポーリング層の出力を観測できる。
#[derive(Debug, Default)]
pub struct MemoryHost {
    calls: Mutex<Vec<HostCall>>,
}

impl MemoryHost {
    /// 空の記録を持つホストを作成する
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().expect("host call log poisoned").push(call);
    }

    /// 記録された全呼び出しのスナップショット
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().expect("host call log poisoned").clone()
    }

    /// 指定インスタンスに設定されたタイトル履歴
    pub fn titles_for(&self, context: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::SetTitle { context: c, title } if c == context => Some(title),
                _ => None,
            })
            .collect()
    }

    /// 指定インスタンスの最後のタイトル
    pub fn last_title(&self, context: &str) -> Option<String> {
        self.titles_for(context).pop()
    }

    /// 指定インスタンスの最後のインジケーター状態
    pub fn last_state(&self, context: &str) -> Option<IndicatorState> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::SetState { context: c, state } if c == context => Some(state),
                _ => None,
            })
            .last()
    }

    /// 指定インスタンスへのアラート回数
    pub fn alert_count(&self, context: &str) -> usize {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, HostCall::ShowAlert { context: c } if c == context))
            .count()
    }

    /// 開かれたURLの履歴
    pub fn opened_urls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::OpenUrl { url, .. } => Some(url),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl HostClient for MemoryHost {
    async fn set_title(&self, context: &str, title: &str) {
        self.record(HostCall::SetTitle {
            context: context.to_string(),
            title: title.to_string(),
        });
    }

    async fn set_state(&self, context: &str, state: IndicatorState) {
        self.record(HostCall::SetState {
            context: context.to_string(),
            state,
        });
    }

    async fn show_alert(&self, context: &str) {
        self.record(HostCall::ShowAlert {
            context: context.to_string(),
        });
    }

    async fn open_url(&self, context: &str, url: &str) {
        self.record(HostCall::OpenUrl {
            context: context.to_string(),
            url: url.to_string(),
        });
    }

    async fn request_settings(&self, context: &str) {
        self.record(HostCall::RequestSettings {
            context: context.to_string(),
        });
    }

    async fn log_message(&self, message: &str) {
        self.record(HostCall::LogMessage {
            message: message.to_string(),
        });
    }
}
