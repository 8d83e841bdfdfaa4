//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! ポーリング中のあらゆる失敗は`PollError`に正規化され、ポーリング境界で
//! 表示状態（エラーグリフ + アラート）へ変換される。タイマーを停止させる
//! エラーは存在しない。

use thiserror::Error;

/// ポーリング失敗の分類
#[derive(Debug, Error)]
pub enum PollError {
    /// 必須設定フィールドが未入力（ネットワークアクセスは行わない）
    #[error("missing required setting: {0}")]
    MissingCredentials(&'static str),

    /// ネットワークエラーまたは非2xx応答
    #[error("transport error: {0}")]
    Transport(String),

    /// 応答の構造が期待と異なる（必須フィールド欠落等）
    #[error("malformed response: {0}")]
    Malformed(String),

    /// 導出値が解決できない（例: JMAPメールアカウント不在）
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PollError {
    /// 資格情報不足エラーかどうか
    ///
    /// このエラーだけは表示がエラーグリフではなくプレースホルダーになり、
    /// ホストへのアラート要求も行わない。
    pub fn is_missing_credentials(&self) -> bool {
        matches!(self, Self::MissingCredentials(_))
    }

    /// エラー分類名を文字列で返す
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredentials(_) => "missing_credentials",
            Self::Transport(_) => "transport",
            Self::Malformed(_) => "malformed",
            Self::Configuration(_) => "configuration",
        }
    }
}

impl From<reqwest::Error> for PollError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PollError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
