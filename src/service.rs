//! インボックスサービス共通トレイト
//!
//! 新しいサービスを追加するにはこのトレイトを実装する。取得・整形・
//! URL計算だけをサービス側が持ち、タイマー・レジストリ・描画の流れは
//! `poller`が共通で受け持つ。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::display;
use crate::error::PollError;

/// インボックスサービス1種に対する取得・整形の契約
#[async_trait]
pub trait InboxService: Send + Sync + 'static {
    /// サービス固有の型付き設定
    ///
    /// 設定マップから`#[serde(default)]`で変換されるため、欠けている
    /// フィールドは空値になる。必須チェックは`check_settings`で行う。
    type Settings: DeserializeOwned + Default + Clone + Send + Sync + 'static;

    /// 1回の取得の成果（件数、または件数と付随情報）
    type Outcome: Clone + Send + Sync + 'static;

    /// ホストプロトコル上のアクション識別子
    fn action_id(&self) -> &'static str;

    /// ポーリング間隔
    fn refresh_interval(&self) -> Duration;

    /// タイトルの固定幅
    fn title_width(&self) -> usize {
        display::DEFAULT_TITLE_WIDTH
    }

    /// 件数0のときタイトルを空にするか
    ///
    /// サービスごとの方針であり統一しない。空にしないサービスは
    /// `title`の戻り値が0件でもそのまま描画される。
    fn blank_on_zero(&self) -> bool {
        true
    }

    /// 必須設定フィールドの存在確認
    ///
    /// 欠けている場合は`PollError::MissingCredentials`を返し、
    /// ネットワークアクセスは行われない。
    fn check_settings(&self, settings: &Self::Settings) -> Result<(), PollError>;

    /// 1回の取得を実行する
    ///
    /// リトライしない。タイムアウトは共有クライアントに委ねる。
    async fn fetch(
        &self,
        http: &Client,
        settings: &Self::Settings,
    ) -> Result<Self::Outcome, PollError>;

    /// 成果から件数を取り出す
    fn count(&self, outcome: &Self::Outcome) -> u64;

    /// 成果からタイトル文字列（パディング前）を作る
    fn title(&self, outcome: &Self::Outcome) -> String {
        self.count(outcome).to_string()
    }

    /// キー押下時に開くURL
    ///
    /// 直近の成果に依存するサービス（YNAB）は`outcome`から深いリンクを
    /// 計算する。`None`なら何も開かない。
    fn open_url(
        &self,
        settings: &Self::Settings,
        outcome: Option<&Self::Outcome>,
    ) -> Option<String>;
}
