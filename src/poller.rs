//! ポーリング・描画ステートマシン
//!
//! 可視インスタンスごとに1本のタイマーを持ち、設定されたサービスから
//! 件数を取得してホストへ描画する。失敗はエラーグリフ + アラートに
//! 変換され、ループを止めない。
//!
//! ## 世代ガード
//!
//! 実行中のHTTPリクエストはキャンセルしない。代わりにインスタンスの
//! 「世代」を記録し、結果を適用する直前にレジストリの現在世代と比較する。
//! 消滅後や再出現後に完了した古いポーリング結果は破棄される。

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config;
use crate::display::{pad_right, ERROR_GLYPH, PLACEHOLDER_GLYPH};
use crate::error::PollError;
use crate::host::{HostClient, IndicatorState};
use crate::service::InboxService;
use crate::settings::{self, SettingsMap};

/// インスタンス1つ分の表示状態
///
/// `Hidden`はレジストリにエントリが無いことで表現される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayState {
    /// 必須設定が未入力（プレースホルダー表示、ネットワーク未使用）
    AwaitingCredentials,
    /// 取得中または取得待ち
    Polling,
    /// 直近の取得が成功（件数を表示中）
    Displayed(u64),
    /// 直近の取得が失敗（エラーグリフを表示中、診断はログのみ）
    Errored(String),
}

impl DisplayState {
    /// DisplayStateを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingCredentials => "awaiting_credentials",
            Self::Polling => "polling",
            Self::Displayed(_) => "displayed",
            Self::Errored(_) => "errored",
        }
    }
}

impl std::fmt::Display for DisplayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// レジストリ上のインスタンスエントリ
struct Instance<S: InboxService> {
    /// ホストから受け取った設定の部分マージ結果
    settings: SettingsMap,
    /// 現在の表示状態
    state: DisplayState,
    /// 直近成功時の成果（キー押下時のURL計算に使う）
    last_outcome: Option<S::Outcome>,
    /// 可視エポック。出現のたびに加算され、古い結果の適用を防ぐ
    generation: u64,
    /// ポーリングタスクのハンドル（可視中のみ存在）
    timer: Option<JoinHandle<()>>,
}

impl<S: InboxService> Instance<S> {
    fn new() -> Self {
        Self {
            settings: SettingsMap::new(),
            state: DisplayState::Polling,
            last_outcome: None,
            generation: 0,
            timer: None,
        }
    }
}

/// サービス1種に対するボタンポーラー
///
/// ホストランタイムがライフサイクルイベントを配送順どおりに呼び出す。
/// 同一インスタンスのポーリング同士は競合しうるが、完了順の後勝ちで
/// 冪等に収束する。
pub struct ButtonPoller<S: InboxService, H: HostClient> {
    service: Arc<S>,
    host: Arc<H>,
    http: Client,
    instances: Arc<RwLock<HashMap<String, Instance<S>>>>,
}

impl<S: InboxService, H: HostClient> Clone for ButtonPoller<S, H> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            host: Arc::clone(&self.host),
            http: self.http.clone(),
            instances: Arc::clone(&self.instances),
        }
    }
}

impl<S: InboxService, H: HostClient> ButtonPoller<S, H> {
    /// 新しいポーラーを作成する
    pub fn new(service: S, host: Arc<H>) -> Self {
        let http = Client::builder()
            .timeout(config::request_timeout())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            service: Arc::new(service),
            host,
            http,
            instances: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// ホスト接続完了イベント
    ///
    /// 既知のインスタンスについて保存済み設定の再送を要求する。
    pub async fn on_connected(&self) {
        info!(action = self.service.action_id(), "connected to host");

        let contexts: Vec<String> = self.instances.read().await.keys().cloned().collect();
        for context in contexts {
            self.host.request_settings(&context).await;
        }
    }

    /// ボタン出現イベント
    ///
    /// エントリを登録し、プレースホルダーを表示してタイマーを開始し、
    /// 即座に1回ポーリングする。
    pub async fn on_will_appear(&self, context: &str, payload: Option<&SettingsMap>) {
        let width = self.service.title_width();

        {
            let mut instances = self.instances.write().await;
            let entry = instances
                .entry(context.to_string())
                .or_insert_with(Instance::new);

            if let Some(incoming) = payload {
                settings::merge(&mut entry.settings, incoming);
            }

            // 新しい可視エポック。前のエポックの実行中ポーリングを無効化する
            entry.generation += 1;
            entry.state = DisplayState::Polling;

            if let Some(timer) = entry.timer.take() {
                timer.abort();
            }
            entry.timer = Some(self.spawn_timer(context.to_string()));
        }

        debug!(action = self.service.action_id(), context, "button appeared");

        self.host
            .set_title(context, &pad_right(PLACEHOLDER_GLYPH, width, ' '))
            .await;
        self.host.set_state(context, IndicatorState::Normal).await;

        self.poll(context).await;
    }

    /// ボタン消滅イベント
    ///
    /// エントリを削除しタイマーを停止する。未登録のインスタンスや
    /// 二重の消滅通知は何もしない。
    pub async fn on_will_disappear(&self, context: &str) {
        let mut instances = self.instances.write().await;
        if let Some(mut entry) = instances.remove(context) {
            if let Some(timer) = entry.timer.take() {
                timer.abort();
            }
            debug!(action = self.service.action_id(), context, "button disappeared");
        }
    }

    /// 設定受信イベント
    ///
    /// ペイロードに含まれるキーだけを上書きし、即座に再ポーリングする。
    pub async fn on_did_receive_settings(&self, context: &str, payload: &SettingsMap) {
        {
            let mut instances = self.instances.write().await;
            let entry = instances
                .entry(context.to_string())
                .or_insert_with(Instance::new);
            settings::merge(&mut entry.settings, payload);
        }

        debug!(action = self.service.action_id(), context, "settings received");

        self.poll(context).await;
    }

    /// キー押下イベント
    ///
    /// 即座にポーリングした後、サービスの固定URLまたは直近の成果から
    /// 計算したURLをホストに開かせる。
    pub async fn on_key_up(&self, context: &str) {
        self.poll(context).await;

        let (raw_settings, outcome) = {
            let instances = self.instances.read().await;
            match instances.get(context) {
                Some(entry) => (entry.settings.clone(), entry.last_outcome.clone()),
                None => return,
            }
        };

        let Ok(typed) = settings::typed::<S::Settings>(&raw_settings) else {
            return;
        };

        if let Some(url) = self.service.open_url(&typed, outcome.as_ref()) {
            info!(action = self.service.action_id(), context, url = %url, "opening url");
            self.host.open_url(context, &url).await;
        }
    }

    /// 1回のポーリングを実行する
    ///
    /// 必須設定が欠けていればネットワークアクセスなしでプレースホルダー
    /// 表示に遷移する。取得結果は世代が一致する場合だけ適用される。
    pub async fn poll(&self, context: &str) {
        let (raw_settings, generation) = {
            let instances = self.instances.read().await;
            match instances.get(context) {
                Some(entry) => (entry.settings.clone(), entry.generation),
                None => return,
            }
        };

        let typed: S::Settings = match settings::typed(&raw_settings) {
            Ok(typed) => typed,
            Err(err) => {
                self.render_error(context, generation, err).await;
                return;
            }
        };

        if let Err(err) = self.service.check_settings(&typed) {
            self.render_awaiting_credentials(context, generation, &err)
                .await;
            return;
        }

        match self.service.fetch(&self.http, &typed).await {
            Ok(outcome) => self.render_outcome(context, generation, outcome).await,
            Err(err) => self.render_error(context, generation, err).await,
        }
    }

    /// 現在の表示状態（テスト・診断用）
    pub async fn display_state(&self, context: &str) -> Option<DisplayState> {
        self.instances
            .read()
            .await
            .get(context)
            .map(|entry| entry.state.clone())
    }

    /// 稼働中タイマー数（テスト・診断用）
    pub async fn active_timers(&self) -> usize {
        self.instances
            .read()
            .await
            .values()
            .filter(|entry| entry.timer.is_some())
            .count()
    }

    fn spawn_timer(&self, context: String) -> JoinHandle<()> {
        let poller = self.clone();
        let period = self.service.refresh_interval();

        tokio::spawn(async move {
            let mut timer = interval(period);

            // interval()は最初のtickが即時完了する。出現時のポーリングは
            // 呼び出し側が明示的に行うため、ここでは1周期待ってから始める
            timer.tick().await;

            loop {
                timer.tick().await;
                poller.poll(&context).await;
            }
        })
    }

    /// 世代が一致する場合だけ状態を確定させる
    ///
    /// 戻り値が`false`なら結果は古く、描画してはならない。
    async fn commit_state(
        &self,
        context: &str,
        generation: u64,
        state: DisplayState,
        outcome: Option<S::Outcome>,
    ) -> bool {
        let mut instances = self.instances.write().await;
        match instances.get_mut(context) {
            Some(entry) if entry.generation == generation => {
                entry.state = state;
                if let Some(outcome) = outcome {
                    entry.last_outcome = Some(outcome);
                }
                true
            }
            _ => {
                debug!(
                    action = self.service.action_id(),
                    context, "discarding stale poll result"
                );
                false
            }
        }
    }

    async fn render_outcome(&self, context: &str, generation: u64, outcome: S::Outcome) {
        let count = self.service.count(&outcome);
        let width = self.service.title_width();

        let (title, indicator) = if count == 0 && self.service.blank_on_zero() {
            (String::new(), IndicatorState::Accent)
        } else {
            (
                pad_right(&self.service.title(&outcome), width, ' '),
                IndicatorState::Normal,
            )
        };

        let state = DisplayState::Displayed(count);
        if !self.commit_state(context, generation, state, Some(outcome)).await {
            return;
        }

        debug!(action = self.service.action_id(), context, count, "poll succeeded");

        self.host.set_state(context, indicator).await;
        self.host.set_title(context, &title).await;
    }

    async fn render_error(&self, context: &str, generation: u64, err: PollError) {
        let width = self.service.title_width();

        let state = DisplayState::Errored(err.to_string());
        if !self.commit_state(context, generation, state, None).await {
            return;
        }

        warn!(
            action = self.service.action_id(),
            context,
            kind = err.kind(),
            error = %err,
            "poll failed"
        );
        self.host
            .log_message(&format!("[{}] {}", self.service.action_id(), err))
            .await;

        self.host.set_state(context, IndicatorState::Normal).await;
        self.host
            .set_title(context, &pad_right(ERROR_GLYPH, width, ' '))
            .await;
        self.host.show_alert(context).await;
    }

    async fn render_awaiting_credentials(&self, context: &str, generation: u64, err: &PollError) {
        let width = self.service.title_width();

        if !self
            .commit_state(context, generation, DisplayState::AwaitingCredentials, None)
            .await
        {
            return;
        }

        debug!(
            action = self.service.action_id(),
            context,
            error = %err,
            "waiting for credentials"
        );

        self.host.set_state(context, IndicatorState::Normal).await;
        self.host
            .set_title(context, &pad_right(PLACEHOLDER_GLYPH, width, ' '))
            .await;
    }
}
