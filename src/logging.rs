//! ロギング初期化ユーティリティ

use tracing_subscriber::EnvFilter;

/// tracingサブスクライバーを初期化する
///
/// `RUST_LOG`が未設定の場合は`info`レベルを使用する。二重初期化は
/// 無視する（テストから複数回呼ばれても安全）。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
