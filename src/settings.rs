//! インスタンス設定ストア
//!
//! ホストがインスタンスごとに永続化する設定のインメモリコピー。
//! 受信ペイロードに含まれるキーだけを上書きする部分マージが唯一の
//! 更新手段で、欠けているキーは以前の値を保持する。

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::PollError;

/// インスタンス1つ分の設定（フィールド名 → JSON値）
pub type SettingsMap = Map<String, Value>;

/// `incoming`に存在するキーだけを`stored`へ上書きする
///
/// `incoming`に無いキーは触らない。`null`値もキーが存在する限り
/// 「明示的な上書き」として扱う。
pub fn merge(stored: &mut SettingsMap, incoming: &SettingsMap) {
    for (key, value) in incoming {
        stored.insert(key.clone(), value.clone());
    }
}

/// 設定マップをサービス固有の型付き設定へ変換する
///
/// 未知のキーは無視し、欠けているキーは`Default`で補う前提
/// （各サービスの設定構造体は`#[serde(default)]`を付ける）。
pub fn typed<S: DeserializeOwned>(map: &SettingsMap) -> Result<S, PollError> {
    serde_json::from_value(Value::Object(map.clone())).map_err(PollError::from)
}
