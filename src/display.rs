//! ボタンタイトルの整形
//!
//! 数字の桁数が変わってもタイトルの見た目が揺れないよう、固定幅まで
//! 右側に空白を詰める。数字グリフは空白より幅が広いため、左上隅の
//! 決まった位置に値を置くにはこのパディングが必要になる。

/// 資格情報未入力時に表示するプレースホルダー
pub const PLACEHOLDER_GLYPH: &str = "?";

/// 取得失敗時に表示するエラーグリフ
pub const ERROR_GLYPH: &str = "!";

/// 標準のタイトル幅（1〜2桁の件数向け）
pub const DEFAULT_TITLE_WIDTH: usize = 7;

/// 3桁に達しうるサービス向けの広いタイトル幅
pub const WIDE_TITLE_WIDTH: usize = 8;

/// `value`が`width`文字に達するまで`pad`を末尾に追加する
///
/// すでに`width`以上の場合は切り詰めずそのまま返す。
pub fn pad_right(value: &str, width: usize, pad: char) -> String {
    let mut result = String::from(value);
    while result.len() < width {
        result.push(pad);
    }
    result
}
