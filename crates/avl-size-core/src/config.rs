//! ブリッジ設定
//!
//! 既定値は元のホストページの定数をそのまま再現する。
//! ホストは JSON 文字列で一部だけ上書きできる。
//!
//! ```json
//! { "markerClass": "my-wrapper", "payload": "tuple", "onRepeat": "replace" }
//! ```

use alloc::string::{String, ToString};

use serde::Deserialize;

use crate::{
    BridgeError, DEFAULT_HEIGHT_ATTRIBUTE, DEFAULT_INIT_PORT, DEFAULT_MARKER_CLASS,
    DEFAULT_SIZE_PORT, DEFAULT_WIDTH_ATTRIBUTE,
};

/// サイズポートに載せる値の形
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// `{width, height}` オブジェクト
    #[default]
    Record,
    /// `[width, height]` 配列（既存の Elm ポート向け）
    Tuple,
}

/// Active 中に再度 initSizeInfo を受けたときの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatPolicy {
    /// 何もしない（監視の二重登録を防ぐ）
    #[default]
    Ignore,
    /// 既存の監視を切断してから最初からやり直す
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BridgeConfig {
    /// 観測対象の親要素に付いているクラス名
    pub marker_class: String,
    pub width_attribute: String,
    pub height_attribute: String,
    /// `app.ports` 上の出力ポート名
    pub size_port: String,
    /// `app.ports` 上の入力シグナル名
    pub init_port: String,
    pub payload: PayloadFormat,
    pub on_repeat: RepeatPolicy,
}

impl BridgeConfig {
    /// JSON 文字列から設定を読む。書かれていない項目は既定値
    pub fn from_json(json: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(json).map_err(|e| BridgeError::InvalidConfig(e.to_string()))
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            marker_class: DEFAULT_MARKER_CLASS.to_string(),
            width_attribute: DEFAULT_WIDTH_ATTRIBUTE.to_string(),
            height_attribute: DEFAULT_HEIGHT_ATTRIBUTE.to_string(),
            size_port: DEFAULT_SIZE_PORT.to_string(),
            init_port: DEFAULT_INIT_PORT.to_string(),
            payload: PayloadFormat::Record,
            on_repeat: RepeatPolicy::Ignore,
        }
    }
}
