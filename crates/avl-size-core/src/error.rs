//! サイズブリッジのエラー型

use alloc::string::String;

/// セットアップ／アクティベーションのエラー
///
/// どれも回復不能なセットアップエラーとして扱い、リトライはしない。
/// 属性値が数値でないことはエラーではない（NaN がそのまま送られる）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// マーカークラスを持つ要素が存在しない
    MarkerNotFound(String),
    /// マーカー要素に子要素が無い
    MarkerEmpty(String),
    /// MutationObserver（ベンダープレフィックス版を含む）が使えない
    ObserverUnavailable,
    /// アプリハンドルに必要なポート／メソッドが無い
    PortUnavailable(String),
    /// 設定 JSON の解釈に失敗
    InvalidConfig(String),
    /// dispose 済みのブリッジを activate しようとした
    Disposed,
}

impl core::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BridgeError::MarkerNotFound(class) => {
                write!(f, "No element with marker class '{}'", class)
            }
            BridgeError::MarkerEmpty(class) => {
                write!(f, "Marker element '{}' has no child element", class)
            }
            BridgeError::ObserverUnavailable => write!(f, "MutationObserver is not available"),
            BridgeError::PortUnavailable(name) => write!(f, "Port unavailable: {}", name),
            BridgeError::InvalidConfig(msg) => write!(f, "Invalid bridge config: {}", msg),
            BridgeError::Disposed => write!(f, "Size bridge has been disposed"),
        }
    }
}
