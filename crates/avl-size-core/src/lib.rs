//! # avl-size-core
//!
//! ホストコンテナのピクセルサイズを可視化アプリ（AVL 木ダイアグラム）へ
//! 同期し続けるサイズブリッジのコア実装。
//!
//! DOM やメッセージポートには直接触れず、トレイト越しに操作する。
//! `no_std` + `alloc` 環境（WASM を含む）で動作し、ブラウザ依存部分は
//! `avl-size-wasm` クレートが実装する。
//!
//! ## 処理の流れ
//!
//! ```text
//! アプリ起動
//!   → initSizeInfo シグナル
//!   → SizeBridge::activate()
//!       1. マーカークラスの要素を探し、その最初の子要素を観測対象にする
//!       2. width / height 属性を読んで DimensionPair を送信（初回計測）
//!       3. 属性変更のみを監視する MutationSubscription を登録
//!   → 以後、ミューテーションのバッチごとに 1 回だけ再計測して送信
//! ```
//!
//! ## 状態遷移
//!
//! ```text
//! Inactive → Active (activate 成功)
//!          → Active (再 activate: RepeatPolicy に従い無視 or 置換)
//!          → Disposed (dispose、終端)
//! ```

#![no_std]
extern crate alloc;

pub mod bridge;
pub mod config;
pub mod dimension;
mod error;
pub mod observer;
pub mod shared;

pub use bridge::{Activation, BridgeState, BridgeStats, SizeBridge};
pub use config::{BridgeConfig, PayloadFormat, RepeatPolicy};
pub use dimension::{parse_int, Dimension, DimensionPair, Payload};
pub use error::BridgeError;
pub use observer::SizeObserver;
pub use shared::{SharedBridge, SignalOutcome};

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;

/// 観測対象要素のマーカークラス（元のホストページの DOM 契約）
pub const DEFAULT_MARKER_CLASS: &str = "show-avl-tree-wrapper";

/// 幅を表す属性名
pub const DEFAULT_WIDTH_ATTRIBUTE: &str = "width";

/// 高さを表す属性名
pub const DEFAULT_HEIGHT_ATTRIBUTE: &str = "height";

/// アプリへサイズを送る出力ポート名
pub const DEFAULT_SIZE_PORT: &str = "size";

/// アプリが発火する「サイズ通知を開始せよ」シグナルのポート名
pub const DEFAULT_INIT_PORT: &str = "initSizeInfo";

/// 文字列属性を読み取れる要素
pub trait AttributeSource {
    /// 属性値を返す。属性が無ければ `None`
    fn attribute(&self, name: &str) -> Option<String>;
}

/// アプリコアへ DimensionPair を運ぶ一方向チャンネル
///
/// 送信は fire-and-forget。ACK もバックプレッシャーも無い。
pub trait SizePort {
    fn send(&self, pair: DimensionPair);
}

impl<T: SizePort + ?Sized> SizePort for Rc<T> {
    fn send(&self, pair: DimensionPair) {
        (**self).send(pair)
    }
}

/// マーカークラスから観測対象要素を解決する
pub trait ElementLocator {
    type Element: AttributeSource;

    /// マーカークラスを持つ最初の要素の、最初の子要素を返す
    ///
    /// # エラー
    /// - `MarkerNotFound`: マーカー要素が存在しない
    /// - `MarkerEmpty`: マーカー要素に子要素が無い
    fn locate(&self, marker_class: &str) -> Result<Self::Element, BridgeError>;
}

/// 要素の属性変更を監視する仕組み
///
/// `on_batch` はミューテーションのバッチごとに 1 回呼ばれる。
/// バッチに含まれるレコードの数や内容は渡さない。
pub trait MutationWatcher<E> {
    type Subscription: Subscription;

    fn watch(
        &self,
        element: &E,
        on_batch: Box<dyn FnMut()>,
    ) -> Result<Self::Subscription, BridgeError>;
}

/// 登録済みのミューテーション監視
///
/// `disconnect` は冪等でなければならない。
pub trait Subscription {
    fn disconnect(&mut self);
}
