//! # avl-size-wasm
//!
//! wasm-bindgen エクスポート：ShowAvlTree のホストページから呼び出す公開 API。
//!
//! グローバルな `window.ShowAvlTree` 名前空間には何も書き込まない。
//! ホストのバンドルが Elm アプリと一緒に import して使う。
//!
//! ## 使用方法（JavaScript）
//!
//! ```javascript
//! import { Elm } from '../src/Main.elm';
//! import init, { configurePorts, initLogging, init_panic_hook } from '../avl-size-pkg/avl_size_wasm';
//!
//! await init();
//! // パニック時のスタックトレースを有効化（開発時）
//! init_panic_hook();
//! // ブリッジのログをコンソールへ（省略時は warn 以上のみ）
//! initLogging("avl_size_core=debug,warn");
//!
//! const app = Elm.Main.init({ node: document.getElementById('app') });
//!
//! // app.ports.initSizeInfo を購読し、発火したら
//! // .show-avl-tree-wrapper の最初の子要素のサイズを app.ports.size へ送り続ける
//! const bridge = configurePorts(app);
//!
//! // 既存の Elm ポートが [width, height] を期待する場合
//! const legacy = configurePorts(app, JSON.stringify({ payload: "tuple" }));
//!
//! // ページから外すとき
//! bridge.dispose();
//! ```

extern crate alloc;

use wasm_bindgen::prelude::*;

pub mod dom;
pub mod handle;
pub mod logging;
pub mod ports;

pub use handle::{configure_ports, SizeBridgeHandle};
pub use logging::init_logging;

/// パニック時にブラウザコンソールにスタックトレースを出力する
///
/// 開発時に必ず呼び出すこと。本番ビルドでは feature flag で無効化可能。
#[wasm_bindgen]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// 属性文字列を 10 進整数として解釈する（`parseInt(text, 10)` 相当）
///
/// ホスト側でブリッジと同じ規則で値を確かめたいとき用。
/// パースできない、または `text` が無い場合は `NaN`。
#[wasm_bindgen(js_name = "parseDimension")]
pub fn parse_dimension(text: Option<String>) -> f64 {
    text.as_deref()
        .map_or(f64::NAN, |t| avl_size_core::parse_int(t).as_f64())
}

