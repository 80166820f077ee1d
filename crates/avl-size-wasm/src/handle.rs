//! SizeBridgeHandle wasm-bindgen エクスポート
//!
//! ホストページから `configurePorts(app)` で生成されるハンドル。
//!
//! initSizeInfo のコールバックはブリッジの強参照を持つ。JS 側でハンドルが
//! GC されても報告は続き、止めるのは `dispose()` の明示呼び出しだけ。

use alloc::format;
use alloc::string::{String, ToString};

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use avl_size_core::{
    BridgeConfig, BridgeError, BridgeState, SharedBridge, SignalOutcome, SizeBridge,
};

use crate::dom::{DomLocator, DomWatcher};
use crate::ports::{ElmSizePort, InitSignal};

type DomBridge = SharedBridge<DomLocator, DomWatcher, ElmSizePort>;

fn to_js_error(e: BridgeError) -> JsError {
    JsError::new(&format!("ShowAvlTree: {}", e))
}

/// サイズブリッジのハンドル
///
/// ## 内部構成
///
/// ```text
/// SizeBridgeHandle
///   ├── InitSignal   - app.ports.initSizeInfo（subscribe / unsubscribe）
///   ├── Closure      - initSizeInfo に登録したコールバック（DomBridge の強参照を持つ）
///   └── DomBridge    - SharedBridge<DomLocator, DomWatcher, ElmSizePort>
/// ```
///
/// ## 寿命
///
/// ハンドルの Drop（`free()` や GC）は監視を止めない。コールバックを
/// ページの寿命まで残すだけ。監視を止めるのは `dispose()` のみ。
///
/// ## スレッド安全性
///
/// WASM はシングルスレッドのため、`!Send + !Sync` を満たす。
/// JS からは単一スレッドで呼び出される前提。
#[wasm_bindgen]
pub struct SizeBridgeHandle {
    bridge: DomBridge,
    signal: InitSignal,
    callback: Option<Closure<dyn FnMut()>>,
}

/// Elm アプリのポートにサイズブリッジを接続する
///
/// # 引数
/// - `app`: `Elm.Main.init(...)` が返したアプリハンドル
/// - `config_json`: 設定の上書き（JSON 文字列、省略可）
///
/// # エラー
/// - `app.ports.size.send` / `app.ports.initSizeInfo.subscribe` が無い
/// - 設定 JSON が不正
///
/// # 例（JavaScript）
/// ```javascript
/// const app = Elm.Main.init({ node });
/// const bridge = configurePorts(app);
/// // 後片付け
/// bridge.dispose();
/// ```
#[wasm_bindgen(js_name = "configurePorts")]
pub fn configure_ports(
    app: &JsValue,
    config_json: Option<String>,
) -> Result<SizeBridgeHandle, JsError> {
    crate::logging::init_default();

    let config = match config_json {
        Some(json) => BridgeConfig::from_json(&json).map_err(to_js_error)?,
        None => BridgeConfig::default(),
    };

    let size_port =
        ElmSizePort::resolve(app, &config.size_port, config.payload).map_err(to_js_error)?;
    let signal = InitSignal::resolve(app, &config.init_port).map_err(to_js_error)?;

    let bridge = SharedBridge::new(SizeBridge::new(DomLocator, DomWatcher, size_port, config));

    let shared = bridge.clone();
    let callback = Closure::<dyn FnMut()>::new(move || on_init_signal(&shared));
    signal
        .subscribe(callback.as_ref().unchecked_ref())
        .map_err(to_js_error)?;

    tracing::debug!("size bridge configured");
    Ok(SizeBridgeHandle {
        bridge,
        signal,
        callback: Some(callback),
    })
}

/// initSizeInfo を受けたときの処理
///
/// アクティベーション失敗はコンソールに出してからホストへ例外として投げる。
fn on_init_signal(bridge: &DomBridge) {
    match bridge.on_signal() {
        SignalOutcome::Activated(_) | SignalOutcome::Busy => {}
        SignalOutcome::Disposed => {
            tracing::warn!("initSizeInfo fired after dispose, ignoring");
        }
        SignalOutcome::Failed(e) => {
            let msg = format!("ShowAvlTree: {}", e);
            web_sys::console::error_1(&JsValue::from_str(&msg));
            wasm_bindgen::throw_str(&msg);
        }
    }
}

#[wasm_bindgen]
impl SizeBridgeHandle {
    /// initSizeInfo の登録を外し、監視を切断する（冪等）
    ///
    /// `unsubscribe` を持たないポートの場合、コールバックは破棄せず残す
    /// （以後呼ばれても `Disposed` として何もしない）。
    #[wasm_bindgen]
    pub fn dispose(&mut self) {
        if let Some(callback) = self.callback.take() {
            if !self.signal.unsubscribe(callback.as_ref().unchecked_ref()) {
                callback.forget();
            }
        }
        self.bridge.dispose();
    }

    #[wasm_bindgen(js_name = "isActive")]
    pub fn is_active(&self) -> bool {
        self.state() == Some(BridgeState::Active)
    }

    #[wasm_bindgen(js_name = "isDisposed")]
    pub fn is_disposed(&self) -> bool {
        self.state() == Some(BridgeState::Disposed)
    }

    /// 観測対象を今すぐ計測して送信する
    ///
    /// Active でなければ何もせず `false` を返す。
    #[wasm_bindgen(js_name = "syncNow")]
    pub fn sync_now(&self) -> bool {
        self.bridge.sync_now().is_some()
    }

    /// 最後に送った値を JSON 文字列で返す
    ///
    /// ```json
    /// { "width": 800, "height": 600 }
    /// ```
    /// NaN は `null` になる。まだ何も送っていなければ `undefined`。
    #[wasm_bindgen(js_name = "lastSize")]
    pub fn last_size(&self) -> Option<String> {
        let pair = self.bridge.last_size()?;
        serde_json::to_string(&pair).ok()
    }

    /// ブリッジ統計を JSON 文字列で返す
    ///
    /// # 戻り値
    /// JSON 文字列:
    /// ```json
    /// {
    ///   "activations": 1,
    ///   "ignored_activations": 0,
    ///   "replaced_activations": 0,
    ///   "batches": 12,
    ///   "sends": 13
    /// }
    /// ```
    #[wasm_bindgen(js_name = "getStats")]
    pub fn get_stats(&self) -> String {
        match self.bridge.stats() {
            Some(stats) => serde_json::to_string(&stats).unwrap_or_default(),
            None => "{}".to_string(),
        }
    }
}

impl SizeBridgeHandle {
    fn state(&self) -> Option<BridgeState> {
        self.bridge.state()
    }
}

/// 登録済みのコールバックは JS 側から呼ばれ続けるので解放しない
impl Drop for SizeBridgeHandle {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback.forget();
        }
    }
}
