//! Elm アプリの `app.ports` との接続
//!
//! ```text
//! app.ports.size.send(value)            ← ElmSizePort（出力）
//! app.ports.initSizeInfo.subscribe(fn)  ← InitSignal（入力）
//! ```

use alloc::format;
use alloc::string::String;

use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use avl_size_core::{BridgeError, DimensionPair, Payload, PayloadFormat, SizePort};

/// `app.ports.<name>` を取得する
fn lookup_port(app: &JsValue, name: &str) -> Result<JsValue, BridgeError> {
    let ports = Reflect::get(app, &JsValue::from_str("ports"))
        .ok()
        .filter(|v| v.is_object())
        .ok_or_else(|| BridgeError::PortUnavailable(String::from("ports")))?;

    Reflect::get(&ports, &JsValue::from_str(name))
        .ok()
        .filter(|v| v.is_object())
        .ok_or_else(|| BridgeError::PortUnavailable(format!("ports.{}", name)))
}

/// `port.<method>` を関数として取得する
fn lookup_method(port: &JsValue, port_name: &str, method: &str) -> Result<Function, BridgeError> {
    Reflect::get(port, &JsValue::from_str(method))
        .ok()
        .and_then(|v| v.dyn_into::<Function>().ok())
        .ok_or_else(|| BridgeError::PortUnavailable(format!("ports.{}.{}", port_name, method)))
}

/// アプリコアへの出力ポート
pub struct ElmSizePort {
    port: JsValue,
    send: Function,
    format: PayloadFormat,
}

impl ElmSizePort {
    /// `app.ports.<name>.send` を解決する
    ///
    /// # エラー
    /// - `PortUnavailable`: ポートまたは `send` が無い
    pub fn resolve(app: &JsValue, name: &str, format: PayloadFormat) -> Result<Self, BridgeError> {
        let port = lookup_port(app, name)?;
        let send = lookup_method(&port, name, "send")?;
        Ok(ElmSizePort { port, send, format })
    }

    /// 送信する JS 値を組み立てる
    ///
    /// NaN は Number の NaN としてそのまま渡す。
    fn to_js(&self, pair: DimensionPair) -> JsValue {
        match pair.to_payload(self.format) {
            Payload::Record { width, height } => {
                let obj = Object::new();
                // 新規の plain object への set は失敗しない
                let _ = Reflect::set(&obj, &JsValue::from_str("width"), &JsValue::from_f64(width));
                let _ = Reflect::set(&obj, &JsValue::from_str("height"), &JsValue::from_f64(height));
                obj.into()
            }
            Payload::Tuple([width, height]) => {
                Array::of2(&JsValue::from_f64(width), &JsValue::from_f64(height)).into()
            }
        }
    }
}

impl SizePort for ElmSizePort {
    fn send(&self, pair: DimensionPair) {
        let value = self.to_js(pair);
        if let Err(e) = self.send.call1(&self.port, &value) {
            // fire-and-forget: アプリ側の例外はここで止める
            tracing::warn!(error = ?e, "size port send threw");
        }
    }
}

/// アプリコアからの initSizeInfo シグナル
pub struct InitSignal {
    port: JsValue,
    name: String,
    subscribe: Function,
    /// 古い Elm ランタイムには無い場合がある
    unsubscribe: Option<Function>,
}

impl InitSignal {
    /// `app.ports.<name>.subscribe` を解決する
    ///
    /// # エラー
    /// - `PortUnavailable`: ポートまたは `subscribe` が無い
    pub fn resolve(app: &JsValue, name: &str) -> Result<Self, BridgeError> {
        let port = lookup_port(app, name)?;
        let subscribe = lookup_method(&port, name, "subscribe")?;
        let unsubscribe = lookup_method(&port, name, "unsubscribe").ok();
        Ok(InitSignal {
            port,
            name: String::from(name),
            subscribe,
            unsubscribe,
        })
    }

    pub fn subscribe(&self, callback: &Function) -> Result<(), BridgeError> {
        self.subscribe
            .call1(&self.port, callback)
            .map(|_| ())
            .map_err(|_| BridgeError::PortUnavailable(format!("ports.{}.subscribe", self.name)))
    }

    /// 登録を外す。`unsubscribe` が無い、または失敗した場合は `false`
    pub fn unsubscribe(&self, callback: &Function) -> bool {
        match &self.unsubscribe {
            Some(unsubscribe) => unsubscribe.call1(&self.port, callback).is_ok(),
            None => false,
        }
    }
}
