//! ブラウザ DOM 上のトレイト実装
//!
//! - `DomLocator`: `getElementsByClassName(marker)[0]` の最初の子要素を返す
//! - `DomWatcher`: 属性変更のみを監視する MutationObserver を登録する

use alloc::boxed::Box;
use alloc::string::{String, ToString};

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, MutationObserver, MutationObserverInit};

use avl_size_core::{AttributeSource, BridgeError, ElementLocator, MutationWatcher, Subscription};

/// MutationObserver コンストラクタの候補（ベンダープレフィックス版を順に試す）
const OBSERVER_CONSTRUCTORS: [&str; 3] = [
    "MutationObserver",
    "WebKitMutationObserver",
    "MozMutationObserver",
];

/// 観測対象の DOM 要素
///
/// ページ側が所有する要素への参照を持つだけ。
#[derive(Clone)]
pub struct DomElement(pub Element);

impl AttributeSource for DomElement {
    fn attribute(&self, name: &str) -> Option<String> {
        self.0.get_attribute(name)
    }
}

/// グローバル document から観測対象を探す
#[derive(Default)]
pub struct DomLocator;

impl ElementLocator for DomLocator {
    type Element = DomElement;

    fn locate(&self, marker_class: &str) -> Result<DomElement, BridgeError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| BridgeError::MarkerNotFound(marker_class.to_string()))?;

        let marker = document
            .get_elements_by_class_name(marker_class)
            .item(0)
            .ok_or_else(|| BridgeError::MarkerNotFound(marker_class.to_string()))?;

        // children[0] と同じく要素ノードのみを対象にする
        marker
            .first_element_child()
            .map(DomElement)
            .ok_or_else(|| BridgeError::MarkerEmpty(marker_class.to_string()))
    }
}

/// 使える MutationObserver コンストラクタを探す
fn observer_constructor() -> Option<Function> {
    let window: JsValue = web_sys::window()?.into();
    OBSERVER_CONSTRUCTORS.iter().find_map(|name| {
        Reflect::get(&window, &JsValue::from_str(name))
            .ok()
            .and_then(|v| v.dyn_into::<Function>().ok())
    })
}

#[derive(Default)]
pub struct DomWatcher;

impl MutationWatcher<DomElement> for DomWatcher {
    type Subscription = DomSubscription;

    fn watch(
        &self,
        element: &DomElement,
        on_batch: Box<dyn FnMut()>,
    ) -> Result<DomSubscription, BridgeError> {
        let constructor = observer_constructor().ok_or(BridgeError::ObserverUnavailable)?;

        // レコード配列と observer 引数は読まない。バッチ 1 回 = 呼び出し 1 回
        let callback = Closure::wrap(on_batch);
        let observer: MutationObserver =
            Reflect::construct(&constructor, &Array::of1(callback.as_ref()))
                .map_err(|_| BridgeError::ObserverUnavailable)?
                .unchecked_into();

        let options = MutationObserverInit::new();
        options.set_attributes(true);
        options.set_child_list(false);
        options.set_subtree(false);
        observer
            .observe_with_options(&element.0, &options)
            .map_err(|_| BridgeError::ObserverUnavailable)?;

        Ok(DomSubscription {
            observer,
            _callback: callback,
            connected: true,
        })
    }
}

/// 登録済みの MutationObserver
///
/// drop 時にも disconnect するので、コールバックが解放後に呼ばれることは無い。
pub struct DomSubscription {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut()>,
    connected: bool,
}

impl Subscription for DomSubscription {
    fn disconnect(&mut self) {
        if self.connected {
            self.observer.disconnect();
            self.connected = false;
        }
    }
}

impl Drop for DomSubscription {
    fn drop(&mut self) {
        self.disconnect();
    }
}
