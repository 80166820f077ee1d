//! avl-size-wasm 統合テスト
//!
//! ホストページ → initSizeInfo → 計測 → ミューテーション監視 → サイズポート
//! の一連の流れを、DOM と Elm ポートの代替実装でシミュレートする。

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use avl_size_core::{
    Activation, AttributeSource, BridgeConfig, BridgeError, BridgeState, DimensionPair,
    ElementLocator, MutationWatcher, PayloadFormat, RepeatPolicy, SharedBridge, SignalOutcome,
    SizeBridge, SizePort, Subscription,
};
use avl_size_wasm::parse_dimension;

// ==============================================================
// ヘルパー: ページ・MutationObserver・Elm ポートの代替
// ==============================================================

/// ホストページ
///
/// マーカー要素の子要素 1 つと、その属性だけを持つ。
/// 属性変更は MutationObserver と同じくマイクロタスク境界まで溜め、
/// `flush` でまとめて 1 バッチとして通知する。
#[derive(Default)]
struct Page {
    marker_class: Option<String>,
    attrs: RefCell<BTreeMap<String, String>>,
    pending_mutations: RefCell<usize>,
    observers: RefCell<Vec<Option<Box<dyn FnMut()>>>>,
}

impl Page {
    fn with_tree_wrapper(width: &str, height: &str) -> Rc<Self> {
        let page = Rc::new(Page {
            marker_class: Some("show-avl-tree-wrapper".to_string()),
            ..Page::default()
        });
        page.attrs.borrow_mut().insert("width".into(), width.into());
        page.attrs.borrow_mut().insert("height".into(), height.into());
        page
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.attrs.borrow_mut().insert(name.into(), value.into());
        *self.pending_mutations.borrow_mut() += 1;
    }

    /// マイクロタスク境界：溜まった変更を 1 バッチとして通知する
    fn flush(&self) {
        let pending = std::mem::take(&mut *self.pending_mutations.borrow_mut());
        if pending == 0 {
            return;
        }
        for cb in self.observers.borrow_mut().iter_mut().flatten() {
            cb();
        }
    }

    fn observer_count(&self) -> usize {
        self.observers.borrow().iter().filter(|o| o.is_some()).count()
    }
}

#[derive(Clone)]
struct PageElement(Rc<Page>);

impl AttributeSource for PageElement {
    fn attribute(&self, name: &str) -> Option<String> {
        self.0.attrs.borrow().get(name).cloned()
    }
}

struct PageLocator(Rc<Page>);

impl ElementLocator for PageLocator {
    type Element = PageElement;

    fn locate(&self, marker_class: &str) -> Result<PageElement, BridgeError> {
        match &self.0.marker_class {
            Some(class) if class == marker_class => Ok(PageElement(self.0.clone())),
            _ => Err(BridgeError::MarkerNotFound(marker_class.to_string())),
        }
    }
}

struct PageWatcher(Rc<Page>);

struct PageSubscription {
    page: Rc<Page>,
    index: usize,
}

impl Subscription for PageSubscription {
    fn disconnect(&mut self) {
        self.page.observers.borrow_mut()[self.index] = None;
    }
}

impl MutationWatcher<PageElement> for PageWatcher {
    type Subscription = PageSubscription;

    fn watch(
        &self,
        _element: &PageElement,
        on_batch: Box<dyn FnMut()>,
    ) -> Result<PageSubscription, BridgeError> {
        let mut observers = self.0.observers.borrow_mut();
        observers.push(Some(on_batch));
        Ok(PageSubscription {
            page: self.0.clone(),
            index: observers.len() - 1,
        })
    }
}

/// app.ports.size の受信側（Elm の update ループ相当）
#[derive(Clone, Default)]
struct ElmInbox {
    messages: Rc<RefCell<Vec<DimensionPair>>>,
}

impl ElmInbox {
    fn received(&self) -> Vec<DimensionPair> {
        self.messages.borrow().clone()
    }
}

impl SizePort for ElmInbox {
    fn send(&self, pair: DimensionPair) {
        self.messages.borrow_mut().push(pair);
    }
}

fn connect(
    page: &Rc<Page>,
    config: BridgeConfig,
) -> (SizeBridge<PageLocator, PageWatcher, ElmInbox>, ElmInbox) {
    let inbox = ElmInbox::default();
    let bridge = SizeBridge::new(
        PageLocator(page.clone()),
        PageWatcher(page.clone()),
        inbox.clone(),
        config,
    );
    (bridge, inbox)
}

// ==============================================================
// シナリオ
// ==============================================================

#[test]
fn test_resize_scenario() {
    let page = Page::with_tree_wrapper("800", "600");
    let (mut bridge, inbox) = connect(&page, BridgeConfig::default());

    // initSizeInfo
    bridge.activate().unwrap();
    assert_eq!(inbox.received(), [DimensionPair::new(800, 600)]);

    // ページのスクリプトが width を変更
    page.set_attribute("width", "1024");
    page.flush();
    assert_eq!(inbox.received().last(), Some(&DimensionPair::new(1024, 600)));

    // 無関係な属性の変更でも全体を読み直して送る
    page.set_attribute("data-foo", "x");
    page.flush();
    assert_eq!(
        inbox.received(),
        [
            DimensionPair::new(800, 600),
            DimensionPair::new(1024, 600),
            DimensionPair::new(1024, 600),
        ]
    );
}

#[test]
fn test_coalesced_mutations_send_once() {
    let page = Page::with_tree_wrapper("800", "600");
    let (mut bridge, inbox) = connect(&page, BridgeConfig::default());
    bridge.activate().unwrap();

    page.set_attribute("width", "300");
    page.set_attribute("height", "200");
    page.set_attribute("style", "display:block");
    page.flush();

    assert_eq!(
        inbox.received(),
        [DimensionPair::new(800, 600), DimensionPair::new(300, 200)]
    );
    assert_eq!(bridge.stats().batches, 1);

    // 変更が無ければ通知も無い
    page.flush();
    assert_eq!(inbox.received().len(), 2);
}

#[test]
fn test_missing_wrapper_fails_before_any_message() {
    let page = Rc::new(Page::default());
    let (mut bridge, inbox) = connect(&page, BridgeConfig::default());

    assert_eq!(
        bridge.activate(),
        Err(BridgeError::MarkerNotFound("show-avl-tree-wrapper".to_string()))
    );
    assert!(inbox.received().is_empty());
    assert_eq!(page.observer_count(), 0);
}

#[test]
fn test_non_numeric_size_is_forwarded_as_nan() {
    let page = Page::with_tree_wrapper("auto", "600");
    let (mut bridge, inbox) = connect(&page, BridgeConfig::default());
    bridge.activate().unwrap();

    let first = inbox.received()[0];
    assert!(first.width.is_nan());
    assert_eq!(first.height.value(), Some(600));
    assert_eq!(bridge.last_size(), Some(first));

    // 先頭が数字でなければ NaN、数字の後ろの単位は無視
    page.set_attribute("width", "%100");
    page.set_attribute("height", "100%");
    page.flush();
    let second = inbox.received()[1];
    assert!(second.width.is_nan());
    assert_eq!(second.height.value(), Some(100));
}

#[test]
fn test_repeated_init_signal_does_not_duplicate_messages() {
    let page = Page::with_tree_wrapper("800", "600");
    let (mut bridge, inbox) = connect(&page, BridgeConfig::default());

    assert_eq!(bridge.activate(), Ok(Activation::Started));
    assert_eq!(bridge.activate(), Ok(Activation::AlreadyActive));
    assert_eq!(bridge.activate(), Ok(Activation::AlreadyActive));
    assert_eq!(page.observer_count(), 1);

    page.set_attribute("width", "640");
    page.flush();
    assert_eq!(
        inbox.received(),
        [DimensionPair::new(800, 600), DimensionPair::new(640, 600)]
    );
}

#[test]
fn test_replace_policy_remeasures() {
    let page = Page::with_tree_wrapper("800", "600");
    let config = BridgeConfig {
        on_repeat: RepeatPolicy::Replace,
        payload: PayloadFormat::Tuple,
        ..BridgeConfig::default()
    };
    let (mut bridge, inbox) = connect(&page, config);

    bridge.activate().unwrap();
    assert_eq!(bridge.activate(), Ok(Activation::Replaced));
    assert_eq!(page.observer_count(), 1);

    page.set_attribute("height", "480");
    page.flush();
    assert_eq!(
        inbox.received(),
        [
            DimensionPair::new(800, 600),
            DimensionPair::new(800, 600),
            DimensionPair::new(800, 480),
        ]
    );
    assert_eq!(inbox.received()[2].to_tuple(), [800.0, 480.0]);
}

#[test]
fn test_dispose_stops_reporting() {
    let page = Page::with_tree_wrapper("800", "600");
    let (mut bridge, inbox) = connect(&page, BridgeConfig::default());
    bridge.activate().unwrap();

    bridge.dispose();
    assert_eq!(bridge.state(), BridgeState::Disposed);
    assert_eq!(page.observer_count(), 0);

    page.set_attribute("width", "1");
    page.flush();
    assert_eq!(inbox.received().len(), 1);
    assert_eq!(bridge.activate(), Err(BridgeError::Disposed));
}

#[test]
fn test_signal_callback_outlives_dropped_handle() {
    let page = Page::with_tree_wrapper("800", "600");
    let (bridge, inbox) = connect(&page, BridgeConfig::default());
    let handle = SharedBridge::new(bridge);
    let on_init = handle.clone();

    // ホスト側のハンドルが GC で解放されても監視は止まらない
    drop(handle);
    assert_eq!(on_init.on_signal(), SignalOutcome::Activated(Activation::Started));
    page.set_attribute("width", "1024");
    page.flush();
    assert_eq!(
        inbox.received(),
        [DimensionPair::new(800, 600), DimensionPair::new(1024, 600)]
    );

    // 止めるのは明示的な dispose だけ
    assert!(on_init.dispose());
    assert_eq!(page.observer_count(), 0);
    page.set_attribute("width", "1");
    page.flush();
    assert_eq!(inbox.received().len(), 2);
    assert_eq!(on_init.on_signal(), SignalOutcome::Disposed);
}

#[test]
fn test_custom_marker_from_json_config() {
    let page = Rc::new(Page {
        marker_class: Some("tree-host".to_string()),
        ..Page::default()
    });
    page.attrs.borrow_mut().insert("data-w".into(), "50".into());
    page.attrs.borrow_mut().insert("data-h".into(), "70".into());

    let config = BridgeConfig::from_json(
        r#"{"markerClass":"tree-host","widthAttribute":"data-w","heightAttribute":"data-h"}"#,
    )
    .unwrap();
    let (mut bridge, inbox) = connect(&page, config);
    bridge.activate().unwrap();

    assert_eq!(inbox.received(), [DimensionPair::new(50, 70)]);
}

#[test]
fn test_parse_dimension_export() {
    assert_eq!(parse_dimension(Some("800".to_string())), 800.0);
    assert_eq!(parse_dimension(Some(" 42px".to_string())), 42.0);
    assert!(parse_dimension(Some("auto".to_string())).is_nan());
    assert!(parse_dimension(Some("\u{0085}5".to_string())).is_nan());
    assert!(parse_dimension(None).is_nan());
}
