//! アクティベーション状態機械
//!
//! initSizeInfo シグナルを受けるたびに `activate` が呼ばれる。
//! 監視の登録は `SizeBridge` が所有し、`dispose` または drop で必ず解放する。

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::Cell;

use serde::Serialize;

use crate::{
    BridgeConfig, BridgeError, DimensionPair, ElementLocator, MutationWatcher, RepeatPolicy,
    SizeObserver, SizePort, Subscription,
};

/// `activate` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Inactive から監視を開始した
    Started,
    /// すでに Active だったので何もしなかった（RepeatPolicy::Ignore）
    AlreadyActive,
    /// 既存の監視を切断して張り直した（RepeatPolicy::Replace）
    Replaced,
}

/// 外から見えるブリッジの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Inactive,
    Active,
    /// 終端状態。以後の activate はエラー
    Disposed,
}

/// ブリッジの統計情報
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    /// 成功した activate の回数（Replaced を含む）
    pub activations: u64,
    /// 無視した activate の回数
    pub ignored_activations: u64,
    /// 張り直した activate の回数
    pub replaced_activations: u64,
    /// 受け取ったミューテーションバッチ数
    pub batches: u64,
    /// サイズポートへの送信回数（初回計測を含む）
    pub sends: u64,
}

type Observer<L, P> = SizeObserver<<L as ElementLocator>::Element, Rc<P>>;

enum Slot<O, S> {
    Inactive,
    Active { observer: Rc<O>, subscription: S },
    Disposed,
}

/// サイズブリッジ本体
///
/// ## 内部構成
///
/// ```text
/// SizeBridge
///   ├── ElementLocator   - マーカークラスから観測対象を解決
///   ├── MutationWatcher  - 属性変更の監視を登録
///   ├── SizePort         - アプリコアへの出力チャンネル
///   └── Slot::Active
///         ├── SizeObserver  - 計測と送信
///         └── Subscription  - 登録済みの監視（所有）
/// ```
///
/// ## スレッド安全性
///
/// `Rc` / `Cell` を使うため `!Send + !Sync`。
/// ホストのイベントループ上でのみ呼び出す前提。
pub struct SizeBridge<L, W, P>
where
    L: ElementLocator,
    W: MutationWatcher<L::Element>,
{
    locator: L,
    watcher: W,
    port: Rc<P>,
    config: BridgeConfig,
    slot: Slot<Observer<L, P>, W::Subscription>,
    /// 監視コールバックと共有するバッチカウンタ
    batches: Rc<Cell<u64>>,
    activations: u64,
    ignored_activations: u64,
    replaced_activations: u64,
    /// 解放済みの Observer が送った回数
    retired_sends: u64,
    /// 解放済みの Observer が最後に送った値
    retired_last: Option<DimensionPair>,
}

impl<L, W, P> SizeBridge<L, W, P>
where
    L: ElementLocator,
    L::Element: 'static,
    W: MutationWatcher<L::Element>,
    P: SizePort + 'static,
{
    pub fn new(locator: L, watcher: W, port: P, config: BridgeConfig) -> Self {
        SizeBridge {
            locator,
            watcher,
            port: Rc::new(port),
            config,
            slot: Slot::Inactive,
            batches: Rc::new(Cell::new(0)),
            activations: 0,
            ignored_activations: 0,
            replaced_activations: 0,
            retired_sends: 0,
            retired_last: None,
        }
    }

    /// initSizeInfo シグナル 1 回分の処理
    ///
    /// 1. 観測対象要素を解決する（失敗したら何も送らない）
    /// 2. 初回計測を送信する
    /// 3. 属性変更の監視を登録する
    ///
    /// 失敗した場合、状態は呼び出し前のまま（Replace 中の失敗は Inactive）。
    ///
    /// # エラー
    /// - `MarkerNotFound` / `MarkerEmpty`: 観測対象が無い
    /// - `ObserverUnavailable`: 監視を登録できない（初回計測は送信済み）
    /// - `Disposed`: dispose 済み
    pub fn activate(&mut self) -> Result<Activation, BridgeError> {
        let outcome = match self.state() {
            BridgeState::Disposed => {
                tracing::warn!("initSizeInfo received after dispose");
                return Err(BridgeError::Disposed);
            }
            BridgeState::Active => match self.config.on_repeat {
                RepeatPolicy::Ignore => {
                    self.ignored_activations += 1;
                    tracing::debug!("size bridge already active, ignoring repeated activation");
                    return Ok(Activation::AlreadyActive);
                }
                RepeatPolicy::Replace => {
                    self.release();
                    Activation::Replaced
                }
            },
            BridgeState::Inactive => Activation::Started,
        };

        let (observer, subscription) = self.install().map_err(|e| {
            tracing::warn!(error = %e, "size bridge activation failed");
            e
        })?;
        self.slot = Slot::Active {
            observer,
            subscription,
        };

        self.activations += 1;
        if outcome == Activation::Replaced {
            self.replaced_activations += 1;
        }
        tracing::debug!(?outcome, marker = %self.config.marker_class, "size bridge active");
        Ok(outcome)
    }

    /// 監視を解放して Disposed に遷移する（冪等）
    pub fn dispose(&mut self) {
        self.release();
        self.slot = Slot::Disposed;
    }

    /// Active 中の Observer が計測して送信する
    ///
    /// Active でなければ何もしない。
    pub fn sync_now(&self) -> Option<DimensionPair> {
        match &self.slot {
            Slot::Active { observer, .. } => Some(observer.sync()),
            _ => None,
        }
    }

    fn install(&mut self) -> Result<(Rc<Observer<L, P>>, W::Subscription), BridgeError> {
        let element = self.locator.locate(&self.config.marker_class)?;
        let observer = Rc::new(SizeObserver::new(
            element,
            Rc::clone(&self.port),
            &self.config.width_attribute,
            &self.config.height_attribute,
        ));

        // 初回計測
        observer.sync();

        // 監視コールバックは Weak で持つ。解放後に届いたバッチは送信しない
        let weak = Rc::downgrade(&observer);
        let batches = Rc::clone(&self.batches);
        let on_batch = Box::new(move || {
            if let Some(observer) = weak.upgrade() {
                batches.set(batches.get() + 1);
                observer.sync();
            }
        });

        match self.watcher.watch(observer.element(), on_batch) {
            Ok(subscription) => Ok((observer, subscription)),
            Err(e) => {
                self.retired_sends += observer.sends();
                self.retired_last = observer.last_sent().or(self.retired_last);
                Err(e)
            }
        }
    }
}

impl<L, W, P> SizeBridge<L, W, P>
where
    L: ElementLocator,
    W: MutationWatcher<L::Element>,
{
    pub fn state(&self) -> BridgeState {
        match self.slot {
            Slot::Inactive => BridgeState::Inactive,
            Slot::Active { .. } => BridgeState::Active,
            Slot::Disposed => BridgeState::Disposed,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == BridgeState::Active
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// 最後にサイズポートへ送った値
    pub fn last_size(&self) -> Option<DimensionPair> {
        match &self.slot {
            Slot::Active { observer, .. } => observer.last_sent().or(self.retired_last),
            _ => self.retired_last,
        }
    }

    pub fn stats(&self) -> BridgeStats {
        let current = match &self.slot {
            Slot::Active { observer, .. } => observer.sends(),
            _ => 0,
        };
        BridgeStats {
            activations: self.activations,
            ignored_activations: self.ignored_activations,
            replaced_activations: self.replaced_activations,
            batches: self.batches.get(),
            sends: self.retired_sends + current,
        }
    }

    /// Active なら監視を切断して Inactive に戻す
    fn release(&mut self) {
        match core::mem::replace(&mut self.slot, Slot::Inactive) {
            Slot::Active {
                observer,
                mut subscription,
            } => {
                subscription.disconnect();
                self.retired_sends += observer.sends();
                self.retired_last = observer.last_sent().or(self.retired_last);
                tracing::debug!("size bridge subscription disconnected");
            }
            other => self.slot = other,
        }
    }
}

impl<L, W, P> Drop for SizeBridge<L, W, P>
where
    L: ElementLocator,
    W: MutationWatcher<L::Element>,
{
    fn drop(&mut self) {
        self.release();
    }
}
