//! シグナルコールバックとホストハンドルで共有するブリッジ
//!
//! initSizeInfo のコールバックは `SharedBridge` の強参照を持つ。
//! ホスト側のハンドルを捨てても監視は止まらず、止めるのは明示的な `dispose` だけ。

use alloc::rc::Rc;
use core::cell::RefCell;

use crate::{
    Activation, BridgeError, BridgeState, BridgeStats, DimensionPair, ElementLocator,
    MutationWatcher, SizeBridge, SizePort,
};

/// initSizeInfo 1 回分の処理結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    Activated(Activation),
    /// アクティベーション中に同期的にシグナルが届いた（無視した）
    Busy,
    /// dispose 済み（無視した）
    Disposed,
    /// セットアップ失敗。ホストへ報告すべきエラー
    Failed(BridgeError),
}

pub struct SharedBridge<L, W, P>
where
    L: ElementLocator,
    W: MutationWatcher<L::Element>,
{
    inner: Rc<RefCell<SizeBridge<L, W, P>>>,
}

impl<L, W, P> Clone for SharedBridge<L, W, P>
where
    L: ElementLocator,
    W: MutationWatcher<L::Element>,
{
    fn clone(&self) -> Self {
        SharedBridge {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<L, W, P> SharedBridge<L, W, P>
where
    L: ElementLocator,
    L::Element: 'static,
    W: MutationWatcher<L::Element>,
    P: SizePort + 'static,
{
    pub fn new(bridge: SizeBridge<L, W, P>) -> Self {
        SharedBridge {
            inner: Rc::new(RefCell::new(bridge)),
        }
    }

    /// initSizeInfo を受けたときの処理
    ///
    /// 送信中にアプリが同期的にシグナルを返してきた場合は借用中なので `Busy`。
    pub fn on_signal(&self) -> SignalOutcome {
        let result = match self.inner.try_borrow_mut() {
            Ok(mut bridge) => bridge.activate(),
            Err(_) => {
                tracing::warn!("initSizeInfo fired during activation, ignoring");
                return SignalOutcome::Busy;
            }
        };
        match result {
            Ok(activation) => SignalOutcome::Activated(activation),
            Err(BridgeError::Disposed) => SignalOutcome::Disposed,
            Err(e) => SignalOutcome::Failed(e),
        }
    }

    /// 監視を解放する。アクティベーション中で借用できなければ `false`
    pub fn dispose(&self) -> bool {
        match self.inner.try_borrow_mut() {
            Ok(mut bridge) => {
                bridge.dispose();
                true
            }
            Err(_) => {
                tracing::warn!("dispose called during activation");
                false
            }
        }
    }

    pub fn sync_now(&self) -> Option<DimensionPair> {
        self.inner.try_borrow().ok()?.sync_now()
    }
}

impl<L, W, P> SharedBridge<L, W, P>
where
    L: ElementLocator,
    W: MutationWatcher<L::Element>,
{
    pub fn state(&self) -> Option<BridgeState> {
        self.inner.try_borrow().ok().map(|b| b.state())
    }

    pub fn last_size(&self) -> Option<DimensionPair> {
        self.inner.try_borrow().ok()?.last_size()
    }

    pub fn stats(&self) -> Option<BridgeStats> {
        self.inner.try_borrow().ok().map(|b| b.stats())
    }
}
