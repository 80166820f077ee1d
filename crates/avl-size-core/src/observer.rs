//! 観測対象要素の計測と送信（sendSize）

use alloc::string::String;
use core::cell::Cell;

use crate::{AttributeSource, DimensionPair, SizePort};

/// 1 つの要素を計測してサイズポートへ送る
///
/// 要素は所有しない参照（DOM 側のハンドル）として保持する。
/// `sync` は同期的に完了し、途中で中断しない。
pub struct SizeObserver<E, P> {
    element: E,
    port: P,
    width_attribute: String,
    height_attribute: String,
    /// 送信回数
    sends: Cell<u64>,
    /// 最後に送った値
    last_sent: Cell<Option<DimensionPair>>,
}

impl<E: AttributeSource, P: SizePort> SizeObserver<E, P> {
    pub fn new(element: E, port: P, width_attribute: &str, height_attribute: &str) -> Self {
        SizeObserver {
            element,
            port,
            width_attribute: String::from(width_attribute),
            height_attribute: String::from(height_attribute),
            sends: Cell::new(0),
            last_sent: Cell::new(None),
        }
    }

    /// 現在の width / height 属性を読んで DimensionPair にする
    pub fn measure(&self) -> DimensionPair {
        let width = self.element.attribute(&self.width_attribute);
        let height = self.element.attribute(&self.height_attribute);
        DimensionPair::from_attributes(width.as_deref(), height.as_deref())
    }

    /// 計測してサイズポートへ送信する
    pub fn sync(&self) -> DimensionPair {
        let pair = self.measure();
        tracing::debug!(width = %pair.width, height = %pair.height, "sending container size");
        self.port.send(pair);
        self.sends.set(self.sends.get() + 1);
        self.last_sent.set(Some(pair));
        pair
    }
}

impl<E, P> SizeObserver<E, P> {
    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn sends(&self) -> u64 {
        self.sends.get()
    }

    pub fn last_sent(&self) -> Option<DimensionPair> {
        self.last_sent.get()
    }
}
