//! 交易還原日誌
//!
//! 每筆記錄只保存交易內第一次寫入前的狀態，回滾時依相反順序還原。

use std::collections::HashSet;

use stock_core::{Allocation, Lot, Product, Sale};
use uuid::Uuid;

use crate::memory::LedgerState;

/// 被寫入的記錄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Product(Uuid),
    Lot(Uuid),
    Sale(Uuid),
    /// 分配表整體（保留插入順序）
    Allocations,
    /// 批次建立順序計數器
    LotSequence,
}

#[derive(Debug, Clone)]
enum BeforeImage {
    Product(Option<Product>),
    Lot(Option<Lot>),
    Sale(Option<Sale>),
    Allocations(Vec<Allocation>),
    LotSequence(u64),
}

/// 還原日誌
#[derive(Debug, Default)]
pub struct UndoLog {
    touched: HashSet<RecordKey>,
    images: Vec<(RecordKey, BeforeImage)>,
}

impl UndoLog {
    /// 創建新的日誌
    pub fn new() -> Self {
        Self::default()
    }

    /// 寫入前記錄；同一記錄只保存第一次的狀態
    pub fn capture(&mut self, key: RecordKey, state: &LedgerState) {
        if !self.touched.insert(key) {
            return;
        }

        let image = match key {
            RecordKey::Product(id) => BeforeImage::Product(state.products.get(&id).cloned()),
            RecordKey::Lot(id) => BeforeImage::Lot(state.lots.get(&id).cloned()),
            RecordKey::Sale(id) => BeforeImage::Sale(state.sales.get(&id).cloned()),
            RecordKey::Allocations => BeforeImage::Allocations(state.allocations.clone()),
            RecordKey::LotSequence => BeforeImage::LotSequence(state.next_sequence),
        };
        self.images.push((key, image));
    }

    /// 檢查記錄是否已被寫入
    pub fn is_touched(&self, key: &RecordKey) -> bool {
        self.touched.contains(key)
    }

    /// 被寫入的記錄數
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// 還原所有記錄，回傳還原筆數
    pub fn rollback(self, state: &mut LedgerState) -> usize {
        let restored = self.images.len();

        for (key, image) in self.images.into_iter().rev() {
            match (key, image) {
                (RecordKey::Product(id), BeforeImage::Product(before)) => {
                    restore(&mut state.products, id, before)
                }
                (RecordKey::Lot(id), BeforeImage::Lot(before)) => {
                    restore(&mut state.lots, id, before)
                }
                (RecordKey::Sale(id), BeforeImage::Sale(before)) => {
                    restore(&mut state.sales, id, before)
                }
                (RecordKey::Allocations, BeforeImage::Allocations(before)) => {
                    state.allocations = before;
                }
                (RecordKey::LotSequence, BeforeImage::LotSequence(before)) => {
                    state.next_sequence = before;
                }
                // capture 保證鍵與狀態種類一致
                _ => {}
            }
        }

        restored
    }
}

fn restore<V>(table: &mut std::collections::HashMap<Uuid, V>, id: Uuid, before: Option<V>) {
    match before {
        Some(value) => {
            table.insert(id, value);
        }
        None => {
            table.remove(&id);
        }
    }
}
