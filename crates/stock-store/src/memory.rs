//! 記憶體帳本儲存
//!
//! 交易依序執行（整個帳本一把鎖），並要求讀取分組批次清單、
//! 寫入批次或產品前先鎖定所屬產品分組。

use std::collections::{BTreeSet, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use rust_decimal::Decimal;
use stock_core::{
    checked, Allocation, AllocationRepository, EntityKind, LedgerStore, LedgerTransaction, Lot,
    LotRepository, Product, ProductGroup, ProductRepository, Recipe, RecipeRepository, Result,
    Sale, SaleRepository, StockError,
};
use uuid::Uuid;

use crate::undo_log::{RecordKey, UndoLog};

/// 帳本狀態
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    pub products: HashMap<Uuid, Product>,
    pub lots: HashMap<Uuid, Lot>,
    pub sales: HashMap<Uuid, Sale>,
    /// 依寫入順序
    pub allocations: Vec<Allocation>,
    pub recipes: HashMap<Uuid, Recipe>,
    pub(crate) next_sequence: u64,
}

impl LedgerState {
    /// 產品名稱分組下的批次，FIFO 順序
    pub fn lots_in_group(&self, group: &ProductGroup) -> Vec<Lot> {
        let mut lots: Vec<Lot> = self
            .lots
            .values()
            .filter(|lot| {
                self.products
                    .get(&lot.product_id)
                    .is_some_and(|p| p.product_name == group.as_str())
            })
            .cloned()
            .collect();
        lots.sort_by_key(Lot::fifo_key);
        lots
    }
}

/// 記憶體帳本儲存
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<LedgerState>,
    /// 下一個交易第 n 次寫入失敗（0 表示不注入）
    fail_write_at: AtomicUsize,
}

impl MemoryStore {
    /// 創建空的帳本
    pub fn new() -> Self {
        Self::default()
    }

    /// 新增配方（交易外）
    pub fn insert_recipe(&self, recipe: Recipe) -> Result<()> {
        let mut state = self.lock_state()?;
        tracing::debug!("新增配方: {} ({} 項原料)", recipe.name, recipe.items.len());
        state.recipes.insert(recipe.id, recipe);
        Ok(())
    }

    /// 目前已提交狀態的複本
    pub fn snapshot(&self) -> LedgerState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 讓下一個交易的第 `nth` 次寫入失敗（從 1 起算）
    pub fn inject_write_failure(&self, nth: usize) {
        self.fail_write_at.store(nth, Ordering::SeqCst);
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| StockError::Persistence("帳本鎖已失效".to_string()))
    }
}

impl LedgerStore for MemoryStore {
    fn transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn LedgerTransaction) -> Result<T>,
    {
        let mut state = self.lock_state()?;
        let fail_at = match self.fail_write_at.swap(0, Ordering::SeqCst) {
            0 => None,
            n => Some(n),
        };

        let mut tx = MemoryTransaction::new(&mut state, fail_at);
        match panic::catch_unwind(AssertUnwindSafe(|| work(&mut tx))) {
            Ok(Ok(value)) => {
                let writes = tx.commit();
                tracing::trace!("交易提交: {} 次寫入", writes);
                Ok(value)
            }
            Ok(Err(e)) => {
                let restored = tx.rollback();
                tracing::debug!("交易回滾: {} (還原 {} 筆記錄)", e, restored);
                Err(e)
            }
            Err(payload) => {
                // 先還原並釋放帳本鎖，鎖才不會被標記為失效
                let restored = tx.rollback();
                tracing::error!("交易中途 panic，已還原 {} 筆記錄", restored);
                drop(state);
                panic::resume_unwind(payload)
            }
        }
    }
}

/// 記憶體交易
pub struct MemoryTransaction<'a> {
    state: &'a mut LedgerState,
    undo: UndoLog,
    locked: BTreeSet<ProductGroup>,
    writes: usize,
    fail_at: Option<usize>,
}

impl<'a> MemoryTransaction<'a> {
    fn new(state: &'a mut LedgerState, fail_at: Option<usize>) -> Self {
        Self {
            state,
            undo: UndoLog::new(),
            locked: BTreeSet::new(),
            writes: 0,
            fail_at,
        }
    }

    fn commit(self) -> usize {
        self.writes
    }

    fn rollback(self) -> usize {
        self.undo.rollback(self.state)
    }

    fn group_of_product(&self, product_id: Uuid) -> Result<ProductGroup> {
        self.state
            .products
            .get(&product_id)
            .map(Product::group)
            .ok_or_else(|| StockError::not_found(EntityKind::Product, product_id))
    }

    fn require_lock(&self, group: &ProductGroup) -> Result<()> {
        if self.locked.contains(group) {
            Ok(())
        } else {
            Err(StockError::Persistence(format!(
                "未鎖定產品分組 {} 即存取其批次",
                group
            )))
        }
    }

    /// 寫入前呼叫：計數並依設定注入失敗
    fn begin_write(&mut self, key: RecordKey) -> Result<()> {
        self.writes += 1;
        if self.fail_at == Some(self.writes) {
            return Err(StockError::Persistence(format!(
                "第 {} 次寫入失敗 ({:?})",
                self.writes, key
            )));
        }
        self.undo.capture(key, &*self.state);
        Ok(())
    }
}

impl LotRepository for MemoryTransaction<'_> {
    fn lots_for_product_group(&mut self, group: &ProductGroup) -> Result<Vec<Lot>> {
        self.require_lock(group)?;
        Ok(self.state.lots_in_group(group))
    }

    fn lots_for_product(&mut self, product_id: Uuid) -> Result<Vec<Lot>> {
        let group = self.group_of_product(product_id)?;
        self.require_lock(&group)?;

        let mut lots: Vec<Lot> = self
            .state
            .lots
            .values()
            .filter(|lot| lot.product_id == product_id)
            .cloned()
            .collect();
        lots.sort_by_key(Lot::fifo_key);
        Ok(lots)
    }

    fn find_lot(&mut self, lot_id: Uuid) -> Result<Option<Lot>> {
        Ok(self.state.lots.get(&lot_id).cloned())
    }

    fn update_remaining(&mut self, lot_id: Uuid, remaining: Decimal) -> Result<()> {
        let product_id = self
            .state
            .lots
            .get(&lot_id)
            .map(|lot| lot.product_id)
            .ok_or_else(|| StockError::not_found(EntityKind::Lot, lot_id))?;
        let group = self.group_of_product(product_id)?;
        self.require_lock(&group)?;

        self.begin_write(RecordKey::Lot(lot_id))?;
        if let Some(lot) = self.state.lots.get_mut(&lot_id) {
            lot.remaining_quantity = remaining;
        }
        Ok(())
    }

    fn insert_lot(&mut self, mut lot: Lot) -> Result<Lot> {
        let group = self.group_of_product(lot.product_id)?;
        self.require_lock(&group)?;

        self.begin_write(RecordKey::Lot(lot.id))?;
        self.undo.capture(RecordKey::LotSequence, &*self.state);
        self.state.next_sequence += 1;
        lot.sequence = self.state.next_sequence;
        self.state.lots.insert(lot.id, lot.clone());
        Ok(lot)
    }
}

impl ProductRepository for MemoryTransaction<'_> {
    fn find_product(&mut self, product_id: Uuid) -> Result<Option<Product>> {
        Ok(self.state.products.get(&product_id).cloned())
    }

    fn adjust_current_stock(&mut self, product_id: Uuid, delta: Decimal) -> Result<()> {
        let group = self.group_of_product(product_id)?;
        self.require_lock(&group)?;

        self.begin_write(RecordKey::Product(product_id))?;
        if let Some(product) = self.state.products.get_mut(&product_id) {
            product.current_stock = checked::add(product.current_stock, delta)?;
        }
        Ok(())
    }

    fn insert_product(&mut self, product: Product) -> Result<()> {
        self.require_lock(&product.group())?;

        self.begin_write(RecordKey::Product(product.id))?;
        self.state.products.insert(product.id, product);
        Ok(())
    }
}

impl AllocationRepository for MemoryTransaction<'_> {
    fn insert_allocation(&mut self, allocation: Allocation) -> Result<()> {
        self.begin_write(RecordKey::Allocations)?;
        self.state.allocations.push(allocation);
        Ok(())
    }

    fn allocations_for_sale(&mut self, sale_id: Uuid) -> Result<Vec<Allocation>> {
        Ok(self
            .state
            .allocations
            .iter()
            .filter(|a| a.sale_id == sale_id)
            .cloned()
            .collect())
    }

    fn allocations_for_lot(&mut self, lot_id: Uuid) -> Result<Vec<Allocation>> {
        Ok(self
            .state
            .allocations
            .iter()
            .filter(|a| a.lot_id == lot_id)
            .cloned()
            .collect())
    }

    fn delete_allocations_for_sale(&mut self, sale_id: Uuid) -> Result<usize> {
        self.begin_write(RecordKey::Allocations)?;
        let before = self.state.allocations.len();
        self.state.allocations.retain(|a| a.sale_id != sale_id);
        Ok(before - self.state.allocations.len())
    }
}

impl SaleRepository for MemoryTransaction<'_> {
    fn insert_sale(&mut self, sale: Sale) -> Result<()> {
        self.begin_write(RecordKey::Sale(sale.id()))?;
        self.state.sales.insert(sale.id(), sale);
        Ok(())
    }

    fn find_sale(&mut self, sale_id: Uuid) -> Result<Option<Sale>> {
        Ok(self.state.sales.get(&sale_id).cloned())
    }

    fn delete_sale(&mut self, sale_id: Uuid) -> Result<()> {
        if !self.state.sales.contains_key(&sale_id) {
            return Err(StockError::not_found(EntityKind::Sale, sale_id));
        }

        self.begin_write(RecordKey::Sale(sale_id))?;
        self.state.sales.remove(&sale_id);
        Ok(())
    }
}

impl RecipeRepository for MemoryTransaction<'_> {
    fn find_recipe(&mut self, recipe_id: Uuid) -> Result<Option<Recipe>> {
        Ok(self.state.recipes.get(&recipe_id).cloned())
    }
}

impl LedgerTransaction for MemoryTransaction<'_> {
    fn lock_product_group(&mut self, group: &ProductGroup) -> Result<()> {
        if self.locked.insert(group.clone()) {
            tracing::trace!("鎖定產品分組: {}", group);
        }
        Ok(())
    }
}
