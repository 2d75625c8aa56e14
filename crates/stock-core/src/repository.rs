//! 儲存協作介面
//!
//! 引擎只透過這些介面讀寫帳本。所有呼叫都在同一個交易內進行，
//! 「全部成功或全部回滾」由實作方保證。

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{Allocation, Lot, Product, ProductGroup, Recipe, Result, Sale};

/// 批次存取
pub trait LotRepository {
    /// 取得產品名稱分組下的所有批次，依入庫時間（其次建立順序）遞增排序
    fn lots_for_product_group(&mut self, group: &ProductGroup) -> Result<Vec<Lot>>;

    /// 取得單一產品ID的所有批次，排序同上
    fn lots_for_product(&mut self, product_id: Uuid) -> Result<Vec<Lot>>;

    fn find_lot(&mut self, lot_id: Uuid) -> Result<Option<Lot>>;

    /// 更新剩餘數量
    fn update_remaining(&mut self, lot_id: Uuid, remaining: Decimal) -> Result<()>;

    /// 新增批次，回傳已指派建立順序的批次
    fn insert_lot(&mut self, lot: Lot) -> Result<Lot>;
}

/// 產品存取
pub trait ProductRepository {
    fn find_product(&mut self, product_id: Uuid) -> Result<Option<Product>>;

    /// 調整現有庫存（正數增加，負數減少）
    fn adjust_current_stock(&mut self, product_id: Uuid, delta: Decimal) -> Result<()>;

    fn insert_product(&mut self, product: Product) -> Result<()>;
}

/// 分配記錄存取
pub trait AllocationRepository {
    fn insert_allocation(&mut self, allocation: Allocation) -> Result<()>;

    fn allocations_for_sale(&mut self, sale_id: Uuid) -> Result<Vec<Allocation>>;

    fn allocations_for_lot(&mut self, lot_id: Uuid) -> Result<Vec<Allocation>>;

    /// 刪除銷售的所有分配記錄，回傳刪除筆數
    fn delete_allocations_for_sale(&mut self, sale_id: Uuid) -> Result<usize>;
}

/// 銷售存取
pub trait SaleRepository {
    fn insert_sale(&mut self, sale: Sale) -> Result<()>;

    fn find_sale(&mut self, sale_id: Uuid) -> Result<Option<Sale>>;

    fn delete_sale(&mut self, sale_id: Uuid) -> Result<()>;
}

/// 配方存取
pub trait RecipeRepository {
    fn find_recipe(&mut self, recipe_id: Uuid) -> Result<Option<Recipe>>;
}

/// 一個進行中的交易
pub trait LedgerTransaction:
    LotRepository + ProductRepository + AllocationRepository + SaleRepository + RecipeRepository
{
    /// 取得產品名稱分組的獨佔鎖，持有至交易結束
    ///
    /// 讀取分組批次餘額以計算 FIFO 計劃前必須先上鎖；
    /// 同一交易內重複上鎖同一分組不產生效果。
    fn lock_product_group(&mut self, group: &ProductGroup) -> Result<()>;
}

/// 帳本儲存
pub trait LedgerStore: Send + Sync {
    /// 在單一交易內執行工作：回傳 Ok 時提交，回傳 Err 時回滾
    fn transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn LedgerTransaction) -> Result<T>;
}
