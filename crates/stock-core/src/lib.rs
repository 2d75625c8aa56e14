//! # Stock Core
//!
//! 庫存帳本的核心資料模型、錯誤類型與儲存協作介面

pub mod allocation;
pub mod checked;
pub mod config;
pub mod lot;
pub mod pricing;
pub mod product;
pub mod recipe;
pub mod repository;
pub mod sale;

use rust_decimal::Decimal;
use uuid::Uuid;

// Re-export 主要類型
pub use allocation::Allocation;
pub use config::EngineConfig;
pub use lot::Lot;
pub use pricing::SalePricing;
pub use product::{Product, ProductGroup};
pub use recipe::{Recipe, RecipeItem};
pub use repository::{
    AllocationRepository, LedgerStore, LedgerTransaction, LotRepository, ProductRepository,
    RecipeRepository, SaleRepository,
};
pub use sale::{Sale, SaleSubject};

/// 實體種類（用於 NotFound 錯誤）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Product,
    Lot,
    Sale,
    Recipe,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Product => "產品",
            EntityKind::Lot => "批次",
            EntityKind::Sale => "銷售",
            EntityKind::Recipe => "配方",
        };
        f.write_str(name)
    }
}

/// 庫存帳本錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum StockError {
    #[error("庫存不足：{group} 需要 {requested}，可用 {available}")]
    InsufficientStock {
        group: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("配方原料庫存不足：{ingredient} 需要 {requested}，可用 {available}")]
    InsufficientIngredient {
        ingredient: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("找不到{entity}: {id}")]
    NotFound { entity: EntityKind, id: Uuid },

    #[error("無效的數量: {0}")]
    InvalidQuantity(String),

    #[error("數值溢位: {0}")]
    Overflow(String),

    #[error("帳本不一致: {0}")]
    InvariantViolation(String),

    #[error("持久化失敗: {0}")]
    Persistence(String),

    #[error("配置錯誤: {0}")]
    Config(String),
}

impl StockError {
    /// 找不到實體
    pub fn not_found(entity: EntityKind, id: Uuid) -> Self {
        StockError::NotFound { entity, id }
    }

    /// 對應的 HTTP 狀態碼類別
    pub fn status_code(&self) -> u16 {
        match self {
            StockError::InsufficientStock { .. }
            | StockError::InsufficientIngredient { .. }
            | StockError::InvalidQuantity(_)
            | StockError::Overflow(_) => 400,
            StockError::NotFound { .. } => 404,
            StockError::InvariantViolation(_)
            | StockError::Persistence(_)
            | StockError::Config(_) => 500,
        }
    }

    /// 是否為庫存不足（含配方原料）
    pub fn is_insufficient_stock(&self) -> bool {
        matches!(
            self,
            StockError::InsufficientStock { .. } | StockError::InsufficientIngredient { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StockError>;
