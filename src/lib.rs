//! # Stock Ledger
//!
//! FIFO 庫存分配與回沖引擎
//!
//! ## 模組
//! - `stock_core`: 資料模型、錯誤類型、儲存協作介面
//! - `stock_fifo`: FIFO 選擇、分配、回沖、成本計算、配方展開
//! - `stock_store`: 記憶體交易式帳本儲存

pub mod telemetry;

pub use stock_core::{
    Allocation, EngineConfig, EntityKind, LedgerStore, LedgerTransaction, Lot, Product,
    ProductGroup, Recipe, RecipeItem, Result, Sale, SalePricing, SaleSubject, StockError,
};
pub use stock_fifo::{
    AuditReport, CostingCalculator, CostingReport, FifoPlan, FifoSelector, RecipePlan,
    RecipeSaleRequest, ReceiptResult, ReversalOutcome, SaleRequest, SaleResult, StockEngine,
    StockReceipt,
};
pub use stock_store::{LedgerState, MemoryStore};
