//! # Stock FIFO Engine
//!
//! FIFO 分配、回沖與成本計算引擎

pub mod allocator;
pub mod audit;
pub mod costing;
pub mod engine;
pub mod recipe;
pub mod request;
pub mod reverser;
pub mod selector;

use rust_decimal::Decimal;
use serde::Serialize;
use stock_core::{Allocation, Lot, Product, Sale};

// Re-export 主要類型
pub use allocator::{AllocationOutcome, Allocator};
pub use audit::{AuditReport, Discrepancy, LedgerAudit};
pub use costing::{CostingCalculator, CostingReport};
pub use engine::StockEngine;
pub use recipe::{IngredientRequirement, RecipeAllocation, RecipeExpander, RecipePlan};
pub use request::{RecipeSaleRequest, SaleRequest, StockReceipt};
pub use reverser::{CreditStep, ReversalOutcome, Reverser};
pub use selector::{FifoPlan, FifoSelector, PlanLine};

/// 銷售建立結果
#[derive(Debug, Clone, Serialize)]
pub struct SaleResult {
    pub sale: Sale,

    /// 分配記錄（依取用順序）
    pub allocations: Vec<Allocation>,

    /// 實際分配批次的成本總額
    pub cost_of_goods: Decimal,
}

impl SaleResult {
    /// 分配總量
    pub fn allocated_quantity(&self) -> Decimal {
        self.allocations.iter().map(|a| a.quantity_used).sum()
    }

    /// 毛利（未稅淨額 - 成本）
    pub fn gross_profit(&self) -> stock_core::Result<Decimal> {
        stock_core::checked::sub(self.sale.net_price(), self.cost_of_goods)
    }
}

/// 進貨結果
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptResult {
    pub product: Product,
    pub lot: Lot,
}
