//! 成本計算（唯讀）
//!
//! 與分配器共用 [`FifoSelector`]，試算結果與實際分配一致。

use rust_decimal::Decimal;
use serde::Serialize;
use stock_core::{checked, Lot, ProductGroup, StockError};

use crate::selector::FifoSelector;

/// 成本報表
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostingReport {
    pub group: ProductGroup,
    /// 加權平均單位成本（無庫存時為 0）
    pub average_unit_cost: Decimal,
    pub total_stock: Decimal,
    pub total_stock_value: Decimal,
    /// 下一個被取用批次的單位成本
    pub next_fifo_cost: Option<Decimal>,
    /// 指定數量的 FIFO 混合單位成本
    pub fifo_cost: Option<Decimal>,
    pub requested_quantity: Option<Decimal>,
}

impl CostingReport {
    /// 依顯示小數位數捨入
    pub fn rounded(mut self, scale: u32) -> Self {
        self.average_unit_cost = self.average_unit_cost.round_dp(scale);
        self.total_stock_value = self.total_stock_value.round_dp(scale);
        self.next_fifo_cost = self.next_fifo_cost.map(|c| c.round_dp(scale));
        self.fifo_cost = self.fifo_cost.map(|c| c.round_dp(scale));
        self
    }
}

/// 成本計算器
pub struct CostingCalculator;

impl CostingCalculator {
    /// 剩餘總量
    pub fn total_stock(lots: &[Lot]) -> stock_core::Result<Decimal> {
        FifoSelector::total_available(lots)
    }

    /// 剩餘總值
    pub fn total_value(lots: &[Lot]) -> stock_core::Result<Decimal> {
        FifoSelector::available_lots(lots)
            .into_iter()
            .try_fold(Decimal::ZERO, |total, lot| {
                checked::add(total, lot.remaining_value()?)
            })
    }

    /// 加權平均單位成本，無庫存時為 0
    pub fn average_unit_cost(lots: &[Lot]) -> stock_core::Result<Decimal> {
        let total = Self::total_stock(lots)?;
        if total.is_zero() {
            return Ok(Decimal::ZERO);
        }
        checked::div(Self::total_value(lots)?, total)
    }

    /// 下一個 FIFO 批次的單位成本
    pub fn next_fifo_cost(lots: &[Lot]) -> Option<Decimal> {
        FifoSelector::available_lots(lots)
            .first()
            .map(|lot| lot.unit_cost)
    }

    /// 指定數量的 FIFO 混合單位成本，不修改任何批次
    pub fn fifo_cost(
        group: &ProductGroup,
        lots: &[Lot],
        quantity: Decimal,
    ) -> stock_core::Result<Decimal> {
        if quantity < Decimal::ZERO {
            return Err(StockError::InvalidQuantity(format!(
                "{} 的試算數量不可為負: {}",
                group, quantity
            )));
        }
        if quantity.is_zero() {
            return Ok(Decimal::ZERO);
        }

        let plan = FifoSelector::select(lots, quantity);
        if !plan.is_satisfied() {
            return Err(StockError::InsufficientStock {
                group: group.to_string(),
                requested: quantity,
                available: Self::total_stock(lots)?,
            });
        }

        checked::div(plan.total_cost()?, quantity)
    }

    /// 產生成本報表；數量為 None 或 0 時不試算 FIFO 成本
    pub fn report(
        group: &ProductGroup,
        lots: &[Lot],
        quantity: Option<Decimal>,
    ) -> stock_core::Result<CostingReport> {
        let requested = quantity.filter(|q| !q.is_zero());
        let fifo_cost = match requested {
            Some(q) => Some(Self::fifo_cost(group, lots, q)?),
            None => None,
        };

        Ok(CostingReport {
            group: group.clone(),
            average_unit_cost: Self::average_unit_cost(lots)?,
            total_stock: Self::total_stock(lots)?,
            total_stock_value: Self::total_value(lots)?,
            next_fifo_cost: Self::next_fifo_cost(lots),
            fifo_cost,
            requested_quantity: requested,
        })
    }
}
