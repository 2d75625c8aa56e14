//! FIFO 批次選擇

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use stock_core::{checked, Lot, Result};
use uuid::Uuid;

/// 計劃中的一行：自某批次取用的數量
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanLine {
    pub lot_id: Uuid,
    /// 批次所屬產品（扣減現有庫存的對象）
    pub product_id: Uuid,
    pub take: Decimal,
    pub unit_cost: Decimal,
    pub received_at: DateTime<Utc>,
}

impl PlanLine {
    pub fn cost(&self) -> Result<Decimal> {
        checked::mul(self.take, self.unit_cost)
    }
}

/// FIFO 取用計劃
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FifoPlan {
    /// 依取用順序（最舊批次在前）
    pub lines: Vec<PlanLine>,
    /// 要求數量
    pub requested: Decimal,
    /// 批次耗盡後仍未滿足的數量
    pub shortfall: Decimal,
}

impl FifoPlan {
    /// 空計劃（要求數量為零）
    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            requested: Decimal::ZERO,
            shortfall: Decimal::ZERO,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.shortfall <= Decimal::ZERO
    }

    /// 計劃取用總量
    pub fn allocated_quantity(&self) -> Decimal {
        self.lines.iter().map(|l| l.take).sum()
    }

    /// 計劃成本總額
    pub fn total_cost(&self) -> Result<Decimal> {
        self.lines
            .iter()
            .try_fold(Decimal::ZERO, |total, line| checked::add(total, line.cost()?))
    }

    /// 混合單位成本（總成本 / 取用量），無取用時為 None
    pub fn unit_cost(&self) -> Result<Option<Decimal>> {
        let quantity = self.allocated_quantity();
        if quantity > Decimal::ZERO {
            Ok(Some(checked::div(self.total_cost()?, quantity)?))
        } else {
            Ok(None)
        }
    }
}

/// FIFO 選擇器（純函數，不修改批次）
pub struct FifoSelector;

impl FifoSelector {
    /// 依 FIFO 順序排列批次：入庫時間遞增，同時間依建立順序
    pub fn sort_lots(lots: &mut [Lot]) {
        lots.sort_by_key(Lot::fifo_key);
    }

    /// 可供取用的批次（剩餘 > 0），FIFO 順序
    pub fn available_lots(lots: &[Lot]) -> Vec<&Lot> {
        let mut available: Vec<&Lot> = lots
            .iter()
            .filter(|lot| lot.remaining_quantity > Decimal::ZERO)
            .collect();
        available.sort_by_key(|lot| lot.fifo_key());
        available
    }

    /// 剩餘總量
    pub fn total_available(lots: &[Lot]) -> Result<Decimal> {
        checked::sum(
            lots.iter()
                .filter(|lot| lot.remaining_quantity > Decimal::ZERO)
                .map(|lot| lot.remaining_quantity),
        )
    }

    /// 產生取用計劃
    ///
    /// 自最舊批次開始，每批取 min(尚需數量, 批次剩餘)，直到滿足或批次耗盡。
    /// 批次不足時 `shortfall` 為未滿足數量，呼叫端必須拒絕整筆要求。
    pub fn select(lots: &[Lot], required: Decimal) -> FifoPlan {
        let mut plan = FifoPlan {
            lines: Vec::new(),
            requested: required,
            shortfall: Decimal::ZERO,
        };

        let mut remaining = required;
        for lot in Self::available_lots(lots) {
            if remaining <= Decimal::ZERO {
                break;
            }

            let take = remaining.min(lot.remaining_quantity);
            plan.lines.push(PlanLine {
                lot_id: lot.id,
                product_id: lot.product_id,
                take,
                unit_cost: lot.unit_cost,
                received_at: lot.received_at,
            });

            remaining -= take;
        }

        if remaining > Decimal::ZERO {
            plan.shortfall = remaining;
        }

        plan
    }
}
