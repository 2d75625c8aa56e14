//! FIFO 分配器

use rust_decimal::Decimal;
use stock_core::{Allocation, EntityKind, LedgerTransaction, ProductGroup, StockError};
use uuid::Uuid;

use crate::selector::{FifoPlan, FifoSelector};

/// 分配結果
#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    pub group: ProductGroup,
    pub plan: FifoPlan,
    pub allocations: Vec<Allocation>,
}

impl AllocationOutcome {
    pub fn total_cost(&self) -> stock_core::Result<Decimal> {
        self.plan.total_cost()
    }

    pub fn quantity(&self) -> Decimal {
        self.plan.allocated_quantity()
    }
}

/// 分配器：在呼叫端的交易內套用 FIFO 計劃
pub struct Allocator;

impl Allocator {
    /// 鎖定分組、讀取批次並產生計劃；批次不足時回傳 InsufficientStock，不做任何寫入
    pub fn plan<T>(tx: &mut T, group: &ProductGroup, quantity: Decimal) -> stock_core::Result<FifoPlan>
    where
        T: LedgerTransaction + ?Sized,
    {
        if quantity < Decimal::ZERO {
            return Err(StockError::InvalidQuantity(format!(
                "{} 的要求數量不可為負: {}",
                group, quantity
            )));
        }

        if quantity.is_zero() {
            return Ok(FifoPlan::empty());
        }

        tx.lock_product_group(group)?;
        let lots = tx.lots_for_product_group(group)?;
        let plan = FifoSelector::select(&lots, quantity);

        if !plan.is_satisfied() {
            let available = FifoSelector::total_available(&lots)?;
            tracing::warn!(
                "庫存不足：{} 需要 {}，可用 {}",
                group,
                quantity,
                available
            );
            return Err(StockError::InsufficientStock {
                group: group.to_string(),
                requested: quantity,
                available,
            });
        }

        // 成本無法表示時在任何寫入前拒絕
        plan.total_cost()?;

        Ok(plan)
    }

    /// 套用計劃：扣減批次剩餘、扣減批次所屬產品的現有庫存、寫入分配記錄
    pub fn apply<T>(tx: &mut T, sale_id: Uuid, plan: &FifoPlan) -> stock_core::Result<Vec<Allocation>>
    where
        T: LedgerTransaction + ?Sized,
    {
        let mut allocations = Vec::with_capacity(plan.lines.len());

        for line in &plan.lines {
            let lot = tx
                .find_lot(line.lot_id)?
                .ok_or_else(|| StockError::not_found(EntityKind::Lot, line.lot_id))?;

            let remaining = lot.debited(line.take)?;
            tx.update_remaining(lot.id, remaining)?;
            tx.adjust_current_stock(lot.product_id, -line.take)?;

            let allocation = Allocation::new(sale_id, lot.id, line.take);
            tx.insert_allocation(allocation.clone())?;

            tracing::debug!(
                "分配: 銷售 {} ← 批次 {} (數量: {}, 單位成本: {}, 剩餘: {})",
                sale_id,
                lot.id,
                line.take,
                line.unit_cost,
                remaining
            );

            allocations.push(allocation);
        }

        Ok(allocations)
    }

    /// 分配：計劃 + 套用
    pub fn allocate<T>(
        tx: &mut T,
        sale_id: Uuid,
        group: &ProductGroup,
        quantity: Decimal,
    ) -> stock_core::Result<AllocationOutcome>
    where
        T: LedgerTransaction + ?Sized,
    {
        let plan = Self::plan(tx, group, quantity)?;
        let allocations = Self::apply(tx, sale_id, &plan)?;

        Ok(AllocationOutcome {
            group: group.clone(),
            plan,
            allocations,
        })
    }
}
