//! 銷售回沖

use std::cmp::Reverse;

use rust_decimal::Decimal;
use serde::Serialize;
use stock_core::{EntityKind, LedgerTransaction, Lot, ProductGroup, StockError};
use uuid::Uuid;

/// 回沖的一步：歸還到某批次的數量
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditStep {
    pub lot_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    /// 歸還後的批次剩餘
    pub remaining_after: Decimal,
}

/// 回沖結果
#[derive(Debug, Clone, Serialize)]
pub struct ReversalOutcome {
    pub sale_id: Uuid,
    /// 依歸還順序（最新批次在前）
    pub steps: Vec<CreditStep>,
    /// 受影響的產品分組
    pub groups: Vec<ProductGroup>,
}

impl ReversalOutcome {
    pub fn credited_quantity(&self) -> Decimal {
        self.steps.iter().map(|s| s.quantity).sum()
    }
}

/// 回沖器
pub struct Reverser;

impl Reverser {
    /// 回沖一筆銷售：歸還批次與產品庫存，刪除分配記錄與銷售
    ///
    /// 最新入庫的批次先歸還，讓較舊批次在後續分配中仍優先被取用。
    pub fn reverse<T>(tx: &mut T, sale_id: Uuid) -> stock_core::Result<ReversalOutcome>
    where
        T: LedgerTransaction + ?Sized,
    {
        if tx.find_sale(sale_id)?.is_none() {
            tracing::warn!("回沖失敗：找不到銷售 {}", sale_id);
            return Err(StockError::not_found(EntityKind::Sale, sale_id));
        }

        let allocations = tx.allocations_for_sale(sale_id)?;
        let groups = Self::lock_groups(tx, allocations.iter().map(|a| a.lot_id))?;

        // 上鎖後重新讀取批次
        let mut credits: Vec<(Lot, Decimal)> = Vec::with_capacity(allocations.len());
        for allocation in &allocations {
            let lot = tx
                .find_lot(allocation.lot_id)?
                .ok_or_else(|| StockError::not_found(EntityKind::Lot, allocation.lot_id))?;
            credits.push((lot, allocation.quantity_used));
        }
        credits.sort_by_key(|(lot, _)| Reverse(lot.fifo_key()));

        let mut steps = Vec::with_capacity(credits.len());
        for (lot, quantity) in credits {
            // 同一批次若有多筆分配，需以最新剩餘計算
            let current = tx
                .find_lot(lot.id)?
                .ok_or_else(|| StockError::not_found(EntityKind::Lot, lot.id))?;
            let remaining = current.credited(quantity)?;
            tx.update_remaining(current.id, remaining)?;
            tx.adjust_current_stock(current.product_id, quantity)?;

            tracing::debug!(
                "歸還: 批次 {} ← {} (剩餘: {})",
                current.id,
                quantity,
                remaining
            );

            steps.push(CreditStep {
                lot_id: current.id,
                product_id: current.product_id,
                quantity,
                remaining_after: remaining,
            });
        }

        tx.delete_allocations_for_sale(sale_id)?;
        tx.delete_sale(sale_id)?;

        Ok(ReversalOutcome {
            sale_id,
            steps,
            groups,
        })
    }

    /// 依名稱排序後鎖定批次所屬的產品分組
    fn lock_groups<T, I>(tx: &mut T, lot_ids: I) -> stock_core::Result<Vec<ProductGroup>>
    where
        T: LedgerTransaction + ?Sized,
        I: IntoIterator<Item = Uuid>,
    {
        let mut groups = Vec::new();
        for lot_id in lot_ids {
            let lot = tx
                .find_lot(lot_id)?
                .ok_or_else(|| StockError::not_found(EntityKind::Lot, lot_id))?;
            let product = tx
                .find_product(lot.product_id)?
                .ok_or_else(|| StockError::not_found(EntityKind::Product, lot.product_id))?;
            groups.push(product.group());
        }

        groups.sort();
        groups.dedup();
        for group in &groups {
            tx.lock_product_group(group)?;
        }

        Ok(groups)
    }
}
