//! 帳本稽核
//!
//! 檢查每個批次 `初始 - 剩餘 == Σ 分配量`、`0 <= 剩餘 <= 初始`，
//! 以及每個產品 `現有庫存 == Σ 批次剩餘`。

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use stock_core::{checked, LedgerTransaction, ProductGroup};
use uuid::Uuid;

/// 不一致項目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Discrepancy {
    /// 批次消耗量與分配記錄不符
    LotConsumption {
        lot_id: Uuid,
        consumed: Decimal,
        allocated: Decimal,
    },
    /// 批次剩餘超出範圍
    LotBounds {
        lot_id: Uuid,
        initial: Decimal,
        remaining: Decimal,
    },
    /// 產品現有庫存與批次剩餘總和不符
    ProductStock {
        product_id: Uuid,
        current_stock: Decimal,
        lots_remaining: Decimal,
    },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::LotConsumption {
                lot_id,
                consumed,
                allocated,
            } => write!(f, "批次 {} 已消耗 {}，分配記錄合計 {}", lot_id, consumed, allocated),
            Discrepancy::LotBounds {
                lot_id,
                initial,
                remaining,
            } => write!(f, "批次 {} 剩餘 {} 超出 [0, {}]", lot_id, remaining, initial),
            Discrepancy::ProductStock {
                product_id,
                current_stock,
                lots_remaining,
            } => write!(
                f,
                "產品 {} 現有庫存 {}，批次剩餘合計 {}",
                product_id, current_stock, lots_remaining
            ),
        }
    }
}

/// 稽核報告
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub group: ProductGroup,
    pub lots_checked: usize,
    pub products_checked: usize,
    pub discrepancies: Vec<Discrepancy>,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// 帳本稽核器（唯讀）
pub struct LedgerAudit;

impl LedgerAudit {
    pub fn audit_group<T>(tx: &mut T, group: &ProductGroup) -> stock_core::Result<AuditReport>
    where
        T: LedgerTransaction + ?Sized,
    {
        tx.lock_product_group(group)?;
        let lots = tx.lots_for_product_group(group)?;

        let mut discrepancies = Vec::new();
        let mut remaining_by_product: BTreeMap<Uuid, Decimal> = BTreeMap::new();

        for lot in &lots {
            if lot.remaining_quantity < Decimal::ZERO
                || lot.remaining_quantity > lot.initial_quantity
            {
                discrepancies.push(Discrepancy::LotBounds {
                    lot_id: lot.id,
                    initial: lot.initial_quantity,
                    remaining: lot.remaining_quantity,
                });
            }

            let allocated = checked::sum(
                tx.allocations_for_lot(lot.id)?
                    .iter()
                    .map(|a| a.quantity_used),
            )?;
            if lot.consumed_quantity() != allocated {
                discrepancies.push(Discrepancy::LotConsumption {
                    lot_id: lot.id,
                    consumed: lot.consumed_quantity(),
                    allocated,
                });
            }

            *remaining_by_product
                .entry(lot.product_id)
                .or_insert(Decimal::ZERO) += lot.remaining_quantity;
        }

        for (product_id, lots_remaining) in &remaining_by_product {
            if let Some(product) = tx.find_product(*product_id)? {
                if product.current_stock != *lots_remaining {
                    discrepancies.push(Discrepancy::ProductStock {
                        product_id: *product_id,
                        current_stock: product.current_stock,
                        lots_remaining: *lots_remaining,
                    });
                }
            }
        }

        for discrepancy in &discrepancies {
            tracing::warn!("帳本不一致 [{}]: {}", group, discrepancy);
        }

        Ok(AuditReport {
            group: group.clone(),
            lots_checked: lots.len(),
            products_checked: remaining_by_product.len(),
            discrepancies,
        })
    }
}
