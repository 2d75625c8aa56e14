//! 批次模型（進貨批次 / 庫存異動）

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{checked, Result, StockError};

/// 進貨批次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    /// 批次ID
    pub id: Uuid,

    /// 所屬產品ID
    pub product_id: Uuid,

    /// 進貨數量（不可變）
    pub initial_quantity: Decimal,

    /// 剩餘數量
    pub remaining_quantity: Decimal,

    /// 單位成本（不可變）
    pub unit_cost: Decimal,

    /// 入庫時間（FIFO 排序鍵）
    pub received_at: DateTime<Utc>,

    /// 建立順序（同一入庫時間的次要排序鍵，由儲存層指派）
    pub sequence: u64,
}

impl Lot {
    /// 創建新的批次
    pub fn new(
        product_id: Uuid,
        quantity: Decimal,
        unit_cost: Decimal,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            initial_quantity: quantity,
            remaining_quantity: quantity,
            unit_cost,
            received_at,
            sequence: 0,
        }
    }

    /// FIFO 排序鍵：入庫時間，其次建立順序
    pub fn fifo_key(&self) -> (DateTime<Utc>, u64) {
        (self.received_at, self.sequence)
    }

    /// 已消耗數量
    pub fn consumed_quantity(&self) -> Decimal {
        self.initial_quantity - self.remaining_quantity
    }

    pub fn is_depleted(&self) -> bool {
        self.remaining_quantity <= Decimal::ZERO
    }

    /// 剩餘庫存價值
    pub fn remaining_value(&self) -> Result<Decimal> {
        checked::mul(self.remaining_quantity, self.unit_cost)
    }

    /// 扣減後的剩餘數量
    pub fn debited(&self, quantity: Decimal) -> Result<Decimal> {
        let next = self.remaining_quantity - quantity;
        if quantity < Decimal::ZERO || next < Decimal::ZERO {
            return Err(StockError::InvariantViolation(format!(
                "批次 {} 扣減 {} 超過剩餘 {}",
                self.id, quantity, self.remaining_quantity
            )));
        }
        Ok(next)
    }

    /// 回沖後的剩餘數量
    pub fn credited(&self, quantity: Decimal) -> Result<Decimal> {
        let next = checked::add(self.remaining_quantity, quantity)?;
        if quantity < Decimal::ZERO || next > self.initial_quantity {
            return Err(StockError::InvariantViolation(format!(
                "批次 {} 回沖 {} 後超過進貨數量 {}",
                self.id, quantity, self.initial_quantity
            )));
        }
        Ok(next)
    }
}
