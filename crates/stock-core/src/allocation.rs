//! 分配記錄（銷售 ↔ 批次）

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 分配記錄：某筆銷售自某批次取用的數量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// 分配ID
    pub id: Uuid,

    /// 銷售ID
    pub sale_id: Uuid,

    /// 批次ID
    pub lot_id: Uuid,

    /// 取用數量
    pub quantity_used: Decimal,

    pub created_at: DateTime<Utc>,
}

impl Allocation {
    /// 創建新的分配記錄
    pub fn new(sale_id: Uuid, lot_id: Uuid, quantity_used: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            sale_id,
            lot_id,
            quantity_used,
            created_at: Utc::now(),
        }
    }
}
