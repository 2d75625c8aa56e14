//! 配方模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{checked, Result};

/// 配方（物料清單）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// 配方ID
    pub id: Uuid,

    /// 配方名稱
    pub name: String,

    /// 說明
    pub description: Option<String>,

    /// 產出數量
    pub output_quantity: Decimal,

    /// 建議售價
    pub suggested_price: Option<Decimal>,

    /// 原料（依加入順序）
    pub items: Vec<RecipeItem>,

    pub created_at: DateTime<Utc>,
}

/// 配方原料
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeItem {
    pub id: Uuid,

    /// 原料產品ID（以其產品名稱分組取用庫存）
    pub product_id: Uuid,

    /// 每單位配方產出所需數量
    pub quantity: Decimal,

    pub description: Option<String>,
}

impl RecipeItem {
    pub fn new(product_id: Uuid, quantity: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            quantity,
            description: None,
        }
    }

    /// 建構器模式：設置說明
    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    /// 批量所需數量
    pub fn required_for(&self, batch_quantity: Decimal) -> Result<Decimal> {
        checked::mul(self.quantity, batch_quantity)
    }
}

impl Recipe {
    /// 創建新的配方
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description: None,
            output_quantity: Decimal::ONE,
            suggested_price: None,
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// 建構器模式：加入原料
    pub fn with_item(mut self, product_id: Uuid, quantity: Decimal) -> Self {
        self.items.push(RecipeItem::new(product_id, quantity));
        self
    }

    /// 建構器模式：加入已建立的原料
    pub fn with_recipe_item(mut self, item: RecipeItem) -> Self {
        self.items.push(item);
        self
    }

    /// 建構器模式：設置說明
    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    /// 建構器模式：設置產出數量
    pub fn with_output_quantity(mut self, output_quantity: Decimal) -> Self {
        self.output_quantity = output_quantity;
        self
    }

    /// 建構器模式：設置建議售價
    pub fn with_suggested_price(mut self, price: Decimal) -> Self {
        self.suggested_price = Some(price);
        self
    }

    /// 銷售時顯示的虛擬產品名稱
    pub fn sale_label(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.name)
    }
}
