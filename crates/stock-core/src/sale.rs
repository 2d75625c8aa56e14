//! 銷售模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::pricing::SalePricing;
use crate::{checked, Result};

/// 銷售對象
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SaleSubject {
    /// 直接銷售產品
    Product { product_id: Uuid },
    /// 配方銷售（虛擬產品，顯示為配方名稱）
    Recipe {
        recipe_id: Uuid,
        label: String,
        category: String,
    },
}

/// 銷售
///
/// 價格欄位不對外開放修改，每次建立或變更時重新計算。
#[derive(Debug, Clone, Serialize)]
pub struct Sale {
    id: Uuid,
    subject: SaleSubject,
    quantity: Decimal,
    sale_date: DateTime<Utc>,
    sale_price: Decimal,
    discount: Decimal,
    vat_rate: Decimal,
    customer_name: String,
    customer_phone: String,
    note: Option<String>,
    /// 依實際分配批次計算的單位成本
    unit_cost: Decimal,
    pricing: SalePricing,
    created_at: DateTime<Utc>,
}

impl Sale {
    /// 創建新的銷售
    pub fn new(
        subject: SaleSubject,
        quantity: Decimal,
        sale_price: Decimal,
        sale_date: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            subject,
            quantity,
            sale_date,
            sale_price,
            discount: Decimal::ZERO,
            vat_rate: Decimal::ZERO,
            customer_name: String::new(),
            customer_phone: String::new(),
            note: None,
            unit_cost: Decimal::ZERO,
            pricing: SalePricing::compute(sale_price, quantity, Decimal::ZERO, Decimal::ZERO)?,
            created_at: Utc::now(),
        })
    }

    /// 建構器模式：設置折扣
    pub fn with_discount(mut self, discount: Decimal) -> Result<Self> {
        self.set_discount(discount)?;
        Ok(self)
    }

    /// 建構器模式：設置稅率（%）
    pub fn with_vat_rate(mut self, vat_rate: Decimal) -> Result<Self> {
        self.set_vat_rate(vat_rate)?;
        Ok(self)
    }

    /// 建構器模式：設置客戶
    pub fn with_customer(mut self, name: String, phone: String) -> Self {
        self.customer_name = name;
        self.customer_phone = phone;
        self
    }

    /// 建構器模式：設置備註
    pub fn with_note(mut self, note: String) -> Self {
        self.note = Some(note);
        self
    }

    /// 建構器模式：設置單位成本
    pub fn with_unit_cost(mut self, unit_cost: Decimal) -> Self {
        self.unit_cost = unit_cost;
        self
    }

    /// 變更單價
    ///
    /// 價格溢位時回傳錯誤，銷售維持原狀。
    pub fn set_sale_price(&mut self, sale_price: Decimal) -> Result<()> {
        self.pricing =
            SalePricing::compute(sale_price, self.quantity, self.discount, self.vat_rate)?;
        self.sale_price = sale_price;
        Ok(())
    }

    /// 變更折扣
    pub fn set_discount(&mut self, discount: Decimal) -> Result<()> {
        self.pricing =
            SalePricing::compute(self.sale_price, self.quantity, discount, self.vat_rate)?;
        self.discount = discount;
        Ok(())
    }

    /// 變更稅率
    pub fn set_vat_rate(&mut self, vat_rate: Decimal) -> Result<()> {
        self.pricing =
            SalePricing::compute(self.sale_price, self.quantity, self.discount, vat_rate)?;
        self.vat_rate = vat_rate;
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn subject(&self) -> &SaleSubject {
        &self.subject
    }

    /// 直接銷售的產品ID
    pub fn product_id(&self) -> Option<Uuid> {
        match &self.subject {
            SaleSubject::Product { product_id } => Some(*product_id),
            SaleSubject::Recipe { .. } => None,
        }
    }

    /// 配方銷售的配方ID
    pub fn recipe_id(&self) -> Option<Uuid> {
        match &self.subject {
            SaleSubject::Recipe { recipe_id, .. } => Some(*recipe_id),
            SaleSubject::Product { .. } => None,
        }
    }

    pub fn is_recipe_sale(&self) -> bool {
        self.recipe_id().is_some()
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn sale_date(&self) -> DateTime<Utc> {
        self.sale_date
    }

    pub fn sale_price(&self) -> Decimal {
        self.sale_price
    }

    pub fn discount(&self) -> Decimal {
        self.discount
    }

    pub fn vat_rate(&self) -> Decimal {
        self.vat_rate
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn customer_phone(&self) -> &str {
        &self.customer_phone
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn unit_cost(&self) -> Decimal {
        self.unit_cost
    }

    /// 銷售成本總額
    pub fn cost_of_goods(&self) -> Result<Decimal> {
        checked::mul(self.unit_cost, self.quantity)
    }

    pub fn pricing(&self) -> SalePricing {
        self.pricing
    }

    pub fn net_price(&self) -> Decimal {
        self.pricing.net_price
    }

    pub fn vat_amount(&self) -> Decimal {
        self.pricing.vat_amount
    }

    pub fn total_price(&self) -> Decimal {
        self.pricing.total_price
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
