//! 請求類型

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 直接銷售請求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRequest {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub sale_price: Decimal,
    pub sale_date: DateTime<Utc>,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub vat_rate: Decimal,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl SaleRequest {
    pub fn new(
        product_id: Uuid,
        quantity: Decimal,
        sale_price: Decimal,
        sale_date: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id,
            quantity,
            sale_price,
            sale_date,
            discount: Decimal::ZERO,
            vat_rate: Decimal::ZERO,
            customer_name: String::new(),
            customer_phone: String::new(),
            note: None,
        }
    }

    /// 建構器模式：設置折扣
    pub fn with_discount(mut self, discount: Decimal) -> Self {
        self.discount = discount;
        self
    }

    /// 建構器模式：設置稅率（%）
    pub fn with_vat_rate(mut self, vat_rate: Decimal) -> Self {
        self.vat_rate = vat_rate;
        self
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
}

/// 配方銷售請求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeSaleRequest {
    pub recipe_id: Uuid,
    /// 批量
    pub quantity: Decimal,
    pub sale_price: Decimal,
    pub sale_date: DateTime<Utc>,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub vat_rate: Decimal,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl RecipeSaleRequest {
    pub fn new(
        recipe_id: Uuid,
        quantity: Decimal,
        sale_price: Decimal,
        sale_date: DateTime<Utc>,
    ) -> Self {
        Self {
            recipe_id,
            quantity,
            sale_price,
            sale_date,
            discount: Decimal::ZERO,
            vat_rate: Decimal::ZERO,
            customer_name: String::new(),
            customer_phone: String::new(),
            note: None,
        }
    }

    pub fn with_discount(mut self, discount: Decimal) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_vat_rate(mut self, vat_rate: Decimal) -> Self {
        self.vat_rate = vat_rate;
        self
    }

    pub fn with_customer(mut self, name: String, phone: String) -> Self {
        self.customer_name = name;
        self.customer_phone = phone;
        self
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.note = Some(note);
        self
    }
}

/// 進貨
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReceipt {
    pub product_name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// 入庫時間（FIFO 排序鍵）
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub invoice_no: Option<String>,
    #[serde(default)]
    pub vat: Decimal,
}

impl StockReceipt {
    pub fn new(
        product_name: String,
        unit: String,
        quantity: Decimal,
        unit_price: Decimal,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            product_name,
            unit,
            quantity,
            unit_price,
            received_at,
            company_name: String::new(),
            category: String::new(),
            invoice_no: None,
            vat: Decimal::ZERO,
        }
    }

    /// 建構器模式：設置供應商
    pub fn with_company_name(mut self, company_name: String) -> Self {
        self.company_name = company_name;
        self
    }

    /// 建構器模式：設置分類
    pub fn with_category(mut self, category: String) -> Self {
        self.category = category;
        self
    }

    /// 建構器模式：設置發票號碼
    pub fn with_invoice_no(mut self, invoice_no: String) -> Self {
        self.invoice_no = Some(invoice_no);
        self
    }

    /// 建構器模式：設置進貨稅率
    pub fn with_vat(mut self, vat: Decimal) -> Self {
        self.vat = vat;
        self
    }

    /// 發票日期（入庫日）
    pub fn invoice_date(&self) -> NaiveDate {
        self.received_at.date_naive()
    }
}
