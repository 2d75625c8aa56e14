//! 產品模型

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{checked, Result};

/// 產品名稱分組鍵
///
/// 同名產品（每張進貨發票各自一筆產品資料）視為同一個可互換的庫存池，
/// FIFO 分配以此為範圍，而非產品ID。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductGroup(String);

impl ProductGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductGroup {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// 產品（每次進貨一筆）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// 產品ID
    pub id: Uuid,

    /// 供應商
    pub company_name: String,

    /// 分類
    pub category: String,

    /// 產品名稱（分組鍵）
    pub product_name: String,

    /// 計量單位
    pub unit: String,

    /// 發票號碼
    pub invoice_no: Option<String>,

    /// 發票日期
    pub invoice_date: Option<NaiveDate>,

    /// 進貨數量
    pub initial_stock: Decimal,

    /// 現有庫存（所有批次剩餘量之和，由分配/回沖同步維護）
    pub current_stock: Decimal,

    /// 進貨單價
    pub unit_price: Decimal,

    /// 進貨稅率（%）
    pub vat: Decimal,

    pub created_at: DateTime<Utc>,
}

impl Product {
    /// 創建新的產品
    pub fn new(product_name: String, unit: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_name: String::new(),
            category: String::new(),
            product_name,
            unit,
            invoice_no: None,
            invoice_date: None,
            initial_stock: Decimal::ZERO,
            current_stock: Decimal::ZERO,
            unit_price: Decimal::ZERO,
            vat: Decimal::ZERO,
            created_at: Utc::now(),
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

    /// 建構器模式：設置發票
    pub fn with_invoice(mut self, invoice_no: String, invoice_date: NaiveDate) -> Self {
        self.invoice_no = Some(invoice_no);
        self.invoice_date = Some(invoice_date);
        self
    }

    /// 建構器模式：設置進貨數量與單價（現有庫存同步為進貨數量）
    pub fn with_receipt(mut self, quantity: Decimal, unit_price: Decimal) -> Self {
        self.initial_stock = quantity;
        self.current_stock = quantity;
        self.unit_price = unit_price;
        self
    }

    /// 建構器模式：設置進貨稅率
    pub fn with_vat(mut self, vat: Decimal) -> Self {
        self.vat = vat;
        self
    }

    /// 所屬的產品名稱分組
    pub fn group(&self) -> ProductGroup {
        ProductGroup::new(self.product_name.clone())
    }

    /// 進貨總成本（含稅）
    pub fn total_cost(&self) -> Result<Decimal> {
        let net = checked::mul(self.initial_stock, self.unit_price)?;
        let tax = checked::mul(net, self.vat)? / Decimal::ONE_HUNDRED;
        checked::add(net, tax)
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.current_stock <= Decimal::ZERO
    }
}
