//! 銷售價格計算

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{checked, Result};

/// 銷售衍生價格（淨額、稅額、總額）
///
/// 由銷售的單價、數量、折扣與稅率決定，不可獨立修改。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalePricing {
    pub net_price: Decimal,
    pub vat_amount: Decimal,
    pub total_price: Decimal,
}

impl SalePricing {
    /// 計算衍生價格
    ///
    /// * 淨額 = 單價 × 數量 − 折扣（折扣 > 0 時）
    /// * 稅額 = 淨額 × 稅率 / 100（稅率 > 0 時）
    /// * 總額 = 淨額 + 稅額
    pub fn compute(
        sale_price: Decimal,
        quantity: Decimal,
        discount: Decimal,
        vat_rate: Decimal,
    ) -> Result<Self> {
        let mut net_price = checked::mul(sale_price, quantity)?;
        if discount > Decimal::ZERO {
            net_price = checked::sub(net_price, discount)?;
        }

        let vat_amount = if vat_rate > Decimal::ZERO {
            checked::mul(net_price, vat_rate)? / Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        Ok(Self {
            net_price,
            vat_amount,
            total_price: checked::add(net_price, vat_amount)?,
        })
    }
}
