//! 溢位檢查的金額 / 數量運算
//!
//! `Decimal` 的運算子在超出範圍時會 panic，帳本的成本與價格計算一律改走這裡，
//! 溢位以 [`StockError::Overflow`] 回傳。

use rust_decimal::Decimal;

use crate::{Result, StockError};

pub fn add(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b).ok_or_else(|| overflow(a, "+", b))
}

pub fn sub(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_sub(b).ok_or_else(|| overflow(a, "-", b))
}

pub fn mul(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_mul(b).ok_or_else(|| overflow(a, "×", b))
}

/// 除法（除數為零同樣視為無法表示）
pub fn div(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_div(b).ok_or_else(|| overflow(a, "÷", b))
}

/// 加總
pub fn sum<I>(values: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().try_fold(Decimal::ZERO, add)
}

fn overflow(a: Decimal, op: &str, b: Decimal) -> StockError {
    StockError::Overflow(format!("{} {} {}", a, op, b))
}
