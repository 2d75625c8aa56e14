//! # 咖啡店 FIFO 庫存範例
//!
//! - 兩次進貨同名咖啡豆（不同單價）
//! - 直接銷售與配方銷售
//! - 成本查詢、刪除銷售回沖、帳本稽核

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use stock_ledger::telemetry::init_tracing;
use stock_ledger::*;

fn main() -> anyhow::Result<()> {
    init_tracing("stock_fifo=info")?;

    println!("===== 咖啡店 FIFO 庫存範例 =====\n");

    let engine = StockEngine::with_config(
        MemoryStore::new(),
        EngineConfig::new().with_verify_after_write(true),
    )?;

    // 步驟 1: 進貨
    println!("[1] 進貨");
    let march = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
    let april = Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap();

    let beans_old = engine.receive_stock(
        StockReceipt::new(
            "Espresso Beans".to_string(),
            "kg".to_string(),
            Decimal::from(5),
            Decimal::from(18),
            march,
        )
        .with_company_name("Highland Roasters".to_string())
        .with_invoice_no("HR-0301".to_string()),
    )?;
    let beans_new = engine.receive_stock(
        StockReceipt::new(
            "Espresso Beans".to_string(),
            "kg".to_string(),
            Decimal::from(5),
            Decimal::from(22),
            april,
        )
        .with_company_name("Highland Roasters".to_string())
        .with_invoice_no("HR-0401".to_string()),
    )?;
    let milk = engine.receive_stock(StockReceipt::new(
        "Whole Milk".to_string(),
        "l".to_string(),
        Decimal::from(20),
        Decimal::new(12, 1),
        march,
    ))?;
    for receipt in [&beans_old, &beans_new, &milk] {
        println!(
            "    {} {} {} @ {}",
            receipt.product.product_name,
            receipt.lot.initial_quantity,
            receipt.product.unit,
            receipt.lot.unit_cost
        );
    }

    // 步驟 2: 成本查詢
    println!("\n[2] 成本查詢 (7 kg)");
    let report = engine.costing("Espresso Beans", Some(Decimal::from(7)))?;
    println!("    平均成本: {}", report.average_unit_cost);
    println!("    庫存總量: {}", report.total_stock);
    println!("    下一批成本: {:?}", report.next_fifo_cost);
    println!("    FIFO 成本: {:?}", report.fifo_cost);

    // 步驟 3: 直接銷售
    println!("\n[3] 直接銷售 7 kg");
    let sale = engine.create_sale(
        SaleRequest::new(
            beans_new.product.id,
            Decimal::from(7),
            Decimal::from(30),
            april,
        )
        .with_vat_rate(Decimal::from(5)),
    )?;
    for allocation in &sale.allocations {
        println!(
            "    批次 {} 取用 {}",
            allocation.lot_id, allocation.quantity_used
        );
    }
    println!(
        "    成本 {}，含稅總額 {}，毛利 {}",
        sale.cost_of_goods,
        sale.sale.total_price(),
        sale.gross_profit()?
    );

    // 步驟 4: 配方銷售
    println!("\n[4] 配方銷售：拿鐵 x 10");
    let latte = Recipe::new("Latte".to_string())
        .with_item(beans_old.product.id, Decimal::new(18, 3))
        .with_item(milk.product.id, Decimal::new(25, 2))
        .with_suggested_price(Decimal::new(45, 1));
    let latte_id = latte.id;
    engine.store().insert_recipe(latte)?;

    let latte_sale = engine.create_recipe_sale(RecipeSaleRequest::new(
        latte_id,
        Decimal::from(10),
        Decimal::new(45, 1),
        april,
    ))?;
    println!(
        "    分配 {} 筆，單杯成本 {}",
        latte_sale.allocations.len(),
        latte_sale.sale.unit_cost().round_dp(4)
    );

    // 步驟 5: 庫存不足
    println!("\n[5] 超量銷售");
    match engine.create_sale(SaleRequest::new(
        beans_old.product.id,
        Decimal::from(100),
        Decimal::from(30),
        april,
    )) {
        Ok(_) => println!("    非預期：銷售成功"),
        Err(e) => println!("    拒絕 ({}): {}", e.status_code(), e),
    }

    // 步驟 6: 刪除銷售
    println!("\n[6] 刪除直接銷售");
    let reversal = engine.delete_sale(sale.sale.id())?;
    for step in &reversal.steps {
        println!(
            "    歸還批次 {} 數量 {} (剩餘 {})",
            step.lot_id, step.quantity, step.remaining_after
        );
    }

    // 步驟 7: 稽核
    println!("\n[7] 稽核");
    for name in ["Espresso Beans", "Whole Milk"] {
        let audit = engine.audit(name)?;
        println!(
            "    {}: {} 個批次，{}",
            name,
            audit.lots_checked,
            if audit.is_consistent() { "一致" } else { "不一致" }
        );
    }

    Ok(())
}
