//! 集成測試

use std::sync::Arc;
use std::thread;

use chrono::{DateTime, TimeZone, Utc};
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stock_ledger::*;
use uuid::Uuid;

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, d, 10, 0, 0).unwrap()
}

fn engine() -> StockEngine<MemoryStore> {
    let config = EngineConfig::new().with_verify_after_write(true);
    StockEngine::with_config(MemoryStore::new(), config).unwrap()
}

fn receive(
    engine: &StockEngine<MemoryStore>,
    name: &str,
    quantity: Decimal,
    unit_cost: Decimal,
    received_at: DateTime<Utc>,
) -> ReceiptResult {
    engine
        .receive_stock(StockReceipt::new(
            name.to_string(),
            "kg".to_string(),
            quantity,
            unit_cost,
            received_at,
        ))
        .unwrap()
}

#[test]
fn test_fifo_order_and_blended_cost() {
    // L1(d1, 5 @ 10), L2(d2, 5 @ 20)，銷售 7
    let engine = engine();
    let l1 = receive(&engine, "Espresso Beans", dec!(5), dec!(10), day(1));
    let l2 = receive(&engine, "Espresso Beans", dec!(5), dec!(20), day(2));

    let created = engine
        .create_sale(SaleRequest::new(l1.product.id, dec!(7), dec!(40), day(3)))
        .unwrap();

    assert_eq!(created.allocations.len(), 2);
    assert_eq!(created.allocations[0].lot_id, l1.lot.id);
    assert_eq!(created.allocations[0].quantity_used, dec!(5));
    assert_eq!(created.allocations[1].lot_id, l2.lot.id);
    assert_eq!(created.allocations[1].quantity_used, dec!(2));
    assert_eq!(created.cost_of_goods, dec!(90));
    assert_eq!(created.sale.unit_cost().round_dp(3), dec!(12.857));
    assert_eq!(created.allocated_quantity(), dec!(7));
}

#[test]
fn test_costing_matches_allocation() {
    let engine = engine();
    let l1 = receive(&engine, "Espresso Beans", dec!(5), dec!(10), day(1));
    receive(&engine, "Espresso Beans", dec!(5), dec!(20), day(2));

    let report = engine.costing("Espresso Beans", Some(dec!(7))).unwrap();
    assert_eq!(report.fifo_cost, Some(dec!(12.8571)));

    let created = engine
        .create_sale(SaleRequest::new(l1.product.id, dec!(7), dec!(40), day(3)))
        .unwrap();
    assert_eq!(
        created.sale.unit_cost().round_dp(engine.config().cost_scale),
        dec!(12.8571)
    );
}

#[test]
fn test_same_name_products_share_one_pool() {
    // 同名產品不同ID（每張發票一筆）視為同一庫存池
    let engine = engine();
    let first = receive(&engine, "Oat Milk", dec!(3), dec!(2), day(1));
    let second = receive(&engine, "Oat Milk", dec!(3), dec!(3), day(2));
    receive(&engine, "Soy Milk", dec!(10), dec!(1), day(1));

    let created = engine
        .create_sale(SaleRequest::new(second.product.id, dec!(4), dec!(5), day(3)))
        .unwrap();

    // 自第一筆產品的批次開始扣減
    assert_eq!(created.allocations[0].lot_id, first.lot.id);

    let state = engine.store().snapshot();
    assert_eq!(state.products[&first.product.id].current_stock, Decimal::ZERO);
    assert_eq!(state.products[&second.product.id].current_stock, dec!(2));

    let report = engine.costing("Soy Milk", None).unwrap();
    assert_eq!(report.total_stock, dec!(10));
}

#[test]
fn test_insufficient_stock_changes_nothing() {
    let engine = engine();
    let receipt = receive(&engine, "Cocoa", dec!(4), dec!(6), day(1));
    receive(&engine, "Cocoa", dec!(1.5), dec!(7), day(2));
    let before = engine.store().snapshot();

    let err = engine
        .create_sale(SaleRequest::new(receipt.product.id, dec!(6), dec!(9), day(3)))
        .unwrap_err();

    assert_eq!(err.status_code(), 400);
    match err {
        StockError::InsufficientStock {
            group,
            requested,
            available,
        } => {
            assert_eq!(group, "Cocoa");
            assert_eq!(requested, dec!(6));
            assert_eq!(available, dec!(5.5));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let after = engine.store().snapshot();
    assert_eq!(after.lots, before.lots);
    assert!(after.sales.is_empty());
    assert!(after.allocations.is_empty());
    assert_eq!(
        after.products[&receipt.product.id].current_stock,
        dec!(4)
    );
}

#[test]
fn test_reversal_restores_exactly() {
    let engine = engine();
    let a = receive(&engine, "Sugar", dec!(2.25), dec!(1.1), day(1));
    let b = receive(&engine, "Sugar", dec!(4), dec!(1.3), day(2));
    let before = engine.store().snapshot();

    let created = engine
        .create_sale(SaleRequest::new(a.product.id, dec!(3.5), dec!(2), day(3)))
        .unwrap();
    let outcome = engine.delete_sale(created.sale.id()).unwrap();
    assert_eq!(outcome.credited_quantity(), dec!(3.5));

    let after = engine.store().snapshot();
    assert_eq!(after.lots, before.lots);
    for id in [a.product.id, b.product.id] {
        assert_eq!(
            after.products[&id].current_stock,
            before.products[&id].current_stock
        );
    }
    assert!(after.allocations.is_empty());
    assert!(!after.sales.contains_key(&created.sale.id()));
}

#[test]
fn test_reversal_credits_newest_lot_first() {
    let engine = engine();
    let l1 = receive(&engine, "Matcha", dec!(2), dec!(30), day(1));
    let l2 = receive(&engine, "Matcha", dec!(2), dec!(35), day(2));

    let created = engine
        .create_sale(SaleRequest::new(l1.product.id, dec!(3), dec!(50), day(3)))
        .unwrap();
    let outcome = engine.delete_sale(created.sale.id()).unwrap();

    let order: Vec<Uuid> = outcome.steps.iter().map(|s| s.lot_id).collect();
    assert_eq!(order, vec![l2.lot.id, l1.lot.id]);
    assert_eq!(outcome.steps[0].quantity, dec!(1));
    assert_eq!(outcome.steps[0].remaining_after, dec!(2));
    assert_eq!(outcome.steps[1].quantity, dec!(2));

    // 回沖後下一筆銷售仍從最舊批次開始
    let next = engine
        .create_sale(SaleRequest::new(l2.product.id, dec!(1), dec!(50), day(4)))
        .unwrap();
    assert_eq!(next.allocations[0].lot_id, l1.lot.id);
}

#[test]
fn test_delete_missing_sale_is_not_found() {
    let engine = engine();
    receive(&engine, "Syrup", dec!(1), dec!(1), day(1));
    let before = engine.store().snapshot();

    let err = engine.delete_sale(Uuid::new_v4()).unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert_eq!(engine.store().snapshot().lots, before.lots);

    // 已刪除的銷售不可再刪
    let receipt = receive(&engine, "Syrup", dec!(1), dec!(1), day(2));
    let created = engine
        .create_sale(SaleRequest::new(receipt.product.id, dec!(1), dec!(3), day(3)))
        .unwrap();
    engine.delete_sale(created.sale.id()).unwrap();
    assert!(engine.delete_sale(created.sale.id()).is_err());
}

#[test]
fn test_costing_is_idempotent_and_read_only() {
    let engine = engine();
    receive(&engine, "Vanilla", dec!(3), dec!(4), day(1));
    receive(&engine, "Vanilla", dec!(3), dec!(8), day(2));
    let before = engine.store().snapshot();

    let first = engine.costing("Vanilla", Some(dec!(4))).unwrap();
    let second = engine.costing("Vanilla", Some(dec!(4))).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.fifo_cost, Some(dec!(5)));
    assert_eq!(first.average_unit_cost, dec!(6));
    assert_eq!(first.total_stock, dec!(6));
    assert_eq!(first.total_stock_value, dec!(36));
    assert_eq!(first.next_fifo_cost, Some(dec!(4)));
    assert_eq!(engine.store().snapshot().lots, before.lots);

    let err = engine.costing("Vanilla", Some(dec!(7))).unwrap_err();
    assert!(err.is_insufficient_stock());
}

#[rstest]
#[case(None, None)]
#[case(Some(Decimal::ZERO), None)]
#[case(Some(dec!(2)), Some(dec!(4)))]
#[case(Some(dec!(6)), Some(dec!(6)))]
fn test_costing_quantity_cases(
    #[case] quantity: Option<Decimal>,
    #[case] expected: Option<Decimal>,
) {
    let engine = engine();
    receive(&engine, "Vanilla", dec!(3), dec!(4), day(1));
    receive(&engine, "Vanilla", dec!(3), dec!(8), day(2));

    let report = engine.costing("Vanilla", quantity).unwrap();
    assert_eq!(report.fifo_cost, expected);
}

#[test]
fn test_costing_unknown_group_is_empty() {
    let engine = engine();
    let report = engine.costing("Nothing", None).unwrap();
    assert_eq!(report.average_unit_cost, Decimal::ZERO);
    assert_eq!(report.total_stock, Decimal::ZERO);
    assert_eq!(report.next_fifo_cost, None);
}

#[test]
fn test_recipe_sale_allocates_all_ingredients() {
    let engine = engine();
    let beans = receive(&engine, "Espresso Beans", dec!(1), dec!(20), day(1));
    let milk = receive(&engine, "Whole Milk", dec!(5), dec!(1.2), day(1));
    let recipe = Recipe::new("Latte".to_string())
        .with_item(beans.product.id, dec!(0.018))
        .with_item(milk.product.id, dec!(0.25))
        .with_suggested_price(dec!(4.5));
    let recipe_id = recipe.id;
    engine.store().insert_recipe(recipe).unwrap();

    let created = engine
        .create_recipe_sale(
            RecipeSaleRequest::new(recipe_id, dec!(10), dec!(4.5), day(2))
                .with_customer("Ada".to_string(), "555-0100".to_string()),
        )
        .unwrap();

    assert_eq!(created.allocations.len(), 2);
    // 0.18 * 20 + 2.5 * 1.2
    assert_eq!(created.cost_of_goods, dec!(6.6));
    assert_eq!(created.sale.unit_cost(), dec!(0.66));
    assert_eq!(created.sale.total_price(), dec!(45));
    assert_eq!(created.sale.customer_name(), "Ada");
    match created.sale.subject() {
        SaleSubject::Recipe {
            label, category, ..
        } => {
            assert_eq!(label, "Recipe: Latte");
            assert_eq!(category, "Recipe");
        }
        other => panic!("unexpected subject: {other:?}"),
    }

    let state = engine.store().snapshot();
    assert_eq!(state.products[&beans.product.id].current_stock, dec!(0.82));
    assert_eq!(state.products[&milk.product.id].current_stock, dec!(2.5));

    // 刪除配方銷售歸還所有原料
    engine.delete_sale(created.sale.id()).unwrap();
    let state = engine.store().snapshot();
    assert_eq!(state.products[&beans.product.id].current_stock, dec!(1));
    assert_eq!(state.products[&milk.product.id].current_stock, dec!(5));
}

#[test]
fn test_recipe_sale_is_atomic() {
    // A 足夠、B 不足：兩者批次都不變，銷售不建立
    let engine = engine();
    let a = receive(&engine, "Ingredient A", dec!(10), dec!(1), day(1));
    let b = receive(&engine, "Ingredient B", dec!(1), dec!(1), day(1));
    let recipe = Recipe::new("Combo".to_string())
        .with_item(a.product.id, dec!(1))
        .with_item(b.product.id, dec!(1));
    let recipe_id = recipe.id;
    engine.store().insert_recipe(recipe).unwrap();
    let before = engine.store().snapshot();

    let err = engine
        .create_recipe_sale(RecipeSaleRequest::new(recipe_id, dec!(2), dec!(10), day(2)))
        .unwrap_err();

    assert_eq!(err.status_code(), 400);
    match err {
        StockError::InsufficientIngredient { ingredient, .. } => {
            assert_eq!(ingredient, "Ingredient B")
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let after = engine.store().snapshot();
    assert_eq!(after.lots, before.lots);
    assert!(after.sales.is_empty());
    assert!(after.allocations.is_empty());
}

#[test]
fn test_persistence_failure_rolls_back() {
    let engine = engine();
    let receipt = receive(&engine, "Cream", dec!(5), dec!(2), day(1));
    let before = engine.store().snapshot();

    // 寫入順序：銷售、批次剩餘、產品庫存、分配記錄
    engine.store().inject_write_failure(3);
    let err = engine
        .create_sale(SaleRequest::new(receipt.product.id, dec!(2), dec!(4), day(2)))
        .unwrap_err();
    assert!(matches!(err, StockError::Persistence(_)));
    assert_eq!(err.status_code(), 500);

    let after = engine.store().snapshot();
    assert_eq!(after.lots, before.lots);
    assert_eq!(
        after.products[&receipt.product.id].current_stock,
        dec!(5)
    );
    assert!(after.sales.is_empty());
    assert!(after.allocations.is_empty());

    // 下一筆不受影響
    engine
        .create_sale(SaleRequest::new(receipt.product.id, dec!(2), dec!(4), day(2)))
        .unwrap();
}

#[rstest]
#[case(1, "Sale(")]
#[case(2, "Lot(")]
#[case(3, "Product(")]
#[case(4, "Allocations")]
fn test_recipe_sale_write_order(#[case] nth: usize, #[case] failing_key: &str) {
    // 配方銷售先寫入銷售，再寫入批次、產品庫存與分配記錄
    let engine = engine();
    let beans = receive(&engine, "Beans", dec!(1), dec!(10), day(1));
    let recipe = Recipe::new("Espresso".to_string()).with_item(beans.product.id, dec!(0.018));
    let recipe_id = recipe.id;
    engine.store().insert_recipe(recipe).unwrap();
    let before = engine.store().snapshot();

    engine.store().inject_write_failure(nth);
    let err = engine
        .create_recipe_sale(RecipeSaleRequest::new(recipe_id, dec!(2), dec!(3), day(2)))
        .unwrap_err();
    match err {
        StockError::Persistence(message) => {
            assert!(message.contains(failing_key), "{message}")
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let after = engine.store().snapshot();
    assert_eq!(after.lots, before.lots);
    assert!(after.sales.is_empty());
    assert!(after.allocations.is_empty());
}

#[test]
fn test_overflow_is_rejected_without_poisoning_the_store() {
    let engine = engine();

    // 進貨總額超出 Decimal 範圍
    let err = engine
        .receive_stock(StockReceipt::new(
            "Big".to_string(),
            "kg".to_string(),
            dec!(1e15),
            dec!(1e15),
            day(1),
        ))
        .unwrap_err();
    assert!(matches!(err, StockError::Overflow(_)));

    // 單筆可表示，但分組總量溢位
    let first = receive(&engine, "Bulk", Decimal::MAX, Decimal::ZERO, day(1));
    receive(&engine, "Bulk", Decimal::MAX, Decimal::ZERO, day(2));
    let before = engine.store().snapshot();

    for _ in 0..2 {
        let err = engine.costing("Bulk", None).unwrap_err();
        assert!(matches!(err, StockError::Overflow(_)));
        assert_eq!(err.status_code(), 400);
    }
    assert_eq!(engine.store().snapshot().lots, before.lots);

    // 帳本仍可正常寫入
    let created = engine
        .create_sale(SaleRequest::new(first.product.id, dec!(1), dec!(2), day(3)))
        .unwrap();
    assert_eq!(created.allocations.len(), 1);
    assert_eq!(created.allocations[0].lot_id, first.lot.id);
    engine.delete_sale(created.sale.id()).unwrap();
    assert_eq!(engine.store().snapshot().lots, before.lots);
}

#[test]
fn test_concurrent_sales_never_overallocate() {
    let engine = Arc::new(engine());
    let receipt = receive(&engine, "Croissant", dec!(5), dec!(1), day(1));
    let product_id = receipt.product.id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine.create_sale(SaleRequest::new(product_id, dec!(1), dec!(3), day(2)))
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.is_insufficient_stock()))
        .count();
    assert_eq!(succeeded, 5);
    assert_eq!(rejected, 3);

    let state = engine.store().snapshot();
    assert_eq!(state.lots[&receipt.lot.id].remaining_quantity, Decimal::ZERO);
    assert!(engine.audit("Croissant").unwrap().is_consistent());
}

#[test]
fn test_zero_quantity_sale_is_noop() {
    let engine = engine();
    let receipt = receive(&engine, "Water", dec!(3), dec!(0.5), day(1));

    let created = engine
        .create_sale(SaleRequest::new(receipt.product.id, Decimal::ZERO, dec!(1), day(2)))
        .unwrap();

    assert!(created.allocations.is_empty());
    assert_eq!(created.cost_of_goods, Decimal::ZERO);
    assert_eq!(
        engine.store().snapshot().lots[&receipt.lot.id].remaining_quantity,
        dec!(3)
    );
}

#[test]
fn test_sale_pricing_and_details() {
    let engine = engine();
    let receipt = receive(&engine, "Tea Leaves", dec!(10), dec!(3), day(1));

    let created = engine
        .create_sale(
            SaleRequest::new(receipt.product.id, dec!(4), dec!(25), day(2))
                .with_discount(dec!(10))
                .with_vat_rate(dec!(10))
                .with_note("wholesale".to_string()),
        )
        .unwrap();

    assert_eq!(created.sale.net_price(), dec!(90));
    assert_eq!(created.sale.vat_amount(), dec!(9));
    assert_eq!(created.sale.total_price(), dec!(99));
    assert_eq!(created.sale.note(), Some("wholesale"));
    assert_eq!(created.gross_profit().unwrap(), dec!(78));
}

#[test]
fn test_stock_movements_and_audit() {
    let engine = engine();
    let first = receive(&engine, "Honey", dec!(2), dec!(9), day(1));
    let second = receive(&engine, "Honey", dec!(2), dec!(11), day(2));
    engine
        .create_sale(SaleRequest::new(first.product.id, dec!(3), dec!(15), day(3)))
        .unwrap();

    let movements = engine.stock_movements(second.product.id).unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].remaining_quantity, dec!(1));

    let report = engine.audit("Honey").unwrap();
    assert!(report.is_consistent());
    assert_eq!(report.lots_checked, 2);
}
