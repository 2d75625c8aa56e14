//! 庫存引擎
//!
//! 每個操作開啟一個交易；任一步驟失敗時整筆回滾。

use std::time::Instant;

use rust_decimal::Decimal;
use stock_core::{
    EngineConfig, EntityKind, LedgerStore, LedgerTransaction, Lot, Product, ProductGroup, Sale,
    SaleSubject, StockError,
};
use uuid::Uuid;

use crate::allocator::Allocator;
use crate::audit::{AuditReport, LedgerAudit};
use crate::costing::{CostingCalculator, CostingReport};
use crate::recipe::RecipeExpander;
use crate::request::{RecipeSaleRequest, SaleRequest, StockReceipt};
use crate::reverser::{ReversalOutcome, Reverser};
use crate::{ReceiptResult, SaleResult};

/// 庫存引擎
pub struct StockEngine<S: LedgerStore> {
    store: S,
    config: EngineConfig,
}

impl<S: LedgerStore> StockEngine<S> {
    /// 使用預設配置創建引擎
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
        }
    }

    /// 使用指定配置創建引擎
    pub fn with_config(store: S, config: EngineConfig) -> stock_core::Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 進貨：建立產品與其唯一批次
    pub fn receive_stock(&self, receipt: StockReceipt) -> stock_core::Result<ReceiptResult> {
        if receipt.quantity < Decimal::ZERO {
            return Err(StockError::InvalidQuantity(format!(
                "進貨數量不可為負: {}",
                receipt.quantity
            )));
        }
        if receipt.unit_price < Decimal::ZERO {
            return Err(StockError::InvalidQuantity(format!(
                "進貨單價不可為負: {}",
                receipt.unit_price
            )));
        }

        let invoice_date = receipt.invoice_date();
        let mut product = Product::new(receipt.product_name, receipt.unit)
            .with_company_name(receipt.company_name)
            .with_category(receipt.category)
            .with_receipt(receipt.quantity, receipt.unit_price)
            .with_vat(receipt.vat);
        product = match receipt.invoice_no {
            Some(invoice_no) => product.with_invoice(invoice_no, invoice_date),
            None => {
                product.invoice_date = Some(invoice_date);
                product
            }
        };

        // 進貨總額（含稅）必須在 Decimal 範圍內
        if let Err(e) = product.total_cost() {
            tracing::warn!("進貨被拒絕: {} ({})", product.product_name, e);
            return Err(e);
        }

        let result = self.store.transaction(|tx| {
            let group = product.group();
            tx.lock_product_group(&group)?;
            tx.insert_product(product.clone())?;
            let lot = tx.insert_lot(Lot::new(
                product.id,
                receipt.quantity,
                receipt.unit_price,
                receipt.received_at,
            ))?;
            self.verify(tx, std::slice::from_ref(&group))?;

            Ok(ReceiptResult {
                product: product.clone(),
                lot,
            })
        })?;

        tracing::info!(
            "進貨完成: {} 數量 {} 單價 {} (批次 {})",
            result.product.product_name,
            result.lot.initial_quantity,
            result.lot.unit_cost,
            result.lot.id
        );

        Ok(result)
    }

    /// 建立直接銷售
    pub fn create_sale(&self, request: SaleRequest) -> stock_core::Result<SaleResult> {
        let result = self.store.transaction(|tx| {
            let product = tx
                .find_product(request.product_id)?
                .ok_or_else(|| StockError::not_found(EntityKind::Product, request.product_id))?;
            let group = product.group();

            // Step 1: 上鎖並計算 FIFO 計劃（不足時不寫入）
            let plan = Allocator::plan(tx, &group, request.quantity)?;
            tracing::debug!("FIFO 計劃: {} 行", plan.lines.len());

            let cost_of_goods = plan.total_cost()?;

            // Step 2: 寫入銷售
            let mut sale = Sale::new(
                SaleSubject::Product {
                    product_id: product.id,
                },
                request.quantity,
                request.sale_price,
                request.sale_date,
            )?
            .with_discount(request.discount)?
            .with_vat_rate(request.vat_rate)?
            .with_customer(request.customer_name.clone(), request.customer_phone.clone())
            .with_unit_cost(plan.unit_cost()?.unwrap_or(Decimal::ZERO));
            if let Some(note) = &request.note {
                sale = sale.with_note(note.clone());
            }
            tx.insert_sale(sale.clone())?;

            // Step 3: 套用計劃
            let allocations = Allocator::apply(tx, sale.id(), &plan)?;
            self.verify(tx, std::slice::from_ref(&group))?;

            Ok(SaleResult {
                sale,
                allocations,
                cost_of_goods,
            })
        });

        match &result {
            Ok(created) => tracing::info!(
                "銷售完成: {} 數量 {} 分配 {} 筆，成本 {}",
                created.sale.id(),
                created.sale.quantity(),
                created.allocations.len(),
                created.cost_of_goods
            ),
            Err(e) => tracing::warn!("銷售被拒絕: {}", e),
        }

        result
    }

    /// 建立配方銷售：所有原料檢查通過後才寫入銷售與分配，全部在同一交易
    pub fn create_recipe_sale(&self, request: RecipeSaleRequest) -> stock_core::Result<SaleResult> {
        let start_time = Instant::now();

        let result = self.store.transaction(|tx| {
            let recipe = tx
                .find_recipe(request.recipe_id)?
                .ok_or_else(|| StockError::not_found(EntityKind::Recipe, request.recipe_id))?;

            // Step 1: 檢查所有原料並產生計劃（不足時不寫入）
            let plan = RecipeExpander::prepare(tx, &recipe, request.quantity)?;
            let cost_of_goods = plan.total_cost()?;

            // Step 2: 寫入銷售
            let mut sale = Sale::new(
                SaleSubject::Recipe {
                    recipe_id: recipe.id,
                    label: recipe.sale_label(&self.config.recipe_label_prefix),
                    category: self.config.recipe_category.clone(),
                },
                request.quantity,
                request.sale_price,
                request.sale_date,
            )?
            .with_discount(request.discount)?
            .with_vat_rate(request.vat_rate)?
            .with_customer(request.customer_name.clone(), request.customer_phone.clone())
            .with_unit_cost(plan.unit_cost()?);
            if let Some(note) = &request.note {
                sale = sale.with_note(note.clone());
            }
            tx.insert_sale(sale.clone())?;

            // Step 3: 套用各原料計劃
            let expanded = RecipeExpander::apply(tx, sale.id(), plan)?;
            self.verify(tx, &expanded.groups())?;

            let allocations = expanded
                .outcomes
                .into_iter()
                .flat_map(|o| o.allocations)
                .collect();

            Ok(SaleResult {
                sale,
                allocations,
                cost_of_goods,
            })
        });

        match &result {
            Ok(created) => tracing::info!(
                "配方銷售完成: {} 數量 {} 分配 {} 筆，耗時 {:?}",
                created.sale.id(),
                created.sale.quantity(),
                created.allocations.len(),
                start_time.elapsed()
            ),
            Err(e) => tracing::warn!("配方銷售被拒絕: {}", e),
        }

        result
    }

    /// 刪除銷售並回沖其分配
    pub fn delete_sale(&self, sale_id: Uuid) -> stock_core::Result<ReversalOutcome> {
        let outcome = self.store.transaction(|tx| {
            let outcome = Reverser::reverse(tx, sale_id)?;
            self.verify(tx, &outcome.groups)?;
            Ok(outcome)
        })?;

        tracing::info!(
            "銷售已刪除: {} 歸還 {} 個批次，共 {}",
            sale_id,
            outcome.steps.len(),
            outcome.credited_quantity()
        );

        Ok(outcome)
    }

    /// 成本查詢：數量為 None 或 0 時只回傳平均成本與庫存
    pub fn costing(
        &self,
        product_name: &str,
        quantity: Option<Decimal>,
    ) -> stock_core::Result<CostingReport> {
        let group = ProductGroup::new(product_name);
        let report = self.store.transaction(|tx| {
            tx.lock_product_group(&group)?;
            let lots = tx.lots_for_product_group(&group)?;
            CostingCalculator::report(&group, &lots, quantity)
        })?;

        Ok(report.rounded(self.config.cost_scale))
    }

    /// 單一產品ID的批次（入庫順序）
    pub fn stock_movements(&self, product_id: Uuid) -> stock_core::Result<Vec<Lot>> {
        self.store.transaction(|tx| {
            let product = tx
                .find_product(product_id)?
                .ok_or_else(|| StockError::not_found(EntityKind::Product, product_id))?;
            tx.lock_product_group(&product.group())?;
            tx.lots_for_product(product_id)
        })
    }

    /// 稽核產品名稱分組
    pub fn audit(&self, product_name: &str) -> stock_core::Result<AuditReport> {
        let group = ProductGroup::new(product_name);
        self.store
            .transaction(|tx| LedgerAudit::audit_group(tx, &group))
    }

    /// 寫入後稽核（依配置）
    fn verify<T>(&self, tx: &mut T, groups: &[ProductGroup]) -> stock_core::Result<()>
    where
        T: LedgerTransaction + ?Sized,
    {
        if !self.config.verify_after_write {
            return Ok(());
        }

        for group in groups {
            let report = LedgerAudit::audit_group(tx, group)?;
            if !report.is_consistent() {
                let details: Vec<String> =
                    report.discrepancies.iter().map(ToString::to_string).collect();
                return Err(StockError::InvariantViolation(format!(
                    "{}: {}",
                    group,
                    details.join("; ")
                )));
            }
        }

        Ok(())
    }
}
