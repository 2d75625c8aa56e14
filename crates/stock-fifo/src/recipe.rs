//! 配方展開
//!
//! 兩階段：先檢查所有原料並產生 FIFO 計劃，全部足夠後才逐一套用。

use rust_decimal::Decimal;
use serde::Serialize;
use stock_core::{checked, EntityKind, LedgerTransaction, ProductGroup, Recipe, StockError};
use uuid::Uuid;

use crate::allocator::{AllocationOutcome, Allocator};
use crate::selector::{FifoPlan, FifoSelector};

/// 單一原料分組的需求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientRequirement {
    pub group: ProductGroup,
    /// 同分組所有原料項目的需求總和
    pub required: Decimal,
    pub available: Decimal,
}

impl IngredientRequirement {
    pub fn is_satisfied(&self) -> bool {
        self.required <= self.available
    }
}

/// 配方的取用計劃（第一階段結果，尚未寫入）
#[derive(Debug, Clone)]
pub struct RecipePlan {
    pub recipe_id: Uuid,
    pub batch_quantity: Decimal,
    /// 依配方原料順序，每個分組一筆
    pub plans: Vec<(ProductGroup, FifoPlan)>,
}

impl RecipePlan {
    pub fn total_cost(&self) -> stock_core::Result<Decimal> {
        self.plans
            .iter()
            .try_fold(Decimal::ZERO, |total, (_, plan)| {
                checked::add(total, plan.total_cost()?)
            })
    }

    /// 每單位配方的原料成本
    pub fn unit_cost(&self) -> stock_core::Result<Decimal> {
        per_batch(self.total_cost()?, self.batch_quantity)
    }
}

/// 配方分配結果
#[derive(Debug, Clone)]
pub struct RecipeAllocation {
    pub recipe_id: Uuid,
    pub batch_quantity: Decimal,
    /// 依配方原料順序
    pub outcomes: Vec<AllocationOutcome>,
}

impl RecipeAllocation {
    pub fn total_cost(&self) -> stock_core::Result<Decimal> {
        self.outcomes
            .iter()
            .try_fold(Decimal::ZERO, |total, outcome| {
                checked::add(total, outcome.total_cost()?)
            })
    }

    /// 每單位配方的原料成本
    pub fn unit_cost(&self) -> stock_core::Result<Decimal> {
        per_batch(self.total_cost()?, self.batch_quantity)
    }

    pub fn allocation_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.allocations.len()).sum()
    }

    pub fn groups(&self) -> Vec<ProductGroup> {
        self.outcomes.iter().map(|o| o.group.clone()).collect()
    }
}

fn per_batch(total: Decimal, batch_quantity: Decimal) -> stock_core::Result<Decimal> {
    if batch_quantity.is_zero() {
        Ok(Decimal::ZERO)
    } else {
        checked::div(total, batch_quantity)
    }
}

/// 配方展開器
pub struct RecipeExpander;

impl RecipeExpander {
    /// 解析原料分組、上鎖並計算需求與可用量（不寫入）
    ///
    /// 結果依配方原料首次出現的順序；同分組的項目合併到第一次出現的位置。
    pub fn requirements<T>(
        tx: &mut T,
        recipe: &Recipe,
        batch_quantity: Decimal,
    ) -> stock_core::Result<Vec<IngredientRequirement>>
    where
        T: LedgerTransaction + ?Sized,
    {
        let mut requirements: Vec<IngredientRequirement> = Vec::new();
        for item in &recipe.items {
            let product = tx
                .find_product(item.product_id)?
                .ok_or_else(|| StockError::not_found(EntityKind::Product, item.product_id))?;
            let group = product.group();
            let quantity = item.required_for(batch_quantity)?;

            match requirements.iter_mut().find(|r| r.group == group) {
                Some(existing) => existing.required = checked::add(existing.required, quantity)?,
                None => requirements.push(IngredientRequirement {
                    group,
                    required: quantity,
                    available: Decimal::ZERO,
                }),
            }
        }

        // 上鎖一律依名稱排序
        let mut lock_order: Vec<&ProductGroup> = requirements.iter().map(|r| &r.group).collect();
        lock_order.sort();
        for group in lock_order {
            tx.lock_product_group(group)?;
        }

        for requirement in &mut requirements {
            let lots = tx.lots_for_product_group(&requirement.group)?;
            requirement.available = FifoSelector::total_available(&lots)?;
        }

        Ok(requirements)
    }

    /// 第一階段：檢查所有原料並產生取用計劃
    ///
    /// 回報配方順序中第一個不足的原料。成功時成本已確定，尚未寫入任何資料。
    pub fn prepare<T>(
        tx: &mut T,
        recipe: &Recipe,
        batch_quantity: Decimal,
    ) -> stock_core::Result<RecipePlan>
    where
        T: LedgerTransaction + ?Sized,
    {
        if batch_quantity < Decimal::ZERO {
            return Err(StockError::InvalidQuantity(format!(
                "配方 {} 的數量不可為負: {}",
                recipe.name, batch_quantity
            )));
        }

        let requirements = Self::requirements(tx, recipe, batch_quantity)?;

        if let Some(short) = requirements.iter().find(|r| !r.is_satisfied()) {
            tracing::warn!(
                "配方 {} 原料不足：{} 需要 {}，可用 {}",
                recipe.name,
                short.group,
                short.required,
                short.available
            );
            return Err(StockError::InsufficientIngredient {
                ingredient: short.group.to_string(),
                requested: short.required,
                available: short.available,
            });
        }

        let mut plans = Vec::with_capacity(requirements.len());
        for requirement in requirements {
            let plan = Allocator::plan(tx, &requirement.group, requirement.required)?;
            plans.push((requirement.group, plan));
        }

        let plan = RecipePlan {
            recipe_id: recipe.id,
            batch_quantity,
            plans,
        };
        plan.total_cost()?;

        Ok(plan)
    }

    /// 第二階段：套用取用計劃
    pub fn apply<T>(
        tx: &mut T,
        sale_id: Uuid,
        plan: RecipePlan,
    ) -> stock_core::Result<RecipeAllocation>
    where
        T: LedgerTransaction + ?Sized,
    {
        let mut outcomes = Vec::with_capacity(plan.plans.len());
        for (group, fifo_plan) in plan.plans {
            let allocations = Allocator::apply(tx, sale_id, &fifo_plan)?;
            outcomes.push(AllocationOutcome {
                group,
                plan: fifo_plan,
                allocations,
            });
        }

        Ok(RecipeAllocation {
            recipe_id: plan.recipe_id,
            batch_quantity: plan.batch_quantity,
            outcomes,
        })
    }

    /// 展開並分配：任一原料不足時不做任何寫入
    pub fn expand_and_allocate<T>(
        tx: &mut T,
        sale_id: Uuid,
        recipe: &Recipe,
        batch_quantity: Decimal,
    ) -> stock_core::Result<RecipeAllocation>
    where
        T: LedgerTransaction + ?Sized,
    {
        let plan = Self::prepare(tx, recipe, batch_quantity)?;
        Self::apply(tx, sale_id, plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{day, seed_lot};
    use rust_decimal_macros::dec;
    use stock_core::LedgerStore;
    use stock_store::MemoryStore;

    #[test]
    fn test_same_group_items_are_summed() {
        let store = MemoryStore::new();
        let (milk_a, _) = seed_lot(&store, "Milk", dec!(3), dec!(1), day(1));
        let (milk_b, _) = seed_lot(&store, "Milk", dec!(1), dec!(2), day(2));
        let recipe = Recipe::new("Double Milk".to_string())
            .with_item(milk_a, dec!(2))
            .with_item(milk_b, dec!(1));

        let requirements = store
            .transaction(|tx| RecipeExpander::requirements(tx, &recipe, dec!(1)))
            .unwrap();
        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].required, dec!(3));
        assert_eq!(requirements[0].available, dec!(4));

        // 兩項合計 6 > 4，必須在第一階段被拒絕
        let err = store
            .transaction(|tx| {
                RecipeExpander::expand_and_allocate(tx, Uuid::new_v4(), &recipe, dec!(2))
            })
            .unwrap_err();
        match err {
            StockError::InsufficientIngredient {
                ingredient,
                requested,
                available,
            } => {
                assert_eq!(ingredient, "Milk");
                assert_eq!(requested, dec!(6));
                assert_eq!(available, dec!(4));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.snapshot().allocations.is_empty());
    }

    #[test]
    fn test_expand_allocates_every_ingredient() {
        let store = MemoryStore::new();
        let (beans, _) = seed_lot(&store, "Beans", dec!(10), dec!(2), day(1));
        let (milk, _) = seed_lot(&store, "Milk", dec!(10), dec!(0.5), day(1));
        let recipe = Recipe::new("Latte".to_string())
            .with_item(beans, dec!(0.02))
            .with_item(milk, dec!(0.2));

        let allocation = store
            .transaction(|tx| {
                RecipeExpander::expand_and_allocate(tx, Uuid::new_v4(), &recipe, dec!(5))
            })
            .unwrap();

        assert_eq!(allocation.allocation_count(), 2);
        // 0.1 * 2 + 1.0 * 0.5
        assert_eq!(allocation.total_cost().unwrap(), dec!(0.7));
        assert_eq!(allocation.unit_cost().unwrap(), dec!(0.14));

        let state = store.snapshot();
        assert_eq!(state.products[&beans].current_stock, dec!(9.9));
        assert_eq!(state.products[&milk].current_stock, dec!(9));
    }

    #[test]
    fn test_missing_ingredient_product() {
        let store = MemoryStore::new();
        let recipe = Recipe::new("Ghost".to_string()).with_item(Uuid::new_v4(), dec!(1));
        let err = store
            .transaction(|tx| {
                RecipeExpander::expand_and_allocate(tx, Uuid::new_v4(), &recipe, dec!(1))
            })
            .unwrap_err();
        assert!(matches!(
            err,
            StockError::NotFound {
                entity: EntityKind::Product,
                ..
            }
        ));
    }

    #[test]
    fn test_first_short_ingredient_in_recipe_order() {
        let store = MemoryStore::new();
        let (zucchini, _) = seed_lot(&store, "Zucchini", dec!(1), dec!(3), day(1));
        let (apple, _) = seed_lot(&store, "Apple", dec!(1), dec!(2), day(1));
        let recipe = Recipe::new("Bread".to_string())
            .with_item(zucchini, dec!(2))
            .with_item(apple, dec!(2));

        let requirements = store
            .transaction(|tx| RecipeExpander::requirements(tx, &recipe, dec!(1)))
            .unwrap();
        assert_eq!(requirements[0].group, ProductGroup::new("Zucchini"));
        assert_eq!(requirements[1].group, ProductGroup::new("Apple"));

        let err = store
            .transaction(|tx| RecipeExpander::prepare(tx, &recipe, dec!(1)))
            .unwrap_err();
        match err {
            StockError::InsufficientIngredient { ingredient, .. } => {
                assert_eq!(ingredient, "Zucchini")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_prepare_prices_without_writing() {
        let store = MemoryStore::new();
        let (beans, _) = seed_lot(&store, "Beans", dec!(10), dec!(2), day(1));
        let (milk, _) = seed_lot(&store, "Milk", dec!(10), dec!(0.5), day(1));
        let recipe = Recipe::new("Latte".to_string())
            .with_item(milk, dec!(0.2))
            .with_item(beans, dec!(0.02));
        let before = store.snapshot();

        let plan = store
            .transaction(|tx| RecipeExpander::prepare(tx, &recipe, dec!(5)))
            .unwrap();

        assert_eq!(plan.plans[0].0, ProductGroup::new("Milk"));
        assert_eq!(plan.total_cost().unwrap(), dec!(0.7));
        assert_eq!(plan.unit_cost().unwrap(), dec!(0.14));

        let after = store.snapshot();
        assert_eq!(after.lots, before.lots);
        assert!(after.allocations.is_empty());
    }
}
