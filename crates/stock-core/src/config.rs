//! 引擎配置

use serde::{Deserialize, Serialize};

use crate::{Result, StockError};

/// 庫存引擎配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 配方銷售的虛擬產品名稱前綴
    pub recipe_label_prefix: String,

    /// 配方銷售的虛擬產品分類
    pub recipe_category: String,

    /// 成本報表顯示的小數位數（分配本身不做捨入）
    pub cost_scale: u32,

    /// 每次寫入後在同一交易內稽核受影響的產品分組
    /// - true: 發現不一致時整筆交易失敗並回滾
    /// - false: 不額外稽核（預設）
    pub verify_after_write: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recipe_label_prefix: "Recipe: ".to_string(),
            recipe_category: "Recipe".to_string(),
            cost_scale: 4,
            verify_after_write: false,
        }
    }
}

impl EngineConfig {
    /// 最大顯示小數位數（rust_decimal 上限）
    pub const MAX_COST_SCALE: u32 = 28;

    pub fn new() -> Self {
        Self::default()
    }

    /// 從 JSON 載入，缺少的欄位使用預設值
    ///
    /// # 範例
    /// ```
    /// # use stock_core::EngineConfig;
    /// let config = EngineConfig::from_json_str(r#"{ "cost_scale": 2 }"#).unwrap();
    /// assert_eq!(config.cost_scale, 2);
    /// assert_eq!(config.recipe_category, "Recipe");
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| StockError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置配方名稱前綴
    pub fn with_recipe_label_prefix(mut self, prefix: String) -> Self {
        self.recipe_label_prefix = prefix;
        self
    }

    /// 建構器模式：設置配方分類
    pub fn with_recipe_category(mut self, category: String) -> Self {
        self.recipe_category = category;
        self
    }

    /// 建構器模式：設置成本顯示小數位數
    pub fn with_cost_scale(mut self, scale: u32) -> Self {
        self.cost_scale = scale;
        self
    }

    /// 建構器模式：設置寫入後稽核
    pub fn with_verify_after_write(mut self, verify: bool) -> Self {
        self.verify_after_write = verify;
        self
    }

    /// 檢查配置是否有效
    pub fn validate(&self) -> Result<()> {
        if self.cost_scale > Self::MAX_COST_SCALE {
            return Err(StockError::Config(format!(
                "cost_scale {} 超過上限 {}",
                self.cost_scale,
                Self::MAX_COST_SCALE
            )));
        }
        if self.recipe_category.trim().is_empty() {
            return Err(StockError::Config("recipe_category 不可為空".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.recipe_label_prefix, "Recipe: ");
        assert_eq!(config.cost_scale, 4);
        assert!(!config.verify_after_write);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::new()
            .with_recipe_label_prefix("Menu: ".to_string())
            .with_recipe_category("Menu".to_string())
            .with_cost_scale(2)
            .with_verify_after_write(true);

        assert_eq!(config.recipe_label_prefix, "Menu: ");
        assert_eq!(config.recipe_category, "Menu");
        assert_eq!(config.cost_scale, 2);
        assert!(config.verify_after_write);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(EngineConfig::from_json_str(r#"{ "cost_scale": 40 }"#).is_err());
        assert!(EngineConfig::from_json_str(r#"{ "recipe_category": " " }"#).is_err());
        assert!(EngineConfig::from_json_str("not json").is_err());

        let config = EngineConfig::from_json_str(r#"{ "verify_after_write": true }"#).unwrap();
        assert!(config.verify_after_write);
        assert_eq!(config.cost_scale, 4);
    }
}
