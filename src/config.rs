use crate::{Result, ToolError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Schema version understood by this build.
pub const CONFIG_VERSION: u32 = 1;

const BUILTIN_CONFIG: &str = include_str!("../config/default.toml");

// ── AppConfig ────────────────────────────────────────────────────────────────

/// Top-level configuration: parser tuning, restock lead times and the
/// product-name catalog, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub version: u32,
    pub parser: ParserConfig,
    pub restock: RestockConfig,
    /// SKU prefix → product name.
    pub products: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            parser: ParserConfig::default(),
            restock: RestockConfig::default(),
            products: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// The configuration compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CONFIG)
    }

    /// Load a configuration file from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Parse a TOML document and check its schema version.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.version != CONFIG_VERSION {
            return Err(ToolError::InvalidConfig(format!(
                "unsupported config version {} (expected {CONFIG_VERSION})",
                self.version
            )));
        }
        if !self.parser.band_factor.is_finite() || self.parser.band_factor <= 0.0 {
            return Err(ToolError::InvalidConfig(
                "parser.band_factor must be a positive number".into(),
            ));
        }
        if !self.restock.growth_cap.is_finite() {
            return Err(ToolError::InvalidConfig(
                "restock.growth_cap must be a finite number".into(),
            ));
        }
        Ok(())
    }
}

// ── ParserConfig ─────────────────────────────────────────────────────────────

/// How the recovered quantity is summed before comparing it with the
/// printed `Item quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountingMode {
    /// One unit per printed order line quantity (bundles count once).
    #[default]
    RawLines,
    /// One unit per product after bundle expansion.
    Expanded,
}

/// Runtime configuration for [`crate::PickingListAnalyzer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Height of the vertical search band around a quantity anchor, as a
    /// multiple of the page's average line height. Clamped to `1.2..=3.0`.
    pub band_factor: f32,

    /// Which sum is reconciled against the printed total.
    pub accounting: AccountingMode,

    /// Placeholder SKUs for giveaway items (e.g. `NM001`).
    pub mystery_skus: Vec<String>,

    /// When `true`, mystery quantities are taken off the printed total
    /// before reconciling.
    pub subtract_mystery: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            band_factor: 1.8,
            accounting: AccountingMode::RawLines,
            mystery_skus: vec!["NM001".into(), "NF001".into()],
            subtract_mystery: true,
        }
    }
}

impl ParserConfig {
    pub(crate) fn effective_band_factor(&self) -> f32 {
        self.band_factor.clamp(1.2, 3.0)
    }
}

// ── RestockConfig ────────────────────────────────────────────────────────────

/// Lead times and tuning for the weekly restock plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestockConfig {
    pub production_days: u32,
    pub shipping_days: u32,
    /// Also the per-size stock floor below which a size is flagged.
    pub safety_days: u32,
    /// Growth multipliers above this are replaced by the mean growth.
    pub growth_cap: f64,
    /// How many days of giveaways to plan for.
    pub gift_horizon_days: u32,
}

impl Default for RestockConfig {
    fn default() -> Self {
        Self {
            production_days: 6,
            shipping_days: 12,
            safety_days: 12,
            growth_cap: 1.8,
            gift_horizon_days: 21,
        }
    }
}

impl RestockConfig {
    /// Total days of stock a restock has to cover.
    pub fn lead_days(&self) -> u32 {
        self.production_days + self.shipping_days + self.safety_days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_parses() {
        let cfg = AppConfig::builtin().unwrap();
        assert_eq!(cfg.version, CONFIG_VERSION);
        assert_eq!(cfg.restock.lead_days(), 30);
        assert!(cfg.products.contains_key("NPJ011"));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg = AppConfig::from_toml_str("version = 1\n").unwrap();
        assert_eq!(cfg.parser.accounting, AccountingMode::RawLines);
        assert_eq!(cfg.restock.gift_horizon_days, 21);
        assert!(cfg.products.is_empty());
    }

    #[test]
    fn rejects_unknown_version() {
        let err = AppConfig::from_toml_str("version = 7\n").unwrap_err();
        assert!(matches!(err, ToolError::InvalidConfig(_)));
    }

    #[test]
    fn band_factor_is_clamped() {
        let cfg = ParserConfig {
            band_factor: 9.0,
            ..Default::default()
        };
        assert_eq!(cfg.effective_band_factor(), 3.0);
    }
}
