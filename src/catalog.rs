use crate::sku::{is_single_prefix, Size, Sku};
use crate::{AppConfig, Result, ToolError};
use std::collections::{BTreeMap, BTreeSet};

/// SKU prefix → product name lookup.
///
/// Names missing from the configuration can be filled in for the current
/// run with [`ProductCatalog::set_name`]; nothing is written back.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    names: BTreeMap<String, String>,
}

/// One line of the named product summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub seller_sku: String,
    pub prefix: String,
    pub size: Size,
    /// `None` until the operator names an unknown prefix.
    pub product_name: Option<String>,
    pub quantity: u32,
}

impl ProductCatalog {
    pub fn new(names: BTreeMap<String, String>) -> Self {
        Self { names }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.products.clone())
    }

    pub fn name_for(&self, prefix: &str) -> Option<&str> {
        self.names.get(prefix).map(String::as_str)
    }

    pub fn set_name(&mut self, prefix: &str, name: &str) {
        self.names.insert(prefix.to_string(), name.trim().to_string());
    }

    /// Apply an operator override of the form `NPJ011=Rose Quartz`.
    pub fn apply_override(&mut self, spec: &str) -> Result<()> {
        let (prefix, name) = spec
            .split_once('=')
            .ok_or_else(|| ToolError::InvalidOverride(spec.into()))?;
        let prefix = prefix.trim().to_ascii_uppercase();
        if !is_single_prefix(&prefix) || name.trim().is_empty() {
            return Err(ToolError::InvalidOverride(spec.into()));
        }
        self.set_name(&prefix, name);
        Ok(())
    }

    /// Prefixes in `quantities` that have no name yet.
    pub fn unknown_prefixes(&self, quantities: &BTreeMap<Sku, u32>) -> BTreeSet<String> {
        let unknown: BTreeSet<String> = quantities
            .keys()
            .map(Sku::prefix)
            .filter(|p| !self.names.contains_key(*p))
            .map(str::to_string)
            .collect();
        if !unknown.is_empty() {
            tracing::info!(count = unknown.len(), "prefixes without a product name");
        }
        unknown
    }

    /// Per-SKU rows with their product names, in SKU order.
    pub fn summary_rows(&self, quantities: &BTreeMap<Sku, u32>) -> Vec<SummaryRow> {
        quantities
            .iter()
            .map(|(sku, &quantity)| SummaryRow {
                seller_sku: sku.to_string(),
                prefix: sku.prefix().to_string(),
                size: sku.size(),
                product_name: self.name_for(sku.prefix()).map(str::to_string),
                quantity,
            })
            .collect()
    }

    /// One `(prefix, name)` pair per distinct prefix in `quantities`; unknown
    /// prefixes map to an empty name.
    pub fn mapping_rows(&self, quantities: &BTreeMap<Sku, u32>) -> Vec<(String, String)> {
        let prefixes: BTreeSet<&str> = quantities.keys().map(Sku::prefix).collect();
        prefixes
            .into_iter()
            .map(|p| (p.to_string(), self.name_for(p).unwrap_or_default().to_string()))
            .collect()
    }
}
