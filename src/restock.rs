//! Weekly restock planning from two sales weeks and an optional inventory
//! sheet.

use crate::sales::{column, normalize_name, strip_bom, WeeklySales};
use crate::sku::Size;
use crate::{RestockConfig, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const DAYS_PER_WEEK: f64 = 7.0;

/// Python-style rounding (half to even), as the restock sheets always used.
fn round_half_even(value: f64) -> i64 {
    value.round_ties_even() as i64
}

// ── Inventory ─────────────────────────────────────────────────────────────────

/// Units in stock plus units on the way, per variation name.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    stock: BTreeMap<String, f64>,
}

impl Inventory {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Parse an inventory sheet with `Name`, `In_stock` and `On_the_way`
    /// columns. Blank or non-numeric quantities count as zero; rows sharing
    /// a normalized name are summed.
    pub fn from_reader<R: Read>(input: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(strip_bom(input)?);
        let headers = reader.headers()?.clone();
        let name = column(&headers, "Name")?;
        let in_stock = column(&headers, "In_stock")?;
        let on_the_way = column(&headers, "On_the_way")?;

        let mut stock = BTreeMap::new();
        for row in reader.records() {
            let row = row?;
            let key = normalize_name(row.get(name).unwrap_or_default());
            let units = quantity(row.get(in_stock)) + quantity(row.get(on_the_way));
            *stock.entry(key).or_insert(0.0) += units;
        }
        Ok(Self { stock })
    }

    /// Whole units available for a variation; unknown names have none.
    pub fn stock_for(&self, name: &str) -> i64 {
        self.stock.get(name).map(|u| *u as i64).unwrap_or(0)
    }
}

fn quantity(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

// ── Restock rows ──────────────────────────────────────────────────────────────

/// Restock suggestion for one variation.
#[derive(Debug, Clone, PartialEq)]
pub struct RestockRow {
    pub variation_name: String,
    pub sold: u32,
    pub zero_price: u32,
    pub total: u32,
    pub last_week_sold: u32,
    pub zero_price_pct: f64,
    pub growth_rate: f64,
    pub daily_avg: f64,
    pub growth_multiplier: f64,
    pub restock_qty: i64,
    pub future_gifts: i64,
    pub restock_with_gifts: i64,
    pub current_stock: i64,
    pub final_restock: i64,
}

impl RestockRow {
    /// Week-over-week growth for display, e.g. `↑ 25.0%`.
    pub fn growth_label(&self) -> String {
        if self.growth_rate > 0.0 {
            format!("↑ {:.1}%", self.growth_rate)
        } else if self.growth_rate < 0.0 {
            format!("↓ {:.1}%", self.growth_rate.abs())
        } else {
            "→ 0.0%".into()
        }
    }
}

/// Per-size split of a variation's final restock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeAllocation {
    pub variation_name: String,
    pub final_restock: i64,
    pub future_gifts: i64,
    pub restock_s: i64,
    pub restock_m: i64,
    pub restock_l: i64,
    /// Sizes whose target stock stays under the safety floor.
    pub warnings: Vec<Size>,
}

impl SizeAllocation {
    pub fn warning_label(&self) -> String {
        self.warnings
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The full plan: one row per variation, plus the size split when an
/// inventory sheet was supplied.
#[derive(Debug, Clone)]
pub struct RestockPlan {
    pub rows: Vec<RestockRow>,
    pub allocations: Option<Vec<SizeAllocation>>,
}

/// Build the restock plan.
///
/// Rows cover every variation sold or given away this week or sold last
/// week, sorted by this week's total (sold + free) descending. This week's
/// lines without a seller SKU are not counted.
pub fn plan(
    this_week: &WeeklySales,
    last_week: &WeeklySales,
    inventory: Option<&Inventory>,
    config: &RestockConfig,
) -> RestockPlan {
    let this_week = this_week.with_seller_sku();
    let sold = this_week.sold_counts();
    let free = this_week.free_counts();
    let sold_last = last_week.sold_counts();

    let names: BTreeSet<&String> = sold.keys().chain(free.keys()).chain(sold_last.keys()).collect();

    let mut rows: Vec<RestockRow> = names
        .into_iter()
        .map(|name| {
            let sold = sold.get(name).copied().unwrap_or(0);
            let zero_price = free.get(name).copied().unwrap_or(0);
            let last_week_sold = sold_last.get(name).copied().unwrap_or(0);
            let total = sold + zero_price;

            let growth_rate = (f64::from(sold) - f64::from(last_week_sold))
                / f64::from(last_week_sold.max(1))
                * 100.0;

            RestockRow {
                variation_name: name.clone(),
                sold,
                zero_price,
                total,
                last_week_sold,
                zero_price_pct: f64::from(zero_price) / f64::from(total.max(1)) * 100.0,
                growth_rate,
                daily_avg: f64::from(total) / DAYS_PER_WEEK,
                growth_multiplier: 1.0 + growth_rate / 100.0,
                restock_qty: 0,
                future_gifts: round_half_even(
                    f64::from(zero_price) / DAYS_PER_WEEK * f64::from(config.gift_horizon_days),
                ),
                restock_with_gifts: 0,
                current_stock: 0,
                final_restock: 0,
            }
        })
        .collect();

    // Runaway growth is replaced by the average growth across all designs.
    if !rows.is_empty() {
        let mean_growth = rows.iter().map(|r| r.growth_rate).sum::<f64>() / rows.len() as f64;
        for row in &mut rows {
            if row.growth_multiplier > config.growth_cap {
                row.growth_multiplier = 1.0 + mean_growth / 100.0;
            }
        }
    }

    let lead_days = f64::from(config.lead_days());
    for row in &mut rows {
        row.restock_qty = round_half_even(row.daily_avg * lead_days * row.growth_multiplier);
        row.restock_with_gifts = row.restock_qty + row.future_gifts;
        row.current_stock = inventory.map_or(0, |inv| inv.stock_for(&row.variation_name));
        row.final_restock = (row.restock_with_gifts - row.current_stock).max(0);
    }

    rows.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.variation_name.cmp(&b.variation_name))
    });

    let allocations = inventory.map(|_| {
        let size_counts = this_week.size_counts();
        rows.iter()
            .map(|row| {
                let current = size_counts
                    .get(&row.variation_name)
                    .cloned()
                    .unwrap_or_default();
                let (restock_s, restock_m, restock_l, warnings) =
                    allocate_sizes(&current, row.final_restock, config.safety_days);
                SizeAllocation {
                    variation_name: row.variation_name.clone(),
                    final_restock: row.final_restock,
                    future_gifts: row.future_gifts,
                    restock_s,
                    restock_m,
                    restock_l,
                    warnings,
                }
            })
            .collect()
    });

    RestockPlan { rows, allocations }
}

/// Split `final_restock` so the stock after restocking approaches S:M:L =
/// 2:2:1. Returns the units to add per size and the sizes whose target is
/// below `safety_floor`.
pub fn allocate_sizes(
    current: &BTreeMap<Size, u32>,
    final_restock: i64,
    safety_floor: u32,
) -> (i64, i64, i64, Vec<Size>) {
    if final_restock <= 0 {
        return (0, 0, 0, Vec::new());
    }

    let have = |size: Size| i64::from(current.get(&size).copied().unwrap_or(0));
    let (s, m, l) = (have(Size::S), have(Size::M), have(Size::L));

    let future = s + m + l + final_restock;
    let s_target = round_half_even(future as f64 * 2.0 / 5.0);
    let m_target = round_half_even(future as f64 * 2.0 / 5.0);
    let l_target = future - s_target - m_target;

    let floor = i64::from(safety_floor);
    let warnings = [(Size::S, s_target), (Size::M, m_target), (Size::L, l_target)]
        .into_iter()
        .filter(|(_, target)| *target < floor)
        .map(|(size, _)| size)
        .collect();

    (
        (s_target - s).max(0),
        (m_target - m).max(0),
        (l_target - l).max(0),
        warnings,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_to_even() {
        assert_eq!(round_half_even(2.5), 2);
        assert_eq!(round_half_even(3.5), 4);
        assert_eq!(round_half_even(-0.4), 0);
    }

    #[test]
    fn allocation_targets_two_two_one() {
        let mut current = BTreeMap::new();
        current.insert(Size::S, 10);
        current.insert(Size::M, 4);
        current.insert(Size::L, 6);
        // future = 20 + 30 = 50 → targets 20 / 20 / 10
        let (s, m, l, warnings) = allocate_sizes(&current, 30, 12);
        assert_eq!((s, m, l), (10, 16, 4));
        assert_eq!(warnings, vec![Size::L]);
    }

    #[test]
    fn nothing_to_allocate() {
        let (s, m, l, warnings) = allocate_sizes(&BTreeMap::new(), 0, 12);
        assert_eq!((s, m, l), (0, 0, 0));
        assert!(warnings.is_empty());
    }

    #[test]
    fn growth_labels() {
        let mut row = RestockRow {
            variation_name: "X".into(),
            sold: 0,
            zero_price: 0,
            total: 0,
            last_week_sold: 0,
            zero_price_pct: 0.0,
            growth_rate: 25.0,
            daily_avg: 0.0,
            growth_multiplier: 1.0,
            restock_qty: 0,
            future_gifts: 0,
            restock_with_gifts: 0,
            current_stock: 0,
            final_restock: 0,
        };
        assert_eq!(row.growth_label(), "↑ 25.0%");
        row.growth_rate = -12.5;
        assert_eq!(row.growth_label(), "↓ 12.5%");
        row.growth_rate = 0.0;
        assert_eq!(row.growth_label(), "→ 0.0%");
    }
}
