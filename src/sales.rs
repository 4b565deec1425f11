//! Weekly marketplace sales exports.

use crate::sku::Size;
use crate::{Result, ToolError};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const VARIATION: &str = "Variation";
const SELLER_SKU: &str = "Seller SKU";
const UNIT_PRICE: &str = "SKU Unit Original Price";

/// One order line of a weekly export.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    /// Cleaned design name, e.g. `Rose Quartz Glitter`.
    pub variation_name: String,
    /// Raw size label after the last comma of `Variation`.
    pub size: Option<String>,
    pub seller_sku: Option<String>,
    /// Original unit price; unparseable values read as `0`.
    pub unit_price: f64,
}

impl SaleRecord {
    /// Zero-priced lines are giveaways.
    pub fn is_free(&self) -> bool {
        self.unit_price == 0.0
    }

    pub fn is_sold(&self) -> bool {
        self.unit_price > 0.0
    }
}

/// Nail shape, encoded as the third character of the seller SKU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Shape {
    Rectangle,
    Almond,
    Pointed,
}

impl Shape {
    pub fn from_seller_sku(sku: &str) -> Option<Self> {
        match sku.chars().nth(2)? {
            'F' => Some(Shape::Rectangle),
            'X' => Some(Shape::Almond),
            'J' => Some(Shape::Pointed),
            _ => None,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Shape::Rectangle => "Rectangle",
            Shape::Almond => "Almond",
            Shape::Pointed => "Pointed",
        })
    }
}

// ── WeeklySales ───────────────────────────────────────────────────────────────

/// All usable lines of one weekly export.
#[derive(Debug, Clone, Default)]
pub struct WeeklySales {
    pub records: Vec<SaleRecord>,
}

impl WeeklySales {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Parse a weekly export. `Variation` and `SKU Unit Original Price` are
    /// required columns; rows without a variation are dropped.
    pub fn from_reader<R: Read>(input: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(strip_bom(input)?);
        let headers = reader.headers()?.clone();

        let variation = column(&headers, VARIATION)?;
        let price = column(&headers, UNIT_PRICE)?;
        let seller_sku = headers.iter().position(|h| h.trim() == SELLER_SKU);

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let Some(raw) = row.get(variation).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            records.push(SaleRecord {
                variation_name: clean_variation_name(raw),
                size: variation_size(raw),
                seller_sku: seller_sku
                    .and_then(|i| row.get(i))
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                unit_price: row.get(price).map(parse_price).unwrap_or(0.0),
            });
        }

        tracing::debug!(rows = records.len(), "weekly sales loaded");
        Ok(Self { records })
    }

    /// Only the lines that carry a seller SKU. Restock counts for the current
    /// week are taken from this view; the distributions use every line.
    pub fn with_seller_sku(&self) -> WeeklySales {
        WeeklySales {
            records: self
                .records
                .iter()
                .filter(|r| r.seller_sku.is_some())
                .cloned()
                .collect(),
        }
    }

    /// Lines sold at a positive price, per variation.
    pub fn sold_counts(&self) -> BTreeMap<String, u32> {
        self.count_by_name(SaleRecord::is_sold)
    }

    /// Giveaway lines, per variation.
    pub fn free_counts(&self) -> BTreeMap<String, u32> {
        self.count_by_name(SaleRecord::is_free)
    }

    fn count_by_name(&self, keep: impl Fn(&SaleRecord) -> bool) -> BTreeMap<String, u32> {
        let mut counts = BTreeMap::new();
        for record in self.records.iter().filter(|r| keep(r)) {
            *counts.entry(record.variation_name.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Lines per variation, most frequent first.
    pub fn variation_frequency(&self) -> Vec<(String, u32)> {
        sorted_desc(self.count_by_name(|_| true))
    }

    /// Share of lines per size label, in percent.
    pub fn size_share(&self) -> Vec<(String, f64)> {
        let mut counts = BTreeMap::new();
        for size in self.records.iter().filter_map(|r| r.size.clone()) {
            *counts.entry(size).or_insert(0u32) += 1;
        }
        percentages(counts)
    }

    /// Share of lines per nail shape, in percent. Lines without a seller SKU
    /// or with an unknown shape letter are left out.
    pub fn shape_share(&self) -> Vec<(Shape, f64)> {
        let mut counts = BTreeMap::new();
        for shape in self
            .records
            .iter()
            .filter_map(|r| r.seller_sku.as_deref().and_then(Shape::from_seller_sku))
        {
            *counts.entry(shape).or_insert(0u32) += 1;
        }
        percentages(counts)
    }

    /// Lines per variation and size (S/M/L only).
    pub fn size_counts(&self) -> BTreeMap<String, BTreeMap<Size, u32>> {
        let mut counts: BTreeMap<String, BTreeMap<Size, u32>> = BTreeMap::new();
        for record in &self.records {
            if let Some(size) = record.size.as_deref().and_then(Size::from_code) {
                *counts
                    .entry(record.variation_name.clone())
                    .or_default()
                    .entry(size)
                    .or_insert(0) += 1;
            }
        }
        counts
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Read the whole input, dropping a leading UTF-8 BOM.
pub(crate) fn strip_bom<R: Read>(mut input: R) -> Result<std::io::Cursor<Vec<u8>>> {
    let mut raw = Vec::new();
    input.read_to_end(&mut raw)?;
    if raw.starts_with(b"\xEF\xBB\xBF") {
        raw.drain(..3);
    }
    Ok(std::io::Cursor::new(raw))
}

pub(crate) fn column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| ToolError::MissingColumn(name.into()))
}

fn parse_price(raw: &str) -> f64 {
    raw.trim()
        .trim_start_matches('$')
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .unwrap_or(0.0)
}

/// Design name from a `Variation` cell such as `Rose  quartz’s Glow, M`.
pub fn clean_variation_name(raw: &str) -> String {
    let replaced = raw.replace('\u{2019}', "'");
    let name = match replaced.rsplit_once(',') {
        Some((name, _)) => name,
        None => replaced.as_str(),
    };
    normalize_name(name)
}

/// Collapse whitespace and title-case a display name.
pub fn normalize_name(raw: &str) -> String {
    let collapsed = raw
        .replace('\u{2019}', "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    title_case(&collapsed)
}

fn variation_size(raw: &str) -> Option<String> {
    raw.rsplit_once(',')
        .map(|(_, size)| size.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Upper-cases every letter that follows a non-letter and lower-cases the
/// rest, so `rose's 2nd` becomes `Rose'S 2Nd`.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut previous_is_letter = false;
    for c in input.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }
    out
}

fn sorted_desc(counts: BTreeMap<String, u32>) -> Vec<(String, u32)> {
    let mut items: Vec<(String, u32)> = counts.into_iter().collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items
}

fn percentages<K: Ord>(counts: BTreeMap<K, u32>) -> Vec<(K, f64)> {
    let total: u32 = counts.values().sum();
    let mut items: Vec<(K, f64)> = counts
        .into_iter()
        .map(|(k, n)| (k, if total == 0 { 0.0 } else { f64::from(n) * 100.0 / f64::from(total) }))
        .collect();
    items.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_variation_names() {
        assert_eq!(clean_variation_name("rose  QUARTZ’s glow , M"), "Rose Quartz'S Glow");
        assert_eq!(clean_variation_name("Peach Sorbet"), "Peach Sorbet");
        assert_eq!(variation_size("Peach Sorbet, L"), Some("L".into()));
        assert_eq!(variation_size("Peach Sorbet"), None);
    }

    #[test]
    fn shapes_from_third_letter() {
        assert_eq!(Shape::from_seller_sku("NPF001-M"), Some(Shape::Rectangle));
        assert_eq!(Shape::from_seller_sku("NPX004-S"), Some(Shape::Almond));
        assert_eq!(Shape::from_seller_sku("NPJ011-L"), Some(Shape::Pointed));
        assert_eq!(Shape::from_seller_sku("NPQ011-L"), None);
        assert_eq!(Shape::from_seller_sku("NP"), None);
    }

    #[test]
    fn prices_coerce_to_zero() {
        assert_eq!(parse_price(" 12.50 "), 12.5);
        assert_eq!(parse_price("$1,299.00"), 1299.0);
        assert_eq!(parse_price("free"), 0.0);
        assert_eq!(parse_price(""), 0.0);
    }

    #[test]
    fn lines_without_seller_sku_are_filtered_out() {
        let csv = "Variation,Seller SKU,SKU Unit Original Price\n\
                   Peach Sorbet, M,NPX015-M,12\n\
                   Milky Way Pearl, S,,0\n";
        let sales = WeeklySales::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(sales.records.len(), 2);

        let with_sku = sales.with_seller_sku();
        assert_eq!(with_sku.records.len(), 1);
        assert!(with_sku.free_counts().is_empty());
        assert_eq!(sales.free_counts().get("Milky Way Pearl"), Some(&1));
    }

    #[test]
    fn missing_price_column_is_an_error() {
        let csv = "Variation,Seller SKU\nPeach Sorbet, M,NPX015-M\n";
        let err = WeeklySales::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ToolError::MissingColumn(c) if c == UNIT_PRICE));
    }
}
