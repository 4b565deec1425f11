//! CSV exports: UTF-8 with a byte-order mark, comma-separated, header row
//! always present (even for an empty table).

use crate::catalog::SummaryRow;
use crate::restock::{RestockRow, SizeAllocation};
use crate::sku::Sku;
use crate::{Result, ToolError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE: &str = "product_summary_named.csv";
pub const MAPPING_FILE: &str = "sku_prefix_mapping.csv";
pub const RESTOCK_FILE: &str = "restock_summary.csv";
pub const SIZE_RESTOCK_FILE: &str = "size_restock_summary.csv";

const BOM: &[u8] = b"\xEF\xBB\xBF";

const SUMMARY_HEADER: [&str; 5] = ["Seller SKU", "SKU Prefix", "Size", "Product Name", "Qty"];
const MAPPING_HEADER: [&str; 2] = ["SKU Prefix", "Product Name"];
const RESTOCK_HEADER: [&str; 13] = [
    "Variation Name",
    "Sold Count",
    "Zero Price Count",
    "Last Week Sold Count",
    "Growth Rate",
    "Daily Avg",
    "Growth Multiplier",
    "Restock Qty",
    "Future Giveaways",
    "Restock Incl Giveaways",
    "Current Stock",
    "Final Restock",
    "Zero Price Percentage",
];
const SIZE_RESTOCK_HEADER: [&str; 7] = [
    "Variation Name",
    "Final Restock",
    "Future Giveaways",
    "Restock S",
    "Restock M",
    "Restock L",
    "Stock Warning",
];

#[derive(Serialize)]
struct SummaryRecord<'a> {
    seller_sku: &'a str,
    prefix: &'a str,
    size: &'a str,
    product_name: &'a str,
    quantity: u32,
}

#[derive(Deserialize)]
struct SummaryInput {
    #[serde(rename = "Seller SKU")]
    seller_sku: String,
    #[serde(rename = "Qty")]
    quantity: u32,
}

#[derive(Serialize)]
struct RestockRecord<'a> {
    name: &'a str,
    sold: u32,
    zero_price: u32,
    last_week_sold: u32,
    growth_rate: String,
    daily_avg: String,
    growth_multiplier: String,
    restock_qty: i64,
    future_gifts: i64,
    restock_with_gifts: i64,
    current_stock: i64,
    final_restock: i64,
    zero_price_pct: String,
}

#[derive(Serialize)]
struct SizeRecord<'a> {
    name: &'a str,
    final_restock: i64,
    future_gifts: i64,
    restock_s: i64,
    restock_m: i64,
    restock_l: i64,
    warning: String,
}

/// A CSV writer that has already emitted the BOM and the header row.
fn bom_writer<W: Write>(mut inner: W, header: &[&str]) -> Result<csv::Writer<W>> {
    inner.write_all(BOM)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(inner);
    writer.write_record(header)?;
    Ok(writer)
}

// ── Picking list ──────────────────────────────────────────────────────────────

/// Write the per-SKU named summary (`product_summary_named.csv`).
pub fn write_summary<W: Write>(out: W, rows: &[SummaryRow]) -> Result<()> {
    let mut writer = bom_writer(out, &SUMMARY_HEADER)?;
    for row in rows {
        writer.serialize(SummaryRecord {
            seller_sku: &row.seller_sku,
            prefix: &row.prefix,
            size: row.size.as_str(),
            product_name: row.product_name.as_deref().unwrap_or_default(),
            quantity: row.quantity,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the prefix → name table (`sku_prefix_mapping.csv`).
pub fn write_mapping<W: Write>(out: W, rows: &[(String, String)]) -> Result<()> {
    let mut writer = bom_writer(out, &MAPPING_HEADER)?;
    for (prefix, name) in rows {
        writer.write_record([prefix.as_str(), name.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write both picking-list exports into `dir`, creating it if needed.
pub fn save_picking_exports<P: AsRef<Path>>(
    dir: P,
    summary: &[SummaryRow],
    mapping: &[(String, String)],
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let summary_path = dir.join(SUMMARY_FILE);
    write_summary(BufWriter::new(File::create(&summary_path)?), summary)?;

    let mapping_path = dir.join(MAPPING_FILE);
    write_mapping(BufWriter::new(File::create(&mapping_path)?), mapping)?;

    Ok(vec![summary_path, mapping_path])
}

/// Read a summary export back into SKU → quantity. Duplicate SKUs add up.
pub fn read_summary<R: Read>(mut input: R) -> Result<BTreeMap<Sku, u32>> {
    let mut raw = Vec::new();
    input.read_to_end(&mut raw)?;
    let body = raw.strip_prefix(BOM).unwrap_or(raw.as_slice());

    let mut reader = csv::Reader::from_reader(body);
    let mut quantities = BTreeMap::new();
    for record in reader.deserialize::<SummaryInput>() {
        let record = record?;
        let sku: Sku = record
            .seller_sku
            .parse()
            .map_err(ToolError::InvalidRecord)?;
        *quantities.entry(sku).or_insert(0) += record.quantity;
    }
    Ok(quantities)
}

/// [`read_summary`] for a file on disk.
pub fn read_summary_path<P: AsRef<Path>>(path: P) -> Result<BTreeMap<Sku, u32>> {
    read_summary(File::open(path)?)
}

// ── Restock ───────────────────────────────────────────────────────────────────

/// Write the per-variation restock table (`restock_summary.csv`).
pub fn write_restock<W: Write>(out: W, rows: &[RestockRow]) -> Result<()> {
    let mut writer = bom_writer(out, &RESTOCK_HEADER)?;
    for row in rows {
        writer.serialize(RestockRecord {
            name: &row.variation_name,
            sold: row.sold,
            zero_price: row.zero_price,
            last_week_sold: row.last_week_sold,
            growth_rate: format!("{:.2}", row.growth_rate),
            daily_avg: format!("{:.2}", row.daily_avg),
            growth_multiplier: format!("{:.3}", row.growth_multiplier),
            restock_qty: row.restock_qty,
            future_gifts: row.future_gifts,
            restock_with_gifts: row.restock_with_gifts,
            current_stock: row.current_stock,
            final_restock: row.final_restock,
            zero_price_pct: format!("{:.2}", row.zero_price_pct),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the per-size allocation table (`size_restock_summary.csv`).
pub fn write_size_restock<W: Write>(out: W, rows: &[SizeAllocation]) -> Result<()> {
    let mut writer = bom_writer(out, &SIZE_RESTOCK_HEADER)?;
    for row in rows {
        writer.serialize(SizeRecord {
            name: &row.variation_name,
            final_restock: row.final_restock,
            future_gifts: row.future_gifts,
            restock_s: row.restock_s,
            restock_m: row.restock_m,
            restock_l: row.restock_l,
            warning: row.warning_label(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sku::Size;

    #[test]
    fn empty_summary_still_has_bom_and_header() {
        let mut buf = Vec::new();
        write_summary(&mut buf, &[]).unwrap();
        assert!(buf.starts_with(BOM));
        let text = String::from_utf8(buf[BOM.len()..].to_vec()).unwrap();
        assert_eq!(text.trim_end(), "Seller SKU,SKU Prefix,Size,Product Name,Qty");
    }

    #[test]
    fn names_with_commas_are_quoted() {
        let rows = vec![SummaryRow {
            seller_sku: "NPJ011-M".into(),
            prefix: "NPJ011".into(),
            size: Size::M,
            product_name: Some("Rose, Quartz".into()),
            quantity: 2,
        }];
        let mut buf = Vec::new();
        write_summary(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("NPJ011-M,NPJ011,M,\"Rose, Quartz\",2"));
    }
}
