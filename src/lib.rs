//! # nailvesta-ops
//!
//! Picking-list reconciliation and weekly restock analysis for a small
//! nail-art marketplace shop.
//!
//! ## What this crate does
//!
//! 1. **Read picking lists**: walks every page of a vendor-exported PDF and
//!    recovers positioned words (bounding box + text).
//! 2. **Recover SKU lines**: finds `(seller SKU, quantity)` pairs with an
//!    ordered chain of layout heuristics, expanding bundle codes such as
//!    `NPJ011NPX015-M` into one entry per product.
//! 3. **Reconcile**: compares the recovered quantity with the
//!    `Item quantity: N` total printed on the document.
//! 4. **Export**: writes the named summary and the prefix mapping as
//!    UTF-8 (BOM) CSV files.
//! 5. **Plan restocks**: turns two weekly sales exports and an optional
//!    inventory sheet into per-variation and per-size restock suggestions.
//!
//! ## Quick example
//!
//! ```no_run
//! use nailvesta_ops::{AppConfig, PickingListAnalyzer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::builtin()?;
//! let analyzer = PickingListAnalyzer::with_config("picking.pdf", config.parser.clone())?;
//!
//! let report = analyzer.analyze()?;
//! for (sku, qty) in &report.quantities {
//!     println!("{sku}  x{qty}");
//! }
//! println!("{}", report.reconciliation);
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

mod analyzer;
mod catalog;
mod config;
mod content_walker;
mod extraction_engine;
mod normalize;
mod page;
mod reconcile;
mod sku;
mod strategies;
mod validator;

pub mod export;
pub mod restock;
pub mod sales;

pub use analyzer::{PickingListAnalyzer, PickingReport};
pub use catalog::{ProductCatalog, SummaryRow};
pub use config::{AccountingMode, AppConfig, ParserConfig, RestockConfig, CONFIG_VERSION};
pub use extraction_engine::SkuLine;
pub use normalize::normalize_text;
pub use page::{Page, Word};
pub use reconcile::{Reconciliation, ReconciliationStatus};
pub use sku::{expand_bundle, Size, Sku};
pub use strategies::StrategyKind;

// ── Error type ───────────────────────────────────────────────────────────────

/// Every error that this crate can produce.
#[derive(Error, Debug)]
pub enum ToolError {
    /// A filesystem I/O error occurred (e.g. when loading or saving a file).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The input bytes do not form a usable PDF document.
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// The underlying lopdf parser returned an error.
    #[error("PDF parse error: {0}")]
    ParseError(#[from] lopdf::Error),

    /// No page of the document produced a single SKU line.
    ///
    /// `preview` holds the beginning of the normalized document text so the
    /// operator can see what the extractor was looking at.
    #[error("No SKU rows recognized in the document. Text preview:\n{preview}")]
    NoRowsRecognized { preview: String },

    /// Reading or writing a CSV file failed.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// A CSV row holds a value the analysis cannot interpret.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A CSV input lacks a column the analysis depends on.
    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    /// The configuration file could not be parsed.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration parsed but describes something unsupported.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A manual product-name override was not of the form `PREFIX=Name`.
    #[error("Invalid product name override '{0}' (expected PREFIX=Name)")]
    InvalidOverride(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ToolError>;
