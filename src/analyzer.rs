use crate::content_walker::page_words;
use crate::extraction_engine::{ExtractionEngine, SkuLine};
use crate::page::Page;
use crate::reconcile::{mystery_quantity, printed_total, Reconciliation};
use crate::sku::Sku;
use crate::validator::PdfValidator;
use crate::{ParserConfig, Result};
use lopdf::Document;
use std::collections::BTreeMap;
use std::path::Path;

// ── PickingListAnalyzer ───────────────────────────────────────────────────────

/// Entry point for reading a picking list and reconciling its quantities.
///
/// # Creating an analyzer
///
/// ```no_run
/// use nailvesta_ops::{PickingListAnalyzer, ParserConfig, AccountingMode};
///
/// // From a file path
/// let a = PickingListAnalyzer::from_path("picking.pdf").unwrap();
///
/// // From an in-memory buffer
/// let bytes = std::fs::read("picking.pdf").unwrap();
/// let a = PickingListAnalyzer::from_bytes(&bytes).unwrap();
///
/// // With custom configuration
/// let cfg = ParserConfig {
///     accounting: AccountingMode::Expanded,
///     ..Default::default()
/// };
/// let a = PickingListAnalyzer::with_config("picking.pdf", cfg).unwrap();
/// ```
pub struct PickingListAnalyzer {
    pages: Vec<Page>,
    config: ParserConfig,
}

/// Everything recovered from one picking list.
#[derive(Debug, Clone)]
pub struct PickingReport {
    /// Lines in document order, before bundle expansion.
    pub lines: Vec<SkuLine>,
    /// Quantity per single SKU after bundle expansion.
    pub quantities: BTreeMap<Sku, u32>,
    /// Pages on which no line was recognized.
    pub skipped_pages: Vec<u32>,
    pub reconciliation: Reconciliation,
}

impl PickingReport {
    /// Units after bundle expansion.
    pub fn total_units(&self) -> u32 {
        self.quantities.values().sum()
    }
}

impl PickingListAnalyzer {
    // ── Constructors ──────────────────────────────────────────────────────────

    /// Load a picking list PDF from the file system.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_config(path, ParserConfig::default())
    }

    /// Load a picking list PDF from an in-memory byte slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_config(data, ParserConfig::default())
    }

    /// Load a picking list PDF from the file system with a custom
    /// [`ParserConfig`].
    pub fn with_config<P: AsRef<Path>>(path: P, config: ParserConfig) -> Result<Self> {
        let document = Document::load(path)?;
        Self::from_document(&document, config)
    }

    /// Load a picking list PDF from memory with a custom [`ParserConfig`].
    pub fn from_bytes_with_config(data: &[u8], config: ParserConfig) -> Result<Self> {
        let document = Document::load_mem(data)?;
        Self::from_document(&document, config)
    }

    /// Analyze already-extracted text. Pages are separated by form feeds
    /// (`\x0c`), as `pdftotext` writes them.
    pub fn from_text(text: &str, config: ParserConfig) -> Self {
        let pages = text
            .split('\x0c')
            .enumerate()
            .map(|(i, page)| Page::from_text(i as u32 + 1, page))
            .collect();
        Self::from_pages(pages, config)
    }

    /// Analyze pages built by the caller.
    pub fn from_pages(pages: Vec<Page>, config: ParserConfig) -> Self {
        Self { pages, config }
    }

    fn from_document(document: &Document, config: ParserConfig) -> Result<Self> {
        PdfValidator::new(document).validate_structure()?;

        let pages = document
            .get_pages()
            .into_iter()
            .map(|(number, page_id)| match page_words(document, page_id) {
                Ok(words) if !words.is_empty() => Page::from_words(number, words),
                Ok(_) => Self::text_fallback(document, number),
                Err(e) => {
                    tracing::warn!(page = number, error = %e, "cannot walk page content");
                    Self::text_fallback(document, number)
                }
            })
            .collect();

        Ok(Self { pages, config })
    }

    /// lopdf's own text extraction, for pages whose content stream yields no
    /// positioned words.
    fn text_fallback(document: &Document, number: u32) -> Page {
        match document.extract_text(&[number]) {
            Ok(text) => Page::from_text(number, &text),
            Err(e) => {
                tracing::warn!(page = number, error = %e, "no text on page");
                Page::from_words(number, Vec::new())
            }
        }
    }

    // ── Analysis ──────────────────────────────────────────────────────────────

    /// Recover SKU lines from every page, expand bundles and reconcile the
    /// result against the printed item quantity.
    ///
    /// Returns [`crate::ToolError::NoRowsRecognized`] (with a text preview)
    /// when no page yields a single line. A reconciliation mismatch is not an
    /// error; inspect [`PickingReport::reconciliation`].
    pub fn analyze(&self) -> Result<PickingReport> {
        let extraction = ExtractionEngine::new(&self.config).extract_all(&self.pages)?;

        let mut quantities: BTreeMap<Sku, u32> = BTreeMap::new();
        for line in &extraction.lines {
            for sku in &line.skus {
                *quantities.entry(sku.clone()).or_insert(0) += line.quantity;
            }
        }

        let text = self.document_text();
        let reconciliation = Reconciliation::compute(
            &extraction.lines,
            printed_total(&text),
            mystery_quantity(&text, &self.config.mystery_skus),
            &self.config,
        );

        Ok(PickingReport {
            lines: extraction.lines,
            quantities,
            skipped_pages: extraction.skipped_pages,
            reconciliation,
        })
    }

    /// Normalized text of all pages, one page after another.
    pub fn document_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    /// Returns the pages read from the document.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Returns a reference to the active [`ParserConfig`].
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }
}
