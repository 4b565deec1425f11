use crate::page::Page;
use crate::sku::{expand_bundle, Sku};
use crate::strategies::{default_chain, LineStrategy, StrategyKind};
use crate::{ParserConfig, Result, ToolError};

/// Characters of document text shown when nothing was recognized.
const PREVIEW_CHARS: usize = 600;

/// One recovered picking-list line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuLine {
    /// 1-based page the line was found on.
    pub page: u32,
    /// The seller SKU as printed, possibly a bundle (`NPJ011NPX015-M`).
    pub code: String,
    /// Quantity printed on the line.
    pub quantity: u32,
    /// Products shipped under this line; more than one for bundles.
    pub skus: Vec<Sku>,
    pub strategy: StrategyKind,
}

impl SkuLine {
    /// Units after bundle expansion.
    pub fn expanded_quantity(&self) -> u32 {
        self.quantity * self.skus.len() as u32
    }
}

/// Lines recovered from a document plus the pages that yielded nothing.
#[derive(Debug, Clone, Default)]
pub(crate) struct Extraction {
    pub lines: Vec<SkuLine>,
    pub skipped_pages: Vec<u32>,
}

/// Runs the strategy chain over every page of a document.
pub(crate) struct ExtractionEngine<'a> {
    config: &'a ParserConfig,
    strategies: Vec<Box<dyn LineStrategy>>,
}

impl<'a> ExtractionEngine<'a> {
    pub fn new(config: &'a ParserConfig) -> Self {
        Self {
            config,
            strategies: default_chain(),
        }
    }

    /// Extract lines from all pages.
    ///
    /// Pages where no strategy finds anything are skipped. Returns
    /// [`ToolError::NoRowsRecognized`] when every page is skipped.
    pub fn extract_all(&self, pages: &[Page]) -> Result<Extraction> {
        let mut extraction = Extraction::default();

        for page in pages {
            match self.extract_page(page) {
                Some(lines) => extraction.lines.extend(lines),
                None => {
                    tracing::warn!(page = page.number, "no SKU rows recognized, skipping page");
                    extraction.skipped_pages.push(page.number);
                }
            }
        }

        if extraction.lines.is_empty() {
            return Err(ToolError::NoRowsRecognized {
                preview: text_preview(pages),
            });
        }

        Ok(extraction)
    }

    /// Try each strategy in order and keep the first non-empty result.
    pub fn extract_page(&self, page: &Page) -> Option<Vec<SkuLine>> {
        let band_factor = self.config.effective_band_factor();

        for strategy in &self.strategies {
            let raw = strategy.extract(page, band_factor);
            let lines: Vec<SkuLine> = raw
                .into_iter()
                .filter_map(|line| {
                    let skus = expand_bundle(&line.code)?;
                    Some(SkuLine {
                        page: page.number,
                        code: line.code,
                        quantity: line.quantity,
                        skus,
                        strategy: strategy.kind(),
                    })
                })
                .collect();

            if !lines.is_empty() {
                tracing::debug!(
                    page = page.number,
                    strategy = %strategy.kind(),
                    lines = lines.len(),
                    "page parsed"
                );
                return Some(lines);
            }
            tracing::trace!(page = page.number, strategy = %strategy.kind(), "strategy found nothing");
        }

        None
    }
}

fn text_preview(pages: &[Page]) -> String {
    let text = pages
        .iter()
        .map(|p| p.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        return "(no text could be extracted)".into();
    }

    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        preview.push('…');
    }
    preview
}
