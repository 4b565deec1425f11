use crate::extraction_engine::SkuLine;
use crate::{AccountingMode, ParserConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static PRINTED_TOTAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:item|product)\s*quantity\s*[:：]\s*(\d+)").unwrap());

/// The `Item quantity: N` total printed on the document. When several are
/// printed, the last one (the grand total at the end) wins.
pub(crate) fn printed_total(text: &str) -> Option<u32> {
    PRINTED_TOTAL_RE
        .captures_iter(text)
        .filter_map(|caps| match caps[1].parse::<u32>() {
            Ok(total) => Some(total),
            Err(e) => {
                tracing::warn!(
                    value = &caps[1],
                    error = %e,
                    "printed item quantity out of range"
                );
                None
            }
        })
        .last()
}

/// Units of giveaway placeholder SKUs (`NM001 2`, `NF001-M 1`).
pub(crate) fn mystery_quantity(text: &str, codes: &[String]) -> u32 {
    codes
        .iter()
        .filter_map(|code| {
            Regex::new(&format!(r"\b{}(?:-[SML])?\s+(\d{{1,3}})\b", regex::escape(code))).ok()
        })
        .flat_map(|re| {
            re.captures_iter(text)
                .filter_map(|caps| caps[1].parse::<u32>().ok())
                .collect::<Vec<_>>()
        })
        .sum()
}

// ── Reconciliation ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationStatus {
    Matched,
    /// `delta` is extracted minus expected; negative means rows were missed.
    Mismatch { delta: i64 },
    /// The document carries no recognizable total.
    NoPrintedTotal,
}

/// Comparison of the recovered quantity against the printed total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub mode: AccountingMode,
    /// Total printed on the document, as read.
    pub printed: Option<u32>,
    /// Giveaway units found on the document.
    pub mystery: u32,
    /// Printed total after the mystery offset, when configured.
    pub expected: Option<i64>,
    /// Units recovered by the extractor under `mode`.
    pub extracted: u32,
    pub status: ReconciliationStatus,
}

impl Reconciliation {
    pub fn compute(
        lines: &[SkuLine],
        printed: Option<u32>,
        mystery: u32,
        config: &ParserConfig,
    ) -> Self {
        let extracted: u32 = match config.accounting {
            AccountingMode::RawLines => lines.iter().map(|l| l.quantity).sum(),
            AccountingMode::Expanded => lines.iter().map(SkuLine::expanded_quantity).sum(),
        };

        let offset = if config.subtract_mystery { mystery } else { 0 };
        let expected = printed.map(|p| i64::from(p) - i64::from(offset));

        let status = match expected {
            None => ReconciliationStatus::NoPrintedTotal,
            Some(e) if e == i64::from(extracted) => ReconciliationStatus::Matched,
            Some(e) => ReconciliationStatus::Mismatch {
                delta: i64::from(extracted) - e,
            },
        };

        if let ReconciliationStatus::Mismatch { delta } = status {
            tracing::warn!(printed = ?printed, extracted, delta, "item quantity mismatch");
        }

        Self {
            mode: config.accounting,
            printed,
            mystery,
            expected,
            extracted,
            status,
        }
    }

    pub fn is_match(&self) -> bool {
        self.status == ReconciliationStatus::Matched
    }

    pub fn delta(&self) -> Option<i64> {
        match self.status {
            ReconciliationStatus::Mismatch { delta } => Some(delta),
            ReconciliationStatus::Matched => Some(0),
            ReconciliationStatus::NoPrintedTotal => None,
        }
    }
}

impl fmt::Display for Reconciliation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, self.expected) {
            (ReconciliationStatus::Matched, _) => {
                write!(f, "✅ Item quantity matches: {}", self.extracted)
            }
            (ReconciliationStatus::Mismatch { delta }, Some(expected)) => write!(
                f,
                "⚠️  Item quantity mismatch: expected {expected}, extracted {} (delta {delta:+})",
                self.extracted
            ),
            _ => write!(
                f,
                "ℹ️  No printed item quantity found; extracted {}",
                self.extracted
            ),
        }
    }
}
