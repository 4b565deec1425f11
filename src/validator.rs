use crate::{Result, ToolError};
use lopdf::Document;

// ── PdfValidator ──────────────────────────────────────────────────────────────
//
// This is an internal type.  Callers use PickingListAnalyzer, which delegates
// here before reading any page.

pub(crate) struct PdfValidator<'a> {
    document: &'a Document,
}

impl<'a> PdfValidator<'a> {
    pub(crate) fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Returns `Ok(())` when the parsed document has what page extraction
    /// needs: a catalog, a trailer and at least one page.
    pub(crate) fn validate_structure(&self) -> Result<()> {
        self.document
            .catalog()
            .map_err(|e| ToolError::InvalidPdf(format!("missing or invalid catalog: {e}")))?;

        if self.document.trailer.is_empty() {
            return Err(ToolError::InvalidPdf("missing trailer dictionary".into()));
        }

        if self.document.get_pages().is_empty() {
            return Err(ToolError::InvalidPdf("document has no pages".into()));
        }

        Ok(())
    }
}
