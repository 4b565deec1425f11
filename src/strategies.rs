use crate::page::{rows_of, Page, Word};
use crate::sku::{continues_left, SKU_CODE_RE};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

static LOOSE_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"((?:[A-Z]{3}\d{3}){1,4}-[SML])\s+(\d{1,3})\b").unwrap());

const QUANTITY_HEADERS: &[&str] = &["qty", "quantity", "数量"];

/// Which heuristic recovered a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Anchored on numbers under a `Qty` column header.
    HeaderColumn,
    /// Anchored on order IDs, quantity taken from the same row.
    OrderAnchor,
    /// Whole-page `SKU  qty` regex.
    LooseRegex,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrategyKind::HeaderColumn => "header-column",
            StrategyKind::OrderAnchor => "order-anchor",
            StrategyKind::LooseRegex => "loose-regex",
        })
    }
}

/// A seller SKU code and the quantity printed next to it, before bundle
/// expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawLine {
    pub code: String,
    pub quantity: u32,
}

/// One layout heuristic. Implementations are pure: same page, same lines.
pub(crate) trait LineStrategy {
    fn kind(&self) -> StrategyKind;
    fn extract(&self, page: &Page, band_factor: f32) -> Vec<RawLine>;
}

/// The fallback chain, strictest first.
pub(crate) fn default_chain() -> Vec<Box<dyn LineStrategy>> {
    vec![
        Box::new(HeaderColumn),
        Box::new(OrderAnchor),
        Box::new(LooseRegex),
    ]
}

// ── header-column ─────────────────────────────────────────────────────────────

pub(crate) struct HeaderColumn;

impl LineStrategy for HeaderColumn {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HeaderColumn
    }

    fn extract(&self, page: &Page, band_factor: f32) -> Vec<RawLine> {
        let Some(header) = find_quantity_header(page) else {
            return Vec::new();
        };
        let lh = page.line_height();
        let h = &page.words[header];
        let (col_left, col_right) = (h.x0 - lh, h.x1 + lh);
        let sku_left = find_sku_header(page, header).map(|i| cell_left(page, i) - lh / 2.0);

        let mut anchors: Vec<(usize, u32)> = page
            .words
            .iter()
            .enumerate()
            .filter(|(i, w)| {
                *i != header
                    && w.top >= h.bottom - lh / 4.0
                    && (col_left..=col_right).contains(&w.center_x())
            })
            .filter_map(|(i, w)| w.as_quantity().map(|q| (i, q)))
            .collect();
        anchors.sort_by(|a, b| page.words[a.0].top.total_cmp(&page.words[b.0].top));

        let mut search = BandSearch::new(page, band_factor);
        search.min_top = Some(h.bottom - lh / 4.0);
        search.min_x = sku_left;
        for &(i, _) in &anchors {
            search.consumed.insert(i);
        }

        anchors
            .into_iter()
            .filter_map(|(i, quantity)| {
                search
                    .code_left_of(i)
                    .map(|code| RawLine { code, quantity })
            })
            .collect()
    }
}

fn header_key(word: &Word) -> String {
    word.text
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Topmost word that reads as a quantity column header. Printed totals such
/// as `Item quantity: 12` are not headers.
fn find_quantity_header(page: &Page) -> Option<usize> {
    let lh = page.line_height();
    page.words
        .iter()
        .enumerate()
        .filter(|(_, w)| QUANTITY_HEADERS.contains(&header_key(w).as_str()) && !w.text.contains(':'))
        .filter(|(i, w)| {
            let previous = left_neighbour(page, *i, lh).map(|p| header_key(&page.words[p]));
            let next = right_neighbour(page, *i, lh).map(|n| page.words[n].text.as_str());
            !matches!(previous.as_deref(), Some("item" | "product"))
                && !matches!(next, Some(t) if t.starts_with(':'))
                && w.height() > 0.0
        })
        .min_by(|a, b| a.1.top.total_cmp(&b.1.top))
        .map(|(i, _)| i)
}

fn find_sku_header(page: &Page, quantity_header: usize) -> Option<usize> {
    let lh = page.line_height();
    let q = &page.words[quantity_header];
    page.words
        .iter()
        .enumerate()
        .filter(|(_, w)| {
            header_key(w) == "sku" && w.x1 <= q.x0 && (w.center_y() - q.center_y()).abs() <= lh
        })
        .max_by(|a, b| a.1.x0.total_cmp(&b.1.x0))
        .map(|(i, _)| i)
}

/// Left edge of a header cell, e.g. `Seller` for `Seller SKU`.
fn cell_left(page: &Page, index: usize) -> f32 {
    let lh = page.line_height();
    match left_neighbour(page, index, lh) {
        Some(p) if page.words[index].x0 - page.words[p].x1 <= lh => page.words[p].x0,
        _ => page.words[index].x0,
    }
}

fn same_row(a: &Word, b: &Word, lh: f32) -> bool {
    (a.center_y() - b.center_y()).abs() <= lh / 2.0
}

fn left_neighbour(page: &Page, index: usize, lh: f32) -> Option<usize> {
    let w = &page.words[index];
    page.words
        .iter()
        .enumerate()
        .filter(|(i, o)| *i != index && same_row(w, o, lh) && o.x1 <= w.x0 + 0.5)
        .max_by(|a, b| a.1.x1.total_cmp(&b.1.x1))
        .map(|(i, _)| i)
}

fn right_neighbour(page: &Page, index: usize, lh: f32) -> Option<usize> {
    let w = &page.words[index];
    page.words
        .iter()
        .enumerate()
        .filter(|(i, o)| *i != index && same_row(w, o, lh) && o.x0 >= w.x1 - 0.5)
        .min_by(|a, b| a.1.x0.total_cmp(&b.1.x0))
        .map(|(i, _)| i)
}

// ── order-anchor ──────────────────────────────────────────────────────────────

pub(crate) struct OrderAnchor;

impl LineStrategy for OrderAnchor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::OrderAnchor
    }

    fn extract(&self, page: &Page, band_factor: f32) -> Vec<RawLine> {
        let lh = page.line_height();
        let mut order_ids: Vec<usize> = (0..page.words.len())
            .filter(|&i| page.words[i].is_order_id())
            .collect();
        order_ids.sort_by(|&a, &b| page.words[a].top.total_cmp(&page.words[b].top));

        let mut search = BandSearch::new(page, band_factor);
        search.consumed.extend(order_ids.iter().copied());

        let mut lines = Vec::new();
        for anchor in order_ids {
            let a = &page.words[anchor];
            let quantity = page
                .words
                .iter()
                .enumerate()
                .filter(|(i, w)| {
                    !search.consumed.contains(i) && same_row(a, w, lh) && w.x1 <= a.x0 + 0.5
                })
                .filter_map(|(i, w)| w.as_quantity().map(|q| (i, q)))
                .max_by(|x, y| page.words[x.0].x1.total_cmp(&page.words[y.0].x1));

            let Some((qi, qty)) = quantity else {
                continue;
            };
            search.consumed.insert(qi);
            if let Some(code) = search.code_left_of(qi) {
                lines.push(RawLine {
                    code,
                    quantity: qty,
                });
            }
        }
        lines
    }
}

// ── loose-regex ───────────────────────────────────────────────────────────────

pub(crate) struct LooseRegex;

impl LineStrategy for LooseRegex {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LooseRegex
    }

    fn extract(&self, page: &Page, _band_factor: f32) -> Vec<RawLine> {
        LOOSE_LINE_RE
            .captures_iter(&page.text)
            .filter(|caps| {
                caps.get(1)
                    .map_or(false, |m| !continues_left(&page.text, m.start()))
            })
            .filter_map(|caps| {
                let quantity: u32 = caps[2].parse().ok().filter(|q| *q > 0)?;
                Some(RawLine {
                    code: caps[1].to_string(),
                    quantity,
                })
            })
            .collect()
    }
}

// ── Band search ───────────────────────────────────────────────────────────────

/// Finds the SKU code belonging to a quantity token by reading the words to
/// its left inside a vertical band. Words credited to one anchor are not
/// offered to later anchors.
struct BandSearch<'a> {
    page: &'a Page,
    line_height: f32,
    half_band: f32,
    min_top: Option<f32>,
    min_x: Option<f32>,
    consumed: HashSet<usize>,
}

impl<'a> BandSearch<'a> {
    fn new(page: &'a Page, band_factor: f32) -> Self {
        let line_height = page.line_height();
        Self {
            page,
            line_height,
            half_band: band_factor * line_height / 2.0,
            min_top: None,
            min_x: None,
            consumed: HashSet::new(),
        }
    }

    fn code_left_of(&mut self, quantity_index: usize) -> Option<String> {
        let page = self.page;
        let words = &page.words;
        let q = &words[quantity_index];
        let anchor_y = q.center_y();

        let candidates: Vec<usize> = (0..words.len())
            .filter(|i| !self.consumed.contains(i))
            .filter(|&i| {
                let w = &words[i];
                w.x1 <= q.x0 + self.line_height / 4.0
                    && (w.center_y() - anchor_y).abs() <= self.half_band
                    && self.min_top.map_or(true, |t| w.top >= t)
                    && self.min_x.map_or(true, |x| w.x0 >= x)
            })
            .collect();
        if candidates.is_empty() {
            return None;
        }

        // Row-major concatenation, remembering which word every byte came from.
        let mut joined = String::new();
        let mut spans: Vec<(usize, usize, usize)> = Vec::new();
        for row in rows_of(words, candidates, self.line_height) {
            for i in row {
                let start = joined.len();
                joined.push_str(&words[i].text);
                spans.push((start, joined.len(), i));
            }
        }

        // A word boundary in `joined` is a real boundary; anything else glued
        // to the left means the match is the tail of a longer code.
        let best = SKU_CODE_RE
            .find_iter(&joined)
            .filter(|m| {
                spans.iter().any(|(s, _, _)| *s == m.start())
                    || !continues_left(&joined, m.start())
            })
            .map(|m| {
                let covered: Vec<usize> = spans
                    .iter()
                    .filter(|(s, e, _)| *s < m.end() && *e > m.start())
                    .map(|(_, _, i)| *i)
                    .collect();
                let distance = covered
                    .iter()
                    .map(|&i| (words[i].center_y() - anchor_y).abs())
                    .fold(f32::INFINITY, f32::min);
                (m.as_str().to_string(), covered, distance)
            })
            .min_by(|a, b| a.2.total_cmp(&b.2))?;

        let (code, covered, _) = best;
        self.consumed.extend(covered);
        Some(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(text: &str, x0: f32, top: f32) -> Word {
        Word::new(text, x0, x0 + text.len() as f32 * 5.0, top, top + 10.0)
    }

    fn table_page() -> Page {
        Page::from_words(
            1,
            vec![
                w("Product", 10.0, 50.0),
                w("Seller", 150.0, 50.0),
                w("SKU", 185.0, 50.0),
                w("Qty", 300.0, 50.0),
                w("Order", 350.0, 50.0),
                w("Glitter", 10.0, 80.0),
                w("NPJ011-M", 150.0, 80.0),
                w("2", 305.0, 80.0),
                w("576000000001", 350.0, 80.0),
                // wrapped bundle: body on one line, size on the next
                w("Bundle", 10.0, 110.0),
                w("NPJ011NPX015", 150.0, 105.0),
                w("-L", 150.0, 117.0),
                w("1", 305.0, 111.0),
                w("576000000002", 350.0, 111.0),
                w("Item", 10.0, 160.0),
                w("quantity:", 40.0, 160.0),
                w("3", 95.0, 160.0),
            ],
        )
    }

    #[test]
    fn header_column_reads_rows_and_wrapped_bundle() {
        let lines = HeaderColumn.extract(&table_page(), 1.8);
        assert_eq!(
            lines,
            vec![
                RawLine {
                    code: "NPJ011-M".into(),
                    quantity: 2
                },
                RawLine {
                    code: "NPJ011NPX015-L".into(),
                    quantity: 1
                },
            ]
        );
    }

    #[test]
    fn printed_total_is_not_a_header() {
        let page = Page::from_text(1, "NPJ011-M 2 576000000001\nItem quantity: 2");
        assert!(find_quantity_header(&page).is_none());
    }

    #[test]
    fn order_anchor_without_header() {
        let page = Page::from_text(
            1,
            "NPJ011-M 2 576000000001\nNPX015-S 1 576000000002\nNPF001NPF002-L 3 576000000003",
        );
        let lines = OrderAnchor.extract(&page, 1.8);
        let codes: Vec<(&str, u32)> = lines.iter().map(|l| (l.code.as_str(), l.quantity)).collect();
        assert_eq!(codes, [("NPJ011-M", 2), ("NPX015-S", 1), ("NPF001NPF002-L", 3)]);
    }

    #[test]
    fn loose_regex_skips_long_numbers() {
        let page = Page::from_text(1, "NPJ011-M 123456789012\nNPX015-S 4");
        let lines = LooseRegex.extract(&page, 1.8);
        assert_eq!(
            lines,
            vec![RawLine {
                code: "NPX015-S".into(),
                quantity: 4
            }]
        );
    }

    #[test]
    fn codes_longer_than_four_prefixes_are_not_truncated() {
        let page = Page::from_text(
            1,
            "AAA001BBB002CCC003DDD004EEE005-M 2 576000000001\nNPJ011-M 1 576000000002",
        );
        let expected = vec![RawLine {
            code: "NPJ011-M".into(),
            quantity: 1,
        }];
        assert_eq!(LooseRegex.extract(&page, 1.8), expected);
        assert_eq!(OrderAnchor.extract(&page, 1.8), expected);
    }
}
