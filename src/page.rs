use crate::normalize::{normalize_text, normalize_token};

/// Line height assumed for pages with no measurable words.
const DEFAULT_LINE_HEIGHT: f32 = 10.0;

// ── Word ──────────────────────────────────────────────────────────────────────

/// A positioned word in page space. The origin is the top-left corner of the
/// page and `top < bottom`.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Word {
    pub fn new(text: impl Into<String>, x0: f32, x1: f32, top: f32, bottom: f32) -> Self {
        Self {
            text: text.into(),
            x0,
            x1,
            top,
            bottom,
        }
    }

    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// `Some(n)` when the word is a 1–3 digit positive number.
    pub(crate) fn as_quantity(&self) -> Option<u32> {
        let t = self.text.as_str();
        if (1..=3).contains(&t.len()) && t.bytes().all(|b| b.is_ascii_digit()) {
            t.parse().ok().filter(|n| *n > 0)
        } else {
            None
        }
    }

    /// Order IDs are long numerals; they only serve as row anchors.
    pub(crate) fn is_order_id(&self) -> bool {
        self.text.len() >= 9 && self.text.bytes().all(|b| b.is_ascii_digit())
    }
}

// ── Page ──────────────────────────────────────────────────────────────────────

/// One page worth of normalized words plus its flat text.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    pub words: Vec<Word>,
    /// Normalized page text, one visual row per line.
    pub text: String,
}

impl Page {
    /// Build a page from raw words. Word text is normalized and empty words
    /// are dropped; the flat text is rebuilt from the resulting rows.
    pub fn from_words(number: u32, words: Vec<Word>) -> Self {
        let words: Vec<Word> = words
            .into_iter()
            .filter_map(|mut w| {
                w.text = normalize_token(&w.text);
                (!w.text.is_empty()).then_some(w)
            })
            .collect();

        let mut page = Self {
            number,
            words,
            text: String::new(),
        };
        page.text = page.rows_text();
        page
    }

    /// Build a page from plain text with a synthetic monospace layout: each
    /// line is one row, each character one fixed-width cell.
    pub fn from_text(number: u32, text: &str) -> Self {
        const CELL: f32 = 6.0;
        const LINE: f32 = 12.0;

        let mut words = Vec::new();
        for (row, line) in normalize_text(text).lines().enumerate() {
            let top = row as f32 * LINE * 1.5;
            let mut column = 0usize;
            for (i, piece) in line.split(' ').enumerate() {
                if i > 0 {
                    column += 1;
                }
                let len = piece.chars().count();
                if len > 0 {
                    let x0 = column as f32 * CELL;
                    words.push(Word::new(piece, x0, x0 + len as f32 * CELL, top, top + LINE));
                }
                column += len;
            }
        }
        Self::from_words(number, words)
    }

    /// Mean word height, or a default for empty pages.
    pub fn line_height(&self) -> f32 {
        let heights: Vec<f32> = self
            .words
            .iter()
            .map(Word::height)
            .filter(|h| *h > 0.0)
            .collect();
        if heights.is_empty() {
            DEFAULT_LINE_HEIGHT
        } else {
            heights.iter().sum::<f32>() / heights.len() as f32
        }
    }

    /// Group word indices into visual rows, top to bottom, each row sorted
    /// left to right. Words whose tops lie within half a line height of the
    /// row's first word share that row.
    pub fn rows(&self) -> Vec<Vec<usize>> {
        rows_of(&self.words, (0..self.words.len()).collect(), self.line_height())
    }

    fn rows_text(&self) -> String {
        self.rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&i| self.words[i].text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Row clustering shared by page text rendering and band searches.
pub(crate) fn rows_of(words: &[Word], mut indices: Vec<usize>, line_height: f32) -> Vec<Vec<usize>> {
    indices.sort_by(|&a, &b| {
        words[a]
            .top
            .total_cmp(&words[b].top)
            .then(words[a].x0.total_cmp(&words[b].x0))
    });

    let tolerance = line_height / 2.0;
    let mut rows: Vec<Vec<usize>> = Vec::new();
    let mut row_top = f32::NEG_INFINITY;

    for i in indices {
        match rows.last_mut() {
            Some(row) if words[i].top - row_top <= tolerance => row.push(i),
            _ => {
                row_top = words[i].top;
                rows.push(vec![i]);
            }
        }
    }

    for row in &mut rows {
        row.sort_by(|&a, &b| words[a].x0.total_cmp(&words[b].x0));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_lays_out_rows() {
        let page = Page::from_text(1, "NPJ011-M   3\nNPX015-S 2");
        assert_eq!(page.words.len(), 4);
        assert_eq!(page.rows().len(), 2);
        assert_eq!(page.text, "NPJ011-M 3\nNPX015-S 2");
        assert!(page.words[1].x0 > page.words[0].x1);
    }

    #[test]
    fn rows_tolerate_small_baseline_jitter() {
        let words = vec![
            Word::new("b", 50.0, 60.0, 101.0, 111.0),
            Word::new("a", 10.0, 20.0, 100.0, 110.0),
            Word::new("c", 10.0, 20.0, 130.0, 140.0),
        ];
        let page = Page::from_words(1, words);
        assert_eq!(page.text, "a b\nc");
    }

    #[test]
    fn quantity_and_order_id_detection() {
        let q = Word::new("12", 0.0, 1.0, 0.0, 1.0);
        assert_eq!(q.as_quantity(), Some(12));
        assert_eq!(Word::new("0", 0.0, 1.0, 0.0, 1.0).as_quantity(), None);
        assert_eq!(Word::new("1234", 0.0, 1.0, 0.0, 1.0).as_quantity(), None);
        assert!(Word::new("576123456789", 0.0, 1.0, 0.0, 1.0).is_order_id());
        assert!(!Word::new("12345678", 0.0, 1.0, 0.0, 1.0).is_order_id());
    }
}
