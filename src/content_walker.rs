use crate::page::Word;
use crate::Result;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;

/// Used when neither the page nor its ancestors declare a `/MediaBox` (A4).
const DEFAULT_PAGE_HEIGHT: f32 = 842.0;

/// Average glyph advance as a fraction of the font size. Without font
/// metrics this is an estimate, good enough to order and cluster words.
const GLYPH_WIDTH: f32 = 0.5;

/// Walks a page's content stream and returns its words in page space.
///
/// Handles the text-positioning operators (`Tm`, `Td`, `TD`, `T*`, `TL`),
/// the text-showing operators (`Tj`, `TJ`, `'`, `"`), the text state
/// operators that move the pen (`Tc`, `Tw`, `Tz`, `Tf`), and `cm`/`q`/`Q`.
/// Strings are decoded through the font encodings declared in the page's
/// (possibly inherited) `/Resources`.
pub(crate) fn page_words(document: &Document, page_id: ObjectId) -> Result<Vec<Word>> {
    let page_height = page_height(document, page_id);
    let fonts = page_fonts(document, page_id);

    let encodings: BTreeMap<Vec<u8>, _> = fonts
        .iter()
        .filter_map(|(name, font)| {
            font.get_font_encoding(document)
                .ok()
                .map(|encoding| (name.clone(), encoding))
        })
        .collect();

    let decode = |font: Option<&[u8]>, bytes: &[u8]| -> String {
        font.and_then(|name| encodings.get(name))
            .and_then(|encoding| Document::decode_text(encoding, bytes).ok())
            .unwrap_or_else(|| fallback_decode(bytes))
    };

    let data = document.get_page_content(page_id)?;
    let content = Content::decode(&data)?;

    let mut walker = TextWalker::new(&decode);
    for operation in &content.operations {
        walker.apply(&operation.operator, &operation.operands);
    }

    Ok(runs_to_words(merge_runs(walker.runs), page_height))
}

// ── Matrices ──────────────────────────────────────────────────────────────────

/// Affine matrix `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn translate(tx: f32, ty: f32) -> Self {
        Matrix {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// `self × other`: apply `self` first, then `other`.
    fn multiply(self, other: Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        if operands.len() != 6 {
            return None;
        }
        Some(Matrix {
            a: num(&operands[0]),
            b: num(&operands[1]),
            c: num(&operands[2]),
            d: num(&operands[3]),
            e: num(&operands[4]),
            f: num(&operands[5]),
        })
    }
}

fn num(object: &Object) -> f32 {
    object.as_float().unwrap_or(0.0)
}

// ── Text walker ───────────────────────────────────────────────────────────────

/// A string shown at one pen position, in device space (y grows upwards).
#[derive(Debug, Clone)]
struct Run {
    text: String,
    x0: f32,
    x1: f32,
    baseline: f32,
    size: f32,
}

#[derive(Debug, Clone)]
struct TextState {
    font: Option<Vec<u8>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scaling: f32,
    leading: f32,
    text_matrix: Matrix,
    line_matrix: Matrix,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            font_size: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 100.0,
            leading: 0.0,
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
        }
    }
}

struct TextWalker<'a> {
    decode: &'a dyn Fn(Option<&[u8]>, &[u8]) -> String,
    ctm: Matrix,
    /// `q` snapshots; text and line matrices are not part of them.
    saved: Vec<(Matrix, TextState)>,
    state: TextState,
    runs: Vec<Run>,
}

impl<'a> TextWalker<'a> {
    fn new(decode: &'a dyn Fn(Option<&[u8]>, &[u8]) -> String) -> Self {
        Self {
            decode,
            ctm: Matrix::IDENTITY,
            saved: Vec::new(),
            state: TextState::default(),
            runs: Vec::new(),
        }
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        match operator {
            "q" => self.saved.push((self.ctm, self.state.clone())),
            "Q" => {
                if let Some((ctm, state)) = self.saved.pop() {
                    self.ctm = ctm;
                    self.state = TextState {
                        text_matrix: self.state.text_matrix,
                        line_matrix: self.state.line_matrix,
                        ..state
                    };
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.ctm = m.multiply(self.ctm);
                }
            }
            "BT" => {
                self.state.text_matrix = Matrix::IDENTITY;
                self.state.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                if operands.len() >= 2 {
                    self.state.font = operands[0].as_name().ok().map(<[u8]>::to_vec);
                    self.state.font_size = num(&operands[1]);
                }
            }
            "Tc" => {
                if let Some(v) = operands.first() {
                    self.state.char_spacing = num(v);
                }
            }
            "Tw" => {
                if let Some(v) = operands.first() {
                    self.state.word_spacing = num(v);
                }
            }
            "Tz" => {
                if let Some(v) = operands.first() {
                    self.state.horizontal_scaling = num(v);
                }
            }
            "TL" => {
                if let Some(v) = operands.first() {
                    self.state.leading = num(v);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.state.text_matrix = m;
                    self.state.line_matrix = m;
                }
            }
            "Td" => {
                if operands.len() == 2 {
                    self.move_line(num(&operands[0]), num(&operands[1]));
                }
            }
            "TD" => {
                if operands.len() == 2 {
                    let ty = num(&operands[1]);
                    self.state.leading = -ty;
                    self.move_line(num(&operands[0]), ty);
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                if operands.len() >= 3 {
                    self.state.word_spacing = num(&operands[0]);
                    self.state.char_spacing = num(&operands[1]);
                    self.next_line();
                    if let Object::String(bytes, _) = &operands[2] {
                        self.show(bytes);
                    }
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show(bytes),
                            Object::Integer(_) | Object::Real(_) => {
                                let adjust = num(item) / 1000.0
                                    * self.state.font_size
                                    * (self.state.horizontal_scaling / 100.0);
                                self.advance(-adjust);
                            }
                            _ => {}
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.state.line_matrix = Matrix::translate(tx, ty).multiply(self.state.line_matrix);
        self.state.text_matrix = self.state.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.move_line(0.0, -leading);
    }

    fn advance(&mut self, tx: f32) {
        self.state.text_matrix = Matrix::translate(tx, 0.0).multiply(self.state.text_matrix);
    }

    fn show(&mut self, bytes: &[u8]) {
        let text = (self.decode)(self.state.font.as_deref(), bytes);
        if text.is_empty() {
            return;
        }

        let state = &self.state;
        let scale = state.horizontal_scaling / 100.0;
        let width: f32 = text
            .chars()
            .map(|c| {
                let spacing = if c == ' ' { state.word_spacing } else { 0.0 };
                (GLYPH_WIDTH * state.font_size + state.char_spacing + spacing) * scale
            })
            .sum();

        let trm = state.text_matrix.multiply(self.ctm);
        let size = state.font_size * (trm.c * trm.c + trm.d * trm.d).sqrt();
        let x0 = trm.e;
        let x1 = width * trm.a + trm.e;

        self.runs.push(Run {
            text,
            x0: x0.min(x1),
            x1: x0.max(x1),
            baseline: trm.f,
            size: if size > 0.0 { size } else { state.font_size.abs() },
        });
        self.advance(width);
    }
}

// ── Runs → words ─────────────────────────────────────────────────────────────

/// Join runs that continue each other on the same baseline, e.g. a `TJ`
/// array that kerns `NPJ0` and `11-M` apart by a few thousandths.
fn merge_runs(runs: Vec<Run>) -> Vec<Run> {
    let mut merged: Vec<Run> = Vec::with_capacity(runs.len());
    for run in runs {
        if let Some(last) = merged.last_mut() {
            let same_line = (last.baseline - run.baseline).abs() < 0.2 * last.size;
            let gap = run.x0 - last.x1;
            if same_line && gap > -0.5 * last.size && gap < 0.25 * last.size {
                last.text.push_str(&run.text);
                last.x1 = last.x1.max(run.x1);
                continue;
            }
        }
        merged.push(run);
    }
    merged
}

/// Split runs on whitespace into words, flipping y so the origin is the
/// top-left corner of the page.
fn runs_to_words(runs: Vec<Run>, page_height: f32) -> Vec<Word> {
    let mut words = Vec::new();
    for run in runs {
        let chars: Vec<char> = run.text.chars().collect();
        if chars.is_empty() {
            continue;
        }
        let advance = (run.x1 - run.x0) / chars.len() as f32;
        let top = page_height - run.baseline - 0.8 * run.size;
        let bottom = page_height - run.baseline + 0.2 * run.size;

        let mut start: Option<usize> = None;
        for (i, c) in chars.iter().chain(std::iter::once(&' ')).enumerate() {
            match (c.is_whitespace(), start) {
                (false, None) => start = Some(i),
                (true, Some(s)) => {
                    let text: String = chars[s..i].iter().collect();
                    let x0 = run.x0 + s as f32 * advance;
                    let x1 = run.x0 + i as f32 * advance;
                    words.push(Word::new(text, x0, x1, top, bottom));
                    start = None;
                }
                _ => {}
            }
        }
    }
    words
}

// ── Resources ─────────────────────────────────────────────────────────────────

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object.as_reference() {
        Ok(id) => document.get_object(id).ok(),
        Err(_) => Some(object),
    }
}

fn resolve_dict<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    resolve(document, object).and_then(|o| o.as_dict().ok())
}

/// The page dictionary followed by its `/Parent` chain, nearest first.
fn page_tree_chain(document: &Document, page_id: ObjectId) -> Vec<&Dictionary> {
    let mut chain = Vec::new();
    let mut current = document.get_dictionary(page_id).ok();
    while let Some(dict) = current {
        chain.push(dict);
        if chain.len() > 64 {
            break;
        }
        current = dict
            .get(b"Parent")
            .ok()
            .and_then(|parent| resolve_dict(document, parent));
    }
    chain
}

/// Font dictionaries by resource name; a page's own entries shadow those
/// inherited from the page tree.
fn page_fonts(document: &Document, page_id: ObjectId) -> BTreeMap<Vec<u8>, &Dictionary> {
    let mut fonts = BTreeMap::new();
    for node in page_tree_chain(document, page_id) {
        let font_dict = node
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve_dict(document, r))
            .and_then(|resources| resources.get(b"Font").ok())
            .and_then(|f| resolve_dict(document, f));

        if let Some(font_dict) = font_dict {
            for (name, value) in font_dict.iter() {
                if let Some(font) = resolve_dict(document, value) {
                    fonts.entry(name.clone()).or_insert(font);
                }
            }
        }
    }
    fonts
}

fn page_height(document: &Document, page_id: ObjectId) -> f32 {
    page_tree_chain(document, page_id)
        .into_iter()
        .find_map(|node| {
            let mediabox = node.get(b"MediaBox").ok()?;
            let values = resolve(document, mediabox)?.as_array().ok()?;
            (values.len() == 4).then(|| (num(&values[3]) - num(&values[1])).abs())
        })
        .filter(|h| *h > 0.0)
        .unwrap_or(DEFAULT_PAGE_HEIGHT)
}

/// Decoding for strings whose font has no usable encoding.
fn fallback_decode(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, x0: f32, x1: f32) -> Run {
        Run {
            text: text.into(),
            x0,
            x1,
            baseline: 700.0,
            size: 10.0,
        }
    }

    #[test]
    fn translate_then_scale() {
        let m = Matrix::translate(10.0, 20.0).multiply(Matrix {
            a: 2.0,
            d: 2.0,
            ..Matrix::IDENTITY
        });
        assert_eq!((m.e, m.f), (20.0, 40.0));
    }

    #[test]
    fn kerned_runs_merge() {
        let merged = merge_runs(vec![run("NPJ0", 100.0, 120.0), run("11-M", 121.0, 141.0)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "NPJ011-M");
    }

    #[test]
    fn distant_runs_stay_apart() {
        let merged = merge_runs(vec![run("NPJ011-M", 100.0, 140.0), run("3", 200.0, 205.0)]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn words_split_on_spaces_with_flipped_y() {
        let words = runs_to_words(vec![run("ab  cd", 0.0, 60.0)], 842.0);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "ab");
        assert_eq!(words[1].x0, 40.0);
        assert!((words[0].bottom - 144.0).abs() < 1e-3);
    }

    #[test]
    fn restore_brings_back_font_size() {
        let decode = |_: Option<&[u8]>, bytes: &[u8]| fallback_decode(bytes);
        let mut walker = TextWalker::new(&decode);
        let font = |size: i64| vec![Object::Name(b"F1".to_vec()), Object::Integer(size)];

        walker.apply("Tf", &font(10));
        walker.apply("q", &[]);
        walker.apply("Tf", &font(20));
        walker.apply("Tc", &[Object::Integer(3)]);
        walker.apply("Q", &[]);
        walker.apply("BT", &[]);
        walker.apply("Td", &[Object::Integer(100), Object::Integer(700)]);
        walker.apply("Tj", &[Object::string_literal("AB")]);

        assert_eq!(walker.runs.len(), 1);
        assert_eq!(walker.runs[0].size, 10.0);
        assert_eq!(walker.runs[0].x1 - walker.runs[0].x0, 10.0);
    }

    #[test]
    fn utf16_fallback() {
        assert_eq!(fallback_decode(&[0xFE, 0xFF, 0x00, 0x41]), "A");
        assert_eq!(fallback_decode(b"Qty"), "Qty");
    }
}
