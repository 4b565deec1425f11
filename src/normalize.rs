//! Cleanup of the unicode noise vendor exports put into PDF text.

use unicode_normalization::UnicodeNormalization;

/// Normalizes extracted text before any pattern matching.
///
/// - NFKC folds compatibility forms, so full-width `ＮＰＪ０１１` and `３`
///   read as `NPJ011` and `3`
/// - soft hyphens and zero-width characters are removed
/// - non-breaking and narrow spaces become plain spaces
/// - hyphen, dash and minus look-alikes become `-`
/// - full-width colons become `:`
/// - runs of spaces and tabs collapse to one space, line ends are trimmed
///
/// Line breaks are preserved. The function is idempotent.
pub fn normalize_text(input: &str) -> String {
    let mapped = fold(input);

    mapped
        .split('\n')
        .map(collapse_spaces)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Normalizes a single word token; whitespace inside the token is dropped.
pub(crate) fn normalize_token(input: &str) -> String {
    fold(input).chars().filter(|c| !c.is_whitespace()).collect()
}

/// Invisible characters are dropped before NFKC so that marks separated by
/// them compose in a single pass.
fn fold(input: &str) -> String {
    input
        .chars()
        .filter_map(map_char)
        .nfkc()
        .filter_map(map_char)
        .collect()
}

fn map_char(c: char) -> Option<char> {
    match c {
        '\u{00AD}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' => None,
        '\u{00A0}' | '\u{2007}' | '\u{202F}' | '\u{3000}' => Some(' '),
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}'
        | '\u{2212}' | '\u{FF0D}' => Some('-'),
        '\u{FF1A}' => Some(':'),
        '\r' => None,
        '\t' => Some(' '),
        other => Some(other),
    }
}

fn collapse_spaces(line: &str) -> String {
    line.split(' ')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_soft_hyphen_and_zero_width() {
        assert_eq!(normalize_text("NPJ\u{00AD}011\u{200B}-M"), "NPJ011-M");
    }

    #[test]
    fn maps_dashes_and_nbsp() {
        assert_eq!(normalize_text("NPJ011\u{2014}M\u{00A0}\u{00A0}3"), "NPJ011-M 3");
        assert_eq!(normalize_text("NPX015\u{2013}L"), "NPX015-L");
    }

    #[test]
    fn keeps_line_breaks() {
        assert_eq!(normalize_text("a  b \r\n  c"), "a b\nc");
    }

    #[test]
    fn full_width_colon() {
        assert_eq!(normalize_text("Item quantity\u{FF1A} 12"), "Item quantity: 12");
    }

    #[test]
    fn full_width_forms_fold_to_ascii() {
        assert_eq!(normalize_text("\u{FF2E}\u{FF30}\u{FF2A}\u{FF10}\u{FF11}\u{FF11}-M \u{FF13}"), "NPJ011-M 3");
        assert_eq!(normalize_token("\u{FF2E}\u{FF30}\u{FF38}\u{FF10}\u{FF11}\u{FF15}\u{FF0D}\u{FF2C}"), "NPX015-L");
        assert_eq!(normalize_text("e\u{200B}\u{0301}"), "\u{00E9}");
    }

    #[test]
    fn is_idempotent() {
        let samples = [
            "NPJ\u{00AD}011 \u{2014} M\t\t3",
            "  lead\u{00A0} \u{202F}trail  \n\n x ",
            "\u{FEFF}Item quantity\u{FF1A}\u{3000}7\r\n",
            "plain text",
            "\u{FF2E}\u{FF30}\u{FF2A}\u{FF10}\u{FF11}\u{FF11}\u{2011}M  \u{FF13}",
            "e\u{200B}\u{0301} \u{FB01}",
        ];
        for s in samples {
            let once = normalize_text(s);
            assert_eq!(normalize_text(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn token_drops_inner_whitespace() {
        assert_eq!(normalize_token("NPJ011\u{00A0}-M"), "NPJ011-M");
    }
}
