use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Up to four concatenated `AAA000` prefixes sharing one size suffix.
pub(crate) static SKU_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[A-Z]{3}\d{3}){1,4}-[SML]").unwrap());

/// True when the match starting at byte `start` is the tail of a longer
/// alphanumeric run, e.g. the last four prefixes of a five-prefix code.
pub(crate) fn continues_left(text: &str, start: usize) -> bool {
    text[..start]
        .chars()
        .next_back()
        .map_or(false, |c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

const PREFIX_LEN: usize = 6;
const MAX_BUNDLE: usize = 4;

// ── Size ──────────────────────────────────────────────────────────────────────

/// Press-on nail set size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Size {
    S,
    M,
    L,
}

impl Size {
    pub fn as_str(self) -> &'static str {
        match self {
            Size::S => "S",
            Size::M => "M",
            Size::L => "L",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "S" | "s" => Some(Size::S),
            "M" | "m" => Some(Size::M),
            "L" | "l" => Some(Size::L),
            _ => None,
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Sku ───────────────────────────────────────────────────────────────────────

/// One physical product in one size, e.g. `NPJ011-M`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sku {
    prefix: String,
    size: Size,
}

impl Sku {
    /// Build a SKU from a 6-character prefix. Returns `None` if the prefix is
    /// not three uppercase ASCII letters followed by three digits.
    pub fn new(prefix: &str, size: Size) -> Option<Self> {
        is_single_prefix(prefix).then(|| Self {
            prefix: prefix.to_string(),
            size,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn size(&self) -> Size {
        self.size
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.size)
    }
}

impl FromStr for Sku {
    type Err = String;

    /// Parses a single (non-bundle) SKU such as `NPX015-L`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match expand_bundle(s.trim()) {
            Some(mut skus) if skus.len() == 1 => Ok(skus.remove(0)),
            Some(_) => Err(format!("'{s}' is a bundle, not a single SKU")),
            None => Err(format!("'{s}' is not a seller SKU")),
        }
    }
}

/// Returns `true` for exactly three uppercase ASCII letters followed by three
/// ASCII digits.
pub(crate) fn is_single_prefix(prefix: &str) -> bool {
    let bytes = prefix.as_bytes();
    bytes.len() == PREFIX_LEN
        && bytes[..3].iter().all(u8::is_ascii_uppercase)
        && bytes[3..].iter().all(u8::is_ascii_digit)
}

/// Split a seller SKU code into the products it ships.
///
/// `NPJ011-M` yields one SKU; `NPJ011NPX015-M` yields `NPJ011-M` and
/// `NPX015-M`. Returns `None` unless the body length is a multiple of six,
/// holds one to four prefixes and every six-character slice is a valid
/// prefix.
pub fn expand_bundle(code: &str) -> Option<Vec<Sku>> {
    let (body, size) = code.rsplit_once('-')?;
    let size = match size {
        "S" => Size::S,
        "M" => Size::M,
        "L" => Size::L,
        _ => return None,
    };

    if body.is_empty() || !body.is_ascii() || body.len() % PREFIX_LEN != 0 {
        return None;
    }
    if body.len() / PREFIX_LEN > MAX_BUNDLE {
        return None;
    }

    body.as_bytes()
        .chunks(PREFIX_LEN)
        .map(|chunk| std::str::from_utf8(chunk).ok().and_then(|p| Sku::new(p, size)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_sku_is_not_expanded() {
        let skus = expand_bundle("NPJ011-M").unwrap();
        assert_eq!(skus.len(), 1);
        assert_eq!(skus[0].to_string(), "NPJ011-M");
    }

    #[test]
    fn bundle_of_four() {
        let skus = expand_bundle("NPF001NPF002NPF003NPX004-L").unwrap();
        let names: Vec<String> = skus.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["NPF001-L", "NPF002-L", "NPF003-L", "NPX004-L"]);
    }

    #[test]
    fn rejects_bad_codes() {
        assert!(expand_bundle("NPJ01-M").is_none());
        assert!(expand_bundle("NPJ011-XL").is_none());
        assert!(expand_bundle("NPJ011NP0015-M").is_none());
        assert!(expand_bundle("NPF001NPF002NPF003NPX004NPX009-S").is_none());
        assert!(expand_bundle("-M").is_none());
    }

    #[test]
    fn sku_from_str() {
        let sku: Sku = "NPX015-S".parse().unwrap();
        assert_eq!(sku.prefix(), "NPX015");
        assert_eq!(sku.size(), Size::S);
        assert!("NPJ011NPX015-S".parse::<Sku>().is_err());
    }

    #[test]
    fn code_regex_finds_bundle_in_noise() {
        let m = SKU_CODE_RE.find("xxNPJ011NPX015-M 3").unwrap();
        assert_eq!(m.as_str(), "NPJ011NPX015-M");
    }

    #[test]
    fn tail_of_longer_code_continues_left() {
        let text = "AAA001BBB002CCC003DDD004EEE005-M";
        let m = SKU_CODE_RE.find(text).unwrap();
        assert_eq!(m.start(), 6);
        assert!(continues_left(text, m.start()));
        assert!(!continues_left("xxNPJ011-M", 2));
        assert!(!continues_left("NPJ011-M", 0));
    }
}
