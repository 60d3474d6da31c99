//! Masking of structural substrings before text is sent to the model
//!
//! Markers, color tags, dashes and quotation/bracket glyphs are swapped for
//! `__PH_<n>__` tokens, which models reproduce far more reliably than the
//! glyphs themselves. The glossary only ever touches the text between tokens.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::codec::glossary::Glossary;

/// Everything that must survive translation byte for byte
static PROTECTED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"#BATCH_SPLIT_\d+#|#n|#!ALB\([^)]*\)|<color=[^>]*?>|</color>|――|——|—|[「」｢｣『』【】〈〉《》“”‘’"]"#,
    )
    .expect("protected span regex")
});

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__PH_(\d+)__").expect("token regex"));

/// Token standing in for the `n`-th protected span of a unit
pub fn token(n: usize) -> String {
    format!("__PH_{}__", n)
}

/// Originals of the protected spans of one unit, indexed by token number
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderTable {
    originals: Vec<String>,
}

impl PlaceholderTable {
    fn push(&mut self, original: &str) -> String {
        let token = token(self.originals.len());
        self.originals.push(original.to_string());
        token
    }

    /// Original text behind a token, if the token belongs to this table
    pub fn get(&self, token: &str) -> Option<&str> {
        let n: usize = TOKEN_RE
            .captures(token)
            .filter(|caps| caps.get(0).map(|m| m.as_str()) == Some(token))?
            .get(1)?
            .as_str()
            .parse()
            .ok()?;
        self.originals.get(n).map(String::as_str)
    }

    /// Number of masked spans
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    /// Whether nothing was masked
    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// `(token, original)` pairs in encounter order
    pub fn iter(&self) -> impl Iterator<Item = (String, &str)> {
        self.originals
            .iter()
            .enumerate()
            .map(|(n, original)| (token(n), original.as_str()))
    }
}

/// Protects and restores unit text
#[derive(Debug, Clone, Default)]
pub struct PlaceholderCodec {
    glossary: Glossary,
}

impl PlaceholderCodec {
    /// Codec applying `glossary` to unmasked text
    pub fn new(glossary: Glossary) -> Self {
        Self { glossary }
    }

    /// Mask protected spans of the trimmed text and apply the glossary to the rest
    pub fn protect(&self, text: &str) -> (String, PlaceholderTable) {
        let text = text.trim();
        let mut table = PlaceholderTable::default();
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;

        for m in PROTECTED_RE.find_iter(text) {
            out.push_str(&self.glossary.apply(&text[pos..m.start()]));
            out.push_str(&table.push(m.as_str()));
            pos = m.end();
        }
        out.push_str(&self.glossary.apply(&text[pos..]));

        (out, table)
    }

    /// Put the originals back; tokens the table does not know are dropped
    pub fn restore(&self, text: &str, table: &PlaceholderTable) -> String {
        restore(text, table)
    }
}

/// Replace every token with its original and trim the result
pub fn restore(text: &str, table: &PlaceholderTable) -> String {
    TOKEN_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            table.get(&caps[0]).unwrap_or_default().to_string()
        })
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> PlaceholderCodec {
        PlaceholderCodec::default()
    }

    #[test]
    fn test_plain_text_round_trip() {
        let (protected, table) = codec().protect("ただのテキストです");
        assert!(table.is_empty());
        assert_eq!(protected, "ただのテキストです");
        assert_eq!(restore(&protected, &table), "ただのテキストです");
    }

    #[test]
    fn test_brackets_masked_in_order() {
        let (protected, table) = codec().protect("「こんにちは」");
        assert_eq!(protected, "__PH_0__こんにちは__PH_1__");
        assert_eq!(table.get("__PH_0__"), Some("「"));
        assert_eq!(table.get("__PH_1__"), Some("」"));

        let translated = "__PH_0__안녕하세요__PH_1__";
        assert_eq!(restore(translated, &table), "「안녕하세요」");
    }

    #[test]
    fn test_mixed_glyphs_round_trip() {
        let source = "#!ALB(face_01)<color=#ff0000>『剣』</color>――【注意】#n“引用”‘a’〈b〉《c》｢d｣—\"e\"——";
        let (protected, table) = codec().protect(source);

        assert!(!protected.contains('「'));
        assert!(!protected.contains("<color"));
        assert!(!protected.contains("#n"));
        assert_eq!(table.len(), 23);
        assert_eq!(table.iter().next().unwrap().1, "#!ALB(face_01)");
        assert_eq!(restore(&protected, &table), source);
    }

    #[test]
    fn test_batch_marker_in_source_is_protected() {
        let (protected, table) = codec().protect("a #BATCH_SPLIT_7# b");
        assert_eq!(protected, "a __PH_0__ b");
        assert_eq!(table.get("__PH_0__"), Some("#BATCH_SPLIT_7#"));
    }

    #[test]
    fn test_restore_drops_unknown_tokens_and_trims() {
        let (_, table) = codec().protect("「x」");
        assert_eq!(restore("  __PH_0__y__PH_1____PH_9__ ", &table), "「y」");
    }

    #[test]
    fn test_restore_is_order_independent() {
        let (_, table) = codec().protect("「a」『b』");
        assert_eq!(restore("__PH_3__b__PH_2____PH_1__a__PH_0__", &table), "』b『」a「");
    }

    #[test]
    fn test_glossary_skips_protected_spans() {
        let codec = PlaceholderCodec::new(Glossary::new([("剣", "검"), ("PH", "XX"), ("1", "one")]));
        let (protected, table) = codec.protect("剣「剣」#!ALB(剣)");
        assert_eq!(protected, "검__PH_0__검__PH_1____PH_2__");
        assert_eq!(codec.restore(&protected, &table), "검「검」#!ALB(剣)");
    }

    #[test]
    fn test_table_rejects_foreign_tokens() {
        let (_, table) = codec().protect("「x」");
        assert_eq!(table.get("__PH_5__"), None);
        assert_eq!(table.get("x__PH_0__"), None);
    }
}
