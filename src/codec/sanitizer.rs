//! Removal of reasoning blocks and translator notes from model output

use once_cell::sync::Lazy;
use regex::Regex;

/// Applied in order; later rules see the output of earlier ones
static RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?s)<think>.*?</think>\n?",
        r"(?s)\*\*Translation Notes:\*\*.*",
        r"(?s)\(Note:.*?\)",
        r"(?m)^\s*Note:.*$",
        r"(?s)Translation Notes:.*",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("sanitizer regex"))
    .collect()
});

/// Strip commentary from a raw completion
pub fn sanitize(raw: &str) -> String {
    let mut text = raw.to_string();
    for rule in RULES.iter() {
        if rule.is_match(&text) {
            text = rule.replace_all(&text, "").into_owned();
        }
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_think_block_removed() {
        assert_eq!(
            sanitize("<think>internal reasoning</think>Actual translation text"),
            "Actual translation text"
        );
        assert_eq!(sanitize("<think>\nline 1\nline 2\n</think>\n결과"), "결과");
    }

    #[test]
    fn test_notes_removed() {
        let raw = "#BATCH_SPLIT_0#\n안녕 (Note: greeting)\nNote: kept formal\n  Note: indented\n\n**Translation Notes:**\n- #BATCH_SPLIT_1# was odd";
        let clean = sanitize(raw);
        assert_eq!(clean, "#BATCH_SPLIT_0#\n안녕");
    }

    #[test]
    fn test_bare_notes_heading_removed() {
        assert_eq!(sanitize("번역문\nTranslation Notes: none"), "번역문");
    }

    #[test]
    fn test_idempotent() {
        let once = sanitize("<think>x</think>본문 (Note: y)\nNote: z");
        assert_eq!(sanitize(&once), once);
        assert_eq!(sanitize("깨끗한 문장"), "깨끗한 문장");
        assert_eq!(sanitize(""), "");
    }
}
