//! Per-unit delimiters that let one response be cut back into units

use once_cell::sync::Lazy;
use regex::Regex;

/// Prefix of the canonical `#BATCH_SPLIT_<n>#` marker
pub const MARKER_PREFIX: &str = "#BATCH_SPLIT_";

/// Near-miss spellings models produce, most specific first
static REPAIRS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)#\s*BATCH[_\s]*SPIT_(\d+)\s*#",
        r"(?i)#\s*BATCH[_\s]*SPL[1L]T_(\d+)\s*#",
        r"(?i)#\s*BATCH[_\s]*SPLIT[_\s]*(\d+)\s*#",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("marker repair regex"))
    .collect()
});

static MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#BATCH_SPLIT_\d+#").expect("marker regex"));

/// Canonical marker for batch-local `index`
pub fn marker(index: usize) -> String {
    format!("{}{}#", MARKER_PREFIX, index)
}

/// Prefix one unit's protected text with its marker
pub fn tag_unit(index: usize, text: &str) -> String {
    format!("{}\n{}", marker(index), text)
}

/// Normalize drifted markers back to `#BATCH_SPLIT_<n>#`
pub fn repair(text: &str) -> String {
    let mut out = text.replace('＃', "#");
    for re in REPAIRS.iter() {
        if re.is_match(&out) {
            out = re.replace_all(&out, "#BATCH_SPLIT_${1}#").into_owned();
        }
    }
    out
}

/// Cut a response at canonical markers; blank fragments are dropped
pub fn split(text: &str) -> Vec<String> {
    MARKER_RE
        .split(text)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_unit() {
        assert_eq!(tag_unit(3, "本文"), "#BATCH_SPLIT_3#\n本文");
    }

    #[test]
    fn test_repair_variants() {
        let variants = [
            "＃BATCH_SPLIT_4＃",
            "#BATCH_SPIT_4#",
            "#BATCH_SPLlT_4#",
            "#batch_split_4#",
            "#BATCH SPLIT 4#",
            "#BATCHSPLIT4#",
            "#BATCH__SPLIT_4#",
            "# BATCH_SPLIT_4 #",
            "#Batch_Spl1t_4#",
        ];
        for variant in variants {
            assert_eq!(repair(variant), "#BATCH_SPLIT_4#", "variant {:?}", variant);
        }
    }

    #[test]
    fn test_repair_keeps_index_and_is_idempotent() {
        let text = "#BATCH_SPIT_0#\n가\n#batch split 12#\n나";
        let repaired = repair(text);
        assert_eq!(repaired, "#BATCH_SPLIT_0#\n가\n#BATCH_SPLIT_12#\n나");
        assert_eq!(repair(&repaired), repaired);
    }

    #[test]
    fn test_split_counts_and_order() {
        let text = "  #BATCH_SPLIT_0#\n  첫째 \n\n#BATCH_SPLIT_1#둘째\n#BATCH_SPLIT_2#\n\n셋째\n";
        assert_eq!(split(text), vec!["첫째", "둘째", "셋째"]);
    }

    #[test]
    fn test_split_drops_empty_fragments() {
        assert_eq!(split("#BATCH_SPLIT_0#\n \n#BATCH_SPLIT_1#\nx"), vec!["x"]);
        assert!(split("").is_empty());
    }
}
