//! Post-run maintenance on translated files: spotting leftover model
//! commentary or untranslated kana, and shuffling entries between files

use serde_json::{Map, Value};

use crate::core::errors::{Result, TranslationError};

/// Fragments that only show up when the model talked about the task instead of doing it
const COMMENTARY_PATTERNS: &[&str] = &[
    "this is japanese",
    "translate to korean",
    "the segment is",
    "we must split it",
    "original:",
    "translation:",
    "combined:",
    "we must be cautious",
    "let's break down",
    "(note:",
    "actual translation",
    "placeholder \"xxx\"",
    "will be replaced with",
    "will be provided here",
    "remain intact",
    "translation",
    "output",
    "<color=...>",
    "translated",
    "japanese/chinese content",
];

fn is_kana(c: char) -> bool {
    matches!(c, '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FA}' | '\u{30FC}'..='\u{30FF}')
}

/// Whether a translated value still carries commentary or Japanese kana
///
/// The katakana middle dot (U+30FB) is allowed, it is common punctuation in
/// Korean game text. Non-string values are never reported.
pub fn is_translation_broken(value: &Value) -> bool {
    let Value::String(text) = value else {
        return false;
    };

    let lowered = text.to_lowercase();
    COMMENTARY_PATTERNS.iter().any(|p| lowered.contains(p)) || text.chars().any(is_kana)
}

/// Split `data` into (clean, broken) preserving the input order in both
pub fn partition_broken(data: &Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut clean = Map::new();
    let mut broken = Map::new();
    for (key, value) in data {
        let bucket = if is_translation_broken(value) {
            &mut broken
        } else {
            &mut clean
        };
        bucket.insert(key.clone(), value.clone());
    }
    (clean, broken)
}

/// The `original` entries whose keys appear in `broken`, plus broken keys the original lacks
pub fn extract_originals(
    original: &Map<String, Value>,
    broken: &Map<String, Value>,
) -> (Map<String, Value>, Vec<String>) {
    let extracted: Map<String, Value> = original
        .iter()
        .filter(|(key, _)| broken.contains_key(*key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let missing = broken
        .keys()
        .filter(|key| !original.contains_key(*key))
        .cloned()
        .collect();

    (extracted, missing)
}

/// Overwrite or extend `destination` with every entry of `source`; returns how many were written
pub fn merge_into(destination: &mut Map<String, Value>, source: &Map<String, Value>) -> usize {
    for (key, value) in source {
        destination.insert(key.clone(), value.clone());
    }
    source.len()
}

/// Reorder entries by the integer value of their keys
pub fn sort_numeric(data: &Map<String, Value>) -> Result<Map<String, Value>> {
    let mut entries = data
        .iter()
        .map(|(key, value)| {
            key.trim()
                .parse::<i64>()
                .map(|n| (n, key, value))
                .map_err(|_| TranslationError::InvalidFormat {
                    format: format!("key {:?} is not an integer", key),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    entries.sort_by_key(|(n, _, _)| *n);

    Ok(entries
        .into_iter()
        .map(|(_, key, value)| (key.clone(), value.clone()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_broken_detection() {
        assert!(is_translation_broken(&json!("안녕하세요 (Note: casual tone)")));
        assert!(is_translation_broken(&json!("Translation: 안녕")));
        assert!(is_translation_broken(&json!("OUTPUT 결과")));
        assert!(is_translation_broken(&json!("안녕 こんにちは")));
        assert!(is_translation_broken(&json!("카타카나 カタカナ")));

        assert!(!is_translation_broken(&json!("「안녕하세요」#n반가워요")));
        assert!(!is_translation_broken(&json!("마리・앙투아네트")));
        assert!(!is_translation_broken(&json!(42)));
        assert!(!is_translation_broken(&json!(null)));
    }

    #[test]
    fn test_partition_keeps_order() {
        let data = object(json!({"3": "괜찮아", "1": "ひらがな", "2": "좋아", "4": "translated text"}));
        let (clean, broken) = partition_broken(&data);

        assert_eq!(clean.keys().collect::<Vec<_>>(), vec!["3", "2"]);
        assert_eq!(broken.keys().collect::<Vec<_>>(), vec!["1", "4"]);
    }

    #[test]
    fn test_extract_in_original_order() {
        let original = object(json!({"1": "一", "2": "二", "3": "三"}));
        let broken = object(json!({"3": "x", "9": "y", "1": "z"}));

        let (extracted, missing) = extract_originals(&original, &broken);
        assert_eq!(extracted, object(json!({"1": "一", "3": "三"})));
        assert_eq!(extracted.keys().collect::<Vec<_>>(), vec!["1", "3"]);
        assert_eq!(missing, vec!["9".to_string()]);
    }

    #[test]
    fn test_merge_overwrites_and_extends() {
        let mut destination = object(json!({"1": "old", "2": "keep"}));
        let written = merge_into(&mut destination, &object(json!({"1": "new", "3": "added"})));

        assert_eq!(written, 2);
        assert_eq!(destination.keys().collect::<Vec<_>>(), vec!["1", "2", "3"]);
        assert_eq!(destination["1"], json!("new"));
    }

    #[test]
    fn test_sort_numeric() {
        let data = object(json!({"10": "j", "2": "b", "1": "a", "-3": "neg"}));
        let sorted = sort_numeric(&data).unwrap();
        assert_eq!(sorted.keys().collect::<Vec<_>>(), vec!["-3", "1", "2", "10"]);

        let bad = object(json!({"1": "a", "two": "b"}));
        assert!(matches!(
            sort_numeric(&bad),
            Err(TranslationError::InvalidFormat { .. })
        ));
    }
}
