//! JSON file helpers shared by the translator and the maintenance commands

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::errors::{Result, TranslationError};

/// Read a file that must hold one JSON object; a UTF-8 BOM is tolerated
pub fn read_json_object(path: &Path) -> Result<Map<String, Value>> {
    let content = std::fs::read_to_string(path).map_err(|e| TranslationError::file(path, e))?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    match serde_json::from_str::<Value>(content)? {
        Value::Object(map) => Ok(map),
        other => Err(TranslationError::InvalidFormat {
            format: format!(
                "{}: expected a JSON object, found {}",
                path.display(),
                json_kind(&other)
            ),
        }),
    }
}

/// Pretty-print `value` to `path` through a sibling temp file and a rename
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TranslationError::file(parent, e))?;
        }
    }

    let tmp = temp_path(path);
    tokio::fs::write(&tmp, content)
        .await
        .map_err(|e| TranslationError::file(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| TranslationError::file(path, e))?;

    debug!("Wrote {}", path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
