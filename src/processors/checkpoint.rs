//! Output and checkpoint persistence

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::errors::{Result, TranslationError};
use crate::core::models::Checkpoint;
use crate::processors::files::{read_json_object, write_json_atomic};

/// Owns the output file and its resume checkpoint
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    output_path: PathBuf,
    checkpoint_path: PathBuf,
}

impl CheckpointStore {
    /// Store for `output_path`; the checkpoint path defaults to `<stem>_checkpoint.json`
    pub fn new(output_path: impl Into<PathBuf>, checkpoint_path: Option<PathBuf>) -> Self {
        let output_path = output_path.into();
        let checkpoint_path = checkpoint_path.unwrap_or_else(|| default_checkpoint_path(&output_path));
        Self {
            output_path,
            checkpoint_path,
        }
    }

    /// Output file
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Checkpoint file
    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    /// Previously saved progress, if any
    pub fn load(&self) -> Result<Option<Checkpoint>> {
        if !self.checkpoint_path.exists() {
            return Ok(None);
        }

        let root = read_json_object(&self.checkpoint_path)?;
        let checkpoint: Checkpoint = serde_json::from_value(Value::Object(root)).map_err(|e| {
            TranslationError::InvalidFormat {
                format: format!("checkpoint {}: {}", self.checkpoint_path.display(), e),
            }
        })?;

        info!(
            "Resuming from checkpoint {} at index {} ({} entries)",
            self.checkpoint_path.display(),
            checkpoint.index,
            checkpoint.data.len()
        );
        Ok(Some(checkpoint))
    }

    /// Rewrite the full output, then record the next start index
    pub async fn save(&self, data: &Map<String, Value>, next_index: usize) -> Result<()> {
        write_json_atomic(&self.output_path, data).await?;
        write_json_atomic(
            &self.checkpoint_path,
            &Checkpoint {
                index: next_index,
                data: data.clone(),
            },
        )
        .await
    }

    /// Remove the checkpoint once every key is done
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.checkpoint_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No checkpoint to remove at {}", self.checkpoint_path.display());
                Ok(())
            }
            Err(e) => Err(TranslationError::file(&self.checkpoint_path, e)),
        }
    }
}

/// `out.json` → `out_checkpoint.json`
pub fn default_checkpoint_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{}_checkpoint.json", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    #[test]
    fn test_default_checkpoint_path() {
        assert_eq!(
            default_checkpoint_path(Path::new("/work/translated.json")),
            PathBuf::from("/work/translated_checkpoint.json")
        );
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("out.json"), None);
        assert!(store.load().unwrap().is_none());

        let data = json!({"1": "하나", "2": "둘"}).as_object().unwrap().clone();
        store.save(&data, 2).await.unwrap();

        let output: Value =
            serde_json::from_str(&std::fs::read_to_string(store.output_path()).unwrap()).unwrap();
        assert_json_eq!(output, json!({"1": "하나", "2": "둘"}));

        let checkpoint = store.load().unwrap().unwrap();
        assert_eq!(checkpoint.index, 2);
        assert_eq!(checkpoint.data, data);

        store.clear().await.unwrap();
        assert!(!store.checkpoint_path().exists());
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("out.json"), None);
        std::fs::write(store.checkpoint_path(), r#"{"index": "forty"}"#).unwrap();
        assert!(store.load().is_err());
    }
}
