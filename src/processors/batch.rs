//! Batch orchestration: chunking, fragment validation, subdivision and checkpointing

use indicatif::ProgressBar;
use rand::Rng;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::codec::markers;
use crate::codec::placeholder::{PlaceholderCodec, PlaceholderTable};
use crate::codec::structure;
use crate::core::client::ChatModel;
use crate::core::config::BatchConfig;
use crate::core::errors::Result;
use crate::core::invoker::Translator;
use crate::core::models::TranslationUnit;
use crate::core::usage::UsageStats;
use crate::processors::checkpoint::CheckpointStore;

/// A unit after protection, ready to be tagged into a batch
#[derive(Debug, Clone)]
struct PreparedUnit<'a> {
    unit: &'a TranslationUnit,
    protected: String,
    table: PlaceholderTable,
}

/// How one window of keys was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Nothing to send: every unit was blank
    Skipped,
    /// Fragment count matched on the first request
    Matched,
    /// Mismatch, resolved through sub-batches or single units
    Subdivided,
}

/// Result of a full run
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Full output, checkpointed entries included
    pub output: Map<String, Value>,
    /// Units handled in this run, excluding those restored from a checkpoint
    pub processed_units: usize,
    /// Windows whose first request came back with the wrong fragment count
    pub mismatched_batches: usize,
    /// Units that ended up in one-request-per-unit fallback
    pub single_unit_fallbacks: usize,
    /// Start index taken from a checkpoint
    pub resumed_from: Option<usize>,
    /// Request counters for the run
    pub usage: UsageStats,
}

/// Drives the whole input through the translator, one window at a time
pub struct BatchTranslator<M> {
    translator: Translator<M>,
    codec: PlaceholderCodec,
    store: CheckpointStore,
    settings: BatchConfig,
    progress: ProgressBar,
}

impl<M: ChatModel> BatchTranslator<M> {
    /// Orchestrator without a visible progress bar
    pub fn new(
        translator: Translator<M>,
        codec: PlaceholderCodec,
        store: CheckpointStore,
        settings: BatchConfig,
    ) -> Self {
        Self {
            translator,
            codec,
            store,
            settings,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report per-unit progress on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Translate every unit of `input`, resuming from a checkpoint when one exists
    pub async fn run(&self, input: &Map<String, Value>) -> Result<BatchReport> {
        let units = TranslationUnit::from_map(input);
        let total = units.len();

        let (mut output, start, resumed_from) = match self.store.load()? {
            Some(checkpoint) => {
                let start = checkpoint.index.min(total);
                (checkpoint.data, start, Some(start))
            }
            None => (Map::new(), 0, None),
        };

        self.progress.set_length(total as u64);
        self.progress.set_position(start as u64);

        let mut report = BatchReport {
            output: Map::new(),
            processed_units: 0,
            mismatched_batches: 0,
            single_unit_fallbacks: 0,
            resumed_from,
            usage: UsageStats::new(),
        };

        let window = self.settings.max_batch_size.max(1);
        let mut index = start;

        while index < total {
            let end = (index + window).min(total);
            let outcome = self
                .process_window(&units[index..end], &mut output, &mut report)
                .await;

            if outcome == BatchOutcome::Subdivided {
                report.mismatched_batches += 1;
            }
            report.processed_units += end - index;
            index = end;

            self.store.save(&output, index).await?;
            info!("{}/{} done and saved ({:?})", index, total, outcome);

            if index < total {
                self.pause().await;
            }
        }

        self.store.clear().await?;
        self.progress.finish_with_message("Completed");
        self.translator.usage().log_summary().await;

        report.output = output;
        report.usage = self.translator.usage().get_stats().await;
        Ok(report)
    }

    async fn process_window(
        &self,
        window: &[TranslationUnit],
        output: &mut Map<String, Value>,
        report: &mut BatchReport,
    ) -> BatchOutcome {
        let pending: Vec<PreparedUnit<'_>> = window
            .iter()
            .filter(|unit| !unit.is_blank())
            .map(|unit| {
                let (protected, table) = self.codec.protect(&unit.text);
                PreparedUnit {
                    unit,
                    protected,
                    table,
                }
            })
            .collect();

        let (translations, outcome) = if pending.is_empty() {
            (Vec::new(), BatchOutcome::Skipped)
        } else {
            let (translations, outcome, singles) = self.translate_group(&pending).await;
            report.single_unit_fallbacks += singles;
            (translations, outcome)
        };

        // blank units pass through; the rest take translations in order
        let mut translations = translations.into_iter();
        for unit in window {
            let value = if unit.is_blank() {
                unit.original.clone()
            } else {
                Value::String(translations.next().unwrap_or_else(|| unit.text.clone()))
            };
            output.insert(unit.key.clone(), value);
            self.progress.inc(1);
        }

        outcome
    }

    /// Whole group first; on mismatch, sub-batches of `retry_size`; then one unit at a time
    async fn translate_group(&self, group: &[PreparedUnit<'_>]) -> (Vec<String>, BatchOutcome, usize) {
        if let Some(translations) = self.try_batch(group).await {
            return (translations, BatchOutcome::Matched, 0);
        }

        let size = self.settings.retry_size(group.len());
        warn!(
            "Batch of {} units came back with the wrong fragment count; retrying in sub-batches of {}",
            group.len(),
            size
        );

        let mut translations = Vec::with_capacity(group.len());
        let mut singles = 0;
        for sub in group.chunks(size) {
            match self.try_batch(sub).await {
                Some(sub_translations) => translations.extend(sub_translations),
                None => {
                    warn!("Sub-batch of {} units mismatched again; translating one by one", sub.len());
                    for prepared in sub {
                        translations.push(self.translate_single(prepared).await);
                    }
                    singles += sub.len();
                }
            }
        }

        (translations, BatchOutcome::Subdivided, singles)
    }

    /// One request for `group`; `None` when the fragment count is off
    async fn try_batch(&self, group: &[PreparedUnit<'_>]) -> Option<Vec<String>> {
        let combined = group
            .iter()
            .enumerate()
            .map(|(i, prepared)| markers::tag_unit(i, &prepared.protected))
            .collect::<Vec<_>>()
            .join("\n");

        let response = self.translator.translate_one(&combined).await;
        let fragments = markers::split(&response);

        if fragments.len() != group.len() {
            debug!("Expected {} fragments, got {}", group.len(), fragments.len());
            return None;
        }

        Some(
            group
                .iter()
                .zip(fragments)
                .map(|(prepared, fragment)| self.finish(prepared, &fragment))
                .collect(),
        )
    }

    async fn translate_single(&self, prepared: &PreparedUnit<'_>) -> String {
        let response = self.translator.translate_one(&prepared.protected).await;
        self.finish(prepared, &response)
    }

    /// Restore placeholders, reconcile structure, fall back to the source if nothing is left
    fn finish(&self, prepared: &PreparedUnit<'_>, fragment: &str) -> String {
        let restored = self.codec.restore(fragment, &prepared.table);
        // reconcile pads `#n` markers, so blankness is judged before it
        if restored.trim().is_empty() {
            warn!("Empty translation for key {}; keeping source text", prepared.unit.key);
            return prepared.unit.text.clone();
        }
        structure::reconcile(&restored, &prepared.unit.text)
    }

    async fn pause(&self) {
        let (min, max) = (self.settings.delay_min_ms, self.settings.delay_max_ms.max(self.settings.delay_min_ms));
        if max == 0 {
            return;
        }
        let ms = rand::rng().random_range(min..=max);
        debug!("Sleeping {}ms before next batch", ms);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
