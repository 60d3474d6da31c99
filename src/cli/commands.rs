//! CLI command definitions and handlers

use clap::Subcommand;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::codec::glossary::Glossary;
use crate::codec::placeholder::PlaceholderCodec;
use crate::core::client::ChatClient;
use crate::core::config::TranslatorConfig;
use crate::core::invoker::Translator;
use crate::processors::batch::BatchTranslator;
use crate::processors::checkpoint::CheckpointStore;
use crate::processors::files::{read_json_object, write_json_atomic};
use crate::processors::quality;

/// Commands for JSON Batch Translator
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate every value of a flat JSON object
    Translate {
        /// Input JSON file (required)
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSON file (required)
        #[arg(short, long)]
        output: PathBuf,

        /// Checkpoint file (default: <output>_checkpoint.json)
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Glossary JSON file, overrides the configured one
        #[arg(short, long)]
        glossary: Option<PathBuf>,

        /// Units per request, overrides the configured batch size
        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Split a translated file into clean and broken entries
    Filter {
        /// Translated JSON file (required)
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write entries that look fine
        #[arg(long)]
        clean_output: PathBuf,

        /// Where to write entries with commentary or leftover kana
        #[arg(long)]
        broken_output: PathBuf,
    },

    /// Pull the source texts of broken entries for another pass
    Extract {
        /// Original (untranslated) JSON file
        #[arg(long)]
        original: PathBuf,

        /// JSON file whose keys select the entries to extract
        #[arg(long)]
        broken: PathBuf,

        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Overwrite entries of one file with those of another
    Merge {
        /// File holding the entries to write
        #[arg(short, long)]
        source: PathBuf,

        /// File updated in place
        #[arg(short, long)]
        destination: PathBuf,
    },

    /// Order entries by the integer value of their keys
    Sort {
        /// Input JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Handle translation command
pub async fn handle_translate(
    config_file: Option<&Path>,
    input: PathBuf,
    output: PathBuf,
    checkpoint: Option<PathBuf>,
    glossary: Option<PathBuf>,
    batch_size: Option<usize>,
) -> anyhow::Result<()> {
    let start_time = Instant::now();

    let mut config = TranslatorConfig::load(config_file)?;
    if let Some(size) = batch_size {
        config.batch.max_batch_size = size;
    }
    if glossary.is_some() {
        config.glossary_path = glossary;
    }
    config.validate()?;

    info!("Starting JSON translation");
    info!("Input: {}", input.display());
    info!("Output: {}", output.display());
    info!("Target language: {}", config.target_language);
    info!("Batch size: {}", config.batch.max_batch_size);

    let data = read_json_object(&input)?;
    if data.is_empty() {
        warn!("{} holds no entries", input.display());
    }

    let glossary = match &config.glossary_path {
        Some(path) => Glossary::load(path, &config.glossary_section)?,
        None => Glossary::default(),
    };
    info!("Glossary entries: {}", glossary.len());

    let config = Arc::new(config);
    let client = ChatClient::new(config.clone())?;
    let translator = Translator::new(client, &config);
    let store = CheckpointStore::new(&output, checkpoint);

    // Create progress bar
    let pb = ProgressBar::new(data.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("=>-"),
    );

    let batcher = BatchTranslator::new(
        translator,
        PlaceholderCodec::new(glossary),
        store,
        config.batch.clone(),
    )
    .with_progress(pb);

    let report = batcher.run(&data).await?;

    let duration = start_time.elapsed();
    info!(
        "Completed: {} units, {} mismatched batches in {:?}",
        report.processed_units, report.mismatched_batches, duration
    );

    println!("\n✅ Translation completed!");
    if let Some(index) = report.resumed_from {
        println!("   Resumed at: {}", index);
    }
    println!("   Processed: {}", report.processed_units);
    println!("   Mismatched batches: {}", report.mismatched_batches);
    println!("   Single-unit fallbacks: {}", report.single_unit_fallbacks);
    println!("   Kept source text: {}", report.usage.degraded);
    println!("   Tokens: {}", report.usage.total_tokens);
    println!("   Time: {:?}", duration);
    println!("   Output: {}", output.display());

    Ok(())
}

/// Handle filter command
pub async fn handle_filter(
    input: PathBuf,
    clean_output: PathBuf,
    broken_output: PathBuf,
) -> anyhow::Result<()> {
    info!("Filtering broken translations in: {}", input.display());

    let data = read_json_object(&input)?;
    let (clean, broken) = quality::partition_broken(&data);

    write_json_atomic(&clean_output, &clean).await?;
    write_json_atomic(&broken_output, &broken).await?;

    println!("✅ Checked {} entries", data.len());
    println!("   Clean: {} → {}", clean.len(), clean_output.display());
    println!("   Broken: {} → {}", broken.len(), broken_output.display());

    Ok(())
}

/// Handle extract command
pub async fn handle_extract(original: PathBuf, broken: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let broken_data = read_json_object(&broken)?;
    info!("Found {} keys in {}", broken_data.len(), broken.display());

    let original_data = read_json_object(&original)?;
    let (extracted, missing) = quality::extract_originals(&original_data, &broken_data);

    for key in &missing {
        warn!("Key '{}' not found in {}", key, original.display());
    }

    write_json_atomic(&output, &extracted).await?;

    println!("✅ Extracted {} source texts to {}", extracted.len(), output.display());
    if !missing.is_empty() {
        println!("   Missing from original: {}", missing.len());
    }

    Ok(())
}

/// Handle merge command
pub async fn handle_merge(source: PathBuf, destination: PathBuf) -> anyhow::Result<()> {
    info!("Merging {} into {}", source.display(), destination.display());

    let source_data = read_json_object(&source)?;
    let mut destination_data = read_json_object(&destination)?;
    let written = quality::merge_into(&mut destination_data, &source_data);

    write_json_atomic(&destination, &destination_data).await?;

    println!("✅ Wrote {} entries into {}", written, destination.display());
    println!("   Total entries: {}", destination_data.len());

    Ok(())
}

/// Handle sort command
pub async fn handle_sort(input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let data = read_json_object(&input)?;
    let sorted = quality::sort_numeric(&data)?;

    write_json_atomic(&output, &sorted).await?;
    info!("Sorted {} entries from {}", sorted.len(), input.display());

    println!("✅ Sorted {} entries into {}", sorted.len(), output.display());

    Ok(())
}
