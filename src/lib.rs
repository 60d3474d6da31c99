//! JSON Batch Translator - batch translation of flat JSON string tables
//!
//! This library sends the values of a key→text JSON object to a chat-completion
//! model in marker-delimited batches, protecting in-text markup with
//! placeholders and checkpointing progress so long runs can resume.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod codec;
pub mod core;
pub mod processors;

// Re-export key types for convenience
pub use codec::{glossary::Glossary, placeholder::PlaceholderCodec};
pub use core::{
    client::{ChatClient, ChatModel},
    config::{BatchConfig, TranslatorConfig},
    errors::{Result, TranslationError},
    invoker::{RetryPolicy, Translator},
    models::{ChatRequest, ChatResponse, TranslationUnit},
};
pub use processors::{
    batch::{BatchReport, BatchTranslator},
    checkpoint::CheckpointStore,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
