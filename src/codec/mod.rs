//! Text transforms applied around each model call

pub mod glossary;
pub mod markers;
pub mod placeholder;
pub mod sanitizer;
pub mod structure;
