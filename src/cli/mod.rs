//! Command-line surface of the translator binary

pub mod commands;
