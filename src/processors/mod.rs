//! File-level processing: batch orchestration, persistence and maintenance tools

pub mod batch;
pub mod checkpoint;
pub mod files;
pub mod quality;
