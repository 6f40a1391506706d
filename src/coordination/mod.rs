//! Load coordination: the chunked loader and the run orchestrator

pub mod loader;
pub mod orchestrator;

pub use orchestrator::{LoadConfigBuilder, LoadReport, Orchestrator, SourcePaths, TableReport};
