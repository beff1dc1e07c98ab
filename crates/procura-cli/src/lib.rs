//! Procura pipeline driver: configuration and the processing pass, shared by
//! the `procura` binary and its integration tests.

pub mod config;
pub mod pipeline;

pub use config::PipelineConfig;
pub use pipeline::{PassStats, run_build_dicts, run_process};
