use std::path::PathBuf;

use thiserror::Error;

/// Failure to build a reference registry. Fatal to a run.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot read reference feed {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid authority feed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid fiscal id table: {0}")]
    Csv(#[from] csv::Error),

    #[error("fiscal id table has no {column:?} column")]
    MissingColumn { column: &'static str },
}
