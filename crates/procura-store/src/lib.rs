//! Sinks for canonical contract records: a JSON folder tree (records, raw
//! decoded documents, entity dictionaries) and Parquet files.

mod batch;
mod error;
mod json;
mod sink;

pub use batch::contracts_to_batch;
pub use error::StoreError;
pub use json::JsonStore;
pub use sink::ContractSink;

#[cfg(feature = "parquet")]
mod columnar;
#[cfg(feature = "parquet")]
pub use columnar::{ParquetSink, read_parquet};
