//! Ingestion layer: schema detection, dual-dialect XML decoding, and
//! normalization into canonical [`Contract`](procura_core::Contract) records.

pub mod decode;
mod error;
pub mod normalize;
mod xml;

pub use decode::{Dialect, decode_document, decode_file, detect_dialect};
pub(crate) use error::DecodeError;
pub use error::NormalizeError;
pub use normalize::normalize;
