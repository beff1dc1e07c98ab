//! Identity resolution for contracting authorities and winning companies.
//!
//! Two read-only [`Registries`] are loaded once per run; the
//! [`EntityResolver`] corrects each contract against them independently, and
//! the [`EntityDictionary`] folds the corrected contracts serially afterwards.

pub mod dictionary;
mod error;
pub mod fuzzy;
pub mod registry;
pub mod resolver;
pub mod slug;

pub use dictionary::{AuthorityLanguages, Company, EntityDictionary};
pub use error::RegistryError;
pub use fuzzy::{FUZZY_THRESHOLD, FuzzyIndex, MatchOutcome};
pub use registry::{AuthorityEntry, AuthorityRegistry, FiscalIdEntry, FiscalIdRegistry, Registries};
pub use resolver::{EntityResolver, ResolveReport};
pub use slug::slugify;
