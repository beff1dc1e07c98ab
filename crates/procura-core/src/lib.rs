pub mod id;
pub mod locale;
pub mod model;
pub mod schema;
pub mod tree;

pub use id::contract_id_from_source;
pub use locale::{parse_amount, parse_amount_legacy, parse_bool, parse_date};
pub use model::{
    Authority, CodedValue, Contract, Language, Offerer, OffererCount, Resolution,
    UnknownLanguage, Winner,
};
pub use schema::contracts;
pub use tree::{Mapping, RawTree, to_list};
