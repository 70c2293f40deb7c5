mod address;
mod helpers;
mod secret;
mod token_set;

pub use address::{Address, AddressParseError, ZERO_TX_HASH};
pub use helpers::parse_boolean_flag;
pub use secret::Secret;
pub use token_set::{TokenSetId, TokenSetParseError};
