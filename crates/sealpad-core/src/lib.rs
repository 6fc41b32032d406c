pub mod config;
pub mod error;
pub mod types;

pub use error::{SealpadError, SealpadResult};
pub use types::EXPECTED_DB_VERSION;
