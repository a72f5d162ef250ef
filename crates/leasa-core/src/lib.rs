pub mod config;
pub mod error;
pub mod types;

pub use config::LeasaConfig;
pub use error::{LeasaError, Result};
pub use types::*;
