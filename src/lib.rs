pub mod collector;
pub mod config;
pub mod dates;
pub mod error;
pub mod github;
pub mod metrics;
pub mod querier;
pub mod types;

pub use error::{Error, Result};
