pub mod config;
pub mod error;
pub mod insights;
pub mod types;

pub use config::Config;
pub use error::ResearchError;
pub use insights::*;
pub use types::*;
