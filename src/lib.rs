pub mod config;
pub mod error;
pub mod ingest;

pub use config::Config;
pub use error::{ApiError, FolderError};
