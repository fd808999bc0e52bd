pub mod config;
pub mod transport;
pub mod catalog;
pub mod archive;
pub mod engine;
pub mod error;

pub use error::BackupError;
pub type Result<T> = std::result::Result<T, BackupError>;
