use thiserror::Error;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Device bridge unavailable: {0}")]
    BridgeUnavailable(String),

    #[error("No worlds found under any candidate root")]
    NoWorldsFound,

    #[error("Remote command failed: {0}")]
    RemoteCommand(String),

    #[error("World not found on device: {0}")]
    WorldNotFound(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("WalkDir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] globset::Error),
}
