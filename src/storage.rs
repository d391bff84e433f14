use std::path::PathBuf;

use thiserror::Error;

use crate::models::session::Session;

pub mod json;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to load session from '{path}': {source}")]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON from '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to save session to '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize session to JSON: {source}")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },
}

pub trait Storage {
    fn load(&self) -> Result<Session, StorageError>;
    fn save(&self, session: &Session) -> Result<(), StorageError>;
}
