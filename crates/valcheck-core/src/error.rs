//! Error types for valcheck

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValcheckError {
    // Matrix errors
    #[error("Invalid dataset '{dataset}' in theme '{theme}': {reason}")]
    DatasetConfig {
        theme: String,
        dataset: String,
        reason: String,
    },

    #[error("Buffer catalogue error at '{buffer}': {reason}")]
    BufferCatalogue { buffer: String, reason: String },

    #[error("Dataset '{dataset}' has no buffer configured for mode {mode}")]
    MissingModeBuffer { dataset: String, mode: String },

    #[error("Unknown buffer class '{buffer}' referenced by dataset '{dataset}'")]
    UnknownBufferClass { dataset: String, buffer: String },

    // Dataset errors
    #[error("Dataset not found: {path}")]
    DatasetNotFound { path: PathBuf },

    #[error("Unknown path alias '{{{alias}}}' in '{template}'")]
    UnknownPathAlias { alias: String, template: String },

    // Geometry engine errors
    #[error("{operation} failed: {reason}")]
    Engine { operation: String, reason: String },

    #[error("Layer handle not found: {handle}")]
    HandleNotFound { handle: String },

    #[error("Invalid where clause '{clause}': {reason}")]
    WhereClause { clause: String, reason: String },

    #[error("Invalid geometry at feature {feature_id}: {reason}")]
    InvalidGeometry { feature_id: String, reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Job-level errors
    #[error("Workspace error at {path}: {reason}")]
    Workspace { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ValcheckError {
    /// Whether this error must abort the whole job rather than a single dataset.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ValcheckError::BufferCatalogue { .. }
                | ValcheckError::Workspace { .. }
                | ValcheckError::ConfigMissing { .. }
                | ValcheckError::ConfigInvalid { .. }
                | ValcheckError::Io(_)
        )
    }
}

/// Shorthand for engine failures raised by adapter crates.
pub fn engine_error(operation: impl Into<String>, reason: impl Into<String>) -> ValcheckError {
    ValcheckError::Engine { operation: operation.into(), reason: reason.into() }
}

pub type Result<T> = std::result::Result<T, ValcheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let catalogue = ValcheckError::BufferCatalogue {
            buffer: "1000m_ring".to_string(),
            reason: "source not built".to_string(),
        };
        assert!(catalogue.is_fatal());

        let missing = ValcheckError::DatasetNotFound { path: PathBuf::from("/nope") };
        assert!(!missing.is_fatal());

        let overlay = engine_error("intersect", "mixed geometry");
        assert!(!overlay.is_fatal());
    }

    #[test]
    fn test_alias_message_keeps_braces() {
        let err = ValcheckError::UnknownPathAlias {
            alias: "csdl".to_string(),
            template: "{csdl}/FMZ100".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown path alias '{csdl}' in '{csdl}/FMZ100'");
    }
}
