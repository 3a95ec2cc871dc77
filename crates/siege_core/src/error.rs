//! Error types for the lane defence simulation.
//!
//! Only load-time and configuration problems are errors. Player-facing
//! rejections (unaffordable placement, cooldown, occupied cell, empty undo
//! history) are reported as outcomes, never as [`GameError`].

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// A persisted entity carried a type tag no unit kind answers to.
    #[error("Unknown unit type tag: '{0}'")]
    UnknownUnitTag(String),

    /// A persisted record is missing a field its type requires.
    #[error("Missing field '{field}' for '{tag}'")]
    MissingField {
        /// Type tag of the record being decoded.
        tag: String,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A persisted value is present but outside its legal range.
    #[error("Invalid saved value: {0}")]
    InvalidSavedValue(String),

    /// Save data was written by an incompatible format version.
    #[error("Save version mismatch: expected {expected}, got {found}")]
    VersionMismatch {
        /// Version this build understands.
        expected: u32,
        /// Version found in the data.
        found: u32,
    },

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// RON text could not be parsed.
    #[error("Failed to parse RON data: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// RON text could not be produced.
    #[error("Failed to write RON data: {0}")]
    RonWrite(#[from] ron::Error),

    /// Binary encoding or decoding failed.
    #[error("Binary codec error: {0}")]
    Binary(#[from] bincode::Error),

    /// Reading or writing a file failed.
    #[error("IO error on '{path}': {source}")]
    Io {
        /// Path of the file involved.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
