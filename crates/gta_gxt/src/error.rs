//! Error types that can be emitted from this library
//!

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent warpper for [`serde_json::Error`]
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// A character has no slot in the loaded character map
    #[error("character {character:?} is missing from the character map")]
    UnmappableCharacter {
        /// The offending character
        character: char,
    },

    /// A stored code unit points outside the character map
    #[error("code unit {unit:#06X} maps to no character map slot")]
    UnmappableCodeUnit {
        /// The offending code unit
        unit: u16,
    },

    /// The character map file could not be read or parsed
    #[error("cannot parse character map: {reason}")]
    UnreadableCharacterMap {
        /// What went wrong while parsing
        reason: String,
    },

    /// A table was asked to serialize with no entries
    #[error("table {0} has no entries")]
    EmptyTable(String),

    /// No MAIN table among the loaded inputs
    #[error("no MAIN table was loaded")]
    MissingMainTable,

    /// A table name unusable as an 8-byte GXT table name
    #[error("table name {0:?} must be ASCII and at most 8 characters")]
    InvalidTableName(String),

    /// The requested table is not present in the manifest
    #[error("table {0} is not present in the manifest")]
    TableNotFound(String),

    /// The manifest disagrees with the file it describes
    #[error("manifest does not match the file: {reason}")]
    ManifestMismatch {
        /// How the file diverges from the manifest
        reason: String,
    },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
