//! Readers for schematic-level design data.
//!
//! [`xschem`] parses xschem `.sch` files into instances, wires and nets.
//! [`spice`] reads subcircuit definitions from SPICE netlists.
#![warn(missing_docs)]

use std::path::PathBuf;

use thiserror::Error;

pub mod spice;
pub mod xschem;
#[cfg(test)]
mod tests;

/// An error reading or converting schematic data.
#[derive(Debug, Error)]
pub enum SchemconvError {
    /// A malformed xschem record.
    #[error("invalid xschem record on line {line}: {reason}")]
    InvalidRecord {
        /// One-based line number where the record starts.
        line: usize,
        /// Why the record was rejected.
        reason: String,
    },
    /// A SPICE netlist error.
    #[error(transparent)]
    Spice(#[from] spice::ParserError),
    /// Failure reading an input file.
    #[error("failed to read file at path `{path:?}`")]
    FailedToRead {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        err: std::io::Error,
    },
    /// YAML serialization failure.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    /// JSON serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// The result type of this crate.
pub type Result<T> = std::result::Result<T, SchemconvError>;
