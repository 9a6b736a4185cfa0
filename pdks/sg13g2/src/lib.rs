//! The IHP SG13G2 130 nm BiCMOS process design kit.
//!
//! Provides the process layer map, the vertical layer stack, design-rule
//! constants and routing cross-sections, and a catalog of parametric layout
//! cells that emit GDS geometry.
#![warn(missing_docs)]

use arcstr::ArcStr;
use thiserror::Error;

pub mod catalog;
pub mod cells;
pub mod layers;
pub mod layout;
pub mod rules;
pub mod stack;
pub mod units;
#[cfg(test)]
mod tests;

pub use layers::{LayerPurpose, Purpose, Sg13g2Layer};
pub use layout::{Block, CellBuilder, Context, Layout, GDS_UNITS};

/// An error produced by the SG13G2 PDK.
#[derive(Debug, Error)]
pub enum Sg13g2Error {
    /// A layer name could not be resolved.
    #[error("unknown layer `{0}`")]
    UnknownLayer(String),
    /// No design rule is defined for the given layer.
    #[error("no design rule for layer {0}")]
    NoRule(Sg13g2Layer),
    /// A cross-section name could not be resolved.
    #[error("unknown cross-section `{0}`")]
    UnknownCrossSection(String),
    /// A cell name is not in the catalog.
    #[error("unknown cell `{0}`")]
    UnknownCell(String),
    /// A cell parameter is out of range or inconsistent.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParam {
        /// The offending parameter.
        name: ArcStr,
        /// Why the value was rejected.
        reason: ArcStr,
    },
    /// The layer stack failed validation.
    #[error("invalid layer stack: {0}")]
    Stack(String),
    /// Error decoding cell parameters.
    #[error("error decoding parameters: {0}")]
    Params(#[from] serde_json::Error),
    /// Error serializing YAML.
    #[error("error serializing YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Error building a layout library.
    #[error(transparent)]
    Layir(#[from] layir::LayirError),
    /// Error writing GDS.
    #[error(transparent)]
    Gds(#[from] gds::GdsError),
}

/// A result type returning SG13G2 errors.
pub type Result<T> = std::result::Result<T, Sg13g2Error>;

impl Sg13g2Error {
    pub(crate) fn invalid_param(name: impl Into<ArcStr>, reason: impl Into<ArcStr>) -> Self {
        Self::InvalidParam {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
