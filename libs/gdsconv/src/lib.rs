//! Conversion between [`layir`] libraries and [`gds`] libraries.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod conv;
pub mod export;
pub mod import;

#[cfg(test)]
mod tests;

/// A GDS layer specification: `(layer, datatype)`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct GdsLayer(pub u16, pub u16);

impl fmt::Display for GdsLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, self.1)
    }
}
