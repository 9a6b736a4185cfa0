//! Converting imported GDS libraries to other layer types.

use std::collections::BTreeSet;

use arcstr::ArcStr;
use layir::{Element, Library};
use thiserror::Error;

use crate::GdsLayer;

/// A layer type that can be constructed from a [`GdsLayer`].
pub trait FromGds: Sized {
    /// Converts the given GDS layer to this layer type.
    ///
    /// Returns [`None`] if the GDS layer has no valid mapping to the new layer type.
    fn from_gds(layer: GdsLayer) -> Option<Self>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no layer mapping for layer {layer}")]
pub struct NoLayerMapping {
    pub layer: GdsLayer,
}

/// Converts a GDS layout library to a library over layer type `L`.
pub fn from_gds<L: FromGds>(lib: Library<GdsLayer>) -> Result<Library<L>, NoLayerMapping> {
    lib.try_map_layers(|layer| L::from_gds(*layer).ok_or(NoLayerMapping { layer: *layer }))
}

/// The set of GDS layers used anywhere in a library.
pub fn layers_used(lib: &Library<GdsLayer>) -> BTreeSet<GdsLayer> {
    lib.cells()
        .flat_map(|(_, cell)| cell.elements().map(|e| *e.layer()))
        .collect()
}

/// The text labels of a cell as `(text, layer)` pairs.
pub fn labels(lib: &Library<GdsLayer>, cell: &str) -> Vec<(ArcStr, GdsLayer)> {
    lib.try_cell_named(cell)
        .into_iter()
        .flat_map(|c| c.elements())
        .filter_map(|e| match e {
            Element::Text(t) => Some((t.text().clone(), *t.layer())),
            Element::Shape(_) => None,
        })
        .collect()
}
