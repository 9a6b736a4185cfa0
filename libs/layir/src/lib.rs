//! A layout intermediate representation.
//!
//! A [`Library`] holds [`Cell`]s, each made of layered [`Shape`]s and [`Text`]s,
//! [`Instance`]s of other cells, named [`Port`]s, and [`Info`] metadata.
//! The layer type `L` is generic, so a library can be expressed in terms of
//! process layers and later mapped to GDS layers with [`LibraryBuilder::map_layers`].

pub mod id;
pub mod info;
pub mod names;

#[cfg(test)]
mod tests;

use std::{collections::HashMap, ops::Deref};

use crate::id::Id;
use crate::names::Names;
use arcstr::ArcStr;
use geometry::prelude::*;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use info::{Info, InfoValue};

pub struct Cells;

// The reason this uses [`Cells`] instead of [`Cell`]
// is because `Cell` has a generic type parameter.
pub type CellId = Id<Cells>;
pub type InstanceId = Id<Instance>;

/// Errors produced while building a layout library.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LayirError {
    #[error("duplicate port `{port}` in cell `{cell}`")]
    DuplicatePort { cell: ArcStr, port: ArcStr },
    #[error("duplicate instance `{inst}` in cell `{cell}`")]
    DuplicateInstance { cell: ArcStr, inst: ArcStr },
    #[error("no cell named `{0}`")]
    NoSuchCell(ArcStr),
    #[error("cell `{cell}` instantiates a cell that is not in the library")]
    DanglingInstance { cell: ArcStr },
}

pub type Result<T> = std::result::Result<T, LayirError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryBuilder<L> {
    cell_id: CellId,
    cells: IndexMap<CellId, Cell<L>>,
    name_map: HashMap<ArcStr, CellId>,
    names: Names<CellId>,
}

/// A validated layout library.
#[derive(Debug, Clone)]
pub struct Library<L>(LibraryBuilder<L>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell<L> {
    name: ArcStr,
    instance_id: InstanceId,
    instances: IndexMap<InstanceId, Instance>,
    instance_name_map: HashMap<ArcStr, InstanceId>,
    elements: Vec<Element<L>>,
    ports: IndexMap<ArcStr, Port<L>>,
    info: Info,
}

/// The kind of connection a port represents.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    #[default]
    Electrical,
    Optical,
    Placement,
}

/// A location at which this cell should be connected.
///
/// The port faces outward along `orientation`: a port with
/// [`Rotation::R180`] sits on the west side of a cell.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Port<L> {
    center: Point,
    width: i64,
    orientation: Rotation,
    layer: L,
    port_type: PortType,
}

/// A primitive layout element.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Element<L> {
    /// A primitive layout shape.
    Shape(Shape<L>),
    /// A primitive text annotation.
    Text(Text<L>),
}

/// A primitive layout shape consisting of a layer and a geometric shape.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Shape<L> {
    layer: L,
    shape: geometry::shape::Shape,
}

/// A primitive text annotation consisting of a layer, string, and location.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Text<L> {
    layer: L,
    text: ArcStr,
    trans: Transformation,
}

#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    child: CellId,
    name: ArcStr,
    trans: Transformation,
}

impl<L> Default for LibraryBuilder<L> {
    fn default() -> Self {
        Self {
            cell_id: Id::new(),
            names: Default::default(),
            name_map: Default::default(),
            cells: Default::default(),
        }
    }
}

impl<L> LibraryBuilder<L> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a cell, renaming it if its name is already taken.
    pub fn add_cell(&mut self, mut cell: Cell<L>) -> CellId {
        let id = self.cell_id.alloc();
        let name = self.names.assign_name(id, &cell.name);
        if name != cell.name {
            tracing::debug!(requested = %cell.name, assigned = %name, "renamed cell to avoid a name collision");
        }
        cell.name = name;
        self.name_map.insert(cell.name.clone(), id);
        self.cells.insert(id, cell);
        id
    }

    /// Gets the cell with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no cell has the given ID.
    pub fn cell(&self, id: CellId) -> &Cell<L> {
        self.cells.get(&id).unwrap()
    }

    pub fn try_cell(&self, id: CellId) -> Option<&Cell<L>> {
        self.cells.get(&id)
    }

    /// Gets the cell with the given name.
    ///
    /// # Panics
    ///
    /// Panics if no cell has the given name.
    pub fn cell_named(&self, name: &str) -> &Cell<L> {
        self.cell(self.cell_id_named(name))
    }

    pub fn try_cell_named(&self, name: &str) -> Option<&Cell<L>> {
        self.try_cell(*self.name_map.get(name)?)
    }

    /// Gets the cell ID corresponding to the given name.
    ///
    /// # Panics
    ///
    /// Panics if no cell has the given name.
    /// For a non-panicking alternative, see [`try_cell_id_named`](LibraryBuilder::try_cell_id_named).
    pub fn cell_id_named(&self, name: &str) -> CellId {
        match self.name_map.get(name) {
            Some(&cell) => cell,
            None => {
                tracing::error!("no cell named `{}`", name);
                panic!("no cell named `{}`", name);
            }
        }
    }

    /// Gets the cell ID corresponding to the given name.
    pub fn try_cell_id_named(&self, name: &str) -> Option<CellId> {
        self.name_map.get(name).copied()
    }

    /// Iterates over the `(id, cell)` pairs in this library.
    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell<L>)> {
        self.cells.iter().map(|(id, cell)| (*id, cell))
    }

    /// The number of cells in the library.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns cell IDs in topological order: every cell comes after the cells it instantiates.
    pub fn topological_order(&self) -> Vec<CellId> {
        let mut state = IndexSet::new();
        for (cell, _) in self.cells() {
            self.dfs_postorder(cell, &mut state);
        }
        state.into_iter().collect()
    }

    fn dfs_postorder(&self, id: CellId, state: &mut IndexSet<CellId>) {
        if state.contains(&id) {
            return;
        }

        let cell = self.cell(id);
        for (_, inst) in cell.instances() {
            self.dfs_postorder(inst.child(), state);
        }
        state.insert(id);
    }

    /// The bounding box of a cell, including all of its descendants.
    pub fn cell_bbox(&self, id: CellId) -> Option<Rect> {
        let cell = self.cell(id);
        let mut bbox = cell.bbox();
        for (_, inst) in cell.instances() {
            let child = self
                .cell_bbox(inst.child())
                .map(|r| r.transform(inst.transformation()));
            bbox = [bbox, child].bbox();
        }
        bbox
    }

    /// Converts every layer in the library with `f`, keeping cell IDs and names.
    pub fn map_layers<L2>(self, mut f: impl FnMut(&L) -> L2) -> LibraryBuilder<L2> {
        let result: std::result::Result<_, std::convert::Infallible> =
            self.try_map_layers(|l| Ok(f(l)));
        match result {
            Ok(lib) => lib,
            Err(e) => match e {},
        }
    }

    /// Converts every layer in the library with `f`, stopping at the first error.
    pub fn try_map_layers<L2, E>(
        self,
        mut f: impl FnMut(&L) -> std::result::Result<L2, E>,
    ) -> std::result::Result<LibraryBuilder<L2>, E> {
        let mut cells = IndexMap::with_capacity(self.cells.len());
        for (id, cell) in self.cells {
            cells.insert(id, cell.try_map_layers(&mut f)?);
        }
        Ok(LibraryBuilder {
            cell_id: self.cell_id,
            cells,
            name_map: self.name_map,
            names: self.names,
        })
    }

    /// Checks that every instance refers to a cell in this library.
    pub fn build(self) -> Result<Library<L>> {
        for (_, cell) in self.cells() {
            for (_, inst) in cell.instances() {
                if !self.cells.contains_key(&inst.child) {
                    return Err(LayirError::DanglingInstance {
                        cell: cell.name.clone(),
                    });
                }
            }
        }
        Ok(Library(self))
    }
}

impl<L> Deref for Library<L> {
    type Target = LibraryBuilder<L>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<L> Library<L> {
    /// Converts every layer in the library with `f`.
    pub fn map_layers<L2>(self, f: impl FnMut(&L) -> L2) -> Library<L2> {
        Library(self.0.map_layers(f))
    }

    /// Converts every layer in the library with `f`, stopping at the first error.
    pub fn try_map_layers<L2, E>(
        self,
        f: impl FnMut(&L) -> std::result::Result<L2, E>,
    ) -> std::result::Result<Library<L2>, E> {
        Ok(Library(self.0.try_map_layers(f)?))
    }

    /// Returns the underlying builder, allowing further cells to be added.
    pub fn into_builder(self) -> LibraryBuilder<L> {
        self.0
    }
}

impl<L> Cell<L> {
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            instance_id: Id::new(),
            instances: Default::default(),
            instance_name_map: Default::default(),
            elements: Default::default(),
            ports: Default::default(),
            info: Default::default(),
        }
    }

    /// The name of the cell.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Iterate over the ports of this cell, in insertion order.
    #[inline]
    pub fn ports(&self) -> impl Iterator<Item = (&ArcStr, &Port<L>)> {
        self.ports.iter()
    }

    /// Adds a port, failing if a port with the same name already exists.
    pub fn add_port(&mut self, name: impl Into<ArcStr>, port: Port<L>) -> Result<()> {
        let name = name.into();
        if self.ports.contains_key(&name) {
            return Err(LayirError::DuplicatePort {
                cell: self.name.clone(),
                port: name,
            });
        }
        self.ports.insert(name, port);
        Ok(())
    }

    /// Get a port of this cell by name.
    ///
    /// # Panics
    ///
    /// Panics if the provided port does not exist.
    #[inline]
    pub fn port(&self, name: &str) -> &Port<L> {
        self.try_port(name).unwrap()
    }

    /// Get a port of this cell by name.
    #[inline]
    pub fn try_port(&self, name: &str) -> Option<&Port<L>> {
        self.ports.get(name)
    }

    /// Get the instance associated with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no instance with the given ID exists.
    #[inline]
    pub fn instance(&self, id: InstanceId) -> &Instance {
        self.instances.get(&id).unwrap()
    }

    /// Get the instance associated with the given ID.
    #[inline]
    pub fn try_instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(&id)
    }

    /// Gets the instance with the given name.
    pub fn try_instance_named(&self, name: &str) -> Option<&Instance> {
        self.try_instance(*self.instance_name_map.get(name)?)
    }

    /// Add the given instance to the cell.
    pub fn add_instance(&mut self, instance: Instance) -> Result<InstanceId> {
        if self.instance_name_map.contains_key(&instance.name) {
            return Err(LayirError::DuplicateInstance {
                cell: self.name.clone(),
                inst: instance.name,
            });
        }
        let id = self.instance_id.alloc();
        self.instance_name_map.insert(instance.name.clone(), id);
        self.instances.insert(id, instance);
        Ok(id)
    }

    /// Iterate over the instances of this cell.
    #[inline]
    pub fn instances(&self) -> impl Iterator<Item = (InstanceId, &Instance)> {
        self.instances.iter().map(|x| (*x.0, x.1))
    }

    pub fn add_element(&mut self, element: impl Into<Element<L>>) {
        self.elements.push(element.into())
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element<L>> {
        self.elements.iter()
    }

    /// Iterates over the shapes (but not texts) drawn directly in this cell.
    pub fn shapes(&self) -> impl Iterator<Item = &Shape<L>> {
        self.elements.iter().filter_map(|e| match e {
            Element::Shape(s) => Some(s),
            Element::Text(_) => None,
        })
    }

    #[inline]
    pub fn info(&self) -> &Info {
        &self.info
    }

    #[inline]
    pub fn info_mut(&mut self) -> &mut Info {
        &mut self.info
    }

    fn try_map_layers<L2, E>(
        self,
        f: &mut impl FnMut(&L) -> std::result::Result<L2, E>,
    ) -> std::result::Result<Cell<L2>, E> {
        let mut elements = Vec::with_capacity(self.elements.len());
        for elt in self.elements {
            let layer = f(elt.layer())?;
            elements.push(elt.with_layer(layer));
        }
        let mut ports = IndexMap::with_capacity(self.ports.len());
        for (name, port) in self.ports {
            let layer = f(&port.layer)?;
            ports.insert(name, port.with_layer(layer));
        }
        Ok(Cell {
            name: self.name,
            instance_id: self.instance_id,
            instances: self.instances,
            instance_name_map: self.instance_name_map,
            elements,
            ports,
            info: self.info,
        })
    }
}

impl<L> Bbox for Cell<L> {
    /// The bounding box of the shapes drawn directly in this cell.
    ///
    /// Use [`LibraryBuilder::cell_bbox`] to include instances.
    fn bbox(&self) -> Option<Rect> {
        self.shapes()
            .fold(None, |acc, s| [acc, s.shape.bbox()].bbox())
    }
}

impl<L> Port<L> {
    pub fn new(center: Point, width: i64, orientation: Rotation, layer: L) -> Self {
        Self {
            center,
            width,
            orientation,
            layer,
            port_type: PortType::Electrical,
        }
    }

    pub fn with_port_type(mut self, port_type: PortType) -> Self {
        self.port_type = port_type;
        self
    }

    #[inline]
    pub fn center(&self) -> Point {
        self.center
    }

    #[inline]
    pub fn width(&self) -> i64 {
        self.width
    }

    #[inline]
    pub fn orientation(&self) -> Rotation {
        self.orientation
    }

    #[inline]
    pub fn layer(&self) -> &L {
        &self.layer
    }

    #[inline]
    pub fn port_type(&self) -> PortType {
        self.port_type
    }

    pub fn with_layer<L2>(self, layer: L2) -> Port<L2> {
        Port {
            center: self.center,
            width: self.width,
            orientation: self.orientation,
            layer,
            port_type: self.port_type,
        }
    }

    /// The port as seen from a parent cell that instantiates its cell with `trans`.
    pub fn transform(mut self, trans: Transformation) -> Self {
        let dir = match self.orientation {
            Rotation::R0 => Point::new(1, 0),
            Rotation::R90 => Point::new(0, 1),
            Rotation::R180 => Point::new(-1, 0),
            Rotation::R270 => Point::new(0, -1),
        };
        let dir = trans.apply_point(dir) - trans.offset_point();
        self.orientation = match (dir.x, dir.y) {
            (1, 0) => Rotation::R0,
            (0, 1) => Rotation::R90,
            (-1, 0) => Rotation::R180,
            _ => Rotation::R270,
        };
        self.center = trans.apply_point(self.center);
        self
    }
}

impl<L> Element<L> {
    pub fn layer(&self) -> &L {
        match self {
            Self::Shape(s) => s.layer(),
            Self::Text(t) => t.layer(),
        }
    }

    pub fn with_layer<L2>(self, layer: L2) -> Element<L2> {
        match self {
            Self::Shape(s) => Element::Shape(s.with_layer(layer)),
            Self::Text(t) => Element::Text(t.with_layer(layer)),
        }
    }
}

impl<L> From<Shape<L>> for Element<L> {
    fn from(value: Shape<L>) -> Self {
        Self::Shape(value)
    }
}

impl<L> From<Text<L>> for Element<L> {
    fn from(value: Text<L>) -> Self {
        Self::Text(value)
    }
}

impl<L> Shape<L> {
    #[inline]
    pub fn new(layer: L, shape: impl Into<geometry::shape::Shape>) -> Self {
        Self {
            layer,
            shape: shape.into(),
        }
    }

    #[inline]
    pub fn layer(&self) -> &L {
        &self.layer
    }

    #[inline]
    pub fn shape(&self) -> &geometry::shape::Shape {
        &self.shape
    }

    pub fn with_layer<L2>(self, layer: L2) -> Shape<L2> {
        Shape {
            layer,
            shape: self.shape,
        }
    }
}

impl<L> Bbox for Shape<L> {
    fn bbox(&self) -> Option<Rect> {
        self.shape.bbox()
    }
}

impl<L> Text<L> {
    #[inline]
    pub fn new(layer: L, text: impl Into<ArcStr>) -> Self {
        Self {
            layer,
            text: text.into(),
            trans: Default::default(),
        }
    }

    #[inline]
    pub fn with_transformation(
        layer: L,
        text: impl Into<ArcStr>,
        trans: impl Into<Transformation>,
    ) -> Self {
        Self {
            layer,
            text: text.into(),
            trans: trans.into(),
        }
    }

    #[inline]
    pub fn layer(&self) -> &L {
        &self.layer
    }

    #[inline]
    pub fn text(&self) -> &ArcStr {
        &self.text
    }

    #[inline]
    pub fn transformation(&self) -> Transformation {
        self.trans
    }

    pub fn with_layer<L2>(self, layer: L2) -> Text<L2> {
        Text {
            layer,
            text: self.text,
            trans: self.trans,
        }
    }
}

impl Instance {
    pub fn new(child: CellId, name: impl Into<ArcStr>) -> Self {
        Self {
            child,
            name: name.into(),
            trans: Default::default(),
        }
    }

    pub fn with_transformation(
        child: CellId,
        name: impl Into<ArcStr>,
        transformation: impl Into<Transformation>,
    ) -> Self {
        Self {
            child,
            name: name.into(),
            trans: transformation.into(),
        }
    }

    #[inline]
    pub fn child(&self) -> CellId {
        self.child
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn transformation(&self) -> Transformation {
        self.trans
    }
}
