//! Layout generation for SG13G2.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use arcstr::ArcStr;
use gds::{GdsLibrary, GdsUnits};
use gdsconv::export::{export_gds, GdsExportOpts};
use gdsconv::GdsLayer;
use geometry::prelude::*;
use layir::{Cell, CellId, Info, Instance, InstanceId, Library, LibraryBuilder, Port, Shape, Text};
use serde::Serialize;
use tracing::{span, Level};

use crate::layers::LayerPurpose;
use crate::rules::DesignRules;
use crate::units::clean;
use crate::Result;

/// The units used for importing/exporting GDS libraries.
pub const GDS_UNITS: GdsUnits = GdsUnits::new(1e-3, 1e-9);

/// A parametric cell.
pub trait Block {
    /// A name for this parametrization of the cell.
    ///
    /// Cells with equal names are generated once per [`Context`].
    fn name(&self) -> ArcStr;
}

/// A block with a layout view.
pub trait Layout: Block {
    /// Draws the layout of this block into `cell`.
    fn layout(&self, cell: &mut CellBuilder<'_>) -> Result<()>;
}

/// Generates and caches cells.
#[derive(Debug, Default)]
pub struct Context {
    lib: LibraryBuilder<LayerPurpose>,
    cache: HashMap<ArcStr, CellId>,
    rules: DesignRules,
}

/// A cell under construction.
pub struct CellBuilder<'a> {
    ctx: &'a mut Context,
    cell: Cell<LayerPurpose>,
}

impl Context {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// The design rules used by generators.
    #[inline]
    pub fn rules(&self) -> &DesignRules {
        &self.rules
    }

    /// Generates the layout of `block`, returning the cached cell if one with
    /// the same name was already generated.
    pub fn generate<T: Layout + ?Sized>(&mut self, block: &T) -> Result<CellId> {
        let name = block.name();
        if let Some(id) = self.cache.get(&name) {
            return Ok(*id);
        }
        let span = span!(Level::INFO, "generating layout", block = %name);
        let _guard = span.enter();

        let mut builder = CellBuilder {
            cell: Cell::new(name.clone()),
            ctx: &mut *self,
        };
        block.layout(&mut builder)?;
        let cell = builder.cell;
        tracing::debug!(
            shapes = cell.elements().count(),
            instances = cell.instances().count(),
            ports = cell.ports().count(),
            "generated cell"
        );
        let id = self.lib.add_cell(cell);
        self.cache.insert(name, id);
        Ok(id)
    }

    /// The generated cell with the given ID.
    pub fn cell(&self, id: CellId) -> &Cell<LayerPurpose> {
        self.lib.cell(id)
    }

    /// All cells generated so far.
    pub fn library(&self) -> &LibraryBuilder<LayerPurpose> {
        &self.lib
    }

    /// The bounding box of a cell including its instances.
    pub fn bbox(&self, id: CellId) -> Option<Rect> {
        self.lib.cell_bbox(id)
    }

    /// A library holding `top` and every cell it instantiates.
    pub fn library_for(&self, top: CellId) -> Result<Library<LayerPurpose>> {
        let mut reachable = HashSet::new();
        let mut stack = vec![top];
        while let Some(id) = stack.pop() {
            if reachable.insert(id) {
                stack.extend(self.lib.cell(id).instances().map(|(_, inst)| inst.child()));
            }
        }
        let mut olib = LibraryBuilder::new();
        for id in self.lib.topological_order() {
            if !reachable.contains(&id) {
                continue;
            }
            let cell = self.lib.cell(id);
            let mut ocell = Cell::new(cell.name().clone());
            for elt in cell.elements() {
                ocell.add_element(elt.clone());
            }
            for (_, inst) in cell.instances() {
                let name = self.lib.cell(inst.child()).name();
                let child_id = olib.cell_id_named(name);
                ocell.add_instance(Instance::with_transformation(
                    child_id,
                    inst.name().clone(),
                    inst.transformation(),
                ))?;
            }
            for (name, port) in cell.ports() {
                ocell.add_port(name.clone(), port.clone())?;
            }
            *ocell.info_mut() = cell.info().clone();
            olib.add_cell(ocell);
        }
        Ok(olib.build()?)
    }

    /// Exports `top` and its children to an in-memory GDS library.
    pub fn export_gds(&self, top: CellId, opts: GdsExportOpts) -> Result<GdsLibrary> {
        let (lib, units) = to_gds(&self.library_for(top)?);
        let opts = GdsExportOpts {
            units: opts.units.or(Some(units)),
            ..opts
        };
        Ok(export_gds(&lib, opts)?)
    }

    /// Writes a layout to a GDS file.
    pub fn write_layout<T: Layout + ?Sized>(
        &mut self,
        block: &T,
        path: impl AsRef<Path>,
    ) -> Result<CellId> {
        let id = self.generate(block)?;
        let name = self.cell(id).name().clone();
        self.write_cell(id, GdsExportOpts::new(name), path)?;
        Ok(id)
    }

    /// Writes an already generated cell to a GDS file.
    pub fn write_cell(&self, id: CellId, opts: GdsExportOpts, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.export_gds(id, opts)?.save(path)?;
        tracing::debug!(cell = %self.cell(id).name(), ?path, "wrote GDS");
        Ok(())
    }
}

/// Convert an SG13G2 layout library to a GDS layout library.
///
/// Ports keep their pin sublayers, so port labels land on datatype 2.
pub fn to_gds(lib: &Library<LayerPurpose>) -> (Library<GdsLayer>, GdsUnits) {
    (lib.clone().map_layers(LayerPurpose::gds_layer), GDS_UNITS)
}

impl<'a> CellBuilder<'a> {
    /// The design rules used by generators.
    #[inline]
    pub fn rules(&self) -> &DesignRules {
        &self.ctx.rules
    }

    /// Draws a shape on the given layer.
    pub fn draw(&mut self, layer: impl Into<LayerPurpose>, shape: impl Into<geometry::shape::Shape>) {
        self.cell.add_element(Shape::new(layer.into(), shape));
    }

    /// Places a text label at `at`.
    pub fn label(&mut self, layer: impl Into<LayerPurpose>, text: impl Into<ArcStr>, at: Point) {
        self.cell.add_element(Text::with_transformation(
            layer.into(),
            text,
            Transformation::translate(at.x, at.y),
        ));
    }

    /// Adds an electrical port. The port is moved to the pin sublayer of `layer`.
    pub fn add_port(
        &mut self,
        name: impl Into<ArcStr>,
        center: Point,
        width: i64,
        orientation: Rotation,
        layer: impl Into<LayerPurpose>,
    ) -> Result<()> {
        let layer = layer.into().pin();
        self.cell
            .add_port(name, Port::new(center, width, orientation, layer))?;
        Ok(())
    }

    /// Generates a child cell.
    pub fn generate<T: Layout + ?Sized>(&mut self, block: &T) -> Result<CellId> {
        self.ctx.generate(block)
    }

    /// Instantiates a generated cell.
    pub fn instantiate(
        &mut self,
        child: CellId,
        name: impl Into<ArcStr>,
        trans: Transformation,
    ) -> Result<InstanceId> {
        Ok(self
            .cell
            .add_instance(Instance::with_transformation(child, name, trans))?)
    }

    /// A port of `child` as seen through an instance transformation.
    pub fn child_port(
        &self,
        child: CellId,
        port: &str,
        trans: Transformation,
    ) -> Option<Port<LayerPurpose>> {
        self.ctx
            .cell(child)
            .try_port(port)
            .map(|p| p.clone().transform(trans))
    }

    /// Re-exports a transformed child port under a new name.
    pub fn add_raw_port(&mut self, name: impl Into<ArcStr>, port: Port<LayerPurpose>) -> Result<()> {
        self.cell.add_port(name, port)?;
        Ok(())
    }

    /// Metadata attached to the cell.
    pub fn info_mut(&mut self) -> &mut Info {
        self.cell.info_mut()
    }

    /// The bounding box of the shapes drawn so far.
    pub fn bbox(&self) -> Option<Rect> {
        self.cell.bbox()
    }
}

/// Builds a cell name from a base name and the parameters that differ from their defaults.
///
/// Default parameters yield `base` itself. Otherwise each changed parameter
/// is appended as `_<key><value>`, with `.` written as `p` and `-` as `m`.
pub fn cell_name<P: Serialize + Default>(base: &str, params: &P) -> ArcStr {
    let (Ok(serde_json::Value::Object(values)), Ok(serde_json::Value::Object(defaults))) = (
        serde_json::to_value(params),
        serde_json::to_value(P::default()),
    ) else {
        return ArcStr::from(base);
    };
    let mut name = String::from(base);
    for (key, value) in values.iter() {
        if defaults.get(key) == Some(value) {
            continue;
        }
        name.push('_');
        name.push_str(key);
        name.push_str(&format_value(value));
    }
    ArcStr::from(name)
}

fn format_value(value: &serde_json::Value) -> String {
    use serde_json::Value;
    let s = match value {
        Value::Null => "none".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => {
                let f = clean(f);
                if f.fract() == 0. {
                    format!("{}", f as i64)
                } else {
                    format!("{f}")
                }
            }
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    s.replace('.', "p").replace('-', "m")
}
