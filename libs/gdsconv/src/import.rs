use std::collections::{HashMap, HashSet};

use arcstr::ArcStr;
use gds::{GdsLibrary, GdsUnits};
use geometry::prelude::*;
use layir::{Cell, CellId, Instance, LayirError, Library, LibraryBuilder, Shape, Text};
use thiserror::Error;
use tracing::{span, Level};

use crate::GdsLayer;

#[derive(Debug, Default, Clone, Copy)]
pub struct GdsImportOpts {
    /// Expected library units; a mismatch is an error.
    pub units: Option<GdsUnits>,
}

/// An error encountered while converting a GDS library to LayIR.
#[derive(Debug, Error)]
pub enum GdsImportError {
    #[error("GDS database unit {found} m does not match the expected {expected} m")]
    UnitsMismatch { found: f64, expected: f64 },
    #[error("duplicate cell name: `{0}`")]
    DuplicateCell(ArcStr),
    #[error("reference to undefined cell `{0}`")]
    MissingCell(ArcStr),
    #[error("invalid boundary in cell `{cell}`: {reason}")]
    InvalidBoundary { cell: ArcStr, reason: &'static str },
    #[error("unsupported path in cell `{cell}`: {reason}")]
    UnsupportedPath { cell: ArcStr, reason: &'static str },
    #[error("unsupported transformation in cell `{cell}`: {reason}")]
    UnsupportedTransformation { cell: ArcStr, reason: &'static str },
    #[error("negative layer or datatype number {0}")]
    InvalidLayer(i16),
    #[error(transparent)]
    Layir(#[from] LayirError),
}

type Result<T> = std::result::Result<T, GdsImportError>;

pub fn import_gds(lib: &GdsLibrary, opts: GdsImportOpts) -> Result<Library<GdsLayer>> {
    let importer = GdsImporter::new(lib, opts);
    importer.import()
}

/// An importer for GDS files.
pub struct GdsImporter<'a> {
    lib: LibraryBuilder<GdsLayer>,
    gds: &'a GdsLibrary,
    opts: GdsImportOpts,
}

impl<'a> GdsImporter<'a> {
    /// Creates a new GDS importer.
    pub fn new(gds: &'a GdsLibrary, opts: GdsImportOpts) -> Self {
        Self {
            lib: LibraryBuilder::new(),
            gds,
            opts,
        }
    }

    /// Imports a [`gds::GdsLibrary`].
    pub fn import(mut self) -> Result<Library<GdsLayer>> {
        self.check_units()?;
        for strukt in GdsDepOrder::new(self.gds).total_order()? {
            self.import_and_add(strukt)?;
        }
        Ok(self.lib.build()?)
    }

    /// Checks that the database units match the expected units, if any.
    fn check_units(&self) -> Result<()> {
        let found = self.gds.units.db_unit();
        if let Some(expected) = &self.opts.units {
            let expected = expected.db_unit();
            if (found - expected).abs() / expected > 1e-3 {
                return Err(GdsImportError::UnitsMismatch { found, expected });
            }
        }
        Ok(())
    }

    /// Imports and adds a cell, failing if its name is already defined.
    fn import_and_add(&mut self, strukt: &gds::GdsStruct) -> Result<CellId> {
        let name = &strukt.name;
        if self.lib.try_cell_id_named(name).is_some() {
            return Err(GdsImportError::DuplicateCell(name.clone()));
        }

        let mut cell = Cell::new(name);
        self.import_gds_struct(strukt, &mut cell)?;
        Ok(self.lib.add_cell(cell))
    }

    fn import_gds_struct(&self, strukt: &gds::GdsStruct, cell: &mut Cell<GdsLayer>) -> Result<()> {
        let span = span!(Level::INFO, "cell", name=%cell.name());
        let _guard = span.enter();

        for elem in &strukt.elems {
            use gds::GdsElement::*;
            match elem {
                GdsBoundary(x) => cell.add_element(self.import_boundary(&strukt.name, x)?),
                GdsPath(x) => cell.add_element(self.import_path(&strukt.name, x)?),
                GdsStructRef(x) => {
                    let inst = self.import_instance(cell, x)?;
                    cell.add_instance(inst)?;
                }
                GdsArrayRef(x) => {
                    for inst in self.import_instance_array(cell, x)? {
                        cell.add_instance(inst)?;
                    }
                }
                GdsTextElem(x) => cell.add_element(self.import_text_elem(&strukt.name, x)?),
            };
        }
        Ok(())
    }

    fn import_boundary(&self, cell: &ArcStr, x: &gds::GdsBoundary) -> Result<Shape<GdsLayer>> {
        let mut pts = import_points(&x.xy);
        let invalid = |reason| GdsImportError::InvalidBoundary {
            cell: cell.clone(),
            reason,
        };
        if pts.len() < 4 {
            return Err(invalid("a boundary needs at least three distinct points"));
        }
        if pts.first() != pts.last() {
            return Err(invalid("last point must equal the first point"));
        }
        pts.pop();
        let layer = import_layer(x.layer, x.datatype)?;
        Ok(Shape::new(layer, shape_from_points(pts)))
    }

    /// Paths become polygons; half-width end extensions (type 2) are applied first.
    fn import_path(&self, cell: &ArcStr, x: &gds::GdsPath) -> Result<Shape<GdsLayer>> {
        let unsupported = |reason| GdsImportError::UnsupportedPath {
            cell: cell.clone(),
            reason,
        };
        let width = x.width.ok_or_else(|| unsupported("path width must be specified"))? as i64;
        let mut pts = import_points(&x.xy);
        if pts.len() < 2 {
            return Err(unsupported("a path needs at least two points"));
        }
        match x.path_type {
            None | Some(0) => {}
            Some(2) => {
                let n = pts.len();
                pts[0] = extend(pts[1], pts[0], width / 2);
                pts[n - 1] = extend(pts[n - 2], pts[n - 1], width / 2);
            }
            Some(_) => return Err(unsupported("only flush and square path ends are supported")),
        }
        let poly = Polygon::from_path(&pts, width);
        let layer = import_layer(x.layer, x.datatype)?;
        Ok(Shape::new(layer, shape_from_points(poly.into_points())))
    }

    fn import_text_elem(&self, cell: &ArcStr, x: &gds::GdsTextElem) -> Result<Text<GdsLayer>> {
        let loc = import_point(&x.xy);
        let trans = import_transformation(cell, loc, x.strans.as_ref())?;
        let layer = import_layer(x.layer, x.texttype)?;
        Ok(Text::with_transformation(layer, x.string.clone(), trans))
    }

    /// Imports a [`gds::GdsStructRef`] as an instance named `{child}_{n}`,
    /// with `n` the first index not yet used in `cell`.
    fn import_instance(&self, cell: &Cell<GdsLayer>, sref: &gds::GdsStructRef) -> Result<Instance> {
        let child = self.child_id(&sref.name)?;
        let loc = import_point(&sref.xy);
        Ok(Instance::with_transformation(
            child,
            unique_instance_name(cell, &sref.name),
            import_transformation(cell.name(), loc, sref.strans.as_ref())?,
        ))
    }

    /// Imports a rectangular [`gds::GdsArrayRef`] as individual instances
    /// named `{name}_{col}_{row}`.
    fn import_instance_array(
        &self,
        cell: &Cell<GdsLayer>,
        aref: &gds::GdsArrayRef,
    ) -> Result<Vec<Instance>> {
        let child = self.child_id(&aref.name)?;
        let [p0, p1, p2] = aref.xy.map(|p| import_point(&p));
        if p0.y != p1.y || p0.x != p2.x {
            return Err(GdsImportError::UnsupportedTransformation {
                cell: cell.name().clone(),
                reason: "non-rectangular instance array",
            });
        }
        let cols = i64::from(aref.cols.max(1));
        let rows = i64::from(aref.rows.max(1));
        let xstep = (p1.x - p0.x) / cols;
        let ystep = (p2.y - p0.y) / rows;

        let mut insts = Vec::with_capacity((cols * rows) as usize);
        for ix in 0..cols {
            for iy in 0..rows {
                let loc = Point::new(p0.x + ix * xstep, p0.y + iy * ystep);
                let mut name = arcstr::format!("{}_{}_{}", aref.name, ix, iy);
                if cell.try_instance_named(&name).is_some() {
                    name = unique_instance_name(cell, &name);
                }
                insts.push(Instance::with_transformation(
                    child,
                    name,
                    import_transformation(cell.name(), loc, aref.strans.as_ref())?,
                ));
            }
        }
        Ok(insts)
    }

    fn child_id(&self, name: &ArcStr) -> Result<CellId> {
        self.lib
            .try_cell_id_named(name)
            .ok_or_else(|| GdsImportError::MissingCell(name.clone()))
    }
}

/// The first free name of the form `{base}_{n}` in `cell`.
fn unique_instance_name(cell: &Cell<GdsLayer>, base: &str) -> ArcStr {
    (0usize..)
        .map(|n| arcstr::format!("{base}_{n}"))
        .find(|name| cell.try_instance_named(name).is_none())
        .unwrap_or_else(|| ArcStr::from(base))
}

fn import_point(p: &gds::GdsPoint) -> Point {
    Point::new(p.x.into(), p.y.into())
}

fn import_points(pts: &[gds::GdsPoint]) -> Vec<Point> {
    pts.iter().map(import_point).collect()
}

fn import_layer(layer: i16, datatype: i16) -> Result<GdsLayer> {
    let layer = u16::try_from(layer).map_err(|_| GdsImportError::InvalidLayer(layer))?;
    let datatype = u16::try_from(datatype).map_err(|_| GdsImportError::InvalidLayer(datatype))?;
    Ok(GdsLayer(layer, datatype))
}

/// Moves `to` further away from `from` by `amount` along their (Manhattan) segment.
fn extend(from: Point, to: Point, amount: i64) -> Point {
    let d = to - from;
    Point::new(to.x + d.x.signum() * amount, to.y + d.y.signum() * amount)
}

/// Four-point axis-aligned outlines become rectangles; anything else is a polygon.
fn shape_from_points(pts: Vec<Point>) -> geometry::shape::Shape {
    let is_rect = pts.len() == 4
        && ((pts[0].x == pts[1].x
            && pts[1].y == pts[2].y
            && pts[2].x == pts[3].x
            && pts[3].y == pts[0].y)
            || (pts[0].y == pts[1].y
                && pts[1].x == pts[2].x
                && pts[2].y == pts[3].y
                && pts[3].x == pts[0].x));
    if is_rect {
        Rect::new(pts[0], pts[2]).into()
    } else {
        Polygon::from_verts(pts).into()
    }
}

fn import_transformation(
    cell: &ArcStr,
    loc: Point,
    strans: Option<&gds::GdsStrans>,
) -> Result<Transformation> {
    let Some(strans) = strans else {
        return Ok(Transformation::translate(loc.x, loc.y));
    };
    let unsupported = |reason| GdsImportError::UnsupportedTransformation {
        cell: cell.clone(),
        reason,
    };
    if strans.abs_mag || strans.abs_angle {
        return Err(unsupported("absolute magnitude/absolute angle"));
    }
    if strans.mag.is_some_and(|m| (m - 1.).abs() > 1e-9) {
        return Err(unsupported("magnification"));
    }
    let rotation = Rotation::try_from(strans.angle.unwrap_or_default())
        .map_err(|_| unsupported("rotations must be in 90 degree increments"))?;
    Ok(Transformation::from_opts(loc, strans.reflected, rotation))
}

/// A helper for retrieving GDS structs in dependency order.
///
/// Each item in the ordered return value is guaranteed *not* to instantiate any item which comes later.
#[derive(Debug)]
struct GdsDepOrder<'a> {
    all: &'a [gds::GdsStruct],
    strukts: HashMap<ArcStr, &'a gds::GdsStruct>,
    order: Vec<&'a gds::GdsStruct>,
    seen: HashSet<ArcStr>,
}

impl<'a> GdsDepOrder<'a> {
    fn new(gdslib: &'a GdsLibrary) -> Self {
        let strukts = gdslib.structs.iter().map(|s| (s.name.clone(), s)).collect();
        Self {
            all: &gdslib.structs,
            strukts,
            order: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn total_order(mut self) -> Result<Vec<&'a gds::GdsStruct>> {
        for s in self.all {
            if !std::ptr::eq(self.strukts[&s.name], s) {
                return Err(GdsImportError::DuplicateCell(s.name.clone()));
            }
            self.push(s)?;
        }
        Ok(self.order)
    }

    /// Adds all of `strukt`'s dependencies, and then `strukt` itself.
    fn push(&mut self, strukt: &'a gds::GdsStruct) -> Result<()> {
        if self.seen.insert(strukt.name.clone()) {
            for elem in &strukt.elems {
                let child = match elem {
                    gds::GdsElement::GdsStructRef(x) => &x.name,
                    gds::GdsElement::GdsArrayRef(x) => &x.name,
                    _ => continue,
                };
                let child = *self
                    .strukts
                    .get(child)
                    .ok_or_else(|| GdsImportError::MissingCell(child.clone()))?;
                self.push(child)?;
            }
            self.order.push(strukt);
        }
        Ok(())
    }
}
