use arcstr::ArcStr;
use gds::{
    GdsBoundary, GdsElement, GdsLibrary, GdsPoint, GdsResult, GdsStrans, GdsStruct, GdsStructRef,
    GdsTextElem, GdsUnits,
};
use geometry::prelude::*;
use layir::{Cell, Element, Instance, Library, Port, Text};

use crate::GdsLayer;

pub struct GdsExportOpts {
    /// Name of the GDS library.
    pub name: ArcStr,
    /// Library units; defaults to 1 nm database units.
    pub units: Option<GdsUnits>,
    /// Whether each port also emits a text label with its name on the port layer.
    pub port_labels: bool,
}

impl GdsExportOpts {
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            units: None,
            port_labels: true,
        }
    }
}

/// Converts a library to GDS, writing cells children-first.
pub fn export_gds(lib: &Library<GdsLayer>, opts: GdsExportOpts) -> GdsResult<GdsLibrary> {
    let exporter = GdsExporter { opts, lib };
    exporter.export()
}

struct GdsExporter<'a> {
    opts: GdsExportOpts,
    lib: &'a Library<GdsLayer>,
}

impl GdsExporter<'_> {
    fn export(self) -> GdsResult<GdsLibrary> {
        let mut gds = if let Some(units) = self.opts.units {
            GdsLibrary::with_units(self.opts.name.clone(), units)
        } else {
            GdsLibrary::new(self.opts.name.clone())
        };
        for id in self.lib.topological_order() {
            let cell = self.lib.cell(id);
            let strukt = self.export_cell(cell)?;
            gds.structs.push(strukt);
        }
        tracing::debug!(
            library = %gds.name,
            cells = gds.structs.len(),
            "exported layout library to GDS"
        );
        Ok(gds)
    }

    fn export_cell(&self, cell: &Cell<GdsLayer>) -> GdsResult<GdsStruct> {
        let mut gcell = GdsStruct::new(cell.name().clone());
        for elt in cell.elements() {
            gcell.elems.push(export_element(elt)?);
        }
        if self.opts.port_labels {
            for (name, port) in cell.ports() {
                gcell.elems.push(export_port_label(name, port)?);
            }
        }
        for (_, inst) in cell.instances() {
            gcell.elems.push(export_instance(self.lib, inst)?);
        }
        Ok(gcell)
    }
}

fn export_instance(lib: &Library<GdsLayer>, inst: &Instance) -> GdsResult<GdsElement> {
    let cell = lib.cell(inst.child());
    let trans = inst.transformation();
    Ok(GdsStructRef {
        name: cell.name().clone(),
        xy: export_point(trans.offset_point())?,
        strans: export_strans(trans),
    }
    .into())
}

fn export_element(elt: &Element<GdsLayer>) -> GdsResult<GdsElement> {
    match elt {
        Element::Shape(shape) => Ok(GdsBoundary {
            layer: shape.layer().0 as i16,
            datatype: shape.layer().1 as i16,
            xy: export_outline(&shape.shape().to_points())?,
        }
        .into()),
        Element::Text(text) => export_text(text),
    }
}

fn export_point(p: Point) -> GdsResult<GdsPoint> {
    GdsPoint::try_new(p.x, p.y)
}

/// Converts a vertex list to a closed GDS outline.
fn export_outline(points: &[Point]) -> GdsResult<Vec<GdsPoint>> {
    let mut xy = points
        .iter()
        .map(|p| export_point(*p))
        .collect::<GdsResult<Vec<_>>>()?;
    if let Some(&first) = xy.first() {
        xy.push(first);
    }
    Ok(xy)
}

fn export_text(text: &Text<GdsLayer>) -> GdsResult<GdsElement> {
    Ok(GdsTextElem {
        string: text.text().clone(),
        layer: text.layer().0 as i16,
        texttype: text.layer().1 as i16,
        xy: export_point(text.transformation().offset_point())?,
        strans: export_strans(text.transformation()),
    }
    .into())
}

fn export_port_label(name: &ArcStr, port: &Port<GdsLayer>) -> GdsResult<GdsElement> {
    Ok(GdsTextElem {
        string: name.clone(),
        layer: port.layer().0 as i16,
        texttype: port.layer().1 as i16,
        xy: export_point(port.center())?,
        strans: None,
    }
    .into())
}

fn export_strans(trans: Transformation) -> Option<GdsStrans> {
    let reflected = trans.reflects_vert();
    let rotation = trans.rotation();
    if !reflected && rotation == Rotation::R0 {
        return None;
    }
    Some(GdsStrans {
        reflected,
        angle: (rotation != Rotation::R0).then(|| rotation.degrees()),
        ..Default::default()
    })
}
