use std::path::PathBuf;

use gds::{GdsElement, GdsLibrary, GdsUnits};
use geometry::prelude::*;
use layir::{Cell, Element, Instance, Library, LibraryBuilder, Port, Shape, Text};
use test_log::test;

use crate::{
    conv::{from_gds, labels, layers_used, FromGds},
    export::{export_gds, GdsExportOpts},
    import::{import_gds, GdsImportOpts},
    GdsLayer,
};

const BUILD_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/build");

#[inline]
fn get_path(test_name: &str, file_name: &str) -> PathBuf {
    PathBuf::from(BUILD_DIR).join(test_name).join(file_name)
}

fn gdslib() -> Library<GdsLayer> {
    let mut lib = LibraryBuilder::new();
    let mut bot = Cell::new("bot");
    bot.add_element(Shape::new(GdsLayer(1, 0), Rect::from_sides(0, 0, 100, 100)));
    bot.add_port(
        "p",
        Port::new(Point::new(50, 50), 100, Rotation::R0, GdsLayer(1, 2)),
    )
    .unwrap();
    let bot = lib.add_cell(bot);
    let mut mid1 = Cell::new("mid1");
    mid1.add_element(Shape::new(
        GdsLayer(2, 0),
        Polygon::from_verts(vec![
            Point::new(100, 0),
            Point::new(200, 0),
            Point::new(150, 100),
        ]),
    ));
    mid1.add_instance(Instance::new(bot, "xbot")).unwrap();
    let mid1 = lib.add_cell(mid1);
    let mut mid2 = Cell::new("mid2");
    mid2.add_element(Shape::new(GdsLayer(3, 0), Rect::from_sides(0, 0, 100, 100)));
    mid2.add_instance(Instance::with_transformation(
        bot,
        "xbot",
        Transformation::from_opts(Point::new(100, 0), true, Rotation::R270),
    ))
    .unwrap();
    let mid2 = lib.add_cell(mid2);
    let mut top = Cell::new("top");
    top.add_element(Shape::new(GdsLayer(4, 0), Rect::from_sides(0, 0, 200, 200)));
    top.add_element(Text::with_transformation(
        GdsLayer(4, 25),
        "note",
        Transformation::translate(10, 20),
    ));
    top.add_instance(Instance::with_transformation(
        mid1,
        "xmid1",
        Transformation::translate(0, 100),
    ))
    .unwrap();
    top.add_instance(Instance::new(mid2, "xmid2")).unwrap();
    lib.add_cell(top);
    lib.build().unwrap()
}

#[test]
fn test_export_layir_to_gds() {
    let lib = gdslib();
    let gds = export_gds(
        &lib,
        GdsExportOpts {
            name: "top".into(),
            units: Some(GdsUnits::new(1e-3, 1e-9)),
            port_labels: true,
        },
    )
    .unwrap();

    gds.save(get_path("test_export_layir_to_gds", "layout.gds"))
        .expect("failed to write gds");

    assert_eq!(gds.structs.len(), 4);
    assert_eq!(gds.structs[0].name, "bot");
    assert_eq!(gds.structs[3].name, "top");
    // A rectangle plus the port label.
    assert_eq!(gds.structs[0].elems.len(), 2);
    assert_eq!(gds.structs[1].elems.len(), 2);
    assert_eq!(gds.structs[2].elems.len(), 2);
    assert_eq!(gds.structs[3].elems.len(), 4);

    let GdsElement::GdsTextElem(label) = &gds.structs[0].elems[1] else {
        panic!("expected the port label");
    };
    assert_eq!(label.string, "p");
    assert_eq!((label.layer, label.texttype), (1, 2));
    assert_eq!((label.xy.x, label.xy.y), (50, 50));

    let GdsElement::GdsBoundary(triangle) = &gds.structs[1].elems[0] else {
        panic!("expected a boundary");
    };
    assert_eq!(triangle.xy.len(), 4);
    assert_eq!(triangle.xy[0], triangle.xy[3]);
}

#[test]
fn test_port_labels_can_be_disabled() {
    let lib = gdslib();
    let mut opts = GdsExportOpts::new("top");
    opts.port_labels = false;
    let gds = export_gds(&lib, opts).unwrap();
    assert_eq!(gds.structs[0].elems.len(), 1);
}

#[test]
fn test_gds_reimport() {
    let lib = gdslib();
    let gds = export_gds(&lib, GdsExportOpts::new("top")).unwrap();
    let path = get_path("test_gds_reimport", "layout.gds");
    gds.save(&path).expect("failed to save GDS");

    let rawlib = GdsLibrary::load(&path).expect("failed to parse GDS");
    let lib2 = import_gds(
        &rawlib,
        GdsImportOpts {
            units: Some(GdsUnits::new(1e-3, 1e-9)),
        },
    )
    .expect("failed to import to LayIR");

    let bot = lib2.cell_named("bot");
    let elems = bot.elements().collect::<Vec<_>>();
    assert_eq!(
        elems[0],
        &Element::Shape(Shape::new(GdsLayer(1, 0), Rect::from_sides(0, 0, 100, 100)))
    );
    assert_eq!(
        elems[1],
        &Element::Text(Text::with_transformation(
            GdsLayer(1, 2),
            "p",
            Transformation::translate(50, 50)
        ))
    );

    let mid2 = lib2.cell_named("mid2");
    let (_, inst) = mid2.instances().next().unwrap();
    assert_eq!(
        inst.transformation(),
        Transformation::from_opts(Point::new(100, 0), true, Rotation::R270)
    );
    assert_eq!(lib2.cell(inst.child()).name(), "bot");

    let mid1 = lib2.cell_named("mid1");
    assert!(mid1.elements().next().unwrap().layer() == &GdsLayer(2, 0));
    assert_eq!(
        lib2.cell_bbox(lib2.cell_id_named("top")),
        lib.cell_bbox(lib.cell_id_named("top"))
    );
}

#[test]
fn test_gds_import_invalid_units() {
    let lib = gdslib();
    let gds = export_gds(
        &lib,
        GdsExportOpts {
            name: "top".into(),
            units: Some(GdsUnits::new(1., 1e-6)),
            port_labels: true,
        },
    )
    .unwrap();
    import_gds(
        &gds,
        GdsImportOpts {
            units: Some(GdsUnits::new(1e-3, 1e-9)),
        },
    )
    .expect_err("should fail due to unit mismatch");
}

#[test]
fn test_import_missing_reference_fails() {
    let mut gds = export_gds(&gdslib(), GdsExportOpts::new("top")).unwrap();
    gds.structs.remove(0);
    assert!(import_gds(&gds, GdsImportOpts::default()).is_err());
}

#[test]
fn test_repeated_references_get_unique_names() {
    let mut lib = LibraryBuilder::new();
    let mut leaf = Cell::new("leaf");
    leaf.add_element(Shape::new(GdsLayer(1, 0), Rect::from_sides(0, 0, 10, 10)));
    let leaf = lib.add_cell(leaf);
    let mut top = Cell::new("top");
    top.add_instance(Instance::new(leaf, "xa")).unwrap();
    top.add_instance(Instance::with_transformation(
        leaf,
        "xb",
        Transformation::translate(100, 0),
    ))
    .unwrap();
    lib.add_cell(top);
    let lib = lib.build().unwrap();

    let gds = export_gds(&lib, GdsExportOpts::new("top")).unwrap();
    let lib2 = import_gds(&gds, GdsImportOpts::default()).unwrap();
    let top = lib2.cell_named("top");
    let names = top
        .instances()
        .map(|(_, inst)| inst.name().clone())
        .collect::<Vec<_>>();
    assert_eq!(names, ["leaf_0", "leaf_1"]);
    assert_eq!(
        lib2.cell_bbox(lib2.cell_id_named("top")),
        Some(Rect::from_sides(0, 0, 110, 10))
    );
}

#[test]
fn test_path_import_becomes_rect() {
    let mut gds = GdsLibrary::new("paths");
    let mut cell = gds::GdsStruct::new("wire");
    cell.elems.push(
        gds::GdsPath {
            layer: 8,
            datatype: 0,
            xy: gds::GdsPoint::vec(&[(0, 0), (1000, 0)]),
            width: Some(200),
            path_type: Some(2),
        }
        .into(),
    );
    gds.structs.push(cell);
    let lib = import_gds(&gds, GdsImportOpts::default()).unwrap();
    let shape = lib.cell_named("wire").shapes().next().unwrap().clone();
    assert_eq!(
        shape,
        Shape::new(GdsLayer(8, 0), Rect::from_sides(-100, -100, 1100, 100))
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TestLayer {
    A,
    B,
}

impl FromGds for TestLayer {
    fn from_gds(layer: GdsLayer) -> Option<Self> {
        match layer {
            GdsLayer(1, _) => Some(Self::A),
            GdsLayer(2, 0) => Some(Self::B),
            _ => None,
        }
    }
}

#[test]
fn test_from_gds_reports_unmapped_layers() {
    let lib = gdslib();
    assert_eq!(
        layers_used(&lib).into_iter().collect::<Vec<_>>(),
        vec![
            GdsLayer(1, 0),
            GdsLayer(2, 0),
            GdsLayer(3, 0),
            GdsLayer(4, 0),
            GdsLayer(4, 25)
        ]
    );
    assert_eq!(labels(&lib, "top"), vec![("note".into(), GdsLayer(4, 25))]);
    let err = from_gds::<TestLayer>(lib).unwrap_err();
    assert_eq!(err.layer, GdsLayer(3, 0));
}
