use geometry::prelude::*;
use test_log::test;

use crate::{Cell, CellId, Instance, LayirError, Library, LibraryBuilder, Port, Shape};

fn two_level_library() -> (LibraryBuilder<u8>, CellId, CellId) {
    let mut lib = LibraryBuilder::new();
    let mut leaf = Cell::new("leaf");
    leaf.add_element(Shape::new(1u8, Rect::from_sides(0, 0, 100, 50)));
    leaf.add_port(
        "a",
        Port::new(Point::new(100, 25), 50, Rotation::R0, 2u8),
    )
    .unwrap();
    let leaf = lib.add_cell(leaf);

    let mut top = Cell::new("top");
    top.add_element(Shape::new(3u8, Rect::from_sides(-10, -10, 10, 10)));
    top.add_instance(Instance::with_transformation(
        leaf,
        "x0",
        Transformation::from_opts(Point::new(500, 0), false, Rotation::R90),
    ))
    .unwrap();
    let top = lib.add_cell(top);
    (lib, leaf, top)
}

#[test]
fn duplicate_cell_names_get_suffixes() {
    let mut lib = LibraryBuilder::<u8>::new();
    let a = lib.add_cell(Cell::new("pad"));
    let b = lib.add_cell(Cell::new("pad"));
    let c = lib.add_cell(Cell::new("pad"));
    assert_eq!(lib.cell(a).name(), "pad");
    assert_eq!(lib.cell(b).name(), "pad_1");
    assert_eq!(lib.cell(c).name(), "pad_2");
    assert_eq!(lib.cell_id_named("pad_1"), b);
}

#[test]
fn duplicate_port_is_an_error() {
    let mut cell = Cell::new("c");
    let port = Port::new(Point::zero(), 10, Rotation::R0, 0u8);
    cell.add_port("p", port.clone()).unwrap();
    assert_eq!(
        cell.add_port("p", port),
        Err(LayirError::DuplicatePort {
            cell: "c".into(),
            port: "p".into()
        })
    );
}

#[test]
fn duplicate_instance_is_an_error() {
    let (mut lib, leaf, _) = two_level_library();
    let mut cell = Cell::<u8>::new("twice");
    cell.add_instance(Instance::new(leaf, "x")).unwrap();
    assert!(cell.add_instance(Instance::new(leaf, "x")).is_err());
    lib.add_cell(cell);
}

#[test]
fn topological_order_puts_children_first() {
    let mut lib = LibraryBuilder::<u8>::new();
    let mut top = Cell::new("top");
    let leaf = lib.add_cell(Cell::new("leaf"));
    let mut mid = Cell::new("mid");
    mid.add_instance(Instance::new(leaf, "x")).unwrap();
    let mid = lib.add_cell(mid);
    top.add_instance(Instance::new(mid, "x")).unwrap();
    top.add_instance(Instance::new(leaf, "y")).unwrap();
    let top = lib.add_cell(top);
    assert_eq!(lib.topological_order(), vec![leaf, mid, top]);
}

#[test]
fn cell_bbox_includes_transformed_children() {
    let (lib, leaf, top) = two_level_library();
    assert_eq!(lib.cell_bbox(leaf), Some(Rect::from_sides(0, 0, 100, 50)));
    // The rotated leaf spans x in [450, 500], y in [0, 100].
    assert_eq!(
        lib.cell_bbox(top),
        Some(Rect::from_sides(-10, -10, 500, 100))
    );
    assert_eq!(lib.cell(top).bbox(), Some(Rect::from_sides(-10, -10, 10, 10)));
}

#[test]
fn port_transform_rotates_orientation() {
    let port = Port::new(Point::new(100, 25), 50, Rotation::R0, 0u8);
    let moved = port.transform(Transformation::from_opts(
        Point::new(500, 0),
        false,
        Rotation::R90,
    ));
    assert_eq!(moved.center(), Point::new(475, 100));
    assert_eq!(moved.orientation(), Rotation::R90);

    let west = Port::new(Point::zero(), 10, Rotation::R180, 0u8);
    assert_eq!(
        west.transform(Transformation::reflect_vert()).orientation(),
        Rotation::R180
    );
    let north = Port::new(Point::zero(), 10, Rotation::R90, 0u8);
    assert_eq!(
        north.transform(Transformation::reflect_vert()).orientation(),
        Rotation::R270
    );
}

#[test]
fn map_layers_converts_elements_and_ports() {
    let (lib, leaf, _) = two_level_library();
    let lib = lib.build().unwrap();
    let mapped = lib.map_layers(|l| (*l as u16) * 10);
    let cell = mapped.cell(leaf);
    assert_eq!(cell.elements().next().unwrap().layer(), &10);
    assert_eq!(cell.port("a").layer(), &20);

    let failed: std::result::Result<Library<u16>, String> =
        mapped.try_map_layers(|l| if *l == 30 { Err(format!("{l}")) } else { Ok(*l) });
    assert_eq!(failed.unwrap_err(), "30");
}

#[test]
fn info_preserves_insertion_order() {
    let mut cell = Cell::<u8>::new("cap");
    cell.info_mut().insert("model", "cmim");
    cell.info_mut().insert("capacitance_fF", 37.5);
    cell.info_mut().insert("n", 3i64);
    let keys: Vec<_> = cell.info().iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, ["model", "capacitance_fF", "n"]);
    assert_eq!(cell.info().get_f64("n"), Some(3.));
    assert_eq!(cell.info().get_str("model").unwrap(), "cmim");
}
