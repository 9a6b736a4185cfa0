use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use gds::GdsLibrary;
use gdsconv::conv::{from_gds, labels, layers_used};
use gdsconv::import::{import_gds, GdsImportOpts};
use gdsconv::GdsLayer;
use geometry::prelude::*;
use layir::{Cell, Element, PortType};
use serde_json::json;

use crate::catalog::{self, CELL_NAMES};
use crate::cells::*;
use crate::layers::{layer_map, layer_map_yaml};
use crate::rules::{cross_section, cross_sections, DesignRules};
use crate::stack::{LayerStack, StackExportOpts};
use crate::{Context, LayerPurpose, Purpose, Sg13g2Error, Sg13g2Layer, GDS_UNITS};

const BUILD_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/build");

#[inline]
pub(crate) fn get_path(test_name: &str, file_name: &str) -> PathBuf {
    PathBuf::from(BUILD_DIR).join(test_name).join(file_name)
}

fn shapes_on(cell: &Cell<LayerPurpose>, layer: impl Into<LayerPurpose>) -> Vec<Shape> {
    let layer = layer.into();
    cell.shapes()
        .filter(|s| *s.layer() == layer)
        .map(|s| s.shape().clone())
        .collect()
}

fn texts(cell: &Cell<LayerPurpose>) -> Vec<String> {
    cell.elements()
        .filter_map(|e| match e {
            Element::Text(t) => Some(t.text().to_string()),
            Element::Shape(_) => None,
        })
        .collect()
}

#[test_log::test]
fn every_catalog_port_is_electrical_on_a_pin_layer() {
    let mut ctx = Context::new();
    for name in CELL_NAMES {
        let id = catalog::build(&mut ctx, name, serde_json::Value::Null).unwrap();
        let cell = ctx.cell(id);
        assert!(cell.ports().count() > 0, "{name} has no ports");
        for (port_name, port) in cell.ports() {
            assert_eq!(
                port.port_type(),
                PortType::Electrical,
                "{name}.{port_name} is not electrical"
            );
            assert_eq!(port.layer().purpose, Purpose::Pin);
            assert_eq!(
                port.layer().gds_layer().1,
                2,
                "{name}.{port_name} is not on a pin sublayer"
            );
        }
    }
}

#[test]
fn layer_names_round_trip() {
    let lp = LayerPurpose::by_name("Metal4drawing").unwrap();
    assert_eq!(lp, Sg13g2Layer::Metal4.drawing());
    assert_eq!(lp.gds_layer(), GdsLayer(50, 0));

    let block = LayerPurpose::by_name("nSDblock").unwrap();
    assert_eq!(block.gds_layer(), GdsLayer(7, 21));
    assert_eq!(block.name(), "nSDblock");

    assert!(matches!(
        LayerPurpose::by_name("Metal4block"),
        Err(Sg13g2Error::UnknownLayer(_))
    ));
    assert!(LayerPurpose::by_name("Metal9drawing").is_err());

    use gdsconv::conv::FromGds;
    assert_eq!(
        LayerPurpose::from_gds(GdsLayer(8, 2)),
        Some(Sg13g2Layer::Metal1.pin())
    );
    assert_eq!(LayerPurpose::from_gds(GdsLayer(8, 99)), None);
    assert_eq!(LayerPurpose::from_gds(GdsLayer(1000, 0)), None);
}

#[test]
fn layer_map_lists_every_purpose() {
    let map = layer_map();
    assert_eq!(map["TopMetal2pin"], GdsLayer(134, 2));
    assert_eq!(map["Activmask"], GdsLayer(1, 20));
    assert_eq!(map["Metal1nofill"], GdsLayer(8, 23));
    assert_eq!(map["RFPaddrawing"], GdsLayer(158, 0));
    assert_eq!(map["UBMdrawing"], GdsLayer(155, 0));
    for (name, layer) in map.iter() {
        assert_eq!(LayerPurpose::by_name(name).unwrap().gds_layer(), *layer);
    }

    let yaml = layer_map_yaml().unwrap();
    assert!(yaml.contains("Metal1drawing"));
}

#[test]
fn stack_is_consistent() {
    let stack = LayerStack::sg13g2();
    stack.validate().unwrap();

    let tm2 = stack.level("TopMetal2").unwrap();
    assert_abs_diff_eq!(tm2.zmin_um, 10.83);
    assert_abs_diff_eq!(tm2.zmax_um(), 13.83, epsilon = 1e-9);
    assert_abs_diff_eq!(stack.zmax(), 13.83, epsilon = 1e-9);
    assert_eq!(
        stack.level_for_layer(Sg13g2Layer::Via2).map(|l| l.name.as_str()),
        Some("Via2")
    );
    assert_eq!(stack.metals().count(), 7);
}

#[test]
fn stack_validation_catches_bad_vias() {
    let mut stack = LayerStack::sg13g2();
    let via = stack
        .levels
        .iter_mut()
        .find(|l| l.name == "Via3")
        .unwrap();
    via.thickness_um = 0.3;
    assert!(matches!(stack.validate(), Err(Sg13g2Error::Stack(_))));

    let mut stack = LayerStack::sg13g2();
    stack.levels[1].material = "unobtainium".into();
    assert!(matches!(stack.validate(), Err(Sg13g2Error::Stack(_))));
}

#[test]
fn stack_yaml_export() {
    let stack = LayerStack::sg13g2();
    let yaml = stack.to_yaml(StackExportOpts::default()).unwrap();
    assert!(yaml.contains("TopMetal2"));
    assert!(yaml.contains("substrate"));
    assert!(yaml.contains("oxide"));
    assert!(!yaml.contains("air:"));
    let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
    assert!(value["materials"]["si"].is_mapping());
    assert!(value["materials"]["air"].is_null());

    let yaml = stack
        .to_yaml(StackExportOpts {
            include_substrate: false,
            air_above_um: Some(100.),
        })
        .unwrap();
    let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
    assert!(value["layers"]["substrate"].is_null());
    assert_eq!(value["layers"]["air"]["thickness"].as_f64(), Some(100.));
    assert_eq!(value["materials"]["air"]["permittivity"].as_f64(), Some(1.));

    for air in [0., -5.] {
        assert!(matches!(
            stack.to_yaml(StackExportOpts {
                include_substrate: true,
                air_above_um: Some(air),
            }),
            Err(Sg13g2Error::InvalidParam { .. })
        ));
    }
}

#[test]
fn cross_section_lookup() {
    let rules = DesignRules::sg13g2();
    let m2 = cross_section(&rules, "metal2_routing").unwrap();
    assert_eq!(m2.layer, Sg13g2Layer::Metal2);
    assert_abs_diff_eq!(m2.width, 0.2);
    assert_eq!(m2.radius, None);

    let tm1 = cross_section(&rules, "topmetal1_routing").unwrap();
    assert_abs_diff_eq!(tm1.width, 1.64);

    let strip = cross_section(&rules, "strip").unwrap();
    assert_eq!(strip.layer, Sg13g2Layer::TopMetal2);
    assert_eq!(strip.radius, Some(20.));

    assert_eq!(cross_sections(&rules).unwrap().len(), 8);
    assert!(matches!(
        cross_section(&rules, "xs_missing"),
        Err(Sg13g2Error::UnknownCrossSection(_))
    ));
}

#[test]
fn design_rules_cut_counts() {
    let rules = DesignRules::sg13g2();
    let via1 = rules.cut(Sg13g2Layer::Via1).unwrap();
    assert_eq!(via1.count(1.), 2);
    assert_eq!(via1.count(0.1), 1);
    assert_eq!(
        rules.cut_above(Sg13g2Layer::TopMetal1).map(|(cut, _)| cut),
        Some(Sg13g2Layer::TopVia2)
    );
    assert!(rules.cut_above(Sg13g2Layer::TopMetal2).is_none());
    assert_eq!(
        rules
            .metals_between(Sg13g2Layer::Metal4, Sg13g2Layer::TopMetal1)
            .unwrap(),
        vec![
            Sg13g2Layer::Metal4,
            Sg13g2Layer::Metal5,
            Sg13g2Layer::TopMetal1
        ]
    );
    assert!(rules
        .metals_between(Sg13g2Layer::Metal3, Sg13g2Layer::Metal2)
        .is_err());
}

#[test]
fn cell_names_encode_changed_params() {
    use crate::Block;
    assert_eq!(Cmim::default().name(), "cmim");
    let cmim = Cmim::builder().width(10.5).build().unwrap();
    assert_eq!(cmim.name(), "cmim_width10p5");
    let npn = Npn13G2::builder().nx(2).build().unwrap();
    assert_eq!(npn.name(), "npn13G2_Nx2");
    let pad = Bondpad::builder().shape(PadShape::Square).build().unwrap();
    assert_eq!(pad.name(), "bondpad_shapesquare");
    let ind = Inductor2::builder().space(-1.).build().unwrap();
    assert_eq!(ind.name(), "inductor2_spacem1");
}

#[test]
fn context_caches_cells_by_name() {
    let mut ctx = Context::new();
    let a = ctx.generate(&Cmim::default()).unwrap();
    let b = ctx.generate(&Cmim::default()).unwrap();
    assert_eq!(a, b);
    let c = ctx
        .generate(&Cmim::builder().length(7.).build().unwrap())
        .unwrap();
    assert_ne!(a, c);
    assert_eq!(ctx.library().len(), 2);
}

#[test_log::test]
fn cmim_default_geometry() {
    let mut ctx = Context::new();
    let id = ctx.generate(&Cmim::default()).unwrap();
    let cell = ctx.cell(id);

    let info = cell.info();
    assert_abs_diff_eq!(info.get_f64("capacitance_fF").unwrap(), 37.5);
    assert_abs_diff_eq!(info.get_f64("area_um2").unwrap(), 25.);
    assert_eq!(info.get_str("model").unwrap(), "cmim");

    let mim = shapes_on(cell, Sg13g2Layer::Mim);
    assert_eq!(mim.len(), 1);
    assert_eq!(mim[0].bbox_rect(), Rect::from_sides(-2500, -2500, 2500, 2500));

    let p1 = cell.port("P1");
    assert_eq!(p1.center(), Point::new(-3200, 0));
    assert_eq!(p1.orientation(), Rotation::R180);
    assert_eq!(*p1.layer(), Sg13g2Layer::Metal4.pin());
    let p2 = cell.port("P2");
    assert_eq!(p2.center(), Point::new(3000, 0));
    assert_eq!(*p2.layer(), Sg13g2Layer::TopMetal1.pin());

    // Both ports sit on metal of their layer.
    for (port, layer) in [(p1, Sg13g2Layer::Metal4), (p2, Sg13g2Layer::TopMetal1)] {
        assert!(shapes_on(cell, layer)
            .iter()
            .any(|s| s.contains(port.center())));
    }

    // 5 um plate with a 0.1 um via inset fits 13 vias per side.
    assert_eq!(shapes_on(cell, Sg13g2Layer::Via4).len(), 13 * 13);
}

#[test]
fn cmim_clamps_and_snaps() {
    let small = Cmim::builder().width(0.1).length(5.0031).build().unwrap();
    let (w, l) = small.dims();
    assert_abs_diff_eq!(w, 0.5);
    assert_abs_diff_eq!(l, 5.005);
    assert_abs_diff_eq!(small.capacitance(), 0.5 * 5.005 * 1.5, epsilon = 1e-9);

    let given = Cmim::builder().capacitance(12.).build().unwrap();
    assert_abs_diff_eq!(given.capacitance(), 12.);
}

#[test]
fn rfcmim_has_shield_and_ground_port() {
    let mut ctx = Context::new();
    let id = ctx.generate(&Rfcmim::default()).unwrap();
    let cell = ctx.cell(id);

    let shield = shapes_on(cell, Sg13g2Layer::Metal3);
    assert_eq!(shield.len(), 1);
    assert_eq!(
        shield[0].bbox_rect(),
        Rect::from_sides(-7000, -7000, 7000, 7000)
    );
    let gnd = cell.port("GND");
    assert_eq!(gnd.center(), Point::new(0, -7000));
    assert_eq!(gnd.width(), 14000);
    assert_eq!(shapes_on(cell, Sg13g2Layer::RfPad).len(), 2);
    assert_eq!(cell.info().get_str("type").unwrap(), "rf_capacitor");
    assert_abs_diff_eq!(cell.info().get_f64("capacitance_fF").unwrap(), 150.);

    // The top plate connects through TopVia1 landing on both metals.
    let via = &shapes_on(cell, Sg13g2Layer::TopVia1)[0];
    let center = via.bbox_rect().center();
    assert!(shapes_on(cell, Sg13g2Layer::Metal5)
        .iter()
        .any(|s| s.contains(center)));
    assert!(shapes_on(cell, Sg13g2Layer::TopMetal1)
        .iter()
        .any(|s| s.contains(center)));
}

#[test]
fn resistor_values() {
    // The default rsil length is below the minimum and is clamped.
    let rsil = Rsil::default();
    assert_eq!(rsil.dims(), (0.8, 0.8));
    assert_abs_diff_eq!(rsil.resistance(), 7.);
    assert_abs_diff_eq!(Rppd::default().resistance(), 3750.);
    assert_abs_diff_eq!(
        Rhigh::default().resistance(),
        20. / 1.4 * 1350.,
        epsilon = 1e-6
    );
    let given = Rppd::builder().resistance(1000.).build().unwrap();
    assert_abs_diff_eq!(given.resistance(), 1000.);
}

#[test]
fn resistor_layouts() {
    let mut ctx = Context::new();

    let id = ctx.generate(&Rsil::default()).unwrap();
    let cell = ctx.cell(id);
    assert_eq!(shapes_on(cell, Sg13g2Layer::Cont).len(), 4);
    assert_eq!(shapes_on(cell, Sg13g2Layer::SalBlock).len(), 1);
    assert_eq!(cell.port("P1").center(), Point::new(-800, 0));
    assert_eq!(cell.port("P2").center(), Point::new(800, 0));
    assert_eq!(cell.port("P2").width(), 800);

    let id = ctx.generate(&Rppd::default()).unwrap();
    let cell = ctx.cell(id);
    assert_eq!(shapes_on(cell, Sg13g2Layer::PolyRes).len(), 1);
    assert_eq!(
        shapes_on(cell, Sg13g2Layer::PSd)[0].bbox_rect(),
        Rect::from_sides(-5400, -500, 5400, 500)
    );

    let id = ctx.generate(&Rhigh::default()).unwrap();
    let cell = ctx.cell(id);
    // Two columns of four contacts at each end.
    assert_eq!(shapes_on(cell, Sg13g2Layer::Cont).len(), 16);
    assert_eq!(
        shapes_on(cell, Sg13g2Layer::Res)[0].bbox_rect(),
        Rect::from_sides(-11300, -1200, 11300, 1200)
    );
    assert_abs_diff_eq!(
        cell.info().get_f64("n_squares").unwrap(),
        20. / 1.4,
        epsilon = 1e-6
    );

    // Every contact is covered by Metal1.
    for cont in shapes_on(cell, Sg13g2Layer::Cont) {
        let c = cont.bbox_rect().center();
        assert!(shapes_on(cell, Sg13g2Layer::Metal1)
            .iter()
            .any(|m| m.contains(c)));
    }
}

#[test_log::test]
fn npn_default_ports() {
    let mut ctx = Context::new();
    let id = ctx.generate(&Npn13G2::default()).unwrap();
    let cell = ctx.cell(id);

    let c = cell.port("C");
    assert_eq!(c.center(), Point::new(0, 1130));
    assert_eq!(c.width(), 240);
    assert_eq!(*c.layer(), Sg13g2Layer::Metal1.pin());

    let b = cell.port("B");
    assert_eq!(b.center(), Point::new(0, -1140));
    assert_eq!(b.width(), 240);

    let e = cell.port("E");
    assert_eq!(*e.layer(), Sg13g2Layer::Metal2.pin());
    assert!((e.width() - 1555).abs() <= 1);

    for port in [c, b, e] {
        assert_eq!(port.orientation(), Rotation::R180);
        assert_eq!(port.width() % 2, 0);
    }

    let labels = texts(cell);
    for label in ["npn13G2", "C", "B", "E", "Ae=1*1*0.70*0.90"] {
        assert!(labels.iter().any(|l| l == label), "missing label {label}");
    }
    assert_eq!(
        shapes_on(cell, Sg13g2Layer::EmWind)[0].bbox_rect(),
        Rect::from_sides(-350, -450, 350, 450)
    );
}

#[test]
fn npn_fingers() {
    let mut ctx = Context::new();
    let npn = Npn13G2::builder().nx(3).build().unwrap();
    let id = ctx.generate(&npn).unwrap();
    let cell = ctx.cell(id);

    assert_eq!(shapes_on(cell, Sg13g2Layer::EmWind).len(), 3);
    assert_eq!(shapes_on(cell, Sg13g2Layer::Via1).len(), 3 * 8);
    assert_eq!(
        shapes_on(cell, Sg13g2Layer::NSd.with_purpose(Purpose::Block)).len(),
        3
    );
    // Shared shapes are drawn once regardless of finger count.
    assert_eq!(shapes_on(cell, Sg13g2Layer::Trans).len(), 1);
    assert_eq!(shapes_on(cell, Sg13g2Layer::Metal2).len(), 1);

    // The collector strap moves up for multi-finger devices.
    let c = cell.port("C");
    assert_eq!(c.center(), Point::new(1850, 1240));
    assert_eq!(c.width(), 440);
    assert!(texts(cell).iter().any(|l| l == "Ae=3*1*0.70*0.90"));

    assert!(ctx
        .generate(&Npn13G2::builder().nx(0).build().unwrap())
        .is_err());
}

#[test]
fn bondpad_default_geometry() {
    let mut ctx = Context::new();
    let id = ctx.generate(&Bondpad::default()).unwrap();
    let cell = ctx.cell(id);

    let pad = &shapes_on(cell, Sg13g2Layer::TopMetal2)[0];
    let bbox = pad.bbox_rect();
    assert_abs_diff_eq!(bbox.width() as f64, 68000., epsilon = 30.);
    assert_abs_diff_eq!(bbox.height() as f64, 68000., epsilon = 30.);
    assert_eq!(pad.to_points().len(), 8);

    let opening = shapes_on(cell, Sg13g2Layer::DfPad)[0].bbox_rect();
    assert_abs_diff_eq!(opening.width() as f64, 0.85 * 68000., epsilon = 30.);

    // Stacked from Metal1 through TopMetal2.
    for metal in Sg13g2Layer::METALS {
        assert_eq!(shapes_on(cell, metal).len(), 1, "{metal}");
    }
    assert!(shapes_on(cell, Sg13g2Layer::Ubm).is_empty());

    let port = cell.port("pad");
    assert_eq!(port.center(), Point::zero());
    assert_eq!(port.width(), 68000);
    assert_eq!(*port.layer(), Sg13g2Layer::TopMetal2.pin());
    assert_eq!(cell.info().get_str("shape").unwrap(), "octagon");
}

#[test]
fn bondpad_variants() {
    let mut ctx = Context::new();

    let flip = Bondpad::builder()
        .shape(PadShape::Square)
        .flip_chip(true)
        .stack_metals(false)
        .build()
        .unwrap();
    let id = ctx.generate(&flip).unwrap();
    let cell = ctx.cell(id);
    assert_eq!(
        shapes_on(cell, Sg13g2Layer::Ubm)[0].bbox_rect(),
        Rect::from_sides(-23800, -23800, 23800, 23800)
    );
    assert!(shapes_on(cell, Sg13g2Layer::Metal1).is_empty());

    let circle = Bondpad::builder()
        .shape(PadShape::Circle)
        .diameter(60.004)
        .build()
        .unwrap();
    assert_abs_diff_eq!(circle.diameter(), 60.);
    let id = ctx.generate(&circle).unwrap();
    let pad = &shapes_on(ctx.cell(id), Sg13g2Layer::TopMetal2)[0];
    assert_eq!(pad.to_points().len(), 144);

    let inverted = Bondpad::builder()
        .bottom_metal(Sg13g2Layer::TopMetal2)
        .top_metal(Sg13g2Layer::Metal1)
        .build()
        .unwrap();
    assert!(matches!(
        ctx.generate(&inverted),
        Err(Sg13g2Error::InvalidParam { .. })
    ));
    let not_metal = Bondpad::builder()
        .top_metal(Sg13g2Layer::Activ)
        .build()
        .unwrap();
    assert!(matches!(
        ctx.generate(&not_metal),
        Err(Sg13g2Error::NoRule(Sg13g2Layer::Activ))
    ));
}

#[test]
fn bondpad_rejects_nonpositive_sizes() {
    let mut ctx = Context::new();
    for (shape, diameter) in [("square", -1.0), ("octagon", 0.0), ("circle", 0.001)] {
        assert!(matches!(
            catalog::build(&mut ctx, "bondpad", json!({"shape": shape, "diameter": diameter})),
            Err(Sg13g2Error::InvalidParam { .. })
        ));
    }
    assert!(matches!(
        catalog::build(&mut ctx, "bondpad_array", json!({"pad_diameter": -68.0})),
        Err(Sg13g2Error::InvalidParam { .. })
    ));
    assert!(matches!(
        catalog::build(&mut ctx, "bondpad_array", json!({"pad_pitch": 0.0})),
        Err(Sg13g2Error::InvalidParam { .. })
    ));
    assert!(ctx.library().is_empty());
}

#[test]
fn bondpad_array_ports() {
    let mut ctx = Context::new();
    let id = ctx.generate(&BondpadArray::default()).unwrap();
    let cell = ctx.cell(id);
    assert_eq!(cell.instances().count(), 4);
    for i in 0..4 {
        let port = cell.port(&format!("pad_{}", i + 1));
        assert_eq!(port.center(), Point::new(i * 100_000, 0));
        assert_eq!(*port.layer(), Sg13g2Layer::TopMetal2.pin());
    }
    // All instances share one pad cell.
    assert_eq!(ctx.library().len(), 2);

    let bbox = ctx.bbox(id).unwrap();
    assert_abs_diff_eq!(bbox.width() as f64, 368000., epsilon = 30.);
}

#[test]
fn via_stack_cuts() {
    let mut ctx = Context::new();
    let id = ctx.generate(&ViaStack::default()).unwrap();
    let cell = ctx.cell(id);
    for cut in [
        Sg13g2Layer::Via1,
        Sg13g2Layer::Via2,
        Sg13g2Layer::Via3,
        Sg13g2Layer::Via4,
    ] {
        let cuts = shapes_on(cell, cut);
        assert_eq!(cuts.len(), 4, "{cut}");
        for c in cuts {
            assert!(Rect::from_sides(-500, -500, 500, 500).contains_rect(c.bbox_rect()));
        }
    }
    assert!(shapes_on(cell, Sg13g2Layer::TopVia1).is_empty());
    assert_eq!(*cell.port("bottom").layer(), Sg13g2Layer::Metal1.pin());
    assert_eq!(*cell.port("top").layer(), Sg13g2Layer::Metal5.pin());

    let too_small = ViaStack::builder().size(0.15).build().unwrap();
    assert!(matches!(
        ctx.generate(&too_small),
        Err(Sg13g2Error::InvalidParam { .. })
    ));
    let thick = ViaStack::builder()
        .bottom(Sg13g2Layer::Metal5)
        .top(Sg13g2Layer::TopMetal2)
        .size(1.)
        .build()
        .unwrap();
    assert!(ctx.generate(&thick).is_err());
    let thick = ViaStack::builder()
        .bottom(Sg13g2Layer::Metal5)
        .top(Sg13g2Layer::TopMetal2)
        .size(4.)
        .build()
        .unwrap();
    let id = ctx.generate(&thick).unwrap();
    assert_eq!(shapes_on(ctx.cell(id), Sg13g2Layer::TopVia2).len(), 4);
}

#[test]
fn inductor_turns() {
    let mut ctx = Context::new();
    let id = ctx.generate(&Inductor2::default()).unwrap();
    let cell = ctx.cell(id);
    assert_eq!(cell.port("P1").center(), Point::new(-2050, -19775));
    assert_eq!(cell.port("P2").center(), Point::new(2050, -19775));
    assert_eq!(cell.port("P1").orientation(), Rotation::R270);
    assert!(shapes_on(cell, Sg13g2Layer::TopMetal1).is_empty());
    assert_eq!(shapes_on(cell, Sg13g2Layer::Ind).len(), 1);
    assert_eq!(shapes_on(cell, Sg13g2Layer::TopMetal2.nofill()).len(), 1);
    assert_abs_diff_eq!(cell.info().get_f64("outer_diameter").unwrap(), 29.35);

    let two = Inductor2::builder().turns(2).build().unwrap();
    assert_abs_diff_eq!(two.outer_diameter(), 25.35 + 8. + 4.2, epsilon = 1e-9);
    let id = ctx.generate(&two).unwrap();
    let cell = ctx.cell(id);
    assert_eq!(shapes_on(cell, Sg13g2Layer::TopMetal1).len(), 1);
    assert_eq!(shapes_on(cell, Sg13g2Layer::TopVia2).len(), 2);
    assert_eq!(cell.info().get_f64("turns"), Some(2.));

    // The IND marker covers the whole winding.
    let ind = shapes_on(cell, Sg13g2Layer::Ind)[0].bbox_rect();
    for shape in shapes_on(cell, Sg13g2Layer::TopMetal2) {
        assert!(ind.contains_rect(shape.bbox_rect()));
    }

    assert!(ctx
        .generate(&Inductor2::builder().turns(0).build().unwrap())
        .is_err());
}

#[test]
fn taps() {
    let mut ctx = Context::new();
    let id = ctx.generate(&Ptap1::default()).unwrap();
    let cell = ctx.cell(id);
    assert_eq!(shapes_on(cell, Sg13g2Layer::Cont).len(), 4);
    assert_eq!(shapes_on(cell, Sg13g2Layer::PSd).len(), 1);
    assert!(shapes_on(cell, Sg13g2Layer::NWell).is_empty());
    assert_eq!(cell.info().get_f64("contacts"), Some(4.));

    let id = ctx.generate(&Ntap1::builder().width(0.1).build().unwrap()).unwrap();
    let cell = ctx.cell(id);
    assert_eq!(shapes_on(cell, Sg13g2Layer::Cont).len(), 2);
    assert_eq!(
        shapes_on(cell, Sg13g2Layer::NWell)[0].bbox_rect(),
        Rect::from_sides(-630, -390, 630, 390)
    );
    assert_eq!(*cell.port("tie").layer(), Sg13g2Layer::Metal1.pin());
}

#[test]
fn catalog_merges_params() {
    let cells = catalog::cells().unwrap();
    assert_eq!(cells.len(), CELL_NAMES.len());
    assert_eq!(cells["cmim"]["width"], json!(5.0));
    assert_eq!(cells["npn13G2"]["Nx"], json!(1));

    let mut ctx = Context::new();
    let id = catalog::build(&mut ctx, "rppd", json!({"length": 20.0})).unwrap();
    assert_abs_diff_eq!(ctx.cell(id).info().get_f64("resistance").unwrap(), 7500.);
    assert_eq!(ctx.cell(id).name(), "rppd_length20");

    let id = catalog::build(&mut ctx, "bondpad", json!({"shape": "circle"})).unwrap();
    assert_eq!(ctx.cell(id).info().get_str("shape").unwrap(), "circle");

    assert!(matches!(
        catalog::build(&mut ctx, "nmos", json!({})),
        Err(Sg13g2Error::UnknownCell(_))
    ));
    assert!(matches!(
        catalog::build(&mut ctx, "cmim", json!({"width": "wide"})),
        Err(Sg13g2Error::Params(_))
    ));
}

#[test]
fn pcell_listing() {
    let yaml = catalog::available_pcells_yaml().unwrap();
    assert!(yaml.starts_with("gf_pcells:"));
    assert!(yaml.contains("- name: cmim"));
    assert!(yaml.contains("- name: npn13G2"));
}

#[test_log::test]
fn gds_export_round_trip() {
    let path = get_path("gds_export_round_trip", "cmim.gds");
    let mut ctx = Context::new();
    ctx.write_layout(&Cmim::default(), &path).unwrap();

    let gds = GdsLibrary::load(&path).unwrap();
    let lib = import_gds(
        &gds,
        GdsImportOpts {
            units: Some(GDS_UNITS),
        },
    )
    .unwrap();

    let used = layers_used(&lib);
    assert!(used.contains(&GdsLayer(36, 0)));
    assert!(used.contains(&GdsLayer(50, 2)));
    assert!(used.contains(&GdsLayer(50, 23)));

    let port_labels = labels(&lib, "cmim");
    assert!(port_labels.contains(&("P1".into(), GdsLayer(50, 2))));
    assert!(port_labels.contains(&("P2".into(), GdsLayer(126, 2))));

    let lib = from_gds::<LayerPurpose>(lib).unwrap();
    let cell = lib.cell_named("cmim");
    assert_eq!(
        cell.shapes()
            .filter(|s| *s.layer() == Sg13g2Layer::Mim.drawing())
            .count(),
        1
    );
}

#[test]
fn gds_export_hierarchy() {
    let path = get_path("gds_export_hierarchy", "bondpad_array.gds");
    let mut ctx = Context::new();
    let array = BondpadArray::builder().n_pads(2).build().unwrap();
    // An unrelated cell in the same context is not exported.
    ctx.generate(&Cmim::default()).unwrap();
    ctx.write_layout(&array, &path).unwrap();

    let gds = GdsLibrary::load(&path).unwrap();
    let lib = import_gds(&gds, GdsImportOpts::default()).unwrap();
    assert_eq!(lib.len(), 2);
    let top = lib.cell_named("bondpad_array_n_pads2");
    assert_eq!(top.instances().count(), 2);
    assert!(lib.try_cell_named("bondpad").is_some());
    assert!(lib.try_cell_named("cmim").is_none());
}
