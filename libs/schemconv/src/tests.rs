use std::path::PathBuf;

use arcstr::ArcStr;
use indexmap::IndexMap;

use crate::spice::{Netlist, ParserError};
use crate::xschem::{parse_attributes, Coord, PortType, Schematic, DEFAULT_TOLERANCE};
use crate::SchemconvError;

const BUILD_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/build");

#[inline]
pub(crate) fn get_path(test_name: &str, file_name: &str) -> PathBuf {
    PathBuf::from(BUILD_DIR).join(test_name).join(file_name)
}

const INVERTER_SCH: &str = r#"v {xschem version=3.4.5 file_version=1.2
* Licensed under the Apache License, Version 2.0
}
G {}
K {}
V {}
S {}
E {}
N 100 -200 100 -100 {lab=OUT}
N 100 -100 200 -100 {}
N 200 -100 200 0 {}
N -100 0 0 0 {lab=IN}
C {ipin.sym} -100 0 0 0 {name=p1 lab=IN}
C {opin.sym} 100 -200 0 0 {name=p2 lab=OUT}
C {iopin.sym} 300 0 0 0 {name=p3 lab=VDD}
C {sg13g2_pr/sg13_lv_nmos.sym} 200 0 0 0 {name=M1
l=0.13u
w=1.0u
model=sg13_lv_nmos
}
C {lab_pin.sym} 0 0 0 1 {name=p4 sig_type=std_logic lab=IN}
T {inverter} 0 -300 0 0 0.4 0.4 {}
L 4 0 0 10 10 {}
"#;

const INVERTER_SPICE: &str = "* sg13g2 cells
.subckt inv a y vdd vss w=1u l=0.13u
XM1 y a vss vss sg13_lv_nmos w={w} l={l} ; nmos
+ ng=1
xm2 y a vdd vdd
+ sg13_lv_pmos w=2u l=0.13u
.ends inv

.subckt buf in out vdd vss
x1 in mid vdd vss inv
x2 mid out vdd vss inv w=2u
.ends
R1 n1 n2 1k
.end
";

fn names<'a>(insts: impl IntoIterator<Item = &'a crate::xschem::Instance>) -> Vec<&'a str> {
    insts.into_iter().filter_map(|i| i.name()).collect()
}

fn map(pairs: &[(&str, &str)]) -> IndexMap<ArcStr, ArcStr> {
    pairs
        .iter()
        .map(|(k, v)| (ArcStr::from(*k), ArcStr::from(*v)))
        .collect()
}

#[test_log::test]
fn xschem_header_and_records() {
    let sch = Schematic::parse(INVERTER_SCH).unwrap();
    assert_eq!(sch.info.version.as_deref(), Some("3.4.5"));
    assert_eq!(sch.info.file_version.as_deref(), Some("1.2"));
    assert_eq!(sch.info.spice_code.as_deref(), Some(""));
    assert_eq!(sch.instances.len(), 5);
    assert_eq!(sch.wires.len(), 4);

    let m1 = sch.instance_by_name("M1").unwrap();
    assert_eq!(m1.index, 3);
    assert_eq!(m1.symbol, "sg13g2_pr/sg13_lv_nmos.sym");
    assert_eq!(m1.symbol_file(), "sg13_lv_nmos.sym");
    assert_eq!(m1.attributes["w"], "1.0u");
    assert_eq!(m1.attributes["model"], "sg13_lv_nmos");
    assert!(!m1.is_port());

    let p4 = sch.instance_by_name("p4").unwrap();
    assert_eq!(p4.flip, 1);
    assert!(p4.is_label());
    assert!(sch.instance_by_name("M2").is_none());
}

#[test_log::test]
fn xschem_attribute_quoting() {
    let attrs = parse_attributes(r#"name=R1 value="1 k" spice='x y' bare=3"#);
    assert_eq!(
        attrs,
        map(&[
            ("name", "R1"),
            ("value", "1 k"),
            ("spice", "x y"),
            ("bare", "3")
        ])
    );
}

#[test_log::test]
fn xschem_ports_and_labels() {
    let sch = Schematic::parse(INVERTER_SCH).unwrap();
    assert_eq!(names(sch.ports()), ["p1", "p2", "p3"]);
    assert_eq!(names(sch.ports_of_type(PortType::Input)), ["p1"]);
    assert_eq!(names(sch.ports_of_type(PortType::Output)), ["p2"]);
    assert_eq!(names(sch.ports_of_type(PortType::Inout)), ["p3"]);
    assert_eq!(names(sch.labels()), ["p4"]);

    assert_eq!(names(sch.instances_by_symbol("sg13g2_pr/*")), ["M1"]);
    assert_eq!(names(sch.instances_by_symbol("*nmos*")), ["M1"]);
    assert_eq!(names(sch.instances_by_symbol("pin")), ["p1", "p2", "p3", "p4"]);
    assert!(sch.instances_by_symbol("pmos").is_empty());
}

#[test_log::test]
fn xschem_symbol_names_ignore_case() {
    let sch = Schematic::parse(
        "C {devices/IPIN.sym} 0 0 0 0 {name=p1 lab=A}\nC {Lab_Wire.SYM} 10 0 0 0 {name=l1 lab=A}\n",
    )
    .unwrap();
    assert_eq!(
        sch.instance_by_name("p1").unwrap().port_type(),
        Some(PortType::Input)
    );
    assert!(sch.instance_by_name("l1").unwrap().is_label());
}

#[test_log::test]
fn xschem_nets() {
    let sch = Schematic::parse(INVERTER_SCH).unwrap();

    let nets = sch.net_labels();
    assert_eq!(nets.keys().collect::<Vec<_>>(), ["OUT", "IN", "VDD"]);
    assert_eq!(
        nets["OUT"],
        [
            Coord::new(100., -200.),
            Coord::new(100., -100.),
            Coord::new(100., -200.)
        ]
    );
    assert_eq!(nets["IN"].len(), 4);

    let graph = sch.connectivity_graph();
    assert_eq!(graph.len(), 6);
    assert_eq!(graph[&Coord::new(100., -100.)].len(), 2);
    assert_eq!(sch.trace_net(Coord::new(200., 0.)).len(), 4);
    assert_eq!(sch.trace_net(Coord::new(500., 500.)).len(), 1);

    assert_eq!(
        sch.net_at(Coord::new(200., 0.), DEFAULT_TOLERANCE).as_deref(),
        Some("OUT")
    );
    assert_eq!(
        sch.net_at(Coord::new(300., 1e-9), DEFAULT_TOLERANCE).as_deref(),
        Some("VDD")
    );
    assert_eq!(sch.net_at(Coord::new(1000., 1000.), DEFAULT_TOLERANCE), None);

    let conns = sch.instance_connections();
    let net_of = |name: &str| conns[name]["default"].as_deref();
    assert_eq!(net_of("M1"), Some("OUT"));
    assert_eq!(net_of("p1"), Some("IN"));
    assert_eq!(net_of("p3"), Some("VDD"));
    assert_eq!(net_of("p4"), Some("IN"));
}

#[test_log::test]
fn xschem_summary() {
    let sch = Schematic::parse(INVERTER_SCH).unwrap();

    let json: serde_json::Value = serde_json::from_str(&sch.to_json().unwrap()).unwrap();
    assert_eq!(json["version"], "3.4.5");
    assert_eq!(json["instances"][0]["symbol"], "ipin.sym");
    assert_eq!(json["instances"][0]["name"], "p1");
    assert_eq!(json["instances"][0]["is_port"], true);
    assert_eq!(json["instances"][2]["port_type"], "inout");
    assert_eq!(json["instances"][3]["port_type"], serde_json::Value::Null);
    assert_eq!(json["wires"][0]["net_name"], "OUT");
    assert_eq!(json["nets"]["VDD"][0]["x"], 300.);

    let yaml = sch.to_yaml().unwrap();
    assert!(yaml.contains("port_type: inout"));
    assert!(yaml.contains("file_version: '1.2'"));
}

#[test_log::test]
fn xschem_parse_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inv.sch");
    std::fs::write(&path, INVERTER_SCH).unwrap();
    let sch = Schematic::parse_file(&path).unwrap();
    assert_eq!(sch.filename, Some(path.display().to_string()));
    assert_eq!(sch.instances.len(), 5);

    let missing = Schematic::parse_file(dir.path().join("missing.sch"));
    assert!(matches!(missing, Err(SchemconvError::FailedToRead { .. })));
}

#[test_log::test]
fn xschem_rejects_malformed_records() {
    let err = Schematic::parse("v {xschem version=3.4.5}\nC {res.sym} a b 0 0 {}\n").unwrap_err();
    assert!(matches!(err, SchemconvError::InvalidRecord { line: 2, .. }));

    let err = Schematic::parse("C {res.sym} 0 0 0 0 {name=R1\nvalue=1k\n").unwrap_err();
    assert!(matches!(err, SchemconvError::InvalidRecord { line: 1, .. }));
}

#[test_log::test]
fn spice_subcircuits() {
    let netlist = Netlist::parse(INVERTER_SPICE).unwrap();
    assert_eq!(netlist.subckts.len(), 2);

    let inv = netlist.subckt("INV").unwrap();
    assert_eq!(inv.name, "inv");
    assert_eq!(inv.ports, ["a", "y", "vdd", "vss"]);
    assert_eq!(inv.params, map(&[("w", "1u"), ("l", "0.13u")]));
    assert_eq!(inv.instances.len(), 2);

    let xm1 = &inv.instances[0];
    assert_eq!(xm1.name, "XM1");
    assert_eq!(xm1.kind(), 'X');
    assert_eq!(xm1.nodes, ["y", "a", "vss", "vss"]);
    assert_eq!(xm1.child.as_deref(), Some("sg13_lv_nmos"));
    assert_eq!(
        xm1.params,
        map(&[("w", "{w}"), ("l", "{l}"), ("ng", "1")])
    );

    let xm2 = &inv.instances[1];
    assert_eq!(xm2.nodes, ["y", "a", "vdd", "vdd"]);
    assert_eq!(xm2.child.as_deref(), Some("sg13_lv_pmos"));

    let buf = netlist.subckt("buf").unwrap();
    assert!(buf.params.is_empty());
    assert_eq!(buf.instances[1].child.as_deref(), Some("inv"));
    assert_eq!(buf.instances[1].params, map(&[("w", "2u")]));

    assert_eq!(netlist.instances.len(), 1);
    let r1 = &netlist.instances[0];
    assert_eq!(r1.kind(), 'R');
    assert_eq!(r1.nodes, ["n1", "n2", "1k"]);
    assert_eq!(r1.child, None);
}

#[test_log::test]
fn spice_continuation_across_comments() {
    let netlist = Netlist::parse(".subckt a x y\nX1 x y\n* c\n+ sub\n.ends\n").unwrap();
    let a = netlist.subckt("a").unwrap();
    assert_eq!(a.instances.len(), 1);
    assert_eq!(a.instances[0].name, "X1");
    assert_eq!(a.instances[0].nodes, ["x", "y"]);
    assert_eq!(a.instances[0].child.as_deref(), Some("sub"));

    assert!(matches!(
        Netlist::parse("R1 a b 1k\n\n+ m=2\n"),
        Err(ParserError::InvalidLine { line: 3, .. })
    ));
    assert!(matches!(
        Netlist::parse("+ R1 a b 1k\n"),
        Err(ParserError::InvalidLine { line: 1, .. })
    ));
}

#[test_log::test]
fn spice_values_with_leading_dot() {
    let netlist = Netlist::parse("C1 a b .5p\nM1 d g s b nmos w=.5u l=0.13u\n").unwrap();
    assert_eq!(netlist.instances.len(), 2);
    assert_eq!(netlist.instances[0].nodes, ["a", "b", ".5p"]);
    assert_eq!(netlist.instances[1].params, map(&[("w", ".5u"), ("l", "0.13u")]));
}

#[test_log::test]
fn spice_yaml_dump() {
    let netlist = Netlist::parse(INVERTER_SPICE).unwrap();
    let yaml = netlist.to_yaml().unwrap();
    assert!(yaml.contains("name: inv"));
    assert!(yaml.contains("child: sg13_lv_pmos"));

    let path = get_path("spice_yaml_dump", "inv.yaml");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, &yaml).unwrap();
    let reread: Netlist = serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reread, netlist);
}

#[test_log::test]
fn spice_parse_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inv.spice");
    std::fs::write(&path, INVERTER_SPICE).unwrap();
    let netlist = Netlist::parse_file(&path).unwrap();
    assert_eq!(netlist.subckts.len(), 2);
}

#[test_log::test]
fn spice_structure_errors() {
    assert!(matches!(
        Netlist::parse("R1 a b 1k\n.ends\n"),
        Err(ParserError::UnexpectedDirective { line: 2, .. })
    ));
    assert!(matches!(
        Netlist::parse(".subckt a p\n.subckt b q\n.ends\n"),
        Err(ParserError::UnexpectedDirective { line: 2, .. })
    ));
    assert!(matches!(
        Netlist::parse(".subckt a p\nR1 p 0 1\n"),
        Err(ParserError::UnclosedSubckt(name)) if name == "a"
    ));
    assert!(matches!(
        Netlist::parse("R1 a b r=\n"),
        Err(ParserError::InvalidLine { line: 1, .. })
    ));
    assert!(matches!(
        Netlist::parse("X1\n"),
        Err(ParserError::InvalidLine { line: 1, .. })
    ));
}
