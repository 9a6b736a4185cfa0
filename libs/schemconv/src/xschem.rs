//! An xschem `.sch` reader.
//!
//! Records are read in file order. Component (`C`) and wire (`N`) records
//! are kept; text and graphics (`T`, `L`, `A`, `B`, `P`) are skipped.
//! Braced fields may span several lines.

use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::path::Path;

use arcstr::ArcStr;
use indexmap::{IndexMap, IndexSet};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Result, SchemconvError};

/// Tolerance used when matching points to labels.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

lazy_static! {
    static ref XSCHEM_VERSION: Regex = Regex::new(r"xschem version=([\d.RC]+)").unwrap();
    static ref FILE_VERSION: Regex = Regex::new(r"file_version=([\d.]+)").unwrap();
    static ref COMPONENT: Regex = Regex::new(
        r"^C\s+\{([^}]+)\}\s+([\d.eE+-]+)\s+([\d.eE+-]+)\s+(\d+)\s+(\d+)\s*\{([^}]*)\}"
    )
    .unwrap();
    static ref WIRE: Regex = Regex::new(
        r"^N\s+([\d.eE+-]+)\s+([\d.eE+-]+)\s+([\d.eE+-]+)\s+([\d.eE+-]+)\s*\{([^}]*)\}"
    )
    .unwrap();
    static ref ATTRIBUTE: Regex =
        Regex::new(r#"(\w+)=(?:"([^"]*)"|'([^']*)'|([^\s]+))"#).unwrap();
}

/// A schematic coordinate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    /// The x coordinate.
    pub x: f64,
    /// The y coordinate.
    pub y: f64,
}

impl Coord {
    /// Creates a coordinate.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether `other` lies within `tolerance` of `self` along both axes.
    pub fn near(&self, other: Coord, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

// Coordinates are parsed from decimal text and are never NaN.
impl Eq for Coord {}

impl Hash for Coord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // `0.0 == -0.0`, so both must hash alike.
        let bits = |v: f64| if v == 0. { 0 } else { v.to_bits() };
        bits(self.x).hash(state);
        bits(self.y).hash(state);
    }
}

impl From<(f64, f64)> for Coord {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// The direction of a schematic port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    /// An `ipin` port.
    Input,
    /// An `opin` port.
    Output,
    /// An `iopin` port.
    Inout,
}

/// A placed symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Position of the record among the schematic's instances.
    pub index: usize,
    /// Symbol path, such as `sg13g2_pr/sg13_lv_nmos.sym`.
    pub symbol: ArcStr,
    /// Placement x coordinate.
    pub x: f64,
    /// Placement y coordinate.
    pub y: f64,
    /// Rotation in quarter turns.
    pub rotation: u8,
    /// Whether the symbol is mirrored.
    pub flip: u8,
    /// Instance attributes in file order.
    pub attributes: IndexMap<ArcStr, ArcStr>,
}

impl Instance {
    /// The `name` attribute.
    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").map(ArcStr::as_str)
    }

    /// The `lab` attribute.
    pub fn label(&self) -> Option<&str> {
        self.attributes.get("lab").map(ArcStr::as_str)
    }

    /// The file name of the symbol, without its library path.
    pub fn symbol_file(&self) -> &str {
        self.symbol
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.symbol.as_str())
    }

    /// The port direction, if this instance is a pin symbol.
    ///
    /// Symbol file names are compared case-insensitively.
    pub fn port_type(&self) -> Option<PortType> {
        let file = self.symbol_file();
        [
            ("ipin.sym", PortType::Input),
            ("opin.sym", PortType::Output),
            ("iopin.sym", PortType::Inout),
        ]
        .into_iter()
        .find(|(sym, _)| file.eq_ignore_ascii_case(sym))
        .map(|(_, ty)| ty)
    }

    /// Whether this instance is a pin symbol.
    #[inline]
    pub fn is_port(&self) -> bool {
        self.port_type().is_some()
    }

    /// Whether this instance is a net label.
    pub fn is_label(&self) -> bool {
        let file = self.symbol_file();
        ["lab_pin.sym", "lab_wire.sym"]
            .iter()
            .any(|sym| file.eq_ignore_ascii_case(sym))
    }

    /// The placement point.
    #[inline]
    pub fn position(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

/// A wire segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    /// Position of the record among the schematic's wires.
    pub index: usize,
    /// Start x coordinate.
    pub x1: f64,
    /// Start y coordinate.
    pub y1: f64,
    /// End x coordinate.
    pub x2: f64,
    /// End y coordinate.
    pub y2: f64,
    /// Wire attributes in file order.
    pub attributes: IndexMap<ArcStr, ArcStr>,
}

impl Wire {
    /// The net name given by the `lab` attribute.
    pub fn net_name(&self) -> Option<&str> {
        self.attributes.get("lab").map(ArcStr::as_str)
    }

    /// The start point.
    #[inline]
    pub fn start(&self) -> Coord {
        Coord::new(self.x1, self.y1)
    }

    /// The end point.
    #[inline]
    pub fn end(&self) -> Coord {
        Coord::new(self.x2, self.y2)
    }
}

/// File-level data: versions and the raw text of code blocks.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchematicInfo {
    /// The xschem release that wrote the file.
    pub version: Option<ArcStr>,
    /// The file format version.
    pub file_version: Option<ArcStr>,
    /// `G` block.
    pub vhdl_code: Option<String>,
    /// `V` block.
    pub verilog_code: Option<String>,
    /// `S` block.
    pub spice_code: Option<String>,
    /// `E` block.
    pub embedded_symbols: Option<String>,
    /// `K` block.
    pub extra_code: Option<String>,
    /// `F` block.
    pub format: Option<String>,
}

/// Adjacency between wire endpoints.
pub type ConnectivityGraph = IndexMap<Coord, IndexSet<Coord>>;

/// A parsed xschem schematic.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schematic {
    /// The file the schematic was read from, if any.
    pub filename: Option<String>,
    /// Header and code blocks.
    pub info: SchematicInfo,
    /// Component instances in file order.
    pub instances: Vec<Instance>,
    /// Wires in file order.
    pub wires: Vec<Wire>,
}

/// Splits `attrs` into `key=value` pairs.
///
/// Values may be bare words or wrapped in single or double quotes.
pub fn parse_attributes(attrs: &str) -> IndexMap<ArcStr, ArcStr> {
    ATTRIBUTE
        .captures_iter(attrs)
        .filter_map(|caps| {
            let value = caps.get(2).or(caps.get(3)).or(caps.get(4))?;
            Some((ArcStr::from(&caps[1]), ArcStr::from(value.as_str())))
        })
        .collect()
}

/// The net brace depth change of `line`, ignoring escaped braces.
fn brace_delta(line: &str) -> i64 {
    let mut delta = 0;
    let mut escaped = false;
    for c in line.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '{' => delta += 1,
            '}' => delta -= 1,
            _ => {}
        }
    }
    delta
}

/// The text between the first `{` and the last `}` of a record.
fn block_body(record: &str) -> &str {
    match (record.find('{'), record.rfind('}')) {
        (Some(start), Some(end)) if start < end => record[start + 1..end].trim(),
        _ => "",
    }
}

fn parse_num<T: std::str::FromStr>(s: &str, line: usize) -> Result<T> {
    s.parse().map_err(|_| SchemconvError::InvalidRecord {
        line,
        reason: format!("invalid number `{s}`"),
    })
}

impl Schematic {
    /// Parses the contents of a `.sch` file.
    pub fn parse(content: &str) -> Result<Self> {
        let mut sch = Schematic::default();
        let lines: Vec<&str> = content.lines().collect();
        let mut i = 0;

        while i < lines.len() {
            let start = i;
            let first = lines[i].trim();
            i += 1;
            if first.is_empty() {
                continue;
            }

            let mut record = first.to_string();
            let mut depth = brace_delta(first);
            while depth > 0 && i < lines.len() {
                record.push('\n');
                record.push_str(lines[i]);
                depth += brace_delta(lines[i]);
                i += 1;
            }
            if depth > 0 {
                return Err(SchemconvError::InvalidRecord {
                    line: start + 1,
                    reason: "unterminated `{`".to_string(),
                });
            }

            sch.parse_record(&record, start + 1)?;
        }

        tracing::debug!(
            instances = sch.instances.len(),
            wires = sch.wires.len(),
            "parsed xschem schematic"
        );
        Ok(sch)
    }

    /// Reads and parses the `.sch` file at `path`.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("reading xschem file: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|err| SchemconvError::FailedToRead {
            path: path.to_path_buf(),
            err,
        })?;
        let mut sch = Self::parse(&content)?;
        sch.filename = Some(path.display().to_string());
        Ok(sch)
    }

    fn parse_record(&mut self, record: &str, line: usize) -> Result<()> {
        let mut chars = record.chars();
        let tag = chars.next();
        // A record tag is a single letter followed by a space or a brace.
        if !matches!(chars.next(), Some(' ' | '\t' | '{')) {
            return Ok(());
        }
        match tag {
            Some('v') => {
                let body = block_body(record);
                self.info.version = XSCHEM_VERSION
                    .captures(body)
                    .map(|caps| ArcStr::from(&caps[1]));
                self.info.file_version = FILE_VERSION
                    .captures(body)
                    .map(|caps| ArcStr::from(&caps[1]));
            }
            Some('G') => self.info.vhdl_code = Some(block_body(record).to_string()),
            Some('V') => self.info.verilog_code = Some(block_body(record).to_string()),
            Some('S') => self.info.spice_code = Some(block_body(record).to_string()),
            Some('E') => self.info.embedded_symbols = Some(block_body(record).to_string()),
            Some('K') => self.info.extra_code = Some(block_body(record).to_string()),
            Some('F') => self.info.format = Some(block_body(record).to_string()),
            Some('C') => {
                let caps = COMPONENT
                    .captures(record)
                    .ok_or_else(|| SchemconvError::InvalidRecord {
                        line,
                        reason: "malformed component".to_string(),
                    })?;
                self.instances.push(Instance {
                    index: self.instances.len(),
                    symbol: ArcStr::from(caps[1].trim()),
                    x: parse_num(&caps[2], line)?,
                    y: parse_num(&caps[3], line)?,
                    rotation: parse_num(&caps[4], line)?,
                    flip: parse_num(&caps[5], line)?,
                    attributes: parse_attributes(&caps[6]),
                });
            }
            Some('N') => {
                let caps = WIRE
                    .captures(record)
                    .ok_or_else(|| SchemconvError::InvalidRecord {
                        line,
                        reason: "malformed wire".to_string(),
                    })?;
                self.wires.push(Wire {
                    index: self.wires.len(),
                    x1: parse_num(&caps[1], line)?,
                    y1: parse_num(&caps[2], line)?,
                    x2: parse_num(&caps[3], line)?,
                    y2: parse_num(&caps[4], line)?,
                    attributes: parse_attributes(&caps[5]),
                });
            }
            _ => {}
        }
        Ok(())
    }

    /// All pin instances.
    pub fn ports(&self) -> impl Iterator<Item = &Instance> {
        self.instances.iter().filter(|inst| inst.is_port())
    }

    /// Pin instances of the given direction.
    pub fn ports_of_type(&self, port_type: PortType) -> impl Iterator<Item = &Instance> {
        self.instances
            .iter()
            .filter(move |inst| inst.port_type() == Some(port_type))
    }

    /// All net label instances.
    pub fn labels(&self) -> impl Iterator<Item = &Instance> {
        self.instances.iter().filter(|inst| inst.is_label())
    }

    /// Instances whose symbol contains `pattern`, where `*` matches any run
    /// of characters.
    pub fn instances_by_symbol(&self, pattern: &str) -> Vec<&Instance> {
        let pieces: Vec<&str> = pattern.split('*').collect();
        self.instances
            .iter()
            .filter(|inst| wildcard_contains(&inst.symbol, &pieces))
            .collect()
    }

    /// The first instance named `name`.
    pub fn instance_by_name(&self, name: &str) -> Option<&Instance> {
        self.instances.iter().find(|inst| inst.name() == Some(name))
    }

    /// Every labeled point, grouped by net name.
    ///
    /// Labeled wire endpoints come first, then label instances, then ports.
    pub fn net_labels(&self) -> IndexMap<ArcStr, Vec<Coord>> {
        let mut nets: IndexMap<ArcStr, Vec<Coord>> = IndexMap::new();
        for wire in &self.wires {
            if let Some(net) = wire.net_name() {
                nets.entry(ArcStr::from(net))
                    .or_default()
                    .extend([wire.start(), wire.end()]);
            }
        }
        for inst in self.labels().chain(self.ports()) {
            if let Some(net) = inst.label() {
                nets.entry(ArcStr::from(net))
                    .or_default()
                    .push(inst.position());
            }
        }
        nets
    }

    /// Links the two endpoints of every wire.
    pub fn connectivity_graph(&self) -> ConnectivityGraph {
        let mut graph = ConnectivityGraph::new();
        for wire in &self.wires {
            graph.entry(wire.start()).or_default().insert(wire.end());
            graph.entry(wire.end()).or_default().insert(wire.start());
        }
        graph
    }

    /// Every point reachable from `start` through wires, `start` included.
    pub fn trace_net(&self, start: Coord) -> IndexSet<Coord> {
        trace(&self.connectivity_graph(), start)
    }

    /// The net name directly attached to `point`, without tracing wires.
    fn label_at(&self, point: Coord, tolerance: f64) -> Option<ArcStr> {
        for wire in &self.wires {
            if let Some(net) = wire.net_name() {
                if wire.start().near(point, tolerance) || wire.end().near(point, tolerance) {
                    return Some(ArcStr::from(net));
                }
            }
        }
        self.labels()
            .chain(self.ports())
            .find(|inst| inst.label().is_some() && inst.position().near(point, tolerance))
            .and_then(|inst| inst.label().map(ArcStr::from))
    }

    /// The name of the net at `point`.
    ///
    /// A label touching the point wins. Otherwise the wires touching the point
    /// are traced and the first labeled point on them names the net.
    pub fn net_at(&self, point: Coord, tolerance: f64) -> Option<ArcStr> {
        if let Some(net) = self.label_at(point, tolerance) {
            return Some(net);
        }
        let graph = self.connectivity_graph();
        let starts: Vec<Coord> = graph
            .keys()
            .copied()
            .filter(|p| p.near(point, tolerance))
            .collect();
        starts
            .into_iter()
            .flat_map(|start| trace(&graph, start))
            .find_map(|p| self.label_at(p, tolerance))
    }

    /// The net at each named instance's origin, keyed by instance name.
    ///
    /// Symbol pin offsets are not resolved, so every instance reports a
    /// single `default` pin.
    pub fn instance_connections(&self) -> IndexMap<ArcStr, IndexMap<ArcStr, Option<ArcStr>>> {
        self.instances
            .iter()
            .filter_map(|inst| {
                let name = inst.name()?;
                let net = self.net_at(inst.position(), DEFAULT_TOLERANCE);
                Some((
                    ArcStr::from(name),
                    IndexMap::from([(arcstr::literal!("default"), net)]),
                ))
            })
            .collect()
    }

    /// A serializable overview of the schematic.
    pub fn summary(&self) -> Summary<'_> {
        Summary {
            filename: self.filename.as_deref(),
            version: self.info.version.as_deref(),
            file_version: self.info.file_version.as_deref(),
            instances: self
                .instances
                .iter()
                .map(|instance| InstanceSummary {
                    instance,
                    name: instance.name(),
                    is_port: instance.is_port(),
                    port_type: instance.port_type(),
                })
                .collect(),
            wires: self
                .wires
                .iter()
                .map(|wire| WireSummary {
                    wire,
                    net_name: wire.net_name(),
                })
                .collect(),
            nets: self.net_labels(),
        }
    }

    /// The summary as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.summary())?)
    }

    /// The summary as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.summary())?)
    }
}

fn trace(graph: &ConnectivityGraph, start: Coord) -> IndexSet<Coord> {
    let mut visited = IndexSet::new();
    let mut queue = VecDeque::from([start]);
    while let Some(point) = queue.pop_front() {
        if !visited.insert(point) {
            continue;
        }
        if let Some(neighbors) = graph.get(&point) {
            queue.extend(neighbors.iter().filter(|n| !visited.contains(*n)));
        }
    }
    visited
}

/// Whether `pieces`, the `*`-separated parts of a pattern, occur in order in `s`.
fn wildcard_contains(s: &str, pieces: &[&str]) -> bool {
    let mut rest = s;
    for piece in pieces {
        match rest.find(piece) {
            Some(pos) => rest = &rest[pos + piece.len()..],
            None => return false,
        }
    }
    true
}

/// Instance data as it appears in a [`Summary`].
#[derive(Debug, Serialize)]
pub struct InstanceSummary<'a> {
    #[serde(flatten)]
    instance: &'a Instance,
    name: Option<&'a str>,
    is_port: bool,
    port_type: Option<PortType>,
}

/// Wire data as it appears in a [`Summary`].
#[derive(Debug, Serialize)]
pub struct WireSummary<'a> {
    #[serde(flatten)]
    wire: &'a Wire,
    net_name: Option<&'a str>,
}

/// A serializable overview of a [`Schematic`].
#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    /// The source file.
    pub filename: Option<&'a str>,
    /// The xschem release.
    pub version: Option<&'a str>,
    /// The file format version.
    pub file_version: Option<&'a str>,
    /// Instances with derived name and port data.
    pub instances: Vec<InstanceSummary<'a>>,
    /// Wires with their net names.
    pub wires: Vec<WireSummary<'a>>,
    /// Labeled points by net.
    pub nets: IndexMap<ArcStr, Vec<Coord>>,
}
