//! Types for reading and writing GDSII stream files.
//!
//! Only the subset of the format needed for layout cells is modeled:
//! boundaries, paths, structure and array references, and text.
//!
//! # Examples
//!
//! ```
//! use gds::{GdsBoundary, GdsLibrary, GdsPoint, GdsStruct};
//!
//! let mut lib = GdsLibrary::new("demo");
//! let mut cell = GdsStruct::new("square");
//! cell.elems.push(
//!     GdsBoundary {
//!         layer: 8,
//!         datatype: 0,
//!         xy: GdsPoint::vec(&[(0, 0), (100, 0), (100, 100), (0, 100), (0, 0)]),
//!     }
//!     .into(),
//! );
//! lib.structs.push(cell);
//!
//! let bytes = lib.encode().unwrap();
//! let decoded = GdsLibrary::from_bytes(&bytes).unwrap();
//! assert_eq!(decoded.structs, lib.structs);
//! ```

use std::fmt;
use std::path::Path;

use arcstr::ArcStr;
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

mod read;
pub mod records;
mod write;


/// Errors encountered while reading or writing GDSII data.
#[derive(Debug, thiserror::Error)]
pub enum GdsError {
    /// An underlying I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// A record was malformed or appeared where it is not allowed.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    /// A record type this crate does not handle.
    #[error("unsupported record type 0x{0:02x}")]
    Unsupported(u8),
    /// A string does not fit in a single record.
    #[error("string of {0} bytes is too long for a GDS record")]
    StringTooLong(usize),
    /// A record's payload exceeds the maximum record length.
    #[error("record payload of {0} bytes exceeds the maximum record length")]
    RecordTooLong(usize),
    /// A coordinate does not fit in a 32-bit GDS integer.
    #[error("coordinate {0} does not fit in a 32-bit GDS integer")]
    CoordinateOverflow(i64),
    /// A floating point value cannot be represented as a GDS real.
    #[error("value {0} cannot be represented as a GDS real")]
    InvalidReal(f64),
}

/// A `Result` type alias for GDS operations.
pub type GdsResult<T> = Result<T, GdsError>;

/// GDS library units.
///
/// The first value is the size of a database unit in user units;
/// the second is the size of a database unit in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GdsUnits(f64, f64);

impl GdsUnits {
    /// Creates new units from the database unit size in user units and in meters.
    pub const fn new(dbu_in_user_units: f64, dbu_in_meters: f64) -> Self {
        Self(dbu_in_user_units, dbu_in_meters)
    }

    /// The database unit, in user units.
    pub const fn user_unit(&self) -> f64 {
        self.0
    }

    /// The database unit, in meters.
    pub const fn db_unit(&self) -> f64 {
        self.1
    }
}

impl Default for GdsUnits {
    /// 1 nm database units with micrometer user units.
    fn default() -> Self {
        Self(1e-3, 1e-9)
    }
}

/// Modification and access dates of a library or structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GdsDateTimes {
    /// Last modification time.
    pub modified: NaiveDateTime,
    /// Last access time.
    pub accessed: NaiveDateTime,
}

impl GdsDateTimes {
    /// The current local time, truncated to whole seconds.
    pub fn now() -> Self {
        let now = chrono::Local::now().naive_local();
        let now = now.with_nanosecond(0).unwrap_or(now);
        Self {
            modified: now,
            accessed: now,
        }
    }
}

impl Default for GdsDateTimes {
    fn default() -> Self {
        Self::now()
    }
}

/// A GDSII library: the top-level contents of a stream file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GdsLibrary {
    /// Library name.
    pub name: ArcStr,
    /// Database and user units.
    pub units: GdsUnits,
    /// Creation/modification dates.
    pub dates: GdsDateTimes,
    /// Structures (cells), in file order.
    pub structs: Vec<GdsStruct>,
}

impl GdsLibrary {
    /// Creates an empty library with 1 nm database units.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self::with_units(name, GdsUnits::default())
    }

    /// Creates an empty library with the given units.
    pub fn with_units(name: impl Into<ArcStr>, units: GdsUnits) -> Self {
        Self {
            name: name.into(),
            units,
            dates: GdsDateTimes::now(),
            structs: Vec::new(),
        }
    }

    /// Looks up a structure by name.
    pub fn struct_named(&self, name: &str) -> Option<&GdsStruct> {
        self.structs.iter().find(|s| s.name == name)
    }

    /// Encodes the library as a GDSII byte stream.
    pub fn encode(&self) -> GdsResult<Vec<u8>> {
        let mut buf = Vec::new();
        write::GdsWriter::new(&mut buf).write_library(self)?;
        Ok(buf)
    }

    /// Writes the library to a GDSII file, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> GdsResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        write::GdsWriter::new(&mut writer).write_library(self)?;
        Ok(())
    }

    /// Decodes a library from a GDSII byte stream.
    pub fn from_bytes(bytes: &[u8]) -> GdsResult<Self> {
        read::GdsReader::new(bytes).read_library()
    }

    /// Reads a library from a GDSII file.
    pub fn load(path: impl AsRef<Path>) -> GdsResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

/// A GDSII structure (cell definition).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GdsStruct {
    /// Structure name.
    pub name: ArcStr,
    /// Creation/modification dates.
    pub dates: GdsDateTimes,
    /// Elements, in file order.
    pub elems: Vec<GdsElement>,
}

impl GdsStruct {
    /// Creates an empty structure.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            dates: GdsDateTimes::now(),
            elems: Vec::new(),
        }
    }
}

/// A GDSII element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::enum_variant_names)]
pub enum GdsElement {
    /// A closed polygon.
    GdsBoundary(GdsBoundary),
    /// A wire with a width.
    GdsPath(GdsPath),
    /// A reference to another structure.
    GdsStructRef(GdsStructRef),
    /// A rectangular array of references to another structure.
    GdsArrayRef(GdsArrayRef),
    /// A text label.
    GdsTextElem(GdsTextElem),
}

/// A point in database units.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GdsPoint {
    /// x-coordinate.
    pub x: i32,
    /// y-coordinate.
    pub y: i32,
}

impl GdsPoint {
    /// Creates a new point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Creates a point from 64-bit coordinates, failing if either does not fit.
    pub fn try_new(x: i64, y: i64) -> GdsResult<Self> {
        let x = i32::try_from(x).map_err(|_| GdsError::CoordinateOverflow(x))?;
        let y = i32::try_from(y).map_err(|_| GdsError::CoordinateOverflow(y))?;
        Ok(Self { x, y })
    }

    /// Creates a vector of points from coordinate pairs.
    pub fn vec(pts: &[(i32, i32)]) -> Vec<Self> {
        pts.iter().map(|&(x, y)| Self::new(x, y)).collect()
    }
}

impl fmt::Display for GdsPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Reflection, magnification and rotation of a reference or text element.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GdsStrans {
    /// Reflection about the x-axis, applied before rotation.
    pub reflected: bool,
    /// Absolute magnification flag.
    pub abs_mag: bool,
    /// Absolute angle flag.
    pub abs_angle: bool,
    /// Magnification factor.
    pub mag: Option<f64>,
    /// Counterclockwise rotation, in degrees.
    pub angle: Option<f64>,
}

/// A GDS boundary element.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GdsBoundary {
    /// Layer number.
    pub layer: i16,
    /// Datatype number.
    pub datatype: i16,
    /// Vertices; the last repeats the first.
    pub xy: Vec<GdsPoint>,
}

/// A GDS path element.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GdsPath {
    /// Layer number.
    pub layer: i16,
    /// Datatype number.
    pub datatype: i16,
    /// Centre-line points.
    pub xy: Vec<GdsPoint>,
    /// Path width.
    pub width: Option<i32>,
    /// End style: 0 flush, 1 round, 2 half-width extension.
    pub path_type: Option<i16>,
}

/// A GDS structure reference.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct GdsStructRef {
    /// Name of the referenced structure.
    pub name: ArcStr,
    /// Placement origin.
    pub xy: GdsPoint,
    /// Optional transformation.
    pub strans: Option<GdsStrans>,
}

/// A GDS array reference.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct GdsArrayRef {
    /// Name of the referenced structure.
    pub name: ArcStr,
    /// Origin, column extent and row extent points.
    pub xy: [GdsPoint; 3],
    /// Number of columns.
    pub cols: i16,
    /// Number of rows.
    pub rows: i16,
    /// Optional transformation.
    pub strans: Option<GdsStrans>,
}

/// A GDS text element.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct GdsTextElem {
    /// The text string.
    pub string: ArcStr,
    /// Layer number.
    pub layer: i16,
    /// Texttype number.
    pub texttype: i16,
    /// Anchor point.
    pub xy: GdsPoint,
    /// Optional transformation.
    pub strans: Option<GdsStrans>,
}

impl From<GdsBoundary> for GdsElement {
    fn from(value: GdsBoundary) -> Self {
        Self::GdsBoundary(value)
    }
}

impl From<GdsPath> for GdsElement {
    fn from(value: GdsPath) -> Self {
        Self::GdsPath(value)
    }
}

impl From<GdsStructRef> for GdsElement {
    fn from(value: GdsStructRef) -> Self {
        Self::GdsStructRef(value)
    }
}

impl From<GdsArrayRef> for GdsElement {
    fn from(value: GdsArrayRef) -> Self {
        Self::GdsArrayRef(value)
    }
}

impl From<GdsTextElem> for GdsElement {
    fn from(value: GdsTextElem) -> Self {
        Self::GdsTextElem(value)
    }
}
