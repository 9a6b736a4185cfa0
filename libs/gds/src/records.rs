//! Record and data type codes of the GDSII stream format, and its 8-byte real encoding.

use num_derive::FromPrimitive;

use crate::{GdsError, GdsResult};

/// GDSII record types known to this crate.
///
/// Codes not listed here are rejected with [`GdsError::Unsupported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum RecordType {
    Header = 0x00,
    BgnLib = 0x01,
    LibName = 0x02,
    Units = 0x03,
    EndLib = 0x04,
    BgnStr = 0x05,
    StrName = 0x06,
    EndStr = 0x07,
    Boundary = 0x08,
    Path = 0x09,
    Sref = 0x0A,
    Aref = 0x0B,
    Text = 0x0C,
    Layer = 0x0D,
    DataType = 0x0E,
    Width = 0x0F,
    Xy = 0x10,
    EndEl = 0x11,
    SName = 0x12,
    ColRow = 0x13,
    Node = 0x15,
    TextType = 0x16,
    Presentation = 0x17,
    String = 0x19,
    Strans = 0x1A,
    Mag = 0x1B,
    Angle = 0x1C,
    RefLibs = 0x1F,
    Fonts = 0x20,
    PathType = 0x21,
    Generations = 0x22,
    AttrTable = 0x23,
    ElFlags = 0x26,
    PropAttr = 0x2B,
    PropValue = 0x2C,
    Box = 0x2D,
    Plex = 0x2F,
    Format = 0x36,
}

/// GDSII record data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum DataType {
    NoData = 0,
    BitArray = 1,
    I16 = 2,
    I32 = 3,
    Real4 = 4,
    Real8 = 5,
    Str = 6,
}

impl RecordType {
    /// The data type every record of this type carries.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::EndLib
            | Self::EndStr
            | Self::Boundary
            | Self::Path
            | Self::Sref
            | Self::Aref
            | Self::Text
            | Self::Node
            | Self::Box
            | Self::EndEl => DataType::NoData,
            Self::Strans | Self::Presentation | Self::ElFlags => DataType::BitArray,
            Self::Header
            | Self::BgnLib
            | Self::BgnStr
            | Self::Layer
            | Self::DataType
            | Self::ColRow
            | Self::TextType
            | Self::PathType
            | Self::Generations
            | Self::PropAttr
            | Self::Format => DataType::I16,
            Self::Width | Self::Xy | Self::Plex => DataType::I32,
            Self::Units | Self::Mag | Self::Angle => DataType::Real8,
            Self::LibName
            | Self::StrName
            | Self::SName
            | Self::String
            | Self::RefLibs
            | Self::Fonts
            | Self::AttrTable
            | Self::PropValue => DataType::Str,
        }
    }
}

const MANTISSA_BITS: u32 = 56;

/// Encodes `value` as a GDSII excess-64, base-16 floating point number.
///
/// # Examples
///
/// ```
/// use gds::records::{decode_real8, encode_real8};
///
/// let bits = encode_real8(1e-3).unwrap();
/// assert!((decode_real8(bits) - 1e-3).abs() < 1e-15);
/// assert_eq!(encode_real8(1.0).unwrap(), 0x4110_0000_0000_0000);
/// ```
pub fn encode_real8(value: f64) -> GdsResult<u64> {
    if value == 0. {
        return Ok(0);
    }
    if !value.is_finite() {
        return Err(GdsError::InvalidReal(value));
    }
    let sign: u64 = if value < 0. { 1 << 63 } else { 0 };
    let mut mantissa = value.abs();
    let mut exponent: i32 = 64;
    while mantissa >= 1. {
        mantissa /= 16.;
        exponent += 1;
    }
    while mantissa < 1. / 16. {
        mantissa *= 16.;
        exponent -= 1;
    }
    let mut bits = (mantissa * 2f64.powi(MANTISSA_BITS as i32)).round() as u64;
    if bits >= 1 << MANTISSA_BITS {
        bits >>= 4;
        exponent += 1;
    }
    if !(0..=127).contains(&exponent) {
        return Err(GdsError::InvalidReal(value));
    }
    Ok(sign | ((exponent as u64) << MANTISSA_BITS) | bits)
}

/// Decodes a GDSII 8-byte real.
pub fn decode_real8(bits: u64) -> f64 {
    let negative = bits >> 63 == 1;
    let exponent = ((bits >> MANTISSA_BITS) & 0x7f) as i32 - 64;
    let mantissa = (bits & ((1 << MANTISSA_BITS) - 1)) as f64 / 2f64.powi(MANTISSA_BITS as i32);
    let value = mantissa * 16f64.powi(exponent);
    if negative {
        -value
    } else {
        value
    }
}
