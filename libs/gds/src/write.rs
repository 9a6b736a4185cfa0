//! GDSII stream encoding.

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};
use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::records::{encode_real8, DataType, RecordType};
use crate::{
    GdsArrayRef, GdsBoundary, GdsDateTimes, GdsElement, GdsError, GdsLibrary, GdsPath, GdsPoint,
    GdsResult, GdsStrans, GdsStruct, GdsStructRef, GdsTextElem,
};

/// Stream format version written in the HEADER record.
const GDS_VERSION: i16 = 600;
/// Largest payload that fits in a record's 16-bit length field.
const MAX_PAYLOAD: usize = u16::MAX as usize - 4;

pub(crate) struct GdsWriter<'a, W: Write> {
    w: &'a mut W,
}

impl<'a, W: Write> GdsWriter<'a, W> {
    pub(crate) fn new(w: &'a mut W) -> Self {
        Self { w }
    }

    pub(crate) fn write_library(&mut self, lib: &GdsLibrary) -> GdsResult<()> {
        self.i16s(RecordType::Header, &[GDS_VERSION])?;
        self.i16s(RecordType::BgnLib, &dates(&lib.dates))?;
        self.string(RecordType::LibName, &lib.name)?;
        let units = [
            encode_real8(lib.units.user_unit())?,
            encode_real8(lib.units.db_unit())?,
        ];
        self.real8s(RecordType::Units, &units)?;
        for strukt in &lib.structs {
            self.write_struct(strukt)?;
        }
        self.empty(RecordType::EndLib)?;
        self.w.flush()?;
        Ok(())
    }

    fn write_struct(&mut self, strukt: &GdsStruct) -> GdsResult<()> {
        self.i16s(RecordType::BgnStr, &dates(&strukt.dates))?;
        self.string(RecordType::StrName, &strukt.name)?;
        for elem in &strukt.elems {
            match elem {
                GdsElement::GdsBoundary(b) => self.write_boundary(b)?,
                GdsElement::GdsPath(p) => self.write_path(p)?,
                GdsElement::GdsStructRef(s) => self.write_sref(s)?,
                GdsElement::GdsArrayRef(a) => self.write_aref(a)?,
                GdsElement::GdsTextElem(t) => self.write_text(t)?,
            }
        }
        self.empty(RecordType::EndStr)
    }

    fn write_boundary(&mut self, b: &GdsBoundary) -> GdsResult<()> {
        self.empty(RecordType::Boundary)?;
        self.i16s(RecordType::Layer, &[b.layer])?;
        self.i16s(RecordType::DataType, &[b.datatype])?;
        self.xy(&b.xy)?;
        self.empty(RecordType::EndEl)
    }

    fn write_path(&mut self, p: &GdsPath) -> GdsResult<()> {
        self.empty(RecordType::Path)?;
        self.i16s(RecordType::Layer, &[p.layer])?;
        self.i16s(RecordType::DataType, &[p.datatype])?;
        if let Some(path_type) = p.path_type {
            self.i16s(RecordType::PathType, &[path_type])?;
        }
        if let Some(width) = p.width {
            self.i32s(RecordType::Width, &[width])?;
        }
        self.xy(&p.xy)?;
        self.empty(RecordType::EndEl)
    }

    fn write_sref(&mut self, s: &GdsStructRef) -> GdsResult<()> {
        self.empty(RecordType::Sref)?;
        self.string(RecordType::SName, &s.name)?;
        if let Some(strans) = &s.strans {
            self.strans(strans)?;
        }
        self.xy(&[s.xy])?;
        self.empty(RecordType::EndEl)
    }

    fn write_aref(&mut self, a: &GdsArrayRef) -> GdsResult<()> {
        self.empty(RecordType::Aref)?;
        self.string(RecordType::SName, &a.name)?;
        if let Some(strans) = &a.strans {
            self.strans(strans)?;
        }
        self.i16s(RecordType::ColRow, &[a.cols, a.rows])?;
        self.xy(&a.xy)?;
        self.empty(RecordType::EndEl)
    }

    fn write_text(&mut self, t: &GdsTextElem) -> GdsResult<()> {
        self.empty(RecordType::Text)?;
        self.i16s(RecordType::Layer, &[t.layer])?;
        self.i16s(RecordType::TextType, &[t.texttype])?;
        if let Some(strans) = &t.strans {
            self.strans(strans)?;
        }
        self.xy(&[t.xy])?;
        self.string(RecordType::String, &t.string)?;
        self.empty(RecordType::EndEl)
    }

    fn strans(&mut self, strans: &GdsStrans) -> GdsResult<()> {
        let mut bits: u16 = 0;
        if strans.reflected {
            bits |= 0x8000;
        }
        if strans.abs_mag {
            bits |= 0x0004;
        }
        if strans.abs_angle {
            bits |= 0x0002;
        }
        self.header(RecordType::Strans, 2)?;
        self.w.write_u16::<BigEndian>(bits)?;
        if let Some(mag) = strans.mag {
            self.real8s(RecordType::Mag, &[encode_real8(mag)?])?;
        }
        if let Some(angle) = strans.angle {
            self.real8s(RecordType::Angle, &[encode_real8(angle)?])?;
        }
        Ok(())
    }

    fn xy(&mut self, pts: &[GdsPoint]) -> GdsResult<()> {
        let values: Vec<i32> = pts.iter().flat_map(|p| [p.x, p.y]).collect();
        self.i32s(RecordType::Xy, &values)
    }

    fn header(&mut self, rtype: RecordType, payload: usize) -> GdsResult<()> {
        if payload > MAX_PAYLOAD {
            return Err(GdsError::RecordTooLong(payload));
        }
        debug_assert!(rtype.data_type() != DataType::NoData || payload == 0);
        self.w.write_u16::<BigEndian>((payload + 4) as u16)?;
        self.w.write_u8(rtype as u8)?;
        self.w.write_u8(rtype.data_type() as u8)?;
        Ok(())
    }

    fn empty(&mut self, rtype: RecordType) -> GdsResult<()> {
        self.header(rtype, 0)
    }

    fn i16s(&mut self, rtype: RecordType, values: &[i16]) -> GdsResult<()> {
        self.header(rtype, 2 * values.len())?;
        for &v in values {
            self.w.write_i16::<BigEndian>(v)?;
        }
        Ok(())
    }

    fn i32s(&mut self, rtype: RecordType, values: &[i32]) -> GdsResult<()> {
        self.header(rtype, 4 * values.len())?;
        for &v in values {
            self.w.write_i32::<BigEndian>(v)?;
        }
        Ok(())
    }

    fn real8s(&mut self, rtype: RecordType, values: &[u64]) -> GdsResult<()> {
        self.header(rtype, 8 * values.len())?;
        for &v in values {
            self.w.write_u64::<BigEndian>(v)?;
        }
        Ok(())
    }

    fn string(&mut self, rtype: RecordType, s: &str) -> GdsResult<()> {
        let bytes = s.as_bytes();
        let padded = bytes.len() + bytes.len() % 2;
        if padded > MAX_PAYLOAD {
            return Err(GdsError::StringTooLong(bytes.len()));
        }
        self.header(rtype, padded)?;
        self.w.write_all(bytes)?;
        if padded > bytes.len() {
            self.w.write_u8(0)?;
        }
        Ok(())
    }
}

fn date(dt: &NaiveDateTime) -> [i16; 6] {
    [
        dt.year() as i16,
        dt.month() as i16,
        dt.day() as i16,
        dt.hour() as i16,
        dt.minute() as i16,
        dt.second() as i16,
    ]
}

fn dates(d: &GdsDateTimes) -> [i16; 12] {
    let mut out = [0; 12];
    out[..6].copy_from_slice(&date(&d.modified));
    out[6..].copy_from_slice(&date(&d.accessed));
    out
}
