//! GDSII stream decoding.

use arcstr::ArcStr;
use byteorder::{BigEndian, ByteOrder};
use chrono::{NaiveDate, NaiveDateTime};
use num_traits::FromPrimitive;

use crate::records::{decode_real8, DataType, RecordType};
use crate::{
    GdsArrayRef, GdsBoundary, GdsDateTimes, GdsElement, GdsError, GdsLibrary, GdsPath, GdsPoint,
    GdsResult, GdsStrans, GdsStruct, GdsStructRef, GdsTextElem, GdsUnits,
};

#[derive(Debug, Clone, PartialEq)]
enum Data {
    Empty,
    Bits(u16),
    I16(Vec<i16>),
    I32(Vec<i32>),
    Real8(Vec<f64>),
    Str(ArcStr),
}

#[derive(Debug, Clone, PartialEq)]
struct Record {
    rtype: RecordType,
    data: Data,
}

pub(crate) struct GdsReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

fn invalid<T>(msg: impl Into<String>) -> GdsResult<T> {
    Err(GdsError::InvalidRecord(msg.into()))
}

impl Record {
    fn i16s(&self) -> GdsResult<&[i16]> {
        match &self.data {
            Data::I16(v) if !v.is_empty() => Ok(v),
            _ => invalid(format!("expected 2-byte integers in {:?}", self.rtype)),
        }
    }

    fn i32s(&self) -> GdsResult<&[i32]> {
        match &self.data {
            Data::I32(v) => Ok(v),
            _ => invalid(format!("expected 4-byte integers in {:?}", self.rtype)),
        }
    }

    fn reals(&self) -> GdsResult<&[f64]> {
        match &self.data {
            Data::Real8(v) if !v.is_empty() => Ok(v),
            _ => invalid(format!("expected 8-byte reals in {:?}", self.rtype)),
        }
    }

    fn string(&self) -> GdsResult<ArcStr> {
        match &self.data {
            Data::Str(s) => Ok(s.clone()),
            _ => invalid(format!("expected a string in {:?}", self.rtype)),
        }
    }
}

impl<'a> GdsReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn next_record(&mut self) -> GdsResult<Record> {
        let rest = &self.bytes[self.pos..];
        if rest.len() < 4 {
            return invalid("unexpected end of stream");
        }
        let len = BigEndian::read_u16(&rest[0..2]) as usize;
        let rtype = rest[2];
        let dtype = rest[3];
        if len < 4 || len % 2 != 0 || len > rest.len() {
            return invalid(format!("bad record length {len}"));
        }
        let payload = &rest[4..len];
        self.pos += len;

        let rtype = RecordType::from_u8(rtype).ok_or(GdsError::Unsupported(rtype))?;
        let dtype = DataType::from_u8(dtype)
            .ok_or_else(|| GdsError::InvalidRecord(format!("bad data type {dtype}")))?;
        if dtype != rtype.data_type() {
            return invalid(format!("{rtype:?} record with data type {dtype:?}"));
        }
        let data = match dtype {
            DataType::NoData => Data::Empty,
            DataType::BitArray => {
                if payload.len() != 2 {
                    return invalid(format!("{rtype:?} must hold one bit array"));
                }
                Data::Bits(BigEndian::read_u16(payload))
            }
            DataType::I16 => Data::I16(payload.chunks_exact(2).map(BigEndian::read_i16).collect()),
            DataType::I32 => {
                if payload.len() % 4 != 0 {
                    return invalid(format!("{rtype:?} payload is not a multiple of 4 bytes"));
                }
                Data::I32(payload.chunks_exact(4).map(BigEndian::read_i32).collect())
            }
            DataType::Real8 => {
                if payload.len() % 8 != 0 {
                    return invalid(format!("{rtype:?} payload is not a multiple of 8 bytes"));
                }
                Data::Real8(
                    payload
                        .chunks_exact(8)
                        .map(|c| decode_real8(BigEndian::read_u64(c)))
                        .collect(),
                )
            }
            DataType::Real4 => return Err(GdsError::Unsupported(rtype as u8)),
            DataType::Str => {
                let end = payload
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(payload.len());
                let s = std::str::from_utf8(&payload[..end])
                    .map_err(|e| GdsError::InvalidRecord(format!("invalid string: {e}")))?;
                Data::Str(ArcStr::from(s))
            }
        };
        Ok(Record { rtype, data })
    }

    fn expect(&mut self, rtype: RecordType) -> GdsResult<Record> {
        let record = self.next_record()?;
        if record.rtype != rtype {
            return invalid(format!("expected {rtype:?}, found {:?}", record.rtype));
        }
        Ok(record)
    }

    pub(crate) fn read_library(&mut self) -> GdsResult<GdsLibrary> {
        self.expect(RecordType::Header)?;
        let dates = read_dates(&self.expect(RecordType::BgnLib)?)?;
        let name = self.expect(RecordType::LibName)?.string()?;
        let units = loop {
            let record = self.next_record()?;
            let rtype = record.rtype;
            match rtype {
                RecordType::Units => break record,
                RecordType::RefLibs
                | RecordType::Fonts
                | RecordType::AttrTable
                | RecordType::Generations
                | RecordType::Format => return Err(GdsError::Unsupported(rtype as u8)),
                other => return invalid(format!("expected Units, found {other:?}")),
            }
        };
        let units = match units.reals()? {
            [user, db] => GdsUnits::new(*user, *db),
            _ => return invalid("UNITS must hold two reals"),
        };

        let mut structs = Vec::new();
        loop {
            let record = self.next_record()?;
            match record.rtype {
                RecordType::BgnStr => structs.push(self.read_struct(read_dates(&record)?)?),
                RecordType::EndLib => break,
                RecordType::Node | RecordType::Box => {
                    return Err(GdsError::Unsupported(record.rtype as u8))
                }
                other => return invalid(format!("unexpected {other:?} in library")),
            }
        }
        Ok(GdsLibrary {
            name,
            units,
            dates,
            structs,
        })
    }

    fn read_struct(&mut self, dates: GdsDateTimes) -> GdsResult<GdsStruct> {
        let name = self.expect(RecordType::StrName)?.string()?;
        let mut elems = Vec::new();
        loop {
            let record = self.next_record()?;
            let kind = record.rtype;
            match kind {
                RecordType::EndStr => break,
                RecordType::Node | RecordType::Box => return Err(GdsError::Unsupported(kind as u8)),
                _ => {}
            }
            let fields = self.read_fields()?;
            let elem = match kind {
                RecordType::Boundary => GdsBoundary {
                    layer: fields.required(fields.layer, "LAYER", kind)?,
                    datatype: fields.required(fields.datatype, "DATATYPE", kind)?,
                    xy: fields.required(fields.xy.clone(), "XY", kind)?,
                }
                .into(),
                RecordType::Path => GdsPath {
                    layer: fields.required(fields.layer, "LAYER", kind)?,
                    datatype: fields.required(fields.datatype, "DATATYPE", kind)?,
                    xy: fields.required(fields.xy.clone(), "XY", kind)?,
                    width: fields.width,
                    path_type: fields.path_type,
                }
                .into(),
                RecordType::Sref => GdsStructRef {
                    name: fields.required(fields.sname.clone(), "SNAME", kind)?,
                    xy: fields.single_point(kind)?,
                    strans: fields.strans,
                }
                .into(),
                RecordType::Aref => {
                    let (cols, rows) = fields.required(fields.colrow, "COLROW", kind)?;
                    let xy = fields.required(fields.xy.clone(), "XY", kind)?;
                    let xy: [GdsPoint; 3] = xy
                        .try_into()
                        .map_err(|_| GdsError::InvalidRecord("AREF must have 3 points".into()))?;
                    GdsArrayRef {
                        name: fields.required(fields.sname.clone(), "SNAME", kind)?,
                        xy,
                        cols,
                        rows,
                        strans: fields.strans,
                    }
                    .into()
                }
                RecordType::Text => GdsTextElem {
                    string: fields.required(fields.string.clone(), "STRING", kind)?,
                    layer: fields.required(fields.layer, "LAYER", kind)?,
                    texttype: fields.required(fields.texttype, "TEXTTYPE", kind)?,
                    xy: fields.single_point(kind)?,
                    strans: fields.strans,
                }
                .into(),
                other => return invalid(format!("unexpected {other:?} in structure `{name}`")),
            };
            elems.push(elem);
        }
        Ok(GdsStruct { name, dates, elems })
    }

    /// Reads element fields up to and including ENDEL.
    fn read_fields(&mut self) -> GdsResult<Fields> {
        let mut fields = Fields::default();
        loop {
            let record = self.next_record()?;
            match record.rtype {
                RecordType::EndEl => return Ok(fields),
                RecordType::Layer => fields.layer = Some(record.i16s()?[0]),
                RecordType::DataType => fields.datatype = Some(record.i16s()?[0]),
                RecordType::TextType => fields.texttype = Some(record.i16s()?[0]),
                RecordType::PathType => fields.path_type = Some(record.i16s()?[0]),
                RecordType::Width => {
                    fields.width = record.i32s()?.first().copied();
                }
                RecordType::Xy => {
                    let values = record.i32s()?;
                    fields.xy = Some(
                        values
                            .chunks_exact(2)
                            .map(|c| GdsPoint::new(c[0], c[1]))
                            .collect(),
                    );
                }
                RecordType::SName => fields.sname = Some(record.string()?),
                RecordType::String => fields.string = Some(record.string()?),
                RecordType::ColRow => match record.i16s()? {
                    [cols, rows] => fields.colrow = Some((*cols, *rows)),
                    _ => return invalid("COLROW must hold two integers"),
                },
                RecordType::Strans => {
                    let Data::Bits(bits) = record.data else {
                        return invalid("STRANS must hold a bit array");
                    };
                    let strans = fields.strans.get_or_insert_with(GdsStrans::default);
                    strans.reflected = bits & 0x8000 != 0;
                    strans.abs_mag = bits & 0x0004 != 0;
                    strans.abs_angle = bits & 0x0002 != 0;
                }
                RecordType::Mag => {
                    let mag = record.reals()?[0];
                    fields.strans.get_or_insert_with(GdsStrans::default).mag = Some(mag);
                }
                RecordType::Angle => {
                    let angle = record.reals()?[0];
                    fields.strans.get_or_insert_with(GdsStrans::default).angle = Some(angle);
                }
                RecordType::Presentation
                | RecordType::ElFlags
                | RecordType::Plex
                | RecordType::PropAttr
                | RecordType::PropValue => {}
                RecordType::Node | RecordType::Box => {
                    return Err(GdsError::Unsupported(record.rtype as u8))
                }
                other => return invalid(format!("unexpected {other:?} inside an element")),
            }
        }
    }
}

#[derive(Debug, Default)]
struct Fields {
    layer: Option<i16>,
    datatype: Option<i16>,
    texttype: Option<i16>,
    path_type: Option<i16>,
    width: Option<i32>,
    xy: Option<Vec<GdsPoint>>,
    sname: Option<ArcStr>,
    string: Option<ArcStr>,
    colrow: Option<(i16, i16)>,
    strans: Option<GdsStrans>,
}

impl Fields {
    fn required<T>(&self, value: Option<T>, field: &str, kind: RecordType) -> GdsResult<T> {
        value.ok_or_else(|| GdsError::InvalidRecord(format!("{kind:?} is missing {field}")))
    }

    fn single_point(&self, kind: RecordType) -> GdsResult<GdsPoint> {
        match self.xy.as_deref() {
            Some([p]) => Ok(*p),
            _ => invalid(format!("{kind:?} must have exactly one XY point")),
        }
    }
}

fn read_date(v: &[i16]) -> NaiveDateTime {
    let year = if v[0] < 1900 { v[0] as i32 + 1900 } else { v[0] as i32 };
    NaiveDate::from_ymd_opt(year, v[1] as u32, v[2] as u32)
        .and_then(|d| d.and_hms_opt(v[3] as u32, v[4] as u32, v[5] as u32))
        .unwrap_or_default()
}

fn read_dates(record: &Record) -> GdsResult<GdsDateTimes> {
    let v = record.i16s()?;
    if v.len() != 12 {
        return invalid(format!("{:?} must hold 12 date fields", record.rtype));
    }
    Ok(GdsDateTimes {
        modified: read_date(&v[..6]),
        accessed: read_date(&v[6..]),
    })
}
