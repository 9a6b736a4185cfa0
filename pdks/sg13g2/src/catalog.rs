//! The catalog of parametric cells, addressable by name.

use arcstr::ArcStr;
use indexmap::IndexMap;
use layir::CellId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::cells::*;
use crate::layout::{Context, Layout};
use crate::{Result, Sg13g2Error};

/// Names of all cells in the catalog, in listing order.
pub const CELL_NAMES: [&str; 14] = [
    "cmim",
    "rfcmim",
    "rsil",
    "rppd",
    "rhigh",
    "npn13G2",
    "bondpad",
    "bondpad_array",
    "via_stack",
    "inductor2",
    "ptap1",
    "ntap1",
    "inductor2_2turn",
    "bondpad_flip_chip",
];

fn defaults_of<T: Serialize + Default>() -> Result<Value> {
    Ok(serde_json::to_value(T::default())?)
}

/// The default parameters of the named cell.
pub fn defaults(name: &str) -> Result<Value> {
    match name {
        "cmim" => defaults_of::<Cmim>(),
        "rfcmim" => defaults_of::<Rfcmim>(),
        "rsil" => defaults_of::<Rsil>(),
        "rppd" => defaults_of::<Rppd>(),
        "rhigh" => defaults_of::<Rhigh>(),
        "npn13G2" => defaults_of::<Npn13G2>(),
        "bondpad" => defaults_of::<Bondpad>(),
        "bondpad_array" => defaults_of::<BondpadArray>(),
        "via_stack" => defaults_of::<ViaStack>(),
        "inductor2" => defaults_of::<Inductor2>(),
        "ptap1" => defaults_of::<Ptap1>(),
        "ntap1" => defaults_of::<Ntap1>(),
        "inductor2_2turn" => Ok(serde_json::to_value(Inductor2 {
            turns: 2,
            ..Default::default()
        })?),
        "bondpad_flip_chip" => Ok(serde_json::to_value(Bondpad {
            flip_chip: true,
            ..Default::default()
        })?),
        _ => Err(Sg13g2Error::UnknownCell(name.to_string())),
    }
}

/// Every catalog cell with its default parameters.
pub fn cells() -> Result<IndexMap<ArcStr, Value>> {
    CELL_NAMES
        .iter()
        .map(|name| Ok((ArcStr::from(*name), defaults(name)?)))
        .collect()
}

/// Overlays the keys of `params` onto `base`.
///
/// Non-object `params` (including `null`) leave `base` unchanged.
fn merge(base: &mut Value, params: Value) {
    if let (Value::Object(base), Value::Object(params)) = (base, params) {
        for (key, value) in params {
            base.insert(key, value);
        }
    }
}

fn elaborate<T>(ctx: &mut Context, params: Value) -> Result<CellId>
where
    T: Layout + DeserializeOwned,
{
    let block: T = serde_json::from_value(params)?;
    ctx.generate(&block)
}

/// Generates the named cell with `params` merged over its defaults.
///
/// Unknown parameter keys are ignored.
pub fn build(ctx: &mut Context, name: &str, params: Value) -> Result<CellId> {
    let mut merged = defaults(name)?;
    merge(&mut merged, params);
    tracing::debug!(cell = name, params = %merged, "building catalog cell");
    match name {
        "cmim" => elaborate::<Cmim>(ctx, merged),
        "rfcmim" => elaborate::<Rfcmim>(ctx, merged),
        "rsil" => elaborate::<Rsil>(ctx, merged),
        "rppd" => elaborate::<Rppd>(ctx, merged),
        "rhigh" => elaborate::<Rhigh>(ctx, merged),
        "npn13G2" => elaborate::<Npn13G2>(ctx, merged),
        "bondpad" | "bondpad_flip_chip" => elaborate::<Bondpad>(ctx, merged),
        "bondpad_array" => elaborate::<BondpadArray>(ctx, merged),
        "via_stack" => elaborate::<ViaStack>(ctx, merged),
        "inductor2" | "inductor2_2turn" => elaborate::<Inductor2>(ctx, merged),
        "ptap1" => elaborate::<Ptap1>(ctx, merged),
        "ntap1" => elaborate::<Ntap1>(ctx, merged),
        _ => Err(Sg13g2Error::UnknownCell(name.to_string())),
    }
}

#[derive(Serialize)]
struct PcellEntry<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct PcellListing<'a> {
    gf_pcells: Vec<PcellEntry<'a>>,
}

/// The catalog listing as YAML, in the form `gf_pcells: [{name: ...}, ...]`.
pub fn available_pcells_yaml() -> Result<String> {
    let listing = PcellListing {
        gf_pcells: CELL_NAMES.iter().map(|name| PcellEntry { name }).collect(),
    };
    Ok(serde_yaml::to_string(&listing)?)
}
