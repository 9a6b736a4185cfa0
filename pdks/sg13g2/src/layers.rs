//! The set of PDK layers.
#![allow(missing_docs)]

use std::collections::HashMap;
use std::fmt;

use arcstr::ArcStr;
use gdsconv::{conv::FromGds, GdsLayer};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::{Result, Sg13g2Error};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Sg13g2Layer {
    Activ,
    GatPoly,
    Cont,
    NSd,
    Metal1,
    Passiv,
    Metal2,
    PSd,
    Via1,
    Res,
    Trans,
    Ind,
    SalBlock,
    Via2,
    Metal3,
    NWell,
    EmWind,
    Mim,
    /// Passivation opening over pads.
    DfPad,
    Via3,
    Metal4,
    Text,
    Via4,
    Metal5,
    MemCap,
    Recog,
    TopVia1,
    TopMetal1,
    PolyRes,
    TopVia2,
    TopMetal2,
    RfPad,
    /// Under-bump metallization.
    Ubm,
    PrBoundary,
}

/// The purpose of a shape on a process layer, encoded as the GDS datatype.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    #[default]
    Drawing,
    Pin,
    Mask,
    Block,
    Filler,
    NoFill,
    Text,
}

/// A process layer together with a purpose.
///
/// This is the layer type of every layout generated by this PDK.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct LayerPurpose {
    pub layer: Sg13g2Layer,
    pub purpose: Purpose,
}

lazy_static! {
    static ref SG13G2_TO_GDS_NUMBER: HashMap<Sg13g2Layer, u16> = HashMap::from_iter([
        (Sg13g2Layer::Activ, 1),
        (Sg13g2Layer::GatPoly, 5),
        (Sg13g2Layer::Cont, 6),
        (Sg13g2Layer::NSd, 7),
        (Sg13g2Layer::Metal1, 8),
        (Sg13g2Layer::Passiv, 9),
        (Sg13g2Layer::Metal2, 10),
        (Sg13g2Layer::PSd, 14),
        (Sg13g2Layer::Via1, 19),
        (Sg13g2Layer::Res, 24),
        (Sg13g2Layer::Trans, 26),
        (Sg13g2Layer::Ind, 27),
        (Sg13g2Layer::SalBlock, 28),
        (Sg13g2Layer::Via2, 29),
        (Sg13g2Layer::Metal3, 30),
        (Sg13g2Layer::NWell, 31),
        (Sg13g2Layer::EmWind, 33),
        (Sg13g2Layer::Mim, 36),
        (Sg13g2Layer::DfPad, 41),
        (Sg13g2Layer::Via3, 49),
        (Sg13g2Layer::Metal4, 50),
        (Sg13g2Layer::Text, 63),
        (Sg13g2Layer::Via4, 66),
        (Sg13g2Layer::Metal5, 67),
        (Sg13g2Layer::MemCap, 69),
        (Sg13g2Layer::Recog, 99),
        (Sg13g2Layer::TopVia1, 125),
        (Sg13g2Layer::TopMetal1, 126),
        (Sg13g2Layer::PolyRes, 128),
        (Sg13g2Layer::TopVia2, 133),
        (Sg13g2Layer::TopMetal2, 134),
        (Sg13g2Layer::Ubm, 155),
        (Sg13g2Layer::RfPad, 158),
        (Sg13g2Layer::PrBoundary, 189),
    ]);
    static ref GDS_NUMBER_TO_SG13G2: HashMap<u16, Sg13g2Layer> =
        HashMap::from_iter(SG13G2_TO_GDS_NUMBER.iter().map(|(k, v)| (*v, *k)));
    static ref SG13G2_BY_NAME: HashMap<&'static str, Sg13g2Layer> =
        HashMap::from_iter(Sg13g2Layer::ALL.iter().map(|l| (l.name(), *l)));
}

impl Sg13g2Layer {
    /// Every layer known to the PDK, ordered by GDS layer number.
    pub const ALL: [Sg13g2Layer; 34] = [
        Self::Activ,
        Self::GatPoly,
        Self::Cont,
        Self::NSd,
        Self::Metal1,
        Self::Passiv,
        Self::Metal2,
        Self::PSd,
        Self::Via1,
        Self::Res,
        Self::Trans,
        Self::Ind,
        Self::SalBlock,
        Self::Via2,
        Self::Metal3,
        Self::NWell,
        Self::EmWind,
        Self::Mim,
        Self::DfPad,
        Self::Via3,
        Self::Metal4,
        Self::Text,
        Self::Via4,
        Self::Metal5,
        Self::MemCap,
        Self::Recog,
        Self::TopVia1,
        Self::TopMetal1,
        Self::PolyRes,
        Self::TopVia2,
        Self::TopMetal2,
        Self::Ubm,
        Self::RfPad,
        Self::PrBoundary,
    ];

    /// The routing metals, bottom to top.
    pub const METALS: [Sg13g2Layer; 7] = [
        Self::Metal1,
        Self::Metal2,
        Self::Metal3,
        Self::Metal4,
        Self::Metal5,
        Self::TopMetal1,
        Self::TopMetal2,
    ];

    /// The layer name used in the foundry layer map.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Activ => "Activ",
            Self::GatPoly => "GatPoly",
            Self::Cont => "Cont",
            Self::NSd => "nSD",
            Self::Metal1 => "Metal1",
            Self::Passiv => "Passiv",
            Self::Metal2 => "Metal2",
            Self::PSd => "pSD",
            Self::Via1 => "Via1",
            Self::Res => "RES",
            Self::Trans => "TRANS",
            Self::Ind => "IND",
            Self::SalBlock => "SalBlock",
            Self::Via2 => "Via2",
            Self::Metal3 => "Metal3",
            Self::NWell => "NWell",
            Self::EmWind => "EmWind",
            Self::Mim => "MIM",
            Self::DfPad => "dfpad",
            Self::Via3 => "Via3",
            Self::Metal4 => "Metal4",
            Self::Text => "TEXT",
            Self::Via4 => "Via4",
            Self::Metal5 => "Metal5",
            Self::MemCap => "MemCap",
            Self::Recog => "Recog",
            Self::TopVia1 => "TopVia1",
            Self::TopMetal1 => "TopMetal1",
            Self::PolyRes => "PolyRes",
            Self::TopVia2 => "TopVia2",
            Self::TopMetal2 => "TopMetal2",
            Self::RfPad => "RFPad",
            Self::Ubm => "UBM",
            Self::PrBoundary => "prBoundary",
        }
    }

    /// Looks up a layer by its foundry name, e.g. `"Metal4"`.
    pub fn from_name(name: &str) -> Option<Self> {
        SG13G2_BY_NAME.get(name).copied()
    }

    /// The GDS layer number.
    pub fn gds_number(&self) -> u16 {
        SG13G2_TO_GDS_NUMBER[self]
    }

    /// The GDS layer for this layer with the given purpose.
    pub fn gds_layer(&self, purpose: Purpose) -> GdsLayer {
        GdsLayer(self.gds_number(), purpose.datatype())
    }

    /// The purposes this layer is drawn with in the foundry layer map.
    pub fn purposes(&self) -> &'static [Purpose] {
        use Purpose::*;
        match self {
            Self::Metal1
            | Self::Metal2
            | Self::Metal3
            | Self::Metal4
            | Self::Metal5
            | Self::TopMetal1
            | Self::TopMetal2 => &[Drawing, Pin, Filler, NoFill, Text],
            Self::Activ => &[Drawing, Pin, Mask, Filler, NoFill],
            Self::GatPoly => &[Drawing, Pin, Filler, NoFill],
            Self::NSd => &[Drawing, Block],
            Self::NWell => &[Drawing, Pin],
            _ => &[Drawing],
        }
    }

    #[inline]
    pub fn is_metal(&self) -> bool {
        Self::METALS.contains(self)
    }

    #[inline]
    pub const fn with_purpose(self, purpose: Purpose) -> LayerPurpose {
        LayerPurpose {
            layer: self,
            purpose,
        }
    }

    #[inline]
    pub const fn drawing(self) -> LayerPurpose {
        self.with_purpose(Purpose::Drawing)
    }

    /// The pin sublayer (datatype 2) of this layer.
    #[inline]
    pub const fn pin(self) -> LayerPurpose {
        self.with_purpose(Purpose::Pin)
    }

    #[inline]
    pub const fn nofill(self) -> LayerPurpose {
        self.with_purpose(Purpose::NoFill)
    }
}

impl fmt::Display for Sg13g2Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Purpose {
    pub const ALL: [Purpose; 7] = [
        Self::Drawing,
        Self::Pin,
        Self::Mask,
        Self::Block,
        Self::Filler,
        Self::NoFill,
        Self::Text,
    ];

    /// The GDS datatype encoding this purpose.
    pub const fn datatype(&self) -> u16 {
        match self {
            Self::Drawing => 0,
            Self::Pin => 2,
            Self::Mask => 20,
            Self::Block => 21,
            Self::Filler => 22,
            Self::NoFill => 23,
            Self::Text => 25,
        }
    }

    pub fn from_datatype(datatype: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.datatype() == datatype)
    }

    /// The suffix used in layer names such as `Metal4drawing`.
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Drawing => "drawing",
            Self::Pin => "pin",
            Self::Mask => "mask",
            Self::Block => "block",
            Self::Filler => "filler",
            Self::NoFill => "nofill",
            Self::Text => "text",
        }
    }
}

impl LayerPurpose {
    #[inline]
    pub const fn new(layer: Sg13g2Layer, purpose: Purpose) -> Self {
        Self { layer, purpose }
    }

    pub fn gds_layer(&self) -> GdsLayer {
        self.layer.gds_layer(self.purpose)
    }

    /// The pin sublayer of the same process layer.
    #[inline]
    pub const fn pin(&self) -> Self {
        self.layer.pin()
    }

    #[inline]
    pub fn is_pin(&self) -> bool {
        self.purpose == Purpose::Pin
    }

    /// Parses a layer name of the form `<Layer><purpose>`, e.g. `"Metal4drawing"` or `"nSDblock"`.
    ///
    /// Only purposes listed in the layer map for that layer are accepted.
    pub fn by_name(name: &str) -> Result<Self> {
        Purpose::ALL
            .into_iter()
            .filter_map(|purpose| {
                let layer = name.strip_suffix(purpose.suffix())?;
                let layer = Sg13g2Layer::from_name(layer)?;
                layer
                    .purposes()
                    .contains(&purpose)
                    .then_some(Self::new(layer, purpose))
            })
            .next()
            .ok_or_else(|| Sg13g2Error::UnknownLayer(name.to_string()))
    }

    /// The layer map name, e.g. `Metal4drawing`.
    pub fn name(&self) -> ArcStr {
        arcstr::format!("{}{}", self.layer.name(), self.purpose.suffix())
    }
}

impl From<Sg13g2Layer> for LayerPurpose {
    fn from(value: Sg13g2Layer) -> Self {
        value.drawing()
    }
}

impl fmt::Display for LayerPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.layer.name(), self.purpose.suffix())
    }
}

impl FromGds for LayerPurpose {
    fn from_gds(layer: GdsLayer) -> Option<Self> {
        let process = GDS_NUMBER_TO_SG13G2.get(&layer.0).copied()?;
        let purpose = Purpose::from_datatype(layer.1)?;
        Some(Self::new(process, purpose))
    }
}

/// The full layer map: every `<Layer><purpose>` name with its GDS layer.
pub fn layer_map() -> IndexMap<ArcStr, GdsLayer> {
    Sg13g2Layer::ALL
        .iter()
        .flat_map(|layer| {
            layer
                .purposes()
                .iter()
                .map(move |purpose| layer.with_purpose(*purpose))
        })
        .map(|lp| (lp.name(), lp.gds_layer()))
        .collect()
}

/// The layer map serialized as YAML (`name: [layer, datatype]`).
pub fn layer_map_yaml() -> Result<String> {
    Ok(serde_yaml::to_string(&layer_map())?)
}

/// The layer map serialized as pretty-printed JSON.
pub fn layer_map_json() -> Result<String> {
    Ok(serde_json::to_string_pretty(&layer_map())?)
}
