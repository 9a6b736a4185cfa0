//! The SG13G2 vertical layer stack.
//!
//! Thicknesses and z-positions are in micrometres, measured from the top of
//! the silicon substrate.

use arcstr::ArcStr;
use indexmap::IndexMap;
use layir::Info;
use serde::{Deserialize, Serialize};

use crate::layers::Sg13g2Layer;
use crate::{Result, Sg13g2Error};

/// A material referenced by the layer stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// The name.
    pub name: ArcStr,
    /// Relative permittivity.
    pub permittivity: f64,
    /// Conductivity in S/m.
    pub conductivity: f64,
}

/// What a stack level is made of electrically.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelKind {
    /// Bulk silicon.
    Substrate,
    /// Active area.
    Diffusion,
    /// Gate polysilicon.
    Poly,
    /// A routing metal.
    Metal,
    /// A cut between two levels.
    Via,
}

/// One level of the layer stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerLevel {
    /// The name.
    pub name: ArcStr,
    /// The drawn layer defining this level, if any.
    pub layer: Option<Sg13g2Layer>,
    /// What the level is made of.
    pub kind: LevelKind,
    /// Vertical thickness.
    pub thickness_um: f64,
    /// Height of the bottom face.
    pub zmin_um: f64,
    /// Key into the material table.
    pub material: ArcStr,
    /// Sheet resistance in ohm/square.
    pub sheet_resistance: Option<f64>,
    /// For vias, the levels below and above.
    pub connects: Option<(ArcStr, ArcStr)>,
    /// Additional process data.
    pub info: Info,
}

/// Options for exporting the stack for electromagnetic simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StackExportOpts {
    /// Include the silicon substrate below z = 0.
    pub include_substrate: bool,
    /// Thickness of an air region above the top of the stack, in micrometres.
    pub air_above_um: Option<f64>,
}

impl Default for StackExportOpts {
    fn default() -> Self {
        Self {
            include_substrate: true,
            air_above_um: None,
        }
    }
}

/// The process layer stack with its material table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStack {
    /// The name.
    pub name: ArcStr,
    /// Levels from the bottom up.
    pub levels: Vec<LayerLevel>,
    /// Materials by name.
    pub materials: IndexMap<ArcStr, Material>,
}

#[derive(Serialize)]
struct StackExport<'a> {
    name: &'a str,
    layers: IndexMap<ArcStr, LevelExport>,
    materials: IndexMap<ArcStr, &'a Material>,
}

#[derive(Serialize)]
struct LevelExport {
    #[serde(skip_serializing_if = "Option::is_none")]
    layer: Option<[u16; 2]>,
    kind: &'static str,
    zmin: f64,
    thickness: f64,
    material: ArcStr,
    #[serde(skip_serializing_if = "Option::is_none")]
    sheet_resistance: Option<f64>,
}

impl LayerLevel {
    fn new(
        name: &str,
        layer: Option<Sg13g2Layer>,
        kind: LevelKind,
        zmin_um: f64,
        thickness_um: f64,
        material: &str,
    ) -> Self {
        Self {
            name: name.into(),
            layer,
            kind,
            thickness_um,
            zmin_um,
            material: material.into(),
            sheet_resistance: None,
            connects: None,
            info: Info::new(),
        }
    }

    fn metal(name: &str, layer: Sg13g2Layer, zmin_um: f64, thickness_um: f64, rs: f64) -> Self {
        let mut level = Self::new(
            name,
            Some(layer),
            LevelKind::Metal,
            zmin_um,
            thickness_um,
            "aluminum",
        );
        level.sheet_resistance = Some(rs);
        level
    }

    fn via(
        name: &str,
        layer: Sg13g2Layer,
        zmin_um: f64,
        thickness_um: f64,
        below: &str,
        above: &str,
    ) -> Self {
        let mut level = Self::new(
            name,
            Some(layer),
            LevelKind::Via,
            zmin_um,
            thickness_um,
            "tungsten",
        );
        level.connects = Some((below.into(), above.into()));
        level
    }

    /// Height of the top face.
    #[inline]
    pub fn zmax_um(&self) -> f64 {
        self.zmin_um + self.thickness_um
    }
}

impl LayerStack {
    /// The SG13G2 back-end-of-line stack.
    pub fn sg13g2() -> Self {
        let mut substrate =
            LayerLevel::new("substrate", None, LevelKind::Substrate, -280., 280., "si");
        substrate.info.insert("resistivity_ohm_cm", 20.);
        let mut poly = LayerLevel::new(
            "poly",
            Some(Sg13g2Layer::GatPoly),
            LevelKind::Poly,
            0.4,
            0.16,
            "poly_si",
        );
        poly.sheet_resistance = Some(7.);
        let mut topmetal2 = LayerLevel::metal("TopMetal2", Sg13g2Layer::TopMetal2, 10.83, 3., 0.0145);
        topmetal2.info.insert("pad_metal", true);
        let levels = vec![
            substrate,
            LayerLevel::new(
                "active",
                Some(Sg13g2Layer::Activ),
                LevelKind::Diffusion,
                0.,
                0.4,
                "si",
            ),
            poly,
            LayerLevel::via("Cont", Sg13g2Layer::Cont, 0.4, 0.24, "active", "Metal1"),
            LayerLevel::metal("Metal1", Sg13g2Layer::Metal1, 0.64, 0.42, 0.135),
            LayerLevel::via("Via1", Sg13g2Layer::Via1, 1.06, 0.54, "Metal1", "Metal2"),
            LayerLevel::metal("Metal2", Sg13g2Layer::Metal2, 1.6, 0.49, 0.103),
            LayerLevel::via("Via2", Sg13g2Layer::Via2, 2.09, 0.54, "Metal2", "Metal3"),
            LayerLevel::metal("Metal3", Sg13g2Layer::Metal3, 2.63, 0.49, 0.103),
            LayerLevel::via("Via3", Sg13g2Layer::Via3, 3.12, 0.54, "Metal3", "Metal4"),
            LayerLevel::metal("Metal4", Sg13g2Layer::Metal4, 3.66, 0.49, 0.103),
            LayerLevel::via("Via4", Sg13g2Layer::Via4, 4.15, 0.54, "Metal4", "Metal5"),
            LayerLevel::metal("Metal5", Sg13g2Layer::Metal5, 4.69, 0.49, 0.103),
            LayerLevel::via(
                "TopVia1",
                Sg13g2Layer::TopVia1,
                5.18,
                0.85,
                "Metal5",
                "TopMetal1",
            ),
            LayerLevel::metal("TopMetal1", Sg13g2Layer::TopMetal1, 6.03, 2., 0.021),
            LayerLevel::via(
                "TopVia2",
                Sg13g2Layer::TopVia2,
                8.03,
                2.8,
                "TopMetal1",
                "TopMetal2",
            ),
            topmetal2,
        ];
        let materials = [
            ("si", 11.9, 5.),
            ("poly_si", 11.9, 1e5),
            ("aluminum", 1., 3.77e7),
            ("tungsten", 1., 1.89e7),
            ("sio2", 4.1, 0.),
            ("air", 1., 0.),
        ]
        .into_iter()
        .map(|(name, permittivity, conductivity)| {
            (
                ArcStr::from(name),
                Material {
                    name: name.into(),
                    permittivity,
                    conductivity,
                },
            )
        })
        .collect();
        Self {
            name: arcstr::literal!("sg13g2"),
            levels,
            materials,
        }
    }

    /// Looks up a level by name.
    pub fn level(&self, name: &str) -> Option<&LayerLevel> {
        self.levels.iter().find(|l| l.name == name)
    }

    /// The level drawn with the given layer.
    pub fn level_for_layer(&self, layer: Sg13g2Layer) -> Option<&LayerLevel> {
        self.levels.iter().find(|l| l.layer == Some(layer))
    }

    /// The top of the highest level.
    pub fn zmax(&self) -> f64 {
        self.levels
            .iter()
            .map(LayerLevel::zmax_um)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// The metal levels, bottom to top.
    pub fn metals(&self) -> impl Iterator<Item = &LayerLevel> {
        self.levels.iter().filter(|l| l.kind == LevelKind::Metal)
    }

    /// Checks that metal levels are ordered by z without overlapping and
    /// that every via exactly spans the gap between the levels it connects.
    pub fn validate(&self) -> Result<()> {
        const TOL: f64 = 1e-6;
        let metals: Vec<_> = self.metals().collect();
        for pair in metals.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            if upper.zmin_um < lower.zmin_um {
                return Err(Sg13g2Error::Stack(format!(
                    "metal `{}` is listed above `{}` but sits below it",
                    upper.name, lower.name
                )));
            }
            if upper.zmin_um < lower.zmax_um() - TOL {
                return Err(Sg13g2Error::Stack(format!(
                    "metals `{}` and `{}` overlap",
                    lower.name, upper.name
                )));
            }
        }
        for level in &self.levels {
            if level.thickness_um <= 0. {
                return Err(Sg13g2Error::Stack(format!(
                    "level `{}` has non-positive thickness",
                    level.name
                )));
            }
            if !self.materials.contains_key(&level.material) {
                return Err(Sg13g2Error::Stack(format!(
                    "level `{}` uses unknown material `{}`",
                    level.name, level.material
                )));
            }
            let Some((below, above)) = &level.connects else {
                continue;
            };
            let lookup = |name: &ArcStr| {
                self.level(name).ok_or_else(|| {
                    Sg13g2Error::Stack(format!(
                        "via `{}` connects unknown level `{}`",
                        level.name, name
                    ))
                })
            };
            let (below, above) = (lookup(below)?, lookup(above)?);
            if (level.zmin_um - below.zmax_um()).abs() > TOL
                || (level.zmax_um() - above.zmin_um).abs() > TOL
            {
                return Err(Sg13g2Error::Stack(format!(
                    "via `{}` spans [{}, {}] but the gap between `{}` and `{}` is [{}, {}]",
                    level.name,
                    level.zmin_um,
                    level.zmax_um(),
                    below.name,
                    above.name,
                    below.zmax_um(),
                    above.zmin_um
                )));
            }
        }
        Ok(())
    }

    /// Serializes the stack for electromagnetic simulation.
    ///
    /// The back-end oxide fills everything from z = 0 to the top of the stack;
    /// an air region of `air_above_um` is stacked on top when requested.
    /// Only the materials of exported layers are written.
    pub fn to_yaml(&self, opts: StackExportOpts) -> Result<String> {
        if let Some(air) = opts.air_above_um {
            if air.is_nan() || air <= 0. {
                return Err(Sg13g2Error::invalid_param(
                    "air_above_um",
                    arcstr::format!("air thickness must be positive, got {air}"),
                ));
            }
        }
        let mut layers = IndexMap::new();
        for level in &self.levels {
            if level.kind == LevelKind::Substrate && !opts.include_substrate {
                continue;
            }
            layers.insert(
                level.name.clone(),
                LevelExport {
                    layer: level.layer.map(|l| {
                        let gds = l.drawing().gds_layer();
                        [gds.0, gds.1]
                    }),
                    kind: match level.kind {
                        LevelKind::Substrate => "substrate",
                        LevelKind::Diffusion => "diffusion",
                        LevelKind::Poly => "poly",
                        LevelKind::Metal => "metal",
                        LevelKind::Via => "via",
                    },
                    zmin: level.zmin_um,
                    thickness: level.thickness_um,
                    material: level.material.clone(),
                    sheet_resistance: level.sheet_resistance,
                },
            );
        }
        let zmax = self.zmax();
        layers.insert(
            arcstr::literal!("oxide"),
            LevelExport {
                layer: None,
                kind: "dielectric",
                zmin: 0.,
                thickness: zmax,
                material: arcstr::literal!("sio2"),
                sheet_resistance: None,
            },
        );
        if let Some(air) = opts.air_above_um {
            layers.insert(
                arcstr::literal!("air"),
                LevelExport {
                    layer: None,
                    kind: "dielectric",
                    zmin: zmax,
                    thickness: air,
                    material: arcstr::literal!("air"),
                    sheet_resistance: None,
                },
            );
        }
        let materials = layers
            .values()
            .filter_map(|l| {
                let material = self.materials.get(&l.material)?;
                Some((l.material.clone(), material))
            })
            .collect();
        let export = StackExport {
            name: &self.name,
            layers,
            materials,
        };
        tracing::debug!(levels = export.layers.len(), "exporting layer stack");
        Ok(serde_yaml::to_string(&export)?)
    }
}
