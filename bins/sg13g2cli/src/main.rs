use std::path::{Path, PathBuf};

use anyhow::Context as _;
use arcstr::ArcStr;
use clap::{Parser as ClapParser, Subcommand};
use gds::GdsLibrary;
use gdsconv::conv::{labels, layers_used, FromGds};
use gdsconv::export::GdsExportOpts;
use gdsconv::import::{import_gds, GdsImportOpts};
use geometry::prelude::*;
use indexmap::IndexMap;
use layir::Info;
use schemconv::spice::Netlist;
use schemconv::xschem::Schematic;
use serde::Serialize;
use serde_json::Value;
use sg13g2::catalog;
use sg13g2::layers::{layer_map_json, layer_map_yaml};
use sg13g2::rules::{cross_section, cross_sections, DesignRules};
use sg13g2::stack::{LayerStack, StackExportOpts};
use sg13g2::units::to_um;
use sg13g2::{Context, LayerPurpose};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

mod config;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    run(args)
}

/// Arguments to the `sg13g2` command.
#[derive(ClapParser)]
#[command(
    version,
    about,
    long_about = "Generate SG13G2 layout cells and dump process data"
)]
pub struct Args {
    /// Path to a TOML config file.
    ///
    /// Defaults to `sg13g2.toml` in the working directory, if present.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the parametric cells.
    List {
        /// Print every cell with its default parameters as JSON.
        #[arg(long)]
        defaults: bool,
    },
    /// Generate a cell and write it to a GDS file.
    Write {
        /// The catalog name of the cell.
        cell: String,
        #[command(flatten)]
        params: ParamArgs,
        /// The GDS file to write.
        ///
        /// Defaults to `<output_dir>/<cell name>.gds`.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print the ports, bounding box and metadata of a generated cell.
    Describe {
        /// The catalog name of the cell.
        cell: String,
        #[command(flatten)]
        params: ParamArgs,
    },
    /// Summarize the cells, layers and labels of a GDS file.
    Info {
        /// The GDS file to read.
        file: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Dump the layer map.
    Layers {
        /// Emit JSON instead of YAML.
        #[arg(long)]
        json: bool,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Dump the layer stack for electromagnetic simulation.
    Stack {
        /// Leave out the silicon substrate.
        #[arg(long)]
        no_substrate: bool,
        /// Thickness of an air region above the stack, in micrometres.
        #[arg(long)]
        air_above: Option<f64>,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List the routing cross-sections, or show the named one.
    CrossSections { name: Option<String> },
    /// Convert an xschem schematic to YAML.
    Xschem {
        /// The `.sch` file to read.
        file: PathBuf,
        /// Emit JSON instead of YAML.
        #[arg(long)]
        json: bool,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Dump the subcircuits of a SPICE netlist as YAML.
    Spice {
        /// The netlist to read.
        file: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Cell parameters given on the command line.
#[derive(clap::Args, Default)]
struct ParamArgs {
    /// Cell parameters as a JSON object, e.g. `{"width": 10}`.
    #[arg(short, long, conflicts_with = "params_file")]
    params: Option<String>,
    /// Read cell parameters from a TOML or JSON file.
    #[arg(long)]
    params_file: Option<PathBuf>,
}

impl ParamArgs {
    /// The parameters as a JSON value; `null` when none were given.
    fn value(&self) -> anyhow::Result<Value> {
        if let Some(text) = &self.params {
            return serde_json::from_str(text)
                .with_context(|| format!("Failed to parse parameters {text:?} as JSON."));
        }
        let Some(path) = &self.params_file else {
            return Ok(Value::Null);
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read parameter file {:?}.", path))?;
        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse parameter file {:?}.", path))
        } else {
            toml::from_str(&text)
                .with_context(|| format!("Failed to parse parameter file {:?}.", path))
        }
    }
}

/// Runs a parsed command line.
pub fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::load(args.config.as_deref())?;
    match args.command {
        Command::List { defaults } => {
            if defaults {
                let cells = catalog::cells()?;
                emit(&serde_json::to_string_pretty(&cells)?, None)
            } else {
                emit(&catalog::available_pcells_yaml()?, None)
            }
        }
        Command::Write { cell, params, out } => {
            let path = write_cell(&config, &cell, params.value()?, out)?;
            eprintln!("Wrote {cell} to {:?}.", path);
            Ok(())
        }
        Command::Describe { cell, params } => {
            emit(&describe_cell(&cell, params.value()?)?, None)
        }
        Command::Info { file, out } => emit(&gds_info(&file)?, out.as_deref()),
        Command::Layers { json, out } => {
            let text = if json {
                layer_map_json()?
            } else {
                layer_map_yaml()?
            };
            emit(&text, out.as_deref())
        }
        Command::Stack {
            no_substrate,
            air_above,
            out,
        } => {
            let stack = LayerStack::sg13g2();
            stack.validate()?;
            let text = stack.to_yaml(StackExportOpts {
                include_substrate: !no_substrate,
                air_above_um: air_above,
            })?;
            emit(&text, out.as_deref())
        }
        Command::CrossSections { name } => {
            let rules = DesignRules::sg13g2();
            let text = match name {
                Some(name) => serde_yaml::to_string(&cross_section(&rules, &name)?)?,
                None => serde_yaml::to_string(&cross_sections(&rules)?)?,
            };
            emit(&text, None)
        }
        Command::Xschem { file, json, out } => {
            let sch = Schematic::parse_file(&file)
                .with_context(|| format!("Failed to parse schematic {:?}.", file))?;
            let text = if json { sch.to_json()? } else { sch.to_yaml()? };
            emit(&text, out.as_deref())
        }
        Command::Spice { file, out } => {
            let netlist = Netlist::parse_file(&file)
                .with_context(|| format!("Failed to parse netlist {:?}.", file))?;
            emit(&netlist.to_yaml()?, out.as_deref())
        }
    }
}

/// Writes `text` to `out`, or to stdout if no path is given.
fn emit(text: &str, out: Option<&Path>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write output to {:?}.", path))?;
            tracing::debug!(?path, "wrote output");
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// Generates a catalog cell and writes it to GDS, returning the file written.
fn write_cell(
    config: &Config,
    cell: &str,
    params: Value,
    out: Option<PathBuf>,
) -> anyhow::Result<PathBuf> {
    let mut ctx = Context::new();
    let id = catalog::build(&mut ctx, cell, params)
        .with_context(|| format!("Failed to generate cell `{cell}`."))?;
    let name = ctx.cell(id).name().clone();
    let path = out.unwrap_or_else(|| config.output_dir.join(format!("{name}.gds")));
    let mut opts = GdsExportOpts::new(config.library_name.clone().unwrap_or(name));
    opts.port_labels = config.port_labels;
    ctx.write_cell(id, opts, &path)
        .with_context(|| format!("Failed to write GDS to {:?}.", path))?;
    Ok(path)
}

#[derive(Serialize)]
struct PortReport {
    center: [f64; 2],
    width: f64,
    orientation: Rotation,
    layer: ArcStr,
}

#[derive(Serialize)]
struct CellReport<'a> {
    name: &'a str,
    /// `[left, bottom, right, top]` in micrometres.
    bbox: Option<[f64; 4]>,
    ports: IndexMap<ArcStr, PortReport>,
    info: &'a Info,
}

fn describe_cell(cell: &str, params: Value) -> anyhow::Result<String> {
    let mut ctx = Context::new();
    let id = catalog::build(&mut ctx, cell, params)
        .with_context(|| format!("Failed to generate cell `{cell}`."))?;
    let layout = ctx.cell(id);
    let report = CellReport {
        name: layout.name(),
        bbox: ctx.bbox(id).map(|r| {
            [
                to_um(r.left()),
                to_um(r.bot()),
                to_um(r.right()),
                to_um(r.top()),
            ]
        }),
        ports: layout
            .ports()
            .map(|(name, port)| {
                let report = PortReport {
                    center: [to_um(port.center().x), to_um(port.center().y)],
                    width: to_um(port.width()),
                    orientation: port.orientation(),
                    layer: port.layer().name(),
                };
                (name.clone(), report)
            })
            .collect(),
        info: layout.info(),
    };
    Ok(serde_yaml::to_string(&report)?)
}

#[derive(Serialize)]
struct GdsCellReport {
    name: ArcStr,
    layers: Vec<ArcStr>,
    labels: Vec<(ArcStr, ArcStr)>,
}

#[derive(Serialize)]
struct GdsReport {
    library: ArcStr,
    cells: Vec<GdsCellReport>,
}

/// The SG13G2 name of a GDS layer, or `layer/datatype` if it has none.
fn layer_name(layer: gdsconv::GdsLayer) -> ArcStr {
    match LayerPurpose::from_gds(layer) {
        Some(lp) => lp.name(),
        None => arcstr::format!("{layer}"),
    }
}

fn gds_info(path: &Path) -> anyhow::Result<String> {
    let gds = GdsLibrary::load(path).with_context(|| format!("Failed to read GDS {:?}.", path))?;
    let lib = import_gds(&gds, GdsImportOpts::default())
        .with_context(|| format!("Failed to import GDS {:?}.", path))?;
    let cells = lib
        .cells()
        .map(|(_, cell)| {
            let mut layers: Vec<_> = cell.elements().map(|e| *e.layer()).collect();
            layers.sort();
            layers.dedup();
            GdsCellReport {
                name: cell.name().clone(),
                layers: layers.into_iter().map(layer_name).collect(),
                labels: labels(&lib, cell.name())
                    .into_iter()
                    .map(|(text, layer)| (text, layer_name(layer)))
                    .collect(),
            }
        })
        .collect();
    tracing::debug!(layers = layers_used(&lib).len(), "read GDS library");
    let report = GdsReport {
        library: gds.name.clone(),
        cells,
    };
    Ok(serde_yaml::to_string(&report)?)
}
