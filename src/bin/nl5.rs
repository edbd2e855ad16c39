use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nl5::config::EngineConfig;
use nl5::engine::Nl5Library;
use nl5::filter::{self, Coefficients, FilterDomain, LoadOptions};
use nl5::schematic::Schematic;

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive the NL5 circuit simulator library", long_about = None)]
struct Args {
    /// JSON engine configuration; NL5_* variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Library file, overriding the configuration
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print library version and license details
    Info,
    /// Print field values
    Get {
        /// Schematic file
        circuit: PathBuf,
        /// Field names, e.g. R1 or F1.model
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Assign fields and save the schematic
    Set {
        /// Schematic file
        circuit: PathBuf,
        /// Assignments NAME=VALUE; non-numeric values are written as text
        #[arg(required = true)]
        assignments: Vec<String>,
        /// Save to this file instead of overwriting the schematic
        #[arg(long)]
        save_as: Option<PathBuf>,
    },
    /// Load polynomial coefficients into a transfer-function block
    LoadFilter {
        /// Schematic file
        circuit: PathBuf,
        /// Block name, e.g. F1
        block: String,
        /// Numerator coefficients
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        b: Vec<f64>,
        /// Denominator coefficients
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        a: Vec<f64>,
        /// analog (F(s), highest power first) or digital (F(z))
        #[arg(long, default_value = "analog", value_parser = parse_domain)]
        domain: FilterDomain,
        /// Skip the Roots model domain check
        #[arg(long)]
        no_probe: bool,
        /// Zero-pad the shorter vector instead of rejecting it
        #[arg(long)]
        pad: bool,
        /// Save to this file instead of overwriting the schematic
        #[arg(long)]
        save_as: Option<PathBuf>,
    },
    /// Load one second-order section b0,b1,b2,a0,a1,a2
    LoadSos {
        /// Schematic file
        circuit: PathBuf,
        /// Block name, e.g. F1
        block: String,
        /// Six section values
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        sos: Vec<f64>,
        /// Save to this file instead of overwriting the schematic
        #[arg(long)]
        save_as: Option<PathBuf>,
    },
}

fn info_lines(path: &Path, info: &str, license: Option<&str>) -> Vec<String> {
    vec![
        format!("library: {}", path.display()),
        info.to_owned(),
        format!("license: {}", license.unwrap_or("none (set NL5_LICENSE)")),
    ]
}

fn parse_domain(s: &str) -> Result<FilterDomain, String> {
    s.parse().map_err(|err: filter::FilterError| err.to_string())
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => EngineConfig::default(),
    }
    .apply_env();
    if let Some(library) = &args.library {
        config.library = Some(library.clone());
    }
    Ok(config)
}

fn open<'e>(
    library: &'e Nl5Library,
    config: &EngineConfig,
    path: &Path,
) -> Result<Schematic<'e, Nl5Library>> {
    let mut schematic = Schematic::open(library, path)
        .with_context(|| format!("opening {}", path.display()))?;
    if let Some(timeout) = config.timeout {
        schematic.set_timeout(timeout)?;
    }
    Ok(schematic)
}

fn save(mut schematic: Schematic<'_, Nl5Library>, save_as: Option<&Path>) -> Result<()> {
    match save_as {
        Some(path) => schematic
            .save_as(path)
            .with_context(|| format!("saving {}", path.display()))?,
        None => schematic.save().context("saving schematic")?,
    }
    schematic.close()?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let library = Nl5Library::from_config(&config).context("loading NL5 library")?;

    match args.command {
        Command::Info => {
            let info = library.info();
            for line in info_lines(library.path(), &info, library.license()) {
                println!("{line}");
            }
        }
        Command::Get { circuit, fields } => {
            let schematic = open(&library, &config, &circuit)?;
            for field in &fields {
                let text = schematic
                    .get_text(field)
                    .with_context(|| format!("reading {field}"))?;
                println!("{field} = {text}");
            }
            schematic.close()?;
        }
        Command::Set {
            circuit,
            assignments,
            save_as,
        } => {
            let mut schematic = open(&library, &config, &circuit)?;
            for assignment in &assignments {
                let Some((name, value)) = assignment.split_once('=') else {
                    bail!("expected NAME=VALUE, got {assignment:?}");
                };
                let (name, value) = (name.trim(), value.trim());
                let written = match value.parse::<f64>() {
                    Ok(number) => schematic.set_value(name, number),
                    Err(_) => schematic.set_text(name, value),
                };
                written.with_context(|| format!("setting {name}"))?;
                info!(%name, %value, "field set");
            }
            save(schematic, save_as.as_deref())?;
        }
        Command::LoadFilter {
            circuit,
            block,
            b,
            a,
            domain,
            no_probe,
            pad,
            save_as,
        } => {
            let coefficients = if pad {
                Coefficients::zero_padded(&b, &a, domain)?
            } else {
                Coefficients::new(&b, &a)?
            };
            let mut schematic = open(&library, &config, &circuit)?;
            let options = LoadOptions {
                probe_domain: !no_probe,
            };
            filter::write_coefficients(&mut schematic, &block, &coefficients, domain, options)
                .with_context(|| format!("loading {block}"))?;
            info!(%block, model = %coefficients.model(), "filter loaded");
            save(schematic, save_as.as_deref())?;
        }
        Command::LoadSos {
            circuit,
            block,
            sos,
            save_as,
        } => {
            let mut schematic = open(&library, &config, &circuit)?;
            schematic
                .set_filter_params_sos(&block, sos.as_slice())
                .with_context(|| format!("loading {block}"))?;
            save(schematic, save_as.as_deref())?;
        }
    }
    Ok(())
}
