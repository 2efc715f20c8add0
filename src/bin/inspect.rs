//! Network inspector for gridbridge
//!
//! Loads a serialized network and prints element tables, going through the
//! same flat dataframe path a foreign caller sees.

use anyhow::{Context, Result};
use clap::Parser;
use gridbridge::config::{BridgeConfig, CONFIG_FILE_NAME};
use gridbridge::dataframe::{free_dataframe, ColumnView, Dataframe, DataframeReader, Sentinel};
use gridbridge::logging;
use gridbridge::network::{dataframes, io, ElementType, NetworkFormat};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gridbridge-inspect")]
#[command(about = "Print the element tables of a grid network file")]
struct Args {
    /// Network file (.json or .toml)
    file: PathBuf,

    /// Input format, guessed from the extension when omitted
    #[arg(short, long)]
    format: Option<NetworkFormat>,

    /// Only print this element type
    #[arg(short, long)]
    element: Option<ElementType>,

    /// Print series metadata instead of element rows
    #[arg(short, long)]
    metadata: bool,

    /// Configuration file (defaults to ./gridbridge.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    logging::init(&config.logging);

    let network = io::load_file(&args.file, args.format)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;

    eprintln!(
        "Network '{}': {} buses, {} generators, {} loads, {} lines",
        network.id,
        network.buses.len(),
        network.generators.len(),
        network.loads.len(),
        network.lines.len()
    );

    let element_types = match args.element {
        Some(ty) => vec![ty],
        None => ElementType::ALL.to_vec(),
    };

    for ty in element_types {
        let dataframe = if args.metadata {
            dataframes::series_metadata(ty)?
        } else {
            dataframes::elements_dataframe(&network, ty, config.dataframes.include_properties)?
        };
        println!("\n[{}]", ty);
        print_flat(dataframe)?;
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    if let Some(path) = path {
        return BridgeConfig::load(path).context("Failed to load config");
    }
    let local = Path::new(CONFIG_FILE_NAME);
    if local.exists() {
        return BridgeConfig::load(local).context("Failed to load config");
    }
    Ok(BridgeConfig::default())
}

/// Hand the dataframe over, read it back through the validating reader and
/// release it, as a caller would.
fn print_flat(dataframe: Dataframe) -> Result<()> {
    let raw = dataframe.into_ffi()?;
    let rendered = unsafe { DataframeReader::from_raw(raw) }.and_then(|reader| render(&reader));
    unsafe { free_dataframe(raw) };
    println!("{}", rendered?);
    Ok(())
}

fn render(reader: &DataframeReader<'_>) -> gridbridge::BridgeResult<String> {
    let mut columns = Vec::with_capacity(reader.series_count());
    for series in reader.all_series() {
        let mut cells = Vec::with_capacity(reader.row_count() + 1);
        let header = if series.index {
            format!("{}*", series.name)
        } else {
            series.name.to_string()
        };
        cells.push(header);
        for row in 0..series.len() {
            cells.push(cell(&series.data, row)?);
        }
        columns.push(cells);
    }

    let widths: Vec<usize> = columns
        .iter()
        .map(|c| c.iter().map(|s| s.chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for row in 0..=reader.row_count() {
        let line: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(cells, &width)| format!("{:<width$}", cells[row], width = width))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out.push_str(&format!("({} rows)", reader.row_count()));
    Ok(out)
}

fn cell(data: &ColumnView<'_>, row: usize) -> gridbridge::BridgeResult<String> {
    const ABSENT: &str = "-";
    Ok(match data {
        ColumnView::String(values) => match values.get_opt(row)? {
            Some(value) => value.to_string(),
            None => ABSENT.to_string(),
        },
        ColumnView::Double(values) => match values[row].present() {
            Some(value) => value.to_string(),
            None => ABSENT.to_string(),
        },
        ColumnView::Int(values) => match values[row].present() {
            Some(value) => value.to_string(),
            None => ABSENT.to_string(),
        },
        ColumnView::Boolean(values) => values.get(row).unwrap_or_default().to_string(),
    })
}
