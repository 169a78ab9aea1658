//! gcodescope CLI
//!
//! Loads a G-code file, runs it through the viewer pipeline and prints the
//! model analysis.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use gcodescope::settings::{default_config_path, IndexStrategy, ViewerConfig};
use gcodescope::{init_logging, inspect_file, BUILD_DATE, VERSION};

#[derive(Parser)]
#[command(name = "gcodescope")]
#[command(about = "Inspect a G-code file layer by layer", long_about = None)]
struct Cli {
    /// G-code file to inspect
    file: PathBuf,

    /// Viewer config (.toml or .json); the platform default is used if present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Locate the command executing at this progress percentage
    #[arg(short, long)]
    percentage: Option<f64>,

    /// Order layers by Z height
    #[arg(long)]
    sort_layers: bool,

    /// Use per-layer ranges instead of the balanced tree for lookups
    #[arg(long)]
    layer_ranges: bool,

    /// Print the full analysis as JSON
    #[arg(long)]
    json: bool,
}

fn load_config(path: Option<PathBuf>) -> Result<ViewerConfig> {
    if let Some(path) = path {
        return Ok(ViewerConfig::load_from_file(&path)?);
    }
    match default_config_path() {
        Ok(path) if path.exists() => Ok(ViewerConfig::load_from_file(&path)?),
        _ => Ok(ViewerConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    tracing::debug!("gcodescope {} built {}", VERSION, BUILD_DATE);

    let mut config = load_config(cli.config)?;
    if cli.sort_layers {
        config.reader.sort_layers = true;
    }
    if cli.layer_ranges {
        config.reader.index_strategy = IndexStrategy::LayerRanges;
    }

    let report = inspect_file(&cli.file, config, cli.percentage).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report.info)?);
        return Ok(());
    }

    let summary = &report.summary;
    println!("File:          {}", cli.file.display());
    println!("Layers:        {}", summary.layer_count);
    println!("Commands:      {}", summary.command_count);
    println!(
        "Model size:    {:.2} x {:.2} x {:.2} mm",
        summary.model_size.x, summary.model_size.y, summary.model_size.z
    );
    println!("Layer height:  {:.3} mm", summary.layer_height);
    println!("Filament:      {:.1} mm", summary.total_filament);
    println!("Print time:    {:.0} s", summary.print_time);

    if let Some(pct) = cli.percentage {
        match &report.located {
            Some((locator, layer)) => println!(
                "At {:.1}%:      {} (z={:.3}, {} commands)",
                pct, locator, layer.z, layer.command_count
            ),
            None => println!("At {:.1}%:      no command", pct),
        }
    }

    Ok(())
}
