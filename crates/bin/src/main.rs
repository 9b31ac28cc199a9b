//! Hobart CLI binary.
//!
//! Provides command-line interface for Hobart portfolio construction.

use clap::{Parser, Subcommand, ValueEnum};
use hobart::data::{AssetCode, PanelCache};
use hobart::output::{ExportFormat, Exporter};
use hobart::risk::{ReturnMode, ScalingBasis};
use hobart::{Analysis, AnalysisConfig, LoadedPrices, analyze, load_prices};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hobart")]
#[command(about = "Hobart: long-only portfolio construction from daily closing prices", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored price files: codes, observation counts and date ranges
    Inspect {
        /// Price CSV files (date,code,close)
        #[arg(long, num_args = 1.., required = true)]
        prices: Vec<PathBuf>,
    },

    /// Compute statistics and optimized allocations for a set of assets
    Analyze {
        /// Price CSV files (date,code,close)
        #[arg(long, num_args = 1.., required = true)]
        prices: Vec<PathBuf>,

        /// Benchmark index CSV (date,close), enables beta and CAPM
        #[arg(long)]
        index: Option<PathBuf>,

        /// Comma-separated asset codes
        #[arg(long, value_delimiter = ',', required = true)]
        assets: Vec<String>,

        /// Most recent prices per asset
        #[arg(long)]
        window: Option<usize>,

        /// Return formula
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Scaling basis for mean and volatility
        #[arg(long, value_enum)]
        basis: Option<BasisArg>,

        /// Maximum weight per asset
        #[arg(long)]
        upper_bound: Option<f64>,

        /// Risk-free rate, on the scale of the reported returns
        #[arg(long)]
        risk_free: Option<f64>,

        /// Configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Write output to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Simple,
    Log,
}

#[derive(Clone, Copy, ValueEnum)]
enum BasisArg {
    /// Periods per year from the configuration (252 by default)
    Annual,
    /// Number of return observations in the window
    Window,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Inspect { prices } => {
            let mut cache = PanelCache::new();
            let loaded = load_prices(prices.as_slice(), None, &mut cache)?;
            print_inventory(&loaded);
        }
        Commands::Analyze {
            prices,
            index,
            assets,
            window,
            mode,
            basis,
            upper_bound,
            risk_free,
            config,
            format,
            output,
        } => {
            let mut settings = AnalysisConfig::load(config.as_deref())?;
            if let Some(window) = window {
                settings.returns.window = window;
            }
            if let Some(mode) = mode {
                settings.returns.mode = match mode {
                    ModeArg::Simple => ReturnMode::Simple,
                    ModeArg::Log => ReturnMode::Log,
                };
            }
            if let Some(basis) = basis {
                settings.statistics.basis = match basis {
                    BasisArg::Annual => {
                        ScalingBasis::PeriodsPerYear(settings.statistics.periods_per_year)
                    }
                    BasisArg::Window => ScalingBasis::Window,
                };
            }
            if let Some(ub) = upper_bound {
                settings.optimizer.upper_bound = ub;
            }
            if let Some(rf) = risk_free {
                settings.statistics.risk_free_rate = rf;
            }

            let codes = assets
                .iter()
                .map(|a| AssetCode::new(a))
                .collect::<Result<Vec<_>, _>>()?;

            let mut cache = PanelCache::new();
            let loaded = load_prices(prices.as_slice(), index.as_deref(), &mut cache)?;
            let analysis = analyze(&loaded.panel, loaded.index.as_ref(), &codes, &settings)?;

            let rendered = match format {
                OutputFormat::Text => render_text(&analysis),
                OutputFormat::Json => analysis.report()?.to_json()?,
                OutputFormat::Csv => render_csv(&analysis)?,
            };
            write_output(&rendered, output.as_deref())?;
        }
    }

    Ok(())
}

fn write_output(rendered: &str, path: Option<&Path>) -> std::io::Result<()> {
    match path {
        Some(path) => {
            fs::write(path, rendered)?;
            tracing::info!(path = %path.display(), "wrote output");
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn print_inventory(loaded: &LoadedPrices) {
    println!("\nSTORED PRICES");
    println!("{}", "=".repeat(80));
    println!("Files loaded: {}", loaded.files.len());
    for path in &loaded.duplicates {
        println!("  Skipped duplicate: {}", path.display());
    }
    println!("Gaps skipped: {}", loaded.panel.gaps());
    println!();
    println!(
        "{:<12} {:>12} {:>14} {:>14}",
        "Code", "Prices", "First", "Last"
    );
    println!("{}", "-".repeat(80));
    for code in loaded.panel.codes() {
        let count = loaded.panel.series(code).map_or(0, |s| s.len());
        let (first, last) = loaded
            .panel
            .date_range(code)
            .map_or((String::new(), String::new()), |(f, l)| {
                (f.to_string(), l.to_string())
            });
        println!("{:<12} {:>12} {:>14} {:>14}", code, count, first, last);
    }
    println!("{}", "=".repeat(80));
}

fn render_text(analysis: &Analysis) -> String {
    let mut out = String::new();
    let dates = analysis.returns.return_dates();

    out.push_str("\nPORTFOLIO ANALYSIS\n");
    out.push_str(&"=".repeat(80));
    out.push('\n');
    if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
        out.push_str(&format!(
            "Returns: {} to {} ({} observations, {:?})\n",
            first,
            last,
            analysis.returns.n_observations(),
            analysis.returns.mode()
        ));
    }
    out.push_str(&format!(
        "Basis: {} (x{})\n",
        analysis.config.statistics.basis, analysis.statistics.multiplier
    ));
    if let Some(index) = &analysis.index_name {
        out.push_str(&format!("Benchmark: {}\n", index));
    }
    out.push('\n');

    out.push_str(&analysis.statistics_table().to_ascii_table());
    out.push('\n');
    out.push_str(&analysis.covariance_table().to_ascii_table());
    out.push('\n');
    out.push_str(&analysis.correlation_table().to_ascii_table());
    out.push('\n');
    out.push_str(&analysis.allocation_table().to_ascii_table());
    out
}

fn render_csv(analysis: &Analysis) -> Result<String, Box<dyn std::error::Error>> {
    let mut out = analysis.statistics_export().export_to_string(ExportFormat::Csv)?;
    out.push('\n');
    out.push_str(
        &analysis
            .allocation_exports()
            .export_to_string(ExportFormat::Csv)?,
    );
    Ok(out)
}
