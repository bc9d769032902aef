use std::path::PathBuf;

use reagg::{io::Format, IntensiveMode, MissingFieldPolicy};

/// Areal-weighting reaggregation CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "reagg", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Interpolate source polygon attributes onto a target layer (forbids stdout)
    Run(RunArgs),

    /// Print record count, geometry mix and attribute columns of a shapefile
    Inspect(InspectArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Source polygon shapefile carrying the attributes
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub source: PathBuf,

    /// Target polygon shapefile to accumulate onto
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub target: PathBuf,

    /// Output file; format follows --format or the extension
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// JSON config file (flags below override its values)
    #[arg(short, long, env = "REAGG_CONFIG", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Weighted-average field and its denominator, e.g. TotalPM25=TotalPop (repeatable)
    #[arg(short, long = "weight", value_name = "FIELD=DENOMINATOR")]
    pub weights: Vec<String>,

    /// How weighted-average fields accumulate
    #[arg(long, value_name = "area-weighted|denominator-weighted-no-area")]
    pub mode: Option<IntensiveMode>,

    /// What to do with source records lacking a weighting field
    #[arg(long, value_name = "skip|abort")]
    pub on_missing: Option<MissingFieldPolicy>,

    /// Marker written where a denominator accumulated to zero
    #[arg(long, allow_negative_numbers = true)]
    pub no_data: Option<f64>,

    /// Spread the work over all cores
    #[arg(long)]
    pub parallel: bool,

    /// Output format, defaults to the output extension (shapefile if unknown)
    #[arg(long, value_name = "shapefile|geojson|csv")]
    pub format: Option<Format>,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct InspectArgs {
    /// Shapefile to describe
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub file: PathBuf,
}
