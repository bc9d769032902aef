use std::path::Path;

use anyhow::{bail, Context, Result};
use reagg::{io::{self, Format}, Config, Interpolator, TargetIndex};
use tracing::{info, warn};

use crate::{cli::RunArgs, logging::timed};

/// Layer the command-line flags over the config file (or defaults).
fn resolve_config(args: &RunArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("[run] failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    for pair in &args.weights {
        let (field, denominator) = Config::parse_weight(pair)?;
        config.set_weight(&field, &denominator);
    }
    if let Some(mode) = args.mode { config.mode = mode }
    if let Some(on_missing) = args.on_missing { config.on_missing = on_missing }
    if let Some(no_data) = args.no_data { config.no_data = no_data }
    if args.parallel { config.parallel = true }

    config.validate()?;
    Ok(config)
}

fn output_format(args: &RunArgs) -> Format {
    args.format
        .or_else(|| Format::from_path(&args.output))
        .unwrap_or(Format::Shapefile)
}

fn check_output(path: &Path, force: bool) -> Result<()> {
    if path.as_os_str() == "-" {
        bail!("[run] refusing to write to stdout; pass an output file path");
    }
    if path.exists() && !force {
        bail!("[run] output {} already exists (use --force to overwrite)", path.display());
    }
    Ok(())
}

pub fn run(_cli: &crate::cli::Cli, args: &RunArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let format = output_format(args);
    check_output(&args.output, args.force)?;

    let mut sources = timed("load source", || io::shp::read_source_layer(&args.source))?;
    let mut targets = timed("load target", || io::shp::read_target_layer(&args.target))?;
    info!(sources = sources.len(), targets = targets.len(), fields = sources.schema.len(), "layers loaded");

    let reprojectors = config.projection.reprojectors()?;
    timed("reproject", || -> Result<()> {
        if let Some(reprojector) = &reprojectors.source { sources.reproject(reprojector)? }
        if let Some(reprojector) = &reprojectors.target { targets.reproject(reprojector)? }
        Ok(())
    })?;

    let policy = config.policy(&sources.schema)?;
    let index = TargetIndex::new(&targets.records);
    let interpolator = Interpolator::new(&index, policy).with_options(config.options());
    let report = timed("interpolate", || interpolator.interpolate(&sources, &mut targets))?;

    info!(
        contributing = report.contributing,
        overlaps = report.overlaps,
        warnings = report.warnings.len(),
        "interpolation finished"
    );
    let skipped = report.skipped_records().count();
    if skipped > 0 {
        warn!(skipped, "source records skipped for missing weighting fields");
    }
    let undefined = report.undefined().count();
    if undefined > 0 {
        warn!(undefined, no_data = config.no_data, "weighted fields left at the no-data marker");
    }

    timed("write", || io::write_target_layer(&args.output, &targets, format))
        .with_context(|| format!("[run] failed to write {format} output {}", args.output.display()))?;
    info!(path = %args.output.display(), %format, "output written");

    Ok(())
}
