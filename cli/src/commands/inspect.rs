use anyhow::{ensure, Result};
use reagg::io::shp::describe_shapefile;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::InspectArgs) -> Result<()> {
    ensure!(args.file.exists(), "no such file: {}", args.file.display());

    let summary = describe_shapefile(&args.file)?;
    println!("{}", args.file.display());
    println!("{summary}");

    Ok(())
}
