use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use clap::CommandFactory;
use clap_mangen::Man;

use ownerping::cli::Cli;

fn main() -> anyhow::Result<()> {
    let out_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ownerping.1"));

    let mut file = File::create(&out_path)
        .with_context(|| format!("Creating man page {}", out_path.display()))?;
    Man::new(Cli::command())
        .render(&mut file)
        .context("Rendering man page")?;
    eprintln!("Generated man page at {}", out_path.display());
    Ok(())
}
