//! Inspect command implementation.

use std::path::PathBuf;

use anyhow::{bail, Result};
use cardmark_core::{CardRenderer, JpegCardRenderer};
use colored::Colorize;
use tracing::debug;

use crate::utils::read_input;

/// Execute the inspect command.
pub fn execute(card: PathBuf, quiet: bool) -> Result<()> {
    let bytes = read_input(&card, "card")?;

    let Some(metadata) = JpegCardRenderer::default().read_metadata(&bytes) else {
        bail!("No card metadata found in {}", card.display());
    };
    debug!(?metadata, "Read metadata");

    if quiet {
        if let Some(description) = &metadata.image_description {
            println!("{}", description);
        }
        return Ok(());
    }

    let missing = || "(none)".dimmed().to_string();
    println!();
    println!("   {} {}", "File:".dimmed(), card.display());
    println!(
        "   {} {}",
        "ImageDescription:".dimmed(),
        metadata.image_description.clone().unwrap_or_else(missing)
    );
    println!(
        "   {} {}",
        "Software:".dimmed(),
        metadata.software.clone().unwrap_or_else(missing)
    );
    println!(
        "   {} {}",
        "Artist:".dimmed(),
        metadata.artist.clone().unwrap_or_else(missing)
    );
    Ok(())
}
