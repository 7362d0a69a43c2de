//! Validate a timeline document.

use std::path::PathBuf;

use clipdeck_common::error::ClipdeckError;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating document at: {}", path.display());

    let document = super::load_document(&path)?;

    println!("  Name: {}", document.name);
    println!("  Version: {}", document.version);
    println!("  Assets: {}", document.assets.len());
    println!("  Clips: {}", document.timeline.clip_count());
    println!("  Duration: {:.2}s", document.timeline.duration());

    let mut issues: Vec<String> = document
        .timeline
        .validate()
        .iter()
        .map(ToString::to_string)
        .collect();
    issues.extend(document.validate_assets());

    if issues.is_empty() {
        println!("\nDocument is valid.");
        return Ok(());
    }

    println!("\nValidation issues:");
    for issue in &issues {
        println!("  - {issue}");
    }
    Err(ClipdeckError::timeline(format!("{} issue(s) found", issues.len())).into())
}
