//! Show document information.

use std::path::PathBuf;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let document = super::load_document(&path)?;

    println!("Document: {}", document.name);
    println!("  Version: {}", document.version);
    println!("  Created: {}", document.created_at);
    println!("  Modified: {}", document.modified_at);
    if let Some(canvas) = document.canvas {
        println!("  Canvas: {}x{}", canvas.width, canvas.height);
    }
    println!();

    println!("Assets:");
    for asset in document.assets.iter() {
        let size = match (asset.width, asset.height, asset.filmstrip) {
            (Some(w), Some(h), _) => format!(" {w}x{h}"),
            (_, _, Some(strip)) => format!(
                " filmstrip {}x{} ({} frames)",
                strip.frame_width, strip.frame_height, strip.frame_count
            ),
            _ => String::new(),
        };
        let duration = asset
            .duration
            .map(|d| format!(" {d:.1}s"))
            .unwrap_or_default();
        let placeholder = if asset.is_placeholder { " [placeholder]" } else { "" };
        println!(
            "  {} ({:?}): {}{size}{duration}{placeholder}",
            asset.id, asset.asset_type, asset.display_name()
        );
    }
    println!();

    let timeline = &document.timeline;
    println!("Timeline: {:.2}s", timeline.duration());
    for (index, track) in timeline.video_tracks.iter().enumerate() {
        println!("  Video track {index}: {} clip(s)", track.len());
        for clip in track {
            let mut effects = Vec::new();
            if clip.animation.is_some() {
                effects.push("ken-burns".to_string());
            }
            if let Some(transition) = clip.transition {
                effects.push(format!("dissolve {:.2}s", transition.duration));
            }
            if !clip.text_overlays.is_empty() {
                effects.push(format!("{} overlay(s)", clip.text_overlays.len()));
            }
            println!(
                "    {} [{:.2}, {:.2}) asset={} {}",
                clip.id,
                clip.start_time,
                clip.end_time(),
                clip.asset_id,
                effects.join(", ")
            );
        }
    }
    for (index, track) in timeline.audio_tracks.iter().enumerate() {
        println!("  Audio track {index}: {} clip(s)", track.len());
        for clip in track {
            println!(
                "    {} [{:.2}, {:.2}) asset={} volume={:.2}",
                clip.id,
                clip.start_time,
                clip.end_time(),
                clip.asset_id,
                clip.volume
            );
        }
    }

    Ok(())
}
