//! Play a time range through the preview loop.

use std::path::PathBuf;
use std::time::Instant;

use clipdeck_common::config::AppConfig;
use clipdeck_common::events::EventBus;
use clipdeck_governor::{PerformanceGovernor, PerformanceSample};

pub async fn run(
    mut config: AppConfig,
    path: PathBuf,
    from: f64,
    to: Option<f64>,
    fps: Option<u32>,
    select: Vec<String>,
) -> anyhow::Result<()> {
    if let Some(fps) = fps {
        config.render.fps = fps.max(1);
    }
    let document = super::load_document(&path)?;
    let to = to.unwrap_or_else(|| document.timeline.duration());

    let bus = EventBus::default();
    let mut governor = PerformanceGovernor::new(config.governor.clone(), bus.clone());
    let mut session = super::open_session(config, &path, document);
    session.subscribe(&bus);
    session.select(super::selection(select));

    println!("Playing {} from {from:.2}s to {to:.2}s", path.display());

    // Feed the governor the measured frame rate; memory is not measured here.
    let mut last_frame: Option<Instant> = None;
    let summary = session
        .play_range(from, to, |scene| {
            let now = Instant::now();
            if let Some(last) = last_frame {
                let secs = now.duration_since(last).as_secs_f64();
                if secs > 0.0 {
                    governor.observe(PerformanceSample::new(0, 0, 1.0 / secs));
                }
            }
            last_frame = Some(now);
            println!("  {}", scene.summary());
        })
        .await?;

    println!();
    println!(
        "Rendered {} frame(s) in {}ms ({} with placeholders, {} skipped ticks)",
        summary.frames, summary.wall_time_ms, summary.placeholder_frames, summary.skipped_ticks
    );
    let stats = session.textures().stats();
    println!(
        "Textures: {} hits, {} misses, {} loads ({} failed), {} evicted, {} retained ({} bytes)",
        stats.hits,
        stats.misses,
        stats.loads_started,
        stats.loads_failed,
        stats.evictions,
        stats.retained_entries,
        stats.retained_bytes
    );
    for change in governor.history() {
        println!(
            "Mode {} -> {} at {}: {}",
            change.from,
            change.to,
            change.at.format("%H:%M:%S%.3f"),
            change.reason
        );
    }

    governor.shutdown();
    session.shutdown();
    Ok(())
}
