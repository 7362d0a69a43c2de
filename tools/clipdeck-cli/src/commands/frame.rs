//! Render one frame of a document.

use std::path::PathBuf;

use clipdeck_common::config::AppConfig;
use clipdeck_common::events::PerformanceMode;
use clipdeck_compositor::{Drawable, Scene};

pub async fn run(
    config: AppConfig,
    path: PathBuf,
    time: f64,
    select: Vec<String>,
    mode: PerformanceMode,
    json: bool,
) -> anyhow::Result<()> {
    anyhow::ensure!(time.is_finite(), "--time must be a finite number of seconds, got {time}");
    let document = super::load_document(&path)?;
    let mut session = super::open_session(config, &path, document);

    session.seek(time);
    session.select(super::selection(select));
    session.set_mode(mode);

    let scene = session.render_settled().await;
    if json {
        println!("{}", serde_json::to_string_pretty(scene)?);
    } else {
        print_scene(scene);
    }

    session.shutdown();
    Ok(())
}

fn print_scene(scene: &Scene) {
    println!("Frame at {:.3}s ({} mode)", scene.time, scene.mode);
    for drawable in &scene.drawables {
        match drawable {
            Drawable::Sprite(s) => println!(
                "  sprite  clip={} asset={} pos=({:.1}, {:.1}) scale={:.4} alpha={:.3}",
                s.clip_id, s.asset_id, s.position.x, s.position.y, s.scale, s.alpha
            ),
            Drawable::Text(t) => println!(
                "  text    clip={} \"{}\" pos=({:.1}, {:.1}) alpha={:.3} shadow={}",
                t.clip_id, t.text, t.position.x, t.position.y, t.alpha, t.style.shadow
            ),
            Drawable::Border(b) => println!(
                "  border  clip={} {:.0}x{:.0} at ({:.1}, {:.1})",
                b.clip_id, b.bounds.width, b.bounds.height, b.bounds.x, b.bounds.y
            ),
            Drawable::Message(m) => println!("  message {:?}: {}", m.kind, m.text),
        }
    }
}
