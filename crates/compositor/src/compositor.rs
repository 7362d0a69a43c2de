//! Frame compositor: turns a timeline and a query time into a [`Scene`].
//!
//! Each call recycles the previous frame's sprites, resolves what is
//! visible at `t` and builds the drawables:
//!
//! 1. A transition window in effect draws both clips, blended by progress.
//! 2. Otherwise the single active clip is drawn, or a placeholder when it
//!    cannot be (no clip, missing asset, loading, failed, audio only).
//!
//! Texture misses never block. The pool starts a load and the frame shows a
//! loading message until the owner re-renders after the load completes.

use clipdeck_common::config::AppConfig;
use clipdeck_common::events::PerformanceMode;
use clipdeck_resource_pool::sprite::{Sprite, SpritePool};
use clipdeck_resource_pool::texture::{TexturePool, TextureState};
use clipdeck_timeline_model::asset::{AssetLibrary, AssetType};
use clipdeck_timeline_model::clip::Clip;
use clipdeck_timeline_model::geometry::Point2D;
use clipdeck_timeline_model::timeline::Timeline;

use crate::kenburns::clip_transform;
use crate::resolver::{resolve_active_clip, resolve_transition};
use crate::scene::{
    Canvas, Drawable, PlaceholderKind, Scene, Selection, SelectionBorder, SpriteNode,
    StatusMessage, TextNode,
};
use crate::text::{overlay_alpha, TextStyle, DEFAULT_FADE_SECS};

const TEXT_Z: i32 = 100;

/// Everything that determines a frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub timeline: &'a Timeline,
    pub assets: &'a AssetLibrary,
    pub time: f64,
    pub selection: &'a Selection,
    pub mode: PerformanceMode,
}

/// Blend and stacking for one clip in a frame.
#[derive(Debug, Clone, Copy)]
struct ClipLayer {
    blend: f64,
    z_index: i32,
}

/// Builds scenes and owns the sprites currently on screen.
#[derive(Debug)]
pub struct Compositor {
    canvas: Canvas,
    text_fade_secs: f64,
    /// Sprites used by the current scene; returned to the pool next frame.
    live: Vec<Sprite>,
    scene: Scene,
    frames_rendered: u64,
}

impl Compositor {
    pub fn new(canvas: Canvas, text_fade_secs: f64) -> Self {
        Self {
            canvas,
            text_fade_secs,
            live: Vec::new(),
            scene: Scene::new(0.0, PerformanceMode::Normal),
            frames_rendered: 0,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(Canvas::from(&config.canvas), config.render.text_fade_secs)
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// The most recently rendered scene.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Number of sprites held by the current scene.
    pub fn live_sprites(&self) -> usize {
        self.live.len()
    }

    /// Render the frame at `input.time`.
    pub fn render_frame(
        &mut self,
        input: &FrameInput<'_>,
        textures: &mut TexturePool,
        sprites: &mut SpritePool,
    ) -> &Scene {
        self.recycle(sprites);

        let mut scene = Scene::new(input.time, input.mode);

        if let Some(transition) = resolve_transition(input.timeline, input.time) {
            let outgoing = ClipLayer {
                blend: transition.outgoing_alpha(),
                z_index: 0,
            };
            let incoming = ClipLayer {
                blend: transition.incoming_alpha(),
                z_index: 1,
            };
            self.compose_clip(&mut scene, transition.outgoing, outgoing, input, textures, sprites);
            self.compose_clip(&mut scene, transition.incoming, incoming, input, textures, sprites);
        } else if let Some(clip) = resolve_active_clip(input.timeline, input.time) {
            let layer = ClipLayer {
                blend: 1.0,
                z_index: 0,
            };
            self.compose_clip(&mut scene, clip, layer, input, textures, sprites);
        } else {
            self.push_message(&mut scene, PlaceholderKind::NoClip, None, "No clip at this time".to_string());
        }

        self.frames_rendered += 1;
        tracing::trace!(
            time = input.time,
            mode = %input.mode,
            drawables = scene.len(),
            sprites = self.live.len(),
            "frame rendered"
        );
        self.scene = scene;
        &self.scene
    }

    /// Hand every sprite of the previous frame back to the pool.
    ///
    /// Released in reverse so the next frame acquires them in the same order.
    fn recycle(&mut self, sprites: &mut SpritePool) {
        for sprite in self.live.drain(..).rev() {
            sprites.release(sprite);
        }
    }

    /// Return all sprites to the pool and drop the current scene.
    pub fn clear(&mut self, sprites: &mut SpritePool) {
        self.recycle(sprites);
        self.scene = Scene::new(self.scene.time, self.scene.mode);
    }

    fn compose_clip(
        &mut self,
        scene: &mut Scene,
        clip: &Clip,
        layer: ClipLayer,
        input: &FrameInput<'_>,
        textures: &mut TexturePool,
        sprites: &mut SpritePool,
    ) {
        let Some(asset) = input.assets.get(&clip.asset_id) else {
            tracing::debug!(clip_id = %clip.id, asset_id = %clip.asset_id, "clip references unknown asset");
            self.push_message(
                scene,
                PlaceholderKind::AssetNotFound,
                Some(clip),
                format!("Asset not found: {}", clip.asset_id),
            );
            return;
        };

        if asset.asset_type == AssetType::Audio {
            self.push_message(
                scene,
                PlaceholderKind::AudioOnly,
                Some(clip),
                format!("Audio: {}", asset.display_name()),
            );
            return;
        }

        if asset.is_placeholder {
            self.push_message(
                scene,
                PlaceholderKind::AssetLoading,
                Some(clip),
                format!("Loading {}...", asset.display_name()),
            );
            return;
        }

        let bitmap = match textures.request(asset) {
            TextureState::Ready(bitmap) => bitmap,
            TextureState::Loading => {
                self.push_message(
                    scene,
                    PlaceholderKind::AssetLoading,
                    Some(clip),
                    format!("Loading {}...", asset.display_name()),
                );
                return;
            }
            TextureState::Failed(reason) => {
                self.push_message(
                    scene,
                    PlaceholderKind::AssetLoadFailed,
                    Some(clip),
                    format!("Failed to load {}: {}", asset.display_name(), reason),
                );
                return;
            }
        };

        let relative_time = clip.relative_time(input.time);
        let transform = clip_transform(
            clip,
            relative_time,
            &self.canvas,
            bitmap.width() as f64,
            bitmap.height() as f64,
        );

        let mut sprite = sprites.acquire();
        sprite.texture_key = Some(asset.id.clone());
        sprite.texture = Some(bitmap);
        sprite.position = snap(transform.position, input.mode);
        sprite.scale = transform.scale;
        sprite.alpha = layer.blend;
        sprite.z_index = layer.z_index;

        let node = SpriteNode::from_sprite(&sprite, &clip.id);
        let bounds = node.bounds;
        scene.push(Drawable::Sprite(node));
        self.live.push(sprite);

        if input.selection.contains(&clip.id) {
            scene.push(Drawable::Border(SelectionBorder {
                clip_id: clip.id.clone(),
                bounds,
                animated: input.mode != PerformanceMode::Minimal,
            }));
        }

        self.compose_overlays(scene, clip, relative_time, layer, input.mode);
    }

    fn compose_overlays(
        &self,
        scene: &mut Scene,
        clip: &Clip,
        relative_time: f64,
        layer: ClipLayer,
        mode: PerformanceMode,
    ) {
        let style = TextStyle::for_mode(mode);
        let fade = if self.text_fade_secs.is_finite() {
            self.text_fade_secs
        } else {
            DEFAULT_FADE_SECS
        };

        for overlay in &clip.text_overlays {
            let Some(alpha) = overlay_alpha(relative_time - overlay.start_time, overlay.duration, fade)
            else {
                continue;
            };
            scene.push(Drawable::Text(TextNode {
                clip_id: clip.id.clone(),
                text: overlay.text.clone(),
                position: snap(self.canvas.center().offset(overlay.position), mode),
                alpha: (alpha * layer.blend).clamp(0.0, 1.0),
                style,
                z_index: TEXT_Z + layer.z_index,
            }));
        }
    }

    fn push_message(
        &self,
        scene: &mut Scene,
        kind: PlaceholderKind,
        clip: Option<&Clip>,
        text: String,
    ) {
        scene.push(Drawable::Message(StatusMessage {
            kind,
            clip_id: clip.map(|c| c.id.clone()),
            text,
            position: self.canvas.center(),
        }));
    }
}

/// Minimal mode draws on whole pixels only.
fn snap(position: Point2D, mode: PerformanceMode) -> Point2D {
    match mode {
        PerformanceMode::Minimal => position.rounded(),
        PerformanceMode::Normal | PerformanceMode::Optimized => position,
    }
}
