//! Static lightmap baking: partitions receiving meshes into planar faces,
//! packs them into texture atlases, accumulates per-texel diffuse lighting
//! with shadow rays through a spatial index, post-processes the atlases and
//! re-emits the meshes with a lightmap UV channel.
#![forbid(unsafe_code)]

mod axis;
mod backend;
mod config;
mod dispatch;
mod error;
mod light;
mod pack;
mod partition;
mod postprocess;
mod progress;
mod rebuild;
mod shade;
mod snapshot;

pub use axis::Axis;
pub use backend::{TextureBackend, TextureFormat};
pub use config::{
    BakeConfig, BakeFlags, DEFAULT_AMBIENT, DEFAULT_ATLAS_SIZE, DEFAULT_BLUR_RADIUS,
    DEFAULT_DENSITY,
};
pub use error::BakeError;
pub use light::Light;
pub use progress::{BakeStage, ProgressFn, StateFn};
pub use snapshot::{BakeContext, Face, Model, Triangle, Vertex};

use std::sync::{Arc, Mutex, MutexGuard};

use glim_atlas::Lightmap;
use glim_collision::CollisionTree;
use glim_scene::{Color, Mesh, SceneLight, TextureId};

use crate::progress::Progress;
use crate::shade::ShadeScene;

/// One receiving mesh in the bake input.
#[derive(Clone, Debug)]
pub struct GetShadowEntry {
    /// Index into [`BakeScene::meshes`].
    pub mesh: usize,
    /// Standalone meshes are rebuilt on their own instead of merging into
    /// the shared output mesh.
    pub stay_alone: bool,
    /// Optional per-surface, per-triangle texel density hints; empty or
    /// all-zero falls back to the config default.
    pub density_hints: Vec<Vec<f32>>,
}

impl GetShadowEntry {
    pub fn new(mesh: usize) -> GetShadowEntry {
        GetShadowEntry {
            mesh,
            stay_alone: false,
            density_hints: Vec::new(),
        }
    }

    pub fn standalone(mesh: usize) -> GetShadowEntry {
        GetShadowEntry {
            stay_alone: true,
            ..GetShadowEntry::new(mesh)
        }
    }
}

/// Everything one `generate` call reads: the mesh pool, which meshes cast
/// and receive shadows, and the static lights.
#[derive(Default)]
pub struct BakeScene {
    pub meshes: Vec<Mesh>,
    /// Indices of occluding meshes; the spatial index is built from these.
    pub cast_shadow: Vec<usize>,
    pub get_shadow: Vec<GetShadowEntry>,
    pub lights: Vec<SceneLight>,
}

/// Result of a successful bake.
pub struct BakeOutput {
    /// Rebuilt receiving meshes: the shared mesh first (when non-empty),
    /// then one mesh per standalone model.
    pub meshes: Vec<Mesh>,
    /// One texture per allocated atlas, in atlas order.
    pub lightmap_textures: Vec<TextureId>,
}

/// The lightmap generator. Owns the session state of the most recent bake
/// so blur radius and ambient color can be updated without re-shading.
pub struct Baker {
    backend: Arc<Mutex<dyn TextureBackend>>,
    progress_cb: Option<Box<ProgressFn>>,
    state_cb: Option<Box<StateFn>>,
    ctx: Option<BakeContext>,
    lightmaps: Vec<Lightmap>,
    textures: Vec<TextureId>,
    ambient: Color,
    blur_radius: u8,
    atlas_size: u32,
    generated: bool,
    output: Option<BakeOutput>,
}

impl Baker {
    pub fn new(backend: Arc<Mutex<dyn TextureBackend>>) -> Baker {
        Baker {
            backend,
            progress_cb: None,
            state_cb: None,
            ctx: None,
            lightmaps: Vec::new(),
            textures: Vec::new(),
            ambient: DEFAULT_AMBIENT,
            blur_radius: 0,
            atlas_size: DEFAULT_ATLAS_SIZE,
            generated: false,
            output: None,
        }
    }

    /// Installs the cancellation-capable progress callback; it receives the
    /// completed fraction and returning `false` aborts the bake.
    pub fn set_progress_callback(&mut self, cb: impl FnMut(f32) -> bool + 'static) {
        self.progress_cb = Some(Box::new(cb));
    }

    /// Installs the stage callback ("partitioning", "shading light 2 / 5", ...).
    pub fn set_state_callback(&mut self, cb: impl FnMut(BakeStage, &str) + 'static) {
        self.state_cb = Some(Box::new(cb));
    }

    /// Runs the whole pipeline. On cancellation the session is cleared and
    /// no partial results are kept.
    pub fn generate(&mut self, scene: &BakeScene, cfg: &BakeConfig) -> Result<(), BakeError> {
        let mut progress_cb = self.progress_cb.take();
        let result = self.generate_inner(scene, cfg, &mut progress_cb);
        self.progress_cb = progress_cb;
        if let Err(err) = &result {
            log::warn!("{err}");
            self.clear_session();
        }
        result
    }

    fn generate_inner(
        &mut self,
        scene: &BakeScene,
        cfg: &BakeConfig,
        progress_cb: &mut Option<Box<ProgressFn>>,
    ) -> Result<(), BakeError> {
        self.emit_state(BakeStage::Initializing, "");
        self.clear_session();

        let flags = cfg.flags.validated();
        self.ambient = cfg.ambient;
        self.blur_radius = cfg.blur_radius;
        self.atlas_size = cfg.max_lightmap_size;
        let with_locations = flags.gpu_assisted;

        // Snapshot the receiving models and light sources; build the
        // spatial index over the occluders.
        let mut ctx = BakeContext::default();
        for entry in &scene.get_shadow {
            let mesh = &scene.meshes[entry.mesh];
            if !mesh.visible {
                continue;
            }
            let model_index = ctx.models.len() as u32;
            ctx.model_of_mesh.insert(entry.mesh as u32, model_index);
            ctx.models.push(snapshot::Model::new(
                entry.mesh as u32,
                mesh,
                entry.stay_alone,
                entry.density_hints.clone(),
            ));
        }
        let tree = CollisionTree::build(
            scene
                .cast_shadow
                .iter()
                .filter(|&&i| scene.meshes[i].visible)
                .map(|&i| (i as u32, &scene.meshes[i])),
        );
        ctx.lights = scene
            .lights
            .iter()
            .filter(|l| l.visible)
            .map(Light::from_scene)
            .collect();

        let total_tris = ctx.total_triangles();
        let mut estimate = ctx.models.len() * 8 + total_tris * (ctx.lights.len() + 1);
        if cfg.blur_radius > 0 {
            estimate += ctx.models.len();
        }
        let mut progress = Progress::new(progress_cb.as_mut(), estimate);

        self.lightmaps.push(Lightmap::new(self.atlas_size, with_locations));

        self.emit_state(BakeStage::Partitioning, "");
        for model_index in 0..ctx.models.len() as u32 {
            let mesh_index = ctx.models[model_index as usize].mesh as usize;
            partition::partition_model(
                &mut ctx,
                model_index,
                &scene.meshes[mesh_index],
                self.atlas_size,
                cfg.default_density,
                &mut progress,
            )?;
            pack::pack_model_faces(
                &mut ctx,
                model_index,
                &mut self.lightmaps,
                self.atlas_size,
                with_locations,
            );
            progress.step(4)?;
        }
        log::info!(
            "partitioned {} triangles into {} faces across {} lightmaps",
            ctx.triangles.len(),
            ctx.faces.len(),
            self.lightmaps.len()
        );

        let shade_scene = ShadeScene {
            ctx: &ctx,
            meshes: &scene.meshes,
            tree: &tree,
            flags,
        };
        let light_count = ctx.lights.len();
        for k in 0..light_count {
            self.emit_state(BakeStage::Shading, &format!("light {} / {}", k + 1, light_count));
            progress.poll()?;
            dispatch::shade_light(
                &shade_scene,
                &mut self.lightmaps,
                &ctx.lights[k],
                cfg.thread_count,
                &mut progress,
            )?;
        }

        postprocess::freeze_all(&mut self.lightmaps);
        if cfg.blur_radius > 0 {
            self.emit_state(BakeStage::Blurring, "");
            postprocess::blur_all(&ctx, &mut self.lightmaps, cfg.blur_radius, &mut progress)?;
        }

        self.emit_state(BakeStage::Baking, "");
        self.bake_textures();

        let out_meshes = rebuild::build_output_meshes(
            &ctx,
            &scene.meshes,
            &self.textures,
            self.atlas_size,
            &mut progress,
        )?;
        self.output = Some(BakeOutput {
            meshes: out_meshes,
            lightmap_textures: self.textures.clone(),
        });
        self.ctx = Some(ctx);
        self.generated = true;
        self.emit_state(BakeStage::Completed, "");
        Ok(())
    }

    /// Re-runs the blur with a new radius over the frozen post-shading
    /// colors, then re-bakes the textures. Returns whether anything changed.
    pub fn update_blur_radius(&mut self, radius: u8) -> bool {
        if !self.generated || radius == self.blur_radius {
            return false;
        }
        if radius > 16 {
            log::debug!("very high blur radius ({radius})");
        }
        let Some(ctx) = self.ctx.as_ref() else {
            return false;
        };
        let mut progress = Progress::new(None, 0);
        // No callback installed, so this cannot cancel.
        let _ = postprocess::blur_all(ctx, &mut self.lightmaps, radius, &mut progress);
        self.bake_textures();
        self.blur_radius = radius;
        true
    }

    /// Re-composes and re-uploads the textures with a new ambient floor.
    /// Returns whether anything changed.
    pub fn update_ambient_color(&mut self, ambient: Color) -> bool {
        if !self.generated || ambient == self.ambient {
            return false;
        }
        self.ambient = ambient;
        self.upload_textures();
        true
    }

    #[inline]
    pub fn has_generated(&self) -> bool {
        self.generated
    }

    pub fn output(&self) -> Option<&BakeOutput> {
        self.output.as_ref()
    }

    /// Session geometry of the last successful bake.
    pub fn context(&self) -> Option<&BakeContext> {
        self.ctx.as_ref()
    }

    pub fn lightmaps(&self) -> &[Lightmap] {
        &self.lightmaps
    }

    /// Drops all session state from the previous bake.
    fn clear_session(&mut self) {
        self.ctx = None;
        self.lightmaps.clear();
        self.textures.clear();
        self.output = None;
        self.generated = false;
    }

    /// Bleeding reduction plus composition and upload, per atlas.
    fn bake_textures(&mut self) {
        for lm in &mut self.lightmaps {
            lm.reduce_bleeding();
        }
        self.upload_textures();
    }

    /// Composes every atlas against the ambient floor and pushes the pixels
    /// through the render backend, creating textures on the first pass and
    /// updating them afterwards.
    fn upload_textures(&mut self) {
        let ambient = [self.ambient.r, self.ambient.g, self.ambient.b];
        let mut backend = lock_backend(&self.backend);
        let with_alpha = backend.format() == TextureFormat::Rgba;
        for (i, lm) in self.lightmaps.iter().enumerate() {
            let pixels = lm.compose(ambient, with_alpha);
            let size = lm.size() as u32;
            match self.textures.get(i) {
                Some(&id) => backend.update_texture(id, size, size, &pixels),
                None => {
                    let id = backend.create_texture(size, size, &pixels);
                    self.textures.push(id);
                }
            }
        }
    }
}

/// The texture list is shared with non-bake code paths; every backend call
/// goes through this lock. A poisoned lock just means a backend callback
/// panicked, the texture state itself is still usable.
fn lock_backend(backend: &Arc<Mutex<dyn TextureBackend>>) -> MutexGuard<'_, dyn TextureBackend + 'static> {
    match backend.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Baker {
    fn emit_state(&mut self, stage: BakeStage, info: &str) {
        log::debug!("bake state: {stage} {info}");
        if let Some(cb) = self.state_cb.as_mut() {
            cb(stage, info);
        }
    }
}
