//! Demo driver: bakes the procedural room scene and writes each lightmap
//! atlas out as a PPM image.

mod demo;
mod params;

use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use clap::Parser;

use glim_bake::{Baker, TextureBackend, TextureFormat};
use glim_scene::TextureId;
use params::BakeParams;

#[derive(Parser, Debug)]
#[command(name = "glim", about = "Static lightmap baker demo")]
struct Args {
    /// Optional TOML file with bake parameters.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Atlas edge length in texels.
    #[arg(long)]
    size: Option<u32>,
    /// Default texels per world unit.
    #[arg(long)]
    density: Option<f32>,
    /// Box blur radius in texels (0 disables).
    #[arg(long)]
    blur: Option<u8>,
    /// Shading worker threads (0 or 1 = single-threaded).
    #[arg(long)]
    threads: Option<usize>,
    /// Uniform ambient floor, 0-255.
    #[arg(long)]
    ambient: Option<u8>,
    /// Disable colored lighting.
    #[arg(long)]
    no_colors: bool,
    /// Skip transparency sampling along shadow rays.
    #[arg(long)]
    no_transparency: bool,
    /// Output directory for the baked atlases.
    #[arg(long, default_value = "lightmaps")]
    out: PathBuf,
}

/// Keeps composed atlases in memory; `main` writes them to disk afterwards.
#[derive(Default)]
struct PpmBackend {
    textures: Vec<(u32, u32, Vec<u8>)>,
}

impl TextureBackend for PpmBackend {
    fn format(&self) -> TextureFormat {
        TextureFormat::Rgb
    }

    fn create_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> TextureId {
        self.textures.push((width, height, pixels.to_vec()));
        TextureId(self.textures.len() as u32 - 1)
    }

    fn update_texture(&mut self, id: TextureId, width: u32, height: u32, pixels: &[u8]) {
        self.textures[id.0 as usize] = (width, height, pixels.to_vec());
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut params = match &args.config {
        Some(path) => BakeParams::load(path)?,
        None => BakeParams::default(),
    };
    if let Some(size) = args.size {
        params.max_lightmap_size = size;
    }
    if let Some(density) = args.density {
        params.default_density = density;
    }
    if let Some(blur) = args.blur {
        params.texel_blur_radius = blur;
    }
    if let Some(threads) = args.threads {
        params.thread_count = threads;
    }
    if let Some(ambient) = args.ambient {
        params.ambient = [ambient; 3];
    }
    params.no_colors |= args.no_colors;
    params.no_transparency |= args.no_transparency;
    let cfg = params.to_config();

    let scene = demo::build_scene();
    let triangle_count: usize = scene.meshes.iter().map(|m| m.triangle_count()).sum();
    log::info!(
        "scene: {} meshes, {} triangles, {} lights",
        scene.meshes.len(),
        triangle_count,
        scene.lights.len()
    );

    let backend = Arc::new(Mutex::new(PpmBackend::default()));
    let mut baker = Baker::new(backend.clone());
    baker.set_state_callback(|stage, info| {
        if info.is_empty() {
            log::info!("bake: {stage}");
        } else {
            log::info!("bake: {stage} ({info})");
        }
    });
    let mut last_decile = 0u32;
    baker.set_progress_callback(move |fraction| {
        let decile = (fraction * 10.0) as u32;
        if decile > last_decile {
            last_decile = decile;
            log::info!("bake: {}%", decile * 10);
        }
        true
    });

    let start = Instant::now();
    baker.generate(&scene, &cfg)?;
    log::info!("bake finished in {:.2?}", start.elapsed());

    if let Some(output) = baker.output() {
        for mesh in &output.meshes {
            log::info!(
                "output mesh '{}': {} surfaces, {} triangles",
                mesh.name,
                mesh.surfaces.len(),
                mesh.triangle_count()
            );
        }
    }

    std::fs::create_dir_all(&args.out)?;
    let recorded = backend.lock().expect("backend lock");
    for (i, (w, h, pixels)) in recorded.textures.iter().enumerate() {
        let path = args.out.join(format!("lightmap_{i}.ppm"));
        let mut data = format!("P6\n{w} {h}\n255\n").into_bytes();
        data.extend_from_slice(pixels);
        std::fs::write(&path, data)?;
        log::info!("wrote {}", path.display());
    }
    Ok(())
}
