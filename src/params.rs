//! Optional TOML bake parameters; CLI flags override whatever the file set.

use std::error::Error;
use std::path::Path;

use serde::Deserialize;

use glim_bake::{BakeConfig, BakeFlags};
use glim_scene::Color;

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BakeParams {
    pub max_lightmap_size: u32,
    pub default_density: f32,
    pub texel_blur_radius: u8,
    pub thread_count: usize,
    /// Ambient floor as `[r, g, b]`.
    pub ambient: [u8; 3],
    pub no_colors: bool,
    pub no_transparency: bool,
    pub gpu_assisted: bool,
    pub radiosity: bool,
}

impl Default for BakeParams {
    fn default() -> Self {
        let cfg = BakeConfig::default();
        BakeParams {
            max_lightmap_size: cfg.max_lightmap_size,
            default_density: cfg.default_density,
            texel_blur_radius: cfg.blur_radius,
            thread_count: cfg.thread_count,
            ambient: [cfg.ambient.r, cfg.ambient.g, cfg.ambient.b],
            no_colors: false,
            no_transparency: false,
            gpu_assisted: false,
            radiosity: false,
        }
    }
}

impl BakeParams {
    pub fn load(path: &Path) -> Result<BakeParams, Box<dyn Error>> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn to_config(&self) -> BakeConfig {
        BakeConfig {
            ambient: Color::rgb(self.ambient[0], self.ambient[1], self.ambient[2]),
            max_lightmap_size: self.max_lightmap_size,
            default_density: self.default_density,
            blur_radius: self.texel_blur_radius,
            thread_count: self.thread_count,
            flags: BakeFlags {
                no_colors: self.no_colors,
                no_transparency: self.no_transparency,
                gpu_assisted: self.gpu_assisted,
                radiosity: self.radiosity,
            },
        }
    }
}
