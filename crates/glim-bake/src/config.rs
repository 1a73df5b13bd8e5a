use glim_scene::Color;

/// Darkest texel floor when no light reaches a texel at all.
pub const DEFAULT_AMBIENT: Color = Color::gray(20);
/// Edge length of every lightmap atlas texture.
pub const DEFAULT_ATLAS_SIZE: u32 = 512;
/// Texels per world unit when no per-triangle density hints are given.
pub const DEFAULT_DENSITY: f32 = 10.0;
pub const DEFAULT_BLUR_RADIUS: u8 = 2;

/// Bake option flags. Unsupported combinations are downgraded, not
/// rejected; see [`BakeFlags::validated`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BakeFlags {
    /// Disable colored lighting: every light contributes white scaled by
    /// intensity only.
    pub no_colors: bool,
    /// Skip transparency sampling along shadow rays; any hit fully occludes.
    /// Considerably faster on texture-heavy scenes.
    pub no_transparency: bool,
    /// Request the GPU-assisted path. There is no compute backend in this
    /// workspace, so the flag always downgrades to the CPU path.
    pub gpu_assisted: bool,
    /// Radiosity bounces; requires `gpu_assisted`.
    pub radiosity: bool,
}

impl BakeFlags {
    /// Clears flag combinations the pipeline cannot honor, warning for each
    /// downgrade instead of failing the bake.
    pub(crate) fn validated(mut self) -> BakeFlags {
        if self.gpu_assisted {
            log::warn!("hardware acceleration for lightmap generation is not available");
            self.gpu_assisted = false;
        }
        if self.radiosity && !self.gpu_assisted {
            log::warn!("radiosity lightmap generation is only supported with hardware acceleration");
            self.radiosity = false;
        }
        self
    }
}

/// Parameters of one `generate` call.
#[derive(Clone, Debug)]
pub struct BakeConfig {
    pub ambient: Color,
    /// Edge length of every atlas; faces larger than `size - 2` texels are
    /// rescaled to fit.
    pub max_lightmap_size: u32,
    /// Fallback texel density for faces whose triangles carry no hints.
    pub default_density: f32,
    /// Box blur radius in texels; zero disables the blur pass.
    pub blur_radius: u8,
    /// Worker threads for the shading stage; `<= 1` shades on the calling
    /// thread.
    pub thread_count: usize,
    pub flags: BakeFlags,
}

impl Default for BakeConfig {
    fn default() -> Self {
        BakeConfig {
            ambient: DEFAULT_AMBIENT,
            max_lightmap_size: DEFAULT_ATLAS_SIZE,
            default_density: DEFAULT_DENSITY,
            blur_radius: DEFAULT_BLUR_RADIUS,
            thread_count: 0,
            flags: BakeFlags::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_and_radiosity_downgrade() {
        let flags = BakeFlags {
            gpu_assisted: true,
            radiosity: true,
            ..BakeFlags::default()
        };
        let v = flags.validated();
        assert!(!v.gpu_assisted);
        assert!(!v.radiosity);
        assert!(!v.no_colors && !v.no_transparency);
    }

    #[test]
    fn plain_flags_pass_through() {
        let flags = BakeFlags {
            no_colors: true,
            no_transparency: true,
            ..BakeFlags::default()
        };
        assert_eq!(flags.validated(), flags);
    }
}
