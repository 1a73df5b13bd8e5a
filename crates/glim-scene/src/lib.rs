//! Mesh, texture and light containers consumed and produced by the baker.
#![forbid(unsafe_code)]

use std::sync::Arc;

use glim_geom::{Mat4, Vec2, Vec3};

mod light;
mod texture;

pub use light::{LightKind, SceneLight};
pub use texture::TextureData;

/// Maximum number of per-vertex texture coordinate channels a surface keeps.
/// The lightmap UV channel emitted by the baker is appended after the last
/// source channel and counts against this limit.
pub const MAX_UV_CHANNELS: usize = 4;

/// 8-bit RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 255 }
    }

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color { r, g, b, a }
    }

    /// Uniform gray, the form ambient colors are usually given in.
    #[inline]
    pub const fn gray(v: u8) -> Color {
        Color::rgb(v, v, v)
    }

    /// RGB channels as a 0..1 vector.
    #[inline]
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }

    /// Builds a color from a 0..1 vector, clamping each channel.
    #[inline]
    pub fn from_vec3(v: Vec3) -> Color {
        Color::rgb(
            (v.x * 255.0).clamp(0.0, 255.0) as u8,
            (v.y * 255.0).clamp(0.0, 255.0) as u8,
            (v.z * 255.0).clamp(0.0, 255.0) as u8,
        )
    }

    #[inline]
    pub fn alpha_f32(self) -> f32 {
        self.a as f32 / 255.0
    }
}

impl Default for Color {
    #[inline]
    fn default() -> Self {
        Color::WHITE
    }
}

/// Handle to a texture owned by the render system. The baker hands composed
/// lightmap pixels to a [`TextureBackend`] and records the returned id on the
/// rebuilt surfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// One surface of a mesh: parallel per-vertex attribute arrays plus a
/// triangle index list and the diffuse texture layers sampled by the baker.
#[derive(Clone, Default)]
pub struct MeshSurface {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<Color>,
    /// Texture coordinates, outer index = channel.
    pub uv_channels: Vec<Vec<Vec2>>,
    pub indices: Vec<[u32; 3]>,
    pub textures: Vec<Arc<TextureData>>,
    /// Set by the baker on rebuilt surfaces; `None` on source meshes.
    pub lightmap_texture: Option<TextureId>,
}

impl MeshSurface {
    pub fn new() -> MeshSurface {
        MeshSurface::default()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Appends a vertex; `uvs` fills the leading channels, missing channels
    /// get a zero coordinate so the arrays stay parallel.
    pub fn add_vertex(&mut self, position: Vec3, normal: Vec3, color: Color, uvs: &[Vec2]) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(normal);
        self.colors.push(color);
        let channels = self.uv_channels.len().max(uvs.len()).min(MAX_UV_CHANNELS);
        while self.uv_channels.len() < channels {
            // Backfill a new channel for vertices added before it existed.
            self.uv_channels.push(vec![Vec2::ZERO; index as usize]);
        }
        for (ch, uv) in self.uv_channels.iter_mut().enumerate() {
            uv.push(uvs.get(ch).copied().unwrap_or(Vec2::ZERO));
        }
        index
    }

    #[inline]
    pub fn add_triangle(&mut self, indices: [u32; 3]) {
        self.indices.push(indices);
    }

    pub fn add_texture(&mut self, texture: Arc<TextureData>) {
        self.textures.push(texture);
    }

    #[inline]
    pub fn uv(&self, channel: usize, vertex: usize) -> Vec2 {
        self.uv_channels
            .get(channel)
            .and_then(|ch| ch.get(vertex))
            .copied()
            .unwrap_or(Vec2::ZERO)
    }

    /// True when any vertex color carries translucency.
    pub fn has_translucent_vertices(&self) -> bool {
        self.colors.iter().any(|c| c.a < 255)
    }
}

/// A mesh instance: surfaces plus the world transform applied once when the
/// bake snapshots its geometry.
#[derive(Clone, Default)]
pub struct Mesh {
    pub name: String,
    pub transform: Mat4,
    pub surfaces: Vec<MeshSurface>,
    /// Material-level diffuse color; its alpha participates in the
    /// transparency test during shadow ray walks.
    pub diffuse_color: Color,
    pub visible: bool,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Mesh {
        Mesh {
            name: name.into(),
            transform: Mat4::IDENTITY,
            surfaces: Vec::new(),
            diffuse_color: Color::WHITE,
            visible: true,
        }
    }

    /// Creates an empty surface and returns its index.
    pub fn create_surface(&mut self) -> usize {
        self.surfaces.push(MeshSurface::new());
        self.surfaces.len() - 1
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.triangle_count()).sum()
    }
}
