use glim_atlas::Rect;
use glim_geom::{IVec2, Mat4, Plane, Triangle3, Vec2, Vec3};
use glim_scene::{Color, MAX_UV_CHANNELS, Mesh};
use hashbrown::HashMap;

use crate::axis::Axis;
use crate::light::Light;

/// World-space copy of one mesh vertex, taken once when the bake starts and
/// never mutated afterwards except for its atlas coordinate.
#[derive(Clone, Copy, Debug)]
pub struct Vertex {
    pub surface: u32,
    pub index: u32,
    pub position: Vec3,
    pub normal: Vec3,
    pub color: Color,
    pub uv: [Vec2; MAX_UV_CHANNELS],
    /// Texel position inside the face's lightmap; face-local during
    /// projection, atlas-absolute after packing.
    pub lm_coord: IVec2,
}

impl Vertex {
    pub(crate) fn from_mesh(
        mesh: &Mesh,
        world: &Mat4,
        normal_matrix: &Mat4,
        surface: u32,
        index: u32,
    ) -> Vertex {
        let src = &mesh.surfaces[surface as usize];
        let i = index as usize;
        let mut uv = [Vec2::ZERO; MAX_UV_CHANNELS];
        for (ch, slot) in uv.iter_mut().enumerate().take(src.uv_channels.len()) {
            *slot = src.uv(ch, i);
        }
        Vertex {
            surface,
            index,
            position: world.transform_point(src.positions[i]),
            normal: normal_matrix.transform_dir(src.normals[i]).normalized(),
            color: src.colors[i],
            uv,
            lm_coord: IVec2::new(0, 0),
        }
    }

    /// True when this vertex coincides with any corner of `other`.
    pub(crate) fn touches(&self, other: &Triangle) -> bool {
        other.verts.iter().any(|v| self.position.approx_eq(v.position))
    }

    pub(crate) fn scale_lm(&mut self, sx: f32, sy: f32) {
        self.lm_coord.x = (sx * self.lm_coord.x as f32) as i32;
        self.lm_coord.y = (sy * self.lm_coord.y as f32) as i32;
    }

    /// Atlas coordinate normalized to `[0, 1]` texture space.
    #[inline]
    pub fn map_coord(&self, atlas_size: u32) -> Vec2 {
        Vec2::new(
            self.lm_coord.x as f32 / atlas_size as f32,
            self.lm_coord.y as f32 / atlas_size as f32,
        )
    }
}

/// One source triangle with its world-space vertex copies, precomputed
/// plane, and (after partitioning) the face it belongs to.
#[derive(Clone, Debug)]
pub struct Triangle {
    pub model: u32,
    pub surface: u32,
    pub index: u32,
    pub verts: [Vertex; 3],
    pub plane: Plane,
    /// Arena index of the owning face; assigned exactly once during
    /// partitioning.
    pub face: u32,
}

impl Triangle {
    pub(crate) fn new(model: u32, surface: u32, index: u32, verts: [Vertex; 3]) -> Triangle {
        let plane = Plane::from_points(verts[0].position, verts[1].position, verts[2].position);
        Triangle {
            model,
            surface,
            index,
            verts,
            plane,
            face: u32::MAX,
        }
    }

    /// Adjacency relation used to grow faces: same surface and at least one
    /// shared vertex position.
    pub(crate) fn adjacent_to(&self, other: &Triangle) -> bool {
        if self.surface != other.surface {
            return false;
        }
        self.verts.iter().any(|v| v.touches(other))
    }

    #[inline]
    pub fn world_triangle(&self) -> Triangle3 {
        Triangle3::new(
            self.verts[0].position,
            self.verts[1].position,
            self.verts[2].position,
        )
    }

    /// Distance from `point` to the closest spot on this triangle.
    #[inline]
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.world_triangle().distance_to_point(point)
    }
}

/// A group of mutually adjacent triangles sharing a dominant axis,
/// unwrapped as one rectangle in a lightmap atlas.
#[derive(Clone, Debug)]
pub struct Face {
    pub model: u32,
    pub axis: Axis,
    pub surface: u32,
    pub density: f32,
    /// Texel footprint size before the 1-texel border.
    pub width: i32,
    pub height: i32,
    /// Triangle arena indices.
    pub tris: Vec<u32>,
    /// Atlas this face was packed into.
    pub lightmap: u32,
    /// Placed rectangle inside that atlas, border included.
    pub rect: Rect,
}

/// Per-receiving-mesh bake state.
pub struct Model {
    pub mesh: u32,
    /// Standalone models are rebuilt as their own output mesh instead of
    /// contributing to the shared one.
    pub stay_alone: bool,
    /// Per-surface, per-triangle texel density hints; zero means "use the
    /// config default".
    pub density_hints: Vec<Vec<f32>>,
    /// `[surface][triangle]` to triangle arena index, for resolving spatial
    /// index hits.
    pub tri_lookup: Vec<Vec<Option<u32>>>,
    /// Face arena indices belonging to this model.
    pub faces: Vec<u32>,
    pub triangle_count: usize,
}

impl Model {
    pub(crate) fn new(mesh_index: u32, mesh: &Mesh, stay_alone: bool, density_hints: Vec<Vec<f32>>) -> Model {
        let tri_lookup = mesh
            .surfaces
            .iter()
            .map(|s| vec![None; s.triangle_count()])
            .collect();
        Model {
            mesh: mesh_index,
            stay_alone,
            density_hints,
            tri_lookup,
            faces: Vec::new(),
            triangle_count: mesh.triangle_count(),
        }
    }

    pub(crate) fn density_hint(&self, surface: u32, triangle: u32) -> f32 {
        self.density_hints
            .get(surface as usize)
            .and_then(|s| s.get(triangle as usize))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Everything a bake owns while it runs: triangle and face arenas, the
/// per-mesh models, and the light snapshots. Stages borrow this instead of
/// sharing engine-global state.
#[derive(Default)]
pub struct BakeContext {
    pub triangles: Vec<Triangle>,
    pub faces: Vec<Face>,
    pub models: Vec<Model>,
    pub lights: Vec<Light>,
    /// Scene mesh index to model index, resolving spatial-index hits back
    /// to receiving geometry.
    pub model_of_mesh: HashMap<u32, u32>,
}

impl Default for Face {
    fn default() -> Self {
        Face {
            model: 0,
            axis: Axis::PosX,
            surface: 0,
            density: 0.0,
            width: 0,
            height: 0,
            tris: Vec::new(),
            lightmap: 0,
            rect: Rect::default(),
        }
    }
}

impl BakeContext {
    /// Total triangles over all receiving models, known before partitioning;
    /// the progress estimate is built from it.
    pub fn total_triangles(&self) -> usize {
        self.models.iter().map(|m| m.triangle_count).sum()
    }
}
