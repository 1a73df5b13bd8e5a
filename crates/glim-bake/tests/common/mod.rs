use std::sync::{Arc, Mutex};

use glim_bake::{TextureBackend, TextureFormat};
use glim_geom::{Vec2, Vec3};
use glim_scene::{Color, Mesh, TextureId};

/// Backend that keeps every upload in memory for assertions.
#[derive(Default)]
pub struct RecordingBackend {
    pub textures: Vec<(u32, u32, Vec<u8>)>,
    pub updates: usize,
}

impl TextureBackend for RecordingBackend {
    fn format(&self) -> TextureFormat {
        TextureFormat::Rgb
    }

    fn create_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> TextureId {
        self.textures.push((width, height, pixels.to_vec()));
        TextureId(self.textures.len() as u32 - 1)
    }

    fn update_texture(&mut self, id: TextureId, width: u32, height: u32, pixels: &[u8]) {
        self.textures[id.0 as usize] = (width, height, pixels.to_vec());
        self.updates += 1;
    }
}

pub fn shared_backend() -> Arc<Mutex<RecordingBackend>> {
    Arc::new(Mutex::new(RecordingBackend::default()))
}

/// Horizontal rectangle `[x0, x1] x [z0, z1]` at height `y`, facing +Y,
/// built from two triangles.
pub fn floor_rect(name: &str, x0: f32, z0: f32, x1: f32, z1: f32, y: f32) -> Mesh {
    let mut mesh = Mesh::new(name);
    let s = mesh.create_surface();
    let surface = &mut mesh.surfaces[s];
    let corners = [
        Vec3::new(x0, y, z0),
        Vec3::new(x0, y, z1),
        Vec3::new(x1, y, z1),
        Vec3::new(x1, y, z0),
    ];
    for (i, c) in corners.iter().enumerate() {
        let uv = Vec2::new((i % 2) as f32, (i / 2) as f32);
        surface.add_vertex(*c, Vec3::UP, Color::WHITE, &[uv]);
    }
    surface.add_triangle([0, 1, 2]);
    surface.add_triangle([0, 2, 3]);
    mesh
}
