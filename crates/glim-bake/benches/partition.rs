use std::sync::{Arc, Mutex};

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use glim_bake::{BakeConfig, BakeScene, Baker, GetShadowEntry, TextureBackend};
use glim_geom::{Vec2, Vec3};
use glim_scene::{Color, Mesh, SceneLight, TextureId};

struct NullBackend;

impl TextureBackend for NullBackend {
    fn create_texture(&mut self, _w: u32, _h: u32, _pixels: &[u8]) -> TextureId {
        TextureId(0)
    }
    fn update_texture(&mut self, _id: TextureId, _w: u32, _h: u32, _pixels: &[u8]) {}
}

/// `n x n` grid of unit floor quads in one surface; every quad shares
/// vertices with its neighbors, so the whole grid merges into one face and
/// the O(n^2) grouping gets exercised.
fn grid_mesh(n: usize) -> Mesh {
    let mut mesh = Mesh::new("grid");
    let s = mesh.create_surface();
    let surface = &mut mesh.surfaces[s];
    for gz in 0..n {
        for gx in 0..n {
            let (x, z) = (gx as f32, gz as f32);
            let base = surface.vertex_count() as u32;
            for (dx, dz) in [(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)] {
                surface.add_vertex(
                    Vec3::new(x + dx, 0.0, z + dz),
                    Vec3::UP,
                    Color::WHITE,
                    &[Vec2::new(dx, dz)],
                );
            }
            surface.add_triangle([base, base + 1, base + 2]);
            surface.add_triangle([base, base + 2, base + 3]);
        }
    }
    mesh
}

fn bench_partition_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition_grid");
    for n in [4usize, 8] {
        let scene = BakeScene {
            meshes: vec![grid_mesh(n)],
            cast_shadow: vec![],
            get_shadow: vec![GetShadowEntry::new(0)],
            lights: vec![SceneLight::directional(Vec3::new(0.0, -1.0, 0.0), Color::WHITE)],
        };
        let cfg = BakeConfig {
            max_lightmap_size: 128,
            default_density: 4.0,
            blur_radius: 0,
            thread_count: 1,
            ..BakeConfig::default()
        };
        group.bench_function(format!("{n}x{n}"), |b| {
            b.iter(|| {
                let mut baker = Baker::new(Arc::new(Mutex::new(NullBackend)));
                baker.generate(&scene, &cfg).unwrap();
                black_box(baker.lightmaps().len());
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_partition_grid);
criterion_main!(benches);
