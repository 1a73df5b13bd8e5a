//! Procedural demo scene: an open room corner with a crate on the floor,
//! lit by a warm point light and a dim directional fill.

use glim_bake::{BakeScene, GetShadowEntry};
use glim_geom::{Vec2, Vec3};
use glim_scene::{Color, Mesh, MeshSurface, SceneLight};

fn add_quad(surface: &mut MeshSurface, corners: [Vec3; 4], normal: Vec3) {
    // Planar UVs from the two non-dominant axes, 4 world units per tile.
    let uv_from = |p: Vec3| {
        let n = normal;
        let (u, v) = if n.x.abs() >= n.y.abs() && n.x.abs() >= n.z.abs() {
            (p.z, p.y)
        } else if n.y.abs() >= n.z.abs() {
            (p.x, p.z)
        } else {
            (p.x, p.y)
        };
        Vec2::new(u / 4.0, v / 4.0)
    };
    let base = surface.vertex_count() as u32;
    for c in corners {
        surface.add_vertex(c, normal, Color::WHITE, &[uv_from(c)]);
    }
    surface.add_triangle([base, base + 1, base + 2]);
    surface.add_triangle([base, base + 2, base + 3]);
}

/// Floor plus two walls meeting in a corner, one surface.
fn room_mesh(extent: f32, height: f32) -> Mesh {
    let mut mesh = Mesh::new("room");
    let s = mesh.create_surface();
    let surface = &mut mesh.surfaces[s];
    let e = extent;
    // Floor, facing up.
    add_quad(
        surface,
        [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, e),
            Vec3::new(e, 0.0, e),
            Vec3::new(e, 0.0, 0.0),
        ],
        Vec3::UP,
    );
    // Back wall at z = 0, facing into the room (+Z).
    add_quad(
        surface,
        [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(e, 0.0, 0.0),
            Vec3::new(e, height, 0.0),
            Vec3::new(0.0, height, 0.0),
        ],
        Vec3::new(0.0, 0.0, 1.0),
    );
    // Side wall at x = 0, facing into the room (+X).
    add_quad(
        surface,
        [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, height, 0.0),
            Vec3::new(0.0, height, e),
            Vec3::new(0.0, 0.0, e),
        ],
        Vec3::new(1.0, 0.0, 0.0),
    );
    mesh
}

/// Axis-aligned box with outward faces, one surface.
fn box_mesh(name: &str, min: Vec3, max: Vec3) -> Mesh {
    let mut mesh = Mesh::new(name);
    let s = mesh.create_surface();
    let surface = &mut mesh.surfaces[s];
    let (a, b) = (min, max);
    // Top and bottom.
    add_quad(
        surface,
        [
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(b.x, b.y, a.z),
        ],
        Vec3::UP,
    );
    add_quad(
        surface,
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, a.y, b.z),
        ],
        -Vec3::UP,
    );
    // Z sides.
    add_quad(
        surface,
        [
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(a.x, b.y, b.z),
        ],
        Vec3::new(0.0, 0.0, 1.0),
    );
    add_quad(
        surface,
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(b.x, a.y, a.z),
        ],
        Vec3::new(0.0, 0.0, -1.0),
    );
    // X sides.
    add_quad(
        surface,
        [
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(b.x, a.y, b.z),
        ],
        Vec3::new(1.0, 0.0, 0.0),
    );
    add_quad(
        surface,
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(a.x, b.y, a.z),
        ],
        Vec3::new(-1.0, 0.0, 0.0),
    );
    mesh
}

pub fn build_scene() -> BakeScene {
    let meshes = vec![
        room_mesh(12.0, 6.0),
        box_mesh("crate", Vec3::new(4.0, 0.0, 4.0), Vec3::new(6.0, 2.0, 6.0)),
    ];
    let lights = vec![
        SceneLight::point(
            Vec3::new(8.0, 5.0, 8.0),
            Color::rgb(255, 230, 180),
            [1.0, 0.05, 0.01],
        ),
        SceneLight::directional(
            Vec3::new(-0.4, -1.0, -0.3).normalized(),
            Color::rgb(40, 45, 60),
        ),
    ];
    BakeScene {
        cast_shadow: vec![0, 1],
        get_shadow: vec![GetShadowEntry::new(0), GetShadowEntry::new(1)],
        meshes,
        lights,
    }
}
