//! Partitioning and packing invariants on a multi-face scene.

mod common;

use common::{floor_rect, shared_backend};
use glim_bake::{Axis, BakeConfig, BakeScene, Baker, GetShadowEntry};
use glim_geom::Vec3;
use glim_scene::{Color, Mesh, SceneLight};
use hashbrown::HashSet;

/// One mesh with three walls of an open box plus a detached floor patch:
/// four faces over three dominant axes, all in one surface except the
/// detached patch which gets its own surface.
fn box_scene_mesh() -> Mesh {
    let mut mesh = Mesh::new("room");
    let s = mesh.create_surface();
    {
        let surface = &mut mesh.surfaces[s];
        let mut quad = |corners: [Vec3; 4], normal: Vec3| {
            let base = surface.vertex_count() as u32;
            for c in corners {
                surface.add_vertex(c, normal, Color::WHITE, &[]);
            }
            surface.add_triangle([base, base + 1, base + 2]);
            surface.add_triangle([base, base + 2, base + 3]);
        };
        // Floor spanning two coplanar quads that share an edge: one face.
        quad(
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 4.0),
                Vec3::new(4.0, 0.0, 4.0),
                Vec3::new(4.0, 0.0, 0.0),
            ],
            Vec3::UP,
        );
        quad(
            [
                Vec3::new(4.0, 0.0, 0.0),
                Vec3::new(4.0, 0.0, 4.0),
                Vec3::new(8.0, 0.0, 4.0),
                Vec3::new(8.0, 0.0, 0.0),
            ],
            Vec3::UP,
        );
        // Wall in the XY plane.
        quad(
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(4.0, 0.0, 0.0),
                Vec3::new(4.0, 3.0, 0.0),
                Vec3::new(0.0, 3.0, 0.0),
            ],
            Vec3::new(0.0, 0.0, 1.0),
        );
        // Wall in the YZ plane.
        quad(
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 3.0, 0.0),
                Vec3::new(0.0, 3.0, 4.0),
                Vec3::new(0.0, 0.0, 4.0),
            ],
            Vec3::new(1.0, 0.0, 0.0),
        );
    }
    // Detached patch in its own surface; shares positions with the floor
    // but surfaces never merge.
    let s2 = mesh.create_surface();
    {
        let surface = &mut mesh.surfaces[s2];
        for c in [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 4.0),
            Vec3::new(4.0, 0.0, 4.0),
        ] {
            surface.add_vertex(c, Vec3::UP, Color::WHITE, &[]);
        }
        surface.add_triangle([0, 1, 2]);
    }
    mesh
}

fn bake_box_scene() -> Baker {
    let scene = BakeScene {
        meshes: vec![box_scene_mesh()],
        cast_shadow: vec![],
        get_shadow: vec![GetShadowEntry::new(0)],
        lights: vec![SceneLight::directional(Vec3::new(0.0, -1.0, 0.0), Color::WHITE)],
    };
    let cfg = BakeConfig {
        ambient: Color::BLACK,
        max_lightmap_size: 64,
        default_density: 2.0,
        blur_radius: 0,
        thread_count: 1,
        ..BakeConfig::default()
    };
    let mut baker = Baker::new(shared_backend());
    baker.generate(&scene, &cfg).unwrap();
    baker
}

#[test]
fn every_triangle_lands_in_exactly_one_face() {
    let baker = bake_box_scene();
    let ctx = baker.context().unwrap();

    // 9 input triangles survive the snapshot intact.
    assert_eq!(ctx.triangles.len(), 9);
    let mut seen = HashSet::new();
    for tri in &ctx.triangles {
        assert!(seen.insert((tri.surface, tri.index)), "duplicated triangle");
    }

    // Faces partition the arena: each triangle id appears in exactly one
    // face, and that face is the one recorded on the triangle.
    let mut owned = vec![0usize; ctx.triangles.len()];
    for (face_id, face) in ctx.faces.iter().enumerate() {
        for &tri_id in &face.tris {
            owned[tri_id as usize] += 1;
            assert_eq!(ctx.triangles[tri_id as usize].face, face_id as u32);
        }
    }
    assert!(owned.iter().all(|&n| n == 1));

    // Coplanar floor quads merged, walls and the detached patch did not:
    // floor, wall-Z, wall-X, patch.
    assert_eq!(ctx.faces.len(), 4);
}

#[test]
fn faces_share_their_dominant_axis() {
    let baker = bake_box_scene();
    let ctx = baker.context().unwrap();
    let mut axes = HashSet::new();
    for face in &ctx.faces {
        for &tri_id in &face.tris {
            let tri = &ctx.triangles[tri_id as usize];
            assert_eq!(Axis::classify(tri.plane.normal), face.axis);
        }
        axes.insert(face.axis);
    }
    assert!(axes.contains(&Axis::PosY));
    assert!(axes.contains(&Axis::PosZ));
    assert!(axes.contains(&Axis::PosX));
}

#[test]
fn packed_rects_do_not_overlap_within_an_atlas() {
    let baker = bake_box_scene();
    let ctx = baker.context().unwrap();
    for (i, a) in ctx.faces.iter().enumerate() {
        assert_eq!(a.rect.w, a.width + 2);
        assert_eq!(a.rect.h, a.height + 2);
        for b in ctx.faces.iter().skip(i + 1) {
            if a.lightmap == b.lightmap {
                assert!(!a.rect.intersects(&b.rect), "{:?} vs {:?}", a.rect, b.rect);
            }
        }
    }
}

#[test]
fn vertex_coords_stay_inside_their_face_rect() {
    let baker = bake_box_scene();
    let ctx = baker.context().unwrap();
    for face in &ctx.faces {
        for &tri_id in &face.tris {
            for v in &ctx.triangles[tri_id as usize].verts {
                assert!(
                    v.lm_coord.x >= face.rect.x + 1
                        && v.lm_coord.x <= face.rect.x + 1 + face.width
                        && v.lm_coord.y >= face.rect.y + 1
                        && v.lm_coord.y <= face.rect.y + 1 + face.height,
                    "{:?} outside {:?}",
                    v.lm_coord,
                    face.rect
                );
            }
        }
    }
}

#[test]
fn zero_hints_fall_back_to_the_default_density() {
    let baker = bake_box_scene();
    let ctx = baker.context().unwrap();
    for face in &ctx.faces {
        assert_eq!(face.density, 2.0);
    }
    // Density 2 doubles the floor footprint: 8x4 world becomes 16x8 texels.
    let floor = ctx
        .faces
        .iter()
        .find(|f| f.axis == Axis::PosY && f.tris.len() == 4)
        .expect("merged floor face");
    assert_eq!((floor.width, floor.height), (16, 8));
}

#[test]
fn density_hints_average_per_face() {
    let mut entry = GetShadowEntry::new(0);
    // Surface 0 has 8 triangles, surface 1 has one.
    entry.density_hints = vec![vec![4.0; 8], vec![0.0]];
    let scene = BakeScene {
        meshes: vec![box_scene_mesh()],
        cast_shadow: vec![],
        get_shadow: vec![entry],
        lights: vec![],
    };
    let cfg = BakeConfig {
        max_lightmap_size: 128,
        default_density: 1.0,
        blur_radius: 0,
        ..BakeConfig::default()
    };
    let mut baker = Baker::new(shared_backend());
    baker.generate(&scene, &cfg).unwrap();
    let ctx = baker.context().unwrap();
    for face in &ctx.faces {
        if face.surface == 0 {
            assert_eq!(face.density, 4.0);
        } else {
            assert_eq!(face.density, 1.0, "all-zero hints use the default");
        }
    }
}

#[test]
fn oversized_faces_rescale_to_fit_the_atlas() {
    let scene = BakeScene {
        meshes: vec![floor_rect("big", 0.0, 0.0, 100.0, 50.0, 0.0)],
        cast_shadow: vec![],
        get_shadow: vec![GetShadowEntry::new(0)],
        lights: vec![],
    };
    let cfg = BakeConfig {
        max_lightmap_size: 32,
        default_density: 1.0,
        blur_radius: 0,
        ..BakeConfig::default()
    };
    let mut baker = Baker::new(shared_backend());
    baker.generate(&scene, &cfg).unwrap();
    let ctx = baker.context().unwrap();
    assert_eq!(ctx.faces.len(), 1);
    let face = &ctx.faces[0];
    assert!(face.width <= 30 && face.height <= 30);
    // Uniform rescale keeps the 2:1 aspect.
    assert_eq!(face.width, 30);
    assert_eq!(face.height, 15);
}

#[test]
fn faces_spill_into_additional_atlases() {
    // Four 10x10 patches cannot share one 16x16 atlas.
    let mut meshes = Vec::new();
    let mut get_shadow = Vec::new();
    for i in 0..4 {
        let base = i as f32 * 20.0;
        meshes.push(floor_rect("patch", base, 0.0, base + 10.0, 10.0, 0.0));
        get_shadow.push(GetShadowEntry::new(i));
    }
    let scene = BakeScene {
        meshes,
        cast_shadow: vec![],
        get_shadow,
        lights: vec![],
    };
    let cfg = BakeConfig {
        max_lightmap_size: 16,
        default_density: 1.0,
        blur_radius: 0,
        ..BakeConfig::default()
    };
    let mut baker = Baker::new(shared_backend());
    baker.generate(&scene, &cfg).unwrap();
    assert_eq!(baker.lightmaps().len(), 4);
    let ctx = baker.context().unwrap();
    let atlases: HashSet<u32> = ctx.faces.iter().map(|f| f.lightmap).collect();
    assert_eq!(atlases.len(), 4);
}
