//! Face partitioner: buckets a model's triangles by dominant axis, grows
//! faces along shared-vertex adjacency, merges what the greedy scan missed,
//! then projects every face into its texel rectangle.
//!
//! The grouping and merge passes are O(n^2) per bucket and dominate bake
//! time on dense meshes; the bake is a batch job and treats that as
//! acceptable.

use glim_scene::Mesh;

use crate::axis::{Axis, project};
use crate::error::BakeError;
use crate::progress::Progress;
use crate::snapshot::{BakeContext, Face, Triangle, Vertex};

/// Partitions one model's triangles into faces, appending the results to
/// the context arenas and filling the model's triangle lookup.
pub(crate) fn partition_model(
    ctx: &mut BakeContext,
    model_index: u32,
    mesh: &Mesh,
    max_lightmap_size: u32,
    default_density: f32,
    progress: &mut Progress<'_>,
) -> Result<(), BakeError> {
    let mut buckets = snapshot_axis_buckets(model_index, mesh);

    for bucket in buckets.iter_mut() {
        let mut groups = create_faces(std::mem::take(bucket), progress)?;
        merge_faces(&mut groups);
        progress.poll()?;
        for group in groups {
            complete_face(ctx, model_index, group, max_lightmap_size, default_density);
        }
    }
    Ok(())
}

/// Copies the mesh's triangles into world space and distributes them over
/// the six dominant-axis buckets. The buckets only live until faces are
/// built from them.
fn snapshot_axis_buckets(model_index: u32, mesh: &Mesh) -> [Vec<Triangle>; Axis::COUNT] {
    let world = mesh.transform;
    let normal_matrix = world.rotation_part();
    let mut buckets: [Vec<Triangle>; Axis::COUNT] = Default::default();

    for (surface_index, surface) in mesh.surfaces.iter().enumerate() {
        for (tri_index, idx) in surface.indices.iter().enumerate() {
            let verts = idx.map(|i| {
                Vertex::from_mesh(mesh, &world, &normal_matrix, surface_index as u32, i)
            });
            let tri = Triangle::new(model_index, surface_index as u32, tri_index as u32, verts);
            let axis = Axis::classify(tri.plane.normal);
            buckets[axis.index()].push(tri);
        }
    }
    buckets
}

/// Greedy grouping: each triangle joins the first existing group containing
/// an adjacent triangle, else starts a new group.
fn create_faces(
    bucket: Vec<Triangle>,
    progress: &mut Progress<'_>,
) -> Result<Vec<Vec<Triangle>>, BakeError> {
    let mut groups: Vec<Vec<Triangle>> = Vec::new();
    for tri in bucket {
        progress.step(1)?;
        let found = groups
            .iter_mut()
            .find(|group| group.iter().any(|member| tri.adjacent_to(member)));
        match found {
            Some(group) => group.push(tri),
            None => groups.push(vec![tri]),
        }
    }
    Ok(groups)
}

fn groups_adjacent(a: &[Triangle], b: &[Triangle]) -> bool {
    a.iter().any(|ta| b.iter().any(|tb| ta.adjacent_to(tb)))
}

/// Merge pass: unions groups that turned out to be mutually adjacent, until
/// a full sweep makes no change.
fn merge_faces(groups: &mut Vec<Vec<Triangle>>) {
    loop {
        let mut merged = false;
        let mut i = 0;
        while i < groups.len() {
            let mut j = i + 1;
            while j < groups.len() {
                if groups_adjacent(&groups[i], &groups[j]) {
                    let absorbed = groups.swap_remove(j);
                    groups[i].extend(absorbed);
                    merged = true;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
        if !merged {
            break;
        }
    }
}

/// Finishes one face: averages its density hints, projects every vertex to
/// texel coordinates, and moves the triangles into the context arenas.
fn complete_face(
    ctx: &mut BakeContext,
    model_index: u32,
    mut tris: Vec<Triangle>,
    max_lightmap_size: u32,
    default_density: f32,
) {
    let axis = Axis::classify(tris[0].plane.normal);
    let surface = tris[0].surface;

    let density = density_average(&ctx.models[model_index as usize], &tris, default_density);
    let (width, height) = project_vertices(&mut tris, density, max_lightmap_size);

    let face_id = ctx.faces.len() as u32;
    let mut face = Face {
        model: model_index,
        axis,
        surface,
        density,
        width,
        height,
        tris: Vec::with_capacity(tris.len()),
        ..Face::default()
    };

    for mut tri in tris {
        tri.face = face_id;
        let tri_id = ctx.triangles.len() as u32;
        let model = &mut ctx.models[model_index as usize];
        model.tri_lookup[tri.surface as usize][tri.index as usize] = Some(tri_id);
        face.tris.push(tri_id);
        ctx.triangles.push(tri);
    }

    ctx.faces.push(face);
    ctx.models[model_index as usize].faces.push(face_id);
}

/// Arithmetic mean of the per-triangle density hints; the config default
/// when every hint is zero.
fn density_average(model: &crate::snapshot::Model, tris: &[Triangle], default_density: f32) -> f32 {
    let sum: f32 = tris
        .iter()
        .map(|t| model.density_hint(t.surface, t.index))
        .sum();
    if sum.abs() <= f32::EPSILON {
        default_density
    } else {
        sum / tris.len() as f32
    }
}

/// Projects every vertex onto the face plane, translates the footprint to
/// the origin and rescales it uniformly when it exceeds the atlas. Returns
/// the footprint size in texels.
fn project_vertices(tris: &mut [Triangle], density: f32, max_lightmap_size: u32) -> (i32, i32) {
    let mut min = glim_geom::IVec2::new(i32::MAX, i32::MAX);
    let mut max = glim_geom::IVec2::new(i32::MIN, i32::MIN);

    for tri in tris.iter_mut() {
        let normal = tri.plane.normal;
        for v in tri.verts.iter_mut() {
            let p = project(v.position, normal, density);
            let coord = glim_geom::IVec2::new((p.x + 0.5) as i32, (p.y + 0.5) as i32);
            min.x = min.x.min(coord.x);
            min.y = min.y.min(coord.y);
            max.x = max.x.max(coord.x);
            max.y = max.y.max(coord.y);
            v.lm_coord = coord;
        }
    }
    for tri in tris.iter_mut() {
        for v in tri.verts.iter_mut() {
            v.lm_coord = v.lm_coord - min;
        }
    }

    let mut width = max.x - min.x;
    let mut height = max.y - min.y;

    // Rescale oversized faces so they fit with the 1-texel border.
    let limit = max_lightmap_size as i32 - 2;
    if width > limit || height > limit {
        let scale = (limit as f32 / width as f32).min(limit as f32 / height as f32);
        for tri in tris.iter_mut() {
            for v in tri.verts.iter_mut() {
                v.scale_lm(scale, scale);
            }
        }
        width = (width as f32 * scale) as i32;
        height = (height as f32 * scale) as i32;
    }
    (width, height)
}
