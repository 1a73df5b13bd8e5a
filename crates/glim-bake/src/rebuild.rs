//! Mesh rebuilder: emits one output surface per face carrying the original
//! vertex attributes plus the normalized lightmap UV channel and the face's
//! atlas texture, then merges compatible surfaces.

use glim_geom::Vec2;
use glim_scene::{MAX_UV_CHANNELS, Mesh, TextureId};
use hashbrown::HashMap;

use crate::error::BakeError;
use crate::progress::Progress;
use crate::snapshot::{BakeContext, Model};

/// Builds the final meshes: one per standalone model plus a single shared
/// mesh for everything else (omitted when empty).
pub(crate) fn build_output_meshes(
    ctx: &BakeContext,
    meshes: &[Mesh],
    lightmap_textures: &[TextureId],
    atlas_size: u32,
    progress: &mut Progress<'_>,
) -> Result<Vec<Mesh>, BakeError> {
    let mut shared = Mesh::new("lightmap-scene");
    let mut out = Vec::new();

    for model in &ctx.models {
        progress.step(4)?;
        if model.stay_alone {
            let mut mesh = Mesh::new(meshes[model.mesh as usize].name.clone());
            build_model_surfaces(ctx, meshes, model, lightmap_textures, atlas_size, &mut mesh);
            merge_surfaces(&mut mesh);
            out.push(mesh);
        } else {
            build_model_surfaces(ctx, meshes, model, lightmap_textures, atlas_size, &mut shared);
        }
    }

    if !shared.surfaces.is_empty() {
        merge_surfaces(&mut shared);
        out.insert(0, shared);
    }
    Ok(out)
}

fn build_model_surfaces(
    ctx: &BakeContext,
    meshes: &[Mesh],
    model: &Model,
    lightmap_textures: &[TextureId],
    atlas_size: u32,
    target: &mut Mesh,
) {
    let src_mesh = &meshes[model.mesh as usize];

    for &face_id in &model.faces {
        let face = &ctx.faces[face_id as usize];
        let src_surface = &src_mesh.surfaces[face.surface as usize];
        // Leave one channel slot for the lightmap UVs.
        let channels = src_surface.uv_channels.len().min(MAX_UV_CHANNELS - 1);

        let s = target.create_surface();
        let surface = &mut target.surfaces[s];

        let mut next = 0u32;
        for &tri_id in &face.tris {
            let tri = &ctx.triangles[tri_id as usize];
            for v in &tri.verts {
                let mut uvs: Vec<Vec2> = (0..channels).map(|ch| v.uv[ch]).collect();
                uvs.push(v.map_coord(atlas_size));
                surface.add_vertex(v.position, v.normal, v.color, &uvs);
            }
            surface.add_triangle([next, next + 1, next + 2]);
            next += 3;
        }

        for layer in src_surface.textures.iter().take(channels.max(1)) {
            surface.add_texture(layer.clone());
        }
        surface.lightmap_texture = lightmap_textures.get(face.lightmap as usize).copied();
    }
}

/// Concatenates surfaces that share the same texture layers and lightmap;
/// faces packed into one atlas collapse back into few draw batches.
fn merge_surfaces(mesh: &mut Mesh) {
    let surfaces = std::mem::take(&mut mesh.surfaces);
    let mut merged: Vec<glim_scene::MeshSurface> = Vec::new();
    let mut by_key: HashMap<(Vec<usize>, Option<TextureId>), usize> = HashMap::new();

    for surface in surfaces {
        let key = (
            surface
                .textures
                .iter()
                .map(|t| std::sync::Arc::as_ptr(t) as usize)
                .collect::<Vec<_>>(),
            surface.lightmap_texture,
        );
        match by_key.get(&key) {
            Some(&target) => {
                let dst = &mut merged[target];
                let base = dst.vertex_count() as u32;
                for i in 0..surface.vertex_count() {
                    let uvs: Vec<Vec2> = (0..surface.uv_channels.len())
                        .map(|ch| surface.uv(ch, i))
                        .collect();
                    dst.add_vertex(
                        surface.positions[i],
                        surface.normals[i],
                        surface.colors[i],
                        &uvs,
                    );
                }
                for idx in &surface.indices {
                    dst.add_triangle([idx[0] + base, idx[1] + base, idx[2] + base]);
                }
            }
            None => {
                by_key.insert(key, merged.len());
                merged.push(surface);
            }
        }
    }
    mesh.surfaces = merged;
}
