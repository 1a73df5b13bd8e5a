//! Atlas packing: places each face's bordered rectangle into the current
//! lightmap, allocating a fresh atlas whenever the partition tree runs out
//! of room, then translates the face's vertices to atlas coordinates.

use glim_atlas::Lightmap;

use crate::snapshot::BakeContext;

/// Packs every face of one model. Only the most recently allocated
/// lightmap is tried; earlier atlases are considered full.
pub(crate) fn pack_model_faces(
    ctx: &mut BakeContext,
    model_index: u32,
    lightmaps: &mut Vec<Lightmap>,
    atlas_size: u32,
    with_locations: bool,
) {
    let face_ids = ctx.models[model_index as usize].faces.clone();
    for face_id in face_ids {
        let (w, h) = {
            let face = &ctx.faces[face_id as usize];
            (face.width + 2, face.height + 2)
        };

        let rect = loop {
            if let Some(current) = lightmaps.last_mut() {
                if let Some(rect) = current.insert_rect(w, h) {
                    break rect;
                }
            }
            lightmaps.push(Lightmap::new(atlas_size, with_locations));
        };

        let face = &mut ctx.faces[face_id as usize];
        face.lightmap = lightmaps.len() as u32 - 1;
        face.rect = rect;

        // Atlas-absolute vertex coordinates, inset by the 1-texel border.
        let offset = glim_geom::IVec2::new(rect.x + 1, rect.y + 1);
        for &tri_id in &face.tris {
            for v in ctx.triangles[tri_id as usize].verts.iter_mut() {
                v.lm_coord = v.lm_coord + offset;
            }
        }
    }
}
