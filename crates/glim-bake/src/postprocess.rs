//! Post-processing: the face-restricted box blur and the final
//! bleed-reduce / ambient-compose / upload pass.

use glim_atlas::Lightmap;
use glim_geom::Vec3;

use crate::error::BakeError;
use crate::progress::Progress;
use crate::snapshot::BakeContext;

/// Captures post-shading colors on every atlas; the blur pass reads these
/// frozen copies so re-blurring with a new radius stays order-independent.
pub(crate) fn freeze_all(lightmaps: &mut [Lightmap]) {
    for lm in lightmaps {
        lm.freeze();
    }
}

/// Box-blurs every face of every model. Radius zero restores the frozen
/// colors, which is how a blur update back to zero is honored.
pub(crate) fn blur_all(
    ctx: &BakeContext,
    lightmaps: &mut [Lightmap],
    radius: u8,
    progress: &mut Progress<'_>,
) -> Result<(), BakeError> {
    for model in &ctx.models {
        progress.step(1)?;
        for &face_id in &model.faces {
            blur_face(ctx, lightmaps, face_id, radius as i32);
        }
    }
    Ok(())
}

/// Walks the face's texel footprint again and averages, per covered texel,
/// the frozen colors of the surrounding texels that belong to the same
/// face. Restricting the kernel to the face keeps light from smearing
/// across atlas neighbors.
fn blur_face(ctx: &BakeContext, lightmaps: &mut [Lightmap], face_id: u32, radius: i32) {
    let face = &ctx.faces[face_id as usize];
    let lm = &mut lightmaps[face.lightmap as usize];

    for &tri_id in &face.tris {
        let tri = &ctx.triangles[tri_id as usize];
        let [a, b, c] = [
            tri.verts[0].lm_coord,
            tri.verts[1].lm_coord,
            tri.verts[2].lm_coord,
        ];
        glim_raster::triangle_flat(
            |x, y| {
                let mut sum = Vec3::ZERO;
                let mut count = 0u32;
                for dy in (y - radius)..=(y + radius) {
                    for dx in (x - radius)..=(x + radius) {
                        if !lm.contains(dx, dy) {
                            continue;
                        }
                        let t = lm.texel(dx, dy);
                        if t.owner != Some(face_id) {
                            continue;
                        }
                        sum += Vec3::new(t.frozen[0] as f32, t.frozen[1] as f32, t.frozen[2] as f32);
                        count += 1;
                    }
                }
                if count > 0 {
                    let avg = sum / count as f32;
                    lm.texel_mut(x, y).color = [avg.x as u8, avg.y as u8, avg.z as u8];
                }
            },
            a,
            b,
            c,
        );
    }
}
