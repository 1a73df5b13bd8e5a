//! Texel shader: rasterizes a triangle's footprint into its face's atlas
//! and computes each covered texel's contribution from one light, shadow
//! ray and transparency walk included.

use core::ops::{Add, Mul, Sub};

use glim_collision::{CollisionTree, Contact, Segment};
use glim_geom::{Vec2, Vec3, barycentric_2d};
use glim_raster::RasterVertex;
use glim_scene::{LightKind, Mesh};
use hashbrown::HashSet;

use crate::config::BakeFlags;
use crate::light::Light;
use crate::snapshot::BakeContext;

/// A contact closer than this to the shaded point is the receiver itself
/// and terminates the shadow walk (squared distance).
const PICK_ROUND_ERR: f32 = 1.0e-4;
/// How far "behind" the scene a directional light's pick ray starts.
const DIRECTIONAL_PICK_DISTANCE: f32 = 100.0;

/// One texel contribution produced by a shading worker and applied on the
/// calling thread. `rgb` may be zero for fully shadowed texels; the write
/// still claims the texel for its face.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TexelWrite {
    pub lightmap: u32,
    pub x: i32,
    pub y: i32,
    pub face: u32,
    pub rgb: Vec3,
}

/// Interpolated vertex for the lightmap rasterizer: atlas coordinates as
/// screen position, world position and normal as payload.
#[derive(Clone, Copy)]
pub(crate) struct ShadeVertex {
    sx: f32,
    sy: f32,
    position: Vec3,
    normal: Vec3,
}

impl Add for ShadeVertex {
    type Output = ShadeVertex;
    fn add(self, r: ShadeVertex) -> ShadeVertex {
        ShadeVertex {
            sx: self.sx + r.sx,
            sy: self.sy + r.sy,
            position: self.position + r.position,
            normal: self.normal + r.normal,
        }
    }
}

impl Sub for ShadeVertex {
    type Output = ShadeVertex;
    fn sub(self, r: ShadeVertex) -> ShadeVertex {
        ShadeVertex {
            sx: self.sx - r.sx,
            sy: self.sy - r.sy,
            position: self.position - r.position,
            normal: self.normal - r.normal,
        }
    }
}

impl Mul<f32> for ShadeVertex {
    type Output = ShadeVertex;
    fn mul(self, r: f32) -> ShadeVertex {
        ShadeVertex {
            sx: self.sx * r,
            sy: self.sy * r,
            position: self.position * r,
            normal: self.normal * r,
        }
    }
}

impl RasterVertex for ShadeVertex {
    fn screen_x(&self) -> i32 {
        self.sx as i32
    }
    fn screen_y(&self) -> i32 {
        self.sy as i32
    }
}

/// Read-only state shared by every shading worker for one light.
pub(crate) struct ShadeScene<'a> {
    pub ctx: &'a BakeContext,
    pub meshes: &'a [Mesh],
    pub tree: &'a CollisionTree,
    pub flags: BakeFlags,
}

/// Collects the de-duplicated candidate triangles within the light's
/// influence radius, in spatial-index visit order. A triangle spanning
/// several tree leaves is reported once.
pub(crate) fn gather_candidates(ctx: &BakeContext, tree: &CollisionTree, light: &Light) -> Vec<u32> {
    let mut seen: HashSet<u32> = HashSet::new();
    let mut out = Vec::new();
    tree.leaves_near(light.position, light.radius, |tris| {
        for tri in tris {
            let Some(&model_index) = ctx.model_of_mesh.get(&tri.source.mesh) else {
                // Cast-shadow-only geometry receives nothing.
                continue;
            };
            let model = &ctx.models[model_index as usize];
            let Some(tri_id) = model
                .tri_lookup
                .get(tri.source.surface as usize)
                .and_then(|s| s.get(tri.source.triangle as usize))
                .copied()
                .flatten()
            else {
                continue;
            };
            if seen.insert(tri_id) {
                out.push(tri_id);
            }
        }
    });
    out
}

/// Shades one candidate triangle for one light, emitting a write per
/// covered texel. Skips triangles the light cannot reach at all.
pub(crate) fn shade_triangle(
    scene: &ShadeScene<'_>,
    light: &Light,
    tri_id: u32,
    emit: &mut impl FnMut(TexelWrite),
) {
    let tri = &scene.ctx.triangles[tri_id as usize];
    if !light.check_visibility(tri) {
        return;
    }
    let face_id = tri.face;
    let lightmap = scene.ctx.faces[face_id as usize].lightmap;

    let vertex = |i: usize| ShadeVertex {
        sx: tri.verts[i].lm_coord.x as f32,
        sy: tri.verts[i].lm_coord.y as f32,
        position: tri.verts[i].position,
        normal: tri.verts[i].normal,
    };
    let map = [
        Vec2::new(tri.verts[0].lm_coord.x as f32, tri.verts[0].lm_coord.y as f32),
        Vec2::new(tri.verts[1].lm_coord.x as f32, tri.verts[1].lm_coord.y as f32),
        Vec2::new(tri.verts[2].lm_coord.x as f32, tri.verts[2].lm_coord.y as f32),
    ];
    let world = tri.world_triangle();

    glim_raster::triangle(
        |x, y, v: &ShadeVertex| {
            // The world position is recomputed from barycentric weights of
            // the texel center rather than trusting the rasterizer's running
            // interpolation; the normal comes from the interpolant.
            let weights = barycentric_2d(map[0], map[1], map[2], Vec2::new(x as f32 + 0.5, y as f32 + 0.5));
            let point = world.barycentric_point(weights);
            let normal = v.normal.normalized();
            let rgb = texel_contribution(scene, light, point, normal);
            emit(TexelWrite {
                lightmap,
                x,
                y,
                face: face_id,
                rgb,
            });
        },
        vertex(0),
        vertex(1),
        vertex(2),
    );
}

/// Light arriving at one world-space sample: zero when fully occluded,
/// otherwise the light color filtered by translucent occluders and scaled
/// by the diffuse intensity.
fn texel_contribution(scene: &ShadeScene<'_>, light: &Light, point: Vec3, normal: Vec3) -> Vec3 {
    let start = if light.kind == LightKind::Directional {
        point - light.direction * DIRECTIONAL_PICK_DISTANCE
    } else {
        light.position
    };
    let seg = Segment::new(start, point);

    let mut color = if scene.flags.no_colors {
        Vec3::ONE
    } else {
        light.color
    };

    if scene.flags.no_transparency {
        // Binary occlusion; exclude the receiver itself at the segment end.
        let len = (point - start).length();
        let t_max = if len > 0.0 {
            (1.0 - PICK_ROUND_ERR.sqrt() / len).max(0.0)
        } else {
            0.0
        };
        if scene.tree.hits_anything(&seg, t_max) {
            return Vec3::ZERO;
        }
    } else {
        for contact in scene.tree.intersections(&seg) {
            if contact.point.distance_sq(point) <= PICK_ROUND_ERR {
                break;
            }
            match filter_through_contact(scene, &contact, color) {
                Some(filtered) => color = filtered,
                None => return Vec3::ZERO,
            }
        }
    }

    color * light.intensity(point, normal)
}

/// Applies one occluder to the traveling light color. `None` means the
/// occluder is opaque and the walk stops; a contact that cannot be resolved
/// back to scene data passes light through unchanged.
fn filter_through_contact(scene: &ShadeScene<'_>, contact: &Contact, color: Vec3) -> Option<Vec3> {
    let Some(mesh) = scene.meshes.get(contact.source.mesh as usize) else {
        return Some(color);
    };
    let Some(surface) = mesh.surfaces.get(contact.source.surface as usize) else {
        return Some(color);
    };
    let idx = surface.indices[contact.source.triangle as usize];
    let texture = surface.textures.first();

    let translucent = mesh.diffuse_color.a < 255
        || idx.iter().any(|&i| surface.colors[i as usize].a < 255)
        || texture.is_some_and(|t| t.is_translucent());
    if !translucent {
        return None;
    }

    // Resample vertex color and layer-0 UV at the hit.
    let wa = 1.0 - contact.u - contact.v;
    let weights = [wa, contact.u, contact.v];
    let mut vcolor = Vec3::ZERO;
    let mut alpha = 0.0f32;
    let mut uv = Vec2::ZERO;
    for (k, &i) in idx.iter().enumerate() {
        let c = surface.colors[i as usize];
        vcolor += c.to_vec3() * weights[k];
        alpha += c.alpha_f32() * weights[k];
        let vuv = surface.uv(0, i as usize);
        uv = uv + vuv * weights[k];
    }

    let mut color = color;
    if let Some(tex) = texture {
        let s = tex.sample(uv.x, uv.y);
        alpha *= s.alpha_f32();
        color = color.scale(s.to_vec3() * alpha + Vec3::ONE * (1.0 - alpha));
    }
    // A translucent surface tints what passes by its vertex color; at full
    // opacity nothing passes.
    Some(color.scale(vcolor * (1.0 - alpha)))
}
