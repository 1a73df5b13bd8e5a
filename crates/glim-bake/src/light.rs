use glim_geom::Vec3;
use glim_scene::{LightKind, SceneLight};

use crate::snapshot::Triangle;

/// Texel levels at or below this are treated as dark enough to stop caring
/// about a light; the influence radius inverts the attenuation formula at
/// this threshold.
const COLOR_THRESHOLD: f32 = 5.0;
const ATTN_EPSILON: f32 = 1.0e-6;

/// Immutable per-bake snapshot of a scene light with its derived maximum
/// influence radius.
#[derive(Clone, Debug)]
pub struct Light {
    pub kind: LightKind,
    pub position: Vec3,
    pub direction: Vec3,
    /// Diffuse color, 0..1 per channel.
    pub color: Vec3,
    pub attenuation: [f32; 3],
    pub inner_cone: f32,
    pub outer_cone: f32,
    /// False when the attenuation is the trivial `1/(1 + 0d + 0d^2)`.
    pub volumetric: bool,
    /// Maximum influence radius; `f32::MAX` for directional and
    /// non-attenuating lights (effectively the whole scene).
    pub radius: f32,
}

impl Light {
    pub fn from_scene(src: &SceneLight) -> Light {
        let [a0, a1, a2] = src.attenuation;
        let volumetric = (a0 - 1.0).abs() > ATTN_EPSILON
            || a1.abs() > ATTN_EPSILON
            || a2.abs() > ATTN_EPSILON;
        let mut light = Light {
            kind: src.kind,
            position: src.position,
            direction: src.direction.normalized(),
            color: src.color.to_vec3(),
            attenuation: src.attenuation,
            inner_cone: src.inner_cone,
            outer_cone: src.outer_cone,
            volumetric,
            radius: f32::MAX,
        };
        light.radius = light.attenuation_radius();
        light
    }

    /// Distance at which the light's contribution falls to the "dark
    /// enough" threshold, solving the attenuation formula backwards.
    fn attenuation_radius(&self) -> f32 {
        if !self.volumetric || self.kind == LightKind::Directional {
            return f32::MAX;
        }
        let [a0, a1, a2] = self.attenuation;
        let t = COLOR_THRESHOLD;
        if a2 > ATTN_EPSILON {
            // Quadratic term present: pq formula.
            let h = (a1 / a2) / 2.0;
            let disc = h * h + (255.0 - t * a0) / (t * a2);
            if disc <= 0.0 { 0.0 } else { -h + disc.sqrt() }
        } else if a1 > ATTN_EPSILON {
            ((255.0 / t - a0) / a1).max(0.0)
        } else {
            f32::MAX
        }
    }

    /// Diffuse intensity at a surface sample: Lambert term, distance
    /// attenuation for volumetric lights, cone falloff for spots.
    pub fn intensity(&self, point: Vec3, normal: Vec3) -> f32 {
        if self.kind == LightKind::Directional {
            return (-self.direction.dot(normal)).max(0.0);
        }

        let ray = (point - self.position).normalized();
        let mut intensity = -ray.dot(normal);

        if self.volumetric {
            let d = self.position.distance(point);
            let [a0, a1, a2] = self.attenuation;
            intensity /= a0 + a1 * d + a2 * d * d;
        }

        if self.kind == LightKind::Spot {
            let angle = ray.angle(self.direction);
            if angle > self.outer_cone {
                intensity = 0.0;
            } else if angle > self.inner_cone {
                let t = (angle - self.inner_cone) / (self.outer_cone - self.inner_cone);
                intensity *= 1.0 - t;
            }
        }

        intensity.max(0.0)
    }

    /// Whether a triangle can receive anything from this light at all:
    /// directional lights need the triangle to face them, local lights need
    /// it on their front side and within the influence radius.
    pub fn check_visibility(&self, tri: &Triangle) -> bool {
        if self.kind == LightKind::Directional {
            return self.direction.dot(-tri.plane.normal) > 0.0;
        }
        if !tri.plane.is_front(self.position) {
            return false;
        }
        !self.volumetric || tri.distance_to(self.position) < self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glim_geom::Vec2;
    use glim_scene::Color;

    fn snapshot_triangle(a: Vec3, b: Vec3, c: Vec3) -> Triangle {
        let vert = |p: Vec3| crate::snapshot::Vertex {
            surface: 0,
            index: 0,
            position: p,
            normal: Vec3::UP,
            color: Color::WHITE,
            uv: [Vec2::ZERO; glim_scene::MAX_UV_CHANNELS],
            lm_coord: glim_geom::IVec2::new(0, 0),
        };
        Triangle::new(0, 0, 0, [vert(a), vert(b), vert(c)])
    }

    #[test]
    fn point_light_intensity_decreases_with_distance() {
        let light = Light::from_scene(&SceneLight::point(
            Vec3::ZERO,
            Color::WHITE,
            [1.0, 0.0, 0.5],
        ));
        // Samples straight below the light, surface facing up at it.
        let i1 = light.intensity(Vec3::new(0.0, -1.0, 0.0), Vec3::UP);
        let i2 = light.intensity(Vec3::new(0.0, -2.0, 0.0), Vec3::UP);
        let i3 = light.intensity(Vec3::new(0.0, -4.0, 0.0), Vec3::UP);
        assert!(i1 > i2 && i2 > i3);
        assert!((i1 - 1.0 / 1.5).abs() < 1e-5);
    }

    #[test]
    fn directional_intensity_is_pure_lambert() {
        let light = Light::from_scene(&SceneLight::directional(
            Vec3::new(0.0, -1.0, 0.0),
            Color::WHITE,
        ));
        assert!((light.intensity(Vec3::ZERO, Vec3::UP) - 1.0).abs() < 1e-6);
        // Facing away gets nothing.
        assert_eq!(light.intensity(Vec3::ZERO, -Vec3::UP), 0.0);
    }

    #[test]
    fn spot_cone_falloff() {
        let inner = 0.3f32;
        let outer = 0.8f32;
        let light = Light::from_scene(&SceneLight::spot(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 1.0),
            Color::WHITE,
            [1.0, 0.0, 0.0],
            inner,
            outer,
        ));
        // Sample points on the unit sphere at a given angle off the spot
        // axis, each facing straight back at the light.
        let at = |angle: f32| {
            let p = Vec3::new(angle.sin(), 0.0, angle.cos());
            light.intensity(p, -p)
        };
        assert!((at(inner) - 1.0).abs() < 1e-4, "unattenuated at the inner cone");
        assert!(at(outer) < 1e-4, "zero at the outer cone");
        let (a, b, c) = (at(0.4), at(0.55), at(0.7));
        assert!(a > b && b > c, "strictly decreasing between the cones");
        assert!(a < 1.0 && c > 0.0);
    }

    #[test]
    fn attenuation_radius_inverts_the_formula() {
        let light = Light::from_scene(&SceneLight::point(
            Vec3::ZERO,
            Color::WHITE,
            [1.0, 0.0, 1.0],
        ));
        // 1/(1 + r^2) == 5/255  =>  r = sqrt(50)
        assert!((light.radius - 50.0f32.sqrt()).abs() < 1e-3);

        let linear = Light::from_scene(&SceneLight::point(
            Vec3::ZERO,
            Color::WHITE,
            [1.0, 2.0, 0.0],
        ));
        assert!((linear.radius - (255.0 / 5.0 - 1.0) / 2.0).abs() < 1e-3);

        let plain = Light::from_scene(&SceneLight::point(
            Vec3::ZERO,
            Color::WHITE,
            [1.0, 0.0, 0.0],
        ));
        assert_eq!(plain.radius, f32::MAX);
    }

    #[test]
    fn visibility_needs_front_side_and_range() {
        let tri = snapshot_triangle(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
        );
        // Plane normal points up.
        let above = Light::from_scene(&SceneLight::point(
            Vec3::new(0.2, 1.0, 0.2),
            Color::WHITE,
            [1.0, 0.0, 1.0],
        ));
        assert!(above.check_visibility(&tri));

        let below = Light::from_scene(&SceneLight::point(
            Vec3::new(0.2, -1.0, 0.2),
            Color::WHITE,
            [1.0, 0.0, 1.0],
        ));
        assert!(!below.check_visibility(&tri));

        let far = Light::from_scene(&SceneLight::point(
            Vec3::new(0.0, 100.0, 0.0),
            Color::WHITE,
            [1.0, 0.0, 1.0],
        ));
        assert!(!far.check_visibility(&tri), "beyond the influence radius");

        let toward = Light::from_scene(&SceneLight::directional(
            Vec3::new(0.0, -1.0, 0.0),
            Color::WHITE,
        ));
        assert!(toward.check_visibility(&tri));
        let away = Light::from_scene(&SceneLight::directional(
            Vec3::new(0.0, 1.0, 0.0),
            Color::WHITE,
        ));
        assert!(!away.check_visibility(&tri));
    }
}
