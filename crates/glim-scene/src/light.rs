use glim_geom::Vec3;

use crate::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

/// Immutable description of a static scene light handed to the baker.
#[derive(Clone, Debug)]
pub struct SceneLight {
    pub kind: LightKind,
    pub position: Vec3,
    /// Pointing direction; normalized by the baker's snapshot.
    pub direction: Vec3,
    pub color: Color,
    /// Attenuation coefficients of `1 / (a0 + a1*d + a2*d^2)`.
    pub attenuation: [f32; 3],
    /// Spot cone half-angles in radians; ignored for other kinds.
    pub inner_cone: f32,
    pub outer_cone: f32,
    pub visible: bool,
}

impl SceneLight {
    pub fn directional(direction: Vec3, color: Color) -> SceneLight {
        SceneLight {
            kind: LightKind::Directional,
            position: Vec3::ZERO,
            direction,
            color,
            attenuation: [1.0, 0.0, 0.0],
            inner_cone: 0.0,
            outer_cone: 0.0,
            visible: true,
        }
    }

    pub fn point(position: Vec3, color: Color, attenuation: [f32; 3]) -> SceneLight {
        SceneLight {
            kind: LightKind::Point,
            position,
            direction: Vec3::new(0.0, 0.0, 1.0),
            color,
            attenuation,
            inner_cone: 0.0,
            outer_cone: 0.0,
            visible: true,
        }
    }

    pub fn spot(
        position: Vec3,
        direction: Vec3,
        color: Color,
        attenuation: [f32; 3],
        inner_cone: f32,
        outer_cone: f32,
    ) -> SceneLight {
        SceneLight {
            kind: LightKind::Spot,
            position,
            direction,
            color,
            attenuation,
            inner_cone,
            outer_cone,
            visible: true,
        }
    }
}
