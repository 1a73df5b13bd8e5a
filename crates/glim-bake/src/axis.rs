use glim_geom::{Vec2, Vec3};

/// Dominant plane axis of a triangle; partitioning buckets triangles by it
/// so every face of a bucket unwraps onto the same 2D plane.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Axis {
    PosX = 0,
    NegX = 1,
    PosY = 2,
    NegY = 3,
    PosZ = 4,
    NegZ = 5,
}

impl Axis {
    pub const COUNT: usize = 6;

    /// Returns the `[0..6)` index of this axis.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Converts an index `[0..6)` back into an `Axis` value.
    /// Falls back to `PosX` for out-of-range indices.
    #[inline]
    pub fn from_index(i: usize) -> Axis {
        match i {
            0 => Axis::PosX,
            1 => Axis::NegX,
            2 => Axis::PosY,
            3 => Axis::NegY,
            4 => Axis::PosZ,
            5 => Axis::NegZ,
            _ => Axis::PosX,
        }
    }

    /// Buckets a plane normal by its largest absolute component; ties go to
    /// X before Y before Z.
    pub fn classify(normal: Vec3) -> Axis {
        let ax = normal.x.abs();
        let ay = normal.y.abs();
        let az = normal.z.abs();
        if ax >= ay && ax >= az {
            if normal.x >= 0.0 { Axis::PosX } else { Axis::NegX }
        } else if ay >= az {
            if normal.y >= 0.0 { Axis::PosY } else { Axis::NegY }
        } else if normal.z >= 0.0 {
            Axis::PosZ
        } else {
            Axis::NegZ
        }
    }
}

/// Projects a world-space point onto the 2D plane orthogonal to the
/// dominant axis of `normal`, scaled to texel units by `density`. The
/// dropped axis and the sign flips follow a fixed convention so all faces
/// of a bucket share an orientation.
pub fn project(point: Vec3, normal: Vec3, density: f32) -> Vec2 {
    let ax = normal.x.abs();
    let ay = normal.y.abs();
    let az = normal.z.abs();
    let p = if ax >= ay && ax >= az {
        Vec2::new(point.z, -point.y)
    } else if ay >= az {
        Vec2::new(point.x, -point.z)
    } else {
        Vec2::new(point.x, -point.y)
    };
    p * density
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_picks_largest_component() {
        assert_eq!(Axis::classify(Vec3::new(0.9, 0.1, 0.1)), Axis::PosX);
        assert_eq!(Axis::classify(Vec3::new(-0.9, 0.1, 0.1)), Axis::NegX);
        assert_eq!(Axis::classify(Vec3::new(0.1, -0.8, 0.2)), Axis::NegY);
        assert_eq!(Axis::classify(Vec3::new(0.1, 0.2, 0.8)), Axis::PosZ);
    }

    #[test]
    fn classify_breaks_ties_in_xyz_order() {
        assert_eq!(Axis::classify(Vec3::new(0.5, 0.5, 0.5)), Axis::PosX);
        assert_eq!(Axis::classify(Vec3::new(0.0, 0.5, 0.5)), Axis::PosY);
    }

    #[test]
    fn project_drops_the_dominant_axis() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(project(p, Vec3::new(1.0, 0.0, 0.0), 1.0), Vec2::new(3.0, -2.0));
        assert_eq!(project(p, Vec3::new(0.0, -1.0, 0.0), 1.0), Vec2::new(1.0, -3.0));
        assert_eq!(project(p, Vec3::new(0.0, 0.0, 1.0), 2.0), Vec2::new(2.0, -4.0));
    }
}
