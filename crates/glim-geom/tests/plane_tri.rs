use glim_geom::{Aabb, Mat4, Plane, Triangle3, Vec2, Vec3, barycentric_2d};

fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

#[test]
fn plane_from_ccw_triangle_faces_up() {
    let p = Plane::from_points(
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 0.0),
    );
    assert!(approx(p.normal.y, 1.0, 1e-5));
    assert!(p.is_front(Vec3::new(0.2, 3.0, 0.2)));
    assert!(!p.is_front(Vec3::new(0.2, -3.0, 0.2)));
    assert!(approx(p.distance_to(Vec3::new(5.0, 2.0, -7.0)), 2.0, 1e-5));
}

#[test]
fn closest_point_regions() {
    let tri = Triangle3::new(
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(4.0, 0.0, 0.0),
        Vec3::new(0.0, 4.0, 0.0),
    );
    // Interior point projects straight down onto the plane.
    let q = tri.closest_point(Vec3::new(1.0, 1.0, 5.0));
    assert!(approx(q.x, 1.0, 1e-5) && approx(q.y, 1.0, 1e-5) && approx(q.z, 0.0, 1e-5));
    // Beyond vertex A.
    let q = tri.closest_point(Vec3::new(-3.0, -3.0, 0.0));
    assert!(approx(q.x, 0.0, 1e-5) && approx(q.y, 0.0, 1e-5));
    // Beyond edge AB.
    let q = tri.closest_point(Vec3::new(2.0, -5.0, 0.0));
    assert!(approx(q.x, 2.0, 1e-5) && approx(q.y, 0.0, 1e-5));
    assert!(approx(tri.distance_to_point(Vec3::new(2.0, -5.0, 0.0)), 5.0, 1e-4));
}

#[test]
fn barycentric_roundtrip_2d() {
    let (a, b, c) = (
        Vec2::new(1.0, 1.0),
        Vec2::new(9.0, 2.0),
        Vec2::new(3.0, 8.0),
    );
    let p = Vec2::new(4.0, 4.0);
    let w = barycentric_2d(a, b, c, p);
    assert!(approx(w.x + w.y + w.z, 1.0, 1e-5));
    let back = Vec2::new(
        a.x * w.x + b.x * w.y + c.x * w.z,
        a.y * w.x + b.y * w.y + c.y * w.z,
    );
    assert!(approx(back.x, p.x, 1e-4) && approx(back.y, p.y, 1e-4));
}

#[test]
fn barycentric_vertices_are_unit_weights() {
    let (a, b, c) = (
        Vec2::new(0.0, 0.0),
        Vec2::new(4.0, 0.0),
        Vec2::new(0.0, 4.0),
    );
    let w = barycentric_2d(a, b, c, b);
    assert!(approx(w.x, 0.0, 1e-5) && approx(w.y, 1.0, 1e-5) && approx(w.z, 0.0, 1e-5));
}

#[test]
fn mat4_translate_rotate_point() {
    let m = Mat4::translation(Vec3::new(1.0, 2.0, 3.0)) * Mat4::rotation_y(core::f32::consts::FRAC_PI_2);
    let p = m.transform_point(Vec3::new(1.0, 0.0, 0.0));
    // Rotating +X by 90 degrees about Y lands on -Z, then translate.
    assert!(approx(p.x, 1.0, 1e-5) && approx(p.y, 2.0, 1e-5) && approx(p.z, 2.0, 1e-5));
    // Directions ignore translation.
    let d = m.transform_dir(Vec3::new(1.0, 0.0, 0.0));
    assert!(approx(d.x, 0.0, 1e-5) && approx(d.z, -1.0, 1e-5));
}

#[test]
fn aabb_expand_and_sphere_overlap() {
    let mut bb = Aabb::EMPTY;
    bb.expand(Vec3::new(-1.0, 0.0, 0.0));
    bb.expand(Vec3::new(2.0, 3.0, 4.0));
    assert_eq!(bb.min, Vec3::new(-1.0, 0.0, 0.0));
    assert_eq!(bb.max, Vec3::new(2.0, 3.0, 4.0));
    assert!(bb.overlaps_sphere(Vec3::new(4.0, 3.0, 4.0), 2.5));
    assert!(!bb.overlaps_sphere(Vec3::new(5.0, 3.0, 4.0), 2.5));
    assert!(bb.overlaps_sphere(Vec3::new(100.0, 0.0, 0.0), f32::MAX));
}
