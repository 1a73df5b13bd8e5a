//! k-d tree over world-space triangles: candidate queries around a light and
//! shadow-ray intersection tests for the baker.
#![forbid(unsafe_code)]

use glim_geom::{Aabb, Vec3};
use glim_scene::Mesh;

const MAX_DEPTH: usize = 20;
const LEAF_TRIS: usize = 8;
const BARY_EPSILON: f32 = 1.0e-6;

/// Identity of a source triangle: originating mesh, surface and triangle
/// index, enough to resolve a hit back to scene data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TriRef {
    pub mesh: u32,
    pub surface: u32,
    pub triangle: u32,
}

/// World-space triangle stored in the tree.
#[derive(Clone, Copy, Debug)]
pub struct CollTriangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub source: TriRef,
}

impl CollTriangle {
    #[inline]
    fn centroid(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }

    fn bounds(&self) -> Aabb {
        let mut bb = Aabb::EMPTY;
        bb.expand(self.a);
        bb.expand(self.b);
        bb.expand(self.c);
        bb
    }
}

/// Directed segment from `start` to `end`; intersections are parameterized
/// by `t` in `[0, 1]` along it.
#[derive(Clone, Copy, Debug)]
pub struct Segment {
    pub start: Vec3,
    pub end: Vec3,
}

impl Segment {
    #[inline]
    pub const fn new(start: Vec3, end: Vec3) -> Segment {
        Segment { start, end }
    }

    #[inline]
    fn dir(&self) -> Vec3 {
        self.end - self.start
    }
}

/// One segment/triangle intersection.
#[derive(Clone, Copy, Debug)]
pub struct Contact {
    pub point: Vec3,
    /// Segment parameter of the hit.
    pub t: f32,
    /// Barycentric weights of the hit for vertices B and C (A gets the rest);
    /// used to resample vertex attributes at the hit.
    pub u: f32,
    pub v: f32,
    pub source: TriRef,
}

enum Node {
    Branch { bounds: Aabb, left: u32, right: u32 },
    Leaf { bounds: Aabb, start: u32, end: u32 },
}

impl Node {
    #[inline]
    fn bounds(&self) -> &Aabb {
        match self {
            Node::Branch { bounds, .. } => bounds,
            Node::Leaf { bounds, .. } => bounds,
        }
    }
}

/// Static spatial index built once per bake from the cast-shadow meshes.
pub struct CollisionTree {
    tris: Vec<CollTriangle>,
    nodes: Vec<Node>,
}

impl CollisionTree {
    /// Builds the tree from `(mesh_index, mesh)` pairs; triangles are
    /// transformed to world space here, once.
    pub fn build<'a>(meshes: impl IntoIterator<Item = (u32, &'a Mesh)>) -> CollisionTree {
        let mut tris = Vec::new();
        for (mesh_index, mesh) in meshes {
            for (surface_index, surface) in mesh.surfaces.iter().enumerate() {
                for (tri_index, idx) in surface.indices.iter().enumerate() {
                    let world = |i: u32| mesh.transform.transform_point(surface.positions[i as usize]);
                    tris.push(CollTriangle {
                        a: world(idx[0]),
                        b: world(idx[1]),
                        c: world(idx[2]),
                        source: TriRef {
                            mesh: mesh_index,
                            surface: surface_index as u32,
                            triangle: tri_index as u32,
                        },
                    });
                }
            }
        }

        let mut tree = CollisionTree {
            tris,
            nodes: Vec::new(),
        };
        if !tree.tris.is_empty() {
            let end = tree.tris.len();
            tree.build_range(0, end, 0);
        }
        tree
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.tris.len()
    }

    fn range_bounds(&self, start: usize, end: usize) -> Aabb {
        let mut bb = Aabb::EMPTY;
        for tri in &self.tris[start..end] {
            let tb = tri.bounds();
            bb.expand(tb.min);
            bb.expand(tb.max);
        }
        bb
    }

    fn build_range(&mut self, start: usize, end: usize, depth: usize) -> u32 {
        let bounds = self.range_bounds(start, end);
        let index = self.nodes.len() as u32;
        if end - start <= LEAF_TRIS || depth >= MAX_DEPTH {
            self.nodes.push(Node::Leaf {
                bounds,
                start: start as u32,
                end: end as u32,
            });
            return index;
        }

        // Median split on the longest bounds axis.
        let extent = bounds.max - bounds.min;
        let axis = if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        };
        let key = |t: &CollTriangle| {
            let c = t.centroid();
            match axis {
                0 => c.x,
                1 => c.y,
                _ => c.z,
            }
        };
        self.tris[start..end].sort_by(|a, b| key(a).total_cmp(&key(b)));
        let mid = start + (end - start) / 2;

        // Reserve the slot so children land after their parent.
        self.nodes.push(Node::Leaf {
            bounds,
            start: 0,
            end: 0,
        });
        let left = self.build_range(start, mid, depth + 1);
        let right = self.build_range(mid, end, depth + 1);
        self.nodes[index as usize] = Node::Branch {
            bounds,
            left,
            right,
        };
        index
    }

    /// Visits every leaf whose bounds intersect the sphere, handing the
    /// leaf's triangle slice to `visit`. A triangle spanning several leaves
    /// is reported once per leaf; callers de-duplicate by [`TriRef`].
    pub fn leaves_near(&self, center: Vec3, radius: f32, mut visit: impl FnMut(&[CollTriangle])) {
        if self.nodes.is_empty() {
            return;
        }
        let mut stack = vec![0u32];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if !node.bounds().overlaps_sphere(center, radius) {
                continue;
            }
            match node {
                Node::Branch { left, right, .. } => {
                    stack.push(*left);
                    stack.push(*right);
                }
                Node::Leaf { start, end, .. } => {
                    visit(&self.tris[*start as usize..*end as usize]);
                }
            }
        }
    }

    /// All intersections along the segment, ordered near to far.
    pub fn intersections(&self, seg: &Segment) -> Vec<Contact> {
        let mut contacts = Vec::new();
        self.walk_segment(seg, 1.0, &mut |contact| {
            contacts.push(contact);
            false
        });
        contacts.sort_by(|a, b| a.t.total_cmp(&b.t));
        contacts
    }

    /// Cheap binary test: does anything intersect the segment before
    /// parameter `t_max`?
    pub fn hits_anything(&self, seg: &Segment, t_max: f32) -> bool {
        let mut hit = false;
        self.walk_segment(seg, t_max, &mut |_c| {
            hit = true;
            true
        });
        hit
    }

    fn walk_segment(&self, seg: &Segment, t_max: f32, on_hit: &mut impl FnMut(Contact) -> bool) {
        if self.nodes.is_empty() {
            return;
        }
        let dir = seg.dir();
        let mut stack = vec![0u32];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if !segment_hits_aabb(seg.start, dir, node.bounds()) {
                continue;
            }
            match node {
                Node::Branch { left, right, .. } => {
                    stack.push(*left);
                    stack.push(*right);
                }
                Node::Leaf { start, end, .. } => {
                    for tri in &self.tris[*start as usize..*end as usize] {
                        if let Some(contact) = intersect_triangle(seg.start, dir, tri) {
                            if contact.t <= t_max && on_hit(contact) {
                                return;
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Slab test of a segment (`t` in 0..1) against a box.
fn segment_hits_aabb(origin: Vec3, dir: Vec3, bounds: &Aabb) -> bool {
    let mut t_min = 0.0f32;
    let mut t_max = 1.0f32;
    let axes = [
        (origin.x, dir.x, bounds.min.x, bounds.max.x),
        (origin.y, dir.y, bounds.min.y, bounds.max.y),
        (origin.z, dir.z, bounds.min.z, bounds.max.z),
    ];
    for (o, d, lo, hi) in axes {
        if d.abs() < 1.0e-12 {
            if o < lo || o > hi {
                return false;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (mut t1, mut t2) = ((lo - o) * inv, (hi - o) * inv);
        if t1 > t2 {
            core::mem::swap(&mut t1, &mut t2);
        }
        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_min > t_max {
            return false;
        }
    }
    true
}

/// Moller-Trumbore, two-sided, `t` limited to the segment.
fn intersect_triangle(origin: Vec3, dir: Vec3, tri: &CollTriangle) -> Option<Contact> {
    let e1 = tri.b - tri.a;
    let e2 = tri.c - tri.a;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1.0e-10 {
        return None;
    }
    let inv = 1.0 / det;
    let s = origin - tri.a;
    let u = s.dot(p) * inv;
    if u < -BARY_EPSILON || u > 1.0 + BARY_EPSILON {
        return None;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) * inv;
    if v < -BARY_EPSILON || u + v > 1.0 + BARY_EPSILON {
        return None;
    }
    let t = e2.dot(q) * inv;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }
    Some(Contact {
        point: origin + dir * t,
        t,
        u,
        v,
        source: tri.source,
    })
}
