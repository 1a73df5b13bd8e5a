//! Lightmap atlas storage: texel buffers plus the rectangle-partition tree
//! used to place face footprints without overlap.
#![forbid(unsafe_code)]

use glim_geom::Vec3;

/// Integer rectangle inside an atlas, `(x, y)` top-left, half-open extent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    #[inline]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Rect {
        Rect { x, y, w, h }
    }

    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// Node of the binary rectangle-partition tree. A node is either free, fully
/// occupied by one placed rectangle, or split into two children along the
/// axis that left the least wasted space at split time.
pub struct RectNode {
    rect: Rect,
    children: Option<Box<(RectNode, RectNode)>>,
    occupied: bool,
}

impl RectNode {
    pub fn new(rect: Rect) -> RectNode {
        RectNode {
            rect,
            children: None,
            occupied: false,
        }
    }

    /// Tries to place a `w` x `h` rectangle, returning its position on
    /// success. Placement never overlaps a previously returned rectangle.
    pub fn insert(&mut self, w: i32, h: i32) -> Option<Rect> {
        if w <= 0 || h <= 0 {
            return None;
        }
        if let Some(children) = self.children.as_mut() {
            return children
                .0
                .insert(w, h)
                .or_else(|| children.1.insert(w, h));
        }
        if self.occupied || w > self.rect.w || h > self.rect.h {
            return None;
        }
        if w == self.rect.w && h == self.rect.h {
            self.occupied = true;
            return Some(self.rect);
        }

        let r = self.rect;
        let (a, b) = if r.w - w > r.h - h {
            (
                Rect::new(r.x, r.y, w, r.h),
                Rect::new(r.x + w, r.y, r.w - w, r.h),
            )
        } else {
            (
                Rect::new(r.x, r.y, r.w, h),
                Rect::new(r.x, r.y + h, r.w, r.h - h),
            )
        };
        let mut children = Box::new((RectNode::new(a), RectNode::new(b)));
        let placed = children.0.insert(w, h);
        self.children = Some(children);
        placed
    }
}

/// One pixel of a lightmap atlas.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Texel {
    /// Working color, accumulated during shading and rewritten by the
    /// post-process passes.
    pub color: [u8; 3],
    /// Copy of `color` frozen right after shading; the blur pass reads this
    /// so its result is independent of texel visit order.
    pub frozen: [u8; 3],
    /// Arena index of the face whose footprint covers this texel; `None`
    /// outside every footprint.
    pub owner: Option<u32>,
}

impl Texel {
    /// Adds a 0..1 RGB contribution, clamping each channel to the byte range.
    /// Shading calls this once per texel write, so a single over-bright light
    /// saturates instead of wrapping.
    #[inline]
    pub fn add_clamped(&mut self, rgb: Vec3) {
        self.color[0] = (self.color[0] as i32 + (rgb.x * 255.0) as i32).clamp(0, 255) as u8;
        self.color[1] = (self.color[1] as i32 + (rgb.y * 255.0) as i32).clamp(0, 255) as u8;
        self.color[2] = (self.color[2] as i32 + (rgb.z * 255.0) as i32).clamp(0, 255) as u8;
    }
}

/// Per-texel world-space sample, only allocated when a GPU-assisted bake is
/// requested.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TexelLoc {
    pub world_pos: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
}

/// A fixed-size square atlas: texel buffer plus the partition tree placing
/// face rectangles into it.
pub struct Lightmap {
    size: i32,
    texels: Vec<Texel>,
    locations: Option<Vec<TexelLoc>>,
    root: RectNode,
}

impl Lightmap {
    pub fn new(size: u32, with_locations: bool) -> Lightmap {
        let size = size as i32;
        let count = (size * size) as usize;
        Lightmap {
            size,
            texels: vec![Texel::default(); count],
            locations: with_locations.then(|| vec![TexelLoc::default(); count]),
            root: RectNode::new(Rect::new(0, 0, size, size)),
        }
    }

    #[inline]
    pub fn size(&self) -> i32 {
        self.size
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.size && y >= 0 && y < self.size
    }

    #[inline]
    fn idx(&self, x: i32, y: i32) -> usize {
        (y * self.size + x) as usize
    }

    #[inline]
    pub fn texel(&self, x: i32, y: i32) -> &Texel {
        &self.texels[self.idx(x, y)]
    }

    #[inline]
    pub fn texel_mut(&mut self, x: i32, y: i32) -> &mut Texel {
        let i = self.idx(x, y);
        &mut self.texels[i]
    }

    #[inline]
    pub fn location_mut(&mut self, x: i32, y: i32) -> Option<&mut TexelLoc> {
        let i = self.idx(x, y);
        self.locations.as_mut().map(|locs| &mut locs[i])
    }

    #[inline]
    pub fn has_locations(&self) -> bool {
        self.locations.is_some()
    }

    /// Places a rectangle through the partition tree.
    pub fn insert_rect(&mut self, w: i32, h: i32) -> Option<Rect> {
        self.root.insert(w, h)
    }

    /// Captures the post-shading colors for the blur pass.
    pub fn freeze(&mut self) {
        for t in &mut self.texels {
            t.frozen = t.color;
        }
    }

    /// Average color of the up-to-8 neighbors owned by some face. `None`
    /// when no owned neighbor exists.
    fn average_owned_neighbors(&self, x: i32, y: i32) -> Option<[u8; 3]> {
        let mut sum = Vec3::ZERO;
        let mut count = 0u32;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (nx, ny) = (x + dx, y + dy);
                if !self.contains(nx, ny) {
                    continue;
                }
                let t = self.texel(nx, ny);
                if t.owner.is_some() {
                    sum += Vec3::new(t.color[0] as f32, t.color[1] as f32, t.color[2] as f32);
                    count += 1;
                }
            }
        }
        (count > 0).then(|| {
            let avg = sum / count as f32;
            [avg.x as u8, avg.y as u8, avg.z as u8]
        })
    }

    /// Dilation pass against texture bleeding: every texel outside all face
    /// footprints takes the average of its owned neighbors. Owned texels are
    /// untouched, so running this repeatedly is stable.
    pub fn reduce_bleeding(&mut self) {
        for y in 0..self.size {
            for x in 0..self.size {
                if self.texel(x, y).owner.is_none() {
                    let avg = self.average_owned_neighbors(x, y).unwrap_or([0, 0, 0]);
                    self.texel_mut(x, y).color = avg;
                }
            }
        }
    }

    /// Composes the final pixel bytes: `clamp(ambient + color)` per channel,
    /// 3 or 4 bytes per pixel. The alpha byte, when requested, is always 255.
    pub fn compose(&self, ambient: [u8; 3], with_alpha: bool) -> Vec<u8> {
        let stride = if with_alpha { 4 } else { 3 };
        let mut out = Vec::with_capacity(self.texels.len() * stride);
        for t in &self.texels {
            for c in 0..3 {
                out.push((ambient[c] as i32 + t.color[c] as i32).clamp(0, 255) as u8);
            }
            if with_alpha {
                out.push(255);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packer_rects_never_overlap() {
        let mut root = RectNode::new(Rect::new(0, 0, 64, 64));
        let sizes = [
            (30, 20),
            (30, 20),
            (10, 50),
            (64, 10),
            (20, 20),
            (5, 5),
            (33, 12),
        ];
        let mut placed = Vec::new();
        for (w, h) in sizes {
            if let Some(r) = root.insert(w, h) {
                assert_eq!((r.w, r.h), (w, h));
                assert!(r.x >= 0 && r.y >= 0 && r.x + r.w <= 64 && r.y + r.h <= 64);
                placed.push(r);
            }
        }
        assert!(placed.len() >= 5, "packer should fit most of the set");
        for i in 0..placed.len() {
            for j in i + 1..placed.len() {
                assert!(!placed[i].intersects(&placed[j]), "{:?} vs {:?}", placed[i], placed[j]);
            }
        }
    }

    #[test]
    fn packer_exact_fit_and_exhaustion() {
        let mut root = RectNode::new(Rect::new(0, 0, 16, 16));
        assert_eq!(root.insert(16, 16), Some(Rect::new(0, 0, 16, 16)));
        assert_eq!(root.insert(1, 1), None);
    }

    #[test]
    fn packer_rejects_oversized() {
        let mut root = RectNode::new(Rect::new(0, 0, 8, 8));
        assert_eq!(root.insert(9, 2), None);
        assert_eq!(root.insert(0, 4), None);
        assert!(root.insert(8, 4).is_some());
    }

    #[test]
    fn bleeding_is_idempotent() {
        let mut map = Lightmap::new(8, false);
        // A 2x2 owned block in the middle with distinct colors.
        for (i, (x, y)) in [(3, 3), (4, 3), (3, 4), (4, 4)].iter().enumerate() {
            let t = map.texel_mut(*x, *y);
            t.owner = Some(0);
            t.color = [(40 * (i + 1)) as u8, 10, 200];
        }
        map.reduce_bleeding();
        let first: Vec<Texel> = (0..8)
            .flat_map(|y| (0..8).map(move |x| (x, y)))
            .map(|(x, y)| *map.texel(x, y))
            .collect();
        map.reduce_bleeding();
        let second: Vec<Texel> = (0..8)
            .flat_map(|y| (0..8).map(move |x| (x, y)))
            .map(|(x, y)| *map.texel(x, y))
            .collect();
        assert_eq!(first, second);
        // Border texel adjacent to the block picked up light.
        assert_ne!(map.texel(2, 3).color, [0, 0, 0]);
        assert!(map.texel(2, 3).owner.is_none());
        // Far corner has no owned neighbor and stays black.
        assert_eq!(map.texel(0, 7).color, [0, 0, 0]);
    }

    #[test]
    fn compose_clamps_and_forces_alpha() {
        let mut map = Lightmap::new(2, false);
        map.texel_mut(0, 0).color = [250, 0, 100];
        let rgb = map.compose([20, 20, 20], false);
        assert_eq!(&rgb[0..3], &[255, 20, 120]);
        let rgba = map.compose([0, 0, 0], true);
        assert_eq!(rgba.len(), 2 * 2 * 4);
        assert_eq!(rgba[3], 255);
    }

    #[test]
    fn add_clamped_saturates() {
        let mut t = Texel::default();
        t.add_clamped(Vec3::new(0.5, 2.0, -1.0));
        assert_eq!(t.color, [127, 255, 0]);
        t.add_clamped(Vec3::new(0.7, 0.1, 0.2));
        assert_eq!(t.color, [255, 255, 51]);
    }

    #[test]
    fn location_buffer_only_when_requested() {
        let mut plain = Lightmap::new(4, false);
        assert!(!plain.has_locations());
        assert!(plain.location_mut(1, 1).is_none());

        let mut gpu = Lightmap::new(4, true);
        assert!(gpu.has_locations());
        let loc = gpu.location_mut(1, 1).unwrap();
        loc.world_pos = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(gpu.location_mut(1, 1).unwrap().world_pos, Vec3::new(1.0, 2.0, 3.0));
    }
}
