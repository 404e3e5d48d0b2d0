//! Convex polygon generation from simplified contours.
//!
//! Each contour is ear-clipped into triangles, then neighboring triangles
//! are greedily merged along their longest shared edge while the result
//! stays convex and within the vertex cap.

use crate::contour::ContourSet;
use crate::geometry::{self, left, left_on};

/// Grid-space polygon produced by the decomposition.
pub(crate) type GridPolygon = Vec<[i32; 2]>;

/// Convex decomposition with reusable working buffers.
#[derive(Debug)]
pub(crate) struct PolyMeshBuilder {
    max_vertices: usize,
    verts: Vec<[i32; 2]>,
    live: Vec<usize>,
    ears: Vec<bool>,
    polys: Vec<GridPolygon>,
}

impl PolyMeshBuilder {
    pub fn new(max_vertices: usize) -> Self {
        Self {
            max_vertices,
            verts: Vec::new(),
            live: Vec::new(),
            ears: Vec::new(),
            polys: Vec::new(),
        }
    }

    /// Decomposes every contour; returns the polygons and the number of
    /// contours dropped on triangulation failure.
    pub fn build(&mut self, set: &ContourSet) -> (Vec<GridPolygon>, usize) {
        let mut out = Vec::new();
        let mut failed = 0;

        for contour in &set.contours {
            if contour.points.len() < 3 {
                log::debug!(
                    "dropping degenerate contour of region {} ({} vertices)",
                    contour.region,
                    contour.points.len()
                );
                continue;
            }

            self.verts.clear();
            self.verts
                .extend(contour.points.iter().map(|p| [p.x, p.y]));

            if !self.triangulate() {
                log::warn!("triangulation failed for region {}", contour.region);
                failed += 1;
                continue;
            }
            self.merge();
            out.append(&mut self.polys);
        }

        (out, failed)
    }

    /// Ear-clips the clockwise polygon in `verts` into `polys`.
    fn triangulate(&mut self) -> bool {
        let n = self.verts.len();
        self.polys.clear();
        self.live.clear();
        self.live.extend(0..n);
        self.ears.clear();
        self.ears.resize(n, false);
        for m in 0..n {
            self.ears[m] = self.is_ear(m);
        }

        while self.live.len() > 3 {
            let n = self.live.len();
            let mut best: Option<(i64, usize)> = None;
            for m in 0..n {
                if !self.ears[m] {
                    continue;
                }
                let a = self.verts[self.live[(m + n - 1) % n]];
                let b = self.verts[self.live[(m + 1) % n]];
                let len = geometry::dist_sq(a, b);
                if best.map_or(true, |(best_len, _)| len < best_len) {
                    best = Some((len, m));
                }
            }
            let Some((_, m)) = best else {
                // No ear left; the contour is degenerate or reversed
                self.polys.clear();
                return false;
            };

            let prev = self.live[(m + n - 1) % n];
            let next = self.live[(m + 1) % n];
            self.polys
                .push(vec![self.verts[prev], self.verts[self.live[m]], self.verts[next]]);

            self.live.remove(m);
            self.ears.remove(m);
            let n = self.live.len();
            let prev_pos = (m + n - 1) % n;
            let next_pos = m % n;
            self.ears[prev_pos] = self.is_ear(prev_pos);
            self.ears[next_pos] = self.is_ear(next_pos);
        }

        self.polys.push(vec![
            self.verts[self.live[0]],
            self.verts[self.live[1]],
            self.verts[self.live[2]],
        ]);
        true
    }

    /// An ear is a vertex whose clipping diagonal stays inside the polygon.
    fn is_ear(&self, m: usize) -> bool {
        let n = self.live.len();
        self.diagonal((m + n - 1) % n, (m + 1) % n)
    }

    /// True when the segment between live positions i and j is a diagonal:
    /// inside the internal angle at i and crossing no polygon edge.
    fn diagonal(&self, i: usize, j: usize) -> bool {
        self.in_cone(i, j) && !self.crosses(i, j)
    }

    fn in_cone(&self, i: usize, j: usize) -> bool {
        let n = self.live.len();
        let a = self.verts[self.live[i]];
        let b = self.verts[self.live[j]];
        let a_prev = self.verts[self.live[(i + n - 1) % n]];
        let a_next = self.verts[self.live[(i + 1) % n]];

        // Convex corner at a: b must sit strictly between both edges
        if left_on(a_prev, a, a_next) {
            left(a, b, a_prev) && left(b, a, a_next)
        } else {
            // Reflex corner: anything outside the inverted cone
            !(left_on(a, b, a_next) && left_on(b, a, a_prev))
        }
    }

    fn crosses(&self, i: usize, j: usize) -> bool {
        let n = self.live.len();
        let d0 = self.verts[self.live[i]];
        let d1 = self.verts[self.live[j]];

        for k in 0..n {
            let k1 = (k + 1) % n;
            if k == i || k1 == i || k == j || k1 == j {
                continue;
            }
            let p0 = self.verts[self.live[k]];
            let p1 = self.verts[self.live[k1]];
            if d0 == p0 || d1 == p0 || d0 == p1 || d1 == p1 {
                continue;
            }
            if geometry::intersect(d0, d1, p0, p1) {
                return true;
            }
        }
        false
    }

    /// Greedily merges polygon pairs along their longest shared edge.
    fn merge(&mut self) {
        if self.max_vertices <= 3 {
            return;
        }
        loop {
            let mut best: Option<(i64, usize, usize, usize, usize)> = None;
            for a in 0..self.polys.len() {
                for b in a + 1..self.polys.len() {
                    if let Some((ea, eb, len)) =
                        merge_value(&self.polys[a], &self.polys[b], self.max_vertices)
                    {
                        if best.map_or(true, |(best_len, ..)| len > best_len) {
                            best = Some((len, a, b, ea, eb));
                        }
                    }
                }
            }
            let Some((_, a, b, ea, eb)) = best else { break };

            let merged = merge_polys(&self.polys[a], &self.polys[b], ea, eb);
            self.polys[a] = merged;
            self.polys.remove(b);
        }
    }
}

/// Checks whether polygons a and b can merge: they must share a directed
/// edge, fit the vertex cap, and stay convex at both junctions. Returns the
/// shared edge indices and its squared length.
fn merge_value(pa: &GridPolygon, pb: &GridPolygon, max_vertices: usize) -> Option<(usize, usize, i64)> {
    let (na, nb) = (pa.len(), pb.len());
    if na + nb - 2 > max_vertices {
        return None;
    }

    let mut shared: Option<(usize, usize)> = None;
    for i in 0..na {
        let va = pa[i];
        let vb = pa[(i + 1) % na];
        for j in 0..nb {
            if pb[j] == vb && pb[(j + 1) % nb] == va {
                shared = Some((i, j));
            }
        }
    }
    let (ea, eb) = shared?;

    // Both vertices flanking each shared endpoint must stay a left turn
    let before_a = pa[(ea + na - 1) % na];
    let after_b = pb[(eb + 2) % nb];
    if !left(before_a, pa[ea], after_b) {
        return None;
    }
    let before_b = pb[(eb + nb - 1) % nb];
    let after_a = pa[(ea + 2) % na];
    if !left(before_b, pb[eb], after_a) {
        return None;
    }

    Some((ea, eb, geometry::dist_sq(pa[ea], pa[(ea + 1) % na])))
}

/// Builds the union polygon, walking a from past its shared edge and then b
/// likewise.
fn merge_polys(pa: &GridPolygon, pb: &GridPolygon, ea: usize, eb: usize) -> GridPolygon {
    let (na, nb) = (pa.len(), pb.len());
    let mut merged = Vec::with_capacity(na + nb - 2);
    for i in 0..na - 1 {
        merged.push(pa[(ea + 1 + i) % na]);
    }
    for i in 0..nb - 1 {
        merged.push(pb[(eb + 1 + i) % nb]);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::{Contour, ContourPoint, ContourSet};

    fn contour_from(coords: &[(i32, i32)]) -> ContourSet {
        ContourSet {
            contours: vec![Contour {
                region: 1,
                points: coords
                    .iter()
                    .map(|&(x, y)| ContourPoint { x, y, region: 0 })
                    .collect(),
            }],
            discarded_islands: 0,
        }
    }

    fn shoelace2(poly: &GridPolygon) -> i64 {
        let mut sum = 0i64;
        for i in 0..poly.len() {
            let a = poly[i];
            let b = poly[(i + 1) % poly.len()];
            sum += a[0] as i64 * b[1] as i64 - b[0] as i64 * a[1] as i64;
        }
        sum
    }

    fn assert_convex_cw(poly: &GridPolygon) {
        assert!(poly.len() >= 3);
        assert!(shoelace2(poly) < 0, "not clockwise: {poly:?}");
        let n = poly.len();
        for i in 0..n {
            assert!(
                left_on(poly[i], poly[(i + 1) % n], poly[(i + 2) % n]),
                "reflex corner in {poly:?}"
            );
        }
    }

    #[test]
    fn test_square_merges_to_one_quad() {
        let set = contour_from(&[(0, 0), (0, 4), (4, 4), (4, 0)]);
        let mut builder = PolyMeshBuilder::new(16);
        let (polys, failed) = builder.build(&set);

        assert_eq!(failed, 0);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].len(), 4);
        assert_convex_cw(&polys[0]);
        assert_eq!(shoelace2(&polys[0]), -32);
    }

    #[test]
    fn test_l_shape_decomposes_into_convex_parts() {
        let set = contour_from(&[(0, 0), (0, 4), (4, 4), (4, 2), (2, 2), (2, 0)]);
        let mut builder = PolyMeshBuilder::new(16);
        let (polys, failed) = builder.build(&set);

        assert_eq!(failed, 0);
        // A concave hexagon cannot stay one convex polygon
        assert!(polys.len() >= 2);
        let mut total = 0i64;
        for poly in &polys {
            assert!(poly.len() <= 16);
            assert_convex_cw(poly);
            total += -shoelace2(poly);
        }
        assert_eq!(total, 24);
    }

    #[test]
    fn test_vertex_cap_blocks_merging() {
        let set = contour_from(&[(0, 0), (0, 4), (4, 4), (4, 0)]);
        let mut builder = PolyMeshBuilder::new(3);
        let (polys, failed) = builder.build(&set);

        assert_eq!(failed, 0);
        assert_eq!(polys.len(), 2);
        for poly in &polys {
            assert_eq!(poly.len(), 3);
            assert_convex_cw(poly);
        }
    }

    #[test]
    fn test_degenerate_contour_is_dropped_silently() {
        let set = contour_from(&[(0, 0), (4, 4)]);
        let mut builder = PolyMeshBuilder::new(16);
        let (polys, failed) = builder.build(&set);
        assert!(polys.is_empty());
        assert_eq!(failed, 0);
    }

    #[test]
    fn test_reversed_contour_fails_triangulation() {
        // Counter-clockwise input breaks the clockwise predicates
        let set = contour_from(&[(0, 0), (4, 0), (4, 4), (0, 4)]);
        let mut builder = PolyMeshBuilder::new(16);
        let (polys, failed) = builder.build(&set);
        assert!(polys.is_empty());
        assert_eq!(failed, 1);
    }
}
