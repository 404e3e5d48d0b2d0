//! Contour extraction from the region partition.
//!
//! Region borders are walked cell by cell into raw clockwise contours,
//! simplified down to portal vertices plus obstacle-edge detail, and then
//! run through a cross-region filter that collapses interior vertices shared
//! by three or more regions onto obstacle-anchored neighbors.

use crate::geometry;
use crate::grid::{Grid, DIR_OFFSETS_4, NULL_REGION};

/// Hard cap on edge-walk steps, guards pathological input.
const MAX_WALK_STEPS: usize = 65_535;

/// Hard cap on cross-region filter sweeps.
const MAX_FILTER_SWEEPS: usize = 64;

/// Corner emitted when facing direction d, relative to the cell origin.
const LEFT_CORNER_DELTAS: [(i32, i32); 4] = [(0, 1), (1, 1), (1, 0), (0, 0)];

/// A contour vertex at cell-corner granularity.
///
/// `region` is the id of the region on the outward side of the edge leaving
/// this vertex, or [`NULL_REGION`] when that edge borders an obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContourPoint {
    pub x: i32,
    pub y: i32,
    pub region: u16,
}

/// Clockwise border of one region in grid space.
#[derive(Debug, Clone)]
pub struct Contour {
    /// The region this contour belongs to
    pub region: u16,
    pub points: Vec<ContourPoint>,
}

/// All contours extracted from a grid.
#[derive(Debug, Default)]
pub struct ContourSet {
    pub contours: Vec<Contour>,
    /// Island cells dropped during boundary flagging
    pub discarded_islands: usize,
}

/// Contour builder with reusable working buffers.
#[derive(Debug)]
pub(crate) struct ContourBuilder {
    deviation_sq: f32,
    raw: Vec<ContourPoint>,
    simplified: Vec<ContourPoint>,
    raw_indices: Vec<usize>,
}

impl ContourBuilder {
    pub fn new(deviation: f32) -> Self {
        Self {
            deviation_sq: deviation * deviation,
            raw: Vec::new(),
            simplified: Vec::new(),
            raw_indices: Vec::new(),
        }
    }

    /// Extracts one simplified contour per region border loop.
    pub fn build(&mut self, grid: &mut Grid) -> ContourSet {
        let mut set = ContourSet {
            contours: Vec::new(),
            discarded_islands: flag_boundaries(grid),
        };

        for y in 1..grid.height - 1 {
            for x in 1..grid.width - 1 {
                let cell = grid.cell(x, y);
                if cell.contour_flags == 0 {
                    continue;
                }
                let region = cell.region;
                let dir = cell.contour_flags.trailing_zeros() as usize;

                self.walk(grid, x, y, dir);
                self.simplify();
                set.contours.push(Contour {
                    region,
                    points: self.simplified.clone(),
                });
            }
        }

        filter_shared_vertices(&mut set.contours);
        for contour in &mut set.contours {
            remove_duplicate_points(&mut contour.points);
        }

        let produced = set.contours.len();
        if produced + set.discarded_islands != grid.region_count as usize {
            log::warn!(
                "contour count mismatch: {} contours + {} islands for {} regions",
                produced,
                set.discarded_islands,
                grid.region_count
            );
        }

        set
    }

    /// Walks one border loop, clearing flags as it goes.
    fn walk(&mut self, grid: &mut Grid, start_x: i32, start_y: i32, start_dir: usize) {
        self.raw.clear();

        let (mut x, mut y, mut dir) = (start_x, start_y, start_dir);
        let mut steps = 0;
        loop {
            if grid.cell(x, y).contour_flags & (1 << dir) != 0 {
                let (cx, cy) = LEFT_CORNER_DELTAS[dir];
                let (dx, dy) = DIR_OFFSETS_4[dir];
                let region = grid.cell(x + dx, y + dy).region;
                self.raw.push(ContourPoint {
                    x: x + cx,
                    y: y + cy,
                    region,
                });
                grid.cell_mut(x, y).contour_flags &= !(1 << dir);
                dir = (dir + 1) % 4;
            } else {
                let (dx, dy) = DIR_OFFSETS_4[dir];
                x += dx;
                y += dy;
                dir = (dir + 3) % 4;
            }

            if (x, y, dir) == (start_x, start_y, start_dir) {
                break;
            }
            steps += 1;
            if steps >= MAX_WALK_STEPS {
                log::warn!("contour walk exceeded {MAX_WALK_STEPS} steps, truncating");
                break;
            }
        }

        // The walk records the region of the edge arriving at each corner;
        // rotate by one so every point carries its leaving edge instead
        if let Some(&first) = self.raw.first() {
            let n = self.raw.len();
            for i in 0..n - 1 {
                self.raw[i].region = self.raw[i + 1].region;
            }
            self.raw[n - 1].region = first.region;
        }
    }

    /// Reduces the raw contour to portal vertices plus obstacle-edge detail.
    fn simplify(&mut self) {
        self.simplified.clear();
        self.raw_indices.clear();
        let n = self.raw.len();
        if n == 0 {
            return;
        }

        let has_portal = self.raw.iter().any(|p| p.region != NULL_REGION);
        if has_portal {
            // Keep every vertex whose entering and leaving edges face
            // different regions
            for i in 0..n {
                let prev = self.raw[(i + n - 1) % n];
                if prev.region != self.raw[i].region {
                    self.simplified.push(self.raw[i]);
                    self.raw_indices.push(i);
                }
            }
        }

        if self.simplified.is_empty() {
            // Surrounded by a single region (usually the obstacle): seed
            // with the lexicographically extreme vertices
            let mut lower_left = 0;
            let mut upper_right = 0;
            for (i, p) in self.raw.iter().enumerate() {
                if (p.x, p.y) < (self.raw[lower_left].x, self.raw[lower_left].y) {
                    lower_left = i;
                }
                if (p.x, p.y) > (self.raw[upper_right].x, self.raw[upper_right].y) {
                    upper_right = i;
                }
            }
            self.simplified.push(self.raw[lower_left]);
            self.raw_indices.push(lower_left);
            if upper_right != lower_left {
                self.simplified.push(self.raw[upper_right]);
                self.raw_indices.push(upper_right);
            }
        }

        // Obstacle-edge refinement: re-insert raw vertices that deviate too
        // far from the simplified edge covering them
        let mut i = 0;
        while i < self.simplified.len() {
            let next = (i + 1) % self.simplified.len();
            let ai = self.raw_indices[i];
            let bi = self.raw_indices[next];

            if self.raw[(ai + 1) % n].region != NULL_REGION {
                i += 1;
                continue;
            }

            let a = [self.simplified[i].x, self.simplified[i].y];
            let b = [self.simplified[next].x, self.simplified[next].y];
            let mut max_dev = self.deviation_sq;
            let mut farthest = None;
            let mut k = (ai + 1) % n;
            while k != bi {
                let dev = geometry::point_segment_dist_sq([self.raw[k].x, self.raw[k].y], a, b);
                if dev > max_dev {
                    max_dev = dev;
                    farthest = Some(k);
                }
                k = (k + 1) % n;
            }

            match farthest {
                Some(k) => {
                    self.simplified.insert(i + 1, self.raw[k]);
                    self.raw_indices.insert(i + 1, k);
                }
                None => i += 1,
            }
        }
    }
}

/// Sets the contour flag bits on every region cell and drops islands.
///
/// Returns the number of discarded island cells.
fn flag_boundaries(grid: &mut Grid) -> usize {
    let mut islands = 0;
    for y in 1..grid.height - 1 {
        for x in 1..grid.width - 1 {
            let region = grid.cell(x, y).region;
            if region == NULL_REGION {
                continue;
            }

            let mut flags = 0u8;
            for dir in 0..4 {
                if grid.neighbor(x, y, dir).region != region {
                    flags |= 1 << dir;
                }
            }
            if flags == 0b1111 {
                log::debug!("discarding island cell at ({x}, {y}), region {region}");
                islands += 1;
                flags = 0;
            }
            grid.cell_mut(x, y).contour_flags = flags;
        }
    }
    islands
}

/// Collapses interior vertices shared by three or more regions.
///
/// A qualifying vertex is snapped onto the obstacle-anchored endpoint of its
/// shortest incident portal edge; vertices with no such endpoint yet are
/// postponed to a later sweep. Runs to a fixed point.
fn filter_shared_vertices(contours: &mut [Contour]) {
    let max_region = contours.iter().map(|c| c.region).max().unwrap_or(0);
    let mut by_region: Vec<Option<usize>> = vec![None; max_region as usize + 1];
    for (i, contour) in contours.iter().enumerate() {
        let slot = &mut by_region[contour.region as usize];
        if slot.is_none() {
            *slot = Some(i);
        }
    }

    let mut sweeps = 0;
    loop {
        let mut changed = false;
        for ci in 0..contours.len() {
            let mut vi = 0;
            while vi < contours[ci].points.len() {
                let n = contours[ci].points.len();
                if n < 2 {
                    break;
                }
                let point = contours[ci].points[vi];
                let prev = contours[ci].points[(vi + n - 1) % n];
                if point.region != NULL_REGION
                    && prev.region != NULL_REGION
                    && collapse_shared_vertex(contours, &by_region, ci, vi)
                {
                    changed = true;
                } else {
                    vi += 1;
                }
            }
        }

        if !changed {
            break;
        }
        sweeps += 1;
        if sweeps >= MAX_FILTER_SWEEPS {
            log::warn!("cross-region vertex filter hit the {MAX_FILTER_SWEEPS}-sweep cap");
            break;
        }
    }
}

/// Collapses the shared vertex at `contours[ci].points[vi]` if possible.
fn collapse_shared_vertex(
    contours: &mut [Contour],
    by_region: &[Option<usize>],
    ci: usize,
    vi: usize,
) -> bool {
    let home = contours[ci].region;
    let vx = contours[ci].points[vi].x;
    let vy = contours[ci].points[vi].y;

    // Walk the cycle of contours meeting at this vertex
    let mut cycle = vec![(ci, vi)];
    let mut region = contours[ci].points[vi].region;
    loop {
        if region == home {
            break;
        }
        if region == NULL_REGION {
            log::debug!("vertex cycle at ({vx}, {vy}) reached the obstacle region");
            return false;
        }
        let Some(cj) = by_region.get(region as usize).copied().flatten() else {
            log::warn!("no contour for region {region} while cycling ({vx}, {vy})");
            return false;
        };
        if cycle.iter().any(|&(c, _)| c == cj) {
            log::debug!("vertex cycle at ({vx}, {vy}) revisited a contour");
            return false;
        }
        let Some(vj) = contours[cj]
            .points
            .iter()
            .position(|p| p.x == vx && p.y == vy)
        else {
            log::warn!("region {region} contour is missing vertex ({vx}, {vy})");
            return false;
        };
        cycle.push((cj, vj));
        region = contours[cj].points[vj].region;
    }

    if cycle.len() < 3 {
        log::debug!("vertex ({vx}, {vy}) is shared by fewer than 3 contours");
        return false;
    }

    // Shortest incident edge whose far endpoint sits on the obstacle border
    let mut best: Option<(i64, usize)> = None;
    for (slot, &(cj, vj)) in cycle.iter().enumerate() {
        let points = &contours[cj].points;
        let n = points.len();
        let prev = points[(vj + n - 1) % n];
        let prev2 = points[(vj + n - 2) % n];
        if prev2.region != NULL_REGION {
            continue;
        }
        let len = geometry::dist_sq([prev.x, prev.y], [vx, vy]);
        if best.map_or(true, |(best_len, _)| len < best_len) {
            best = Some((len, slot));
        }
    }
    // No obstacle-anchored endpoint yet; a later sweep will handle it
    let Some((_, chosen)) = best else { return false };

    let (cs, vs) = cycle[chosen];
    let ns = contours[cs].points.len();
    let anchor = contours[cs].points[(vs + ns - 1) % ns];
    let (ax, ay) = (anchor.x, anchor.y);

    for &(cj, vj) in &cycle {
        let points = &mut contours[cj].points;
        let n = points.len();
        if cj == cs {
            // The anchor precedes the vertex here; it takes over the
            // outgoing edge before the vertex goes away
            let region = points[vj].region;
            points[(vj + n - 1) % n].region = region;
            points.remove(vj);
        } else if points[(vj + 1) % n].x == ax && points[(vj + 1) % n].y == ay {
            // Opposite side of the collapsed edge
            points.remove(vj);
        } else {
            points[vj].x = ax;
            points[vj].y = ay;
            points[vj].region = NULL_REGION;
        }
    }

    true
}

/// Drops consecutive points with identical coordinates, wrap-around
/// included. The later point of each pair keeps the live leaving edge.
fn remove_duplicate_points(points: &mut Vec<ContourPoint>) {
    let mut i = 0;
    while points.len() >= 2 && i < points.len() {
        let j = (i + 1) % points.len();
        if points[i].x == points[j].x && points[i].y == points[j].y {
            points.remove(i);
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeshConfig;

    fn grid_with_regions(region_count: u16, assign: impl Fn(i32, i32) -> u16) -> Grid {
        let mut grid = Grid::new(&MeshConfig::new(0.0, 0.0, 100.0, 100.0, 10.0));
        for y in 1..grid.height - 1 {
            for x in 1..grid.width - 1 {
                let region = assign(x, y);
                let cell = grid.cell_mut(x, y);
                cell.region = region;
                if region == NULL_REGION {
                    cell.distance_to_obstacle = 0;
                } else {
                    cell.distance_to_obstacle = 2;
                }
            }
        }
        grid.region_count = region_count;
        grid
    }

    fn shoelace2(points: &[ContourPoint]) -> i64 {
        let mut sum = 0i64;
        for i in 0..points.len() {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            sum += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
        }
        sum
    }

    #[test]
    fn test_single_region_contour() {
        let mut grid = grid_with_regions(1, |_, _| 1);
        let mut builder = ContourBuilder::new(1.0);
        let set = builder.build(&mut grid);

        assert_eq!(set.contours.len(), 1);
        assert_eq!(set.discarded_islands, 0);

        let contour = &set.contours[0];
        assert_eq!(contour.region, 1);
        let coords: Vec<(i32, i32)> = contour.points.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(coords.len(), 4);
        for corner in [(1, 1), (11, 1), (11, 11), (1, 11)] {
            assert!(coords.contains(&corner), "missing corner {corner:?}");
        }
        // Clockwise under y-down means negative doubled area
        assert!(shoelace2(&contour.points) < 0);
    }

    #[test]
    fn test_two_regions_share_a_portal() {
        // Region 1 on columns 1..=5, region 2 on columns 6..=10
        let mut grid = grid_with_regions(2, |x, _| if x <= 5 { 1 } else { 2 });
        let mut builder = ContourBuilder::new(1.0);
        let set = builder.build(&mut grid);

        assert_eq!(set.contours.len(), 2);
        let left = set.contours.iter().find(|c| c.region == 1).unwrap();
        let right = set.contours.iter().find(|c| c.region == 2).unwrap();

        let left_coords: Vec<(i32, i32)> = left.points.iter().map(|p| (p.x, p.y)).collect();
        let right_coords: Vec<(i32, i32)> = right.points.iter().map(|p| (p.x, p.y)).collect();
        // Both contours carry the portal endpoints at x = 6
        for portal in [(6, 1), (6, 11)] {
            assert!(left_coords.contains(&portal));
            assert!(right_coords.contains(&portal));
        }
        assert!(shoelace2(&left.points) < 0);
        assert!(shoelace2(&right.points) < 0);

        // The portal edge leaving (6, 11) toward (6, 1) faces region 2
        let portal_point = left.points.iter().find(|p| (p.x, p.y) == (6, 11)).unwrap();
        assert_eq!(portal_point.region, 2);
    }

    #[test]
    fn test_island_cell_is_discarded() {
        // A lone cell of region 2 in the middle of region 1
        let mut grid = grid_with_regions(2, |x, y| if (x, y) == (5, 5) { 2 } else { 1 });
        let mut builder = ContourBuilder::new(1.0);
        let set = builder.build(&mut grid);

        assert_eq!(set.discarded_islands, 1);
        assert!(set.contours.iter().all(|c| c.region != 2));
    }

    #[test]
    fn test_three_region_junction_is_collapsed() {
        // Region 1 spans the top half; regions 2 and 3 split the bottom,
        // so the corner (6, 6) is shared by all three contours
        let mut grid = grid_with_regions(3, |x, y| {
            if y <= 5 {
                1
            } else if x <= 5 {
                2
            } else {
                3
            }
        });
        let mut builder = ContourBuilder::new(1.0);
        let set = builder.build(&mut grid);

        assert_eq!(set.contours.len(), 3);
        for contour in &set.contours {
            assert!(
                contour.points.iter().all(|p| (p.x, p.y) != (6, 6)),
                "junction vertex survived in region {}",
                contour.region
            );
            assert!(contour.points.len() >= 3);
            assert!(shoelace2(&contour.points) < 0);
        }
    }

    #[test]
    fn test_remove_duplicate_points() {
        let p = |x, y, region| ContourPoint { x, y, region };
        let mut points = vec![p(0, 0, 1), p(0, 0, 2), p(4, 0, 0), p(4, 4, 0), p(0, 0, 3)];
        remove_duplicate_points(&mut points);
        let coords: Vec<(i32, i32)> = points.iter().map(|q| (q.x, q.y)).collect();
        assert_eq!(coords, vec![(0, 0), (4, 0), (4, 4)]);
        // The later of the leading pair survived
        assert_eq!(points[0].region, 2);
    }
}
