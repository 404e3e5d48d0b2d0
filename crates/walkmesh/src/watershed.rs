//! Watershed region generation over the distance field.
//!
//! Regions grow from distance-field maxima while a threshold sweeps toward
//! the obstacle dilation fence. Each sweep expands existing regions by one
//! ring, then seeds fresh regions from the connected components of eligible
//! cells the expansion did not reach. Tie-breaks are deterministic so the
//! same input always yields the same partition.

use std::collections::VecDeque;

use crate::grid::{Grid, NULL_REGION};

/// Pending cell assignment: (cell index, region, expansion cost).
type Pending = Vec<(usize, u16, u32)>;

/// Assigns a region id to every walkable cell outside the padding fence.
///
/// `padding` dilates obstacles by that many cells; dilated cells keep
/// [`NULL_REGION`] and count as unreachable. Never fails.
pub(crate) fn build_regions(grid: &mut Grid, padding: u32) {
    crate::distance_field::build_distance_field(grid);

    let fence = padding.saturating_mul(2);
    let mut pending = Pending::new();
    let mut flood = VecDeque::new();
    let mut visited = vec![false; grid.cell_count()];

    let mut threshold = grid.max_distance & !1;
    while threshold > fence {
        expand_regions(grid, threshold, &mut pending);
        seed_regions(grid, threshold, true, &mut flood, &mut visited);
        threshold -= 2;
    }

    // Cells between the fence and the last sweep threshold never became
    // eligible; absorb them into the strongest neighboring region
    while assign_leftovers(grid, fence, &mut pending) {}

    // Components with no assigned neighbor at all still need ids; the
    // full flood here may not relinquish, nothing expands after it
    seed_regions(grid, fence + 1, false, &mut flood, &mut visited);
}

/// Grows every region by one cell into eligible unassigned neighbors.
///
/// Assignments are collected first and applied after the scan, so a sweep
/// expands by exactly one ring regardless of scan order. An eligible cell
/// joins the neighbor region with the lowest expansion cost, ties broken by
/// the lowest region id.
fn expand_regions(grid: &mut Grid, threshold: u32, pending: &mut Pending) {
    pending.clear();
    let (w, h) = (grid.width, grid.height);

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let cell = grid.cell(x, y);
            if cell.region != NULL_REGION || cell.distance_to_obstacle < threshold {
                continue;
            }

            let mut best: Option<(u32, u16)> = None;
            for dir in 0..4 {
                let neighbor = grid.neighbor(x, y, dir);
                if neighbor.region == NULL_REGION {
                    continue;
                }
                let cost = neighbor.distance_to_core.saturating_add(2);
                let better = match best {
                    None => true,
                    Some((best_cost, best_region)) => {
                        cost < best_cost || (cost == best_cost && neighbor.region < best_region)
                    }
                };
                if better {
                    best = Some((cost, neighbor.region));
                }
            }

            if let Some((cost, region)) = best {
                pending.push((grid.index(x, y), region, cost));
            }
        }
    }

    for &(idx, region, cost) in pending.iter() {
        let cell = grid.cell_at_mut(idx);
        cell.region = region;
        cell.distance_to_core = cost;
    }
}

/// Seeds fresh regions from eligible unassigned cells by partial flood.
///
/// A flooded cell that touches some other region orthogonally or
/// diagonally is relinquished: it stays unassigned and the next expansion
/// sweep absorbs it, which keeps new seeds out of the watershed fronts of
/// existing regions. Relinquished cells are marked visited so a later seed
/// in the same sweep cannot pick them up again. A seed whose whole flood
/// is relinquished produces no region. With `partial` off the flood keeps
/// every cell of its component.
fn seed_regions(
    grid: &mut Grid,
    threshold: u32,
    partial: bool,
    flood: &mut VecDeque<usize>,
    visited: &mut [bool],
) {
    let (w, h) = (grid.width, grid.height);
    visited.fill(false);

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let cell = grid.cell(x, y);
            if cell.region != NULL_REGION
                || cell.distance_to_obstacle < threshold
                || visited[grid.index(x, y)]
            {
                continue;
            }

            if grid.region_count == u16::MAX {
                log::error!("region id space exhausted; leftover cells will join neighbors");
                return;
            }
            let region = grid.region_count + 1;

            let seed = grid.cell_mut(x, y);
            seed.region = region;
            seed.distance_to_core = 0;

            let mut kept = 0usize;
            flood.clear();
            flood.push_back(grid.index(x, y));
            while let Some(idx) = flood.pop_front() {
                visited[idx] = true;
                let (cx, cy) = (grid.cell_at(idx).x, grid.cell_at(idx).y);

                // Any orthogonal or diagonal contact with another region
                // relinquishes this cell to the expansion sweeps
                if partial && touches_foreign_region(grid, cx, cy, region) {
                    grid.cell_at_mut(idx).region = NULL_REGION;
                    continue;
                }
                kept += 1;

                for dir in 0..4 {
                    let neighbor = grid.neighbor(cx, cy, dir);
                    let nidx = grid.index(neighbor.x, neighbor.y);
                    if neighbor.region != NULL_REGION
                        || neighbor.distance_to_obstacle < threshold
                        || visited[nidx]
                    {
                        continue;
                    }
                    let next = grid.cell_at_mut(nidx);
                    next.region = region;
                    next.distance_to_core = 0;
                    flood.push_back(nidx);
                }
            }

            if kept > 0 {
                grid.region_count = region;
            }
        }
    }
}

/// True when any of the eight cells around (x, y) belongs to a region
/// other than `region`.
fn touches_foreign_region(grid: &Grid, x: i32, y: i32, region: u16) -> bool {
    for dir in 0..4 {
        let neighbor = grid.neighbor(x, y, dir);
        if neighbor.region != NULL_REGION && neighbor.region != region {
            return true;
        }
        let diagonal = grid.neighbor(neighbor.x, neighbor.y, (dir + 1) % 4);
        if diagonal.region != NULL_REGION && diagonal.region != region {
            return true;
        }
    }
    false
}

/// Batched sweep assigning unfenced leftover cells to their strongest
/// neighbor region: the neighbor with the greatest obstacle distance, ties
/// broken by the lowest region id. Returns whether anything changed.
fn assign_leftovers(grid: &mut Grid, fence: u32, pending: &mut Pending) -> bool {
    pending.clear();
    let (w, h) = (grid.width, grid.height);

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let cell = grid.cell(x, y);
            if cell.region != NULL_REGION || cell.distance_to_obstacle <= fence {
                continue;
            }

            let mut best: Option<(u32, u16)> = None;
            for dir in 0..4 {
                let neighbor = grid.neighbor(x, y, dir);
                if neighbor.region == NULL_REGION {
                    continue;
                }
                let strength = neighbor.distance_to_obstacle;
                let better = match best {
                    None => true,
                    Some((best_strength, best_region)) => {
                        strength > best_strength
                            || (strength == best_strength && neighbor.region < best_region)
                    }
                };
                if better {
                    best = Some((strength, neighbor.region));
                }
            }

            if let Some((_, region)) = best {
                pending.push((grid.index(x, y), region, 0));
            }
        }
    }

    for &(idx, region, cost) in pending.iter() {
        let cell = grid.cell_at_mut(idx);
        cell.region = region;
        cell.distance_to_core = cost;
    }

    !pending.is_empty()
}
