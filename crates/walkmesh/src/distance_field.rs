//! Chamfer distance transform over the walkable cells.
//!
//! Two raster-order passes with integer weights (orthogonal step 2,
//! diagonal step 3) leave every walkable cell holding roughly twice its
//! Chebyshev distance to the nearest obstacle cell. Obstacle cells stay 0.

use crate::grid::Grid;

/// Computes the distance field and records the maximum on the grid.
pub(crate) fn build_distance_field(grid: &mut Grid) {
    let (w, h) = (grid.width, grid.height);

    // Forward pass relaxes against the four already-visited neighbors:
    // west, north-west, north, north-east
    for y in 0..h {
        for x in 0..w {
            if grid.cell(x, y).is_obstacle() {
                continue;
            }
            let mut d = grid.cell(x, y).distance_to_obstacle;
            d = d.min(grid.cell(x - 1, y).distance_to_obstacle.saturating_add(2));
            d = d.min(
                grid.cell(x - 1, y - 1)
                    .distance_to_obstacle
                    .saturating_add(3),
            );
            d = d.min(grid.cell(x, y - 1).distance_to_obstacle.saturating_add(2));
            d = d.min(
                grid.cell(x + 1, y - 1)
                    .distance_to_obstacle
                    .saturating_add(3),
            );
            grid.cell_mut(x, y).distance_to_obstacle = d;
        }
    }

    // Backward pass covers the remaining four directions
    let mut max_distance = 0;
    for y in (0..h).rev() {
        for x in (0..w).rev() {
            if grid.cell(x, y).is_obstacle() {
                continue;
            }
            let mut d = grid.cell(x, y).distance_to_obstacle;
            d = d.min(grid.cell(x + 1, y).distance_to_obstacle.saturating_add(2));
            d = d.min(
                grid.cell(x + 1, y + 1)
                    .distance_to_obstacle
                    .saturating_add(3),
            );
            d = d.min(grid.cell(x, y + 1).distance_to_obstacle.saturating_add(2));
            d = d.min(
                grid.cell(x - 1, y + 1)
                    .distance_to_obstacle
                    .saturating_add(3),
            );
            grid.cell_mut(x, y).distance_to_obstacle = d;
            max_distance = max_distance.max(d);
        }
    }

    grid.max_distance = max_distance;
}
