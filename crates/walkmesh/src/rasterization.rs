//! Conservative scan-line rasterization of obstacle polygons.
//!
//! Obstacles are filled with a horizontal scan-line pass; polygons too thin
//! to cross any row center fall back to a single-pixel variant of the same
//! pass plus its vertical transpose, so any obstacle that straddles at least
//! one cell center marks at least one cell.

use glam::Vec2;

use crate::grid::Grid;

/// Scan-line rasterizer with reusable scratch buffers.
#[derive(Debug, Default)]
pub(crate) struct Rasterizer {
    verts: Vec<Vec2>,
    nodes: Vec<i32>,
}

impl Rasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rasterizes one obstacle polygon, marking covered cells as obstacle.
    ///
    /// Winding-agnostic; silently clips to the grid and never fails.
    pub fn rasterize<P>(&mut self, grid: &mut Grid, polygon: P)
    where
        P: IntoIterator<Item = Vec2>,
    {
        self.verts.clear();
        for p in polygon {
            self.verts.push(grid.to_grid(p));
        }
        if self.verts.len() < 3 {
            return;
        }

        let mut min = self.verts[0];
        let mut max = self.verts[0];
        for v in &self.verts[1..] {
            min = min.min(*v);
            max = max.max(*v);
        }

        let min_x = (min.x.floor() as i32).max(0);
        let max_x = (max.x.floor() as i32).min(grid.width - 1);
        let min_y = (min.y.floor() as i32).max(0);
        let max_y = (max.y.floor() as i32).min(grid.height - 1);
        if min_x > max_x || min_y > max_y {
            return;
        }

        let marked = self.scan_rows(grid, min_x, max_x, min_y, max_y, false);
        if marked == 0 {
            self.scan_rows(grid, min_x, max_x, min_y, max_y, true);
            self.scan_columns(grid, min_x, max_x, min_y, max_y);
        }
    }

    /// Horizontal scan-line pass over row centers.
    ///
    /// In `thin` mode a span that rounds to a single column still marks that
    /// column.
    fn scan_rows(
        &mut self,
        grid: &mut Grid,
        min_x: i32,
        max_x: i32,
        min_y: i32,
        max_y: i32,
        thin: bool,
    ) -> usize {
        let n = self.verts.len();
        let mut marked = 0;

        for y in min_y..=max_y {
            let cy = y as f32 + 0.5;

            self.nodes.clear();
            for i in 0..n {
                let v = self.verts[i];
                let w = self.verts[(i + n - 1) % n];
                // Half-open rule so an edge ending exactly on the row center
                // produces one crossing, not two
                if (v.y <= cy && cy < w.y) || (w.y < cy && cy <= v.y) {
                    let x = v.x + (cy - v.y) / (w.y - v.y) * (w.x - v.x);
                    self.nodes.push(x.round() as i32);
                }
            }
            self.nodes.sort_unstable();

            for pair in self.nodes.chunks_exact(2) {
                let (n0, n1) = (pair[0], pair[1]);
                if thin && n0 == n1 && n0 >= min_x && n0 <= max_x {
                    grid.cell_mut(n0, y).distance_to_obstacle = 0;
                    marked += 1;
                    continue;
                }
                for x in n0.max(min_x)..n1.min(max_x + 1) {
                    grid.cell_mut(x, y).distance_to_obstacle = 0;
                    marked += 1;
                }
            }
        }

        marked
    }

    /// Vertical transpose of [`Rasterizer::scan_rows`], single-row spans
    /// always included.
    fn scan_columns(&mut self, grid: &mut Grid, min_x: i32, max_x: i32, min_y: i32, max_y: i32) {
        let n = self.verts.len();

        for x in min_x..=max_x {
            let cx = x as f32 + 0.5;

            self.nodes.clear();
            for i in 0..n {
                let v = self.verts[i];
                let w = self.verts[(i + n - 1) % n];
                if (v.x <= cx && cx < w.x) || (w.x < cx && cx <= v.x) {
                    let y = v.y + (cx - v.x) / (w.x - v.x) * (w.y - v.y);
                    self.nodes.push(y.round() as i32);
                }
            }
            self.nodes.sort_unstable();

            for pair in self.nodes.chunks_exact(2) {
                let (n0, n1) = (pair[0], pair[1]);
                if n0 == n1 && n0 >= min_y && n0 <= max_y {
                    grid.cell_mut(x, n0).distance_to_obstacle = 0;
                    continue;
                }
                for y in n0.max(min_y)..n1.min(max_y + 1) {
                    grid.cell_mut(x, y).distance_to_obstacle = 0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeshConfig;

    fn test_grid() -> Grid {
        Grid::new(&MeshConfig::new(0.0, 0.0, 100.0, 100.0, 10.0))
    }

    fn square(left: f32, top: f32, right: f32, bottom: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(left, top),
            Vec2::new(right, top),
            Vec2::new(right, bottom),
            Vec2::new(left, bottom),
        ]
    }

    fn obstacle_cells(grid: &Grid) -> Vec<(i32, i32)> {
        let mut cells = Vec::new();
        for y in 1..grid.height - 1 {
            for x in 1..grid.width - 1 {
                if grid.cell(x, y).is_obstacle() {
                    cells.push((x, y));
                }
            }
        }
        cells
    }

    #[test]
    fn test_fills_square() {
        let mut grid = test_grid();
        let mut rasterizer = Rasterizer::new();
        rasterizer.rasterize(&mut grid, square(20.0, 20.0, 60.0, 60.0));

        // World 20..60 maps to grid columns and rows 3..7
        let cells = obstacle_cells(&grid);
        assert_eq!(cells.len(), 16);
        for (x, y) in cells {
            assert!((3..7).contains(&x) && (3..7).contains(&y));
        }
    }

    #[test]
    fn test_winding_agnostic() {
        let mut cw_grid = test_grid();
        let mut ccw_grid = test_grid();
        let mut rasterizer = Rasterizer::new();

        let mut poly = square(20.0, 20.0, 60.0, 60.0);
        rasterizer.rasterize(&mut cw_grid, poly.clone());
        poly.reverse();
        rasterizer.rasterize(&mut ccw_grid, poly);

        assert_eq!(obstacle_cells(&cw_grid), obstacle_cells(&ccw_grid));
    }

    #[test]
    fn test_thin_vertical_polygon_marks_a_strip() {
        let mut grid = test_grid();
        let mut rasterizer = Rasterizer::new();
        rasterizer.rasterize(&mut grid, square(50.0, 20.0, 50.2, 80.0));

        let cells = obstacle_cells(&grid);
        assert!(!cells.is_empty());
        // All marks sit in the column containing x = 50
        for (x, y) in &cells {
            assert_eq!(*x, 6);
            assert!((3..9).contains(y));
        }
    }

    #[test]
    fn test_thin_horizontal_polygon_marks_a_strip() {
        let mut grid = test_grid();
        let mut rasterizer = Rasterizer::new();
        rasterizer.rasterize(&mut grid, square(20.0, 50.0, 80.0, 50.2));

        let cells = obstacle_cells(&grid);
        assert!(!cells.is_empty());
        for (x, y) in &cells {
            assert_eq!(*y, 6);
            assert!((3..9).contains(x));
        }
    }

    #[test]
    fn test_outside_polygon_marks_nothing() {
        let mut grid = test_grid();
        let mut rasterizer = Rasterizer::new();
        rasterizer.rasterize(&mut grid, square(500.0, 500.0, 600.0, 600.0));
        assert!(obstacle_cells(&grid).is_empty());
    }

    #[test]
    fn test_partially_outside_polygon_clips() {
        let mut grid = test_grid();
        let mut rasterizer = Rasterizer::new();
        rasterizer.rasterize(&mut grid, square(80.0, 80.0, 200.0, 200.0));

        let cells = obstacle_cells(&grid);
        assert!(!cells.is_empty());
        for (x, y) in cells {
            assert!(x >= 9 && y >= 9);
        }
    }

    #[test]
    fn test_degenerate_polygon_is_ignored() {
        let mut grid = test_grid();
        let mut rasterizer = Rasterizer::new();
        rasterizer.rasterize(&mut grid, vec![Vec2::new(10.0, 10.0), Vec2::new(50.0, 50.0)]);
        assert!(obstacle_cells(&grid).is_empty());
    }
}
