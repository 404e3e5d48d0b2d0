//! walkmesh generates a 2D navigation mesh from a rectangular area and a set
//! of polygonal obstacles.
//!
//! Obstacles are rasterized into a cell grid, a distance field drives a
//! watershed partition of the walkable cells into regions, region borders
//! become simplified contours, and each contour is decomposed into convex
//! clockwise polygons that tile with shared edges. A downstream path-finder
//! consumes the polygons; this crate does no pathfinding, rendering or I/O.
//!
//! Geometric degeneracies never abort a build: affected contours are logged
//! through the `log` facade and skipped, and the rest of the mesh is
//! returned best-effort.

mod config;
mod contour;
mod distance_field;
mod geometry;
mod grid;
mod polymesh;
mod rasterization;
mod watershed;

pub use config::MeshConfig;
pub use contour::{Contour, ContourPoint, ContourSet};
pub use grid::{Cell, Grid, DIR_OFFSETS_4, DIR_OFFSETS_8, NULL_REGION};

use glam::Vec2;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for walkmesh operations
pub type Result<T> = std::result::Result<T, Error>;

/// A convex, clockwise polygon in world coordinates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polygon {
    pub vertices: Vec<Vec2>,
}

/// Counters describing one build, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuildStats {
    /// Regions the watershed produced
    pub regions: usize,
    /// Contours extracted from region borders
    pub contours: usize,
    /// Island cells discarded during contour flagging
    pub discarded_islands: usize,
    /// Contours dropped on triangulation failure
    pub failed_contours: usize,
    /// Convex polygons produced by the decomposition
    pub polygons: usize,
}

/// The generated navigation mesh.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavMesh {
    /// Convex clockwise polygons covering the walkable area
    pub polygons: Vec<Polygon>,
    pub stats: BuildStats,
}

/// Builder running the full generation pipeline.
///
/// The grid and all working buffers are allocated once and reused across
/// [`MeshBuilder::build`] calls. A builder is single-threaded; concurrent
/// builds need separate builders.
#[derive(Debug)]
pub struct MeshBuilder {
    config: MeshConfig,
    grid: Grid,
    rasterizer: rasterization::Rasterizer,
    contours: contour::ContourBuilder,
    polymesh: polymesh::PolyMeshBuilder,
}

impl MeshBuilder {
    /// Creates a builder for the configured area.
    ///
    /// Fails on invalid configuration; nothing else in the pipeline fails.
    pub fn new(config: MeshConfig) -> Result<Self> {
        config.validate()?;
        let grid = Grid::new(&config);
        let contours = contour::ContourBuilder::new(config.simplification_deviation);
        let polymesh = polymesh::PolyMeshBuilder::new(config.max_vertices_per_polygon);
        Ok(Self {
            config,
            grid,
            rasterizer: rasterization::Rasterizer::new(),
            contours,
            polymesh,
        })
    }

    /// Gets a reference to the configuration
    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// Gets a reference to the grid, reflecting the most recent build.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Builds the navigation mesh for the given obstacles.
    ///
    /// Obstacle polygons are world-space point sequences, winding-agnostic.
    /// `padding` dilates every obstacle by that many cells before regions
    /// are formed.
    pub fn build<O, P>(&mut self, obstacles: O, padding: u32) -> NavMesh
    where
        O: IntoIterator<Item = P>,
        P: IntoIterator<Item = Vec2>,
    {
        self.grid.clear();

        for obstacle in obstacles {
            self.rasterizer.rasterize(&mut self.grid, obstacle);
        }

        watershed::build_regions(&mut self.grid, padding);

        let contour_set = self.contours.build(&mut self.grid);
        let (grid_polys, failed_contours) = self.polymesh.build(&contour_set);

        let stats = BuildStats {
            regions: self.grid.region_count as usize,
            contours: contour_set.contours.len(),
            discarded_islands: contour_set.discarded_islands,
            failed_contours,
            polygons: grid_polys.len(),
        };
        log::debug!(
            "mesh build: {} regions, {} contours ({} islands, {} failed), {} polygons",
            stats.regions,
            stats.contours,
            stats.discarded_islands,
            stats.failed_contours,
            stats.polygons
        );

        // Back to world coordinates, stretching y by the isometric ratio
        let ratio = self.config.isometric_ratio;
        let polygons = grid_polys
            .into_iter()
            .filter(|poly| poly.len() >= 3)
            .map(|poly| Polygon {
                vertices: poly
                    .iter()
                    .map(|&[x, y]| {
                        let mut p = self.grid.from_grid(Vec2::new(x as f32, y as f32));
                        p.y *= ratio;
                        p
                    })
                    .collect(),
            })
            .collect();

        NavMesh { polygons, stats }
    }
}
