//! Configuration for the navigation mesh build.

use crate::{Error, Result};

/// Parameters describing the meshed area and the rasterization grid.
///
/// Bounds are world-space with y growing downward, so `top < bottom`.
#[derive(Debug, Clone)]
pub struct MeshConfig {
    /// Left bound of the walkable area
    pub left: f32,
    /// Top bound of the walkable area
    pub top: f32,
    /// Right bound of the walkable area
    pub right: f32,
    /// Bottom bound of the walkable area
    pub bottom: f32,

    /// Horizontal cell size in world units
    pub cell_size: f32,
    /// Screen-squash ratio for isometric 2D; the grid's vertical cell size
    /// is `cell_size / isometric_ratio` and output y is stretched back by it
    pub isometric_ratio: f32,

    /// Maximum number of vertices a merged polygon may have
    pub max_vertices_per_polygon: usize,
    /// Maximum deviation (in cells) a simplified contour edge may have from
    /// the raw cell boundary it replaces
    pub simplification_deviation: f32,
}

impl MeshConfig {
    /// Creates a configuration for the given area with default knobs.
    pub fn new(left: f32, top: f32, right: f32, bottom: f32, cell_size: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            cell_size,
            isometric_ratio: 1.0,
            max_vertices_per_polygon: 16,
            simplification_deviation: 1.0,
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if !(self.left < self.right) || !(self.top < self.bottom) {
            return Err(Error::InvalidConfig(format!(
                "inverted area bounds ({}, {}) -> ({}, {})",
                self.left, self.top, self.right, self.bottom
            )));
        }

        if !(self.cell_size > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "non-positive cell size {}",
                self.cell_size
            )));
        }

        if !(self.isometric_ratio > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "non-positive isometric ratio {}",
                self.isometric_ratio
            )));
        }

        if self.max_vertices_per_polygon < 3 {
            return Err(Error::InvalidConfig(
                "fewer than 3 vertices per polygon".to_string(),
            ));
        }

        if !(self.simplification_deviation >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "negative simplification deviation {}",
                self.simplification_deviation
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MeshConfig::new(0.0, 0.0, 100.0, 100.0, 10.0);
        assert_eq!(config.isometric_ratio, 1.0);
        assert_eq!(config.max_vertices_per_polygon, 16);
        assert_eq!(config.simplification_deviation, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let config = MeshConfig::new(100.0, 0.0, 0.0, 100.0, 10.0);
        assert!(config.validate().is_err());

        let config = MeshConfig::new(0.0, 100.0, 100.0, 0.0, 10.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_cell_size() {
        let config = MeshConfig::new(0.0, 0.0, 100.0, 100.0, 0.0);
        assert!(config.validate().is_err());

        let config = MeshConfig::new(0.0, 0.0, 100.0, 100.0, -1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_ratio_and_cap() {
        let mut config = MeshConfig::new(0.0, 0.0, 100.0, 100.0, 10.0);
        config.isometric_ratio = 0.0;
        assert!(config.validate().is_err());

        let mut config = MeshConfig::new(0.0, 0.0, 100.0, 100.0, 10.0);
        config.max_vertices_per_polygon = 2;
        assert!(config.validate().is_err());
    }
}
