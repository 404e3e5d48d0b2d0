//! CLI utility for 2D navigation mesh generation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec2;

use walkmesh::{MeshBuilder, MeshConfig, NavMesh};

/// A CLI utility for generating 2D navigation meshes from polygonal obstacles
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a navigation mesh from an obstacle file
    Build {
        /// Input obstacle file: a JSON array of polygons, each an array of
        /// [x, y] points in world coordinates
        #[clap(long, value_parser)]
        input: PathBuf,

        /// Output mesh file; stdout when omitted
        #[clap(long, value_parser)]
        output: Option<PathBuf>,

        /// Area bounds as left,top,right,bottom
        #[clap(long, value_parser = parse_bounds)]
        bounds: [f32; 4],

        /// Rasterization cell size in world units
        #[clap(long, default_value = "1.0")]
        cell_size: f32,

        /// Isometric screen-squash ratio
        #[clap(long, default_value = "1.0")]
        isometric_ratio: f32,

        /// Obstacle dilation in cells
        #[clap(long, default_value = "0")]
        padding: u32,

        /// The maximum number of vertices allowed per generated polygon
        #[clap(long, default_value = "16")]
        max_vertices_per_polygon: usize,
    },
}

/// Parse a comma-separated bounds quadruple
fn parse_bounds(s: &str) -> Result<[f32; 4], String> {
    let parts: Vec<&str> = s.split(',').collect();

    if parts.len() != 4 {
        return Err(format!("bounds must have 4 components, got {}", parts.len()));
    }

    let mut bounds = [0.0; 4];
    for (slot, part) in bounds.iter_mut().zip(&parts) {
        *slot = part.trim().parse::<f32>().map_err(|e| e.to_string())?;
    }
    Ok(bounds)
}

fn main() -> Result<()> {
    // Sink for the library's internal diagnostics, RUST_LOG-controlled
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::Build {
            input,
            output,
            bounds,
            cell_size,
            isometric_ratio,
            padding,
            max_vertices_per_polygon,
        } => build_mesh(
            &input,
            output.as_deref(),
            bounds,
            cell_size,
            isometric_ratio,
            padding,
            max_vertices_per_polygon,
        ),
    }
}

fn build_mesh(
    input: &Path,
    output: Option<&Path>,
    bounds: [f32; 4],
    cell_size: f32,
    isometric_ratio: f32,
    padding: u32,
    max_vertices_per_polygon: usize,
) -> Result<()> {
    let obstacles = load_obstacles(input)?;
    eprintln!("loaded {} obstacle polygons from {}", obstacles.len(), input.display());

    let [left, top, right, bottom] = bounds;
    let mut config = MeshConfig::new(left, top, right, bottom, cell_size);
    config.isometric_ratio = isometric_ratio;
    config.max_vertices_per_polygon = max_vertices_per_polygon;

    let mut builder = MeshBuilder::new(config).context("invalid mesh configuration")?;
    let mesh = builder.build(obstacles, padding);
    report(&mesh);

    let json = serde_json::to_string_pretty(&mesh).context("failed to serialize mesh")?;
    match output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }

    Ok(())
}

fn load_obstacles(path: &Path) -> Result<Vec<Vec<Vec2>>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw: Vec<Vec<[f32; 2]>> =
        serde_json::from_str(&text).context("obstacle file is not an array of point arrays")?;

    for (i, polygon) in raw.iter().enumerate() {
        if polygon.len() < 3 {
            bail!("obstacle {} has fewer than 3 points", i);
        }
    }

    Ok(raw
        .into_iter()
        .map(|polygon| polygon.into_iter().map(|[x, y]| Vec2::new(x, y)).collect())
        .collect())
}

/// Mesh JSON may be going to stdout, so reporting stays on stderr.
fn report(mesh: &NavMesh) {
    eprintln!(
        "generated {} polygons from {} regions ({} contours)",
        mesh.stats.polygons,
        mesh.stats.regions,
        mesh.stats.contours
    );
    if mesh.stats.discarded_islands > 0 {
        eprintln!("discarded {} island cells", mesh.stats.discarded_islands);
    }
    if mesh.stats.failed_contours > 0 {
        eprintln!(
            "skipped {} contours that failed triangulation",
            mesh.stats.failed_contours
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bounds() {
        assert_eq!(parse_bounds("0,0,800,600").unwrap(), [0.0, 0.0, 800.0, 600.0]);
        assert_eq!(parse_bounds(" -10, 5, 10, 25 ").unwrap(), [-10.0, 5.0, 10.0, 25.0]);
        assert!(parse_bounds("1,2,3").is_err());
        assert!(parse_bounds("a,b,c,d").is_err());
    }
}
