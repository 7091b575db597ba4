//! Raster-to-mesh terrain generation.
//!
//! Converts per-pixel terrain classification into textured triangle
//! meshes, one texture category at a time:
//!
//! - [`contour`]: marching squares edges, contour tracing, hole grouping
//! - [`mesh`]: tessellation and 16-bit mesh packing
//! - [`generate`]: the parallel chunked pipeline
//! - [`grid`]: block grid spatial index for region queries
//! - [`cache`]: versioned compressed mesh cache

pub mod cache;
pub mod config;
pub mod contour;
pub mod error;
pub mod generate;
pub mod grid;
pub mod mesh;
pub mod raster;
pub mod rect;

pub use cache::{CACHE_VERSION, CacheError, load_meshes, save_meshes};
pub use config::{CategoryConfig, MeshGenConfig};
pub use error::{ConfigError, GenerateError, TessellateError};
pub use generate::{MeshGenerator, TextureSizes, generate_meshes};
pub use grid::{MeshGrid, build_spatial_index};
pub use mesh::{
  CdtTessellator, EarcutTessellator, MAX_TRIANGLES_PER_MESH, Mesh, MeshDefinition,
  MeshDefinitions, MeshId, MeshVertex, Tessellator, TextureId,
};
pub use raster::{Bitmap, RasterClassifier, TerrainCategory, TerrainCell, TerrainRaster};
pub use rect::IntRect;
