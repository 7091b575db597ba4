//! Generates terrain meshes for a procedural raster and prints statistics.
//!
//! Run with: `cargo run -p terrain_mesh --example generate_terrain [config.toml]`
//!
//! Without a config file two categories (grass over dirt, sand in the
//! right-hand biome) are meshed with default settings.

use std::collections::HashMap;
use std::path::Path;

use bevy::math::UVec2;
use terrain_mesh::{
  CategoryConfig, IntRect, MeshGenConfig, MeshGenerator, TerrainCell, TerrainRaster, TextureId,
};

const WIDTH: u32 = 1024;
const HEIGHT: u32 = 384;

/// Rolling hills with a cave band; terrain 1 = soil, biome 1 = desert.
fn world() -> TerrainRaster {
  TerrainRaster::from_fn(WIDTH, HEIGHT, |x, y| {
    let fx = x as f32;
    let surface = 180.0 + 40.0 * (fx * 0.013).sin() + 12.0 * (fx * 0.071).cos();
    let cave = ((fx * 0.031).sin() * 18.0 + 90.0 - y as f32).abs() < 6.0;
    let terrain = (y as f32) < surface && !cave;
    let biome = (x > WIDTH * 2 / 3) as u8;
    TerrainCell::new(terrain as u8, biome)
  })
}

fn default_config() -> MeshGenConfig {
  MeshGenConfig {
    chunk_size: 128,
    categories: vec![
      CategoryConfig {
        texture: "grass".into(),
        terrains: vec![1],
        biomes: vec![0],
      },
      CategoryConfig {
        texture: "sand".into(),
        terrains: vec![1],
        biomes: vec![1],
      },
    ],
    ..Default::default()
  }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let config = match std::env::args().nth(1) {
    Some(path) => MeshGenConfig::load(Path::new(&path))?,
    None => default_config(),
  };

  let textures: HashMap<TextureId, UVec2> = config
    .categories
    .iter()
    .map(|c| (TextureId::from(c.texture.as_str()), UVec2::new(256, 256)))
    .collect();

  let raster = world();
  let generator = MeshGenerator::new(config)?;
  let meshes = generator.load_or_generate(&raster, &textures)?;

  let triangles: usize = meshes.iter().map(|m| m.triangle_count()).sum();
  let vertices: usize = meshes.iter().map(|m| m.vertices().len()).sum();
  println!("{} meshes, {} triangles, {} vertices", meshes.len(), triangles, vertices);

  let mut per_texture: HashMap<&str, usize> = HashMap::new();
  for mesh in &meshes {
    *per_texture.entry(mesh.texture().as_str()).or_default() += 1;
  }
  for (texture, count) in per_texture {
    println!("  {:<8} {:>5}", texture, count);
  }

  let grid = generator.build_grid(meshes, UVec2::new(WIDTH, HEIGHT))?;
  let view = IntRect::new(200, 100, 320, 180);
  println!(
    "{}x{} blocks; view {:?} touches {} meshes",
    grid.block_count().x,
    grid.block_count().y,
    view,
    grid.query_region_unique(view).len()
  );

  Ok(())
}
