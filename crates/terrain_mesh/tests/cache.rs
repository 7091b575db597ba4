//! E2E tests for the mesh cache.
//!
//! Generates meshes, saves them to a temporary directory, and checks what
//! loading returns for valid, outdated, corrupt and missing files.

use std::collections::HashMap;

use bevy::math::UVec2;
use rand::prelude::*;
use tempfile::TempDir;
use terrain_mesh::cache::{self, CACHE_VERSION, encode_with_version};
use terrain_mesh::{
  MeshDefinition, MeshDefinitions, MeshGenConfig, MeshGenerator, TerrainCategory, TerrainCell,
  TerrainRaster, TextureId, load_meshes, save_meshes,
};

fn textures() -> HashMap<TextureId, UVec2> {
  HashMap::from([
    (TextureId::new("stone"), UVec2::new(128, 128)),
    (TextureId::new("moss"), UVec2::new(64, 64)),
  ])
}

fn categories() -> Vec<TerrainCategory> {
  vec![
    TerrainCategory::new("stone", vec![1], vec![]).unwrap(),
    TerrainCategory::new("moss", vec![2], vec![]).unwrap(),
  ]
}

fn raster(seed: u64) -> TerrainRaster {
  let mut rng = StdRng::seed_from_u64(seed);
  TerrainRaster::from_fn(48, 32, |_, _| TerrainCell::new(rng.gen_range(0..3), 0))
}

fn generator(config: MeshGenConfig) -> MeshGenerator {
  MeshGenerator::new(config).unwrap().with_categories(categories())
}

fn generated() -> Vec<terrain_mesh::Mesh> {
  let config = MeshGenConfig {
    chunk_size: 16,
    max_triangles_per_mesh: 200,
    ..Default::default()
  };
  generator(config).generate_meshes(&raster(5), &textures()).unwrap()
}

#[test]
fn save_then_load_reproduces_meshes() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("nested").join("terrain.tmsh");
  let meshes = generated();
  assert!(!meshes.is_empty());

  save_meshes(&path, &meshes).unwrap();
  let loaded = load_meshes(&path, &MeshDefinitions::new()).expect("cache should load");

  assert_eq!(loaded.len(), meshes.len());
  for (original, restored) in meshes.iter().zip(&loaded) {
    assert_eq!(original.texture(), restored.texture());
    assert_eq!(original.bounds(), restored.bounds());
    assert_eq!(original.id(), restored.id());
    assert_eq!(original.vertices(), restored.vertices());
    assert_eq!(original.indices(), restored.indices());
  }
}

#[test]
fn definitions_are_reattached_on_load() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("terrain.tmsh");
  save_meshes(&path, &generated()).unwrap();

  let definitions: MeshDefinitions = [(
    "moss",
    MeshDefinition {
      wave_amplitude: 0.75,
      ..Default::default()
    },
  )]
  .into_iter()
  .collect();
  let loaded = load_meshes(&path, &definitions).unwrap();

  for mesh in &loaded {
    match mesh.texture().as_str() {
      "moss" => assert_eq!(mesh.definition().map(|d| d.wave_amplitude), Some(0.75)),
      _ => assert!(mesh.definition().is_none()),
    }
  }
}

#[test]
fn other_version_is_a_cache_miss() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("terrain.tmsh");
  let bytes = encode_with_version(&generated(), CACHE_VERSION + 1.0);
  std::fs::write(&path, bytes).unwrap();

  assert!(load_meshes(&path, &MeshDefinitions::new()).is_none());
  let err = cache::try_load_meshes(&path, &MeshDefinitions::new()).unwrap_err();
  assert!(err.is_miss());
}

#[test]
fn missing_file_is_a_cache_miss() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("absent.tmsh");
  assert!(load_meshes(&path, &MeshDefinitions::new()).is_none());
  assert!(cache::try_load_meshes(&path, &MeshDefinitions::new()).unwrap_err().is_miss());
}

#[test]
fn corrupt_file_is_ignored() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("terrain.tmsh");
  save_meshes(&path, &generated()).unwrap();

  let mut bytes = std::fs::read(&path).unwrap();
  let len = bytes.len();
  bytes.truncate(len / 2);
  std::fs::write(&path, &bytes).unwrap();
  assert!(load_meshes(&path, &MeshDefinitions::new()).is_none());

  std::fs::write(&path, b"not a mesh cache at all").unwrap();
  let err = cache::try_load_meshes(&path, &MeshDefinitions::new()).unwrap_err();
  assert!(!err.is_miss());
  assert!(load_meshes(&path, &MeshDefinitions::new()).is_none());
}

#[test]
fn empty_collection_round_trips() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("empty.tmsh");
  save_meshes(&path, &[]).unwrap();
  assert_eq!(load_meshes(&path, &MeshDefinitions::new()).map(|m| m.len()), Some(0));
}

#[test]
fn load_or_generate_writes_then_reuses_cache() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("cache").join("terrain.tmsh");
  let config = MeshGenConfig {
    chunk_size: 16,
    cache_path: Some(path.clone()),
    ..Default::default()
  };
  let generator = generator(config);

  let first = generator.load_or_generate(&raster(9), &textures()).unwrap();
  assert!(path.exists());

  // A different raster proves the second call reads the cache.
  let second = generator.load_or_generate(&raster(10), &textures()).unwrap();
  assert_eq!(first.len(), second.len());
  for (a, b) in first.iter().zip(&second) {
    assert_eq!(a.id(), b.id());
    assert_eq!(a.vertices(), b.vertices());
  }
}

#[test]
fn load_or_generate_replaces_outdated_cache() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("terrain.tmsh");
  std::fs::write(&path, encode_with_version(&[], CACHE_VERSION - 0.5)).unwrap();

  let config = MeshGenConfig {
    cache_path: Some(path.clone()),
    ..Default::default()
  };
  let meshes = generator(config).load_or_generate(&raster(2), &textures()).unwrap();
  assert!(!meshes.is_empty());

  let reloaded = load_meshes(&path, &MeshDefinitions::new()).unwrap();
  assert_eq!(reloaded.len(), meshes.len());
}
