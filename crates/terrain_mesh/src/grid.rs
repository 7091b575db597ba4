//! Block grid spatial index over a fixed mesh collection.

use std::collections::HashSet;

use bevy::math::{IVec2, Rect};
use bevy::prelude::Resource;
use rayon::prelude::*;

use crate::error::ConfigError;
use crate::mesh::Mesh;
use crate::rect::IntRect;

/// Meshes bucketed into fixed-size rectangular blocks.
///
/// Every block stores the meshes whose bounds touch it, so a mesh spanning
/// a block seam is stored once per block. Mesh bounds and query rectangles
/// extending past the grid extent are clamped to the border blocks.
///
/// Built once per mesh collection and read-only afterwards.
#[derive(Resource, Debug)]
pub struct MeshGrid {
  meshes: Vec<Mesh>,
  /// Row-major, `blocks.x * blocks.y` entries of indices into `meshes`.
  cells: Vec<Vec<u32>>,
  origin: IVec2,
  total_size: IVec2,
  block_size: IVec2,
  blocks: IVec2,
}

impl MeshGrid {
  /// Builds a grid with its extent starting at the world origin.
  pub fn new(meshes: Vec<Mesh>, total_size: IVec2, block_size: IVec2) -> Result<Self, ConfigError> {
    Self::with_origin(meshes, IVec2::ZERO, total_size, block_size)
  }

  /// Builds a grid covering `[origin, origin + total_size]`.
  ///
  /// Block dimensions larger than the extent are clamped to it, so a world
  /// smaller than one block yields a single block on that axis.
  pub fn with_origin(
    meshes: Vec<Mesh>,
    origin: IVec2,
    total_size: IVec2,
    block_size: IVec2,
  ) -> Result<Self, ConfigError> {
    for (what, value) in [
      ("total width", total_size.x),
      ("total height", total_size.y),
      ("block width", block_size.x),
      ("block height", block_size.y),
    ] {
      if value <= 0 {
        return Err(ConfigError::NonPositiveSize {
          what,
          value: value as i64,
        });
      }
    }

    let block_size = block_size.min(total_size);
    // Both sizes are positive here, so the unsigned casts are lossless.
    let blocks = IVec2::new(
      (total_size.x as u32).div_ceil(block_size.x as u32) as i32,
      (total_size.y as u32).div_ceil(block_size.y as u32) as i32,
    );

    let mut grid = Self {
      meshes,
      cells: Vec::new(),
      origin,
      total_size,
      block_size,
      blocks,
    };
    grid.cells = grid.build_cells();
    Ok(grid)
  }

  /// Fills every block, one row per rayon task.
  fn build_cells(&self) -> Vec<Vec<u32>> {
    let ranges: Vec<(IVec2, IVec2)> = self
      .meshes
      .iter()
      .map(|mesh| self.block_range(mesh.bounds()))
      .collect();

    let rows: Vec<Vec<Vec<u32>>> = (0..self.blocks.y)
      .into_par_iter()
      .map(|by| {
        let mut row = vec![Vec::new(); self.blocks.x as usize];
        for (index, (min, max)) in ranges.iter().enumerate() {
          if by < min.y || by > max.y {
            continue;
          }
          for bx in min.x..=max.x {
            row[bx as usize].push(index as u32);
          }
        }
        row
      })
      .collect();

    rows.into_iter().flatten().collect()
  }

  /// Inclusive block index range touched by `rect`, clamped to the grid.
  fn block_range(&self, rect: IntRect) -> (IVec2, IVec2) {
    let local_min = rect.min() - self.origin;
    let local_max = rect.max() - self.origin;
    let last = self.blocks - IVec2::ONE;

    // Closed intervals: block k spans [k * size, (k + 1) * size].
    let min = IVec2::new(
      ceil_div(local_min.x, self.block_size.x) - 1,
      ceil_div(local_min.y, self.block_size.y) - 1,
    );
    let max = IVec2::new(
      local_max.x.div_euclid(self.block_size.x),
      local_max.y.div_euclid(self.block_size.y),
    );
    (
      min.clamp(IVec2::ZERO, last),
      max.clamp(IVec2::ZERO, last),
    )
  }

  /// Meshes stored in every block `rect` touches, concatenated in block
  /// order.
  ///
  /// A mesh appears once per touched block that holds it; use
  /// [`MeshGrid::query_region_unique`] for exact-once results.
  pub fn query_region(&self, rect: IntRect) -> Vec<&Mesh> {
    let (min, max) = self.block_range(rect);
    let mut result = Vec::new();
    for by in min.y..=max.y {
      for bx in min.x..=max.x {
        result.extend(self.block_indices(bx, by).iter().map(|&i| &self.meshes[i as usize]));
      }
    }
    result
  }

  /// Like [`MeshGrid::query_region`], keeping the first occurrence of each
  /// [`MeshId`](crate::mesh::MeshId).
  pub fn query_region_unique(&self, rect: IntRect) -> Vec<&Mesh> {
    let mut seen = HashSet::new();
    self
      .query_region(rect)
      .into_iter()
      .filter(|mesh| seen.insert(mesh.id()))
      .collect()
  }

  /// Queries with a world rectangle, rounded outwards to integers.
  pub fn query_world_rect(&self, rect: Rect) -> Vec<&Mesh> {
    self.query_region(IntRect::covering(rect))
  }

  /// Meshes stored in block `(bx, by)`. Empty for out-of-range blocks.
  pub fn block(&self, bx: i32, by: i32) -> impl Iterator<Item = &Mesh> + '_ {
    self
      .block_indices(bx, by)
      .iter()
      .map(|&i| &self.meshes[i as usize])
  }

  fn block_indices(&self, bx: i32, by: i32) -> &[u32] {
    if bx < 0 || by < 0 || bx >= self.blocks.x || by >= self.blocks.y {
      return &[];
    }
    &self.cells[(by * self.blocks.x + bx) as usize]
  }

  /// World rectangle covered by block `(bx, by)`.
  pub fn block_rect(&self, bx: i32, by: i32) -> IntRect {
    let min = self.origin + IVec2::new(bx, by) * self.block_size;
    IntRect::new(min.x, min.y, self.block_size.x, self.block_size.y)
  }

  /// Number of blocks per axis.
  pub fn block_count(&self) -> IVec2 {
    self.blocks
  }

  /// Block dimensions after clamping to the extent.
  pub fn block_size(&self) -> IVec2 {
    self.block_size
  }

  pub fn extent(&self) -> IntRect {
    IntRect::new(
      self.origin.x,
      self.origin.y,
      self.total_size.x,
      self.total_size.y,
    )
  }

  pub fn meshes(&self) -> &[Mesh] {
    &self.meshes
  }

  pub fn into_meshes(self) -> Vec<Mesh> {
    self.meshes
  }

  pub fn len(&self) -> usize {
    self.meshes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.meshes.is_empty()
  }
}

/// Builds a [`MeshGrid`] over `[0, total_width] × [0, total_height]`.
pub fn build_spatial_index(
  meshes: Vec<Mesh>,
  total_width: i32,
  total_height: i32,
  block_width: i32,
  block_height: i32,
) -> Result<MeshGrid, ConfigError> {
  MeshGrid::new(
    meshes,
    IVec2::new(total_width, total_height),
    IVec2::new(block_width, block_height),
  )
}

#[inline]
fn ceil_div(value: i32, divisor: i32) -> i32 {
  -(-value).div_euclid(divisor)
}
