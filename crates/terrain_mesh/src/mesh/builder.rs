//! Converts grouped contours into textured meshes.

use std::sync::Arc;

use bevy::math::Vec2;

use super::tessellate::{Tessellator, validate_indices};
use super::{Mesh, MeshDefinition, MeshVertex, TextureId, split_triangles};
use crate::contour::ShapeGroup;
use crate::error::TessellateError;

/// Accumulates triangulated shape groups for one texture and chunk.
///
/// Vertices are placed at `offset + point * scale`, with texture
/// coordinates `position / texture_size` so the texture tiles in world
/// space. Indices are kept 32-bit until [`MeshBuilder::finish`] packs them
/// into 16-bit meshes.
pub struct MeshBuilder<'a> {
  texture: TextureId,
  texture_size: Vec2,
  offset: Vec2,
  scale: Vec2,
  definition: Option<Arc<MeshDefinition>>,
  tessellator: &'a dyn Tessellator,
  vertices: Vec<MeshVertex>,
  indices: Vec<u32>,
}

impl<'a> MeshBuilder<'a> {
  pub fn new(texture: TextureId, texture_size: Vec2, tessellator: &'a dyn Tessellator) -> Self {
    Self {
      texture,
      texture_size,
      offset: Vec2::ZERO,
      scale: Vec2::ONE,
      definition: None,
      tessellator,
      vertices: Vec::new(),
      indices: Vec::new(),
    }
  }

  /// World position of contour point `(0, 0)`.
  pub fn with_offset(mut self, offset: Vec2) -> Self {
    self.offset = offset;
    self
  }

  /// World units per contour unit, per axis.
  pub fn with_scale(mut self, scale: Vec2) -> Self {
    self.scale = scale;
    self
  }

  pub fn with_definition(mut self, definition: Option<Arc<MeshDefinition>>) -> Self {
    self.definition = definition;
    self
  }

  pub fn vertex_count(&self) -> usize {
    self.vertices.len()
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  /// Flattens a group into tessellator input: outer ring points followed by
  /// each hole's points, and the point index where every hole begins.
  pub fn flatten(group: &ShapeGroup) -> (Vec<Vec2>, Vec<usize>) {
    let mut points = Vec::with_capacity(group.point_count());
    let mut hole_starts = Vec::with_capacity(group.holes.len());
    points.extend(group.outer.points());
    for hole in &group.holes {
      hole_starts.push(points.len());
      points.extend(hole.points());
    }
    (points, hole_starts)
  }

  /// Triangulates a group and appends it to the buffers.
  ///
  /// Returns the number of triangles added.
  pub fn add_group(&mut self, group: &ShapeGroup) -> Result<usize, TessellateError> {
    let (points, hole_starts) = Self::flatten(group);
    if points.len() < 3 {
      return Ok(0);
    }

    let coords: Vec<f64> = points
      .iter()
      .flat_map(|p| [p.x as f64, p.y as f64])
      .collect();
    let local = self.tessellator.tessellate(&coords, &hole_starts)?;
    validate_indices(&local, points.len())?;
    if local.is_empty() {
      return Ok(0);
    }

    let base = self.vertices.len() as u32;
    self.vertices.extend(points.iter().map(|&p| {
      let position = self.offset + p * self.scale;
      MeshVertex::new(position, position / self.texture_size)
    }));
    self.indices.extend(local.iter().map(|&i| base + i as u32));

    Ok(local.len() / 3)
  }

  /// Triangulates every group in order.
  pub fn add_groups<'g>(
    &mut self,
    groups: impl IntoIterator<Item = &'g ShapeGroup>,
  ) -> Result<usize, TessellateError> {
    let mut added = 0;
    for group in groups {
      added += self.add_group(group)?;
    }
    Ok(added)
  }

  /// Packs the accumulated triangles into meshes of at most
  /// `max_triangles` triangles each.
  ///
  /// Produces nothing when fewer than 3 indices were accumulated.
  pub fn finish(self, max_triangles: usize) -> Vec<Mesh> {
    if self.indices.len() < 3 {
      return Vec::new();
    }
    split_triangles(
      &self.texture,
      &self.vertices,
      &self.indices,
      self.definition.as_ref(),
      max_triangles,
    )
  }
}
