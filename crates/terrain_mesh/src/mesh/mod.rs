//! Drawable terrain meshes.
//!
//! A [`Mesh`] is one texture-batched triangle list with 16-bit indices. The
//! [`builder`] turns grouped contours into meshes, delegating polygon
//! triangulation to a [`Tessellator`].

pub mod builder;
pub mod tessellate;

use std::collections::HashMap;
use std::sync::Arc;

use bevy::math::Vec2;
use serde::Deserialize;

pub use builder::MeshBuilder;
pub use tessellate::{CdtTessellator, EarcutTessellator, Tessellator};

use crate::rect::IntRect;

/// Largest triangle count whose vertices always fit 16-bit indices.
pub const MAX_TRIANGLES_PER_MESH: usize = u16::MAX as usize / 3;

/// Symbolic texture name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(from = "String")]
pub struct TextureId(Arc<str>);

impl TextureId {
  pub fn new(name: &str) -> Self {
    Self(Arc::from(name))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for TextureId {
  fn from(name: &str) -> Self {
    Self::new(name)
  }
}

impl From<String> for TextureId {
  fn from(name: String) -> Self {
    Self(Arc::from(name))
  }
}

impl std::fmt::Display for TextureId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// Per-texture animation and deformation parameters.
///
/// Carried alongside meshes for the renderer; generation never reads it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MeshDefinition {
  /// Draw order relative to other terrain textures.
  pub z_order: i32,
  /// Vertex wave displacement in world units. Zero disables waving.
  pub wave_amplitude: f32,
  /// Spatial frequency of the wave.
  pub wave_frequency: f32,
  /// Wave phase speed in radians per second.
  pub wave_speed: f32,
}

/// Texture to [`MeshDefinition`] lookup, injected into generation and
/// cache loading.
#[derive(Clone, Debug, Default)]
pub struct MeshDefinitions {
  by_texture: HashMap<TextureId, Arc<MeshDefinition>>,
}

impl MeshDefinitions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, texture: impl Into<TextureId>, definition: MeshDefinition) {
    self.by_texture.insert(texture.into(), Arc::new(definition));
  }

  pub fn get(&self, texture: &TextureId) -> Option<Arc<MeshDefinition>> {
    self.by_texture.get(texture).cloned()
  }

  pub fn len(&self) -> usize {
    self.by_texture.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_texture.is_empty()
  }
}

impl<K: Into<TextureId>> FromIterator<(K, MeshDefinition)> for MeshDefinitions {
  fn from_iter<I: IntoIterator<Item = (K, MeshDefinition)>>(iter: I) -> Self {
    let mut definitions = Self::new();
    for (texture, definition) in iter {
      definitions.insert(texture, definition);
    }
    definitions
  }
}

/// A mesh vertex: world position and texture coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
  pub position: Vec2,
  pub tex_coord: Vec2,
}

impl MeshVertex {
  pub const fn new(position: Vec2, tex_coord: Vec2) -> Self {
    Self {
      position,
      tex_coord,
    }
  }
}

/// Stable mesh identity used for deduplication.
///
/// Identical meshes produced by overlapping chunks share an id; parts of a
/// split mesh differ by `part`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MeshId {
  pub texture: TextureId,
  pub bounds: IntRect,
  pub part: u32,
}

impl std::fmt::Display for MeshId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{}@{},{} {}x{}#{}",
      self.texture, self.bounds.x, self.bounds.y, self.bounds.width, self.bounds.height, self.part
    )
  }
}

/// One drawable batch of textured triangles.
///
/// Immutable once built. Always holds at least one triangle.
#[derive(Clone, Debug)]
pub struct Mesh {
  id: MeshId,
  vertices: Vec<MeshVertex>,
  indices: Vec<u16>,
  definition: Option<Arc<MeshDefinition>>,
}

impl Mesh {
  /// Builds a mesh, deriving its bounds from the vertex positions.
  ///
  /// Returns `None` unless `indices` holds at least one whole triangle and
  /// every index points at a vertex.
  pub fn new(
    texture: TextureId,
    vertices: Vec<MeshVertex>,
    indices: Vec<u16>,
    definition: Option<Arc<MeshDefinition>>,
  ) -> Option<Self> {
    Self::with_part(texture, vertices, indices, definition, 0)
  }

  pub(crate) fn with_part(
    texture: TextureId,
    vertices: Vec<MeshVertex>,
    indices: Vec<u16>,
    definition: Option<Arc<MeshDefinition>>,
    part: u32,
  ) -> Option<Self> {
    let bounds = IntRect::enclosing(vertices.iter().map(|v| v.position))?;
    Self::from_parts(
      MeshId {
        texture,
        bounds,
        part,
      },
      vertices,
      indices,
      definition,
    )
  }

  /// Reassembles a mesh with known identity (used by cache loading).
  ///
  /// Returns `None` if the index list is degenerate, is not a whole number
  /// of triangles, or references missing vertices.
  pub(crate) fn from_parts(
    id: MeshId,
    vertices: Vec<MeshVertex>,
    indices: Vec<u16>,
    definition: Option<Arc<MeshDefinition>>,
  ) -> Option<Self> {
    if indices.len() < 3
      || indices.len() % 3 != 0
      || indices.iter().any(|&i| i as usize >= vertices.len())
    {
      return None;
    }
    Some(Self {
      id,
      vertices,
      indices,
      definition,
    })
  }

  pub fn id(&self) -> &MeshId {
    &self.id
  }

  pub fn texture(&self) -> &TextureId {
    &self.id.texture
  }

  /// Integer bounding rectangle of all vertex positions.
  pub fn bounds(&self) -> IntRect {
    self.id.bounds
  }

  pub fn vertices(&self) -> &[MeshVertex] {
    &self.vertices
  }

  pub fn indices(&self) -> &[u16] {
    &self.indices
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  pub fn definition(&self) -> Option<&Arc<MeshDefinition>> {
    self.definition.as_ref()
  }

  /// Returns a copy with a different definition attached.
  pub fn with_definition(mut self, definition: Option<Arc<MeshDefinition>>) -> Self {
    self.definition = definition;
    self
  }

  /// Sum of triangle areas in world units.
  pub fn area(&self) -> f32 {
    self
      .indices
      .chunks_exact(3)
      .map(|tri| {
        let a = self.vertices[tri[0] as usize].position;
        let b = self.vertices[tri[1] as usize].position;
        let c = self.vertices[tri[2] as usize].position;
        (b - a).perp_dot(c - a).abs() * 0.5
      })
      .sum()
  }

  /// Divides the mesh into parts of at most `max_triangles` triangles.
  ///
  /// Parts keep the texture and definition, cover disjoint triangle
  /// subsets in their original order, and carry only the vertices they
  /// reference. A mesh already within budget is returned unchanged.
  pub fn split(&self, max_triangles: usize) -> Vec<Mesh> {
    let budget = max_triangles.clamp(1, MAX_TRIANGLES_PER_MESH);
    if self.triangle_count() <= budget {
      return vec![self.clone()];
    }
    let indices: Vec<u32> = self.indices.iter().map(|&i| i as u32).collect();
    split_triangles(
      &self.id.texture,
      &self.vertices,
      &indices,
      self.definition.as_ref(),
      budget,
    )
  }
}

/// Packs a 32-bit indexed triangle list into 16-bit meshes of at most
/// `budget` triangles each, compacting the vertices each part references.
pub(crate) fn split_triangles(
  texture: &TextureId,
  vertices: &[MeshVertex],
  indices: &[u32],
  definition: Option<&Arc<MeshDefinition>>,
  budget: usize,
) -> Vec<Mesh> {
  let budget = budget.clamp(1, MAX_TRIANGLES_PER_MESH);
  let mut meshes = Vec::new();
  let mut remap: HashMap<u32, u16> = HashMap::new();

  for (part, triangles) in indices.chunks(budget * 3).enumerate() {
    remap.clear();
    let mut part_vertices = Vec::new();
    let mut part_indices = Vec::with_capacity(triangles.len());

    for &index in triangles {
      let local = *remap.entry(index).or_insert_with(|| {
        part_vertices.push(vertices[index as usize]);
        (part_vertices.len() - 1) as u16
      });
      part_indices.push(local);
    }

    if let Some(mesh) = Mesh::with_part(
      texture.clone(),
      part_vertices,
      part_indices,
      definition.cloned(),
      part as u32,
    ) {
      meshes.push(mesh);
    }
  }

  meshes
}
