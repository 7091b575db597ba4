//! Binary layout of the mesh cache file.
//!
//! ```text
//! magic    u32  "TMSH"
//! version  f32
//! payload  LZ4 block, uncompressed size prepended:
//!   mesh_count u32
//!   per mesh:
//!     texture_len u16, texture bytes (UTF-8)
//!     part u32
//!     bounds x, y, width, height (i32 each)
//!     index_count u32, indices u16[index_count]
//!     vertex_count u32, then four f32[vertex_count] arrays:
//!       position x, position y, tex coord x, tex coord y
//! ```
//!
//! All integers and floats are little-endian. Vertex data is stored as
//! parallel arrays so each component compresses as its own run.

use bevy::math::Vec2;

use super::CacheError;
use crate::mesh::{Mesh, MeshDefinitions, MeshId, MeshVertex, TextureId};
use crate::rect::IntRect;

/// Magic bytes identifying a mesh cache file ("TMSH").
pub const MAGIC: u32 = 0x4853_4D54;

/// Current cache format version.
///
/// Files written with any other version are ignored on load.
pub const CACHE_VERSION: f32 = 1.0;

/// Uncompressed header size: magic and version.
pub const HEADER_SIZE: usize = 8;

/// Serializes meshes with the current [`CACHE_VERSION`].
pub fn encode_meshes(meshes: &[Mesh]) -> Vec<u8> {
  encode_with_version(meshes, CACHE_VERSION)
}

/// Serializes meshes under an explicit version tag.
pub fn encode_with_version(meshes: &[Mesh], version: f32) -> Vec<u8> {
  let mut payload = Vec::new();
  put_u32(&mut payload, meshes.len() as u32);
  for mesh in meshes {
    write_mesh(&mut payload, mesh);
  }

  let compressed = lz4_flex::compress_prepend_size(&payload);
  let mut out = Vec::with_capacity(HEADER_SIZE + compressed.len());
  put_u32(&mut out, MAGIC);
  out.extend_from_slice(&version.to_le_bytes());
  out.extend_from_slice(&compressed);
  out
}

/// Cuts `name` to at most `max` bytes without splitting a character.
fn truncate_name(name: &str, max: usize) -> &str {
  if name.len() <= max {
    return name;
  }
  let mut end = max;
  while !name.is_char_boundary(end) {
    end -= 1;
  }
  &name[..end]
}

fn write_mesh(buf: &mut Vec<u8>, mesh: &Mesh) {
  let texture = truncate_name(mesh.texture().as_str(), u16::MAX as usize).as_bytes();
  buf.extend_from_slice(&(texture.len() as u16).to_le_bytes());
  buf.extend_from_slice(texture);

  let id = mesh.id();
  put_u32(buf, id.part);
  for v in [id.bounds.x, id.bounds.y, id.bounds.width, id.bounds.height] {
    buf.extend_from_slice(&v.to_le_bytes());
  }

  put_u32(buf, mesh.indices().len() as u32);
  for &i in mesh.indices() {
    buf.extend_from_slice(&i.to_le_bytes());
  }

  let vertices = mesh.vertices();
  put_u32(buf, vertices.len() as u32);
  let components: [fn(&MeshVertex) -> f32; 4] = [
    |v| v.position.x,
    |v| v.position.y,
    |v| v.tex_coord.x,
    |v| v.tex_coord.y,
  ];
  for component in components {
    for v in vertices {
      buf.extend_from_slice(&component(v).to_le_bytes());
    }
  }
}

#[inline]
fn put_u32(buf: &mut Vec<u8>, value: u32) {
  buf.extend_from_slice(&value.to_le_bytes());
}

/// Reads the uncompressed header, returning the stored version.
pub fn read_header(bytes: &[u8]) -> Result<f32, CacheError> {
  let mut reader = Reader::new(bytes);
  let magic = reader.u32()?;
  if magic != MAGIC {
    return Err(CacheError::InvalidMagic(magic));
  }
  reader.f32()
}

/// Deserializes a cache file, attaching definitions by texture.
///
/// Meshes stored with fewer than 3 indices are skipped. A version other
/// than [`CACHE_VERSION`] is rejected before the payload is touched.
pub fn decode_meshes(bytes: &[u8], definitions: &MeshDefinitions) -> Result<Vec<Mesh>, CacheError> {
  let version = read_header(bytes)?;
  if version != CACHE_VERSION {
    return Err(CacheError::VersionMismatch {
      file: version,
      expected: CACHE_VERSION,
    });
  }

  let payload = lz4_flex::decompress_size_prepended(&bytes[HEADER_SIZE..])?;
  let mut reader = Reader::new(&payload);
  let count = reader.u32()? as usize;

  let mut meshes = Vec::new();
  for index in 0..count {
    if let Some(mesh) = read_mesh(&mut reader, index, definitions)? {
      meshes.push(mesh);
    }
  }
  if !reader.is_empty() {
    return Err(CacheError::Malformed("trailing bytes after last mesh"));
  }
  Ok(meshes)
}

fn read_mesh(
  reader: &mut Reader<'_>,
  index: usize,
  definitions: &MeshDefinitions,
) -> Result<Option<Mesh>, CacheError> {
  let texture_len = reader.u16()? as usize;
  let texture = std::str::from_utf8(reader.take(texture_len)?)
    .map_err(|_| CacheError::Malformed("texture name is not UTF-8"))?;
  let texture = TextureId::new(texture);

  let part = reader.u32()?;
  let bounds = IntRect::new(reader.i32()?, reader.i32()?, reader.i32()?, reader.i32()?);

  let index_count = reader.u32()? as usize;
  let indices: Vec<u16> = reader
    .take(checked_len(index_count, 2)?)?
    .chunks_exact(2)
    .map(|b| u16::from_le_bytes([b[0], b[1]]))
    .collect();

  let vertex_count = reader.u32()? as usize;
  let xs = reader.f32_array(vertex_count)?;
  let ys = reader.f32_array(vertex_count)?;
  let us = reader.f32_array(vertex_count)?;
  let vs = reader.f32_array(vertex_count)?;

  if indices.len() < 3 {
    return Ok(None);
  }
  if indices.len() % 3 != 0 {
    return Err(CacheError::Malformed("index count is not a multiple of 3"));
  }

  let vertices: Vec<MeshVertex> = (0..vertex_count)
    .map(|i| MeshVertex::new(Vec2::new(xs[i], ys[i]), Vec2::new(us[i], vs[i])))
    .collect();
  let definition = definitions.get(&texture);
  let id = MeshId {
    texture,
    bounds,
    part,
  };

  Mesh::from_parts(id, vertices, indices, definition)
    .map(Some)
    .ok_or(CacheError::IndexOutOfRange { mesh: index })
}

fn checked_len(count: usize, size: usize) -> Result<usize, CacheError> {
  count.checked_mul(size).ok_or(CacheError::Truncated)
}

/// Little-endian cursor over a byte slice.
struct Reader<'a> {
  buf: &'a [u8],
}

impl<'a> Reader<'a> {
  fn new(buf: &'a [u8]) -> Self {
    Self { buf }
  }

  fn is_empty(&self) -> bool {
    self.buf.is_empty()
  }

  fn take(&mut self, len: usize) -> Result<&'a [u8], CacheError> {
    if self.buf.len() < len {
      return Err(CacheError::Truncated);
    }
    let (head, tail) = self.buf.split_at(len);
    self.buf = tail;
    Ok(head)
  }

  fn array<const N: usize>(&mut self) -> Result<[u8; N], CacheError> {
    let mut out = [0u8; N];
    out.copy_from_slice(self.take(N)?);
    Ok(out)
  }

  fn u16(&mut self) -> Result<u16, CacheError> {
    self.array().map(u16::from_le_bytes)
  }

  fn u32(&mut self) -> Result<u32, CacheError> {
    self.array().map(u32::from_le_bytes)
  }

  fn i32(&mut self) -> Result<i32, CacheError> {
    self.array().map(i32::from_le_bytes)
  }

  fn f32(&mut self) -> Result<f32, CacheError> {
    self.array().map(f32::from_le_bytes)
  }

  fn f32_array(&mut self, count: usize) -> Result<Vec<f32>, CacheError> {
    Ok(
      self
        .take(checked_len(count, 4)?)?
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect(),
    )
  }
}
