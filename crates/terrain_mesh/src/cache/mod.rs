//! Mesh cache persistence.
//!
//! A generated mesh collection is written to a single versioned,
//! LZ4-compressed file. Loading is best-effort: any missing, outdated or
//! unreadable file is reported as a cache miss so the caller regenerates.

mod format;

use std::path::Path;

pub use format::{CACHE_VERSION, MAGIC, decode_meshes, encode_meshes, encode_with_version, read_header};

use crate::mesh::{Mesh, MeshDefinitions};

/// Reasons a cache file could not be used.
#[derive(Debug)]
pub enum CacheError {
  Io(std::io::Error),
  InvalidMagic(u32),
  VersionMismatch { file: f32, expected: f32 },
  Decompress(lz4_flex::block::DecompressError),
  /// The data ended before a complete record was read.
  Truncated,
  Malformed(&'static str),
  /// A stored index references a vertex past the mesh's vertex count.
  IndexOutOfRange { mesh: usize },
}

impl std::fmt::Display for CacheError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Io(e) => write!(f, "I/O error: {}", e),
      Self::InvalidMagic(m) => write!(f, "invalid magic number: 0x{:08X}", m),
      Self::VersionMismatch { file, expected } => {
        write!(f, "version mismatch: file={}, expected={}", file, expected)
      }
      Self::Decompress(e) => write!(f, "decompression failed: {}", e),
      Self::Truncated => write!(f, "unexpected end of data"),
      Self::Malformed(what) => write!(f, "malformed cache: {}", what),
      Self::IndexOutOfRange { mesh } => write!(f, "mesh {} has an out-of-range index", mesh),
    }
  }
}

impl std::error::Error for CacheError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Io(e) => Some(e),
      Self::Decompress(e) => Some(e),
      _ => None,
    }
  }
}

impl From<std::io::Error> for CacheError {
  fn from(e: std::io::Error) -> Self {
    Self::Io(e)
  }
}

impl From<lz4_flex::block::DecompressError> for CacheError {
  fn from(e: lz4_flex::block::DecompressError) -> Self {
    Self::Decompress(e)
  }
}

impl CacheError {
  /// Returns true for the expected miss cases: no file, or a file from
  /// another format version.
  pub fn is_miss(&self) -> bool {
    match self {
      Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
      Self::VersionMismatch { .. } => true,
      _ => false,
    }
  }
}

/// Writes meshes to `path`, creating parent directories as needed.
///
/// The file is written beside the target and renamed into place, so a
/// failed save never leaves a half-written cache behind.
pub fn save_meshes(path: &Path, meshes: &[Mesh]) -> Result<(), CacheError> {
  save_bytes(path, &encode_meshes(meshes))
}

fn save_bytes(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      std::fs::create_dir_all(parent)?;
    }
  }
  let staging = path.with_extension("tmp");
  std::fs::write(&staging, bytes)?;
  std::fs::rename(&staging, path)?;
  Ok(())
}

/// Reads and decodes a cache file, reporting why it could not be used.
pub fn try_load_meshes(path: &Path, definitions: &MeshDefinitions) -> Result<Vec<Mesh>, CacheError> {
  let bytes = std::fs::read(path)?;
  decode_meshes(&bytes, definitions)
}

/// Loads cached meshes, or `None` when the cache cannot be used.
///
/// Never returns a partially decoded collection. Definitions are attached
/// from `definitions` by texture.
pub fn load_meshes(path: &Path, definitions: &MeshDefinitions) -> Option<Vec<Mesh>> {
  match try_load_meshes(path, definitions) {
    Ok(meshes) => {
      log::debug!("Loaded {} meshes from {}", meshes.len(), path.display());
      Some(meshes)
    }
    Err(e) if e.is_miss() => {
      log::debug!("Mesh cache miss at {}: {}", path.display(), e);
      None
    }
    Err(e) => {
      log::warn!("Ignoring unreadable mesh cache {}: {}", path.display(), e);
      None
    }
  }
}
