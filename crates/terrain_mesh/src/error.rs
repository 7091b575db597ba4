//! Error types for configuration, tessellation and generation.

use bevy::math::UVec2;

use crate::mesh::TextureId;

/// Invalid configuration or construction arguments.
///
/// These are precondition violations; callers must fix the input rather
/// than retry.
#[derive(Debug)]
pub enum ConfigError {
  /// A category has neither terrain nor biome predicates.
  EmptyCriteria { texture: TextureId },
  /// A size that must be strictly positive was zero or negative.
  NonPositiveSize { what: &'static str, value: i64 },
  /// Pixel scale components must be finite and non-zero.
  InvalidScale { x: f32, y: f32 },
  /// The config file could not be read.
  Io(std::io::Error),
  /// The config file is not valid TOML for [`MeshGenConfig`].
  ///
  /// [`MeshGenConfig`]: crate::config::MeshGenConfig
  Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::EmptyCriteria { texture } => {
        write!(f, "category '{}' has no terrain or biome predicates", texture)
      }
      Self::NonPositiveSize { what, value } => {
        write!(f, "{} must be positive, got {}", what, value)
      }
      Self::InvalidScale { x, y } => write!(f, "invalid pixel scale: ({}, {})", x, y),
      Self::Io(e) => write!(f, "failed to read config: {}", e),
      Self::Parse(e) => write!(f, "failed to parse config: {}", e),
    }
  }
}

impl std::error::Error for ConfigError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Io(e) => Some(e),
      Self::Parse(e) => Some(e),
      _ => None,
    }
  }
}

impl From<std::io::Error> for ConfigError {
  fn from(e: std::io::Error) -> Self {
    Self::Io(e)
  }
}

impl From<toml::de::Error> for ConfigError {
  fn from(e: toml::de::Error) -> Self {
    Self::Parse(e)
  }
}

/// Tessellator failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TessellateError {
  /// The triangulation backend rejected the polygon.
  Backend(String),
  /// Output length is not a multiple of 3.
  RaggedIndices(usize),
  /// An output index points past the input point count.
  IndexOutOfRange { index: usize, point_count: usize },
}

impl std::fmt::Display for TessellateError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Backend(msg) => write!(f, "triangulation failed: {}", msg),
      Self::RaggedIndices(len) => write!(f, "index count {} is not a multiple of 3", len),
      Self::IndexOutOfRange { index, point_count } => {
        write!(f, "index {} out of range for {} points", index, point_count)
      }
    }
  }
}

impl std::error::Error for TessellateError {}

/// Failures that abort a whole generation pass.
#[derive(Debug)]
pub enum GenerateError {
  Config(ConfigError),
  /// No texture size is registered for a category's texture.
  UnknownTexture(TextureId),
  /// A category's texture has a zero width or height.
  InvalidTextureSize(TextureId, UVec2),
  /// Triangulating a chunk failed.
  Tessellation {
    texture: TextureId,
    source: TessellateError,
  },
  /// The worker pool could not be created.
  ThreadPool(String),
}

impl std::fmt::Display for GenerateError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Config(e) => write!(f, "invalid configuration: {}", e),
      Self::UnknownTexture(texture) => write!(f, "no size registered for texture '{}'", texture),
      Self::InvalidTextureSize(texture, size) => {
        write!(f, "texture '{}' has invalid size {}x{}", texture, size.x, size.y)
      }
      Self::Tessellation { texture, source } => {
        write!(f, "tessellation failed for texture '{}': {}", texture, source)
      }
      Self::ThreadPool(msg) => write!(f, "failed to build worker pool: {}", msg),
    }
  }
}

impl std::error::Error for GenerateError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Config(e) => Some(e),
      Self::Tessellation { source, .. } => Some(source),
      _ => None,
    }
  }
}

impl From<ConfigError> for GenerateError {
  fn from(e: ConfigError) -> Self {
    Self::Config(e)
  }
}
