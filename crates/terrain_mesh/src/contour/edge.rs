//! Boundary edges and the deduplicated edge set.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use bevy::math::Vec2;

/// Granularity of edge angles used for collinearity merging.
///
/// Marching squares only emits multiples of 45 degrees, so any step that
/// divides 45 merges exactly the same runs.
pub const ANGLE_STEP_DEGREES: f32 = 1.0;

/// Snaps a point to integer grid for robust endpoint matching.
///
/// Marching squares produces coordinates at exact 0.5 intervals, so we
/// multiply by 2 and round to get exact integer keys for HashMap lookups.
#[inline]
pub fn grid_key(v: Vec2) -> (i32, i32) {
  ((v.x * 2.0).round() as i32, (v.y * 2.0).round() as i32)
}

/// An oriented boundary segment.
///
/// Equality and hashing ignore orientation: `Edge::new(a, b) ==
/// Edge::new(b, a)`.
#[derive(Clone, Copy, Debug)]
pub struct Edge {
  start: Vec2,
  end: Vec2,
  angle: i32,
}

impl Edge {
  pub fn new(start: Vec2, end: Vec2) -> Self {
    let d = end - start;
    let degrees = d.y.atan2(d.x).to_degrees().rem_euclid(360.0);
    let steps = (360.0 / ANGLE_STEP_DEGREES).round() as i32;
    let angle = ((degrees / ANGLE_STEP_DEGREES).round() as i32).rem_euclid(steps);
    Self { start, end, angle }
  }

  #[inline]
  pub fn start(&self) -> Vec2 {
    self.start
  }

  #[inline]
  pub fn end(&self) -> Vec2 {
    self.end
  }

  /// Direction in [`ANGLE_STEP_DEGREES`] steps, counter-clockwise from +X.
  #[inline]
  pub fn angle(&self) -> i32 {
    self.angle
  }

  pub fn reversed(&self) -> Self {
    Self::new(self.end, self.start)
  }

  pub fn length(&self) -> f32 {
    self.start.distance(self.end)
  }

  /// Endpoint keys ordered so both orientations agree.
  fn unordered_key(&self) -> ((i32, i32), (i32, i32)) {
    let a = grid_key(self.start);
    let b = grid_key(self.end);
    if a <= b { (a, b) } else { (b, a) }
  }
}

impl PartialEq for Edge {
  fn eq(&self, other: &Self) -> bool {
    self.unordered_key() == other.unordered_key()
  }
}

impl Eq for Edge {}

impl Hash for Edge {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.unordered_key().hash(state);
  }
}

/// Boundary edges in first-insertion order with duplicates removed.
#[derive(Clone, Debug, Default)]
pub struct EdgeSet {
  edges: Vec<Edge>,
  seen: HashSet<Edge>,
}

impl EdgeSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds an edge unless it (or its reverse) is already present.
  ///
  /// Returns true if the edge was added.
  pub fn insert(&mut self, edge: Edge) -> bool {
    if self.seen.insert(edge) {
      self.edges.push(edge);
      true
    } else {
      false
    }
  }

  pub fn contains(&self, edge: &Edge) -> bool {
    self.seen.contains(edge)
  }

  pub fn len(&self) -> usize {
    self.edges.len()
  }

  pub fn is_empty(&self) -> bool {
    self.edges.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Edge> {
    self.edges.iter()
  }

  pub fn into_vec(self) -> Vec<Edge> {
    self.edges
  }
}

impl FromIterator<Edge> for EdgeSet {
  fn from_iter<I: IntoIterator<Item = Edge>>(iter: I) -> Self {
    let mut set = Self::new();
    for edge in iter {
      set.insert(edge);
    }
    set
  }
}
