//! Chains boundary edges into contours.

use std::collections::HashMap;

use bevy::math::Vec2;

use super::edge::{Edge, EdgeSet, grid_key};

/// One traced contour: edges in chain order, each starting where the
/// previous one ends.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
  edges: Vec<Edge>,
}

impl Shape {
  /// Creates a shape from an already ordered chain.
  pub fn from_edges(edges: Vec<Edge>) -> Self {
    Self { edges }
  }

  pub fn edges(&self) -> &[Edge] {
    &self.edges
  }

  pub fn len(&self) -> usize {
    self.edges.len()
  }

  pub fn is_empty(&self) -> bool {
    self.edges.is_empty()
  }

  /// Start point of the first edge.
  pub fn first_point(&self) -> Option<Vec2> {
    self.edges.first().map(Edge::start)
  }

  /// Ordered polygon vertices (the start of every edge).
  pub fn points(&self) -> Vec<Vec2> {
    self.edges.iter().map(Edge::start).collect()
  }

  /// Returns true if the chain ends where it starts.
  pub fn is_closed(&self) -> bool {
    match (self.edges.first(), self.edges.last()) {
      (Some(first), Some(last)) => grid_key(first.start()) == grid_key(last.end()),
      _ => false,
    }
  }

  /// Signed area of the polygon (positive when counter-clockwise).
  pub fn signed_area(&self) -> f32 {
    self
      .edges
      .iter()
      .map(|e| e.start().perp_dot(e.end()))
      .sum::<f32>()
      * 0.5
  }
}

/// Maps grid keys to the indices of edges touching that point.
fn build_adjacency_map(edges: &[Edge]) -> HashMap<(i32, i32), Vec<usize>> {
  let mut adjacency: HashMap<(i32, i32), Vec<usize>> = HashMap::new();
  for (i, edge) in edges.iter().enumerate() {
    adjacency.entry(grid_key(edge.start())).or_default().push(i);
    let end_key = grid_key(edge.end());
    if end_key != grid_key(edge.start()) {
      adjacency.entry(end_key).or_default().push(i);
    }
  }
  adjacency
}

/// Appends `edge` to the chain, extending the tail instead when both run
/// in the same direction.
fn push_merged(chain: &mut Vec<Edge>, edge: Edge) {
  if let Some(last) = chain.last_mut() {
    if last.angle() == edge.angle() {
      *last = Edge::new(last.start(), edge.end());
      return;
    }
  }
  chain.push(edge);
}

/// Merges the closing edge into the first one when they are collinear.
fn merge_closure(chain: &mut Vec<Edge>) {
  if chain.len() < 3 {
    return;
  }
  let first = chain[0];
  let last = chain[chain.len() - 1];
  if grid_key(last.end()) == grid_key(first.start()) && last.angle() == first.angle() {
    chain[0] = Edge::new(last.start(), first.end());
    chain.pop();
  }
}

/// Follows unused edges from `seed` until no edge continues the chain.
fn traverse_chain(
  edges: &[Edge],
  adjacency: &HashMap<(i32, i32), Vec<usize>>,
  used: &mut [bool],
  seed: usize,
) -> Vec<Edge> {
  used[seed] = true;
  let mut chain = vec![edges[seed]];
  let mut tail = edges[seed].end();

  loop {
    let key = grid_key(tail);
    let next = adjacency.get(&key).and_then(|candidates| {
      candidates.iter().copied().filter(|&i| !used[i]).find_map(|i| {
        let edge = edges[i];
        // An end match is preferred and requires reversing the edge.
        if grid_key(edge.end()) == key {
          Some((i, edge.reversed()))
        } else if grid_key(edge.start()) == key {
          Some((i, edge))
        } else {
          None
        }
      })
    });

    match next {
      Some((i, edge)) => {
        used[i] = true;
        tail = edge.end();
        push_merged(&mut chain, edge);
      }
      None => break,
    }
  }

  merge_closure(&mut chain);
  chain
}

/// Partitions an edge set into maximal connected chains.
///
/// Seeds are taken in edge insertion order, so the same input always
/// yields the same shapes with the same starting points.
pub fn trace_shapes(edges: EdgeSet) -> Vec<Shape> {
  let edges = edges.into_vec();
  if edges.is_empty() {
    return Vec::new();
  }

  let adjacency = build_adjacency_map(&edges);
  let mut used = vec![false; edges.len()];
  let mut shapes = Vec::new();

  for seed in 0..edges.len() {
    if used[seed] {
      continue;
    }
    let chain = traverse_chain(&edges, &adjacency, &mut used, seed);
    shapes.push(Shape::from_edges(chain));
  }

  shapes
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::contour::build_edge_set;
  use crate::raster::Bitmap;

  fn trace(rows: &[&str]) -> Vec<Shape> {
    trace_shapes(build_edge_set(&Bitmap::from_rows(rows)))
  }

  fn assert_connected(shape: &Shape) {
    for pair in shape.edges().windows(2) {
      assert_eq!(grid_key(pair[0].end()), grid_key(pair[1].start()));
    }
    assert!(shape.is_closed());
  }

  #[test]
  fn single_pixel_is_a_closed_quadrilateral() {
    let shapes = trace(&["...", ".#.", "..."]);
    assert_eq!(shapes.len(), 1);
    assert_eq!(shapes[0].len(), 4);
    assert_connected(&shapes[0]);
    assert!((shapes[0].signed_area().abs() - 0.5).abs() < 1e-6);
  }

  #[test]
  fn rectangle_merges_straight_runs() {
    let shapes = trace(&["......", ".####.", ".####.", ".####.", "......"]);
    assert_eq!(shapes.len(), 1);
    let shape = &shapes[0];
    assert_connected(shape);
    // Four sides plus four corner chamfers.
    assert_eq!(shape.len(), 8);
    let axis_aligned: Vec<&Edge> = shape.edges().iter().filter(|e| e.angle() % 90 == 0).collect();
    assert_eq!(axis_aligned.len(), 4);
    let mut lengths: Vec<f32> = axis_aligned.iter().map(|e| e.length()).collect();
    lengths.sort_by(f32::total_cmp);
    assert_eq!(lengths, vec![2.0, 2.0, 3.0, 3.0]);
  }

  #[test]
  fn diagonal_staircase_merges_into_one_edge() {
    let shapes = trace(&["#...", "##..", "###.", "####"]);
    assert_eq!(shapes.len(), 1);
    assert_eq!(shapes[0].len(), 6);
    let longest = shapes[0]
      .edges()
      .iter()
      .map(Edge::length)
      .fold(0.0f32, f32::max);
    // The staircase hypotenuse spans 3.5 pixels on each axis.
    assert!((longest - 3.5 * std::f32::consts::SQRT_2).abs() < 1e-4);
  }

  #[test]
  fn disconnected_islands_trace_separately() {
    let shapes = trace(&["#..#", "....", "#..#"]);
    assert_eq!(shapes.len(), 4);
    shapes.iter().for_each(assert_connected);
  }

  #[test]
  fn saddle_does_not_connect_diagonal_pixels() {
    let shapes = trace(&["#.", ".#"]);
    assert_eq!(shapes.len(), 2);
  }

  #[test]
  fn tracing_is_deterministic() {
    let rows = [".##..#", "###.##", "#..###", "##.#.#"];
    assert_eq!(trace(&rows), trace(&rows));
  }
}
