//! Marching squares edge extraction.
//!
//! Turns a [`Bitmap`] into the set of boundary edges separating filled and
//! empty pixels.

use bevy::math::Vec2;

use super::edge::{Edge, EdgeSet};
use crate::raster::Bitmap;

/// Edge segment within a cell, represented as start and end points.
/// Coordinates are in cell-local space [0, 1].
pub type EdgeSegment = ((f32, f32), (f32, f32));

/// Lookup table for marching squares edge segments.
///
/// A lattice point `(x, y)` samples the four pixels around it:
///   - bit 3 (8): n00 = pixel (x, y)
///   - bit 2 (4): n10 = pixel (x + 1, y)
///   - bit 1 (2): n01 = pixel (x, y + 1)
///   - bit 0 (1): n11 = pixel (x + 1, y + 1)
///
/// Case index is computed as: n00 << 3 | n10 << 2 | n01 << 1 | n11
///
/// Cell coordinate system (corners sit on pixel centres):
///   n01 (0,1)----T(0.5,1)----(1,1) n11
///      |                       |
///   L(0,0.5)                R(1,0.5)
///      |                       |
///   n00 (0,0)----B(0.5,0)----(1,0) n10
///
/// Returns 0, 1, or 2 edge segments per cell case.
pub const EDGE_TABLE: [&[EdgeSegment]; 16] = [
  // Case 0 (0000): all empty - no contour
  &[],
  // Case 1 (0001): n11 solid - cut top-right corner
  &[((0.5, 1.0), (1.0, 0.5))],
  // Case 2 (0010): n01 solid - cut top-left corner
  &[((0.0, 0.5), (0.5, 1.0))],
  // Case 3 (0011): top row solid - horizontal
  &[((0.0, 0.5), (1.0, 0.5))],
  // Case 4 (0100): n10 solid - cut bottom-right corner
  &[((0.5, 0.0), (1.0, 0.5))],
  // Case 5 (0101): right column solid - vertical
  &[((0.5, 0.0), (0.5, 1.0))],
  // Case 6 (0110): n10+n01 saddle - two separate corner cuts
  &[((0.5, 0.0), (1.0, 0.5)), ((0.0, 0.5), (0.5, 1.0))],
  // Case 7 (0111): only n00 empty - cut bottom-left corner
  &[((0.0, 0.5), (0.5, 0.0))],
  // Case 8 (1000): n00 solid - cut bottom-left corner
  &[((0.0, 0.5), (0.5, 0.0))],
  // Case 9 (1001): n00+n11 saddle - two separate corner cuts
  &[((0.0, 0.5), (0.5, 0.0)), ((0.5, 1.0), (1.0, 0.5))],
  // Case 10 (1010): left column solid - vertical
  &[((0.5, 0.0), (0.5, 1.0))],
  // Case 11 (1011): only n10 empty - cut bottom-right corner
  &[((0.5, 0.0), (1.0, 0.5))],
  // Case 12 (1100): bottom row solid - horizontal
  &[((0.0, 0.5), (1.0, 0.5))],
  // Case 13 (1101): only n01 empty - cut top-left corner
  &[((0.0, 0.5), (0.5, 1.0))],
  // Case 14 (1110): only n11 empty - cut top-right corner
  &[((0.5, 1.0), (1.0, 0.5))],
  // Case 15 (1111): all solid - no contour
  &[],
];

/// Table index for a 2x2 neighbourhood.
#[inline]
pub const fn case_index(n00: bool, n10: bool, n01: bool, n11: bool) -> usize {
  ((n00 as usize) << 3) | ((n10 as usize) << 2) | ((n01 as usize) << 1) | (n11 as usize)
}

/// Extracts the deduplicated boundary edges of a bitmap.
///
/// Lattice points run from `-1` up to the last pixel on each axis so that
/// filled pixels on the bitmap border still produce closed contours. Edge
/// coordinates place pixel centres on integer positions.
pub fn build_edge_set(bitmap: &Bitmap) -> EdgeSet {
  let mut edges = EdgeSet::new();
  if bitmap.is_empty() {
    return edges;
  }

  let width = bitmap.width() as i32;
  let height = bitmap.height() as i32;

  for y in -1..height {
    for x in -1..width {
      let case = case_index(
        bitmap.get(x, y),
        bitmap.get(x + 1, y),
        bitmap.get(x, y + 1),
        bitmap.get(x + 1, y + 1),
      );

      let origin = Vec2::new(x as f32, y as f32);
      for &((x1, y1), (x2, y2)) in EDGE_TABLE[case] {
        edges.insert(Edge::new(
          origin + Vec2::new(x1, y1),
          origin + Vec2::new(x2, y2),
        ));
      }
    }
  }

  edges
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn table_has_every_case() {
    assert_eq!(EDGE_TABLE.len(), 16);
    assert!(EDGE_TABLE[case_index(false, false, false, false)].is_empty());
    assert!(EDGE_TABLE[case_index(true, true, true, true)].is_empty());
    for case in 1..15 {
      assert!(!EDGE_TABLE[case].is_empty(), "case {} has no edges", case);
    }
  }

  #[test]
  fn complementary_cases_share_edges() {
    // Filling and emptying the same corners draws the same boundary.
    for case in 0..16 {
      let complement = 15 - case;
      if case == 6 || case == 9 {
        continue;
      }
      let a: Vec<Edge> = EDGE_TABLE[case]
        .iter()
        .map(|&((x1, y1), (x2, y2))| Edge::new(Vec2::new(x1, y1), Vec2::new(x2, y2)))
        .collect();
      let b: Vec<Edge> = EDGE_TABLE[complement]
        .iter()
        .map(|&((x1, y1), (x2, y2))| Edge::new(Vec2::new(x1, y1), Vec2::new(x2, y2)))
        .collect();
      assert_eq!(a, b, "case {} vs {}", case, complement);
    }
  }

  #[test]
  fn saddles_emit_two_edges() {
    assert_eq!(EDGE_TABLE[case_index(false, true, true, false)].len(), 2);
    assert_eq!(EDGE_TABLE[case_index(true, false, false, true)].len(), 2);
  }

  #[test]
  fn single_pixel_yields_diamond_edges() {
    let bitmap = Bitmap::from_rows(&["...", ".#.", "..."]);
    let edges = build_edge_set(&bitmap);
    assert_eq!(edges.len(), 4);
    let expected = [
      Edge::new(Vec2::new(0.5, 1.0), Vec2::new(1.0, 0.5)),
      Edge::new(Vec2::new(1.0, 0.5), Vec2::new(1.5, 1.0)),
      Edge::new(Vec2::new(1.5, 1.0), Vec2::new(1.0, 1.5)),
      Edge::new(Vec2::new(1.0, 1.5), Vec2::new(0.5, 1.0)),
    ];
    for edge in &expected {
      assert!(edges.contains(edge), "missing {:?}", edge);
    }
  }

  #[test]
  fn border_pixels_close() {
    let bitmap = Bitmap::from_rows(&["#"]);
    let edges = build_edge_set(&bitmap);
    assert_eq!(edges.len(), 4);
  }

  #[test]
  fn empty_bitmap_has_no_edges() {
    assert!(build_edge_set(&Bitmap::new(4, 4)).is_empty());
  }
}
