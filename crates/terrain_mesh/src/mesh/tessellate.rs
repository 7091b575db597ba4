//! Polygon-with-holes triangulation backends.
//!
//! Input is a flat `x0, y0, x1, y1, ...` list holding the outer ring
//! followed by each hole ring, plus the point index where each hole starts.
//! Output is a flat triangle list indexing points in that same order.

use std::collections::HashMap;

use bevy::math::Vec2;
use spade::handles::FixedVertexHandle;
use spade::{ConstrainedDelaunayTriangulation, Point2, Triangulation};

use crate::contour::point_in_polygon;
use crate::error::TessellateError;

/// Triangulates one outer ring with holes.
pub trait Tessellator: Sync {
  fn tessellate(&self, coords: &[f64], hole_starts: &[usize]) -> Result<Vec<usize>, TessellateError>;
}

/// Checks that a triangle list is well formed for `point_count` points.
pub fn validate_indices(indices: &[usize], point_count: usize) -> Result<(), TessellateError> {
  if indices.len() % 3 != 0 {
    return Err(TessellateError::RaggedIndices(indices.len()));
  }
  if let Some(&index) = indices.iter().find(|&&i| i >= point_count) {
    return Err(TessellateError::IndexOutOfRange { index, point_count });
  }
  Ok(())
}

/// Ear-clipping triangulation via `earcutr`.
#[derive(Clone, Copy, Debug, Default)]
pub struct EarcutTessellator;

impl Tessellator for EarcutTessellator {
  fn tessellate(&self, coords: &[f64], hole_starts: &[usize]) -> Result<Vec<usize>, TessellateError> {
    if coords.len() < 6 {
      return Ok(Vec::new());
    }
    let indices = earcutr::earcut(coords, hole_starts, 2)
      .map_err(|e| TessellateError::Backend(format!("{:?}", e)))?;
    validate_indices(&indices, coords.len() / 2)?;
    Ok(indices)
  }
}

type Cdt = ConstrainedDelaunayTriangulation<Point2<f64>>;

/// Constrained Delaunay triangulation via `spade`.
///
/// Every ring edge becomes a constraint; faces whose centroid lies inside
/// the outer ring and outside every hole are kept. Produces better-shaped
/// triangles than ear clipping at a higher cost.
#[derive(Clone, Copy, Debug, Default)]
pub struct CdtTessellator;

/// Splits flat coordinates into rings using the hole start indices.
fn rings(coords: &[f64], hole_starts: &[usize]) -> Vec<std::ops::Range<usize>> {
  let point_count = coords.len() / 2;
  let mut bounds: Vec<usize> = Vec::with_capacity(hole_starts.len() + 2);
  bounds.push(0);
  bounds.extend(hole_starts.iter().map(|&s| s.min(point_count)));
  bounds.push(point_count);
  bounds.windows(2).map(|w| w[0]..w[1]).filter(|r| r.len() >= 3).collect()
}

impl Tessellator for CdtTessellator {
  fn tessellate(&self, coords: &[f64], hole_starts: &[usize]) -> Result<Vec<usize>, TessellateError> {
    let points: Vec<Vec2> = coords
      .chunks_exact(2)
      .map(|c| Vec2::new(c[0] as f32, c[1] as f32))
      .collect();
    let rings = rings(coords, hole_starts);
    let Some(outer) = rings.first() else {
      return Ok(Vec::new());
    };

    let mut cdt = Cdt::new();
    let mut handles: Vec<FixedVertexHandle> = Vec::with_capacity(points.len());
    for c in coords.chunks_exact(2) {
      let handle = cdt
        .insert(Point2::new(c[0], c[1]))
        .map_err(|e| TessellateError::Backend(format!("{:?}", e)))?;
      handles.push(handle);
    }

    for ring in &rings {
      for i in ring.clone() {
        let j = if i + 1 == ring.end { ring.start } else { i + 1 };
        // Coincident handles cannot be constrained; nothing to enforce there.
        if handles[i] != handles[j] {
          let _ = cdt.add_constraint(handles[i], handles[j]);
        }
      }
    }

    // First point wins when two input points share a position.
    let mut handle_to_index: HashMap<FixedVertexHandle, usize> = HashMap::new();
    for (idx, &handle) in handles.iter().enumerate() {
      handle_to_index.entry(handle).or_insert(idx);
    }

    let outer_ring = &points[outer.clone()];
    let hole_rings: Vec<&[Vec2]> = rings[1..].iter().map(|r| &points[r.clone()]).collect();

    let mut indices = Vec::new();
    for face in cdt.inner_faces() {
      let verts = face.vertices();
      let positions: [Vec2; 3] = std::array::from_fn(|i| {
        let pos = verts[i].position();
        Vec2::new(pos.x as f32, pos.y as f32)
      });
      let centroid = (positions[0] + positions[1] + positions[2]) / 3.0;

      if !point_in_polygon(centroid, outer_ring)
        || hole_rings.iter().any(|hole| point_in_polygon(centroid, hole))
      {
        continue;
      }

      let idx0 = handle_to_index.get(&verts[0].fix());
      let idx1 = handle_to_index.get(&verts[1].fix());
      let idx2 = handle_to_index.get(&verts[2].fix());
      if let (Some(&i0), Some(&i1), Some(&i2)) = (idx0, idx1, idx2) {
        indices.extend([i0, i1, i2]);
      }
    }

    validate_indices(&indices, points.len())?;
    Ok(indices)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn triangle_area(coords: &[f64], tri: &[usize]) -> f64 {
    let p = |i: usize| (coords[i * 2], coords[i * 2 + 1]);
    let (ax, ay) = p(tri[0]);
    let (bx, by) = p(tri[1]);
    let (cx, cy) = p(tri[2]);
    ((bx - ax) * (cy - ay) - (by - ay) * (cx - ax)).abs() * 0.5
  }

  fn total_area(coords: &[f64], indices: &[usize]) -> f64 {
    indices.chunks_exact(3).map(|t| triangle_area(coords, t)).sum()
  }

  /// 4x4 square with a 2x2 hole in the middle.
  fn square_with_hole() -> (Vec<f64>, Vec<usize>) {
    let coords = vec![
      0.0, 0.0, 4.0, 0.0, 4.0, 4.0, 0.0, 4.0, // outer
      1.0, 1.0, 1.0, 3.0, 3.0, 3.0, 3.0, 1.0, // hole
    ];
    (coords, vec![4])
  }

  #[test]
  fn rings_split_on_hole_starts() {
    let (coords, holes) = square_with_hole();
    assert_eq!(rings(&coords, &holes), vec![0..4, 4..8]);
  }

  #[test]
  fn earcut_square_with_hole() {
    let (coords, holes) = square_with_hole();
    let indices = EarcutTessellator.tessellate(&coords, &holes).unwrap();
    assert_eq!(indices.len() % 3, 0);
    assert!((total_area(&coords, &indices) - 12.0).abs() < 1e-9);
  }

  #[test]
  fn cdt_square_with_hole() {
    let (coords, holes) = square_with_hole();
    let indices = CdtTessellator.tessellate(&coords, &holes).unwrap();
    assert_eq!(indices.len(), 8 * 3);
    assert!((total_area(&coords, &indices) - 12.0).abs() < 1e-9);
  }

  #[test]
  fn too_few_points_yield_nothing() {
    assert!(EarcutTessellator.tessellate(&[0.0, 0.0, 1.0, 1.0], &[]).unwrap().is_empty());
    assert!(CdtTessellator.tessellate(&[0.0, 0.0, 1.0, 1.0], &[]).unwrap().is_empty());
  }

  #[test]
  fn validate_rejects_bad_output() {
    assert_eq!(validate_indices(&[0, 1], 3), Err(TessellateError::RaggedIndices(2)));
    assert_eq!(
      validate_indices(&[0, 1, 5], 3),
      Err(TessellateError::IndexOutOfRange {
        index: 5,
        point_count: 3
      })
    );
  }
}
