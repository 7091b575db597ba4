//! Outer/hole classification of traced shapes.

use bevy::math::Vec2;

use super::trace::Shape;

/// Tests if a point is inside a polygon using the ray casting algorithm.
pub fn point_in_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
  let n = polygon.len();
  if n < 3 {
    return false;
  }

  let mut inside = false;
  let mut j = n - 1;
  for i in 0..n {
    let vi = polygon[i];
    let vj = polygon[j];

    // Check if the ray from point going right crosses this edge
    if ((vi.y > point.y) != (vj.y > point.y))
      && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
    {
      inside = !inside;
    }
    j = i;
  }

  inside
}

/// Role of a shape after containment testing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShapeRole {
  /// A top-level shape and the indices of every shape inside it.
  Outer { holes: Vec<usize> },
  /// Contained in at least one other shape.
  Hole,
}

/// Classifies every shape by pairwise point-in-polygon tests.
///
/// A shape whose first point lies inside another shape is a hole of that
/// shape. Containment is not reduced to the immediate parent: a shape
/// nested several levels deep is listed as a hole of every shape that
/// contains it, and only shapes contained by nothing remain outers.
pub fn classify_shapes(shapes: &[Shape]) -> Vec<ShapeRole> {
  let polygons: Vec<Vec<Vec2>> = shapes.iter().map(Shape::points).collect();
  let mut holes_of: Vec<Vec<usize>> = vec![Vec::new(); shapes.len()];
  let mut is_hole = vec![false; shapes.len()];

  for (outer, polygon) in polygons.iter().enumerate() {
    for (candidate, shape) in shapes.iter().enumerate() {
      if candidate == outer {
        continue;
      }
      let Some(point) = shape.first_point() else {
        continue;
      };
      if point_in_polygon(point, polygon) {
        holes_of[outer].push(candidate);
        is_hole[candidate] = true;
      }
    }
  }

  holes_of
    .into_iter()
    .zip(is_hole)
    .map(|(holes, hole)| {
      if hole {
        ShapeRole::Hole
      } else {
        ShapeRole::Outer { holes }
      }
    })
    .collect()
}

/// An outer contour with the contours cut out of it.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeGroup {
  pub outer: Shape,
  pub holes: Vec<Shape>,
}

impl ShapeGroup {
  /// Total number of polygon points across the outer ring and holes.
  pub fn point_count(&self) -> usize {
    self.outer.len() + self.holes.iter().map(Shape::len).sum::<usize>()
  }
}

/// Groups shapes into outers with their holes, in shape order.
///
/// Holes are only reachable through the outers that contain them.
pub fn group_shapes(shapes: &[Shape]) -> Vec<ShapeGroup> {
  classify_shapes(shapes)
    .into_iter()
    .enumerate()
    .filter_map(|(i, role)| match role {
      ShapeRole::Outer { holes } => Some(ShapeGroup {
        outer: shapes[i].clone(),
        holes: holes.into_iter().map(|h| shapes[h].clone()).collect(),
      }),
      ShapeRole::Hole => None,
    })
    .collect()
}
