use bevy::math::{IVec2, Rect, Vec2};

/// An integer rectangle, used for mesh bounds, raster chunks and grid
/// blocks.
///
/// Covers the closed interval `[x, x + width] × [y, y + height]` for
/// intersection purposes, so rectangles that only touch still intersect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IntRect {
  pub x: i32,
  pub y: i32,
  pub width: i32,
  pub height: i32,
}

impl IntRect {
  /// Creates a new rectangle.
  #[inline]
  pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  /// Creates a rectangle spanning two corners.
  #[inline]
  pub fn from_corners(min: IVec2, max: IVec2) -> Self {
    Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
  }

  /// Smallest integer rectangle containing every point.
  ///
  /// Returns `None` for an empty iterator.
  pub fn enclosing(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
    let mut iter = points.into_iter();
    let first = iter.next()?;
    let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
    Some(Self::from_corners(
      min.floor().as_ivec2(),
      max.ceil().as_ivec2(),
    ))
  }

  /// Smallest integer rectangle covering a world rectangle.
  pub fn covering(rect: Rect) -> Self {
    Self::from_corners(rect.min.floor().as_ivec2(), rect.max.ceil().as_ivec2())
  }

  #[inline]
  pub fn min(&self) -> IVec2 {
    IVec2::new(self.x, self.y)
  }

  #[inline]
  pub fn max(&self) -> IVec2 {
    IVec2::new(self.x + self.width, self.y + self.height)
  }

  #[inline]
  pub fn right(&self) -> i32 {
    self.x + self.width
  }

  #[inline]
  pub fn bottom(&self) -> i32 {
    self.y + self.height
  }

  /// Returns true if the closed rectangles overlap or touch.
  pub fn intersects(&self, other: &IntRect) -> bool {
    self.x <= other.right()
      && other.x <= self.right()
      && self.y <= other.bottom()
      && other.y <= self.bottom()
  }

  /// Returns true if `other` lies entirely within this rectangle.
  pub fn contains_rect(&self, other: &IntRect) -> bool {
    other.x >= self.x
      && other.y >= self.y
      && other.right() <= self.right()
      && other.bottom() <= self.bottom()
  }

  /// Smallest rectangle containing both.
  pub fn union(&self, other: &IntRect) -> Self {
    Self::from_corners(self.min().min(other.min()), self.max().max(other.max()))
  }

  /// Clamps this rect to fit within `[0, bound_width] × [0, bound_height]`.
  pub fn clamped(&self, bound_width: i32, bound_height: i32) -> Self {
    let x = self.x.clamp(0, bound_width);
    let y = self.y.clamp(0, bound_height);
    let right = self.right().clamp(x, bound_width);
    let bottom = self.bottom().clamp(y, bound_height);
    Self::new(x, y, right - x, bottom - y)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn touching_rects_intersect() {
    let a = IntRect::new(0, 0, 10, 10);
    let b = IntRect::new(10, 0, 5, 5);
    assert!(a.intersects(&b));
    assert!(!a.intersects(&IntRect::new(11, 0, 5, 5)));
  }

  #[test]
  fn enclosing_rounds_outward() {
    let rect = IntRect::enclosing([Vec2::new(-0.5, 1.5), Vec2::new(3.5, 2.0)]).unwrap();
    assert_eq!(rect, IntRect::new(-1, 1, 5, 1));
  }

  #[test]
  fn clamped_stays_inside_bounds() {
    let rect = IntRect::new(-3, 8, 10, 10).clamped(12, 12);
    assert_eq!(rect, IntRect::new(0, 8, 7, 4));
  }
}
