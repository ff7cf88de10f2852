//! Axis-aligned rectangle described by its center and half extents

use serde::{Deserialize, Serialize};

use crate::util::vec2::Vec2;

/// Axis-aligned bounding rectangle.
///
/// Edges are inclusive: a point on the boundary is contained, and two
/// rectangles sharing an edge intersect.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Rect {
    pub center: Vec2,
    pub half_width: f32,
    pub half_height: f32,
}

impl Rect {
    /// Create a rectangle from its center and half extents.
    ///
    /// Half extents must be non-negative.
    #[inline]
    pub fn new(center: Vec2, half_width: f32, half_height: f32) -> Self {
        debug_assert!(
            half_width >= 0.0 && half_height >= 0.0,
            "rect half extents must be non-negative"
        );
        Self {
            center,
            half_width,
            half_height,
        }
    }

    /// Rectangle spanning `[0, width] x [0, height]`
    pub fn from_size(width: f32, height: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self::new(Vec2::new(hw, hh), hw, hh)
    }

    /// Rectangle of the given full size centered on `center`
    pub fn centered(center: Vec2, width: f32, height: f32) -> Self {
        Self::new(center, width / 2.0, height / 2.0)
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        Vec2::new(self.center.x - self.half_width, self.center.y - self.half_height)
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.center.x + self.half_width, self.center.y + self.half_height)
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.half_width * 2.0
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.half_height * 2.0
    }

    #[inline]
    pub fn contains_point(&self, point: Vec2) -> bool {
        let (min, max) = (self.min(), self.max());
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }

    /// Do the two rectangles overlap (touching edges count)
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        let (min, max) = (self.min(), self.max());
        let (o_min, o_max) = (other.min(), other.max());
        !(o_min.x > max.x || o_max.x < min.x || o_min.y > max.y || o_max.y < min.y)
    }

    /// Is this rectangle fully contained within `other`
    #[inline]
    pub fn is_inside(&self, other: &Rect) -> bool {
        let (min, max) = (self.min(), self.max());
        let (o_min, o_max) = (other.min(), other.max());
        min.x >= o_min.x && max.x <= o_max.x && min.y >= o_min.y && max.y <= o_max.y
    }

    /// Split into the four quadrants, in NE, SE, SW, NW order.
    ///
    /// Each quadrant has half the parent's half extents and its center offset
    /// diagonally by those new half extents, so the four tile the parent.
    pub fn quadrants(&self) -> [Rect; 4] {
        let hw = self.half_width / 2.0;
        let hh = self.half_height / 2.0;
        let c = self.center;
        [
            Rect::new(Vec2::new(c.x + hw, c.y + hh), hw, hh),
            Rect::new(Vec2::new(c.x + hw, c.y - hh), hw, hh),
            Rect::new(Vec2::new(c.x - hw, c.y - hh), hw, hh),
            Rect::new(Vec2::new(c.x - hw, c.y + hh), hw, hh),
        ]
    }
}
