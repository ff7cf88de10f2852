use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Sub};

/// 2D vector used for agent positions, velocities and steering forces
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Vector with both components set to `v`
    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v }
    }

    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length_sq().sqrt()
    }

    #[inline]
    pub fn length_sq(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Unit vector in the same direction, or zero for a zero-length vector
    #[inline]
    pub fn normalize(&self) -> Self {
        self.safe_div_scalar(self.length())
    }

    #[inline]
    pub fn distance_sq_to(&self, other: Vec2) -> f32 {
        (*self - other).length_sq()
    }

    /// Component-wise division where a zero divisor component yields zero.
    ///
    /// Every steering formula divides by lengths and neighbour counts that can
    /// legitimately be zero; this keeps NaN and infinity out of agent state.
    #[inline]
    pub fn safe_div(&self, divisor: Vec2) -> Self {
        Self {
            x: if divisor.x == 0.0 { 0.0 } else { self.x / divisor.x },
            y: if divisor.y == 0.0 { 0.0 } else { self.y / divisor.y },
        }
    }

    /// `safe_div` by the same scalar in both components
    #[inline]
    pub fn safe_div_scalar(&self, divisor: f32) -> Self {
        self.safe_div(Vec2::splat(divisor))
    }

    /// Caps the magnitude at `max`. A non-positive `max` leaves the vector as is.
    pub fn clamp_length(&self, max: f32) -> Self {
        if max > 0.0 && self.length_sq() > max * max {
            self.normalize() * max
        } else {
            *self
        }
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}
