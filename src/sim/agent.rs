use serde::{Deserialize, Serialize};

use crate::spatial::InRange;
use crate::util::rect::Rect;
use crate::util::vec2::Vec2;

/// A simulated flocking agent (boid). No identity beyond its buffer slot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl Agent {
    #[inline]
    pub const fn new(position: Vec2, velocity: Vec2) -> Self {
        Self { position, velocity }
    }

    /// Squared euclidean distance between two agents
    #[inline]
    pub fn distance_sq(&self, other: &Agent) -> f32 {
        self.position.distance_sq_to(other.position)
    }

    /// Detection window of the given full size centered on this agent
    #[inline]
    pub fn neighbourhood(&self, width: f32, height: f32) -> Rect {
        Rect::centered(self.position, width, height)
    }
}

impl InRange for Agent {
    #[inline]
    fn in_range(&self, rect: &Rect) -> bool {
        rect.contains_point(self.position)
    }
}
