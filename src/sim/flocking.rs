//! Separation, alignment and cohesion steering plus integration
//!
//! Everything here is a pure function of one agent and its neighbours from
//! the same generation, so chunks of agents can be updated on any thread.

use serde::{Deserialize, Serialize};

use crate::sim::agent::Agent;
use crate::sim::constants::flocking;
use crate::util::vec2::Vec2;

/// Multipliers applied to each rule when forming the acceleration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FlockWeights {
    pub separation: f32,
    pub alignment: f32,
    pub cohesion: f32,
}

impl Default for FlockWeights {
    fn default() -> Self {
        Self {
            separation: flocking::weights::SEPARATION,
            alignment: flocking::weights::ALIGNMENT,
            cohesion: flocking::weights::COHESION,
        }
    }
}

/// Which velocity moves the agent during integration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Integration {
    /// `position += old_velocity * dt` (semi-implicit, the default)
    #[default]
    PreAcceleration,
    /// `position += new_velocity * dt`
    PostAcceleration,
}

/// Tunables for the flocking rules
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlockParams {
    pub max_speed: f32,
    pub max_force: f32,
    pub neighbourhood_width: f32,
    pub neighbourhood_height: f32,
    /// Neighbours closer than this (squared distance) contribute separation
    pub separation_distance_sq: f32,
    pub weights: FlockWeights,
    pub integration: Integration,
}

impl Default for FlockParams {
    fn default() -> Self {
        Self {
            max_speed: flocking::MAX_SPEED,
            max_force: flocking::MAX_FORCE,
            neighbourhood_width: flocking::NEIGHBOURHOOD_WIDTH,
            neighbourhood_height: flocking::NEIGHBOURHOOD_HEIGHT,
            separation_distance_sq: flocking::SEPARATION_DISTANCE_SQ,
            weights: FlockWeights::default(),
            integration: Integration::default(),
        }
    }
}

/// Steering corrections from the three rules, each capped at `max_force`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Steering {
    pub separation: Vec2,
    pub alignment: Vec2,
    pub cohesion: Vec2,
}

impl Steering {
    /// Weighted sum of the three rules
    pub fn acceleration(&self, weights: &FlockWeights) -> Vec2 {
        self.separation * weights.separation
            + self.alignment * weights.alignment
            + self.cohesion * weights.cohesion
    }
}

/// Compute the steering for `agent` from the candidates returned by a
/// neighbourhood query.
///
/// Candidates at exactly the agent's position (the agent itself included)
/// are skipped. With no remaining neighbours all three terms stay zero.
pub fn steering<'a, I>(agent: &Agent, neighbours: I, params: &FlockParams) -> Steering
where
    I: IntoIterator<Item = &'a Agent>,
{
    let mut separation = Vec2::ZERO;
    let mut alignment = Vec2::ZERO;
    let mut cohesion = Vec2::ZERO;
    let mut count = 0usize;

    for other in neighbours {
        if other.position == agent.position {
            continue;
        }
        count += 1;

        if agent.distance_sq(other) < params.separation_distance_sq {
            // Push away, weighted by inverse distance
            let diff = agent.position - other.position;
            let dist = diff.length();
            separation += diff.safe_div_scalar(dist).safe_div_scalar(dist);
        }
        alignment += other.velocity;
        cohesion += other.position;
    }

    if count == 0 {
        return Steering::default();
    }

    let n = count as f32;
    let separation = separation.safe_div_scalar(n);
    let alignment = alignment.safe_div_scalar(n);
    let centroid = cohesion.safe_div_scalar(n);

    Steering {
        separation: steer(agent.velocity, separation, params),
        alignment: steer(agent.velocity, alignment, params),
        cohesion: steer(agent.velocity, centroid - agent.position, params),
    }
}

/// Reynolds steering: aim for `direction` at full speed, capped at `max_force`.
///
/// A zero direction means the rule has nothing to say and yields no steering,
/// unlike plain re-steering, which would brake with `-velocity` capped at `max_force`.
pub fn steer(velocity: Vec2, direction: Vec2, params: &FlockParams) -> Vec2 {
    let desired = direction.normalize();
    if desired == Vec2::ZERO {
        return Vec2::ZERO;
    }
    (desired * params.max_speed - velocity).clamp_length(params.max_force)
}

/// Produce the next-generation state of `agent` given its steering
pub fn integrate(agent: &Agent, steering: &Steering, params: &FlockParams, dt: f32) -> Agent {
    let acceleration = steering.acceleration(&params.weights) * dt;
    let velocity = (agent.velocity + acceleration).clamp_length(params.max_speed);
    let moved_by = match params.integration {
        Integration::PreAcceleration => agent.velocity,
        Integration::PostAcceleration => velocity,
    };

    Agent {
        position: agent.position + moved_by * dt,
        velocity,
    }
}

/// Full per-agent update: steering from `neighbours`, then integration
#[inline]
pub fn update_agent<'a, I>(agent: &Agent, neighbours: I, params: &FlockParams, dt: f32) -> Agent
where
    I: IntoIterator<Item = &'a Agent>,
{
    let steering = steering(agent, neighbours, params);
    integrate(agent, &steering, params, dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn agent(px: f32, py: f32, vx: f32, vy: f32) -> Agent {
        Agent::new(Vec2::new(px, py), Vec2::new(vx, vy))
    }

    #[test]
    fn test_no_neighbours_no_steering() {
        let params = FlockParams::default();
        let a = agent(10.0, 10.0, 5.0, 0.0);
        assert_eq!(
            steering(&a, std::iter::empty::<&Agent>(), &params),
            Steering::default()
        );
    }

    #[test]
    fn test_self_is_skipped() {
        let params = FlockParams::default();
        let a = agent(10.0, 10.0, 5.0, 0.0);
        let twin = agent(10.0, 10.0, -100.0, 30.0);
        assert_eq!(steering(&a, [&a, &twin], &params), Steering::default());
    }

    #[test]
    fn test_stationary_isolated_agent_stays_finite() {
        let params = FlockParams::default();
        let a = Agent::default();
        let next = update_agent(&a, [&a], &params, 0.016);
        assert_eq!(next, a);
        assert!(next.position.x.is_finite() && next.velocity.x.is_finite());
    }

    #[test]
    fn test_separation_points_away() {
        let params = FlockParams::default();
        let a = agent(10.0, 10.0, 0.0, 0.0);
        let close = agent(12.0, 10.0, 0.0, 0.0);
        let s = steering(&a, [&close], &params);
        assert!(s.separation.x < 0.0);
        assert!(s.separation.y.abs() < EPSILON);
    }

    #[test]
    fn test_separation_ignores_distant_neighbour() {
        let params = FlockParams::default();
        let a = agent(10.0, 10.0, 0.0, 0.0);
        // 15 units apart: squared distance 225 > 1200 / 9
        let far = agent(25.0, 10.0, 0.0, 0.0);
        let s = steering(&a, [&far], &params);
        assert_eq!(s.separation, Vec2::ZERO);
        assert!(s.cohesion.x > 0.0);
    }

    #[test]
    fn test_zero_direction_does_not_brake() {
        let params = FlockParams::default();
        assert_eq!(steer(Vec2::new(120.0, -40.0), Vec2::ZERO, &params), Vec2::ZERO);

        // Moving agent whose only neighbour is beyond the separation threshold
        let a = agent(10.0, 10.0, 80.0, 0.0);
        let far = agent(25.0, 10.0, 80.0, 0.0);
        assert_eq!(steering(&a, [&far], &params).separation, Vec2::ZERO);
    }

    #[test]
    fn test_alignment_matches_heading() {
        let params = FlockParams::default();
        let a = agent(0.0, 0.0, 0.0, 0.0);
        let n1 = agent(15.0, 0.0, 0.0, 10.0);
        let n2 = agent(-15.0, 0.0, 0.0, 30.0);
        let s = steering(&a, [&n1, &n2], &params);
        assert!(s.alignment.y > 0.0);
        assert!(s.alignment.x.abs() < EPSILON);
    }

    #[test]
    fn test_steering_capped_by_max_force() {
        let params = FlockParams::default();
        let a = agent(0.0, 0.0, -150.0, 0.0);
        let n = agent(1.0, 0.0, 150.0, 0.0);
        let s = steering(&a, [&n], &params);
        for term in [s.separation, s.alignment, s.cohesion] {
            assert!(term.length() <= params.max_force + EPSILON);
        }
    }

    #[test]
    fn test_acceleration_weights() {
        let s = Steering {
            separation: Vec2::new(1.0, 0.0),
            alignment: Vec2::new(0.0, 1.0),
            cohesion: Vec2::new(1.0, 1.0),
        };
        let a = s.acceleration(&FlockWeights::default());
        assert_eq!(a, Vec2::new(5.0, 5.0));

        let custom = FlockWeights {
            separation: 1.0,
            alignment: 2.0,
            cohesion: 5.0,
        };
        assert_eq!(s.acceleration(&custom), Vec2::new(6.0, 7.0));
    }

    #[test]
    fn test_integration_uses_old_velocity_for_position() {
        let params = FlockParams::default();
        let a = agent(0.0, 0.0, 10.0, 0.0);
        let s = Steering {
            separation: Vec2::ZERO,
            alignment: Vec2::new(0.0, 10.0),
            cohesion: Vec2::ZERO,
        };
        let next = integrate(&a, &s, &params, 0.5);
        assert_eq!(next.position, Vec2::new(5.0, 0.0));
        // alignment weight 2 * 10 * 0.5
        assert_eq!(next.velocity, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_post_acceleration_integration() {
        let params = FlockParams {
            integration: Integration::PostAcceleration,
            ..FlockParams::default()
        };
        let a = agent(0.0, 0.0, 10.0, 0.0);
        let s = Steering {
            separation: Vec2::ZERO,
            alignment: Vec2::new(0.0, 10.0),
            cohesion: Vec2::ZERO,
        };
        let next = integrate(&a, &s, &params, 0.5);
        assert_eq!(next.position, Vec2::new(5.0, 5.0));
    }

    #[test]
    fn test_velocity_clamped_to_max_speed() {
        let params = FlockParams::default();
        let a = agent(0.0, 0.0, 190.0, 0.0);
        let s = Steering {
            separation: Vec2::new(50.0, 0.0),
            alignment: Vec2::new(50.0, 0.0),
            cohesion: Vec2::new(50.0, 0.0),
        };
        let next = integrate(&a, &s, &params, 1.0);
        assert!((next.velocity.length() - params.max_speed).abs() < EPSILON);
    }
}
