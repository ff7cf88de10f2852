//! Boids simulation: agents, flocking rules and the tick engine

pub mod agent;
pub mod constants;
pub mod engine;
pub mod flocking;
pub mod performance;

pub use agent::Agent;
pub use engine::{Simulation, SimulationError};
pub use flocking::{FlockParams, FlockWeights, Integration};
