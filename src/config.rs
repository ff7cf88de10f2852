use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::sim::constants::{index, world};
use crate::sim::flocking::FlockParams;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Simulation dimensions must be positive, got {0}x{1}")]
    InvalidDimensions(f32, f32),
    #[error("quadtree_capacity must be at least 1")]
    ZeroQuadtreeCapacity,
    #[error("max_speed must be positive, got {0}")]
    InvalidMaxSpeed(f32),
    #[error("max_force must be non-negative, got {0}")]
    InvalidMaxForce(f32),
    #[error("Neighbourhood must have non-negative extents, got {0}x{1}")]
    InvalidNeighbourhood(f32, f32),
    #[error("target_tick_rate must be at least 1")]
    ZeroTickRate,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// World width; agents live in `[0, width]`
    pub width: f32,
    /// World height; agents live in `[0, height]`
    pub height: f32,
    /// Number of agents spawned
    pub agent_count: usize,
    /// Worker threads (0 falls back to the pool default)
    pub thread_count: usize,
    /// Agents per quadtree node before it subdivides
    pub quadtree_capacity: usize,
    /// Tick rate the timing budget is measured against
    pub target_tick_rate: u32,
    /// RNG seed for the initial population (random if unset)
    pub seed: Option<u64>,
    /// Ticks the headless driver runs before exiting
    pub run_ticks: u64,
    pub flocking: FlockParams,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: world::WIDTH,
            height: world::HEIGHT,
            agent_count: world::AGENT_COUNT,
            thread_count: index::THREAD_COUNT,
            quadtree_capacity: index::QUADTREE_CAPACITY,
            target_tick_rate: 120,
            seed: None,
            run_ticks: 1200,
            flocking: FlockParams::default(),
        }
    }
}

impl SimulationConfig {
    /// Config of the given size with every other setting at its default
    pub fn with_size(width: f32, height: f32, agent_count: usize) -> Self {
        Self {
            width,
            height,
            agent_count,
            ..Self::default()
        }
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load config from `FLOCK_CONFIG` (if set) and environment overrides,
    /// falling back to defaults for anything missing or invalid
    pub fn load_or_default() -> Self {
        let mut config = match std::env::var("FLOCK_CONFIG") {
            Ok(path) => match Self::from_json_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Could not load FLOCK_CONFIG '{}': {}, using defaults", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };

        if let Some(width) = env_parse::<f32>("FLOCK_WIDTH", |v| is_extent(*v)) {
            config.width = width;
        }
        if let Some(height) = env_parse::<f32>("FLOCK_HEIGHT", |v| is_extent(*v)) {
            config.height = height;
        }
        if let Some(agents) = env_parse::<usize>("FLOCK_AGENTS", |_| true) {
            config.agent_count = agents;
        }
        if let Some(threads) = env_parse::<usize>("FLOCK_THREADS", |v| *v <= 1024) {
            config.thread_count = threads;
        }
        if let Some(capacity) = env_parse::<usize>("FLOCK_QUADTREE_CAPACITY", |v| *v > 0) {
            config.quadtree_capacity = capacity;
        }
        if let Some(speed) = env_parse::<f32>("FLOCK_MAX_SPEED", |v| *v > 0.0) {
            config.flocking.max_speed = speed;
        }
        if let Some(force) = env_parse::<f32>("FLOCK_MAX_FORCE", |v| *v >= 0.0) {
            config.flocking.max_force = force;
        }
        if let Some(seed) = env_parse::<u64>("FLOCK_SEED", |_| true) {
            config.seed = Some(seed);
        }
        if let Some(ticks) = env_parse::<u64>("FLOCK_TICKS", |_| true) {
            config.run_ticks = ticks;
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(is_extent(self.width) && is_extent(self.height)) {
            return Err(ConfigError::InvalidDimensions(self.width, self.height));
        }
        if self.quadtree_capacity == 0 {
            return Err(ConfigError::ZeroQuadtreeCapacity);
        }
        if self.target_tick_rate == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        let flocking = &self.flocking;
        if !(flocking.max_speed > 0.0) {
            return Err(ConfigError::InvalidMaxSpeed(flocking.max_speed));
        }
        if !(flocking.max_force >= 0.0) {
            return Err(ConfigError::InvalidMaxForce(flocking.max_force));
        }
        if !(flocking.neighbourhood_width >= 0.0 && flocking.neighbourhood_height >= 0.0) {
            return Err(ConfigError::InvalidNeighbourhood(
                flocking.neighbourhood_width,
                flocking.neighbourhood_height,
            ));
        }
        Ok(())
    }
}

/// A usable world dimension: finite and strictly positive
fn is_extent(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// Read and parse an env var, warning and returning None when it is
/// unparsable or fails `accept`
fn env_parse<T>(key: &str, accept: impl Fn(&T) -> bool) -> Option<T>
where
    T: std::str::FromStr,
{
    let raw = std::env::var(key).ok()?;
    match raw.parse::<T>() {
        Ok(value) if accept(&value) => Some(value),
        Ok(_) => {
            tracing::warn!("{} value '{}' out of range, using default", key, raw);
            None
        }
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", key, raw);
            None
        }
    }
}
