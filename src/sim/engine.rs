//! Simulation engine
//!
//! Per tick:
//! 1. Build a quadtree over the current generation inside the tick arena
//! 2. Split the population into one contiguous chunk per worker
//! 3. Workers update their chunk into the next-generation buffer
//! 4. Join, clear the arena, swap buffers, wrap positions around the edges

use std::io;
use std::ops::Range;
use std::time::Instant;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, SimulationConfig};
use crate::pool::WorkerPool;
use crate::sim::agent::Agent;
use crate::sim::flocking::{self, FlockParams};
use crate::sim::performance::{TickStats, TickStatsSnapshot};
use crate::spatial::{QuadTree, TreeArena};
use crate::util::rect::Rect;
use crate::util::vec2::Vec2;

/// Errors raised while setting up a simulation
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] io::Error),
}

/// A boids flocking simulation over a toroidal rectangle
pub struct Simulation {
    config: SimulationConfig,
    bounds: Rect,
    /// Generation buffers; `buffers[current]` is the readable generation
    buffers: [Vec<Agent>; 2],
    current: usize,
    tree_arena: TreeArena<Agent>,
    pool: WorkerPool,
    ticks: u64,
    stats: TickStats,
}

impl Simulation {
    /// Create a simulation with `config.agent_count` agents at uniformly random
    /// positions and random velocities up to the max speed.
    ///
    /// Seeding `rng` is the caller's business.
    pub fn new<R: Rng>(config: SimulationConfig, rng: &mut R) -> Result<Self, SimulationError> {
        // Sampling positions needs a non-empty, finite world
        config.validate()?;
        let agents = random_agents(&config, rng);
        Self::with_agents(config, agents)
    }

    /// Create a simulation from an explicit population.
    ///
    /// `config.agent_count` is overwritten with the population size.
    pub fn with_agents(mut config: SimulationConfig, agents: Vec<Agent>) -> Result<Self, SimulationError> {
        config.agent_count = agents.len();
        config.validate()?;

        let pool = WorkerPool::new(config.thread_count)?;
        let bounds = Rect::from_size(config.width, config.height);
        let next = vec![Agent::default(); agents.len()];

        info!(
            "Simulation created: {}x{}, {} agents, {} workers",
            config.width,
            config.height,
            agents.len(),
            pool.thread_count()
        );

        Ok(Self {
            stats: TickStats::new(config.target_tick_rate),
            config,
            bounds,
            buffers: [agents, next],
            current: 0,
            tree_arena: TreeArena::new(),
            pool,
            ticks: 0,
        })
    }

    /// Replace the population with a freshly randomized one
    pub fn reset<R: Rng>(&mut self, rng: &mut R) {
        let agents = random_agents(&self.config, rng);
        self.buffers[self.current] = agents;
        self.ticks = 0;
        info!("Simulation reset with {} agents", self.len());
    }

    /// Advance exactly one generation.
    ///
    /// `dt` is used as given; very large steps can carry agents arbitrarily far.
    pub fn tick(&mut self, dt: f32) {
        let started = Instant::now();
        let ranges = chunk_ranges(self.len(), self.pool.thread_count());
        let params = self.config.flocking;

        {
            let (current, next) = split_generations(&mut self.buffers, self.current);

            let mut tree = QuadTree::new(&mut self.tree_arena, self.config.quadtree_capacity, self.bounds);
            let rejected = current.iter().filter(|agent| !tree.insert(**agent)).count();
            if rejected > 0 {
                warn!("{} agents outside simulation bounds were not indexed", rejected);
            }

            let tree = &tree;
            let params = &params;
            self.pool.scope(|scope| {
                let mut rest = next;
                for range in &ranges {
                    let (output, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
                    rest = tail;
                    let input = &current[range.clone()];
                    let start = range.start;
                    let queued = scope.add_work(move || update_chunk(input, output, tree, params, dt));
                    if !queued {
                        warn!("Chunk starting at {} was not dispatched", start);
                    }
                }
            });
        }

        self.tree_arena.clear();
        self.current ^= 1;

        let (width, height) = (self.config.width, self.config.height);
        for agent in &mut self.buffers[self.current] {
            agent.position = wrap_position(agent.position, width, height);
        }

        self.ticks += 1;
        let elapsed = started.elapsed();
        self.stats.record(elapsed);
        debug!("Tick {} took {:?}", self.ticks, elapsed);
    }

    /// Current generation, valid until the next tick
    #[inline]
    pub fn agents(&self) -> &[Agent] {
        &self.buffers[self.current]
    }

    #[inline]
    pub fn agent(&self, index: usize) -> Option<&Agent> {
        self.agents().get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffers[self.current].len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.config.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.config.height
    }

    /// Ticks completed since creation or the last reset
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[inline]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn stats(&self) -> TickStatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.pool.shutdown();
        self.tree_arena.teardown();
        debug!("Simulation released after {} ticks", self.ticks);
    }
}

/// Split `n` items into `threads` contiguous ranges covering `0..n` exactly
/// once. The first `n % threads` ranges hold one extra item.
pub fn chunk_ranges(n: usize, threads: usize) -> Vec<Range<usize>> {
    let threads = threads.max(1);
    let chunk = n / threads;
    let slack = n % threads;

    let mut start = 0;
    (0..threads)
        .map(|i| {
            let len = chunk + usize::from(i < slack);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

/// Toroidal wraparound: below zero jumps to the far edge, beyond it to zero
pub fn wrap_position(position: Vec2, width: f32, height: f32) -> Vec2 {
    let mut wrapped = position;
    if position.x < 0.0 {
        wrapped.x = width;
    } else if position.x > width {
        wrapped.x = 0.0;
    }
    if position.y < 0.0 {
        wrapped.y = height;
    } else if position.y > height {
        wrapped.y = 0.0;
    }
    wrapped
}

/// Borrow the readable generation and the writable one
fn split_generations(buffers: &mut [Vec<Agent>; 2], current: usize) -> (&[Agent], &mut [Agent]) {
    let [first, second] = buffers;
    if current == 0 {
        (first.as_slice(), second.as_mut_slice())
    } else {
        (second.as_slice(), first.as_mut_slice())
    }
}

/// Update one chunk: `output[i]` is the next state of `input[i]`
fn update_chunk(
    input: &[Agent],
    output: &mut [Agent],
    tree: &QuadTree<'_, Agent>,
    params: &FlockParams,
    dt: f32,
) {
    let mut neighbours = Vec::new();
    for (agent, out) in input.iter().zip(output.iter_mut()) {
        neighbours.clear();
        let hood = agent.neighbourhood(params.neighbourhood_width, params.neighbourhood_height);
        tree.query_into(&hood, &mut neighbours);
        *out = flocking::update_agent(agent, &neighbours, params, dt);
    }
}

fn random_agents<R: Rng>(config: &SimulationConfig, rng: &mut R) -> Vec<Agent> {
    let max_speed = config.flocking.max_speed;
    (0..config.agent_count)
        .map(|_| {
            let position = Vec2::new(
                rng.gen_range(0.0..config.width),
                rng.gen_range(0.0..config.height),
            );
            let velocity = Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)) * max_speed;
            Agent::new(position, velocity.clamp_length(max_speed))
        })
        .collect()
}
