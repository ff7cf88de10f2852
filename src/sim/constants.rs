/// World defaults used by the headless driver
pub mod world {
    /// Simulation width in world units
    pub const WIDTH: f32 = 1600.0;
    /// Simulation height in world units
    pub const HEIGHT: f32 = 1000.0;
    /// Agents spawned at startup
    pub const AGENT_COUNT: usize = 1000;
    /// Fixed timestep used when no frame clock drives the simulation
    pub const DT: f32 = 1.0 / 120.0;
}

/// Steering constants
pub mod flocking {
    /// Speed cap for every agent (units per second)
    pub const MAX_SPEED: f32 = 200.0;
    /// Cap on each steering correction
    pub const MAX_FORCE: f32 = 50.0;
    /// Full width of the neighbourhood window centered on an agent
    pub const NEIGHBOURHOOD_WIDTH: f32 = 40.0;
    /// Full height of the neighbourhood window centered on an agent
    pub const NEIGHBOURHOOD_HEIGHT: f32 = 30.0;
    /// Squared distance under which a neighbour pushes an agent away
    pub const SEPARATION_DISTANCE_SQ: f32 = NEIGHBOURHOOD_WIDTH * NEIGHBOURHOOD_HEIGHT / 9.0;

    /// Rule weights applied when combining the three steering terms
    pub mod weights {
        pub const SEPARATION: f32 = 2.0;
        pub const ALIGNMENT: f32 = 2.0;
        pub const COHESION: f32 = 3.0;
    }
}

/// Spatial index and scheduling constants
pub mod index {
    /// Agents a quadtree node holds before subdividing
    pub const QUADTREE_CAPACITY: usize = 85;
    /// Worker threads updating agent chunks
    pub const THREAD_COUNT: usize = 4;
}
