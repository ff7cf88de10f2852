use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flocksim::config::SimulationConfig;
use flocksim::sim::constants::world;
use flocksim::sim::Simulation;

/// Ticks between progress reports
const REPORT_INTERVAL: u64 = 240;

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Flocksim v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = SimulationConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: {}x{}, agents={}, threads={}, capacity={}",
        config.width, config.height, config.agent_count, config.thread_count, config.quadtree_capacity
    );

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let run_ticks = config.run_ticks;
    let mut sim = Simulation::new(config, &mut rng)?;

    for _ in 0..run_ticks {
        sim.tick(world::DT);

        if sim.ticks() % REPORT_INTERVAL == 0 {
            let stats = sim.stats();
            info!(
                "Tick {}: avg={:?} p95={:?} max={:?} budget={:.1}%",
                stats.ticks, stats.average, stats.p95, stats.max, stats.budget_usage_percent
            );
        }
    }

    let stats = sim.stats();
    info!(
        "Finished {} ticks, avg tick {:?}, p95 {:?}",
        sim.ticks(),
        stats.average,
        stats.p95
    );

    Ok(())
}
