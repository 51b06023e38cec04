use std::fs;

use dotenv::dotenv;
use firerescue::infra::{CompositeObserver, DefaultObserver, TraceObserver};
use firerescue::rl::EvaluationMetrics;
use firerescue::simulation::{DEFAULT_LAYOUT, Simulation, run_realtime};
use firerescue::{Layout, SimConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("firerescue=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load_layout(config: &SimConfig) -> Result<Layout, Box<dyn std::error::Error>> {
    let layout = match &config.map_path {
        Some(path) => {
            info!("Loading map from {}", path);
            Layout::parse(&fs::read_to_string(path)?)?
        }
        None => Layout::parse(DEFAULT_LAYOUT)?,
    };
    Ok(layout)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging()?;

    let config = SimConfig::from_env()?;
    let layout = load_layout(&config)?;

    let rng = match config.seed {
        Some(seed) => {
            info!("Using seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let mut observer = CompositeObserver::new().with(DefaultObserver);
    if let Some(folder) = &config.trace_folder {
        observer = observer.with(TraceObserver::new(folder)?);
    }

    info!(
        "Running {} episode(s), {} mode",
        config.episodes,
        if config.realtime { "realtime" } else { "headless" }
    );

    let mut sim = Simulation::new(layout, &config.simulation, rng, observer)?;
    let mut metrics = EvaluationMetrics::default();

    for episode in 0..config.episodes {
        if episode > 0 {
            sim.reset_episode();
        }

        let summary = if config.realtime {
            run_realtime(&mut sim, config.time_scale).await?
        } else {
            sim.run_episode(config.max_ticks)
        };

        match summary {
            Some(summary) => metrics.record_episode(&summary),
            None => warn!(
                "Episode {} did not finish within {} ticks",
                episode, config.max_ticks
            ),
        }
    }

    if config.episodes > 1 {
        metrics.print_summary();
    }

    Ok(())
}
