use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use antforage::config::load_config;
use antforage::recruitment::RecruitmentModel;
use antforage::simulation::Simulation;
use antforage::simulation::metrics::MetricsRecorder;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Model {
    /// Foraging colonies on a pheromone field.
    Forage,
    /// Leader/follower role recruitment on a torus.
    Recruitment,
}

/// Command-line arguments for AntForage.
#[derive(Parser)]
#[command(name = "antforage", version, about = "Stigmergic ant foraging simulation")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of steps to run.
    #[arg(short, long, default_value_t = 1000)]
    steps: u64,

    /// Overrides the seed from the configuration.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(short, long, value_enum, default_value_t = Model::Forage)]
    model: Model,

    /// Extract trails at this intensity once the run is over.
    #[arg(short, long)]
    threshold: Option<f32>,

    /// Log a summary every N steps. 0 disables it.
    #[arg(long, default_value_t = 100)]
    report_every: u64,

    /// Write per-step metrics to this TOML file.
    #[arg(long)]
    metrics_out: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.simulation.seed = seed;
        config.recruitment.seed = seed;
    }

    match cli.model {
        Model::Forage => run_forage(&cli, config.simulation),
        Model::Recruitment => run_recruitment(&cli, config.recruitment),
    }
}

fn run_forage(cli: &Cli, config: antforage::config::SimulationConfig) -> Result<()> {
    let mut sim = Simulation::new(&config).context("invalid simulation config")?;
    let mut recorder = MetricsRecorder::new();

    for _ in 0..cli.steps {
        sim.step();
        let record = recorder.record(&sim);
        if cli.report_every > 0 && record.tick % cli.report_every == 0 {
            info!(
                tick = record.tick,
                live = record.live,
                dead = record.dead,
                encounters = record.encounters,
                min_path = ?record.min_path_length,
                mean_min_path = ?record.mean_min_path_length,
                food_left = record.remaining_food,
                "progress"
            );
        }
    }

    for colony in sim.colonies() {
        info!(
            colony = colony.id,
            stash = colony.food_stash,
            collected = colony.food_collected,
            population = colony.population,
            "final colony state"
        );
    }

    if let Some(threshold) = cli.threshold {
        for colony in sim.find_paths(threshold) {
            if colony.paths.is_empty() {
                info!(colony = colony.colony_id, threshold, "no trail above threshold");
            }
            for trail in colony.paths {
                info!(
                    colony = colony.colony_id,
                    food_x = trail.food.x,
                    food_y = trail.food.y,
                    length = trail.path.len(),
                    "trail found"
                );
            }
        }
    }

    if let Some(path) = &cli.metrics_out {
        let text = recorder.to_toml().context("failed to serialize metrics")?;
        fs::write(path, text)
            .with_context(|| format!("failed to write metrics to '{}'", path.display()))?;
        info!(path = %path.display(), records = recorder.len(), "metrics written");
    }
    Ok(())
}

fn run_recruitment(cli: &Cli, config: antforage::config::RecruitmentConfig) -> Result<()> {
    let mut model = RecruitmentModel::new(&config).context("invalid recruitment config")?;
    for _ in 0..cli.steps {
        let counts = model.step();
        if cli.report_every > 0 && model.tick % cli.report_every == 0 {
            info!(
                tick = model.tick,
                unassigned = counts.unassigned,
                followers = counts.followers,
                leaders = counts.leaders,
                pheromone = counts.pheromone,
                "progress"
            );
        }
    }
    let counts = model.role_counts();
    info!(
        agents = counts.total(),
        unassigned = counts.unassigned,
        followers = counts.followers,
        leaders = counts.leaders,
        pheromone = counts.pheromone,
        "final role counts"
    );
    Ok(())
}
