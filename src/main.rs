//! trophic - CLI Entry Point
//!
//! Drives the ecosystem engine from the command line.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use trophic::{benchmark, CensusHistory, Simulation, SimulationOptions};

#[derive(Parser)]
#[command(name = "trophic")]
#[command(version)]
#[command(about = "Predator/prey/producer ecosystem simulator on a bounded grid")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation
    Run {
        /// Options file (YAML)
        #[arg(short, long, default_value = "trophic.yaml")]
        config: PathBuf,

        /// Number of steps to simulate
        #[arg(short, long, default_value = "10000")]
        steps: u64,

        /// Output directory for the census history
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,

        /// Print every action as a JSON line
        #[arg(long)]
        trace_actions: bool,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of steps
        #[arg(short, long, default_value = "100000")]
        steps: u64,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Generate the predator/prey options file
    Init {
        /// Output path
        #[arg(short, long, default_value = "trophic.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            steps,
            output,
            seed,
            quiet,
            trace_actions,
        } => run_simulation(config, steps, output, seed, quiet, trace_actions),

        Commands::Benchmark { steps, seed } => {
            init_logging("info");
            run_benchmark(steps, seed)
        }

        Commands::Init { output } => {
            init_logging("info");
            generate_config(output)
        }
    }
}

fn init_logging(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
}

fn run_simulation(
    config_path: PathBuf,
    steps: u64,
    output: PathBuf,
    seed: Option<u64>,
    quiet: bool,
    trace_actions: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = if config_path.exists() {
        SimulationOptions::from_file(&config_path)?
    } else {
        SimulationOptions::predator_prey()
    };
    init_logging(&options.logging.log_level);

    if config_path.exists() {
        log::info!("Loaded options from {:?}", config_path);
    } else {
        log::info!("No options file at {:?}, using the predator/prey preset", config_path);
    }
    if seed.is_some() {
        options.seed = seed;
    }

    std::fs::create_dir_all(&output)?;

    let mut sim = Simulation::new(options)?;
    let stats_interval = sim.options().logging.stats_interval.max(1);

    println!("Starting simulation");
    println!("  Seed: {}", sim.seed());
    println!("  Grid size: {}x{}", sim.grid().rows(), sim.grid().cols());
    println!("  Initial population: {}", sim.population());
    println!("  Steps: {}", steps);
    if sim.options().is_bounded() {
        println!("  Iteration cap: {}", sim.max_iterations());
    }
    println!();

    let start = Instant::now();
    let mut actions_seen = 0usize;

    let executed = sim.run_with_callback(steps, |sim, actions| {
        actions_seen += actions.len();
        if trace_actions {
            for action in actions {
                match serde_json::to_string(action) {
                    Ok(line) => println!("{}", line),
                    Err(e) => log::warn!("Failed to serialize action: {}", e),
                }
            }
        }
        if !quiet && sim.iteration_count() % stats_interval == 0 {
            println!("{}", sim.census().summary(sim.options()));
        }
    })?;

    if sim.is_extinct() {
        println!("\nPopulation extinct at step {}", sim.iteration_count());
    } else if sim.is_finished() {
        println!("\nIteration cap reached at step {}", sim.iteration_count());
    }

    let elapsed = start.elapsed();
    let steps_per_sec = executed as f64 / elapsed.as_secs_f64().max(f64::EPSILON);

    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Steps: {}", executed);
    println!("Speed: {:.1} steps/s", steps_per_sec);
    println!("Actions: {}", actions_seen);
    println!("Final population: {}", sim.population());
    for (id, counters) in sim.census().iter() {
        println!(
            "  {}: {} alive, {} created, {} eaten, {} died",
            sim.options().species_name(id),
            counters.population,
            counters.created,
            counters.consumed,
            counters.died
        );
    }
    if sim.inconsistencies() > 0 {
        log::warn!("{} sweep inconsistencies were tolerated", sim.inconsistencies());
    }

    let history: &CensusHistory = sim.history();
    let stats_path = output.join("census_history.json");
    history.save(&stats_path.to_string_lossy())?;
    println!("Census history: {:?}", stats_path);

    Ok(())
}

fn run_benchmark(steps: u64, seed: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== trophic Benchmark ===");
    println!("Steps: {}", steps);
    println!();

    let result = benchmark(steps, seed)?;
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let options = SimulationOptions::predator_prey();
    options.save(&output)?;
    log::info!("Options saved to: {:?}", output);
    Ok(())
}
