//! Kohonen CLI - Self-Organizing Maps
//!
//! Command-line interface for training maps and querying trained maps.

use clap::{Parser, Subcommand};
use image::{ImageBuffer, Rgb};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use kohonen_map::storage::{load_dataset, parse_vector};
use kohonen_map::{
    seeded_rng, Config, KohonenError, Map, MapConfig, MapState, Result, TrainOptions,
};
use log::{error, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "kohonen")]
#[command(version)]
#[command(about = "Kohonen Self-Organizing Maps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a map on a dataset
    Train {
        /// Dataset file (.json array of arrays, or one vector per line)
        #[arg(short, long)]
        input: PathBuf,

        /// Output state file (.json, or binary for any other extension)
        #[arg(short, long)]
        output: PathBuf,

        /// JSON configuration file; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Continue training from a saved state instead of random weights
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Grid width
        #[arg(long)]
        width: Option<usize>,

        /// Grid height
        #[arg(long)]
        height: Option<usize>,

        /// Number of passes over the dataset
        #[arg(short = 'n', long)]
        iterations: Option<usize>,

        /// Learning rate
        #[arg(short, long)]
        rate: Option<f64>,

        /// Report progress every N iterations (0 disables)
        #[arg(long)]
        log: Option<usize>,

        /// Floor of the neighbourhood radius schedule
        #[arg(long)]
        min_distance: Option<f64>,

        /// Random seed for reproducibility
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Show map statistics
    Info {
        /// State file to inspect
        state: PathBuf,
    },

    /// Print the winning unit for every row of a dataset
    Classify {
        /// State file to use
        #[arg(short, long)]
        state: PathBuf,

        /// Dataset file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List the distinct units that win for a dataset
    Hot {
        /// State file to use
        #[arg(short, long)]
        state: PathBuf,

        /// Dataset file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Render the activation heatmap for one vector as a PNG
    Heatmap {
        /// State file to use
        #[arg(short, long)]
        state: PathBuf,

        /// Input vector (comma-separated, e.g., "0.5,1.2")
        #[arg(long, allow_hyphen_values = true)]
        vector: String,

        /// Output image file
        #[arg(short, long, default_value = "heatmap.png")]
        output: PathBuf,

        /// Pixels per grid unit
        #[arg(long, default_value = "16")]
        scale: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let result = match cli.command {
        Commands::Train {
            input,
            output,
            config,
            resume,
            width,
            height,
            iterations,
            rate,
            log,
            min_distance,
            seed,
        } => {
            let overrides = Overrides {
                width,
                height,
                iterations,
                rate,
                log,
                min_distance,
                seed,
            };
            train_map(input, output, config, resume, overrides)
        }

        Commands::Info { state } => show_info(state),

        Commands::Classify { state, input } => classify(state, input),

        Commands::Hot { state, input } => hot_units(state, input),

        Commands::Heatmap {
            state,
            vector,
            output,
            scale,
        } => render_heatmap(state, vector, output, scale),
    };

    if let Err(e) = result {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Command-line values that take precedence over the configuration file.
struct Overrides {
    width: Option<usize>,
    height: Option<usize>,
    iterations: Option<usize>,
    rate: Option<f64>,
    log: Option<usize>,
    min_distance: Option<f64>,
    seed: Option<u64>,
}

impl Overrides {
    /// Returns true if `--width`/`--height` ask for a grid other than `state`'s.
    fn conflicts_with(&self, state: &MapState) -> bool {
        self.width.is_some_and(|w| w != state.width)
            || self.height.is_some_and(|h| h != state.height)
    }

    fn apply(self, config: &mut Config) {
        if let Some(width) = self.width {
            config.map.width = width;
        }
        if let Some(height) = self.height {
            config.map.height = height;
        }
        if let Some(min_distance) = self.min_distance {
            config.map.min_distance = min_distance;
        }
        if self.seed.is_some() {
            config.map.seed = self.seed;
        }
        if let Some(iterations) = self.iterations {
            config.train.iterations = iterations;
        }
        if let Some(rate) = self.rate {
            config.train.rate = rate;
        }
        if let Some(log) = self.log {
            config.train.log = (log > 0).then_some(log);
        }
    }
}

fn train_map(
    input: PathBuf,
    output: PathBuf,
    config_path: Option<PathBuf>,
    resume: Option<PathBuf>,
    overrides: Overrides,
) -> Result<()> {
    let start_time = Instant::now();

    let mut config = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let resumed = resume
        .map(|path| MapState::load(&path).map(|state| (path, state)))
        .transpose()?;
    if let Some((path, state)) = &resumed {
        if overrides.conflicts_with(state) {
            warn!(
                "Ignoring grid size {}x{}: resuming the {}x{} map from {}",
                overrides.width.unwrap_or(state.width),
                overrides.height.unwrap_or(state.height),
                state.width,
                state.height,
                path.display()
            );
        }
    }
    overrides.apply(&mut config);

    let dataset = load_dataset(&input)?;
    let input_size = dataset
        .first()
        .map(Vec::len)
        .ok_or_else(|| KohonenError::Dataset(format!("{} is empty", input.display())))?;
    println!("✓ Loaded {} samples of dimension {}", format_number(dataset.len()), input_size);

    let mut map = match resumed {
        Some((path, state)) => {
            let mut map = Map::from_serialized_state_with_rng(&state, seeded_rng(config.map.seed))?;
            map.set_min_distance(config.map.min_distance)?;
            println!("✓ Resumed {}x{} map from {}", map.width(), map.height(), path.display());
            map
        }
        None => {
            let map_config = MapConfig {
                input_size,
                ..config.map.clone()
            };
            let map = Map::new(&map_config)?;
            println!(
                "✓ Initialized {}x{} map ({} units)",
                map.width(),
                map.height(),
                map.units().len()
            );
            map
        }
    };

    let bar_style = ProgressStyle::default_bar()
        .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) ETA: {eta}")
        .map_err(|e| KohonenError::Config(e.to_string()))?
        .progress_chars("█▓▒░  ");

    let iterations = config.train.iterations;
    let pb = ProgressBar::new(iterations as u64);
    pb.set_style(bar_style);
    pb.set_message("Training map...");

    let options = TrainOptions::from(config.train.clone());
    map.train_with_progress(&dataset, &options, |progress| {
        pb.set_position((progress.iteration + 1) as u64);
        pb.set_message(format!("Training map... lambda={:.3}", progress.lambda));
    })?;

    pb.finish_and_clear();
    println!("✓ Trained for {} iterations", format_number(iterations));

    map.serialize().save(&output)?;
    println!("✓ Saved map to {}", output.display());

    let hot = map.hot_units(&dataset)?.len();

    println!();
    println!("Training complete in {}", HumanDuration(start_time.elapsed()));
    println!("   Grid: {}x{} ({} units)", map.width(), map.height(), map.units().len());
    println!("   Units winning at least one sample: {}", hot);
    println!("   Output: {}", output.display());

    Ok(())
}

/// Format large numbers with commas for readability
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

fn load_map(state_path: &Path) -> Result<Map> {
    let state = MapState::load(state_path)?;
    Map::from_serialized_state(&state)
}

fn show_info(state_path: PathBuf) -> Result<()> {
    let map = load_map(&state_path)?;

    let (min, max) = map
        .units()
        .iter()
        .flat_map(|u| u.weights.iter().copied())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), w| (lo.min(w), hi.max(w)));

    println!("Map: {:?}", state_path);
    println!("  Input size: {}", map.input_size());
    println!("  Grid: {}x{}", map.width(), map.height());
    println!("  Units: {}", map.units().len());
    println!("  Weight range: [{:.4}, {:.4}]", min, max);

    Ok(())
}

fn classify(state_path: PathBuf, input: PathBuf) -> Result<()> {
    let mut map = load_map(&state_path)?;
    let dataset = load_dataset(&input)?;

    println!("{:>6}  {:>6}  position", "row", "unit");
    for (row, vector) in dataset.iter().enumerate() {
        let winner = map.activate(vector)?.winner_unit();
        let (x, y) = winner.position().map(|p| (p.x, p.y)).unwrap_or_default();
        println!("{:>6}  {:>6}  ({}, {})", row, winner.id(), x, y);
    }

    Ok(())
}

fn hot_units(state_path: PathBuf, input: PathBuf) -> Result<()> {
    let mut map = load_map(&state_path)?;
    let dataset = load_dataset(&input)?;

    let hot = map.hot_units(&dataset)?;
    println!("{} distinct winning units:", hot.len());
    for unit in hot {
        let (x, y) = unit.position().map(|p| (p.x, p.y)).unwrap_or_default();
        let weights: Vec<String> = unit.weights.iter().map(|w| format!("{:.4}", w)).collect();
        println!("  {:>6}  ({}, {})  [{}]", unit.id(), x, y, weights.join(", "));
    }

    Ok(())
}

fn render_heatmap(state_path: PathBuf, vector: String, output: PathBuf, scale: u32) -> Result<()> {
    let mut map = load_map(&state_path)?;
    let input = parse_vector(&vector)?;

    let heat = map.activate(&input)?.heatmap();
    let winner = map.winner_unit();
    let img = heatmap_to_image(&heat, scale.max(1));

    img.save(&output).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    println!("Winner: unit {} at {:?}", winner.id(), winner.position());
    println!("✓ Saved heatmap to {}", output.display());

    Ok(())
}

/// Closest units render red, farthest blue.
fn heatmap_to_image(heat: &[Vec<f64>], scale: u32) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
    let height = heat.len() as u32;
    let width = heat.first().map_or(0, Vec::len) as u32;

    ImageBuffer::from_fn(width * scale, height * scale, |x, y| {
        let v = heat[(y / scale) as usize][(x / scale) as usize].clamp(0.0, 1.0);
        let closeness = ((1.0 - v) * 255.0).round() as u8;
        Rgb([closeness, 32, 255 - closeness])
    })
}
