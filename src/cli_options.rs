/*
cli_options.rs

Copyright 2025 Hervé Quatremain

This file is part of Pathweave.

Pathweave is free software: you can redistribute it and/or modify it under the
terms of the GNU General Public License as published by the Free Software
Foundation, either version 3 of the License, or (at your option) any later
version.

Pathweave is distributed in the hope that it will be useful, but WITHOUT ANY
WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
A PARTICULAR PURPOSE. See the GNU General Public License for more details.

You should have received a copy of the GNU General Public License along with
Pathweave. If not, see <https://www.gnu.org/licenses/>.

SPDX-License-Identifier: GPL-3.0-or-later
*/

//! Process command-line options.
//!
//! These options are intended for developers tuning the generator.
//! Each generated level is printed in JSON, followed by its deep-link token.
//!
//! # Examples
//!
//! Generate a single-path level from a given seed:
//!
//! ```text
//! $ pathweave --width 10 --height 12 --hole-density 0.15 --seed 8f3kz2
//! ```
//!
//! Generate the level of a deep-link token, and run the solver on it:
//!
//! ```text
//! $ pathweave --token 'v=1;m=3;w=6;h=6;hd=0;k=4;t=1;s=abc' --solve
//! ```
//!
//! Generate 100 random levels and print some statistics:
//!
//! ```text
//! $ pathweave -m starts -k 5 -c 100 --summary > /dev/null
//! ```

use clap::Parser;
use log::{LevelFilter, debug};
use rand::Rng;
use rand::distr::Alphanumeric;
use std::path::PathBuf;

use crate::config::{COPYRIGHT_NOTICE, GeneratorConfig};
use crate::deep_link;
use crate::generator::level::{Difficulty, GenerationRequest, Level, Mode};
use crate::generator::level_builder::{GenerationError, LevelBuilder};
use crate::generator::solver::{SolveOutcome, Solver};

/// Length of the random seeds.
const RANDOM_SEED_LEN: usize = 6;

/// Generate grid-path puzzles.
#[derive(Parser, Debug)]
#[command(about, long_about = None, version, long_version = COPYRIGHT_NOTICE)]
struct Args {
    /// Puzzle mode
    #[arg(value_enum, short, long, default_value_t = Mode::Single)]
    mode: Mode,

    /// Grid width
    #[arg(long, default_value_t = 10)]
    width: usize,

    /// Grid height
    #[arg(long, default_value_t = 12)]
    height: usize,

    /// Fraction of blocked cells
    #[arg(long, default_value_t = 0.15)]
    hole_density: f64,

    /// Number of colors
    #[arg(short = 'k', long, default_value_t = 1)]
    colors: usize,

    /// Difficulty level
    #[arg(value_enum, short = 'f', long, default_value_t = Difficulty::Medium)]
    difficulty: Difficulty,

    /// Seed. A random seed is used when not provided
    #[arg(short, long)]
    seed: Option<String>,

    /// Deep-link token. Overrides the other level options
    #[arg(short, long)]
    token: Option<String>,

    /// Number of levels to generate. The levels after the first one use random seeds
    #[arg(short, long, default_value_t = 1)]
    count: usize,

    /// Run the solver on each level
    #[arg(long, default_value_t = false)]
    solve: bool,

    /// Print some statistics after generating the levels
    #[arg(long, default_value_t = false)]
    summary: bool,

    /// JSON file with the generator configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug messages
    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

impl Args {
    /// Build the request for the first level.
    fn request(&self) -> GenerationRequest {
        match &self.token {
            Some(token) => deep_link::parse(token),
            None => GenerationRequest {
                mode: self.mode,
                width: self.width,
                height: self.height,
                hole_density: self.hole_density,
                color_count: self.colors,
                difficulty: self.difficulty,
                seed: self.seed.clone().unwrap_or_else(random_seed),
            },
        }
    }
}

/// Return a random alphanumeric seed.
fn random_seed() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SEED_LEN)
        .map(char::from)
        .collect()
}

/// Statistics for the `--summary` option.
#[derive(Debug, Default)]
struct Summary {
    total: f32,
    max: f32,
    iterations: usize,
    attempts: usize,
    generated: usize,
    errors: usize,
    low_quality: usize,
    solved: usize,
    solver_expansions: usize,
}

/// Parse and process command-line options. Return the process exit code.
pub fn run() -> u8 {
    let args: Args = Args::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if args.debug {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let config: GeneratorConfig = match &args.config {
        Some(path) => match GeneratorConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Cannot read the configuration file {}: {e}", path.display());
                return 1;
            }
        },
        None => GeneratorConfig::default(),
    };
    debug!("Configuration: {config:?}");

    let mut request: GenerationRequest = args.request();
    let mut builder: LevelBuilder = LevelBuilder::new(config.clone());
    let mut summary: Summary = Summary::default();

    for i in 0..args.count {
        if i > 0 {
            request.seed = random_seed();
        }
        debug!("Level {i}: {request:?}");

        let res: Result<Level, GenerationError> = builder.generate(&request);
        summary.total += builder.duration;
        summary.max = summary.max.max(builder.duration);
        summary.iterations += builder.iteration;
        summary.attempts += builder.attempts;
        match res {
            Ok(level) => {
                summary.generated += 1;
                if level.low_quality {
                    summary.low_quality += 1;
                }
                match serde_json::to_string_pretty(&level) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("Cannot serialize the level: {e}");
                        return 1;
                    }
                }
                println!("token: {}", deep_link::serialize(&level.params));
                if args.debug {
                    println!("{}", level.render());
                }
                if args.solve {
                    let outcome: SolveOutcome =
                        Solver::for_level(&level, config.solver_budget).solve();
                    let status: &str = match outcome {
                        SolveOutcome::Solved { .. } => "solved",
                        SolveOutcome::Unsolvable { .. } => "unsolvable",
                        SolveOutcome::BudgetExhausted { .. } => "budget exhausted",
                    };
                    if outcome.is_solved() {
                        summary.solved += 1;
                    }
                    summary.solver_expansions += outcome.expansions();
                    println!(
                        "solver: {status} after {} expansions (estimated tier {})",
                        outcome.expansions(),
                        level.metrics.estimated_tier
                    );
                }
            }
            Err(e) => {
                summary.errors += 1;
                debug!("Level {i}: {e}");
                eprintln!("{}", e.user_message());
            }
        }
    }

    if args.summary && args.count > 0 {
        let count: f32 = args.count as f32;
        println!(
            "
        total time = {}s
      average time = {}s
          max time = {}s
average iterations = {}
  average attempts = {}
         generated = {}
            errors = {}
       low quality = {}",
            summary.total,
            summary.total / count,
            summary.max,
            summary.iterations / args.count,
            summary.attempts as f32 / count,
            summary.generated,
            summary.errors,
            summary.low_quality,
        );
        if args.solve && summary.generated > 0 {
            println!(
                "            solved = {}
 solver expansions = {}",
                summary.solved,
                summary.solver_expansions / summary.generated
            );
        }
    }

    if summary.errors > 0 { 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_options() {
        let args: Args = Args::try_parse_from([
            "pathweave",
            "--mode",
            "pairs",
            "--width",
            "6",
            "--height",
            "7",
            "-k",
            "4",
            "-f",
            "hard",
            "--seed",
            "abc",
        ])
        .unwrap();
        let request: GenerationRequest = args.request();
        assert_eq!(request.mode, Mode::Pairs);
        assert_eq!(request.width, 6);
        assert_eq!(request.height, 7);
        assert_eq!(request.color_count, 4);
        assert_eq!(request.difficulty, Difficulty::Hard);
        assert_eq!(request.seed, "abc");
    }

    #[test]
    fn test_token_overrides_options() {
        let args: Args = Args::try_parse_from([
            "pathweave",
            "--width",
            "30",
            "--token",
            "m=2;w=5;h=5;k=2;s=xyz",
        ])
        .unwrap();
        let request: GenerationRequest = args.request();
        assert_eq!(request.mode, Mode::Starts);
        assert_eq!(request.width, 5);
        assert_eq!(request.seed, "xyz");
    }

    #[test]
    fn test_random_seed() {
        let args: Args = Args::try_parse_from(["pathweave"]).unwrap();
        let seed: String = args.request().seed;
        assert_eq!(seed.len(), RANDOM_SEED_LEN);
        assert!(seed.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
