/*
level_builder.rs

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

//! Generate a level from a request.
//!
//! The pipeline grows a region, builds a path that covers it, cuts the path into colored
//! segments, computes the difficulty metrics, and finally validates the assembled level.
//!
//! When an attempt fails, the next one uses a seed derived from the request seed
//! (`"{seed}#{attempt}"`), so that the whole process stays reproducible.
//! The whole process must complete within the configured time budget.

use log::{Level as LogLevel, debug, info, log_enabled, warn};
use std::fmt;
use std::time::{Duration, Instant};

use super::grid::{Grid, OpenSet};
use super::hamiltonian::{HamiltonianError, HamiltonianPathBuilder, Strategy};
use super::level::{
    ALGORITHM_VERSION, GenerationRequest, Level, Mode, Pair, Solution, Start,
};
use super::metrics::DifficultyMetrics;
use super::prng::Prng;
use super::region::{RegionError, RegionGrower};
use super::segmenter::{PathSegmenter, Segmentation, SegmentationError};
use super::validator::{self, ValidationReport};
use crate::config::GeneratorConfig;

/// Remedy displayed for the errors caused by the request parameters.
const REMEDY: &str = "Try a smaller size or a new seed.";

/// Type of errors.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// The region stopped growing too far from its target size.
    RegionUnreachableTarget { reached: usize, target: usize },

    /// No path covering the region was found.
    HamiltonianFailure,

    /// The path cannot be cut into the requested colored segments.
    SegmentationConstraintUnsatisfiable(SegmentationError),

    /// The time budget is exhausted.
    GenerationTimeout { budget: Duration },

    /// The generated level does not pass its own validation.
    ValidationFailure(ValidationReport),

    /// The request parameters are out of range.
    InvalidRequest(String),
}

impl GenerationError {
    /// Message for the user.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::InvalidRequest(reason) => format!("Invalid request: {reason}."),
            GenerationError::ValidationFailure(_) => {
                "The generated level is inconsistent. Try a new seed.".to_string()
            }
            GenerationError::RegionUnreachableTarget { .. }
            | GenerationError::HamiltonianFailure
            | GenerationError::SegmentationConstraintUnsatisfiable(_)
            | GenerationError::GenerationTimeout { .. } => {
                format!("Cannot generate a level with these parameters. {REMEDY}")
            }
        }
    }

    /// Whether another attempt with a derived seed can succeed.
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::RegionUnreachableTarget { .. }
                | GenerationError::HamiltonianFailure
                | GenerationError::ValidationFailure(_)
        )
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GenerationError::RegionUnreachableTarget { reached, target } => write!(
                f,
                "the region stopped growing at {reached} cells instead of {target}"
            ),
            GenerationError::HamiltonianFailure => {
                write!(f, "no path covering the region was found")
            }
            GenerationError::SegmentationConstraintUnsatisfiable(e) => write!(f, "{e}"),
            GenerationError::GenerationTimeout { budget } => {
                write!(f, "the generation took longer than {} ms", budget.as_millis())
            }
            GenerationError::ValidationFailure(report) => {
                write!(f, "the generated level is invalid: {report}")
            }
            GenerationError::InvalidRequest(reason) => write!(f, "invalid request: {reason}"),
        }
    }
}

impl std::error::Error for GenerationError {}

impl From<SegmentationError> for GenerationError {
    fn from(e: SegmentationError) -> Self {
        GenerationError::SegmentationConstraintUnsatisfiable(e)
    }
}

/// Return the seed of the given attempt.
pub fn derived_seed(seed: &str, attempt: usize) -> String {
    if attempt == 0 {
        seed.to_string()
    } else {
        format!("{seed}#{attempt}")
    }
}

/// Generate a level with the given configuration.
pub fn generate(
    request: &GenerationRequest,
    config: &GeneratorConfig,
) -> Result<Level, GenerationError> {
    LevelBuilder::new(config.clone()).generate(request)
}

/// [`LevelBuilder`] object.
#[derive(Debug)]
pub struct LevelBuilder {
    config: GeneratorConfig,

    /// Number of attempts it took to generate the last level.
    pub attempts: usize,

    /// Duration in seconds it took to generate the last level.
    pub duration: f32,

    /// Number of path builder expansions for the last level.
    pub iteration: usize,

    /// Strategy that built the path of the last level.
    pub strategy: Option<Strategy>,
}

impl LevelBuilder {
    /// Create the object.
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            attempts: 0,
            duration: 0.0,
            iteration: 0,
            strategy: None,
        }
    }

    /// Generate a level.
    ///
    /// # Errors
    ///
    /// * [`GenerationError::InvalidRequest`] when the request parameters are out of range.
    /// * [`GenerationError::GenerationTimeout`] when the time budget is exhausted.
    /// * [`GenerationError::SegmentationConstraintUnsatisfiable`] when the region is too small
    ///   for the requested number of colors.
    /// * The error of the last attempt when all the attempts failed.
    pub fn generate(&mut self, request: &GenerationRequest) -> Result<Level, GenerationError> {
        let start: Instant = Instant::now();
        self.attempts = 0;
        self.iteration = 0;
        self.strategy = None;

        request.check().map_err(GenerationError::InvalidRequest)?;
        let budget: Duration = self.config.time_budget();
        let deadline: Instant = start + budget;

        let mut outcome: Result<Level, GenerationError> = Err(GenerationError::HamiltonianFailure);
        for attempt in 0..self.config.max_attempts.max(1) {
            if Instant::now() >= deadline {
                outcome = Err(GenerationError::GenerationTimeout { budget });
                break;
            }
            self.attempts = attempt + 1;
            let generation_seed: String = derived_seed(&request.seed, attempt);
            debug!("Attempt {attempt} with seed {generation_seed:?}");

            outcome = self.attempt(request, generation_seed, deadline);
            match &outcome {
                Ok(_) => break,
                Err(GenerationError::ValidationFailure(report)) => {
                    warn!("Bug: the generated level is invalid: {report}");
                }
                Err(e) if e.is_retryable() => debug!("Attempt {attempt} failed: {e}"),
                Err(_) => break,
            }
        }

        self.duration = start.elapsed().as_secs_f32();
        match &outcome {
            Ok(level) => {
                info!(
                    "Level generated in {:.1} ms after {} attempts",
                    self.duration * 1000.0,
                    self.attempts
                );
                if log_enabled!(LogLevel::Debug) {
                    debug!("Level:\n{}", level.render());
                }
            }
            Err(e) => info!("Generation failed after {} attempts: {e}", self.attempts),
        }
        outcome
    }

    /// Run the pipeline once, with the given seed.
    fn attempt(
        &mut self,
        request: &GenerationRequest,
        generation_seed: String,
        deadline: Instant,
    ) -> Result<Level, GenerationError> {
        let mut prng: Prng = Prng::from_seed(&generation_seed);
        let grid: Grid = Grid::new(request.width, request.height);
        let colors: usize = request.effective_colors();

        // Region
        let target: usize = RegionGrower::target_for(grid, request.effective_hole_density());
        let min_len: usize = request.difficulty.min_segment_len();
        if request.mode != Mode::Single && colors * min_len > target {
            return Err(SegmentationError::Unsatisfiable {
                colors,
                min_len,
                path_len: target,
            }
            .into());
        }
        let region: OpenSet = match RegionGrower::new(grid, target).grow(&mut prng) {
            Ok(region) => region,
            Err(RegionError::UnreachableTarget { region, target })
                if target.saturating_sub(region.len()) <= self.config.region_tolerance =>
            {
                debug!(
                    "Region accepted with {} cells instead of {target}",
                    region.len()
                );
                region
            }
            Err(RegionError::UnreachableTarget { region, target }) => {
                return Err(GenerationError::RegionUnreachableTarget {
                    reached: region.len(),
                    target,
                });
            }
        };
        if log_enabled!(LogLevel::Debug) {
            region.debug();
        }

        // Path
        let mut builder: HamiltonianPathBuilder = HamiltonianPathBuilder::new(
            self.config.strip_attempts,
            self.config.dfs_candidates,
            self.config.dfs_budget,
        )
        .with_deadline(Some(deadline));
        let res: Result<Vec<usize>, HamiltonianError> = builder.build(&region, &mut prng);
        self.iteration += builder.iteration;
        self.strategy = builder.strategy;
        let path: Vec<usize> = res.map_err(|e| match e {
            HamiltonianError::NoPath => GenerationError::HamiltonianFailure,
            HamiltonianError::DurationExceeded => GenerationError::GenerationTimeout {
                budget: self.config.time_budget(),
            },
        })?;

        // Colors
        let segmenter = || {
            PathSegmenter::new(colors, min_len)
                .with_max_length_ratio(request.difficulty.max_length_ratio())
                .with_retries(self.config.segment_retries)
                .with_nudges(self.config.pair_nudges)
        };
        let mut starts: Vec<Start> = Vec::new();
        let mut pairs: Vec<Pair> = Vec::new();
        let mut low_quality: bool = false;
        let solution: Solution = match request.mode {
            Mode::Single => {
                starts.push(Start {
                    color: 0,
                    index: path[0],
                });
                Solution::Path(path)
            }
            Mode::Starts if colors == 1 => {
                starts.push(Start {
                    color: 0,
                    index: path[0],
                });
                Solution::Colored(vec![path])
            }
            Mode::Starts => {
                let s: Segmentation = segmenter().segment_starts(&path, &mut prng)?;
                for (color, segment) in s.segments.iter().enumerate() {
                    starts.push(Start {
                        color,
                        index: segment[0],
                    });
                }
                Solution::Colored(s.segments)
            }
            Mode::Pairs => {
                let s: Segmentation = segmenter().segment_pairs(&path, &region, &mut prng)?;
                for (color, segment) in s.segments.iter().enumerate() {
                    pairs.push(Pair {
                        color,
                        a: segment[0],
                        b: segment[segment.len() - 1],
                    });
                }
                low_quality = s.low_quality;
                Solution::Colored(s.segments)
            }
        };

        let metrics: DifficultyMetrics =
            DifficultyMetrics::compute(&region, &solution.paths(), request.mode);
        let level: Level = Level {
            version: ALGORITHM_VERSION,
            mode: request.mode,
            region,
            starts,
            pairs,
            solution,
            metrics,
            seed: request.seed.clone(),
            generation_seed,
            params: request.clone(),
            low_quality,
        };

        let report: ValidationReport = validator::validate_paths(&level, &level.paths());
        if !report.is_valid() {
            return Err(GenerationError::ValidationFailure(report));
        }
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::level::Difficulty;

    fn config() -> GeneratorConfig {
        GeneratorConfig {
            time_budget_ms: 10_000,
            ..Default::default()
        }
    }

    #[test]
    fn test_derived_seed() {
        assert_eq!(derived_seed("abc", 0), "abc");
        assert_eq!(derived_seed("abc", 3), "abc#3");
    }

    #[test]
    fn test_invalid_request() {
        let request: GenerationRequest = GenerationRequest {
            width: 0,
            ..Default::default()
        };
        let e: GenerationError = generate(&request, &config()).unwrap_err();
        assert!(matches!(e, GenerationError::InvalidRequest(_)));
        assert!(e.user_message().starts_with("Invalid request"));
    }

    #[test]
    fn test_too_many_colors() {
        let request: GenerationRequest = GenerationRequest {
            mode: Mode::Starts,
            width: 3,
            height: 3,
            hole_density: 0.0,
            color_count: 4,
            difficulty: Difficulty::Hard,
            seed: "tiny".to_string(),
        };
        let e: GenerationError = generate(&request, &config()).unwrap_err();
        assert!(matches!(
            e,
            GenerationError::SegmentationConstraintUnsatisfiable(_)
        ));
        assert!(e.user_message().contains(REMEDY));
    }

    #[test]
    fn test_single_path_level() {
        let request: GenerationRequest = GenerationRequest {
            width: 5,
            height: 4,
            hole_density: 0.0,
            seed: "full".to_string(),
            ..Default::default()
        };
        let mut builder: LevelBuilder = LevelBuilder::new(config());
        let level: Level = builder.generate(&request).unwrap();
        assert_eq!(builder.attempts, 1);
        assert_eq!(builder.strategy, Some(Strategy::StripAndStitch));
        assert_eq!(level.region.len(), 20);
        assert_eq!(level.starts.len(), 1);
        assert_eq!(level.generation_seed, "full");
        assert!(validator::validate_paths(&level, &level.paths()).is_valid());
    }

    #[test]
    fn test_pairs_level() {
        let request: GenerationRequest = GenerationRequest {
            mode: Mode::Pairs,
            width: 6,
            height: 6,
            hole_density: 0.3,
            color_count: 4,
            difficulty: Difficulty::Medium,
            seed: "pairs".to_string(),
        };
        let level: Level = generate(&request, &config()).unwrap();
        // The hole density is ignored
        assert_eq!(level.region.len(), 36);
        assert_eq!(level.pairs.len(), 4);
        assert!(level.starts.is_empty());
        assert_eq!(level.color_count(), 4);
    }
}
