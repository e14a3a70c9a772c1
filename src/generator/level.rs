/*
level.rs

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

//! Generation request and generated level.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::FromRepr;

use super::grid::{Grid, OpenSet};
use super::metrics::DifficultyMetrics;

/// Version of the generation algorithm.
///
/// A given request produces the same level for a given version. Increase the version every
/// time a change in the pipeline changes the generated levels.
pub const ALGORITHM_VERSION: u32 = 1;

/// Smallest grid side.
pub const MIN_SIDE: usize = 2;

/// Largest grid side.
pub const MAX_SIDE: usize = 40;

/// Largest hole density. Above that, regions become too thin to hold a path.
pub const MAX_HOLE_DENSITY: f64 = 0.6;

/// Largest number of colors.
pub const MAX_COLORS: usize = 12;

/// Puzzle mode.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Copy,
    Clone,
    PartialOrd,
    PartialEq,
    Eq,
    Hash,
    ValueEnum,
    FromRepr,
    Default,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Mode {
    /// One path covering the whole region.
    #[default]
    Single = 1,

    /// Colored paths, each one from a given start.
    Starts = 2,

    /// Colored paths connecting given pairs in a full rectangle.
    Pairs = 3,
}

impl Mode {
    /// Mode number, as used in deep-link tokens.
    pub fn number(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mode::Single => write!(f, "Single path"),
            Mode::Starts => write!(f, "Colored starts"),
            Mode::Pairs => write!(f, "Colored pairs"),
        }
    }
}

/// Puzzle difficulty level.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Copy,
    Clone,
    PartialOrd,
    PartialEq,
    Eq,
    Hash,
    ValueEnum,
    FromRepr,
    Default,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Minimum number of cells in a colored segment.
    pub fn min_segment_len(self) -> usize {
        match self {
            Difficulty::Easy => 3,
            Difficulty::Medium => 4,
            Difficulty::Hard => 5,
        }
    }

    /// The longest colored segment cannot be longer than this ratio times the mean length.
    pub fn max_length_ratio(self) -> f64 {
        match self {
            Difficulty::Easy => 1.5,
            Difficulty::Medium => 2.0,
            Difficulty::Hard => 2.5,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
        }
    }
}

/// Generation request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub mode: Mode,
    pub width: usize,
    pub height: usize,

    /// Fraction of the rectangle that stays blocked. Ignored in [`Mode::Pairs`].
    pub hole_density: f64,

    /// Number of colors, between 1 and [`MAX_COLORS`]. [`Mode::Single`] always uses one color.
    pub color_count: usize,

    pub difficulty: Difficulty,
    pub seed: String,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            mode: Mode::Single,
            width: 10,
            height: 12,
            hole_density: 0.15,
            color_count: 1,
            difficulty: Difficulty::Medium,
            seed: String::new(),
        }
    }
}

impl GenerationRequest {
    /// Number of colored paths in the level.
    pub fn effective_colors(&self) -> usize {
        match self.mode {
            Mode::Single => 1,
            Mode::Starts | Mode::Pairs => self.color_count,
        }
    }

    /// Hole density actually applied to the rectangle.
    pub fn effective_hole_density(&self) -> f64 {
        match self.mode {
            Mode::Pairs => 0.0,
            Mode::Single | Mode::Starts => self.hole_density,
        }
    }

    /// Verify the request before doing any work. Return the reason of the rejection.
    pub fn check(&self) -> Result<(), String> {
        for (name, side) in [("width", self.width), ("height", self.height)] {
            if !(MIN_SIDE..=MAX_SIDE).contains(&side) {
                return Err(format!(
                    "the {name} must be between {MIN_SIDE} and {MAX_SIDE} (got {side})"
                ));
            }
        }
        if !self.hole_density.is_finite() || !(0.0..=MAX_HOLE_DENSITY).contains(&self.hole_density)
        {
            return Err(format!(
                "the hole density must be between 0 and {MAX_HOLE_DENSITY} (got {})",
                self.hole_density
            ));
        }
        if !(1..=MAX_COLORS).contains(&self.color_count) {
            return Err(format!(
                "the number of colors must be between 1 and {MAX_COLORS} (got {})",
                self.color_count
            ));
        }
        Ok(())
    }
}

/// Starting cell of a color.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Start {
    pub color: usize,
    pub index: usize,
}

/// Two cells that the path of a color must connect.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub color: usize,
    pub a: usize,
    pub b: usize,
}

impl Pair {
    /// Whether the two given cells are the ends of the pair, in any order.
    pub fn matches(&self, first: usize, last: usize) -> bool {
        (self.a == first && self.b == last) || (self.a == last && self.b == first)
    }
}

/// Solution of a level.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Solution {
    /// The single path of [`Mode::Single`].
    Path(Vec<usize>),

    /// One path per color, indexed by color.
    Colored(Vec<Vec<usize>>),
}

impl Solution {
    /// Return the solution paths, indexed by color.
    pub fn paths(&self) -> Vec<&[usize]> {
        match self {
            Solution::Path(path) => vec![path.as_slice()],
            Solution::Colored(paths) => paths.iter().map(Vec::as_slice).collect(),
        }
    }
}

/// Generated level. Never modified after creation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Level {
    pub version: u32,
    pub mode: Mode,

    /// Grid dimensions and open cells.
    #[serde(flatten)]
    pub region: OpenSet,

    /// Starting cells: one for [`Mode::Single`], one per color for [`Mode::Starts`].
    pub starts: Vec<Start>,

    /// Pairs to connect, in [`Mode::Pairs`] only.
    pub pairs: Vec<Pair>,

    pub solution: Solution,
    pub metrics: DifficultyMetrics,

    /// Seed of the request.
    pub seed: String,

    /// Derived seed of the attempt that produced the level.
    pub generation_seed: String,

    /// Request that produced the level.
    pub params: GenerationRequest,

    /// Whether some pairs are easier than expected because the constraints could not be
    /// satisfied.
    pub low_quality: bool,
}

impl Level {
    pub fn grid(&self) -> Grid {
        self.region.grid()
    }

    /// Number of colors in the level.
    pub fn color_count(&self) -> usize {
        match &self.solution {
            Solution::Path(_) => 1,
            Solution::Colored(paths) => paths.len(),
        }
    }

    /// Return the solution paths, indexed by color.
    pub fn paths(&self) -> Vec<&[usize]> {
        self.solution.paths()
    }

    /// Return an ASCII representation of the level.
    ///
    /// Blocked cells are shown with `#`. Solution cells use a lowercase letter per color, and
    /// the starting cells and pair ends use the uppercase letter.
    pub fn render(&self) -> String {
        let grid: Grid = self.grid();
        let mut cells: Vec<char> = vec!['#'; grid.num_cells()];
        // Cells outside the grid are ignored
        let mut mark = |cell: usize, symbol: char| {
            if let Some(c) = cells.get_mut(cell) {
                *c = symbol;
            }
        };
        for cell in self.region.iter() {
            mark(cell, '.');
        }
        for (color, path) in self.paths().iter().enumerate() {
            let symbol: char = color_symbol(color);
            for cell in path.iter() {
                mark(*cell, symbol);
            }
        }
        for start in &self.starts {
            mark(start.index, color_symbol(start.color).to_ascii_uppercase());
        }
        for pair in &self.pairs {
            let symbol: char = color_symbol(pair.color).to_ascii_uppercase();
            mark(pair.a, symbol);
            mark(pair.b, symbol);
        }

        let mut s: String = String::with_capacity((grid.width + 1) * grid.height);
        for row in cells.chunks(grid.width) {
            s.extend(row);
            s.push('\n');
        }
        s
    }
}

/// Letter of a color in the ASCII rendering.
fn color_symbol(color: usize) -> char {
    char::from(b'a' + (color % 26) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_repr() {
        assert_eq!(Mode::from_repr(1), Some(Mode::Single));
        assert_eq!(Mode::from_repr(3), Some(Mode::Pairs));
        assert_eq!(Mode::from_repr(0), None);
        assert_eq!(Mode::Starts.number(), 2);
        assert_eq!(Difficulty::from_repr(2), Some(Difficulty::Hard));
    }

    #[test]
    fn test_request_check() {
        let mut request: GenerationRequest = GenerationRequest::default();
        assert_eq!(request.check(), Ok(()));
        request.width = 0;
        assert!(request.check().is_err());
        request.width = 10;
        request.hole_density = f64::NAN;
        assert!(request.check().is_err());
        request.hole_density = 0.1;
        request.mode = Mode::Starts;
        request.color_count = 0;
        assert!(request.check().is_err());
        // Out of range even when only one color is used
        request.mode = Mode::Single;
        assert!(request.check().is_err());
        request.color_count = MAX_COLORS + 1;
        assert!(request.check().is_err());
        request.color_count = 3;
        assert_eq!(request.check(), Ok(()));
        assert_eq!(request.effective_colors(), 1);
    }

    #[test]
    fn test_render() {
        let region: OpenSet = OpenSet::from_rows(&["..#", "..."]);
        let path: Vec<usize> = vec![0, 1, 4, 3];
        let other: Vec<usize> = vec![5];
        let paths: [&[usize]; 2] = [&path, &other];
        let mut level: Level = Level {
            version: ALGORITHM_VERSION,
            mode: Mode::Starts,
            metrics: DifficultyMetrics::compute(&region, &paths, Mode::Starts),
            region,
            starts: vec![Start { color: 0, index: 0 }, Start { color: 1, index: 5 }],
            pairs: Vec::new(),
            solution: Solution::Colored(vec![path, vec![5]]),
            seed: "render".to_string(),
            generation_seed: "render".to_string(),
            params: GenerationRequest::default(),
            low_quality: false,
        };
        assert_eq!(level.render(), "Aa#\naaB\n");

        // Cells outside the grid are skipped
        level.starts.push(Start { color: 2, index: 60 });
        level.solution = Solution::Colored(vec![vec![0, 1, 4, 3], vec![5, 60]]);
        assert_eq!(level.render(), "Aa#\naaB\n");
    }

    #[test]
    fn test_pair_matches() {
        let pair: Pair = Pair { color: 0, a: 3, b: 9 };
        assert!(pair.matches(3, 9));
        assert!(pair.matches(9, 3));
        assert!(!pair.matches(3, 3));
    }

    #[test]
    fn test_solution_serialization() {
        let path: Solution = Solution::Path(vec![0, 1, 3, 2]);
        let colored: Solution = Solution::Colored(vec![vec![0, 1], vec![3, 2]]);
        assert_eq!(serde_json::to_string(&path).unwrap(), "[0,1,3,2]");
        assert_eq!(serde_json::to_string(&colored).unwrap(), "[[0,1],[3,2]]");
        assert_eq!(serde_json::from_str::<Solution>("[0,1,3,2]").unwrap(), path);
        assert_eq!(
            serde_json::from_str::<Solution>("[[0,1],[3,2]]").unwrap(),
            colored
        );
        assert_eq!(colored.paths(), vec![&[0, 1][..], &[3, 2][..]]);
    }
}
