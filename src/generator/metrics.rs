/*
metrics.rs

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

//! Difficulty features of a level.

use serde::{Deserialize, Serialize};

use super::grid::{Direction, Grid, OpenSet};
use super::level::{Difficulty, Mode};

/// Score above which a level is estimated easy.
const EASY_SCORE: f64 = 0.35;

/// Score above which a level is estimated medium.
const MEDIUM_SCORE: f64 = 0.2;

/// Difficulty features computed from the open cells and the solution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DifficultyMetrics {
    /// Number of open cells.
    pub size: usize,

    /// Fraction of the rectangle that is blocked.
    pub hole_density: f64,

    /// Mean number of open neighbors per open cell.
    pub branching_factor: f64,

    /// Fraction of open cells with exactly one open neighbor.
    pub forced_move_ratio: f64,

    /// Fraction of open cells that are in a one-cell wide corridor.
    pub corridors_percent: f64,

    /// Fraction of the interior path steps where the direction changes.
    pub turn_rate: f64,

    /// Fraction of the adjacent open cell pairs that belong to different colors. Not
    /// computed for single-path levels.
    pub intertwine_index: Option<f64>,

    pub estimated_tier: Difficulty,
}

impl DifficultyMetrics {
    /// Compute the metrics.
    pub fn compute(open: &OpenSet, paths: &[&[usize]], mode: Mode) -> Self {
        let grid: Grid = open.grid();
        let size: usize = open.len();

        let mut neighbors_total: usize = 0;
        let mut forced: usize = 0;
        let mut corridors: usize = 0;
        for cell in open.iter() {
            let adjacent = grid.get_adjacent(cell);
            let is_open = |d: Direction| adjacent.get(d).is_some_and(|c| open.contains(c));
            let (up, right, down, left) = (
                is_open(Direction::Up),
                is_open(Direction::Right),
                is_open(Direction::Down),
                is_open(Direction::Left),
            );
            let degree: usize = [up, right, down, left].iter().filter(|o| **o).count();
            neighbors_total += degree;
            if degree == 1 {
                forced += 1;
            }
            if degree == 2 && ((up && down) || (left && right)) {
                corridors += 1;
            }
        }

        let mut metrics: Self = Self {
            size,
            hole_density: 1.0 - size as f64 / grid.num_cells() as f64,
            branching_factor: ratio(neighbors_total, size),
            forced_move_ratio: ratio(forced, size),
            corridors_percent: ratio(corridors, size),
            turn_rate: turn_rate(&grid, paths),
            intertwine_index: match mode {
                Mode::Single => None,
                Mode::Starts | Mode::Pairs => Some(intertwine_index(open, paths)),
            },
            estimated_tier: Difficulty::Medium,
        };
        metrics.estimated_tier = metrics.tier();
        metrics
    }

    /// Return a score between 0 and 1. Easy levels have many forced moves and corridors.
    pub fn score(&self) -> f64 {
        self.forced_move_ratio * 0.5 + self.corridors_percent * 0.5
    }

    fn tier(&self) -> Difficulty {
        let score: f64 = self.score();
        if score >= EASY_SCORE {
            Difficulty::Easy
        } else if score >= MEDIUM_SCORE {
            Difficulty::Medium
        } else {
            Difficulty::Hard
        }
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn turn_rate(grid: &Grid, paths: &[&[usize]]) -> f64 {
    let mut steps: usize = 0;
    let mut turns: usize = 0;
    for path in paths {
        for w in path.windows(3) {
            steps += 1;
            if grid.direction(w[0], w[1]) != grid.direction(w[1], w[2]) {
                turns += 1;
            }
        }
    }
    ratio(turns, steps)
}

fn intertwine_index(open: &OpenSet, paths: &[&[usize]]) -> f64 {
    let grid: Grid = open.grid();
    let mut owner: Vec<Option<usize>> = vec![None; grid.num_cells()];
    for (color, path) in paths.iter().enumerate() {
        for cell in path.iter() {
            if let Some(o) = owner.get_mut(*cell) {
                *o = Some(color);
            }
        }
    }

    // Count each pair once, from its left or top cell
    let mut pairs: usize = 0;
    let mut mixed: usize = 0;
    for cell in open.iter() {
        let adjacent = grid.get_adjacent(cell);
        for d in [Direction::Right, Direction::Down] {
            if let Some(other) = adjacent.get(d).filter(|c| open.contains(*c)) {
                pairs += 1;
                if owner[cell] != owner[other] {
                    mixed += 1;
                }
            }
        }
    }
    ratio(mixed, pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_square() {
        let open: OpenSet = OpenSet::full(Grid::new(3, 3));
        let path: Vec<usize> = vec![0, 1, 2, 5, 4, 3, 6, 7, 8];
        let m: DifficultyMetrics = DifficultyMetrics::compute(&open, &[&path], Mode::Single);
        assert_eq!(m.size, 9);
        assert_eq!(m.hole_density, 0.0);
        assert!((m.branching_factor - 24.0 / 9.0).abs() < 1e-12);
        assert_eq!(m.forced_move_ratio, 0.0);
        assert_eq!(m.corridors_percent, 0.0);
        assert!((m.turn_rate - 4.0 / 7.0).abs() < 1e-12);
        assert_eq!(m.intertwine_index, None);
        assert_eq!(m.estimated_tier, Difficulty::Hard);
    }

    #[test]
    fn test_corridor() {
        let open: OpenSet = OpenSet::from_rows(&["....", "####"]);
        let path: Vec<usize> = vec![0, 1, 2, 3];
        let m: DifficultyMetrics = DifficultyMetrics::compute(&open, &[&path], Mode::Single);
        assert_eq!(m.size, 4);
        assert_eq!(m.hole_density, 0.5);
        assert_eq!(m.branching_factor, 1.5);
        assert_eq!(m.forced_move_ratio, 0.5);
        assert_eq!(m.corridors_percent, 0.5);
        assert_eq!(m.turn_rate, 0.0);
        assert_eq!(m.score(), 0.5);
        assert_eq!(m.estimated_tier, Difficulty::Easy);
    }

    #[test]
    fn test_intertwine_index() {
        let open: OpenSet = OpenSet::full(Grid::new(2, 2));
        let paths: [&[usize]; 2] = [&[0, 1], &[2, 3]];
        let m: DifficultyMetrics = DifficultyMetrics::compute(&open, &paths, Mode::Starts);
        assert_eq!(m.intertwine_index, Some(0.5));
    }

    #[test]
    fn test_cells_outside_grid() {
        let open: OpenSet = OpenSet::full(Grid::new(2, 2));
        let paths: [&[usize]; 2] = [&[0, 1], &[2, 3, 40]];
        let m: DifficultyMetrics = DifficultyMetrics::compute(&open, &paths, Mode::Pairs);
        assert_eq!(m.intertwine_index, Some(0.5));
    }
}
