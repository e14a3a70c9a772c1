/*
validator.rs

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

//! Verify drawn paths against a level.
//!
//! Each check can be run on its own. [`validate`] runs all of them and collects the problems
//! in a [`ValidationReport`].

use std::collections::BTreeMap;
use std::fmt;

use super::grid::{Grid, OpenSet};
use super::level::{Level, Mode};

/// Problem found in the drawn paths.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    /// Open cells that no path covers.
    Uncovered { cells: Vec<usize> },

    /// A cell claimed by several colors.
    Overlap { cell: usize, colors: Vec<usize> },

    /// A path goes through a blocked cell or a cell outside the grid.
    NotOpen { color: usize, cell: usize },

    /// Two consecutive cells of a path are not adjacent.
    NotAdjacent { color: usize, from: usize, to: usize },

    /// A path goes several times through the same cell.
    Repeated { color: usize, cell: usize },

    /// A path is drawn for a color that the level does not have.
    UnknownColor { color: usize },

    /// The single path does not visit every open cell.
    NotCovering { color: usize },

    /// The path of a color does not contain its starting cell.
    MissingStart { color: usize, cell: usize },

    /// The ends of the path of a color are not its pair.
    PairMismatch { color: usize, a: usize, b: usize },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationIssue::Uncovered { cells } => {
                write!(f, "{} open cells are not covered: {cells:?}", cells.len())
            }
            ValidationIssue::Overlap { cell, colors } => {
                write!(f, "cell {cell} is claimed by colors {colors:?}")
            }
            ValidationIssue::NotOpen { color, cell } => {
                write!(f, "color {color}: cell {cell} is not an open cell")
            }
            ValidationIssue::NotAdjacent { color, from, to } => {
                write!(f, "color {color}: cells {from} and {to} are not adjacent")
            }
            ValidationIssue::Repeated { color, cell } => {
                write!(f, "color {color}: cell {cell} is visited more than once")
            }
            ValidationIssue::UnknownColor { color } => write!(f, "unknown color {color}"),
            ValidationIssue::NotCovering { color } => {
                write!(f, "color {color}: the path does not visit every open cell")
            }
            ValidationIssue::MissingStart { color, cell } => {
                write!(f, "color {color}: the path does not go through its start {cell}")
            }
            ValidationIssue::PairMismatch { color, a, b } => {
                write!(f, "color {color}: the path does not connect {a} and {b}")
            }
        }
    }
}

/// Result of a validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.issues.is_empty() {
            return write!(f, "valid");
        }
        let messages: Vec<String> = self.issues.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// Verify that the union of the paths is exactly the open cells.
///
/// Cells outside the open set are reported by [`check_simple_path`].
pub fn check_coverage(open: &OpenSet, paths: &[&[usize]]) -> Vec<ValidationIssue> {
    let mut covered: Vec<bool> = vec![false; open.grid().num_cells()];
    for cell in paths.iter().flat_map(|p| p.iter()) {
        if let Some(c) = covered.get_mut(*cell) {
            *c = true;
        }
    }
    let cells: Vec<usize> = open.iter().filter(|c| !covered[*c]).collect();
    if cells.is_empty() {
        Vec::new()
    } else {
        vec![ValidationIssue::Uncovered { cells }]
    }
}

/// Verify that each cell is claimed by at most one color. Every shared cell is reported.
pub fn check_overlap(grid: &Grid, paths: &[&[usize]]) -> Vec<ValidationIssue> {
    let mut claims: Vec<Vec<usize>> = vec![Vec::new(); grid.num_cells()];
    for (color, path) in paths.iter().enumerate() {
        for cell in path.iter() {
            if let Some(colors) = claims.get_mut(*cell)
                && !colors.contains(&color)
            {
                colors.push(color);
            }
        }
    }
    claims
        .into_iter()
        .enumerate()
        .filter(|(_, colors)| colors.len() > 1)
        .map(|(cell, colors)| ValidationIssue::Overlap { cell, colors })
        .collect()
}

/// Verify that the path only goes through open cells, that its consecutive cells are
/// adjacent, and that it does not visit a cell twice.
pub fn check_simple_path(open: &OpenSet, color: usize, path: &[usize]) -> Vec<ValidationIssue> {
    let grid: Grid = open.grid();
    let mut issues: Vec<ValidationIssue> = Vec::new();
    let mut seen: Vec<bool> = vec![false; grid.num_cells()];
    for (i, cell) in path.iter().enumerate() {
        if *cell >= grid.num_cells() || !open.contains(*cell) {
            issues.push(ValidationIssue::NotOpen { color, cell: *cell });
            continue;
        }
        if seen[*cell] {
            issues.push(ValidationIssue::Repeated { color, cell: *cell });
        }
        seen[*cell] = true;
        if i > 0 {
            let previous: usize = path[i - 1];
            if previous >= grid.num_cells() || !grid.is_adjacent(previous, *cell) {
                issues.push(ValidationIssue::NotAdjacent {
                    color,
                    from: previous,
                    to: *cell,
                });
            }
        }
    }
    issues
}

/// Verify the constraints of the level mode.
///
/// * Single path: exactly one path, which visits every open cell.
/// * Starts: the path of each color goes through its starting cell.
/// * Pairs: the ends of the path of each color are its pair, in any order.
pub fn check_mode(level: &Level, paths: &[&[usize]]) -> Vec<ValidationIssue> {
    let mut issues: Vec<ValidationIssue> = Vec::new();
    match level.mode {
        Mode::Single => {
            for (color, path) in paths.iter().enumerate().skip(1) {
                if !path.is_empty() {
                    issues.push(ValidationIssue::UnknownColor { color });
                }
            }
            let path: &[usize] = paths.first().copied().unwrap_or(&[]);
            let mut visited: Vec<bool> = vec![false; level.grid().num_cells()];
            for cell in path {
                if let Some(v) = visited.get_mut(*cell) {
                    *v = true;
                }
            }
            if path.len() != level.region.len() || level.region.iter().any(|c| !visited[c]) {
                issues.push(ValidationIssue::NotCovering { color: 0 });
            }
        }
        Mode::Starts => {
            for start in &level.starts {
                let path: &[usize] = paths.get(start.color).copied().unwrap_or(&[]);
                if !path.contains(&start.index) {
                    issues.push(ValidationIssue::MissingStart {
                        color: start.color,
                        cell: start.index,
                    });
                }
            }
        }
        Mode::Pairs => {
            for pair in &level.pairs {
                let path: &[usize] = paths.get(pair.color).copied().unwrap_or(&[]);
                let connected: bool = match (path.first(), path.last()) {
                    (Some(first), Some(last)) => pair.matches(*first, *last),
                    _ => false,
                };
                if !connected {
                    issues.push(ValidationIssue::PairMismatch {
                        color: pair.color,
                        a: pair.a,
                        b: pair.b,
                    });
                }
            }
        }
    }
    issues
}

/// Run all the checks on paths indexed by color.
pub fn validate_paths(level: &Level, paths: &[&[usize]]) -> ValidationReport {
    let mut issues: Vec<ValidationIssue> = Vec::new();
    for (color, path) in paths.iter().enumerate() {
        issues.extend(check_simple_path(&level.region, color, path));
    }
    issues.extend(check_overlap(&level.grid(), paths));
    issues.extend(check_coverage(&level.region, paths));
    issues.extend(check_mode(level, paths));
    ValidationReport { issues }
}

/// Run all the checks on the paths drawn by the player.
///
/// The colors without a drawn path count as empty paths.
pub fn validate(level: &Level, drawn: &BTreeMap<usize, Vec<usize>>) -> ValidationReport {
    let colors: usize = level.color_count();
    let mut paths: Vec<&[usize]> = vec![&[]; colors];
    let mut unknown: Vec<ValidationIssue> = Vec::new();
    for (color, path) in drawn {
        match paths.get_mut(*color) {
            Some(p) => *p = path.as_slice(),
            None => unknown.push(ValidationIssue::UnknownColor { color: *color }),
        }
    }
    let mut report: ValidationReport = validate_paths(level, &paths);
    report.issues.extend(unknown);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::level::{GenerationRequest, Pair, Solution, Start};
    use crate::generator::metrics::DifficultyMetrics;

    fn level(mode: Mode, region: OpenSet, solution: Solution) -> Level {
        let paths: Vec<&[usize]> = solution.paths();
        let metrics: DifficultyMetrics = DifficultyMetrics::compute(&region, &paths, mode);
        let starts: Vec<Start> = match mode {
            Mode::Pairs => Vec::new(),
            _ => paths
                .iter()
                .enumerate()
                .map(|(color, p)| Start { color, index: p[0] })
                .collect(),
        };
        let pairs: Vec<Pair> = match mode {
            Mode::Pairs => paths
                .iter()
                .enumerate()
                .map(|(color, p)| Pair {
                    color,
                    a: p[0],
                    b: p[p.len() - 1],
                })
                .collect(),
            _ => Vec::new(),
        };
        Level {
            version: 1,
            mode,
            region,
            starts,
            pairs,
            solution,
            metrics,
            seed: "test".to_string(),
            generation_seed: "test".to_string(),
            params: GenerationRequest::default(),
            low_quality: false,
        }
    }

    #[test]
    fn test_valid_single_path() {
        let l: Level = level(
            Mode::Single,
            OpenSet::full(Grid::new(3, 2)),
            Solution::Path(vec![0, 1, 2, 5, 4, 3]),
        );
        let report: ValidationReport = validate_paths(&l, &l.paths());
        assert!(report.is_valid(), "{report}");
    }

    #[test]
    fn test_overlap_names_shared_cell() {
        let grid: Grid = Grid::new(4, 4);
        let paths: [&[usize]; 2] = [&[4, 5, 6, 7], &[3, 7, 11]];
        assert_eq!(
            check_overlap(&grid, &paths),
            vec![ValidationIssue::Overlap {
                cell: 7,
                colors: vec![0, 1]
            }]
        );
    }

    #[test]
    fn test_coverage() {
        let open: OpenSet = OpenSet::from_rows(&["..#", "..."]);
        assert_eq!(
            check_coverage(&open, &[&[0, 1, 4]]),
            vec![ValidationIssue::Uncovered { cells: vec![3, 5] }]
        );
        assert!(check_coverage(&open, &[&[0, 1], &[4, 3, 5]]).is_empty());
    }

    #[test]
    fn test_simple_path() {
        let open: OpenSet = OpenSet::from_rows(&["..#", "..."]);
        assert_eq!(
            check_simple_path(&open, 1, &[0, 1, 2]),
            vec![ValidationIssue::NotOpen { color: 1, cell: 2 }]
        );
        assert_eq!(
            check_simple_path(&open, 0, &[0, 4]),
            vec![ValidationIssue::NotAdjacent {
                color: 0,
                from: 0,
                to: 4
            }]
        );
        assert_eq!(
            check_simple_path(&open, 0, &[0, 1, 0]),
            vec![ValidationIssue::Repeated { color: 0, cell: 0 }]
        );
        assert_eq!(
            check_simple_path(&open, 0, &[0, 99]),
            vec![ValidationIssue::NotOpen { color: 0, cell: 99 }]
        );
    }

    #[test]
    fn test_pairs_in_any_order() {
        let l: Level = level(
            Mode::Pairs,
            OpenSet::full(Grid::new(4, 2)),
            Solution::Colored(vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7]]),
        );
        let mut drawn: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        drawn.insert(0, vec![3, 2, 1, 0]);
        drawn.insert(1, vec![4, 5, 6, 7]);
        assert!(validate(&l, &drawn).is_valid());

        drawn.insert(1, vec![4, 5, 6]);
        let report: ValidationReport = validate(&l, &drawn);
        assert!(!report.is_valid());
        assert!(report.issues.contains(&ValidationIssue::PairMismatch { color: 1, a: 4, b: 7 }));
        assert!(report.issues.contains(&ValidationIssue::Uncovered { cells: vec![7] }));
    }

    #[test]
    fn test_starts() {
        let l: Level = level(
            Mode::Starts,
            OpenSet::full(Grid::new(3, 2)),
            Solution::Colored(vec![vec![0, 1, 2], vec![5, 4, 3]]),
        );
        let mut drawn: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        drawn.insert(0, vec![0, 1, 2, 5]);
        drawn.insert(1, vec![3, 4]);
        let report: ValidationReport = validate(&l, &drawn);
        assert_eq!(
            report.issues,
            vec![ValidationIssue::MissingStart { color: 1, cell: 5 }]
        );

        drawn.insert(4, vec![]);
        assert!(
            validate(&l, &drawn)
                .issues
                .contains(&ValidationIssue::UnknownColor { color: 4 })
        );
    }

    #[test]
    fn test_single_path_must_cover() {
        let l: Level = level(
            Mode::Single,
            OpenSet::full(Grid::new(2, 2)),
            Solution::Path(vec![0, 1, 3, 2]),
        );
        let mut drawn: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        drawn.insert(0, vec![0, 1, 3]);
        let report: ValidationReport = validate(&l, &drawn);
        assert!(report.issues.contains(&ValidationIssue::NotCovering { color: 0 }));
    }
}
