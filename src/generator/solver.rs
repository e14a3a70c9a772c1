/*
solver.rs

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

//! Backtracking solver.
//!
//! The solver is only used to score generated levels: the number of expansions it needs to
//! find a solution gives an idea of how much searching the level requires.
//!
//! The colors are extended one after the other, from their start cell. In the "starts" mode a
//! color can stop anywhere. In the "pairs" mode a color stops when it reaches its partner
//! cell. A branch is abandoned as soon as the unclaimed cells cannot be covered anymore.

use log::debug;
use std::collections::VecDeque;

use super::grid::{Grid, OpenSet};
use super::level::{Level, Mode};

/// Default maximum number of expansions.
pub const DEFAULT_BUDGET: usize = 200_000;

/// Label of the cells that are not in an unclaimed component.
const NO_COMPONENT: usize = usize::MAX;

/// Result of the search.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    /// A solution was found. The paths are indexed by color.
    Solved {
        paths: Vec<Vec<usize>>,
        expansions: usize,
    },

    /// The whole search space was explored without finding a solution.
    Unsolvable { expansions: usize },

    /// The search gave up after the maximum number of expansions.
    BudgetExhausted { expansions: usize },
}

impl SolveOutcome {
    /// Number of expansions the search performed.
    pub fn expansions(&self) -> usize {
        match self {
            SolveOutcome::Solved { expansions, .. }
            | SolveOutcome::Unsolvable { expansions }
            | SolveOutcome::BudgetExhausted { expansions } => *expansions,
        }
    }

    pub fn is_solved(&self) -> bool {
        matches!(self, SolveOutcome::Solved { .. })
    }
}

/// The expansion budget is exhausted.
struct Exhausted;

/// [`Solver`] object.
pub struct Solver<'a> {
    open: &'a OpenSet,
    mode: Mode,

    /// Start cell and, in the "pairs" mode, partner cell of each color.
    ends: Vec<(usize, Option<usize>)>,

    budget: usize,
    expansions: usize,

    /// Color that claims each cell.
    owner: Vec<Option<usize>>,

    /// Number of open cells that no color claims yet.
    unclaimed: usize,

    /// Path of each color, starting with its start cell.
    paths: Vec<Vec<usize>>,

    /// Whether the start and partner cells are distinct open cells.
    well_formed: bool,

    /// Component label of each unclaimed cell.
    labels: Vec<usize>,
    queue: VecDeque<usize>,
}

impl<'a> Solver<'a> {
    /// Create the object.
    ///
    /// `ends` gives, for each color, its start cell and its partner cell. The partner cell is
    /// only used in the [`Mode::Pairs`] mode.
    pub fn new(
        open: &'a OpenSet,
        mode: Mode,
        ends: Vec<(usize, Option<usize>)>,
        budget: usize,
    ) -> Self {
        let num_cells: usize = open.grid().num_cells();
        let mut owner: Vec<Option<usize>> = vec![None; num_cells];
        let mut well_formed: bool = !ends.is_empty();
        let mut claim = |cell: usize, color: usize| -> bool {
            if cell < num_cells && open.contains(cell) && owner[cell].is_none() {
                owner[cell] = Some(color);
                true
            } else {
                false
            }
        };
        for (color, (start, partner)) in ends.iter().enumerate() {
            well_formed &= claim(*start, color);
            if mode == Mode::Pairs {
                well_formed &= match partner {
                    Some(p) => claim(*p, color),
                    None => false,
                };
            }
        }
        let claimed: usize = owner.iter().filter(|o| o.is_some()).count();

        Self {
            open,
            mode,
            paths: ends.iter().map(|(start, _)| vec![*start]).collect(),
            ends,
            budget,
            expansions: 0,
            owner,
            unclaimed: open.len().saturating_sub(claimed),
            well_formed,
            labels: vec![NO_COMPONENT; num_cells],
            queue: VecDeque::new(),
        }
    }

    /// Create the object for solving the given level.
    pub fn for_level(level: &'a Level, budget: usize) -> Self {
        let ends: Vec<(usize, Option<usize>)> = match level.mode {
            Mode::Single => level.starts.iter().take(1).map(|s| (s.index, None)).collect(),
            Mode::Starts => {
                let mut starts = level.starts.clone();
                starts.sort_by_key(|s| s.color);
                starts.iter().map(|s| (s.index, None)).collect()
            }
            Mode::Pairs => {
                let mut pairs = level.pairs.clone();
                pairs.sort_by_key(|p| p.color);
                pairs.iter().map(|p| (p.a, Some(p.b))).collect()
            }
        };
        Self::new(&level.region, level.mode, ends, budget)
    }

    /// Run the search.
    pub fn solve(&mut self) -> SolveOutcome {
        if !self.well_formed {
            debug!("Solver: invalid start or partner cells");
            return SolveOutcome::Unsolvable { expansions: 0 };
        }
        let outcome: SolveOutcome = match self.search(0) {
            Ok(true) => SolveOutcome::Solved {
                paths: self.paths.clone(),
                expansions: self.expansions,
            },
            Ok(false) => SolveOutcome::Unsolvable {
                expansions: self.expansions,
            },
            Err(Exhausted) => SolveOutcome::BudgetExhausted {
                expansions: self.expansions,
            },
        };
        debug!("Solver: {outcome:?}");
        outcome
    }

    fn head(&self, color: usize) -> usize {
        self.paths[color]
            .last()
            .copied()
            .unwrap_or(self.ends[color].0)
    }

    fn partner(&self, color: usize) -> Option<usize> {
        match self.mode {
            Mode::Pairs => self.ends[color].1,
            Mode::Single | Mode::Starts => None,
        }
    }

    /// Number of unclaimed open neighbors of the cell.
    fn free_count(&self, cell: usize) -> usize {
        self.open
            .grid()
            .get_adjacent(cell)
            .iter()
            .filter(|c| self.open.contains(*c) && self.owner[*c].is_none())
            .count()
    }

    /// Extend the path of the given color, then the paths of the following colors.
    fn search(&mut self, color: usize) -> Result<bool, Exhausted> {
        if color == self.ends.len() {
            return Ok(self.unclaimed == 0);
        }

        self.expansions += 1;
        if self.expansions > self.budget {
            return Err(Exhausted);
        }

        let head: usize = self.head(color);
        let partner: Option<usize> = self.partner(color);
        if partner == Some(head) {
            return self.search(color + 1);
        }
        if !self.is_viable(color) {
            return Ok(false);
        }

        // Fewest onward moves first. Reaching the partner cell ends the color, so try it first.
        let grid: Grid = self.open.grid();
        let mut next: Vec<usize> = grid
            .get_adjacent(head)
            .iter()
            .filter(|c| {
                self.open.contains(*c) && (self.owner[*c].is_none() || partner == Some(*c))
            })
            .collect();
        next.sort_by_key(|c| {
            if partner == Some(*c) {
                0
            } else {
                self.free_count(*c) + 1
            }
        });

        for cell in next {
            let claimed: bool = self.owner[cell].is_none();
            if claimed {
                self.owner[cell] = Some(color);
                self.unclaimed -= 1;
            }
            self.paths[color].push(cell);

            let res: Result<bool, Exhausted> = self.search(color);

            if let Ok(true) = res {
                return res;
            }
            self.paths[color].pop();
            if claimed {
                self.owner[cell] = None;
                self.unclaimed += 1;
            }
            res?;
        }

        // Without a partner, the color can stop here
        if partner.is_none() {
            return self.search(color + 1);
        }
        Ok(false)
    }

    /// Whether the unclaimed cells can still be covered by the unfinished colors.
    ///
    /// * A path cannot leave the unclaimed component it enters, so there cannot be more
    ///   components than unfinished colors.
    /// * Every component must be next to the head of an unfinished color.
    /// * In the "pairs" mode, a color must enter and leave the component through its head and
    ///   its partner, so every component must be next to both. Each unfinished color must
    ///   also still be able to reach its partner.
    /// * In the "pairs" mode, a component sealed to a 2x2 block must be crossed between two
    ///   adjacent cells. See [`Solver::has_sealed_block`].
    fn is_viable(&mut self, color: usize) -> bool {
        let components: usize = self.label_components();
        let active: usize = self.ends.len() - color;
        if components > active {
            return false;
        }

        let grid: Grid = self.open.grid();
        let touching = |labels: &[usize], cell: usize| -> Vec<usize> {
            grid.get_adjacent(cell)
                .iter()
                .map(|c| labels[c])
                .filter(|l| *l != NO_COMPONENT)
                .collect()
        };

        let mut reachable: Vec<bool> = vec![false; components];
        for c in color..self.ends.len() {
            let head: usize = self.head(c);
            let from_head: Vec<usize> = touching(&self.labels, head);
            match self.partner(c) {
                None => {
                    for l in from_head {
                        reachable[l] = true;
                    }
                }
                Some(partner) => {
                    let to_partner: Vec<usize> = touching(&self.labels, partner);
                    let shared: Vec<usize> = from_head
                        .into_iter()
                        .filter(|l| to_partner.contains(l))
                        .collect();
                    if shared.is_empty() && !grid.is_adjacent(head, partner) {
                        return false;
                    }
                    for l in shared {
                        reachable[l] = true;
                    }
                }
            }
        }
        if !reachable.iter().all(|r| *r) {
            return false;
        }
        self.mode != Mode::Pairs || !self.has_sealed_block(color, components)
    }

    /// Whether an unclaimed component is a fully-open 2x2 block that cannot be covered.
    ///
    /// When a single unfinished color has both its head and its partner next to the block,
    /// that color must go through the four cells. A path through a 2x2 block starts and ends
    /// on two adjacent cells, which have opposite checkerboard colors. The block is sealed
    /// when no such pair of cells faces the head and the partner.
    fn has_sealed_block(&self, color: usize, components: usize) -> bool {
        let grid: Grid = self.open.grid();
        let mut sizes: Vec<usize> = vec![0; components];
        let mut top_lefts: Vec<usize> = vec![NO_COMPONENT; components];
        for cell in self.open.iter() {
            let label: usize = self.labels[cell];
            if label != NO_COMPONENT {
                sizes[label] += 1;
                if top_lefts[label] == NO_COMPONENT {
                    top_lefts[label] = cell;
                }
            }
        }

        (0..components)
            .filter(|l| sizes[*l] == 4 && self.open.is_block_open(top_lefts[*l]))
            .any(|label| {
                let block: [usize; 4] = grid.block_cells(top_lefts[label]);
                if block.iter().any(|c| self.labels[*c] != label) {
                    return false;
                }
                let facing = |cell: usize| -> Vec<usize> {
                    block
                        .iter()
                        .copied()
                        .filter(|b| grid.is_adjacent(*b, cell))
                        .collect()
                };
                let mut crossing = (color..self.ends.len()).filter_map(|c| {
                    let from_head: Vec<usize> = facing(self.head(c));
                    let to_partner: Vec<usize> = facing(self.partner(c)?);
                    (!from_head.is_empty() && !to_partner.is_empty())
                        .then_some((from_head, to_partner))
                });
                match (crossing.next(), crossing.next()) {
                    (Some((from_head, to_partner)), None) => !from_head
                        .iter()
                        .any(|a| to_partner.iter().any(|x| grid.is_adjacent(*a, *x))),
                    _ => false,
                }
            })
    }

    /// Label the components of the unclaimed cells and return their number.
    fn label_components(&mut self) -> usize {
        let grid: Grid = self.open.grid();
        self.labels.fill(NO_COMPONENT);
        let mut count: usize = 0;
        for cell in self.open.iter() {
            if self.owner[cell].is_some() || self.labels[cell] != NO_COMPONENT {
                continue;
            }
            self.labels[cell] = count;
            self.queue.clear();
            self.queue.push_back(cell);
            while let Some(c) = self.queue.pop_front() {
                for n in grid.get_adjacent(c).iter() {
                    if self.open.contains(n)
                        && self.owner[n].is_none()
                        && self.labels[n] == NO_COMPONENT
                    {
                        self.labels[n] = count;
                        self.queue.push_back(n);
                    }
                }
            }
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(open: &OpenSet, paths: &[Vec<usize>]) {
        let grid: Grid = open.grid();
        let mut cells: Vec<usize> = paths.iter().flatten().copied().collect();
        cells.sort_unstable();
        assert_eq!(cells, open.iter().collect::<Vec<usize>>());
        for path in paths {
            for w in path.windows(2) {
                assert!(grid.is_adjacent(w[0], w[1]));
            }
        }
    }

    #[test]
    fn test_single_path() {
        let open: OpenSet = OpenSet::full(Grid::new(3, 3));
        let mut solver: Solver = Solver::new(&open, Mode::Single, vec![(0, None)], DEFAULT_BUDGET);
        match solver.solve() {
            SolveOutcome::Solved { paths, expansions } => {
                assert_eq!(paths.len(), 1);
                assert_eq!(paths[0][0], 0);
                assert_covers(&open, &paths);
                assert!(expansions >= 9);
            }
            outcome => panic!("unexpected outcome {outcome:?}"),
        }
    }

    #[test]
    fn test_single_path_wrong_color_start() {
        // Five cells of one checkerboard color and four of the other: the path must start on
        // the majority color
        let open: OpenSet = OpenSet::full(Grid::new(3, 3));
        let mut solver: Solver = Solver::new(&open, Mode::Single, vec![(1, None)], DEFAULT_BUDGET);
        assert!(matches!(solver.solve(), SolveOutcome::Unsolvable { .. }));
    }

    #[test]
    fn test_starts() {
        let open: OpenSet = OpenSet::full(Grid::new(3, 2));
        let mut solver: Solver = Solver::new(
            &open,
            Mode::Starts,
            vec![(0, None), (5, None)],
            DEFAULT_BUDGET,
        );
        match solver.solve() {
            SolveOutcome::Solved { paths, .. } => {
                assert_eq!(paths[0][0], 0);
                assert_eq!(paths[1][0], 5);
                assert_covers(&open, &paths);
            }
            outcome => panic!("unexpected outcome {outcome:?}"),
        }
    }

    #[test]
    fn test_pairs() {
        let open: OpenSet = OpenSet::full(Grid::new(4, 2));
        let mut solver: Solver = Solver::new(
            &open,
            Mode::Pairs,
            vec![(0, Some(3)), (4, Some(7))],
            DEFAULT_BUDGET,
        );
        match solver.solve() {
            SolveOutcome::Solved { paths, .. } => {
                assert_eq!(paths[0].first(), Some(&0));
                assert_eq!(paths[0].last(), Some(&3));
                assert_eq!(paths[1].first(), Some(&4));
                assert_eq!(paths[1].last(), Some(&7));
                assert_covers(&open, &paths);
            }
            outcome => panic!("unexpected outcome {outcome:?}"),
        }
    }

    #[test]
    fn test_pairs_crossing() {
        // The two pairs must cross each other in a 2x2 square
        let open: OpenSet = OpenSet::full(Grid::new(2, 2));
        let mut solver: Solver = Solver::new(
            &open,
            Mode::Pairs,
            vec![(0, Some(3)), (1, Some(2))],
            DEFAULT_BUDGET,
        );
        assert!(matches!(solver.solve(), SolveOutcome::Unsolvable { .. }));
    }

    #[test]
    fn test_pairs_sealed_block() {
        // The head and the partner face two cells of the same checkerboard color of the
        // remaining 2x2 block
        let open: OpenSet = OpenSet::from_rows(&["...#", "#..."]);
        let mut solver: Solver =
            Solver::new(&open, Mode::Pairs, vec![(0, Some(7))], DEFAULT_BUDGET);
        assert_eq!(solver.label_components(), 1);
        assert!(!solver.is_viable(0));
        assert_eq!(solver.solve(), SolveOutcome::Unsolvable { expansions: 1 });
    }

    #[test]
    fn test_pairs_open_block() {
        let open: OpenSet = OpenSet::from_rows(&["....", "#..#"]);
        let mut solver: Solver =
            Solver::new(&open, Mode::Pairs, vec![(0, Some(3))], DEFAULT_BUDGET);
        assert!(solver.is_viable(0));
        match solver.solve() {
            SolveOutcome::Solved { paths, .. } => {
                assert_eq!(paths[0], vec![0, 1, 5, 6, 2, 3]);
                assert_covers(&open, &paths);
            }
            outcome => panic!("unexpected outcome {outcome:?}"),
        }
    }

    #[test]
    fn test_budget() {
        let open: OpenSet = OpenSet::full(Grid::new(6, 6));
        let mut solver: Solver = Solver::new(&open, Mode::Single, vec![(0, None)], 1);
        assert_eq!(
            solver.solve(),
            SolveOutcome::BudgetExhausted { expansions: 2 }
        );
    }

    #[test]
    fn test_invalid_ends() {
        let open: OpenSet = OpenSet::from_rows(&["#.", ".."]);
        let mut solver: Solver = Solver::new(&open, Mode::Single, vec![(0, None)], 10);
        assert_eq!(solver.solve(), SolveOutcome::Unsolvable { expansions: 0 });
        let mut solver: Solver = Solver::new(&open, Mode::Pairs, vec![(1, Some(1))], 10);
        assert_eq!(solver.solve(), SolveOutcome::Unsolvable { expansions: 0 });
    }
}
