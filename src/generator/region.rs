/*
region.rs

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

//! Grow an irregular region of open cells.
//!
//! The region starts from the center of the rectangle and grows one 2x2 block of a [`Lattice`]
//! at a time. At each step a free block next to the region (the frontier) is drawn and opened,
//! so the region is connected by construction. Blocks with many open neighbors are preferred,
//! which keeps the region compact.
//!
//! Dominoes, pairs of cells laid against a free side of a block, then roughen the outline, and
//! a single cell completes a target size that is not even. Such a region always has a covering
//! path: [`super::hamiltonian`] builds it from a spanning tree of the blocks.
//!
//! When the lattice is too small for the target (rectangles with an odd side and very few
//! holes), the missing cells are grown one at a time. The draw then prefers the minority
//! checkerboard color, because a path alternates colors and cannot exist when the difference
//! is greater than one.

use log::{debug, warn};
use std::collections::VecDeque;
use std::fmt;

use super::grid::{Direction, Grid, Lattice, OpenSet};
use super::prng::Prng;

/// Number of cells in a lattice block.
const BLOCK_CELLS: usize = 4;

/// Type of errors.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionError {
    /// The frontier was exhausted before the target size was reached.
    /// The smaller region is provided so that the caller can decide to use it.
    UnreachableTarget { region: OpenSet, target: usize },
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RegionError::UnreachableTarget { region, target } => write!(
                f,
                "region growth stalled at {} cells instead of {target}",
                region.len()
            ),
        }
    }
}

impl std::error::Error for RegionError {}

/// [`RegionGrower`] object.
#[derive(Debug, Clone)]
pub struct RegionGrower {
    /// Bounding rectangle.
    grid: Grid,

    /// Number of open cells to reach.
    target: usize,
}

impl RegionGrower {
    /// Create the object. The target is clamped to the size of the rectangle.
    pub fn new(grid: Grid, target: usize) -> Self {
        Self {
            grid,
            target: target.clamp(1, grid.num_cells().max(1)),
        }
    }

    /// Number of open cells for the given rectangle and proportion of blocked cells.
    pub fn target_for(grid: Grid, hole_density: f64) -> usize {
        let density: f64 = if hole_density.is_finite() {
            hole_density.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let n: f64 = (grid.num_cells() as f64 * (1.0 - density)).round();
        (n as usize).clamp(1, grid.num_cells().max(1))
    }

    /// Number of open cells to reach.
    pub fn target(&self) -> usize {
        self.target
    }

    /// Grow and return the region.
    ///
    /// # Errors
    ///
    /// The method returns [`RegionError::UnreachableTarget`] when the region cannot grow any
    /// further before reaching the target size. The error carries the smaller region.
    pub fn grow(&self, prng: &mut Prng) -> Result<OpenSet, RegionError> {
        if self.target >= self.grid.num_cells() {
            debug!("Region covers the whole {}x{} rectangle", self.grid.width, self.grid.height);
            return Ok(OpenSet::full(self.grid));
        }

        let mut open: OpenSet = OpenSet::new(self.grid);
        if self.target >= BLOCK_CELLS
            && let Some(lattice) = self.pick_lattice(prng)
        {
            // Some blocks are traded for pairs of dominoes, as long as the lattice keeps
            // enough free blocks to lay them
            let blocks: usize = self.target / BLOCK_CELLS;
            let free: usize = lattice.len().saturating_sub(blocks);
            let traded: usize = prng.rand_int(0, (blocks.isqrt() / 2).min(free));
            self.grow_blocks(&lattice, blocks - traded, &mut open, prng);
            self.add_dominoes(&lattice, &mut open, prng);
            self.add_single(&mut open, prng);
        }
        if open.len() < self.target {
            debug!(
                "Growing the last {} cells one at a time",
                self.target - open.len()
            );
            self.grow_cells(&mut open, prng);
        }

        // The region is connected by construction. Still verify it, because a
        // disconnected region would make every later step fail.
        if !open.is_connected() {
            warn!("Grown region is not connected: bridging the components");
            bridge_components(&mut open);
        }

        debug!(
            "Region grown: {} cells (target {}), colors {:?}",
            open.len(),
            self.target,
            open.parity_counts()
        );

        if open.len() < self.target {
            return Err(RegionError::UnreachableTarget {
                region: open,
                target: self.target,
            });
        }
        Ok(open)
    }

    /// Return the lattice alignment with the most blocks. Ties are broken at random.
    fn pick_lattice(&self, prng: &mut Prng) -> Option<Lattice> {
        let alignments: [Lattice; 4] = Lattice::alignments(self.grid);
        let largest: usize = alignments.iter().map(Lattice::len).max()?;
        if largest == 0 {
            return None;
        }
        let candidates: Vec<Lattice> = alignments
            .into_iter()
            .filter(|l| l.len() == largest)
            .collect();
        prng.choice(&candidates).copied()
    }

    /// Open `count` blocks, starting from the block closest to the center.
    fn grow_blocks(&self, lattice: &Lattice, count: usize, open: &mut OpenSet, prng: &mut Prng) {
        let center: usize = self.grid.center();
        let Some(start) = (0..lattice.len())
            .min_by_key(|b| (self.grid.distance(center, lattice.top_left(*b)), *b))
        else {
            return;
        };
        if count == 0 {
            return;
        }

        let mut seen: Vec<bool> = vec![false; lattice.len()];
        let mut frontier: Vec<usize> = Vec::new();
        self.open_block(lattice, start, open, &mut frontier, &mut seen);

        let mut placed: usize = 1;
        let mut weights: Vec<f64> = Vec::with_capacity(lattice.len());
        while placed < count && !frontier.is_empty() {
            weights.clear();
            weights.extend(frontier.iter().map(|block| {
                let neighbors: usize = lattice
                    .get_adjacent(*block)
                    .iter()
                    .filter(|b| open.contains(lattice.top_left(*b)))
                    .count();
                1.0 + neighbors as f64
            }));

            let Some(&block) = prng.weighted_choice(&frontier, &weights) else {
                break;
            };
            if let Some(pos) = frontier.iter().position(|b| *b == block) {
                frontier.swap_remove(pos);
            }
            self.open_block(lattice, block, open, &mut frontier, &mut seen);
            placed += 1;
        }
        debug!("Region blocks: {placed} of {count}");
    }

    /// Open the block and add its new neighbors to the frontier.
    fn open_block(
        &self,
        lattice: &Lattice,
        block: usize,
        open: &mut OpenSet,
        frontier: &mut Vec<usize>,
        seen: &mut [bool],
    ) {
        for cell in self.grid.block_cells(lattice.top_left(block)) {
            open.insert(cell);
        }
        seen[block] = true;
        for n in lattice.get_adjacent(block).iter() {
            if !seen[n] {
                seen[n] = true;
                frontier.push(n);
            }
        }
    }

    /// Lay dominoes against the free sides of the open blocks until fewer than two cells are
    /// missing.
    fn add_dominoes(&self, lattice: &Lattice, open: &mut OpenSet, prng: &mut Prng) {
        let mut candidates: Vec<[usize; 2]> = Vec::new();
        while self.target.saturating_sub(open.len()) >= 2 {
            candidates.clear();
            for block in 0..lattice.len() {
                if !open.is_block_open(lattice.top_left(block)) {
                    continue;
                }
                for direction in Direction::ALL {
                    if let Some(cells) = lattice.beyond(block, direction)
                        && cells.iter().all(|c| !open.contains(*c))
                    {
                        candidates.push(cells);
                    }
                }
            }
            let Some(&[a, b]) = prng.choice(&candidates) else {
                debug!("No free block side left for a domino");
                return;
            };
            open.insert(a);
            open.insert(b);
        }
    }

    /// Open a single cell next to the region when one cell is missing.
    fn add_single(&self, open: &mut OpenSet, prng: &mut Prng) {
        if open.len() + 1 != self.target {
            return;
        }
        let candidates: Vec<usize> = (0..self.grid.num_cells())
            .filter(|c| {
                !open.contains(*c) && self.grid.get_adjacent(*c).iter().any(|n| open.contains(n))
            })
            .collect();
        if let Some(&cell) = prng.choice(&candidates) {
            open.insert(cell);
        }
    }

    /// Open cells one at a time until the target is reached or the frontier is exhausted.
    fn grow_cells(&self, open: &mut OpenSet, prng: &mut Prng) {
        let num_cells: usize = self.grid.num_cells();
        let mut in_frontier: Vec<bool> = vec![false; num_cells];
        let mut frontier: Vec<usize> = Vec::new();
        let mut colors: [usize; 2] = [0, 0];

        if open.is_empty() {
            self.open_cell(
                self.grid.center(),
                open,
                &mut colors,
                &mut frontier,
                &mut in_frontier,
            );
        } else {
            colors = open.parity_counts();
            let cells: Vec<usize> = open.iter().collect();
            for cell in cells {
                self.extend_frontier(cell, open, &mut frontier, &mut in_frontier);
            }
        }

        let mut weights: Vec<f64> = Vec::with_capacity(num_cells);
        while open.len() < self.target && !frontier.is_empty() {
            let minority: Option<usize> = match colors[0].cmp(&colors[1]) {
                std::cmp::Ordering::Less => Some(0),
                std::cmp::Ordering::Greater => Some(1),
                std::cmp::Ordering::Equal => None,
            };

            // Only minority cells are eligible when the imbalance reaches two, or when the
            // last cell would leave the region unbalanced
            let imbalance: usize = colors[0].abs_diff(colors[1]);
            let last_cell: bool = open.len() + 1 == self.target;
            let forced: bool = (imbalance >= 2 || (imbalance == 1 && last_cell))
                && frontier
                    .iter()
                    .any(|c| minority == Some(self.grid.parity(*c)));

            weights.clear();
            weights.extend(frontier.iter().map(|cell| {
                let is_minority: bool = minority == Some(self.grid.parity(*cell));
                if forced && !is_minority {
                    return 0.0;
                }
                let mut w: f64 = 1.0 + open.degree(*cell) as f64;
                if is_minority {
                    w += 2.0;
                }
                w
            }));

            let Some(&cell) = prng.weighted_choice(&frontier, &weights) else {
                break;
            };
            if let Some(pos) = frontier.iter().position(|c| *c == cell) {
                frontier.swap_remove(pos);
            }
            self.open_cell(cell, open, &mut colors, &mut frontier, &mut in_frontier);
        }
    }

    /// Open the cell and add its new neighbors to the frontier.
    fn open_cell(
        &self,
        cell: usize,
        open: &mut OpenSet,
        colors: &mut [usize; 2],
        frontier: &mut Vec<usize>,
        in_frontier: &mut [bool],
    ) {
        open.insert(cell);
        colors[self.grid.parity(cell)] += 1;
        self.extend_frontier(cell, open, frontier, in_frontier);
    }

    fn extend_frontier(
        &self,
        cell: usize,
        open: &OpenSet,
        frontier: &mut Vec<usize>,
        in_frontier: &mut [bool],
    ) {
        for n in self.grid.get_adjacent(cell).iter() {
            if !open.contains(n) && !in_frontier[n] {
                in_frontier[n] = true;
                frontier.push(n);
            }
        }
    }
}

/// Connect all the components of the open set to its largest component by opening the cells
/// along the shortest 4-neighbor path between them.
pub fn bridge_components(open: &mut OpenSet) {
    let grid: Grid = open.grid();
    loop {
        let components: Vec<Vec<usize>> = open.components();
        if components.len() <= 1 {
            return;
        }
        let Some(main) = components
            .iter()
            .enumerate()
            .max_by_key(|(i, c)| (c.len(), std::cmp::Reverse(*i)))
            .map(|(_, c)| c)
        else {
            return;
        };

        // Multi-source breadth-first search from the main component
        let mut parent: Vec<Option<usize>> = vec![None; grid.num_cells()];
        let mut seen: Vec<bool> = vec![false; grid.num_cells()];
        let mut queue: VecDeque<usize> = VecDeque::new();
        for cell in main {
            seen[*cell] = true;
            queue.push_back(*cell);
        }

        let mut reached: Option<usize> = None;
        while let Some(cell) = queue.pop_front() {
            if open.contains(cell) && main.binary_search(&cell).is_err() {
                reached = Some(cell);
                break;
            }
            for n in grid.get_adjacent(cell).iter() {
                if !seen[n] {
                    seen[n] = true;
                    parent[n] = Some(cell);
                    queue.push_back(n);
                }
            }
        }

        let Some(mut cell) = reached else {
            warn!("Cannot bridge the region components");
            return;
        };
        while let Some(p) = parent[cell] {
            open.insert(p);
            cell = p;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Number of open cells with a single open neighbor.
    fn dead_ends(region: &OpenSet) -> usize {
        region.iter().filter(|c| region.degree(*c) == 1).count()
    }

    #[test]
    fn test_target_for() {
        assert_eq!(RegionGrower::target_for(Grid::new(10, 12), 0.15), 102);
        assert_eq!(RegionGrower::target_for(Grid::new(4, 4), 0.0), 16);
        assert_eq!(RegionGrower::target_for(Grid::new(4, 4), 1.0), 1);
        assert_eq!(RegionGrower::target_for(Grid::new(4, 4), f64::NAN), 16);
    }

    #[test]
    fn test_grow_reaches_target() {
        let grower: RegionGrower = RegionGrower::new(Grid::new(10, 12), 102);
        let region: OpenSet = grower.grow(&mut Prng::from_seed("8f3kz2")).unwrap();
        assert_eq!(region.len(), 102);
        assert!(region.is_connected());
        let colors: [usize; 2] = region.parity_counts();
        assert!(colors[0].abs_diff(colors[1]) <= 1);
    }

    #[test]
    fn test_grow_is_deterministic() {
        let grower: RegionGrower = RegionGrower::new(Grid::new(9, 7), 40);
        let a: OpenSet = grower.grow(&mut Prng::from_seed("same")).unwrap();
        let b: OpenSet = grower.grow(&mut Prng::from_seed("same")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_grow_full_rectangle() {
        let grower: RegionGrower = RegionGrower::new(Grid::new(4, 4), 100);
        assert_eq!(grower.target(), 16);
        let region: OpenSet = grower.grow(&mut Prng::from_seed("full")).unwrap();
        assert_eq!(region, OpenSet::full(Grid::new(4, 4)));
    }

    #[test]
    fn test_large_regions_have_no_spurs() {
        for (size, target) in [(20, 340), (20, 241), (40, 1360), (40, 799)] {
            for seed in ["a", "b", "c", "d"] {
                let grower: RegionGrower = RegionGrower::new(Grid::new(size, size), target);
                let region: OpenSet = grower.grow(&mut Prng::from_seed(seed)).unwrap();
                assert_eq!(region.len(), target);
                assert!(region.is_connected());
                // Only the single cell that completes an odd target can be a dead end
                assert!(dead_ends(&region) <= target % 2, "{size}x{size} seed {seed}");
            }
        }
    }

    #[test]
    fn test_grow_narrow_rectangle() {
        // The 2x2 lattice covers 4 cells of the 3x3 square: dominoes fill the strips
        let grower: RegionGrower = RegionGrower::new(Grid::new(3, 3), 8);
        let region: OpenSet = grower.grow(&mut Prng::from_seed("narrow")).unwrap();
        assert_eq!(region.len(), 8);
        assert!(region.is_connected());

        // Too small for a block
        let grower: RegionGrower = RegionGrower::new(Grid::new(3, 3), 3);
        let region: OpenSet = grower.grow(&mut Prng::from_seed("tiny")).unwrap();
        assert_eq!(region.len(), 3);
        assert!(region.is_connected());
    }

    #[test]
    fn test_bridge_components() {
        let mut open: OpenSet = OpenSet::from_rows(&["..#..", "##...", "#####", "....#"]);
        assert_eq!(open.components().len(), 3);
        bridge_components(&mut open);
        assert!(open.is_connected());
        assert!(open.len() > 11);
    }
}
