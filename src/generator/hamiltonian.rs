/*
hamiltonian.rs

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

//! Build a path that visits every open cell exactly once.
//!
//! Three strategies are tried in order:
//!
//! * Strip-and-stitch. The open cells are grouped in maximal runs along the rows (or the
//!   columns), and the runs are traversed in serpentine order. This is instantaneous and always
//!   works for full rectangles, but irregular regions often break the alignment between runs.
//! * Spanning tree. The region is split into the aligned 2x2 blocks of a [`Lattice`] and a few
//!   leftover cells. A random spanning tree of the blocks gives a cycle through all the block
//!   cells: the cycle follows the sides of each block, except where a tree edge joins two
//!   blocks. Pairs of leftover cells are spliced into the cycle edge they lean on, and at most
//!   two single cells become the ends of the path. The regions that
//!   [`super::region::RegionGrower`] produces always succeed.
//! * Randomized backtracking. A depth-first search from a few starting cells, with the
//!   neighbors visited in random order, preferring the neighbors with the fewest onward moves.
//!   The number of node expansions is bounded so that the latency stays under control.
//!
//! Whatever the strategy, the final path is verified before being returned.

use log::{Level, debug, log_enabled};
use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use super::grid::{Direction, Grid, Lattice, OpenSet};
use super::path::Path;
use super::prng::Prng;

/// Check the deadline every this number of node expansions.
const DEADLINE_CHECK_INTERVAL: usize = 64;

/// Free link slot in a [`Cycle`].
const UNLINKED: usize = usize::MAX;

/// Type of errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HamiltonianError {
    /// No path found: the region might not be coverable, or the search budget was exhausted.
    NoPath,

    /// The deadline passed before a path was found.
    DurationExceeded,
}

impl fmt::Display for HamiltonianError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HamiltonianError::NoPath => write!(f, "no path covering the region was found"),
            HamiltonianError::DurationExceeded => {
                write!(f, "the deadline passed before a covering path was found")
            }
        }
    }
}

impl std::error::Error for HamiltonianError {}

/// Strategy that produced a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    StripAndStitch,
    SpanningTree,
    Backtracking,
}

/// Strip orientation and serpentine parity for the strip-and-stitch strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
enum StripVariant {
    Rows { flipped: bool },
    Columns { flipped: bool },
}

impl StripVariant {
    /// Variants in the order they are tried.
    const ALL: [StripVariant; 4] = [
        StripVariant::Rows { flipped: false },
        StripVariant::Rows { flipped: true },
        StripVariant::Columns { flipped: false },
        StripVariant::Columns { flipped: true },
    ];
}

/// Outcome of the search from a starting cell.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SearchError {
    NoPath,
    BudgetExhausted,
    DurationExceeded,
}

/// [`HamiltonianPathBuilder`] object.
pub struct HamiltonianPathBuilder {
    /// Number of strip-and-stitch variants to try.
    strip_attempts: usize,

    /// Number of starting cells to try for the backtracking search.
    dfs_candidates: usize,

    /// Maximum number of node expansions per starting cell.
    dfs_budget: usize,

    /// Time after which the search gives up.
    deadline: Option<Instant>,

    /// Number of node expansions it took to build the last path.
    pub iteration: usize,

    /// Duration in seconds it took to build the last path.
    pub duration: f32,

    /// Strategy that produced the last path.
    pub strategy: Option<Strategy>,
}

impl HamiltonianPathBuilder {
    /// Create the object.
    pub fn new(strip_attempts: usize, dfs_candidates: usize, dfs_budget: usize) -> Self {
        Self {
            strip_attempts,
            dfs_candidates,
            dfs_budget,
            deadline: None,
            iteration: 0,
            duration: 0.0,
            strategy: None,
        }
    }

    /// Set the time after which [`HamiltonianPathBuilder::build`] gives up.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Build and return a path, as a list of grid cells, that visits every open cell exactly
    /// once.
    ///
    /// # Errors
    ///
    /// The method returns [`HamiltonianError::NoPath`] when both strategies fail. Some
    /// irregular regions cannot be covered by a single path, so the caller should grow a new
    /// region instead of retrying. [`HamiltonianError::DurationExceeded`] is returned when the
    /// deadline passes.
    pub fn build(
        &mut self,
        open: &OpenSet,
        prng: &mut Prng,
    ) -> Result<Vec<usize>, HamiltonianError> {
        let start: Instant = Instant::now();
        self.iteration = 0;
        self.duration = 0.0;
        self.strategy = None;

        let res: Result<Vec<usize>, HamiltonianError> = self.build_normalized(open, prng);
        self.duration = start.elapsed().as_secs_f32();
        debug!(
            "Iterations = {}  Duration = {}  Strategy = {:?}",
            self.iteration, self.duration, self.strategy
        );
        let path: Vec<usize> = res?;

        // Whatever the strategy, verify the result
        if !Path::from_vec(&path, open.grid().num_cells()).is_hamiltonian(open) {
            debug!("Bug: the built path does not cover the region: {path:?}");
            return Err(HamiltonianError::NoPath);
        }
        Ok(path)
    }

    fn build_normalized(
        &mut self,
        open: &OpenSet,
        prng: &mut Prng,
    ) -> Result<Vec<usize>, HamiltonianError> {
        if open.is_empty() {
            return Err(HamiltonianError::NoPath);
        }
        let (region, offset) = open.normalized();
        let to_source = |path: Vec<usize>| -> Vec<usize> {
            path.into_iter().map(|c| offset.to_source(c)).collect()
        };

        if region.len() == 1 {
            self.strategy = Some(Strategy::StripAndStitch);
            return Ok(to_source(region.iter().collect()));
        }

        if let Err(reason) = check_feasible(&region) {
            debug!("Region cannot be covered by a single path: {reason}");
            return Err(HamiltonianError::NoPath);
        }

        // Strip-and-stitch: flip the serpentine parity, then switch to column strips
        for variant in StripVariant::ALL.iter().cycle().take(self.strip_attempts) {
            let path: Vec<usize> = strip_path(&region, *variant);
            if Path::from_vec(&path, region.grid().num_cells()).is_hamiltonian(&region) {
                debug!("Strip-and-stitch {variant:?} succeeded");
                self.strategy = Some(Strategy::StripAndStitch);
                return Ok(to_source(path));
            }
            debug!("Strip-and-stitch {variant:?} does not cover the region");
        }

        // Spanning tree, trying first the lattice alignments that leave the fewest cells out
        let mut lattices: Vec<(usize, Lattice)> = Lattice::alignments(region.grid())
            .into_iter()
            .map(|lattice| {
                let blocks: usize = (0..lattice.len())
                    .filter(|b| region.is_block_open(lattice.top_left(*b)))
                    .count();
                (region.len() - 4 * blocks, lattice)
            })
            .collect();
        lattices.sort_by_key(|(leftover, _)| *leftover);
        for (leftover, lattice) in lattices {
            if leftover == region.len() {
                break;
            }
            if let Some(path) = tree_path(&region, &lattice, prng)
                && Path::from_vec(&path, region.grid().num_cells()).is_hamiltonian(&region)
            {
                debug!("Spanning tree over {lattice:?} succeeded");
                self.strategy = Some(Strategy::SpanningTree);
                return Ok(to_source(path));
            }
            debug!("Spanning tree over {lattice:?} ({leftover} leftover cells) failed");
        }

        // Randomized backtracking from a few starting cells
        for start_cell in starting_candidates(&region, self.dfs_candidates, prng) {
            let mut search: Search = Search::new(&region, self.dfs_budget, self.deadline);
            let mut path: Path = Path::new(region.grid().num_cells());
            path.push(start_cell);
            let res: Result<(), SearchError> = search.extend(start_cell, &mut path, prng);
            self.iteration += search.expansions;
            match res {
                Ok(()) => {
                    debug!("Backtracking from cell {start_cell} succeeded");
                    self.strategy = Some(Strategy::Backtracking);
                    return Ok(to_source(path.into_vec()));
                }
                Err(SearchError::DurationExceeded) => {
                    return Err(HamiltonianError::DurationExceeded);
                }
                Err(e) => debug!("Backtracking from cell {start_cell}: {e:?}"),
            }
        }
        Err(HamiltonianError::NoPath)
    }
}

/// Verify the necessary conditions for a path to exist: the region is connected, the two
/// checkerboard colors differ by at most one cell (a path alternates colors), and at most two
/// cells have a single neighbor (such cells must be path endpoints).
fn check_feasible(region: &OpenSet) -> Result<(), String> {
    if !region.is_connected() {
        return Err("the region is not connected".to_string());
    }
    let colors: [usize; 2] = region.parity_counts();
    if colors[0].abs_diff(colors[1]) > 1 {
        return Err(format!("unbalanced checkerboard colors {colors:?}"));
    }
    let dead_ends: usize = region.iter().filter(|c| region.degree(*c) == 1).count();
    if dead_ends > 2 {
        return Err(format!("{dead_ends} cells have a single neighbor"));
    }
    Ok(())
}

/// Cycle through grid cells, stored as the two neighbors of each cell.
struct Cycle {
    links: Vec<[usize; 2]>,
}

impl Cycle {
    fn new(num_cells: usize) -> Self {
        Self {
            links: vec![[UNLINKED; 2]; num_cells],
        }
    }

    fn contains(&self, cell: usize) -> bool {
        self.links[cell][0] != UNLINKED
    }

    fn is_linked(&self, a: usize, b: usize) -> bool {
        self.links[a].contains(&b)
    }

    fn link(&mut self, a: usize, b: usize) {
        for (from, to) in [(a, b), (b, a)] {
            if let Some(slot) = self.links[from].iter_mut().find(|l| **l == UNLINKED) {
                *slot = to;
            }
        }
    }

    fn unlink(&mut self, a: usize, b: usize) {
        for (from, to) in [(a, b), (b, a)] {
            if let Some(slot) = self.links[from].iter_mut().find(|l| **l == to) {
                *slot = UNLINKED;
            }
        }
    }

    /// Replace the edge between `v1` and `v2` with the detour `v1`, `c1`, `c2`, `v2`.
    fn splice(&mut self, v1: usize, v2: usize, c1: usize, c2: usize) {
        self.unlink(v1, v2);
        self.link(v1, c1);
        self.link(c1, c2);
        self.link(c2, v2);
    }

    /// Walk around the cycle from `start`, leaving through its neighbor `first`, and return at
    /// most `len` cells.
    fn walk(&self, start: usize, first: usize, len: usize) -> Vec<usize> {
        let mut path: Vec<usize> = Vec::with_capacity(len);
        path.push(start);
        let (mut previous, mut current) = (start, first);
        while current != start && current != UNLINKED && path.len() < len {
            path.push(current);
            let [a, b] = self.links[current];
            let next: usize = if a == previous { b } else { a };
            previous = current;
            current = next;
        }
        path
    }
}

/// Build a covering path from a random spanning tree of the open blocks of the lattice.
fn tree_path(region: &OpenSet, lattice: &Lattice, prng: &mut Prng) -> Option<Vec<usize>> {
    let grid: Grid = region.grid();
    let blocks: Vec<usize> = (0..lattice.len())
        .filter(|b| region.is_block_open(lattice.top_left(*b)))
        .collect();
    let mut is_block: Vec<bool> = vec![false; lattice.len()];
    for b in &blocks {
        is_block[*b] = true;
    }

    // Randomized Prim's algorithm. Each block starts as a cycle around its four cells, and
    // each tree edge merges two cycles through the shared side.
    let mut cycle: Cycle = Cycle::new(grid.num_cells());
    let mut in_tree: Vec<bool> = vec![false; lattice.len()];
    let mut edges: Vec<(usize, Direction)> = Vec::new();
    let add_block = |block: usize,
                     cycle: &mut Cycle,
                     in_tree: &mut [bool],
                     edges: &mut Vec<(usize, Direction)>| {
        let [top_left, top_right, bottom_left, bottom_right] =
            grid.block_cells(lattice.top_left(block));
        cycle.link(top_left, top_right);
        cycle.link(top_right, bottom_right);
        cycle.link(bottom_right, bottom_left);
        cycle.link(bottom_left, top_left);
        in_tree[block] = true;
        let adjacent = lattice.get_adjacent(block);
        for direction in Direction::ALL {
            if let Some(n) = adjacent.get(direction)
                && is_block[n]
                && !in_tree[n]
            {
                edges.push((block, direction));
            }
        }
    };

    let root: usize = *prng.choice(&blocks)?;
    add_block(root, &mut cycle, &mut in_tree, &mut edges);
    while !edges.is_empty() {
        let (block, direction) = edges.swap_remove(prng.rand_int(0, edges.len() - 1));
        let Some(next) = lattice.get_adjacent(block).get(direction) else {
            continue;
        };
        if in_tree[next] {
            continue;
        }
        add_block(next, &mut cycle, &mut in_tree, &mut edges);
        let [a1, a2] = lattice.side(block, direction);
        let [b1, b2] = lattice.side(next, direction.opposite());
        cycle.unlink(a1, a2);
        cycle.unlink(b1, b2);
        cycle.link(a1, b1);
        cycle.link(a2, b2);
    }

    // Cells outside the tree blocks
    let mut leftover: Vec<bool> = vec![false; grid.num_cells()];
    for cell in region.iter() {
        leftover[cell] = !cycle.contains(cell);
    }

    // Dominoes against a block side that no tree edge crosses
    for block in (0..lattice.len()).filter(|b| in_tree[*b]) {
        for direction in Direction::ALL {
            let Some([c1, c2]) = lattice.beyond(block, direction) else {
                continue;
            };
            let [v1, v2] = lattice.side(block, direction);
            if leftover[c1] && leftover[c2] && cycle.is_linked(v1, v2) {
                cycle.splice(v1, v2, c1, c2);
                leftover[c1] = false;
                leftover[c2] = false;
            }
        }
    }

    // Any other pair of adjacent leftover cells next to a cycle edge
    let mut spliced: bool = true;
    while spliced {
        spliced = false;
        for c1 in region.iter() {
            if !leftover[c1] {
                continue;
            }
            if let Some((v1, v2, c2)) = find_splice(grid, &cycle, &leftover, c1) {
                cycle.splice(v1, v2, c1, c2);
                leftover[c1] = false;
                leftover[c2] = false;
                spliced = true;
            }
        }
    }

    // The remaining single cells become the ends of the path
    let len: usize = region.len();
    let singles: Vec<usize> = region.iter().filter(|c| leftover[*c]).collect();
    match singles.as_slice() {
        [] => {
            let cells: Vec<usize> = region.iter().collect();
            let start: usize = *prng.choice(&cells)?;
            let first: usize = cycle.links[start][prng.rand_int(0, 1)];
            Some(cycle.walk(start, first, len))
        }
        [single] => {
            let entries: Vec<usize> = grid
                .get_adjacent(*single)
                .iter()
                .filter(|c| cycle.contains(*c))
                .collect();
            let entry: usize = *prng.choice(&entries)?;
            let first: usize = cycle.links[entry][prng.rand_int(0, 1)];
            let mut path: Vec<usize> = vec![*single];
            path.extend(cycle.walk(entry, first, len - 1));
            Some(path)
        }
        [c1, c2] => {
            // From c1 around the cycle, then c2
            for v1 in grid.get_adjacent(*c1).iter().filter(|c| cycle.contains(*c)) {
                let [a, b] = cycle.links[v1];
                for (v2, first) in [(a, b), (b, a)] {
                    if v2 != UNLINKED && grid.is_adjacent(v2, *c2) {
                        let mut path: Vec<usize> = vec![*c1];
                        path.extend(cycle.walk(v1, first, len - 2));
                        path.push(*c2);
                        return Some(path);
                    }
                }
            }
            None
        }
        _ => {
            debug!("Spanning tree: {} single cells left", singles.len());
            None
        }
    }
}

/// Find a cycle edge `(v1, v2)` and a leftover cell `c2` such that `c1`, `c2` can be spliced
/// between `v1` and `v2`.
fn find_splice(
    grid: Grid,
    cycle: &Cycle,
    leftover: &[bool],
    c1: usize,
) -> Option<(usize, usize, usize)> {
    let adjacent = grid.get_adjacent(c1);
    for c2 in adjacent.iter().filter(|c| leftover[*c]) {
        for v1 in adjacent.iter().filter(|c| cycle.contains(*c)) {
            for v2 in cycle.links[v1] {
                if v2 != UNLINKED && grid.is_adjacent(v2, c2) {
                    return Some((v1, v2, c2));
                }
            }
        }
    }
    None
}

/// Build the serpentine path through the maximal runs of the region.
fn strip_path(region: &OpenSet, variant: StripVariant) -> Vec<usize> {
    let grid: Grid = region.grid();
    let (columns, flipped) = match variant {
        StripVariant::Rows { flipped } => (false, flipped),
        StripVariant::Columns { flipped } => (true, flipped),
    };
    let (lines, line_len) = if columns {
        (grid.width, grid.height)
    } else {
        (grid.height, grid.width)
    };
    let cell_at = |line: usize, pos: usize| -> usize {
        if columns {
            grid.index(line, pos)
        } else {
            grid.index(pos, line)
        }
    };

    let mut path: Vec<usize> = Vec::with_capacity(region.len());
    let mut forward: bool = !flipped;
    for line in 0..lines {
        let cells: Vec<usize> = (0..line_len)
            .map(|pos| cell_at(line, pos))
            .filter(|c| region.contains(*c))
            .collect();
        if cells.is_empty() {
            continue;
        }
        // Cells of a line are already grouped by strip and ordered by position: traversing
        // the line in one direction traverses its strips in that direction too.
        if forward {
            path.extend(cells);
        } else {
            path.extend(cells.into_iter().rev());
        }
        forward = !forward;
    }
    path
}

/// Return the starting cells to try for the backtracking search.
fn starting_candidates(region: &OpenSet, max: usize, prng: &mut Prng) -> Vec<usize> {
    let grid: Grid = region.grid();

    // Cells with only one neighbor must be endpoints
    let mut candidates: Vec<usize> = region.iter().filter(|c| region.degree(*c) == 1).collect();

    if candidates.is_empty() {
        // With an odd number of cells, both endpoints have the majority color
        let colors: [usize; 2] = region.parity_counts();
        let majority: Option<usize> = match colors[0].cmp(&colors[1]) {
            std::cmp::Ordering::Greater => Some(0),
            std::cmp::Ordering::Less => Some(1),
            std::cmp::Ordering::Equal => None,
        };
        candidates = region
            .iter()
            .filter(|c| majority.is_none_or(|m| grid.parity(*c) == m))
            .collect();

        // Corner-like cells make good endpoints: try them first
        prng.shuffle(&mut candidates);
        candidates.sort_by_key(|c| region.degree(*c));
    } else {
        prng.shuffle(&mut candidates);
    }
    candidates.truncate(max.max(1));
    debug!("Backtracking starting candidates: {candidates:?}");
    candidates
}

/// Depth-first search state. The expansion counter is local to the search.
struct Search<'a> {
    region: &'a OpenSet,
    target: usize,
    budget: usize,
    expansions: usize,
    deadline: Option<Instant>,

    /// Breadth-first search marks: a cell is marked when its stamp equals `epoch`.
    stamps: Vec<u32>,
    epoch: u32,
    queue: VecDeque<usize>,
}

impl<'a> Search<'a> {
    fn new(region: &'a OpenSet, budget: usize, deadline: Option<Instant>) -> Self {
        Self {
            region,
            target: region.len(),
            budget,
            expansions: 0,
            deadline,
            stamps: vec![0; region.grid().num_cells()],
            epoch: 0,
            queue: VecDeque::with_capacity(region.len()),
        }
    }

    /// Unvisited open neighbors of the cell.
    fn free_neighbors(&self, cell: usize, path: &Path) -> Vec<usize> {
        self.region
            .grid()
            .get_adjacent(cell)
            .iter()
            .filter(|c| self.region.contains(*c) && !path.contains(*c))
            .collect()
    }

    /// Number of unvisited open neighbors of the cell.
    fn free_count(&self, cell: usize, path: &Path) -> usize {
        self.region
            .grid()
            .get_adjacent(cell)
            .iter()
            .filter(|c| self.region.contains(*c) && !path.contains(*c))
            .count()
    }

    /// Recursively extend the path from its last cell.
    fn extend(
        &mut self,
        current: usize,
        path: &mut Path,
        prng: &mut Prng,
    ) -> Result<(), SearchError> {
        if path.len() == self.target {
            return Ok(());
        }

        self.expansions += 1;
        if self.expansions > self.budget {
            return Err(SearchError::BudgetExhausted);
        }
        if self.expansions % DEADLINE_CHECK_INTERVAL == 0
            && let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(SearchError::DurationExceeded);
        }

        // Random order, then fewest onward moves first. The sort is stable, so the random
        // order breaks the ties.
        let mut next: Vec<usize> = self.free_neighbors(current, path);
        prng.shuffle(&mut next);
        next.sort_by_key(|c| self.free_count(*c, path));

        if log_enabled!(Level::Trace) {
            log::trace!("  cell {current} (depth {}) -> {next:?}", path.len());
        }

        for cell in next {
            path.push(cell);
            if self.is_viable(cell, path) {
                match self.extend(cell, path, prng) {
                    Ok(()) => return Ok(()),
                    Err(SearchError::NoPath) => (),
                    Err(e) => return Err(e),
                }
            }
            path.pop();
        }
        Err(SearchError::NoPath)
    }

    /// Whether the unvisited cells can still be covered from the head of the path.
    ///
    /// The unvisited cells must form a single component reachable from the head, and at most
    /// one of them (the final cell) can have fewer than two unvisited neighbors when it is not
    /// adjacent to the head.
    fn is_viable(&mut self, head: usize, path: &Path) -> bool {
        let remaining: usize = self.target - path.len();
        if remaining == 0 {
            return true;
        }
        let grid: Grid = self.region.grid();

        let Some(first) = self.free_neighbors(head, path).first().copied() else {
            return false;
        };

        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch == 0 {
            self.stamps.fill(0);
            self.epoch = 1;
        }
        let epoch: u32 = self.epoch;

        let mut reached: usize = 0;
        let mut dead_ends: usize = 0;
        self.queue.clear();
        self.stamps[first] = epoch;
        self.queue.push_back(first);
        while let Some(cell) = self.queue.pop_front() {
            reached += 1;
            let mut free: usize = 0;
            for n in grid.get_adjacent(cell).iter() {
                if !self.region.contains(n) || path.contains(n) {
                    continue;
                }
                free += 1;
                if self.stamps[n] != epoch {
                    self.stamps[n] = epoch;
                    self.queue.push_back(n);
                }
            }
            if free <= 1 && !grid.is_adjacent(head, cell) {
                dead_ends += 1;
                if dead_ends > 1 {
                    return false;
                }
            }
        }
        reached == remaining
    }
}
