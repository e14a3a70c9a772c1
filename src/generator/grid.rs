/*
grid.rs

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

//! Rectangular grid and set of open cells.
//!
//! Cells are addressed by a single index, `y * width + x`.

use log::{Level, debug, log_enabled};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Serialize and deserialize the open cell mask as a string of `1` (open) and `0` (blocked).
pub mod bitmask {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Serialize the mask.
    pub fn serialize<S>(mask: &[bool], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s: String = mask.iter().map(|open| if *open { '1' } else { '0' }).collect();
        serializer.serialize_str(&s)
    }

    /// Deserialize the mask.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        s.chars()
            .map(|c| match c {
                '1' => Ok(true),
                '0' => Ok(false),
                _ => Err(Error::custom(format!("invalid character {c:?} in cell mask"))),
            })
            .collect()
    }
}

/// The four moving directions.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }
}

/// Cells adjacent to a given cell. A side is [`None`] at the edge of the grid.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Adjacent {
    pub up: Option<usize>,
    pub right: Option<usize>,
    pub down: Option<usize>,
    pub left: Option<usize>,
}

impl Adjacent {
    /// Return the neighbor in the given direction.
    pub fn get(&self, direction: Direction) -> Option<usize> {
        match direction {
            Direction::Up => self.up,
            Direction::Right => self.right,
            Direction::Down => self.down,
            Direction::Left => self.left,
        }
    }

    /// Iterate over the existing neighbors, in the up, right, down, left order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        Direction::ALL.iter().filter_map(|d| self.get(*d))
    }
}

/// Rectangular grid dimensions.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
}

impl Grid {
    /// Create a [`Grid`] object.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Number of cells in the rectangle.
    pub fn num_cells(&self) -> usize {
        self.width * self.height
    }

    /// Index of the cell at the given coordinates.
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Coordinates of the given cell.
    pub fn coordinates(&self, cell: usize) -> (usize, usize) {
        (cell % self.width, cell / self.width)
    }

    /// Return the cell in the middle of the rectangle.
    pub fn center(&self) -> usize {
        self.index(self.width / 2, self.height / 2)
    }

    /// Checkerboard color of the cell (0 or 1).
    pub fn parity(&self, cell: usize) -> usize {
        let (x, y) = self.coordinates(cell);
        (x + y) % 2
    }

    /// Return the cells adjacent to the provided cell.
    pub fn get_adjacent(&self, cell: usize) -> Adjacent {
        let (x, y) = self.coordinates(cell);
        Adjacent {
            up: if y > 0 { Some(cell - self.width) } else { None },
            right: if x + 1 < self.width {
                Some(cell + 1)
            } else {
                None
            },
            down: if y + 1 < self.height {
                Some(cell + self.width)
            } else {
                None
            },
            left: if x > 0 { Some(cell - 1) } else { None },
        }
    }

    /// Whether two cells share an edge.
    pub fn is_adjacent(&self, cell1: usize, cell2: usize) -> bool {
        cell1 < self.num_cells() && self.get_adjacent(cell1).iter().any(|c| c == cell2)
    }

    /// Direction of the move from `from` to the adjacent cell `to`.
    pub fn direction(&self, from: usize, to: usize) -> Option<Direction> {
        let adjacent: Adjacent = self.get_adjacent(from);
        Direction::ALL
            .iter()
            .copied()
            .find(|d| adjacent.get(*d) == Some(to))
    }

    /// Manhattan distance between two cells.
    pub fn distance(&self, cell1: usize, cell2: usize) -> usize {
        let (x1, y1) = self.coordinates(cell1);
        let (x2, y2) = self.coordinates(cell2);
        x1.abs_diff(x2) + y1.abs_diff(y2)
    }

    /// Return the top-left cells of the 2x2 blocks that contain the given cell.
    pub fn blocks_containing(&self, cell: usize) -> Vec<usize> {
        let (x, y) = self.coordinates(cell);
        let mut blocks: Vec<usize> = Vec::with_capacity(4);
        for bx in x.saturating_sub(1)..=x {
            for by in y.saturating_sub(1)..=y {
                if bx + 1 < self.width && by + 1 < self.height {
                    blocks.push(self.index(bx, by));
                }
            }
        }
        blocks
    }

    /// Return the four cells of the 2x2 block whose top-left cell is given.
    pub fn block_cells(&self, top_left: usize) -> [usize; 4] {
        [
            top_left,
            top_left + 1,
            top_left + self.width,
            top_left + self.width + 1,
        ]
    }
}

/// Lattice of aligned 2x2 blocks laid over a grid.
///
/// The first block starts at column `dx` and row `dy` (0 or 1), so that the four possible
/// alignments can be tried on the same grid. Blocks are numbered row by row. When a side of the
/// grid has an odd length, a one-cell strip along that side is not covered by the lattice.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Lattice {
    grid: Grid,
    dx: usize,
    dy: usize,
    columns: usize,
    rows: usize,
}

impl Lattice {
    /// Create a [`Lattice`] object.
    pub fn new(grid: Grid, dx: usize, dy: usize) -> Self {
        Self {
            grid,
            dx,
            dy,
            columns: grid.width.saturating_sub(dx) / 2,
            rows: grid.height.saturating_sub(dy) / 2,
        }
    }

    /// Return the four alignments of the lattice over the grid.
    pub fn alignments(grid: Grid) -> [Lattice; 4] {
        [
            Lattice::new(grid, 0, 0),
            Lattice::new(grid, 1, 0),
            Lattice::new(grid, 0, 1),
            Lattice::new(grid, 1, 1),
        ]
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.columns * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top-left cell of the block.
    pub fn top_left(&self, block: usize) -> usize {
        let (bx, by) = (block % self.columns, block / self.columns);
        self.grid.index(self.dx + 2 * bx, self.dy + 2 * by)
    }

    /// Return the blocks adjacent to the given block.
    pub fn get_adjacent(&self, block: usize) -> Adjacent {
        let (bx, by) = (block % self.columns, block / self.columns);
        Adjacent {
            up: (by > 0).then(|| block - self.columns),
            right: (bx + 1 < self.columns).then(|| block + 1),
            down: (by + 1 < self.rows).then(|| block + self.columns),
            left: (bx > 0).then(|| block - 1),
        }
    }

    /// Return the two cells of the block along the given side.
    ///
    /// The cells of the top and bottom sides are ordered from left to right, and the cells of
    /// the left and right sides from top to bottom.
    pub fn side(&self, block: usize, direction: Direction) -> [usize; 2] {
        let [top_left, top_right, bottom_left, bottom_right] =
            self.grid.block_cells(self.top_left(block));
        match direction {
            Direction::Up => [top_left, top_right],
            Direction::Right => [top_right, bottom_right],
            Direction::Down => [bottom_left, bottom_right],
            Direction::Left => [top_left, bottom_left],
        }
    }

    /// Return the two cells just outside the given side of the block, in the same order as
    /// [`Lattice::side`]. Return [`None`] when the side is on the edge of the grid.
    pub fn beyond(&self, block: usize, direction: Direction) -> Option<[usize; 2]> {
        let [a, b] = self.side(block, direction);
        Some([
            self.grid.get_adjacent(a).get(direction)?,
            self.grid.get_adjacent(b).get(direction)?,
        ])
    }
}

/// Serialized form of an [`OpenSet`] object.
#[derive(Serialize, Deserialize, Clone)]
struct OpenSetRepr {
    #[serde(flatten)]
    grid: Grid,
    #[serde(with = "bitmask")]
    open: Vec<bool>,
}

impl TryFrom<OpenSetRepr> for OpenSet {
    type Error = String;

    fn try_from(repr: OpenSetRepr) -> Result<Self, Self::Error> {
        if repr.open.len() != repr.grid.num_cells() {
            return Err(format!(
                "cell mask has {} entries instead of {}",
                repr.open.len(),
                repr.grid.num_cells()
            ));
        }
        let count: usize = repr.open.iter().filter(|o| **o).count();
        Ok(Self {
            grid: repr.grid,
            mask: repr.open,
            count,
        })
    }
}

impl From<OpenSet> for OpenSetRepr {
    fn from(open: OpenSet) -> Self {
        Self {
            grid: open.grid,
            open: open.mask,
        }
    }
}

/// Set of open (playable) cells inside a grid.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "OpenSetRepr", into = "OpenSetRepr")]
pub struct OpenSet {
    /// Grid dimensions.
    grid: Grid,

    /// For each cell of the grid, whether the cell is open.
    mask: Vec<bool>,

    /// Number of open cells.
    count: usize,
}

impl OpenSet {
    /// Create an [`OpenSet`] object without any open cell.
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            mask: vec![false; grid.num_cells()],
            count: 0,
        }
    }

    /// Create an [`OpenSet`] object where all the cells are open.
    pub fn full(grid: Grid) -> Self {
        Self {
            grid,
            mask: vec![true; grid.num_cells()],
            count: grid.num_cells(),
        }
    }

    /// Create an [`OpenSet`] object from an "ASCII art" representation.
    ///
    /// `#` is a blocked cell, any other character is an open cell. All the rows must have the
    /// same length.
    pub fn from_rows(rows: &[&str]) -> Self {
        let width: usize = rows.first().map_or(0, |r| r.chars().count());
        let grid: Grid = Grid::new(width, rows.len());
        let mut open: OpenSet = OpenSet::new(grid);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate().take(width) {
                if c != '#' {
                    open.insert(grid.index(x, y));
                }
            }
        }
        open
    }

    /// Grid dimensions.
    pub fn grid(&self) -> Grid {
        self.grid
    }

    /// Number of open cells.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether there is no open cell.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Open the cell. Return `false` if the cell was already open or is outside the grid.
    pub fn insert(&mut self, cell: usize) -> bool {
        match self.mask.get_mut(cell) {
            Some(open) if !*open => {
                *open = true;
                self.count += 1;
                true
            }
            _ => false,
        }
    }

    /// Whether the cell is open. Cells outside the grid are blocked.
    pub fn contains(&self, cell: usize) -> bool {
        self.mask.get(cell).copied().unwrap_or(false)
    }

    /// Iterate over the open cells in increasing index order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.mask
            .iter()
            .enumerate()
            .filter(|(_, open)| **open)
            .map(|(cell, _)| cell)
    }

    /// Number of open cells adjacent to the given cell.
    pub fn degree(&self, cell: usize) -> usize {
        self.grid
            .get_adjacent(cell)
            .iter()
            .filter(|c| self.contains(*c))
            .count()
    }

    /// Whether the 2x2 block with the given top-left cell is fully open.
    pub fn is_block_open(&self, top_left: usize) -> bool {
        let (x, y) = self.grid.coordinates(top_left);
        x + 1 < self.grid.width
            && y + 1 < self.grid.height
            && self
                .grid
                .block_cells(top_left)
                .iter()
                .all(|c| self.contains(*c))
    }

    /// Number of open cells of each checkerboard color.
    pub fn parity_counts(&self) -> [usize; 2] {
        let mut counts: [usize; 2] = [0, 0];
        for cell in self.iter() {
            counts[self.grid.parity(cell)] += 1;
        }
        counts
    }

    /// Return the 4-connected components of the open cells, each one sorted.
    /// Components are ordered by their smallest cell.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut seen: Vec<bool> = vec![false; self.mask.len()];
        let mut components: Vec<Vec<usize>> = Vec::new();
        let mut queue: VecDeque<usize> = VecDeque::new();

        for start in self.iter() {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            queue.push_back(start);
            let mut component: Vec<usize> = Vec::new();
            while let Some(cell) = queue.pop_front() {
                component.push(cell);
                for n in self.grid.get_adjacent(cell).iter() {
                    if self.contains(n) && !seen[n] {
                        seen[n] = true;
                        queue.push_back(n);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    /// Whether the open cells form exactly one 4-connected component.
    pub fn is_connected(&self) -> bool {
        !self.is_empty() && self.components().len() == 1
    }

    /// Bounding box of the open cells as `(min_x, min_y, max_x, max_y)`.
    pub fn bounding_box(&self) -> Option<(usize, usize, usize, usize)> {
        let mut bbox: Option<(usize, usize, usize, usize)> = None;
        for cell in self.iter() {
            let (x, y) = self.grid.coordinates(cell);
            bbox = Some(match bbox {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        bbox
    }

    /// Return a copy re-indexed so that its bounding box starts at the origin, together with
    /// the offset that maps the new coordinates back to the original grid.
    pub fn normalized(&self) -> (OpenSet, Offset) {
        let Some((x0, y0, x1, y1)) = self.bounding_box() else {
            return (
                OpenSet::new(Grid::new(0, 0)),
                Offset {
                    dx: 0,
                    dy: 0,
                    source: self.grid,
                    target: Grid::new(0, 0),
                },
            );
        };
        let target: Grid = Grid::new(x1 - x0 + 1, y1 - y0 + 1);
        let offset: Offset = Offset {
            dx: x0,
            dy: y0,
            source: self.grid,
            target,
        };
        let mut normalized: OpenSet = OpenSet::new(target);
        for cell in self.iter() {
            normalized.insert(offset.to_normalized(cell));
        }
        (normalized, offset)
    }

    /// Log an "ASCII art" view of the open cells.
    pub fn debug(&self) {
        if !log_enabled!(Level::Debug) {
            return;
        }
        debug!(
            "Open cells: {} of {}x{}",
            self.count, self.grid.width, self.grid.height
        );
        let mut s: String = String::with_capacity(self.grid.width);
        for y in 0..self.grid.height {
            s.clear();
            for x in 0..self.grid.width {
                s.push(if self.contains(self.grid.index(x, y)) {
                    '.'
                } else {
                    '#'
                });
            }
            debug!("{s}");
        }
    }
}

/// Translation between a grid and a normalized (bounding box) grid.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Offset {
    dx: usize,
    dy: usize,
    source: Grid,
    target: Grid,
}

impl Offset {
    /// Map a cell of the source grid into the normalized grid.
    pub fn to_normalized(&self, cell: usize) -> usize {
        let (x, y) = self.source.coordinates(cell);
        self.target.index(x - self.dx, y - self.dy)
    }

    /// Map a cell of the normalized grid back into the source grid.
    pub fn to_source(&self, cell: usize) -> usize {
        let (x, y) = self.target.coordinates(cell);
        self.source.index(x + self.dx, y + self.dy)
    }
}
