/*
path.rs

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

//! Path buffer used while building and solving puzzles.

use super::grid::{Grid, OpenSet};

/// Path object.
#[derive(Debug, Default, Clone)]
pub struct Path {
    /// Path as an ordered list of cells.
    path: Vec<usize>,

    /// Number of times each grid cell appears in the path.
    /// Instead of looking for the cell in the [`Path::path`] vector, this vector speeds up the
    /// lookup.
    visits: Vec<u32>,
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Path {
    /// Create a [`Path`] object for a grid with `num_cells` cells.
    pub fn new(num_cells: usize) -> Self {
        Self {
            path: Vec::with_capacity(num_cells),
            visits: vec![0; num_cells],
        }
    }

    /// Create a [`Path`] object from a vector.
    pub fn from_vec(path: &[usize], num_cells: usize) -> Self {
        let mut p: Path = Path::new(num_cells);
        for cell in path {
            p.push(*cell);
        }
        p
    }

    /// Add a cell to the path.
    pub fn push(&mut self, cell: usize) {
        if cell >= self.visits.len() {
            self.visits.resize(cell + 1, 0);
        }
        self.path.push(cell);
        self.visits[cell] += 1;
    }

    /// Remove the last cell from the path.
    pub fn pop(&mut self) -> Option<usize> {
        let cell: usize = self.path.pop()?;
        if let Some(v) = self.visits.get_mut(cell) {
            *v = v.saturating_sub(1);
        }
        Some(cell)
    }

    /// Get the number of cells in the path.
    pub fn len(&self) -> usize {
        self.path.len()
    }

    /// Whether the path is empty.
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Whether the cell is in the path or not.
    pub fn contains(&self, cell: usize) -> bool {
        self.visits.get(cell).is_some_and(|v| *v > 0)
    }

    /// Consume the object and return the path vector.
    pub fn into_vec(self) -> Vec<usize> {
        self.path
    }

    /// Whether consecutive cells are adjacent and no cell repeats.
    pub fn is_simple(&self, grid: &Grid) -> bool {
        let mut seen: Vec<bool> = vec![false; grid.num_cells()];
        for (i, cell) in self.path.iter().enumerate() {
            match seen.get_mut(*cell) {
                Some(s) if !*s => *s = true,
                _ => return false,
            }
            if i > 0 && !grid.is_adjacent(self.path[i - 1], *cell) {
                return false;
            }
        }
        true
    }

    /// Whether the path is a Hamiltonian path of the given open cells: a simple path that
    /// visits every open cell exactly once.
    pub fn is_hamiltonian(&self, open: &OpenSet) -> bool {
        self.path.len() == open.len()
            && self.is_simple(&open.grid())
            && self.path.iter().all(|c| open.contains(*c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut p: Path = Path::new(4);
        p.push(0);
        p.push(1);
        assert!(p.contains(1));
        assert_eq!(p.pop(), Some(1));
        assert!(!p.contains(1));
        assert_eq!(p.len(), 1);
        assert_eq!(p.pop(), Some(0));
        assert!(p.is_empty());
        assert!(!p.contains(0));
        assert_eq!(p.pop(), None);
    }

    #[test]
    fn test_pop_repeated_cell() {
        // A repeated cell stays in the path until its last occurrence is removed
        let mut p: Path = Path::from_vec(&[2, 3, 2], 4);
        assert_eq!(p.pop(), Some(2));
        assert!(p.contains(2));
        assert_eq!(p.pop(), Some(3));
        assert_eq!(p.pop(), Some(2));
        assert!(!p.contains(2));
    }

    #[test]
    fn test_is_hamiltonian() {
        let open: OpenSet = OpenSet::from_rows(&["..", ".#"]);
        let grid: Grid = open.grid();
        assert!(Path::from_vec(&[1, 0, 2], 4).is_hamiltonian(&open));
        // Not adjacent
        assert!(!Path::from_vec(&[1, 2, 0], 4).is_hamiltonian(&open));
        // Too short
        assert!(!Path::from_vec(&[1, 0], 4).is_hamiltonian(&open));
        // Blocked cell
        assert!(!Path::from_vec(&[0, 1, 3], 4).is_hamiltonian(&open));
        // Repeated cell
        assert!(!Path::from_vec(&[0, 1, 0], 4).is_simple(&grid));
    }
}
