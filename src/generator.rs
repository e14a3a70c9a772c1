/*
generator.rs

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

//! Generate and verify grid-path puzzles.
//!
//! A [`level::GenerationRequest`] describes the puzzle to build: its mode, the grid size, the
//! fraction of blocked cells, the number of colors, the difficulty, and a seed.
//! The [`level_builder::LevelBuilder`] object turns the request into a [`level::Level`]:
//!
//! * A [`prng::Prng`] object, seeded from the request seed, drives every random decision.
//!   The same request always produces the same level.
//! * A [`region::RegionGrower`] object grows a connected region of open cells from the center
//!   of the grid.
//! * A [`hamiltonian::HamiltonianPathBuilder`] object builds a path that visits every open
//!   cell exactly once.
//!   It first tries to sweep the region strip by strip, and falls back to a bounded
//!   backtracking search.
//! * For the colored modes, a [`segmenter::PathSegmenter`] object cuts the path into segments,
//!   one per color.
//! * The [`metrics::DifficultyMetrics`] object describes the difficulty of the result.
//!
//! The [`validator`] module verifies the paths drawn by a player, and the level builder runs it
//! on every generated level before returning it.
//! The [`solver::Solver`] object searches for a solution from the level clues only. The number
//! of expansions it needs is used as a sanity score.

pub mod grid;
pub mod hamiltonian;
pub mod level;
pub mod level_builder;
pub mod metrics;
pub mod path;
pub mod prng;
pub mod region;
pub mod segmenter;
pub mod solver;
pub mod validator;
