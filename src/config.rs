/*
config.rs

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

//! Tuning parameters of the generation pipeline.
//!
//! The default values target a 200 ms budget per level. Developers can override any of them
//! with a JSON file (see the `--config` command-line option); missing keys keep their default
//! value.

use log::debug;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Text displayed by the `--version` command-line option.
pub const COPYRIGHT_NOTICE: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nCopyright 2025 Hervé Quatremain\n",
    "License GPLv3+: GNU GPL version 3 or later <https://gnu.org/licenses/gpl.html>.\n",
    "This is free software: you are free to change and redistribute it.\n",
    "There is NO WARRANTY, to the extent permitted by law."
);

/// Generation pipeline configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Wall-clock budget for the whole pipeline, in milliseconds.
    pub time_budget_ms: u64,

    /// Number of attempts, each one with a seed derived from the request seed, before giving
    /// up.
    pub max_attempts: usize,

    /// Number of structural variants tried by the strip-and-stitch strategy.
    pub strip_attempts: usize,

    /// Number of starting cells tried by the backtracking fallback.
    pub dfs_candidates: usize,

    /// Maximum number of node expansions per starting cell for the backtracking fallback.
    pub dfs_budget: usize,

    /// Number of missing cells accepted when the region growth stalls before reaching the
    /// target size.
    pub region_tolerance: usize,

    /// Number of cut sets drawn by the segmenter before relaxing the constraints.
    pub segment_retries: usize,

    /// Number of cut adjustments tried to fix trivial pairs (mode 3).
    pub pair_nudges: usize,

    /// Maximum number of node expansions for the sanity solver.
    pub solver_budget: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            time_budget_ms: 200,
            max_attempts: 8,
            strip_attempts: 4,
            dfs_candidates: 5,
            dfs_budget: 10_000,
            region_tolerance: 2,
            segment_retries: 50,
            pair_nudges: 32,
            solver_budget: 200_000,
        }
    }
}

impl GeneratorConfig {
    /// Read the configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        debug!("Loading configuration from {path:?}");
        let file: File = File::open(path)?;
        let reader: BufReader<File> = BufReader::new(file);
        let config: GeneratorConfig = serde_json::from_reader(reader)?;
        Ok(config)
    }

    /// Wall-clock budget as a [`Duration`].
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json() {
        let config: GeneratorConfig =
            serde_json::from_str(r#"{"time_budget_ms": 5000, "dfs_budget": 20}"#).unwrap();
        assert_eq!(config.time_budget(), Duration::from_secs(5));
        assert_eq!(config.dfs_budget, 20);
        assert_eq!(config.max_attempts, GeneratorConfig::default().max_attempts);
    }
}
