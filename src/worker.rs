/*
worker.rs

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

//! Generate levels in the background.
//!
//! The generation runs in a dedicated thread and the result is delivered through a channel.
//! The receiver can be awaited from async code (`receiver.recv().await`) or read with
//! `receiver.recv_blocking()`.
//! Dropping the receiver abandons the result.

use async_channel::{Receiver, Sender};
use log::debug;
use std::io;
use std::thread;

use crate::config::GeneratorConfig;
use crate::generator::level::{GenerationRequest, Level};
use crate::generator::level_builder::{GenerationError, LevelBuilder};

/// Result delivered by the background thread.
pub type GenerationResult = Result<Level, GenerationError>;

/// Start generating a level in a background thread.
///
/// # Errors
///
/// The function returns an error when the thread cannot be created.
pub fn spawn_generation(
    request: GenerationRequest,
    config: GeneratorConfig,
) -> io::Result<Receiver<GenerationResult>> {
    let (sender, receiver): (Sender<GenerationResult>, Receiver<GenerationResult>) =
        async_channel::bounded(1);

    thread::Builder::new()
        .name("pathweave-generator".to_string())
        .spawn(move || {
            let res: GenerationResult = LevelBuilder::new(config).generate(&request);
            if sender.send_blocking(res).is_err() {
                debug!("The receiver was dropped: discarding the generated level");
            }
        })?;
    Ok(receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::level::Mode;

    fn config() -> GeneratorConfig {
        GeneratorConfig {
            time_budget_ms: 10_000,
            ..Default::default()
        }
    }

    #[test]
    fn test_spawn_generation() {
        let request: GenerationRequest = GenerationRequest {
            mode: Mode::Single,
            width: 6,
            height: 5,
            hole_density: 0.0,
            seed: "worker".to_string(),
            ..Default::default()
        };
        let receiver: Receiver<GenerationResult> =
            spawn_generation(request.clone(), config()).unwrap();
        let level: Level = receiver.recv_blocking().unwrap().unwrap();
        assert_eq!(level.params, request);
        assert_eq!(level.region.len(), 30);

        // A single result per request
        assert!(receiver.recv_blocking().is_err());
    }

    #[test]
    fn test_error_is_delivered() {
        let request: GenerationRequest = GenerationRequest {
            height: 0,
            ..Default::default()
        };
        let receiver: Receiver<GenerationResult> = spawn_generation(request, config()).unwrap();
        assert!(matches!(
            receiver.recv_blocking().unwrap(),
            Err(GenerationError::InvalidRequest(_))
        ));
    }
}
