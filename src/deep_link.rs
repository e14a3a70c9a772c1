/*
deep_link.rs

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

//! Share a generation request as a compact token.
//!
//! A token is a list of `key=value` pairs separated by `;`:
//!
//! ```text
//! v=1;m=1;w=10;h=12;hd=0.15;k=1;t=1;s=8f3kz2
//! ```
//!
//! | Key | Value |
//! |-----|-------|
//! | `v` | Version of the generation algorithm |
//! | `m` | Mode (1, 2, or 3) |
//! | `w`, `h` | Grid width and height |
//! | `hd` | Hole density |
//! | `k` | Number of colors |
//! | `t` | Difficulty (0 easy, 1 medium, 2 hard) |
//! | `s` | Seed, with `%`, `;`, and `=` escaped as `%25`, `%3B`, and `%3D` |
//!
//! Parsing never fails. Unknown keys and malformed values are ignored, values are clamped to
//! their valid range, and when a key is repeated the last value wins.

use log::{debug, warn};

use crate::generator::level::{
    ALGORITHM_VERSION, Difficulty, GenerationRequest, MAX_COLORS, MAX_HOLE_DENSITY, MAX_SIDE,
    MIN_SIDE, Mode,
};

/// Separator between the `key=value` pairs.
pub const DELIMITER: char = ';';

/// Build the token of a request.
pub fn serialize(request: &GenerationRequest) -> String {
    [
        format!("v={ALGORITHM_VERSION}"),
        format!("m={}", request.mode.number()),
        format!("w={}", request.width),
        format!("h={}", request.height),
        format!("hd={}", request.hole_density),
        format!("k={}", request.color_count),
        format!("t={}", request.difficulty as u8),
        format!("s={}", escape(&request.seed)),
    ]
    .join(&DELIMITER.to_string())
}

/// Build the request of a token.
pub fn parse(token: &str) -> GenerationRequest {
    let mut request: GenerationRequest = GenerationRequest::default();
    for item in token.split(DELIMITER) {
        let Some((key, value)) = item.split_once('=') else {
            if !item.is_empty() {
                debug!("Deep link: ignoring {item:?}");
            }
            continue;
        };
        match key {
            "v" => {
                if let Ok(version) = value.parse::<u32>()
                    && version != ALGORITHM_VERSION
                {
                    warn!(
                        "Deep link created for version {version}: the generated level might differ"
                    );
                }
            }
            "m" => {
                if let Some(mode) = value.parse::<u8>().ok().and_then(Mode::from_repr) {
                    request.mode = mode;
                }
            }
            "w" => {
                if let Ok(width) = value.parse::<usize>() {
                    request.width = width.clamp(MIN_SIDE, MAX_SIDE);
                }
            }
            "h" => {
                if let Ok(height) = value.parse::<usize>() {
                    request.height = height.clamp(MIN_SIDE, MAX_SIDE);
                }
            }
            "hd" => {
                if let Ok(density) = value.parse::<f64>()
                    && density.is_finite()
                {
                    request.hole_density = density.clamp(0.0, MAX_HOLE_DENSITY);
                }
            }
            "k" => {
                if let Ok(colors) = value.parse::<usize>() {
                    request.color_count = colors.clamp(1, MAX_COLORS);
                }
            }
            "t" => {
                if let Some(difficulty) = value.parse::<u8>().ok().and_then(Difficulty::from_repr)
                {
                    request.difficulty = difficulty;
                }
            }
            "s" => request.seed = unescape(value),
            _ => debug!("Deep link: ignoring unknown key {key:?}"),
        }
    }
    request
}

fn escape(seed: &str) -> String {
    let mut s: String = String::with_capacity(seed.len());
    for c in seed.chars() {
        match c {
            '%' => s.push_str("%25"),
            ';' => s.push_str("%3B"),
            '=' => s.push_str("%3D"),
            _ => s.push(c),
        }
    }
    s
}

/// Decode the `%XX` sequences. Malformed sequences are kept as they are.
fn unescape(value: &str) -> String {
    let mut bytes: Vec<u8> = Vec::with_capacity(value.len());
    let raw: &[u8] = value.as_bytes();
    let mut i: usize = 0;
    while i < raw.len() {
        if raw[i] == b'%'
            && let Some(hex) = raw.get(i + 1..i + 3)
            && let Ok(hex) = std::str::from_utf8(hex)
            && let Ok(b) = u8::from_str_radix(hex, 16)
        {
            bytes.push(b);
            i += 3;
            continue;
        }
        bytes.push(raw[i]);
        i += 1;
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            mode: Mode::Starts,
            width: 8,
            height: 9,
            hole_density: 0.2,
            color_count: 3,
            difficulty: Difficulty::Hard,
            seed: "a;b=c%d".to_string(),
        }
    }

    #[test]
    fn test_serialize() {
        assert_eq!(
            serialize(&request()),
            "v=1;m=2;w=8;h=9;hd=0.2;k=3;t=2;s=a%3Bb%3Dc%25d"
        );
    }

    #[test]
    fn test_round_trip() {
        assert_eq!(parse(&serialize(&request())), request());
    }

    #[test]
    fn test_order_and_last_wins() {
        let r: GenerationRequest = parse("s=xyz;w=5;h=6;w=7;m=3");
        assert_eq!(r.width, 7);
        assert_eq!(r.height, 6);
        assert_eq!(r.mode, Mode::Pairs);
        assert_eq!(r.seed, "xyz");
    }

    #[test]
    fn test_malformed_and_clamped() {
        let r: GenerationRequest = parse("w=abc;h=500;hd=NaN;k=0;m=9;t=7;zz=1;junk;;s");
        let default: GenerationRequest = GenerationRequest::default();
        assert_eq!(r.width, default.width);
        assert_eq!(r.height, MAX_SIDE);
        assert_eq!(r.hole_density, default.hole_density);
        assert_eq!(r.color_count, 1);
        assert_eq!(r.mode, default.mode);
        assert_eq!(r.difficulty, default.difficulty);
        assert_eq!(r.seed, default.seed);

        let r: GenerationRequest = parse("hd=-3;w=1");
        assert_eq!(r.hole_density, 0.0);
        assert_eq!(r.width, MIN_SIDE);
    }

    #[test]
    fn test_unescape_malformed() {
        assert_eq!(unescape("100%"), "100%");
        assert_eq!(unescape("%zz%41"), "%zzA");
    }
}
