/*
prng.rs

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

//! Deterministic pseudo-random generator.
//!
//! Every random decision of the generation pipeline goes through a [`Prng`] object seeded from
//! the request seed string.
//! For a given seed and a given sequence of calls, the produced values are identical on every
//! platform and every run.

/// Increment added to the state on each draw. Must be odd.
const STATE_INCREMENT: u32 = 0x6D2B_79F5;

/// Divisor that maps a 32-bit value to [0,1).
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Hash a seed string into a 32-bit integer.
///
/// The hash is accumulated over the UTF-16 code units of the string (`hash = hash * 31 +
/// code`), wrapped to a signed 32-bit integer, and the sign is removed at the end.
pub fn hash_seed(seed: &str) -> u32 {
    let mut hash: i32 = 0;
    for code in seed.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(code));
    }
    hash.unsigned_abs()
}

/// Seeded pseudo-random generator.
#[derive(Debug, Clone)]
pub struct Prng {
    state: u32,
}

impl Prng {
    /// Create a [`Prng`] object from a seed string.
    pub fn from_seed(seed: &str) -> Self {
        Self::from_state(hash_seed(seed))
    }

    /// Create a [`Prng`] object from a raw 32-bit state.
    pub fn from_state(state: u32) -> Self {
        Self { state }
    }

    /// Advance the state and return the next raw 32-bit value.
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(STATE_INCREMENT);
        let mut t: u32 = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Return the next value in [0,1).
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / TWO_POW_32
    }

    /// Return a random integer between `low` and `high`, both included.
    ///
    /// If `high` is lower than `low`, then `low` is returned without advancing the state.
    pub fn rand_int(&mut self, low: usize, high: usize) -> usize {
        if high <= low {
            return low;
        }
        let span: f64 = (high - low + 1) as f64;
        let offset: usize = (self.next_f64() * span).floor() as usize;
        low + offset.min(high - low)
    }

    /// Return a random element of the slice, or [`None`] if the slice is empty.
    pub fn choice<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            items.get(self.rand_int(0, items.len() - 1))
        }
    }

    /// Shuffle the slice in place (Fisher-Yates).
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        let mut i: usize = items.len();
        while i > 1 {
            i -= 1;
            let j: usize = self.rand_int(0, i);
            items.swap(i, j);
        }
    }

    /// Return an element of `items`, the probability of each element being proportional to
    /// its weight in `weights`.
    ///
    /// Negative and NaN weights count as zero. Return [`None`] if the slices are empty, have
    /// different lengths, or if all the weights are zero.
    pub fn weighted_choice<'a, T>(&mut self, items: &'a [T], weights: &[f64]) -> Option<&'a T> {
        if items.is_empty() || items.len() != weights.len() {
            return None;
        }
        let total: f64 = weights.iter().map(|w| clean_weight(*w)).sum();
        if total <= 0.0 {
            return None;
        }

        let target: f64 = self.next_f64() * total;
        let mut cumulative: f64 = 0.0;
        for (item, weight) in items.iter().zip(weights) {
            cumulative += clean_weight(*weight);
            if target < cumulative {
                return Some(item);
            }
        }

        // Rounding errors can leave the target just above the last cumulative weight
        items
            .iter()
            .zip(weights)
            .rev()
            .find(|(_, w)| clean_weight(**w) > 0.0)
            .map(|(item, _)| item)
    }
}

fn clean_weight(weight: f64) -> f64 {
    if weight.is_nan() || weight < 0.0 {
        0.0
    } else {
        weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_seed() {
        assert_eq!(hash_seed(""), 0);
        assert_eq!(hash_seed("a"), 97);
        assert_eq!(hash_seed("ab"), 97 * 31 + 98);
        // Java's "hello".hashCode()
        assert_eq!(hash_seed("hello"), 99_162_322);
    }

    #[test]
    fn test_hash_seed_removes_sign() {
        // "polygenelubricants".hashCode() is i32::MIN in Java
        assert_eq!(hash_seed("polygenelubricants"), 2_147_483_648);
    }

    #[test]
    fn test_determinism() {
        let mut a: Prng = Prng::from_seed("8f3kz2");
        let mut b: Prng = Prng::from_seed("8f3kz2");
        for _ in 0..1000 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
        }
    }

    #[test]
    fn test_different_seeds() {
        let mut a: Prng = Prng::from_seed("seed-1");
        let mut b: Prng = Prng::from_seed("seed-2");
        let va: Vec<usize> = (0..16).map(|_| a.rand_int(0, 1000)).collect();
        let vb: Vec<usize> = (0..16).map(|_| b.rand_int(0, 1000)).collect();
        assert_ne!(va, vb);
    }

    #[test]
    fn test_range() {
        let mut prng: Prng = Prng::from_seed("range");
        for _ in 0..10_000 {
            let v: f64 = prng.next_f64();
            assert!((0.0..1.0).contains(&v));
            let i: usize = prng.rand_int(3, 7);
            assert!((3..=7).contains(&i));
        }
        assert_eq!(prng.rand_int(5, 5), 5);
        assert_eq!(prng.rand_int(9, 2), 9);
    }

    #[test]
    fn test_rand_int_reaches_both_bounds() {
        let mut prng: Prng = Prng::from_seed("bounds");
        let mut seen: [bool; 4] = [false; 4];
        for _ in 0..1000 {
            seen[prng.rand_int(0, 3)] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut prng: Prng = Prng::from_seed("shuffle");
        let mut v: Vec<usize> = (0..50).collect();
        prng.shuffle(&mut v);
        let mut sorted: Vec<usize> = v.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<usize>>());
        assert_ne!(v, sorted);
    }

    #[test]
    fn test_choice() {
        let mut prng: Prng = Prng::from_seed("choice");
        let empty: [u8; 0] = [];
        assert_eq!(prng.choice(&empty), None);
        let items: [u8; 3] = [4, 5, 6];
        for _ in 0..100 {
            assert!(items.contains(prng.choice(&items).unwrap()));
        }
    }

    #[test]
    fn test_weighted_choice() {
        let mut prng: Prng = Prng::from_seed("weights");
        let items: [char; 3] = ['a', 'b', 'c'];
        for _ in 0..200 {
            assert_eq!(
                prng.weighted_choice(&items, &[0.0, 2.0, 0.0]),
                Some(&'b')
            );
        }
        assert_eq!(prng.weighted_choice(&items, &[0.0, 0.0, 0.0]), None);
        assert_eq!(prng.weighted_choice(&items, &[1.0, 1.0]), None);

        let mut counts: [usize; 3] = [0; 3];
        for _ in 0..3000 {
            match prng.weighted_choice(&items, &[1.0, 0.0, 9.0]) {
                Some('a') => counts[0] += 1,
                Some('b') => counts[1] += 1,
                Some('c') => counts[2] += 1,
                _ => panic!("unexpected choice"),
            }
        }
        assert_eq!(counts[1], 0);
        assert!(counts[2] > counts[0] * 4);
    }
}
