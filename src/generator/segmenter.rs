/*
segmenter.rs

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

//! Cut a full path into colored segments.
//!
//! In the "starts" mode, each segment exposes one of its ends as the starting cell of the
//! color. In the "pairs" mode, the two ends of each segment are given to the player, who must
//! connect them while covering every cell.
//!
//! A pair is trivial when its ends are too close:
//!
//! ```text
//!  a b .        a . .
//!  . . .        . b .
//! ```
//!
//! The ends must be at least [`MIN_PAIR_SEPARATION`] cells apart along the segment, must not be
//! adjacent, and must not sit inside the same fully-open 2x2 block.

use log::{Level, debug, log_enabled};
use std::fmt;

use super::grid::{Grid, OpenSet};
use super::prng::Prng;

/// Minimum number of steps between the two ends of a pair, along the segment.
pub const MIN_PAIR_SEPARATION: usize = 3;

/// Largest cut shift tried when fixing trivial pairs.
const MAX_NUDGE_SHIFT: usize = 3;

/// Type of errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentationError {
    /// The path is too short for the requested number of segments.
    Unsatisfiable {
        colors: usize,
        min_len: usize,
        path_len: usize,
    },
}

impl fmt::Display for SegmentationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SegmentationError::Unsatisfiable {
                colors,
                min_len,
                path_len,
            } => write!(
                f,
                "cannot cut a path of {path_len} cells into {colors} segments of at least {min_len} cells"
            ),
        }
    }
}

impl std::error::Error for SegmentationError {}

/// Reason why the two ends of a segment make a trivial pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PairDefect {
    /// Fewer than [`MIN_PAIR_SEPARATION`] steps along the segment.
    TooClose { steps: usize },

    /// The two ends share an edge.
    Adjacent,

    /// The two ends sit in the same fully-open 2x2 block.
    TrivialBlock { top_left: usize },
}

/// Verify that the two ends of the segment make a non-trivial pair.
pub fn check_pair(open: &OpenSet, segment: &[usize]) -> Result<(), PairDefect> {
    let steps: usize = segment.len().saturating_sub(1);
    if steps < MIN_PAIR_SEPARATION {
        return Err(PairDefect::TooClose { steps });
    }
    let grid: Grid = open.grid();
    let a: usize = segment[0];
    let b: usize = segment[steps];
    if grid.distance(a, b) == 1 {
        return Err(PairDefect::Adjacent);
    }
    let blocks_b: Vec<usize> = grid.blocks_containing(b);
    if let Some(top_left) = grid
        .blocks_containing(a)
        .into_iter()
        .find(|block| blocks_b.contains(block) && open.is_block_open(*block))
    {
        return Err(PairDefect::TrivialBlock { top_left });
    }
    Ok(())
}

/// Result of the segmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    /// Segments in path order. Each segment is oriented so that its first cell is the start
    /// of the color.
    pub segments: Vec<Vec<usize>>,

    /// Whether some pairs are still trivial because the constraints could not be satisfied.
    pub low_quality: bool,
}

/// [`PathSegmenter`] object.
#[derive(Debug, Clone)]
pub struct PathSegmenter {
    /// Number of segments (colors).
    colors: usize,

    /// Minimum number of cells in a segment.
    min_len: usize,

    /// The longest segment cannot be longer than this ratio times the mean length.
    max_length_ratio: f64,

    /// Number of random cut sets to draw before relaxing the constraints.
    retries: usize,

    /// Number of cut adjustments to try to fix trivial pairs.
    nudges: usize,
}

impl PathSegmenter {
    /// Create the object.
    pub fn new(colors: usize, min_len: usize) -> Self {
        Self {
            colors,
            min_len: min_len.max(1),
            max_length_ratio: 2.0,
            retries: 50,
            nudges: 32,
        }
    }

    /// Set the variance bound.
    pub fn with_max_length_ratio(mut self, ratio: f64) -> Self {
        self.max_length_ratio = ratio.max(1.0);
        self
    }

    /// Set the number of random cut sets to draw.
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Set the number of cut adjustments.
    pub fn with_nudges(mut self, nudges: usize) -> Self {
        self.nudges = nudges;
        self
    }

    /// Cut the path into segments, each one exposing a starting cell.
    ///
    /// # Errors
    ///
    /// The method returns [`SegmentationError::Unsatisfiable`] when the path is too short for
    /// the number of segments.
    pub fn segment_starts(
        &self,
        path: &[usize],
        prng: &mut Prng,
    ) -> Result<Segmentation, SegmentationError> {
        let min_len: usize = self.min_len;
        self.check_satisfiable(path.len(), min_len)?;

        let mut lengths: Option<Vec<usize>> = None;
        for attempt in 0..self.retries {
            let l: Vec<usize> = self.draw_lengths(path.len(), min_len, prng);
            if self.within_variance(&l, path.len()) {
                debug!("Cut set accepted after {} draws", attempt + 1);
                lengths = Some(l);
                break;
            }
        }
        let lengths: Vec<usize> = lengths.unwrap_or_else(|| {
            debug!("No cut set within the variance bound: using an even partition");
            even_lengths(path.len(), self.colors)
        });

        Ok(Segmentation {
            segments: orient(split(path, &lengths), prng),
            low_quality: false,
        })
    }

    /// Cut the path into segments whose two ends make non-trivial pairs.
    ///
    /// If some pairs stay trivial after all the retries, then the result is flagged as low
    /// quality instead of failing.
    ///
    /// # Errors
    ///
    /// The method returns [`SegmentationError::Unsatisfiable`] when the path is too short for
    /// the number of segments.
    pub fn segment_pairs(
        &self,
        path: &[usize],
        open: &OpenSet,
        prng: &mut Prng,
    ) -> Result<Segmentation, SegmentationError> {
        let min_len: usize = self.min_len.max(MIN_PAIR_SEPARATION + 1);
        self.check_satisfiable(path.len(), min_len)?;

        let mut best: Vec<usize> = even_lengths(path.len(), self.colors);
        let mut best_defects: usize = count_defects(path, &best, open);
        for _ in 0..self.retries {
            if best_defects == 0 {
                break;
            }
            let l: Vec<usize> = self.draw_lengths(path.len(), min_len, prng);
            if !self.within_variance(&l, path.len()) {
                continue;
            }
            let defects: usize = count_defects(path, &l, open);
            if defects < best_defects {
                best = l;
                best_defects = defects;
            }
        }

        // Shift the cuts around the trivial pairs
        let mut nudges: usize = 0;
        while best_defects > 0 && nudges < self.nudges {
            nudges += 1;
            match self.nudge(path, &best, open, min_len) {
                Some((l, defects)) if defects < best_defects => {
                    best = l;
                    best_defects = defects;
                }
                _ => break,
            }
        }
        debug!("Pair segmentation: {best_defects} trivial pairs after {nudges} nudges");

        let segments: Vec<Vec<usize>> = orient(split(path, &best), prng);
        if log_enabled!(Level::Debug) {
            for (color, s) in segments.iter().enumerate() {
                if let Err(defect) = check_pair(open, s) {
                    debug!("    color {color}: trivial pair {defect:?}");
                }
            }
        }
        Ok(Segmentation {
            segments,
            low_quality: best_defects > 0,
        })
    }

    fn check_satisfiable(&self, path_len: usize, min_len: usize) -> Result<(), SegmentationError> {
        if self.colors == 0 || self.colors * min_len > path_len {
            return Err(SegmentationError::Unsatisfiable {
                colors: self.colors,
                min_len,
                path_len,
            });
        }
        Ok(())
    }

    /// Draw random segment lengths, all at least `min_len` long.
    ///
    /// The cells beyond the minimum are spread by drawing `colors - 1` random cut marks.
    fn draw_lengths(&self, path_len: usize, min_len: usize, prng: &mut Prng) -> Vec<usize> {
        let extra: usize = path_len - self.colors * min_len;
        let mut marks: Vec<usize> = (1..self.colors).map(|_| prng.rand_int(0, extra)).collect();
        marks.sort_unstable();

        let mut lengths: Vec<usize> = Vec::with_capacity(self.colors);
        let mut previous: usize = 0;
        for m in marks {
            lengths.push(min_len + m - previous);
            previous = m;
        }
        lengths.push(min_len + extra - previous);
        lengths
    }

    /// Whether the longest segment stays within the variance bound.
    fn within_variance(&self, lengths: &[usize], path_len: usize) -> bool {
        let mean: f64 = path_len as f64 / lengths.len() as f64;
        let longest: usize = lengths.iter().copied().max().unwrap_or(0);
        longest as f64 <= mean * self.max_length_ratio
    }

    /// Try to shift the cuts around the first trivial pair. Return the best new lengths and
    /// their number of trivial pairs.
    fn nudge(
        &self,
        path: &[usize],
        lengths: &[usize],
        open: &OpenSet,
        min_len: usize,
    ) -> Option<(Vec<usize>, usize)> {
        let mut start: usize = 0;
        let mut defective: Option<usize> = None;
        for (i, len) in lengths.iter().enumerate() {
            if check_pair(open, &path[start..start + len]).is_err() {
                defective = Some(i);
                break;
            }
            start += len;
        }
        let i: usize = defective?;

        // A cut `c` separates segment c-1 and segment c
        let mut best: Option<(Vec<usize>, usize)> = None;
        for cut in [i, i + 1] {
            if cut == 0 || cut >= lengths.len() {
                continue;
            }
            for shift in 1..=MAX_NUDGE_SHIFT {
                for forward in [true, false] {
                    let mut l: Vec<usize> = lengths.to_vec();
                    if forward {
                        // Move the cut toward the end: segment cut-1 grows
                        if l[cut] < min_len + shift {
                            continue;
                        }
                        l[cut] -= shift;
                        l[cut - 1] += shift;
                    } else {
                        if l[cut - 1] < min_len + shift {
                            continue;
                        }
                        l[cut - 1] -= shift;
                        l[cut] += shift;
                    }
                    let defects: usize = count_defects(path, &l, open);
                    if best.as_ref().is_none_or(|(_, d)| defects < *d) {
                        best = Some((l, defects));
                    }
                }
            }
        }
        best
    }
}

/// Segment lengths as even as possible.
fn even_lengths(path_len: usize, colors: usize) -> Vec<usize> {
    let base: usize = path_len / colors;
    let remainder: usize = path_len % colors;
    (0..colors)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Split the path according to the segment lengths.
fn split(path: &[usize], lengths: &[usize]) -> Vec<Vec<usize>> {
    let mut segments: Vec<Vec<usize>> = Vec::with_capacity(lengths.len());
    let mut start: usize = 0;
    for len in lengths {
        segments.push(path[start..start + len].to_vec());
        start += len;
    }
    segments
}

/// Randomly select which end of each segment is its start.
fn orient(mut segments: Vec<Vec<usize>>, prng: &mut Prng) -> Vec<Vec<usize>> {
    for s in segments.iter_mut() {
        if prng.rand_int(0, 1) == 1 {
            s.reverse();
        }
    }
    segments
}

/// Number of segments whose ends make a trivial pair.
fn count_defects(path: &[usize], lengths: &[usize], open: &OpenSet) -> usize {
    let mut start: usize = 0;
    let mut defects: usize = 0;
    for len in lengths {
        if check_pair(open, &path[start..start + len]).is_err() {
            defects += 1;
        }
        start += len;
    }
    defects
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serpentine(width: usize, height: usize) -> Vec<usize> {
        let grid: Grid = Grid::new(width, height);
        let mut path: Vec<usize> = Vec::new();
        for y in 0..height {
            let row: Vec<usize> = (0..width).map(|x| grid.index(x, y)).collect();
            if y % 2 == 0 {
                path.extend(row);
            } else {
                path.extend(row.into_iter().rev());
            }
        }
        path
    }

    fn assert_partition(path: &[usize], segments: &[Vec<usize>]) {
        let mut cells: Vec<usize> = segments.iter().flatten().copied().collect();
        cells.sort_unstable();
        let mut expected: Vec<usize> = path.to_vec();
        expected.sort_unstable();
        assert_eq!(cells, expected);
    }

    #[test]
    fn test_segment_starts() {
        let path: Vec<usize> = serpentine(6, 5);
        let segmenter: PathSegmenter = PathSegmenter::new(4, 3);
        let s: Segmentation = segmenter
            .segment_starts(&path, &mut Prng::from_seed("starts"))
            .unwrap();
        assert_eq!(s.segments.len(), 4);
        assert!(!s.low_quality);
        assert_partition(&path, &s.segments);
        let grid: Grid = Grid::new(6, 5);
        for segment in &s.segments {
            assert!(segment.len() >= 3);
            assert!(segment.len() as f64 <= 30.0 / 4.0 * 2.0);
            for w in segment.windows(2) {
                assert!(grid.is_adjacent(w[0], w[1]));
            }
        }
    }

    #[test]
    fn test_segments_are_contiguous() {
        let path: Vec<usize> = serpentine(5, 4);
        let s: Segmentation = PathSegmenter::new(3, 3)
            .segment_starts(&path, &mut Prng::from_seed("contiguous"))
            .unwrap();
        // Put the segments back in path order and orientation
        let mut rebuilt: Vec<usize> = Vec::new();
        for segment in &s.segments {
            let mut seg: Vec<usize> = segment.clone();
            let first: Option<usize> = path.iter().position(|c| *c == seg[0]);
            let last: Option<usize> = path.iter().position(|c| *c == seg[seg.len() - 1]);
            if first > last {
                seg.reverse();
            }
            rebuilt.extend(seg);
        }
        assert_eq!(rebuilt, path);
    }

    #[test]
    fn test_unsatisfiable() {
        let path: Vec<usize> = serpentine(3, 3);
        let segmenter: PathSegmenter = PathSegmenter::new(4, 3);
        assert_eq!(
            segmenter.segment_starts(&path, &mut Prng::from_seed("short")),
            Err(SegmentationError::Unsatisfiable {
                colors: 4,
                min_len: 3,
                path_len: 9
            })
        );
        assert!(
            PathSegmenter::new(0, 3)
                .segment_starts(&path, &mut Prng::from_seed("none"))
                .is_err()
        );
    }

    #[test]
    fn test_even_lengths() {
        assert_eq!(even_lengths(10, 3), vec![4, 3, 3]);
        assert_eq!(even_lengths(9, 3), vec![3, 3, 3]);
    }

    #[test]
    fn test_check_pair_rejects_adjacent_ends() {
        // 8-cell U-shaped segment in a full 4x4 rectangle whose ends are one cell apart
        let open: OpenSet = OpenSet::full(Grid::new(4, 4));
        let grid: Grid = open.grid();
        let segment: Vec<usize> = vec![
            grid.index(1, 0),
            grid.index(0, 0),
            grid.index(0, 1),
            grid.index(0, 2),
            grid.index(0, 3),
            grid.index(1, 3),
            grid.index(1, 2),
            grid.index(1, 1),
        ];
        assert_eq!(check_pair(&open, &segment), Err(PairDefect::Adjacent));
    }

    #[test]
    fn test_check_pair() {
        let open: OpenSet = OpenSet::full(Grid::new(4, 4));
        // Three cells: too close
        assert_eq!(
            check_pair(&open, &[0, 1, 2]),
            Err(PairDefect::TooClose { steps: 2 })
        );
        // Diagonal ends in an open 2x2 block
        assert_eq!(
            check_pair(&open, &[0, 1, 2, 6, 5]),
            Err(PairDefect::TrivialBlock { top_left: 0 })
        );
        // Straight line of four cells
        assert_eq!(check_pair(&open, &[0, 1, 2, 3]), Ok(()));

        // The same diagonal ends are fine when the block is not fully open
        let holed: OpenSet = OpenSet::from_rows(&["..#.", "....", "....", "...."]);
        let grid: Grid = holed.grid();
        let around: Vec<usize> = vec![
            grid.index(1, 0),
            grid.index(0, 0),
            grid.index(0, 1),
            grid.index(0, 2),
            grid.index(1, 2),
            grid.index(2, 2),
            grid.index(2, 1),
        ];
        assert_eq!(check_pair(&holed, &around), Ok(()));
    }

    #[test]
    fn test_segment_pairs() {
        let open: OpenSet = OpenSet::full(Grid::new(6, 6));
        let path: Vec<usize> = serpentine(6, 6);
        let s: Segmentation = PathSegmenter::new(4, 4)
            .segment_pairs(&path, &open, &mut Prng::from_seed("pairs"))
            .unwrap();
        assert_eq!(s.segments.len(), 4);
        assert_partition(&path, &s.segments);
        assert!(!s.low_quality);
        for segment in &s.segments {
            assert_eq!(check_pair(&open, segment), Ok(()));
        }
    }

    #[test]
    fn test_segment_pairs_low_quality() {
        // A 2x4 rectangle cut in two: every 4-cell segment of the serpentine is a 2x2 block
        let open: OpenSet = OpenSet::full(Grid::new(2, 4));
        let path: Vec<usize> = serpentine(2, 4);
        let s: Segmentation = PathSegmenter::new(2, 4)
            .segment_pairs(&path, &open, &mut Prng::from_seed("tight"))
            .unwrap();
        assert_eq!(s.segments.len(), 2);
        assert!(s.low_quality);
        assert_partition(&path, &s.segments);
    }
}
