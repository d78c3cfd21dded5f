//! Greedy split-point search over scored boundaries.
//!
//! ## The Policy
//!
//! One forward pass over the units, accumulating estimated tokens. After
//! adding each unit exactly one of three rules applies, in priority order:
//!
//! 1. **Forced**: the chunk has reached 90% of `max`. Look back over the
//!    boundaries since the last split for the one with the highest
//!    `distance × confidence` that still leaves at least `min` tokens
//!    behind it, and split there. If none qualifies, cut before the current
//!    unit (or after it, if it is alone in the chunk).
//! 2. **Topic shift**: the boundary after this unit is significant and the
//!    chunk has at least `min` tokens and 70% of `target`. Split here.
//! 3. Otherwise keep accumulating.
//!
//! ```text
//! units:    [u0][u1][u2][u3][u4][u5]
//! tokens:    40  80 120 160 ...
//!                        ↑ 90% of max reached at u3
//! search:   b0  b1  b2          best distance×confidence → b1
//! result:   [u0 u1] | [u2 u3 ...]   accumulation resumes with u2+u3
//! ```
//!
//! A chunk only passes 90% of `max` when it holds a single unit, so no
//! chunk exceeds `max` by more than one unit's length.
//!
//! This is a heuristic. It never revisits an earlier split, so the result
//! is not globally optimal.

use crate::{BoundaryScore, TokenLimits};

/// Why a split was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitReason {
    /// A significant boundary after enough tokens.
    Boundary,
    /// The strongest boundary found when the size limit was reached.
    BestBoundary,
    /// No boundary qualified; cut on size alone.
    Forced,
}

/// A chunk start position and the rule that placed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPoint {
    /// Index of the first unit of the new chunk.
    pub index: usize,
    /// Why the split was placed here.
    pub reason: SplitReason,
}

/// Split-search state. At rest between units the planner is always
/// `Accumulating`; `ForcedSplitSearch` is resolved before the next unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Accumulating { start: usize, tokens: usize },
    ForcedSplitSearch { start: usize, tokens: usize },
}

struct SplitPlanner<'a> {
    boundaries: &'a [BoundaryScore],
    unit_lengths: &'a [usize],
    limits: TokenLimits,
    state: State,
    splits: Vec<SplitPoint>,
}

impl<'a> SplitPlanner<'a> {
    fn new(
        boundaries: &'a [BoundaryScore],
        unit_lengths: &'a [usize],
        limits: TokenLimits,
    ) -> Self {
        Self {
            boundaries,
            unit_lengths,
            limits,
            state: State::Accumulating { start: 0, tokens: 0 },
            splits: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<SplitPoint> {
        for unit in 0..self.unit_lengths.len() {
            self.feed(unit);
        }
        self.splits
    }

    fn feed(&mut self, unit: usize) {
        self.state = match self.state {
            State::Accumulating { start, tokens } => {
                let tokens = tokens + self.unit_lengths[unit];
                if self.limits.must_split(tokens) {
                    State::ForcedSplitSearch { start, tokens }
                } else if self.is_topic_shift(unit, tokens) {
                    self.push(unit + 1, SplitReason::Boundary);
                    State::Accumulating {
                        start: unit + 1,
                        tokens: 0,
                    }
                } else {
                    State::Accumulating { start, tokens }
                }
            }
            search @ State::ForcedSplitSearch { .. } => search,
        };

        while let State::ForcedSplitSearch { start, tokens } = self.state {
            self.state = self.resolve_forced(start, tokens, unit);
        }
    }

    fn is_topic_shift(&self, unit: usize, tokens: usize) -> bool {
        unit + 1 < self.unit_lengths.len()
            && self.boundaries.get(unit).is_some_and(|b| b.is_significant)
            && self.limits.may_split(tokens)
    }

    /// Resolve a chunk `start..=unit` holding `tokens` that hit the limit.
    fn resolve_forced(&mut self, start: usize, tokens: usize, unit: usize) -> State {
        // Walk boundaries backward; the kept prefix shrinks as we go, so the
        // first one under `min` ends the search.
        let mut best: Option<(usize, f32)> = None;
        let mut tail = 0;
        for j in (start..unit).rev() {
            tail += self.unit_lengths[j + 1];
            if tokens - tail < self.limits.min() {
                break;
            }
            let score = self
                .boundaries
                .get(j)
                .map_or(0.0, |b| b.distance * b.confidence);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((j, score));
            }
        }

        match best {
            Some((j, _)) => {
                self.push(j + 1, SplitReason::BestBoundary);
                let remainder: usize = self.unit_lengths[j + 1..=unit].iter().sum();
                self.resume(j + 1, remainder)
            }
            None if unit > start => {
                self.push(unit, SplitReason::Forced);
                self.resume(unit, self.unit_lengths[unit])
            }
            None => {
                // A single unit fills the chunk on its own.
                if unit + 1 < self.unit_lengths.len() {
                    self.push(unit + 1, SplitReason::Forced);
                }
                State::Accumulating {
                    start: unit + 1,
                    tokens: 0,
                }
            }
        }
    }

    fn resume(&self, start: usize, tokens: usize) -> State {
        if self.limits.must_split(tokens) {
            State::ForcedSplitSearch { start, tokens }
        } else {
            State::Accumulating { start, tokens }
        }
    }

    fn push(&mut self, index: usize, reason: SplitReason) {
        self.splits.push(SplitPoint { index, reason });
    }
}

/// Plan chunk starts with the rule that placed each one.
///
/// `boundaries[i]` scores the gap between unit `i` and unit `i + 1`;
/// `unit_lengths[i]` is unit `i`'s estimated tokens. The returned indices
/// are ascending and never include 0.
pub fn plan_splits(
    boundaries: &[BoundaryScore],
    unit_lengths: &[usize],
    limits: TokenLimits,
) -> Vec<SplitPoint> {
    SplitPlanner::new(boundaries, unit_lengths, limits).run()
}

/// Ascending chunk-start unit indices. See [`plan_splits`].
///
/// ```rust
/// use seams::{find_split_points, BoundaryScore, TokenLimits};
///
/// let boundaries: Vec<_> = (0..3)
///     .map(|i| BoundaryScore::new(i, if i == 1 { 0.9 } else { 0.1 }, 1.0, 0.35))
///     .collect();
/// let limits = TokenLimits::new(10, 20, 1000).unwrap();
///
/// // Topic shift after unit 1 once 20 tokens have accumulated.
/// assert_eq!(find_split_points(&boundaries, &[10, 10, 10, 10], limits), vec![2]);
/// ```
pub fn find_split_points(
    boundaries: &[BoundaryScore],
    unit_lengths: &[usize],
    limits: TokenLimits,
) -> Vec<usize> {
    plan_splits(boundaries, unit_lengths, limits)
        .into_iter()
        .map(|p| p.index)
        .collect()
}
