//! Synthesis of stack-shuffling instruction sequences.
//!
//! - [`SearchSolver`] enumerates sequences of length `1..=max_depth` with an odometer over
//!   [`StackInst::ALPHABET`] and returns the first one whose simulation turns `current` into
//!   `target`. Enumeration order is shortest first, then alphabet order digit by digit.
//! - [`MemoizedSolver`] fronts any [`StackHandler`] with a concurrent two-level memo keyed by
//!   canonicalized layout pairs. It is pre-seeded from a literal table and stores unsolvable
//!   pairs as well, so repeated misses never search twice.
//!
//! Equal layouts short-circuit to the empty sequence in both solvers.

mod memo;
mod search;
mod seeds;

pub use memo::{MemoizedSolver, Memoized};
pub use search::SearchSolver;

use csi_ir::{StackInsts, StackLayout};

/// Default bound on the length of searched sequences.
pub const MAX_SEARCH_DEPTH: usize = 6;

pub trait StackHandler: Send + Sync {
    /// Returns instructions turning `current` into `target`, or `None` if no sequence
    /// within the handler's bound exists.
    fn solve(&self, current: &StackLayout, target: &StackLayout) -> Option<StackInsts>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverConfig {
    pub max_depth: usize,
    /// Pre-populate the memo with the literal seed table.
    pub seed_memo: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_SEARCH_DEPTH,
            seed_memo: true,
        }
    }
}
