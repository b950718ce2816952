use csi_ir::{StackInsts, StackLayout};
use dashmap::DashMap;
use rustc_hash::{FxBuildHasher, FxHashMap};

use super::{seeds::SEEDS, SearchSolver, SolverConfig, StackHandler};

/// A memoized answer. Unsolvable pairs are remembered too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Memoized {
    Solved(StackInsts),
    Unsolvable,
}

impl Memoized {
    fn into_option(self) -> Option<StackInsts> {
        match self {
            Self::Solved(insts) => Some(insts),
            Self::Unsolvable => None,
        }
    }
}

impl From<Option<StackInsts>> for Memoized {
    fn from(solved: Option<StackInsts>) -> Self {
        solved.map_or(Self::Unsolvable, Self::Solved)
    }
}

/// Caching front end over another [`StackHandler`].
///
/// Entries are keyed by `(canonical source, canonical target)` and are never invalidated, so
/// the memo grows with the number of distinct layout shapes seen. Concurrent misses on the same
/// pair may both search; they store equal values.
pub struct MemoizedSolver<H = SearchSolver> {
    inner: H,
    memo: DashMap<StackLayout, FxHashMap<StackLayout, Memoized>, FxBuildHasher>,
}

impl MemoizedSolver<SearchSolver> {
    pub fn new(cfg: SolverConfig) -> Self {
        Self::with_handler(SearchSolver::new(cfg.max_depth), cfg.seed_memo)
    }
}

impl Default for MemoizedSolver<SearchSolver> {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl<H: StackHandler> MemoizedSolver<H> {
    pub fn with_handler(inner: H, seed: bool) -> Self {
        let solver = Self {
            inner,
            memo: DashMap::with_hasher(FxBuildHasher),
        };
        if seed {
            solver.seed();
        }
        solver
    }

    fn seed(&self) {
        for seed in SEEDS {
            let source = StackLayout::from(seed.source);
            let target = StackLayout::from(seed.target);
            self.store(&source, &target, Memoized::Solved(seed.insts.into()));
        }
        debug!(entries = self.len(), "seeded stack transform memo");
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    /// Number of memoized `(source, target)` pairs.
    pub fn len(&self) -> usize {
        self.memo.iter().map(|row| row.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up an already memoized answer without searching.
    pub fn cached(&self, current: &StackLayout, target: &StackLayout) -> Option<Memoized> {
        let (source, target) = StackLayout::canonicalize_pair(current, target);
        let row = self.memo.get(&source)?;
        row.get(&target).cloned()
    }

    fn store(&self, source: &StackLayout, target: &StackLayout, memoized: Memoized) {
        self.memo
            .entry(source.clone())
            .or_default()
            .insert(target.clone(), memoized);
    }
}

impl<H: StackHandler> StackHandler for MemoizedSolver<H> {
    fn solve(&self, current: &StackLayout, target: &StackLayout) -> Option<StackInsts> {
        if current == target {
            return Some(StackInsts::new());
        }

        let (source, canonical_target) = StackLayout::canonicalize_pair(current, target);
        if let Some(hit) = self
            .memo
            .get(&source)
            .and_then(|row| row.get(&canonical_target).cloned())
        {
            trace!(%current, %target, "stack transform memo hit");
            return hit.into_option();
        }

        // Search the canonical pair; instruction sequences do not depend on slot names.
        let solved = self.inner.solve(&source, &canonical_target);
        self.store(&source, &canonical_target, solved.clone().into());
        solved
    }
}
