use csi_ir::{StackInst, StackInsts, StackLayout};
use smallvec::smallvec;

use super::{StackHandler, MAX_SEARCH_DEPTH};

/// Outcome of simulating one candidate.
enum Candidate {
    Matches,
    Mismatch,
    /// The instruction at this index was not applicable.
    Invalid(usize),
}

/// Bounded exhaustive search over instruction sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSolver {
    max_depth: usize,
}

impl Default for SearchSolver {
    fn default() -> Self {
        Self::new(MAX_SEARCH_DEPTH)
    }
}

impl SearchSolver {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// First sequence of exactly `len` instructions that maps `current` onto `target`.
    fn search_len(
        &self,
        current: &StackLayout,
        target: &StackLayout,
        len: usize,
    ) -> Option<StackInsts> {
        let mut insts: StackInsts = smallvec![StackInst::first(); len];
        loop {
            let digit = match evaluate(current, target, &insts) {
                Candidate::Matches => return Some(insts),
                Candidate::Mismatch => len - 1,
                // Every candidate sharing the invalid prefix fails the same way.
                Candidate::Invalid(idx) => idx,
            };
            if !advance(&mut insts, digit) {
                return None;
            }
        }
    }
}

impl StackHandler for SearchSolver {
    #[instrument(level = "trace", skip_all, fields(%current, %target))]
    fn solve(&self, current: &StackLayout, target: &StackLayout) -> Option<StackInsts> {
        if current == target {
            return Some(StackInsts::new());
        }

        for len in 1..=self.max_depth {
            if let Some(insts) = self.search_len(current, target, len) {
                trace!(len, "found stack transform");
                return Some(insts);
            }
        }

        debug!(%current, %target, max_depth = self.max_depth, "no stack transform");
        None
    }
}

fn evaluate(current: &StackLayout, target: &StackLayout, insts: &[StackInst]) -> Candidate {
    let mut layout = current.clone();
    for (idx, inst) in insts.iter().enumerate() {
        if inst.apply(&mut layout).is_err() {
            return Candidate::Invalid(idx);
        }
    }

    if layout == *target {
        Candidate::Matches
    } else {
        Candidate::Mismatch
    }
}

/// Steps the odometer at `digit`: the digit moves to its successor and everything to its
/// right restarts at the first instruction. A digit reaching `NOP` wraps and carries left.
/// Returns `false` once every sequence of this length has been visited.
fn advance(insts: &mut [StackInst], mut digit: usize) -> bool {
    for inst in &mut insts[digit + 1..] {
        *inst = StackInst::first();
    }

    loop {
        let next = insts[digit].next();
        if !next.is_nop() {
            insts[digit] = next;
            return true;
        }

        insts[digit] = StackInst::first();
        if digit == 0 {
            return false;
        }
        digit -= 1;
    }
}

#[cfg(test)]
mod tests {
    use csi_ir::{
        simulate,
        Category::{One, Two},
        Slot,
    };

    use super::*;

    fn layout(slots: &[Slot]) -> StackLayout {
        StackLayout::from(slots)
    }

    #[test]
    fn odometer_order() {
        use StackInst::*;

        let mut insts = [Dup, Swap];
        assert!(advance(&mut insts, 1));
        assert_eq!(insts, [DupX1, Dup]);

        let mut insts = [Pop2, Dup2X2];
        assert!(advance(&mut insts, 0));
        assert_eq!(insts, [Swap, Dup]);

        let mut insts = [Swap, Swap];
        assert!(!advance(&mut insts, 1));
    }

    #[test]
    fn identity_is_empty() {
        let solver = SearchSolver::default();
        let stack = layout(&[Slot::new(0, One), Slot::new(1, Two)]);
        assert_eq!(solver.solve(&stack, &stack), Some(StackInsts::new()));
        assert_eq!(
            solver.solve(&StackLayout::new(), &StackLayout::new()),
            Some(StackInsts::new())
        );
    }

    #[test]
    fn results_are_sound() {
        let solver = SearchSolver::default();
        let (a, b, c) = (Slot::new(0, One), Slot::new(1, One), Slot::new(2, One));
        let w = Slot::new(3, Two);
        let pairs = [
            (layout(&[a, b]), layout(&[a, b, a, b])),
            (layout(&[a, b, c]), layout(&[a, b, c, a, b, c])),
            (layout(&[a, b]), layout(&[a, b, b, a])),
            (layout(&[w, a]), layout(&[w, a, w, a])),
            (layout(&[a, w]), layout(&[a, w, a, w])),
            (layout(&[a, b, c]), layout(&[c])),
        ];

        for (current, target) in pairs {
            let insts = solver
                .solve(&current, &target)
                .unwrap_or_else(|| panic!("{current} -> {target} should be solvable"));
            assert!(!insts.is_empty() && insts.len() <= MAX_SEARCH_DEPTH);
            assert_eq!(simulate(&current, &insts).unwrap(), target);
        }
    }

    #[test]
    fn first_match_in_enumeration_order() {
        use StackInst::*;

        let solver = SearchSolver::default();
        let (a, b, c) = (Slot::new(0, One), Slot::new(1, One), Slot::new(2, One));
        let cases: [(StackLayout, StackLayout, &[StackInst]); 3] = [
            (layout(&[a, b]), layout(&[a, b, b, a]), &[Dup2, Swap]),
            (layout(&[a, b, c]), layout(&[c]), &[DupX2, Pop, Pop2]),
            (
                layout(&[a, b, c]),
                layout(&[a, b, c, a, b, c]),
                &[Dup, Dup2X2, Pop2, Dup2X2, Dup2X1, Pop2],
            ),
        ];

        for (current, target, expected) in cases {
            let insts = solver.solve(&current, &target).unwrap();
            assert_eq!(insts.as_slice(), expected, "{current} -> {target}");
        }

        let shallow = SearchSolver::new(5);
        assert_eq!(
            shallow.solve(&layout(&[a, b, c]), &layout(&[a, b, c, a, b, c])),
            None
        );
    }

    #[test]
    fn unsolvable_pair() {
        let solver = SearchSolver::new(4);
        let a = layout(&[Slot::new(0, One)]);
        let b = layout(&[Slot::new(1, One)]);
        assert_eq!(solver.solve(&a, &b), None);

        let wide = layout(&[Slot::new(0, Two)]);
        let narrow = layout(&[Slot::new(0, One)]);
        assert_eq!(solver.solve(&wide, &narrow), None);
    }
}
