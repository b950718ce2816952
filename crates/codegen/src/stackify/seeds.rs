//! Literal memo seed table: the shuffles call-site advice needs most often.
//! Every row is in canonical form and equals what the search would find.
use csi_ir::{
    Category::{One, Two},
    Slot,
    StackInst::{self, *},
};

pub(super) struct Seed {
    pub(super) source: &'static [Slot],
    pub(super) target: &'static [Slot],
    pub(super) insts: &'static [StackInst],
}

const A: Slot = Slot::new(0, One);
const B: Slot = Slot::new(1, One);
const C: Slot = Slot::new(2, One);
const A2: Slot = Slot::new(0, Two);
const B2: Slot = Slot::new(1, Two);

pub(super) static SEEDS: &[Seed] = &[
    Seed {
        source: &[A],
        target: &[A, A],
        insts: &[Dup],
    },
    Seed {
        source: &[A2],
        target: &[A2, A2],
        insts: &[Dup2],
    },
    Seed {
        source: &[A, B],
        target: &[A, B, A, B],
        insts: &[Dup2],
    },
    Seed {
        source: &[A, B],
        target: &[B, A],
        insts: &[Swap],
    },
    Seed {
        source: &[A, B],
        target: &[B, A, B],
        insts: &[DupX1],
    },
    Seed {
        source: &[A, B, C],
        target: &[C, A, B, C],
        insts: &[DupX2],
    },
    Seed {
        source: &[A],
        target: &[],
        insts: &[Pop],
    },
    Seed {
        source: &[A, B],
        target: &[A],
        insts: &[Pop],
    },
    Seed {
        source: &[A2],
        target: &[],
        insts: &[Pop2],
    },
    Seed {
        source: &[A, B],
        target: &[],
        insts: &[Pop2],
    },
    Seed {
        source: &[A, B, C],
        target: &[B, C, A, B, C],
        insts: &[Dup2X1],
    },
    Seed {
        source: &[A, B2],
        target: &[B2, A, B2],
        insts: &[Dup2X1],
    },
];
