//! The stack-shuffling instruction alphabet and its operand-stack semantics.
use std::fmt;

use smallvec::SmallVec;

use crate::stack::{Category, StackLayout};

/// Sequence type used for solved stack transforms.
pub type StackInsts = SmallVec<[StackInst; 6]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StackInst {
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Pop,
    Pop2,
    Swap,
    /// Enumeration sentinel; never part of a solved sequence.
    Nop,
}

/// What an instruction does to the stack once its preconditions have been matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    /// Copy the top `count` slots beneath the top `depth` slots.
    Dup { count: usize, depth: usize },
    Pop(usize),
    Swap,
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("`{inst}` is not applicable to the current stack")]
pub struct StackError {
    pub inst: StackInst,
}

impl StackInst {
    /// Every real instruction, in enumeration order.
    pub const ALPHABET: [StackInst; 9] = [
        Self::Dup,
        Self::DupX1,
        Self::DupX2,
        Self::Dup2,
        Self::Dup2X1,
        Self::Dup2X2,
        Self::Pop,
        Self::Pop2,
        Self::Swap,
    ];

    /// Successor in enumeration order; the last instruction wraps to `Nop`.
    pub fn next(self) -> Self {
        match self {
            Self::Dup => Self::DupX1,
            Self::DupX1 => Self::DupX2,
            Self::DupX2 => Self::Dup2,
            Self::Dup2 => Self::Dup2X1,
            Self::Dup2X1 => Self::Dup2X2,
            Self::Dup2X2 => Self::Pop,
            Self::Pop => Self::Pop2,
            Self::Pop2 => Self::Swap,
            Self::Swap | Self::Nop => Self::Nop,
        }
    }

    pub fn first() -> Self {
        Self::ALPHABET[0]
    }

    pub fn is_nop(self) -> bool {
        self == Self::Nop
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Dup => "DUP",
            Self::DupX1 => "DUP_X1",
            Self::DupX2 => "DUP_X2",
            Self::Dup2 => "DUP2",
            Self::Dup2X1 => "DUP2_X1",
            Self::Dup2X2 => "DUP2_X2",
            Self::Pop => "POP",
            Self::Pop2 => "POP2",
            Self::Swap => "SWAP",
            Self::Nop => "NOP",
        }
    }

    pub fn opcode(self) -> u8 {
        match self {
            Self::Nop => 0x00,
            Self::Pop => 0x57,
            Self::Pop2 => 0x58,
            Self::Dup => 0x59,
            Self::DupX1 => 0x5a,
            Self::DupX2 => 0x5b,
            Self::Dup2 => 0x5c,
            Self::Dup2X1 => 0x5d,
            Self::Dup2X2 => 0x5e,
            Self::Swap => 0x5f,
        }
    }

    /// Matches the instruction's forms against the categories on top of `layout`.
    fn effect(self, layout: &StackLayout) -> Option<Effect> {
        use Category::{One, Two};

        let c = |depth| layout.peek_category(depth);
        let effect = match self {
            Self::Nop => Effect::Nothing,
            Self::Dup => match c(0)? {
                One => Effect::Dup { count: 1, depth: 1 },
                Two => return None,
            },
            Self::DupX1 => match (c(0)?, c(1)?) {
                (One, One) => Effect::Dup { count: 1, depth: 2 },
                _ => return None,
            },
            Self::DupX2 => match (c(0)?, c(1)?) {
                (One, Two) => Effect::Dup { count: 1, depth: 2 },
                (One, One) if c(2)? == One => Effect::Dup { count: 1, depth: 3 },
                _ => return None,
            },
            Self::Dup2 => match c(0)? {
                Two => Effect::Dup { count: 1, depth: 1 },
                One if c(1)? == One => Effect::Dup { count: 2, depth: 2 },
                One => return None,
            },
            Self::Dup2X1 => match (c(0)?, c(1)?) {
                (Two, One) => Effect::Dup { count: 1, depth: 2 },
                (One, One) if c(2)? == One => Effect::Dup { count: 2, depth: 3 },
                _ => return None,
            },
            Self::Dup2X2 => match (c(0)?, c(1)?) {
                (Two, Two) => Effect::Dup { count: 1, depth: 2 },
                (Two, One) if c(2)? == One => Effect::Dup { count: 1, depth: 3 },
                (One, One) => match c(2)? {
                    Two => Effect::Dup { count: 2, depth: 3 },
                    One if c(3)? == One => Effect::Dup { count: 2, depth: 4 },
                    One => return None,
                },
                _ => return None,
            },
            Self::Pop => match c(0)? {
                One => Effect::Pop(1),
                Two => return None,
            },
            Self::Pop2 => match c(0)? {
                Two => Effect::Pop(1),
                One if c(1)? == One => Effect::Pop(2),
                One => return None,
            },
            Self::Swap => match (c(0)?, c(1)?) {
                (One, One) => Effect::Swap,
                _ => return None,
            },
        };
        Some(effect)
    }

    /// Rewrites `layout` in place, or leaves it untouched if a precondition does not hold.
    pub fn apply(self, layout: &mut StackLayout) -> Result<(), StackError> {
        match self.effect(layout).ok_or(StackError { inst: self })? {
            Effect::Dup { count, depth } => layout.insert_copies(count, depth),
            Effect::Pop(count) => layout.truncate_top(count),
            Effect::Swap => layout.swap_top(),
            Effect::Nothing => {}
        }
        Ok(())
    }
}

impl fmt::Display for StackInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Runs `insts` against a copy of `layout`, failing at the first unmet precondition.
pub fn simulate(layout: &StackLayout, insts: &[StackInst]) -> Result<StackLayout, StackError> {
    let mut out = layout.clone();
    for inst in insts {
        inst.apply(&mut out)?;
    }
    Ok(out)
}
