//! Symbolic operand stack used to plan stack shuffles around an intercepted call.
use std::fmt;

use cranelift_entity::entity_impl;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Width class of a stack value: `long`/`double` are category 2, everything else category 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    One,
    Two,
}

/// An opaque name for a logical value on the stack. Copies of a value share the id.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Copy, Hash)]
pub struct SlotId(pub u32);
entity_impl!(SlotId, "s");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub id: SlotId,
    pub category: Category,
}

impl Slot {
    pub const fn new(id: u32, category: Category) -> Self {
        Self {
            id: SlotId(id),
            category,
        }
    }

    pub fn is_wide(&self) -> bool {
        self.category == Category::Two
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.category {
            Category::One => write!(f, "{}", self.id),
            Category::Two => write!(f, "{}:2", self.id),
        }
    }
}

/// Bottom-first sequence of slots; the last slot is the top of the stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StackLayout {
    slots: SmallVec<[Slot; 8]>,
}

impl StackLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn push(&mut self, slot: Slot) {
        self.slots.push(slot);
    }

    /// The slot `depth` entries below the top (`0` is the top).
    pub fn peek(&self, depth: usize) -> Option<Slot> {
        let idx = self.slots.len().checked_sub(depth + 1)?;
        Some(self.slots[idx])
    }

    pub fn peek_category(&self, depth: usize) -> Option<Category> {
        self.peek(depth).map(|slot| slot.category)
    }

    /// Copies the top `count` slots and inserts the copies beneath the top `depth` slots.
    pub(crate) fn insert_copies(&mut self, count: usize, depth: usize) {
        debug_assert!(count <= depth && depth <= self.len());
        let len = self.slots.len();
        let copies: SmallVec<[Slot; 2]> = self.slots[len - count..].iter().copied().collect();
        let at = len - depth;
        for (offset, slot) in copies.into_iter().enumerate() {
            self.slots.insert(at + offset, slot);
        }
    }

    pub(crate) fn truncate_top(&mut self, count: usize) {
        debug_assert!(count <= self.len());
        self.slots.truncate(self.slots.len() - count);
    }

    pub(crate) fn swap_top(&mut self) {
        let len = self.slots.len();
        debug_assert!(len >= 2);
        self.slots.swap(len - 1, len - 2);
    }

    /// Renames slot ids densely in order of first appearance in `source`, then `target`.
    ///
    /// Stack instructions never look at ids beyond equality, so the transform between two
    /// layouts is the same as the one between their canonical forms.
    pub fn canonicalize_pair(source: &Self, target: &Self) -> (Self, Self) {
        let mut renames: FxHashMap<SlotId, u32> = FxHashMap::default();
        let mut rename = |layout: &Self| -> Self {
            let slots = layout
                .slots
                .iter()
                .map(|slot| {
                    let next = renames.len() as u32;
                    let id = *renames.entry(slot.id).or_insert(next);
                    Slot::new(id, slot.category)
                })
                .collect();
            Self { slots }
        };

        let source = rename(source);
        let target = rename(target);
        (source, target)
    }
}

impl From<&[Slot]> for StackLayout {
    fn from(slots: &[Slot]) -> Self {
        Self {
            slots: slots.into(),
        }
    }
}

impl FromIterator<Slot> for StackLayout {
    fn from_iter<I: IntoIterator<Item = Slot>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}

impl Extend<Slot> for StackLayout {
    fn extend<I: IntoIterator<Item = Slot>>(&mut self, iter: I) {
        self.slots.extend(iter);
    }
}

impl fmt::Display for StackLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{slot}")?;
        }
        f.write_str("]")
    }
}
