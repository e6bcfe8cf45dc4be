use std::{fmt::Debug, hash::Hash};

/// A trait to be implemented by any "index-like" types
pub trait Index: Copy + 'static + Eq + PartialEq + Debug + Hash {
    fn new(idx: usize) -> Self;

    fn index(self) -> usize;

    #[inline]
    fn increment_by(&mut self, amount: usize) {
        *self = self.plus(amount);
    }

    #[inline]
    #[must_use = "Use `increment_by` if you wanted to update the index in-place"]
    fn plus(self, amount: usize) -> Self {
        Self::new(self.index() + amount)
    }
}

macro_rules! simple_index {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
        $vis struct $name(u32);

        impl $crate::index::Index for $name {
            fn new(idx: usize) -> Self {
                Self(idx as _)
            }

            fn index(self) -> usize {
                self.0 as _
            }
        }
    };
}

pub(crate) use simple_index;

/// Hands out consecutive indices of one kind. Every compilation owns one per
/// kind so numbering restarts at zero for each unit.
#[derive(Debug, Clone)]
pub struct IndexCounter<I: Index> {
    next: I,
}

impl<I: Index> IndexCounter<I> {
    pub fn new() -> Self {
        Self { next: I::new(0) }
    }

    /// Returns the next fresh index and advances the counter
    pub fn fresh(&mut self) -> I {
        let prev = self.next;
        self.next.increment_by(1);
        prev
    }

    /// Number of indices handed out so far
    pub fn count(&self) -> usize {
        self.next.index()
    }
}

impl<I: Index> Default for IndexCounter<I> {
    fn default() -> Self {
        Self::new()
    }
}
