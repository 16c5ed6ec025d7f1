//! Bounded, ordered sets of cuts.

use std::ops::{Index, IndexMut};

use crate::cut::{Cut, SortOrder};

/// The largest number of cuts a set can hold.
pub const MAX_CUT_NUM: usize = 32;

/// The cuts of one node, best first.
///
/// Cuts are kept in the order of the [`SortOrder`] they were inserted with; the trivial cut is appended last and
/// never takes part in the ordering.
#[derive(Clone, Debug, Default)]
pub struct CutSet {
    cuts: Vec<Cut>,
}

impl CutSet {
    /// An empty cut set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cuts: Vec::with_capacity(MAX_CUT_NUM),
        }
    }

    /// Number of cuts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    /// True if there are no cuts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Removes every cut.
    pub fn clear(&mut self) {
        self.cuts.clear();
    }

    /// Iterates over the cuts, best first.
    pub fn iter(&self) -> std::slice::Iter<'_, Cut> {
        self.cuts.iter()
    }

    /// Appends `cut` without ordering or dominance checks.
    pub fn add_cut(&mut self, cut: Cut) {
        assert!(self.cuts.len() < MAX_CUT_NUM, "cut set overflow");
        self.cuts.push(cut);
    }

    /// True if some cut in the set dominates `cut`.
    #[must_use]
    pub fn is_dominated(&self, cut: &Cut) -> bool {
        self.cuts.iter().any(|other| other.dominates(cut))
    }

    /// Inserts `cut` in order and removes every cut it dominates.
    ///
    /// With `skip_first`, the current best cut is neither removed nor displaced.
    pub fn insert(&mut self, cut: Cut, skip_first: bool, order: SortOrder) {
        let start = usize::from(skip_first && !self.cuts.is_empty());
        let mut k = 0;
        self.cuts.retain(|other| {
            let keep = k < start || !cut.dominates(other);
            k += 1;
            keep
        });
        self.simple_insert_from(cut, start, order);
    }

    /// Inserts `cut` in order, evicting the worst cut if the set is full.
    pub fn simple_insert(&mut self, cut: Cut, order: SortOrder) {
        self.simple_insert_from(cut, 0, order);
    }

    fn simple_insert_from(&mut self, cut: Cut, start: usize, order: SortOrder) {
        let pos = start + self.cuts[start..].partition_point(|other| order.better(other, &cut));
        if self.cuts.len() == MAX_CUT_NUM {
            if pos == MAX_CUT_NUM {
                return;
            }
            self.cuts.pop();
        }
        self.cuts.insert(pos, cut);
    }

    /// Overwrites the cut at `index`.
    pub fn replace(&mut self, index: usize, cut: Cut) {
        self.cuts[index] = cut;
    }

    /// Puts `cut` in place of the best cut and drops every other cut it dominates or is dominated by.
    pub fn set_best(&mut self, cut: Cut) {
        if !self.cuts.is_empty() {
            self.cuts.remove(0);
        }
        self.cuts.retain(|other| !cut.dominates(other) && !other.dominates(&cut));
        self.cuts.insert(0, cut);
    }

    /// Moves the cut at `index` to the front, keeping the relative order of the others.
    pub fn update_best(&mut self, index: usize) {
        self.cuts[..=index].rotate_right(1);
    }

    /// Keeps at most `limit` cuts.
    pub fn limit(&mut self, limit: usize) {
        self.cuts.truncate(limit);
    }

    /// The best cut.
    ///
    /// # Panics
    ///
    /// Panics if the set is empty.
    #[must_use]
    pub fn best(&self) -> &Cut {
        self.cuts.first().unwrap_or_else(|| panic!("best cut requested from an empty cut set"))
    }
}

impl Index<usize> for CutSet {
    type Output = Cut;

    fn index(&self, index: usize) -> &Cut {
        &self.cuts[index]
    }
}

impl IndexMut<usize> for CutSet {
    fn index_mut(&mut self, index: usize) -> &mut Cut {
        &mut self.cuts[index]
    }
}

impl<'a> IntoIterator for &'a CutSet {
    type Item = &'a Cut;
    type IntoIter = std::slice::Iter<'a, Cut>;

    fn into_iter(self) -> Self::IntoIter {
        self.cuts.iter()
    }
}
