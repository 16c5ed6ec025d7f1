//! A deduplicating store of truth tables addressed by literals.

use std::collections::HashMap;

use crate::truth_table::TruthTable;

/// Stores each function once, in normal form, and hands out literals `id << 1 | complemented`.
///
/// A table is in normal form when its value under the all-zero assignment is zero, so a function and its
/// complement share one entry and differ only in the low bit of their literal.
#[derive(Clone, Debug, Default)]
pub struct TruthTableCache {
    tables: Vec<TruthTable>,
    index: HashMap<TruthTable, u32>,
}

impl TruthTableCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty cache with room for `capacity` distinct functions.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tables: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Stores `tt` and returns its literal.
    pub fn insert(&mut self, tt: TruthTable) -> u32 {
        let complemented = !tt.is_normal();
        let normal = if complemented { !tt } else { tt };
        let id = if let Some(&id) = self.index.get(&normal) {
            id
        } else {
            let id = u32::try_from(self.tables.len()).unwrap_or_else(|_| panic!("truth table cache overflow"));
            self.index.insert(normal.clone(), id);
            self.tables.push(normal);
            id
        };
        (id << 1) | u32::from(complemented)
    }

    /// The function behind `literal`.
    #[must_use]
    pub fn get(&self, literal: u32) -> TruthTable {
        let tt = &self.tables[(literal >> 1) as usize];
        if literal & 1 == 1 {
            !tt
        } else {
            tt.clone()
        }
    }

    /// Number of distinct normal-form functions stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
