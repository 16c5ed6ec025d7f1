//! Delay estimation from balanced two-level decompositions of cut functions.
//!
//! Instead of charging one LUT delay, a cut is timed as if its function were built as a balanced tree of
//! two-input gates: each cube is an AND tree over its literals, and the cubes are combined by an OR (or XOR)
//! tree. Trees are built greedily by always combining the two earliest-arriving signals.

#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::cost::LutCost;
use crate::cut::Cut;
use crate::map::LutMapper;
use crate::sop::{esop, isop, num_literals, Cube};
use crate::traits::Network;
use crate::truth_table::TruthTable;

/// Functions whose decomposition has more cubes than this are not balanced.
pub(crate) const MAX_CUBES: usize = 64;

/// Combines the two earliest signals until one is left, returning its arrival time.
fn balance_tree(times: &mut BinaryHeap<Reverse<u32>>) -> u32 {
    while times.len() > 1 {
        let Reverse(a) = times.pop().unwrap_or(Reverse(0));
        let Reverse(b) = times.pop().unwrap_or(Reverse(0));
        times.push(Reverse(a.max(b) + 1));
    }
    times.peek().map_or(0, |&Reverse(t)| t)
}

/// Like [`balance_tree`], recording which signals each new gate combines.
///
/// Signals are `(arrival, id)`; new gates get ids from `connections.len()` upwards.
fn balance_tree_connections(times: &mut BinaryHeap<Reverse<(u32, usize)>>, connections: &mut Vec<(usize, usize)>) {
    while times.len() > 1 {
        let (Some(Reverse((ta, a))), Some(Reverse((tb, b)))) = (times.pop(), times.pop()) else {
            break;
        };
        connections.push((a, b));
        times.push(Reverse((ta.max(tb) + 1, connections.len() - 1)));
    }
}

impl<'a, N: Network, C: LutCost, const STORE_FUNCTION: bool> LutMapper<'a, N, C, STORE_FUNCTION> {
    fn decompose(&self, tt: &TruthTable) -> Vec<Cube> {
        if self.ps.sop_balancing {
            isop(tt)
        } else {
            esop(tt)
        }
    }

    /// Computes and caches the two-level decomposition of the cut function, marking overly complex cuts.
    pub(crate) fn compute_isop(&mut self, cut: &mut Cut) {
        let func_id = cut
            .func_id
            .unwrap_or_else(|| panic!("cut {:?} has no function to decompose", cut.leaves()));
        let key = func_id >> 1;

        if let Some(cubes) = self.isops.get(&key) {
            cut.data.ignore = cubes.len() > MAX_CUBES;
            return;
        }

        let tt = self.truth_tables.get(key << 1);
        let positive = self.decompose(&tt);
        let negative = self.decompose(&!&tt);
        let cubes = if (negative.len(), num_literals(&negative)) < (positive.len(), num_literals(&positive)) {
            negative
        } else {
            positive
        };

        cut.data.ignore = cubes.len() > MAX_CUBES;
        self.isops.insert(key, cubes);
    }

    fn cubes_of(&self, cut: &Cut) -> &[Cube] {
        let func_id = cut
            .func_id
            .unwrap_or_else(|| panic!("cut {:?} has no function to balance", cut.leaves()));
        self.isops
            .get(&(func_id >> 1))
            .map_or(&[], Vec::as_slice)
    }

    /// Times `cut` as a balanced decomposition of its function and charges one area unit per two-input gate.
    pub(crate) fn compute_balancing_cost(&self, cut: &mut Cut) {
        if cut.data.ignore || cut.size() < 2 {
            return;
        }
        let cubes = self.cubes_of(cut);
        if cubes.len() > MAX_CUBES {
            return;
        }

        let arrival: Vec<u32> = cut.leaves().iter().map(|&leaf| self.cuts[leaf].best().data.delay).collect();

        let mut gates = 0;
        let mut terms = BinaryHeap::new();
        for cube in cubes {
            let mut literals: BinaryHeap<Reverse<u32>> = (0..cut.size())
                .filter(|&i| cube.has_literal(i as u32))
                .map(|i| Reverse(arrival[i]))
                .collect();
            if literals.is_empty() {
                continue;
            }
            gates += literals.len() - 1;
            terms.push(Reverse(balance_tree(&mut literals)));
        }
        if terms.is_empty() {
            return;
        }
        gates += terms.len() - 1;

        cut.data.delay = balance_tree(&mut terms);
        cut.data.lut_area = gates as u32;
        cut.data.lut_delay = 1;
        cut.data.area_flow += gates as f32;
    }

    /// Propagates the required time of a node through the balanced decomposition of its best cut.
    pub(crate) fn compute_balancing_cost_required(&mut self, index: usize) {
        let cut = self.cuts[index].best().clone();
        let required = self.node_match[index].required;

        match cut.size() {
            0 => return,
            1 => {
                let m = &mut self.node_match[cut.leaves()[0]];
                m.required = m.required.min(required);
                return;
            },
            _ => {},
        }

        let arrival: Vec<u32> = cut.leaves().iter().map(|&leaf| self.cuts[leaf].best().data.delay).collect();
        let mut connections: Vec<(usize, usize)> = (0..cut.size()).map(|i| (i, i)).collect();

        let mut terms = BinaryHeap::new();
        for cube in self.cubes_of(&cut).to_vec() {
            let mut literals: BinaryHeap<Reverse<(u32, usize)>> = (0..cut.size())
                .filter(|&i| cube.has_literal(i as u32))
                .map(|i| Reverse((arrival[i], i)))
                .collect();
            if literals.is_empty() {
                continue;
            }
            balance_tree_connections(&mut literals, &mut connections);
            if let Some(&top) = literals.peek() {
                terms.push(top);
            }
        }
        if terms.is_empty() {
            return;
        }
        balance_tree_connections(&mut terms, &mut connections);

        let mut times = vec![u32::MAX; connections.len()];
        if let Some(last) = times.last_mut() {
            *last = required;
        }
        for i in (cut.size()..connections.len()).rev() {
            let time = times[i].saturating_sub(1);
            let (a, b) = connections[i];
            times[a] = times[a].min(time);
            times[b] = times[b].min(time);
        }

        for (pos, &leaf) in cut.leaves().iter().enumerate() {
            let m = &mut self.node_match[leaf];
            m.required = m.required.min(times[pos]);
        }
    }
}
