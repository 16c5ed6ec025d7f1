//! Exact reference counting of the chosen cuts, and cut expansion.

use log::trace;

use crate::cost::LutCost;
use crate::cut::Cut;
use crate::map::LutMapper;
use crate::traits::Network;

/// What a reference traversal counts.
#[derive(Clone, Copy, Debug)]
enum Measure {
    Area,
    Edges,
}

impl Measure {
    fn of(self, cut: &Cut) -> u32 {
        match self {
            Self::Area => cut.data.lut_area,
            #[allow(clippy::cast_possible_truncation)]
            Self::Edges => cut.size() as u32,
        }
    }
}

impl<'a, N: Network, C: LutCost, const STORE_FUNCTION: bool> LutMapper<'a, N, C, STORE_FUNCTION> {
    /// References the leaves of `cut`, recursing into leaves that become used, and returns the area gained.
    pub(crate) fn cut_ref(&mut self, cut: &Cut) -> u32 {
        self.reference(cut, Measure::Area, false)
    }

    /// Dereferences the leaves of `cut`, recursing into leaves that become unused, and returns the area freed.
    pub(crate) fn cut_deref(&mut self, cut: &Cut) -> u32 {
        self.dereference(cut, Measure::Area)
    }

    /// Like [`Self::cut_deref`], counting edges instead of area.
    pub(crate) fn cut_edge_deref(&mut self, cut: &Cut) -> u32 {
        self.dereference(cut, Measure::Edges)
    }

    /// The area `cut` would add to the current mapping, leaving reference counts untouched.
    pub(crate) fn cut_measure_mffc(&mut self, cut: &Cut) -> u32 {
        self.touched.clear();
        let area = self.reference(cut, Measure::Area, true);
        for i in 0..self.touched.len() {
            let leaf = self.touched[i];
            self.node_match[leaf].map_refs -= 1;
        }
        area
    }

    fn reference(&mut self, cut: &Cut, measure: Measure, record: bool) -> u32 {
        let mut count = measure.of(cut);
        let mut stack = cut.leaves().to_vec();
        while let Some(leaf) = stack.pop() {
            if record {
                self.touched.push(leaf);
            }
            let m = &mut self.node_match[leaf];
            m.map_refs += 1;
            // Inputs and constants are counted but cost nothing.
            if m.map_refs == 1 && !self.terminal[leaf] {
                let best = self.cuts[leaf].best();
                count += measure.of(best);
                stack.extend_from_slice(best.leaves());
            }
        }
        count
    }

    fn dereference(&mut self, cut: &Cut, measure: Measure) -> u32 {
        let mut count = measure.of(cut);
        let mut stack = cut.leaves().to_vec();
        while let Some(leaf) = stack.pop() {
            let m = &mut self.node_match[leaf];
            assert!(m.map_refs > 0, "dereferencing node {} which has no references", leaf);
            m.map_refs -= 1;
            if m.map_refs == 0 && !self.terminal[leaf] {
                let best = self.cuts[leaf].best();
                count += measure.of(best);
                stack.extend_from_slice(best.leaves());
            }
        }
        count
    }

    fn new_traversal(&mut self) {
        self.trav_id += 1;
    }

    fn is_visited(&self, index: usize) -> bool {
        self.visited[index] == self.trav_id
    }

    fn set_visited(&mut self, index: usize) {
        self.visited[index] = self.trav_id;
    }

    /// Tries to lower the area of every chosen cut by moving its leaves, then recounts references.
    pub(crate) fn expand_cuts<const ELA: bool>(&mut self) {
        // Expanded cuts carry no function, and fixed cut sets are not touched.
        if STORE_FUNCTION || !self.ps.recompute_cuts {
            return;
        }

        for i in 0..self.topo_order.len() {
            let index = self.topo_order[i];
            if self.terminal[index] {
                continue;
            }
            self.expand_cuts_node(index);
        }

        self.set_mapping_refs::<ELA>();
        self.cuts_total = 0;
        self.push_round_stats("Reduce");
    }

    fn arrival(&self, cut: &Cut) -> u32 {
        cut.leaves()
            .iter()
            .map(|&leaf| self.cuts[leaf].best().data.delay + cut.data.lut_delay)
            .max()
            .unwrap_or(0)
    }

    fn expand_cuts_node(&mut self, index: usize) {
        if self.node_match[index].map_refs == 0 {
            return;
        }

        let mut best_cut = self.cuts[index].best().clone();
        best_cut.data.delay = self.arrival(&best_cut);

        let area_before = self.cut_deref(&best_cut);

        self.new_traversal();
        let mut leaves = Vec::with_capacity(best_cut.size());
        let mut cost_before = 0;
        for &leaf in best_cut.leaves() {
            self.set_visited(leaf);
            leaves.push(leaf);
            if self.node_match[leaf].map_refs == 0 {
                cost_before += 1;
            }
        }
        self.mark_cut_volume(index);

        while self.improve_cut(&mut leaves) {}

        let cost_after = leaves.iter().filter(|&&leaf| self.node_match[leaf].map_refs == 0).count();
        debug_assert!(cost_after <= cost_before, "cut expansion increased the leaf cost of node {}", index);

        leaves.sort_unstable();
        let mut new_cut = Cut::new(leaves);
        new_cut.data = best_cut.data;
        new_cut.data.delay = self.arrival(&new_cut);

        let area_after = self.cut_ref(&new_cut);

        if area_after <= area_before && new_cut.data.delay <= self.node_match[index].required {
            trace!(
                "node {}: cut {:?} expanded to {:?}, area {} -> {}",
                index,
                best_cut.leaves(),
                new_cut.leaves(),
                area_before,
                area_after
            );
            if self.ps.remove_dominated_cuts {
                self.cuts[index].set_best(new_cut);
            } else {
                self.cuts[index].replace(0, new_cut);
            }
        } else {
            self.cut_deref(&new_cut);
            self.cut_ref(&best_cut);
        }
    }

    /// Marks every node between `root` and the currently marked leaves.
    fn mark_cut_volume(&mut self, root: usize) {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if self.is_visited(node) {
                continue;
            }
            self.set_visited(node);
            stack.extend_from_slice(&self.fanins[node]);
        }
    }

    fn improve_cut(&mut self, leaves: &mut Vec<usize>) -> bool {
        if self.improve_cut_expand(leaves, 1, false) {
            return true;
        }
        leaves.len() < self.ps.cut_enumeration.cut_size as usize && self.improve_cut_expand(leaves, 2, true)
    }

    /// Replaces one leaf by its fanins if that adds at most `max_new_leaves` leaves and does not raise the number
    /// of leaves outside the mapping (with `strict`, lowers it).
    fn improve_cut_expand(&mut self, leaves: &mut Vec<usize>, max_new_leaves: usize, strict: bool) -> bool {
        for pos in 0..leaves.len() {
            let leaf = leaves[pos];
            if self.terminal[leaf] {
                continue;
            }

            let new_leaves: Vec<usize> = self.fanins[leaf]
                .iter()
                .copied()
                .filter(|&fanin| !self.is_constant(fanin) && !self.is_visited(fanin))
                .collect();
            if new_leaves.len() > max_new_leaves {
                continue;
            }

            let mut cost: i32 = if self.node_match[leaf].map_refs == 0 { -1 } else { 0 };
            for &fanin in &new_leaves {
                if self.node_match[fanin].map_refs == 0 {
                    cost += 1;
                }
            }

            if cost < 0 || (!strict && cost == 0) {
                leaves.remove(pos);
                for fanin in new_leaves {
                    if !self.is_visited(fanin) {
                        leaves.push(fanin);
                        self.set_visited(fanin);
                    }
                }
                return true;
            }
        }
        false
    }
}
