//! Cut enumeration and costing.

#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use itertools::Itertools;
use log::debug;

use crate::cost::LutCost;
use crate::cut::{Cut, SortOrder};
use crate::cut_set::CutSet;
use crate::map::LutMapper;
use crate::traits::Network;
use crate::truth_table::TruthTable;

/// Cache literal of the constant-zero function.
pub(crate) const TT_ZERO: u32 = 0;
/// Cache literal of the one-variable projection.
pub(crate) const TT_PROJECTION: u32 = 2;

/// Drops vacuous variables of `tt` together with the matching entries of `items`.
///
/// Returns true if anything was dropped.
pub(crate) fn minimize_support<T: Copy>(tt: &mut TruthTable, items: &mut Vec<T>) -> bool {
    debug_assert_eq!(tt.num_vars() as usize, items.len());
    let support = tt.support_mask();
    let size = support.count_ones();
    if size as usize == items.len() {
        return false;
    }

    if support & (support + 1) == 0 {
        // The support is a prefix of the variables.
        items.truncate(size as usize);
    } else {
        let vars = tt.min_base_inplace();
        *items = vars.iter().map(|&var| items[var as usize]).collect();
    }
    *tt = tt.shrink_to(size);
    true
}

/// Moves the variables of a table over the leaves `sub` to their positions among the leaves `sup`.
fn align_support(sub: &[usize], sup: &[usize], tt: &mut TruthTable) {
    let mut positions = Vec::with_capacity(sub.len());
    let mut start = 0;
    for leaf in sub {
        let pos = start
            + sup[start..]
                .iter()
                .position(|l| l == leaf)
                .unwrap_or_else(|| panic!("leaf {} is missing from the merged cut {:?}", leaf, sup));
        positions.push(pos);
        start = pos + 1;
    }
    for (i, &pos) in positions.iter().enumerate().rev() {
        if i != pos {
            tt.swap_inplace(i as u32, pos as u32);
        }
    }
}

impl<'a, N: Network, C: LutCost, const STORE_FUNCTION: bool> LutMapper<'a, N, C, STORE_FUNCTION> {
    pub(crate) fn add_zero_cut(&mut self, index: usize) {
        let mut cut = Cut::constant();
        if STORE_FUNCTION {
            let value = self.ntk.constant_value(self.ntk.index_to_node(index));
            cut.func_id = Some(TT_ZERO | u32::from(value));
        }
        self.cuts[index].add_cut(cut);
    }

    pub(crate) fn add_unit_cut(&mut self, index: usize) {
        let mut cut = Cut::trivial(index);
        if STORE_FUNCTION {
            cut.func_id = Some(TT_PROJECTION);
        }
        self.cuts[index].add_cut(cut);
    }

    /// Enumerates the cuts of a node from the cuts of its fanins and selects the best one.
    pub(crate) fn compute_best_cut<const DO_AREA: bool, const ELA: bool>(
        &mut self,
        index: usize,
        sort: SortOrder,
        preprocess: bool,
    ) {
        let cut_size = self.ps.cut_enumeration.cut_size as usize;
        let fanin_limit = self.ps.cut_enumeration.fanin_limit as usize;
        let fanins = self.fanins[index].clone();

        let mut rcuts = std::mem::take(&mut self.cuts[index]);
        let referenced = self.iteration != 0 && self.node_match[index].map_refs > 0;

        if DO_AREA && referenced {
            self.cut_deref(rcuts.best());
        }

        let mut previous = None;
        if self.iteration != 0 {
            let mut best = rcuts.best().clone();
            self.compute_cut_data::<ELA>(&mut best, index, true);
            previous = Some(best);
        }

        rcuts.clear();
        if !preprocess {
            if let Some(best) = &previous {
                rcuts.simple_insert(best.clone(), sort);
            }
        }

        // The fanin cut sets are copied so the mapper stays free to update costs while merging.
        let lcuts: Vec<Vec<Cut>> = fanins.iter().map(|&f| self.cuts[f].iter().cloned().collect()).collect();

        match lcuts.len() {
            0 => {},
            1 => {
                for cut in &lcuts[0] {
                    let new_cut = Cut::new(cut.leaves().to_vec());
                    self.add_candidate::<DO_AREA, ELA>(&mut rcuts, index, new_cut, &[cut], sort, preprocess);
                }
            },
            2 => {
                for (c1, c2) in lcuts[0].iter().cartesian_product(&lcuts[1]) {
                    if let Some(new_cut) = c1.merge(c2, cut_size) {
                        self.add_candidate::<DO_AREA, ELA>(&mut rcuts, index, new_cut, &[c1, c2], sort, preprocess);
                    }
                }
            },
            n if n <= fanin_limit => {
                for vcuts in lcuts.iter().map(|cuts| cuts.iter()).multi_cartesian_product() {
                    let merged = vcuts[1..]
                        .iter()
                        .try_fold(Cut::new(vcuts[0].leaves().to_vec()), |acc, cut| cut.merge(&acc, cut_size));
                    if let Some(new_cut) = merged {
                        self.add_candidate::<DO_AREA, ELA>(&mut rcuts, index, new_cut, &vcuts, sort, preprocess);
                    }
                }
            },
            _ => {},
        }

        if rcuts.is_empty() {
            debug!("node {} has no cut within {} leaves, using its fanins", index, cut_size);
            let mut cut = self.structural_cut(index);
            self.compute_cut_data::<ELA>(&mut cut, index, true);
            rcuts.simple_insert(cut, sort);
        }

        self.cuts_total += rcuts.len() as u32;
        rcuts.limit(self.ps.cut_enumeration.cut_limit as usize);

        if preprocess {
            if let Some(best) = previous {
                if rcuts.best().data.delay > self.node_match[index].required {
                    if self.ps.remove_dominated_cuts {
                        rcuts.set_best(best);
                    } else {
                        rcuts.replace(0, best);
                    }
                }
            }
        }

        let mut unit = Cut::trivial(index);
        if STORE_FUNCTION {
            unit.func_id = Some(TT_PROJECTION);
        }
        rcuts.add_cut(unit);

        if DO_AREA && referenced {
            self.cut_ref(rcuts.best());
        }

        self.cuts[index] = rcuts;
    }

    /// Scores a merged cut and inserts it if it is feasible and not dominated.
    fn add_candidate<const DO_AREA: bool, const ELA: bool>(
        &mut self,
        rcuts: &mut CutSet,
        index: usize,
        mut new_cut: Cut,
        fanin_cuts: &[&Cut],
        sort: SortOrder,
        preprocess: bool,
    ) {
        if self.ps.remove_dominated_cuts && rcuts.is_dominated(&new_cut) {
            return;
        }

        if STORE_FUNCTION {
            let func_id = self.compute_truth_table(index, fanin_cuts, &mut new_cut);
            new_cut.func_id = Some(func_id);
        }

        self.compute_cut_data::<ELA>(&mut new_cut, index, true);

        if DO_AREA && !preprocess && new_cut.data.delay > self.node_match[index].required {
            return;
        }

        if self.ps.remove_dominated_cuts {
            rcuts.insert(new_cut, false, sort);
        } else {
            rcuts.simple_insert(new_cut, sort);
        }
    }

    /// The cut whose leaves are the fanins of a node, used when enumeration is skipped or finds nothing.
    fn structural_cut(&mut self, index: usize) -> Cut {
        let unit: Vec<Cut> = self.fanins[index]
            .iter()
            .map(|&f| {
                if self.is_constant(f) {
                    self.cuts[f].best().clone()
                } else {
                    let mut cut = Cut::trivial(f);
                    if STORE_FUNCTION {
                        cut.func_id = Some(TT_PROJECTION);
                    }
                    cut
                }
            })
            .collect();

        let leaves: Vec<usize> = unit.iter().flat_map(|cut| cut.leaves().iter().copied()).sorted().dedup().collect();
        debug_assert!(
            leaves.len() <= self.ps.cut_enumeration.cut_size as usize,
            "node {} has {} distinct fanins, more than a LUT can take",
            index,
            leaves.len()
        );

        let mut cut = Cut::new(leaves);
        if STORE_FUNCTION {
            let fanin_cuts: Vec<&Cut> = unit.iter().collect();
            let func_id = self.compute_truth_table(index, &fanin_cuts, &mut cut);
            cut.func_id = Some(func_id);
        }
        cut
    }

    /// Computes the function of `res` from the functions of the fanin cuts it was merged from.
    ///
    /// Vacuous leaves are dropped from `res` when truth-table minimisation is enabled.
    pub(crate) fn compute_truth_table(&mut self, index: usize, fanin_cuts: &[&Cut], res: &mut Cut) -> u32 {
        let num_vars = res.size() as u32;
        let tts: Vec<TruthTable> = fanin_cuts
            .iter()
            .map(|cut| {
                let func_id = cut
                    .func_id
                    .unwrap_or_else(|| panic!("fanin cut {:?} of node {} has no function", cut.leaves(), index));
                let mut tt = self.truth_tables.get(func_id).extend_to(num_vars);
                align_support(cut.leaves(), res.leaves(), &mut tt);
                tt
            })
            .collect();

        let mut tt = self.ntk.compute(self.ntk.index_to_node(index), &tts);

        if self.ps.cut_enumeration.minimize_truth_table {
            let mut leaves = res.leaves().to_vec();
            if minimize_support(&mut tt, &mut leaves) {
                res.set_leaves(leaves);
            }
        }

        self.truth_tables.insert(tt)
    }

    /// Area and delay of a LUT implementing a cached function.
    fn function_cost(&mut self, func_id: u32) -> (u32, u32) {
        if C::CACHEABLE {
            if let Some(&cost) = self.truth_tables_cost.get(&func_id) {
                return cost;
            }
        }

        let tt = self.truth_tables.get(func_id);
        let cost = self.lut_cost.cost_by_function(&tt);
        if C::CACHEABLE && tt.num_vars() <= self.ps.cost_cache_vars {
            self.truth_tables_cost.insert(func_id, cost);
        }
        cost
    }

    /// Fills in delay, area and flows of `cut` as a cut of node `index`.
    ///
    /// With `recompute_cut_cost` the LUT cost is evaluated again, otherwise the stored one is reused.
    pub(crate) fn compute_cut_data<const ELA: bool>(&mut self, cut: &mut Cut, index: usize, recompute_cut_cost: bool) {
        let balancing = STORE_FUNCTION && self.ps.balancing();

        let (lut_area, lut_delay) = if recompute_cut_cost {
            cut.data.ignore = false;
            if balancing {
                self.compute_isop(cut);
                (0, 0)
            } else if STORE_FUNCTION {
                let func_id = cut
                    .func_id
                    .unwrap_or_else(|| panic!("cut {:?} of node {} has no function", cut.leaves(), index));
                self.function_cost(func_id)
            } else {
                self.lut_cost.cost_by_size(cut.size() as u32)
            }
        } else {
            (cut.data.lut_area, cut.data.lut_delay)
        };

        let arrival = cut
            .leaves()
            .iter()
            .map(|&leaf| self.cuts[leaf].best().data.delay)
            .max()
            .unwrap_or(0);

        cut.data.delay = lut_delay + arrival;
        cut.data.lut_area = lut_area;
        cut.data.lut_delay = lut_delay;

        if ELA {
            if self.ps.edge_optimization {
                cut.data.area_flow = self.cut_ref(cut) as f32;
                cut.data.edge_flow = self.cut_edge_deref(cut) as f32;
            } else {
                cut.data.area_flow = self.cut_measure_mffc(cut) as f32;
                cut.data.edge_flow = 0.0;
            }
        } else {
            let mut area_flow = lut_area as f32;
            let mut edge_flow = cut.size() as f32;
            for &leaf in cut.leaves() {
                let m = &self.node_match[leaf];
                let best = &self.cuts[leaf].best().data;
                if m.map_refs > 0 && !self.is_constant(leaf) && m.est_refs > 0.0 {
                    area_flow += best.area_flow / m.est_refs;
                    edge_flow += best.edge_flow / m.est_refs;
                } else {
                    area_flow += best.area_flow;
                    edge_flow += best.edge_flow;
                }
            }
            cut.data.area_flow = area_flow;
            cut.data.edge_flow = edge_flow;
        }

        if balancing {
            self.compute_balancing_cost(cut);
        }
    }

    /// Like [`Self::compute_cut_data`] with stored LUT costs, charging only leaves no chosen cut uses yet.
    pub(crate) fn compute_cut_data_share(&self, cut: &mut Cut) {
        let arrival = cut
            .leaves()
            .iter()
            .map(|&leaf| self.cuts[leaf].best().data.delay)
            .max()
            .unwrap_or(0);
        cut.data.delay = cut.data.lut_delay + arrival;

        let mut area_flow = cut.data.lut_area as f32;
        let mut edge_flow = cut.size() as f32;
        for &leaf in cut.leaves() {
            let m = &self.node_match[leaf];
            if m.map_refs == 0 && !self.is_constant(leaf) {
                let best = &self.cuts[leaf].best().data;
                let refs = m.est_refs.max(1.0);
                area_flow += best.area_flow / refs;
                edge_flow += best.edge_flow / refs;
            }
        }
        cut.data.area_flow = area_flow;
        cut.data.edge_flow = edge_flow;
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::cost::UnitCost;
    use crate::logic::LogicNetwork;
    use crate::params::LutMapParams;

    #[test]
    fn align_support_spreads_variables() {
        let mut tt = TruthTable::nth_var(2, 0).extend_to(4);
        tt = &tt & &TruthTable::nth_var(4, 1);
        align_support(&[3, 9], &[1, 3, 5, 9], &mut tt);
        assert_eq!(tt, &TruthTable::nth_var(4, 1) & &TruthTable::nth_var(4, 3));
    }

    #[test]
    fn minimize_support_prefix_and_gaps() {
        let mut tt = TruthTable::nth_var(3, 0);
        let mut items = vec![10, 11, 12];
        assert!(minimize_support(&mut tt, &mut items));
        assert_eq!(items, vec![10]);
        assert_eq!(tt, TruthTable::nth_var(1, 0));

        let mut tt = &TruthTable::nth_var(3, 0) ^ &TruthTable::nth_var(3, 2);
        let mut items = vec![10, 11, 12];
        assert!(minimize_support(&mut tt, &mut items));
        assert_eq!(items, vec![10, 12]);
        assert_eq!(tt, TruthTable::from_word(2, 0x6));

        let mut tt = TruthTable::from_word(2, 0x8);
        let mut items = vec![1, 2];
        assert!(!minimize_support(&mut tt, &mut items));
    }

    #[test]
    fn redundant_fanin_is_dropped_from_cuts() {
        // f = (a & b) | (a & !b) only depends on a.
        let mut ntk = LogicNetwork::new();
        let a = ntk.create_pi();
        let b = ntk.create_pi();
        let x = ntk.create_and(a, b);
        let y = ntk.create_and(a, !b);
        let f = ntk.create_or(x, y);
        ntk.create_po(f);

        let mut mapper = LutMapper::<_, UnitCost, true>::new(&ntk, LutMapParams::default(), UnitCost);
        mapper.perform_mapping();
        let best = mapper.cuts[f.node().index()].best();
        assert_eq!(best.leaves(), &[a.node().index()]);
        assert_eq!(best.data.lut_area, 0);
    }

    #[test]
    fn truth_tables_are_shared() {
        let mut ntk = LogicNetwork::new();
        let a = ntk.create_pi();
        let b = ntk.create_pi();
        let c = ntk.create_pi();
        let d = ntk.create_pi();
        let x = ntk.create_and(a, b);
        let y = ntk.create_and(c, d);
        ntk.create_po(x);
        ntk.create_po(!y);

        let mut mapper = LutMapper::<_, UnitCost, true>::new(&ntk, LutMapParams::default(), UnitCost);
        mapper.perform_mapping();
        let fx = mapper.cuts[x.node().index()].best().func_id;
        let fy = mapper.cuts[y.node().index()].best().func_id;
        assert!(fx.is_some());
        assert_eq!(fx, fy);
    }
}
