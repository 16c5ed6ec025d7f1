//! Delay- and area-oriented LUT mapping.
//!
//! The mapper enumerates priority cuts for every node in topological order, then runs a fixed schedule of
//! rounds that first minimise depth and then recover area under the resulting required times:
//!
//! 1. two delay rounds, each followed by required-time computation, then an area-flow round that may not break
//!    the delay. Area-oriented mapping starts straight from the area-flow round, and when cuts are enumerated only
//!    once a single delay round settles both;
//! 2. optional cut expansion, area-sharing rounds, area-flow rounds and exact-local-area rounds.
//!
//! Cut enumeration lives in `map_cuts`, reference counting and cut expansion in `map_refs`, the balancing delay
//! estimator in `map_balance` and network emission in `map_emit`.

#![allow(clippy::cast_precision_loss)]

use std::collections::HashMap;
use std::time::Instant;

use itertools::Itertools;
use log::{debug, warn};

use crate::cost::{LutCost, UnitCost};
use crate::cut::SortOrder;
use crate::cut_set::CutSet;
use crate::error::{Error, Result};
use crate::lut_network::LutNetwork;
use crate::mapping::Mapping;
use crate::params::{LutMapParams, LutMapStats};
use crate::sop::Cube;
use crate::traits::Network;
use crate::truth_table::TruthTable;
use crate::tt_cache::TruthTableCache;

/// Required time of a node nothing constrains.
pub(crate) const REQUIRED_UNSET: u32 = u32::MAX >> 1;

/// Per-node mapping state.
#[derive(Clone, Copy, Debug)]
pub(crate) struct NodeMatch {
    /// Latest arrival time that does not violate the target delay.
    pub required: u32,
    /// Number of mapped fanouts and outputs using this node.
    pub map_refs: u32,
    /// Smoothed fanout estimate used to amortise flows.
    pub est_refs: f32,
}

/// The mapping engine for one network.
///
/// With `STORE_FUNCTION`, the function of every cut is computed and stored in a shared cache, enabling
/// function-dependent LUT costs, truth-table minimisation and the balancing delay estimators.
pub struct LutMapper<'a, N: Network, C: LutCost, const STORE_FUNCTION: bool> {
    pub(crate) ntk: &'a N,
    pub(crate) ps: LutMapParams,
    pub(crate) st: LutMapStats,
    pub(crate) lut_cost: C,

    pub(crate) iteration: u32,
    pub(crate) delay: u32,
    pub(crate) area: u32,
    pub(crate) edges: u32,
    pub(crate) cuts_total: u32,
    pub(crate) required_warned: bool,

    pub(crate) topo_order: Vec<usize>,
    pub(crate) fanins: Vec<Vec<usize>>,
    pub(crate) terminal: Vec<bool>,
    pub(crate) node_match: Vec<NodeMatch>,
    pub(crate) cuts: Vec<CutSet>,

    pub(crate) truth_tables: TruthTableCache,
    pub(crate) truth_tables_cost: HashMap<u32, (u32, u32)>,
    pub(crate) isops: HashMap<u32, Vec<Cube>>,

    pub(crate) visited: Vec<u32>,
    pub(crate) trav_id: u32,
    pub(crate) touched: Vec<usize>,
}

impl<'a, N: Network, C: LutCost, const STORE_FUNCTION: bool> LutMapper<'a, N, C, STORE_FUNCTION> {
    /// Prepares a mapper; `ps` is used as given, see [`LutMapParams::effective`].
    pub fn new(ntk: &'a N, ps: LutMapParams, lut_cost: C) -> Self {
        let size = ntk.size();

        let topo_order = ntk
            .topological_order()
            .into_iter()
            .map(|node| ntk.node_to_index(node))
            .collect();
        let fanins = (0..size)
            .map(|index| {
                ntk.fanins(ntk.index_to_node(index))
                    .into_iter()
                    .map(|signal| ntk.node_to_index(ntk.get_node(signal)))
                    .collect()
            })
            .collect();
        let terminal = (0..size)
            .map(|index| {
                let node = ntk.index_to_node(index);
                ntk.is_ci(node) || ntk.is_constant(node)
            })
            .collect();

        let mut truth_tables = TruthTableCache::with_capacity(if STORE_FUNCTION { 20_000 } else { 0 });
        if STORE_FUNCTION {
            // Literal 0 is the constant zero, literal 2 the projection used by trivial cuts.
            truth_tables.insert(TruthTable::new(0));
            truth_tables.insert(TruthTable::nth_var(1, 0));
        }

        Self {
            ntk,
            ps,
            st: LutMapStats::default(),
            lut_cost,
            iteration: 0,
            delay: 0,
            area: 0,
            edges: 0,
            cuts_total: 0,
            required_warned: false,
            topo_order,
            fanins,
            terminal,
            node_match: vec![
                NodeMatch {
                    required: REQUIRED_UNSET,
                    map_refs: 0,
                    est_refs: 0.0,
                };
                size
            ],
            cuts: vec![CutSet::default(); size],
            truth_tables,
            truth_tables_cost: HashMap::new(),
            isops: HashMap::new(),
            visited: vec![0; size],
            trav_id: 0,
            touched: Vec::new(),
        }
    }

    /// Maps the network and builds the resulting LUT network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GateTooWide`] if some gate has more distinct fanins than the cut size.
    pub fn run(mut self) -> Result<(LutNetwork, LutMapStats)> {
        let start = Instant::now();
        self.check_gate_width()?;
        self.perform_mapping();
        let res = self.create_lut_network();
        self.st.time_total = start.elapsed();
        Ok((res, self.st))
    }

    /// Maps the network and records the result as a [`Mapping`].
    ///
    /// Collapsed fanout-free cones may have any number of leaves; otherwise every cell fits the cut size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GateTooWide`] if cones are not collapsed and some gate has more distinct fanins than the
    /// cut size.
    pub fn run_inplace(mut self) -> Result<(Mapping, LutMapStats)> {
        let start = Instant::now();
        let mapping = if self.ps.collapse_mffcs {
            self.compute_mffcs_mapping()
        } else {
            self.check_gate_width()?;
            self.perform_mapping();
            self.derive_mapping()
        };
        self.st.time_total = start.elapsed();
        Ok((mapping, self.st))
    }

    /// Every gate must fit in one LUT.
    fn check_gate_width(&self) -> Result<()> {
        let cut_size = self.ps.cut_enumeration.cut_size;
        for &index in &self.topo_order {
            if self.terminal[index] {
                continue;
            }
            let fanins = self.fanins[index]
                .iter()
                .filter(|&&fanin| !self.is_constant(fanin))
                .unique()
                .count();
            if fanins > cut_size as usize {
                return Err(Error::GateTooWide {
                    node: index,
                    fanins,
                    cut_size,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn perform_mapping(&mut self) {
        self.init_nodes();
        let area_sort = self.area_sort();

        if self.ps.area_oriented_mapping {
            self.compute_required_time();
            self.compute_mapping::<true, false>(area_sort, false, true);
        } else if self.ps.recompute_cuts {
            self.compute_required_time();
            self.compute_mapping::<false, false>(SortOrder::Delay, true, true);
            self.compute_required_time();
            self.compute_mapping::<false, false>(SortOrder::Delay2, true, true);
            self.compute_required_time();
            self.compute_mapping::<true, false>(area_sort, true, true);
        } else {
            // Cuts are enumerated once, so the single pass has to settle delay and area together.
            self.compute_required_time();
            self.compute_mapping::<false, false>(SortOrder::Delay2, true, true);
        }

        if self.ps.cut_expansion {
            self.compute_required_time();
            self.expand_cuts::<false>();
        }

        let recompute = self.ps.recompute_cuts;

        for round in 0..self.ps.area_share_rounds {
            self.compute_share_mapping(area_sort, round == 0);
            if self.ps.cut_expansion {
                self.expand_cuts::<false>();
            }
        }

        for _ in 0..self.ps.area_flow_rounds {
            self.compute_required_time();
            self.compute_mapping::<true, false>(area_sort, false, recompute);
            if self.ps.cut_expansion {
                self.compute_required_time();
                self.expand_cuts::<false>();
            }
        }

        for _ in 0..self.ps.ela_rounds {
            self.compute_required_time();
            self.compute_mapping::<true, true>(area_sort, false, recompute);
            if self.ps.cut_expansion {
                self.compute_required_time();
                self.expand_cuts::<true>();
            }
        }

        self.st.area = self.area;
        self.st.delay = self.delay;
        self.st.edges = self.edges;
        self.st.cuts_total = self.cuts_total;
    }

    pub(crate) const fn area_sort(&self) -> SortOrder {
        if self.ps.area_oriented_mapping && !self.ps.edge_optimization {
            SortOrder::Area
        } else {
            SortOrder::Area2
        }
    }

    pub(crate) fn is_ci(&self, index: usize) -> bool {
        self.ntk.is_ci(self.ntk.index_to_node(index))
    }

    pub(crate) fn is_constant(&self, index: usize) -> bool {
        self.ntk.is_constant(self.ntk.index_to_node(index))
    }

    pub(crate) fn co_indices(&self) -> Vec<usize> {
        self.ntk
            .cos()
            .into_iter()
            .map(|signal| self.ntk.node_to_index(self.ntk.get_node(signal)))
            .collect()
    }

    fn init_nodes(&mut self) {
        for index in 0..self.ntk.size() {
            let node = self.ntk.index_to_node(index);
            let refs = self.ntk.fanout_size(node);
            let m = &mut self.node_match[index];
            m.map_refs = refs;
            m.est_refs = refs as f32;

            if self.ntk.is_constant(node) {
                self.add_zero_cut(index);
            } else if self.ntk.is_ci(node) {
                self.add_unit_cut(index);
            }
        }
    }

    /// One enumeration or re-scoring pass over the network, followed by reference counting.
    ///
    /// `DO_AREA` restricts candidates to the required time and keeps references of the chosen cuts up to date;
    /// `ELA` costs cuts by exact area instead of flows.
    pub(crate) fn compute_mapping<const DO_AREA: bool, const ELA: bool>(
        &mut self,
        sort: SortOrder,
        preprocess: bool,
        recompute_cuts: bool,
    ) {
        self.cuts_total = 0;

        for i in 0..self.topo_order.len() {
            let index = self.topo_order[i];

            if !ELA {
                let first = preprocess || self.iteration == 0;
                let m = &mut self.node_match[index];
                m.est_refs = if first {
                    m.map_refs as f32
                } else {
                    (2.0 * m.est_refs + m.map_refs as f32) / 3.0
                };
            }

            if self.terminal[index] {
                continue;
            }

            if recompute_cuts {
                self.compute_best_cut::<DO_AREA, ELA>(index, sort, preprocess);
            } else {
                self.update_cut_data::<DO_AREA, ELA>(index, sort);
            }
        }

        self.set_mapping_refs::<ELA>();

        let label = match (sort, ELA) {
            (SortOrder::Area | SortOrder::Area2, true) => "Area",
            (SortOrder::Area | SortOrder::Area2, false) => "AreaFlow",
            (SortOrder::Delay2, _) => "Delay2",
            (SortOrder::Delay, _) => "Delay",
        };
        self.push_round_stats(label);
    }

    /// Re-scores the existing cuts of a node and moves the best one to the front.
    pub(crate) fn update_cut_data<const DO_AREA: bool, const ELA: bool>(&mut self, index: usize, sort: SortOrder) {
        let mut cut_set = std::mem::take(&mut self.cuts[index]);
        let referenced = self.iteration != 0 && self.node_match[index].map_refs > 0;

        if DO_AREA && referenced {
            self.cut_deref(cut_set.best());
        }

        let mut best = 0;
        for i in 0..cut_set.len() {
            if cut_set[i].is_trivial_of(index) {
                continue;
            }
            self.compute_cut_data::<ELA>(&mut cut_set[i], index, false);

            let feasible = !DO_AREA || cut_set[i].data.delay <= self.node_match[index].required;
            if feasible && sort.better(&cut_set[i], &cut_set[best]) {
                best = i;
            }
        }

        if (DO_AREA || ELA) && referenced {
            self.cut_ref(&cut_set[best]);
        }

        cut_set.update_best(best);
        self.cuts[index] = cut_set;
    }

    /// Recounts references of the current mapping and updates the totals.
    ///
    /// During exact-area rounds references are maintained incrementally, so only the totals are recomputed.
    pub(crate) fn set_mapping_refs<const ELA: bool>(&mut self) {
        if !ELA {
            for m in &mut self.node_match {
                m.map_refs = 0;
            }
        }

        self.delay = 0;
        for index in self.co_indices() {
            self.delay = self.delay.max(self.cuts[index].best().data.delay);
            if !ELA {
                self.node_match[index].map_refs += 1;
            }
        }

        self.area = 0;
        self.edges = 0;
        for &index in self.topo_order.iter().rev() {
            if self.terminal[index] || self.node_match[index].map_refs == 0 {
                continue;
            }
            let best = self.cuts[index].best();
            if !ELA {
                for &leaf in best.leaves() {
                    self.node_match[leaf].map_refs += 1;
                }
            }
            self.area += best.data.lut_area;
            #[allow(clippy::cast_possible_truncation)]
            let size = best.size() as u32;
            self.edges += size;
        }

        self.iteration += 1;
    }

    /// The delay every output must meet in the following rounds.
    fn required_target(&mut self) -> u32 {
        let mut required = self.delay;

        if self.ps.required_delay == 0 && self.ps.relax_required > 0 {
            let relaxed = f64::from(required) * (100.0 + f64::from(self.ps.relax_required)) / 100.0;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let relaxed = relaxed as u32;
            required = relaxed;
        }

        if self.ps.required_delay != 0 {
            if self.ps.required_delay < self.delay {
                if !self.required_warned && !self.ps.area_oriented_mapping && self.iteration == 1 {
                    warn!(
                        "cannot meet the target required time of {} levels, using {} instead",
                        self.ps.required_delay, self.delay
                    );
                    self.required_warned = true;
                }
            } else {
                required = self.ps.required_delay;
            }
        }

        required
    }

    /// Propagates required times from the outputs to the leaves of every chosen cut.
    pub(crate) fn compute_required_time(&mut self) {
        for m in &mut self.node_match {
            m.required = REQUIRED_UNSET;
        }

        if self.iteration == 0 || self.ps.area_oriented_mapping {
            return;
        }

        let required = self.required_target();
        for index in self.co_indices() {
            self.node_match[index].required = required;
        }

        for i in (0..self.topo_order.len()).rev() {
            let index = self.topo_order[i];
            if self.terminal[index] || self.node_match[index].map_refs == 0 {
                continue;
            }

            if STORE_FUNCTION && self.ps.balancing() {
                self.compute_balancing_cost_required(index);
                continue;
            }

            let best = self.cuts[index].best();
            let leaf_required = self.node_match[index].required.saturating_sub(best.data.lut_delay);
            for &leaf in best.leaves() {
                let m = &mut self.node_match[leaf];
                m.required = m.required.min(leaf_required);
            }
        }
    }

    /// Recomputes arrival times of the current mapping without changing any choice.
    pub(crate) fn propagate_arrival_times(&mut self) {
        self.area = 0;
        self.edges = 0;
        for i in 0..self.topo_order.len() {
            let index = self.topo_order[i];
            if self.terminal[index] {
                continue;
            }

            let mut best = self.cuts[index].best().clone();
            let arrival = best
                .leaves()
                .iter()
                .map(|&leaf| self.cuts[leaf].best().data.delay)
                .max()
                .unwrap_or(0);
            best.data.delay = arrival + best.data.lut_delay;

            if self.node_match[index].map_refs > 0 {
                self.area += best.data.lut_area;
                #[allow(clippy::cast_possible_truncation)]
                let size = best.size() as u32;
                self.edges += size;
            }
            self.cuts[index].replace(0, best);
        }

        self.delay = self
            .co_indices()
            .into_iter()
            .map(|index| self.cuts[index].best().data.delay)
            .max()
            .unwrap_or(0);
    }

    /// An area-sharing round: choose cuts from the outputs down, charging only unshared leaves.
    pub(crate) fn compute_share_mapping(&mut self, sort: SortOrder, first: bool) {
        self.compute_share_mapping_init(first);

        for i in (0..self.topo_order.len()).rev() {
            let index = self.topo_order[i];
            if self.terminal[index] || self.node_match[index].map_refs == 0 {
                continue;
            }
            self.update_cut_data_share(index, sort);
        }

        self.propagate_arrival_times();
        self.push_round_stats("AreaShare");
    }

    fn compute_share_mapping_init(&mut self, first: bool) {
        for i in 0..self.topo_order.len() {
            let index = self.topo_order[i];
            let m = &mut self.node_match[index];
            m.est_refs = if first {
                ((m.est_refs + 2.0 * m.map_refs as f32) / 3.0).max(1.0)
            } else {
                (2.0 * m.est_refs + m.map_refs as f32) / 3.0
            };
            m.map_refs = 0;

            if self.ps.area_oriented_mapping {
                let mut best = self.cuts[index].best().clone();
                self.compute_cut_data::<false>(&mut best, index, false);
                self.cuts[index].replace(0, best);
            }
        }

        let required = if self.ps.area_oriented_mapping {
            REQUIRED_UNSET
        } else {
            self.required_target()
        };
        for index in self.co_indices() {
            self.node_match[index].required = required;
            self.node_match[index].map_refs += 1;
        }
    }

    fn update_cut_data_share(&mut self, index: usize, sort: SortOrder) {
        let mut cut_set = std::mem::take(&mut self.cuts[index]);

        let mut best = 0;
        for i in 0..cut_set.len() {
            if cut_set[i].is_trivial_of(index) {
                continue;
            }
            self.compute_cut_data_share(&mut cut_set[i]);

            if cut_set[i].data.delay <= self.node_match[index].required && sort.better(&cut_set[i], &cut_set[best]) {
                best = i;
            }
        }
        cut_set.update_best(best);

        let best = cut_set.best();
        let leaf_required = self.node_match[index].required.saturating_sub(best.data.lut_delay);
        for &leaf in best.leaves() {
            let m = &mut self.node_match[leaf];
            m.required = m.required.min(leaf_required);
            m.map_refs += 1;
        }

        self.cuts[index] = cut_set;
    }

    pub(crate) fn push_round_stats(&mut self, label: &str) {
        let line = format!(
            "[i] {:<9}: Delay = {:>8}  Area = {:>8}  Edges = {:>8}  Cuts = {:>8}",
            label, self.delay, self.area, self.edges, self.cuts_total
        );
        debug!("{}", line);
        self.st.round_stats.push(line);
    }
}

/// Maps `ntk` to LUTs structurally with unit costs.
///
/// # Errors
///
/// Returns [`Error::InvalidParams`] if `ps` does not validate, and [`Error::GateTooWide`] if a gate does not fit in
/// one LUT.
pub fn lut_map<N: Network>(ntk: &N, ps: &LutMapParams) -> Result<(LutNetwork, LutMapStats)> {
    lut_map_with::<N, UnitCost, false>(ntk, ps, UnitCost)
}

/// Maps `ntk` to LUTs with a custom cost model, optionally tracking cut functions.
///
/// # Errors
///
/// Returns [`Error::InvalidParams`] if `ps` does not validate, and [`Error::GateTooWide`] if a gate does not fit in
/// one LUT.
pub fn lut_map_with<N: Network, C: LutCost, const STORE_FUNCTION: bool>(
    ntk: &N,
    ps: &LutMapParams,
    lut_cost: C,
) -> Result<(LutNetwork, LutMapStats)> {
    ps.validate()?;
    let (res, st) = LutMapper::<N, C, STORE_FUNCTION>::new(ntk, ps.effective(), lut_cost).run()?;
    if ps.verbose {
        st.report();
    }
    Ok((res, st))
}

/// Maps `ntk` structurally with unit costs and records the result as a [`Mapping`].
///
/// # Errors
///
/// Returns [`Error::InvalidParams`] if `ps` does not validate, and [`Error::GateTooWide`] if a gate does not fit in
/// one LUT.
pub fn lut_map_inplace<N: Network>(ntk: &N, ps: &LutMapParams) -> Result<(Mapping, LutMapStats)> {
    lut_map_inplace_with::<N, UnitCost, false>(ntk, ps, UnitCost)
}

/// Maps `ntk` with a custom cost model and records the result as a [`Mapping`].
///
/// # Errors
///
/// Returns [`Error::InvalidParams`] if `ps` does not validate, and [`Error::GateTooWide`] if a gate does not fit in
/// one LUT.
pub fn lut_map_inplace_with<N: Network, C: LutCost, const STORE_FUNCTION: bool>(
    ntk: &N,
    ps: &LutMapParams,
    lut_cost: C,
) -> Result<(Mapping, LutMapStats)> {
    ps.validate()?;
    let (mapping, st) = LutMapper::<N, C, STORE_FUNCTION>::new(ntk, ps.effective(), lut_cost).run_inplace()?;
    if ps.verbose {
        st.report();
    }
    Ok((mapping, st))
}
