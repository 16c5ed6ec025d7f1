//! Turning a finished mapping into a LUT network or a [`Mapping`].

use std::collections::HashMap;

use log::warn;
use petgraph::graph::NodeIndex;

use crate::cost::LutCost;
use crate::lut_network::LutNetwork;
use crate::map::LutMapper;
use crate::map_cuts::minimize_support;
use crate::mapping::Mapping;
use crate::traits::Network;
use crate::truth_table::{TruthTable, MAX_VARS};

/// The polarities in which the outputs use a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DriverType {
    None,
    Pos,
    Neg,
    Mixed,
}

impl DriverType {
    const fn with(self, complemented: bool) -> Self {
        match (self, complemented) {
            (Self::None | Self::Pos, false) => Self::Pos,
            (Self::None | Self::Neg, true) => Self::Neg,
            _ => Self::Mixed,
        }
    }
}

impl<'a, N: Network, C: LutCost, const STORE_FUNCTION: bool> LutMapper<'a, N, C, STORE_FUNCTION> {
    /// Builds a LUT network from the chosen cuts.
    ///
    /// Nodes that only drive complemented outputs are built complemented, so the inverter disappears into the
    /// LUT; nodes driving outputs in both polarities are built twice.
    pub(crate) fn create_lut_network(&mut self) -> LutNetwork {
        let size = self.ntk.size();
        let mut res = LutNetwork::new();
        let mut node_to_signal: Vec<Option<NodeIndex>> = vec![None; size];
        let mut opposites: HashMap<usize, NodeIndex> = HashMap::new();

        let mut driver = vec![DriverType::None; size];
        for co in self.ntk.cos() {
            let index = self.ntk.node_to_index(self.ntk.get_node(co));
            driver[index] = driver[index].with(self.ntk.is_complemented(co));
        }

        for index in 0..size {
            if self.is_constant(index) {
                let value = self.ntk.constant_value(self.ntk.index_to_node(index));
                node_to_signal[index] = Some(res.get_constant(value));
                opposites.insert(index, res.get_constant(!value));
            }
        }

        for ci in self.ntk.cis() {
            let index = self.ntk.node_to_index(ci);
            let pi = res.create_pi();
            match driver[index] {
                DriverType::Neg => {
                    node_to_signal[index] = Some(res.create_not(pi));
                },
                DriverType::Mixed => {
                    node_to_signal[index] = Some(pi);
                    opposites.insert(index, res.create_not(pi));
                },
                DriverType::None | DriverType::Pos => {
                    node_to_signal[index] = Some(pi);
                },
            }
        }

        for i in 0..self.topo_order.len() {
            let index = self.topo_order[i];
            if self.terminal[index] || self.node_match[index].map_refs == 0 {
                continue;
            }

            let (function, children) = self.create_lut(index, &node_to_signal, &driver);
            match driver[index] {
                DriverType::Neg => {
                    node_to_signal[index] = Some(res.create_node(&children, !function));
                },
                DriverType::Mixed => {
                    node_to_signal[index] = Some(res.create_node(&children, function.clone()));
                    opposites.insert(index, res.create_node(&children, !function));
                },
                DriverType::None | DriverType::Pos => {
                    node_to_signal[index] = Some(res.create_node(&children, function));
                },
            }
        }

        for co in self.ntk.cos() {
            let index = self.ntk.node_to_index(self.ntk.get_node(co));
            let signal = if self.ntk.is_complemented(co) && driver[index] == DriverType::Mixed {
                opposites.get(&index).copied()
            } else if self.ntk.is_complemented(co) && self.is_constant(index) {
                opposites.get(&index).copied()
            } else {
                node_to_signal[index]
            };
            let signal = signal.unwrap_or_else(|| panic!("output driver {} was not mapped", index));
            res.create_po(signal);
        }

        res
    }

    /// The function and fanins of the LUT rooted at `index`, adjusted for complemented fanin drivers.
    fn create_lut(
        &self,
        index: usize,
        node_to_signal: &[Option<NodeIndex>],
        driver: &[DriverType],
    ) -> (TruthTable, Vec<NodeIndex>) {
        let best = self.cuts[index].best();
        let leaves = best.leaves();
        #[allow(clippy::cast_possible_truncation)]
        let num_vars = leaves.len() as u32;

        let mut children: Vec<NodeIndex> = leaves
            .iter()
            .map(|&leaf| node_to_signal[leaf].unwrap_or_else(|| panic!("leaf {} of node {} was not mapped", leaf, index)))
            .collect();

        let mut function = if STORE_FUNCTION {
            let func_id = best
                .func_id
                .unwrap_or_else(|| panic!("best cut of node {} has no function", index));
            let mut function = self.truth_tables.get(func_id);
            for (i, &leaf) in leaves.iter().enumerate() {
                if driver[leaf] == DriverType::Neg {
                    #[allow(clippy::cast_possible_truncation)]
                    function.flip_inplace(i as u32);
                }
            }
            function
        } else {
            let values = leaves
                .iter()
                .enumerate()
                .map(|(i, &leaf)| {
                    #[allow(clippy::cast_possible_truncation)]
                    let var = TruthTable::nth_var(num_vars, i as u32);
                    (leaf, if driver[leaf] == DriverType::Neg { !var } else { var })
                })
                .collect();
            self.simulate_cone(index, values, num_vars)
        };

        minimize_support(&mut function, &mut children);
        (function, children)
    }

    /// The function of `root` over the cone bounded by the nodes in `values`.
    pub(crate) fn simulate_cone(&self, root: usize, mut values: HashMap<usize, TruthTable>, num_vars: u32) -> TruthTable {
        let mut stack = vec![(root, false)];
        while let Some((index, expanded)) = stack.pop() {
            if values.contains_key(&index) {
                continue;
            }

            let node = self.ntk.index_to_node(index);
            if self.ntk.is_constant(node) {
                values.insert(index, TruthTable::constant(num_vars, self.ntk.constant_value(node)));
            } else if expanded {
                let fanins: Vec<TruthTable> = self.fanins[index].iter().map(|fanin| values[fanin].clone()).collect();
                values.insert(index, self.ntk.compute(node, &fanins));
            } else {
                assert!(!self.ntk.is_ci(node), "cone of node {} reaches input {} outside its cut", root, index);
                stack.push((index, true));
                for &fanin in &self.fanins[index] {
                    if !values.contains_key(&fanin) {
                        stack.push((fanin, false));
                    }
                }
            }
        }
        values
            .remove(&root)
            .unwrap_or_else(|| panic!("cone of node {} was not simulated", root))
    }

    /// Records the chosen cut of every mapped node.
    pub(crate) fn derive_mapping(&mut self) -> Mapping {
        let mut mapping = Mapping::new(self.ntk.size());

        for &index in &self.topo_order {
            if self.terminal[index] || self.node_match[index].map_refs == 0 {
                continue;
            }
            let best = self.cuts[index].best();
            mapping.add_to_mapping(index, best.leaves().to_vec());
            if STORE_FUNCTION {
                if let Some(func_id) = best.func_id {
                    mapping.set_cell_function(index, self.truth_tables.get(func_id));
                }
            }
        }

        mapping
    }

    /// Maps every output driver and every node with several fanouts to one cell covering its fanout-free cone.
    pub(crate) fn compute_mffcs_mapping(&mut self) -> Mapping {
        let mut mapping = Mapping::new(self.ntk.size());
        self.area = 0;
        self.delay = 0;
        self.edges = 0;

        for index in self.co_indices() {
            if !self.terminal[index] && !mapping.is_cell_root(index) {
                self.compute_mffc_mapping_node(index, &mut mapping);
            }
        }

        for i in (0..self.topo_order.len()).rev() {
            let index = self.topo_order[i];
            if self.terminal[index] || mapping.is_cell_root(index) {
                continue;
            }
            if self.ntk.fanout_size(self.ntk.index_to_node(index)) <= 1 {
                continue;
            }
            self.compute_mffc_mapping_node(index, &mut mapping);
        }

        // Cell depth in LUT levels.
        let mut level = vec![0u32; self.ntk.size()];
        for &index in &self.topo_order {
            if let Some(leaves) = mapping.cell_leaves(index) {
                level[index] = leaves.iter().map(|&leaf| level[leaf]).max().unwrap_or(0) + 1;
            }
        }
        self.delay = self.co_indices().into_iter().map(|index| level[index]).max().unwrap_or(0);

        self.st.area = self.area;
        self.st.delay = self.delay;
        self.st.edges = self.edges;
        self.push_round_stats("MFFC");
        mapping
    }

    fn compute_mffc_mapping_node(&mut self, index: usize, mapping: &mut Mapping) {
        self.trav_id += 1;
        let trav_id = self.trav_id;

        // Collect the fanout-free cone: the root and every gate whose only fanout lies inside the cone.
        let mut inner = Vec::new();
        let mut stack = vec![index];
        while let Some(node) = stack.pop() {
            if self.terminal[node] {
                continue;
            }
            inner.push(node);
            self.visited[node] = trav_id;
            for &fanin in &self.fanins[node] {
                if self.ntk.fanout_size(self.ntk.index_to_node(fanin)) == 1 {
                    stack.push(fanin);
                }
            }
        }

        let mut leaves = Vec::new();
        for &node in &inner {
            for &fanin in &self.fanins[node] {
                if self.visited[fanin] != trav_id && !self.is_constant(fanin) {
                    self.visited[fanin] = trav_id;
                    leaves.push(fanin);
                }
            }
        }
        leaves.sort_unstable();

        #[allow(clippy::cast_possible_truncation)]
        let num_leaves = leaves.len() as u32;
        self.edges += num_leaves;
        mapping.add_to_mapping(index, leaves.clone());

        let (area, _) = if STORE_FUNCTION && num_leaves <= MAX_VARS {
            let values = leaves
                .iter()
                .enumerate()
                .map(|(i, &leaf)| {
                    #[allow(clippy::cast_possible_truncation)]
                    let var = TruthTable::nth_var(num_leaves, i as u32);
                    (leaf, var)
                })
                .collect();
            let function = self.simulate_cone(index, values, num_leaves);
            let cost = self.lut_cost.cost_by_function(&function);
            mapping.set_cell_function(index, function);
            cost
        } else {
            if STORE_FUNCTION {
                warn!("cone of node {} has {} leaves, too many to record its function", index, num_leaves);
            }
            self.lut_cost.cost_by_size(num_leaves)
        };
        self.area += area;
    }
}
