//! Networks of k-input lookup tables.

use std::io::Write;

use petgraph::{prelude::*, visit::EdgeRef};

use crate::truth_table::TruthTable;

/// A node of a [`LutNetwork`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LutNode {
    /// A constant.
    Constant(bool),
    /// A primary input, numbered from zero.
    Input(u32),
    /// A lookup table; variable `i` of the function is the fanin on pin `i`.
    Lut(TruthTable),
}

/// A network of lookup tables. Nodes are created in topological order.
#[derive(Clone, Debug)]
pub struct LutNetwork {
    graph: DiGraph<LutNode, u32>,
    constants: [NodeIndex; 2],
    inputs: Vec<NodeIndex>,
    outputs: Vec<NodeIndex>,
}

impl Default for LutNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl LutNetwork {
    /// A network containing the two constants.
    #[must_use]
    pub fn new() -> Self {
        let mut graph = DiGraph::default();
        let zero = graph.add_node(LutNode::Constant(false));
        let one = graph.add_node(LutNode::Constant(true));
        Self {
            graph,
            constants: [zero, one],
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// The node of a constant.
    #[must_use]
    pub const fn get_constant(&self, value: bool) -> NodeIndex {
        self.constants[value as usize]
    }

    /// Adds a primary input.
    pub fn create_pi(&mut self) -> NodeIndex {
        #[allow(clippy::cast_possible_truncation)]
        let node = self.graph.add_node(LutNode::Input(self.inputs.len() as u32));
        self.inputs.push(node);
        node
    }

    /// Adds a primary output and returns its position.
    pub fn create_po(&mut self, node: NodeIndex) -> usize {
        self.outputs.push(node);
        self.outputs.len() - 1
    }

    /// Adds a LUT computing `function` of `children`; a LUT without children is a constant.
    pub fn create_node(&mut self, children: &[NodeIndex], function: TruthTable) -> NodeIndex {
        assert_eq!(children.len(), function.num_vars() as usize, "LUT function does not match its fanin count");
        if children.is_empty() {
            return self.get_constant(function.get_bit(0));
        }
        let node = self.graph.add_node(LutNode::Lut(function));
        for (pin, &child) in children.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            self.graph.add_edge(child, node, pin as u32);
        }
        node
    }

    /// Adds an inverter.
    pub fn create_not(&mut self, a: NodeIndex) -> NodeIndex {
        self.create_node(&[a], !TruthTable::nth_var(1, 0))
    }

    /// The fanins of a node, by pin.
    #[must_use]
    pub fn fanins(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self.graph.edges_directed(node, Incoming).collect();
        edges.sort_by_key(|edge| *edge.weight());
        edges.iter().map(|edge| edge.source()).collect()
    }

    /// The function of a LUT.
    #[must_use]
    pub fn function(&self, node: NodeIndex) -> Option<&TruthTable> {
        match &self.graph[node] {
            LutNode::Lut(function) => Some(function),
            LutNode::Constant(_) | LutNode::Input(_) => None,
        }
    }

    /// A node.
    #[must_use]
    pub fn node(&self, node: NodeIndex) -> &LutNode {
        &self.graph[node]
    }

    /// The primary inputs.
    #[must_use]
    pub fn inputs(&self) -> &[NodeIndex] {
        &self.inputs
    }

    /// The nodes driving the primary outputs.
    #[must_use]
    pub fn outputs(&self) -> &[NodeIndex] {
        &self.outputs
    }

    /// Number of primary inputs.
    #[must_use]
    pub fn num_pis(&self) -> usize {
        self.inputs.len()
    }

    /// Number of primary outputs.
    #[must_use]
    pub fn num_pos(&self) -> usize {
        self.outputs.len()
    }

    /// Number of LUTs.
    #[must_use]
    pub fn num_luts(&self) -> usize {
        self.graph
            .node_indices()
            .filter(|&node| matches!(self.graph[node], LutNode::Lut(_)))
            .count()
    }

    /// Depth of the network: LUTs on the longest path from an input to an output.
    #[must_use]
    pub fn depth(&self) -> u32 {
        let mut level = vec![0u32; self.graph.node_count()];
        for node in self.graph.node_indices() {
            if let LutNode::Lut(_) = self.graph[node] {
                level[node.index()] = 1 + self
                    .graph
                    .neighbors_directed(node, Incoming)
                    .map(|fanin| level[fanin.index()])
                    .max()
                    .unwrap_or(0);
            }
        }
        self.outputs.iter().map(|o| level[o.index()]).max().unwrap_or(0)
    }

    /// Evaluates every primary output under an assignment of the primary inputs.
    #[must_use]
    pub fn simulate(&self, inputs: &[bool]) -> Vec<bool> {
        assert_eq!(inputs.len(), self.inputs.len(), "wrong number of input values");
        let mut values = vec![false; self.graph.node_count()];
        for node in self.graph.node_indices() {
            values[node.index()] = match &self.graph[node] {
                LutNode::Constant(value) => *value,
                LutNode::Input(index) => inputs[*index as usize],
                LutNode::Lut(function) => {
                    let minterm = self
                        .fanins(node)
                        .iter()
                        .enumerate()
                        .fold(0, |m, (pin, fanin)| m | (usize::from(values[fanin.index()]) << pin));
                    function.get_bit(minterm)
                },
            };
        }
        self.outputs.iter().map(|o| values[o.index()]).collect()
    }

    /// Writes the network in Graphviz format.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn to_graphviz<W: Write>(&self, mut f: W) -> std::io::Result<()> {
        writeln!(f, "strict digraph {{")?;

        for node in self.graph.node_indices() {
            match &self.graph[node] {
                LutNode::Constant(value) => {
                    writeln!(f, "{} [shape=point,label=\"{}\"];", node.index(), u8::from(*value))?;
                },
                LutNode::Input(index) => {
                    writeln!(f, "{} [shape=box,color=blue,label=\"Input {}\"];", node.index(), index)?;
                },
                LutNode::Lut(function) => {
                    let bits: String = (0..function.num_bits()).rev().map(|m| if function.get_bit(m) { '1' } else { '0' }).collect();
                    writeln!(f, "{} [label=\"LUT{} {}\"];", node.index(), function.num_vars(), bits)?;
                },
            }
        }

        for edge in self.graph.edge_references() {
            writeln!(f, "{} -> {} [label=\"{}\"];", edge.source().index(), edge.target().index(), edge.weight())?;
        }

        for (index, output) in self.outputs.iter().enumerate() {
            writeln!(f, "o{} [shape=box,color=green,label=\"Output {0}\"];", index)?;
            writeln!(f, "{} -> o{};", output.index(), index)?;
        }

        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn childless_nodes_are_constants() {
        let mut ntk = LutNetwork::new();
        let one = ntk.create_node(&[], TruthTable::constant(0, true));
        assert_eq!(one, ntk.get_constant(true));
        assert_eq!(ntk.num_luts(), 0);
    }

    #[test]
    fn simulate_and_depth() {
        let mut ntk = LutNetwork::new();
        let a = ntk.create_pi();
        let b = ntk.create_pi();
        let c = ntk.create_pi();
        let and = ntk.create_node(&[a, b], TruthTable::from_word(2, 0x8));
        let mux = ntk.create_node(&[and, c, a], TruthTable::from_word(3, 0xca));
        let inv = ntk.create_not(c);
        ntk.create_po(mux);
        ntk.create_po(inv);
        assert_eq!(ntk.num_luts(), 3);
        assert_eq!(ntk.depth(), 2);
        assert_eq!(ntk.fanins(mux), vec![and, c, a]);

        // 0xca selects pin 1 when pin 2 is set, pin 0 otherwise.
        assert_eq!(ntk.simulate(&[true, true, false]), vec![false, true]);
        assert_eq!(ntk.simulate(&[true, false, true]), vec![true, false]);
        assert_eq!(ntk.simulate(&[false, true, true]), vec![false, false]);
    }

    #[test]
    fn graphviz() {
        let mut ntk = LutNetwork::new();
        let a = ntk.create_pi();
        let n = ntk.create_not(a);
        ntk.create_po(n);
        let mut out = Vec::new();
        ntk.to_graphviz(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("LUT1 01"));
        assert!(text.contains("Output 0"));
    }
}
