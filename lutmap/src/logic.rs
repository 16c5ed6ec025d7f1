//! A general combinational logic network.
//!
//! Gates are n-ary ANDs, n-ary XORs, three-input majorities and buffers. Every edge carries an inversion flag, so
//! inverters never appear as nodes and `!signal` is free. Node 0 is the constant zero; constant one is its
//! complement.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::ops::Not;

use petgraph::{prelude::*, visit::{EdgeRef, NodeIndexable, Topo}};

use crate::error::{Error, Result};
use crate::traits::Network;
use crate::truth_table::TruthTable;

/// The kind of a network node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gate {
    /// The constant zero.
    Zero,
    /// A primary input, numbered from zero.
    Input(u32),
    /// Conjunction of all fanins.
    And,
    /// Parity of all fanins.
    Xor,
    /// Majority of exactly three fanins.
    Majority,
    /// Copies its single fanin.
    Buffer,
}

/// A possibly complemented reference to a node.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Signal {
    node: NodeIndex,
    complemented: bool,
}

impl Signal {
    /// The node this signal points to.
    #[must_use]
    pub const fn node(self) -> NodeIndex {
        self.node
    }

    /// True if the node's value is inverted.
    #[must_use]
    pub const fn is_complemented(self) -> bool {
        self.complemented
    }
}

impl Not for Signal {
    type Output = Self;

    fn not(self) -> Self {
        Self {
            node: self.node,
            complemented: !self.complemented,
        }
    }
}

/// A logic network of [`Gate`]s.
#[derive(Clone, Debug)]
pub struct LogicNetwork {
    graph: StableGraph<Gate, bool, Directed>,
    zero: NodeIndex,
    inputs: Vec<NodeIndex>,
    outputs: Vec<Signal>,
    po_refs: Vec<u32>,
    symbol_table: HashMap<(bool, usize), String>,
}

impl Default for LogicNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl LogicNetwork {
    /// A network containing only the constant.
    #[must_use]
    pub fn new() -> Self {
        let mut graph = StableGraph::default();
        let zero = graph.add_node(Gate::Zero);
        Self {
            graph,
            zero,
            inputs: Vec::new(),
            outputs: Vec::new(),
            po_refs: vec![0],
            symbol_table: HashMap::new(),
        }
    }

    /// Reads a combinational AIGER file, in ASCII or binary form.
    ///
    /// # Errors
    ///
    /// Fails on malformed input and on files containing latches.
    #[allow(clippy::similar_names)]
    pub fn from_aiger<R: Read>(reader: R) -> Result<Self> {
        let reader = aiger::Reader::from_reader(reader).map_err(|e| Error::Aiger(format!("{:?}", e)))?;
        let mut ntk = Self::new();

        // Every variable becomes a node with the same index; variables that turn out not to be inputs are ANDs.
        for variable in 1..=reader.header().m {
            let node = ntk.add_gate(Gate::And);
            assert_eq!(node.index(), variable);
        }

        let mut outputs = vec![];

        for record in reader.records() {
            match record.map_err(|e| Error::Aiger(format!("{:?}", e)))? {
                aiger::Aiger::Input(l) => {
                    let node = NodeIndex::new(l.variable());
                    let index = u32::try_from(ntk.inputs.len()).map_err(|_| Error::Unsupported("too many inputs"))?;
                    ntk.graph[node] = Gate::Input(index);
                    ntk.inputs.push(node);
                },
                aiger::Aiger::Latch { .. } => {
                    return Err(Error::Unsupported("latches"));
                },
                aiger::Aiger::Output(l) => {
                    outputs.push(Signal {
                        node: NodeIndex::new(l.variable()),
                        complemented: l.is_inverted(),
                    });
                },
                aiger::Aiger::AndGate { output, inputs } => {
                    let gate = NodeIndex::new(output.variable());
                    for input in &inputs {
                        ntk.graph.add_edge(NodeIndex::new(input.variable()), gate, input.is_inverted());
                    }
                },
                aiger::Aiger::Symbol { type_spec, position, symbol } => {
                    match type_spec {
                        aiger::Symbol::Input => ntk.symbol_table.insert((true, position), symbol),
                        aiger::Symbol::Output => ntk.symbol_table.insert((false, position), symbol),
                        aiger::Symbol::Latch => continue,
                    };
                },
            }
        }

        // Unused variables still have nodes; tie them to zero so every gate has a fanin.
        for variable in 1..ntk.graph.node_bound() {
            let node = NodeIndex::new(variable);
            if ntk.graph[node] == Gate::And && ntk.graph.edges_directed(node, Incoming).next().is_none() {
                ntk.graph[node] = Gate::Buffer;
                ntk.graph.add_edge(ntk.zero, node, false);
            }
        }

        for output in outputs {
            ntk.create_po(output);
        }

        Ok(ntk)
    }

    fn add_gate(&mut self, gate: Gate) -> NodeIndex {
        let node = self.graph.add_node(gate);
        if self.po_refs.len() <= node.index() {
            self.po_refs.resize(node.index() + 1, 0);
        }
        node
    }

    fn create_gate(&mut self, gate: Gate, fanins: &[Signal]) -> Signal {
        let node = self.add_gate(gate);
        for fanin in fanins {
            self.graph.add_edge(fanin.node, node, fanin.complemented);
        }
        Signal { node, complemented: false }
    }

    /// A constant signal.
    #[must_use]
    pub const fn constant(&self, value: bool) -> Signal {
        Signal {
            node: self.zero,
            complemented: value,
        }
    }

    /// Adds a primary input.
    pub fn create_pi(&mut self) -> Signal {
        #[allow(clippy::cast_possible_truncation)]
        let index = self.inputs.len() as u32;
        let node = self.add_gate(Gate::Input(index));
        self.inputs.push(node);
        Signal { node, complemented: false }
    }

    /// Adds a primary output and returns its position.
    pub fn create_po(&mut self, signal: Signal) -> usize {
        self.po_refs[signal.node.index()] += 1;
        self.outputs.push(signal);
        self.outputs.len() - 1
    }

    /// Adds a two-input AND.
    pub fn create_and(&mut self, a: Signal, b: Signal) -> Signal {
        self.create_gate(Gate::And, &[a, b])
    }

    /// Adds a two-input OR.
    pub fn create_or(&mut self, a: Signal, b: Signal) -> Signal {
        !self.create_and(!a, !b)
    }

    /// Adds an AND over any number of signals.
    pub fn create_nary_and(&mut self, fanins: &[Signal]) -> Signal {
        assert!(!fanins.is_empty(), "AND gate without fanins");
        self.create_gate(Gate::And, fanins)
    }

    /// Adds a two-input XOR.
    pub fn create_xor(&mut self, a: Signal, b: Signal) -> Signal {
        self.create_gate(Gate::Xor, &[a, b])
    }

    /// Adds an XOR over any number of signals.
    pub fn create_nary_xor(&mut self, fanins: &[Signal]) -> Signal {
        assert!(!fanins.is_empty(), "XOR gate without fanins");
        self.create_gate(Gate::Xor, fanins)
    }

    /// Adds a three-input majority.
    pub fn create_maj(&mut self, a: Signal, b: Signal, c: Signal) -> Signal {
        self.create_gate(Gate::Majority, &[a, b, c])
    }

    /// Adds a buffer; with a complemented fanin this is an inverter.
    pub fn create_buf(&mut self, a: Signal) -> Signal {
        self.create_gate(Gate::Buffer, &[a])
    }

    /// The primary input signals.
    #[must_use]
    pub fn inputs(&self) -> Vec<Signal> {
        self.inputs
            .iter()
            .map(|&node| Signal { node, complemented: false })
            .collect()
    }

    /// The primary output signals.
    #[must_use]
    pub fn outputs(&self) -> &[Signal] {
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

    /// Number of gates, not counting inputs and the constant.
    #[must_use]
    pub fn num_gates(&self) -> usize {
        self.graph.node_count() - self.inputs.len() - 1
    }

    /// The kind of a node.
    #[must_use]
    pub fn gate(&self, node: NodeIndex) -> Gate {
        self.graph[node]
    }

    /// The AIGER symbol of an input or output, if the file had one.
    #[must_use]
    pub fn symbol(&self, is_input: bool, position: usize) -> Option<&String> {
        self.symbol_table.get(&(is_input, position))
    }

    /// The underlying graph; edge weights are inversion flags.
    #[must_use]
    pub const fn graph(&self) -> &StableGraph<Gate, bool> {
        &self.graph
    }

    fn evaluate(gate: Gate, mut values: impl Iterator<Item = bool>) -> bool {
        match gate {
            Gate::And => values.all(|v| v),
            Gate::Xor => values.fold(false, |acc, v| acc ^ v),
            Gate::Majority => values.filter(|&v| v).count() >= 2,
            Gate::Buffer => values.next().unwrap_or(false),
            Gate::Zero | Gate::Input(_) => unreachable!("terminal nodes are not evaluated"),
        }
    }

    /// Evaluates every primary output under an assignment of the primary inputs.
    #[must_use]
    pub fn simulate(&self, inputs: &[bool]) -> Vec<bool> {
        assert_eq!(inputs.len(), self.inputs.len(), "wrong number of input values");
        let mut values = vec![false; self.graph.node_bound()];
        for node in self.topological_order() {
            values[node.index()] = match self.graph[node] {
                Gate::Zero => false,
                Gate::Input(index) => inputs[index as usize],
                gate => {
                    let fanins = self.fanins(node);
                    Self::evaluate(gate, fanins.iter().map(|s| values[s.node.index()] ^ s.complemented))
                },
            };
        }
        self.outputs
            .iter()
            .map(|s| values[s.node.index()] ^ s.complemented)
            .collect()
    }

    /// Writes the network in Graphviz format.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn to_graphviz<W: Write>(&self, mut f: W) -> std::io::Result<()> {
        writeln!(f, "strict digraph {{")?;

        for node in self.graph.node_indices() {
            match self.graph[node] {
                Gate::Zero => {},
                Gate::Input(index) => {
                    writeln!(f, "{} [shape=box,color=blue,label=\"Input {}\"];", node.index(), index)?;
                },
                gate => {
                    writeln!(f, "{} [label=\"{:?} {0}\"];", node.index(), gate)?;
                },
            }
        }

        for edge in self.graph.edge_indices() {
            let (from, to) = self.graph.edge_endpoints(edge).expect("edge index from this graph");
            if from == self.zero {
                writeln!(f, "z{} [label=\"\", shape=point];", to.index())?;
                write!(f, "z{} -> {0}", to.index())?;
            } else {
                write!(f, "{} -> {}", from.index(), to.index())?;
            }
            writeln!(f, " {};", if self.graph[edge] { "[dir=both,arrowtail=odot]" } else { "" })?;
        }

        for (index, output) in self.outputs.iter().enumerate() {
            writeln!(f, "o{} [shape=box,color=green,label=\"Output {0}\"];", index)?;
            writeln!(
                f,
                "{} -> o{} {};",
                output.node.index(),
                index,
                if output.complemented { "[dir=both,arrowtail=odot]" } else { "" }
            )?;
        }

        writeln!(f, "}}")
    }
}

impl Network for LogicNetwork {
    type Node = NodeIndex;
    type Signal = Signal;

    fn size(&self) -> usize {
        self.graph.node_bound()
    }

    fn node_to_index(&self, node: NodeIndex) -> usize {
        node.index()
    }

    fn index_to_node(&self, index: usize) -> NodeIndex {
        NodeIndex::new(index)
    }

    fn get_node(&self, signal: Signal) -> NodeIndex {
        signal.node
    }

    fn is_complemented(&self, signal: Signal) -> bool {
        signal.complemented
    }

    fn get_constant(&self, value: bool) -> Signal {
        self.constant(value)
    }

    fn constant_value(&self, node: NodeIndex) -> bool {
        debug_assert_eq!(node, self.zero);
        false
    }

    fn is_ci(&self, node: NodeIndex) -> bool {
        matches!(self.graph[node], Gate::Input(_))
    }

    fn is_constant(&self, node: NodeIndex) -> bool {
        node == self.zero
    }

    fn fanout_size(&self, node: NodeIndex) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let gates = self.graph.edges_directed(node, Outgoing).count() as u32;
        gates + self.po_refs[node.index()]
    }

    fn fanins(&self, node: NodeIndex) -> Vec<Signal> {
        let mut edges: Vec<_> = self.graph.edges_directed(node, Incoming).collect();
        edges.sort_by_key(|edge| edge.id());
        edges
            .iter()
            .map(|edge| Signal {
                node: edge.source(),
                complemented: *edge.weight(),
            })
            .collect()
    }

    fn cis(&self) -> Vec<NodeIndex> {
        self.inputs.clone()
    }

    fn cos(&self) -> Vec<Signal> {
        self.outputs.clone()
    }

    fn topological_order(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.graph.node_count());
        let mut topo = Topo::new(&self.graph);
        while let Some(node) = topo.next(&self.graph) {
            order.push(node);
        }
        order
    }

    fn compute(&self, node: NodeIndex, fanins: &[TruthTable]) -> TruthTable {
        let signals = self.fanins(node);
        assert_eq!(signals.len(), fanins.len(), "node {} has {} fanins", node.index(), signals.len());
        let mut values = signals
            .iter()
            .zip(fanins)
            .map(|(s, tt)| if s.complemented { !tt } else { tt.clone() });

        let function = match self.graph[node] {
            Gate::And => values.reduce(|a, b| a & b),
            Gate::Xor => values.reduce(|a, b| a ^ b),
            Gate::Majority => {
                let values: Vec<TruthTable> = values.collect();
                assert_eq!(values.len(), 3, "majority gate {} does not have three fanins", node.index());
                Some(TruthTable::maj(&values[0], &values[1], &values[2]))
            },
            Gate::Buffer => values.next(),
            Gate::Zero | Gate::Input(_) => panic!("node {} is not a gate", node.index()),
        };
        function.unwrap_or_else(|| panic!("gate {} has no fanins", node.index()))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    const HALF_ADDER: &str = "aag 6 2 0 2 3\n2\n4\n10\n6\n6 2 4\n8 3 5\n10 7 9\ni0 a\ni1 b\no0 sum\no1 carry\n";

    #[test]
    fn parse_aiger() {
        let ntk = LogicNetwork::from_aiger(HALF_ADDER.as_bytes()).expect("valid AIGER");
        assert_eq!(ntk.num_pis(), 2);
        assert_eq!(ntk.num_pos(), 2);
        assert_eq!(ntk.symbol(true, 1).map(String::as_str), Some("b"));
        assert_eq!(ntk.symbol(false, 1).map(String::as_str), Some("carry"));
        // Variable 6 is declared but unused.
        assert_eq!(ntk.gate(NodeIndex::new(6)), Gate::Buffer);
        for a in [false, true] {
            for b in [false, true] {
                assert_eq!(ntk.simulate(&[a, b]), vec![a ^ b, a && b]);
            }
        }
    }

    #[test]
    fn latches_are_rejected() {
        let aag = "aag 1 0 1 0 0\n2 3\n";
        assert!(matches!(LogicNetwork::from_aiger(aag.as_bytes()), Err(Error::Unsupported(_))));
    }

    #[test]
    fn fanout_counts_outputs() {
        let mut ntk = LogicNetwork::new();
        let a = ntk.create_pi();
        let b = ntk.create_pi();
        let f = ntk.create_and(a, b);
        let g = ntk.create_xor(f, a);
        ntk.create_po(f);
        ntk.create_po(!g);
        assert_eq!(ntk.fanout_size(a.node()), 2);
        assert_eq!(ntk.fanout_size(f.node()), 2);
        assert_eq!(ntk.fanout_size(g.node()), 1);
        assert_eq!(ntk.fanins(g.node()), vec![f, a]);
    }

    #[test]
    fn compute_applies_complements() {
        let mut ntk = LogicNetwork::new();
        let a = ntk.create_pi();
        let b = ntk.create_pi();
        let c = ntk.create_pi();
        let m = ntk.create_maj(a, !b, c);
        let x = TruthTable::nth_var(3, 0);
        let y = TruthTable::nth_var(3, 1);
        let z = TruthTable::nth_var(3, 2);
        assert_eq!(ntk.compute(m.node(), &[x.clone(), y.clone(), z.clone()]), TruthTable::maj(&x, &!&y, &z));

        let o = ntk.create_or(a, b);
        let expected = !(&!&x & &!&y);
        assert_eq!(!ntk.compute(o.node(), &[x, y]), expected);
    }

    #[test]
    fn topological_order_respects_fanins() {
        let mut ntk = LogicNetwork::new();
        let a = ntk.create_pi();
        let b = ntk.create_pi();
        let f = ntk.create_and(a, b);
        let g = ntk.create_buf(!f);
        ntk.create_po(g);
        let order = ntk.topological_order();
        let pos = |n: NodeIndex| order.iter().position(|&m| m == n).unwrap();
        assert!(pos(a.node()) < pos(f.node()));
        assert!(pos(f.node()) < pos(g.node()));
        assert_eq!(order.len(), 5);
        assert_eq!(ntk.simulate(&[true, true]), vec![false]);
    }

    #[test]
    fn graphviz_mentions_every_node() {
        let mut ntk = LogicNetwork::new();
        let a = ntk.create_pi();
        let b = ntk.create_pi();
        let f = ntk.create_and(a, !b);
        ntk.create_po(f);
        let mut out = Vec::new();
        ntk.to_graphviz(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("strict digraph {"));
        assert!(text.contains("Input 1"));
        assert!(text.contains("And 3"));
        assert!(text.contains("arrowtail=odot"));
    }
}
