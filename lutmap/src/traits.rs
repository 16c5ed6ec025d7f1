//! The capability contract a network must satisfy to be mapped.

use std::fmt::Debug;
use std::hash::Hash;

use crate::truth_table::TruthTable;

/// A combinational logic network that can be mapped to LUTs.
///
/// Nodes are addressed by a dense index in `0..size()`. Signals are references to nodes that may be complemented.
pub trait Network {
    /// A network node.
    type Node: Copy + Eq + Hash + Debug;
    /// A possibly complemented reference to a node.
    type Signal: Copy + Eq + Debug;

    /// Returns one more than the largest node index.
    fn size(&self) -> usize;
    /// Returns the dense index of a node.
    fn node_to_index(&self, node: Self::Node) -> usize;
    /// Returns the node with the given dense index.
    fn index_to_node(&self, index: usize) -> Self::Node;
    /// Returns the node a signal points to.
    fn get_node(&self, signal: Self::Signal) -> Self::Node;
    /// Returns true if a signal is complemented.
    fn is_complemented(&self, signal: Self::Signal) -> bool;
    /// Returns a signal with a constant value.
    fn get_constant(&self, value: bool) -> Self::Signal;
    /// Returns the value of a constant node when referenced without complement.
    fn constant_value(&self, node: Self::Node) -> bool;
    /// Returns true if this node is a combinational input.
    fn is_ci(&self, node: Self::Node) -> bool;
    /// Returns true if this node is a constant.
    fn is_constant(&self, node: Self::Node) -> bool;
    /// Returns the number of gate fanins and outputs referencing this node.
    fn fanout_size(&self, node: Self::Node) -> u32;
    /// Returns the fanin signals of a node, in the order `compute` expects them.
    fn fanins(&self, node: Self::Node) -> Vec<Self::Signal>;
    /// Returns the combinational inputs.
    fn cis(&self) -> Vec<Self::Node>;
    /// Returns the combinational output signals.
    fn cos(&self) -> Vec<Self::Signal>;
    /// Returns every node, fanins before fanouts.
    fn topological_order(&self) -> Vec<Self::Node>;
    /// Returns the function of a gate given the functions of its fanin nodes.
    ///
    /// Fanin complements are applied by the network.
    fn compute(&self, node: Self::Node, fanins: &[TruthTable]) -> TruthTable;
}
