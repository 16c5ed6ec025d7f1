//! A LUT mapping recorded alongside the mapped network.

use crate::truth_table::TruthTable;

/// A cell: the root of one LUT.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    /// Node indices of the LUT inputs, in increasing order.
    pub leaves: Vec<usize>,
    /// The LUT function over `leaves`, when functions are tracked.
    pub function: Option<TruthTable>,
}

/// Per-node side table of a mapping, indexed by the network's dense node index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mapping {
    cells: Vec<Option<Cell>>,
}

impl Mapping {
    /// An empty mapping for a network of `size` nodes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self { cells: vec![None; size] }
    }

    /// Removes every cell.
    pub fn clear_mapping(&mut self) {
        for cell in &mut self.cells {
            *cell = None;
        }
    }

    /// Makes `node` the root of a cell with the given leaves.
    pub fn add_to_mapping(&mut self, node: usize, leaves: Vec<usize>) {
        self.cells[node] = Some(Cell { leaves, function: None });
    }

    /// Attaches a function to the cell rooted at `node`.
    pub fn set_cell_function(&mut self, node: usize, function: TruthTable) {
        let cell = self.cells[node]
            .as_mut()
            .unwrap_or_else(|| panic!("node {} is not a cell root", node));
        cell.function = Some(function);
    }

    /// True if `node` is the root of a cell.
    #[must_use]
    pub fn is_cell_root(&self, node: usize) -> bool {
        self.cells.get(node).map_or(false, Option::is_some)
    }

    /// The leaves of the cell rooted at `node`.
    #[must_use]
    pub fn cell_leaves(&self, node: usize) -> Option<&[usize]> {
        self.cells.get(node)?.as_ref().map(|cell| cell.leaves.as_slice())
    }

    /// The function of the cell rooted at `node`.
    #[must_use]
    pub fn cell_function(&self, node: usize) -> Option<&TruthTable> {
        self.cells.get(node)?.as_ref()?.function.as_ref()
    }

    /// Number of cells.
    #[must_use]
    pub fn num_cells(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Iterates over `(root, cell)` pairs in node order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(node, cell)| cell.as_ref().map(|cell| (node, cell)))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn cells() {
        let mut mapping = Mapping::new(8);
        mapping.add_to_mapping(5, vec![1, 2]);
        mapping.add_to_mapping(7, vec![3, 5]);
        mapping.set_cell_function(7, TruthTable::from_word(2, 0x6));
        assert!(mapping.is_cell_root(5));
        assert!(!mapping.is_cell_root(6));
        assert!(!mapping.is_cell_root(100));
        assert_eq!(mapping.cell_leaves(7), Some(&[3, 5][..]));
        assert_eq!(mapping.cell_function(5), None);
        assert_eq!(mapping.cell_function(7), Some(&TruthTable::from_word(2, 0x6)));
        assert_eq!(mapping.cells().map(|(root, _)| root).collect::<Vec<_>>(), vec![5, 7]);
        mapping.clear_mapping();
        assert_eq!(mapping.num_cells(), 0);
    }

    #[test]
    #[should_panic(expected = "not a cell root")]
    fn function_needs_a_cell() {
        Mapping::new(2).set_cell_function(1, TruthTable::new(0));
    }
}
