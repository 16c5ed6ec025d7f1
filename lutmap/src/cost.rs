//! LUT cost models.

use crate::truth_table::TruthTable;

/// Area and delay of a single LUT.
pub trait LutCost {
    /// Whether results of [`LutCost::cost_by_function`] are worth caching per function.
    const CACHEABLE: bool = true;

    /// `(area, delay)` of a LUT with `num_leaves` inputs, used when functions are not tracked.
    fn cost_by_size(&self, num_leaves: u32) -> (u32, u32);

    /// `(area, delay)` of a LUT implementing `function`, used when functions are tracked.
    fn cost_by_function(&self, function: &TruthTable) -> (u32, u32) {
        self.cost_by_size(function.num_vars())
    }
}

/// Every LUT costs one unit of area and delay; buffers, inverters and constants are free.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnitCost;

impl LutCost for UnitCost {
    const CACHEABLE: bool = false;

    fn cost_by_size(&self, num_leaves: u32) -> (u32, u32) {
        if num_leaves < 2 {
            (0, 0)
        } else {
            (1, 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn unit_cost() {
        assert_eq!(UnitCost.cost_by_size(0), (0, 0));
        assert_eq!(UnitCost.cost_by_size(1), (0, 0));
        assert_eq!(UnitCost.cost_by_size(6), (1, 1));
        assert_eq!(UnitCost.cost_by_function(&TruthTable::nth_var(3, 1)), (1, 1));
    }
}
