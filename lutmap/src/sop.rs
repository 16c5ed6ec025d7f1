//! Two-level decompositions of truth tables: irredundant sums of products and exclusive sums of products.

use std::collections::HashMap;

use crate::truth_table::TruthTable;

/// A product term: variable `i` appears when bit `i` of `mask` is set, positively when bit `i` of `bits` is set.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub struct Cube {
    /// Literal polarities.
    pub bits: u32,
    /// Literal presence.
    pub mask: u32,
}

impl Cube {
    /// Number of literals.
    #[must_use]
    pub const fn num_literals(self) -> u32 {
        self.mask.count_ones()
    }

    /// True if variable `var` appears in the cube.
    #[must_use]
    pub const fn has_literal(self, var: u32) -> bool {
        (self.mask >> var) & 1 == 1
    }

    /// True if variable `var` appears uncomplemented.
    #[must_use]
    pub const fn polarity(self, var: u32) -> bool {
        (self.bits >> var) & 1 == 1
    }

    /// Adds a literal of `var`.
    pub fn add_literal(&mut self, var: u32, polarity: bool) {
        self.mask |= 1 << var;
        if polarity {
            self.bits |= 1 << var;
        } else {
            self.bits &= !(1 << var);
        }
    }

    /// True if the cube is one under the assignment `minterm`.
    #[must_use]
    pub const fn covers(self, minterm: u32) -> bool {
        (minterm ^ self.bits) & self.mask == 0
    }
}

/// Total literal count of a cube list.
#[must_use]
pub fn num_literals(cubes: &[Cube]) -> u32 {
    cubes.iter().map(|cube| cube.num_literals()).sum()
}

/// An irredundant sum of products of `tt`, computed with the Minato-Morreale procedure.
#[must_use]
pub fn isop(tt: &TruthTable) -> Vec<Cube> {
    let mut cubes = Vec::new();
    isop_rec(tt, tt, tt.num_vars(), &mut cubes);
    cubes
}

/// Covers every minterm of `lower` using only minterms of `upper`, looking at variables below `limit`.
fn isop_rec(lower: &TruthTable, upper: &TruthTable, limit: u32, cubes: &mut Vec<Cube>) -> TruthTable {
    if lower.is_const0() {
        return TruthTable::new(lower.num_vars());
    }
    if upper.is_const1() {
        cubes.push(Cube::default());
        return TruthTable::constant(lower.num_vars(), true);
    }

    let var = (0..limit)
        .rev()
        .find(|&var| lower.has_var(var) || upper.has_var(var))
        .unwrap_or_else(|| panic!("isop interval is neither empty nor full but depends on no variable"));

    let (lower0, lower1) = (lower.cofactor0(var), lower.cofactor1(var));
    let (upper0, upper1) = (upper.cofactor0(var), upper.cofactor1(var));

    let begin0 = cubes.len();
    let res0 = isop_rec(&(&lower0 & &!&upper1), &upper0, var, cubes);
    let begin1 = cubes.len();
    let res1 = isop_rec(&(&lower1 & &!&upper0), &upper1, var, cubes);
    let end1 = cubes.len();
    let rest_lower = &(&lower0 & &!&res0) | &(&lower1 & &!&res1);
    let res_star = isop_rec(&rest_lower, &(&upper0 & &upper1), var, cubes);

    for cube in &mut cubes[begin0..begin1] {
        cube.add_literal(var, false);
    }
    for cube in &mut cubes[begin1..end1] {
        cube.add_literal(var, true);
    }

    let x = TruthTable::nth_var(lower.num_vars(), var);
    &(&(&res0 & &!&x) | &(&res1 & &x)) | &res_star
}

/// An exclusive sum of products of `tt` from a pseudo-Kronecker expansion.
///
/// Each variable is decomposed with whichever of the Shannon, positive Davio and negative Davio expansions
/// yields the fewest cubes, breaking ties on literal count. Subfunctions are memoised.
#[must_use]
pub fn esop(tt: &TruthTable) -> Vec<Cube> {
    let mut memo = HashMap::new();
    esop_rec(tt, &mut memo)
}

fn esop_rec(tt: &TruthTable, memo: &mut HashMap<TruthTable, Vec<Cube>>) -> Vec<Cube> {
    if tt.is_const0() {
        return Vec::new();
    }
    if tt.is_const1() {
        return vec![Cube::default()];
    }
    if let Some(cubes) = memo.get(tt) {
        return cubes.clone();
    }

    let var = (0..tt.num_vars())
        .rev()
        .find(|&var| tt.has_var(var))
        .unwrap_or_else(|| panic!("non-constant function depends on no variable"));

    let f0 = tt.cofactor0(var);
    let f1 = tt.cofactor1(var);
    let f2 = &f0 ^ &f1;
    let c0 = esop_rec(&f0, memo);
    let c1 = esop_rec(&f1, memo);
    let c2 = esop_rec(&f2, memo);

    let cost = |a: &[Cube], b: &[Cube]| (a.len() + b.len(), num_literals(a) + num_literals(b) + b.len() as u32);
    let shannon = (c0.len() + c1.len(), num_literals(&c0) + num_literals(&c1) + (c0.len() + c1.len()) as u32);
    let positive = cost(&c0, &c2);
    let negative = cost(&c1, &c2);

    let with_literal = |cubes: &[Cube], polarity: bool| -> Vec<Cube> {
        cubes
            .iter()
            .map(|&cube| {
                let mut cube = cube;
                cube.add_literal(var, polarity);
                cube
            })
            .collect()
    };

    let cubes: Vec<Cube> = if shannon <= positive && shannon <= negative {
        with_literal(&c0, false).into_iter().chain(with_literal(&c1, true)).collect()
    } else if positive <= negative {
        c0.iter().copied().chain(with_literal(&c2, true)).collect()
    } else {
        c1.iter().copied().chain(with_literal(&c2, false)).collect()
    };

    memo.insert(tt.clone(), cubes.clone());
    cubes
}
