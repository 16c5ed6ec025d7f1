//! Dynamic truth tables over up to sixteen variables.
//!
//! A truth table with `n` variables stores `2^n` bits, packed into 64-bit words. Minterm `m` lives at bit
//! `m % 64` of word `m / 64`, and variable `i` is bit `i` of the minterm index. Tables with fewer than six
//! variables use a single word whose unused high bits are always zero, so two tables over the same number of
//! variables compare equal exactly when they describe the same function.

use std::ops::{BitAnd, BitOr, BitXor, Not};

/// The largest number of variables a truth table can hold.
pub const MAX_VARS: u32 = 16;

/// Positions of the minterms where variable `i` is one, for the six variables that live inside a word.
const PROJECTIONS: [u64; 6] = [
    0xaaaa_aaaa_aaaa_aaaa,
    0xcccc_cccc_cccc_cccc,
    0xf0f0_f0f0_f0f0_f0f0,
    0xff00_ff00_ff00_ff00,
    0xffff_0000_ffff_0000,
    0xffff_ffff_0000_0000,
];

const fn word_count(num_vars: u32) -> usize {
    if num_vars <= 6 {
        1
    } else {
        1 << (num_vars - 6)
    }
}

const fn tail_mask(num_vars: u32) -> u64 {
    if num_vars >= 6 {
        u64::MAX
    } else {
        (1u64 << (1u32 << num_vars)) - 1
    }
}

/// A completely specified Boolean function.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct TruthTable {
    num_vars: u32,
    words: Vec<u64>,
}

impl TruthTable {
    /// The constant-zero function over `num_vars` variables.
    #[must_use]
    pub fn new(num_vars: u32) -> Self {
        assert!(num_vars <= MAX_VARS, "truth table with {} variables exceeds the limit of {}", num_vars, MAX_VARS);
        Self {
            num_vars,
            words: vec![0; word_count(num_vars)],
        }
    }

    /// A constant function over `num_vars` variables.
    #[must_use]
    pub fn constant(num_vars: u32, value: bool) -> Self {
        let tt = Self::new(num_vars);
        if value {
            !tt
        } else {
            tt
        }
    }

    /// The projection onto variable `var`.
    #[must_use]
    pub fn nth_var(num_vars: u32, var: u32) -> Self {
        assert!(var < num_vars, "variable {} out of range for a {}-input table", var, num_vars);
        let mut tt = Self::new(num_vars);
        if var < 6 {
            for word in &mut tt.words {
                *word = PROJECTIONS[var as usize];
            }
        } else {
            let step = var - 6;
            for (k, word) in tt.words.iter_mut().enumerate() {
                if (k >> step) & 1 == 1 {
                    *word = u64::MAX;
                }
            }
        }
        tt.mask_tail();
        tt
    }

    /// The three-input majority of `a`, `b` and `c`.
    #[must_use]
    pub fn maj(a: &Self, b: &Self, c: &Self) -> Self {
        &(&(a & b) | &(a & c)) | &(b & c)
    }

    /// Builds a table from the low `2^num_vars` bits of `bits`; only valid for up to six variables.
    #[must_use]
    pub fn from_word(num_vars: u32, bits: u64) -> Self {
        assert!(num_vars <= 6, "from_word only covers tables of at most six variables");
        let mut tt = Self::new(num_vars);
        tt.words[0] = bits;
        tt.mask_tail();
        tt
    }

    /// Number of variables.
    #[must_use]
    pub const fn num_vars(&self) -> u32 {
        self.num_vars
    }

    /// Number of minterms.
    #[must_use]
    pub const fn num_bits(&self) -> usize {
        1 << self.num_vars
    }

    /// The raw words; unused bits of the last word are zero.
    #[must_use]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// The value of minterm `index`.
    #[must_use]
    pub fn get_bit(&self, index: usize) -> bool {
        debug_assert!(index < self.num_bits());
        (self.words[index >> 6] >> (index & 63)) & 1 == 1
    }

    /// Sets the value of minterm `index`.
    pub fn set_bit(&mut self, index: usize, value: bool) {
        debug_assert!(index < self.num_bits());
        let bit = 1u64 << (index & 63);
        if value {
            self.words[index >> 6] |= bit;
        } else {
            self.words[index >> 6] &= !bit;
        }
    }

    /// True if the function is zero under the all-zero assignment.
    #[must_use]
    pub fn is_normal(&self) -> bool {
        self.words[0] & 1 == 0
    }

    /// True for the constant-zero function.
    #[must_use]
    pub fn is_const0(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// True for the constant-one function.
    #[must_use]
    pub fn is_const1(&self) -> bool {
        let tail = tail_mask(self.num_vars);
        self.words.iter().all(|&word| word == tail)
    }

    /// Number of minterms where the function is one.
    #[must_use]
    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|word| word.count_ones()).sum()
    }

    fn mask_tail(&mut self) {
        if self.num_vars < 6 {
            self.words[0] &= tail_mask(self.num_vars);
        }
    }

    /// True if the function depends on variable `var`.
    #[must_use]
    pub fn has_var(&self, var: u32) -> bool {
        debug_assert!(var < self.num_vars);
        if var < 6 {
            let shift = 1u32 << var;
            let low = !PROJECTIONS[var as usize];
            self.words.iter().any(|&word| (word >> shift) & low != word & low)
        } else {
            let step = 1usize << (var - 6);
            self.words
                .chunks(2 * step)
                .any(|block| block[..step] != block[step..])
        }
    }

    /// Bit mask of the variables the function depends on.
    #[must_use]
    pub fn support_mask(&self) -> u32 {
        (0..self.num_vars)
            .filter(|&var| self.has_var(var))
            .fold(0, |mask, var| mask | (1 << var))
    }

    /// Exchanges variables `a` and `b`.
    pub fn swap_inplace(&mut self, a: u32, b: u32) {
        if a == b {
            return;
        }
        let (i, j) = if a < b { (a, b) } else { (b, a) };
        debug_assert!(j < self.num_vars);

        if j < 6 {
            // Delta swap inside each word: minterms with bit i set and bit j clear trade places with their partners.
            let delta = (1u32 << j) - (1u32 << i);
            let mask = PROJECTIONS[i as usize] & !PROJECTIONS[j as usize];
            for word in &mut self.words {
                let t = ((*word >> delta) ^ *word) & mask;
                *word ^= t ^ (t << delta);
            }
        } else if i < 6 {
            let step = 1usize << (j - 6);
            let shift = 1u32 << i;
            let high = PROJECTIONS[i as usize];
            for block in self.words.chunks_mut(2 * step) {
                let (lo, hi) = block.split_at_mut(step);
                for (lo, hi) in lo.iter_mut().zip(hi.iter_mut()) {
                    let new_lo = (*lo & !high) | ((*hi & !high) << shift);
                    let new_hi = (*hi & high) | ((*lo & high) >> shift);
                    *lo = new_lo;
                    *hi = new_hi;
                }
            }
        } else {
            let bit_i = 1usize << (i - 6);
            let bit_j = 1usize << (j - 6);
            for k in 0..self.words.len() {
                if k & bit_i != 0 && k & bit_j == 0 {
                    self.words.swap(k, k ^ bit_i ^ bit_j);
                }
            }
        }
    }

    /// Complements variable `var`.
    pub fn flip_inplace(&mut self, var: u32) {
        debug_assert!(var < self.num_vars);
        if var < 6 {
            let shift = 1u32 << var;
            let high = PROJECTIONS[var as usize];
            for word in &mut self.words {
                *word = ((*word & high) >> shift) | ((*word & !high) << shift);
            }
            self.mask_tail();
        } else {
            let step = 1usize << (var - 6);
            for block in self.words.chunks_mut(2 * step) {
                let (lo, hi) = block.split_at_mut(step);
                lo.swap_with_slice(hi);
            }
        }
    }

    /// Negative cofactor with respect to `var`, keeping the number of variables.
    #[must_use]
    pub fn cofactor0(&self, var: u32) -> Self {
        let mut tt = self.clone();
        if var < 6 {
            let shift = 1u32 << var;
            let low = !PROJECTIONS[var as usize];
            for word in &mut tt.words {
                *word = (*word & low) | ((*word & low) << shift);
            }
            tt.mask_tail();
        } else {
            let step = 1usize << (var - 6);
            for block in tt.words.chunks_mut(2 * step) {
                let (lo, hi) = block.split_at_mut(step);
                hi.copy_from_slice(lo);
            }
        }
        tt
    }

    /// Positive cofactor with respect to `var`, keeping the number of variables.
    #[must_use]
    pub fn cofactor1(&self, var: u32) -> Self {
        let mut tt = self.clone();
        if var < 6 {
            let shift = 1u32 << var;
            let high = PROJECTIONS[var as usize];
            for word in &mut tt.words {
                *word = (*word & high) | ((*word & high) >> shift);
            }
        } else {
            let step = 1usize << (var - 6);
            for block in tt.words.chunks_mut(2 * step) {
                let (lo, hi) = block.split_at_mut(step);
                lo.copy_from_slice(hi);
            }
        }
        tt
    }

    /// The same function over `num_vars` variables, where the new variables are vacuous.
    #[must_use]
    pub fn extend_to(&self, num_vars: u32) -> Self {
        assert!(num_vars >= self.num_vars, "cannot extend a {}-input table to {} inputs", self.num_vars, num_vars);
        let mut tt = Self::new(num_vars);
        if self.num_vars >= 6 {
            for (k, word) in tt.words.iter_mut().enumerate() {
                *word = self.words[k % self.words.len()];
            }
        } else {
            let mut pattern = self.words[0];
            let mut width = 1u32 << self.num_vars;
            while width < 64 {
                pattern |= pattern << width;
                width *= 2;
            }
            for word in &mut tt.words {
                *word = pattern;
            }
            tt.mask_tail();
        }
        tt
    }

    /// The restriction to the first `num_vars` variables; the dropped variables must be vacuous.
    #[must_use]
    pub fn shrink_to(&self, num_vars: u32) -> Self {
        assert!(num_vars <= self.num_vars, "cannot shrink a {}-input table to {} inputs", self.num_vars, num_vars);
        let mut tt = Self::new(num_vars);
        let len = tt.words.len();
        tt.words.copy_from_slice(&self.words[..len]);
        tt.mask_tail();
        tt
    }

    /// Moves the support variables to the lowest positions, keeping their relative order.
    ///
    /// Returns the original indices of the support variables. The table keeps its number of variables; shrink it
    /// to the length of the returned vector to drop the vacuous ones.
    pub fn min_base_inplace(&mut self) -> Vec<u8> {
        let mut support = Vec::new();
        let mut next = 0;
        for var in 0..self.num_vars {
            if !self.has_var(var) {
                continue;
            }
            if next < var {
                self.swap_inplace(next, var);
            }
            #[allow(clippy::cast_possible_truncation)]
            support.push(var as u8);
            next += 1;
        }
        support
    }
}

impl Not for &TruthTable {
    type Output = TruthTable;

    fn not(self) -> TruthTable {
        let mut tt = TruthTable {
            num_vars: self.num_vars,
            words: self.words.iter().map(|word| !word).collect(),
        };
        tt.mask_tail();
        tt
    }
}

impl Not for TruthTable {
    type Output = Self;

    fn not(self) -> Self {
        !&self
    }
}

macro_rules! binary_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for &TruthTable {
            type Output = TruthTable;

            fn $method(self, rhs: &TruthTable) -> TruthTable {
                assert_eq!(self.num_vars, rhs.num_vars, "operands have different numbers of variables");
                TruthTable {
                    num_vars: self.num_vars,
                    words: self.words.iter().zip(&rhs.words).map(|(a, b)| a $op b).collect(),
                }
            }
        }

        impl $trait for TruthTable {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self {
                (&self).$method(&rhs)
            }
        }
    };
}

binary_op!(BitAnd, bitand, &);
binary_op!(BitOr, bitor, |);
binary_op!(BitXor, bitxor, ^);

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    /// Reference evaluation: the value of `tt` under `assignment`, one bit per variable.
    fn eval(tt: &TruthTable, assignment: usize) -> bool {
        tt.get_bit(assignment)
    }

    #[test]
    fn projections() {
        for num_vars in 1..=8 {
            for var in 0..num_vars {
                let tt = TruthTable::nth_var(num_vars, var);
                for m in 0..tt.num_bits() {
                    assert_eq!(eval(&tt, m), (m >> var) & 1 == 1, "x{} of {} at {}", var, num_vars, m);
                }
                assert_eq!(tt.support_mask(), 1 << var);
            }
        }
    }

    #[test]
    fn constants_and_normal_form() {
        let zero = TruthTable::new(3);
        let one = TruthTable::constant(3, true);
        assert!(zero.is_const0());
        assert!(one.is_const1());
        assert!(zero.is_normal());
        assert!(!one.is_normal());
        assert_eq!(one.count_ones(), 8);
        assert_eq!(!&one, zero);
    }

    #[test]
    fn swap_matches_reference() {
        for num_vars in 2..=8 {
            let a = TruthTable::nth_var(num_vars, 0);
            let b = TruthTable::nth_var(num_vars, num_vars - 1);
            let c = TruthTable::nth_var(num_vars, num_vars / 2);
            let f = &(&a & &!&b) ^ &c;
            for i in 0..num_vars {
                for j in 0..num_vars {
                    let mut swapped = f.clone();
                    swapped.swap_inplace(i, j);
                    for m in 0..f.num_bits() {
                        let bi = (m >> i) & 1;
                        let bj = (m >> j) & 1;
                        let partner = (m & !(1 << i) & !(1 << j)) | (bj << i) | (bi << j);
                        assert_eq!(eval(&swapped, m), eval(&f, partner), "swap({}, {}) on {} vars", i, j, num_vars);
                    }
                }
            }
        }
    }

    #[test]
    fn flip_complements_one_input() {
        for num_vars in 1..=8 {
            let f = TruthTable::maj(
                &TruthTable::nth_var(num_vars, 0),
                &TruthTable::nth_var(num_vars, num_vars - 1),
                &TruthTable::constant(num_vars, false),
            );
            for var in 0..num_vars {
                let mut flipped = f.clone();
                flipped.flip_inplace(var);
                for m in 0..f.num_bits() {
                    assert_eq!(eval(&flipped, m), eval(&f, m ^ (1 << var)));
                }
            }
        }
    }

    #[test]
    fn cofactors() {
        let x0 = TruthTable::nth_var(7, 0);
        let x6 = TruthTable::nth_var(7, 6);
        let f = &x0 & &x6;
        assert_eq!(f.cofactor1(6), x0);
        assert!(f.cofactor0(6).is_const0());
        assert_eq!(f.cofactor1(0), x6);
        assert!(f.cofactor0(0).is_const0());
    }

    #[test]
    fn extend_and_shrink() {
        let f = &TruthTable::nth_var(2, 0) ^ &TruthTable::nth_var(2, 1);
        for num_vars in 2..=9 {
            let g = f.extend_to(num_vars);
            assert_eq!(g.support_mask(), 0b11);
            for m in 0..g.num_bits() {
                assert_eq!(eval(&g, m), eval(&f, m & 3));
            }
            assert_eq!(g.shrink_to(2), f);
        }
        let c = TruthTable::constant(0, true);
        assert!(c.extend_to(7).is_const1());
    }

    #[test]
    fn min_base_moves_support_down() {
        let f = &TruthTable::nth_var(8, 1) & &TruthTable::nth_var(8, 7);
        let mut g = f.clone();
        let support = g.min_base_inplace();
        assert_eq!(support, vec![1, 7]);
        let g = g.shrink_to(2);
        assert_eq!(g, &TruthTable::nth_var(2, 0) & &TruthTable::nth_var(2, 1));
    }

    #[test]
    fn has_var_on_large_tables() {
        let f = &TruthTable::nth_var(16, 15) | &TruthTable::nth_var(16, 3);
        assert!(f.has_var(15));
        assert!(f.has_var(3));
        assert!(!f.has_var(9));
        assert_eq!(f.support_mask(), (1 << 15) | (1 << 3));
    }
}
