//! Cuts: sets of leaves that separate a node from the primary inputs.

use itertools::Itertools;

/// The largest number of leaves a cut can have.
pub const MAX_CUT_SIZE: usize = 16;

/// Tolerance used when comparing flows.
const EPSILON: f32 = 0.005;

/// Costs attached to a cut by the mapper.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CutData {
    /// Arrival time at the root when this cut is implemented as a LUT.
    pub delay: u32,
    /// Area of the LUT itself.
    pub lut_area: u32,
    /// Delay of the LUT itself.
    pub lut_delay: u32,
    /// Area flow, or exact area during exact-area rounds.
    pub area_flow: f32,
    /// Edge flow, or exact edge count during exact-area rounds.
    pub edge_flow: f32,
    /// Set when the cut's function is too complex to balance; such cuts sort last.
    pub ignore: bool,
}

/// A cut with its leaves sorted by node index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cut {
    leaves: Vec<usize>,
    signature: u64,
    /// Literal of the cut function in the truth-table cache, when functions are tracked.
    pub func_id: Option<u32>,
    /// Mapper costs.
    pub data: CutData,
}

fn signature(leaves: &[usize]) -> u64 {
    leaves.iter().fold(0, |sig, &leaf| sig | (1u64 << (leaf % 64)))
}

impl Cut {
    /// A cut over `leaves`, which must be strictly increasing.
    #[must_use]
    pub fn new(leaves: Vec<usize>) -> Self {
        assert!(leaves.len() <= MAX_CUT_SIZE, "cut with {} leaves exceeds the limit of {}", leaves.len(), MAX_CUT_SIZE);
        debug_assert!(leaves.windows(2).all(|w| w[0] < w[1]), "cut leaves are not strictly increasing: {:?}", leaves);
        Self {
            signature: signature(&leaves),
            leaves,
            func_id: None,
            data: CutData::default(),
        }
    }

    /// The cut containing only `node`.
    #[must_use]
    pub fn trivial(node: usize) -> Self {
        Self::new(vec![node])
    }

    /// The cut with no leaves, used by constants.
    #[must_use]
    pub fn constant() -> Self {
        Self::new(Vec::new())
    }

    /// The leaves, in increasing order.
    #[must_use]
    pub fn leaves(&self) -> &[usize] {
        &self.leaves
    }

    /// Replaces the leaves, keeping the costs and function.
    pub fn set_leaves(&mut self, leaves: Vec<usize>) {
        debug_assert!(leaves.windows(2).all(|w| w[0] < w[1]));
        self.signature = signature(&leaves);
        self.leaves = leaves;
    }

    /// Number of leaves.
    #[must_use]
    pub fn size(&self) -> usize {
        self.leaves.len()
    }

    /// Bloom filter of the leaves.
    #[must_use]
    pub const fn signature(&self) -> u64 {
        self.signature
    }

    /// True if this is the trivial cut of `node`.
    #[must_use]
    pub fn is_trivial_of(&self, node: usize) -> bool {
        self.leaves.len() == 1 && self.leaves[0] == node
    }

    /// The union of two cuts, or `None` if it has more than `cut_size` leaves.
    #[must_use]
    pub fn merge(&self, other: &Self, cut_size: usize) -> Option<Self> {
        if ((self.signature | other.signature).count_ones() as usize) > cut_size {
            return None;
        }
        let leaves: Vec<usize> = self.leaves.iter().merge(&other.leaves).dedup().copied().collect();
        if leaves.len() > cut_size {
            return None;
        }
        Some(Self::new(leaves))
    }

    /// True if every leaf of `self` is a leaf of `other`.
    #[must_use]
    pub fn dominates(&self, other: &Self) -> bool {
        if self.leaves.len() > other.leaves.len() || self.signature & other.signature != self.signature {
            return false;
        }
        self.leaves.iter().all(|leaf| other.leaves.binary_search(leaf).is_ok())
    }
}

/// Lexicographic cut orderings used by the mapping rounds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortOrder {
    /// Delay, size, area flow, edge flow.
    Delay,
    /// Delay, area flow, edge flow, size.
    Delay2,
    /// Area flow, delay, size.
    Area,
    /// Area flow, edge flow, size, delay.
    Area2,
}

impl SortOrder {
    /// True if `a` is strictly preferable to `b`.
    #[must_use]
    pub fn better(self, a: &Cut, b: &Cut) -> bool {
        let (da, db) = (&a.data, &b.data);
        if da.ignore != db.ignore {
            return db.ignore;
        }
        let flow = |x: f32, y: f32| {
            if x < y - EPSILON {
                Some(true)
            } else if x > y + EPSILON {
                Some(false)
            } else {
                None
            }
        };
        let exact = |x: u32, y: u32| if x == y { None } else { Some(x < y) };
        let size = exact(u32::try_from(a.size()).unwrap_or(u32::MAX), u32::try_from(b.size()).unwrap_or(u32::MAX));

        let keys = match self {
            Self::Delay => [exact(da.delay, db.delay), size, flow(da.area_flow, db.area_flow), flow(da.edge_flow, db.edge_flow)],
            Self::Delay2 => [exact(da.delay, db.delay), flow(da.area_flow, db.area_flow), flow(da.edge_flow, db.edge_flow), size],
            Self::Area => [flow(da.area_flow, db.area_flow), exact(da.delay, db.delay), size, None],
            Self::Area2 => [flow(da.area_flow, db.area_flow), flow(da.edge_flow, db.edge_flow), size, exact(da.delay, db.delay)],
        };
        keys.iter().find_map(|&key| key).unwrap_or(false)
    }
}
