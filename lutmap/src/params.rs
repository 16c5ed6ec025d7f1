//! Mapping parameters and statistics.

use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::cut::MAX_CUT_SIZE;
use crate::cut_set::MAX_CUT_NUM;
use crate::error::{Error, Result};

/// Controls cut enumeration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutEnumerationParams {
    /// Maximum number of leaves per cut, and thus the LUT size.
    pub cut_size: u32,
    /// Maximum number of cuts kept per node, not counting the trivial cut.
    pub cut_limit: u32,
    /// Nodes with more fanins than this only get their structural cut.
    pub fanin_limit: u32,
    /// Drop vacuous leaves from cuts when functions are tracked.
    pub minimize_truth_table: bool,
}

impl Default for CutEnumerationParams {
    fn default() -> Self {
        Self {
            cut_size: 6,
            cut_limit: 8,
            fanin_limit: 10,
            minimize_truth_table: true,
        }
    }
}

/// Controls the mapping rounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct LutMapParams {
    /// Cut enumeration parameters.
    pub cut_enumeration: CutEnumerationParams,
    /// Optimise area only, ignoring delay.
    pub area_oriented_mapping: bool,
    /// Target delay; zero means the best achievable delay.
    pub required_delay: u32,
    /// Percentage by which the best delay is relaxed when no target is given.
    pub relax_required: u32,
    /// Enumerate cuts again in every round instead of re-scoring the existing ones.
    pub recompute_cuts: bool,
    /// Number of area-sharing rounds.
    pub area_share_rounds: u32,
    /// Number of area-flow rounds.
    pub area_flow_rounds: u32,
    /// Number of exact-local-area rounds.
    pub ela_rounds: u32,
    /// Include edge counts in the cost of a cut.
    pub edge_optimization: bool,
    /// Try to reduce the area of chosen cuts by moving their leaves.
    pub cut_expansion: bool,
    /// Discard cuts that are supersets of other cuts.
    pub remove_dominated_cuts: bool,
    /// In-place only: map every maximum fanout-free cone to one cell.
    pub collapse_mffcs: bool,
    /// Estimate LUT delay from a balanced sum of products; needs tracked functions.
    pub sop_balancing: bool,
    /// Estimate LUT delay from a balanced exclusive sum of products; needs tracked functions.
    pub esop_balancing: bool,
    /// Cache costs of functions with at most this many inputs.
    pub cost_cache_vars: u32,
    /// Report statistics through the logger when mapping finishes.
    pub verbose: bool,
}

impl Default for LutMapParams {
    fn default() -> Self {
        Self {
            cut_enumeration: CutEnumerationParams::default(),
            area_oriented_mapping: false,
            required_delay: 0,
            relax_required: 0,
            recompute_cuts: true,
            area_share_rounds: 2,
            area_flow_rounds: 1,
            ela_rounds: 2,
            edge_optimization: true,
            cut_expansion: true,
            remove_dominated_cuts: true,
            collapse_mffcs: false,
            sop_balancing: false,
            esop_balancing: false,
            cost_cache_vars: 3,
            verbose: false,
        }
    }
}

impl LutMapParams {
    /// Checks that the parameters are within the limits of the mapper.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParams`] for a cut size outside `1..=16` or a cut limit outside `1..32`.
    pub fn validate(&self) -> Result<()> {
        let ce = &self.cut_enumeration;
        if ce.cut_size == 0 || ce.cut_size as usize > MAX_CUT_SIZE {
            return Err(Error::InvalidParams(format!(
                "cut size {} is outside 1..={}",
                ce.cut_size, MAX_CUT_SIZE
            )));
        }
        if ce.cut_limit == 0 || ce.cut_limit as usize >= MAX_CUT_NUM {
            return Err(Error::InvalidParams(format!(
                "cut limit {} is outside 1..{}",
                ce.cut_limit, MAX_CUT_NUM
            )));
        }
        Ok(())
    }

    /// True if either balancing estimator is enabled.
    #[must_use]
    pub const fn balancing(&self) -> bool {
        self.sop_balancing || self.esop_balancing
    }

    /// The parameters the mapper actually runs with.
    ///
    /// Balancing estimates delay only, so it switches off the options that would re-map for area.
    #[must_use]
    pub fn effective(&self) -> Self {
        let mut ps = self.clone();
        if ps.balancing() {
            ps.area_oriented_mapping = false;
            ps.recompute_cuts = false;
            ps.area_share_rounds = 0;
            ps.edge_optimization = false;
            ps.cut_expansion = false;
        }
        ps
    }
}

/// Results of a mapping run.
#[derive(Clone, Debug, Default)]
pub struct LutMapStats {
    /// Total LUT area.
    pub area: u32,
    /// Depth in LUT delay units.
    pub delay: u32,
    /// Total LUT fanin edges.
    pub edges: u32,
    /// Cuts enumerated in the last round.
    pub cuts_total: u32,
    /// One line per mapping round.
    pub round_stats: Vec<String>,
    /// Wall-clock time of the whole run.
    pub time_total: Duration,
}

impl LutMapStats {
    /// Logs the per-round lines and the totals.
    pub fn report(&self) {
        for line in &self.round_stats {
            info!("{}", line);
        }
        info!("Area = {}  Delay = {}  Edges = {}", self.area, self.delay, self.edges);
        info!("Total runtime = {:>5.2} secs", self.time_total.as_secs_f64());
    }
}
