//! Technology mapping of boolean logic networks into k-input lookup tables.
//!
//! A k-input lookup table (LUT) can implement any boolean function of up to k inputs, so mapping a gate-level
//! network to LUTs is a matter of covering it with cones of at most k leaves each. The cone of a node bounded by
//! its leaves is a *cut*, and the mapper chooses one cut per used node so that every leaf of a chosen cut is
//! itself the root of a chosen cut, an input or a constant.
//!
//! The mapper works in rounds over a topologically-ordered network:
//! - Delay rounds enumerate a bounded set of priority cuts per node and choose cuts of minimal depth.
//! - Required times derived from the achieved depth then bound area-recovery rounds, which rank cuts by
//!   *area flow* (LUT area shared out among estimated fanouts) and by *exact local area* (the area a cut would
//!   add to the current cover).
//! - Cut expansion and area-sharing rounds rework chosen cuts towards leaves that are already in the cover.
//!
//! Networks are anything implementing [`traits::Network`]; [`logic::LogicNetwork`] is a simple AND/XOR/majority
//! network that can be read from AIGER. The result is either a fresh [`lut_network::LutNetwork`] or a
//! [`mapping::Mapping`] annotating the original network.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod cost;
pub mod cut;
pub mod cut_set;
pub mod error;
pub mod logic;
pub mod lut_network;
pub mod map;
pub mod mapping;
pub mod params;
pub mod sop;
pub mod traits;
pub mod truth_table;
pub mod tt_cache;

mod map_balance;
mod map_cuts;
mod map_emit;
mod map_refs;

pub use error::{Error, Result};
pub use map::{lut_map, lut_map_inplace, lut_map_inplace_with, lut_map_with, LutMapper};
