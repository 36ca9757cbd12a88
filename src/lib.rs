//! Kremlin trace planner.
//!
//! Reads a Kremlin region profile and recommends which regions (functions,
//! loops, loop bodies) to run in parallel to maximize the estimated speedup on
//! a target machine. It only estimates; nothing is executed.
//!
//! # Primary Usage
//!
//! ```ignore
//! use kremlin_planner::cost::{PlainModel, Target};
//! use kremlin_planner::forest::RegionForest;
//! use kremlin_planner::planner::{non_doall_set, DpPlanner};
//! use kremlin_planner::regions::StaticRegionTable;
//!
//! let table = StaticRegionTable::load("sregions.txt")?;
//! let records = kremlin_planner::trace::decode("kremlin.bin")?;
//! let forest = RegionForest::build(&table, records)?;
//!
//! let model = PlainModel::new(Target::new(8, 100));
//! let plan = DpPlanner::new(&forest, &model).plan(&non_doall_set(&forest))?;
//! ```
//!
//! # Architecture
//!
//! - [`regions`] - Static region and call-site descriptors
//! - [`trace`] - Binary trace records, decoder and encoder
//! - [`forest`] - Region tree reconstruction and recursion weights
//! - [`cost`] - Target description and cost models
//! - [`planner`] - Bottom-up planner, exclusion filters and plans
//! - [`report`] - Text rendering of plans
//! - [`core`] - Errors and text-table parsing

pub mod core;
pub mod cost;
pub mod forest;
pub mod planner;
pub mod regions;
pub mod report;
pub mod trace;

pub use crate::core::{PlanError, PlanResult};
pub use crate::cost::{CostModel, Target};
pub use crate::forest::{NodeId, RegionForest, RegionNode};
pub use crate::planner::{DpPlanner, Plan, PlanEntry};
pub use crate::regions::{StaticRegion, StaticRegionTable};
