//! Track-plan health checking and route synthesis for model railroad
//! layouts: a spatial grid index, a per-tile travel transition table, a
//! recursive branch-cloning traversal driver, and the post-processing that
//! turns discovered paths into route records and block annotations.
//!
//! [`TrackPlanAnalyzer::analyze`] is the single entry point; everything
//! else in this crate is a component it orchestrates (see `facade.rs`).

pub mod diagnostics;
pub mod error;
mod facade;
pub mod grid;
pub mod health;
pub mod model;
pub mod route;
pub mod tile;
pub mod travel;
pub mod traversal;

pub use facade::{AnalysisReport, AnalyzerConfig, TrackPlanAnalyzer};
pub use route::AnalyzeMode;
