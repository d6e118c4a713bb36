//! Fallible-constructor error types.
//!
//! `analyze()` itself never fails (see [`crate::TrackPlanAnalyzer::analyze`]);
//! these errors are for malformed inputs discovered while building the
//! in-memory data model the Analyzer operates on, not for anything
//! discovered during analysis (those become [`crate::diagnostics::Diagnostic`]s
//! instead).

use thiserror::Error;

/// A turnout position outside the valid `0..=3` range was supplied.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("turnout position {0} is out of range (expected 0..=3)")]
pub struct InvalidTurnoutPositionError(pub u8);

/// A tile could not be constructed because its attributes are inconsistent
/// with its kind (e.g. a selection table with a zero track count).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidTileError {
    #[error("tile {id:?} has an empty id")]
    EmptyId { id: String },
    #[error("selection table {id:?} has a zero track count")]
    ZeroTrackCount { id: String },
    #[error("signal or output {id:?} has a zero aspect count")]
    ZeroAspectCount { id: String },
}
