//! The external layout model interface (§6).
//!
//! The Analyzer treats the layout model as an out-of-scope collaborator: it
//! only reads tiles/locos and writes back route records, block annotations,
//! and per-tile `routeids`. [`LayoutModel`] is the trait seam that
//! separates those concerns; [`InMemoryModel`] is a plain reference
//! implementation used by the CLI harness and by tests.

use std::collections::HashMap;

use crate::tile::{LocoRecord, Tile};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which end of a block a route enters or exits through (§3 GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    Plus,
    Minus,
}

impl Side {
    pub const fn as_str(self) -> &'static str {
        match self {
            Side::Plus => "+",
            Side::Minus => "-",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A switch-command child of a route record: which tile, and what
/// disposition it must be set to for this route.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SwCmd {
    pub id: String,
    pub cmd: String,
}

/// A feedback-event child appended to a block (§4.4 step f).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FbAction {
    Enter,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum FbFrom {
    All,
    AllReverse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FbEvent {
    pub id: String,
    pub action: FbAction,
    pub from: FbFrom,
}

/// A synthesized or user-edited route record (`st`, §3).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteRecord {
    pub id: String,
    pub bka: String,
    pub bkb: String,
    pub bkaside: Side,
    pub bkbside: Side,
    pub swcmds: Vec<SwCmd>,
}

impl RouteRecord {
    pub fn is_autogen(&self) -> bool {
        self.id.starts_with("autogen-")
    }

    /// Whether this record's endpoint pair (ignoring id and swcmds) matches
    /// another record's, used for both user-override detection (P5) and
    /// same-run disambiguation (§4.4 step 2c).
    pub fn same_endpoints(&self, other: &RouteRecord) -> bool {
        self.bka == other.bka
            && self.bkb == other.bkb
            && self.bkaside == other.bkaside
            && self.bkbside == other.bkbside
    }
}

/// A module's `(x, y)` offset in a modular layout; modules are always
/// folded to `z = 0` (§4.6 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModuleOffset {
    pub x: i32,
    pub y: i32,
}

/// The read/write surface the Analyzer needs from a layout model.
///
/// Implementors own the actual `lclist`/`swlist`/`sglist`/`tklist`/`fblist`/
/// `colist`/`bklist`/`seltablist`/`stlist`/`modplan` storage; the Analyzer
/// only ever sees this trait.
pub trait LayoutModel {
    /// All tiles across every kind-specific list, in the enumeration order
    /// the Facade should preserve for deterministic grid insertion (§4.1).
    fn tiles(&self) -> &[Tile];

    fn tiles_mut(&mut self) -> &mut Vec<Tile>;

    fn locos(&self) -> &[LocoRecord];

    /// Per-module `(x, y)` offset, if this layout uses a modular plan.
    fn module_offset(&self, module_id: &str) -> Option<ModuleOffset>;

    /// The existing route list (`stlist`), including user-edited records.
    fn routes(&self) -> &[RouteRecord];

    /// Replace the route list wholesale; the Route Builder always purges
    /// stale autogen routes and rebuilds the full list itself (§4.4 step 1).
    fn set_routes(&mut self, routes: Vec<RouteRecord>);

    fn tile_by_id(&self, id: &str) -> Option<&Tile> {
        self.tiles().iter().find(|t| t.id == id)
    }

    fn tile_by_id_mut(&mut self, id: &str) -> Option<&mut Tile> {
        self.tiles_mut().iter_mut().find(|t| t.id == id)
    }
}

/// A plain in-memory [`LayoutModel`], suitable for the CLI harness and for
/// tests that construct a plan directly.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InMemoryModel {
    pub tiles: Vec<Tile>,
    pub locos: Vec<LocoRecord>,
    pub module_offsets: HashMap<String, ModuleOffset>,
    pub routes: Vec<RouteRecord>,
}

impl LayoutModel for InMemoryModel {
    fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    fn tiles_mut(&mut self) -> &mut Vec<Tile> {
        &mut self.tiles
    }

    fn locos(&self) -> &[LocoRecord] {
        &self.locos
    }

    fn module_offset(&self, module_id: &str) -> Option<ModuleOffset> {
        self.module_offsets.get(module_id).copied()
    }

    fn routes(&self) -> &[RouteRecord] {
        &self.routes
    }

    fn set_routes(&mut self, routes: Vec<RouteRecord>) {
        self.routes = routes;
    }
}
