//! The tile data model (§3): positions, orientations, and the kind-specific
//! tile records the Grid Index and Travel Function operate over.

use std::fmt;

use crate::error::{InvalidTileError, InvalidTurnoutPositionError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of the four compass directions a tile can face or be traveled in.
///
/// The discriminants match the original analyzer's literal encoding
/// (`west=0, north=1, east=2, south=3`) so that any table indexed by
/// `orientation * 4 + direction` reads the same way here as it did there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum Direction {
    #[default]
    West = 0,
    North = 1,
    East = 2,
    South = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::West,
        Direction::North,
        Direction::East,
        Direction::South,
    ];

    /// `(dx, dy)` of moving one cell in this direction.
    pub const fn unit_vector(self) -> (i32, i32) {
        match self {
            Direction::West => (-1, 0),
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
        }
    }

    pub const fn opposite(self) -> Direction {
        match self {
            Direction::West => Direction::East,
            Direction::East => Direction::West,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
        }
    }

    pub const fn axis(self) -> Axis {
        match self {
            Direction::West | Direction::East => Axis::X,
            Direction::North | Direction::South => Axis::Y,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::West => "west",
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
        })
    }
}

/// The axis a [`Direction`] lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Integer grid coordinates. `z` is the layer; modular layouts fold every
/// module to `z = 0` after applying its `(x, y)` offset (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Position { x, y, z }
    }

    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Position {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z,
        }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.unit_vector();
        self.translate(dx, dy)
    }
}

/// The position a turnout is set to, `0..=3`. Two-way switches only ever use
/// `0`/`1`; three-way and double-slip switches use the full range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TurnoutPosition(u8);

impl TurnoutPosition {
    pub const STRAIGHT: TurnoutPosition = TurnoutPosition(0);
    pub const DIVERGING: TurnoutPosition = TurnoutPosition(1);

    /// # Errors
    /// Returns an error if `value` is greater than 3.
    pub fn new(value: u8) -> Result<Self, InvalidTurnoutPositionError> {
        if value <= 3 {
            Ok(TurnoutPosition(value))
        } else {
            Err(InvalidTurnoutPositionError(value))
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

/// An addressed endpoint (bus/address/port/interface tuple) used for the
/// duplicate-address checks in the Health Checker (§4.5).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Address {
    pub bus: u16,
    pub address: u16,
    pub port: u16,
    pub gate: u16,
    pub interface: String,
}

/// Accumulates the route ids a tile participates in (§4.4 step 3).
///
/// Only track, feedback, and signal tiles carry one of these; switches and
/// blocks express their route membership purely through `swcmd` entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteIds(Vec<String>);

impl RouteIds {
    pub fn add(&mut self, id: &str) {
        if !self.0.iter().any(|existing| existing == id) {
            self.0.push(id.to_string());
        }
    }

    /// Drops every id beginning with `autogen-`, for clean mode (§4.4 step 3).
    pub fn retain_user_routes(&mut self) {
        self.0.retain(|id| !id.starts_with("autogen-"));
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|existing| existing == id)
    }
}

impl fmt::Display for RouteIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

/// Subtype of a switch tile, mirroring the GLOSSARY's switch-kind list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SwitchSubtype {
    Left,
    Right,
    ThreeWay,
    Crossing,
    DCrossing,
    CCrossing,
    RectCrossing,
    Decoupler,
}

impl SwitchSubtype {
    /// Whether traversal through this switch follows the dcrossing 4-state
    /// double-slip table: true for `dcrossing` always, and for `crossing`
    /// only when it carries a secondary address (§9 Open Question, resolved
    /// in `SPEC_FULL.md` §C).
    pub fn is_dcrossing_like(self, switch: &SwitchData) -> bool {
        self == SwitchSubtype::DCrossing
            || (self == SwitchSubtype::Crossing
                && (switch.addr1 != 0 || switch.port1 != 0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SwitchData {
    pub subtype: SwitchSubtype,
    /// The `isdir` bit: selects which of the two points-entry legs this
    /// two-way turnout occupies, and which dcrossing branch-selection row
    /// applies.
    pub dir: bool,
    pub addr1: u16,
    pub port1: u16,
    pub gate1: u16,
    pub addr2: u16,
    pub port2: u16,
    pub gate2: u16,
    pub interface: String,
    /// Written back by the Facade's occ-list post-processing in strict mode.
    pub block_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TrackSubtype {
    Straight,
    Curve,
    Direction,
    Connector,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackData {
    pub subtype: TrackSubtype,
    /// Only meaningful for `Connector`.
    pub counterpart_id: Option<String>,
    pub route_ids: RouteIds,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlockData {
    /// 2 cells instead of the usual 4.
    pub small_symbol: bool,
    pub signal: Option<String>,
    pub signal_r: Option<String>,
    pub wsignal: Option<String>,
    pub wsignal_r: Option<String>,
    /// `fbevent` children synthesized by the Route Builder when feedback
    /// event generation is enabled (§4.4 step f).
    pub fb_events: Vec<crate::model::FbEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SelectionTableData {
    pub track_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SignalKind {
    Main,
    Distant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SignalData {
    pub kind: SignalKind,
    pub aspects: Vec<Address>,
    pub block_id: Option<String>,
    pub route_ids: RouteIds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeedbackData {
    /// Feedbacks are a curve (turn the travel direction) or a straight
    /// pass-through, matching the optional curve flag in the GLOSSARY.
    pub curve: bool,
    pub bus: u16,
    pub address: u16,
    pub interface: String,
    pub block_id: Option<String>,
    pub route_ids: RouteIds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OutputData {
    pub aspects: Vec<Address>,
}

/// The kind-specific payload of a [`Tile`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind"))]
pub enum TileData {
    Track(TrackData),
    Switch(SwitchData),
    Block(BlockData),
    SelectionTable(SelectionTableData),
    Signal(SignalData),
    Feedback(FeedbackData),
    Output(OutputData),
}

impl TileData {
    pub fn kind_name(&self) -> &'static str {
        match self {
            TileData::Track(_) => "track",
            TileData::Switch(_) => "switch",
            TileData::Block(_) => "block",
            TileData::SelectionTable(_) => "seltab",
            TileData::Signal(_) => "signal",
            TileData::Feedback(_) => "feedback",
            TileData::Output(_) => "output",
        }
    }
}

/// A single addressable element of a track plan.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tile {
    pub id: String,
    pub orientation: Direction,
    pub position: Position,
    pub data: TileData,
    /// Which module this tile belongs to in a modular layout, if any. The
    /// Facade resolves this to an `(x, y)` offset before grid indexing
    /// (§4.6 step 2); a tile with no module is placed at its raw position.
    pub module_id: Option<String>,
}

impl Tile {
    /// # Errors
    /// Returns an error if the tile's id is empty, or if kind-specific
    /// attributes are inconsistent (zero track/aspect count).
    pub fn new(
        id: impl Into<String>,
        orientation: Direction,
        position: Position,
        data: TileData,
    ) -> Result<Self, InvalidTileError> {
        let id = id.into();
        if id.is_empty() {
            return Err(InvalidTileError::EmptyId { id });
        }
        if let TileData::SelectionTable(ref s) = data {
            if s.track_count == 0 {
                return Err(InvalidTileError::ZeroTrackCount { id });
            }
        }
        if let TileData::Signal(ref s) = data {
            if s.aspects.is_empty() {
                return Err(InvalidTileError::ZeroAspectCount { id });
            }
        }
        if let TileData::Output(ref o) = data {
            if o.aspects.is_empty() {
                return Err(InvalidTileError::ZeroAspectCount { id });
            }
        }
        Ok(Tile {
            id,
            orientation,
            position,
            data,
            module_id: None,
        })
    }

    /// Builder-style setter for [`Tile::module_id`].
    pub fn with_module(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = Some(module_id.into());
        self
    }

    /// Number of cells this tile occupies along its orientation axis,
    /// starting from its base `position` (§4.1).
    pub fn footprint(&self) -> u32 {
        match &self.data {
            TileData::Block(b) => {
                if b.small_symbol {
                    2
                } else {
                    4
                }
            }
            TileData::SelectionTable(s) => s.track_count,
            TileData::Switch(s)
                if matches!(
                    s.subtype,
                    SwitchSubtype::Crossing
                        | SwitchSubtype::DCrossing
                        | SwitchSubtype::CCrossing
                ) =>
            {
                2
            }
            _ => 1,
        }
    }
}

/// A loco record from `lclist`. Locos are not placed on the grid; they are
/// only subject to the Health Checker's address checks.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LocoRecord {
    pub id: String,
    pub protocol: LocoProtocol,
    pub address: u16,
}

/// The loco's command protocol. `Analog` is the sentinel that exempts a
/// zero address from the "no address" health check (§4.5, §B.9).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LocoProtocol {
    Analog,
    /// Any digital command station protocol (DCC, Motorola, Selectrix, ...),
    /// carried through from the model as-is; the Analyzer only ever tests
    /// for the analog sentinel.
    Digital(String),
}
