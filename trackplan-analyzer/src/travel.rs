//! Travel Function (§4.2): the per-tile transition table over
//! `(tile kind/subtype/orientation, incoming direction, turnout position)`.
//!
//! [`resolve`] is the entry point the Traversal Driver calls: it runs the
//! per-kind rule, and if the tile is branch-capable (a two-way/three-way
//! turnout entered from its points, or a double-slip/addressed crossing),
//! it enumerates every alternative turnout position and resolves each to a
//! concrete step, in ascending turnout-position order (§4.3 "deterministic
//! branch order"). Every row is transcribed from
//! `examples/original_source/rocrail/impl/analyse.c`'s `__travel` function.

use crate::tile::{
    Direction, Position, SwitchData, SwitchSubtype, Tile, TileData, TrackSubtype, TurnoutPosition,
};

/// A resolved single-cell transition: the outgoing direction and the
/// in-tile displacement (nonzero only for blocks, selection tables, and
/// crossing-family switches).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TravelStep {
    pub out_dir: Direction,
    pub dx: i32,
    pub dy: i32,
}

/// Which branch-capable category a tile belongs to, for driver bookkeeping.
/// `DCROSSING_AHEAD` (§9, `SPEC_FULL.md` §B.1) is folded into [`BranchTag::DCrossing`]:
/// both sentinels trigger identical branching behavior in the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchTag {
    TwoWay,
    ThreeWay,
    DCrossing,
}

/// Why a tile could not be entered from a given direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelHalt {
    /// The tile's orientation axis doesn't accept this travel direction.
    NotInDirection,
    /// The tile type is fundamentally incompatible with this approach
    /// (e.g. a curve with no matching row, a turnout approached from a
    /// side its points/frog geometry doesn't have).
    DeadEnd,
}

struct Outcome {
    step: TravelStep,
    branch: Option<BranchTag>,
}

/// Resolves every outgoing step from `tile` when entered along `incoming`,
/// at grid cell `entry_cell` (used only by `ccrossing`'s cell-parity sign).
///
/// Returns one `(turnout_position, step)` pair for an ordinary tile, or one
/// pair per alternative turnout position (ascending) for a branch-capable
/// tile — §4.3's "clone the trace at every branching tile".
///
/// # Errors
/// Returns [`TravelHalt`] if the tile cannot be entered from `incoming` at all.
pub fn resolve(
    tile: &Tile,
    incoming: Direction,
    entry_cell: Position,
) -> Result<Vec<(TurnoutPosition, TravelStep)>, TravelHalt> {
    let probe = travel(tile, incoming, TurnoutPosition::STRAIGHT, entry_cell)?;
    let Some(tag) = probe.branch else {
        return Ok(vec![(TurnoutPosition::STRAIGHT, probe.step)]);
    };

    let candidates = branch_candidates(tile, tag, incoming);
    let mut resolved = Vec::with_capacity(candidates.len());
    for ts in candidates {
        let outcome = travel(tile, incoming, ts, entry_cell)?;
        resolved.push((ts, outcome.step));
    }
    Ok(resolved)
}

fn branch_candidates(tile: &Tile, tag: BranchTag, incoming: Direction) -> Vec<TurnoutPosition> {
    match tag {
        BranchTag::TwoWay => vec![TurnoutPosition::STRAIGHT, TurnoutPosition::DIVERGING],
        BranchTag::ThreeWay => (0..=2).map(|v| TurnoutPosition::new(v).unwrap()).collect(),
        BranchTag::DCrossing => {
            let TileData::Switch(sw) = &tile.data else {
                unreachable!("DCrossing branch tag only arises from switch tiles")
            };
            let (a, b) = dcrossing_branch_states(tile.orientation, sw.dir, incoming);
            vec![a, b]
        }
    }
}

fn travel(
    tile: &Tile,
    incoming: Direction,
    turnout_in: TurnoutPosition,
    entry_cell: Position,
) -> Result<Outcome, TravelHalt> {
    match &tile.data {
        TileData::Track(t) if t.subtype == TrackSubtype::Curve => {
            curve_travel(tile.orientation, incoming)
        }
        TileData::Feedback(f) if f.curve => curve_travel(tile.orientation, incoming),
        TileData::Track(t) if t.subtype == TrackSubtype::Direction => {
            dir_track_travel(tile.orientation, incoming)
        }
        TileData::Track(_) | TileData::Feedback(_) | TileData::Signal(_) | TileData::Output(_) => {
            passthrough(tile.orientation, incoming)
        }
        TileData::Block(_) | TileData::SelectionTable(_) => {
            block_like_travel(tile.orientation, incoming, block_like_step(tile))
        }
        TileData::Switch(sw) => switch_travel(sw, tile.orientation, tile.position, incoming, turnout_in, entry_cell),
    }
}

fn step(out_dir: Direction, dx: i32, dy: i32) -> Outcome {
    Outcome {
        step: TravelStep { out_dir, dx, dy },
        branch: None,
    }
}

fn branching(out_dir: Direction, dx: i32, dy: i32, tag: BranchTag) -> Outcome {
    Outcome {
        step: TravelStep { out_dir, dx, dy },
        branch: Some(tag),
    }
}

/// Straight track, non-curve feedback, signals, outputs: passes through iff
/// the tile's orientation axis matches the travel axis.
fn passthrough(orientation: Direction, incoming: Direction) -> Result<Outcome, TravelHalt> {
    if orientation.axis() == incoming.axis() {
        Ok(step(incoming, 0, 0))
    } else {
        Err(TravelHalt::NotInDirection)
    }
}

/// Curves and curved feedbacks: a fixed 90° turn table, eight valid rows.
fn curve_travel(orientation: Direction, incoming: Direction) -> Result<Outcome, TravelHalt> {
    use Direction::{East, North, South, West};
    let out = match (incoming, orientation) {
        (West, North) => South,
        (West, East) => North,
        (North, West) => West,
        (North, North) => East,
        (East, West) => South,
        (East, South) => North,
        (South, East) => East,
        (South, South) => West,
        _ => return Err(TravelHalt::DeadEnd),
    };
    Ok(step(out, 0, 0))
}

/// One-way `tk/dir` track. Transcribed verbatim from the source, including
/// its asymmetric north/south pairing (`travel==north` pairs with
/// `orientation==south` and vice versa, while east/west self-pair) — an
/// original quirk, not a transcription error; see `DESIGN.md`.
fn dir_track_travel(orientation: Direction, incoming: Direction) -> Result<Outcome, TravelHalt> {
    use Direction::{East, North, South, West};
    match (incoming, orientation) {
        (North, South) | (South, North) | (West, West) | (East, East) => Ok(step(incoming, 0, 0)),
        _ => Err(TravelHalt::NotInDirection),
    }
}

/// Blocks and selection tables: pass straight through the short way, or
/// traverse the full footprint the long way. §4.2 documents the block/
/// selection-table displacement asymmetry (block: footprint - 1;
/// selection table: footprint) verbatim from the source.
fn block_like_step(tile: &Tile) -> i32 {
    let footprint = i32::try_from(tile.footprint()).unwrap_or(i32::MAX);
    match &tile.data {
        TileData::Block(_) => footprint - 1,
        TileData::SelectionTable(_) => footprint,
        _ => unreachable!("block_like_step only called for block/seltab tiles"),
    }
}

fn block_like_travel(orientation: Direction, incoming: Direction, step_len: i32) -> Result<Outcome, TravelHalt> {
    use Direction::{East, North, South, West};
    match orientation.axis() {
        crate::tile::Axis::X => match incoming {
            East => Ok(step(East, step_len, 0)),
            West => Ok(step(West, 0, 0)),
            _ => Err(TravelHalt::NotInDirection),
        },
        crate::tile::Axis::Y => match incoming {
            South => Ok(step(South, 0, step_len)),
            North => Ok(step(North, 0, 0)),
            _ => Err(TravelHalt::NotInDirection),
        },
    }
}

fn switch_travel(
    sw: &SwitchData,
    orientation: Direction,
    position: Position,
    incoming: Direction,
    turnout_in: TurnoutPosition,
    entry_cell: Position,
) -> Result<Outcome, TravelHalt> {
    match sw.subtype {
        SwitchSubtype::Decoupler => Ok(step(incoming, 0, 0)),
        SwitchSubtype::RectCrossing => Ok(step(incoming, 0, 0)),
        SwitchSubtype::Left => two_way_travel(false, orientation, incoming, turnout_in),
        SwitchSubtype::Right => two_way_travel(true, orientation, incoming, turnout_in),
        SwitchSubtype::ThreeWay => three_way_travel(orientation, incoming, turnout_in),
        SwitchSubtype::CCrossing => ccrossing_travel(orientation, position, incoming, entry_cell),
        SwitchSubtype::Crossing if sw.subtype.is_dcrossing_like(sw) => {
            dcrossing_travel(sw.dir, orientation, incoming, turnout_in)
        }
        SwitchSubtype::Crossing => crossing_travel(sw.dir, orientation, incoming),
        SwitchSubtype::DCrossing => dcrossing_travel(sw.dir, orientation, incoming, turnout_in),
    }
}

/// Two-way (left/right) turnout. `dir_is_right` distinguishes the `right`
/// subtype from `left`. Points-entry rows always branch (`TWO_WAY`); frog
/// rows (straight leg / diverging leg) are deterministic pass-throughs.
fn two_way_travel(
    dir_is_right: bool,
    orientation: Direction,
    incoming: Direction,
    turnout_in: TurnoutPosition,
) -> Result<Outcome, TravelHalt> {
    use Direction::{East, North, South, West};
    let ts = turnout_in.get();

    // Coming from the points.
    let points_row = match (incoming, orientation, dir_is_right) {
        (West, East, true) => Some(North),
        (West, West, false) => Some(South),
        (North, North, true) => Some(East),
        (North, South, false) => Some(West),
        (East, West, true) => Some(South),
        (East, East, false) => Some(North),
        (South, South, true) => Some(West),
        (South, North, false) => Some(East),
        _ => None,
    };
    if let Some(diverging) = points_row {
        let out = if ts == 1 { diverging } else { incoming };
        return Ok(branching(out, 0, 0, BranchTag::TwoWay));
    }

    // Coming from the frog, straight leg.
    let straight_frog = matches!(
        (incoming, orientation, dir_is_right),
        (West, West, true)
            | (West, East, false)
            | (North, South, true)
            | (North, North, false)
            | (East, East, true)
            | (East, West, false)
            | (South, North, true)
            | (South, South, false)
    );
    if straight_frog {
        return Ok(step(incoming, 0, 0));
    }

    // Coming from the frog, diverging leg.
    let diverging_out = match (incoming, orientation, dir_is_right) {
        (West, North, true) => Some(South),
        (West, North, false) => Some(North),
        (North, West, true) => Some(West),
        (North, West, false) => Some(East),
        (East, South, true) => Some(North),
        (East, South, false) => Some(South),
        (South, East, true) => Some(East),
        (South, East, false) => Some(West),
        _ => None,
    };
    if let Some(out) = diverging_out {
        return Ok(step(out, 0, 0));
    }

    Err(TravelHalt::DeadEnd)
}

/// Three-way turnout: `turnout_in` is center(0)/left(1)/right(2) at the
/// points; the three frog legs are each deterministic.
fn three_way_travel(
    orientation: Direction,
    incoming: Direction,
    turnout_in: TurnoutPosition,
) -> Result<Outcome, TravelHalt> {
    use Direction::{East, North, South, West};
    let ts = turnout_in.get();
    match (orientation, incoming) {
        (West, West) => Ok(branching(
            match ts {
                1 => South,
                2 => North,
                _ => West,
            },
            0,
            0,
            BranchTag::ThreeWay,
        )),
        (West, North) => Ok(step(East, 0, 0)),
        (West, East) => Ok(step(East, 0, 0)),
        (West, South) => Ok(step(East, 0, 0)),
        (North, West) => Ok(step(North, 0, 0)),
        (North, North) => Ok(step(North, 0, 0)),
        (North, East) => Ok(step(North, 0, 0)),
        (North, South) => Ok(branching(
            match ts {
                1 => East,
                2 => West,
                _ => South,
            },
            0,
            0,
            BranchTag::ThreeWay,
        )),
        (East, West) => Ok(step(West, 0, 0)),
        (East, North) => Ok(step(West, 0, 0)),
        (East, East) => Ok(branching(
            match ts {
                1 => North,
                2 => South,
                _ => East,
            },
            0,
            0,
            BranchTag::ThreeWay,
        )),
        (East, South) => Ok(step(West, 0, 0)),
        (South, West) => Ok(branching(
            match ts {
                1 => West,
                2 => East,
                _ => South,
            },
            0,
            0,
            BranchTag::ThreeWay,
        )),
        (South, North) => Ok(step(South, 0, 0)),
        (South, East) => Ok(step(South, 0, 0)),
        (South, South) => Ok(step(South, 0, 0)),
    }
}

/// Unaddressed, non-rectangular crossing / `ccrossing`'s sibling "crossing"
/// pass-through rule: always passes through, with a ±1 displacement on the
/// cross axis for specific `(orientation, dir, incoming)` combinations —
/// transcribed verbatim, including the combinations the source leaves
/// undisplaced.
fn crossing_travel(dir_is_right: bool, orientation: Direction, incoming: Direction) -> Result<Outcome, TravelHalt> {
    use Direction::{East, North, South, West};
    let on_x_axis = matches!(orientation, West | East);
    let displaced = if !dir_is_right {
        if on_x_axis {
            matches!(incoming, North | East)
        } else {
            matches!(incoming, East | South)
        }
    } else if on_x_axis {
        matches!(incoming, South | East)
    } else {
        matches!(incoming, West | South)
    };
    let (dx, dy) = if !displaced {
        (0, 0)
    } else if on_x_axis {
        (1, 0)
    } else {
        (0, 1)
    };
    Ok(step(incoming, dx, dy))
}

/// Centered crossing (`ccrossing`): passes through the secondary axis with
/// a ±1 displacement, the sign given by whether the entry cell is the
/// tile's base cell or its second cell (§4.2).
fn ccrossing_travel(
    orientation: Direction,
    position: Position,
    incoming: Direction,
    entry_cell: Position,
) -> Result<Outcome, TravelHalt> {
    use Direction::{East, North, South, West};
    let sign = if entry_cell == position { 1 } else { -1 };
    match (orientation, incoming) {
        (West | East, North | South) => Ok(step(incoming, sign, 0)),
        (North | South, West | East) => Ok(step(incoming, 0, sign)),
        _ => Err(TravelHalt::DeadEnd),
    }
}

/// Double-slip (`dcrossing`, and `crossing` with an address — §C) resolved
/// table: 32 rows (16 `left`/`isdir=false`, 16 `right`/`isdir=true`), each
/// covering exactly two valid turnout positions; any other turnout
/// position is the `DCROSSING_AHEAD` pass-through placeholder.
fn dcrossing_travel(
    dir_is_right: bool,
    orientation: Direction,
    incoming: Direction,
    turnout_in: TurnoutPosition,
) -> Result<Outcome, TravelHalt> {
    use Direction::{East, North, South, West};
    let ts = turnout_in.get();

    // (valid_ts_a, out_a, dx_a, dy_a, valid_ts_b, out_b, dx_b, dy_b)
    let row: (u8, Direction, i32, i32, u8, Direction, i32, i32) = if !dir_is_right {
        match (orientation, incoming) {
            (West, West) => (0, West, 0, 0, 2, South, 0, 0),
            (West, North) => (1, North, 1, 0, 2, East, 1, 0),
            (West, East) => (0, East, 1, 0, 3, North, 1, 0),
            (West, South) => (1, South, 0, 0, 3, West, 0, 0),
            (East, West) => (0, West, 0, 0, 3, South, 0, 0),
            (East, North) => (1, North, 1, 0, 3, East, 1, 0),
            (East, East) => (0, East, 1, 0, 2, North, 1, 0),
            (East, South) => (1, South, 0, 0, 2, West, 0, 0),
            (North, West) => (1, West, 0, 0, 2, North, 0, 0),
            (North, North) => (0, North, 0, 0, 3, West, 0, 0),
            (North, East) => (1, East, 0, 1, 3, South, 0, 1),
            (North, South) => (0, South, 0, 1, 2, East, 0, 1),
            (South, West) => (1, West, 0, 0, 3, North, 0, 0),
            (South, North) => (0, North, 0, 0, 2, West, 0, 0),
            (South, East) => (1, East, 0, 1, 2, South, 0, 1),
            (South, South) => (0, South, 0, 1, 3, East, 0, 1),
        }
    } else {
        match (orientation, incoming) {
            (West, West) => (0, West, 0, 0, 3, North, 0, 0),
            (West, North) => (1, North, 0, 0, 2, West, 0, 0),
            (West, East) => (0, East, 1, 0, 2, South, 1, 0),
            (West, South) => (1, South, 1, 0, 3, East, 1, 0),
            (East, West) => (0, West, 0, 0, 2, North, 0, 0),
            (East, North) => (1, North, 0, 0, 3, West, 0, 0),
            (East, East) => (0, East, 1, 0, 3, South, 1, 0),
            (East, South) => (1, South, 1, 0, 2, East, 1, 0),
            (North, West) => (1, West, 0, 1, 2, South, 0, 1),
            (North, North) => (0, North, 0, 0, 2, East, 0, 0),
            (North, East) => (1, East, 0, 0, 3, North, 0, 0),
            (North, South) => (0, South, 0, 1, 3, West, 0, 1),
            (South, West) => (1, West, 0, 1, 3, South, 0, 1),
            (South, North) => (0, North, 0, 0, 3, East, 0, 0),
            (South, East) => (1, East, 0, 0, 2, North, 0, 0),
            (South, South) => (0, South, 0, 1, 2, West, 0, 1),
        }
    };

    let (ts_a, out_a, dx_a, dy_a, ts_b, out_b, dx_b, dy_b) = row;
    if ts == ts_a {
        Ok(branching(out_a, dx_a, dy_a, BranchTag::DCrossing))
    } else if ts == ts_b {
        Ok(branching(out_b, dx_b, dy_b, BranchTag::DCrossing))
    } else {
        // DCROSSING_AHEAD: pass-through placeholder, §4.2.
        Ok(branching(incoming, 0, 0, BranchTag::DCrossing))
    }
}

/// The `(state_a, state_b)` pair of turnout positions to explore when a
/// trace reaches a `dcrossing`/addressed-`crossing` tile, indexed by
/// `orientation * 4 + travel` — transcribed verbatim from `analyse.c`
/// lines ~1547-1566 (`SPEC_FULL.md` §B.3). Distinct from, and feeding,
/// [`dcrossing_travel`]'s per-state resolution table.
fn dcrossing_branch_states(
    orientation: Direction,
    dir_is_right: bool,
    travel: Direction,
) -> (TurnoutPosition, TurnoutPosition) {
    const LEFT: [(u8, u8); 16] = [
        (0, 2),
        (1, 2),
        (0, 3),
        (1, 3),
        (1, 2),
        (0, 3),
        (1, 3),
        (0, 2),
        (0, 3),
        (1, 3),
        (0, 2),
        (1, 2),
        (1, 3),
        (0, 2),
        (1, 2),
        (0, 3),
    ];
    const RIGHT: [(u8, u8); 16] = [
        (0, 3),
        (1, 2),
        (0, 2),
        (1, 3),
        (1, 2),
        (0, 2),
        (1, 3),
        (0, 3),
        (0, 2),
        (1, 3),
        (0, 3),
        (1, 2),
        (1, 3),
        (0, 3),
        (1, 2),
        (0, 2),
    ];
    let idx = orientation.index() * 4 + travel.index();
    let (a, b) = if dir_is_right { RIGHT[idx] } else { LEFT[idx] };
    (TurnoutPosition::new(a).unwrap(), TurnoutPosition::new(b).unwrap())
}

/// Whether a connector oriented `orientation`, approached while traveling
/// `travel`, is being exited through its far (teleporting) side (§4.2).
pub fn connector_exits(orientation: Direction, travel: Direction) -> bool {
    use Direction::{East, North, South, West};
    matches!(
        (orientation, travel),
        (West, East) | (North, North) | (East, West) | (South, South)
    )
}

/// Whether `orientation` faces into the direction of `travel` — used for
/// block/selection-table `+`/`-` disposition, signal "facing" checks, and
/// the connector counterpart-scan match test (all three reuse this exact
/// predicate in the source).
pub fn facing_travel(orientation: Direction, travel: Direction) -> bool {
    use Direction::{East, North, South, West};
    matches!(
        (orientation, travel),
        (West, West) | (North, South) | (East, East) | (South, North)
    )
}
