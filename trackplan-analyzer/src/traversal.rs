//! Traversal Driver (§4.3): the recursive cell-to-cell walk that discovers
//! every route between blocks, grounded in `analyse.c`'s `__analyseItem`,
//! `__analyseBlock`, and `__analyseBehindConnector`.

use crate::grid::GridIndex;
use crate::model::{LayoutModel, Side};
use crate::tile::{Direction, Position, SignalKind, Tile, TileData, TrackSubtype, TurnoutPosition};
use crate::travel::{self, TravelHalt};

/// A single non-block tile crossed between a route's two blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    pub tile_id: String,
    pub kind: &'static str,
    pub turnout_in: TurnoutPosition,
    /// The direction being traveled when this tile was entered — needed to
    /// tell whether a signal step was facing (§4.4 step e; `analyse.c`'s
    /// `sg`/`"yes"` state is computed from this same value).
    pub travel_in: Direction,
}

/// The first facing signal found beyond an end block, plus every feedback
/// sensor passed on the way there (§4.4 step f; `__analyseBehindConnector`'s
/// continuation after `__analyseBlock` finds its target block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeyondSignal {
    pub signal_id: String,
    pub signal_kind: SignalKind,
    pub feedback_ids: Vec<String>,
    /// Non-branching switches (decouplers, unaddressed crossings) passed
    /// through on the way to `signal_id`.
    pub switch_ids: Vec<String>,
}

/// One discovered path from a start block's side to another block's side.
/// [`crate::route`] turns these into the final [`crate::model::RouteRecord`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCandidate {
    pub start_block_id: String,
    pub start_side: Side,
    pub end_block_id: String,
    pub end_side: Side,
    pub steps: Vec<TraceStep>,
    /// The trace ends because it reached a facing signal rather than
    /// because the recursion ran out of track (§9, §B.5).
    pub ends_on_signal: bool,
    /// The first facing signal found beyond the end block, if any —
    /// used for feedback-event generation (§4.4 step f), gated by
    /// `ends_on_signal` rather than a block attribute classification: the
    /// original only classifies a block's entry-signal from a facing signal
    /// found *before* reaching the other end's block (see `route.rs`).
    pub beyond_signal: Option<BeyondSignal>,
}

/// `+`/`-` side classification for a block entered/exited traveling
/// `dir`: the original's plain per-item state rule (`itemori == west &&
/// travel == west -> "+"`, ...), i.e. [`travel::facing_travel`] directly.
/// Used for the *starting* block, which is classified by the direction the
/// walk departs it in.
fn side_for_departure(orientation: Direction, dir: Direction) -> Side {
    if travel::facing_travel(orientation, dir) {
        Side::Plus
    } else {
        Side::Minus
    }
}

/// `+`/`-` side classification for a block *arrived at* while traveling
/// `travel_in`: the original's block-arrival rule (`nextitemori == west &&
/// travel == east -> "+"`, ...), which is [`travel::facing_travel`] against
/// the *opposite* of the arrival direction (§4.3, `analyse.c` lines
/// ~1464-1473 vs. ~1250-1260).
fn side_for_arrival(orientation: Direction, travel_in: Direction) -> Side {
    side_for_departure(orientation, travel_in.opposite())
}

/// Walks outward from `start_block` along `start_dir`, returning every
/// route reaching another block (§4.3's "algorithm/termination/branch
/// order/output").
pub fn traverse_from_block(
    grid: &GridIndex,
    model: &dyn LayoutModel,
    start_block: &Tile,
    start_dir: Direction,
    max_depth: u32,
    connector_scan_bound: u32,
) -> Vec<RouteCandidate> {
    let mut results = Vec::new();
    // The block itself is consulted through `travel::resolve` too: a
    // multi-cell block's far exit lands `footprint - 1` cells ahead, not
    // one (`__analyseItem` calls `__travel` on the starting block exactly
    // like any other tile before the walk proper begins).
    let Ok(branches) = travel::resolve(start_block, start_dir, start_block.position) else {
        return results;
    };
    let start_side = side_for_departure(start_block.orientation, start_dir);
    for (_, step) in branches {
        let mut trace = Vec::new();
        let mut visited = vec![start_block.id.clone()];
        let (next_pos, next_dir) = next_position(grid, model, start_block, start_block.position, step, connector_scan_bound);
        walk(
            grid,
            model,
            next_pos,
            next_dir,
            TurnoutPosition::STRAIGHT,
            0,
            max_depth,
            connector_scan_bound,
            &mut visited,
            &mut trace,
            &start_block.id,
            start_side,
            &mut results,
        );
    }
    results
}

#[allow(clippy::too_many_arguments)]
fn walk(
    grid: &GridIndex,
    model: &dyn LayoutModel,
    position: Position,
    travel_in: Direction,
    turnout_in: TurnoutPosition,
    depth: u32,
    max_depth: u32,
    connector_scan_bound: u32,
    visited: &mut Vec<String>,
    trace: &mut Vec<TraceStep>,
    start_block_id: &str,
    start_side: Side,
    results: &mut Vec<RouteCandidate>,
) {
    if depth > max_depth {
        return;
    }
    let Some(tile) = grid.get_position(position) else {
        return;
    };

    let is_switch = matches!(tile.data, TileData::Switch(_));
    let is_block = matches!(tile.data, TileData::Block(_) | TileData::SelectionTable(_));

    // Evil-loop guard (§B.4): never for switches or blocks.
    if !is_switch && !is_block && visited.contains(&tile.id) {
        return;
    }
    visited.push(tile.id.clone());

    let entry_cell = position;
    let branches = match travel::resolve(tile, travel_in, entry_cell) {
        Ok(branches) => branches,
        Err(TravelHalt::NotInDirection | TravelHalt::DeadEnd) => return,
    };

    for (ts, step) in branches {
        let mut trace = trace.clone();
        let mut visited = visited.clone();

        if is_block && tile.id != start_block_id {
            let end_side = side_for_arrival(tile.orientation, travel_in);
            let beyond = find_beyond_signal(
                grid,
                model,
                position.translate(step.dx, step.dy),
                step.out_dir,
                connector_scan_bound,
            );
            let candidate = RouteCandidate {
                start_block_id: start_block_id.to_string(),
                start_side,
                end_block_id: tile.id.clone(),
                end_side,
                steps: trace.clone(),
                ends_on_signal: beyond.is_some(),
                beyond_signal: beyond,
            };
            results.push(candidate);

            // Traversal stops at the first block reached; post-block
            // exploration for the trailing signal is handled entirely by
            // `find_beyond_signal` (§B.5), not by continuing the branching
            // recursion. The block itself does not get added to `trace`
            // (blocks bound routes, they don't appear inside them, §3 I2).
            continue;
        }

        if !is_switch && !is_block {
            trace.push(TraceStep {
                tile_id: tile.id.clone(),
                kind: tile.data.kind_name(),
                turnout_in: ts,
                travel_in,
            });
        } else if is_switch {
            trace.push(TraceStep {
                tile_id: tile.id.clone(),
                kind: "switch",
                turnout_in: ts,
                travel_in,
            });
        }

        let (next_pos, next_dir) = next_position(grid, model, tile, position, step, connector_scan_bound);
        walk(
            grid,
            model,
            next_pos,
            next_dir,
            ts,
            depth + 1,
            max_depth,
            connector_scan_bound,
            &mut visited,
            &mut trace,
            start_block_id,
            start_side,
            results,
        );
    }
}

/// Resolves where travel continues after `tile`: the ordinary cell the
/// step's displacement lands on, unless `tile` is a connector exiting
/// through its far side, in which case its counterpart (§B and §4.2).
fn next_position(
    grid: &GridIndex,
    model: &dyn LayoutModel,
    tile: &Tile,
    position: Position,
    step: travel::TravelStep,
    connector_scan_bound: u32,
) -> (Position, Direction) {
    if let TileData::Track(t) = &tile.data {
        if t.subtype == TrackSubtype::Connector && travel::connector_exits(tile.orientation, step.out_dir) {
            if let Some(target) = connector_counterpart(grid, model, tile, step.out_dir, connector_scan_bound) {
                return (target, step.out_dir);
            }
        }
    }
    (position.translate(step.dx, step.dy).step(step.out_dir), step.out_dir)
}

/// A connector's counterpart: its named counterpart tile if one is
/// configured, else the nearest complementary-oriented connector within
/// `scan_bound` cells ahead (§9, `__analyseBehindConnector`).
fn connector_counterpart(
    grid: &GridIndex,
    model: &dyn LayoutModel,
    tile: &Tile,
    travel_dir: Direction,
    scan_bound: u32,
) -> Option<Position> {
    if let TileData::Track(t) = &tile.data {
        if let Some(counterpart_id) = &t.counterpart_id {
            return model.tile_by_id(counterpart_id).map(|c| c.position);
        }
    }
    let mut cursor = tile.position;
    for _ in 0..scan_bound {
        cursor = cursor.step(travel_dir);
        if let Some(candidate) = grid.get_position(cursor) {
            if let TileData::Track(ct) = &candidate.data {
                if ct.subtype == TrackSubtype::Connector && travel::facing_travel(candidate.orientation, travel_dir) {
                    return Some(candidate.position);
                }
            }
        }
    }
    None
}

/// Looks ahead from just beyond an end block for the first facing signal
/// ("behind-a-block mode", §4.3/§B.5), used to classify that block's
/// entry-signal attribute (§4.4 step e). Stops — finding nothing — at the
/// first switch that could actually branch (two-way, three-way, or a
/// dcrossing-like crossing: any switch `travel::resolve` reports more than
/// one candidate for), at another block, or at a dead end; passes straight
/// through non-branching tiles (decouplers, unaddressed crossings, plain
/// track) since `__analyseBehindConnector`'s caller aborts the search as
/// soon as `travelp > 10 && behindABlock`, i.e. as soon as the next tile's
/// travel result carries a branch sentinel at all. The evil-loop guard
/// applies here too, excluding switches and blocks from the check (§B.4).
fn find_beyond_signal(
    grid: &GridIndex,
    model: &dyn LayoutModel,
    mut position: Position,
    mut travel_dir: Direction,
    connector_scan_bound: u32,
) -> Option<BeyondSignal> {
    let mut visited: Vec<String> = Vec::new();
    let mut feedback_ids = Vec::new();
    let mut switch_ids = Vec::new();
    for _ in 0..32 {
        let tile = grid.get_position(position)?;
        if let TileData::Feedback(_) = &tile.data {
            feedback_ids.push(tile.id.clone());
        }
        if let TileData::Signal(sig) = &tile.data {
            if travel::facing_travel(tile.orientation, travel_dir) {
                return Some(BeyondSignal {
                    signal_id: tile.id.clone(),
                    signal_kind: sig.kind,
                    feedback_ids,
                    switch_ids,
                });
            }
        }
        if matches!(tile.data, TileData::Block(_) | TileData::SelectionTable(_)) {
            return None;
        }
        let is_switch = matches!(tile.data, TileData::Switch(_));
        if !is_switch && visited.contains(&tile.id) {
            return None;
        }
        visited.push(tile.id.clone());
        if is_switch {
            switch_ids.push(tile.id.clone());
        }

        let resolved = travel::resolve(tile, travel_dir, position).ok()?;
        if is_switch && resolved.len() > 1 {
            return None;
        }
        let (_, step) = resolved.into_iter().next()?;
        let (next_pos, next_dir) = next_position(grid, model, tile, position, step, connector_scan_bound);
        position = next_pos;
        travel_dir = next_dir;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InMemoryModel;
    use crate::tile::{BlockData, RouteIds, TrackData};

    fn track(id: &str, orientation: Direction, pos: Position) -> Tile {
        Tile::new(
            id,
            orientation,
            pos,
            TileData::Track(TrackData {
                subtype: TrackSubtype::Straight,
                counterpart_id: None,
                route_ids: RouteIds::default(),
            }),
        )
        .unwrap()
    }

    fn block(id: &str, orientation: Direction, pos: Position) -> Tile {
        Tile::new(
            id,
            orientation,
            pos,
            TileData::Block(BlockData {
                small_symbol: false,
                signal: None,
                signal_r: None,
                wsignal: None,
                wsignal_r: None,
                fb_events: Vec::new(),
            }),
        )
        .unwrap()
    }

    #[test]
    fn straight_line_between_two_blocks_is_found() {
        let mut grid = GridIndex::new();
        let a = block("A", Direction::West, Position::new(0, 0, 0));
        // A occupies x=0..4; a straight track at x=4, then block B at x=5.
        grid.add_tile(a.clone());
        grid.add_tile(track("t1", Direction::West, Position::new(4, 0, 0)));
        let b = block("B", Direction::West, Position::new(5, 0, 0));
        grid.add_tile(b);

        let model = InMemoryModel::default();
        let routes = traverse_from_block(&grid, &model, &a, Direction::East, 100, 10);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].start_block_id, "A");
        assert_eq!(routes[0].end_block_id, "B");
        assert_eq!(routes[0].steps.len(), 1);
        assert_eq!(routes[0].steps[0].tile_id, "t1");
    }

    #[test]
    fn dead_end_yields_no_routes() {
        let mut grid = GridIndex::new();
        let a = block("A", Direction::West, Position::new(0, 0, 0));
        grid.add_tile(a.clone());
        let model = InMemoryModel::default();
        let routes = traverse_from_block(&grid, &model, &a, Direction::East, 100, 10);
        assert!(routes.is_empty());
    }

    fn connector(id: &str, orientation: Direction, pos: Position, counterpart_id: Option<&str>) -> Tile {
        Tile::new(
            id,
            orientation,
            pos,
            TileData::Track(TrackData {
                subtype: TrackSubtype::Connector,
                counterpart_id: counterpart_id.map(ToString::to_string),
                route_ids: RouteIds::default(),
            }),
        )
        .unwrap()
    }

    /// End-to-end scenario 4 (spec.md §8): a named-counterpart connector
    /// jumps the walk across the grid to wherever the counterpart sits,
    /// and travel resumes from there rather than stalling at the jump's
    /// origin cell.
    #[test]
    fn connector_with_named_counterpart_teleports_the_walk() {
        let mut grid = GridIndex::new();
        let mut model = InMemoryModel::default();

        let a = block("A", Direction::West, Position::new(0, 0, 0));
        grid.add_tile(a.clone());
        model.tiles.push(a.clone());
        grid.add_tile(track("t1", Direction::West, Position::new(4, 0, 0)));

        let c1 = connector("c1", Direction::West, Position::new(5, 0, 0), Some("c2"));
        grid.add_tile(c1.clone());
        model.tiles.push(c1);
        let c2 = connector("c2", Direction::East, Position::new(20, 5, 0), None);
        grid.add_tile(c2.clone());
        model.tiles.push(c2);

        for x in 21..24 {
            grid.add_tile(track(&format!("far{x}"), Direction::West, Position::new(x, 5, 0)));
        }
        let d = block("D", Direction::West, Position::new(24, 5, 0));
        grid.add_tile(d);

        let routes = traverse_from_block(&grid, &model, &a, Direction::East, 100, 10);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].start_block_id, "A");
        assert_eq!(routes[0].end_block_id, "D");
        let step_ids: Vec<&str> = routes[0].steps.iter().map(|s| s.tile_id.as_str()).collect();
        assert_eq!(step_ids, vec!["t1", "c1", "c2", "far21", "far22", "far23"]);
    }

    /// The unnamed-counterpart path (§4.2 "connector ... scans forward up
    /// to 10 cells"): no `counterpart-id` is set, so the driver must find
    /// the next complementary-oriented connector ahead on its own.
    #[test]
    fn connector_without_counterpart_scans_forward_and_finds_one() {
        let mut grid = GridIndex::new();
        let model = InMemoryModel::default();

        let a = block("A", Direction::West, Position::new(0, 0, 0));
        grid.add_tile(a.clone());
        let c1 = connector("c1", Direction::West, Position::new(4, 0, 0), None);
        grid.add_tile(c1);
        // Two empty cells, then the matching counterpart three cells ahead.
        let c2 = connector("c2", Direction::East, Position::new(7, 0, 0), None);
        grid.add_tile(c2);
        let b = block("B", Direction::West, Position::new(8, 0, 0));
        grid.add_tile(b);

        let routes = traverse_from_block(&grid, &model, &a, Direction::East, 100, 10);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].end_block_id, "B");
    }

    fn curve(id: &str, orientation: Direction, pos: Position) -> Tile {
        Tile::new(
            id,
            orientation,
            pos,
            TileData::Track(TrackData {
                subtype: TrackSubtype::Curve,
                counterpart_id: None,
                route_ids: RouteIds::default(),
            }),
        )
        .unwrap()
    }

    fn right_switch(id: &str, orientation: Direction, pos: Position) -> Tile {
        use crate::tile::{SwitchData, SwitchSubtype};
        Tile::new(
            id,
            orientation,
            pos,
            TileData::Switch(SwitchData {
                subtype: SwitchSubtype::Right,
                dir: false,
                addr1: 1,
                port1: 1,
                gate1: 0,
                addr2: 0,
                port2: 0,
                gate2: 0,
                interface: "master".to_string(),
                block_id: None,
            }),
        )
        .unwrap()
    }

    /// End-to-end scenario 2 (spec.md §8): a single two-way turnout fans a
    /// block's single exit out into two distinct routes, one through the
    /// straight leg and one through the diverging leg, each carrying the
    /// `turnout_in` the frog should be set to (§4.4's `swcmds`).
    #[test]
    fn single_turnout_fan_out_produces_straight_and_diverging_routes() {
        let mut grid = GridIndex::new();
        let model = InMemoryModel::default();

        let a = block("A", Direction::West, Position::new(0, 0, 0));
        grid.add_tile(a.clone());
        grid.add_tile(track("t_a", Direction::West, Position::new(4, 0, 0)));
        grid.add_tile(right_switch("sw1", Direction::West, Position::new(5, 0, 0)));
        grid.add_tile(track("t_b", Direction::West, Position::new(6, 0, 0)));
        grid.add_tile(block("B", Direction::West, Position::new(7, 0, 0)));
        grid.add_tile(curve("cv1", Direction::South, Position::new(5, 1, 0)));
        grid.add_tile(block("C", Direction::West, Position::new(4, 1, 0)));

        let routes = traverse_from_block(&grid, &model, &a, Direction::East, 100, 10);
        assert_eq!(routes.len(), 2);

        let to_b = routes
            .iter()
            .find(|r| r.end_block_id == "B")
            .expect("straight leg should reach B");
        let sw_step = to_b
            .steps
            .iter()
            .find(|s| s.tile_id == "sw1")
            .expect("route through B crosses the switch");
        assert_eq!(sw_step.turnout_in, TurnoutPosition::STRAIGHT);

        let to_c = routes
            .iter()
            .find(|r| r.end_block_id == "C")
            .expect("diverging leg should reach C");
        let sw_step = to_c
            .steps
            .iter()
            .find(|s| s.tile_id == "sw1")
            .expect("route through C crosses the switch");
        assert_eq!(sw_step.turnout_in, TurnoutPosition::DIVERGING);
    }
}
