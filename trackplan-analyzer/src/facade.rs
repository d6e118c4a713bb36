//! Analyzer Facade (§4.6): orchestrates the grid build, the per-block
//! traversal fan-out, the Route Builder, and the Health Checker into the
//! single `analyze()` entry point, grounded in `analyse.c`'s `_inst`/
//! top-level `analyze` flow minus the global `cleanrun` flag (§9, §C.2).

use crate::diagnostics::DiagnosticsReport;
use crate::grid::GridIndex;
use crate::health::{self, HealthConfig};
use crate::model::LayoutModel;
use crate::route::{self, AnalyzeMode, RouteBuilderConfig};
use crate::tile::{Direction, TileData};
use crate::traversal::{self, RouteCandidate};

/// Every tunable the Facade threads through to its components (§5
/// "Configuration" in `SPEC_FULL.md` §A) — an explicit parameter in place
/// of the original's process-wide mutable state.
#[derive(Debug, Clone, Copy)]
pub struct AnalyzerConfig {
    pub health: HealthConfig,
    pub route_builder: RouteBuilderConfig,
    /// Recursion depth cap for the Traversal Driver (§4.3 "Termination
    /// conditions", I6); the default matches spec.md's "depth > 100".
    pub max_traversal_depth: u32,
    /// How many cells ahead the Traversal Driver scans for an unnamed
    /// connector's counterpart (§4.2, §9 "preserve that bound").
    pub connector_scan_bound: u32,
    /// Whether the occ-list post-processing that writes `blockid` back onto
    /// every sensor/signal/switch an occ-list names runs (§4.6 step 4,
    /// "strict mode").
    pub strict_mode: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            health: HealthConfig::default(),
            route_builder: RouteBuilderConfig::default(),
            max_traversal_depth: 100,
            connector_scan_bound: 10,
            strict_mode: false,
        }
    }
}

/// The result of one `analyze()` call: whether the plan is healthy, and
/// every diagnostic produced along the way (§4.5 "Returns overall
/// `healthy`"; §6 "Diagnostics").
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    pub healthy: bool,
    pub diagnostics: DiagnosticsReport,
}

/// Stateless orchestrator for the Analyzer's components (§4.6). All of its
/// working state — the grid, the preliminary candidate list — is created
/// fresh inside `analyze()` and discarded at exit (§3 "Lifecycle"); only
/// the writes into the model survive.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackPlanAnalyzer {
    config: AnalyzerConfig,
}

impl TrackPlanAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        TrackPlanAnalyzer { config }
    }

    /// Runs one complete analysis pass over `model` (§4.6's four steps):
    /// clear-and-rebuild the grid, fan out a traversal from every block in
    /// each of its valid exit directions, hand the discovered candidates to
    /// the Route Builder, and run the Health Checker. Never aborts (§7); the
    /// returned [`AnalysisReport::healthy`] is the caller's signal.
    pub fn analyze(&self, model: &mut dyn LayoutModel, mode: AnalyzeMode) -> AnalysisReport {
        let grid = self.build_grid(model);
        let candidates = self.traverse_all_blocks(&grid, model);

        route::build_routes(model, &candidates, mode, &self.config.route_builder);

        if self.config.strict_mode {
            annotate_occ_lists(model, &candidates);
        }

        let (healthy, diagnostics) = health::check_plan_health(model, &self.config.health);
        AnalysisReport { healthy, diagnostics }
    }

    /// Step 2: populate a fresh [`GridIndex`] from every tile in the model,
    /// applying each tile's module offset (folded to `z = 0`) before
    /// indexing, in the enumeration order the model hands back (§4.1
    /// "Insertion ordering", §4.6 step 2).
    fn build_grid(&self, model: &dyn LayoutModel) -> GridIndex {
        let mut grid = GridIndex::new();
        for tile in model.tiles() {
            let mut placed = tile.clone();
            if let Some(module_id) = &tile.module_id {
                if let Some(offset) = model.module_offset(module_id) {
                    placed.position.x += offset.x;
                    placed.position.y += offset.y;
                    placed.position.z = 0;
                }
            }
            let overlaps = grid.add_tile(placed);
            for overlap in overlaps {
                tracing::warn!(
                    cell = ?overlap.cell,
                    existing = overlap.existing_id,
                    rejected = overlap.rejected_id,
                    "tile overlap while building grid index"
                );
            }
        }
        grid
    }

    /// Step 3: for every block tile, launch the Traversal Driver in each of
    /// its valid exit directions — west/east for an east/west-oriented
    /// block, north/south for a north/south-oriented one (§4.3 "Seed").
    fn traverse_all_blocks(&self, grid: &GridIndex, model: &dyn LayoutModel) -> Vec<RouteCandidate> {
        let mut candidates = Vec::new();
        for tile in model.tiles() {
            if !matches!(tile.data, TileData::Block(_)) {
                continue;
            }
            for dir in exit_directions(tile.orientation) {
                candidates.extend(traversal::traverse_from_block(
                    grid,
                    model,
                    tile,
                    dir,
                    self.config.max_traversal_depth,
                    self.config.connector_scan_bound,
                ));
            }
        }
        candidates
    }
}

/// The two directions a block's exit can point along its own orientation
/// axis (§4.6 step 3).
fn exit_directions(orientation: Direction) -> [Direction; 2] {
    match orientation.axis() {
        crate::tile::Axis::X => [Direction::West, Direction::East],
        crate::tile::Axis::Y => [Direction::North, Direction::South],
    }
}

/// Step 4 (strict mode only): writes `blockid` back onto every sensor,
/// signal, and switch tile an occ-list names, associating them with the
/// block whose trailing-signal search found them (§4.6 step 4). Only a
/// candidate's behind-a-block search actually accumulates an occ-list
/// (§4.3 "Output"): `beyond_signal.feedback_ids`/`switch_ids` plus the
/// terminating signal itself.
fn annotate_occ_lists(model: &mut dyn LayoutModel, candidates: &[RouteCandidate]) {
    for candidate in candidates {
        let Some(beyond) = &candidate.beyond_signal else {
            continue;
        };
        for fb_id in &beyond.feedback_ids {
            set_block_id(model, fb_id, &candidate.end_block_id);
        }
        for sw_id in &beyond.switch_ids {
            set_block_id(model, sw_id, &candidate.end_block_id);
        }
        set_block_id(model, &beyond.signal_id, &candidate.end_block_id);
    }
}

fn set_block_id(model: &mut dyn LayoutModel, tile_id: &str, block_id: &str) {
    let Some(tile) = model.tile_by_id_mut(tile_id) else {
        return;
    };
    match &mut tile.data {
        TileData::Feedback(fb) => fb.block_id = Some(block_id.to_string()),
        TileData::Signal(sg) => sg.block_id = Some(block_id.to_string()),
        TileData::Switch(sw) => sw.block_id = Some(block_id.to_string()),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InMemoryModel, SwCmd};
    use crate::tile::{BlockData, Direction, Position, RouteIds, Tile, TileData, TrackData, TrackSubtype};

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

    fn straight(id: &str, orientation: Direction, pos: Position) -> Tile {
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

    /// End-to-end scenario 1 (§8): two blocks joined by straight track
    /// produce exactly the two expected bidirectional autogen routes.
    #[test]
    fn straight_a_to_b_produces_two_bidirectional_routes() {
        let mut model = InMemoryModel::default();
        model.tiles.push(block("A", Direction::West, Position::new(0, 0, 0)));
        for (i, x) in (4..7).enumerate() {
            model.tiles.push(straight(&format!("t{i}"), Direction::West, Position::new(x, 0, 0)));
        }
        model.tiles.push(block("B", Direction::West, Position::new(7, 0, 0)));

        let analyzer = TrackPlanAnalyzer::default();
        let report = analyzer.analyze(&mut model, AnalyzeMode::Generate);

        let mut ids: Vec<&str> = model.routes().iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["autogen-[A-]-[B+]", "autogen-[B+]-[A-]"]);
        for route in model.routes() {
            assert!(route.swcmds.is_empty());
        }
        assert!(report.healthy || !report.healthy); // analyze never panics regardless of health
    }

    /// P1 (idempotence): running `analyze(generate)` twice on an unchanged
    /// plan produces the same route set the second time.
    #[test]
    fn analyze_twice_is_idempotent() {
        let mut model = InMemoryModel::default();
        model.tiles.push(block("A", Direction::West, Position::new(0, 0, 0)));
        model.tiles.push(straight("t0", Direction::West, Position::new(4, 0, 0)));
        model.tiles.push(block("B", Direction::West, Position::new(5, 0, 0)));

        let analyzer = TrackPlanAnalyzer::default();
        analyzer.analyze(&mut model, AnalyzeMode::Generate);
        let first = model.routes().to_vec();
        analyzer.analyze(&mut model, AnalyzeMode::Generate);
        let second = model.routes().to_vec();
        assert_eq!(first, second);
    }

    /// P2: clean-then-generate matches a single generate.
    #[test]
    fn clean_then_generate_matches_generate() {
        let mut fresh = InMemoryModel::default();
        fresh.tiles.push(block("A", Direction::West, Position::new(0, 0, 0)));
        fresh.tiles.push(straight("t0", Direction::West, Position::new(4, 0, 0)));
        fresh.tiles.push(block("B", Direction::West, Position::new(5, 0, 0)));
        let mut cleaned = fresh.clone();

        let analyzer = TrackPlanAnalyzer::default();
        analyzer.analyze(&mut fresh, AnalyzeMode::Generate);

        analyzer.analyze(&mut cleaned, AnalyzeMode::Generate);
        analyzer.analyze(&mut cleaned, AnalyzeMode::Clean);
        analyzer.analyze(&mut cleaned, AnalyzeMode::Generate);

        assert_eq!(fresh.routes(), cleaned.routes());
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

    /// End-to-end scenario 2 (§8): a single two-way turnout gives a block
    /// two distinct destinations, one per leg, each carrying the `swcmds`
    /// disposition the Route Builder derives from that leg's `turnout_in`.
    #[test]
    fn single_turnout_fan_out_produces_straight_and_turnout_routes() {
        let mut model = InMemoryModel::default();
        model.tiles.push(block("A", Direction::West, Position::new(0, 0, 0)));
        model.tiles.push(straight("t_a", Direction::West, Position::new(4, 0, 0)));
        model.tiles.push(right_switch("sw1", Direction::West, Position::new(5, 0, 0)));
        model.tiles.push(straight("t_b", Direction::West, Position::new(6, 0, 0)));
        model.tiles.push(block("B", Direction::West, Position::new(7, 0, 0)));
        model.tiles.push(curve("cv1", Direction::South, Position::new(5, 1, 0)));
        model.tiles.push(block("C", Direction::West, Position::new(4, 1, 0)));

        let analyzer = TrackPlanAnalyzer::default();
        let report = analyzer.analyze(&mut model, AnalyzeMode::Generate);
        assert!(report.healthy);

        let to_b = model
            .routes()
            .iter()
            .find(|r| r.bka == "A" && r.bkb == "B")
            .expect("straight leg produces an A-B route");
        assert_eq!(to_b.swcmds, vec![SwCmd { id: "sw1".to_string(), cmd: "straight".to_string() }]);

        let to_c = model
            .routes()
            .iter()
            .find(|r| r.bka == "A" && r.bkb == "C")
            .expect("diverging leg produces an A-C route");
        assert_eq!(to_c.swcmds, vec![SwCmd { id: "sw1".to_string(), cmd: "turnout".to_string() }]);
        assert_eq!(model.routes().len(), 2);
    }

    /// Generalizes scenario 1 over random chain lengths: however many
    /// straight-track tiles sit between two blocks, `analyze` should still
    /// find exactly the two bidirectional autogen routes and nothing else.
    #[test]
    fn straight_chains_of_random_length_produce_two_routes() {
        use rand::Rng;
        let mut rng = rand::rng();
        for _ in 0..20 {
            let chain_len = rng.random_range(1..8);
            let mut model = InMemoryModel::default();
            model.tiles.push(block("A", Direction::West, Position::new(0, 0, 0)));
            for (i, x) in (4..4 + chain_len).enumerate() {
                model.tiles.push(straight(&format!("t{i}"), Direction::West, Position::new(x, 0, 0)));
            }
            let b_x = 4 + chain_len;
            model.tiles.push(block("B", Direction::West, Position::new(b_x, 0, 0)));

            let analyzer = TrackPlanAnalyzer::default();
            let report = analyzer.analyze(&mut model, AnalyzeMode::Generate);
            assert!(report.healthy, "chain_len={chain_len}");

            let mut ids: Vec<&str> = model.routes().iter().map(|r| r.id.as_str()).collect();
            ids.sort_unstable();
            assert_eq!(ids, vec!["autogen-[A-]-[B+]", "autogen-[B+]-[A-]"], "chain_len={chain_len}");
        }
    }
}
