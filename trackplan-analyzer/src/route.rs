//! Route Builder (§4.4): turns [`crate::traversal::RouteCandidate`]s into
//! [`RouteRecord`]s, grounded in `analyse.c`'s `__analyseList`.

use crate::model::{FbAction, FbEvent, FbFrom, LayoutModel, RouteRecord, Side, SwCmd};
use crate::tile::{SignalKind, SwitchSubtype, TileData};
use crate::traversal::RouteCandidate;

/// Whether the Route Builder synthesizes new autogen routes, or only purges
/// stale ones and strips `autogen-` ids back off per-tile `routeids`
/// (`analyse.c`'s global `cleanrun` flag, made an explicit parameter per
/// `SPEC_FULL.md` §C.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzeMode {
    Generate,
    Clean,
}

/// Route synthesis knobs beyond the Traversal Driver's own (§C.2): whether
/// `fbevent` children are generated for routes that end on a trailing
/// facing signal (default off — `addFeedbacks` in the original is always
/// `False` on the path every caller actually takes).
#[derive(Debug, Clone, Copy)]
pub struct RouteBuilderConfig {
    pub generate_feedback_events: bool,
}

impl Default for RouteBuilderConfig {
    fn default() -> Self {
        RouteBuilderConfig {
            generate_feedback_events: false,
        }
    }
}

/// A block's signal-attribute update: which of its four signal slots gets
/// set and to which tile id (§4.4 step e).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSignalSlot {
    Signal,
    SignalReverse,
    WDistantSignal,
    WDistantSignalReverse,
}

/// Classifies a block's signal slot from its own side and the found
/// signal's kind, mirroring `__analyseList`'s `bkaside`/`signal` `if` chain:
/// side `-` uses the forward slots, side `+` the reverse ones; `main` uses
/// `signal`/`signalR`, `distant` uses `wsignal`/`wsignalR`.
fn block_signal_slot(side: Side, kind: SignalKind) -> BlockSignalSlot {
    match (side, kind) {
        (Side::Minus, SignalKind::Main) => BlockSignalSlot::Signal,
        (Side::Minus, SignalKind::Distant) => BlockSignalSlot::WDistantSignal,
        (Side::Plus, SignalKind::Main) => BlockSignalSlot::SignalReverse,
        (Side::Plus, SignalKind::Distant) => BlockSignalSlot::WDistantSignalReverse,
    }
}

/// The switch-command disposition string for a turnout position, per
/// subtype (§B.6, `analyse.c`'s `state` assignment in `__analyseItem`'s
/// `sw` branch). Subtypes the original never assigns a disposition for
/// (decouplers, unaddressed crossings/ccrossings) keep its literal `" "`
/// default rather than inventing a label it never had.
fn disposition(subtype: SwitchSubtype, dcrossing_like: bool, turnout_in: u8) -> &'static str {
    match subtype {
        SwitchSubtype::Left | SwitchSubtype::Right => {
            if turnout_in != 0 {
                "turnout"
            } else {
                "straight"
            }
        }
        SwitchSubtype::DCrossing => match turnout_in {
            0 => "straight",
            1 => "turnout",
            2 => "left",
            3 => "right",
            _ => " ",
        },
        SwitchSubtype::Crossing if dcrossing_like => match turnout_in {
            0 | 1 => "straight",
            2 | 3 => "turnout",
            _ => " ",
        },
        SwitchSubtype::ThreeWay => match turnout_in {
            0 => "straight",
            1 => "left",
            2 => "right",
            _ => " ",
        },
        _ => " ",
    }
}

/// Builds every `swcmd` child for a candidate's switch steps (§4.4 step d),
/// looking each switch's live subtype up by id.
fn build_swcmds(model: &dyn LayoutModel, candidate: &RouteCandidate) -> Vec<SwCmd> {
    candidate
        .steps
        .iter()
        .filter(|step| step.kind == "switch")
        .filter_map(|step| {
            let tile = model.tile_by_id(&step.tile_id)?;
            let TileData::Switch(sw) = &tile.data else {
                return None;
            };
            let dcrossing_like = sw.subtype.is_dcrossing_like(sw);
            Some(SwCmd {
                id: step.tile_id.clone(),
                cmd: disposition(sw.subtype, dcrossing_like, step.turnout_in.get()).to_string(),
            })
        })
        .collect()
}

/// The autogen id for a candidate, literal brackets and all (§4.4 step a,
/// `StrOp.fmt("autogen-[%s%s]-[%s%s]", ...)`).
fn autogen_id(candidate: &RouteCandidate) -> String {
    format!(
        "autogen-[{}{}]-[{}{}]",
        candidate.start_block_id, candidate.start_side, candidate.end_block_id, candidate.end_side
    )
}

/// Runs the Route Builder over every discovered candidate (§4.4).
///
/// A facing signal's classification onto the start block (step e, below)
/// only fires for a signal reached *before* the end block — the original
/// gates this on `!reachedEndblock`; a trailing signal found by continuing
/// past the end block (`beyond_signal`) never reclassifies anything, the
/// reverse-direction route covers that symmetrically instead.
///
/// Always purges stale `autogen-` routes and strips `autogen-` ids back off
/// per-tile `routeids` first (step 1, both modes). In [`AnalyzeMode::Generate`]
/// it then synthesizes one [`RouteRecord`] per candidate — skipping any
/// whose endpoints collide with a user-edited route, disambiguating
/// same-run collisions with a numeric suffix — emits their `swcmd`s,
/// classifies block signal attributes, optionally appends feedback events,
/// and re-adds each tile's new `routeids` membership.
pub fn build_routes(model: &mut dyn LayoutModel, candidates: &[RouteCandidate], mode: AnalyzeMode, config: &RouteBuilderConfig) {
    let user_routes: Vec<RouteRecord> = model.routes().iter().filter(|r| !r.is_autogen()).cloned().collect();

    for tile in model.tiles_mut() {
        let ids = match &mut tile.data {
            TileData::Track(t) => Some(&mut t.route_ids),
            TileData::Feedback(f) => Some(&mut f.route_ids),
            TileData::Signal(s) => Some(&mut s.route_ids),
            _ => None,
        };
        if let Some(ids) = ids {
            ids.retain_user_routes();
        }
    }

    if mode == AnalyzeMode::Clean {
        model.set_routes(user_routes);
        return;
    }

    let mut stlist = user_routes;
    let mut fbevents: Vec<(String, FbEvent)> = Vec::new();

    for candidate in candidates {
        if candidate.start_block_id == candidate.end_block_id {
            // Loop route: the original logs a warning and drops it (§4.4 step g).
            continue;
        }

        let mut record = RouteRecord {
            id: autogen_id(candidate),
            bka: candidate.start_block_id.clone(),
            bkb: candidate.end_block_id.clone(),
            bkaside: candidate.start_side,
            bkbside: candidate.end_side,
            swcmds: build_swcmds(model, candidate),
        };

        let mut add_to_list = true;
        for (i, existing) in stlist.iter().enumerate() {
            if existing.same_endpoints(&record) {
                if existing.id != record.id {
                    add_to_list = false;
                    break;
                }
                record.id = format!("{}-{}", record.id, i);
            }
        }
        if !add_to_list {
            continue;
        }

        // Signal classification and feedback events both need the trace
        // walked in its natural before/after-end-block order.
        let mut reached_end_block = false;
        let mut signal_reached = false;
        for step in &candidate.steps {
            if step.tile_id == candidate.end_block_id {
                reached_end_block = true;
            }

            if step.kind == "signal" && !reached_end_block {
                if let Some(tile) = model.tile_by_id(&step.tile_id) {
                    if let TileData::Signal(sig) = &tile.data {
                        if crate::travel::facing_travel(tile.orientation, step.travel_in) {
                            signal_reached = true;
                            let slot = block_signal_slot(candidate.start_side, sig.kind);
                            apply_signal_slot(model, &candidate.start_block_id, &slot, &step.tile_id);
                        }
                    }
                }
            }

            if step.kind == "feedback" && candidate.ends_on_signal && config.generate_feedback_events {
                if !signal_reached {
                    fbevents.push((
                        candidate.start_block_id.clone(),
                        FbEvent {
                            id: step.tile_id.clone(),
                            action: FbAction::Enter,
                            from: side_to_from(candidate.start_side),
                        },
                    ));
                }
                if reached_end_block {
                    fbevents.push((
                        candidate.end_block_id.clone(),
                        FbEvent {
                            id: step.tile_id.clone(),
                            action: FbAction::In,
                            from: side_to_from(candidate.end_side),
                        },
                    ));
                }
            }
        }

        if let Some(beyond) = &candidate.beyond_signal {
            if config.generate_feedback_events {
                for fb_id in &beyond.feedback_ids {
                    fbevents.push((
                        candidate.end_block_id.clone(),
                        FbEvent {
                            id: fb_id.clone(),
                            action: FbAction::In,
                            from: side_to_from(candidate.end_side),
                        },
                    ));
                }
            }
        }

        for step in &candidate.steps {
            if matches!(step.kind, "track" | "feedback" | "signal") {
                add_route_id(model, &step.tile_id, &record.id);
            }
        }

        stlist.push(record);
    }

    model.set_routes(stlist);

    for (block_id, event) in fbevents {
        if let Some(tile) = model.tile_by_id_mut(&block_id) {
            if let TileData::Block(block) = &mut tile.data {
                block.fb_events.push(event);
            }
        }
    }
}

fn side_to_from(side: Side) -> FbFrom {
    match side {
        Side::Plus => FbFrom::All,
        Side::Minus => FbFrom::AllReverse,
    }
}

fn apply_signal_slot(model: &mut dyn LayoutModel, block_id: &str, slot: &BlockSignalSlot, signal_id: &str) {
    let Some(tile) = model.tile_by_id_mut(block_id) else {
        return;
    };
    let TileData::Block(block) = &mut tile.data else {
        return;
    };
    match slot {
        BlockSignalSlot::Signal => block.signal = Some(signal_id.to_string()),
        BlockSignalSlot::SignalReverse => block.signal_r = Some(signal_id.to_string()),
        BlockSignalSlot::WDistantSignal => block.wsignal = Some(signal_id.to_string()),
        BlockSignalSlot::WDistantSignalReverse => block.wsignal_r = Some(signal_id.to_string()),
    }
}

fn add_route_id(model: &mut dyn LayoutModel, tile_id: &str, route_id: &str) {
    let Some(tile) = model.tile_by_id_mut(tile_id) else {
        return;
    };
    let ids = match &mut tile.data {
        TileData::Track(t) => &mut t.route_ids,
        TileData::Feedback(f) => &mut f.route_ids,
        TileData::Signal(s) => &mut s.route_ids,
        _ => return,
    };
    ids.add(route_id);
}
