//! Health Checker (§4.5): one pass over the full tile set producing
//! diagnostics and minor coordinate repairs, grounded in `analyse.c`'s
//! `_checkPlanHealth`.

use std::collections::HashMap;

use crate::diagnostics::{Diagnostic, DiagnosticsReport, Severity};
use crate::model::LayoutModel;
use crate::tile::{LocoProtocol, SwitchSubtype, Tile, TileData};

/// Tunables for the Health Checker (§5 "ambient stack", coordinate bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthConfig {
    /// Whether block-side routing is enabled in the caller's control
    /// configuration; the Analyzer has no opinion on this beyond reporting
    /// it (§4.5 "Global" check).
    pub block_side_routing_enabled: bool,
    pub min_coordinate: i32,
    pub max_coordinate: i32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        HealthConfig {
            block_side_routing_enabled: true,
            min_coordinate: -1,
            max_coordinate: 256,
        }
    }
}

/// An addressed tuple used for the shared switch/signal/output duplicate
/// check; `analyse.c` keys all three kinds into the same map, so a switch's
/// address can collide with a signal's or output's (§4.5, verbatim from the
/// source's single `switchMap`).
type AddrKey = (u16, u16, u16, String);

fn addr_key(address: u16, port: u16, gate: u16, interface: &str) -> AddrKey {
    (address, port, gate, interface.to_string())
}

/// Runs the full health check, repairing out-of-range coordinates in place
/// and returning `(healthy, diagnostics)` (§4.5's "Returns overall
/// `healthy`").
pub fn check_plan_health(model: &mut dyn LayoutModel, config: &HealthConfig) -> (bool, DiagnosticsReport) {
    let mut report = DiagnosticsReport::new();
    let mut healthy = true;

    if !config.block_side_routing_enabled {
        report.push(Diagnostic::new(
            Severity::Error,
            "block-side-routing-disabled",
            "block side routing is not enabled; the classic method is deprecated",
        ));
        healthy = false;
    }

    check_loco_addresses(model, &mut report, &mut healthy);

    // Per-list duplicate id check (§4.5 "Per list (type bucket)").
    let mut buckets: HashMap<&'static str, HashMap<String, String>> = HashMap::new();
    // Plan-wide id map, for I2's "no two tiles share id" cross-list check.
    let mut global_ids: HashMap<String, String> = HashMap::new();
    let mut sensor_addrs: HashMap<AddrKey, String> = HashMap::new();
    let mut shared_addrs: HashMap<AddrKey, String> = HashMap::new();

    for tile in model.tiles() {
        check_tile_addressing(tile, &mut sensor_addrs, &mut shared_addrs, &mut report, &mut healthy);

        let bucket = buckets.entry(tile.data.kind_name()).or_default();
        if let Some(first_id) = bucket.get(&tile.id) {
            report.push(
                Diagnostic::new(
                    Severity::Error,
                    "duplicate-id-in-list",
                    format!(
                        "{} {:?} shares its id with another {} ({:?})",
                        tile.data.kind_name(),
                        tile.id,
                        tile.data.kind_name(),
                        first_id
                    ),
                )
                .with_subject(tile.id.clone()),
            );
            healthy = false;
        } else {
            bucket.insert(tile.id.clone(), tile.id.clone());
        }

        global_ids
            .entry(tile.id.clone())
            .and_modify(|_| {
                report.push(
                    Diagnostic::new(
                        Severity::Error,
                        "duplicate-id",
                        format!("id {:?} is used by more than one tile", tile.id),
                    )
                    .with_subject(tile.id.clone()),
                );
                healthy = false;
            })
            .or_insert_with(|| tile.id.clone());
    }

    check_overlaps_and_coordinates(model, config, &mut report, &mut healthy);

    if healthy {
        tracing::info!("plan is healthy");
    } else {
        tracing::error!("plan is NOT healthy, see diagnostics above");
    }

    (healthy, report)
}

fn check_loco_addresses(model: &dyn LayoutModel, report: &mut DiagnosticsReport, healthy: &mut bool) {
    for loco in model.locos() {
        let exempt = matches!(loco.protocol, LocoProtocol::Analog);
        if loco.address == 0 && !exempt {
            report.push(
                Diagnostic::new(
                    Severity::Error,
                    "loco-no-address",
                    format!("loco {:?} has no address set", loco.id),
                )
                .with_subject(loco.id.clone()),
            );
            *healthy = false;
        }
    }
}

fn check_tile_addressing(
    tile: &Tile,
    sensor_addrs: &mut HashMap<AddrKey, String>,
    shared_addrs: &mut HashMap<AddrKey, String>,
    report: &mut DiagnosticsReport,
    healthy: &mut bool,
) {
    match &tile.data {
        TileData::Feedback(fb) => {
            if fb.address == 0 {
                report.push(
                    Diagnostic::new(
                        Severity::Error,
                        "feedback-no-address",
                        format!("sensor {:?} has no address set", tile.id),
                    )
                    .with_subject(tile.id.clone()),
                );
                *healthy = false;
            } else {
                let key = addr_key(fb.address, fb.bus, 0, &fb.interface);
                if let Some(first) = sensor_addrs.get(&key) {
                    report.push(
                        Diagnostic::new(
                            Severity::Error,
                            "duplicate-feedback-address",
                            format!(
                                "sensor {:?} has an already-used address {} by {:?}",
                                tile.id, fb.address, first
                            ),
                        )
                        .with_subject(tile.id.clone()),
                    );
                    *healthy = false;
                } else {
                    sensor_addrs.insert(key, tile.id.clone());
                }
            }
        }
        TileData::Switch(sw) => {
            if sw.addr1 == 0 && sw.port1 == 0 {
                if matches!(sw.subtype, SwitchSubtype::Crossing | SwitchSubtype::CCrossing) {
                    report.push(Diagnostic::new(
                        Severity::Info,
                        "crossing-no-address",
                        format!("crossing {:?} has no address", tile.id),
                    ));
                } else {
                    report.push(
                        Diagnostic::new(
                            Severity::Error,
                            "switch-no-address",
                            format!("switch {:?} has no address set", tile.id),
                        )
                        .with_subject(tile.id.clone()),
                    );
                    *healthy = false;
                }
            } else {
                warn_on_duplicate_addr(
                    addr_key(sw.addr1, sw.port1, sw.gate1, &sw.interface),
                    &tile.id,
                    "switch",
                    shared_addrs,
                    report,
                );
            }
            let has_second = matches!(sw.subtype, SwitchSubtype::DCrossing | SwitchSubtype::ThreeWay)
                && (sw.addr2 > 0 || sw.port2 > 0);
            if has_second {
                warn_on_duplicate_addr(
                    addr_key(sw.addr2, sw.port2, sw.gate2, &sw.interface),
                    &tile.id,
                    "switch",
                    shared_addrs,
                    report,
                );
            }
        }
        TileData::Output(o) => {
            if let Some(first) = o.aspects.first() {
                if first.address > 0 || first.port > 0 {
                    warn_on_duplicate_addr(
                        addr_key(first.address, first.port, first.gate, &first.interface),
                        &tile.id,
                        "output",
                        shared_addrs,
                        report,
                    );
                }
            }
        }
        TileData::Signal(sg) => {
            let Some(first) = sg.aspects.first() else {
                return;
            };
            if first.address == 0 && first.port == 0 {
                report.push(
                    Diagnostic::new(
                        Severity::Error,
                        "signal-no-address",
                        format!("signal {:?} has no address set", tile.id),
                    )
                    .with_subject(tile.id.clone()),
                );
                *healthy = false;
            } else {
                warn_on_duplicate_addr(
                    addr_key(first.address, first.port, first.gate, &first.interface),
                    &tile.id,
                    "signal",
                    shared_addrs,
                    report,
                );
            }
            for aspect in sg.aspects.iter().skip(1) {
                if aspect.address > 0 || aspect.port > 0 {
                    warn_on_duplicate_addr(
                        addr_key(aspect.address, aspect.port, aspect.gate, &aspect.interface),
                        &tile.id,
                        "signal",
                        shared_addrs,
                        report,
                    );
                }
            }
        }
        TileData::Track(_) | TileData::Block(_) | TileData::SelectionTable(_) => {}
    }
}

fn warn_on_duplicate_addr(
    key: AddrKey,
    id: &str,
    kind: &str,
    shared_addrs: &mut HashMap<AddrKey, String>,
    report: &mut DiagnosticsReport,
) {
    if let Some(first) = shared_addrs.get(&key) {
        report.push(
            Diagnostic::new(
                Severity::Warning,
                "duplicate-address",
                format!(
                    "{kind} {id:?} has an already-used address {}-{} by {first:?}",
                    key.0, key.1
                ),
            )
            .with_subject(id.to_string()),
        );
    } else {
        shared_addrs.insert(key, id.to_string());
    }
}

fn check_overlaps_and_coordinates(
    model: &mut dyn LayoutModel,
    config: &HealthConfig,
    report: &mut DiagnosticsReport,
    healthy: &mut bool,
) {
    let mut seen: HashMap<(i32, i32, i32), String> = HashMap::new();
    for tile in model.tiles_mut() {
        let key = (tile.position.x, tile.position.y, tile.position.z);
        if let Some(first) = seen.get(&key) {
            report.push(
                Diagnostic::new(
                    Severity::Error,
                    "overlap",
                    format!(
                        "tile {:?} at {:?} overlaps tile {:?}",
                        tile.id, tile.position, first
                    ),
                )
                .with_subject(tile.id.clone()),
            );
            *healthy = false;
        }

        let out_of_bounds = tile.position.x < config.min_coordinate
            || tile.position.x > config.max_coordinate
            || tile.position.y < config.min_coordinate
            || tile.position.y > config.max_coordinate;
        if out_of_bounds {
            report.push(
                Diagnostic::new(
                    Severity::Error,
                    "invalid-coordinates",
                    format!("tile {:?} has invalid coordinates {:?}", tile.id, tile.position),
                )
                .with_subject(tile.id.clone()),
            );
            *healthy = false;
            if tile.position.x < config.min_coordinate || tile.position.x > config.max_coordinate {
                tile.position.x = 0;
            }
            if tile.position.y < config.min_coordinate || tile.position.y > config.max_coordinate {
                tile.position.y = 0;
            }
        } else {
            seen.insert(key, tile.id.clone());
        }
    }

    if let Some(((x, y, z), id)) = seen.iter().max_by_key(|((x, y, _), _)| x + y) {
        report.push(Diagnostic::new(
            Severity::Info,
            "most-distant-tile",
            format!("tile {id:?} at ({x}, {y}, {z}) is the most distant tile in the plan"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InMemoryModel;
    use crate::tile::{Direction, FeedbackData, Position, RouteIds, SwitchData, TrackData, TrackSubtype};

    fn feedback(id: &str, address: u16, x: i32, y: i32) -> Tile {
        Tile::new(
            id,
            Direction::West,
            Position::new(x, y, 0),
            TileData::Feedback(FeedbackData {
                curve: false,
                bus: 0,
                address,
                interface: String::new(),
                block_id: None,
                route_ids: RouteIds::default(),
            }),
        )
        .unwrap()
    }

    fn switch(id: &str, addr1: u16, port1: u16, x: i32, y: i32) -> Tile {
        Tile::new(
            id,
            Direction::West,
            Position::new(x, y, 0),
            TileData::Switch(SwitchData {
                subtype: SwitchSubtype::Left,
                dir: false,
                addr1,
                port1,
                gate1: 0,
                addr2: 0,
                port2: 0,
                gate2: 0,
                interface: String::new(),
                block_id: None,
            }),
        )
        .unwrap()
    }

    fn straight(id: &str, x: i32, y: i32) -> Tile {
        Tile::new(
            id,
            Direction::West,
            Position::new(x, y, 0),
            TileData::Track(TrackData {
                subtype: TrackSubtype::Straight,
                counterpart_id: None,
                route_ids: RouteIds::default(),
            }),
        )
        .unwrap()
    }

    #[test]
    fn zero_address_feedback_is_an_error() {
        let mut model = InMemoryModel::default();
        model.tiles.push(feedback("fb1", 0, 0, 0));
        let (healthy, report) = check_plan_health(&mut model, &HealthConfig::default());
        assert!(!healthy);
        assert!(report.errors().any(|d| d.code == "feedback-no-address"));
    }

    #[test]
    fn duplicate_feedback_address_is_an_error() {
        let mut model = InMemoryModel::default();
        model.tiles.push(feedback("fb1", 5, 0, 0));
        model.tiles.push(feedback("fb2", 5, 1, 0));
        let (healthy, report) = check_plan_health(&mut model, &HealthConfig::default());
        assert!(!healthy);
        assert!(report.errors().any(|d| d.code == "duplicate-feedback-address"));
    }

    #[test]
    fn duplicate_switch_address_is_a_warning_not_an_error() {
        let mut model = InMemoryModel::default();
        model.tiles.push(switch("sw1", 1, 1, 0, 0));
        model.tiles.push(switch("sw2", 1, 1, 1, 0));
        let (healthy, report) = check_plan_health(&mut model, &HealthConfig::default());
        assert!(healthy);
        assert!(report.warnings().any(|d| d.code == "duplicate-address"));
    }

    #[test]
    fn overlap_is_detected() {
        let mut model = InMemoryModel::default();
        model.tiles.push(straight("t1", 3, 3));
        model.tiles.push(straight("t2", 3, 3));
        let (healthy, report) = check_plan_health(&mut model, &HealthConfig::default());
        assert!(!healthy);
        assert!(report.errors().any(|d| d.code == "overlap"));
    }

    #[test]
    fn out_of_range_coordinate_is_clamped_to_zero() {
        let mut model = InMemoryModel::default();
        model.tiles.push(straight("t1", 300, 0));
        let (healthy, report) = check_plan_health(&mut model, &HealthConfig::default());
        assert!(!healthy);
        assert!(report.errors().any(|d| d.code == "invalid-coordinates"));
        assert_eq!(model.tiles[0].position.x, 0);
    }

    #[test]
    fn disabled_block_side_routing_is_a_fatal_error() {
        let mut model = InMemoryModel::default();
        let config = HealthConfig {
            block_side_routing_enabled: false,
            ..HealthConfig::default()
        };
        let (healthy, report) = check_plan_health(&mut model, &config);
        assert!(!healthy);
        assert!(report.errors().any(|d| d.code == "block-side-routing-disabled"));
    }

    #[test]
    fn loco_zero_address_exempted_for_analog_protocol() {
        use crate::tile::LocoRecord;
        let mut model = InMemoryModel::default();
        model.locos.push(LocoRecord {
            id: "loco1".to_string(),
            protocol: LocoProtocol::Analog,
            address: 0,
        });
        let (healthy, _report) = check_plan_health(&mut model, &HealthConfig::default());
        assert!(healthy);
    }

    #[test]
    fn loco_zero_address_errors_for_digital_protocol() {
        use crate::tile::LocoRecord;
        let mut model = InMemoryModel::default();
        model.locos.push(LocoRecord {
            id: "loco1".to_string(),
            protocol: LocoProtocol::Digital("DCC".to_string()),
            address: 0,
        });
        let (healthy, report) = check_plan_health(&mut model, &HealthConfig::default());
        assert!(!healthy);
        assert!(report.errors().any(|d| d.code == "loco-no-address"));
    }

    #[test]
    fn most_distant_tile_is_reported() {
        let mut model = InMemoryModel::default();
        model.tiles.push(straight("near", 1, 1));
        model.tiles.push(straight("far", 10, 10));
        let (_, report) = check_plan_health(&mut model, &HealthConfig::default());
        let info = report
            .all()
            .iter()
            .find(|d| d.code == "most-distant-tile")
            .unwrap();
        assert!(info.message.contains("far"));
    }
}
