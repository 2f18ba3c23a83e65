use std::hash::Hasher;

use farlight_game::{Catalog, ColonyCfg, ColonySession, ColonyState, ResourceKind};
use serde_json::{Map, Value};
use twox_hash::XxHash64;

#[test]
fn catalog_asset_and_loader_agree_on_shape() {
    let from_loader = canonicalize_value(serde_json::to_value(Catalog::standard()).unwrap());
    let reparsed = Catalog::from_json(include_str!("../assets/data/catalog.json")).unwrap();
    let from_asset = canonicalize_value(serde_json::to_value(&reparsed).unwrap());

    let loader_canonical = serde_json::to_string_pretty(&from_loader).unwrap();
    let asset_canonical = serde_json::to_string_pretty(&from_asset).unwrap();
    assert_eq!(
        snapshot_hash(loader_canonical.as_bytes()),
        snapshot_hash(asset_canonical.as_bytes()),
        "catalog snapshot drifted between loader and asset\n{loader_canonical}"
    );
}

#[test]
fn shipped_config_matches_coded_defaults() {
    let shipped = canonicalize_value(serde_json::to_value(ColonyCfg::standard()).unwrap());
    let coded = canonicalize_value(serde_json::to_value(ColonyCfg::default_config()).unwrap());
    assert_eq!(
        shipped, coded,
        "colony.json and the default constants disagree"
    );
}

#[test]
fn colony_state_serialization_preserves_progress() {
    let mut session = ColonySession::new(0xFACE_B00C);
    session.start_mission("debris", 1_000).unwrap();
    session.collect_signal();
    session.roll_recruits(1_500, false).unwrap();
    session.advance(2_000);
    for step in 0..3u64 {
        session.advance(2_500 + step * 500);
    }
    assert!(session.state().tick_count > 0, "simulation should tick");

    let saved = serde_json::to_string(session.state()).unwrap();
    let restored: ColonyState = serde_json::from_str(&saved).unwrap();

    let original_value = serde_json::to_value(session.state()).unwrap();
    let restored_value = serde_json::to_value(&restored).unwrap();
    assert_eq!(original_value, restored_value, "round-trip mismatch");
    assert_eq!(restored.missions, session.state().missions);
    assert_eq!(restored.recruits, session.state().recruits);
    assert_eq!(restored.log, session.state().log);
    assert_eq!(restored.next_tick_due, session.state().next_tick_due);
}

#[test]
fn partial_snapshot_merges_onto_defaults() {
    let blob = r#"{
        "tick_count": 9,
        "buildings": { "antenna": 2 },
        "unknown_future_field": { "ignored": true }
    }"#;
    let session = ColonySession::from_snapshot(blob);
    let state = session.state();

    assert_eq!(state.tick_count, 9);
    assert_eq!(state.building_level("antenna"), 2);
    // Everything the blob omitted comes from defaults, not holes.
    assert!((state.ledger.get(ResourceKind::Fuel) - 12.0).abs() < 1e-9);
    assert!((state.ledger.get(ResourceKind::Food) - 30.0).abs() < 1e-9);
    assert_eq!(state.workers.total, 3);
    assert!((state.workers.satisfaction - 1.0).abs() < 1e-9);
    assert!(state.missions.is_empty());
    assert_eq!(state.next_recruit_id, 1);
}

#[test]
fn hostile_snapshot_values_are_reclamped_on_load() {
    let blob = r#"{
        "ledger": { "food": -25.0, "metal": 40.0 },
        "workers": { "total": 2, "assigned": { "miner": 5 }, "satisfaction": 7.5 }
    }"#;
    let session = ColonySession::from_snapshot(blob);
    let state = session.state();

    assert!((state.ledger.get(ResourceKind::Food) - 0.0).abs() < 1e-9);
    assert!((state.ledger.get(ResourceKind::Metal) - 40.0).abs() < 1e-9);
    assert!(state.workers.assigned_total() <= state.workers.total);
    assert!(state.workers.satisfaction <= 1.2);
}

fn canonicalize_value(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(canonicalize_value)
                .collect::<Vec<_>>(),
        ),
        Value::Object(map) => {
            let mut result = Map::with_capacity(map.len());
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, value) in entries {
                result.insert(key, canonicalize_value(value));
            }
            Value::Object(result)
        }
        other => other,
    }
}

fn snapshot_hash(bytes: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(bytes);
    hasher.finish()
}
