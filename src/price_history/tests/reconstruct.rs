use chrono::Duration;
use diesel::connection::SimpleConnection;
use price_history::{errors::ReconstructError, reconstruct::rebuild, store::SnapshotStore};
use proptest::prelude::*;

mod common;

#[test]
fn bitcoin_hourly_scenario() {
    let t = common::temp_store();
    let t0 = common::at(2024, 7, 1, 12, 0, 0);

    t.store.append(&common::obs("Bitcoin", 65000.0, "CoinMarketCap", t0)).unwrap();
    t.store
        .append(&common::obs("Bitcoin", 65500.0, "CoinMarketCap", t0 + Duration::seconds(3600)))
        .unwrap();

    let recon = rebuild(&t.store).unwrap();
    assert_eq!(recon.groups_visited, 2);
    assert_eq!(recon.records_visited, 2);
    assert_eq!(recon.skipped_count(), 0);
    assert_eq!(
        recon.get("Bitcoin", "CoinMarketCap").unwrap().pairs(),
        vec![(t0, 65000.0), (t0 + Duration::seconds(3600), 65500.0)]
    );
}

#[test]
fn absent_store_is_empty_not_an_error() {
    let t = common::temp_store();
    let recon = rebuild(&t.store).unwrap();
    assert!(recon.series.is_empty());
    assert_eq!(recon.groups_visited, 0);
    assert!(!t.store.exists(), "rebuild must not create the file");
}

#[test]
fn zero_byte_file_is_empty_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.db");
    std::fs::write(&path, b"").unwrap();

    let recon = rebuild(&SnapshotStore::new(&path)).unwrap();
    assert!(recon.series.is_empty());
}

#[test]
fn migrated_store_without_groups_is_empty() {
    let t = common::temp_store();
    std::fs::create_dir_all(t.store.path().parent().unwrap()).unwrap();
    price_history::db::migrate::run_sqlite(&t.path_str()).unwrap();

    let recon = rebuild(&t.store).unwrap();
    assert!(recon.series.is_empty());
    assert_eq!(recon.records_visited, 0);
}

#[test]
fn record_missing_attributes_is_skipped_and_reported_once() {
    let t = common::temp_store();
    let t0 = common::at(2024, 7, 1, 12, 0, 0);

    t.store.append(&common::obs("Bitcoin", 65000.0, "CoinMarketCap", t0)).unwrap();
    t.store.append(&common::obs("Ethereum", 3400.0, "CoinMarketCap-ETH", t0)).unwrap();

    // Record written by something that never set its attributes.
    let mut conn = t.raw_conn();
    conn.batch_execute(
        "INSERT INTO entity_record (group_id, record_name, value)
         SELECT id, 'Dogecoin', 0.12 FROM snapshot_group WHERE source = 'CoinMarketCap'",
    )
    .unwrap();
    drop(conn);

    let recon = rebuild(&t.store).unwrap();
    assert_eq!(recon.records_visited, 3);
    assert_eq!(recon.skipped_count(), 1);
    match &recon.skipped[0] {
        ReconstructError::CorruptRecord { group, record, problem } => {
            assert_eq!(group, "CoinMarketCap_2024-07-01_12-00-00");
            assert_eq!(record, "Dogecoin");
            assert_eq!(problem, "missing name");
        }
        other => panic!("unexpected skip reason: {other}"),
    }

    assert_eq!(recon.series.len(), 2);
    assert_eq!(recon.get("Bitcoin", "CoinMarketCap").unwrap().pairs(), vec![(t0, 65000.0)]);
    assert_eq!(recon.get("Ethereum", "CoinMarketCap-ETH").unwrap().pairs(), vec![(t0, 3400.0)]);
}

#[test]
fn unparseable_timestamp_is_skipped() {
    let t = common::temp_store();
    let t0 = common::at(2024, 7, 1, 12, 0, 0);
    t.store.append(&common::obs("XRP", 0.5, "CoinMarketCap-XRP", t0)).unwrap();
    t.store
        .append(&common::obs("XRP", 0.6, "CoinMarketCap-XRP", t0 + Duration::hours(1)))
        .unwrap();

    let mut conn = t.raw_conn();
    conn.batch_execute(
        "UPDATE entity_record SET attr_captured_at = 'noon-ish'
         WHERE value = 0.6",
    )
    .unwrap();
    drop(conn);

    let recon = rebuild(&t.store).unwrap();
    assert_eq!(recon.skipped_count(), 1);
    assert_eq!(recon.get("XRP", "CoinMarketCap-XRP").unwrap().pairs(), vec![(t0, 0.5)]);
}

#[test]
fn record_without_its_group_is_counted_and_reported() {
    let t = common::temp_store();
    let t0 = common::at(2024, 7, 1, 12, 0, 0);
    t.store.append(&common::obs("Bitcoin", 65000.0, "CoinMarketCap", t0)).unwrap();

    let mut conn = t.raw_conn();
    conn.batch_execute(
        "PRAGMA foreign_keys=OFF;
         INSERT INTO entity_record
             (group_id, record_name, value, attr_name, attr_price, attr_captured_at, attr_source)
         VALUES (999, 'Ethereum', 3400.0, 'Ethereum', 3400.0, '2024-07-01 12:00:00', 'CoinMarketCap-ETH');",
    )
    .unwrap();
    drop(conn);

    let recon = rebuild(&t.store).unwrap();
    assert_eq!(recon.records_visited, 2);
    assert_eq!(recon.skipped_count(), 1);
    match &recon.skipped[0] {
        ReconstructError::CorruptRecord { group, record, problem } => {
            assert_eq!(group, "<group 999>");
            assert_eq!(record, "Ethereum");
            assert_eq!(problem, "owning group is missing");
        }
        other => panic!("unexpected skip reason: {other}"),
    }
    assert_eq!(recon.series.len(), 1);
    assert!(recon.get("Bitcoin", "CoinMarketCap").is_some());
}

#[test]
fn file_that_is_not_a_database_is_a_hard_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.db");
    std::fs::write(&path, "definitely not sqlite\n".repeat(256)).unwrap();

    let err = rebuild(&SnapshotStore::new(&path)).unwrap_err();
    assert!(
        matches!(err, ReconstructError::Open { .. } | ReconstructError::Query(_)),
        "{err}"
    );
}

#[test]
fn series_are_keyed_by_recorded_source_not_group_name() {
    let t = common::temp_store();
    let t0 = common::at(2024, 7, 1, 12, 0, 0);
    t.store.append(&common::obs("Bitcoin", 1.0, "Coin_Market", t0)).unwrap();

    let recon = rebuild(&t.store).unwrap();
    let keys: Vec<_> = recon.series.keys().map(|k| (k.entity.as_str(), k.source.as_str())).collect();
    assert_eq!(keys, vec![("Bitcoin", "Coin_Market")]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn rebuild_sorts_out_of_order_inserts(
        offsets in prop::collection::hash_set(0i64..100_000, 1..12)
    ) {
        let t = common::temp_store();
        let t0 = common::at(2024, 1, 1, 0, 0, 0);

        // HashSet iteration order is arbitrary, so inserts arrive out of order.
        for off in &offsets {
            let when = t0 + Duration::seconds(*off);
            t.store.append(&common::obs("Bitcoin", *off as f64, "CoinMarketCap", when)).unwrap();
        }

        let recon = rebuild(&t.store).unwrap();
        let series = recon.get("Bitcoin", "CoinMarketCap").unwrap();
        prop_assert_eq!(series.len(), offsets.len());
        prop_assert!(series.points.windows(2).all(|w| w[0].captured_at < w[1].captured_at));
        for p in &series.points {
            prop_assert_eq!(p.price, (p.captured_at - t0).num_seconds() as f64);
        }
    }
}
