//! Integration tests for the acquisition pipeline
//!
//! These tests run the full poll loop against a simulated server and an
//! on-disk store:
//! - Failure isolation within a sweep
//! - Fatal resolution and session errors
//! - Idempotent bootstrap across restarts
//! - Cancellation and draining

mod common;

use common::builders::ConfigBuilder;
use common::reopen_store;
use common::sim_helpers::{constant, plant_for, run_loop, run_loop_with};
use linewatch::client::ValuePattern;
use linewatch::ingest::{PollState, Shutdown};
use linewatch::store::queries;
use linewatch::{IngestError, Quality, SampleValue};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_failed_variable_does_not_stop_sweep() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("readings.db");
    let config = ConfigBuilder::new(&db).max_sweeps(Some(2)).build();
    let (server, machine) = plant_for(&config);
    server.add_variable(&machine, "A", constant(1));
    let b = server.add_variable(&machine, "B", constant(2));
    server.set_quality(&b, Quality::Uncertain);
    let c = server.add_variable(&machine, "C", constant(3));
    server.fail_reads(&c, "BadTimeout");

    let summary = run_loop(&config, &server).unwrap();

    // Two readings and one error per sweep, and the loop kept going
    assert_eq!(summary.stats.sweeps, 2);
    assert_eq!(summary.stats.readings, 4);
    assert_eq!(summary.stats.read_errors, 2);
    assert_eq!(summary.stats.write_errors, 0);

    let store = reopen_store(&db);
    let a = queries::history(&store, "Palletizer", "A").unwrap();
    assert_eq!(a.len(), 2);
    assert!(a.iter().all(|r| r.value == "1" && r.quality == Quality::Good));

    let b = queries::history(&store, "Palletizer", "B").unwrap();
    assert_eq!(b.len(), 2);
    assert!(b.iter().all(|r| r.value == "2" && r.quality == Quality::Uncertain));

    assert!(queries::history(&store, "Palletizer", "C").unwrap().is_empty());
}

#[test]
fn test_reserved_and_non_variable_children_are_not_stored() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("readings.db");
    let config = ConfigBuilder::new(&db).build();
    let (server, machine) = plant_for(&config);
    server.add_variable(&machine, "Speed", ValuePattern::Constant(SampleValue::Float(123.45)));
    server.add_variable(&machine, "_Statistics", constant(7));
    server.add_object(Some(&machine), "Diagnostics");

    run_loop(&config, &server).unwrap();

    let store = reopen_store(&db);
    let rows = queries::latest(&store, 10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].variable, "Speed");
    assert_eq!(rows[0].value, "123.45");
    assert_eq!(rows[0].line, "Serac4");
}

#[test]
fn test_write_failure_is_isolated() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("readings.db");
    let config = ConfigBuilder::new(&db).max_sweeps(Some(3)).build();
    let (server, machine) = plant_for(&config);
    server.add_variable(&machine, "A", constant(1));
    server.add_variable(&machine, "B", constant(2));
    server.add_variable(&machine, "C", constant(3));

    // A first run creates the schema, then a trigger rejects B
    {
        let bootstrap = ConfigBuilder::new(&db).max_sweeps(Some(1)).build();
        run_loop(&bootstrap, &server).unwrap();
        let store = reopen_store(&db);
        store
            .connection()
            .execute_batch(
                "CREATE TRIGGER reject_b BEFORE INSERT ON reading
                 WHEN NEW.variable = 'B'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();
        store.close().unwrap();
    }

    let summary = run_loop(&config, &server).unwrap();
    assert_eq!(summary.stats.sweeps, 3);
    assert_eq!(summary.stats.readings, 6);
    assert_eq!(summary.stats.write_errors, 3);

    let store = reopen_store(&db);
    assert_eq!(queries::history(&store, "Palletizer", "C").unwrap().len(), 4);
    assert_eq!(queries::history(&store, "Palletizer", "B").unwrap().len(), 1);
}

#[test]
fn test_missing_line_fails_before_running() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("readings.db");
    let good = ConfigBuilder::new(&db).build();
    let (server, machine) = plant_for(&good);
    server.add_variable(&machine, "A", constant(1));

    let config = ConfigBuilder::new(&db).line("Serac9").build();
    let err = run_loop(&config, &server).unwrap_err();
    match err {
        IngestError::Resolution { level, name, .. } => {
            assert_eq!(level, 2);
            assert_eq!(name, "Serac9");
        }
        other => panic!("unexpected error: {other}"),
    }

    // Bootstrap ran, but no sweep did
    let store = reopen_store(&db);
    assert_eq!(queries::count_readings(&store).unwrap(), 0);
    assert!(queries::machine(&store, "Palletizer").unwrap().is_some());
}

#[test]
fn test_bootstrap_is_idempotent_across_restarts() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("readings.db");
    let config = ConfigBuilder::new(&db).build();
    let (server, machine) = plant_for(&config);
    server.add_variable(&machine, "A", constant(1));

    let first = run_loop(&config, &server).unwrap();
    let second = run_loop(&config, &server).unwrap();
    assert_eq!(first.seed, second.seed);

    let store = reopen_store(&db);
    let count: i64 = store
        .connection()
        .query_row("SELECT COUNT(*) FROM machine", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(queries::count_readings(&store).unwrap(), 2);
}

#[test]
fn test_timestamps_do_not_go_backwards() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("readings.db");
    let config = ConfigBuilder::new(&db).max_sweeps(Some(4)).build();
    let (server, machine) = plant_for(&config);
    server.add_variable(&machine, "Count", ValuePattern::Counter { start: 0, step: 1 });
    server.add_variable(&machine, "Other", constant(0));

    run_loop(&config, &server).unwrap();
    let previous_max = queries::max_timestamp(&reopen_store(&db), "Palletizer")
        .unwrap()
        .unwrap();

    run_loop(&config, &server).unwrap();

    let store = reopen_store(&db);
    let rows = queries::history(&store, "Palletizer", "Count").unwrap();
    assert_eq!(rows.len(), 8);
    let mut by_id = rows.clone();
    by_id.sort_by_key(|r| r.id);
    for pair in by_id.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
    assert!(by_id[4..].iter().all(|r| r.timestamp >= previous_max));
    assert_eq!(
        by_id.iter().map(|r| r.value.as_str()).collect::<Vec<_>>(),
        vec!["0", "1", "2", "3", "4", "5", "6", "7"]
    );
}

#[test]
fn test_fallback_endpoint_is_used() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("readings.db");
    let config = ConfigBuilder::new(&db)
        .endpoint("sim://primary")
        .fallback("sim://backup")
        .build();
    let (server, machine) = plant_for(&config);
    server.add_variable(&machine, "A", constant(1));
    server.accept_only(&["sim://backup"]);

    let summary = run_loop(&config, &server).unwrap();
    assert_eq!(summary.stats.readings, 1);
    assert_eq!(server.connect_count(), 1);
}

#[test]
fn test_unreachable_server_fails_startup() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("readings.db");
    let config = ConfigBuilder::new(&db).build();
    let (server, _) = plant_for(&config);
    server.set_accepting(false);

    let err = run_loop(&config, &server).unwrap_err();
    assert!(matches!(err, IngestError::Connection(_)));
}

#[test]
fn test_cancellation_drains_and_stops() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("readings.db");
    let config = ConfigBuilder::new(&db)
        .interval_ms(10_000)
        .max_sweeps(None)
        .build();
    let (server, machine) = plant_for(&config);
    server.add_variable(&machine, "A", constant(1));

    let shutdown = Shutdown::new();
    let remote = shutdown.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        remote.trigger();
    });

    let summary = run_loop_with(&config, &server, shutdown).unwrap();
    handle.join().unwrap();

    assert!(summary.cancelled);
    assert!(summary.elapsed < Duration::from_secs(10));
    assert_eq!(summary.stats.sweeps, 1);
    assert_eq!(
        &summary.transitions[summary.transitions.len() - 3..],
        &[PollState::Running, PollState::Draining, PollState::Stopped]
    );

    let store = reopen_store(&db);
    assert_eq!(queries::count_readings(&store).unwrap(), 1);
}

#[test]
fn test_lost_transport_stops_the_loop() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("readings.db");
    let config = ConfigBuilder::new(&db)
        .interval_ms(5)
        .max_sweeps(None)
        .build();
    let (server, machine) = plant_for(&config);
    server.add_variable(&machine, "A", constant(1));

    let remote = server.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        remote.drop_transport();
    });

    let err = run_loop(&config, &server).unwrap_err();
    handle.join().unwrap();
    assert!(err.is_session_fatal());

    // Connections were released; the file can be reopened and read
    let store = reopen_store(&db);
    assert!(queries::count_readings(&store).is_ok());
}
