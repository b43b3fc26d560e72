//! Integration tests for the Controller → FSM → pumps → storage pipeline.

use wellflow::Error;
use wellflow::app::controller::{Controller, DEFAULT_HEARTBEAT, Persisted};
use wellflow::app::events::ControllerEvent;
use wellflow::app::ports::Document;
use wellflow::fsm::{ControlState, Transition};
use wellflow::history::History;
use wellflow::sensors::tank::TankLevel;
use wellflow::snapshot::Snapshot;

use super::mock_hw::{ManualClock, MemoryStore, RecordingSink, Rig, minutes, saved, settings, t0};

type TestController = Controller<MemoryStore, ManualClock>;

fn start(rig: &Rig, sink: &mut RecordingSink) -> TestController {
    Controller::new(
        settings(),
        rig.hardware(),
        rig.store.clone(),
        rig.clock.clone(),
        DEFAULT_HEARTBEAT,
        sink,
    )
    .unwrap()
}

/// Fresh controller ticked at t0 and again once the well is full.
fn in_fill_lower_tank(rig: &Rig, sink: &mut RecordingSink) -> TestController {
    let mut c = start(rig, sink);
    c.tick(sink).unwrap();
    rig.clock.advance(minutes(60));
    c.tick(sink).unwrap();
    assert_eq!(c.state(), ControlState::FillLowerTank);
    c
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn fresh_start_forces_pumps_off_in_fill_well() {
    let rig = Rig::new();
    let mut sink = RecordingSink::new();
    let c = start(&rig, &mut sink);

    assert_eq!(c.state(), ControlState::FillWell);
    assert_eq!(rig.well_out.writes(), vec![false]);
    assert_eq!(rig.transfer_out.writes(), vec![false]);
    assert_eq!(sink.events, vec![ControllerEvent::Started(Snapshot::initial(t0()))]);
    assert!(rig.store.writes().is_empty(), "nothing is written before the first tick");
    assert!(c.history().is_empty());
}

#[test]
fn corrupt_documents_fall_back_to_defaults() {
    let rig = Rig::new();
    rig.store.put(Document::Snapshot, "{not json");
    rig.store.put(Document::History, "[1, 2]");
    let mut sink = RecordingSink::new();
    let c = start(&rig, &mut sink);

    assert_eq!(c.state(), ControlState::FillWell);
    assert_eq!(*c.latest(), Snapshot::initial(t0()));
    assert!(c.history().is_empty());
}

#[test]
fn corrupt_documents_are_kept_aside() {
    let rig = Rig::new();
    rig.store.put(Document::Snapshot, "{not json");
    rig.store.put(Document::History, "[1, 2]");
    let mut sink = RecordingSink::new();
    let mut c = start(&rig, &mut sink);
    c.tick(&mut sink).unwrap();

    assert_eq!(rig.store.quarantined(Document::Snapshot).as_deref(), Some("{not json"));
    assert_eq!(rig.store.quarantined(Document::History).as_deref(), Some("[1, 2]"));
    let history = History::from_json(&rig.store.get(Document::History).unwrap()).unwrap();
    assert_eq!(history.len(), 1);
}

#[test]
fn readable_documents_are_not_moved() {
    let rig = Rig::new();
    let prior = saved(
        ControlState::FillWell,
        20,
        TankLevel::Empty,
        TankLevel::Empty,
        t0(),
        t0(),
    );
    rig.store.put(Document::Snapshot, &prior.to_json().unwrap());
    let mut sink = RecordingSink::new();
    start(&rig, &mut sink);
    assert_eq!(rig.store.quarantined(Document::Snapshot), None);
    assert!(rig.store.get(Document::Snapshot).is_some());
}

// ── Ticking ───────────────────────────────────────────────────

#[test]
fn first_tick_persists_snapshot_and_history() {
    let rig = Rig::new();
    let mut sink = RecordingSink::new();
    let mut c = start(&rig, &mut sink);

    let out = c.tick(&mut sink).unwrap();
    assert_eq!(out.state, ControlState::FillWell);
    assert_eq!(out.transition, None);
    assert_eq!(out.persisted, Persisted::Full);
    assert_eq!(rig.store.writes(), vec![Document::Snapshot, Document::History]);

    let stored = Snapshot::from_json(&rig.store.get(Document::Snapshot).unwrap()).unwrap();
    assert_eq!(stored, *c.latest());
    assert_eq!(stored.time, t0());
    let history = History::from_json(&rig.store.get(Document::History).unwrap()).unwrap();
    assert_eq!(history.len(), 1);
}

#[test]
fn full_well_starts_well_pump_in_same_tick() {
    let rig = Rig::new();
    let mut sink = RecordingSink::new();
    let mut c = start(&rig, &mut sink);
    c.tick(&mut sink).unwrap();

    rig.clock.advance(minutes(30));
    let out = c.tick(&mut sink).unwrap();
    assert_eq!(out.state, ControlState::FillWell);
    assert_eq!(c.latest().well_level.get(), 50);

    rig.clock.advance(minutes(30));
    let out = c.tick(&mut sink).unwrap();
    assert_eq!(
        out.transition,
        Some(Transition {
            from: ControlState::FillWell,
            to: ControlState::FillLowerTank
        })
    );
    assert_eq!(rig.well_out.is_on(), Some(true));
    assert_eq!(rig.transfer_out.is_on(), Some(false));
    assert_eq!(c.state_activated_at(), t0() + chrono::TimeDelta::minutes(60));
    assert!(c.latest().well_to_lower_tank_pump_active);
}

#[test]
fn full_transfer_cycle() {
    let rig = Rig::new();
    let mut sink = RecordingSink::new();
    let mut c = in_fill_lower_tank(&rig, &mut sink);

    // Pump drains the well: 15 of 30 minutes.
    rig.lower.set(TankLevel::Medium);
    rig.clock.advance(minutes(15));
    c.tick(&mut sink).unwrap();
    assert_eq!(c.state(), ControlState::FillLowerTank);
    assert_eq!(c.latest().well_level.get(), 50);

    // Lower tank full: settle with both pumps off.
    rig.lower.set(TankLevel::Full);
    rig.clock.advance(minutes(1));
    c.tick(&mut sink).unwrap();
    assert_eq!(c.state(), ControlState::SettleLowerTank);
    assert_eq!(c.pumps_active(), (false, false));

    // Exactly the settle time is not enough.
    rig.clock.advance(minutes(10));
    c.tick(&mut sink).unwrap();
    assert_eq!(c.state(), ControlState::SettleLowerTank);

    rig.clock.advance(std::time::Duration::from_secs(1));
    c.tick(&mut sink).unwrap();
    assert_eq!(c.state(), ControlState::FillUpperTank);
    assert_eq!(rig.transfer_out.is_on(), Some(true));
    assert_eq!(rig.well_out.is_on(), Some(false));

    rig.lower.set(TankLevel::Medium);
    rig.upper.set(TankLevel::Full);
    rig.clock.advance(minutes(1));
    c.tick(&mut sink).unwrap();
    assert_eq!(c.state(), ControlState::UpperTankInUse);
    assert_eq!(c.pumps_active(), (false, false));

    // Upper tank used up while the lower still holds water.
    rig.upper.set(TankLevel::Empty);
    rig.clock.advance(minutes(90));
    c.tick(&mut sink).unwrap();
    assert_eq!(c.state(), ControlState::FillUpperTank);

    let expected: Vec<(String, String)> = [
        ("FillWell", "FillLowerTank"),
        ("FillLowerTank", "SettleLowerTank"),
        ("SettleLowerTank", "FillUpperTank"),
        ("FillUpperTank", "UpperTankInUse"),
        ("UpperTankInUse", "FillUpperTank"),
    ]
    .iter()
    .map(|(a, b)| (a.to_string(), b.to_string()))
    .collect();
    assert_eq!(sink.transitions(), expected);
}

#[test]
fn dry_well_stops_pump_and_waits() {
    let rig = Rig::new();
    let mut sink = RecordingSink::new();
    let mut c = in_fill_lower_tank(&rig, &mut sink);

    rig.lower.set(TankLevel::Medium);
    rig.clock.advance(minutes(30));
    let out = c.tick(&mut sink).unwrap();
    assert_eq!(out.state, ControlState::FillWell);
    assert_eq!(c.latest().well_level.get(), 0);
    assert_eq!(rig.well_out.is_on(), Some(false));

    // Refills while idle.
    rig.clock.advance(minutes(6));
    c.tick(&mut sink).unwrap();
    assert_eq!(c.latest().well_level.get(), 10);
}

#[test]
fn chained_transitions_run_only_the_settled_action() {
    let rig = Rig::new();
    let prior = saved(
        ControlState::UpperTankInUse,
        0,
        TankLevel::Medium,
        TankLevel::Medium,
        t0(),
        t0(),
    );
    rig.store.put(Document::Snapshot, &prior.to_json().unwrap());
    let mut sink = RecordingSink::new();
    let mut c = start(&rig, &mut sink);

    // Both tanks read empty and the well is dry:
    // UpperTankInUse -> FillLowerTank -> FillWell within one tick.
    let out = c.tick(&mut sink).unwrap();
    assert_eq!(
        out.transition,
        Some(Transition {
            from: ControlState::UpperTankInUse,
            to: ControlState::FillWell
        })
    );
    assert_eq!(sink.transitions().len(), 1);
    assert!(rig.well_out.writes().iter().all(|on| !on), "well pump never switched on");
}

// ── Persistence ───────────────────────────────────────────────

#[test]
fn unchanged_plant_only_heartbeats() {
    let rig = Rig::new();
    rig.lower.set(TankLevel::Medium);
    rig.upper.set(TankLevel::Medium);
    let prior = saved(
        ControlState::UpperTankInUse,
        100,
        TankLevel::Medium,
        TankLevel::Medium,
        t0(),
        t0(),
    );
    rig.store.put(Document::Snapshot, &prior.to_json().unwrap());
    let mut sink = RecordingSink::new();
    let mut c = start(&rig, &mut sink);

    assert_eq!(c.tick(&mut sink).unwrap().persisted, Persisted::Full);

    let secs = std::time::Duration::from_secs;
    rig.clock.advance(secs(30));
    assert_eq!(c.tick(&mut sink).unwrap().persisted, Persisted::None);
    rig.clock.advance(secs(30));
    assert_eq!(c.tick(&mut sink).unwrap().persisted, Persisted::Heartbeat);
    rig.clock.advance(secs(59));
    assert_eq!(c.tick(&mut sink).unwrap().persisted, Persisted::None);
    rig.clock.advance(secs(1));
    assert_eq!(c.tick(&mut sink).unwrap().persisted, Persisted::Heartbeat);

    assert_eq!(c.history().len(), 1, "identical captures are not recorded");
    assert_eq!(
        rig.store.writes(),
        vec![
            Document::Snapshot,
            Document::History,
            Document::Snapshot,
            Document::Snapshot
        ]
    );
    let heartbeats = sink
        .events
        .iter()
        .filter(|e| matches!(e, ControllerEvent::Heartbeat { .. }))
        .count();
    assert_eq!(heartbeats, 2);

    // The heartbeat rewrite carries the latest capture time.
    let stored = Snapshot::from_json(&rig.store.get(Document::Snapshot).unwrap()).unwrap();
    assert_eq!(stored.time, t0() + chrono::TimeDelta::seconds(120));
    // History keeps the first of the identical captures.
    assert_eq!(c.history().latest().unwrap().time, t0());
}

#[test]
fn storage_failure_is_surfaced() {
    let rig = Rig::new();
    let mut sink = RecordingSink::new();
    let mut c = start(&rig, &mut sink);
    rig.store.fail_writes();
    let err = c.tick(&mut sink).unwrap_err();
    assert!(matches!(err, Error::Io { .. }), "{err}");
}

#[test]
fn history_missed_by_a_failed_write_is_saved_on_recovery() {
    let rig = Rig::new();
    let mut sink = RecordingSink::new();
    let mut c = start(&rig, &mut sink);
    c.tick(&mut sink).unwrap();

    // The well rises 0 -> 10 % while storage is down.
    rig.store.fail_writes();
    rig.clock.advance(minutes(6));
    assert!(c.tick(&mut sink).is_err());
    assert_eq!(c.history().len(), 2);
    let on_disk = History::from_json(&rig.store.get(Document::History).unwrap()).unwrap();
    assert_eq!(on_disk.len(), 1);

    // Within the same percent, so the capture equals the unsaved entry.
    rig.store.allow_writes();
    rig.clock.advance(std::time::Duration::from_secs(1));
    let out = c.tick(&mut sink).unwrap();
    assert_eq!(out.persisted, Persisted::Full);
    assert_eq!(c.history().len(), 2);
    let on_disk = History::from_json(&rig.store.get(Document::History).unwrap()).unwrap();
    assert_eq!(on_disk, *c.history());

    // Clean again: an unchanged plant only heartbeats.
    rig.clock.advance(std::time::Duration::from_secs(1));
    assert_eq!(c.tick(&mut sink).unwrap().persisted, Persisted::None);
}

// ── Failure and shutdown ──────────────────────────────────────

#[test]
fn sensor_failure_is_surfaced_and_shutdown_stops_pumps() {
    let rig = Rig::new();
    let mut sink = RecordingSink::new();
    let mut c = in_fill_lower_tank(&rig, &mut sink);
    assert_eq!(rig.well_out.is_on(), Some(true));

    rig.lower.break_wire();
    rig.clock.advance(minutes(1));
    let err = c.tick(&mut sink).unwrap_err();
    assert!(matches!(err, Error::Hardware(_)), "{err}");

    c.shutdown(&mut sink).unwrap();
    assert_eq!(rig.well_out.is_on(), Some(false));
    assert_eq!(rig.transfer_out.is_on(), Some(false));
    assert!(matches!(sink.events.last(), Some(ControllerEvent::Stopped { .. })));
}

#[test]
fn shutdown_reasserts_outputs_even_when_idle() {
    let rig = Rig::new();
    let mut sink = RecordingSink::new();
    let mut c = start(&rig, &mut sink);
    c.shutdown(&mut sink).unwrap();
    assert_eq!(rig.well_out.writes(), vec![false, false]);
    assert_eq!(rig.transfer_out.writes(), vec![false, false]);
}

#[test]
fn stop_request_ends_run_with_pumps_off() {
    let rig = Rig::new();
    let mut sink = RecordingSink::new();
    let mut c = in_fill_lower_tank(&rig, &mut sink);
    assert_eq!(rig.well_out.is_on(), Some(true));

    let (stop_tx, stop_rx) = std::sync::mpsc::channel();
    stop_tx.send(()).unwrap();
    c.run(&mut sink, std::time::Duration::from_secs(3600), &stop_rx).unwrap();

    assert_eq!(rig.well_out.is_on(), Some(false));
    assert_eq!(rig.transfer_out.is_on(), Some(false));
    assert!(matches!(sink.events.last(), Some(ControllerEvent::Stopped { .. })));
}

#[test]
fn failed_tick_ends_run_with_pumps_off() {
    let rig = Rig::new();
    let mut sink = RecordingSink::new();
    let mut c = in_fill_lower_tank(&rig, &mut sink);

    rig.lower.break_wire();
    let (_stop_tx, stop_rx) = std::sync::mpsc::channel();
    let err = c
        .run(&mut sink, std::time::Duration::from_millis(1), &stop_rx)
        .unwrap_err();
    assert!(matches!(err, Error::Hardware(_)), "{err}");
    assert_eq!(rig.well_out.is_on(), Some(false));
}
