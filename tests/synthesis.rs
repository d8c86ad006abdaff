use std::collections::BTreeMap;

use railmotion::{CurveCatalog, Signal, TrainPath, TrainStatus, TrainTrace};

const TIME_FRAME: u64 = 8;
const CELL_SIZE: f64 = 100.0;

fn build_fixture() -> BTreeMap<u32, TrainPath> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let raw: serde_json::Value =
        serde_json::from_str(include_str!("data/two_trains.json")).unwrap();
    let catalog = CurveCatalog::standard();

    raw.as_object()
        .unwrap()
        .iter()
        .map(|(id, value)| {
            let train_id: u32 = id.parse().unwrap();
            let trace = TrainTrace::from_value(value.clone()).unwrap();
            let path =
                TrainPath::build(&catalog, train_id, trace, TIME_FRAME, CELL_SIZE).unwrap();
            (train_id, path)
        })
        .collect()
}

#[test]
fn full_timeline_for_a_turning_train() {
    let trains = build_fixture();
    let train = &trains[&0];

    let states = train.display_states().unwrap();
    assert_eq!(states.len(), TIME_FRAME as usize + 1);

    // Departure tick: fades in, parked at the departure cell facing its
    // first move, cleared to go next tick.
    let depart = &states[&0];
    assert_eq!(depart.status, TrainStatus::NotYetDeparted);
    assert_eq!(depart.opacity, [0.0, 1.0]);
    assert_eq!(depart.signal, Some(Signal::Green));
    assert_eq!(depart.position, None);
    assert_eq!(depart.motion_path, "M 250 450 L 250.01 450 ");
    assert_eq!(depart.key_points, "0;1");

    // Held at (2,1) under a wait action; next tick it moves again.
    let held = &states[&4];
    assert_eq!(held.status, TrainStatus::Stopped);
    assert_eq!(held.opacity, [1.0, 1.0]);
    assert_eq!(held.signal, Some(Signal::Green));
    assert_eq!(held.position.as_deref(), Some("2,1"));
    assert_eq!(held.motion_path, "M 350 250 L 350 249.99 ");

    // Moving ticks carry a real motion path and no signal.
    let moving = &states[&2];
    assert_eq!(moving.status, TrainStatus::Moving);
    assert_eq!(moving.signal, None);
    assert!(moving.motion_path.starts_with("M "));
    assert_eq!(moving.key_points, "0;1");

    // Synthesized arrival fades out, then the parked tail is invisible.
    let arrived = &states[&6];
    assert_eq!(arrived.status, TrainStatus::Arrived);
    assert_eq!(arrived.opacity, [1.0, 0.0]);
    assert_eq!(arrived.position, None);
    for tick in 7..=8 {
        assert_eq!(states[&tick].status, TrainStatus::Parked);
        assert_eq!(states[&tick].opacity, [0.0, 0.0]);
    }

    assert!(train.route_path().starts_with("M 250 450 L 300 450 "));
    assert!(train.route_path().contains("C "));
}

#[test]
fn slow_train_shares_one_motion_path_per_cell() {
    let trains = build_fixture();
    let train = &trains[&1];
    assert_eq!(train.speed(), 2);

    let first = train.display_info(1).unwrap();
    let second = train.display_info(2).unwrap();
    assert_eq!(first.key_points, "0;0.5");
    assert_eq!(second.key_points, "0.5;1");
    assert_eq!(first.motion_path, second.motion_path);
    assert_eq!(first.motion_path, "M 150 150 L 150 200 L 150 250 ");

    // Arrival lands mid-timeline; the rest of the global frame is parked.
    let arrived = train.display_info(5).unwrap();
    assert_eq!(arrived.status, TrainStatus::Arrived);
    for tick in 6..=8 {
        let info = train.display_info(tick).unwrap();
        assert_eq!(info.status, TrainStatus::Parked);
        assert_eq!(info.opacity, [0.0, 0.0]);
    }
}

#[test]
fn signal_holds_red_across_consecutive_waits() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let raw: serde_json::Value =
        serde_json::from_str(include_str!("data/held_train.json")).unwrap();
    let catalog = CurveCatalog::standard();
    let trace = TrainTrace::from_value(raw).unwrap();
    let train = TrainPath::build(&catalog, 2, trace, TIME_FRAME, CELL_SIZE).unwrap();

    // Waiting with another wait queued behind it shows red.
    let first_hold = train.display_info(2).unwrap();
    assert_eq!(first_hold.status, TrainStatus::Stopped);
    assert_eq!(first_hold.signal, Some(Signal::Red));

    // The last wait before movement resumes shows green.
    let last_hold = train.display_info(3).unwrap();
    assert_eq!(last_hold.status, TrainStatus::Stopped);
    assert_eq!(last_hold.signal, Some(Signal::Green));

    // Pre-departure wait is also green: the next tick already moves.
    assert_eq!(train.display_info(0).unwrap().signal, Some(Signal::Green));

    // No signal at all once the train is moving again.
    assert_eq!(train.display_info(4).unwrap().signal, None);
}

#[test]
fn queries_are_deterministic_and_repeatable() {
    let trains = build_fixture();
    for train in trains.values() {
        let once = train.display_states().unwrap();
        // Out-of-order re-queries return identical records.
        for tick in (0..=TIME_FRAME).rev() {
            assert_eq!(train.display_info(tick).unwrap(), once[&tick]);
        }
    }
}

#[test]
fn playback_serializes_for_the_renderer() {
    let trains = build_fixture();
    let playback = trains[&0].playback().unwrap();
    let json = serde_json::to_value(&playback).unwrap();

    assert_eq!(json["trainId"], 0);
    assert!(json["routePath"].as_str().unwrap().starts_with("M "));

    let tick_4 = &json["states"]["4"];
    assert_eq!(tick_4["status"], "STOPPED");
    assert_eq!(tick_4["action"], "wait");
    assert_eq!(tick_4["signal"], "green");
    assert_eq!(tick_4["position"], "2,1");
    assert_eq!(tick_4["keyPoints"], "0;1");
    assert_eq!(tick_4["opacity"][0], 1.0);

    let tick_0 = &json["states"]["0"];
    assert_eq!(tick_0["status"], "READY_TO_DEPART");
    assert_eq!(tick_0["position"], serde_json::Value::Null);
}
