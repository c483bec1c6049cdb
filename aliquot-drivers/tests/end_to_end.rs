//! Plan a protocol, simulate it, then replay it on the virtual controller

use aliquot_core::config::{parse_config, PipetteConfig};
use aliquot_core::labware::{Labware, Site};
use aliquot_core::motion::{Axis, Coordinate};
use aliquot_core::pipette::Pipette;
use aliquot_core::planner::TransferOptions;
use aliquot_core::queue::{
    CommandQueue, ReplayOutcome, ReplayPhase, TraceEntry, Uninterrupted, Warning,
};
use aliquot_core::traits::{LocationResolver, MotionPort, MotionWarning};
use aliquot_drivers::{catalog, Deck, SignalChannel, VirtualMotionPort};

const CONFIG: &str = r#"
safe_height = 100.0

[[pipette]]
name = "p200"
axis = "B"
max_volume = 200.0
min_volume = 10.0

[pipette.plunger]
top = 0.0
bottom = 10.0
blow_out = 12.0
drop_tip = 13.0
"#;

struct Bench {
    deck: Deck,
    plate: Labware,
    trough: Labware,
    pipette: Pipette,
}

fn bench() -> Bench {
    let config = parse_config(CONFIG).unwrap();
    let mut deck = Deck::new(config.safe_height);
    let tips = deck
        .load("A1", catalog::container("tiprack-200ul").unwrap())
        .unwrap();
    let plate = deck
        .load("B1", catalog::container("96-flat").unwrap())
        .unwrap();
    let trough = deck
        .load("C1", catalog::container("trough-12row").unwrap())
        .unwrap();
    let trash = deck
        .load("E3", catalog::container("trash-box").unwrap())
        .unwrap();

    let p200: PipetteConfig = config.pipette(Axis::B).unwrap().clone();
    let pipette = Pipette::new(p200, vec![tips], Some(trash)).unwrap();
    Bench {
        deck,
        plate,
        trough,
        pipette,
    }
}

fn plan(bench: &mut Bench) -> CommandQueue {
    let mut queue = CommandQueue::new();
    bench
        .pipette
        .distribute(
            &mut queue,
            30.0,
            bench.trough.well(0),
            bench.plate.wells(0..8),
            &TransferOptions::default(),
        )
        .unwrap();
    queue
}

#[test]
fn simulate_then_run() {
    let mut bench = bench();
    let mut queue = plan(&mut bench);
    assert!(queue.warnings().is_empty());

    let simulation = queue.simulate(&bench.deck).unwrap();
    assert_eq!(simulation.report.executed, queue.len());
    assert_eq!(queue.cursor(), 0);

    let mut port = VirtualMotionPort::default();
    let outcome = queue
        .run(&mut port, &bench.deck, &mut Uninterrupted)
        .unwrap();
    match outcome {
        ReplayOutcome::Completed(report) => {
            assert_eq!(report.executed, queue.len());
            assert!(report.warnings.is_empty());
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(queue.phase(), ReplayPhase::Complete);

    // last command drops the tip into the trash
    let trash_top = simulation
        .trace
        .iter()
        .rev()
        .find_map(|e| match e {
            TraceEntry::Head(c) => Some(*c),
            _ => None,
        })
        .unwrap();
    assert_eq!(port.head_position().current, trash_top);
    assert_eq!(port.plunger_position(Axis::B).current, 10.0);
}

#[test]
fn pause_resume_and_abort() {
    let mut bench = bench();
    let mut queue = plan(&mut bench);
    let total = queue.len();
    let mut port = VirtualMotionPort::default();

    let mut channel: SignalChannel = SignalChannel::new();
    let (mut operator, mut checkpoint) = channel.split();

    operator.pause().unwrap();
    let outcome = queue.run(&mut port, &bench.deck, &mut checkpoint).unwrap();
    assert!(matches!(outcome, ReplayOutcome::Paused { next: 0, .. }));
    assert_eq!(port.moves(), 0);

    let mut first_three = |next: usize| {
        if next == 3 {
            aliquot_core::queue::Signal::Pause
        } else {
            aliquot_core::queue::Signal::Continue
        }
    };
    let outcome = queue
        .resume(&mut port, &bench.deck, &mut first_three)
        .unwrap();
    assert!(matches!(outcome, ReplayOutcome::Paused { next: 3, .. }));

    operator.abort().unwrap();
    let outcome = queue
        .resume(&mut port, &bench.deck, &mut checkpoint)
        .unwrap();
    assert_eq!(
        outcome,
        ReplayOutcome::Aborted {
            executed: 3,
            discarded: total - 3
        }
    );
    assert_eq!(queue.len(), 3);
    assert_eq!(queue.phase(), ReplayPhase::Aborted);
}

#[test]
fn calibration_after_planning_moves_the_head() {
    let mut bench = bench();
    let queue = plan(&mut bench);
    let before = queue.simulate(&bench.deck).unwrap();

    let a1 = Site::Well(bench.plate.well(0)).bottom(0.0);
    let nominal = bench.deck.resolve(&a1).unwrap();
    let mut port = VirtualMotionPort::default();
    port.move_head(nominal + Coordinate::new(1.0, 0.0, 0.0))
        .unwrap();
    let delta = bench
        .pipette
        .calibrate_position(&a1, &port, &mut bench.deck)
        .unwrap();
    assert_eq!(delta, Coordinate::new(1.0, 0.0, 0.0));

    let after = queue.simulate(&bench.deck).unwrap();
    assert_eq!(before.trace.len(), after.trace.len());
    let shifted = before
        .trace
        .iter()
        .zip(&after.trace)
        .filter(|(b, a)| b != a)
        .count();
    assert!(shifted > 0);
}

#[test]
fn clamped_travel_is_reported() {
    let mut bench = bench();
    let mut queue = CommandQueue::new();
    let far = Site::Well(bench.plate.well(0)).top(500.0);
    bench
        .pipette
        .move_to(&mut queue, far, aliquot_core::motion::MoveStrategy::Direct)
        .unwrap();

    let mut port = VirtualMotionPort::default();
    let outcome = queue
        .run(&mut port, &bench.deck, &mut Uninterrupted)
        .unwrap();
    match outcome {
        ReplayOutcome::Completed(report) => {
            assert_eq!(report.warnings.len(), 1);
            assert!(matches!(
                report.warnings[0],
                Warning::Motion(MotionWarning::TravelClamped { .. })
            ));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(queue.warnings().len(), 1);
}

#[test]
fn lost_link_stops_replay() {
    let mut bench = bench();
    let mut queue = plan(&mut bench);
    let mut port = VirtualMotionPort::default();
    port.disconnect_after(2);

    let result = queue.run(&mut port, &bench.deck, &mut Uninterrupted);
    assert!(result.is_err());
    assert_eq!(queue.phase(), ReplayPhase::Idle);
    assert_eq!(queue.cursor(), 0);
}
