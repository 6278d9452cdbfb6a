//! Multi-threaded turn flows through the public API.
//!
//! A game thread blocks on a panel while the test plays the UI thread,
//! posting decisions and undo requests through the UI queue.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use turnkeeper::board::{PlayerId, UnitId};
use turnkeeper::delegate::{MoveDelegate, MoveLog};
use turnkeeper::gate::{GateError, TurnGate, WaitOutcome};
use turnkeeper::ledger::{LedgerError, MoveDescription};
use turnkeeper::panel::{ActionPanel, Decision, MoveChoice, MovePanel};
use turnkeeper::ui::UiQueue;

fn player(name: &str) -> PlayerId {
    PlayerId::new(name).unwrap()
}

fn mv(label: &str, units: &[u32]) -> MoveDescription {
    MoveDescription::new(label, units.iter().copied().map(UnitId).collect())
}

fn jitter(rng: &mut SmallRng) {
    for _ in 0..rng.gen_range(0..8) {
        thread::yield_now();
    }
}

#[test]
fn second_wait_on_same_gate_is_rejected() {
    let gate = Arc::new(TurnGate::new());
    let waiter = {
        let gate = Arc::clone(&gate);
        thread::spawn(move || gate.begin_wait())
    };
    while !gate.is_waiting() {
        thread::yield_now();
    }
    assert_eq!(gate.begin_wait(), Err(GateError::AlreadyWaiting));
    gate.release();
    assert_eq!(waiter.join().unwrap(), Ok(WaitOutcome::Released));
}

#[test]
fn release_with_nobody_waiting_is_harmless() {
    let gate = TurnGate::new();
    for _ in 0..10 {
        gate.release();
    }
    assert!(!gate.is_waiting());
    assert_eq!(gate.begin_wait_unless(|| true), Ok(WaitOutcome::Released));
}

#[test]
fn decisions_are_visible_to_the_woken_thread() {
    const ROUNDS: u64 = 2_000;
    let ui = Arc::new(UiQueue::spawn("ui-stress").unwrap());
    let panel = Arc::new(ActionPanel::<u64>::new("stress", ui));
    let taken = Arc::new(AtomicU64::new(0));
    panel.display(player("Germans"));

    let worker = {
        let panel = Arc::clone(&panel);
        let taken = Arc::clone(&taken);
        thread::spawn(move || {
            let mut rng = SmallRng::seed_from_u64(7);
            for round in 1..=ROUNDS {
                jitter(&mut rng);
                assert_eq!(panel.wait_for_decision(), Ok(Decision::Confirmed(round)));
                taken.store(round, Ordering::Release);
            }
        })
    };

    let mut rng = SmallRng::seed_from_u64(11);
    for round in 1..=ROUNDS {
        // Sometimes decide before the worker arrives, sometimes after.
        if rng.gen_bool(0.5) {
            while !panel.is_waiting() {
                thread::yield_now();
            }
        }
        assert!(panel.confirm(round));
        while taken.load(Ordering::Acquire) != round {
            thread::yield_now();
        }
    }
    worker.join().unwrap();
}

#[test]
fn independent_panels_wait_concurrently() {
    const PANELS: usize = 6;
    let ui = Arc::new(UiQueue::spawn("ui-many").unwrap());
    let panels: Vec<Arc<ActionPanel<usize>>> = (0..PANELS)
        .map(|i| {
            let panel = Arc::new(ActionPanel::new("many", Arc::clone(&ui)));
            panel.display(player(&format!("player {}", i)));
            panel
        })
        .collect();

    let releaser = {
        let panels = panels.clone();
        thread::spawn(move || {
            let mut released = [false; PANELS];
            while released.iter().any(|r| !r) {
                for (i, panel) in panels.iter().enumerate() {
                    if !released[i] && panel.is_waiting() {
                        assert!(panel.confirm(i * 10));
                        released[i] = true;
                    }
                }
                thread::yield_now();
            }
        })
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(PANELS)
        .build()
        .unwrap();
    let decisions: Vec<Decision<usize>> = pool.install(|| {
        panels
            .par_iter()
            .map(|panel| panel.wait_for_decision().unwrap())
            .collect()
    });
    releaser.join().unwrap();

    let expected: Vec<Decision<usize>> = (0..PANELS).map(|i| Decision::Confirmed(i * 10)).collect();
    assert_eq!(decisions, expected);
}

/// Game thread for a movement turn: performs each confirmed move and
/// refreshes the ledger, returning how the turn ended.
fn spawn_turn(
    log: &Arc<MoveLog>,
    panel: &Arc<MovePanel>,
) -> thread::JoinHandle<Decision<MoveChoice>> {
    let log = Arc::clone(log);
    let panel = Arc::clone(panel);
    thread::spawn(move || loop {
        match panel.wait_for_move().unwrap() {
            Decision::Confirmed(MoveChoice::Move(desc)) => {
                log.record(desc);
                panel.update_moves();
            }
            other => return other,
        }
    })
}

fn setup(name: &str) -> (Arc<UiQueue>, Arc<MoveLog>, Arc<MovePanel>) {
    let ui = Arc::new(UiQueue::spawn(name).unwrap());
    let log = Arc::new(MoveLog::new());
    let panel = Arc::new(MovePanel::new(
        Arc::clone(&log) as Arc<dyn MoveDelegate>,
        Arc::clone(&ui),
    ));
    (ui, log, panel)
}

fn wait_for_len(panel: &MovePanel, len: usize) {
    while panel.ledger().len() != len {
        thread::yield_now();
    }
}

#[test]
fn undo_by_units_keeps_ledger_in_step_with_delegate() {
    let (ui, log, panel) = setup("ui-flow");
    panel.display(player("Russians"));
    let turn = spawn_turn(&log, &panel);

    for (i, (label, units)) in [("a", &[1][..]), ("b", &[9]), ("c", &[2]), ("d", &[9])]
        .iter()
        .enumerate()
    {
        assert!(panel.perform_move(mv(label, units)));
        wait_for_len(&panel, i + 1);
    }

    let ui_panel = Arc::clone(&panel);
    let report = ui
        .invoke_and_wait(move || ui_panel.undo_for_units(&[UnitId(9)]))
        .unwrap()
        .unwrap();
    assert_eq!(report.undone, vec![3, 1]);

    let moves = panel.ledger().moves();
    assert_eq!(*moves, *log.moves_made());
    assert_eq!(
        moves.iter().map(|m| (m.index, m.label.as_str())).collect::<Vec<_>>(),
        vec![(0, "a"), (1, "c")]
    );

    let ui_panel = Arc::clone(&panel);
    assert_eq!(
        ui.invoke_and_wait(move || ui_panel.undo_for_units(&[UnitId(42)])),
        Some(Err(LedgerError::NothingToUndo))
    );
    assert_eq!(panel.ledger().len(), 2);

    assert!(panel.done(|| true));
    assert_eq!(
        turn.join().unwrap(),
        Decision::Confirmed(MoveChoice::Done)
    );
}

#[test]
fn ledger_renders_on_ui_queue() {
    let (ui, log, panel) = setup("ui-render");
    let rendered_on_ui = Arc::new(AtomicBool::new(true));
    let last_len = Arc::new(parking_lot::Mutex::new(None));
    {
        let ui = Arc::clone(&ui);
        let rendered_on_ui = Arc::clone(&rendered_on_ui);
        let last_len = Arc::clone(&last_len);
        panel.ledger().on_render(move |moves| {
            if !ui.is_current() {
                rendered_on_ui.store(false, Ordering::SeqCst);
            }
            *last_len.lock() = Some(moves.len());
        });
    }

    panel.display(player("British"));
    let turn = spawn_turn(&log, &panel);
    assert!(panel.perform_move(mv("convoy", &[3, 4])));
    wait_for_len(&panel, 1);
    ui.flush();

    assert!(rendered_on_ui.load(Ordering::SeqCst));
    assert_eq!(*last_len.lock(), Some(1));

    panel.deactivate();
    assert_eq!(turn.join().unwrap(), Decision::Abandoned);
}

#[test]
fn abandoned_turn_discards_pending_choice() {
    let (_ui, _log, panel) = setup("ui-abandon");
    panel.display(player("Italians"));
    assert!(panel.perform_move(mv("late", &[1])));
    panel.deactivate();
    assert_eq!(panel.wait_for_move(), Ok(Decision::Abandoned));
}

#[test]
fn batch_undo_reports_blocked_moves_and_skips_locked_ones() {
    let (_ui, log, panel) = setup("ui-batch");
    log.record(mv("a", &[1]));
    log.record(mv("b", &[1, 2]));
    log.record(mv("c", &[2]));
    assert!(log.set_cant_undo(1, "AA has fired."));
    panel.display(player("British"));

    let report = panel.undo_for_units(&[UnitId(1), UnitId(2)]).unwrap();
    assert_eq!(report.undone, vec![2]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 0);
    assert_eq!(report.failures[0].reason, "move 1 must be undone first");
    assert!(!report.is_complete());

    let moves = panel.ledger().moves();
    assert_eq!(*moves, *log.moves_made());
    assert_eq!(moves.len(), 2);
    assert!(!moves[1].can_undo);
}
