//! Driver scenarios run tick by tick through the frame queue

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arena::battle::{BattleDriver, Phase, TickOutcome};
use arena::config::BattleConfig;
use arena::engine::mock::{MockEngineFactory, MockScript};

use super::common::{battle_config, pair, program, SnapshotRecorder};

#[test]
fn test_winner_on_eleventh_tick() {
    let mut driver = BattleDriver::with_queue(
        MockEngineFactory::new(MockScript::decides_at(11, 2)),
        battle_config(1_000_000),
    );
    let recorder = SnapshotRecorder::attach(&driver.store());
    let (a, b) = pair();

    driver.play(a, b).unwrap();
    driver.run_to_completion().unwrap();

    let seen = recorder.snapshots();
    assert_eq!(seen.len(), 12);
    assert_eq!(seen[0].phase, Phase::Initialized);
    for (i, snapshot) in seen[1..=10].iter().enumerate() {
        assert_eq!(snapshot.step, i as u64 + 1);
        assert_eq!(snapshot.phase, Phase::Running);
        assert_eq!(snapshot.winner, 0);
    }

    let last = seen[11];
    assert_eq!(last.phase, Phase::Won);
    assert_eq!(last.winner, 2);
    assert_eq!(last.step, 10);
    assert_eq!(last.winning_slot(), Some(arena::Slot::Second));

    // Nothing left to run
    assert!(driver.scheduler().is_empty());
    assert_eq!(driver.run_to_completion().unwrap(), last);
    assert_eq!(recorder.len(), 12);
}

#[test]
fn test_opaque_winner_code_is_republished() {
    let mut driver = BattleDriver::with_queue(
        MockEngineFactory::new(MockScript::decides_at(3, 42)),
        battle_config(100),
    );
    let (a, b) = pair();

    driver.play(a, b).unwrap();
    let last = driver.run_to_completion().unwrap();

    assert_eq!(last.phase, Phase::Won);
    assert_eq!(last.winner, 42);
    assert_eq!(last.winning_slot(), None);
}

#[test]
fn test_draw_at_default_ceiling() {
    let factory = MockEngineFactory::new(MockScript::never_decides());
    let mut driver = BattleDriver::with_queue(factory, BattleConfig::default());
    assert_eq!(driver.max_steps(), 1_000_000);

    let publishes = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&publishes);
    let _subscription = driver.store().subscribe(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });
    let (a, b) = pair();

    driver.play(a, b).unwrap();
    let last = driver.run_to_completion().unwrap();

    assert_eq!(last.phase, Phase::Draw);
    assert_eq!(last.winner, 0);
    assert_eq!(last.step, 1_000_001);
    // Reset, one per running tick, then the draw
    assert_eq!(publishes.load(Ordering::Relaxed), 1_000_002);
    assert!(!driver.is_running());
    assert!(driver.scheduler().is_empty());
}

#[test]
fn test_play_while_scheduled_leaves_one_loop() {
    let mut driver = BattleDriver::with_queue(
        MockEngineFactory::new(MockScript::never_decides()),
        battle_config(50),
    );
    let (a, b) = pair();

    driver.play(a.clone(), b.clone()).unwrap();
    for _ in 0..5 {
        let tick = driver.scheduler().pop().unwrap();
        driver.tick(tick).unwrap();
    }
    // A tick of the first fight is queued when the second starts
    assert_eq!(driver.scheduler().len(), 1);

    let recorder = SnapshotRecorder::attach(&driver.store());
    let second = driver.play(program("challenger"), b).unwrap();
    assert_eq!(driver.scheduler().len(), 2);
    recorder.take();

    let stale = driver.scheduler().pop().unwrap();
    assert_ne!(stale.fight, second);
    assert_eq!(driver.tick(stale).unwrap(), TickOutcome::Stale);
    assert!(recorder.is_empty());

    let live = driver.scheduler().pop().unwrap();
    assert_eq!(live.fight, second);
    assert_eq!(driver.tick(live).unwrap(), TickOutcome::Continued { step: 1 });
    assert_eq!(driver.scheduler().len(), 1);
    assert_eq!(recorder.steps(), vec![1]);
}

#[test]
fn test_replay_while_running_restarts_from_zero() {
    let mut driver = BattleDriver::with_queue(
        MockEngineFactory::new(MockScript::decides_at(20, 1)),
        battle_config(100),
    );
    let recorder = SnapshotRecorder::attach(&driver.store());
    let (a, b) = pair();

    driver.play(a, b).unwrap();
    for _ in 0..7 {
        let tick = driver.scheduler().pop().unwrap();
        driver.tick(tick).unwrap();
    }
    recorder.take();

    driver.replay().unwrap();
    let last = driver.run_to_completion().unwrap();

    let steps = recorder.steps();
    assert_eq!(steps[0], 0);
    assert_eq!(last.step, 19);
    assert_eq!(last.winner, 1);
    // The interrupted fight published nothing after the replay
    assert_eq!(steps, (0..=19).chain([19]).collect::<Vec<_>>());
}

#[test]
fn test_stores_are_scoped_per_driver() {
    let factory = MockEngineFactory::new(MockScript::decides_at(2, 1)).recording();
    let mut one = BattleDriver::with_queue(factory.clone(), battle_config(10));
    let two = BattleDriver::with_queue(factory.clone(), battle_config(10));
    let recorder = SnapshotRecorder::attach(&two.store());
    let (a, b) = pair();

    one.play(a, b).unwrap();
    one.run_to_completion().unwrap();

    assert!(recorder.is_empty());
    assert_eq!(two.store().current().phase, Phase::Idle);
    assert_eq!(factory.constructed(), 1);
}
