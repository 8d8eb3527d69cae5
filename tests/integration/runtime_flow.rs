//! Loader to runtime, end to end, under the frame-paced host

use std::time::Duration;

use arena::battle::{BattleDriver, BattleRuntime, Phase};
use arena::config::BattleConfig;
use arena::engine::mock::{MockEngineFactory, MockScript};
use arena::loader::{FileSource, ProgramLoader};

use super::common::{battle_config, pair, program, program_bytes, write_bot, SnapshotRecorder};

fn paced(max_steps: u64) -> BattleConfig {
    BattleConfig {
        max_steps,
        frame_interval: Duration::from_millis(16),
    }
}

#[tokio::test(start_paused = true)]
async fn test_uploaded_bots_fight_and_replay() {
    let dir = tempfile::tempdir().unwrap();
    let bot1 = write_bot(dir.path(), "one.wasm", &program_bytes("one"));
    let bot2 = write_bot(dir.path(), "two.wasm", &program_bytes("two"));

    let loader = ProgramLoader::default();
    loader
        .add_files(&[FileSource::new(bot1), FileSource::new(bot2)])
        .await
        .unwrap();
    let (first, second) = loader.pair().unwrap();

    let runtime = BattleRuntime::spawn(
        MockEngineFactory::new(MockScript::decides_at(40, 2)),
        paced(1_000_000),
    );
    let recorder = SnapshotRecorder::attach(&runtime.store());

    runtime.play(first, second).await.unwrap();
    let outcome = runtime.wait_for_outcome().await.unwrap();
    assert_eq!(outcome.phase, Phase::Won);
    assert_eq!(outcome.winner, 2);
    assert_eq!(outcome.step, 39);
    let original = recorder.take();
    assert_eq!(original.len(), 41);

    runtime.replay().await.unwrap();
    let replayed_outcome = runtime.wait_for_outcome().await.unwrap();
    assert_eq!(replayed_outcome, outcome);
    assert_eq!(recorder.take(), original);

    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_superseded_fight_never_publishes_again() {
    let runtime = BattleRuntime::spawn(
        MockEngineFactory::new(MockScript::never_decides()),
        paced(25),
    );
    let (a, b) = pair();
    let challenger = program("challenger");

    runtime.play(a, b.clone()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(160)).await;
    assert_eq!(runtime.current().phase, Phase::Running);

    let recorder = SnapshotRecorder::attach(&runtime.store());
    runtime.play(challenger.clone(), b.clone()).await.unwrap();
    runtime.wait_for_outcome().await.unwrap();

    // The same fight run headless is the only trajectory allowed
    let mut reference = BattleDriver::with_queue(
        MockEngineFactory::new(MockScript::never_decides()),
        battle_config(25),
    );
    let expected = SnapshotRecorder::attach(&reference.store());
    reference.play(challenger, b).unwrap();
    reference.run_to_completion().unwrap();

    assert_eq!(recorder.snapshots(), expected.snapshots());
    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_frames_pace_ticks() {
    let runtime = BattleRuntime::spawn(
        MockEngineFactory::new(MockScript::never_decides()),
        paced(1_000),
    );
    let (a, b) = pair();

    runtime.play(a, b).await.unwrap();
    tokio::time::sleep(Duration::from_millis(16 * 10 + 8)).await;

    // Roughly one tick per frame, never a burst
    let step = runtime.current().step;
    assert!((9..=12).contains(&step), "step {step}");
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_store_outlives_stopped_runtime() {
    let runtime = BattleRuntime::spawn(
        MockEngineFactory::new(MockScript::decides_at(3, 1)),
        battle_config(10),
    );
    let (a, b) = pair();
    runtime.play(a, b).await.unwrap();
    let outcome = runtime.wait_for_outcome().await.unwrap();

    let store = runtime.store();
    runtime.shutdown().await;

    // Last value stays readable, but nothing will change it again
    assert_eq!(store.current(), outcome);
    let mut rx = store.watch();
    assert!(rx.changed().await.is_err());
}
