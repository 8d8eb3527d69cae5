use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use arena::battle::{BattleDriver, BattleRuntime, BattleSnapshot, Phase};
use arena::config::BattleConfig;
use arena::engine::mock::{MockEngineFactory, MockScript};
use arena::loader::{FileSource, ProgramBuffer, ProgramEncoding, ProgramLoader, Slot};
use arena::{util, Config};
use clap::Parser;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "arena", version)]
#[command(about = "Run a deterministic fight between two bot programs")]
struct Cli {
    /// Program for slot 1
    bot1: PathBuf,

    /// Program for slot 2
    bot2: PathBuf,

    /// Ticks allowed before the fight is a draw
    #[arg(long)]
    max_steps: Option<u64>,

    /// Milliseconds between ticks (0 = as fast as possible).
    ///
    /// Defaults to 16. A fight that never decides runs max-steps + 1 ticks,
    /// which is hours at the default pace; use --headless or --frame-ms 0
    /// to run it straight through.
    #[arg(long = "frame-ms")]
    frame_ms: Option<u64>,

    /// Replay the fight N times and check every replay matches
    #[arg(long, default_value_t = 0)]
    replays: u32,

    /// How bot files are decoded
    #[arg(long, value_enum)]
    encoding: Option<ProgramEncoding>,

    /// Data directory for config and logs
    #[arg(long, env = "ARENA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Tick on which the stand-in engine reports a winner (never, if unset)
    #[arg(long)]
    decide_at: Option<u64>,

    /// Winner code reported on the decisive tick
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    winner: u32,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Run ticks back to back without frame pacing
    #[arg(long)]
    headless: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    bot1: String,
    bot2: String,
    outcome: BattleSnapshot,
    replays_verified: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    util::init_data_dir(cli.data_dir.clone());

    // Initialize logging to file (~/.arena/logs/arena.log)
    let log_file = util::open_log_file(&util::logs_dir())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let config = apply_overrides(Config::load(), &cli);

    let loader = ProgramLoader::new(config.loader);
    let source1 = FileSource::new(cli.bot1.clone());
    let source2 = FileSource::new(cli.bot2.clone());
    let (first, second) = tokio::try_join!(
        loader.load(Slot::First, &source1),
        loader.load(Slot::Second, &source2),
    )
    .context("failed to load bot programs")?;

    let script = match cli.decide_at {
        Some(tick) => MockScript::decides_at(tick, cli.winner),
        None => MockScript::never_decides(),
    };
    let factory = MockEngineFactory::new(script);

    let outcome = if cli.headless {
        run_headless(factory, config.battle, &first, &second, cli.replays)?
    } else {
        run_hosted(factory, config.battle, &first, &second, cli.replays).await?
    };

    let report = Report {
        bot1: first.digest(),
        bot2: second.digest(),
        outcome,
        replays_verified: cli.replays,
    };
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, &first, &second);
    }

    Ok(())
}

fn apply_overrides(mut config: Config, cli: &Cli) -> Config {
    if let Some(max_steps) = cli.max_steps {
        config = config.with_max_steps(max_steps);
    }
    if let Some(ms) = cli.frame_ms {
        config = config.with_frame_interval(Duration::from_millis(ms));
    }
    if let Some(encoding) = cli.encoding {
        config = config.with_encoding(encoding);
    }
    if cli.headless {
        config = config.with_frame_interval(Duration::ZERO);
    }
    config
}

fn run_headless(
    factory: MockEngineFactory,
    config: BattleConfig,
    first: &ProgramBuffer,
    second: &ProgramBuffer,
    replays: u32,
) -> Result<BattleSnapshot> {
    let mut driver = BattleDriver::with_queue(factory, config);
    driver.play(first.clone(), second.clone())?;
    let outcome = driver.run_to_completion()?;

    for n in 1..=replays {
        driver.replay()?;
        check_replay(n, &outcome, &driver.run_to_completion()?)?;
    }
    Ok(outcome)
}

async fn run_hosted(
    factory: MockEngineFactory,
    config: BattleConfig,
    first: &ProgramBuffer,
    second: &ProgramBuffer,
    replays: u32,
) -> Result<BattleSnapshot> {
    let runtime = BattleRuntime::spawn(factory, config);
    runtime.play(first.clone(), second.clone()).await?;
    let outcome = runtime.wait_for_outcome().await?;

    for n in 1..=replays {
        runtime.replay().await?;
        check_replay(n, &outcome, &runtime.wait_for_outcome().await?)?;
    }
    runtime.shutdown().await;
    Ok(outcome)
}

fn check_replay(n: u32, original: &BattleSnapshot, replayed: &BattleSnapshot) -> Result<()> {
    if original != replayed {
        bail!(
            "replay {n} diverged: {} at step {} (winner {}) vs {} at step {} (winner {})",
            original.phase,
            original.step,
            original.winner,
            replayed.phase,
            replayed.step,
            replayed.winner
        );
    }
    Ok(())
}

fn print_summary(report: &Report, first: &ProgramBuffer, second: &ProgramBuffer) {
    let outcome = &report.outcome;
    println!(
        "bot1 {} vs bot2 {}",
        first.short_digest(),
        second.short_digest()
    );
    match (outcome.phase, outcome.winning_slot()) {
        (Phase::Won, Some(slot)) => {
            println!("bot{} wins after {} steps", slot.index() + 1, outcome.step)
        }
        (Phase::Won, None) => {
            println!("winner code {} after {} steps", outcome.winner, outcome.step)
        }
        (Phase::Draw, _) => println!("draw after {} steps", outcome.step),
        (phase, _) => println!("stopped while {phase} at step {}", outcome.step),
    }
    if report.replays_verified > 0 {
        println!("replays verified: {}", report.replays_verified);
    }
}
