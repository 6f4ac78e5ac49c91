//! reach: drive replicants through random reach tasks.
//!
//! Every round, each replicant reaches for a random prop, world position, or
//! anchor-relative point and then resets the arm.  A failed round is
//! followed by a recovery reset of both arms with collision rules relaxed.
//!
//! By default the scene runs on the in-process [`KinematicBackend`].  With
//! `--stdio` the batches go out as JSON lines on stdout and the responses are
//! read from stdin instead.

mod kinematic;
mod scene;


use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use rp_core::{Arm, CaptureMode, ReplicantId, Tick, Vec3};
use rp_output::{CommandLog, CsvWriter, SessionOutputObserver};
use rp_protocol::Instruction;
use rp_replicant::{
    ActionRecord, ActionStatus, Behavior, CollisionDetection, ModelLibrary, ReplicantConfig,
};
use rp_sim::{
    Backend, NoopObserver, Session, SessionBuilder, SessionConfig, SessionObserver, StdioBackend,
    TickSummary,
};

use kinematic::{KinematicBackend, Prop};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "reach")]
#[command(about = "Drive replicants through random reach tasks", version)]
struct Cli {
    /// Session config (JSON).  Overrides --replicants and --avoid.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replicants to spawn, two metres apart.
    #[arg(short, long, default_value_t = 2)]
    replicants: u32,

    /// Reach rounds per replicant.
    #[arg(short, long, default_value_t = 10)]
    rounds: u32,

    /// Props scattered in front of each replicant.
    #[arg(long, default_value_t = 4)]
    props: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Stop arm motions when something is in front of the replicant.
    #[arg(long)]
    avoid: bool,

    /// Write action events, tick summaries and the command log here.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Exchange JSON lines over stdin/stdout instead of the built-in backend.
    #[arg(long)]
    stdio: bool,

    /// Debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

// ── Outcome tally ─────────────────────────────────────────────────────────────

/// Counts finished actions by name and status, then forwards to `inner`.
struct TallyObserver<O: SessionObserver> {
    inner:  O,
    counts: BTreeMap<(&'static str, String), usize>,
    ticks:  u64,
}

impl<O: SessionObserver> TallyObserver<O> {
    fn new(inner: O) -> Self {
        Self { inner, counts: BTreeMap::new(), ticks: 0 }
    }

    fn report(&self) {
        println!();
        println!("{:<12} {:<34} {:>6}", "action", "status", "count");
        for ((name, status), n) in &self.counts {
            println!("{name:<12} {status:<34} {n:>6}");
        }
        println!("Ticks: {}", self.ticks);
    }
}

impl<O: SessionObserver> SessionObserver for TallyObserver<O> {
    fn on_session_start(&mut self, tick: Tick) {
        self.inner.on_session_start(tick);
    }

    fn on_tick_start(&mut self, tick: Tick) {
        self.inner.on_tick_start(tick);
    }

    fn on_batch(&mut self, tick: Tick, batch: &[Instruction]) {
        self.inner.on_batch(tick, batch);
    }

    fn on_action_end(&mut self, tick: Tick, replicant: ReplicantId, action: &ActionRecord) {
        *self.counts.entry((action.name, action.status.to_string())).or_default() += 1;
        self.inner.on_action_end(tick, replicant, action);
    }

    fn on_tick_end(&mut self, summary: &TickSummary) {
        self.ticks += 1;
        self.inner.on_tick_end(summary);
    }

    fn on_session_end(&mut self, final_tick: Tick) {
        self.inner.on_session_end(final_tick);
    }
}

// ── Setup ─────────────────────────────────────────────────────────────────────

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn session_config(cli: &Cli) -> Result<SessionConfig> {
    if let Some(path) = &cli.config {
        return SessionConfig::from_json_path(path)
            .with_context(|| format!("loading session config {}", path.display()));
    }
    let rules = CollisionDetection { avoid: cli.avoid, ..CollisionDetection::default() };
    let mut config = SessionConfig::default();
    for i in 0..cli.replicants {
        config = config.with_replicant(
            ReplicantConfig::new(ReplicantId(i))
                .with_position(Vec3::new(2.0 * i as f32, 0.0, 0.0))
                .with_capture(CaptureMode::Never)
                .with_collision_detection(rules.clone()),
        );
    }
    Ok(config)
}

fn both_arms() -> Behavior {
    Behavior::ResetArm {
        arms:           Arm::ALL.to_vec(),
        duration:       Behavior::DEFAULT_ARM_DURATION,
        scale_duration: true,
    }
}

// ── Rounds ────────────────────────────────────────────────────────────────────

fn run_rounds<B: Backend, O: SessionObserver>(
    session:  &mut Session<B>,
    rounds:   u32,
    props:    &[Prop],
    rng:      &mut SmallRng,
    observer: &mut O,
) -> Result<()> {
    let replicants: Vec<(ReplicantId, rp_core::Pose)> = session
        .config
        .replicants
        .iter()
        .map(|c| (c.id, scene::spawn_pose(c)))
        .collect();

    session.start(observer)?;
    for round in 0..rounds {
        for (id, pose) in &replicants {
            let (target, arm) = scene::pick_target(rng, pose, &scene::props_near(pose, props));
            debug!(replicant = id.0, round, ?target, %arm, "reach");
            session.request(*id, Behavior::Sequence(vec![
                Behavior::reach_for(target, arm),
                Behavior::reset_arm(arm),
            ]))?;
        }
        for (id, _) in &replicants {
            let status = session.run_until_done(*id, observer)?;
            if let Some(ActionStatus::Failure(reason)) = status {
                info!(replicant = id.0, round, reason = reason.as_str(), "round failed, recovering");
                recover(session, *id, observer)?;
            }
        }
    }
    session.finish(observer);
    Ok(())
}

/// Bring both hands back to rest with collisions ignored.
fn recover<B: Backend, O: SessionObserver>(
    session:  &mut Session<B>,
    id:       ReplicantId,
    observer: &mut O,
) -> Result<()> {
    let rules = session.replicant(id)?.collision_detection().clone();
    session.replicant_mut(id)?.set_collision_detection(CollisionDetection::none());
    session.request(id, both_arms())?;
    let status = session.run_until_done(id, observer)?;
    if status != Some(ActionStatus::Success) {
        warn!(replicant = id.0, ?status, "recovery reset did not succeed");
    }
    session.replicant_mut(id)?.set_collision_detection(rules);
    Ok(())
}

fn run_session<B: Backend>(
    cli:     &Cli,
    session: &mut Session<B>,
    props:   &[Prop],
    rng:     &mut SmallRng,
) -> Result<()> {
    match &cli.output {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let writer = CsvWriter::new(dir)?;
            let log = CommandLog::create(&dir.join("commands.jsonl"))?.skip_empty();
            let mut observer = TallyObserver::new(SessionOutputObserver::new(writer).with_command_log(log));
            run_rounds(session, cli.rounds, props, rng, &mut observer)?;
            observer.report();
            if let Some(e) = observer.inner.take_error() {
                return Err(e).context("writing session output");
            }
            print_output_paths(dir);
        }
        None => {
            let mut observer = TallyObserver::new(NoopObserver);
            run_rounds(session, cli.rounds, props, rng, &mut observer)?;
            observer.report();
        }
    }
    Ok(())
}

fn print_output_paths(dir: &Path) {
    println!("Output:");
    for name in ["action_events.csv", "tick_summaries.csv", "commands.jsonl"] {
        println!("  {}", dir.join(name).display());
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = session_config(&cli)?;
    let library = Arc::new(ModelLibrary::default().with_replicant("replicant_0", "file:///models/replicant_0"));
    let mut rng = SmallRng::seed_from_u64(cli.seed);

    info!(
        replicants = config.replicants.len(),
        rounds = cli.rounds,
        seed = cli.seed,
        stdio = cli.stdio,
        "reach demo starting"
    );
    let t0 = Instant::now();

    if cli.stdio {
        let backend = StdioBackend::new(std::io::stdin().lock(), std::io::stdout().lock());
        let mut session = SessionBuilder::new(config, library, backend).build()?;
        run_session(&cli, &mut session, &[], &mut rng)?;
    } else {
        let props = scene::scatter_props(&mut rng, &config.replicants, cli.props);
        let backend = KinematicBackend::new(props.clone());
        let mut session = SessionBuilder::new(config, library, backend).build()?;
        run_session(&cli, &mut session, &props, &mut rng)?;
        info!(
            frames = session.backend().frame(),
            props = session.backend().props().len(),
            "kinematic backend done"
        );
    }

    println!("Wall time: {:.2?}", t0.elapsed());
    Ok(())
}
