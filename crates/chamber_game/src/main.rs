//! Chamber runner: plays a level headlessly on the fixed tick.
//!
//!   1. load and validate the level JSON, build a `LevelSession`
//!   2. each frame, feed the clock and run every due tick, applying the next
//!      replay frame (or no keys) as the held-key snapshot
//!   3. follow navigation: `go_to_next_level` loads the target relative to
//!      the current level file, `end_game` stops the run
//!   4. between frames, poll the level file and hot-reload it when it changes
//!
//! Boundary calls are logged by `LogHost`; set `RUST_LOG=debug` for per-tick
//! detail.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chamber_core::time::FrameClock;
use chamber_core::InputState;
use chamber_game::replay::load_replay_from_path;
use chamber_game::{
    load_level_from_path, LevelFile, LevelSession, LevelWatcher, LogHost, Navigation,
};

const USAGE: &str =
    "usage: chamber_game <level.json> [--replay <replay.json>] [--frames N] [--realtime]";
const DEFAULT_FRAME_LIMIT: u64 = 600;

#[derive(Debug)]
struct RunnerArgs {
    level_path: PathBuf,
    replay_path: Option<PathBuf>,
    frames: Option<u64>,
    realtime: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<RunnerArgs, String> {
    let mut level_path = None;
    let mut replay_path = None;
    let mut frames = None;
    let mut realtime = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--replay" => {
                let path = args.next().ok_or_else(|| format!("--replay needs a path\n{USAGE}"))?;
                replay_path = Some(PathBuf::from(path));
            }
            "--frames" => {
                let raw = args.next().ok_or_else(|| format!("--frames needs a count\n{USAGE}"))?;
                let count = raw
                    .parse::<u64>()
                    .map_err(|e| format!("Invalid --frames value '{raw}': {e}"))?;
                frames = Some(count);
            }
            "--realtime" => realtime = true,
            other if other.starts_with("--") => {
                return Err(format!("Unknown option '{other}'\n{USAGE}"));
            }
            other => {
                if level_path.replace(PathBuf::from(other)).is_some() {
                    return Err(format!("Only one level path may be given\n{USAGE}"));
                }
            }
        }
    }

    Ok(RunnerArgs {
        level_path: level_path.ok_or_else(|| USAGE.to_string())?,
        replay_path,
        frames,
        realtime,
    })
}

struct Runner {
    level_path: PathBuf,
    watcher: LevelWatcher,
    level: LevelFile,
    session: LevelSession,
    host: LogHost,
    input: InputState,
    clock: FrameClock,
    replay_inputs: Vec<Vec<chamber_core::Key>>,
    frame_limit: u64,
    realtime: bool,
}

enum TickOutcome {
    Continue,
    Stop,
}

impl Runner {
    fn new(args: RunnerArgs) -> Result<Self, String> {
        let replay_inputs = match &args.replay_path {
            Some(path) => {
                let replay = load_replay_from_path(path)?;
                let inputs = replay.expanded_inputs();
                log::info!("Replay loaded: {} ({} tick(s))", path.display(), inputs.len());
                inputs
            }
            None => Vec::new(),
        };
        let frame_limit = args.frames.unwrap_or(if replay_inputs.is_empty() {
            DEFAULT_FRAME_LIMIT
        } else {
            replay_inputs.len() as u64
        });

        let clock = FrameClock::new();
        let level = load_level_from_path(&args.level_path)?;
        let mut host = LogHost::new(level.inventory_slots);
        let session = LevelSession::new(&level, clock.tick_ms);
        session.attach(&mut host);
        log::info!(
            "Level loaded: {} ({}) from {}",
            level.level_id,
            level.version,
            args.level_path.display()
        );

        Ok(Self {
            watcher: LevelWatcher::new(args.level_path.clone()),
            level_path: args.level_path,
            level,
            session,
            host,
            input: InputState::new(),
            clock,
            replay_inputs,
            frame_limit,
            realtime: args.realtime,
        })
    }

    /// Tear down the current session and start `level_path` from scratch.
    fn switch_level(&mut self, level_path: PathBuf) -> Result<(), String> {
        let level = load_level_from_path(&level_path)?;
        self.session.teardown(&mut self.host);
        self.session = LevelSession::new(&level, self.clock.tick_ms);
        self.host = LogHost::new(level.inventory_slots);
        self.session.attach(&mut self.host);
        log::info!(
            "Level loaded: {} ({}) from {}",
            level.level_id,
            level.version,
            level_path.display()
        );
        self.watcher = LevelWatcher::new(level_path.clone());
        self.level_path = level_path;
        self.level = level;
        Ok(())
    }

    fn reload_level(&mut self, reason: &str) {
        match self.switch_level(self.watcher.path().to_path_buf()) {
            Ok(()) => log::info!("Level reloaded ({reason}): {}", self.level.level_id),
            Err(err) => log::error!("Level reload failed ({reason}): {err}"),
        }
    }

    fn run(&mut self) -> Result<(), String> {
        while self.clock.tick_count < self.frame_limit {
            if self.realtime {
                self.clock.begin_frame();
            } else {
                self.clock.feed(self.clock.tick_ms);
            }

            while self.clock.tick_count < self.frame_limit && self.clock.should_tick() {
                if let TickOutcome::Stop = self.tick()? {
                    return Ok(());
                }
            }

            if self.watcher.should_reload() {
                self.reload_level("file changed");
            }
            if self.realtime {
                std::thread::sleep(Duration::from_secs_f64(self.clock.tick_ms / 1000.0));
            }
        }

        let body = self.session.actor().body;
        log::info!(
            "Stopped after {} tick(s) in '{}', actor at ({:.1}, {:.1})",
            self.clock.tick_count,
            self.session.level_id(),
            body.x,
            body.y
        );
        Ok(())
    }

    fn tick(&mut self) -> Result<TickOutcome, String> {
        // `should_tick` already advanced the count for this tick.
        let index = (self.clock.tick_count - 1) as usize;
        let held = self.replay_inputs.get(index).map(Vec::as_slice).unwrap_or(&[]);
        self.input.sync_held(held);
        self.session.tick(&self.input, &mut self.host);
        self.input.end_frame();

        match self.host.take_navigation() {
            Some(Navigation::NextLevel(target)) => {
                let next = resolve_relative(&self.level_path, &target);
                self.switch_level(next)?;
            }
            Some(Navigation::EndGame(target)) => {
                log::info!(
                    "Game finished after {} tick(s); credits at {target}",
                    self.clock.tick_count
                );
                return Ok(TickOutcome::Stop);
            }
            None if self.session.is_finished() => {
                log::warn!(
                    "Level '{}' finished without a destination, stopping",
                    self.session.level_id()
                );
                return Ok(TickOutcome::Stop);
            }
            None => {}
        }
        Ok(TickOutcome::Continue)
    }
}

fn resolve_relative(current: &Path, target: &str) -> PathBuf {
    match current.parent() {
        Some(dir) => dir.join(target),
        None => PathBuf::from(target),
    }
}

fn run() -> Result<(), String> {
    let args = parse_args(std::env::args().skip(1))?;
    let mut runner = Runner::new(args)?;
    runner.run()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Chamber runner starting...");

    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
