use scrollplay::cli::Args;
use scrollplay::config::{AnimConfig, CachePolicy};
use scrollplay::core::frame::FrameStatus;
use scrollplay::core::{
    DirSource, HostBus, HostEvent, Overlay, PixelSurface, Player, StoryScript, ViewportMetrics,
    Workers,
};
use scrollplay::paths::{self, PathConfig};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest a single scroll step may wait for its frame
const STEP_DEADLINE: Duration = Duration::from_secs(5);

/// Overlay change observed during the sweep
#[derive(Debug, Serialize)]
struct OverlayTransition {
    step: usize,
    scroll_y: f64,
    frame: usize,
    overlay: Overlay,
}

#[derive(Debug, Serialize)]
struct CacheSummary {
    entries: usize,
    loads_issued: u64,
    failures: u64,
    evictions: u64,
    hit_rate: f64,
    mem_bytes: usize,
}

/// Written to `overlay_log.json` at the end of a run
#[derive(Debug, Serialize)]
struct RunLog {
    frames_dir: PathBuf,
    config: AnimConfig,
    steps: usize,
    snapshots: Vec<PathBuf>,
    transitions: Vec<OverlayTransition>,
    cache: CacheSummary,
}

fn init_logging(args: &Args, path_config: &PathConfig) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| paths::data_file(paths::LOG_FILE, path_config));

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

/// Settings file, then CLI overrides
fn build_config(args: &Args, path_config: &PathConfig) -> Result<AnimConfig> {
    let mut config = paths::load_settings(path_config)?;
    if let Some(capacity) = args.cache_capacity {
        config.cache_policy = CachePolicy::Bounded { capacity };
    }
    config.validate().context("Invalid animation settings")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let path_config = PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = paths::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }

    init_logging(&args, &path_config)?;
    info!("Scrollplay starting...");
    debug!("Command-line args: {:?}", args);

    let config = build_config(&args, &path_config)?;
    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let Some(frames_dir) = paths::frames_dir(args.frames_dir.clone()) else {
        bail!("No frames directory given (pass FRAMES_DIR or set SCROLLPLAY_FRAMES_DIR)");
    };
    if !frames_dir.is_dir() {
        bail!("Frames directory not found: {}", frames_dir.display());
    }
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create output directory: {}", args.out_dir.display()))?;

    let run = run_sweep(&args, config, &frames_dir)?;

    let log_path = args.out_dir.join("overlay_log.json");
    let json = serde_json::to_string_pretty(&run).context("Failed to serialize run log")?;
    std::fs::write(&log_path, json)
        .with_context(|| format!("Failed to write {}", log_path.display()))?;

    println!(
        "{} snapshots, {} overlay changes, {} loads ({} failed) -> {}",
        run.snapshots.len(),
        run.transitions.len(),
        run.cache.loads_issued,
        run.cache.failures,
        args.out_dir.display()
    );
    Ok(())
}

/// Scroll from the top of the page to the bottom in `args.steps` positions,
/// snapshotting the canvas at each one
fn run_sweep(args: &Args, config: AnimConfig, frames_dir: &Path) -> Result<RunLog> {
    let threads = args.workers.unwrap_or_else(Workers::default_thread_count).max(1);
    let workers = Arc::new(Workers::new(threads).context("Failed to start loader threads")?);
    let source = Arc::new(DirSource::new(frames_dir));
    let script = StoryScript::reference(&config).context("Invalid story script")?;

    let refresh = Duration::from_secs_f64(1.0 / args.fps.max(1) as f64);
    let mut player = Player::new(config.clone(), script, source, workers)
        .context("Failed to create player")?
        .with_refresh_interval(refresh);

    let bus = HostBus::new();
    player.listen(&bus);
    player.attach_surface(PixelSurface::new(args.width, args.height));

    let document_height = config.page_height().max(args.height as f64);
    let metrics = |scroll_y: f64| ViewportMetrics {
        scroll_y,
        viewport_width: args.width,
        viewport_height: args.height,
        document_height,
    };
    bus.emit(HostEvent::Resize(metrics(0.0)));

    let started = Instant::now();
    player
        .wait_for_loading(Duration::from_secs(args.load_timeout))
        .context("Initial frames did not load")?;
    info!("Initial frames settled in {:?}", started.elapsed());

    let scrollable = (document_height - args.height as f64).max(0.0);
    let steps = args.steps.max(1);
    let mut snapshots = Vec::with_capacity(steps);
    let mut transitions = Vec::new();

    for step in 0..steps {
        let scroll_y = if steps == 1 {
            0.0
        } else {
            scrollable * step as f64 / (steps - 1) as f64
        };
        bus.emit(HostEvent::Scroll(metrics(scroll_y)));

        let deadline = Instant::now() + STEP_DEADLINE;
        loop {
            let now = Instant::now();
            if let Some(report) = player.refresh(now) {
                if let Some(overlay) = report.overlay {
                    transitions.push(OverlayTransition {
                        step,
                        scroll_y,
                        frame: report.frame,
                        overlay,
                    });
                }
            }

            let target = player.target_frame();
            if player.last_drawn() == Some(target) {
                break;
            }
            if player.cache().status(target) == Some(FrameStatus::Failed) {
                warn!("Step {}: frame {} failed, keeping previous frame", step, target);
                break;
            }
            if now >= deadline {
                warn!("Step {}: frame {} not ready after {:?}", step, target, STEP_DEADLINE);
                break;
            }
            let wake = player.next_tick_due().unwrap_or(now + refresh);
            std::thread::sleep(wake.saturating_duration_since(Instant::now()).max(Duration::from_millis(1)));
        }

        if let Some(surface) = player.surface() {
            let path = args.out_dir.join(format!("frame_{:04}.png", step));
            surface
                .save_png(&path)
                .with_context(|| format!("Failed to save snapshot for step {}", step))?;
            debug!("Step {}: scroll {:.0} -> frame {:?}", step, scroll_y, player.last_drawn());
            snapshots.push(path);
        }
    }

    player.teardown();

    let stats = player.cache().stats();
    let cache = CacheSummary {
        entries: player.cache().len(),
        loads_issued: stats.loads_issued(),
        failures: stats.failures(),
        evictions: stats.evictions(),
        hit_rate: stats.hit_rate(),
        mem_bytes: player.cache().mem(),
    };
    info!(
        "Sweep finished in {:?}: {} entries, hit rate {:.1}%",
        started.elapsed(),
        cache.entries,
        cache.hit_rate * 100.0
    );

    Ok(RunLog {
        frames_dir: frames_dir.to_path_buf(),
        config,
        steps,
        snapshots,
        transitions,
        cache,
    })
}
