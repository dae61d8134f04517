// Tue Jan 13 2026 - Alex

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::Colorize;
use frame_farm::{
    animation::{AnimationPlan, Scene, SequenceFinalizer},
    config::Config,
    engine::{ArtifactHandler, ArtifactPaths, CommandHandler, FailurePolicy, FarmRunner, RunReport, Timeslices},
    ui,
    utils::{format_duration, pluralize, LoggingUtils},
};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Renders fault rupture perspective animations on a pool of workers", long_about = None)]
struct Args {
    /// Scene description (JSON)
    scene: PathBuf,

    /// Render an animation instead of a single still
    #[arg(short, long)]
    animate: bool,

    /// Number of worker threads
    #[arg(short = 'n', long)]
    workers: Option<usize>,

    /// Frames per second
    #[arg(short, long)]
    framerate: Option<u32>,

    /// Camera sweep duration (s)
    #[arg(short, long)]
    time: Option<f64>,

    /// Slip fade-out duration (s)
    #[arg(short, long)]
    mtime: Option<f64>,

    /// Animation start delay (s)
    #[arg(short, long)]
    delay: Option<f64>,

    /// Animation end delay (s)
    #[arg(short, long)]
    end: Option<f64>,

    /// Output directory for frames and intermediates
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON config file, flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Worker back-off after a wait reply (ms)
    #[arg(long)]
    backoff_ms: Option<u64>,

    /// Stop the whole run on the first failed job
    #[arg(long)]
    abort_on_failure: bool,

    /// Give up when the run has not finished after this many seconds
    #[arg(long)]
    watchdog: Option<u64>,

    /// External renderer, invoked as `PROGRAM [ARGS..] <kind> <output>`
    #[arg(long, num_args = 1.., allow_hyphen_values = true, value_name = "PROGRAM")]
    exec: Vec<String>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long)]
    no_progress: bool,
}

fn main() {
    let args = Args::parse();
    LoggingUtils::init(args.verbose as usize);

    if let Err(e) = run(args) {
        ui::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn build_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    if args.animate {
        config = config.with_animate(true);
    }
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    if let Some(framerate) = args.framerate {
        config = config.with_framerate(framerate);
    }
    if let Some(time) = args.time {
        config = config.with_transition_time(time);
    }
    if let Some(mtime) = args.mtime {
        config = config.with_minor_transition_time(mtime);
    }
    if let Some(delay) = args.delay {
        config = config.with_start_delay(delay);
    }
    if let Some(end) = args.end {
        config = config.with_end_delay(end);
    }
    if let Some(output) = &args.output {
        config = config.with_output_dir(output.clone());
    }
    if let Some(ms) = args.backoff_ms {
        config = config.with_wait_backoff_ms(ms);
    }
    if args.abort_on_failure {
        config = config.with_failure_policy(FailurePolicy::Abort);
    }
    if args.watchdog.is_some() {
        config = config.with_watchdog_seconds(args.watchdog);
    }
    if !args.exec.is_empty() {
        config = config.with_render_command(args.exec.clone());
    }
    if args.no_progress {
        config = config.with_progress_bars(false);
    }

    config.validate().map_err(|e| anyhow!("invalid configuration: {}", e))?;
    Ok(config)
}

fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();
    let config = build_config(&args)?;
    let scene = Scene::load(&args.scene).with_context(|| format!("loading scene {}", args.scene.display()))?;

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;

    let plan = AnimationPlan::new(&config, &scene);
    ui::print_info(&format!(
        "Rendering {} ({}) with {}",
        scene.name.bold(),
        if plan.animated {
            format!("{} static + {} dynamic frames", plan.static_frames(), plan.dynamic_frames())
        } else {
            "still".to_string()
        },
        pluralize(config.workers, "worker", "workers")
    ));

    let paths = ArtifactPaths::new(&config.output_dir, &scene.name).with_frame_extension(&config.frame_extension);
    let runner = FarmRunner::new(config.runner_options(), plan.schedule());

    let report = match config.render_command.as_deref() {
        Some([program, rest @ ..]) => {
            ui::print_info(&format!("Delegating jobs to {}", program.cyan()));
            runner.run(|_| CommandHandler::new(program.clone(), rest.to_vec(), paths.clone()))?
        }
        _ => {
            let timeslices = scene.ground_motion.map(|gm| Timeslices { nt: gm.nt, dt: gm.dt });
            runner.run(|_| ArtifactHandler::new(paths.clone(), timeslices))?
        }
    };

    print_report(&report);

    if plan.animated {
        let sequence = SequenceFinalizer::from_config(paths, &config).finalize(plan.total_frames())?;
        if sequence.filled > 0 {
            ui::print_warning(&format!("{} duplicated to cover missing frames", pluralize(sequence.filled, "frame", "frames")));
        }
        ui::print_success(&format!(
            "{} ready at {}",
            pluralize(sequence.frames, "frame", "frames"),
            sequence.pattern.display()
        ));
    } else {
        ui::print_success(&format!("Still written to {}", paths.frame(None).display()));
    }

    println!();
    println!("{}", "=".repeat(50).cyan());
    ui::print_success(&format!("Completed in {}", format_duration(start_time.elapsed())));
    Ok(())
}

fn print_report(report: &RunReport) {
    let mut items: Vec<(&str, String)> = report
        .jobs_by_kind()
        .into_iter()
        .map(|(kind, count)| (kind.name(), count.to_string()))
        .collect();
    items.push(("waits", report.dispatch.waits.to_string()));
    items.push(("busy", format_duration(report.total_busy())));
    items.push(("idle", format_duration(report.total_idle())));
    items.push(("elapsed", format_duration(report.elapsed)));
    ui::print_summary("Run Summary", &items);

    for (worker_id, entry) in report.slowest(3) {
        log::info!(
            "slow: worker {} {:?} seq {:?} took {}",
            worker_id,
            entry.activity,
            entry.seq,
            format_duration(entry.duration)
        );
    }

    for failure in &report.failures {
        ui::print_warning(&format!(
            "worker {} failed {}: {}",
            failure.worker_id,
            failure.job,
            failure.reason.red()
        ));
    }
    log::debug!("{}", report.summary());
}
