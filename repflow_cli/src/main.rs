use clap::{Args, Parser, Subcommand};
use repflow_core::config::DataConfig;
use repflow_core::csv_rollup::{cleanup_processed_wals, wal_to_csv_and_archive};
use repflow_core::flatten::{format_duration, format_weight};
use repflow_core::progression::{cluster_percentages, number_of_clusters, weights_from_percentages};
use repflow_core::wal::recent_summaries;
use repflow_core::*;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Upper bound on simulated ticks, a safety net for programs that never end
const MAX_SIMULATED_TICKS: u32 = 24 * 60 * 60;

#[derive(Parser)]
#[command(name = "repflow")]
#[command(about = "Workout program execution engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct ProgramArgs {
    /// Program file (.json or .toml)
    #[arg(required_unless_present = "builtin", conflicts_with = "builtin")]
    program: Option<PathBuf>,

    /// Built-in program name (see `repflow list`)
    #[arg(long)]
    builtin: Option<String>,

    /// One-rep-max table (defaults to maxes.json in the data directory)
    #[arg(long)]
    maxes: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program on a live 1-second tick
    Run {
        #[command(flatten)]
        program: ProgramArgs,

        /// Countdown before the first step (defaults to config)
        #[arg(long)]
        countdown: Option<u32>,

        /// Run without waiting: tick instantly and accept every prefilled set
        #[arg(long)]
        simulate: bool,

        /// Constant heart rate fed to a simulated session
        #[arg(long, requires = "simulate")]
        heart_rate: Option<u32>,

        /// Print events and the summary as JSON lines
        #[arg(long)]
        json: bool,

        /// Do not append the summary to the log
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the flattened step sequence of a program
    Plan {
        #[command(flatten)]
        program: ProgramArgs,

        /// Print the steps as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute per-cluster loads for a set
    Loads {
        /// Total reps in the set
        #[arg(long)]
        reps: u32,

        /// Reps per cluster
        #[arg(long)]
        cluster_size: u32,

        /// Lowest percentage of 1RM
        #[arg(long)]
        min: f64,

        /// Highest percentage of 1RM
        #[arg(long)]
        max: f64,

        /// constant, ascending, descending or wave
        #[arg(long, default_value = "constant", value_parser = parse_progression)]
        progression: ClusterProgression,

        /// One-rep-max in kilograms
        #[arg(long)]
        one_rep_max: Option<f64>,
    },

    /// Check a program file for range and ordering problems
    Validate {
        /// Program file (.json or .toml)
        program: PathBuf,
    },

    /// Show recent session summaries
    History {
        /// Number of sessions to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Export the summary log to CSV and archive it
    Export {
        /// Remove archived log files after export
        #[arg(long)]
        cleanup: bool,
    },

    /// List built-in programs
    List,
}

fn main() -> Result<()> {
    repflow_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data = DataConfig {
        data_dir: cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone()),
    };

    match cli.command {
        Commands::Run {
            program,
            countdown,
            simulate,
            heart_rate,
            json,
            dry_run,
        } => {
            let options = RunOptions {
                countdown: countdown.unwrap_or(config.session.countdown_seconds),
                simulate,
                heart_rate,
                json,
                dry_run,
            };
            cmd_run(&program, &data, &config, &options)
        }
        Commands::Plan { program, json } => cmd_plan(&program, &data, json),
        Commands::Loads {
            reps,
            cluster_size,
            min,
            max,
            progression,
            one_rep_max,
        } => cmd_loads(reps, cluster_size, min, max, progression, one_rep_max),
        Commands::Validate { program } => cmd_validate(&program),
        Commands::History { limit } => cmd_history(&data, limit),
        Commands::Export { cleanup } => cmd_export(&data, cleanup),
        Commands::List => cmd_list(),
    }
}

fn parse_progression(value: &str) -> std::result::Result<ClusterProgression, String> {
    match value.to_lowercase().as_str() {
        "constant" => Ok(ClusterProgression::Constant),
        "ascending" => Ok(ClusterProgression::Ascending),
        "descending" => Ok(ClusterProgression::Descending),
        "wave" => Ok(ClusterProgression::Wave),
        other => Err(format!(
            "unknown progression '{}' (expected constant, ascending, descending or wave)",
            other
        )),
    }
}

// ============================================================================
// Program loading
// ============================================================================

fn load_program(args: &ProgramArgs) -> Result<Program> {
    match (&args.builtin, &args.program) {
        (Some(name), _) => get_builtin(name).cloned().ok_or_else(|| {
            Error::Other(format!(
                "Unknown built-in program '{}' (available: {})",
                name,
                builtin_names().join(", ")
            ))
        }),
        (None, Some(path)) => Program::load_validated(path),
        (None, None) => Err(Error::Other("No program given".into())),
    }
}

fn load_maxes(args: &ProgramArgs, data: &DataConfig) -> Result<OneRepMaxTable> {
    let path = args.maxes.clone().unwrap_or_else(|| data.maxes_path());
    load_one_rep_maxes(&path)
}

// ============================================================================
// run
// ============================================================================

struct RunOptions {
    countdown: u32,
    simulate: bool,
    heart_rate: Option<u32>,
    json: bool,
    dry_run: bool,
}

/// Prints each event as one JSON line
struct JsonLinesSink;

impl EventSink for JsonLinesSink {
    fn on_event(&mut self, event: &SessionEvent) {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!("Failed to serialize event: {}", e),
        }
    }
}

fn print_notification(notification: &Notification) {
    match &notification.cue {
        Some(cue) => println!("  ♪ [{}] {}", cue, notification.message),
        None => println!("  {}", notification.message),
    }
}

fn build_sinks(config: &Config, json: bool) -> Vec<Box<dyn EventSink>> {
    let mut sinks: Vec<Box<dyn EventSink>> = vec![Box::new(LogSink)];
    if json {
        sinks.push(Box::new(JsonLinesSink));
    } else {
        sinks.push(Box::new(MotivationSink::new(
            Motivator::from_config(&config.motivation),
            print_notification,
        )));
    }
    sinks
}

fn dispatch(sinks: &mut [Box<dyn EventSink>], events: &[SessionEvent]) {
    for event in events {
        for sink in sinks.iter_mut() {
            sink.on_event(event);
        }
    }
}

fn cmd_run(args: &ProgramArgs, data: &DataConfig, config: &Config, options: &RunOptions) -> Result<()> {
    let program = load_program(args)?;
    let maxes = load_maxes(args, data)?;
    let mut sinks = build_sinks(config, options.json);

    let mut session = WorkoutSession::from_config(&config.session);
    if !options.json {
        println!("\n▶ {} (~{})", program.name, format_duration(flatten(&program, &maxes).total_estimated_duration));
    }

    let events = session.start(&program, options.countdown, &maxes);
    dispatch(&mut sinks, &events);

    let finished = if options.simulate {
        simulate(&mut session, &mut sinks, options.heart_rate)
    } else {
        drive_interactive(&mut session, &mut sinks, options.json)?
    };

    if !finished {
        println!("\nSession abandoned - nothing logged.");
        return Ok(());
    }

    let Some(summary) = SessionSummary::from_session(&session, program.name.clone(), chrono::Utc::now()) else {
        return Ok(());
    };

    if options.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        display_summary(&summary);
    }

    if options.dry_run {
        if !options.json {
            println!("\n[Dry run - not logging session]");
        }
    } else {
        let mut sink = JsonlSink::new(data.summaries_path());
        sink.append(&summary)?;
        if !options.json {
            println!("\n✓ Session logged!");
        }
    }

    Ok(())
}

/// Run to completion without waiting on the clock
fn simulate(session: &mut WorkoutSession, sinks: &mut [Box<dyn EventSink>], heart_rate: Option<u32>) -> bool {
    if let Some(bpm) = heart_rate {
        session.record_heart_rate(bpm);
    }

    let mut ticks = 0;
    while !session.is_workout_completed() && ticks < MAX_SIMULATED_TICKS {
        let on_reps = session.current_step().map(|s| s.is_reps()).unwrap_or(false);
        let events = if on_reps && !session.is_countdown_active() {
            match session.confirm_set() {
                Ok(events) => events,
                Err(e) => {
                    tracing::warn!("Prefilled set rejected ({}), skipping it", e);
                    session.skip_current_set()
                }
            }
        } else {
            ticks += 1;
            session.tick()
        };
        dispatch(sinks, &events);
    }

    session.is_workout_completed()
}

/// User input during a live session
#[derive(Debug, PartialEq)]
enum Input {
    Confirm,
    SkipSet,
    NextStep,
    PreviousStep,
    TogglePause,
    RoundUp,
    RoundDown,
    EndInterval,
    SkipPhase,
    HeartRate(u32),
    Reps(u32),
    Weight(f64),
    Rpe(u8),
    Note(String),
    Status,
    Help,
    Quit,
}

fn parse_input(line: &str) -> std::result::Result<Input, String> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    let number = |what: &str| -> std::result::Result<f64, String> {
        rest.parse::<f64>()
            .map_err(|_| format!("'{}' needs a number, got '{}'", what, rest))
    };

    let input = match command.to_lowercase().as_str() {
        "" | "c" | "done" => Input::Confirm,
        "s" | "skip" => Input::SkipSet,
        "n" | "next" => Input::NextStep,
        "b" | "back" => Input::PreviousStep,
        "p" | "pause" => Input::TogglePause,
        "+" => Input::RoundUp,
        "-" => Input::RoundDown,
        "e" | "end" => Input::EndInterval,
        ">" => Input::SkipPhase,
        "hr" => Input::HeartRate(number("hr")? as u32),
        "r" | "reps" => Input::Reps(number("reps")? as u32),
        "w" | "weight" => Input::Weight(number("weight")?),
        "rpe" => Input::Rpe(number("rpe")? as u8),
        "note" => Input::Note(rest.to_string()),
        "?" | "status" => Input::Status,
        "h" | "help" => Input::Help,
        "q" | "quit" => Input::Quit,
        other => return Err(format!("unknown command '{}' (type 'help')", other)),
    };
    Ok(input)
}

fn print_help() {
    println!("─────────────────────────────────────────");
    println!("  Enter / c     confirm set");
    println!("  s             skip set");
    println!("  n / b         next / previous step");
    println!("  p             pause / resume");
    println!("  + / -         AMRAP round up / down");
    println!("  >             skip interval phase");
    println!("  e             end interval early");
    println!("  r N, w KG     set reps / weight of the current set");
    println!("  rpe N         set RPE (1-10)");
    println!("  note TEXT     attach a note to the current set");
    println!("  hr BPM        record heart rate (0 = unknown)");
    println!("  ?             status");
    println!("  q             quit without logging");
    println!("─────────────────────────────────────────");
}

/// Read stdin lines on a helper thread
fn spawn_input_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to read input: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// Drive the session from the wall clock and stdin
///
/// All session mutation happens on this thread. Ticks are not generated while
/// paused. Returns whether the workout completed.
fn drive_interactive(session: &mut WorkoutSession, sinks: &mut [Box<dyn EventSink>], json: bool) -> Result<bool> {
    let rx = spawn_input_reader();
    if !json {
        print_help();
        print_status(session);
    }

    let tick = Duration::from_secs(1);
    let mut next_tick = Instant::now() + tick;

    while !session.is_workout_completed() {
        let timeout = next_tick.saturating_duration_since(Instant::now());
        match rx.recv_timeout(timeout) {
            Ok(line) => {
                let input = match parse_input(&line) {
                    Ok(input) => input,
                    Err(message) => {
                        println!("  {}", message);
                        continue;
                    }
                };
                if input == Input::Quit {
                    return Ok(false);
                }
                let was_paused = session.is_paused();
                let events = apply_input(session, input, json);
                dispatch(sinks, &events);
                if was_paused && !session.is_paused() {
                    next_tick = Instant::now() + tick;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                next_tick += tick;
                if session.is_paused() {
                    continue;
                }
                let events = session.tick();
                dispatch(sinks, &events);
                if !json && session.general_elapsed_time() % 10 == 0 && !session.is_countdown_active() {
                    print_status(session);
                }
                if !json && session.is_countdown_active() {
                    println!("  {}...", session.countdown_remaining_seconds());
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::info!("Input closed");
                return Ok(false);
            }
        }
        io::stdout().flush()?;
    }

    Ok(true)
}

fn apply_input(session: &mut WorkoutSession, input: Input, json: bool) -> Vec<SessionEvent> {
    match input {
        Input::Confirm => match session.confirm_set() {
            Ok(events) => events,
            Err(e) => {
                println!("  ✗ {}", e);
                Vec::new()
            }
        },
        Input::SkipSet => session.skip_current_set(),
        Input::NextStep => session.skip_to_next_step(),
        Input::PreviousStep => session.go_to_previous_step(),
        Input::TogglePause => {
            let paused = session.toggle_pause();
            if !json {
                println!("  {}", if paused { "⏸ Paused" } else { "▶ Resumed" });
            }
            Vec::new()
        }
        Input::RoundUp => {
            session.increment_round();
            Vec::new()
        }
        Input::RoundDown => {
            session.decrement_round();
            Vec::new()
        }
        Input::EndInterval => session.end_interval(),
        Input::SkipPhase => session.skip_phase(),
        Input::HeartRate(bpm) => {
            session.record_heart_rate(bpm);
            Vec::new()
        }
        Input::Reps(reps) => {
            session.draft_mut().reps = Some(reps);
            Vec::new()
        }
        Input::Weight(kg) => {
            session.draft_mut().weight = Some(kg);
            Vec::new()
        }
        Input::Rpe(rpe) => {
            session.draft_mut().rpe = Some(rpe);
            Vec::new()
        }
        Input::Note(text) => {
            session.draft_mut().notes = (!text.is_empty()).then_some(text);
            Vec::new()
        }
        Input::Status => {
            if json {
                match serde_json::to_string(&session.snapshot()) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!("Failed to serialize snapshot: {}", e),
                }
            } else {
                print_status(session);
            }
            Vec::new()
        }
        Input::Help => {
            print_help();
            Vec::new()
        }
        Input::Quit => Vec::new(),
    }
}

fn print_status(session: &WorkoutSession) {
    let snapshot = session.snapshot();
    let Some(step) = &snapshot.step else {
        return;
    };

    let mut line = format!(
        "[{}] Step {}/{} · {}",
        format_duration(snapshot.general_elapsed_time),
        snapshot.step_index + 1,
        snapshot.step_count,
        step.title
    );

    if let Some(interval) = &snapshot.interval {
        if let Some(phase) = &interval.phase {
            line.push_str(&format!(
                " · {} {} ({} left)",
                interval.protocol,
                phase.label,
                format_duration(interval.remaining_time)
            ));
        }
        if matches!(step.kind, StepKind::Interval { protocol: CycleDescription::Amrap { .. } }) {
            line.push_str(&format!(" · {} rounds", interval.rounds_completed));
        }
    } else if let Some(total_sets) = step.total_sets() {
        let draft = session.draft();
        line.push_str(&format!(" · set {}/{}", snapshot.completed_sets + 1, total_sets));
        if let Some(reps) = draft.reps {
            line.push_str(&format!(" · {} reps", reps));
        }
        if let Some(kg) = draft.weight {
            line.push_str(&format!(" @ {}", format_weight(kg)));
        }
    } else if let Some(remaining) = snapshot.step_remaining_time {
        line.push_str(&format!(" · {} left", format_duration(remaining)));
    }

    if let Some(zone) = snapshot.current_zone {
        line.push_str(&format!(" · Z{} {}", zone.number(), zone.name()));
    }
    if snapshot.status == SessionStatus::Paused {
        line.push_str(" · paused");
    }

    println!("{}", line);
}

fn display_summary(summary: &SessionSummary) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  SESSION COMPLETE");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  {}", summary.program_name);
    println!("  Time: {}", format_duration(summary.total_elapsed_seconds));
    println!(
        "  Sets: {} done, {} skipped",
        summary.completed_sets(),
        summary.skipped_sets()
    );

    let volume = summary.total_volume();
    if volume > 0.0 {
        println!("  Volume: {}", format_weight(volume));
    }
    if let Some(rpe) = summary.average_rpe() {
        println!("  Avg RPE: {:.1}", rpe);
    }
    for record in summary.set_records.iter().filter(|r| r.rounds_completed.is_some()) {
        println!(
            "  {}: {} rounds",
            record.exercise_name,
            record.rounds_completed.unwrap_or(0)
        );
    }

    let zones = summary.zone_percentages();
    if !zones.is_empty() {
        println!();
        for (zone, pct) in zones {
            println!("  Z{} {:<10} {:>5.1}%", zone.number(), zone.name(), pct);
        }
    }
}

// ============================================================================
// plan / loads / validate
// ============================================================================

fn cmd_plan(args: &ProgramArgs, data: &DataConfig, json: bool) -> Result<()> {
    let program = load_program(args)?;
    let maxes = load_maxes(args, data)?;
    let flat = flatten(&program, &maxes);

    if json {
        println!("{}", serde_json::to_string_pretty(&flat)?);
        return Ok(());
    }

    println!("\n  {}", program.name);
    if let Some(description) = &program.description {
        println!("  {}", description);
    }
    println!();

    for (i, step) in flat.steps.iter().enumerate() {
        let marker = match step.kind {
            StepKind::Timed { is_rest: true, .. } => "·",
            StepKind::Timed { .. } => "⏱",
            StepKind::Reps { .. } => "↻",
            StepKind::Interval { .. } => "⚡",
        };
        println!(
            "  {:>2}. {} {:<24} {:>6}  {}",
            i + 1,
            marker,
            step.title,
            format_duration(step.estimated_duration),
            step.subtitle
        );
        if let Some(LoadPrescription::Cluster(plan)) = &step.prescription {
            let loads: Vec<String> = match &plan.weights {
                Some(weights) => weights.iter().map(|kg| format_weight(*kg)).collect(),
                None => plan.percentages.iter().map(|p| format!("{:.1}%", p)).collect(),
            };
            println!("        clusters: {}", loads.join(" → "));
        }
    }

    println!();
    println!("  Total: ~{}", format_duration(flat.total_estimated_duration));
    Ok(())
}

fn cmd_loads(
    reps: u32,
    cluster_size: u32,
    min: f64,
    max: f64,
    progression: ClusterProgression,
    one_rep_max: Option<f64>,
) -> Result<()> {
    if min > max {
        return Err(Error::Other(format!("--min {} is greater than --max {}", min, max)));
    }
    let Some(clusters) = number_of_clusters(Some(reps), Some(cluster_size)) else {
        return Err(Error::Other("--cluster-size must be greater than zero".into()));
    };

    let percentages = cluster_percentages(clusters, progression, min, max);
    let weights = weights_from_percentages(&percentages, one_rep_max);

    println!("{} reps in {} clusters ({:?})", reps, clusters, progression);
    for (i, pct) in percentages.iter().enumerate() {
        let cluster_reps = cluster_size.min(reps - i as u32 * cluster_size);
        match &weights {
            Some(weights) => println!(
                "  {}. {} reps @ {:.1}% = {}",
                i + 1,
                cluster_reps,
                pct,
                format_weight(weights[i])
            ),
            None => println!("  {}. {} reps @ {:.1}%", i + 1, cluster_reps, pct),
        }
    }
    Ok(())
}

fn cmd_validate(path: &Path) -> Result<()> {
    let program = Program::load_from(path)?;
    let errors = program.validate();

    if errors.is_empty() {
        let flat = flatten(&program, &NoOneRepMax);
        println!(
            "✓ {} is valid ({} steps, ~{})",
            program.name,
            flat.len(),
            format_duration(flat.total_estimated_duration)
        );
        return Ok(());
    }

    eprintln!("Program validation errors:");
    for error in &errors {
        eprintln!("  - {}", error);
    }
    Err(Error::ProgramValidation(format!("{} problem(s) found", errors.len())))
}

// ============================================================================
// history / export / list
// ============================================================================

fn cmd_history(data: &DataConfig, limit: usize) -> Result<()> {
    let summaries = recent_summaries(&data.summaries_path(), limit)?;
    if summaries.is_empty() {
        println!("No sessions logged yet.");
        return Ok(());
    }

    for summary in &summaries {
        println!(
            "  {}  {:<24} {:>6}  {} sets",
            summary.completed_at.format("%Y-%m-%d %H:%M"),
            summary.program_name,
            format_duration(summary.total_elapsed_seconds),
            summary.completed_sets()
        );
    }
    Ok(())
}

fn cmd_export(data: &DataConfig, cleanup: bool) -> Result<()> {
    let wal_path = data.summaries_path();
    let sessions_csv = data.data_dir.join("sessions.csv");
    let sets_csv = data.data_dir.join("sets.csv");

    if !wal_path.exists() {
        println!("No summary log found - nothing to export.");
        return Ok(());
    }

    let counts = wal_to_csv_and_archive(&wal_path, &sessions_csv, &sets_csv)?;

    println!("✓ Exported {} sessions ({} sets) to CSV", counts.sessions, counts.sets);
    println!("  Sessions: {}", sessions_csv.display());
    println!("  Sets: {}", sets_csv.display());

    if cleanup {
        if let Some(wal_dir) = wal_path.parent() {
            let cleaned = cleanup_processed_wals(wal_dir)?;
            if cleaned > 0 {
                println!("✓ Cleaned up {} processed log files", cleaned);
            }
        }
    }

    Ok(())
}

fn cmd_list() -> Result<()> {
    for (name, program) in &builtin_catalog().programs {
        let flat = flatten(program, &NoOneRepMax);
        println!(
            "  {:<12} {:<24} ~{}",
            name,
            program.name,
            format_duration(flat.total_estimated_duration)
        );
    }
    Ok(())
}
