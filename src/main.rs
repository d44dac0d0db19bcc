//! OwnMon Stats - daily activity statistics
//!
//! Runs the statistics engine and inspects, exchanges or erases the
//! recorded history.

use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use ownmon_stats::monitor::{spawn_ticker, TickerConfig};
use ownmon_stats::{
    BreakCounter, BreakKind, Config, DailyRecord, MiscCounter, Statistics, StatsDeps,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Daily activity statistics.
///
/// Counts keystrokes, clicks, pointer travel, active time and breaks per day
/// and keeps the history in a crash-safe log.
#[derive(Debug, Parser)]
#[command(name = "ownmon-stats", version, about, long_about = None)]
struct Cli {
    /// Path to config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the rollover and checkpoint loop until Ctrl+C (default).
    ///
    /// Input events come from an `InputSource` supplied by an embedding
    /// application; none is installed here.
    Run,

    /// List archived days, most recent first.
    Show {
        /// Number of days to list.
        #[arg(short, long, default_value_t = 7)]
        limit: usize,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show one day in detail.
    Day {
        /// Date as YYYY-MM-DD.
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
    },

    /// Summarize the last days, today included.
    Summary {
        #[arg(short, long, default_value_t = 7)]
        days: u32,
    },

    /// Write the history and current day to a peer exchange file.
    Export { file: PathBuf },

    /// Merge a peer exchange file into the local history.
    Import { file: PathBuf },

    /// Delete all recorded statistics.
    Erase {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| format!("{value}: {e}"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ownmon_stats=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load_from(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    tracing::debug!(?config, "Configuration loaded");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&config),
        Commands::Show { limit, json } => show(&config, limit, json),
        Commands::Day { date } => show_day(&config, date),
        Commands::Summary { days } => summary(&config, days),
        Commands::Export { file } => {
            let stats = open(&config)?;
            std::fs::write(&file, stats.peer_snapshot())?;
            println!("✓ Exported history to {}", file.display());
            Ok(())
        }
        Commands::Import { file } => {
            let stats = open(&config)?;
            let message = std::fs::read(&file)?;
            let changed = stats.receive_peer_message(&message)?;
            stats.dump();
            println!("✓ Merged {} from {}", plural(changed, "day"), file.display());
            Ok(())
        }
        Commands::Erase { yes } => {
            if !yes {
                eprintln!("Refusing to delete statistics without --yes");
                return Ok(());
            }
            open(&config)?.delete_all_history()?;
            println!("✓ All statistics deleted");
            Ok(())
        }
    }
}

fn open(config: &Config) -> Result<Arc<Statistics>, Box<dyn std::error::Error>> {
    let stats = Statistics::init(config.stats(), StatsDeps::system())?;
    let health = stats.health();
    if health.degraded {
        eprintln!(
            "⚠ Statistics storage degraded: {}",
            health.last_storage_error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(stats)
}

fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║              OwnMon - Activity Statistics                  ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    println!("🔧 Loading statistics from {}...", config.data_dir.display());
    let stats = open(config)?;
    println!("   ✓ {} archived", plural(stats.get_history_size(), "day"));

    // Shutdown signal
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        println!("\n🛑 Shutdown signal received...");
        shutdown_ctrlc.store(true, Ordering::SeqCst);
    })?;

    println!("🔧 Starting update loop...");
    let ticker = spawn_ticker(
        Arc::clone(&stats),
        Arc::clone(&shutdown),
        TickerConfig {
            interval: config.update_interval(),
        },
    );
    println!("   ✓ Ticking every {}ms", config.update_interval().as_millis());

    // Input events arrive through an `InputSource` attached by an embedding
    // application. No platform hook is installed here.
    println!("   ⚠ No input hook installed; counters change only through the library API");
    println!();
    println!("🎯 Tracking days. Press Ctrl+C to quit.");
    println!();

    while !shutdown.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(200));
    }

    println!("\n⏳ Shutting down...");
    if ticker.join().is_err() {
        tracing::error!("Statistics ticker panicked");
    }

    print_summary(&stats);
    println!("\n👋 OwnMon Stats has exited. Goodbye!");
    Ok(())
}

fn show(config: &Config, limit: usize, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let stats = open(config)?;
    let days: Vec<DailyRecord> = stats.history().into_iter().rev().take(limit).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&days)?);
        return Ok(());
    }

    if days.is_empty() {
        println!("No archived days yet.");
        return Ok(());
    }

    println!(
        "{:<12} {:>10} {:>10} {:>8} {:>12} {:>8}",
        "Date", "Active", "Keys", "Clicks", "Movement", "Breaks"
    );
    for day in &days {
        let breaks = BreakKind::ALL
            .iter()
            .fold(0u64, |sum, &kind| sum.saturating_add(breaks_taken(day, kind)));
        println!(
            "{:<12} {:>10} {:>10} {:>8} {:>12} {:>8}",
            day.date().map(|d| d.to_string()).unwrap_or_default(),
            format_secs(day.misc_counter(MiscCounter::TotalActiveTime)),
            day.misc_counter(MiscCounter::TotalKeystrokes),
            day.misc_counter(MiscCounter::TotalClicks),
            day.misc_counter(MiscCounter::TotalMouseMovement),
            breaks
        );
    }
    Ok(())
}

fn show_day(config: &Config, date: NaiveDate) -> Result<(), Box<dyn std::error::Error>> {
    let stats = open(config)?;

    let current = stats.get_current_day();
    if current.date() == Some(date) {
        println!("📅 {date} (today)");
        print_day(&current);
        return Ok(());
    }

    let lookup = stats.get_day_index_by_date(date.year(), date.month(), date.day());
    match lookup.index {
        Some(index) => {
            println!("📅 {date}");
            print_day(&stats.get_day(index)?);
        }
        None => {
            println!("No record for {date}.");
            let neighbour = |index: Option<usize>| {
                index
                    .and_then(|i| stats.get_day(i).ok())
                    .and_then(|d| d.date())
            };
            if let Some(prev) = neighbour(lookup.prev) {
                println!("   Previous recorded day: {prev}");
            }
            if let Some(next) = neighbour(lookup.next) {
                println!("   Next recorded day:     {next}");
            }
        }
    }
    Ok(())
}

fn summary(config: &Config, days: u32) -> Result<(), Box<dyn std::error::Error>> {
    let stats = open(config)?;
    let summary = stats.summary(days);

    println!("📊 Last {}", plural(days as usize, "day"));
    println!("   Recorded Days: {}", summary.days);
    println!("   Active Time:   {}", format_secs(summary.total_active_time_secs));
    println!("   Avg per Day:   {}", format_secs(summary.average_active_secs()));
    println!("   Keystrokes:    {}", summary.total_keystrokes);
    println!("   Mouse Clicks:  {}", summary.total_clicks);
    println!("   Mouse Travel:  {} px", summary.total_mouse_movement);
    println!("   Mouse Time:    {}", format_secs(summary.total_movement_time_secs));
    println!(
        "   Breaks:        {} prompted, {} taken, {} skipped",
        summary.breaks_prompted, summary.breaks_taken, summary.breaks_skipped
    );
    if let Some(busiest) = summary.busiest_day {
        println!("   Busiest Day:   {busiest}");
    }
    Ok(())
}

fn print_day(day: &DailyRecord) {
    if let (Some(start), Some(stop)) = (day.start, day.stop) {
        println!("   Span:          {} - {}", start.format("%H:%M:%S"), stop.format("%H:%M:%S"));
    }
    println!("   Active Time:   {}", format_secs(day.misc_counter(MiscCounter::TotalActiveTime)));
    println!("   Keystrokes:    {}", day.misc_counter(MiscCounter::TotalKeystrokes));
    println!("   Mouse Clicks:  {}", day.misc_counter(MiscCounter::TotalClicks));
    println!("   Mouse Travel:  {} px", day.misc_counter(MiscCounter::TotalMouseMovement));
    println!("   Click Travel:  {} px", day.misc_counter(MiscCounter::TotalClickMovement));
    println!("   Mouse Time:    {}", format_secs(day.total_mouse_time_ms / 1000));

    for kind in BreakKind::ALL {
        let prompted = day.break_counter(kind, BreakCounter::Prompted);
        if prompted == 0 && breaks_taken(day, kind) == 0 {
            continue;
        }
        println!(
            "   {:<14} {} prompted, {} taken, {} skipped, {} postponed",
            format!("{}:", kind.name()),
            prompted,
            breaks_taken(day, kind),
            day.break_counter(kind, BreakCounter::Skipped),
            day.break_counter(kind, BreakCounter::Postponed)
        );
    }
}

fn print_summary(stats: &Statistics) {
    let day = stats.get_current_day();

    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("📊 Today's Activity");
    println!("════════════════════════════════════════════════════════════════");
    print_day(&day);

    let health = stats.health();
    if health.degraded || health.discarded_blocks > 0 {
        println!();
        println!("⚠ Storage:");
        println!("   Degraded:        {}", health.degraded);
        println!("   Dropped Blocks:  {}", health.discarded_blocks);
    }
    println!("════════════════════════════════════════════════════════════════");
}

fn breaks_taken(day: &DailyRecord, kind: BreakKind) -> u64 {
    day.break_counter(kind, BreakCounter::Taken)
        .saturating_add(day.break_counter(kind, BreakCounter::NaturalTaken))
}

fn format_secs(secs: u64) -> String {
    format!("{}h {:02}m {:02}s", secs / 3600, secs % 3600 / 60, secs % 60)
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}
