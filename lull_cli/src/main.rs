use chrono::{DateTime, NaiveTime, Timelike, Utc};
use clap::{Parser, Subcommand};
use lull_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lull")]
#[command(about = "Infant nap and bedtime planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// IANA time zone, e.g. Europe/London
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Evaluate at this RFC 3339 instant instead of the current time
    #[arg(long, global = true)]
    now: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current picture (default)
    Status {
        /// Print the output model as JSON
        #[arg(long)]
        json: bool,
    },

    /// Log a care event
    Log {
        /// first_awake, nap_started, nap_ended, milk, solids, routine, asleep
        event_type: String,

        /// When it happened: RFC 3339 or HH:MM today (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Move an event to a different time
    Edit {
        id: String,

        /// RFC 3339 or HH:MM today
        #[arg(long)]
        at: String,
    },

    /// Delete an event
    Delete { id: String },

    /// List the normalized event log
    List,

    /// Export the normalized event log as CSV
    Export {
        /// Output file (default: <data dir>/log.csv)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    lull_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.constraints.validate()?;

    let mut data = config.data.clone();
    if let Some(dir) = &cli.data_dir {
        data.data_dir = dir.clone();
    }
    let log_path = data.log_path();

    let zone_name = cli
        .timezone
        .clone()
        .unwrap_or_else(|| config.clock.timezone.clone());
    let zone = parse_zone(&zone_name)?;
    let now = match &cli.now {
        Some(s) => parse_instant(s)?,
        None => Utc::now(),
    };

    tracing::debug!("Evaluating {:?} at {} ({})", log_path, now, zone_name);
    let mut log = EventLog::load(&log_path, now);

    match cli.command.unwrap_or(Commands::Status { json: false }) {
        Commands::Status { json } => {
            let snapshot = commit(&mut log, &log_path, now, &zone, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot.output)?);
            } else {
                display_output(&snapshot.output);
            }
        }

        Commands::Log { event_type, at } => {
            let event_type: EventType = event_type
                .parse()
                .map_err(|e: UnknownEventType| Error::InvalidInput(e.to_string()))?;
            let at = match at {
                Some(s) => parse_time(&s, now, &zone)?,
                None => now,
            };

            let id = log.append(event_type, at);
            commit(&mut log, &log_path, now, &zone, &config)?;
            println!("✓ Logged {} at {} ({})", event_type, clock(&zone, at), id);
        }

        Commands::Edit { id, at } => {
            let at = parse_time(&at, now, &zone)?;
            if log.edit_timestamp(&id, at) {
                commit(&mut log, &log_path, now, &zone, &config)?;
                println!("✓ Moved {} to {}", id, clock(&zone, at));
            } else {
                println!("No event with id {}", id);
            }
        }

        Commands::Delete { id } => match log.delete(&id) {
            Some(removed) => {
                commit(&mut log, &log_path, now, &zone, &config)?;
                println!(
                    "✓ Deleted {} at {}",
                    removed.event_type,
                    clock(&zone, removed.timestamp_utc)
                );
            }
            None => println!("No event with id {}", id),
        },

        Commands::List => {
            let snapshot = commit(&mut log, &log_path, now, &zone, &config)?;
            for event in &snapshot.normalized {
                println!(
                    "{}  {:<15} {}{}",
                    clock(&zone, event.timestamp_utc),
                    event.event_type.to_string(),
                    event.id,
                    if event.auto_predicted { "  [auto]" } else { "" }
                );
            }
        }

        Commands::Export { out } => {
            let snapshot = evaluate(&log, now, &zone, &config.constraints);
            let out = out.unwrap_or_else(|| data.data_dir.join("log.csv"));
            let count = export_csv(&snapshot.normalized, &zone, &out)?;
            println!("✓ Exported {} events to {}", count, out.display());
        }
    }

    Ok(())
}

/// Run the pipeline, keep its normalized log and persist it.
fn commit(
    log: &mut EventLog,
    log_path: &Path,
    now: DateTime<Utc>,
    zone: &impl CivilTime,
    config: &Config,
) -> Result<Snapshot> {
    let snapshot = evaluate(log, now, zone, &config.constraints);
    log.adopt(snapshot.normalized.clone());
    log.save(log_path)?;
    Ok(snapshot)
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("'{}' is not an RFC 3339 instant: {}", s, e)))
}

/// RFC 3339, or HH:MM on the current civil day
fn parse_time(s: &str, now: DateTime<Utc>, zone: &impl CivilTime) -> Result<DateTime<Utc>> {
    if let Ok(instant) = parse_instant(s) {
        return Ok(instant);
    }

    let time = NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| {
        Error::InvalidInput(format!("'{}' is neither RFC 3339 nor HH:MM", s))
    })?;
    let today = zone.to_civil(now).date;
    Ok(zone.from_civil(CivilFields::new(today, time.hour(), time.minute())))
}

fn clock(zone: &impl CivilTime, instant: DateTime<Utc>) -> String {
    let civil = zone.to_civil(instant);
    format!("{:02}:{:02}", civil.hour, civil.minute)
}

fn display_output(output: &OutputModel) {
    println!("\n╭─────────────────────────────────────────╮");
    if output.is_asleep {
        println!("│  ASLEEP");
    } else {
        println!("│  AWAKE · {:?}", output.tier);
    }
    println!("╰─────────────────────────────────────────╯");
    println!();

    for line in &output.summary {
        println!("  {}", line);
    }

    if !output.categories.is_empty() {
        println!();
        if !output.categories.windows.is_empty() {
            println!("  Window:  {}", output.categories.windows.join(", "));
        }
        if !output.categories.allowed.is_empty() {
            println!("  Allowed: {}", output.categories.allowed.join(", "));
        }
        if !output.categories.suppressed.is_empty() {
            println!("  Avoid:   {}", output.categories.suppressed.join(", "));
        }
    }

    println!();
    println!("  Shift rules:");
    for shift in &output.shifts {
        let marker = match shift.status {
            ShiftStatus::Applied => "applied",
            ShiftStatus::Pending => "pending",
        };
        println!("    [{}] {}", marker, shift.detail);
    }

    println!();
    let utilization = output
        .pressure
        .wake_window_utilization
        .map(|u| format!("{:.0}%", u * 100.0))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  Pressure: wake window {} · trend {:?} · risk {:?}",
        utilization, output.pressure.trend, output.pressure.risk
    );
    println!();
}
