//! `habits` command-line front end.
//!
//! # Responsibility
//! - Map subcommands onto habit directory and streak engine calls.
//! - Print results as pretty JSON for scripting.
//!
//! # Invariants
//! - "Today" always comes from the local wall clock.
//! - Every command opens the database through `open_db_with_busy_timeout`,
//!   so migrations run before any data access.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use habit_core::db::open_db_with_busy_timeout;
use habit_core::service::stats_service::DEFAULT_SERIES_DAYS;
use habit_core::{
    init_logging_from_config, CoreConfig, HabitDraft, HabitId, HabitOverview, HabitPatch,
    HabitService, SqliteHabitRepository, StatsService, StreakPolicy, StreakService, SystemClock,
};
use log::info;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "habits")]
#[command(about = "Track daily habit completions and streaks", long_about = None)]
#[command(version)]
struct Cli {
    /// SQLite database file (defaults to HABITS_DB_PATH or ./habits.sqlite3)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Restart the current streak after a missed day
    #[arg(long, global = true)]
    reset_on_gap: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a habit
    Add(HabitArgs),
    /// List habits with their streaks, newest first
    List,
    /// Show one habit with its streak and history
    Show {
        /// Habit id
        id: HabitId,
    },
    /// Change a habit's fields; omitted fields keep their current values
    Update {
        /// Habit id
        id: HabitId,
        #[command(flatten)]
        fields: UpdateArgs,
    },
    /// Delete a habit with its completions and streak
    Delete {
        /// Habit id
        id: HabitId,
    },
    /// Mark today as completed
    Complete {
        /// Habit id
        id: HabitId,
    },
    /// Undo today's completion
    Uncomplete {
        /// Habit id
        id: HabitId,
    },
    /// Print the stored streak counters
    Streak {
        /// Habit id
        id: HabitId,
    },
    /// Rebuild streak counters from the completion history
    Repair {
        /// Habit id
        id: HabitId,
    },
    /// Summary numbers, daily completions, and the streak ranking
    Stats {
        /// Length of the daily completion series
        #[arg(long, default_value_t = DEFAULT_SERIES_DAYS)]
        days: u32,
    },
}

#[derive(Args)]
struct HabitArgs {
    /// Habit name
    name: String,
    /// Free-form description
    #[arg(short, long, default_value = "")]
    description: String,
    /// daily, weekly, or multiple_times_week
    #[arg(short, long)]
    frequency: Option<String>,
    /// Completions per period
    #[arg(short, long)]
    target: Option<u32>,
}

impl HabitArgs {
    fn into_draft(self) -> HabitDraft {
        HabitDraft {
            name: self.name,
            description: self.description,
            frequency: self.frequency,
            target_count: self.target,
        }
    }
}

#[derive(Args)]
struct UpdateArgs {
    /// New name
    #[arg(short, long)]
    name: Option<String>,
    /// New description
    #[arg(short, long)]
    description: Option<String>,
    /// daily, weekly, or multiple_times_week
    #[arg(short, long)]
    frequency: Option<String>,
    /// Completions per period
    #[arg(short, long)]
    target: Option<u32>,
}

impl UpdateArgs {
    fn into_patch(self) -> HabitPatch {
        HabitPatch {
            name: self.name,
            description: self.description,
            frequency: self.frequency,
            target_count: self.target,
        }
    }
}

#[derive(Serialize)]
struct HabitDetail {
    #[serde(flatten)]
    overview: HabitOverview,
    history: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CoreConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if cli.reset_on_gap {
        config.streak_policy = StreakPolicy::ResetOnGap;
    }
    init_logging_from_config(&config).map_err(|err| anyhow!(err))?;

    let conn = open_db_with_busy_timeout(&config.db_path, config.busy_timeout)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    info!(
        "event=cli_start module=cli status=ok policy={}",
        config.streak_policy.as_str()
    );

    let habits = HabitService::new(SqliteHabitRepository::try_new(&conn)?);
    let streaks = StreakService::try_new(&conn, SystemClock)?.with_policy(config.streak_policy);

    match cli.command {
        Commands::Add(args) => {
            let habit = habits.create_habit(&args.into_draft())?;
            print_json(&streaks.overview(habit)?)
        }
        Commands::List => print_json(&streaks.list_overviews()?),
        Commands::Show { id } => {
            let overview = streaks.overview(habits.get_habit(id)?)?;
            let history = streaks
                .completion_history(id)?
                .into_iter()
                .map(habit_core::model::completion::format_day)
                .collect();
            print_json(&HabitDetail { overview, history })
        }
        Commands::Update { id, fields } => {
            let habit = habits.update_habit(id, &fields.into_patch())?;
            print_json(&streaks.overview(habit)?)
        }
        Commands::Delete { id } => {
            habits.delete_habit(id)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Commands::Complete { id } => print_json(&streaks.complete(id)?),
        Commands::Uncomplete { id } => print_json(&streaks.uncomplete(id)?),
        Commands::Streak { id } => print_json(&streaks.get_streak(id)?),
        Commands::Repair { id } => print_json(&streaks.rebuild_streak(id)?),
        Commands::Stats { days } => {
            let stats = StatsService::try_new(&conn, SystemClock)?;
            print_json(&stats.report(days)?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
