use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use together_lib::blob::FsBlobStore;
use together_lib::config::{Config, Overrides};
use together_lib::model::*;
use together_lib::notify::{NoticeKind, Notifier, TracingNotifier};
use together_lib::pages::{Photos, WeeklyTasks};
use together_lib::schema::{fields, EntitySchema, Row};
use together_lib::state::AppState;
use together_lib::time::{days_together, parse_date, today};
use together_lib::{db, migrate, session, DomainHook, Entity, ListOutcome};

#[derive(Debug, Parser)]
#[command(name = "together", about = "Shared goals, memories and plans for two", version)]
struct Cli {
    /// Database file (overrides TOGETHER_DB).
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Photo directory (overrides TOGETHER_BLOBS).
    #[arg(long, global = true)]
    blobs: Option<PathBuf>,
    /// Four-character passcode (overrides TOGETHER_PASSCODE).
    #[arg(long, global = true)]
    passcode: Option<String>,
    /// Relationship start date, YYYY-MM-DD (overrides TOGETHER_SINCE).
    #[arg(long, global = true)]
    since: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List every table with its columns.
    Tables,
    /// Print the records of a table, newest first.
    List {
        table: String,
        /// Only tasks for the week containing this date (weekly_tasks only).
        #[arg(long)]
        week: Option<String>,
    },
    /// Create a record from a JSON object.
    Add {
        table: String,
        #[arg(long)]
        json: String,
    },
    /// Change some fields of a record.
    Edit {
        table: String,
        id: String,
        #[arg(long)]
        json: String,
    },
    /// Permanently delete a record.
    Delete {
        table: String,
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Days since the relationship started.
    Days,
    /// Check the passcode and pick who is using the app.
    Unlock { partner: String, code: String },
    /// Manage the photo gallery.
    #[command(subcommand)]
    Photos(PhotoCommand),
    /// Database maintenance.
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum PhotoCommand {
    List,
    Upload { path: PathBuf },
    Remove { name: String },
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply pending migrations.
    Migrate,
}

/// Shows notices on stderr and records them in the log.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, kind: NoticeKind, title: &str, description: &str) {
        TracingNotifier.notify(kind, title, description);
        eprintln!("{title}: {description}");
    }
}

/// Calls `$func` with the record type that backs `$table`.
macro_rules! with_entity {
    ($table:expr, $func:ident ( $($arg:expr),* )) => {
        match $table {
            "achievements" => $func::<Achievement>($($arg),*).await,
            "books" => $func::<Book>($($arg),*).await,
            "budget_items" => $func::<BudgetItem>($($arg),*).await,
            "business_ventures" => $func::<BusinessVenture>($($arg),*).await,
            "checkins" => $func::<CheckIn>($($arg),*).await,
            "church_activities" => $func::<ChurchActivity>($($arg),*).await,
            "goals" => $func::<Goal>($($arg),*).await,
            "growth_entries" => $func::<GrowthEntry>($($arg),*).await,
            "growth_goals" => $func::<GrowthGoal>($($arg),*).await,
            "income_sources" => $func::<IncomeSource>($($arg),*).await,
            "journal_entries" => $func::<JournalEntry>($($arg),*).await,
            "legacy_plans" => $func::<LegacyPlan>($($arg),*).await,
            "love_letters" => $func::<LoveLetter>($($arg),*).await,
            "memories" => $func::<Memory>($($arg),*).await,
            "prayer_requests" => $func::<PrayerRequest>($($arg),*).await,
            "reading_goals" => $func::<ReadingGoal>($($arg),*).await,
            "savings_goals" => $func::<SavingsGoal>($($arg),*).await,
            "scripture_reflections" => $func::<ScriptureReflection>($($arg),*).await,
            "spiritual_goals" => $func::<SpiritualGoal>($($arg),*).await,
            "timeline_events" => $func::<TimelineEvent>($($arg),*).await,
            "weekly_tasks" => $func::<WeeklyTask>($($arg),*).await,
            other => Err(anyhow!("unknown table {other:?}; run `together tables` to see them")),
        }
    };
}

#[tokio::main]
async fn main() {
    together_lib::logging::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let config = Config::resolve(Overrides {
        db_path: cli.db,
        blob_root: cli.blobs,
        passcode: cli.passcode,
        together_since: cli.since,
    })?;

    match cli.command {
        Commands::Tables => {
            print_tables();
            Ok(0)
        }
        Commands::Days => {
            println!("{}", days_together(config.together_since, today()));
            Ok(0)
        }
        Commands::Unlock { partner, code } => {
            match session::unlock(&config.passcode, &code, &partner) {
                Ok(session) => {
                    println!("Unlocked as {}", session.partner);
                    Ok(0)
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    Ok(1)
                }
            }
        }
        Commands::Photos(cmd) => handle_photos(&config, cmd).await,
        Commands::Db(DbCommand::Migrate) => {
            let pool = db::open_sqlite_pool(&config.db_path).await?;
            let applied = migrate::apply_migrations(&pool).await?;
            pool.close().await;
            if applied.is_empty() {
                println!("Database is up to date.");
            }
            for name in applied {
                println!("Applied {name}");
            }
            Ok(0)
        }
        Commands::List { table, week } => {
            let state = AppState::open(config, Arc::new(ConsoleNotifier)).await?;
            let code = match week {
                Some(week) => list_week(&state, &table, &week).await?,
                None => with_entity!(table.as_str(), list_table(&state))?,
            };
            state.pool.close().await;
            Ok(code)
        }
        Commands::Add { table, json } => {
            let state = AppState::open(config, Arc::new(ConsoleNotifier)).await?;
            let row = parse_row(&json)?;
            let code = with_entity!(table.as_str(), add_record(&state, row))?;
            state.pool.close().await;
            Ok(code)
        }
        Commands::Edit { table, id, json } => {
            let state = AppState::open(config, Arc::new(ConsoleNotifier)).await?;
            let row = parse_row(&json)?;
            let code = with_entity!(table.as_str(), edit_record(&state, &id, row))?;
            state.pool.close().await;
            Ok(code)
        }
        Commands::Delete { table, id, yes } => {
            let schema =
                schema_for(&table).ok_or_else(|| anyhow!("unknown table {table:?}"))?;
            if !yes && !confirm(&format!("Delete {} {id}? This cannot be undone. [y/N] ", schema.noun))? {
                println!("Cancelled.");
                return Ok(0);
            }
            let state = AppState::open(config, Arc::new(ConsoleNotifier)).await?;
            let code = with_entity!(table.as_str(), delete_record(&state, &id))?;
            state.pool.close().await;
            Ok(code)
        }
    }
}

fn hook<E: Entity>(state: &AppState) -> DomainHook<E> {
    DomainHook::new(Arc::clone(&state.store), Arc::clone(&state.notifier))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{json}");
    Ok(())
}

fn parse_row(json: &str) -> Result<Row> {
    let value: Value = serde_json::from_str(json).context("parse --json")?;
    if !value.is_object() {
        bail!("--json must be a JSON object");
    }
    Ok(fields(value))
}

fn list_exit(outcome: ListOutcome) -> i32 {
    if outcome.is_loaded() {
        0
    } else {
        1
    }
}

async fn list_table<E: Entity>(state: &AppState) -> Result<i32> {
    let hook = hook::<E>(state);
    let outcome = hook.list().await;
    if outcome.is_loaded() {
        print_json(&hook.items())?;
    }
    Ok(list_exit(outcome))
}

async fn list_week(state: &AppState, table: &str, week: &str) -> Result<i32> {
    if table != WEEKLY_TASKS.table {
        bail!("--week only applies to {}", WEEKLY_TASKS.table);
    }
    let date = parse_date(week).ok_or_else(|| anyhow!("invalid --week {week:?}, expected YYYY-MM-DD"))?;
    let page = WeeklyTasks::new(Arc::clone(&state.store), Arc::clone(&state.notifier));
    let outcome = page.load_week(date).await;
    if outcome.is_loaded() {
        print_json(&page.tasks.items())?;
    }
    Ok(list_exit(outcome))
}

/// Form-level checks run before the hook sees the draft.
fn rejected_draft(schema: &EntitySchema, row: &Row, creating: bool) -> bool {
    let checked = if creating {
        schema.check_required(row)
    } else {
        Ok(())
    };
    match checked.and_then(|()| schema.prepare_write(row.clone())) {
        Ok(_) => false,
        Err(err) => {
            eprintln!("Error: {}", err.message());
            true
        }
    }
}

async fn add_record<E: Entity>(state: &AppState, row: Row) -> Result<i32> {
    if rejected_draft(E::schema(), &row, true) {
        return Ok(2);
    }
    match hook::<E>(state).create(row).await {
        Some(record) => {
            print_json(&record)?;
            Ok(0)
        }
        None => Ok(1),
    }
}

async fn edit_record<E: Entity>(state: &AppState, id: &str, row: Row) -> Result<i32> {
    if rejected_draft(E::schema(), &row, false) {
        return Ok(2);
    }
    match hook::<E>(state).update(id, row).await {
        Some(record) => {
            print_json(&record)?;
            Ok(0)
        }
        None => Ok(1),
    }
}

async fn delete_record<E: Entity>(state: &AppState, id: &str) -> Result<i32> {
    Ok(if hook::<E>(state).delete(id).await { 0 } else { 1 })
}

fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt}");
    std::io::stderr().flush().ok();
    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("read confirmation")?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn print_tables() {
    for schema in SCHEMAS {
        println!("{:<22} {}", schema.table, columns(schema));
    }
}

fn columns(schema: &EntitySchema) -> String {
    schema
        .columns()
        .map(|c| match schema.field(c) {
            Some(spec) if spec.required => format!("{c}*"),
            _ => c.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

async fn handle_photos(config: &Config, cmd: PhotoCommand) -> Result<i32> {
    let photos = Photos::new(
        Arc::new(FsBlobStore::new(config.blob_root.clone())),
        Arc::new(ConsoleNotifier),
    );
    match cmd {
        PhotoCommand::List => {
            if !photos.load().await {
                return Ok(1);
            }
            print_json(&photos.photos())?;
            Ok(0)
        }
        PhotoCommand::Upload { path } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("read {}", path.display()))?;
            let original = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match photos.upload(&original, &bytes).await {
                Some(photo) => {
                    print_json(&photo)?;
                    Ok(0)
                }
                None => Ok(1),
            }
        }
        PhotoCommand::Remove { name } => Ok(if photos.remove(&name).await { 0 } else { 1 }),
    }
}
