use clap::Parser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use task_cli::cli::{
    Cli, Command, collect_config_overrides, normalize_legacy_args, parse_task_id,
    unknown_command_message,
};
use task_core::TaskStore;
use task_core::config;
use task_core::error::AppError;
use task_core::model::Task;
use task_core::storage::csv_store::CsvBackend;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Complete")]
    complete: bool,
}

fn init_tracing() {
    // Off unless RUST_LOG asks for it; logs go to stderr.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn task_json(task: &Task) -> Result<serde_json::Value, AppError> {
    Ok(serde_json::json!({
        "id": task.id,
        "description": task.description,
        "created_at": task.created_timestamp(),
        "is_complete": task.is_complete,
    }))
}

fn print_tasks_table(tasks: &[Task]) -> Result<(), AppError> {
    let mut rows = Vec::with_capacity(tasks.len());
    for task in tasks {
        rows.push(TaskRow {
            id: task.id,
            description: task.description.clone(),
            created: task.created_display()?,
            complete: task.is_complete,
        });
    }

    let mut table = Table::new(rows);
    table.with(Style::blank());
    println!("{table}");
    Ok(())
}

fn print_tasks_json(tasks: &[Task]) -> Result<(), AppError> {
    let payload = tasks.iter().map(task_json).collect::<Result<Vec<_>, _>>()?;
    println!("{}", serde_json::Value::Array(payload));
    Ok(())
}

fn print_task(task: &Task, json: bool, verb: &str) -> Result<(), AppError> {
    if json {
        println!("{}", task_json(task)?);
    } else {
        println!("Task {verb}: {} (ID: {})", task.description, task.id);
    }
    Ok(())
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    if err.kind() == ErrorKind::InvalidSubcommand {
        let name = match err.get(ContextKind::InvalidSubcommand) {
            Some(ContextValue::String(name)) => name.as_str(),
            _ => "unknown",
        };
        return AppError::invalid_input(unknown_command_message(name));
    }

    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn open_store(cli: &Cli) -> Result<TaskStore<CsvBackend>, AppError> {
    let overrides = collect_config_overrides(&cli.config_override)?;
    let loaded = config::load_config_with_fallback();
    if let Some(err) = loaded.error.as_ref() {
        tracing::warn!(error = %err, "ignoring unreadable config");
    }
    let config = config::merge_overrides(&loaded.config, &overrides);

    let path = config::store_path(&config)?;
    tracing::debug!(path = %path.display(), "using task file");
    let backend = CsvBackend::new(path).with_lock_timeout(config.lock_timeout_ms());
    Ok(TaskStore::new(backend))
}

fn run_command(cli: Cli) -> Result<(), AppError> {
    let mut store = open_store(&cli)?;

    match cli.command {
        Command::Add { description } => {
            let description = description.join(" ");
            if description.trim().is_empty() {
                return Err(AppError::invalid_input("description is required"));
            }

            let task = store.add(&description)?;
            print_task(&task, cli.json, "added")?;
        }
        Command::List { all } => {
            let tasks: Vec<Task> = store.list(all)?.cloned().collect();
            if cli.json {
                print_tasks_json(&tasks)?;
            } else {
                print_tasks_table(&tasks)?;
            }
        }
        Command::Complete { id } => {
            let task = store.complete(parse_task_id(&id)?)?;
            print_task(&task, cli.json, "completed")?;
        }
        Command::Delete { id } => {
            let task = store.delete(parse_task_id(&id)?)?;
            print_task(&task, cli.json, "deleted")?;
        }
    }

    Ok(())
}

fn main() {
    init_tracing();

    let cli = match Cli::try_parse_from(normalize_legacy_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => {
            if matches!(
                err.kind(),
                ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) {
                err.exit();
            }
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
