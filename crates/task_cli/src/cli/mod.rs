use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;
use task_core::config::ConfigOverrides;
use task_core::error::AppError;

pub const COMMAND_NAMES: [&str; 4] = ["add", "list", "complete", "delete"];

#[derive(Parser, Debug)]
#[command(
    name = "task",
    author,
    version,
    about = "Track short tasks in a CSV file",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: task add buy milk
    Add { description: Vec<String> },
    /// List tasks
    ///
    /// Example: task list
    /// Example: task list --all
    List {
        /// Include completed tasks
        #[arg(short, long)]
        all: bool,
    },
    /// Mark a task as complete
    ///
    /// Example: task complete 1
    Complete {
        #[arg(allow_negative_numbers = true)]
        id: String,
    },
    /// Delete a task
    ///
    /// Example: task delete 1
    Delete {
        #[arg(allow_negative_numbers = true)]
        id: String,
    },
}

/// Rewrite the single-dash `list -all` spelling to `--all`; clap would read
/// it as the short flags `-a -l -l`.
pub fn normalize_legacy_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut after_list = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if after_list && arg == "-all" {
                return OsString::from("--all");
            }
            if arg == "list" {
                after_list = true;
            }
            arg
        })
        .collect()
}

pub fn parse_task_id(raw: &str) -> Result<u64, AppError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| AppError::invalid_input("invalid task ID: must be a number"))
}

pub fn unknown_command_message(name: &str) -> String {
    format!(
        "'{name}' command not found. Available commands: {}",
        COMMAND_NAMES.join(", ")
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    StorePath,
    LockTimeoutMs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let (key_raw, value_raw) = raw
        .trim()
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    if value.is_empty() {
        return Err("override value cannot be empty".to_string());
    }

    let canonical_field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "store_path" | "store" => ConfigOverrideTarget::StorePath,
        "lock_timeout_ms" | "lock_timeout" => ConfigOverrideTarget::LockTimeoutMs,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

pub fn collect_config_overrides(raw: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry).map_err(AppError::invalid_input)?;
        match parsed.target {
            ConfigOverrideTarget::StorePath => {
                overrides.store_path = Some(PathBuf::from(parsed.value));
            }
            ConfigOverrideTarget::LockTimeoutMs => {
                let timeout = parsed.value.parse::<u64>().map_err(|_| {
                    AppError::invalid_input("lock_timeout_ms must be a whole number of milliseconds")
                })?;
                overrides.lock_timeout_ms = Some(timeout);
            }
        }
    }
    Ok(overrides)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
