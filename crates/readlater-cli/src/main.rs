//! readlater CLI
//!
//! Command-line surface over the shared reading list.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use readlater_core::{Config, DuplicatePolicy, SortOrder, StorageError};

mod commands;
mod output;
mod prompt;

use commands::App;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "readlater")]
#[command(about = "readlater - save pages to read later, sorted into categories")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use a specific config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a link at the top of the list
    Add {
        /// URL to save
        url: String,
        /// Title (defaults to the URL)
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Category (defaults to the last selected one)
        #[arg(short, long)]
        category: Option<String>,
        /// What to do if the URL is already saved elsewhere (move, confirm)
        #[arg(long)]
        policy: Option<DuplicatePolicy>,
    },
    /// Save the link if missing, remove it if saved
    Toggle {
        url: String,
        #[arg(short = 'T', long)]
        title: Option<String>,
    },
    /// List saved links
    #[command(alias = "ls")]
    List {
        /// Case-insensitive match on title or URL
        #[arg(short, long)]
        search: Option<String>,
        /// Only show this category (remembered for next time)
        #[arg(short, long)]
        category: Option<String>,
        /// Sort order: desc, asc, manual
        #[arg(long, default_value = "desc")]
        sort: SortOrder,
    },
    /// Remove links
    #[command(alias = "rm")]
    Remove {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Change the title of a link
    Edit { url: String, title: String },
    /// Move links into a category
    Move {
        category: String,
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Move a link between positions of the manually ordered list
    Reorder {
        /// Position shown by `list --sort manual`
        from: usize,
        /// Position to move it to
        to: usize,
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Open a saved link in the browser
    Open { url: String },
    /// Manage categories
    Category {
        #[command(subcommand)]
        command: Option<CategoryCommands>,
    },
    /// Show the list and follow changes from other processes
    Watch {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long, default_value = "manual")]
        sort: SortOrder,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show store location and counts
    Status,
    /// Delete every saved link and category
    Clear,
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// List categories with link counts
    #[command(alias = "ls")]
    List,
    /// Create a category (auto-named when NAME is omitted)
    Add { name: Option<String> },
    /// Rename a category and re-point its links
    Rename { old: String, new: String },
    /// Delete a category; its links move to the default category
    #[command(alias = "rm")]
    Delete { name: String },
    /// Move a category between positions
    Reorder { from: usize, to: usize },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, duplicate_policy, search_debounce_ms, poll_interval_ms, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_deref();

    // Config commands work without opening the store
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config = Config::load_with_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let app = App::open(config).map_err(with_recovery_hint)?;

    let result = match cli.command {
        Commands::Add {
            url,
            title,
            category,
            policy,
        } => commands::link::add(&app, url, title, category, policy, &output),
        Commands::Toggle { url, title } => commands::link::toggle(&app, url, title, &output),
        Commands::List {
            search,
            category,
            sort,
        } => commands::link::list(&app, search, category, sort, &output),
        Commands::Remove { urls } => commands::link::remove(&app, urls, &output),
        Commands::Edit { url, title } => commands::link::edit(&app, url, title, &output),
        Commands::Move { category, urls } => commands::link::move_to(&app, category, urls, &output),
        Commands::Reorder {
            from,
            to,
            search,
            category,
        } => commands::link::reorder(&app, from, to, search, category, &output),
        Commands::Open { url } => commands::link::open_link(&app, url, &output),
        Commands::Category { command } => handle_category_command(command, &app, &output),
        Commands::Watch {
            search,
            category,
            sort,
        } => commands::watch::run(&app, search, category, sort, &output).await,
        Commands::Status => commands::status::show(&app, &output),
        Commands::Clear => commands::link::clear(&app, &output),
        Commands::Config { .. } => Ok(()), // Handled above
    };
    result.map_err(with_recovery_hint)
}

/// Append the recovery suggestion of an underlying storage error
fn with_recovery_hint(err: anyhow::Error) -> anyhow::Error {
    let hint = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<StorageError>())
        .and_then(StorageError::recovery_suggestion);
    match hint {
        Some(hint) => anyhow::anyhow!("{:#}\n{}", err, hint),
        None => err,
    }
}

fn handle_category_command(
    command: Option<CategoryCommands>,
    app: &App,
    output: &Output,
) -> Result<()> {
    match command {
        Some(CategoryCommands::List) | None => commands::category::list(app, output),
        Some(CategoryCommands::Add { name }) => commands::category::add(app, name, output),
        Some(CategoryCommands::Rename { old, new }) => {
            commands::category::rename(app, old, new, output)
        }
        Some(CategoryCommands::Delete { name }) => commands::category::delete(app, name, output),
        Some(CategoryCommands::Reorder { from, to }) => {
            commands::category::reorder(app, from, to, output)
        }
    }
}

/// Initialize file logging when READLATER_LOG is set
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("READLATER_LOG") else {
        return;
    };

    let log_path = config.log_path();

    let log_file = match File::options().create(true).append(true).open(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "readlater_core={},readlater={}",
        log_level, log_level
    ));

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_with_policy() {
        let cli = Cli::try_parse_from([
            "readlater",
            "add",
            "https://example.com",
            "--category",
            "Tech",
            "--policy",
            "confirm",
        ])
        .unwrap();

        match cli.command {
            Commands::Add {
                url,
                category,
                policy,
                ..
            } => {
                assert_eq!(url, "https://example.com");
                assert_eq!(category.as_deref(), Some("Tech"));
                assert_eq!(policy, Some(DuplicatePolicy::Confirm));
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_parse_list_sort_and_global_flags() {
        let cli = Cli::try_parse_from(["readlater", "list", "--sort", "asc", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::List { sort, .. } => assert_eq!(sort, SortOrder::Ascending),
            _ => panic!("expected list"),
        }

        assert!(Cli::try_parse_from(["readlater", "list", "--sort", "sideways"]).is_err());
    }

    #[test]
    fn test_recovery_hint_is_appended() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let storage = StorageError::from_io(source, PathBuf::from("/data/storage.json"));
        let err = anyhow::Error::from(readlater_core::ReadingListError::from(storage))
            .context("Failed to save link");

        let message = format!("{:#}", with_recovery_hint(err));
        assert!(message.starts_with("Failed to save link"));
        assert!(message.contains("Check file and directory permissions"));

        let plain = with_recovery_hint(anyhow::anyhow!("no hint here"));
        assert_eq!(plain.to_string(), "no hint here");
    }

    #[test]
    fn test_parse_category_reorder_positions() {
        let cli = Cli::try_parse_from(["readlater", "category", "reorder", "3", "1"]).unwrap();
        match cli.command {
            Commands::Category {
                command: Some(CategoryCommands::Reorder { from, to }),
            } => assert_eq!((from, to), (3, 1)),
            _ => panic!("expected category reorder"),
        }
    }

    #[test]
    fn test_remove_requires_urls() {
        assert!(Cli::try_parse_from(["readlater", "remove"]).is_err());
    }
}
