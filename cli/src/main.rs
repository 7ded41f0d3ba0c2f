//! Tixer tickets CLI
//!
//! Command-line front end over the ticket store. Input is validated here,
//! before the store is called, and results are printed as JSON.
//!
//! ```sh
//! # Run with default config (~/.config/tixer/config.toml)
//! tixer create --title "Concert" --price 120
//!
//! # Page through tickets, newest first
//! tixer list --limit 10
//! tixer list --limit 10 --after <id>
//!
//! # Validate config without touching the database
//! tixer --check
//! ```

mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use serde_json::Value;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use tixer::config::CONFIG_ENV_VAR;
use tixer::domain::ticket::DEFAULT_PAGE_LIMIT;
use tixer::domain::{
    DomainError, DomainResult, ErrorKind, Filter, Ticket, TicketId, TicketService, TicketUpdate,
};
use tixer::{
    default_config_path, init_database, init_tracing, run_migrations, AppConfig, SeaOrmTicketStore,
};

/// Create, read, update, delete and page through tickets.
#[derive(Parser, Debug)]
#[command(
    name = "tixer",
    version,
    about = "Tickets store with an always-consistent ticket counter",
    long_about = "Tixer: tickets persisted in SQLite together with a counter \
                  aggregate that always equals the number of stored tickets.\n\n\
                  Default config: ~/.config/tixer/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Override the database URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply migrations and provision the counter.
    Migrate,
    /// Create a ticket.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        price: f64,
    },
    /// Show one ticket.
    Get { id: String },
    /// Change the title and/or price of a ticket.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        price: Option<f64>,
    },
    /// Delete a ticket.
    Delete { id: String },
    /// List one page of tickets, newest first.
    List {
        /// Start strictly after this ticket.
        #[arg(long)]
        after: Option<String>,
        /// End strictly before this ticket.
        #[arg(long)]
        before: Option<String>,
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    let mut config = match AppConfig::load_or_default(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", config_path.display(), e);
            return ExitCode::from(1);
        }
    };

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(url) = &cli.database_url {
        config.database.url = url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    init_tracing(&config.logging);
    info!("Configuration loaded from {}", config_path.display());

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        if let Err(e) = config.validate() {
            eprintln!("Configuration is invalid: {}", e);
            return ExitCode::from(1);
        }
        println!("Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   Database    : {}", config.database.url);
        println!("   Counter key : {}", config.store.counter_key);
        println!("   Log level   : {}", config.logging.level);
        return ExitCode::SUCCESS;
    }

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return ExitCode::from(1);
    };

    match run(&config, command, !cli.no_migrate).await {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "Command failed");
            eprintln!("{}", output::error(&err));
            ExitCode::from(exit_code(err.kind()))
        }
    }
}

fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::NotFound => 2,
        ErrorKind::Validation => 3,
        _ => 1,
    }
}

async fn run(config: &AppConfig, command: Command, migrate: bool) -> DomainResult<Value> {
    let counter_key = config.counter_key().map_err(|e| {
        DomainError::Validation(invalid_field("counter_key", "config", e.to_string()))
    })?;

    // ── Database ───────────────────────────────────────────────
    let db = init_database(&config.database_config()).await?;
    if migrate || matches!(command, Command::Migrate) {
        run_migrations(&db).await?;
    }

    let store = SeaOrmTicketStore::new(db, counter_key).with_retry(config.retry_config());
    let ctx = config.operation_context();

    match command {
        Command::Migrate => {
            let counter = store.provision_counter().await?;
            Ok(output::message(format!(
                "database is up to date, counter {} holds {} tickets",
                counter.key, counter.total_tickets
            )))
        }
        Command::Create { title, price } => {
            let ticket = Ticket::new(title, price);
            ticket.validate()?;
            let stored = store.create_ticket(&ctx, ticket).await?;
            Ok(output::ticket(&stored))
        }
        Command::Get { id } => {
            let ticket = store.read_ticket(&ctx, parse_id("id", &id)?).await?;
            Ok(output::ticket(&ticket))
        }
        Command::Update { id, title, price } => {
            let update = TicketUpdate {
                id: parse_id("id", &id)?,
                title,
                price,
            };
            update.validate()?;
            let ticket = store.update_ticket(&ctx, update).await?;
            Ok(output::ticket(&ticket))
        }
        Command::Delete { id } => {
            store.delete_ticket(&ctx, parse_id("id", &id)?).await?;
            Ok(output::message("ticket successfully deleted"))
        }
        Command::List {
            after,
            before,
            limit,
        } => {
            let filter = Filter {
                after: after.as_deref().map(|s| parse_id("after", s)).transpose()?,
                before: before.as_deref().map(|s| parse_id("before", s)).transpose()?,
                limit,
            };
            filter.validate()?;
            let (tickets, metadata) = store.read_tickets(&ctx, filter).await?;
            Ok(output::tickets(&tickets, &metadata))
        }
    }
}

fn parse_id(field: &'static str, raw: &str) -> DomainResult<TicketId> {
    raw.parse::<TicketId>().map_err(|_| {
        DomainError::Validation(invalid_field(field, "uuid", "must be a valid ticket id".into()))
    })
}

fn invalid_field(field: &'static str, code: &'static str, message: String) -> ValidationErrors {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    errors
}
