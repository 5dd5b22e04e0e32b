//! Account Service - command-line front end for account management.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use account_service_lib::config::AccountServiceConfig;
use account_service_lib::service::AccountService;
use account_service_lib::{parse_preferences, MigrateAction};
use common::{AppError, AppResult, IntoOutcome, Outcome};
use domain::{
    Account, RegisterAccount, UpdateAccount, MSG_ACCOUNT_NOT_FOUND, MSG_DELETED, MSG_EDITED,
    MSG_LOGGED_IN, MSG_LOGGED_OUT, MSG_REGISTERED,
};

#[derive(Parser)]
#[command(name = "account-service")]
#[command(about = "User account management")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Database URL (overrides ACCOUNT_SERVICE_DATABASE_URL / DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration commands
    Migrate {
        #[command(subcommand)]
        action: MigrateCommands,
    },
    #[command(flatten)]
    Account(AccountCommands),
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Register a new account
    Register {
        username: String,
        email: String,
        #[arg(long, env = "ACCOUNT_PASSWORD")]
        password: String,
        #[arg(long)]
        default_model: Option<String>,
        /// Preferences as a JSON object
        #[arg(long)]
        preferences: Option<String>,
    },
    /// Check credentials and record the login
    Login {
        /// Username or email
        identifier: String,
        #[arg(long, env = "ACCOUNT_PASSWORD")]
        password: String,
    },
    /// End a session (no server-side state)
    Logout { id: i32 },
    /// Edit an account
    Edit {
        id: i32,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        default_model: Option<String>,
    },
    /// Permanently delete an account
    Delete { id: i32 },
    /// Show an account by id
    Get { id: i32 },
    /// Show an account by username or email
    Find { identifier: String },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset database and run all migrations
    Fresh,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AccountServiceConfig::from_env().with_database_url(cli.database_url);
    tracing::debug!(?config, "Configuration loaded");

    match run(cli.command, &config).await {
        Ok((true, message)) => println!("{}", message),
        Ok((false, message)) => {
            eprintln!("{}", message);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("Command failed: {}", e);
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}

/// Execute one command and report its outcome.
async fn run(command: Commands, config: &AccountServiceConfig) -> AppResult<Outcome> {
    match command {
        Commands::Migrate { action } => {
            let action = match action {
                MigrateCommands::Up => MigrateAction::Up,
                MigrateCommands::Down => MigrateAction::Down,
                MigrateCommands::Status => MigrateAction::Status,
                MigrateCommands::Fresh => MigrateAction::Fresh,
            };
            account_service_lib::run_migrations(config, action).await?;
            Ok((true, "Done.".to_string()))
        }
        Commands::Account(command) => run_account(command, config).await,
    }
}

async fn run_account(
    command: AccountCommands,
    config: &AccountServiceConfig,
) -> AppResult<Outcome> {
    let service = account_service_lib::connect(config).await?;

    let outcome = match command {
        AccountCommands::Register {
            username,
            email,
            password,
            default_model,
            preferences,
        } => {
            let mut input = RegisterAccount::new(username, email, password);
            if let Some(model) = default_model {
                input = input.with_default_model(model);
            }
            if let Some(raw) = preferences {
                input = input.with_preferences(parse_preferences(&raw)?);
            }
            service.register(input).await.into_outcome(MSG_REGISTERED)
        }
        AccountCommands::Login {
            identifier,
            password,
        } => service
            .login(&identifier, &password)
            .await
            .into_outcome(MSG_LOGGED_IN),
        AccountCommands::Logout { id } => service.logout(id).await.into_outcome(MSG_LOGGED_OUT),
        AccountCommands::Edit {
            id,
            username,
            email,
            password,
            default_model,
        } => {
            let changes = UpdateAccount {
                username,
                email,
                password,
                default_model,
            };
            service.edit(id, changes).await.into_outcome(MSG_EDITED)
        }
        AccountCommands::Delete { id } => service.delete(id).await.into_outcome(MSG_DELETED),
        AccountCommands::Get { id } => show(service.find_by_id(id).await?)?,
        AccountCommands::Find { identifier } => {
            show(service.find_by_username_or_email(&identifier).await?)?
        }
    };

    Ok(outcome)
}

/// Render a lookup result as pretty JSON.
fn show(account: Option<Account>) -> AppResult<Outcome> {
    match account {
        Some(account) => {
            let json = serde_json::to_string_pretty(&account)
                .map_err(|e| AppError::internal(e.to_string()))?;
            Ok((true, json))
        }
        None => Ok((false, MSG_ACCOUNT_NOT_FOUND.to_string())),
    }
}

/// Initialize tracing subscriber
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "debug".to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();
}
