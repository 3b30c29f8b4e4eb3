mod commands;
mod config;
mod credentials;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::helpers::{error_message, json_error};
use crate::commands::{
    cmd_calorie_add, cmd_calorie_delete, cmd_calorie_list, cmd_calorie_show, cmd_register,
    cmd_user_delete, cmd_user_show, cmd_user_update,
};
use crate::config::Config;
use crate::credentials::Argon2Credentials;
use kcal_core::credentials::CredentialStore;
use kcal_core::models::PublicUser;
use kcal_core::{CalorieService, Role, Session};

#[derive(Parser)]
#[command(
    name = "kcal",
    version,
    about = "A multi-user calorie tracker",
    long_about = "A multi-user calorie tracker.\n\n\
        Every command except `register` runs as the account given by --user and --password.\n\
        Regular users manage their own account and entries, user managers also manage\n\
        regular accounts, and admins manage everything."
)]
struct Cli {
    /// Account to act as
    #[arg(short, long, global = true)]
    user: Option<String>,
    /// Password for --user (or the new account, for `register`)
    #[arg(short, long, global = true)]
    password: Option<String>,
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a regular account (uses --password)
    Register {
        /// Username for the new account
        username: String,
        /// Daily calorie target
        #[arg(short, long)]
        target: i64,
    },
    /// Manage accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Log and browse calorie entries
    Calorie {
        #[command(subcommand)]
        command: CalorieCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Show one account, or every account when no username is given
    Show {
        /// Username to show
        username: Option<String>,
    },
    /// Delete an account and all of its entries
    Delete {
        /// Username to delete
        username: String,
    },
    /// Change one field of an account
    Update {
        /// Username to update
        username: String,
        /// New password
        #[arg(long)]
        new_password: Option<String>,
        /// New role: regular, user_manager, admin
        #[arg(long)]
        role: Option<Role>,
        /// New daily calorie target
        #[arg(short, long)]
        target: Option<i64>,
    },
}

#[derive(Subcommand)]
enum CalorieCommands {
    /// Log a calorie entry
    Add {
        /// What was eaten
        text: String,
        /// Calories in the entry (default: 0)
        calories: Option<i64>,
        /// Date (YYYY-MM-DD, today or yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Time (HH:MM, default: now)
        #[arg(long)]
        time: Option<String>,
        /// Log on behalf of another user (admin only)
        #[arg(long = "for", value_name = "USERNAME")]
        for_user: Option<String>,
    },
    /// Show a calorie entry by ID
    Show {
        /// Entry ID
        id: i64,
    },
    /// List calorie entries, optionally filtered
    List {
        /// Only entries owned by this user
        #[arg(short, long)]
        owner: Option<String>,
        /// Filter expression, e.g. "(date eq '2020-02-01') AND (number_of_calories lt 50)"
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Delete a calorie entry by ID
    Delete {
        /// Entry ID
        id: i64,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let json = cli.json;
    if let Err(e) = run(cli) {
        process::exit(report(&e, json));
    }
}

/// Print `err` for the user and pick the exit code: 2 for rejected requests, 1 otherwise.
fn report(err: &anyhow::Error, json: bool) -> i32 {
    let (message, code) = match err.downcast_ref::<kcal_core::Error>() {
        Some(core) if core.is_internal() => {
            tracing::error!(error = %core, "internal error");
            (error_message(core), 1)
        }
        Some(core) => (error_message(core), 2),
        None => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            (format!("{err:#}"), 1)
        }
    };

    if json {
        println!("{}", json_error(&message));
    } else {
        eprintln!("Error: {message}");
    }
    code
}

fn login(
    svc: &CalorieService,
    store: &dyn CredentialStore,
    user: Option<&str>,
    password: Option<&str>,
) -> Result<Session> {
    let (Some(user), Some(password)) = (user, password) else {
        return Err(kcal_core::Error::InvalidRequest(
            "This command requires --user and --password".to_string(),
        )
        .into());
    };
    Ok(svc.authenticate(store, user, password)?)
}

/// Provision the initial admin if missing. The default-password warning fires only then.
fn bootstrap_admin(
    svc: &CalorieService,
    store: &dyn CredentialStore,
    config: &Config,
) -> Result<Option<PublicUser>> {
    let created = svc.create_initial_admin(store, &config.admin_password)?;
    if let Some(admin) = &created {
        tracing::info!(username = %admin.username, db = %config.db_path.display(), "created initial admin");
        if config.admin_password_defaulted {
            tracing::warn!(
                username = %admin.username,
                "KCAL_ADMIN_PASSWORD not set, initial admin uses the default password"
            );
        }
    }
    Ok(created)
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let svc = CalorieService::new(&config.db_path, config.admin_username.as_str())?;
    let store = Argon2Credentials::default();

    bootstrap_admin(&svc, &store, &config)?;

    let json = cli.json;
    let session = || login(&svc, &store, cli.user.as_deref(), cli.password.as_deref());

    match cli.command {
        Commands::Register { username, target } => {
            let password = cli.password.as_deref().ok_or_else(|| {
                kcal_core::Error::InvalidRequest("register requires --password".to_string())
            })?;
            cmd_register(&svc, &store, &username, password, target, json)
        }
        Commands::User { command } => match command {
            UserCommands::Show { username } => {
                cmd_user_show(&svc, &session()?, username.as_deref(), json)
            }
            UserCommands::Delete { username } => {
                cmd_user_delete(&svc, &session()?, &username, json)
            }
            UserCommands::Update {
                username,
                new_password,
                role,
                target,
            } => cmd_user_update(
                &svc,
                &store,
                &session()?,
                &username,
                new_password.as_deref(),
                role,
                target,
                json,
            ),
        },
        Commands::Calorie { command } => match command {
            CalorieCommands::Add {
                text,
                calories,
                date,
                time,
                for_user,
            } => cmd_calorie_add(
                &svc,
                &session()?,
                &text,
                calories,
                date,
                time,
                for_user.as_deref(),
                json,
            ),
            CalorieCommands::Show { id } => cmd_calorie_show(&svc, &session()?, id, json),
            CalorieCommands::List { owner, filter } => cmd_calorie_list(
                &svc,
                &session()?,
                owner.as_deref(),
                filter.as_deref(),
                json,
            ),
            CalorieCommands::Delete { id } => cmd_calorie_delete(&svc, &session()?, id, json),
        },
    }
}
