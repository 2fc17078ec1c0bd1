//! Melodex console - command-line entry point
//!
//! Drives one screen controller per invocation: load the requested page,
//! optionally act on a row, then print the table and any notices.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use melodex_common::config::{ClientConfig, ConfigOverrides};
use melodex_common::{NoticeLevel, ViewEvent};
use tokio::sync::broadcast;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use melodex_console::controller::{ListController, LoadOutcome};
use melodex_console::screens::{self, Portal};
use melodex_console::{AutoConfirm, Confirm, Console, Criteria, HttpSource};

/// Command-line arguments for melodex
#[derive(Parser, Debug)]
#[command(name = "melodex")]
#[command(about = "Management console for the Melodex music catalog")]
#[command(version)]
struct Args {
    /// Backend base URL
    #[arg(long, env = "MELODEX_BASE_URL")]
    base_url: Option<String>,

    /// Bearer token
    #[arg(long, env = "MELODEX_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Config file (TOML)
    #[arg(long, env = "MELODEX_CONFIG")]
    config: Option<PathBuf>,

    /// Which portal's screens to use
    #[arg(long, value_enum, default_value = "admin")]
    portal: PortalArg,

    /// Answer yes to confirmation prompts
    #[arg(short, long)]
    yes: bool,

    /// Page to load before acting
    #[arg(long, default_value = "1")]
    page: u64,

    /// Filter criterion, repeatable
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_pair)]
    filters: Vec<(String, String)>,

    /// Parent tag or category id for scoped screens
    #[arg(long)]
    scope: Option<String>,

    /// Screen name (categories, singers, songs, users, tag-songs, category-songs, catalog)
    screen: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PortalArg {
    Admin,
    User,
}

impl From<PortalArg> for Portal {
    fn from(arg: PortalArg) -> Self {
        match arg {
            PortalArg::Admin => Portal::Admin,
            PortalArg::User => Portal::User,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show one page of records
    List,
    /// Show one record's editable fields
    Show { id: i64 },
    /// Delete one record
    Delete { id: i64 },
    /// Delete several records in one request
    DeleteBatch {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Approve a pending song
    Approve { id: i64 },
    /// Reject a pending song
    Reject { id: i64 },
    /// Print the playable URL of a song
    Play { id: i64 },
    /// Upload an audio file
    Upload { file: PathBuf },
    /// Create a record, or edit one with --id
    Save {
        #[arg(long)]
        id: Option<i64>,
        #[arg(value_parser = parse_pair, value_name = "KEY=VALUE")]
        values: Vec<(String, String)>,
    },
}

fn parse_pair(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", raw))
}

/// Confirmation by asking on the terminal
struct PromptConfirm;

impl Confirm for PromptConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{} [y/N] ", prompt);
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ClientConfig::load(&ConfigOverrides {
        base_url: args.base_url.clone(),
        token: args.token.clone(),
        config_file: args.config.clone(),
    })
    .context("Failed to load configuration")?;

    // Logs go to stderr so stdout carries only the table
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let portal = Portal::from(args.portal);
    let Some(screen) = screens::find(&args.screen, portal) else {
        bail!(
            "Unknown {} screen {:?}; available: {}",
            portal.name(),
            args.screen,
            screens::names(portal).join(", ")
        );
    };
    info!(screen = screen.name, base_url = %config.base_url, "Starting");

    let confirm: Arc<dyn Confirm> = if args.yes {
        Arc::new(AutoConfirm(true))
    } else {
        Arc::new(PromptConfirm)
    };
    let console = Console::new(&config, confirm).context("Failed to create HTTP client")?;
    let mut notices = console.events().subscribe();
    let controller = console.open(screen, args.scope.clone());

    let ok = run(&controller, &args).await;

    print_notices(&mut notices);
    print!("{}", controller.render_text().await);

    if !ok {
        bail!("{} {:?} failed", screen.name, args.command);
    }
    Ok(())
}

/// Load the requested page, then run the command against it
async fn run(controller: &ListController<HttpSource>, args: &Args) -> bool {
    if !args.filters.is_empty() {
        let criteria = args
            .filters
            .iter()
            .fold(Criteria::new(), |c, (k, v)| c.with(k.clone(), v.clone()));
        controller.seed_criteria(criteria).await;
    }

    match controller.refresh().await {
        LoadOutcome::Applied { .. } => {}
        outcome => {
            debug!(?outcome, "Initial load did not apply");
            return false;
        }
    }
    if args.page > 1 && !controller.goto_page(args.page).await {
        eprintln!("Page {} is out of range", args.page);
        return false;
    }

    match &args.command {
        Command::List => true,
        Command::Show { id } => match controller.edit(*id).await {
            Some(form) => {
                println!("{} #{}", controller.screen().title, id);
                for (name, value) in form.values() {
                    println!("  {}: {}", name, value);
                }
                println!();
                true
            }
            None => false,
        },
        Command::Delete { id } => controller.delete(*id).await,
        Command::DeleteBatch { ids } => {
            for id in ids {
                if !controller.select(*id).await {
                    eprintln!("Record {} is not on this page", id);
                    return false;
                }
            }
            controller.batch_delete().await
        }
        Command::Approve { id } => controller.approve(*id).await,
        Command::Reject { id } => controller.reject(*id).await,
        Command::Play { id } => match controller.play(*id).await {
            Some(url) => {
                println!("{}", url);
                true
            }
            None => false,
        },
        Command::Upload { file } => controller.upload(file).await,
        Command::Save { id, values } => {
            let form = match id {
                Some(id) => controller.edit(*id).await,
                None => Some(controller.new_form()),
            };
            let Some(mut form) = form else {
                eprintln!("Record {} is not on this page", id.unwrap_or_default());
                return false;
            };
            for (key, value) in values {
                form.set(key.clone(), value.clone());
            }
            controller.save(&form).await
        }
    }
}

fn print_notices(notices: &mut broadcast::Receiver<ViewEvent>) {
    loop {
        match notices.try_recv() {
            Ok(ViewEvent::Notice { level, message, .. }) => {
                let tag = match level {
                    NoticeLevel::Info => "info",
                    NoticeLevel::Success => "ok",
                    NoticeLevel::Warning => "warning",
                    NoticeLevel::Error => "error",
                };
                eprintln!("[{}] {}", tag, message);
            }
            Ok(ViewEvent::AuthRequired { .. }) => {
                eprintln!("[auth] Sign in again and pass a new --token");
            }
            Ok(_) => {}
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                debug!(skipped, "Notice receiver lagged");
            }
            Err(_) => break,
        }
    }
}
