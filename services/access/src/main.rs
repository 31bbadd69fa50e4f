use std::sync::Arc;

use access::cards::{CardFilter, CardView};
use access::door::door_error_message;
use access::models::{AccessMethod, AccessRecord, Card, UpdateCardRequest};
use access::notify::{Notice, NoticeLevel, Notifier};
use access::{AppConfig, AppState, Confirm, DoorOutcome, HistoryFilter};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use auth::models::{LoginCredentials, NewUser};
use auth::service::{login_error_message, register_error_message};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "access", version, about = "Access-control client")]
struct Cli {
    /// Backend base URL, overriding the configuration
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and keep the session
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// End the session and clear cached data
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Open the door remotely
    Open {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show access history, newest first
    History {
        /// Only records at or after this RFC 3339 time
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// Only records at or before this RFC 3339 time
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        /// RFID or REMOTE
        #[arg(long = "type")]
        method: Option<AccessMethod>,
        #[arg(long)]
        search: Option<String>,
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Bypass the local cache
        #[arg(long)]
        refresh: bool,
    },
    /// Manage RFID cards
    Cards {
        #[command(subcommand)]
        command: CardsCommand,
    },
    /// Create a user account (administrators only)
    Register {
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
}

#[derive(Subcommand)]
enum CardsCommand {
    /// List active cards
    List {
        #[arg(long)]
        search: Option<String>,
        /// Load every page
        #[arg(long)]
        all: bool,
        #[arg(long)]
        refresh: bool,
    },
    /// List cards in the trash
    Trash,
    /// Enroll a card by typing its UID
    Add { uid: String, name: String },
    /// Enroll a card by scanning an NFC tag
    Scan { name: String },
    /// Rename a card
    Rename { id: i64, name: String },
    /// Move a card to the trash
    Delete { id: i64 },
    /// Restore a card from the trash
    Restore { id: i64 },
    /// Delete a card for good
    Purge {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
}

/// Prints notices to the terminal
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => println!("✔ {}", notice.message),
            NoticeLevel::Warning => eprintln!("! {}", notice.message),
            NoticeLevel::Danger => eprintln!("✘ {}", notice.message),
        }
    }
}

/// Asks on the terminal unless pre-approved
struct PromptConfirm {
    assume_yes: bool,
}

#[async_trait]
impl Confirm for PromptConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        let mut stdout = tokio::io::stdout();
        if stdout
            .write_all(format!("{} [y/N] ", prompt).as_bytes())
            .await
            .is_err()
        {
            return false;
        }
        let _ = stdout.flush().await;

        let mut line = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
            Ok(_) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    if let Some(url) = cli.api_url.clone() {
        config.api_base_url = url;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let state = AppState::from_config(config, Arc::new(ConsoleNotifier))?;
    let result = run(&state, cli.command).await;
    state.shutdown();

    if let Err(e) = &result {
        error!("Command failed: {}", e);
    }
    result
}

async fn run(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::Login { username, password } => {
            state
                .auth
                .login(&LoginCredentials::new(username, password))
                .await
                .map_err(|e| anyhow!(login_error_message(&e)))?;
            let name = state.session.username().unwrap_or_default();
            state
                .notifier
                .notify(Notice::success(format!("Welcome, {}", name)));
        }
        Command::Logout => {
            state.auth.logout()?;
            state.notifier.notify(Notice::success("Signed out"));
        }
        Command::Whoami => {
            state.require_session()?;
            let claims = state.session.claims().unwrap_or_default();
            println!(
                "{} ({})",
                claims.username.as_deref().unwrap_or("unknown"),
                claims.role()
            );
            if let Some(expires) = claims.expires_at() {
                println!("Session expires {}", expires.with_timezone(&Local));
            }
        }
        Command::Open { yes } => {
            state.require_session()?;
            let stats = state.door.stats();
            if let Some(last) = stats.last_opened_at {
                info!(
                    "Last opened {} ({} opens)",
                    last.with_timezone(&Local),
                    stats.open_count
                );
            }

            match state.door.open(&PromptConfirm { assume_yes: yes }).await {
                Ok(DoorOutcome::Opened { message, stats }) => {
                    state.notifier.notify(Notice::success(message));
                    println!("Opened {} times from this device", stats.open_count);
                }
                Ok(DoorOutcome::Cancelled) => println!("Cancelled"),
                Err(e) => {
                    let message = door_error_message(&e);
                    state.notifier.notify(Notice::danger(&message));
                    return Err(anyhow!(message));
                }
            }
        }
        Command::History {
            from,
            to,
            method,
            search,
            pages,
            refresh,
        } => {
            state.require_session()?;
            let controller = state.history_controller();
            let filter = HistoryFilter {
                start_date: from,
                end_date: to,
                method,
                search,
            };

            if filter.is_empty() {
                controller.load(refresh).await?;
            } else {
                controller.set_filter(filter).await?;
            }
            for _ in 1..pages {
                if !controller.load_more().await? {
                    break;
                }
            }

            let snapshot = controller.snapshot().await;
            for record in &snapshot.items {
                print_record(record);
            }
            println!(
                "{} of {} records (page {}/{})",
                snapshot.items.len(),
                snapshot.total,
                snapshot.page,
                snapshot.total_pages
            );
        }
        Command::Cards { command } => {
            state.require_session()?;
            run_cards(state, command).await?;
        }
        Command::Register {
            username,
            password,
            confirm,
        } => {
            state.require_session()?;
            let user = state
                .auth
                .register(&NewUser {
                    username,
                    password,
                    confirm_password: confirm,
                })
                .await
                .map_err(|e| anyhow!(register_error_message(&e)))?;
            state
                .notifier
                .notify(Notice::success(format!("User {} created", user.username)));
        }
    }
    Ok(())
}

async fn run_cards(state: &AppState, command: CardsCommand) -> Result<()> {
    let controller = state.cards_controller();

    match command {
        CardsCommand::List {
            search,
            all,
            refresh,
        } => {
            let list = controller.list(CardView::Active);
            match search {
                Some(term) => list.set_filter(CardFilter::search(term)).await?,
                None => list.load(refresh).await?,
            }
            while all && list.load_more().await? {}
            print_cards(&list.snapshot().await.items);
        }
        CardsCommand::Trash => {
            controller.switch_view(CardView::Trash).await?;
            print_cards(&controller.current().await.snapshot().await.items);
        }
        CardsCommand::Add { uid, name } => {
            let card = state
                .enrollment
                .manual(&uid, &name)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            state
                .notifier
                .notify(Notice::success(format!("Card {} registered", card.uid)));
        }
        CardsCommand::Scan { name } => {
            println!("Hold the card near the reader...");
            let draft = match state.enrollment.scan().await {
                Ok(draft) => draft,
                Err(e) => {
                    let message = e.user_message();
                    state.notifier.notify(Notice::warning(&message));
                    return Err(anyhow!(message));
                }
            };
            let card = state
                .enrollment
                .submit(&draft, &name)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            state
                .notifier
                .notify(Notice::success(format!("Card {} registered", card.uid)));
        }
        CardsCommand::Rename { id, name } => {
            let card = state
                .cards
                .update(
                    id,
                    &UpdateCardRequest {
                        name: Some(name),
                        ..UpdateCardRequest::default()
                    },
                )
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            state
                .notifier
                .notify(Notice::success(format!("Card renamed to {}", card.name)));
        }
        CardsCommand::Delete { id } => controller.soft_delete(id).await?,
        CardsCommand::Restore { id } => controller.restore(id).await?,
        CardsCommand::Purge { id, yes } => {
            let confirm = PromptConfirm { assume_yes: yes };
            if !confirm
                .confirm("Permanently delete this card? This cannot be undone")
                .await
            {
                println!("Cancelled");
                return Ok(());
            }
            controller.purge(id).await?;
        }
    }
    Ok(())
}

fn print_record(record: &AccessRecord) {
    let who = record
        .card_name
        .as_deref()
        .or(record.card_uid.as_deref())
        .unwrap_or("-");
    println!(
        "{}  {:<6}  {:<8}  {}",
        record.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        record.method,
        if record.authorized { "granted" } else { "denied" },
        who
    );
}

fn print_cards(cards: &[Card]) {
    if cards.is_empty() {
        println!("No cards");
        return;
    }
    for card in cards {
        println!(
            "{:>5}  {:<20}  {:<24}  {}",
            card.id,
            card.uid,
            card.name,
            if card.enabled { "enabled" } else { "disabled" }
        );
    }
}
