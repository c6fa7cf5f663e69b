//! Divine Ascension - Interactive Shell
//!
//! Loads the blessing catalog, starts the authority service and drives one
//! player and one religion through it from the terminal. Every command goes
//! through the same request/response path a networked client would use.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::runtime::Runtime;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use divine_ascension::blessings::{load_catalog, BlessingCatalog};
use divine_ascension::core::config::{config, set_config, ProgressionConfig};
use divine_ascension::core::error::Result;
use divine_ascension::core::types::{BlessingId, PlayerId, ProfileId, ReligionId, Scope};
use divine_ascension::progression::validator::Eligibility;
use divine_ascension::sync::{
    spawn_authority, AuthorityHandle, ClientSession, MemoryProfileStore, ProgressionAuthority,
    ProgressionEvent, UnlockAttempt,
};

/// Divine Ascension - favor, prestige and blessing progression
#[derive(Parser, Debug)]
#[command(name = "divine-ascension")]
#[command(about = "Drive a player and a religion through the blessing progression")]
struct Args {
    /// Blessing definitions file or directory (overrides the config)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Progression config TOML
    #[arg(long)]
    config: Option<PathBuf>,
}

struct Shell {
    handle: AuthorityHandle,
    catalog: Arc<BlessingCatalog>,
    player: ClientSession,
    religion: ClientSession,
    events: broadcast::Receiver<ProgressionEvent>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("divine_ascension=info")),
        )
        .init();

    let args = Args::parse();

    let mut loaded = match &args.config {
        Some(path) => ProgressionConfig::load(path)?,
        None => ProgressionConfig::default(),
    };
    if let Some(path) = args.catalog {
        loaded.catalog_path = path;
    }
    if set_config(loaded).is_err() {
        tracing::warn!("Progression config was already set");
    }
    let config = config();

    let catalog = Arc::new(load_catalog(&config.catalog_path)?);
    let authority = Arc::new(ProgressionAuthority::from_config(
        config,
        catalog.clone(),
        Arc::new(MemoryProfileStore::new()),
    ));
    let events = authority.subscribe();

    let rt = Runtime::new()?;
    let _guard = rt.enter();
    let (handle, _service) = spawn_authority(authority);

    let player: ProfileId = PlayerId::new().into();
    let religion: ProfileId = ReligionId::new().into();
    let mut shell = rt.block_on(async {
        Ok::<_, divine_ascension::core::error::ProgressionError>(Shell {
            player: ClientSession::connect(handle.clone(), catalog.clone(), player).await?,
            religion: ClientSession::connect(handle.clone(), catalog.clone(), religion).await?,
            handle,
            catalog,
            events,
        })
    })?;

    println!("\n=== DIVINE ASCENSION ===");
    println!("{} blessings loaded", shell.catalog.len());
    println!();
    println!("Commands:");
    println!("  favor <n>              - Award favor to the player");
    println!("  prestige <n>           - Award prestige to the religion");
    println!("  check <id>             - Show eligibility for a blessing");
    println!("  unlock <id>            - Unlock a player blessing");
    println!("  unlock-religion <id>   - Unlock a religion blessing");
    println!("  grant <id>             - Admin: force a blessing unlocked");
    println!("  revoke <id>            - Admin: force a blessing locked");
    println!("  list                   - List blessings with availability");
    println!("  status / s             - Show both profiles");
    println!("  quit / q               - Exit");
    println!();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "q" {
            break;
        }

        let (command, arg) = match input.split_once(' ') {
            Some((command, arg)) => (command, arg.trim()),
            None => (input, ""),
        };

        let result = rt.block_on(shell.run(command, arg));
        if let Err(e) = result {
            println!("Error: {}", e);
        }
        shell.drain_events();
    }

    println!("\nGoodbye!");
    Ok(())
}

impl Shell {
    async fn run(&mut self, command: &str, arg: &str) -> Result<()> {
        match command {
            "favor" | "prestige" => {
                let Ok(amount) = arg.parse::<u64>() else {
                    println!("Usage: {} <amount>", command);
                    return Ok(());
                };
                let session = if command == "favor" {
                    &mut self.player
                } else {
                    &mut self.religion
                };
                let award = self
                    .handle
                    .award_currency(session.mirror().profile_id(), amount)
                    .await?;
                session.receive_delta(&award.delta).await?;
                println!("Total {} (rank {})", award.delta.currency_total, award.delta.rank);
            }
            "check" => {
                let id = BlessingId::from(arg);
                let Some(session) = self.session_for(&id) else {
                    println!("Unknown blessing: {}", id);
                    return Ok(());
                };
                match session.preview(&id) {
                    Some(Eligibility::Eligible) => println!("{}: eligible", id),
                    Some(Eligibility::Ineligible(reason)) => println!("{}: {}", id, reason),
                    None => println!("{}: refreshing", id),
                }
            }
            "unlock" | "unlock-religion" => {
                let id = BlessingId::from(arg);
                let session = if command == "unlock" {
                    &mut self.player
                } else {
                    &mut self.religion
                };
                match session.unlock(id.clone()).await? {
                    UnlockAttempt::Committed => println!("Unlocked {}", id),
                    UnlockAttempt::AlreadyHeld => println!("{} is already unlocked", id),
                    UnlockAttempt::Rejected(reason) => println!("Cannot unlock {}: {}", id, reason),
                    UnlockAttempt::Blocked => println!("{} is already pending", id),
                    UnlockAttempt::Resynced => {
                        println!("Server disagreed about {}; state refreshed", id)
                    }
                }
            }
            "grant" | "revoke" => {
                let id = BlessingId::from(arg);
                let handle = self.handle.clone();
                let Some(session) = self.session_for_mut(&id) else {
                    println!("Unknown blessing: {}", id);
                    return Ok(());
                };
                let profile = session.mirror().profile_id();
                let delta = handle
                    .force_set_unlocked(profile, id.clone(), command == "grant")
                    .await?;
                session.receive_delta(&delta).await?;
                println!("{} {}", if command == "grant" { "Granted" } else { "Revoked" }, id);
            }
            "list" => self.list(),
            "status" | "s" => self.status(),
            _ => println!(
                "Unknown command. Available: favor, prestige, check, unlock, unlock-religion, grant, revoke, list, status, quit"
            ),
        }
        Ok(())
    }

    fn session_for(&self, id: &BlessingId) -> Option<&ClientSession> {
        match self.catalog.get(id)?.scope {
            Scope::Player => Some(&self.player),
            Scope::Religion => Some(&self.religion),
        }
    }

    fn session_for_mut(&mut self, id: &BlessingId) -> Option<&mut ClientSession> {
        match self.catalog.get(id)?.scope {
            Scope::Player => Some(&mut self.player),
            Scope::Religion => Some(&mut self.religion),
        }
    }

    fn list(&self) {
        for (scope, session) in [(Scope::Player, &self.player), (Scope::Religion, &self.religion)] {
            println!("{:?} blessings:", scope);
            for definition in self.catalog.list_by_scope(scope) {
                let marker = match session.preview(&definition.id) {
                    Some(Eligibility::Eligible) => "+".to_string(),
                    Some(Eligibility::Ineligible(reason)) if reason.is_already_unlocked() => {
                        "*".to_string()
                    }
                    Some(Eligibility::Ineligible(reason)) => format!("- {}", reason),
                    None => "?".to_string(),
                };
                println!("  {:<28} {:<24} {}", definition.id, definition.name(), marker);
            }
        }
    }

    fn status(&self) {
        for session in [&self.player, &self.religion] {
            let Some(profile) = session.mirror().profile() else {
                println!("{}: refreshing", session.mirror().profile_id());
                continue;
            };
            let table = config().tracker();
            let rank_name = table
                .table(profile.currency())
                .name(profile.rank())
                .unwrap_or("?")
                .to_string();
            let progress = table.progress(profile.currency(), profile.currency_total());

            println!("{}", profile.id());
            println!(
                "  {} {} - rank {} ({})",
                profile.currency(),
                profile.currency_total(),
                profile.rank(),
                rank_name
            );
            match progress.next_threshold {
                Some(next) => println!("  Next rank at {} ({:.0}%)", next, progress.fraction * 100.0),
                None => println!("  Highest rank reached"),
            }
            let mut unlocked: Vec<_> = profile.unlocked().iter().map(|id| id.as_str()).collect();
            unlocked.sort_unstable();
            println!("  Unlocked: {:?}", unlocked);
            let mut committed: Vec<_> =
                profile.committed_branches().iter().map(|b| b.as_str()).collect();
            committed.sort_unstable();
            let mut locked: Vec<_> = profile.locked_branches().iter().map(|b| b.as_str()).collect();
            locked.sort_unstable();
            println!("  Branches: committed {:?}, locked {:?}", committed, locked);
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            if let ProgressionEvent::RankUp(rank_up) = event {
                println!(
                    "*** {} reached {} (rank {}) ***",
                    rank_up.profile, rank_up.new_rank_name, rank_up.new_rank
                );
            }
        }
    }
}
