//! Mole Demo Application
//!
//! Plays one table end to end on the in-memory store:
//! - A host opens a session and five guests join
//! - The host picks two spies and a location, then deals
//! - Every client's projection is printed
//! - The host follows the session while a new round resets it
//! - One reaper sweep runs with the configured TTL

use std::sync::Arc;

use mole_core::SessionId;
use mole_game::{ReaperConfig, RoleView, RosterView, SessionManager, StaleSessionReaper, WatchEvent};
use mole_store::MemoryStore;

const GUESTS: [&str; 5] = ["Ala", "Bartek", "Celina", "Darek", "Ewa"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    println!("=== Mole Demo ===");
    println!();

    let store = Arc::new(MemoryStore::new());

    let host = SessionManager::new(Arc::clone(&store));
    let session_id = host.create_game("Zofia").await?;
    println!("Session {session_id} opened by {}", host.player_id());

    let mut guests = Vec::with_capacity(GUESTS.len());
    for name in GUESTS {
        let guest = SessionManager::new(Arc::clone(&store));
        guest.join_game(&session_id, name).await?;
        guests.push(guest);
    }

    let spies = host.set_spy_count(&session_id, 2).await?;
    host.set_location(&session_id, "Submarine").await?;
    println!("Host set {spies} spies and a secret location");
    println!();

    host.start_game(&session_id).await?;
    let session = host.fetch_session(&session_id).await?;

    println!("--- Round 1 ---");
    for client in std::iter::once(&host).chain(&guests) {
        let view = RosterView::project(&session, client.player_id(), client.config());
        print_view(&view, client.player_id().as_str());
    }
    println!();

    let mut watch = host.watch(&session_id)?;
    // Current state first
    let _ = watch.next().await;
    host.new_round(&session_id).await?;
    if let Some(Ok(WatchEvent::Updated(view))) = watch.next().await {
        println!("After new round: status {:?}, location {:?}", view.status, view.location);
    }
    drop(watch);
    println!();

    let config = ReaperConfig::from_env()?;
    println!("Sweeping sessions older than {:?}", config.ttl);
    let report = StaleSessionReaper::new(Arc::clone(&store), config).sweep().await?;
    println!(
        "Scanned {}, deleted {}, failed {}",
        report.scanned,
        report.deleted.len(),
        report.failed
    );
    still_there(&host, &session_id).await;

    Ok(())
}

fn print_view(view: &RosterView, player: &str) {
    let me = view
        .players
        .iter()
        .find(|entry| entry.is_self)
        .map_or("?", |entry| entry.name.as_str());
    let role = match view.role {
        RoleView::Spy => "SPY",
        RoleView::Player => "player",
        RoleView::Pending => "waiting for a role",
        RoleView::NotJoined => "not seated",
    };
    let location = view.location.as_deref().unwrap_or("???");
    let host = if view.is_host { " (host)" } else { "" };
    println!("  {me:<8} [{player}]{host}: {role:<7} location: {location}");
}

async fn still_there(host: &SessionManager<MemoryStore>, session_id: &SessionId) {
    match host.fetch_session(session_id).await {
        Ok(session) => println!("Session {session_id} kept with {} players", session.players.len()),
        Err(err) => println!("Session {session_id}: {err}"),
    }
}
