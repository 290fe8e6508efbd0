//! Skirmish - NPC vs NPC demo
//!
//! Builds an in-memory world, forms a lobby of NPCs on two teams, starts the
//! fight and lets the NPC scheduler play it out. Every broadcast is printed
//! to stdout as one JSON line.

use clap::Parser;
use skirmish::combat::armor::{ArmorProfile, ShieldProfile};
use skirmish::combat::stats::{Attributes, CharacterSheet};
use skirmish::combat::weapons::WeaponProfile;
use skirmish::core::types::{CharacterId, Position};
use skirmish::core::SkirmishConfig;
use skirmish::lobby::LobbyService;
use skirmish::ports::{MemoryRetainers, MemoryStore, RecordingTransport};
use skirmish::session::CombatService;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::broadcast::error::RecvError;

const REGION: &str = "greywater";

/// Run one NPC skirmish and print the event stream
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(about = "Run an NPC vs NPC skirmish and print every event as JSON")]
struct Args {
    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Fighters on each team
    #[arg(long, default_value_t = 3)]
    per_team: u64,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop watching after this many rounds
    #[arg(long, default_value_t = 30)]
    max_rounds: u64,

    /// Skip the NPC thinking delay
    #[arg(long)]
    instant: bool,
}

fn loadout(index: u64) -> (WeaponProfile, ArmorProfile, Option<ShieldProfile>) {
    match index % 5 {
        0 => (WeaponProfile::sword(), ArmorProfile::mail(), Some(ShieldProfile::heater())),
        1 => (WeaponProfile::dagger(), ArmorProfile::leather(), None),
        2 => (WeaponProfile::greatsword(), ArmorProfile::plate(), None),
        3 => (WeaponProfile::mace(), ArmorProfile::mail(), Some(ShieldProfile::buckler())),
        _ => (WeaponProfile::spear(), ArmorProfile::leather(), None),
    }
}

async fn populate(store: &MemoryStore, per_team: u64) -> Vec<CharacterId> {
    let mut ids = Vec::new();
    for i in 0..per_team * 2 {
        let id = CharacterId(i + 1);
        let name = if i < per_team {
            format!("Warden {}", i + 1)
        } else {
            format!("Raider {}", i + 1 - per_team)
        };
        let (weapon, armor, shield) = loadout(i);
        let attributes = Attributes {
            prowess: 3 + (i % 3) as i32,
            fortitude: 3 + (i % 2) as i32,
            cunning: 2 + (i % 4) as i32,
        };
        let sheet = CharacterSheet::new(id, name, attributes, weapon, armor, shield).npc();
        let position = Position::new(REGION, i as f32, 0.0, 0.0);
        store.insert(sheet, Some(position)).await;
        ids.push(id);
    }
    ids
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => SkirmishConfig::load(path)?,
        None => SkirmishConfig::default(),
    };
    if args.instant {
        config.npc.min_delay_ms = 0;
        config.npc.max_delay_ms = 0;
    }
    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!("Skirmish seed {}", seed);

    let store = Arc::new(MemoryStore::new());
    let retainers = Arc::new(MemoryRetainers::new());
    let transport = Arc::new(RecordingTransport::new());
    let mut feed = transport.subscribe();

    let combat = CombatService::new(
        config.clone(),
        store.clone(),
        retainers.clone(),
        transport.clone(),
        seed,
    );
    let lobbies = LobbyService::new(
        config.lobby.clone(),
        store.clone(),
        retainers,
        transport,
        combat,
    );

    let per_team = args.per_team.max(1);
    let ids = populate(&store, per_team).await;
    let host = ids[0];
    let lobby = lobbies.create_lobby(host, None).await?;
    lobbies.set_ready(host, true).await?;
    for (i, id) in ids.iter().enumerate().skip(1) {
        let team = if (i as u64) < per_team { 1 } else { 2 };
        lobbies.add_npc(lobby, *id, Some(team)).await?;
    }
    let session = lobbies.start_lobby(host).await?;
    tracing::info!("Session {} under way", session);

    loop {
        match feed.recv().await {
            Ok(emitted) => {
                println!("{}", serde_json::to_string(&emitted)?);
                if emitted.event == "wound-assessment" {
                    break;
                }
                let round = emitted.payload["round"].as_u64().unwrap_or(0);
                if emitted.event == "round-start" && round > args.max_rounds {
                    tracing::warn!("Stopping after {} rounds", args.max_rounds);
                    break;
                }
            }
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!("Event feed lagged, {} events not printed", missed);
            }
            Err(RecvError::Closed) => break,
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("skirmish=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let rt = Runtime::new()?;
    rt.block_on(run(args))
}
