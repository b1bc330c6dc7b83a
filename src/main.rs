use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use sumo_battle_core::config::{ClientConfig, LaunchTransport};
use sumo_battle_core::game::match_loop::{MatchSnapshot, PointerInput};
use sumo_battle_core::game::systems::physics::ArcadeWorld;
use sumo_battle_core::lobby::member::RoomMember;
use sumo_battle_core::lobby::room::{RoomState, WaitingRoom};
use sumo_battle_core::metrics::SessionMetrics;
use sumo_battle_core::net::connection::RoomConnection;
use sumo_battle_core::net::inbound::InboundBuffer;
use sumo_battle_core::net::sync::{LaunchSink, OfflineSink};
use sumo_battle_core::util::vec2::Vec2;

#[cfg(feature = "room_api")]
use sumo_battle_core::net::room_api::{HttpLaunchSink, RoomApiClient};

/// One line of stdin
#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Pointer(PointerInput),
    Start,
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    match line {
        "" => None,
        "cancel" => Some(Command::Pointer(PointerInput::Cancel)),
        "start" => Some(Command::Start),
        _ => {
            let mut parts = line.split_whitespace();
            let x = parts.next()?.parse().ok()?;
            let y = parts.next()?.parse().ok()?;
            if parts.next().is_some() {
                return None;
            }
            Some(Command::Pointer(PointerInput::Press(Vec2::new(x, y))))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Sumo Battle client v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env()?;
    config.validate()?;
    info!(
        room_id = %config.room_id,
        user_id = %config.user_id,
        ws_url = %config.ws_url,
        tick_rate = config.tick_rate,
        "Configuration loaded"
    );

    let metrics = Arc::new(SessionMetrics::new());
    let spawn = config
        .spawn
        .unwrap_or_else(|| config.field.random_spawn_point(&mut rand::thread_rng()));
    let local = RoomMember::new(config.user_id.clone(), config.icon_url.clone(), config.attributes, spawn);

    let inbound = InboundBuffer::new(config.inbound_capacity);
    let url = local.connect_params(config.room_id.clone()).url(&config.ws_url)?;
    let connection = RoomConnection::connect(&url, inbound.sender(), metrics.clone()).await?;
    info!(session_id = %connection.session_id(), "Connected to room channel");

    let mut room = WaitingRoom::new(config.room_id.clone(), local, inbound, metrics.clone()).with_connection(connection);

    #[cfg(feature = "room_api")]
    let api = match &config.api_url {
        Some(base) => Some(Arc::new(RoomApiClient::new(base.clone(), config.room_id.clone())?)),
        None => None,
    };

    #[cfg(feature = "room_api")]
    if let Some(api) = &api {
        match api.fetch_members().await {
            Ok(snapshot) => {
                let added = room.seed(snapshot);
                info!(added, members = room.member_count(), "Roster loaded");
            }
            Err(e) => warn!(error = %e, "Could not load roster"),
        }
    }

    // Stdin: pointer presses go to the match, `start` asks the backend to begin
    let (pointer_tx, pointer_rx) = mpsc::unbounded_channel();
    let (start_tx, mut start_rx) = mpsc::unbounded_channel::<()>();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_command(&line) {
                Some(Command::Pointer(input)) => {
                    if pointer_tx.send(input).is_err() {
                        break;
                    }
                }
                Some(Command::Start) => {
                    let _ = start_tx.send(());
                }
                None => debug!(line = %line, "Ignoring input"),
            }
        }
    });

    #[cfg(feature = "room_api")]
    let start_api = api.clone();
    tokio::spawn(async move {
        while start_rx.recv().await.is_some() {
            #[cfg(feature = "room_api")]
            if let Some(api) = &start_api {
                if let Err(e) = api.start_match().await {
                    warn!(error = %e, "Start request failed");
                }
                continue;
            }
            warn!("No room backend configured, cannot request start");
        }
    });

    info!(members = room.member_count(), "Waiting for the match to start");
    match room.wait_for_start(shutdown_signal()).await {
        RoomState::Starting => {}
        state => {
            info!(?state, "Left the room before the match started");
            metrics.log_summary();
            return Ok(());
        }
    }

    let sink: Arc<dyn LaunchSink> = match config.launch_transport {
        LaunchTransport::Socket => match room.room_sender() {
            Some(sender) => Arc::new(sender),
            None => Arc::new(OfflineSink),
        },
        #[cfg(feature = "room_api")]
        LaunchTransport::Http => match &api {
            Some(api) => Arc::new(HttpLaunchSink::new(api.clone(), tokio::runtime::Handle::current())),
            None => anyhow::bail!("http launch transport needs ROOM_API_URL"),
        },
        #[cfg(not(feature = "room_api"))]
        LaunchTransport::Http => anyhow::bail!("http launch transport needs the room_api feature"),
    };

    let game = room.into_match(ArcadeWorld::new(), config.field, config.tick_rate, sink);
    info!(players = game.store().player_count(), "Match started");

    let (snapshot_tx, mut snapshot_rx) = watch::channel(MatchSnapshot::default());
    tokio::spawn(async move {
        let mut alive = usize::MAX;
        while snapshot_rx.changed().await.is_ok() {
            let now = snapshot_rx.borrow_and_update().players.iter().filter(|p| p.is_alive).count();
            if now != alive {
                info!(alive = now, "Players on the field");
                alive = now;
            }
        }
    });

    let result = game.run(pointer_rx, snapshot_tx, shutdown_signal()).await;

    println!("Match over ({:?}) after {:.1}s", result.reason, result.duration_secs);
    for ranking in &result.rankings {
        println!(
            "{:>2}. {}{}{}",
            ranking.rank,
            ranking.player_id,
            if ranking.survived { "" } else { " (out)" },
            if ranking.is_local { " <- you" } else { "" },
        );
    }
    if result.is_local_winner() {
        println!("You won!");
    }

    metrics.log_summary();
    Ok(())
}
