//! Headless terminal client.
//!
//! Joins a room over WebSocket with the simulated runner engine and logs
//! every session event. Useful for poking at a running server and for
//! populating rooms during development:
//!
//! ```text
//! ROYALE_SERVER_URL=ws://127.0.0.1:8080/ws PLAYER_NAME=Ann headless-client
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use runner_royale::session::{
    HeadlessFactory, SessionConfig, SessionController, SessionEvent, SessionPhase, WsTransport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let url = std::env::var("ROYALE_SERVER_URL")
        .unwrap_or_else(|_| "ws://127.0.0.1:8080/ws".to_string());
    let player_name = std::env::var("PLAYER_NAME").unwrap_or_else(|_| "Headless".to_string());
    let room = std::env::var("ROYALE_ROOM").ok();
    let autostart = std::env::var("ROYALE_AUTOSTART").is_ok();

    info!(%url, %player_name, room = ?room, "Connecting");
    let (transport, transport_rx) = WsTransport::connect(&url).await?;

    let config = SessionConfig {
        player_name,
        room,
        ..SessionConfig::default()
    };
    let (controller, handle, mut events) = SessionController::new(
        Box::new(transport),
        transport_rx,
        Arc::new(HeadlessFactory),
        config,
    );

    // Log the event stream; with autostart, press start as soon as the
    // lobby fills up, and jump on a fixed cadence while playing.
    let jumper = handle;
    tokio::spawn(async move {
        let mut playing = false;
        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    info!(?event, "Session event");
                    match event {
                        SessionEvent::PhaseChanged(SessionPhase::Playing) => playing = true,
                        SessionEvent::PhaseChanged(phase) => {
                            playing = false;
                            if phase == SessionPhase::GameOver {
                                jumper.leave();
                            }
                        }
                        SessionEvent::RosterChanged(roster) if autostart && roster.len() >= 2 => {
                            jumper.start_game();
                        }
                        _ => {}
                    }
                }
                _ = tokio::time::sleep(Duration::from_millis(400)), if playing => {
                    jumper.jump();
                }
            }
        }
    });

    controller.run().await;
    info!("Session finished");
    Ok(())
}
