//! Drive one room end to end: create, add an AI opponent, play a few
//! moves, print the final snapshot.
//!
//! Run with: cargo run -p chessroom-server --example run_room

use std::sync::Arc;
use std::time::Duration;

use chessroom_server::{
    CreateRoomRequest, RoomConfig, RoomEvent, RoomManager, StaticAdvisor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // A scripted advisor stands in for the remote text-generation service.
    let advisor = Arc::new(StaticAdvisor::new(
        r#"{"bestMove": "e7-e5", "hint": "contest the center"}"#,
    ));
    let manager = RoomManager::new(advisor, RoomConfig::from_env());

    let snapshot = manager
        .create_room(CreateRoomRequest {
            name: "Demo Room".to_string(),
            host_id: "demo-host".to_string(),
            host_name: "Demo Host".to_string(),
            rules: None,
            allow_spectators: true,
            allow_ai: true,
        })
        .await?;
    let room = manager.get(&snapshot.id).await?;

    room.add_ai_opponent(2).await?;
    room.start().await?;

    let (_, mut events) = room.subscribe().await?;
    let outcome = room.make_move("demo-host", "e2-e4").await?;
    println!("played {} -> {}", outcome.san, outcome.fen);

    // Wait for the AI reply to land.
    tokio::time::sleep(Duration::from_millis(200)).await;
    while let Ok(event) = events.try_recv() {
        if let RoomEvent::Suggestion(suggestion) = event {
            println!("advisor suggested {}", suggestion.best_move);
        }
    }

    room.chat("demo-host", "good luck!").await?;

    let snapshot = room.snapshot().await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
