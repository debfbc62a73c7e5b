//! Headless demo: a small town with a few NPCs, streaming JSON frames to
//! stdout for about ten seconds of simulated time.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use runtime::{GameEvent, TownRuntime, TownRuntimeConfig};
use town_core::{
    Behavior, GridMap, NamePlacement, NpcId, NpcSpec, PlayerState, Point, Tile,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = TownRuntime::start(TownRuntimeConfig::default());
    let handle = runtime.handle();
    let mut events = runtime.subscribe_events();

    let mut map = GridMap::open(20, 15);
    for y in 3..8 {
        map.block(Tile::new(10, y));
    }
    handle.set_map(Arc::new(map)).await?;
    handle
        .update_player(PlayerState::new(Point::new(10.0, 10.0)))
        .await?;

    handle
        .add_npc(
            NpcSpec::new("mayor", Point::new(2.0, 2.0))
                .with_display_name("Mayor Holt", NamePlacement::Above),
        )
        .await?;
    handle
        .add_npc(NpcSpec::new("watch", Point::new(5.0, 5.0)).with_behavior(Behavior::Patrol))
        .await?;
    handle
        .add_npc(NpcSpec::new("shadow", Point::new(15.0, 3.0)).with_behavior(Behavior::Follow))
        .await?;

    handle
        .show_speech(NpcId::from("mayor"), "Welcome to town!", 3_000)
        .await?;
    // Walks around the blocked column in the middle of the map.
    handle.pathfind_to(NpcId::from("mayor"), 18.0, 12.0).await?;
    info!("town running; frames follow on stdout");

    while let Ok(event) = events.recv().await {
        let GameEvent::Frame { tick, npcs, player } = event else {
            continue;
        };
        // Roughly one printed frame per simulated second.
        if tick % 60 == 0 {
            println!(
                "{}",
                serde_json::to_string(&GameEvent::Frame { tick, npcs, player })?
            );
        }
        if tick >= 600 {
            break;
        }
    }

    // The worker exits once every handle is gone.
    drop(handle);
    runtime.shutdown().await?;
    Ok(())
}
