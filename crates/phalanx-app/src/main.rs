//! Headless PHALANX runner.
//!
//! Usage: `phalanx-app [config.json] [seconds]`
//!
//! Deploys the demo skirmish, lets it run in real time for the given number
//! of seconds (10 by default) and prints a JSON summary of the final state.
//! Log verbosity follows `RUST_LOG`.

use std::error::Error;
use std::time::Duration;

use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use phalanx_app::core::enums::AgentState;
use phalanx_app::game_loop::spawn_game_loop;
use phalanx_app::scenario;
use phalanx_app::state::{AppState, GameLoopCommand};
use phalanx_sim::SimConfig;

const DEFAULT_RUN_SECS: f64 = 10.0;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => SimConfig::load(&path).map_err(|e| {
            error!(%path, %e, "could not load config");
            e
        })?,
        None => SimConfig::default(),
    };
    let run_secs = match args.next() {
        Some(raw) => raw.parse::<f64>()?,
        None => DEFAULT_RUN_SECS,
    };
    info!(seed = config.seed, run_secs, "starting");

    let state = AppState::new();
    let game = spawn_game_loop(
        config,
        |engine| {
            scenario::skirmish(engine);
        },
        state.latest_snapshot.clone(),
    )?;
    if let Ok(mut tx) = state.command_tx.lock() {
        *tx = Some(game.commands.clone());
    }

    std::thread::sleep(Duration::from_secs_f64(run_secs.max(0.0)));
    state.send(GameLoopCommand::Shutdown);
    game.handle.join().map_err(|_| "game loop thread panicked")?;

    let Some(snapshot) = state.snapshot() else {
        info!("no ticks completed");
        return Ok(());
    };
    let dead = snapshot
        .agents
        .iter()
        .filter(|a| a.state == AgentState::Dead)
        .count();
    let summary = json!({
        "tick": snapshot.time.tick,
        "elapsed_secs": snapshot.time.elapsed_secs,
        "agents": snapshot.agents.len(),
        "dead": dead,
        "squads": snapshot.squads,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
