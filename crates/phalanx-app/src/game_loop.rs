//! Game loop thread: runs the simulation engine at `TICK_RATE` and stores
//! the latest snapshot.
//!
//! The engine is created inside this thread so it never has to cross a
//! thread boundary. Orders arrive via an `mpsc` channel.

use std::io;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use phalanx_core::constants::TICK_RATE;
use phalanx_core::state::SimSnapshot;
use phalanx_sim::{SimConfig, SimulationEngine};

use crate::state::GameLoopCommand;

/// Nominal wall-clock duration of one tick.
pub const TICK_DURATION: Duration = Duration::from_nanos(1_000_000_000 / TICK_RATE as u64);

/// A running loop: the order channel and the thread to join on shutdown.
pub struct GameLoop {
    pub commands: mpsc::Sender<GameLoopCommand>,
    pub handle: JoinHandle<()>,
}

/// Spawn the loop on a named thread. `setup` runs once on the fresh engine
/// before the first tick, e.g. to deploy a scenario.
pub fn spawn_game_loop<F>(
    config: SimConfig,
    setup: F,
    latest_snapshot: Arc<Mutex<Option<SimSnapshot>>>,
) -> io::Result<GameLoop>
where
    F: FnOnce(&mut SimulationEngine) + Send + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel::<GameLoopCommand>();

    let handle = std::thread::Builder::new()
        .name("phalanx-game-loop".into())
        .spawn(move || {
            let mut engine = SimulationEngine::new(config);
            setup(&mut engine);
            run_game_loop(&mut engine, &cmd_rx, &latest_snapshot);
        })?;

    Ok(GameLoop {
        commands: cmd_tx,
        handle,
    })
}

/// Drain pending messages into the engine. Returns false when the loop
/// should stop.
fn drain_commands(engine: &mut SimulationEngine, cmd_rx: &mpsc::Receiver<GameLoopCommand>) -> bool {
    loop {
        match cmd_rx.try_recv() {
            Ok(GameLoopCommand::Command(cmd)) => engine.queue_command(cmd),
            Ok(GameLoopCommand::Shutdown) => return false,
            Err(mpsc::TryRecvError::Empty) => return true,
            Err(mpsc::TryRecvError::Disconnected) => return false,
        }
    }
}

/// Runs until Shutdown or channel disconnect.
fn run_game_loop(
    engine: &mut SimulationEngine,
    cmd_rx: &mpsc::Receiver<GameLoopCommand>,
    latest_snapshot: &Mutex<Option<SimSnapshot>>,
) {
    let mut next_tick_time = Instant::now();

    while drain_commands(engine, cmd_rx) {
        let snapshot = engine.tick();
        if !snapshot.events.is_empty() {
            debug!(tick = snapshot.time.tick, events = snapshot.events.len(), "tick events");
        }

        if let Ok(mut lock) = latest_snapshot.lock() {
            *lock = Some(snapshot);
        }

        next_tick_time += TICK_DURATION;
        let now = Instant::now();
        if next_tick_time > now {
            std::thread::sleep(next_tick_time - now);
        } else if now - next_tick_time > TICK_DURATION * 2 {
            // Too far behind; resync instead of bursting to catch up.
            next_tick_time = now;
        }
    }
    info!(tick = engine.time().tick, "game loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use phalanx_core::commands::SquadCommand;
    use phalanx_core::types::{DVec3, SquadId};

    #[test]
    fn test_command_channel_round_trip() {
        let (tx, rx) = mpsc::channel::<GameLoopCommand>();

        tx.send(GameLoopCommand::Command(SquadCommand::stop(SquadId(0))))
            .unwrap();
        tx.send(GameLoopCommand::Command(SquadCommand::move_to(
            SquadId(1),
            DVec3::new(1.0, 0.0, 2.0),
        )))
        .unwrap();
        tx.send(GameLoopCommand::Shutdown).unwrap();

        let mut commands = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            commands.push(cmd);
        }

        assert_eq!(commands.len(), 3);
        assert!(matches!(
            &commands[0],
            GameLoopCommand::Command(c) if c.squad_id == SquadId(0)
        ));
        assert!(matches!(
            &commands[1],
            GameLoopCommand::Command(c) if c.target == Some(DVec3::new(1.0, 0.0, 2.0))
        ));
        assert!(matches!(commands[2], GameLoopCommand::Shutdown));
    }

    #[test]
    fn test_drain_stops_on_shutdown_or_disconnect() {
        let mut engine = SimulationEngine::new(SimConfig::default());
        let (tx, rx) = mpsc::channel::<GameLoopCommand>();

        assert!(drain_commands(&mut engine, &rx));
        tx.send(GameLoopCommand::Shutdown).unwrap();
        assert!(!drain_commands(&mut engine, &rx));

        drop(tx);
        assert!(!drain_commands(&mut engine, &rx));
    }

    #[test]
    fn test_loop_publishes_snapshots_until_shutdown() {
        let latest = Arc::new(Mutex::new(None));
        let game = spawn_game_loop(SimConfig::default(), |_| {}, latest.clone()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while latest.lock().unwrap().is_none() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        game.commands.send(GameLoopCommand::Shutdown).unwrap();
        game.handle.join().unwrap();

        let snap = latest.lock().unwrap().clone().expect("at least one tick ran");
        assert!(snap.time.tick >= 1);
    }

    #[test]
    fn test_tick_duration_constant() {
        // 60Hz = 16.667ms per tick
        let expected_nanos = 1_000_000_000u64 / 60;
        assert_eq!(TICK_DURATION.as_nanos(), expected_nanos as u128);
    }
}
