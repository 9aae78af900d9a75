//! State shared between the caller and the game loop thread.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use phalanx_core::commands::SquadCommand;
use phalanx_core::state::SimSnapshot;

/// Messages accepted by the game loop thread.
#[derive(Debug)]
pub enum GameLoopCommand {
    /// A squad order to forward to the simulation engine.
    Command(SquadCommand),
    /// Stop the loop after the current tick.
    Shutdown,
}

/// Handles for talking to a running loop.
///
/// `command_tx` is `None` until the loop is started. The latest snapshot
/// is shared with the loop thread and replaced after every tick.
pub struct AppState {
    pub command_tx: Mutex<Option<mpsc::Sender<GameLoopCommand>>>,
    pub latest_snapshot: Arc<Mutex<Option<SimSnapshot>>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            command_tx: Mutex::new(None),
            latest_snapshot: Arc::new(Mutex::new(None)),
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward a message to the loop. Returns false when no loop is
    /// running or it has already exited.
    pub fn send(&self, command: GameLoopCommand) -> bool {
        let Ok(lock) = self.command_tx.lock() else {
            return false;
        };
        lock.as_ref().is_some_and(|tx| tx.send(command).is_ok())
    }

    /// Clone of the most recent snapshot, if any tick has completed.
    pub fn snapshot(&self) -> Option<SimSnapshot> {
        self.latest_snapshot.lock().ok().and_then(|s| s.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_creation() {
        let state = AppState::new();
        assert!(state.command_tx.lock().unwrap().is_none());
        assert!(state.latest_snapshot.lock().unwrap().is_none());
        assert!(state.snapshot().is_none());
    }

    #[test]
    fn test_send_without_loop_fails() {
        let state = AppState::new();
        assert!(!state.send(GameLoopCommand::Shutdown));

        let (tx, rx) = mpsc::channel();
        *state.command_tx.lock().unwrap() = Some(tx);
        assert!(state.send(GameLoopCommand::Shutdown));
        assert!(matches!(rx.try_recv(), Ok(GameLoopCommand::Shutdown)));

        drop(rx);
        assert!(!state.send(GameLoopCommand::Shutdown));
    }
}
