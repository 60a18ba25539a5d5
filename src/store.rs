use std::sync::Arc;

use tokio::sync::RwLock;

use crate::logic::{GameState, InvalidMove, Mark};

/// Handle to the one authoritative [`GameState`]. Clones share the same state; build a new
/// store for an independent game.
#[derive(Clone, Debug, Default)]
pub struct GameStore {
    state: Arc<RwLock<GameState>>,
}

impl GameStore {
    pub fn new(initial: GameState) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
        }
    }

    /// The last saved state, or the initial one if nothing was ever saved.
    pub async fn load(&self) -> GameState {
        *self.state.read().await
    }

    /// Overwrites the stored state as-is. No rule checks: last writer wins.
    pub async fn save(&self, state: GameState) {
        *self.state.write().await = state;
    }

    pub async fn reset(&self) -> GameState {
        let fresh = GameState::reset();
        *self.state.write().await = fresh;
        fresh
    }

    /// Validates and applies one move against the stored state while holding the write lock.
    pub async fn play(&self, mark: Mark, index: usize) -> Result<GameState, InvalidMove> {
        let mut state = self.state.write().await;
        state.play_as(mark, index)?;
        Ok(*state)
    }
}
