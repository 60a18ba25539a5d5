use serde::{Deserialize, Serialize};

use crate::logic::{GameState, Mark, Outcome};

pub mod client;
pub mod logic;
pub mod server;
pub mod store;

/// Acknowledgement body returned by the mutating endpoints.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A single move, validated by the server before it is stored.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub mark: Mark,
    pub index: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveResponse {
    #[serde(flatten)]
    pub state: GameState,
    pub outcome: Outcome,
}
