//! Client side of the synchronization contract: a typed HTTP client and a session that keeps an
//! optimistic local copy of the game converging with the server's.

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, info, warn};

use crate::{
    MessageResponse, MoveRequest, MoveResponse,
    logic::{GameState, InvalidMove, Mark, Outcome},
};

#[derive(Debug, Clone)]
pub struct SyncClient {
    base_url: String,
    client: reqwest::Client,
}

impl SyncClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<String> {
        let text = self
            .client
            .get(self.url("/"))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }

    pub async fn load(&self) -> Result<GameState> {
        let state = self
            .client
            .get(self.url("/get-game"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Server returned a malformed game state")?;
        Ok(state)
    }

    pub async fn save(&self, state: &GameState) -> Result<MessageResponse> {
        let ack = self
            .client
            .post(self.url("/save-game"))
            .json(state)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(ack)
    }

    pub async fn reset(&self) -> Result<MessageResponse> {
        let ack = self
            .client
            .post(self.url("/reset-game"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(ack)
    }

    /// Sends a single move for the server to validate and apply.
    pub async fn play_move(&self, mark: Mark, index: usize) -> Result<MoveResponse> {
        let response = self
            .client
            .post(self.url("/play-move"))
            .json(&MoveRequest { mark, index })
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::CONFLICT {
            let rejection: MessageResponse = response.json().await?;
            return Err(anyhow!("Server rejected move: {}", rejection.message));
        }
        Ok(response.error_for_status()?.json().await?)
    }
}

/// How the last change reached the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    /// The server accepted the change.
    Saved,
    /// The change did not go through; the local copy was replaced with the server's.
    Reconciled,
    /// The server could not be reached; the local copy is kept as-is.
    Offline,
    /// The server answered with an error; the local change stands without confirmation.
    Unconfirmed,
}

/// Whether `e` is a response from the server rather than a failure to deliver the request.
fn reached_server(e: &anyhow::Error) -> bool {
    e.downcast_ref::<reqwest::Error>()
        .is_some_and(|e| e.is_status() || e.is_decode())
}

/// A player's view of the shared game.
#[derive(Debug)]
pub struct Session {
    client: SyncClient,
    state: GameState,
    hardened: bool,
}

impl Session {
    /// Loads the current game, starting from an empty one if the server is unavailable.
    /// With `hardened`, moves are sent one at a time to `/play-move` instead of saving
    /// whole states.
    pub async fn connect(client: SyncClient, hardened: bool) -> Self {
        let state = match client.load().await {
            Ok(state) => state,
            Err(e) => {
                error!("Error retrieving the game state: {:#}", e);
                GameState::default()
            }
        };
        Self {
            client,
            state,
            hardened,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn outcome(&self) -> Outcome {
        self.state.outcome()
    }

    pub fn is_hardened(&self) -> bool {
        self.hardened
    }

    pub async fn refresh(&mut self) -> Result<()> {
        self.state = self.client.load().await?;
        Ok(())
    }

    /// Plays `index` for whoever is on turn. Invalid moves are rejected locally without any
    /// request. Accepted moves are applied locally first, then pushed to the server.
    pub async fn play(&mut self, index: usize) -> Result<SyncStatus, InvalidMove> {
        let previous = self.state;
        self.state = previous.try_apply(index)?;

        let pushed = if self.hardened {
            self.client
                .play_move(previous.turn, index)
                .await
                .map(|played| played.state)
        } else {
            let next = self.state;
            self.client.save(&next).await.map(|_| next)
        };

        match pushed {
            Ok(state) => {
                debug!(?state, "Game saved on the server");
                self.state = state;
                Ok(SyncStatus::Saved)
            }
            Err(e) => {
                error!("Error saving the game on the server: {:#}", e);
                Ok(self.reconcile().await)
            }
        }
    }

    /// Resets the server's game, then the local copy. If the request never reached the server
    /// the local copy is kept, so a later save can't wipe a game still running there.
    pub async fn reset(&mut self) -> SyncStatus {
        match self.client.reset().await {
            Ok(_) => {
                info!("Game state reset successfully");
                self.state = GameState::reset();
                SyncStatus::Saved
            }
            Err(e) if reached_server(&e) => {
                warn!("Server answered the reset with an error: {:#}", e);
                self.state = GameState::reset();
                SyncStatus::Unconfirmed
            }
            Err(e) => {
                error!("Error resetting game state: {:#}", e);
                SyncStatus::Offline
            }
        }
    }

    async fn reconcile(&mut self) -> SyncStatus {
        match self.client.load().await {
            Ok(state) => {
                info!(?state, "Reloaded authoritative game state");
                self.state = state;
                SyncStatus::Reconciled
            }
            Err(e) => {
                warn!("Keeping local game state, server unavailable: {:#}", e);
                SyncStatus::Offline
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Json, Router,
        http::StatusCode,
        routing::{get, post},
    };
    use clap::Parser;
    use tokio::net::TcpListener;

    use super::*;
    use crate::{
        server::{ServerConfig, router},
        store::GameStore,
    };

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        format!("http://{}", addr)
    }

    async fn spawn_server(store: &GameStore) -> String {
        let config = ServerConfig::parse_from(["server"]);
        serve(router(store.clone(), &config).unwrap()).await
    }

    async fn unreachable_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn client_round_trips_state() {
        let store = GameStore::default();
        let client = SyncClient::new(spawn_server(&store).await + "/");

        assert_eq!(client.health().await.unwrap(), "Server online");
        assert_eq!(client.load().await.unwrap(), GameState::default());

        let mut state = GameState::default();
        state.apply_move(0).unwrap();
        state.apply_move(4).unwrap();
        let ack = client.save(&state).await.unwrap();
        assert_eq!(ack.message, "Game saved successfully");
        assert_eq!(client.load().await.unwrap(), state);

        client.reset().await.unwrap();
        assert_eq!(store.load().await, GameState::default());
    }

    #[tokio::test]
    async fn session_plays_to_a_win() {
        let store = GameStore::default();
        let mut session = Session::connect(SyncClient::new(spawn_server(&store).await), false).await;

        for index in [0, 3, 1, 4, 2] {
            assert_eq!(session.play(index).await, Ok(SyncStatus::Saved));
        }
        assert_eq!(session.outcome(), Outcome::Won(Mark::X));
        assert_eq!(store.load().await, *session.state());
        assert_eq!(session.play(8).await, Err(InvalidMove::GameOver));
    }

    #[tokio::test]
    async fn rejected_move_sends_nothing() {
        let store = GameStore::default();
        let mut session = Session::connect(SyncClient::new(spawn_server(&store).await), false).await;
        session.play(4).await.unwrap();

        // Someone else moves on the server; a local rejection must not overwrite it.
        store.play(Mark::O, 0).await.unwrap();
        let server_state = store.load().await;

        assert_eq!(session.play(4).await, Err(InvalidMove::CellOccupied));
        assert_eq!(session.play(9).await, Err(InvalidMove::OutOfBounds));
        assert_eq!(store.load().await, server_state);
    }

    #[tokio::test]
    async fn stale_save_wins_last() {
        let store = GameStore::default();
        let url = spawn_server(&store).await;
        let mut alice = Session::connect(SyncClient::new(url.clone()), false).await;
        let mut bob = Session::connect(SyncClient::new(url), false).await;

        alice.play(4).await.unwrap();
        bob.play(0).await.unwrap();
        assert_eq!(store.load().await, *bob.state());
        assert_eq!(store.load().await.board.cell[4], None);
    }

    #[tokio::test]
    async fn hardened_stale_move_reconciles() {
        let store = GameStore::default();
        let url = spawn_server(&store).await;
        let mut alice = Session::connect(SyncClient::new(url.clone()), true).await;
        let mut bob = Session::connect(SyncClient::new(url), true).await;

        assert_eq!(alice.play(4).await, Ok(SyncStatus::Saved));
        // Bob's copy is stale; the server refuses and bob converges on its state.
        assert_eq!(bob.play(0).await, Ok(SyncStatus::Reconciled));
        assert_eq!(*bob.state(), store.load().await);
        assert_eq!(bob.state().board.cell[4], Some(Mark::X));
        assert_eq!(bob.state().turn, Mark::O);
    }

    #[tokio::test]
    async fn failed_save_reloads_server_state() {
        let mut authoritative = GameState::default();
        authoritative.apply_move(8).unwrap();
        let app = Router::new()
            .route("/get-game", get(move || async move { Json(authoritative) }))
            .route(
                "/save-game",
                post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            );
        let url = serve(app).await;

        let mut session = Session::connect(SyncClient::new(url), false).await;
        assert_eq!(*session.state(), authoritative);
        assert_eq!(session.play(0).await, Ok(SyncStatus::Reconciled));
        assert_eq!(*session.state(), authoritative);
    }

    #[tokio::test]
    async fn offline_keeps_optimistic_state() {
        let mut session = Session::connect(SyncClient::new(unreachable_url().await), false).await;
        assert_eq!(*session.state(), GameState::default());

        assert_eq!(session.play(4).await, Ok(SyncStatus::Offline));
        assert_eq!(session.state().board.cell[4], Some(Mark::X));
        assert_eq!(session.state().turn, Mark::O);
        assert!(session.refresh().await.is_err());

        let before = *session.state();
        assert_eq!(session.reset().await, SyncStatus::Offline);
        assert_eq!(*session.state(), before);
    }

    #[tokio::test]
    async fn reset_answered_with_error_still_resets_locally() {
        let app = Router::new()
            .route("/get-game", get(|| async { Json(GameState::default()) }))
            .route(
                "/save-game",
                post(|| async { Json(MessageResponse::new("Game saved successfully")) }),
            )
            .route(
                "/reset-game",
                post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            );
        let mut session = Session::connect(SyncClient::new(serve(app).await), false).await;
        assert_eq!(session.play(4).await, Ok(SyncStatus::Saved));

        assert_eq!(session.reset().await, SyncStatus::Unconfirmed);
        assert_eq!(*session.state(), GameState::default());
    }

    #[tokio::test]
    async fn reset_reaches_server() {
        let store = GameStore::default();
        let client = SyncClient::new(spawn_server(&store).await);
        assert!(!client.base_url().ends_with('/'));
        let mut session = Session::connect(client, true).await;
        assert!(session.is_hardened());
        session.play(0).await.unwrap();

        assert_eq!(session.reset().await, SyncStatus::Saved);
        assert_eq!(*session.state(), GameState::default());
        assert_eq!(store.load().await, GameState::default());
    }

    #[tokio::test]
    async fn malformed_server_state_is_an_error() {
        let app = Router::new().route(
            "/get-game",
            get(|| async { Json(serde_json::json!({ "board": "nope" })) }),
        );
        let client = SyncClient::new(serve(app).await);
        assert!(client.load().await.is_err());
    }
}
