use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    routing::{get, post},
};
use clap::Parser;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    MessageResponse, MoveRequest, MoveResponse,
    logic::GameState,
    store::GameStore,
};

#[derive(Parser, Debug, Clone)]
#[command(about = "Serves the shared tic-tac-toe game state")]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// The only origin allowed to call the API from a browser
    #[arg(long, env = "FRONTEND_URL", default_value = "http://localhost:5173")]
    pub frontend_url: String,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builds the HTTP surface around `store`. Fails if the configured origin is not a valid
/// header value.
pub fn router(store: GameStore, config: &ServerConfig) -> anyhow::Result<Router> {
    let origin: HeaderValue = config.frontend_url.parse()?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .route("/", get(health))
        .route("/get-game", get(get_game))
        .route("/save-game", post(save_game))
        .route("/reset-game", post(reset_game))
        .route("/play-move", post(play_move))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(store))
}

async fn health() -> &'static str {
    info!("Health check");
    "Server online"
}

async fn get_game(State(store): State<GameStore>) -> Json<GameState> {
    Json(store.load().await)
}

async fn save_game(
    State(store): State<GameStore>,
    Json(state): Json<GameState>,
) -> Json<MessageResponse> {
    store.save(state).await;
    info!(?state, "Game state saved");
    Json(MessageResponse::new("Game saved successfully"))
}

async fn reset_game(State(store): State<GameStore>) -> Json<MessageResponse> {
    let state = store.reset().await;
    info!(?state, "Game state reset");
    Json(MessageResponse::new("Game state reset successfully"))
}

async fn play_move(
    State(store): State<GameStore>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, (StatusCode, Json<MessageResponse>)> {
    match store.play(request.mark, request.index).await {
        Ok(state) => {
            info!(?request, ?state, "Move applied");
            Ok(Json(MoveResponse {
                state,
                outcome: state.outcome(),
            }))
        }
        Err(e) => {
            warn!(?request, "Rejected move: {}", e);
            Err((
                StatusCode::CONFLICT,
                Json(MessageResponse::new(e.to_string())),
            ))
        }
    }
}
