use axum::{
    extract::Query,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use score4::{best_move, parse_history, GameState, MoveRequest, Player, SIZE};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let app = app_router();

    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info,tower_http=debug")
        .try_init();
}

fn app_router() -> Router {
    let api = Router::new()
        .route("/move", get(handle_move))
        .route("/state", get(handle_state));
    let spa = Router::new().nest_service(
        "/",
        ServeDir::new("web/dist").append_index_html_on_directories(true),
    );
    Router::new()
        .nest("/api", api)
        .merge(spa)
        .layer(
            CorsLayer::new()
                .allow_methods([axum::http::Method::GET])
                .allow_origin(axum::http::HeaderValue::from_static("*"))
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Deserialize)]
struct MoveQuery {
    position: String,
    level: String,
}

/// The frontend's difficulty names double as search depths; a bare
/// number selects the depth directly.
fn parse_level(level: &str) -> anyhow::Result<u8> {
    match level.to_ascii_lowercase().as_str() {
        "easy" => Ok(2),
        "medium" => Ok(3),
        "hard" => Ok(6),
        other => other.parse().map_err(|_| {
            anyhow::anyhow!("level must be a number or easy/medium/hard, got {other:?}")
        }),
    }
}

async fn handle_move(Query(query): Query<MoveQuery>) -> Result<impl IntoResponse, ApiError> {
    let req = MoveRequest {
        position: query.position,
        level: parse_level(&query.level)?,
    };
    let mv = best_move(req)?;
    let headers = [(header::CACHE_CONTROL, "no-store")];
    Ok((headers, Json(mv)))
}

#[derive(Debug, Deserialize)]
struct StateQuery {
    position: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Stone {
    x: usize,
    y: usize,
    z: usize,
    player: Player,
}

/// Everything the 3D board view needs to render a position.
#[derive(Debug, Serialize, Deserialize)]
struct StateResponse {
    turn: Player,
    terminal: bool,
    winner: Option<Player>,
    draw: bool,
    legal_moves: Vec<String>,
    stones: Vec<Stone>,
}

async fn handle_state(Query(query): Query<StateQuery>) -> Result<impl IntoResponse, ApiError> {
    let moves = parse_history(&query.position)?;
    let state = GameState::from_history(&moves)?;

    let mut stones = Vec::new();
    for x in 0..SIZE {
        for y in 0..SIZE {
            for z in 0..SIZE {
                if let Some(player) = state.stone_at(x, y, z) {
                    stones.push(Stone { x, y, z, player });
                }
            }
        }
    }
    let terminal = state.is_terminal();
    let legal_moves = if terminal {
        Vec::new()
    } else {
        state.moves().iter().map(|mv| mv.to_string()).collect()
    };
    let snapshot = StateResponse {
        turn: state.turn(),
        terminal,
        winner: state.winner(),
        draw: state.is_full() && !terminal,
        legal_moves,
        stones,
    };
    let headers = [(header::CACHE_CONTROL, "no-store")];
    Ok((headers, Json(snapshot)))
}

#[derive(Debug)]
struct ApiError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::BAD_REQUEST;
        let body = format!("{}", self.0);
        (status, body).into_response()
    }
}
