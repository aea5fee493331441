//! HTTP surface of the generator: `POST /api/generate`.

use crate::core::QuizSource;
use crate::error::GenerationError;
use crate::models::{ErrorBody, GenerateRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info};

pub type SharedSource = Arc<dyn QuizSource>;

pub fn router(source: SharedSource) -> Router {
    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any).allow_origin(Any);
    Router::new()
        .route("/", get(root))
        .route("/api/generate", post(generate))
        .with_state(source)
        .layer(cors)
}

pub async fn bind(host: IpAddr, port: u16) -> io::Result<TcpListener> {
    let address = SocketAddr::from((host, port));
    tracing::trace!("binding {address}");
    TcpListener::bind(address).await
}

/// Serve the router on `listener` until the process stops.
pub async fn serve(listener: TcpListener, source: SharedSource) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("server: listening on http://{}", addr);
    }
    axum::serve(listener, router(source)).await
}

async fn root() -> (StatusCode, String) {
    (StatusCode::OK, format!("quizgen v{}", env!("CARGO_PKG_VERSION")))
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: message.into() })).into_response()
}

fn status_for(e: &GenerationError) -> StatusCode {
    match e {
        GenerationError::NoCredentials => StatusCode::SERVICE_UNAVAILABLE,
        GenerationError::Exhausted { .. } | GenerationError::Parse(..) | GenerationError::Remote(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

async fn generate(State(source): State<SharedSource>, payload: Result<Json<GenerateRequest>, JsonRejection>) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(error = %rejection, "Rejected generate request body");
            return error_response(rejection.status(), rejection.body_text());
        }
    };
    debug!(prompt_len = request.prompt.len(), "Generate request");
    if request.prompt.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Prompt is empty");
    }

    match source.generate(&request.prompt).await {
        Ok(items) => {
            info!(questions = items.len(), "Generated quiz");
            Json(items).into_response()
        }
        Err(e) => {
            error!(error = %e, "Quiz generation failed");
            error_response(status_for(&e), e.to_string())
        }
    }
}
