use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::get, routing::post, Json, Router};
use serde::Serialize;
use thiserror::Error;
use tokio::task;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use clauselens_rag::{answer, AskResponse, ClauseLensConfig, RagError, RawAskRequest, ServingContext};

struct AppState {
    ctx: ServingContext,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = ClauseLensConfig::load(None).context("failed to load configuration")?;
    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind_addr))?;
    // Built before the runtime starts: blocking HTTP clients must not be
    // created or dropped on a runtime thread.
    let ctx = ServingContext::from_config(&config).context("failed to build serving context")?;
    if ctx.index().is_none() {
        warn!("serving without an index; /ask will report index_unavailable");
    }
    let state = Arc::new(AppState { ctx });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    runtime.block_on(serve(state.clone(), addr))?;
    drop(runtime);
    drop(state);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening" = %addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("shutdown complete");
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/ask", post(handle_ask))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("signal_error" = %err);
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    chunks: usize,
    index_loaded: bool,
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        chunks: state.ctx.chunk_count(),
        index_loaded: state.ctx.index().is_some(),
    })
}

async fn handle_ask(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RawAskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Json(raw) = body.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let response = task::spawn_blocking(move || answer(&state.ctx, raw))
        .await
        .map_err(AppError::internal)??;
    Ok(Json(response))
}

#[derive(Debug, Error)]
enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Rag(#[from] RagError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn bad_request(msg: impl ToString) -> Self {
        Self::BadRequest(msg.to_string())
    }

    fn internal<E: Into<anyhow::Error>>(err: E) -> Self {
        Self::Internal(err.into())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn rag_status(err: &RagError) -> StatusCode {
    match err {
        RagError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        RagError::IndexUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        RagError::RetrievalFailure(_)
        | RagError::RerankFailure(_)
        | RagError::ExtractionFailure(_) => StatusCode::BAD_GATEWAY,
        RagError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "invalid_request",
                    message: msg.clone(),
                },
            ),
            AppError::Rag(err) => {
                let status = rag_status(err);
                let message = match err {
                    RagError::Configuration(_) => "internal configuration error".to_string(),
                    other => other.to_string(),
                };
                (
                    status,
                    ErrorBody {
                        error: err.code(),
                        message,
                    },
                )
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "internal_error",
                    message: "internal error".to_string(),
                },
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Rag(err) if err.is_collaborator_failure() => {
                error!(code = err.code(), "collaborator_error" = ?err);
            }
            AppError::Rag(RagError::Configuration(detail)) => {
                error!("configuration_error" = %detail);
            }
            AppError::Internal(err) => {
                error!("internal_error" = %err);
            }
            _ => {}
        }
        let (status, body) = self.parts();
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn rag_errors_map_to_statuses_and_codes() {
        let cases = [
            (
                RagError::InvalidRequest("bad mode".into()),
                StatusCode::BAD_REQUEST,
                "invalid_request",
            ),
            (
                RagError::IndexUnavailable("none".into()),
                StatusCode::SERVICE_UNAVAILABLE,
                "index_unavailable",
            ),
            (
                RagError::RerankFailure(anyhow!("timeout")),
                StatusCode::BAD_GATEWAY,
                "rerank_failure",
            ),
            (
                RagError::Configuration("id 9 outside corpus".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
            ),
        ];
        for (err, status, code) in cases {
            let (got_status, body) = AppError::Rag(err).parts();
            assert_eq!(got_status, status);
            assert_eq!(body.error, code);
        }
    }

    #[test]
    fn collaborator_details_stay_out_of_the_body() {
        let err = AppError::Rag(RagError::ExtractionFailure(anyhow!("token sk-live-123 rejected")));
        let (_, body) = err.parts();
        assert_eq!(body.message, "answer extraction failed");

        let err = AppError::Rag(RagError::Configuration("/srv/index/meta.jsonl".into()));
        let (_, body) = err.parts();
        assert!(!body.message.contains("/srv"));
    }

    #[test]
    fn error_body_serializes_code_and_message() {
        let (_, body) = AppError::bad_request("expected value at line 1").parts();
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["error"], "invalid_request");
        assert_eq!(value["message"], "expected value at line 1");
    }
}
