/// Flight Analysis Service
///
/// Accepts UAV flight log uploads, buckets the telemetry by message type,
/// and answers questions about the flight through an LLM-backed chat agent.
/// Port: 8001

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use flight_log_analyzer::anomaly::{detect_anomalies, AnomalyFinding};
use flight_log_analyzer::chat_agent::ChatAgent;
use flight_log_analyzer::completion::CompletionClient;
use flight_log_analyzer::config::Config;
use flight_log_analyzer::decoders::JsonLinesDecoder;
use flight_log_analyzer::ingest::{IngestError, LogIngestor};
use flight_log_analyzer::record_store::RecordStore;
use flight_log_analyzer::session::SessionStore;

// Dataflash logs for a long flight run to tens of megabytes.
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
struct AppState {
    ingestor: Arc<LogIngestor>,
    agent: Arc<ChatAgent>,
}

impl AppState {
    fn new(config: &Config) -> anyhow::Result<Self> {
        let ingestor = Arc::new(LogIngestor::new(Arc::new(JsonLinesDecoder::new())));

        let completion = Arc::new(CompletionClient::new(config.llm.clone())?);
        let agent = Arc::new(ChatAgent::new(
            SessionStore::new(config.max_sessions),
            completion,
        ));

        Ok(Self { ingestor, agent })
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct UploadParams {
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    status: String,
    data: RecordStore,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    status: String,
    response: String,
}

#[derive(Debug, Deserialize)]
struct AnomalyParams {
    session_id: String,
}

#[derive(Debug, Serialize)]
struct AnomaliesResponse {
    status: String,
    anomalies: Vec<AnomalyFinding>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    decoder: String,
    completion_service: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// ============================================================================
// HTTP Handlers
// ============================================================================

/// Health check
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        decoder: state.ingestor.decoder_name().to_string(),
        completion_service: state.agent.completion_name().to_string(),
    })
}

/// Upload a flight log, bucket it by message type, and optionally attach it
/// to a session for chat context and anomaly queries.
async fn upload_log(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let mut contents = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, format!("invalid multipart body: {}", e))
    })? {
        if field.name() == Some("file") {
            let bytes = field.bytes().await.map_err(|e| {
                error_response(
                    StatusCode::BAD_REQUEST,
                    format!("failed to read uploaded file: {}", e),
                )
            })?;
            contents = Some(bytes);
            break;
        }
    }

    let contents = contents.ok_or_else(|| {
        error_response(StatusCode::BAD_REQUEST, "missing multipart field 'file'")
    })?;

    info!("Received log upload ({} bytes)", contents.len());

    let report = state.ingestor.ingest(&contents).map_err(|e| match e {
        IngestError::Decode(_) | IngestError::EmptyLog => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
    })?;

    if let Some(session_id) = params.session_id.as_deref() {
        state
            .agent
            .set_flight_data(session_id, report.store.clone())
            .await;
        info!("Stored flight data for session {}", session_id);
    }

    Ok(Json(UploadResponse {
        status: "success".to_string(),
        data: report.store,
    }))
}

/// Answer a chat message in the context of the session's flight data.
async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> impl IntoResponse {
    let response = state
        .agent
        .process_message(&req.message, req.session_id.as_deref())
        .await;

    Json(ChatResponse {
        status: "success".to_string(),
        response,
    })
}

/// Run the anomaly rule battery over a session's stored flight data.
async fn anomalies(
    State(state): State<AppState>,
    Query(params): Query<AnomalyParams>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let store = state
        .agent
        .flight_data(&params.session_id)
        .await
        .ok_or_else(|| {
            error_response(
                StatusCode::NOT_FOUND,
                "No flight data found for this session",
            )
        })?;

    Ok(Json(AnomaliesResponse {
        status: "success".to_string(),
        anomalies: detect_anomalies(&store),
    }))
}

// ============================================================================
// Main Application
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (fails silently if not found)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt().with_target(false).init();

    info!("Starting Flight Analysis Service");

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    config.log_config();

    let state = match AppState::new(&config) {
        Ok(state) => state,
        Err(e) => {
            error!("Startup error: {}", e);
            error!("Set LLM_PROVIDER, LLM_API_KEY / OLLAMA_ENDPOINT, and LLM_MODEL");
            std::process::exit(1);
        }
    };

    let cors = if config.allowed_origin == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::exact(config.allowed_origin.parse()?))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/upload-log", post(upload_log))
        .route("/chat", post(chat))
        .route("/anomalies", get(anomalies))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Flight Analysis Service listening on {}", addr);
    info!("");
    info!("Endpoints:");
    info!("   GET  /health       - Health check");
    info!("   POST /upload-log   - Multipart log upload (optional ?session_id=)");
    info!("   POST /chat         - Chat about the uploaded flight");
    info!("   GET  /anomalies    - Rule-based anomaly findings for a session");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
