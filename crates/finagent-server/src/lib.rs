//! Finance News Agent Gateway
//!
//! Thin HTTP façade over the external research agent: forwards prompts,
//! relays incremental agent output as one aggregated response or a live SSE
//! stream, and serves the files the agent generates. This is a library
//! crate — the server is started via `start_server()`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use finagent_core::{AgentConfig, AgentDriver, CliDriver};

pub mod error;
pub mod routes;
pub mod types;

/// Configuration for starting the server.
pub struct ServerConfig {
    /// Port to listen on (default: 8001).
    pub port: u16,
    /// Directory where the agent writes generated files.
    pub output_dir: PathBuf,
    /// Restrict CORS to the fixed local allow-list when true.
    pub production: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8001,
            output_dir: PathBuf::from("./generated_files"),
            production: false,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the environment (`PORT`,
    /// `FINAGENT_OUTPUT_DIR`, `ENVIRONMENT=production`).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            output_dir: std::env::var("FINAGENT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            production: std::env::var("ENVIRONMENT")
                .map(|v| v == "production")
                .unwrap_or(false),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Session driver for the external agent.
    pub driver: Arc<dyn AgentDriver>,
    /// Immutable agent identity and invocation settings.
    pub agent: Arc<AgentConfig>,
    /// Directory served by the files endpoints.
    pub output_dir: Arc<PathBuf>,
}

/// Local development origins always allowed through CORS.
const CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:8080",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:8080",
    "http://localhost:8002",
    "http://localhost:8003",
    "http://localhost:8004",
    "http://127.0.0.1:8002",
    "http://127.0.0.1:8003",
    "http://127.0.0.1:8004",
];

fn cors_layer(production: bool) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    if production {
        let origins: Vec<HeaderValue> = CORS_ORIGINS
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer.allow_origin(origins)
    } else {
        layer.allow_origin(Any)
    }
}

/// Build the Axum router with all routes.
pub fn build_router(config: &ServerConfig) -> (Router, AppState) {
    let state = AppState {
        driver: Arc::new(CliDriver::new()),
        agent: Arc::new(AgentConfig::default()),
        output_dir: Arc::new(config.output_dir.clone()),
    };

    let app = Router::new()
        .route("/", get(root))
        .route("/info", get(agent_info))
        .route("/health", get(health))
        .merge(routes::api_router())
        .layer(cors_layer(config.production))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    (app, state)
}

/// Start the gateway and block until shutdown.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let (app, _state) = build_router(&config);

    tracing::info!("finagent server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": format!("Welcome to {}", state.agent.name),
        "role": state.agent.role,
        "endpoints": [
            "/query - POST: Send a task to the agent",
            "/stream - POST: Stream agent progress in real-time",
            "/info - GET: Get agent information",
            "/health - GET: Check service health",
            "/files - GET: List generated files",
        ],
    }))
}

async fn agent_info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: state.agent.name.clone(),
        role: state.agent.role.clone(),
        tools: state.agent.allowed_tools.clone(),
        status: "active",
        features: vec!["streaming", "real-time_progress"],
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        agent: state.agent.name.clone(),
        role: state.agent.role.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
struct InfoResponse {
    name: String,
    role: String,
    tools: Vec<String>,
    status: &'static str,
    features: Vec<&'static str>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    agent: String,
    role: String,
    timestamp: String,
}
