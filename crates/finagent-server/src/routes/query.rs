//! Query endpoints: synchronous aggregation and SSE streaming.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::post,
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use finagent_core::{aggregate, run_session, SessionEvent, EVENT_CHANNEL_BUFFER};

use crate::error::AppError;
use crate::types::{QueryRequest, QueryResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/query", post(query))
        .route("/stream", post(stream))
}

/// Send a task to the agent and wait for the aggregated result.
async fn query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    req.validate()?;

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
    spawn_session(&state, req, tx);

    let outcome = aggregate(rx).await?;
    Ok(Json(QueryResponse {
        status: "success".to_string(),
        response: outcome.response,
        usage: outcome.usage,
        agent_info: outcome.agent_info,
    }))
}

/// Stream agent progress in real time over SSE.
///
/// Returns immediately with an open channel; everything after validation,
/// including any error, arrives as a serialized event. The channel closes
/// after the terminal event, and a disconnected client closes the receiver,
/// which stops the pipeline and cancels the agent run.
async fn stream(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    req.validate()?;

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
    spawn_session(&state, req, tx);

    let stream = ReceiverStream::new(rx).map(|event| Ok(to_sse_event(&event)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn spawn_session(state: &AppState, req: QueryRequest, tx: mpsc::Sender<SessionEvent>) {
    let driver = Arc::clone(&state.driver);
    let agent = Arc::clone(&state.agent);
    tokio::spawn(async move {
        run_session(driver.as_ref(), &req.prompt, req.max_turns, &agent, tx).await;
    });
}

fn to_sse_event(event: &SessionEvent) -> Event {
    Event::default()
        .json_data(event)
        .unwrap_or_else(|_| Event::default().data("error"))
}
