// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

mod error;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Json, State};
use axum::routing::post;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::info;

use mempool_core::user_op::UserOperation;

use crate::pool_lane::{PendingAdd, PendingList, PoolLaneInput};

pub use error::ApiError;

pub const USER_OPERATIONS_PATH: &str = "/user_operations";

#[derive(Clone)]
pub struct AppState {
    pub lane_sender: mpsc::Sender<PoolLaneInput>,
    pub queue_timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddResponse {
    ok: bool,
    user_operation: UserOperation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    user_operations: Vec<UserOperation>,
}

pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route(
            USER_OPERATIONS_PATH,
            post(add_user_operation).get(list_user_operations),
        )
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

async fn add_user_operation(
    State(state): State<Arc<AppState>>,
    req: Result<Json<UserOperation>, JsonRejection>,
) -> Result<Json<AddResponse>, ApiError> {
    let Json(user_operation) =
        req.map_err(|err| ApiError::bad_request(format!("invalid JSON: {err}")))?;
    let user_operation = user_operation.with_resolved_sender();

    let (respond_to, recv) = oneshot::channel();
    let pending = PendingAdd {
        user_operation,
        respond_to,
        received_at: Instant::now(),
    };
    enqueue(&state, PoolLaneInput::Add(pending)).await?;

    let stored = recv
        .await
        .map_err(|_| ApiError::internal_error("pool lane dropped response"))??;

    info!(sender = %stored.sender, nonce = %stored.nonce, "user operation added");

    Ok(Json(AddResponse {
        ok: true,
        user_operation: stored,
    }))
}

async fn list_user_operations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListResponse>, ApiError> {
    let (respond_to, recv) = oneshot::channel();
    enqueue(&state, PoolLaneInput::List(PendingList { respond_to })).await?;

    let user_operations = recv
        .await
        .map_err(|_| ApiError::internal_error("pool lane dropped response"))??;

    Ok(Json(ListResponse { user_operations }))
}

async fn enqueue(state: &AppState, input: PoolLaneInput) -> Result<(), ApiError> {
    match state
        .lane_sender
        .send_timeout(input, state.queue_timeout)
        .await
    {
        Ok(()) => Ok(()),
        Err(SendTimeoutError::Timeout(_)) => Err(ApiError::overloaded("queue full")),
        Err(SendTimeoutError::Closed(_)) => Err(ApiError::internal_error("pool lane unavailable")),
    }
}
