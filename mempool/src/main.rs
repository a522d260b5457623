// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use mempool::api::AppState;
use mempool::pool_lane::{PoolLane, PoolLaneConfig, PoolLaneError, PoolLaneInput};
use mempool::storage;

const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:50051";
const DEFAULT_DB_PATH: &str = "mempool.sqlite";
const DEFAULT_QUEUE_CAP: usize = 1024;
const DEFAULT_QUEUE_TIMEOUT_MS: u64 = 100;
const DEFAULT_MAX_REQUESTS_PER_CHUNK: usize = 64;
const DEFAULT_IDLE_POLL_INTERVAL: Duration = Duration::from_millis(2);
const DEFAULT_MAX_BODY_BYTES: usize = 128 * 1024;
const DEFAULT_SQLITE_SYNCHRONOUS: &str = "NORMAL";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let storage = storage::Storage::open(&config.db_path, &config.sqlite_synchronous)?;
    tracing::info!(path = %config.db_path, "pending-operation store opened");
    let (tx, rx) = tokio::sync::mpsc::channel::<PoolLaneInput>(config.queue_capacity);

    let pool_lane = PoolLane::new(
        rx,
        storage,
        PoolLaneConfig {
            max_requests_per_chunk: config.max_requests_per_chunk,
            idle_poll_interval: config.idle_poll_interval,
        },
    );
    let (mut pool_lane_handle, pool_lane_stop) = pool_lane.spawn();

    let state = Arc::new(AppState {
        lane_sender: tx,
        queue_timeout: Duration::from_millis(config.queue_timeout_ms),
    });

    let app = mempool::api::router(state, config.max_body_bytes);
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;

    tracing::info!(address = %config.http_addr, "listening");
    tokio::select! {
        server_result = axum::serve(listener, app) => {
            pool_lane_stop.request_shutdown();
            match pool_lane_handle.await {
                Ok(PoolLaneError::ShutdownRequested) | Ok(PoolLaneError::ChannelClosed) => {}
                Err(join_err) => {
                    return Err(format!("pool lane join error during shutdown: {join_err}").into())
                }
            }
            server_result?;
        }
        lane_result = &mut pool_lane_handle => {
            match lane_result {
                Ok(err) => return Err(format!("pool lane exited: {err}").into()),
                Err(join_err) => {
                    return Err(format!("pool lane join error: {join_err}").into())
                }
            }
        }
    }

    Ok(())
}

struct Config {
    http_addr: String,
    db_path: String,
    queue_capacity: usize,
    queue_timeout_ms: u64,
    max_requests_per_chunk: usize,
    idle_poll_interval: Duration,
    max_body_bytes: usize,
    sqlite_synchronous: String,
}

impl Config {
    fn from_env() -> Self {
        Self {
            http_addr: env_string("MEMPOOL_HTTP_ADDR", DEFAULT_HTTP_ADDR),
            db_path: env_string("MEMPOOL_DB_PATH", DEFAULT_DB_PATH),
            queue_capacity: env_usize("MEMPOOL_QUEUE_CAP", DEFAULT_QUEUE_CAP).max(1),
            queue_timeout_ms: env_u64("MEMPOOL_QUEUE_TIMEOUT_MS", DEFAULT_QUEUE_TIMEOUT_MS),
            max_requests_per_chunk: env_usize(
                "MEMPOOL_MAX_REQUESTS_PER_CHUNK",
                DEFAULT_MAX_REQUESTS_PER_CHUNK,
            )
            .max(1),
            idle_poll_interval: Duration::from_millis(
                env_u64(
                    "MEMPOOL_IDLE_POLL_INTERVAL_MS",
                    DEFAULT_IDLE_POLL_INTERVAL.as_millis() as u64,
                )
                .max(1),
            ),
            max_body_bytes: env_usize("MEMPOOL_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
            sqlite_synchronous: env_string(
                "MEMPOOL_SQLITE_SYNCHRONOUS",
                DEFAULT_SQLITE_SYNCHRONOUS,
            ),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
