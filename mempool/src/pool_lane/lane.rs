// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use crate::storage::PendingOperationStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{PendingAdd, PendingList, PoolError, PoolLaneError, PoolLaneInput};

#[derive(Debug, Clone, Copy)]
pub struct PoolLaneConfig {
    pub max_requests_per_chunk: usize,
    pub idle_poll_interval: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct PoolLaneStop {
    shutdown: Arc<AtomicBool>,
}

impl PoolLaneStop {
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

/// Sole owner of the pending-operation store.
///
/// Every add and list request goes through this lane, one at a time, so two
/// submissions for the same sender never interleave inside the store.
pub struct PoolLane<S: PendingOperationStore + 'static> {
    rx: mpsc::Receiver<PoolLaneInput>,
    stop: PoolLaneStop,
    store: S,
    config: PoolLaneConfig,
}

impl<S: PendingOperationStore + 'static> PoolLane<S> {
    pub fn new(rx: mpsc::Receiver<PoolLaneInput>, store: S, config: PoolLaneConfig) -> Self {
        Self {
            rx,
            stop: PoolLaneStop::default(),
            store,
            config,
        }
    }

    pub fn spawn(self) -> (JoinHandle<PoolLaneError>, PoolLaneStop) {
        let stop = self.stop.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let mut lane = self;
            match lane.run_forever() {
                Err(err) => err,
                Ok(()) => unreachable!("pool lane run loop is expected to be non-terminating"),
            }
        });
        (handle, stop)
    }

    fn run_forever(&mut self) -> Result<(), PoolLaneError> {
        let max_chunk = self.config.max_requests_per_chunk.max(1);
        let mut chunk = Vec::with_capacity(max_chunk);

        while !self.stop.is_shutdown_requested() {
            dequeue_request_chunk(&mut self.rx, max_chunk, &mut chunk)?;
            let served = chunk.len();
            for input in chunk.drain(..) {
                serve_request(&mut self.store, input);
            }

            if served == 0 {
                thread::sleep(self.config.idle_poll_interval);
            }
        }

        Err(PoolLaneError::ShutdownRequested)
    }
}

fn serve_request(store: &mut impl PendingOperationStore, input: PoolLaneInput) {
    match input {
        PoolLaneInput::Add(pending) => serve_add(store, pending),
        PoolLaneInput::List(pending) => serve_list(store, pending),
    }
}

fn serve_add(store: &mut impl PendingOperationStore, pending: PendingAdd) {
    let PendingAdd {
        user_operation,
        respond_to,
        received_at,
    } = pending;
    let sender = user_operation.sender.clone();

    let result = store.upsert(user_operation).map_err(|source| {
        warn!(sender = %sender, error = %source, "upsert failed");
        PoolError::storage(format!("db error: {source}"))
    });
    if result.is_ok() {
        debug!(
            sender = %sender,
            queued_for = ?received_at.elapsed(),
            "pending operation stored"
        );
    }
    let _ = respond_to.send(result);
}

fn serve_list(store: &mut impl PendingOperationStore, pending: PendingList) {
    let result = store.list_all().map_err(|source| {
        warn!(error = %source, "listing pending operations failed");
        PoolError::storage(format!("db error: {source}"))
    });
    let _ = pending.respond_to.send(result);
}

fn dequeue_request_chunk(
    rx: &mut mpsc::Receiver<PoolLaneInput>,
    max_chunk: usize,
    chunk: &mut Vec<PoolLaneInput>,
) -> Result<(), PoolLaneError> {
    while chunk.len() < max_chunk {
        match rx.try_recv() {
            Ok(input) => chunk.push(input),
            Err(mpsc::error::TryRecvError::Empty) => return Ok(()),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                if chunk.is_empty() {
                    return Err(PoolLaneError::ChannelClosed);
                }
                return Ok(());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        PoolLane, PoolLaneConfig, PoolLaneError, PoolLaneInput, PoolLaneStop,
        dequeue_request_chunk,
    };
    use crate::pool_lane::{PendingAdd, PendingList, PoolError};
    use crate::storage::{MemoryStore, PendingOperationStore, Storage, StorageError};
    use mempool_core::user_op::UserOperation;
    use std::path::PathBuf;
    use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
    use tokio::sync::{mpsc, oneshot};

    struct FailingStore;

    impl PendingOperationStore for FailingStore {
        fn upsert(&mut self, _op: UserOperation) -> Result<UserOperation, StorageError> {
            Err(StorageError::Sqlite(rusqlite::Error::InvalidQuery))
        }

        fn list_all(&mut self) -> Result<Vec<UserOperation>, StorageError> {
            Err(StorageError::Sqlite(rusqlite::Error::InvalidQuery))
        }
    }

    fn temp_db_path(name: &str) -> String {
        let mut path = std::env::temp_dir();
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        path.push(format!("mempool-pool-lane-{name}-{unique}.sqlite"));
        path_to_string(path)
    }

    fn path_to_string(path: PathBuf) -> String {
        path.to_string_lossy().into_owned()
    }

    fn default_test_config() -> PoolLaneConfig {
        PoolLaneConfig {
            max_requests_per_chunk: 16,
            idle_poll_interval: Duration::from_millis(2),
        }
    }

    fn start_lane<S: PendingOperationStore + 'static>(
        store: S,
    ) -> (
        mpsc::Sender<PoolLaneInput>,
        PoolLaneStop,
        tokio::task::JoinHandle<PoolLaneError>,
    ) {
        let (tx, rx) = mpsc::channel::<PoolLaneInput>(128);
        let lane = PoolLane::new(rx, store, default_test_config());
        let (handle, stop) = lane.spawn();
        (tx, stop, handle)
    }

    fn make_pending_add(
        user_operation: UserOperation,
    ) -> (
        PoolLaneInput,
        oneshot::Receiver<Result<UserOperation, PoolError>>,
    ) {
        let (respond_to, recv) = oneshot::channel();
        (
            PoolLaneInput::Add(PendingAdd {
                user_operation,
                respond_to,
                received_at: Instant::now(),
            }),
            recv,
        )
    }

    async fn add(
        tx: &mpsc::Sender<PoolLaneInput>,
        user_operation: UserOperation,
    ) -> Result<UserOperation, PoolError> {
        let (input, recv) = make_pending_add(user_operation);
        tx.send(input).await.expect("send add request");
        tokio::time::timeout(Duration::from_secs(2), recv)
            .await
            .expect("wait for add response")
            .expect("add response channel open")
    }

    async fn list(tx: &mpsc::Sender<PoolLaneInput>) -> Result<Vec<UserOperation>, PoolError> {
        let (respond_to, recv) = oneshot::channel();
        tx.send(PoolLaneInput::List(PendingList { respond_to }))
            .await
            .expect("send list request");
        tokio::time::timeout(Duration::from_secs(2), recv)
            .await
            .expect("wait for list response")
            .expect("list response channel open")
    }

    async fn shutdown_lane(stop: &PoolLaneStop, handle: tokio::task::JoinHandle<PoolLaneError>) {
        stop.request_shutdown();
        let joined = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("wait for lane shutdown");
        let err = joined.expect("join lane task");
        assert!(matches!(err, PoolLaneError::ShutdownRequested));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn add_is_acknowledged_after_store_commit() {
        let db_path = temp_db_path("ack-after-commit");
        let storage = Storage::open(&db_path, "NORMAL").expect("open storage");
        let (tx, lane_stop, lane_handle) = start_lane(storage);

        let op = UserOperation::new("0xaa", "0x01", "0xc0de");
        let ack = add(&tx, op.clone()).await.expect("add succeeds");
        let mut reader = Storage::open(&db_path, "NORMAL").expect("open reader");
        let persisted = reader.list_all().expect("list persisted");
        shutdown_lane(&lane_stop, lane_handle).await;

        assert_eq!(ack, op);
        assert_eq!(persisted, vec![op]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_adds_for_one_sender_leave_one_record() {
        let (tx, lane_stop, lane_handle) = start_lane(MemoryStore::new());

        let mut tasks = Vec::new();
        for round in 0..32_u8 {
            let tx = tx.clone();
            tasks.push(tokio::spawn(async move {
                add(&tx, UserOperation::new("0xfeed", format!("0x{round:02x}"), ""))
                    .await
                    .expect("add succeeds")
            }));
        }
        for task in tasks {
            task.await.expect("join add task");
        }

        let all = list(&tx).await.expect("list succeeds");
        shutdown_lane(&lane_stop, lane_handle).await;

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].sender, "0xfeed");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn store_faults_are_returned_and_lane_keeps_serving() {
        let (tx, lane_stop, lane_handle) = start_lane(FailingStore);

        let first = add(&tx, UserOperation::new("0xaa", "0x01", "")).await;
        let second = list(&tx).await;
        shutdown_lane(&lane_stop, lane_handle).await;

        assert!(matches!(first, Err(PoolError::Storage(_))));
        assert!(matches!(second, Err(PoolError::Storage(_))));
    }

    #[test]
    fn dequeue_returns_channel_closed_when_disconnected() {
        let (tx, mut rx) = mpsc::channel::<PoolLaneInput>(1);
        drop(tx);
        let mut chunk = Vec::new();

        let err = dequeue_request_chunk(&mut rx, 1, &mut chunk).unwrap_err();
        assert!(matches!(err, PoolLaneError::ChannelClosed));
    }

    #[test]
    fn dequeue_flushes_queued_requests_before_observing_disconnect() {
        let (tx, mut rx) = mpsc::channel::<PoolLaneInput>(2);
        let (input, _recv) = make_pending_add(UserOperation::new("0xaa", "0x01", ""));
        tx.blocking_send(input).expect("enqueue add request");
        drop(tx);

        let mut chunk = Vec::new();
        dequeue_request_chunk(&mut rx, 16, &mut chunk)
            .expect("should hand out queued requests before disconnect");
        assert_eq!(chunk.len(), 1);
    }

    #[test]
    fn dequeue_respects_chunk_limit() {
        let (tx, mut rx) = mpsc::channel::<PoolLaneInput>(8);
        for seed in 0..5_u8 {
            let (input, _recv) =
                make_pending_add(UserOperation::new(format!("0x{seed:02x}"), "0x00", ""));
            tx.blocking_send(input).expect("enqueue add request");
        }

        let mut chunk = Vec::new();
        dequeue_request_chunk(&mut rx, 3, &mut chunk).expect("dequeue first chunk");
        assert_eq!(chunk.len(), 3);
    }
}
