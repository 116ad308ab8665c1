//! Single-flight in-memory dataset cache
//!
//! [`DataCache`] memoizes the materialized record collection and collapses
//! concurrent first-load requests into one [`IngestPipeline`] run: every
//! caller that arrives while the load is in flight awaits the same shared
//! handle and resolves with the same result or error.
//!
//! The cache is an explicitly constructed component with no global state;
//! construct one at process start and share it by reference (or `Arc`).
//!
//! State machine: `Empty` -> first `get_data` -> `Loading` -> `Loaded` on
//! success, back to `Empty` on failure. `invalidate` returns any state to
//! `Empty`. A load that completes after a mid-flight `invalidate` is
//! discarded rather than adopted; its awaiting callers still receive the
//! result they were promised.

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::pipeline::IngestPipeline;
use crate::record::ExportRecord;
use crate::status::{LoadingStatus, StatusCell};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info};

type LoadResult = Result<Arc<Vec<ExportRecord>>, CacheError>;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

enum CacheState {
    Empty,
    Loading(SharedLoad),
    Loaded(Arc<Vec<ExportRecord>>),
}

struct CacheInner {
    state: CacheState,
    /// Bumped by `invalidate`; a finishing load only publishes its result
    /// into the cache if the epoch it started under is still current.
    epoch: u64,
}

/// Process-wide dataset cache with single-flight loading
pub struct DataCache {
    config: CacheConfig,
    inner: Arc<Mutex<CacheInner>>,
    status: StatusCell,
}

impl DataCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Arc::new(Mutex::new(CacheInner {
                state: CacheState::Empty,
                epoch: 0,
            })),
            status: StatusCell::new(),
        }
    }

    /// Construct from environment configuration
    pub fn from_env() -> Self {
        Self::new(CacheConfig::from_env())
    }

    /// The configuration this cache was built with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The materialized collection, loading it on first use.
    ///
    /// Already materialized: returns immediately with no I/O. Load in
    /// flight: awaits that same load. Otherwise starts exactly one pipeline
    /// run, no matter how many callers arrive concurrently. A failed run
    /// caches nothing, so the next call retries from scratch.
    pub async fn get_data(&self) -> LoadResult {
        let shared = {
            let mut inner = lock(&self.inner);
            match &inner.state {
                CacheState::Loaded(data) => return Ok(Arc::clone(data)),
                CacheState::Loading(shared) => {
                    debug!("dataset load already in flight; awaiting it");
                    shared.clone()
                },
                CacheState::Empty => {
                    let shared = self.start_load(inner.epoch);
                    inner.state = CacheState::Loading(shared.clone());
                    shared
                },
            }
        };

        shared.await
    }

    /// Non-blocking copy of the current load telemetry; safe to poll from
    /// any number of tasks.
    pub fn loading_status(&self) -> LoadingStatus {
        self.status.snapshot()
    }

    /// Whether the collection is currently materialized
    pub fn is_loaded(&self) -> bool {
        matches!(lock(&self.inner).state, CacheState::Loaded(_))
    }

    /// Drop the materialized collection and reset telemetry.
    ///
    /// Does not cancel an in-flight load, but bumps the epoch so that such
    /// a load's result is discarded once it lands.
    pub fn invalidate(&self) {
        {
            let mut inner = lock(&self.inner);
            inner.epoch += 1;
            inner.state = CacheState::Empty;
        }
        self.status.reset();
        info!("dataset cache invalidated");
    }

    /// Spawn the pipeline run and return the shared handle callers await.
    ///
    /// The run executes on its own task so it makes progress even if every
    /// caller goes away; the task publishes the state transition and then
    /// broadcasts the result to waiters.
    fn start_load(&self, epoch: u64) -> SharedLoad {
        let pipeline = IngestPipeline::new(self.config.clone(), self.status.clone());
        let inner = Arc::clone(&self.inner);
        let (tx, rx) = oneshot::channel::<LoadResult>();

        tokio::spawn(async move {
            let result = pipeline.run().await.map(|outcome| Arc::new(outcome.records));

            {
                let mut guard = lock(&inner);
                if guard.epoch == epoch {
                    guard.state = match &result {
                        Ok(data) => {
                            info!(records = data.len(), "dataset cache populated");
                            CacheState::Loaded(Arc::clone(data))
                        },
                        // Nothing is cached on failure; the next call retries.
                        Err(_) => CacheState::Empty,
                    };
                } else {
                    debug!("cache invalidated mid-flight; discarding load result");
                }
            }

            let _ = tx.send(result);
        });

        async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(CacheError::Internal(
                    "load task dropped before completing".to_string(),
                )),
            }
        }
        .boxed()
        .shared()
    }
}

fn lock(inner: &Mutex<CacheInner>) -> std::sync::MutexGuard<'_, CacheInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
