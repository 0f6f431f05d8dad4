//! Engine lifecycle: owns every periodic task as one start/stop unit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use feewatch_chain::{ChainConnection, FeeSource};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::network::NetworkKey;
use crate::oracle::PriceOracle;
use crate::sampler::GasSampler;
use crate::store::{GasStore, Snapshot};

/// Orchestrates connections, samplers, and the price oracle.
///
/// `start` spawns one fee loop and one history loop per connected network
/// plus the two oracle channels; `stop` cancels them all and waits for
/// them to finish, so no store write happens after it returns.
pub struct Engine {
    config: EngineConfig,
    store: Arc<GasStore>,
    /// Lifecycle lock. `start` holds it across the whole spawn phase and
    /// registers every handle under it, so a concurrent `stop` waits for
    /// the in-flight `start` and then aborts everything it spawned.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl Engine {
    pub fn new(config: EngineConfig, store: Arc<GasStore>) -> Self {
        Self {
            config,
            store,
            tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Shared store handle.
    pub fn store(&self) -> &Arc<GasStore> {
        &self.store
    }

    /// Consumer-facing snapshot passthrough.
    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Connect every configured network and spawn all loops.
    ///
    /// A connection failure isolates that network; the others still
    /// start. Only configuration errors (a malformed pool address) are
    /// fatal. Calling `start` on a running engine is a warning no-op.
    pub async fn start(&self) -> Result<()> {
        let pool = self.config.pool.pool_address()?;

        let mut tasks = self.tasks.lock().await;
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Engine already started");
            return Ok(());
        }
        let timing = self.config.timing.clone();

        let mut primary_conn: Option<ChainConnection> = None;

        for endpoint in &self.config.endpoints {
            let network = endpoint.network;
            let conn = match ChainConnection::connect(network.name(), &endpoint.ws_url).await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(network = %network, error = %e, "Connection failed, network disabled");
                    continue;
                }
            };

            if network == NetworkKey::Ethereum {
                primary_conn = Some(conn.clone());
            }

            let source: Arc<dyn FeeSource> = Arc::new(conn);
            let sampler = Arc::new(GasSampler::new(network, source, self.store.clone()));

            // Immediate fetch so consumers see data before the first tick.
            sampler.sample_once().await;

            tasks.push(spawn_loop(timing.fee_poll(), {
                let sampler = sampler.clone();
                move || {
                    let sampler = sampler.clone();
                    async move { sampler.sample_once().await }
                }
            }));
            tasks.push(spawn_loop(timing.history(), {
                let sampler = sampler.clone();
                move || {
                    let sampler = sampler.clone();
                    async move { sampler.record_history_point().await }
                }
            }));

            info!(network = %network, "Sampling loops started");
        }

        match primary_conn {
            Some(conn) => {
                let oracle = Arc::new(PriceOracle::new(
                    conn,
                    pool,
                    self.config.pool.lookback_blocks,
                    timing.resubscribe_delay(),
                    self.store.clone(),
                ));

                oracle.scan_once().await;

                tasks.push(tokio::spawn({
                    let oracle = oracle.clone();
                    async move { oracle.run_subscription().await }
                }));
                tasks.push(spawn_loop(timing.price_scan(), {
                    let oracle = oracle.clone();
                    move || {
                        let oracle = oracle.clone();
                        async move { oracle.scan_once().await }
                    }
                }));

                info!(pool = %pool, "Price oracle started");
            }
            None => {
                warn!("No primary network connection, price oracle disabled");
            }
        }

        info!(tasks = tasks.len(), "Engine started");
        Ok(())
    }

    /// Cancel every task and wait for it to wind down.
    ///
    /// Idempotent, and safe to call before `start` or while a `start` is
    /// still in flight: the lifecycle lock makes this wait for the spawn
    /// phase, so every registered task gets aborted. Once this returns,
    /// no task can write to the store.
    pub async fn stop(&self) {
        let mut tasks = self.tasks.lock().await;
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *tasks);
        for handle in &handles {
            handle.abort();
        }
        let count = handles.len();
        for handle in handles {
            // Cancelled tasks resolve with a JoinError; either outcome
            // means the task can no longer write.
            let _ = handle.await;
        }
        self.started.store(false, Ordering::SeqCst);
        info!(stopped = count, "Engine stopped");
    }
}

/// Spawn a periodic loop. The first interval tick fires immediately and
/// is consumed up front; callers do their own immediate work before
/// spawning.
fn spawn_loop<F, Fut>(period: Duration, mut tick_fn: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            tick_fn().await;
        }
    })
}
