use crate::error::MonitorError;
use crate::state::{MonitorRunningState, MonitorStatus};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use token_radar_core::{
    native::FileStorage, BondedQuery, BondedSnapshot, BondingEvent, CoreError, MonitorMetrics,
    Settings, TokenPipeline, TokenStore,
};

const STOP_GRACE: Duration = Duration::from_secs(5);

struct MonitorControl {
    state: MonitorRunningState,
    started_at: Option<DateTime<Utc>>,
    stop_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

/// Background poller that announces tokens the first time they show up
/// bonded. At most one poll loop runs per monitor.
pub struct BondingMonitor {
    pipeline: Arc<TokenPipeline>,
    storage: Arc<FileStorage>,
    store: TokenStore<FileStorage>,
    snapshot: Mutex<BondedSnapshot>,
    events: Mutex<VecDeque<BondingEvent>>,
    metrics: MonitorMetrics,
    control: Mutex<MonitorControl>,
    interval: Duration,
    fetch_limit: usize,
    max_events: usize,
    snapshot_capacity: usize,
}

impl BondingMonitor {
    /// Loads the persisted snapshot; the monitor starts stopped.
    pub async fn new(
        pipeline: Arc<TokenPipeline>,
        storage: Arc<FileStorage>,
        settings: &Settings,
    ) -> Result<Arc<Self>, CoreError> {
        let snapshot = BondedSnapshot::load(storage.as_ref()).await?;
        info!(
            "Loaded bonded snapshot with {} mints from {:?}",
            snapshot.len(),
            storage.base_dir()
        );
        Ok(Arc::new(Self {
            pipeline,
            store: TokenStore::new(storage.clone(), settings.snapshot_capacity),
            storage,
            snapshot: Mutex::new(snapshot),
            events: Mutex::new(VecDeque::with_capacity(settings.max_recent_events)),
            metrics: MonitorMetrics::new(),
            control: Mutex::new(MonitorControl {
                state: MonitorRunningState::Stopped,
                started_at: None,
                stop_tx: None,
                handle: None,
            }),
            interval: Duration::from_secs(settings.monitor_interval_secs.max(1)),
            fetch_limit: settings.upstream_fetch_limit,
            max_events: settings.max_recent_events,
            snapshot_capacity: settings.snapshot_capacity,
        }))
    }

    pub async fn start(self: &Arc<Self>) -> Result<(), MonitorError> {
        let mut control = self.control.lock().await;
        match control.state {
            MonitorRunningState::Stopped => {}
            MonitorRunningState::Running => {
                warn!("Attempted to start bonding monitor while running");
                return Err(MonitorError::AlreadyRunning);
            }
            MonitorRunningState::Stopping => {
                warn!("Attempted to start bonding monitor while stopping");
                return Err(MonitorError::Stopping);
            }
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let monitor = Arc::clone(self);
        control.handle = Some(tokio::spawn(async move { monitor.run(stop_rx).await }));
        control.stop_tx = Some(stop_tx);
        control.state = MonitorRunningState::Running;
        control.started_at = Some(Utc::now());
        info!("Bonding monitor started (interval {}s)", self.interval.as_secs());
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), MonitorError> {
        let handle = self.begin_stop().await?;
        self.finish_stop(handle).await;
        Ok(())
    }

    /// Signal the loop and move to `Stopping`. The control lock is released
    /// before anyone waits on the task.
    async fn begin_stop(&self) -> Result<Option<JoinHandle<()>>, MonitorError> {
        let mut control = self.control.lock().await;
        if control.state != MonitorRunningState::Running {
            warn!("Attempted to stop bonding monitor while {}", control.state.as_str());
            return Err(MonitorError::NotRunning);
        }

        if let Some(stop_tx) = control.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        control.state = MonitorRunningState::Stopping;
        Ok(control.handle.take())
    }

    async fn finish_stop(&self, handle: Option<JoinHandle<()>>) {
        if let Some(mut handle) = handle {
            if tokio::time::timeout(STOP_GRACE, &mut handle).await.is_err() {
                warn!("Bonding monitor did not stop within {:?}, aborting", STOP_GRACE);
                handle.abort();
            }
        }
        let mut control = self.control.lock().await;
        control.state = MonitorRunningState::Stopped;
        control.started_at = None;
        info!("Bonding monitor stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.control.lock().await.state == MonitorRunningState::Running
    }

    pub async fn status(&self) -> MonitorStatus {
        let (state, started_at) = {
            let control = self.control.lock().await;
            (control.state, control.started_at)
        };
        let stored_bonded = match self.store.len().await {
            Ok(n) => n,
            Err(e) => {
                warn!("Failed to read bonded token store: {}", e);
                0
            }
        };
        let metrics = self.metrics.snapshot();
        MonitorStatus {
            state,
            started_at,
            interval_secs: self.interval.as_secs(),
            failure_rate_percent: metrics.failure_rate_percent(),
            metrics,
            known_bonded: self.snapshot.lock().await.len(),
            stored_bonded,
            recent_events: self.events.lock().await.iter().cloned().collect(),
        }
    }

    async fn run(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                result = self.poll_once() => match result {
                    Err(e) if e.is_upstream() => warn!("Bonding poll failed upstream: {}", e),
                    Err(e) => error!("Bonding poll failed: {}", e),
                    Ok(_) => {}
                }
            }
        }
        debug!("Bonding monitor loop exited");
    }

    /// One fetch-and-diff pass. Returns the newly bonded tokens.
    pub async fn poll_once(&self) -> Result<Vec<BondingEvent>, CoreError> {
        let now = Utc::now();
        let query = BondedQuery {
            limit: self.fetch_limit,
            ..Default::default()
        };
        let tokens = match self.pipeline.bonded_tokens(&query).await {
            Ok(tokens) => tokens,
            Err(e) => {
                self.metrics.record_failure(now);
                return Err(e);
            }
        };

        // Nothing is committed in memory until both writes have landed.
        let mut snapshot = self.snapshot.lock().await;
        let mut next = snapshot.clone();
        let new_events = next.observe(&tokens, now, self.snapshot_capacity);

        let persisted: Result<(), CoreError> = async {
            self.store.upsert_all(&tokens, now).await?;
            next.save(self.storage.as_ref()).await
        }
        .await;
        if let Err(e) = persisted {
            self.metrics.record_failure(now);
            return Err(e);
        }
        *snapshot = next;
        drop(snapshot);

        if !new_events.is_empty() {
            let mut events = self.events.lock().await;
            for event in &new_events {
                info!(
                    "Newly bonded: {} ({}) mcap ${:.0}",
                    event.symbol.as_deref().unwrap_or("?"),
                    event.mint,
                    event.usd_market_cap
                );
                events.push_front(event.clone());
            }
            events.truncate(self.max_events);
        }

        self.metrics.record_success(tokens.len(), new_events.len(), now);
        debug!("Bonding poll: {} bonded, {} new", tokens.len(), new_events.len());
        Ok(new_events)
    }
}
