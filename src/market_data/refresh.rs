use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use utoipa::ToSchema;

use super::indices::{IndexSpec, MARKET_INDICES};
use super::source::{FetchOutcome, QuoteSource};
use crate::models::{QuoteUpdate, StockData};
use crate::storage::QuoteStore;
use crate::websocket::Broadcaster;

/// Refresh loop phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
    Idle,
    Fetching,
    Applying,
}

/// Summary of one tick
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub indices_updated: usize,
    pub stocks_updated: usize,
    /// Updates handed to the broadcaster (stocks whose price actually moved)
    pub published: usize,
    /// Symbols served from synthetic data this tick
    pub fallbacks: usize,
    /// Stocks untracked between fetch and apply
    pub skipped: usize,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    pub state: RefreshState,
    pub ticks: u64,
    pub interval_secs: u64,
    pub last_report: Option<RefreshReport>,
}

enum StockApply {
    Untracked,
    Unchanged,
    Published,
}

enum RefreshJob {
    Index(&'static IndexSpec),
    Stock(String),
}

/// Periodic re-fetch of indices and tracked stocks
///
/// Ticks run `Idle -> Fetching -> Applying -> Idle`. Fetches go out with a
/// bounded worker count; the quote source always yields data, so one bad
/// symbol never aborts the tick for the others.
pub struct RefreshLoop {
    store: Arc<QuoteStore>,
    source: Arc<QuoteSource>,
    broadcaster: Broadcaster,
    interval: Duration,
    concurrency: usize,
    status: Mutex<RefreshStatus>,
}

impl RefreshLoop {
    pub fn new(
        store: Arc<QuoteStore>,
        source: Arc<QuoteSource>,
        broadcaster: Broadcaster,
        interval: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            source,
            broadcaster,
            interval,
            concurrency: concurrency.max(1),
            status: Mutex::new(RefreshStatus {
                state: RefreshState::Idle,
                ticks: 0,
                interval_secs: interval.as_secs(),
                last_report: None,
            }),
        }
    }

    pub fn status(&self) -> RefreshStatus {
        self.status.lock().clone()
    }

    fn set_state(&self, state: RefreshState) {
        self.status.lock().state = state;
    }

    /// Run a single refresh pass
    pub async fn tick(&self) -> RefreshReport {
        self.set_state(RefreshState::Fetching);

        let jobs: Vec<RefreshJob> = MARKET_INDICES
            .iter()
            .map(RefreshJob::Index)
            .chain(
                self.store
                    .tracked_symbols()
                    .into_iter()
                    // Index symbols tracked as stocks share the index fetch
                    .filter(|symbol| !MARKET_INDICES.iter().any(|spec| spec.symbol == symbol))
                    .map(RefreshJob::Stock),
            )
            .collect();

        tracing::debug!("Refresh tick fetching {} symbols", jobs.len());

        let source = &self.source;
        let results: Vec<(RefreshJob, FetchOutcome)> = stream::iter(jobs)
            .map(|job| async move {
                let outcome = match &job {
                    RefreshJob::Index(spec) => source.fetch_index(spec).await,
                    RefreshJob::Stock(symbol) => source.fetch(symbol).await,
                };
                (job, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        self.set_state(RefreshState::Applying);
        let report = self.apply(results);

        {
            let mut status = self.status.lock();
            status.state = RefreshState::Idle;
            status.ticks += 1;
            status.last_report = Some(report.clone());
        }

        tracing::info!(
            "Refresh tick done: {} indices, {} stocks, {} published, {} fallbacks, {} skipped",
            report.indices_updated,
            report.stocks_updated,
            report.published,
            report.fallbacks,
            report.skipped
        );
        report
    }

    fn apply(&self, results: Vec<(RefreshJob, FetchOutcome)>) -> RefreshReport {
        let mut indices_updated = 0;
        let mut stocks_updated = 0;
        let mut published = 0;
        let mut fallbacks = 0;
        let mut skipped = 0;

        for (job, outcome) in results {
            if outcome.is_fallback() {
                fallbacks += 1;
            }
            let data = outcome.into_data();

            let (symbol, from_stock_job) = match job {
                RefreshJob::Index(spec) => {
                    self.store.upsert_index(spec.name, &data);
                    indices_updated += 1;
                    (spec.symbol.to_string(), false)
                }
                RefreshJob::Stock(symbol) => (symbol, true),
            };

            match self.apply_stock(&symbol, &data) {
                StockApply::Untracked if from_stock_job => {
                    tracing::debug!("{} no longer tracked, skipping", symbol);
                    skipped += 1;
                }
                StockApply::Untracked => {}
                StockApply::Unchanged => stocks_updated += 1,
                StockApply::Published => {
                    stocks_updated += 1;
                    published += 1;
                }
            }
        }

        RefreshReport {
            indices_updated,
            stocks_updated,
            published,
            fallbacks,
            skipped,
            finished_at: Utc::now(),
        }
    }

    /// Write fetched data over a tracked stock and publish if the price moved
    fn apply_stock(&self, symbol: &str, data: &StockData) -> StockApply {
        let Some(previous) = self.store.update_quote(symbol, data) else {
            return StockApply::Untracked;
        };
        if !previous.price_differs(data.price, data.change_amount, data.change_percent) {
            return StockApply::Unchanged;
        }

        let mut update = QuoteUpdate::from(data);
        update.symbol = previous.symbol;
        self.broadcaster.publish(&update);
        StockApply::Published
    }

    /// Spawn the loop; the first tick runs immediately
    pub fn spawn(self: Arc<Self>) -> RefreshHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let refresh = Arc::clone(&self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(refresh.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(
                "Refresh loop started (every {}s, {} workers)",
                refresh.interval.as_secs(),
                refresh.concurrency
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        refresh.tick().await;
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }

            tracing::info!("Refresh loop stopped");
        });

        RefreshHandle {
            shutdown: shutdown_tx,
            handle,
        }
    }
}

/// Handle to the spawned refresh task
pub struct RefreshHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RefreshHandle {
    /// Stop after the current tick and wait for the task to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!("Refresh loop task failed: {}", e);
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}
