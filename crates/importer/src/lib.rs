//! Hourly snapshot acquisition: one request per hour, joined into a constellation.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use tracker_config::{FeedConfig, JoinPolicyConfig};
use tracker_core::{Constellation, EntityId, Hour, Position, Snapshot, TrajectoryEntry};

mod source;

pub use source::{HttpSnapshotSource, SnapshotSource};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("network error fetching hour {hour}: {source}")]
    Network {
        hour: Hour,
        #[source]
        source: reqwest::Error,
    },
    #[error("hour {hour} answered with HTTP status {status}")]
    Status { hour: Hour, status: u16 },
    #[error("hour {hour} returned a malformed snapshot: {source}")]
    Parse {
        hour: Hour,
        #[source]
        source: serde_json::Error,
    },
    #[error("hour {hour} did not answer within {after:?}")]
    Timeout { hour: Hour, after: Duration },
    #[error("fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("fetch generation {generation} superseded by generation {latest}")]
    Superseded { generation: u64, latest: u64 },
}

impl FetchError {
    /// Hour the failure belongs to, when it is tied to a single request.
    pub fn hour(&self) -> Option<Hour> {
        match self {
            Self::Network { hour, .. }
            | Self::Status { hour, .. }
            | Self::Parse { hour, .. }
            | Self::Timeout { hour, .. } => Some(*hour),
            Self::Client(_) | Self::Task(_) | Self::Superseded { .. } => None,
        }
    }
}

/// How per-hour failures combine into the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinPolicy {
    /// Any failed hour fails the whole fetch.
    #[default]
    AllOrNothing,
    /// Keep the hours that succeeded and record the rest as gaps. Fails only
    /// when no hour succeeded.
    KeepSucceeded,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregatorOptions {
    pub join_policy: JoinPolicy,
    /// Per-request timeout; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl From<&FeedConfig> for AggregatorOptions {
    fn from(config: &FeedConfig) -> Self {
        Self {
            join_policy: match config.join_policy {
                JoinPolicyConfig::AllOrNothing => JoinPolicy::AllOrNothing,
                JoinPolicyConfig::KeepSucceeded => JoinPolicy::KeepSucceeded,
            },
            request_timeout: config
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Default)]
struct AggregateState {
    constellation: Option<Arc<Constellation>>,
    /// Generations started but not yet settled or abandoned.
    in_flight: BTreeSet<u64>,
    last_fetch: Option<DateTime<Utc>>,
    committed_generation: u64,
}

/// Fetches all hours of the window concurrently and holds the latest
/// committed constellation.
///
/// The visible constellation is only ever replaced wholesale. A failed fetch
/// leaves it untouched, and a fetch that was overtaken by a newer call
/// discards its result instead of committing it. A call whose future is
/// dropped before it settles no longer counts as newer.
pub struct SnapshotAggregator<S> {
    source: Arc<S>,
    options: AggregatorOptions,
    issued: AtomicU64,
    state: RwLock<AggregateState>,
}

impl SnapshotAggregator<HttpSnapshotSource> {
    /// Aggregator over the HTTP position feed described by `config`.
    pub fn from_config(config: &FeedConfig) -> Result<Self, FetchError> {
        let source = HttpSnapshotSource::new(config.base_url.clone())?;
        Ok(Self::new(source, AggregatorOptions::from(config)))
    }
}

impl<S: SnapshotSource> SnapshotAggregator<S> {
    pub fn new(source: S, options: AggregatorOptions) -> Self {
        Self {
            source: Arc::new(source),
            options,
            issued: AtomicU64::new(0),
            state: RwLock::new(AggregateState::default()),
        }
    }

    pub fn options(&self) -> AggregatorOptions {
        self.options
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch every hour concurrently and commit the joined constellation.
    pub async fn fetch_all(&self) -> Result<Arc<Constellation>, FetchError> {
        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.write().in_flight.insert(generation);
        let _guard = InFlight {
            state: &self.state,
            generation,
        };
        let outcome = self.join_hours().await;
        self.settle(generation, outcome)
    }

    /// Same as [`Self::fetch_all`]; overlapping calls are resolved by
    /// generation, the most recently issued call that was not abandoned wins.
    pub async fn refetch(&self) -> Result<Arc<Constellation>, FetchError> {
        self.fetch_all().await
    }

    /// Latest committed constellation, if any fetch has succeeded.
    pub fn constellation(&self) -> Option<Arc<Constellation>> {
        self.state.read().constellation.clone()
    }

    /// True while a fetch newer than the committed constellation is running.
    pub fn is_loading(&self) -> bool {
        let state = self.state.read();
        state
            .in_flight
            .last()
            .is_some_and(|newest| *newest > state.committed_generation)
    }

    /// Time of the last successful commit.
    pub fn last_fetch(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_fetch
    }

    /// Generation of the committed constellation (0 before the first commit).
    pub fn committed_generation(&self) -> u64 {
        self.state.read().committed_generation
    }

    /// Trajectory of `id` over the committed constellation; empty before the
    /// first commit.
    pub fn trajectory(&self, id: EntityId) -> Vec<TrajectoryEntry> {
        self.constellation()
            .map(|c| c.trajectory(id))
            .unwrap_or_default()
    }

    /// Positions at the reference hour, or empty when unavailable.
    pub fn current_positions(&self) -> Snapshot {
        self.positions_at(Hour::REFERENCE)
    }

    pub fn positions_at(&self, hour: Hour) -> Snapshot {
        let positions: Vec<Position> = self
            .constellation()
            .map(|c| c.positions_at(hour).to_vec())
            .unwrap_or_default();
        Snapshot::new(positions)
    }

    async fn join_hours(&self) -> Result<Constellation, FetchError> {
        let mut tasks = JoinSet::new();
        for hour in Hour::all() {
            let source = Arc::clone(&self.source);
            let timeout = self.options.request_timeout;
            tasks.spawn(async move { (hour, fetch_one(source.as_ref(), hour, timeout).await) });
        }

        let mut snapshots = Vec::new();
        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (hour, result) = joined?;
            match result {
                Ok(snapshot) => {
                    debug!(hour = %hour, entities = snapshot.len(), "hour fetched");
                    snapshots.push((hour, snapshot));
                }
                Err(err) => match self.options.join_policy {
                    JoinPolicy::AllOrNothing => return Err(err),
                    JoinPolicy::KeepSucceeded => {
                        warn!(hour = %hour, error = %err, "hour failed, keeping as gap");
                        failures.push((hour, err));
                    }
                },
            }
        }

        if snapshots.is_empty() {
            if let Some((_, err)) = failures.into_iter().min_by_key(|(hour, _)| *hour) {
                return Err(err);
            }
            return Ok(Constellation::default());
        }

        let gaps: Vec<Hour> = failures.iter().map(|(hour, _)| *hour).collect();
        let constellation = Constellation::from_hours(snapshots).with_gaps(gaps);
        let expected = constellation.entity_count();
        for (hour, len) in constellation.length_mismatches() {
            warn!(
                hour = %hour,
                entities = len,
                expected,
                "snapshot length differs from earliest hour; positional identity may be misaligned"
            );
        }
        Ok(constellation)
    }

    fn settle(
        &self,
        generation: u64,
        outcome: Result<Constellation, FetchError>,
    ) -> Result<Arc<Constellation>, FetchError> {
        let mut state = self.state.write();
        state.in_flight.remove(&generation);

        let constellation = match outcome {
            Ok(constellation) => constellation,
            Err(err) => {
                warn!(generation, error = %err, "constellation fetch failed; keeping previous data");
                return Err(err);
            }
        };
        let latest = state
            .in_flight
            .last()
            .copied()
            .unwrap_or(0)
            .max(state.committed_generation);
        if latest > generation {
            warn!(generation, latest, "discarding superseded constellation fetch");
            return Err(FetchError::Superseded { generation, latest });
        }

        let constellation = Arc::new(constellation);
        info!(
            generation,
            hours = constellation.len(),
            gaps = constellation.gaps().count(),
            entities = constellation.entity_count(),
            "constellation loaded"
        );
        state.constellation = Some(Arc::clone(&constellation));
        state.last_fetch = Some(Utc::now());
        state.committed_generation = generation;
        Ok(constellation)
    }
}

/// Forgets a generation whose `fetch_all` future is dropped before settling.
struct InFlight<'a> {
    state: &'a RwLock<AggregateState>,
    generation: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.state.write().in_flight.remove(&self.generation) {
            debug!(generation = self.generation, "constellation fetch abandoned");
        }
    }
}

async fn fetch_one<S: SnapshotSource>(
    source: &S,
    hour: Hour,
    timeout: Option<Duration>,
) -> Result<Snapshot, FetchError> {
    match timeout {
        Some(after) => tokio::time::timeout(after, source.fetch_hour(hour))
            .await
            .map_err(|_| FetchError::Timeout { hour, after })?,
        None => source.fetch_hour(hour).await,
    }
}
