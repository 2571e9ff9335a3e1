use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use constellation_tracker::importer::{
    AggregatorOptions, FetchError, JoinPolicy, SnapshotAggregator, SnapshotSource,
};
use constellation_tracker::model::{EntityId, Hour, Position, Snapshot};
use tokio::sync::Semaphore;

/// Snapshot for `hour` with `count` entities; entity `i` sits at
/// (hour, i, 1000 * hour + i) so the origin of every position is visible.
fn snapshot_for(hour: Hour, count: usize) -> Snapshot {
    let h = f64::from(hour.value());
    Snapshot::new(
        (0..count)
            .map(|i| Position::new(h, i as f64, 1000.0 * h + i as f64))
            .collect(),
    )
}

/// Answers every hour after a delay that makes late hours finish first.
struct StaticSource {
    entities: Box<dyn Fn(Hour) -> usize + Send + Sync>,
    failing: Mutex<HashSet<u8>>,
    hanging: HashSet<u8>,
}

impl StaticSource {
    fn uniform(count: usize) -> Self {
        Self {
            entities: Box::new(move |_| count),
            failing: Mutex::new(HashSet::new()),
            hanging: HashSet::new(),
        }
    }

    fn fail_hours(&self, hours: &[u8]) {
        let mut failing = self.failing.lock().unwrap();
        failing.clear();
        failing.extend(hours.iter().copied());
    }
}

impl SnapshotSource for StaticSource {
    fn fetch_hour(&self, hour: Hour) -> impl Future<Output = Result<Snapshot, FetchError>> + Send {
        let fails = self.failing.lock().unwrap().contains(&hour.value());
        let hangs = self.hanging.contains(&hour.value());
        let snapshot = snapshot_for(hour, (self.entities)(hour));
        let delay = Duration::from_millis(u64::from(24 - hour.value()));
        async move {
            if hangs {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(delay).await;
            if fails {
                return Err(FetchError::Status { hour, status: 503 });
            }
            Ok(snapshot)
        }
    }
}

#[tokio::test]
async fn fetch_all_joins_every_hour_in_order() {
    let aggregator = SnapshotAggregator::new(StaticSource::uniform(3), AggregatorOptions::default());
    assert!(aggregator.constellation().is_none());
    assert!(aggregator.current_positions().is_empty());

    let constellation = aggregator.fetch_all().await.expect("all hours succeed");
    let hours: Vec<u8> = constellation.hours().map(Hour::value).collect();
    assert_eq!(hours, (0..24).collect::<Vec<u8>>());
    for (hour, snapshot) in constellation.iter() {
        assert_eq!(snapshot.positions()[0].lat, f64::from(hour.value()));
    }
    assert_eq!(constellation.gaps().count(), 0);
    assert!(constellation.length_mismatches().is_empty());

    assert!(!aggregator.is_loading());
    assert!(aggregator.last_fetch().is_some());
    assert_eq!(aggregator.committed_generation(), 1);
    assert_eq!(aggregator.current_positions(), snapshot_for(Hour::REFERENCE, 3));
}

#[tokio::test]
async fn any_failed_hour_keeps_previous_constellation() {
    let aggregator = SnapshotAggregator::new(StaticSource::uniform(2), AggregatorOptions::default());
    let first = aggregator.fetch_all().await.expect("initial fetch");
    let first_fetch = aggregator.last_fetch();

    aggregator.source().fail_hours(&[5]);
    let err = aggregator.refetch().await.expect_err("hour 5 fails");
    assert!(matches!(err, FetchError::Status { status: 503, .. }));
    assert_eq!(err.hour(), Hour::new(5));

    let visible = aggregator.constellation().expect("previous data retained");
    assert!(Arc::ptr_eq(&first, &visible));
    assert!(!aggregator.is_loading());
    assert_eq!(aggregator.last_fetch(), first_fetch);
    assert_eq!(aggregator.committed_generation(), 1);
}

#[tokio::test]
async fn failure_before_any_success_leaves_nothing_visible() {
    let source = StaticSource::uniform(2);
    source.fail_hours(&[0, 23]);
    let aggregator = SnapshotAggregator::new(source, AggregatorOptions::default());
    assert!(aggregator.fetch_all().await.is_err());
    assert!(aggregator.constellation().is_none());
    assert!(!aggregator.is_loading());
    assert!(aggregator.trajectory(EntityId(0)).is_empty());
}

#[tokio::test]
async fn keep_succeeded_records_gaps() {
    let source = StaticSource::uniform(2);
    source.fail_hours(&[3, 10]);
    let options = AggregatorOptions {
        join_policy: JoinPolicy::KeepSucceeded,
        request_timeout: None,
    };
    let aggregator = SnapshotAggregator::new(source, options);
    let constellation = aggregator.fetch_all().await.expect("partial result kept");

    assert_eq!(constellation.len(), 22);
    let gaps: Vec<u8> = constellation.gaps().map(Hour::value).collect();
    assert_eq!(gaps, vec![3, 10]);
    let trajectory = aggregator.trajectory(EntityId(1));
    assert_eq!(trajectory.len(), 22);
    assert!(trajectory.iter().all(|e| e.hour.value() != 3 && e.hour.value() != 10));
}

#[tokio::test]
async fn keep_succeeded_fails_when_nothing_succeeds() {
    let source = StaticSource::uniform(1);
    source.fail_hours(&(0..24).collect::<Vec<u8>>());
    let options = AggregatorOptions {
        join_policy: JoinPolicy::KeepSucceeded,
        request_timeout: None,
    };
    let aggregator = SnapshotAggregator::new(source, options);
    let err = aggregator.fetch_all().await.expect_err("no hour succeeded");
    assert_eq!(err.hour(), Hour::new(0));
    assert!(aggregator.constellation().is_none());
}

#[tokio::test]
async fn hung_request_times_out() {
    let source = StaticSource {
        hanging: [7].into_iter().collect(),
        ..StaticSource::uniform(1)
    };
    let options = AggregatorOptions {
        join_policy: JoinPolicy::AllOrNothing,
        request_timeout: Some(Duration::from_millis(100)),
    };
    let aggregator = SnapshotAggregator::new(source, options);
    match aggregator.fetch_all().await {
        Err(FetchError::Timeout { hour, after }) => {
            assert_eq!(hour.value(), 7);
            assert_eq!(after, Duration::from_millis(100));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn short_snapshots_yield_absent_trajectory_entries() {
    let source = StaticSource {
        entities: Box::new(|hour| usize::from(hour.value() % 3) + 1),
        ..StaticSource::uniform(0)
    };
    let aggregator = SnapshotAggregator::new(source, AggregatorOptions::default());
    let constellation = aggregator.fetch_all().await.expect("fetch");

    let trajectory = aggregator.trajectory(EntityId(2));
    assert_eq!(trajectory.len(), constellation.len());
    for entry in &trajectory {
        assert!(constellation.snapshot(entry.hour).is_some());
        if entry.hour.value() % 3 == 2 {
            let position = entry.position.expect("long snapshot holds entity 2");
            assert_eq!(position.lng, 2.0);
        } else {
            assert!(entry.position.is_none());
        }
    }
    assert!(aggregator.trajectory(EntityId(99)).iter().all(|e| e.position.is_none()));
    assert!(!constellation.length_mismatches().is_empty());
}

/// First 24 calls wait on a gate and answer with one entity; later calls
/// answer immediately with two, or never when `hang_later` is set.
struct GatedSource {
    calls: AtomicUsize,
    gate: Arc<Semaphore>,
    hang_later: bool,
}

impl GatedSource {
    fn new(gate: &Arc<Semaphore>, hang_later: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gate: Arc::clone(gate),
            hang_later,
        }
    }
}

impl SnapshotSource for GatedSource {
    fn fetch_hour(&self, hour: Hour) -> impl Future<Output = Result<Snapshot, FetchError>> + Send {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = (call < 24).then(|| Arc::clone(&self.gate));
        let hangs = call >= 24 && self.hang_later;
        let snapshot = snapshot_for(hour, if call < 24 { 1 } else { 2 });
        async move {
            if hangs {
                std::future::pending::<()>().await;
            }
            if let Some(gate) = gate {
                let _permit = gate.acquire_owned().await;
            }
            Ok(snapshot)
        }
    }
}

#[tokio::test]
async fn overtaken_fetch_does_not_commit() {
    let gate = Arc::new(Semaphore::new(0));
    let source = GatedSource::new(&gate, false);
    let aggregator = Arc::new(SnapshotAggregator::new(source, AggregatorOptions::default()));

    let slow = tokio::spawn({
        let aggregator = Arc::clone(&aggregator);
        async move { aggregator.fetch_all().await }
    });
    while aggregator.source().calls.load(Ordering::SeqCst) < 24 {
        tokio::task::yield_now().await;
    }
    assert!(aggregator.is_loading());

    let fast = aggregator.refetch().await.expect("latest fetch commits");
    assert_eq!(fast.entity_count(), 2);
    assert!(!aggregator.is_loading());

    gate.add_permits(24);
    let overtaken = slow.await.expect("task completes");
    assert!(matches!(
        overtaken,
        Err(FetchError::Superseded {
            generation: 1,
            latest: 2
        })
    ));

    let visible = aggregator.constellation().expect("committed");
    assert!(Arc::ptr_eq(&fast, &visible));
    assert_eq!(aggregator.committed_generation(), 2);
    assert!(!aggregator.is_loading());
}

#[tokio::test]
async fn dropped_fetch_clears_loading() {
    let source = StaticSource {
        hanging: (0..24).collect(),
        ..StaticSource::uniform(1)
    };
    let aggregator = SnapshotAggregator::new(source, AggregatorOptions::default());

    let abandoned = tokio::time::timeout(Duration::from_millis(50), aggregator.fetch_all()).await;
    assert!(abandoned.is_err());
    assert!(!aggregator.is_loading());
    assert!(aggregator.constellation().is_none());
    assert_eq!(aggregator.committed_generation(), 0);
}

#[tokio::test]
async fn dropped_refetch_does_not_supersede_earlier_fetch() {
    let gate = Arc::new(Semaphore::new(0));
    let source = GatedSource::new(&gate, true);
    let aggregator = Arc::new(SnapshotAggregator::new(source, AggregatorOptions::default()));

    let first = tokio::spawn({
        let aggregator = Arc::clone(&aggregator);
        async move { aggregator.fetch_all().await }
    });
    while aggregator.source().calls.load(Ordering::SeqCst) < 24 {
        tokio::task::yield_now().await;
    }

    let abandoned = tokio::time::timeout(Duration::from_millis(20), aggregator.refetch()).await;
    assert!(abandoned.is_err());
    // the first fetch is still running
    assert!(aggregator.is_loading());

    gate.add_permits(24);
    let committed = first
        .await
        .expect("task completes")
        .expect("earlier fetch commits once the newer call is gone");
    assert_eq!(committed.entity_count(), 1);
    assert_eq!(aggregator.committed_generation(), 1);
    assert!(!aggregator.is_loading());
    let visible = aggregator.constellation().expect("committed");
    assert!(Arc::ptr_eq(&committed, &visible));
}
