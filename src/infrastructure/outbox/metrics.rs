use crate::domain::entities::{CycleEnd, DrainReport};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{LazyLock, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CycleEndKind {
    Exhausted,
    Aborted,
    Errored,
}

impl From<&CycleEnd> for CycleEndKind {
    fn from(end: &CycleEnd) -> Self {
        match end {
            CycleEnd::Exhausted => CycleEndKind::Exhausted,
            CycleEnd::Aborted { .. } => CycleEndKind::Aborted,
            CycleEnd::Errored { .. } => CycleEndKind::Errored,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrainMetricsSnapshot {
    pub total_cycles: u64,
    pub total_attempted: u64,
    pub total_succeeded: u64,
    pub total_failed: u64,
    pub total_aborted: u64,
    pub consecutive_aborted: u64,
    pub last_end: Option<CycleEndKind>,
    pub last_duration_ms: Option<u64>,
    pub last_cycle_ms: Option<u64>,
}

#[derive(Default, Clone)]
struct LastCycle {
    end: Option<CycleEndKind>,
    duration_ms: Option<u64>,
}

struct DrainMetrics {
    cycles: AtomicU64,
    attempted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    aborted: AtomicU64,
    consecutive_aborted: AtomicU64,
    last_cycle_ms: AtomicU64,
    last: Mutex<LastCycle>,
}

impl DrainMetrics {
    fn new() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            attempted: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            aborted: AtomicU64::new(0),
            consecutive_aborted: AtomicU64::new(0),
            last_cycle_ms: AtomicU64::new(0),
            last: Mutex::new(LastCycle::default()),
        }
    }

    fn record(&self, report: &DrainReport) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.attempted
            .fetch_add(u64::from(report.attempted), Ordering::Relaxed);
        self.succeeded
            .fetch_add(u64::from(report.succeeded), Ordering::Relaxed);
        self.failed
            .fetch_add(u64::from(report.failed), Ordering::Relaxed);
        self.last_cycle_ms.store(current_unix_ms(), Ordering::Relaxed);

        if report.is_aborted() {
            self.aborted.fetch_add(1, Ordering::Relaxed);
            self.consecutive_aborted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.consecutive_aborted.store(0, Ordering::Relaxed);
        }

        if let Ok(mut guard) = self.last.lock() {
            guard.end = Some(CycleEndKind::from(&report.end));
            guard.duration_ms = Some(report.duration_ms);
        }
    }

    fn snapshot(&self) -> DrainMetricsSnapshot {
        let last = self
            .last
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        DrainMetricsSnapshot {
            total_cycles: self.cycles.load(Ordering::Relaxed),
            total_attempted: self.attempted.load(Ordering::Relaxed),
            total_succeeded: self.succeeded.load(Ordering::Relaxed),
            total_failed: self.failed.load(Ordering::Relaxed),
            total_aborted: self.aborted.load(Ordering::Relaxed),
            consecutive_aborted: self.consecutive_aborted.load(Ordering::Relaxed),
            last_end: last.end,
            last_duration_ms: last.duration_ms,
            last_cycle_ms: to_option(self.last_cycle_ms.load(Ordering::Relaxed)),
        }
    }
}

fn to_option(value: u64) -> Option<u64> {
    if value == 0 { None } else { Some(value) }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

static DRAIN_METRICS: LazyLock<DrainMetrics> = LazyLock::new(DrainMetrics::new);

pub fn record_cycle(report: &DrainReport) -> DrainMetricsSnapshot {
    DRAIN_METRICS.record(report);
    DRAIN_METRICS.snapshot()
}

pub fn snapshot() -> DrainMetricsSnapshot {
    DRAIN_METRICS.snapshot()
}
