// SPDX-License-Identifier: Apache-2.0

//! Lightweight in-memory metrics.
//!
//! Process-wide counters and a per-source latency histogram. Recording is
//! lock-free on the hot path once a source has been seen.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;

/// Upper bounds (ms) of the connector latency histogram buckets.
pub const LATENCY_BUCKETS_MS: [u64; 8] = [1, 5, 10, 25, 50, 100, 250, 500];

#[derive(Default)]
struct QueryMetrics {
    total: AtomicU64,
    failed: AtomicU64,
    rate_limited: AtomicU64,
    duration_total_ms: AtomicU64,
    duration_max_ms: AtomicU64,
}

#[derive(Default)]
struct ConnectorMetrics {
    requests: AtomicU64,
    failures: AtomicU64,
    cache_hits: AtomicU64,
    /// One slot per bucket plus a trailing overflow slot.
    latency_buckets: [AtomicU64; LATENCY_BUCKETS_MS.len() + 1],
    latency_sum_ms: AtomicU64,
}

static QUERY_METRICS: OnceLock<QueryMetrics> = OnceLock::new();
static CONNECTOR_METRICS: OnceLock<RwLock<HashMap<String, Arc<ConnectorMetrics>>>> =
    OnceLock::new();

fn metrics() -> &'static QueryMetrics {
    QUERY_METRICS.get_or_init(QueryMetrics::default)
}

fn connector(source: &str) -> Arc<ConnectorMetrics> {
    let map = CONNECTOR_METRICS.get_or_init(Default::default);
    if let Some(existing) = map.read().get(source) {
        return Arc::clone(existing);
    }
    Arc::clone(map.write().entry(source.to_string()).or_default())
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn bucket_index(ms: u64) -> usize {
    LATENCY_BUCKETS_MS
        .iter()
        .position(|&upper| ms <= upper)
        .unwrap_or(LATENCY_BUCKETS_MS.len())
}

/// Records a completed gateway query.
pub fn record_query(duration: Duration, success: bool) {
    let duration_ms = duration_ms(duration);
    let metrics = metrics();
    metrics.total.fetch_add(1, Ordering::Relaxed);
    if !success {
        metrics.failed.fetch_add(1, Ordering::Relaxed);
    }
    metrics
        .duration_total_ms
        .fetch_add(duration_ms, Ordering::Relaxed);
    metrics
        .duration_max_ms
        .fetch_max(duration_ms, Ordering::Relaxed);
}

pub fn record_rate_limited() {
    metrics().rate_limited.fetch_add(1, Ordering::Relaxed);
}

/// Records one live connector fetch.
pub fn record_connector_call(source: &str, duration: Duration, success: bool) {
    let ms = duration_ms(duration);
    let m = connector(source);
    m.requests.fetch_add(1, Ordering::Relaxed);
    if !success {
        m.failures.fetch_add(1, Ordering::Relaxed);
    }
    m.latency_buckets[bucket_index(ms)].fetch_add(1, Ordering::Relaxed);
    m.latency_sum_ms.fetch_add(ms, Ordering::Relaxed);
}

pub fn record_cache_hit(source: &str) {
    connector(source).cache_hits.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryMetricsSnapshot {
    pub total: u64,
    pub failed: u64,
    pub rate_limited: u64,
    pub avg_ms: Option<f64>,
    pub max_ms: Option<u64>,
}

/// Latency histogram, keyed by bucket upper bound (`"+Inf"` for overflow).
/// Counts are cumulative.
#[derive(Debug, Clone, Serialize)]
pub struct LatencyHistogram {
    pub buckets: BTreeMap<String, u64>,
    pub count: u64,
    pub sum_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectorMetricsSnapshot {
    pub requests_total: u64,
    pub failures_total: u64,
    pub cache_hits_total: u64,
    pub latency_ms: LatencyHistogram,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub queries: QueryMetricsSnapshot,
    pub connectors: BTreeMap<String, ConnectorMetricsSnapshot>,
}

fn query_snapshot() -> QueryMetricsSnapshot {
    let metrics = metrics();
    let total = metrics.total.load(Ordering::Relaxed);
    let duration_total = metrics.duration_total_ms.load(Ordering::Relaxed);
    let max_ms = metrics.duration_max_ms.load(Ordering::Relaxed);

    let avg_ms = if total > 0 {
        Some(duration_total as f64 / total as f64)
    } else {
        None
    };

    QueryMetricsSnapshot {
        total,
        failed: metrics.failed.load(Ordering::Relaxed),
        rate_limited: metrics.rate_limited.load(Ordering::Relaxed),
        avg_ms,
        max_ms: if max_ms > 0 { Some(max_ms) } else { None },
    }
}

fn connector_snapshot(m: &ConnectorMetrics) -> ConnectorMetricsSnapshot {
    let mut buckets = BTreeMap::new();
    let mut cumulative = 0;
    for (i, slot) in m.latency_buckets.iter().enumerate() {
        cumulative += slot.load(Ordering::Relaxed);
        let label = LATENCY_BUCKETS_MS
            .get(i)
            .map(|upper| format!("{upper:03}"))
            .unwrap_or_else(|| "+Inf".to_string());
        buckets.insert(label, cumulative);
    }

    ConnectorMetricsSnapshot {
        requests_total: m.requests.load(Ordering::Relaxed),
        failures_total: m.failures.load(Ordering::Relaxed),
        cache_hits_total: m.cache_hits.load(Ordering::Relaxed),
        latency_ms: LatencyHistogram {
            buckets,
            count: cumulative,
            sum_ms: m.latency_sum_ms.load(Ordering::Relaxed),
        },
    }
}

pub fn snapshot() -> MetricsSnapshot {
    let connectors = CONNECTOR_METRICS
        .get()
        .map(|map| {
            map.read()
                .iter()
                .map(|(source, m)| (source.clone(), connector_snapshot(m)))
                .collect()
        })
        .unwrap_or_default();

    MetricsSnapshot {
        queries: query_snapshot(),
        connectors,
    }
}
