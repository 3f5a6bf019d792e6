// SPDX-License-Identifier: Apache-2.0

//! Per-request orchestrator.
//!
//! Visits the plan's sources in order: registry lookup, rate limit, cache or
//! live fetch (+ policy), then joins and projects the collected rows. Any
//! per-source failure aborts the whole request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::cache::{CacheKey, FreshnessCache};
use crate::engine::error::{GatewayError, GatewayResult};
use crate::engine::registry::ConnectorRegistry;
use crate::engine::traits::Connector;
use crate::engine::types::{Provenance, Row, TenantContext};
use crate::metrics;
use crate::planner::QueryPlan;
use crate::policy::{self, PolicyStore};
use crate::rate_limit::RateLimiter;

use super::join::inner_join;
use super::projection::apply_projection;

/// Default deadline for a single connector fetch (30 seconds).
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(30_000);

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub fetch_timeout: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Result of executing a plan, before response assembly.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub rows: Vec<Row>,
    /// Age of the stalest contributing source
    pub freshness_ms: u64,
    pub cache_source: IndexMap<String, Provenance>,
}

/// Rows collected for one source.
struct SourceRows {
    rows: Arc<Vec<Row>>,
    age_ms: u64,
    provenance: Provenance,
}

pub struct Executor {
    registry: Arc<ConnectorRegistry>,
    limiter: Arc<RateLimiter>,
    cache: Arc<FreshnessCache>,
    policy: Arc<PolicyStore>,
    options: ExecutorOptions,
}

impl Executor {
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        limiter: Arc<RateLimiter>,
        cache: Arc<FreshnessCache>,
        policy: Arc<PolicyStore>,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            registry,
            limiter,
            cache,
            policy,
            options,
        }
    }

    pub fn cache(&self) -> &Arc<FreshnessCache> {
        &self.cache
    }

    /// Executes `plan` for `tenant`.
    ///
    /// Cached rows are only used when `max_staleness_ms` is present, non-zero
    /// and at least the entry's age.
    #[instrument(
        skip(self, plan, tenant),
        fields(tenant = %tenant.tenant_id, sources = ?plan.sources)
    )]
    pub async fn execute(
        &self,
        plan: &QueryPlan,
        tenant: &TenantContext,
        max_staleness_ms: Option<u64>,
    ) -> GatewayResult<ExecutionOutcome> {
        let mut collected: IndexMap<String, SourceRows> = IndexMap::with_capacity(plan.sources.len());

        for source in &plan.sources {
            let rows = self
                .resolve_source(source, plan, tenant, max_staleness_ms)
                .await?;
            collected.insert(source.clone(), rows);
        }

        let freshness_ms = collected.values().map(|s| s.age_ms).max().unwrap_or(0);
        let cache_source = collected
            .iter()
            .map(|(source, s)| (source.clone(), s.provenance))
            .collect();

        let rows = match &plan.join {
            Some(join) => {
                let left = rows_of(&collected, &join.left.source)?;
                let right = rows_of(&collected, &join.right.source)?;
                inner_join(left, right, &join.left.column, &join.right.column)
            }
            None => {
                let primary = plan
                    .primary_source()
                    .ok_or_else(|| GatewayError::invalid_query("Query references no sources"))?;
                match collected.shift_remove(primary) {
                    Some(s) => Arc::unwrap_or_clone(s.rows),
                    None => return Err(GatewayError::not_registered(primary)),
                }
            }
        };

        let rows = apply_projection(rows, plan.projection.as_deref());

        Ok(ExecutionOutcome {
            rows,
            freshness_ms,
            cache_source,
        })
    }

    async fn resolve_source(
        &self,
        source: &str,
        plan: &QueryPlan,
        tenant: &TenantContext,
        max_staleness_ms: Option<u64>,
    ) -> GatewayResult<SourceRows> {
        let connector = self
            .registry
            .get(source)
            .ok_or_else(|| GatewayError::not_registered(source))?;

        if let Err(e) = self.limiter.check(source) {
            metrics::record_rate_limited();
            return Err(e);
        }

        let key = CacheKey::new(&tenant.tenant_id, source, &plan.fingerprint);

        if let Some(budget) = max_staleness_ms.filter(|&ms| ms > 0) {
            if let Some(hit) = self.cache.lookup_fresh(&key, budget) {
                debug!(source, age_ms = hit.age_ms, rows = hit.rows.len(), "Cache hit");
                metrics::record_cache_hit(source);
                return Ok(SourceRows {
                    rows: hit.rows,
                    age_ms: hit.age_ms,
                    provenance: Provenance::Cache,
                });
            }
        }

        let fetched = self.fetch_live(source, connector.as_ref(), tenant).await?;
        let table = policy_table(source, connector.as_ref());
        let cleared = policy::enforce(fetched, &self.policy.snapshot(), &table);
        debug!(source, rows = cleared.len(), "Live fetch cleared policy");

        let rows = Arc::new(cleared);
        self.cache.store(key, Arc::clone(&rows));

        Ok(SourceRows {
            rows,
            age_ms: 0,
            provenance: Provenance::Live,
        })
    }

    async fn fetch_live(
        &self,
        source: &str,
        connector: &dyn Connector,
        tenant: &TenantContext,
    ) -> GatewayResult<Vec<Row>> {
        let start = Instant::now();

        let result = match timeout(self.options.fetch_timeout, connector.execute(tenant)).await {
            Ok(Ok(rows)) => Ok(rows),
            Ok(Err(GatewayError::ConnectorFailure { message, .. })) => {
                Err(GatewayError::connector_failure(source, message))
            }
            Ok(Err(e)) => Err(GatewayError::connector_failure(source, e.to_string())),
            Err(_) => Err(GatewayError::connector_failure(
                source,
                format!(
                    "fetch timed out after {} ms",
                    self.options.fetch_timeout.as_millis()
                ),
            )),
        };

        metrics::record_connector_call(source, start.elapsed(), result.is_ok());
        if let Err(e) = &result {
            warn!(source, error = %e, "Connector fetch failed");
        }
        result
    }
}

/// Policy rules are keyed on `<source>.<primary table>`.
fn policy_table(source: &str, connector: &dyn Connector) -> String {
    match connector.tables().first() {
        Some(table) => format!("{source}.{table}"),
        None => source.to_string(),
    }
}

fn rows_of<'a>(collected: &'a IndexMap<String, SourceRows>, source: &str) -> GatewayResult<&'a [Row]> {
    collected
        .get(source)
        .map(|s| s.rows.as_slice())
        .ok_or_else(|| GatewayError::not_registered(source))
}
