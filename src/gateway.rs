// SPDX-License-Identifier: Apache-2.0

//! Gateway composition root.
//!
//! Owns the registry, limiter, cache and policy store for the lifetime of
//! the process and runs plan-then-execute for each request.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::cache::FreshnessCache;
use crate::config::GatewayConfig;
use crate::engine::error::{GatewayError, GatewayResult};
use crate::engine::registry::ConnectorRegistry;
use crate::engine::types::{QueryRequest, QueryResponse, TenantContext};
use crate::execution::{Executor, ExecutorOptions};
use crate::metrics;
use crate::planner::plan_query;
use crate::policy::PolicyStore;
use crate::rate_limit::RateLimiter;

pub const RATE_LIMIT_STATUS_OK: &str = "OK";

pub fn new_trace_id() -> String {
    Uuid::new_v4().to_string()
}

pub struct Gateway {
    known_sources: HashSet<String>,
    executor: Executor,
    policy: Arc<PolicyStore>,
    default_tenant: String,
}

impl Gateway {
    /// Builds a gateway over `registry`.
    ///
    /// Connector-declared rate limits are overridden per source by
    /// `config.rate_limits`.
    pub fn new(registry: ConnectorRegistry, policy: Arc<PolicyStore>, config: &GatewayConfig) -> Self {
        let mut limits = registry.rate_limits();
        limits.extend(config.rate_limits.iter().map(|(k, v)| (k.clone(), *v)));

        let registry = Arc::new(registry);
        let known_sources = registry.source_names();
        let executor = Executor::new(
            registry,
            Arc::new(RateLimiter::new(&limits)),
            Arc::new(FreshnessCache::new(config.cache_max_entries, config.cache_ttl)),
            Arc::clone(&policy),
            ExecutorOptions {
                fetch_timeout: config.fetch_timeout,
            },
        );

        info!(
            sources = ?known_sources,
            throttled = limits.values().filter(|&&r| r > 0).count(),
            "Gateway initialized"
        );

        Self {
            known_sources,
            executor,
            policy,
            default_tenant: config.default_tenant.clone(),
        }
    }

    pub fn policy(&self) -> &Arc<PolicyStore> {
        &self.policy
    }

    pub fn default_tenant(&self) -> &str {
        &self.default_tenant
    }

    /// Plans and executes one request. Nothing partial is returned on error.
    #[instrument(
        skip(self, request, tenant, trace_id),
        fields(trace_id = %trace_id, tenant = %tenant.tenant_id, user = %tenant.user_id)
    )]
    pub async fn query(
        &self,
        request: &QueryRequest,
        tenant: &TenantContext,
        trace_id: &str,
    ) -> GatewayResult<QueryResponse> {
        let start = Instant::now();
        let result = self.run(request, tenant, trace_id).await;
        metrics::record_query(start.elapsed(), result.is_ok());

        match &result {
            Ok(response) => info!(
                rows = response.rows.len(),
                freshness_ms = response.freshness_ms,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Query completed"
            ),
            Err(e) => warn!(error = %e, code = e.error_code(), "Query failed"),
        }
        result
    }

    async fn run(
        &self,
        request: &QueryRequest,
        tenant: &TenantContext,
        trace_id: &str,
    ) -> GatewayResult<QueryResponse> {
        if request.sql.trim().is_empty() {
            return Err(GatewayError::invalid_query("SQL query is required"));
        }

        let plan = plan_query(&request.sql, &self.known_sources)?;
        let outcome = self
            .executor
            .execute(&plan, tenant, request.max_staleness_ms)
            .await?;

        let columns = outcome
            .rows
            .first()
            .map(|row| row.columns().map(str::to_string).collect())
            .unwrap_or_default();

        Ok(QueryResponse {
            columns,
            rows: outcome.rows,
            freshness_ms: outcome.freshness_ms,
            cache_source: outcome.cache_source,
            rate_limit_status: RATE_LIMIT_STATUS_OK.to_string(),
            trace_id: trace_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::engine::connectors::StaticConnector;
    use crate::engine::types::{Provenance, Row};

    fn registry(rate: Option<u32>) -> ConnectorRegistry {
        let mut connector =
            StaticConnector::new("s", &["t"], vec![Row::new().with_column("id", 1).with_column("v", "x")]);
        if let Some(rate) = rate {
            connector = connector.with_rate_limit(rate);
        }
        let mut registry = ConnectorRegistry::new();
        registry.register(Arc::new(connector)).unwrap();
        registry
    }

    #[tokio::test]
    async fn response_shape() {
        let gateway = Gateway::new(
            registry(None),
            Arc::new(PolicyStore::default()),
            &GatewayConfig::default(),
        );
        let response = gateway
            .query(
                &QueryRequest::new("SELECT v, id FROM s.t"),
                &TenantContext::new("t1", "u1"),
                "trace-1",
            )
            .await
            .unwrap();

        assert_eq!(response.columns, vec!["v".to_string(), "id".to_string()]);
        assert_eq!(response.rate_limit_status, "OK");
        assert_eq!(response.trace_id, "trace-1");
        assert_eq!(response.cache_source["s"], Provenance::Live);
    }

    #[tokio::test]
    async fn blank_sql_is_rejected() {
        let gateway = Gateway::new(
            registry(None),
            Arc::new(PolicyStore::default()),
            &GatewayConfig::default(),
        );
        let err = gateway
            .query(&QueryRequest::new("  "), &TenantContext::new("t1", "u1"), "x")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "SQL query is required");
    }

    #[tokio::test]
    async fn config_overrides_declared_rate_limit() {
        let config = GatewayConfig {
            rate_limits: HashMap::from([("s".to_string(), 0)]),
            ..GatewayConfig::default()
        };
        // Declared limit of 1, disabled by config.
        let gateway = Gateway::new(registry(Some(1)), Arc::new(PolicyStore::default()), &config);
        let tenant = TenantContext::new("t1", "u1");
        for _ in 0..5 {
            gateway
                .query(&QueryRequest::new("SELECT * FROM s.t"), &tenant, "x")
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn mixed_case_connector_name_is_queryable() {
        let mut registry = ConnectorRegistry::new();
        registry
            .register(Arc::new(StaticConnector::new(
                "GitHub",
                &["pull_requests"],
                vec![Row::new().with_column("id", 7)],
            )))
            .unwrap();
        let gateway = Gateway::new(registry, Arc::new(PolicyStore::default()), &GatewayConfig::default());

        let response = gateway
            .query(
                &QueryRequest::new("SELECT * FROM GitHub.pull_requests"),
                &TenantContext::new("t1", "u1"),
                "x",
            )
            .await
            .unwrap();
        assert_eq!(response.rows.len(), 1);
        assert_eq!(response.cache_source["github"], Provenance::Live);
    }

    #[test]
    fn trace_ids_are_unique() {
        assert_ne!(new_trace_id(), new_trace_id());
    }
}
