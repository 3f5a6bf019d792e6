// SPDX-License-Identifier: Apache-2.0

//! Bundled connectors
//!
//! `StaticConnector` serves a fixed row set and backs the demo `github` and
//! `jira` sources the binary registers by default.

pub mod github;
pub mod jira;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::engine::error::GatewayResult;
use crate::engine::registry::ConnectorRegistry;
use crate::engine::traits::Connector;
use crate::engine::types::{Row, TenantContext};

/// A connector that returns the same rows on every fetch
#[derive(Debug, Clone)]
pub struct StaticConnector {
    name: String,
    tables: Vec<String>,
    rows: Vec<Row>,
    latency: Duration,
    rate_limit_per_second: Option<u32>,
}

impl StaticConnector {
    pub fn new(name: impl Into<String>, tables: &[&str], rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            tables: tables.iter().map(|t| t.to_string()).collect(),
            rows,
            latency: Duration::ZERO,
            rate_limit_per_second: None,
        }
    }

    /// Simulated fetch latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_rate_limit(mut self, per_second: u32) -> Self {
        self.rate_limit_per_second = Some(per_second);
        self
    }
}

#[async_trait]
impl Connector for StaticConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn tables(&self) -> &[String] {
        &self.tables
    }

    fn rate_limit_per_second(&self) -> Option<u32> {
        self.rate_limit_per_second
    }

    async fn execute(&self, _tenant: &TenantContext) -> GatewayResult<Vec<Row>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.rows.clone())
    }
}

/// Registry holding the bundled `github` and `jira` demo sources.
pub fn demo_registry() -> GatewayResult<ConnectorRegistry> {
    let mut registry = ConnectorRegistry::new();
    registry.register(Arc::new(github::connector()))?;
    registry.register(Arc::new(jira::connector()))?;
    Ok(registry)
}
