// SPDX-License-Identifier: Apache-2.0

//! Connector Registry
//!
//! Central registry for all backend connectors. Built once by the
//! composition root and shared read-only afterwards.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::engine::error::{GatewayError, GatewayResult};
use crate::engine::traits::Connector;

/// Registry that holds all available connectors, keyed by source name
pub struct ConnectorRegistry {
    connectors: HashMap<String, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self {
            connectors: HashMap::new(),
        }
    }

    /// Registers a connector under its lowercased `name()`, matching how
    /// the planner resolves source names.
    ///
    /// Re-registering a name replaces the previous connector.
    pub fn register(&mut self, connector: Arc<dyn Connector>) -> GatewayResult<()> {
        if connector.tables().is_empty() {
            return Err(GatewayError::configuration(format!(
                "connector '{}' must serve at least one table",
                connector.name()
            )));
        }
        let name = connector.name().to_lowercase();
        self.connectors.insert(name, connector);
        Ok(())
    }

    /// Gets a connector by source name, case-insensitively
    pub fn get(&self, source: &str) -> Option<Arc<dyn Connector>> {
        self.connectors.get(&source.to_lowercase()).cloned()
    }

    /// Returns the set of registered source names
    pub fn source_names(&self) -> HashSet<String> {
        self.connectors.keys().cloned().collect()
    }

    /// Declared rate limits of all registered connectors
    pub fn rate_limits(&self) -> HashMap<String, u32> {
        self.connectors
            .iter()
            .filter_map(|(name, c)| c.rate_limit_per_second().map(|r| (name.clone(), r)))
            .collect()
    }

    /// Returns the number of registered connectors
    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    /// Returns true if no connectors are registered
    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
