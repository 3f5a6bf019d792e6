// SPDX-License-Identifier: Apache-2.0

//! Connector trait definition
//!
//! This is the capability every backend data source provides to the gateway.
//! Connectors only fetch; rate limiting, caching and policy enforcement all
//! happen around them.

use async_trait::async_trait;

use crate::engine::error::GatewayResult;
use crate::engine::types::{Row, TenantContext};

/// Core trait that all backend connectors must implement
#[async_trait]
pub trait Connector: Send + Sync {
    /// Source name used in `FROM <source>.<table>` (e.g., "github", "jira")
    fn name(&self) -> &str;

    /// Tables served by this connector. The first one is the primary table
    /// that policy rules are keyed on. Must not be empty.
    fn tables(&self) -> &[String];

    /// Requests per second this connector tolerates. `None` means unthrottled.
    fn rate_limit_per_second(&self) -> Option<u32> {
        None
    }

    /// Fetches the connector's rows on behalf of a tenant
    async fn execute(&self, tenant: &TenantContext) -> GatewayResult<Vec<Row>>;
}
