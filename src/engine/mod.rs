// SPDX-License-Identifier: Apache-2.0

// Gateway engine
// Shared types, errors and the connector abstraction

pub mod connectors;
pub mod error;
pub mod registry;
pub mod traits;
pub mod types;

pub use error::{GatewayError, GatewayResult};
pub use registry::ConnectorRegistry;
pub use traits::Connector;
pub use types::*;
