// SPDX-License-Identifier: Apache-2.0

// querygate - federated query gateway
// Core library

pub mod cache;
pub mod config;
pub mod engine;
pub mod execution;
pub mod gateway;
pub mod http;
pub mod metrics;
pub mod observability;
pub mod planner;
pub mod policy;
pub mod rate_limit;

pub use config::GatewayConfig;
pub use engine::{GatewayError, GatewayResult};
pub use gateway::Gateway;
