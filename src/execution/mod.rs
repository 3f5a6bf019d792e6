// SPDX-License-Identifier: Apache-2.0

//! Execution engine: relational operators and the per-request orchestrator.

pub mod executor;
pub mod join;
pub mod projection;

pub use executor::{ExecutionOutcome, Executor, ExecutorOptions};
pub use join::inner_join;
pub use projection::apply_projection;
