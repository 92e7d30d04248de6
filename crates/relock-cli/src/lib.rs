//! Relock CLI - inspect preferences and replay gating decisions
//!
//! Lets an operator write a preferences file, check what it contains, and see
//! what the policy decides for a given account count and inactivity period
//! without running the host application.

pub mod commands;
pub mod report;

pub use commands::*;
pub use report::EvaluationReport;
