//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Audit logger: sees the final status of every request
//! 2. Envelope normalizer: wraps bare framework errors in JSON

pub mod audit;
pub mod envelope;
