//! # exvo-store
//!
//! Store backend and collaborator sinks for the exchange voucher service.
//! The production relational store is an external system; this crate
//! provides the in-memory implementation used for development and tests,
//! plus audit and notification sink implementations.

pub mod memory;
pub mod sinks;

pub use memory::MemoryStore;
pub use sinks::{MemoryAuditSink, TracingNotifier};
