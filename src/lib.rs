//! Subscription Bridge - subscription webhook synchronization
//!
//! Receives subscription lifecycle events from the billing platform, keeps at
//! most one sale record per subscription in the sales pipeline and keeps the
//! subscriber's marketing list membership in step with the subscription.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
