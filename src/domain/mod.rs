//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `sync` - Subscription event classification and projection rules

pub mod sync;
