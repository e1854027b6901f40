//! Subscription handlers.
//!
//! ## Commands
//! - Synchronizing a subscription event into the pipeline and list systems
//!
//! ## Building blocks
//! - Sale record lookup by subscription code
//! - Contact find-or-create
//! - List (un)subscription with fallback
//! - Per-code serialization of lookup and create

mod contact_upsert;
mod list_subscriber;
mod sale_record_resolver;
mod subscription_locks;
mod sync_subscription;

pub use contact_upsert::ContactUpsert;
pub use list_subscriber::ListSubscriber;
pub use sale_record_resolver::SaleRecordResolver;
pub use subscription_locks::SubscriptionLocks;
pub use sync_subscription::{SyncSubscriptionCommand, SyncSubscriptionHandler};
