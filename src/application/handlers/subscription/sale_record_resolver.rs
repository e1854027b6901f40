//! SaleRecordResolver - finds the sale record already created for a subscription.

use std::sync::Arc;

use crate::domain::sync::{DealId, SyncError};
use crate::ports::PipelineSystem;

/// Looks up sale records by the subscription-code custom field.
///
/// Must run before every creation. An unconfigured field key is a
/// configuration error, never a silent "not found".
pub struct SaleRecordResolver {
    pipeline: Arc<dyn PipelineSystem>,
    field_key: Option<String>,
}

impl SaleRecordResolver {
    pub fn new(pipeline: Arc<dyn PipelineSystem>, field_key: Option<String>) -> Self {
        Self {
            pipeline,
            field_key: field_key.filter(|key| !key.trim().is_empty()),
        }
    }

    pub async fn find_existing_sale_record(
        &self,
        subscription_code: &str,
    ) -> Result<Option<DealId>, SyncError> {
        let field_key = self.field_key.as_deref().ok_or_else(|| {
            SyncError::configuration("subscription field key is not configured")
        })?;

        let existing = self
            .pipeline
            .find_deal_by_field(field_key, subscription_code)
            .await?;

        tracing::debug!(
            subscription_code = %subscription_code,
            found = existing.is_some(),
            "Sale record lookup finished"
        );
        Ok(existing)
    }
}
