//! ContactUpsert - finds or creates the person behind a subscription.

use std::sync::Arc;

use crate::domain::sync::{PersonId, SyncError};
use crate::ports::{NewPerson, PipelineSystem};

/// Finds a person by exact email or creates one. Never updates.
pub struct ContactUpsert {
    pipeline: Arc<dyn PipelineSystem>,
    owner_id: Option<i64>,
    visible_to: Option<i64>,
}

impl ContactUpsert {
    pub fn new(
        pipeline: Arc<dyn PipelineSystem>,
        owner_id: Option<i64>,
        visible_to: Option<i64>,
    ) -> Self {
        Self {
            pipeline,
            owner_id,
            visible_to,
        }
    }

    /// Returns the id of the existing or newly created person.
    ///
    /// The search is skipped when `email` is empty; the person is then
    /// created without an email.
    pub async fn upsert_contact(
        &self,
        email: &str,
        full_name: &str,
        phone: Option<&str>,
    ) -> Result<PersonId, SyncError> {
        let email = email.trim();

        if !email.is_empty() {
            if let Some(existing) = self.pipeline.find_person_by_email(email).await? {
                tracing::debug!(person_id = %existing, "Reusing existing person");
                return Ok(existing);
            }
        }

        let person = NewPerson {
            name: full_name.to_string(),
            email: Some(email.to_string()).filter(|e| !e.is_empty()),
            phone: phone
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            owner_id: self.owner_id,
            visible_to: self.visible_to,
        };

        let created = self
            .pipeline
            .create_person(&person)
            .await
            .map_err(|err| SyncError::ContactCreateFailed {
                message: err.message,
                status: err.status,
                body: err.body,
            })?;

        let person_id = created
            .ok_or_else(|| SyncError::contact_create_failed("response carried no person id"))?;

        tracing::info!(person_id = %person_id, "Created person");
        Ok(person_id)
    }
}
