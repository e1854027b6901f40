//! SyncSubscriptionHandler - processes one subscription event end to end.

use std::sync::Arc;

use futures::future::join;
use uuid::Uuid;

use crate::domain::sync::{
    build_sale_record_payload, decide_list_action, decide_pipeline, CanonicalFields, ListAction,
    ListOutcome, PipelineDecision, PipelineOutcome, SubscriptionEvent, SyncError, SyncOutcome,
    SyncReport, SyncSettings,
};
use crate::ports::{ListSystem, PipelineSystem};

use super::contact_upsert::ContactUpsert;
use super::list_subscriber::ListSubscriber;
use super::sale_record_resolver::SaleRecordResolver;
use super::subscription_locks::SubscriptionLocks;

/// Command to synchronize one subscription event.
#[derive(Debug, Clone)]
pub struct SyncSubscriptionCommand {
    pub event: SubscriptionEvent,
}

/// Orchestrates classification and both downstream branches.
///
/// The list branch and the pipeline branch run concurrently and neither can
/// cancel the other. Branch failures are contained in their outcomes.
pub struct SyncSubscriptionHandler {
    settings: Arc<SyncSettings>,
    pipeline: Arc<dyn PipelineSystem>,
    resolver: SaleRecordResolver,
    contacts: ContactUpsert,
    list: ListSubscriber,
    locks: SubscriptionLocks,
}

impl SyncSubscriptionHandler {
    pub fn new(
        pipeline: Arc<dyn PipelineSystem>,
        list: Arc<dyn ListSystem>,
        settings: Arc<SyncSettings>,
    ) -> Self {
        Self {
            resolver: SaleRecordResolver::new(
                pipeline.clone(),
                settings.projection.subscription_field.clone(),
            ),
            contacts: ContactUpsert::new(
                pipeline.clone(),
                settings.person_owner_id,
                settings.person_visible_to,
            ),
            list: ListSubscriber::new(list),
            locks: SubscriptionLocks::new(),
            pipeline,
            settings,
        }
    }

    pub async fn handle(&self, cmd: SyncSubscriptionCommand) -> SyncOutcome {
        let invocation_id = Uuid::new_v4();
        let event = cmd.event;

        if !event.is_subscription_event() {
            let webhook_type = event.webhook_type().unwrap_or_default();
            tracing::info!(
                invocation_id = %invocation_id,
                webhook_type = %webhook_type,
                "Ignoring non-subscription event"
            );
            return SyncOutcome::NotApplicable { webhook_type };
        }

        let fields = CanonicalFields::extract(&event, &self.settings.extraction);
        let list_action = decide_list_action(&fields, &self.settings.policy);
        let decision = decide_pipeline(&fields, &self.settings.policy);

        tracing::info!(
            invocation_id = %invocation_id,
            subscription_code = %fields.subscription_code,
            status = %fields.last_status,
            cancellation = fields.is_cancellation,
            ?list_action,
            ?decision,
            "Classified subscription event"
        );

        let (list, pipeline) = join(
            self.run_list_branch(&fields, list_action),
            self.run_pipeline_branch(&fields, decision),
        )
        .await;

        tracing::info!(
            invocation_id = %invocation_id,
            subscription_code = %fields.subscription_code,
            pipeline_created = pipeline.is_created(),
            pipeline_failed = pipeline.is_failure(),
            list_succeeded = list.is_success(),
            "Subscription event processed"
        );

        SyncOutcome::Completed(SyncReport {
            invocation_id,
            subscription_code: fields.subscription_code.clone(),
            pipeline,
            list,
        })
    }

    async fn run_list_branch(&self, fields: &CanonicalFields, action: ListAction) -> ListOutcome {
        self.list
            .apply(action, &fields.email, fields.phone_e164.as_deref())
            .await
    }

    async fn run_pipeline_branch(
        &self,
        fields: &CanonicalFields,
        decision: PipelineDecision,
    ) -> PipelineOutcome {
        match decision {
            PipelineDecision::Skip(reason) => PipelineOutcome::skipped(reason),
            PipelineDecision::Create => match self.create_once(fields).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(
                        subscription_code = %fields.subscription_code,
                        status = ?err.downstream_status(),
                        "Pipeline branch failed: {}",
                        err
                    );
                    PipelineOutcome::failed(&err)
                }
            },
        }
    }

    /// Lookup and create under the per-code lock.
    async fn create_once(&self, fields: &CanonicalFields) -> Result<PipelineOutcome, SyncError> {
        let _guard = self.locks.acquire(&fields.subscription_code).await;

        if let Some(existing) = self
            .resolver
            .find_existing_sale_record(&fields.subscription_code)
            .await?
        {
            tracing::info!(
                subscription_code = %fields.subscription_code,
                deal_id = %existing,
                "Sale record already exists"
            );
            return Ok(PipelineOutcome::already_exists(existing));
        }

        let phone = fields
            .phone_e164
            .as_deref()
            .or(Some(fields.phone_raw.as_str()).filter(|p| !p.is_empty()));
        let person_id = self
            .contacts
            .upsert_contact(&fields.email, &fields.full_name, phone)
            .await?;

        let payload = build_sale_record_payload(fields, person_id, &self.settings.projection);
        let deal_id = self
            .pipeline
            .create_deal(&payload)
            .await?
            .ok_or_else(|| SyncError::downstream("deal create returned no id"))?;

        tracing::info!(
            subscription_code = %fields.subscription_code,
            person_id = %person_id,
            deal_id = %deal_id,
            stage_id = ?payload.stage_id,
            "Created sale record"
        );

        Ok(PipelineOutcome::Created {
            person_id,
            deal_id,
            status: fields.last_status.clone(),
            mrr: fields.recurring_value,
            expected_close_date: fields.expected_close_date.clone(),
            stage_id: payload.stage_id,
        })
    }
}
