//! ListSubscriber - toggles list membership with a fallback request shape.

use std::sync::Arc;

use crate::domain::sync::{CallPath, ListAction, ListCallFailure, ListOutcome, ListSkipReason};
use crate::ports::{ListError, ListRequest, ListResponse, ListSystem};

/// Subscribes or unsubscribes a contact. Always yields an outcome.
pub struct ListSubscriber {
    list: Arc<dyn ListSystem>,
}

impl ListSubscriber {
    pub fn new(list: Arc<dyn ListSystem>) -> Self {
        Self { list }
    }

    pub async fn subscribe(&self, email: &str, phone: Option<&str>) -> ListOutcome {
        self.apply(ListAction::Subscribe, email, phone).await
    }

    pub async fn unsubscribe(&self, email: &str) -> ListOutcome {
        self.apply(ListAction::Unsubscribe, email, None).await
    }

    /// Runs `action` through the primary shape, then the fallback shape.
    pub async fn apply(&self, action: ListAction, email: &str, phone: Option<&str>) -> ListOutcome {
        if action == ListAction::None {
            return ListOutcome::skipped(action, ListSkipReason::NoAction);
        }
        if !self.list.is_configured() {
            tracing::debug!(?action, "List system not configured, skipping");
            return ListOutcome::skipped(action, ListSkipReason::NotConfigured);
        }
        let email = email.trim();
        if email.is_empty() {
            return ListOutcome::skipped(action, ListSkipReason::MissingEmail);
        }

        let request = ListRequest {
            email: email.to_string(),
            phone: phone.map(str::to_string),
        };

        let primary = match self.call(action, &request, CallPath::Primary).await {
            Ok(response) => return succeeded(action, CallPath::Primary, response),
            Err(err) => err,
        };
        tracing::warn!(
            ?action,
            status = ?primary.status,
            "Primary list request failed, trying fallback: {}",
            primary
        );

        match self.call(action, &request, CallPath::Fallback).await {
            Ok(response) => succeeded(action, CallPath::Fallback, response),
            Err(fallback) => {
                tracing::error!(
                    ?action,
                    status = ?fallback.status,
                    "Fallback list request failed: {}",
                    fallback
                );
                ListOutcome::Failed {
                    action,
                    primary: failure(CallPath::Primary, primary),
                    fallback: failure(CallPath::Fallback, fallback),
                }
            }
        }
    }

    async fn call(
        &self,
        action: ListAction,
        request: &ListRequest,
        path: CallPath,
    ) -> Result<ListResponse, ListError> {
        match action {
            ListAction::Unsubscribe => self.list.unsubscribe(request, path).await,
            _ => self.list.subscribe(request, path).await,
        }
    }
}

fn succeeded(action: ListAction, path: CallPath, response: ListResponse) -> ListOutcome {
    ListOutcome::Succeeded {
        action,
        path,
        status_code: response.status,
        body: response.body,
    }
}

fn failure(path: CallPath, err: ListError) -> ListCallFailure {
    ListCallFailure {
        path,
        error: err.message,
        status_code: err.status,
        body: err.body,
    }
}
