//! In-memory list system.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::sync::{CallPath, ListAction};
use crate::ports::{ListError, ListRequest, ListResponse, ListSystem};

/// One call received by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedListCall {
    pub action: ListAction,
    pub path: CallPath,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    subscribed: BTreeSet<String>,
    calls: Vec<RecordedListCall>,
    fail_primary: bool,
    fail_fallback: bool,
}

/// List system keeping the subscribed set in memory.
#[derive(Debug, Clone)]
pub struct InMemoryListSystem {
    state: Arc<Mutex<State>>,
    configured: bool,
}

impl Default for InMemoryListSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryListSystem {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            configured: true,
        }
    }

    /// A list system without credentials; every call is skipped upstream.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    pub async fn fail_primary(&self) {
        self.state.lock().await.fail_primary = true;
    }

    pub async fn fail_fallback(&self) {
        self.state.lock().await.fail_fallback = true;
    }

    pub async fn is_subscribed(&self, email: &str) -> bool {
        self.state.lock().await.subscribed.contains(email)
    }

    pub async fn calls(&self) -> Vec<RecordedListCall> {
        self.state.lock().await.calls.clone()
    }

    async fn apply(
        &self,
        action: ListAction,
        request: &ListRequest,
        path: CallPath,
    ) -> Result<ListResponse, ListError> {
        let mut state = self.state.lock().await;
        state.calls.push(RecordedListCall {
            action,
            path,
            email: request.email.clone(),
            phone: request.phone.clone(),
        });

        let failing = match path {
            CallPath::Primary => state.fail_primary,
            CallPath::Fallback => state.fail_fallback,
        };
        if failing {
            return Err(ListError::rejected(400, "{\"errors\":[{\"detail\":\"rejected\"}]}"));
        }

        match action {
            ListAction::Subscribe => {
                state.subscribed.insert(request.email.clone());
            }
            ListAction::Unsubscribe => {
                state.subscribed.remove(&request.email);
            }
            ListAction::None => {}
        }
        Ok(ListResponse::new(202, ""))
    }
}

#[async_trait]
impl ListSystem for InMemoryListSystem {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn subscribe(
        &self,
        request: &ListRequest,
        path: CallPath,
    ) -> Result<ListResponse, ListError> {
        self.apply(ListAction::Subscribe, request, path).await
    }

    async fn unsubscribe(
        &self,
        request: &ListRequest,
        path: CallPath,
    ) -> Result<ListResponse, ListError> {
        self.apply(ListAction::Unsubscribe, request, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str) -> ListRequest {
        ListRequest {
            email: email.to_string(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn subscribe_and_unsubscribe_are_idempotent() {
        let list = InMemoryListSystem::new();
        list.subscribe(&request("a@example.com"), CallPath::Primary).await.unwrap();
        list.subscribe(&request("a@example.com"), CallPath::Primary).await.unwrap();
        assert!(list.is_subscribed("a@example.com").await);

        list.unsubscribe(&request("a@example.com"), CallPath::Primary).await.unwrap();
        list.unsubscribe(&request("a@example.com"), CallPath::Primary).await.unwrap();
        assert!(!list.is_subscribed("a@example.com").await);
    }

    #[tokio::test]
    async fn primary_failure_leaves_fallback_working() {
        let list = InMemoryListSystem::new();
        list.fail_primary().await;

        assert!(list.subscribe(&request("a@example.com"), CallPath::Primary).await.is_err());
        assert!(list.subscribe(&request("a@example.com"), CallPath::Fallback).await.is_ok());
        assert_eq!(list.calls().await.len(), 2);
    }
}
