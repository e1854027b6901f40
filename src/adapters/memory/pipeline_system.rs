//! In-memory pipeline system.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::sync::{DealId, PersonId, SaleRecordPayload};
use crate::ports::{NewPerson, PipelineError, PipelineSystem};

/// Pipeline system operations, for call logs and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineOperation {
    FindPerson,
    CreatePerson,
    FindDeal,
    CreateDeal,
}

/// A person held by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPerson {
    pub id: PersonId,
    pub person: NewPerson,
}

/// A deal held by the fake.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDeal {
    pub id: DealId,
    pub payload: SaleRecordPayload,
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    persons: Vec<StoredPerson>,
    deals: Vec<StoredDeal>,
    /// Deals seeded directly by custom-field value.
    seeded_deals: Vec<(String, String, DealId)>,
    calls: Vec<PipelineOperation>,
    failing: HashSet<PipelineOperation>,
    omit_ids: bool,
}

impl State {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Pipeline system backed by vectors behind a mutex.
///
/// Searches and creates optionally sleep for `latency`, which lets tests
/// interleave concurrent invocations between the search and the create.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPipelineSystem {
    state: Arc<Mutex<State>>,
    latency: Option<Duration>,
}

impl InMemoryPipelineSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a delay to every deal search and create.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes `operation` fail with a rejected response.
    pub async fn fail_on(&self, operation: PipelineOperation) {
        self.state.lock().await.failing.insert(operation);
    }

    /// Makes creates succeed without returning an id.
    pub async fn omit_created_ids(&self) {
        self.state.lock().await.omit_ids = true;
    }

    pub async fn seed_person(&self, email: &str) -> PersonId {
        let mut state = self.state.lock().await;
        let id = PersonId::new(state.allocate_id());
        state.persons.push(StoredPerson {
            id,
            person: NewPerson {
                name: email.to_string(),
                email: Some(email.to_string()),
                phone: None,
                owner_id: None,
                visible_to: None,
            },
        });
        id
    }

    pub async fn seed_deal(&self, field_key: &str, value: &str) -> DealId {
        let mut state = self.state.lock().await;
        let id = DealId::new(state.allocate_id());
        state
            .seeded_deals
            .push((field_key.to_string(), value.to_string(), id));
        id
    }

    pub async fn persons(&self) -> Vec<StoredPerson> {
        self.state.lock().await.persons.clone()
    }

    pub async fn deals(&self) -> Vec<StoredDeal> {
        self.state.lock().await.deals.clone()
    }

    pub async fn calls(&self) -> Vec<PipelineOperation> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self, operation: PipelineOperation) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|op| **op == operation)
            .count()
    }

    async fn record(&self, operation: PipelineOperation) -> Result<(), PipelineError> {
        let mut state = self.state.lock().await;
        state.calls.push(operation);
        if state.failing.contains(&operation) {
            return Err(PipelineError::rejected(
                500,
                &format!("{{\"success\":false,\"error\":\"{:?} failed\"}}", operation),
            ));
        }
        Ok(())
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl PipelineSystem for InMemoryPipelineSystem {
    async fn find_person_by_email(&self, email: &str) -> Result<Option<PersonId>, PipelineError> {
        self.record(PipelineOperation::FindPerson).await?;
        let state = self.state.lock().await;
        Ok(state
            .persons
            .iter()
            .find(|p| p.person.email.as_deref() == Some(email))
            .map(|p| p.id))
    }

    async fn create_person(&self, person: &NewPerson) -> Result<Option<PersonId>, PipelineError> {
        self.record(PipelineOperation::CreatePerson).await?;
        let mut state = self.state.lock().await;
        let id = PersonId::new(state.allocate_id());
        state.persons.push(StoredPerson {
            id,
            person: person.clone(),
        });
        Ok(if state.omit_ids { None } else { Some(id) })
    }

    async fn find_deal_by_field(
        &self,
        field_key: &str,
        value: &str,
    ) -> Result<Option<DealId>, PipelineError> {
        self.record(PipelineOperation::FindDeal).await?;
        self.delay().await;
        let state = self.state.lock().await;

        let seeded = state
            .seeded_deals
            .iter()
            .find(|(key, v, _)| key == field_key && v == value)
            .map(|(_, _, id)| *id);
        let created = state
            .deals
            .iter()
            .find(|d| d.payload.custom_fields.get(field_key) == Some(value))
            .map(|d| d.id);

        Ok(seeded.or(created))
    }

    async fn create_deal(&self, deal: &SaleRecordPayload) -> Result<Option<DealId>, PipelineError> {
        self.record(PipelineOperation::CreateDeal).await?;
        self.delay().await;
        let mut state = self.state.lock().await;
        let id = DealId::new(state.allocate_id());
        state.deals.push(StoredDeal {
            id,
            payload: deal.clone(),
        });
        Ok(if state.omit_ids { None } else { Some(id) })
    }
}
