//! Create/read/update/delete against Jamf Pro with retry and ID-then-name
//! fallback.
//!
//! Resources describe their endpoint through [`EntityApi`] and their typed
//! state through [`ResourceState`]; [`Reconciler`] sequences the calls:
//!
//! - create: remote create, store the ID, read back
//! - read: look up by ID then name; clear the ID when both fail
//! - update: update by ID then prior name, read back
//! - delete: delete by ID then name; clear the ID on success

mod error;
mod lookup;

pub use error::ReconcileError;
pub use lookup::{Locator, LookupChain, LookupFailure};

use async_trait::async_trait;
use std::fmt::Display;
use std::time::Duration;
use tfplug::{retry_context, Backoff, Context, Diagnostic, RetryError, Timeouts};

use crate::api::ApiError;

/// Remote operations for one entity type
#[async_trait]
pub trait EntityApi: Send + Sync {
    type Entity: Send + Sync;
    type Id: Clone + Display + Send + Sync;

    /// Entity name used in diagnostics, e.g. "Department"
    const KIND: &'static str;

    fn parse_id(raw: &str) -> Result<Self::Id, String>;

    async fn create(&self, entity: &Self::Entity) -> Result<Self::Id, ApiError>;

    async fn get_by_id(&self, id: &Self::Id) -> Result<Self::Entity, ApiError>;

    async fn get_by_name(&self, name: &str) -> Result<Self::Entity, ApiError>;

    async fn update_by_id(&self, id: &Self::Id, entity: &Self::Entity) -> Result<(), ApiError>;

    async fn update_by_name(&self, name: &str, entity: &Self::Entity) -> Result<(), ApiError>;

    async fn delete_by_id(&self, id: &Self::Id) -> Result<(), ApiError>;

    async fn delete_by_name(&self, name: &str) -> Result<(), ApiError>;
}

/// Typed Terraform state of one resource instance
pub trait ResourceState<E>: Clone + Send + Sync {
    /// Empty when the resource has no remote counterpart
    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn name(&self) -> &str;

    /// Copies every field of the remote entity into state, including its ID
    fn refresh(&mut self, entity: &E);
}

/// Parses a numeric Classic API ID
pub fn parse_numeric_id(raw: &str) -> Result<i64, String> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        Ok(_) => Err("ID must be a positive integer".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Parses an opaque Jamf Pro API ID
pub fn parse_string_id(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err("ID is empty".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

pub struct Reconciler<'a, A> {
    ctx: &'a Context,
    api: A,
    timeouts: Timeouts,
    backoff: Backoff,
}

impl<'a, A: EntityApi> Reconciler<'a, A> {
    pub fn new(ctx: &'a Context, api: A, timeouts: Timeouts) -> Self {
        Self {
            ctx,
            api,
            timeouts,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn kind(&self) -> &'static str {
        A::KIND
    }

    /// Creates the entity, stores its ID and reads it back. A failed read
    /// back is reported while the ID stays set.
    pub async fn create<S>(&self, state: &mut S, entity: &A::Entity) -> Vec<Diagnostic>
    where
        S: ResourceState<A::Entity>,
    {
        let name = state.name().to_string();
        let api = &self.api;

        let created = retry_context(self.ctx, self.timeouts.create, self.backoff, |_| async move {
            api.create(entity).await.map_err(|e| {
                if e.is_structured() {
                    RetryError::NonRetryable(e)
                } else {
                    RetryError::Retryable(e)
                }
            })
        })
        .await;

        match created {
            Ok(id) => {
                tracing::info!("Created {} '{}' with ID {}", A::KIND, name, id);
                state.set_id(id.to_string());
            }
            Err(failure) => {
                tracing::error!("Failed to create {} '{}': {}", A::KIND, name, failure);
                return vec![ReconcileError::from(failure).to_diagnostic("create", A::KIND, &name)];
            }
        }

        self.read_back(state, &name).await
    }

    /// Refreshes state from the remote entity. When every lookup fails the
    /// ID is cleared so the host drops the resource.
    pub async fn read<S>(&self, state: &mut S) -> Vec<Diagnostic>
    where
        S: ResourceState<A::Entity>,
    {
        let name = state.name().to_string();

        match self.fetch(state, self.timeouts.read).await {
            Ok(entity) => {
                state.refresh(&entity);
                vec![]
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "{} '{}' (ID {}) no longer exists, removing it from state",
                    A::KIND,
                    name,
                    state.id()
                );
                state.set_id(String::new());
                vec![Diagnostic::warning(
                    format!("Jamf Pro {} '{}' not found", A::KIND, display_name(&name)),
                    format!(
                        "The resource was removed from state and will be recreated on the next apply.\n{}",
                        e.detail()
                    ),
                )]
            }
            Err(e) => {
                tracing::error!("Failed to read {} '{}': {}", A::KIND, name, e);
                state.set_id(String::new());
                vec![e.to_diagnostic("read", A::KIND, &name)]
            }
        }
    }

    /// Applies `entity` to the record described by `state` (the prior state),
    /// then reads back. On failure `state` is left untouched; on success it
    /// becomes `desired` refreshed from the remote entity.
    pub async fn update<S>(&self, state: &mut S, desired: &S, entity: &A::Entity) -> Vec<Diagnostic>
    where
        S: ResourceState<A::Entity>,
    {
        let name = desired.name().to_string();
        let chain = match self.chain_for(state) {
            Ok(chain) => chain,
            Err(e) => return vec![e.to_diagnostic("update", A::KIND, &name)],
        };

        let api = &self.api;
        let chain = &chain;
        let updated = retry_context(self.ctx, self.timeouts.update, self.backoff, |_| async move {
            chain
                .run(move |locator| async move {
                    match locator {
                        Locator::ById(id) => api.update_by_id(&id, entity).await,
                        Locator::ByName(name) => api.update_by_name(&name, entity).await,
                    }
                })
                .await
                .map_err(retry_lookup)
        })
        .await;

        if let Err(failure) = updated {
            tracing::error!("Failed to update {} '{}': {}", A::KIND, name, failure);
            return vec![ReconcileError::from(failure).to_diagnostic("update", A::KIND, &name)];
        }

        tracing::info!("Updated {} '{}' (ID {})", A::KIND, name, state.id());
        let id = state.id().to_string();
        *state = desired.clone();
        state.set_id(id);

        self.read_back(state, &name).await
    }

    /// Deletes by ID, falling back to name. The ID is cleared only on success.
    pub async fn delete<S>(&self, state: &mut S) -> Vec<Diagnostic>
    where
        S: ResourceState<A::Entity>,
    {
        let name = state.name().to_string();
        let chain = match self.chain_for(state) {
            Ok(chain) => chain,
            Err(e) => return vec![e.to_diagnostic("delete", A::KIND, &name)],
        };

        let api = &self.api;
        let chain = &chain;
        let deleted = retry_context(self.ctx, self.timeouts.delete, self.backoff, |_| async move {
            chain
                .run(move |locator| async move {
                    match locator {
                        Locator::ById(id) => api.delete_by_id(&id).await,
                        Locator::ByName(name) => api.delete_by_name(&name).await,
                    }
                })
                .await
                .map_err(retry_lookup)
        })
        .await;

        match deleted {
            Ok(()) => {
                tracing::info!("Deleted {} '{}'", A::KIND, name);
                state.set_id(String::new());
                vec![]
            }
            Err(failure) => {
                tracing::error!("Failed to delete {} '{}': {}", A::KIND, name, failure);
                vec![ReconcileError::from(failure).to_diagnostic("delete", A::KIND, &name)]
            }
        }
    }

    /// Runs a lookup chain under the read timeout
    pub async fn find(&self, chain: &LookupChain<A::Id>) -> Result<A::Entity, ReconcileError> {
        self.lookup(chain, self.timeouts.read).await
    }

    async fn read_back<S>(&self, state: &mut S, name: &str) -> Vec<Diagnostic>
    where
        S: ResourceState<A::Entity>,
    {
        match self.fetch(state, self.timeouts.read).await {
            Ok(entity) => {
                state.refresh(&entity);
                vec![]
            }
            Err(e) => {
                tracing::error!("Failed to read back {} '{}': {}", A::KIND, name, e);
                vec![e.to_diagnostic("read back", A::KIND, name)]
            }
        }
    }

    async fn fetch<S>(&self, state: &S, timeout: Duration) -> Result<A::Entity, ReconcileError>
    where
        S: ResourceState<A::Entity>,
    {
        let chain = self.chain_for(state)?;
        self.lookup(&chain, timeout).await
    }

    async fn lookup(
        &self,
        chain: &LookupChain<A::Id>,
        timeout: Duration,
    ) -> Result<A::Entity, ReconcileError> {
        let api = &self.api;
        retry_context(self.ctx, timeout, self.backoff, |_| async move {
            chain
                .run(move |locator| async move {
                    match locator {
                        Locator::ById(id) => api.get_by_id(&id).await,
                        Locator::ByName(name) => api.get_by_name(&name).await,
                    }
                })
                .await
                .map_err(retry_lookup)
        })
        .await
        .map_err(ReconcileError::from)
    }

    fn chain_for<S>(&self, state: &S) -> Result<LookupChain<A::Id>, ReconcileError>
    where
        S: ResourceState<A::Entity>,
    {
        let id = A::parse_id(state.id()).map_err(|reason| ReconcileError::InvalidId {
            raw: state.id().to_string(),
            reason,
        })?;
        Ok(LookupChain::by_id_then_name(id, state.name()))
    }
}

fn retry_lookup(failure: LookupFailure) -> RetryError<LookupFailure> {
    if failure.is_transient() {
        RetryError::Retryable(failure)
    } else {
        RetryError::NonRetryable(failure)
    }
}

fn display_name(name: &str) -> &str {
    if name.is_empty() {
        "unknown"
    } else {
        name
    }
}
