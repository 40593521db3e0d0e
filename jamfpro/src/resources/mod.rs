//! Resource implementations

pub mod account;
pub mod department;
pub mod site;

pub use account::AccountResource;
pub use department::DepartmentResource;
pub use site::SiteResource;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tfplug::resource::{
    CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ReadResourceRequest, ReadResourceResponse, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::Schema;
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::{Context, Timeouts, TimeoutsConfig};

use crate::api::Client;
use crate::reconcile::{EntityApi, ReconcileError, Reconciler, ResourceState};
use crate::JamfProProviderData;

/// A resource whose CRUD callbacks run through a [`Reconciler`]
#[async_trait]
pub(crate) trait ManagedResource: Send + Sync {
    type Entity: Send + Sync;
    type Model: ResourceState<Self::Entity> + Serialize + DeserializeOwned;
    type Api<'a>: EntityApi<Entity = Self::Entity>;

    const DEFAULT_TIMEOUT: Duration;

    fn provider_data(&self) -> Option<&JamfProProviderData>;

    fn api(client: &Client) -> Self::Api<'_>;

    fn schema() -> Schema;

    fn timeouts(model: &Self::Model) -> Option<&TimeoutsConfig>;

    /// Builds the API request from configuration
    async fn construct(&self, model: &Self::Model) -> Result<Self::Entity, ReconcileError>;

    /// Rules spanning several attributes
    fn validate_model(_config: &DynamicValue, _model: &Self::Model) -> Vec<Diagnostic> {
        vec![]
    }
}

fn reconciler_for<'a, R: ManagedResource>(
    resource: &'a R,
    ctx: &'a Context,
    model: &R::Model,
) -> Result<Reconciler<'a, R::Api<'a>>, Diagnostic> {
    let data = resource.provider_data().ok_or_else(not_configured)?;
    let timeouts = resolve_timeouts(R::DEFAULT_TIMEOUT, R::timeouts(model))?;
    Ok(Reconciler::new(ctx, R::api(&data.client), timeouts).with_backoff(data.backoff))
}

pub(crate) fn validate<R: ManagedResource>(
    request: ValidateResourceConfigRequest,
) -> ValidateResourceConfigResponse {
    let mut diagnostics = R::schema().validate_config(&request.config);

    match request.config.to_model::<R::Model>() {
        Ok(model) => {
            diagnostics.extend(R::validate_model(&request.config, &model));
            if let Err(diag) = resolve_timeouts(R::DEFAULT_TIMEOUT, R::timeouts(&model)) {
                diagnostics.push(diag);
            }
        }
        Err(e) => diagnostics.push(Diagnostic::error(
            "Failed to decode configuration",
            e.to_string(),
        )),
    }

    ValidateResourceConfigResponse { diagnostics }
}

pub(crate) async fn create<R: ManagedResource>(
    resource: &R,
    ctx: &Context,
    request: CreateResourceRequest,
) -> CreateResourceResponse {
    let prepared = decode::<R::Model>(&request.planned_state, "planned state").and_then(|state| {
        reconciler_for(resource, ctx, &state).map(|reconciler| (state, reconciler))
    });
    let (mut state, reconciler) = match prepared {
        Ok(prepared) => prepared,
        Err(diag) => {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![diag],
            }
        }
    };

    let entity = match resource.construct(&state).await {
        Ok(entity) => entity,
        Err(e) => {
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                diagnostics: vec![e.to_diagnostic("create", reconciler.kind(), state.name())],
            }
        }
    };

    let mut diagnostics = reconciler.create(&mut state, &entity).await;

    CreateResourceResponse {
        new_state: encode_state(&state, state.id(), &mut diagnostics),
        diagnostics,
    }
}

pub(crate) async fn read<R: ManagedResource>(
    resource: &R,
    ctx: &Context,
    request: ReadResourceRequest,
) -> ReadResourceResponse {
    let prepared = decode::<R::Model>(&request.current_state, "state").and_then(|state| {
        reconciler_for(resource, ctx, &state).map(|reconciler| (state, reconciler))
    });
    let (mut state, reconciler) = match prepared {
        Ok(prepared) => prepared,
        Err(diag) => {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![diag],
            }
        }
    };

    let mut diagnostics = reconciler.read(&mut state).await;
    let new_state = if state.id().is_empty() {
        None
    } else {
        Some(encode_state(&state, state.id(), &mut diagnostics))
    };

    ReadResourceResponse {
        new_state,
        diagnostics,
    }
}

pub(crate) async fn update<R: ManagedResource>(
    resource: &R,
    ctx: &Context,
    request: UpdateResourceRequest,
) -> UpdateResourceResponse {
    let prepared = decode::<R::Model>(&request.prior_state, "prior state").and_then(|state| {
        let desired = decode::<R::Model>(&request.planned_state, "planned state")?;
        let reconciler = reconciler_for(resource, ctx, &desired)?;
        Ok((state, desired, reconciler))
    });
    let (mut state, desired, reconciler) = match prepared {
        Ok(prepared) => prepared,
        Err(diag) => {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![diag],
            }
        }
    };

    let entity = match resource.construct(&desired).await {
        Ok(entity) => entity,
        Err(e) => {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![e.to_diagnostic("update", reconciler.kind(), desired.name())],
            }
        }
    };

    let mut diagnostics = reconciler.update(&mut state, &desired, &entity).await;

    UpdateResourceResponse {
        new_state: encode_state(&state, state.id(), &mut diagnostics),
        diagnostics,
    }
}

pub(crate) async fn delete<R: ManagedResource>(
    resource: &R,
    ctx: &Context,
    request: DeleteResourceRequest,
) -> DeleteResourceResponse {
    let prepared = decode::<R::Model>(&request.prior_state, "prior state").and_then(|state| {
        reconciler_for(resource, ctx, &state).map(|reconciler| (state, reconciler))
    });
    let (mut state, reconciler) = match prepared {
        Ok(prepared) => prepared,
        Err(diag) => {
            return DeleteResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![diag],
            }
        }
    };

    let mut diagnostics = reconciler.delete(&mut state).await;

    DeleteResourceResponse {
        new_state: encode_state(&state, state.id(), &mut diagnostics),
        diagnostics,
    }
}

/// Extracts the provider's data handed to a resource or data source
pub(crate) fn provider_data_from(
    data: Option<Arc<dyn Any + Send + Sync>>,
) -> Result<JamfProProviderData, Diagnostic> {
    match data {
        Some(data) => data
            .downcast_ref::<JamfProProviderData>()
            .cloned()
            .ok_or_else(|| {
                Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract JamfProProviderData from provider data",
                )
            }),
        None => Err(Diagnostic::error(
            "No provider data",
            "No provider data was provided to the resource",
        )),
    }
}

pub(crate) fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

pub(crate) fn decode<T: DeserializeOwned>(value: &DynamicValue, what: &str) -> Result<T, Diagnostic> {
    value
        .to_model()
        .map_err(|e| Diagnostic::error(format!("Failed to decode {}", what), e.to_string()))
}

/// Encodes state. A resource without an ID has no state.
pub(crate) fn encode_state<T: Serialize>(
    model: &T,
    id: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> DynamicValue {
    if id.is_empty() {
        return DynamicValue::null();
    }
    DynamicValue::from_model(model).unwrap_or_else(|e| {
        diagnostics.push(Diagnostic::error("Failed to encode state", e.to_string()));
        DynamicValue::null()
    })
}

pub(crate) fn resolve_timeouts(
    default: Duration,
    config: Option<&TimeoutsConfig>,
) -> Result<Timeouts, Diagnostic> {
    Timeouts::uniform(default)
        .with_overrides(config)
        .map_err(|e| {
            Diagnostic::error("Invalid timeouts", e.to_string())
                .with_attribute(AttributePath::new("timeouts"))
        })
}
