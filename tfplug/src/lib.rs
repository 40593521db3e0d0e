//! tfplug - Terraform Plugin Framework for Rust
//!
//! A framework for building Terraform providers in Rust. It provides the
//! value model Terraform exchanges with providers, schema declaration, the
//! provider/resource/data source traits a plugin host drives, and the helpers
//! providers need to talk to flaky remote APIs (retry with deadlines,
//! per-operation timeouts).

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;

// Helper modules
pub mod defaults;
pub mod import;
pub mod logging;
pub mod plan_modifier;
pub mod retry;
pub mod timeouts;
pub mod validator;

// Re-exports for convenience
pub use context::Context;
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use import::import_state_passthrough_id;
pub use logging::LogLevel;
pub use provider::{Provider, ProviderMetadataRequest, ProviderMetadataResponse};
pub use resource::{Resource, ResourceWithConfigure, ResourceWithImportState};
pub use retry::{retry_context, Backoff, RetryError, RetryFailure};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use timeouts::{Timeouts, TimeoutsConfig};
pub use types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
