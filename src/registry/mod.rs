//! Subscription registry.
//!
//! Stores which modules act as publishers or subscribers for which event
//! types per tenant. A routing layer queries this registry to resolve
//! fan-out targets; it is not on the publish hot path.
//!
//! This module contains:
//! - `MessagingModule`: one module-role registration
//! - `MessagingModuleFilter`: conjunctive query descriptor
//! - `ModuleRegistry` trait
//! - Implementations: Postgres, Mock

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::DatabaseConfig;

pub mod mock;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "postgres")]
pub mod schema;

pub use mock::MockModuleRegistry;
#[cfg(feature = "postgres")]
pub use postgres::PostgresModuleRegistry;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// An update addressed an id with no matching row.
    #[error("Messaging module with id '{id}' was not found")]
    NotFound { id: String },

    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Persistence failed: {0}")]
    Persistence(String),
}

/// Whether a registered module produces or consumes an event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleRole {
    Publisher,
    Subscriber,
}

/// Raised when a persisted role value is not a known `ModuleRole`.
#[derive(Debug, thiserror::Error)]
#[error("Unknown module role '{0}'")]
pub struct UnknownRoleError(pub String);

impl ModuleRole {
    /// Wire representation, used for both persistence paths (insert and
    /// update bind the same value).
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleRole::Publisher => "PUBLISHER",
            ModuleRole::Subscriber => "SUBSCRIBER",
        }
    }
}

impl std::str::FromStr for ModuleRole {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PUBLISHER" => Ok(ModuleRole::Publisher),
            "SUBSCRIBER" => Ok(ModuleRole::Subscriber),
            other => Err(UnknownRoleError(other.to_string())),
        }
    }
}

impl std::fmt::Display for ModuleRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One module-role registration.
///
/// Uniquely addressed by `id`; `(event_type_id, module_id, tenant_id,
/// role)` is the business key filters work over, but uniqueness across
/// that tuple is left to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingModule {
    /// Unique identifier, immutable once created. Supplied by the caller.
    pub id: String,
    /// Event category this registration concerns.
    pub event_type_id: String,
    /// Owning service module.
    pub module_id: String,
    /// Owning tenant.
    pub tenant_id: String,
    /// Publisher or subscriber.
    pub role: ModuleRole,
    /// Whether the registration is currently in effect.
    pub applied: bool,
    /// Delivery callback, meaningful only for subscribers.
    pub subscriber_callback: Option<String>,
}

/// Conjunctive query descriptor over `MessagingModule` fields.
///
/// Absent fields impose no constraint; present fields AND together as
/// opaque equality (no pattern matching, no case folding).
#[derive(Debug, Clone, Default)]
pub struct MessagingModuleFilter {
    pub event_type_id: Option<String>,
    pub module_id: Option<String>,
    pub tenant_id: Option<String>,
    pub role: Option<ModuleRole>,
    pub applied: Option<bool>,
    pub subscriber_callback: Option<String>,
}

impl MessagingModuleFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event_type_id(mut self, event_type_id: impl Into<String>) -> Self {
        self.event_type_id = Some(event_type_id.into());
        self
    }

    pub fn with_module_id(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = Some(module_id.into());
        self
    }

    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_role(mut self, role: ModuleRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_applied(mut self, applied: bool) -> Self {
        self.applied = Some(applied);
        self
    }

    pub fn with_subscriber_callback(mut self, callback: impl Into<String>) -> Self {
        self.subscriber_callback = Some(callback.into());
        self
    }

    /// Whether `module` satisfies every present field.
    pub fn matches(&self, module: &MessagingModule) -> bool {
        self.event_type_id
            .as_ref()
            .map_or(true, |v| *v == module.event_type_id)
            && self
                .module_id
                .as_ref()
                .map_or(true, |v| *v == module.module_id)
            && self
                .tenant_id
                .as_ref()
                .map_or(true, |v| *v == module.tenant_id)
            && self.role.map_or(true, |v| v == module.role)
            && self.applied.map_or(true, |v| v == module.applied)
            && self
                .subscriber_callback
                .as_ref()
                .map_or(true, |v| Some(v) == module.subscriber_callback.as_ref())
    }
}

/// Interface for module-role registrations.
///
/// Each operation is a single atomic statement; callers needing
/// atomicity across several writes must coordinate externally.
///
/// Implementations:
/// - `PostgresModuleRegistry`: PostgreSQL storage
/// - `MockModuleRegistry`: In-memory mock for testing
#[async_trait]
pub trait ModuleRegistry: Send + Sync {
    /// Fetch all registrations satisfying `filter`, in store-native order.
    ///
    /// An empty filter returns every row.
    async fn get(&self, filter: &MessagingModuleFilter) -> Result<Vec<MessagingModule>>;

    /// Fetch one registration by id. Absence is `Ok(None)`, not an error.
    async fn get_by_id(&self, id: &str) -> Result<Option<MessagingModule>>;

    /// Insert a new registration and return its id.
    async fn save(&self, module: &MessagingModule) -> Result<String>;

    /// Full-column update addressed by `id`.
    ///
    /// Fails with `RegistryError::NotFound` unless exactly one row was
    /// affected - the store does not distinguish "no such id" from other
    /// zero-row conditions at this layer.
    async fn update(&self, id: &str, module: &MessagingModule) -> Result<MessagingModule>;

    /// Remove a registration. True iff exactly one row was removed.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// Initialize the module registry from configuration.
///
/// Connects to Postgres and ensures the schema exists. Requires the
/// `postgres` feature.
#[cfg(feature = "postgres")]
pub async fn init_registry(
    config: &DatabaseConfig,
) -> std::result::Result<Arc<dyn ModuleRegistry>, Box<dyn std::error::Error + Send + Sync>> {
    let pool = sqlx::PgPool::connect(&config.url).await?;

    let registry = PostgresModuleRegistry::new(pool);
    registry.init_schema().await?;
    tracing::info!(registry_type = "postgres", "Module registry initialized");

    Ok(Arc::new(registry))
}

#[cfg(not(feature = "postgres"))]
pub async fn init_registry(
    _config: &DatabaseConfig,
) -> std::result::Result<Arc<dyn ModuleRegistry>, Box<dyn std::error::Error + Send + Sync>> {
    Err("Postgres support requires the 'postgres' feature. Rebuild with --features postgres".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(id: &str, tenant: &str, role: ModuleRole) -> MessagingModule {
        MessagingModule {
            id: id.to_string(),
            event_type_id: "RECORD_CREATED".to_string(),
            module_id: "mod-a".to_string(),
            tenant_id: tenant.to_string(),
            role,
            applied: true,
            subscriber_callback: None,
        }
    }

    #[test]
    fn test_role_wire_representation_round_trips() {
        for role in [ModuleRole::Publisher, ModuleRole::Subscriber] {
            assert_eq!(role.as_str().parse::<ModuleRole>().unwrap(), role);
        }
        assert!("CONSUMER".parse::<ModuleRole>().is_err());
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = MessagingModuleFilter::new();
        assert!(filter.matches(&module("m1", "t1", ModuleRole::Publisher)));
        assert!(filter.matches(&module("m2", "t2", ModuleRole::Subscriber)));
    }

    #[test]
    fn test_filter_fields_and_together() {
        let filter = MessagingModuleFilter::new()
            .with_tenant_id("t1")
            .with_role(ModuleRole::Subscriber);

        assert!(filter.matches(&module("m1", "t1", ModuleRole::Subscriber)));
        assert!(!filter.matches(&module("m2", "t1", ModuleRole::Publisher)));
        assert!(!filter.matches(&module("m3", "t2", ModuleRole::Subscriber)));
    }
}
