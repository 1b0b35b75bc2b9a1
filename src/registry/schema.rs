//! Registry schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query
//! building.

use sea_query::Iden;

/// Messaging modules table schema.
#[derive(Iden)]
pub enum MessagingModules {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "event_type_id"]
    EventTypeId,
    #[iden = "module_id"]
    ModuleId,
    #[iden = "tenant_id"]
    TenantId,
    #[iden = "role"]
    Role,
    #[iden = "is_applied"]
    IsApplied,
    #[iden = "subscriber_callback"]
    SubscriberCallback,
}

/// SQL for creating the messaging modules table.
///
/// `subscriber_callback` is nullable: absence of a callback is stored as
/// NULL, never as an empty-string marker.
pub const CREATE_MESSAGING_MODULES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS messaging_modules (
    id TEXT PRIMARY KEY,
    event_type_id TEXT NOT NULL,
    module_id TEXT NOT NULL,
    tenant_id TEXT NOT NULL,
    role TEXT NOT NULL,
    is_applied BOOLEAN NOT NULL DEFAULT TRUE,
    subscriber_callback TEXT
);
"#;

/// SQL for the tenant lookup index.
pub const CREATE_TENANT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_messaging_modules_tenant ON messaging_modules(tenant_id)";
