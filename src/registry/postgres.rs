//! PostgreSQL implementation of ModuleRegistry.
//!
//! Every statement is built with sea-query and executed with bound
//! parameters via sea-query-binder. Filter values originate from
//! externally supplied identifiers and are never interpolated into the
//! statement text.

use async_trait::async_trait;
use sea_query::{Expr, PostgresQueryBuilder, Query, SelectStatement};
use sea_query_binder::SqlxBinder;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::schema::{CREATE_MESSAGING_MODULES_TABLE, CREATE_TENANT_INDEX, MessagingModules};
use super::{
    MessagingModule, MessagingModuleFilter, ModuleRegistry, ModuleRole, RegistryError, Result,
};

/// PostgreSQL-backed module registry.
pub struct PostgresModuleRegistry {
    pool: PgPool,
}

impl PostgresModuleRegistry {
    /// Create a new PostgreSQL module registry.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the registry table and indexes if they do not exist.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(CREATE_MESSAGING_MODULES_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(CREATE_TENANT_INDEX).execute(&self.pool).await?;
        Ok(())
    }

    fn select_all_columns() -> SelectStatement {
        Query::select()
            .columns([
                MessagingModules::Id,
                MessagingModules::EventTypeId,
                MessagingModules::ModuleId,
                MessagingModules::TenantId,
                MessagingModules::Role,
                MessagingModules::IsApplied,
                MessagingModules::SubscriberCallback,
            ])
            .from(MessagingModules::Table)
            .to_owned()
    }

    /// Add one bound equality predicate per present filter field.
    fn apply_filter(query: &mut SelectStatement, filter: &MessagingModuleFilter) {
        if let Some(ref event_type_id) = filter.event_type_id {
            query.and_where(Expr::col(MessagingModules::EventTypeId).eq(event_type_id.as_str()));
        }
        if let Some(ref module_id) = filter.module_id {
            query.and_where(Expr::col(MessagingModules::ModuleId).eq(module_id.as_str()));
        }
        if let Some(ref tenant_id) = filter.tenant_id {
            query.and_where(Expr::col(MessagingModules::TenantId).eq(tenant_id.as_str()));
        }
        if let Some(role) = filter.role {
            query.and_where(Expr::col(MessagingModules::Role).eq(role.as_str()));
        }
        if let Some(applied) = filter.applied {
            query.and_where(Expr::col(MessagingModules::IsApplied).eq(applied));
        }
        if let Some(ref callback) = filter.subscriber_callback {
            query.and_where(Expr::col(MessagingModules::SubscriberCallback).eq(callback.as_str()));
        }
    }

    fn map_row(row: &PgRow) -> Result<MessagingModule> {
        let role_str: String = row.get("role");
        let role: ModuleRole = role_str
            .parse()
            .map_err(|e: super::UnknownRoleError| RegistryError::Persistence(e.to_string()))?;

        Ok(MessagingModule {
            id: row.get("id"),
            event_type_id: row.get("event_type_id"),
            module_id: row.get("module_id"),
            tenant_id: row.get("tenant_id"),
            role,
            applied: row.get("is_applied"),
            subscriber_callback: row.get("subscriber_callback"),
        })
    }
}

#[async_trait]
impl ModuleRegistry for PostgresModuleRegistry {
    async fn get(&self, filter: &MessagingModuleFilter) -> Result<Vec<MessagingModule>> {
        let mut query = Self::select_all_columns();
        Self::apply_filter(&mut query, filter);

        let (sql, values) = query.build_sqlx(PostgresQueryBuilder);
        let rows = sqlx::query_with(&sql, values).fetch_all(&self.pool).await?;

        rows.iter().map(Self::map_row).collect()
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<MessagingModule>> {
        let (sql, values) = Self::select_all_columns()
            .and_where(Expr::col(MessagingModules::Id).eq(id))
            .build_sqlx(PostgresQueryBuilder);

        let row = sqlx::query_with(&sql, values)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn save(&self, module: &MessagingModule) -> Result<String> {
        let (sql, values) = Query::insert()
            .into_table(MessagingModules::Table)
            .columns([
                MessagingModules::Id,
                MessagingModules::EventTypeId,
                MessagingModules::ModuleId,
                MessagingModules::TenantId,
                MessagingModules::Role,
                MessagingModules::IsApplied,
                MessagingModules::SubscriberCallback,
            ])
            .values_panic([
                module.id.clone().into(),
                module.event_type_id.clone().into(),
                module.module_id.clone().into(),
                module.tenant_id.clone().into(),
                module.role.as_str().into(),
                module.applied.into(),
                module.subscriber_callback.clone().into(),
            ])
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_with(&sql, values).execute(&self.pool).await?;

        Ok(module.id.clone())
    }

    async fn update(&self, id: &str, module: &MessagingModule) -> Result<MessagingModule> {
        let (sql, values) = Query::update()
            .table(MessagingModules::Table)
            .values([
                (
                    MessagingModules::EventTypeId,
                    module.event_type_id.clone().into(),
                ),
                (MessagingModules::ModuleId, module.module_id.clone().into()),
                (MessagingModules::TenantId, module.tenant_id.clone().into()),
                (MessagingModules::Role, module.role.as_str().into()),
                (MessagingModules::IsApplied, module.applied.into()),
                (
                    MessagingModules::SubscriberCallback,
                    module.subscriber_callback.clone().into(),
                ),
            ])
            .and_where(Expr::col(MessagingModules::Id).eq(id))
            .build_sqlx(PostgresQueryBuilder);

        let result = sqlx::query_with(&sql, values).execute(&self.pool).await?;

        // Zero rows affected is indistinguishable from "no such id" here.
        if result.rows_affected() != 1 {
            return Err(RegistryError::NotFound { id: id.to_string() });
        }

        Ok(MessagingModule {
            id: id.to_string(),
            ..module.clone()
        })
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let (sql, values) = Query::delete()
            .from_table(MessagingModules::Table)
            .and_where(Expr::col(MessagingModules::Id).eq(id))
            .build_sqlx(PostgresQueryBuilder);

        let result = sqlx::query_with(&sql, values).execute(&self.pool).await?;

        Ok(result.rows_affected() == 1)
    }
}
