//! Mock ModuleRegistry implementation for testing.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    MessagingModule, MessagingModuleFilter, ModuleRegistry, RegistryError, Result,
};

/// Mock registry that stores registrations in memory.
///
/// Rows keep insertion order, so repeated `get` calls over identical data
/// return identical orderings.
#[derive(Default)]
pub struct MockModuleRegistry {
    modules: RwLock<Vec<MessagingModule>>,
    fail_on_get: RwLock<bool>,
    fail_on_save: RwLock<bool>,
}

impl MockModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_get(&self, fail: bool) {
        *self.fail_on_get.write().await = fail;
    }

    pub async fn set_fail_on_save(&self, fail: bool) {
        *self.fail_on_save.write().await = fail;
    }

    pub async fn module_count(&self) -> usize {
        self.modules.read().await.len()
    }
}

#[async_trait]
impl ModuleRegistry for MockModuleRegistry {
    async fn get(&self, filter: &MessagingModuleFilter) -> Result<Vec<MessagingModule>> {
        if *self.fail_on_get.read().await {
            return Err(RegistryError::Persistence("Mock get failure".to_string()));
        }
        Ok(self
            .modules
            .read()
            .await
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<MessagingModule>> {
        if *self.fail_on_get.read().await {
            return Err(RegistryError::Persistence("Mock get failure".to_string()));
        }
        Ok(self
            .modules
            .read()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn save(&self, module: &MessagingModule) -> Result<String> {
        if *self.fail_on_save.read().await {
            return Err(RegistryError::Persistence("Mock save failure".to_string()));
        }
        let mut modules = self.modules.write().await;
        if modules.iter().any(|m| m.id == module.id) {
            return Err(RegistryError::Persistence(format!(
                "Duplicate id '{}'",
                module.id
            )));
        }
        modules.push(module.clone());
        Ok(module.id.clone())
    }

    async fn update(&self, id: &str, module: &MessagingModule) -> Result<MessagingModule> {
        let mut modules = self.modules.write().await;
        let row = modules
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?;

        // Full-column update; the row keeps its addressed id.
        *row = MessagingModule {
            id: id.to_string(),
            ..module.clone()
        };
        Ok(row.clone())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut modules = self.modules.write().await;
        let before = modules.len();
        modules.retain(|m| m.id != id);
        Ok(before - modules.len() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::super::ModuleRole;
    use super::*;

    fn subscriber(id: &str, tenant: &str) -> MessagingModule {
        MessagingModule {
            id: id.to_string(),
            event_type_id: "RECORD_CREATED".to_string(),
            module_id: "mod-a".to_string(),
            tenant_id: tenant.to_string(),
            role: ModuleRole::Subscriber,
            applied: true,
            subscriber_callback: Some(format!("http://{}/handle", id)),
        }
    }

    #[tokio::test]
    async fn test_save_and_get_by_id_round_trip() {
        let registry = MockModuleRegistry::new();
        let module = MessagingModule {
            subscriber_callback: None,
            ..subscriber("m1", "t1")
        };

        let id = registry.save(&module).await.unwrap();
        assert_eq!(id, "m1");

        let fetched = registry.get_by_id("m1").await.unwrap().unwrap();
        assert_eq!(fetched, module);
        assert!(fetched.subscriber_callback.is_none());
    }

    #[tokio::test]
    async fn test_save_duplicate_id_is_persistence_error() {
        let registry = MockModuleRegistry::new();
        registry.save(&subscriber("m1", "t1")).await.unwrap();

        let result = registry.save(&subscriber("m1", "t1")).await;
        assert!(matches!(result, Err(RegistryError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_get_with_empty_filter_returns_all() {
        let registry = MockModuleRegistry::new();
        registry.save(&subscriber("m1", "t1")).await.unwrap();
        registry.save(&subscriber("m2", "t2")).await.unwrap();

        let all = registry.get(&MessagingModuleFilter::new()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_get_filters_by_single_field() {
        let registry = MockModuleRegistry::new();
        registry.save(&subscriber("m1", "t1")).await.unwrap();
        registry.save(&subscriber("m2", "t2")).await.unwrap();

        let filter = MessagingModuleFilter::new().with_tenant_id("t2");
        let matched = registry.get(&filter).await.unwrap();

        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "m2");
    }

    #[tokio::test]
    async fn test_update_missing_id_is_not_found() {
        let registry = MockModuleRegistry::new();

        let result = registry.update("m9", &subscriber("m9", "t1")).await;

        assert!(matches!(
            result,
            Err(RegistryError::NotFound { ref id }) if id == "m9"
        ));
        assert_eq!(registry.module_count().await, 0);
    }

    #[tokio::test]
    async fn test_update_replaces_all_columns() {
        let registry = MockModuleRegistry::new();
        registry.save(&subscriber("m1", "t1")).await.unwrap();

        let mut changed = subscriber("m1", "t1");
        changed.applied = false;
        changed.subscriber_callback = None;

        let updated = registry.update("m1", &changed).await.unwrap();
        assert!(!updated.applied);
        assert!(updated.subscriber_callback.is_none());

        let fetched = registry.get_by_id("m1").await.unwrap().unwrap();
        assert_eq!(fetched, updated);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_in_effect() {
        let registry = MockModuleRegistry::new();
        registry.save(&subscriber("m1", "t1")).await.unwrap();

        assert!(registry.delete("m1").await.unwrap());
        assert!(!registry.delete("m1").await.unwrap());
        assert!(registry.get_by_id("m1").await.unwrap().is_none());
    }
}
