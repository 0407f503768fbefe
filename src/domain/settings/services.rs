use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::auth::Actor;
use crate::domain::billing::TaxContext;

use super::entities::{Setting, SettingType, keys};
use super::errors::SettingsError;
use super::ports::SettingsRepository;

/// Settings service with an in-process read cache.
///
/// Reads go through the cache; every write invalidates the touched key so
/// the next read sees the committed value. The tax rules never read this
/// directly: they get a `TaxContext` snapshot taken at the start of the
/// computation.
pub struct SettingsService {
  repo: Arc<dyn SettingsRepository>,
  cache: RwLock<HashMap<String, Option<Setting>>>,
}

impl SettingsService {
  pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
    Self {
      repo,
      cache: RwLock::new(HashMap::new()),
    }
  }

  pub async fn get(&self, key: &str) -> Result<Option<Setting>, SettingsError> {
    {
      let cache = self.cache.read().await;
      if let Some(cached) = cache.get(key) {
        return Ok(cached.clone());
      }
    }

    let setting = self.repo.find_by_key(key).await?;
    self
      .cache
      .write()
      .await
      .insert(key.to_string(), setting.clone());
    Ok(setting)
  }

  pub async fn get_bool(&self, key: &str) -> Result<bool, SettingsError> {
    Ok(self.get(key).await?.map(|s| s.as_bool()).unwrap_or(false))
  }

  pub async fn get_string(&self, key: &str) -> Result<Option<String>, SettingsError> {
    Ok(self.get(key).await?.and_then(|s| s.value))
  }

  pub async fn list(&self, actor: Actor) -> Result<Vec<Setting>, SettingsError> {
    if !actor.is_admin() {
      return Err(SettingsError::PermissionDenied(
        "Admin role required".to_string(),
      ));
    }
    self.repo.find_all().await
  }

  /// Upserts a setting and invalidates its cache entry.
  pub async fn set(
    &self,
    actor: Actor,
    key: String,
    value: Option<String>,
    setting_type: SettingType,
    group: String,
  ) -> Result<Setting, SettingsError> {
    if !actor.is_admin() {
      return Err(SettingsError::PermissionDenied(
        "Admin role required".to_string(),
      ));
    }

    let setting = match self.repo.find_by_key(&key).await? {
      Some(mut existing) => {
        existing.value = value;
        existing.setting_type = setting_type;
        existing.updated_at = chrono::Utc::now();
        existing
      }
      None => Setting::new(key.clone(), value, setting_type, None, group),
    };

    let saved = self.repo.upsert(setting).await?;
    self.cache.write().await.remove(&key);
    tracing::info!(%key, "Setting updated, cache invalidated");
    Ok(saved)
  }

  /// Snapshot of the tax-relevant settings for one computation.
  pub async fn tax_context(&self) -> Result<TaxContext, SettingsError> {
    Ok(TaxContext {
      small_business: self.get_bool(keys::COMPANY_SMALL_BUSINESS).await?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::auth::Role;
  use async_trait::async_trait;
  use std::sync::Mutex;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use uuid::Uuid;

  #[derive(Default)]
  struct InMemorySettings {
    settings: Mutex<HashMap<String, Setting>>,
    reads: AtomicUsize,
  }

  #[async_trait]
  impl SettingsRepository for InMemorySettings {
    async fn find_by_key(&self, key: &str) -> Result<Option<Setting>, SettingsError> {
      self.reads.fetch_add(1, Ordering::SeqCst);
      Ok(self.settings.lock().unwrap().get(key).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Setting>, SettingsError> {
      Ok(self.settings.lock().unwrap().values().cloned().collect())
    }

    async fn find_by_group(&self, group: &str) -> Result<Vec<Setting>, SettingsError> {
      Ok(
        self
          .settings
          .lock()
          .unwrap()
          .values()
          .filter(|s| s.group == group)
          .cloned()
          .collect(),
      )
    }

    async fn upsert(&self, setting: Setting) -> Result<Setting, SettingsError> {
      self
        .settings
        .lock()
        .unwrap()
        .insert(setting.key.clone(), setting.clone());
      Ok(setting)
    }
  }

  fn admin() -> Actor {
    Actor::new(Uuid::new_v4(), Role::Admin)
  }

  #[tokio::test]
  async fn test_reads_are_cached() {
    let repo = Arc::new(InMemorySettings::default());
    let service = SettingsService::new(repo.clone());

    assert!(!service.get_bool(keys::COMPANY_SMALL_BUSINESS).await.unwrap());
    assert!(!service.get_bool(keys::COMPANY_SMALL_BUSINESS).await.unwrap());

    assert_eq!(repo.reads.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_update_invalidates_cache() {
    let repo = Arc::new(InMemorySettings::default());
    let service = SettingsService::new(repo.clone());

    // prime the cache with the missing value
    assert!(!service.get_bool(keys::COMPANY_SMALL_BUSINESS).await.unwrap());

    service
      .set(
        admin(),
        keys::COMPANY_SMALL_BUSINESS.to_string(),
        Some("1".to_string()),
        SettingType::Boolean,
        "company".to_string(),
      )
      .await
      .unwrap();

    assert!(service.get_bool(keys::COMPANY_SMALL_BUSINESS).await.unwrap());
  }

  #[tokio::test]
  async fn test_tax_context_snapshot() {
    let repo = Arc::new(InMemorySettings::default());
    let service = SettingsService::new(repo.clone());

    assert!(!service.tax_context().await.unwrap().small_business);

    service
      .set(
        admin(),
        keys::COMPANY_SMALL_BUSINESS.to_string(),
        Some("true".to_string()),
        SettingType::Boolean,
        "company".to_string(),
      )
      .await
      .unwrap();

    assert!(service.tax_context().await.unwrap().small_business);
  }

  #[tokio::test]
  async fn test_non_admin_cannot_update() {
    let repo = Arc::new(InMemorySettings::default());
    let service = SettingsService::new(repo);

    let actor = Actor::new(Uuid::new_v4(), Role::Customer);
    let result = service
      .set(
        actor,
        keys::COMPANY_SMALL_BUSINESS.to_string(),
        Some("1".to_string()),
        SettingType::Boolean,
        "company".to_string(),
      )
      .await;

    assert!(matches!(result, Err(SettingsError::PermissionDenied(_))));
  }
}
