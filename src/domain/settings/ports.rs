use async_trait::async_trait;

use super::entities::Setting;
use super::errors::SettingsError;

#[async_trait]
pub trait SettingsRepository: Send + Sync {
  async fn find_by_key(&self, key: &str) -> Result<Option<Setting>, SettingsError>;
  async fn find_all(&self) -> Result<Vec<Setting>, SettingsError>;
  async fn find_by_group(&self, group: &str) -> Result<Vec<Setting>, SettingsError>;
  async fn upsert(&self, setting: Setting) -> Result<Setting, SettingsError>;
}
