use serde::Serialize;
use std::sync::Arc;

use crate::domain::auth::Actor;
use crate::domain::settings::{SettingType, SettingsError, SettingsService};

#[derive(Debug)]
pub struct GetSettingsCommand {
  pub actor: Actor,
}

#[derive(Debug, Serialize)]
pub struct SettingDto {
  pub key: String,
  pub value: Option<String>,
  #[serde(rename = "type")]
  pub setting_type: SettingType,
  pub description: Option<String>,
  pub group: String,
}

#[derive(Debug, Serialize)]
pub struct GetSettingsResponse {
  pub settings: Vec<SettingDto>,
}

pub struct GetSettingsUseCase {
  settings_service: Arc<SettingsService>,
}

impl GetSettingsUseCase {
  pub fn new(settings_service: Arc<SettingsService>) -> Self {
    Self { settings_service }
  }

  pub async fn execute(
    &self,
    command: GetSettingsCommand,
  ) -> Result<GetSettingsResponse, SettingsError> {
    let mut settings = self.settings_service.list(command.actor).await?;
    settings.sort_by(|a, b| (a.group.clone(), a.key.clone()).cmp(&(b.group.clone(), b.key.clone())));

    Ok(GetSettingsResponse {
      settings: settings
        .into_iter()
        .map(|s| SettingDto {
          key: s.key,
          value: s.value,
          setting_type: s.setting_type,
          description: s.description,
          group: s.group,
        })
        .collect(),
    })
  }
}
