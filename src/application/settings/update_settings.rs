use serde::Serialize;
use std::sync::Arc;

use crate::domain::auth::Actor;
use crate::domain::settings::{SettingType, SettingsError, SettingsService};

#[derive(Debug)]
pub struct SettingChange {
  pub key: String,
  pub value: Option<String>,
  pub setting_type: SettingType,
  pub group: String,
}

#[derive(Debug)]
pub struct UpdateSettingsCommand {
  pub actor: Actor,
  pub changes: Vec<SettingChange>,
}

#[derive(Debug, Serialize)]
pub struct UpdateSettingsResponse {
  pub updated: usize,
}

pub struct UpdateSettingsUseCase {
  settings_service: Arc<SettingsService>,
}

impl UpdateSettingsUseCase {
  pub fn new(settings_service: Arc<SettingsService>) -> Self {
    Self { settings_service }
  }

  pub async fn execute(
    &self,
    command: UpdateSettingsCommand,
  ) -> Result<UpdateSettingsResponse, SettingsError> {
    let mut updated = 0;
    for change in command.changes {
      self
        .settings_service
        .set(
          command.actor,
          change.key,
          change.value,
          change.setting_type,
          change.group,
        )
        .await?;
      updated += 1;
    }

    Ok(UpdateSettingsResponse { updated })
  }
}
