use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, web};
use futures_util::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{
  adapters::http::{errors::ApiError, middleware::RequestActor},
  application::settings::{
    GetSettingsCommand, GetSettingsUseCase, SettingChange, UpdateSettingsCommand,
    UpdateSettingsUseCase,
  },
  domain::settings::{SettingType, keys},
};

/// Directory where uploaded setting files (logo etc.) are stored.
const UPLOAD_DIR: &str = "./data/uploads";

/// GET /api/v1/settings (admin only)
pub async fn get_settings_handler(
  use_case: web::Data<Arc<GetSettingsUseCase>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  let command = GetSettingsCommand {
    actor: http_req.actor(),
  };

  let response = use_case.execute(command).await?;
  Ok(HttpResponse::Ok().json(response))
}

/// PUT /api/v1/settings (admin only)
///
/// Multipart so that file-backed settings (company logo) can be uploaded
/// alongside text values. Each part's field name is the setting key.
pub async fn update_settings_handler(
  mut payload: Multipart,
  use_case: web::Data<Arc<UpdateSettingsUseCase>>,
  http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
  let mut changes = Vec::new();

  while let Some(field) = payload.next().await {
    let mut field =
      field.map_err(|e| ApiError::Validation(format!("Invalid multipart payload: {}", e)))?;

    let Some(key) = field.name().map(|n| n.to_string()) else {
      continue;
    };

    let filename = field
      .content_disposition()
      .and_then(|cd| cd.get_filename().map(|f| f.to_string()));

    let mut data = Vec::new();
    while let Some(chunk) = field.next().await {
      let chunk =
        chunk.map_err(|e| ApiError::Validation(format!("Failed to read field '{}': {}", key, e)))?;
      data.extend_from_slice(&chunk);
    }

    let change = match filename {
      Some(filename) => {
        let stored_path = store_upload(&key, &filename, &data).await?;
        SettingChange {
          key,
          value: Some(stored_path),
          setting_type: SettingType::File,
          group: "company".to_string(),
        }
      }
      None => {
        let value = String::from_utf8(data)
          .map_err(|_| ApiError::Validation(format!("Field '{}' is not valid UTF-8", key)))?;
        SettingChange {
          setting_type: setting_type_for(&key),
          group: "company".to_string(),
          value: Some(value),
          key,
        }
      }
    };

    changes.push(change);
  }

  if changes.is_empty() {
    return Err(ApiError::Validation("No settings provided".to_string()));
  }

  let command = UpdateSettingsCommand {
    actor: http_req.actor(),
    changes,
  };

  let response = use_case.execute(command).await?;
  Ok(HttpResponse::Ok().json(response))
}

fn setting_type_for(key: &str) -> SettingType {
  match key {
    keys::COMPANY_SMALL_BUSINESS => SettingType::Boolean,
    keys::COMPANY_LOGO => SettingType::File,
    _ => SettingType::String,
  }
}

async fn store_upload(key: &str, filename: &str, data: &[u8]) -> Result<String, ApiError> {
  // Strip any path components a client might smuggle into the filename.
  let safe_name = PathBuf::from(filename)
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_else(|| "upload.bin".to_string());

  let target = PathBuf::from(UPLOAD_DIR).join(format!("{}-{}", key, safe_name));

  tokio::fs::create_dir_all(UPLOAD_DIR)
    .await
    .map_err(|e| ApiError::Internal(format!("Failed to create upload dir: {}", e)))?;
  tokio::fs::write(&target, data)
    .await
    .map_err(|e| ApiError::Internal(format!("Failed to store upload: {}", e)))?;

  Ok(target.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_setting_type_inference() {
    assert_eq!(
      setting_type_for(keys::COMPANY_SMALL_BUSINESS),
      SettingType::Boolean
    );
    assert_eq!(setting_type_for(keys::COMPANY_LOGO), SettingType::File);
    assert_eq!(setting_type_for(keys::COMPANY_NAME), SettingType::String);
  }
}
