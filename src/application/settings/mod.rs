pub mod get_settings;
pub mod update_settings;

pub use get_settings::{GetSettingsCommand, GetSettingsResponse, GetSettingsUseCase, SettingDto};
pub use update_settings::{
  SettingChange, UpdateSettingsCommand, UpdateSettingsResponse, UpdateSettingsUseCase,
};
