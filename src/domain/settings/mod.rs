pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;

pub use entities::{Setting, SettingType, keys};
pub use errors::SettingsError;
pub use ports::SettingsRepository;
pub use services::SettingsService;
