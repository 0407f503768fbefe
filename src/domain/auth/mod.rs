pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{Actor, LoginAttempt, Session, User};
pub use errors::{AuthError, RepositoryError};
pub use ports::{LoginAttemptRepository, SessionRepository, UserRepository};
pub use services::{AuthService, AuthServiceConfig};
pub use value_objects::{Email, Password, PasswordHash, Role, SessionToken, TokenHash};
