use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash as Argon2PasswordHash, PasswordHasher, PasswordVerifier};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValueObjectError {
  #[error("Invalid email format: {0}")]
  InvalidEmail(String),

  #[error("Password is too short (minimum 8 characters)")]
  PasswordTooShort,

  #[error("Password is too long (maximum 128 characters)")]
  PasswordTooLong,

  #[error("Invalid password hash format")]
  InvalidPasswordHash,

  #[error("Password hashing failed: {0}")]
  HashingFailed(String),

  #[error("Password verification failed: {0}")]
  VerificationFailed(String),

  #[error("Invalid token format")]
  InvalidToken,

  #[error("Token generation failed: {0}")]
  TokenGenerationFailed(String),

  #[error("Invalid role: {0}")]
  InvalidRole(String),
}

// ============================================================================
// Role - admin runs the school, trainers teach, customers book and pay
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  Trainer,
  Customer,
}

impl Role {
  pub fn is_staff(&self) -> bool {
    matches!(self, Role::Admin | Role::Trainer)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Admin => "admin",
      Role::Trainer => "trainer",
      Role::Customer => "customer",
    }
  }
}

impl FromStr for Role {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "admin" => Ok(Role::Admin),
      "trainer" => Ok(Role::Trainer),
      "customer" => Ok(Role::Customer),
      _ => Err(ValueObjectError::InvalidRole(format!("Unknown role: {}", s))),
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

// ============================================================================
// Email Value Object
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
  pub fn new(email: impl Into<String>) -> Result<Self, ValueObjectError> {
    use validator::ValidateEmail;

    let email = email.into();
    if !email.validate_email() {
      return Err(ValueObjectError::InvalidEmail(email));
    }
    // Normalize to lowercase
    Ok(Self(email.to_lowercase()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn into_inner(self) -> String {
    self.0
  }
}

impl fmt::Display for Email {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl AsRef<str> for Email {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

// ============================================================================
// Password Value Object (Plain Password - Never Stored)
// ============================================================================

#[derive(Clone)]
pub struct Password(String);

impl Password {
  const MIN_LENGTH: usize = 8;
  const MAX_LENGTH: usize = 128;

  pub fn new(password: impl Into<String>) -> Result<Self, ValueObjectError> {
    let password = password.into();

    if password.len() < Self::MIN_LENGTH {
      return Err(ValueObjectError::PasswordTooShort);
    }
    if password.len() > Self::MAX_LENGTH {
      return Err(ValueObjectError::PasswordTooLong);
    }
    Ok(Self(password))
  }

  /// Hashes the password using Argon2id
  pub fn hash(&self) -> Result<PasswordHash, ValueObjectError> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
      .hash_password(self.0.as_bytes(), &salt)
      .map_err(|e| ValueObjectError::HashingFailed(e.to_string()))?;

    Ok(PasswordHash(hash.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

// Never expose the password through Debug/Display
impl fmt::Debug for Password {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Password(***)")
  }
}

impl fmt::Display for Password {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("***")
  }
}

// ============================================================================
// PasswordHash Value Object (Argon2id Hash)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
  pub fn from_hash(hash: impl Into<String>) -> Result<Self, ValueObjectError> {
    let hash = hash.into();
    Argon2PasswordHash::new(&hash).map_err(|_| ValueObjectError::InvalidPasswordHash)?;
    Ok(Self(hash))
  }

  pub fn verify(&self, password: &Password) -> Result<bool, ValueObjectError> {
    let parsed_hash = Argon2PasswordHash::new(&self.0)
      .map_err(|e| ValueObjectError::VerificationFailed(e.to_string()))?;

    let argon2 = Argon2::default();

    Ok(
      argon2
        .verify_password(password.as_str().as_bytes(), &parsed_hash)
        .is_ok(),
    )
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn into_inner(self) -> String {
    self.0
  }
}

// ============================================================================
// SessionToken Value Object (Random Secure Token)
// ============================================================================

#[derive(Clone)]
pub struct SessionToken(String);

impl SessionToken {
  const TOKEN_LENGTH: usize = 32; // 32 bytes = 256 bits

  pub fn generate() -> Result<Self, ValueObjectError> {
    use rand::Rng;

    let token: [u8; Self::TOKEN_LENGTH] = rand::rngs::OsRng.sample(rand::distributions::Standard);
    Ok(Self(hex::encode(token)))
  }

  pub fn from_string(token: impl Into<String>) -> Result<Self, ValueObjectError> {
    let token = token.into();

    if token.len() != Self::TOKEN_LENGTH * 2 {
      return Err(ValueObjectError::InvalidToken);
    }
    if !token.chars().all(|c| c.is_ascii_hexdigit()) {
      return Err(ValueObjectError::InvalidToken);
    }
    Ok(Self(token))
  }

  /// Only the hash of a token is ever persisted.
  pub fn hash(&self) -> TokenHash {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(self.0.as_bytes());
    TokenHash(hex::encode(hasher.finalize()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn into_inner(self) -> String {
    self.0
  }
}

impl fmt::Debug for SessionToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("SessionToken(***)")
  }
}

impl fmt::Display for SessionToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("***")
  }
}

// ============================================================================
// TokenHash Value Object (SHA-256 Hash of Token)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHash(String);

impl TokenHash {
  pub fn from_hash(hash: impl Into<String>) -> Result<Self, ValueObjectError> {
    let hash = hash.into();

    // SHA-256 produces 64 hex characters
    if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
      return Err(ValueObjectError::InvalidToken);
    }
    Ok(Self(hash))
  }

  pub fn verify(&self, token: &SessionToken) -> bool {
    self.0 == token.hash().0
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn into_inner(self) -> String {
    self.0
  }
}

impl fmt::Display for TokenHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_role_parsing() {
    assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
    assert_eq!("Trainer".parse::<Role>().unwrap(), Role::Trainer);
    assert_eq!("customer".parse::<Role>().unwrap(), Role::Customer);
    assert!("owner".parse::<Role>().is_err());
  }

  #[test]
  fn test_role_staff() {
    assert!(Role::Admin.is_staff());
    assert!(Role::Trainer.is_staff());
    assert!(!Role::Customer.is_staff());
  }

  #[test]
  fn test_email_validation() {
    assert!(Email::new("test@example.com").is_ok());
    assert!(Email::new("invalid").is_err());
    assert!(Email::new("@example.com").is_err());
  }

  #[test]
  fn test_email_normalization() {
    let email = Email::new("Test@Example.COM").unwrap();
    assert_eq!(email.as_str(), "test@example.com");
  }

  #[test]
  fn test_password_validation() {
    assert!(Password::new("password123").is_ok());
    assert!(matches!(
      Password::new("short"),
      Err(ValueObjectError::PasswordTooShort)
    ));
    assert!(matches!(
      Password::new("a".repeat(129)),
      Err(ValueObjectError::PasswordTooLong)
    ));
  }

  #[test]
  fn test_password_hashing_and_verification() {
    let password = Password::new("mysecretpassword").unwrap();
    let hash = password.hash().unwrap();

    assert!(hash.verify(&password).unwrap());

    let wrong_password = Password::new("wrongpassword").unwrap();
    assert!(!hash.verify(&wrong_password).unwrap());
  }

  #[test]
  fn test_session_token_generation() {
    let token1 = SessionToken::generate().unwrap();
    let token2 = SessionToken::generate().unwrap();

    assert_ne!(token1.as_str(), token2.as_str());
    assert_eq!(token1.as_str().len(), 64);
  }

  #[test]
  fn test_token_hashing_and_verification() {
    let token = SessionToken::generate().unwrap();
    let hash = token.hash();

    assert!(hash.verify(&token));

    let other_token = SessionToken::generate().unwrap();
    assert!(!hash.verify(&other_token));
  }
}
