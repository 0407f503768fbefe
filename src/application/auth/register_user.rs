use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::auth::{Actor, AuthError, AuthService, Email, Password, Role};
use crate::domain::billing::{Customer, CustomerRepository, MailJob, MailQueue};

/// Admin-only account creation. Registering a customer user also creates
/// the matching billing customer record.
#[derive(Debug)]
pub struct RegisterUserCommand {
  pub actor: Actor,
  pub email: String,
  pub password: String,
  pub first_name: String,
  pub last_name: String,
  pub role: Role,
  /// Trainer responsible for the new customer, when registering one.
  pub trainer_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct RegisterUserResponse {
  pub user_id: Uuid,
  pub email: String,
  pub role: Role,
  pub customer_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
}

pub struct RegisterUserUseCase {
  auth_service: Arc<AuthService>,
  customer_repo: Arc<dyn CustomerRepository>,
  mail_queue: Arc<dyn MailQueue>,
}

impl RegisterUserUseCase {
  pub fn new(
    auth_service: Arc<AuthService>,
    customer_repo: Arc<dyn CustomerRepository>,
    mail_queue: Arc<dyn MailQueue>,
  ) -> Self {
    Self {
      auth_service,
      customer_repo,
      mail_queue,
    }
  }

  pub async fn execute(
    &self,
    command: RegisterUserCommand,
  ) -> Result<RegisterUserResponse, AuthError> {
    if !command.actor.is_admin() {
      return Err(AuthError::PermissionDenied(
        "Only admins can register accounts".to_string(),
      ));
    }

    let email = Email::new(command.email)?;
    let password = Password::new(command.password)?;

    let user = self
      .auth_service
      .register(
        email,
        password,
        command.first_name,
        command.last_name,
        command.role,
      )
      .await?;

    let customer_id = if command.role == Role::Customer {
      let customer = Customer::new(user.id, command.trainer_id);
      let created = self
        .customer_repo
        .create(customer)
        .await
        .map_err(|e| AuthError::Repository(crate::domain::auth::RepositoryError::QueryFailed(
          format!("Failed to create customer record: {}", e),
        )))?;
      Some(created.id)
    } else {
      None
    };

    // Welcome email is best-effort: the account is already committed.
    let welcome = MailJob {
      to: user.email.clone(),
      subject: "Willkommen bei der Hundeschule".to_string(),
      template: "welcome".to_string(),
      context: serde_json::json!({
        "first_name": user.first_name,
      }),
    };
    if let Err(e) = self.mail_queue.enqueue(welcome).await {
      tracing::error!(user_id = %user.id, error = %e, "Failed to queue welcome email");
    }

    Ok(RegisterUserResponse {
      user_id: user.id,
      email: user.email,
      role: user.role,
      customer_id,
      created_at: user.created_at,
    })
  }
}
