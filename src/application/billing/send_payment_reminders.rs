use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::domain::auth::UserRepository;
use crate::domain::billing::{
  BillingError, CustomerRepository, Invoice, InvoiceRepository, MailJob, MailQueue, PaymentLedger,
};

/// Overdue-reminder sweep, driven by the scheduler.
///
/// There is no built-in same-day de-duplication: running the sweep twice in
/// one eligibility window sends twice. Cadence is the scheduler's job.
#[derive(Debug)]
pub struct SendPaymentRemindersCommand {
  /// Minimum days past the due date before a reminder goes out.
  pub min_days_overdue: i64,
  /// Report what would be sent without enqueuing anything.
  pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct SendPaymentRemindersResponse {
  pub scanned: usize,
  pub sent: usize,
  pub failed: usize,
}

pub struct SendPaymentRemindersUseCase {
  invoice_repo: Arc<dyn InvoiceRepository>,
  customer_repo: Arc<dyn CustomerRepository>,
  user_repo: Arc<dyn UserRepository>,
  ledger: Arc<dyn PaymentLedger>,
  mail_queue: Arc<dyn MailQueue>,
}

impl SendPaymentRemindersUseCase {
  pub fn new(
    invoice_repo: Arc<dyn InvoiceRepository>,
    customer_repo: Arc<dyn CustomerRepository>,
    user_repo: Arc<dyn UserRepository>,
    ledger: Arc<dyn PaymentLedger>,
    mail_queue: Arc<dyn MailQueue>,
  ) -> Self {
    Self {
      invoice_repo,
      customer_repo,
      user_repo,
      ledger,
      mail_queue,
    }
  }

  pub async fn execute(
    &self,
    command: SendPaymentRemindersCommand,
  ) -> Result<SendPaymentRemindersResponse, BillingError> {
    let today = Utc::now().date_naive();
    let cutoff = today - Duration::days(command.min_days_overdue);

    let overdue = self.invoice_repo.find_outstanding_due_before(cutoff).await?;
    let scanned = overdue.len();

    tracing::info!(
      scanned,
      min_days_overdue = command.min_days_overdue,
      dry_run = command.dry_run,
      "Overdue invoice sweep"
    );

    let mut sent = 0;
    let mut failed = 0;

    // One invoice failing must not abort the sweep for the rest.
    for invoice in overdue {
      match self.remind(&invoice, command.dry_run).await {
        Ok(()) => sent += 1,
        Err(e) => {
          failed += 1;
          tracing::error!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            error = %e,
            "Failed to queue payment reminder"
          );
        }
      }
    }

    Ok(SendPaymentRemindersResponse {
      scanned,
      sent,
      failed,
    })
  }

  async fn remind(&self, invoice: &Invoice, dry_run: bool) -> Result<(), BillingError> {
    let customer = self
      .customer_repo
      .find_by_id(invoice.customer_id)
      .await?
      .ok_or(BillingError::CustomerNotFound(invoice.customer_id))?;

    let user = self
      .user_repo
      .find_by_id(customer.user_id)
      .await
      .map_err(|e| BillingError::Internal(format!("Failed to load user: {}", e)))?
      .ok_or_else(|| {
        BillingError::Internal(format!("Customer {} has no user account", customer.id))
      })?;

    let total_paid = self.ledger.sum_completed(invoice.id).await?;
    let remaining = invoice.remaining_balance(total_paid);
    let days_overdue = (Utc::now().date_naive() - invoice.due_date).num_days();

    if dry_run {
      tracing::info!(
        invoice_number = %invoice.invoice_number,
        to = %user.email,
        %remaining,
        days_overdue,
        "Dry run: reminder not sent"
      );
      return Ok(());
    }

    self
      .mail_queue
      .enqueue(MailJob {
        to: user.email,
        subject: format!("Zahlungserinnerung: Rechnung {}", invoice.invoice_number),
        template: "payment_reminder".to_string(),
        context: json!({
          "invoice_number": invoice.invoice_number.value(),
          "first_name": user.first_name,
          "due_date": invoice.due_date,
          "days_overdue": days_overdue,
          "remaining_balance": remaining,
        }),
      })
      .await
  }
}
