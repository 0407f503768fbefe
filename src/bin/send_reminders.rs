use chrono::Utc;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pawdesk::{
  application::billing::{SendPaymentRemindersCommand, SendPaymentRemindersUseCase},
  domain::billing::{BillingService, BillingServiceDependencies},
  infrastructure::{
    config::Config,
    paypal::PayPalClient,
    persistence::postgres::{
      PostgresCustomerRepository, PostgresInvoiceItemRepository, PostgresInvoiceRepository,
      PostgresPaymentRepository, PostgresUserRepository,
    },
    queue::RedisMailQueue,
  },
};

/// Flags open invoices past their due date as overdue and queues payment
/// reminder emails. Meant to be run daily by the scheduler.
#[derive(Debug, Parser)]
#[command(name = "send-reminders", version, about)]
struct Args {
  /// Minimum days overdue before a reminder is sent
  #[arg(long, default_value_t = 7)]
  days: i64,

  /// Report what would be sent without queuing any email
  #[arg(long, default_value_t = false)]
  dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pawdesk=info".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let args = Args::parse();
  let config = Config::load()?;

  let db_pool = PgPoolOptions::new()
    .max_connections(2)
    .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_seconds))
    .connect(&config.database.url)
    .await?;

  let redis_client = redis::Client::open(config.redis.url.clone())?;
  let redis_conn = redis_client.get_connection_manager().await?;

  let invoice_repo = Arc::new(PostgresInvoiceRepository::new(db_pool.clone()));
  let item_repo = Arc::new(PostgresInvoiceItemRepository::new(db_pool.clone()));
  let customer_repo = Arc::new(PostgresCustomerRepository::new(db_pool.clone()));
  let user_repo = Arc::new(PostgresUserRepository::new(db_pool.clone()));
  let payment_repo = Arc::new(PostgresPaymentRepository::new(db_pool.clone()));
  let mail_queue = Arc::new(RedisMailQueue::new(
    redis_conn,
    config.mail_queue.queue_key.clone(),
  ));

  let billing_service = BillingService::new(BillingServiceDependencies {
    invoice_repo: invoice_repo.clone(),
    item_repo,
    customer_repo: customer_repo.clone(),
    ledger: payment_repo.clone(),
    gateway: Arc::new(PayPalClient::new(config.paypal.clone())),
  });

  // First flip open invoices past their due date, then remind.
  let today = Utc::now().date_naive();
  match billing_service.mark_overdue_invoices(today).await {
    Ok(flipped) => {
      tracing::info!(count = flipped.len(), "Invoices marked overdue");
    }
    Err(e) => {
      // The reminder pass still runs over whatever is already overdue.
      tracing::error!(error = %e, "Overdue sweep failed");
    }
  }

  let use_case = SendPaymentRemindersUseCase::new(
    invoice_repo,
    customer_repo,
    user_repo,
    payment_repo,
    mail_queue,
  );

  let command = SendPaymentRemindersCommand {
    min_days_overdue: args.days,
    dry_run: args.dry_run,
  };

  // Individual failures are logged inside the sweep; the job itself exits
  // cleanly so the scheduler does not retry a half-finished run.
  match use_case.execute(command).await {
    Ok(summary) => {
      if args.dry_run {
        tracing::info!(
          scanned = summary.scanned,
          "Dry run complete, no emails were queued"
        );
      } else {
        tracing::info!(
          scanned = summary.scanned,
          sent = summary.sent,
          failed = summary.failed,
          "Payment reminders queued"
        );
      }
    }
    Err(e) => {
      tracing::error!(error = %e, "Reminder sweep failed");
    }
  }

  Ok(())
}
