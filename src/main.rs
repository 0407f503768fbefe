use actix_web::{App, HttpResponse, HttpServer, middleware::Logger, web};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pawdesk::{
  adapters::http::{
    AuthMiddleware, RequestIdMiddleware, configure_auth_routes, configure_invoice_routes,
    configure_payment_routes, configure_settings_routes, configure_webhook_routes,
  },
  application::auth::{
    GetCurrentUserUseCase, LoginUserUseCase, LogoutUserUseCase, RegisterUserUseCase,
  },
  application::billing::{
    BillingEventHandler, CancelInvoiceUseCase, CapturePayPalOrderUseCase, CreateInvoiceUseCase,
    CreatePayPalOrderUseCase, DeleteInvoiceUseCase, EventDispatcher, GetInvoiceDetailsUseCase,
    InvoiceMailHandler, IssueInvoiceUseCase, ListInvoicesUseCase, ListPaymentsUseCase,
    MarkInvoicePaidUseCase, ProcessWebhookEventUseCase, RecordPaymentUseCase,
  },
  application::settings::{GetSettingsUseCase, UpdateSettingsUseCase},
  domain::auth::{AuthService, AuthServiceConfig},
  domain::billing::{BillingService, BillingServiceDependencies, EventPublisher},
  domain::settings::SettingsService,
  infrastructure::{
    config::Config,
    metrics::Metrics,
    paypal::{PayPalClient, PayPalWebhookVerifier},
    persistence::postgres::{
      PostgresCustomerRepository, PostgresInvoiceItemRepository, PostgresInvoiceRepository,
      PostgresLoginAttemptRepository, PostgresPaymentRepository, PostgresSessionRepository,
      PostgresSettingsRepository, PostgresUserRepository,
    },
    queue::RedisMailQueue,
  },
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pawdesk=debug,actix_web=info".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  tracing::info!("Starting Pawdesk application");

  // Load configuration. This already rejects a missing PayPal webhook id:
  // running without verifiable webhooks is a misconfiguration, not a mode.
  let config = Config::load().map_err(|e| {
    tracing::error!("Failed to load configuration: {}", e);
    std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
  })?;
  tracing::info!("Configuration loaded successfully");

  // Set up database connection pool with timeout
  tracing::info!("Connecting to database");

  let db_pool = tokio::time::timeout(
    Duration::from_secs(config.database.connect_timeout_seconds),
    PgPoolOptions::new()
      .max_connections(config.database.max_connections)
      .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_seconds))
      .connect(&config.database.url),
  )
  .await
  .map_err(|_| {
    tracing::error!(
      "Database connection timed out after {} seconds. Is PostgreSQL running?",
      config.database.connect_timeout_seconds
    );
    std::io::Error::new(std::io::ErrorKind::TimedOut, "Database connection timed out")
  })?
  .map_err(|e| {
    tracing::error!("Failed to connect to database: {}", e);
    std::io::Error::new(
      std::io::ErrorKind::ConnectionRefused,
      format!("Could not connect to database: {}", e),
    )
  })?;

  tracing::info!("Database connection pool created");

  tracing::info!("Running database migrations");
  sqlx::migrate!("./migrations")
    .run(&db_pool)
    .await
    .expect("Failed to run database migrations");
  tracing::info!("Database migrations completed");

  // Set up Redis connection with timeout
  tracing::info!("Connecting to Redis");

  let redis_client = redis::Client::open(config.redis.url.clone()).map_err(|e| {
    tracing::error!("Failed to create Redis client: {}", e);
    std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
  })?;

  let redis_conn = tokio::time::timeout(
    Duration::from_secs(config.redis.connect_timeout_seconds),
    redis_client.get_connection_manager(),
  )
  .await
  .map_err(|_| {
    tracing::error!(
      "Redis connection timed out after {} seconds. Is Redis running?",
      config.redis.connect_timeout_seconds
    );
    std::io::Error::new(std::io::ErrorKind::TimedOut, "Redis connection timed out")
  })?
  .map_err(|e| {
    tracing::error!("Failed to connect to Redis: {}", e);
    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string())
  })?;

  tracing::info!("Redis connection established");

  // Repositories
  let user_repo = Arc::new(PostgresUserRepository::new(db_pool.clone()));
  let session_repo = Arc::new(PostgresSessionRepository::new(db_pool.clone()));
  let login_attempt_repo = Arc::new(PostgresLoginAttemptRepository::new(db_pool.clone()));
  let customer_repo = Arc::new(PostgresCustomerRepository::new(db_pool.clone()));
  let invoice_repo = Arc::new(PostgresInvoiceRepository::new(db_pool.clone()));
  let invoice_item_repo = Arc::new(PostgresInvoiceItemRepository::new(db_pool.clone()));
  let payment_repo = Arc::new(PostgresPaymentRepository::new(db_pool.clone()));
  let settings_repo = Arc::new(PostgresSettingsRepository::new(db_pool.clone()));

  // Outbound adapters
  let paypal_client = Arc::new(PayPalClient::new(config.paypal.clone()));
  let webhook_verifier = Arc::new(
    PayPalWebhookVerifier::new(config.paypal.webhook_id.clone()).map_err(|e| {
      tracing::error!("Webhook verifier cannot start: {}", e);
      std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?,
  );
  let mail_queue = Arc::new(RedisMailQueue::new(
    redis_conn,
    config.mail_queue.queue_key.clone(),
  ));

  // Domain services
  let auth_config = AuthServiceConfig {
    session_ttl_seconds: config.security.session_ttl_seconds as i64,
    rate_limit_window_seconds: config.rate_limit.login_window_seconds as i64,
    max_failed_attempts: config.rate_limit.login_max_attempts as i64,
  };
  let auth_service = Arc::new(AuthService::new(
    user_repo.clone(),
    session_repo.clone(),
    login_attempt_repo.clone(),
    auth_config,
  ));

  let settings_service = Arc::new(SettingsService::new(settings_repo.clone()));

  let billing_service = Arc::new(BillingService::new(BillingServiceDependencies {
    invoice_repo: invoice_repo.clone(),
    item_repo: invoice_item_repo.clone(),
    customer_repo: customer_repo.clone(),
    ledger: payment_repo.clone(),
    gateway: paypal_client.clone(),
  }));

  // Notification pipeline: invoice events fan out to mail jobs
  let invoice_mail_handler: Arc<dyn BillingEventHandler> = Arc::new(InvoiceMailHandler::new(
    invoice_repo.clone(),
    customer_repo.clone(),
    user_repo.clone(),
    payment_repo.clone(),
    mail_queue.clone(),
  ));
  let event_publisher: Arc<dyn EventPublisher> =
    Arc::new(EventDispatcher::new(vec![invoice_mail_handler]));

  // Use cases
  let login_use_case = Arc::new(LoginUserUseCase::new(auth_service.clone()));
  let logout_use_case = Arc::new(LogoutUserUseCase::new(auth_service.clone()));
  let get_user_use_case = Arc::new(GetCurrentUserUseCase::new(auth_service.clone()));
  let register_use_case = Arc::new(RegisterUserUseCase::new(
    auth_service.clone(),
    customer_repo.clone(),
    mail_queue.clone(),
  ));

  let create_invoice_use_case = Arc::new(CreateInvoiceUseCase::new(
    billing_service.clone(),
    settings_service.clone(),
    event_publisher.clone(),
  ));
  let list_invoices_use_case = Arc::new(ListInvoicesUseCase::new(billing_service.clone()));
  let get_invoice_details_use_case = Arc::new(GetInvoiceDetailsUseCase::new(
    billing_service.clone(),
    settings_service.clone(),
  ));
  let issue_invoice_use_case = Arc::new(IssueInvoiceUseCase::new(billing_service.clone()));
  let mark_invoice_paid_use_case = Arc::new(MarkInvoicePaidUseCase::new(
    billing_service.clone(),
    event_publisher.clone(),
  ));
  let cancel_invoice_use_case = Arc::new(CancelInvoiceUseCase::new(billing_service.clone()));
  let delete_invoice_use_case = Arc::new(DeleteInvoiceUseCase::new(billing_service.clone()));

  let record_payment_use_case = Arc::new(RecordPaymentUseCase::new(
    billing_service.clone(),
    event_publisher.clone(),
  ));
  let list_payments_use_case = Arc::new(ListPaymentsUseCase::new(payment_repo.clone()));
  let create_paypal_order_use_case =
    Arc::new(CreatePayPalOrderUseCase::new(billing_service.clone()));
  let capture_paypal_order_use_case = Arc::new(CapturePayPalOrderUseCase::new(
    billing_service.clone(),
    event_publisher.clone(),
  ));
  let process_webhook_use_case = Arc::new(ProcessWebhookEventUseCase::new(
    billing_service.clone(),
    event_publisher.clone(),
  ));

  let get_settings_use_case = Arc::new(GetSettingsUseCase::new(settings_service.clone()));
  let update_settings_use_case = Arc::new(UpdateSettingsUseCase::new(settings_service.clone()));

  let metrics = Arc::new(Metrics::new().expect("Failed to initialize metrics"));

  let server_host = config.server.host.clone();
  let server_port = config.server.port;

  tracing::info!("Starting HTTP server on {}:{}", server_host, server_port);

  HttpServer::new(move || {
    App::new()
      .wrap(RequestIdMiddleware::new())
      .wrap(Logger::default())
      .app_data(web::Data::new(metrics.clone()))
      // Auth routes (login public, register admin-only)
      .service(web::scope("/api/v1/auth").configure(|cfg| {
        configure_auth_routes(
          cfg,
          login_use_case.clone(),
          logout_use_case.clone(),
          get_user_use_case.clone(),
          register_use_case.clone(),
        )
      }))
      // Webhook receiver: public, signature-gated. Registered ahead of the
      // auth-protected payments scope so PayPal's calls never hit the
      // session check.
      .service(web::scope("/api/v1/payments/paypal/webhook").configure(|cfg| {
        configure_webhook_routes(
          cfg,
          process_webhook_use_case.clone(),
          webhook_verifier.clone(),
        )
      }))
      // Invoice routes (protected)
      .service(
        web::scope("/api/v1/invoices")
          .wrap(AuthMiddleware::new(get_user_use_case.clone()))
          .configure(|cfg| {
            configure_invoice_routes(
              cfg,
              create_invoice_use_case.clone(),
              list_invoices_use_case.clone(),
              get_invoice_details_use_case.clone(),
              issue_invoice_use_case.clone(),
              mark_invoice_paid_use_case.clone(),
              cancel_invoice_use_case.clone(),
              delete_invoice_use_case.clone(),
            )
          }),
      )
      // Payment routes (protected)
      .service(
        web::scope("/api/v1/payments")
          .wrap(AuthMiddleware::new(get_user_use_case.clone()))
          .configure(|cfg| {
            configure_payment_routes(
              cfg,
              record_payment_use_case.clone(),
              list_payments_use_case.clone(),
              create_paypal_order_use_case.clone(),
              capture_paypal_order_use_case.clone(),
            )
          }),
      )
      // Settings routes (protected; admin enforced in the domain layer)
      .service(
        web::scope("/api/v1/settings")
          .wrap(AuthMiddleware::new(get_user_use_case.clone()))
          .configure(|cfg| {
            configure_settings_routes(
              cfg,
              get_settings_use_case.clone(),
              update_settings_use_case.clone(),
            )
          }),
      )
      .route("/health", web::get().to(health_check))
      .route("/metrics", web::get().to(metrics_handler))
  })
  .bind((server_host.as_str(), server_port))?
  .run()
  .await
}

/// Health check endpoint
async fn health_check() -> &'static str {
  "OK"
}

/// Prometheus metrics endpoint
async fn metrics_handler(metrics: web::Data<Arc<Metrics>>) -> HttpResponse {
  match metrics.render() {
    Ok(body) => HttpResponse::Ok()
      .content_type("text/plain; version=0.0.4")
      .body(body),
    Err(e) => {
      tracing::error!("Failed to render metrics: {}", e);
      HttpResponse::InternalServerError().finish()
    }
  }
}
