pub mod customer_repository;
pub mod invoice_repository;
pub mod login_attempt_repository;
pub mod payment_repository;
pub mod session_repository;
pub mod settings_repository;
pub mod user_repository;

pub use customer_repository::PostgresCustomerRepository;
pub use invoice_repository::{PostgresInvoiceItemRepository, PostgresInvoiceRepository};
pub use login_attempt_repository::PostgresLoginAttemptRepository;
pub use payment_repository::PostgresPaymentRepository;
pub use session_repository::PostgresSessionRepository;
pub use settings_repository::PostgresSettingsRepository;
pub use user_repository::PostgresUserRepository;
