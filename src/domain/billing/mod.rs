pub mod entities;
pub mod errors;
pub mod events;
pub mod ports;
pub mod services;
pub mod tax;
pub mod value_objects;

pub use entities::{Customer, Invoice, InvoiceItem, PAID_EPSILON, Payment};
pub use errors::BillingError;
pub use events::{BillingEvent, EventPublisher};
pub use ports::{
  CustomerRepository, GatewayCapture, GatewayLink, GatewayOrder, InvoiceItemRepository,
  InvoiceRepository, LedgerAppend, MailJob, MailQueue, PaymentGateway, PaymentLedger,
};
pub use services::{
  BillingService, BillingServiceDependencies, InvoiceData, InvoiceDetails, InvoiceListFilter,
};
pub use tax::{InvoiceTotals, TaxContext, TaxLine};
pub use value_objects::{
  InvoiceNumber, InvoiceStatus, ItemDescription, PaymentMethod, PaymentStatus, Quantity, TaxRate,
  UnitPrice, ValueObjectError,
};
