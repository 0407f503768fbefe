pub mod cancel_invoice;
pub mod capture_paypal_order;
pub mod create_invoice;
pub mod create_paypal_order;
pub mod delete_invoice;
pub mod get_invoice_details;
pub mod issue_invoice;
pub mod list_invoices;
pub mod list_payments;
pub mod mark_invoice_paid;
pub mod notifications;
pub mod process_webhook_event;
pub mod record_payment;
pub mod send_payment_reminders;

pub use cancel_invoice::{CancelInvoiceCommand, CancelInvoiceResponse, CancelInvoiceUseCase};
pub use capture_paypal_order::{
  CapturePayPalOrderCommand, CapturePayPalOrderResponse, CapturePayPalOrderUseCase,
};
pub use create_invoice::{
  CreateInvoiceCommand, CreateInvoiceItemDto, CreateInvoiceResponse, CreateInvoiceUseCase,
};
pub use create_paypal_order::{
  CreatePayPalOrderCommand, CreatePayPalOrderResponse, CreatePayPalOrderUseCase,
};
pub use delete_invoice::{DeleteInvoiceCommand, DeleteInvoiceUseCase};
pub use get_invoice_details::{
  GetInvoiceDetailsCommand, GetInvoiceDetailsResponse, GetInvoiceDetailsUseCase,
};
pub use issue_invoice::{IssueInvoiceCommand, IssueInvoiceResponse, IssueInvoiceUseCase};
pub use list_invoices::{ListInvoicesCommand, ListInvoicesResponse, ListInvoicesUseCase};
pub use list_payments::{ListPaymentsCommand, ListPaymentsResponse, ListPaymentsUseCase};
pub use mark_invoice_paid::{
  MarkInvoicePaidCommand, MarkInvoicePaidResponse, MarkInvoicePaidUseCase,
};
pub use notifications::{BillingEventHandler, EventDispatcher, InvoiceMailHandler};
pub use process_webhook_event::{
  ProcessWebhookEventCommand, ProcessWebhookEventUseCase, WebhookEventBody, WebhookOutcome,
  WebhookResource,
};
pub use record_payment::{RecordPaymentCommand, RecordPaymentResponse, RecordPaymentUseCase};
pub use send_payment_reminders::{
  SendPaymentRemindersCommand, SendPaymentRemindersResponse, SendPaymentRemindersUseCase,
};
