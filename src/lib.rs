//! Pawdesk - dog school management backend.
//!
//! Billing core for a dog training school: customers, invoices with German
//! VAT handling (including the §19 UStG small-business exemption), an
//! append-only payment ledger, PayPal checkout with verified webhooks, and
//! queued customer notifications.

pub mod adapters;
pub mod application;
pub mod domain;
pub mod infrastructure;
