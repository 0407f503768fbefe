pub mod client;
pub mod webhook;

pub use client::PayPalClient;
pub use webhook::{PayPalWebhookVerifier, WebhookConfigError, WebhookHeaders};
