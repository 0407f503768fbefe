use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Prometheus metrics for the billing core.
pub struct Metrics {
  registry: Registry,
  pub payments_recorded: IntCounterVec,
  pub gateway_orders_created: IntCounter,
  pub gateway_captures: IntCounterVec,
  pub webhooks_received: IntCounterVec,
  pub reminders_sent: IntCounter,
}

impl Metrics {
  pub fn new() -> Result<Self, prometheus::Error> {
    let registry = Registry::new();

    let payments_recorded = IntCounterVec::new(
      Opts::new("pawdesk_payments_recorded_total", "Payments appended to the ledger"),
      &["method", "status"],
    )?;
    let gateway_orders_created = IntCounter::new(
      "pawdesk_gateway_orders_created_total",
      "PayPal orders created",
    )?;
    let gateway_captures = IntCounterVec::new(
      Opts::new("pawdesk_gateway_captures_total", "PayPal capture attempts"),
      &["outcome"],
    )?;
    let webhooks_received = IntCounterVec::new(
      Opts::new("pawdesk_webhooks_received_total", "Webhook deliveries by verdict"),
      &["verdict"],
    )?;
    let reminders_sent = IntCounter::new(
      "pawdesk_reminders_sent_total",
      "Payment reminder emails queued",
    )?;

    registry.register(Box::new(payments_recorded.clone()))?;
    registry.register(Box::new(gateway_orders_created.clone()))?;
    registry.register(Box::new(gateway_captures.clone()))?;
    registry.register(Box::new(webhooks_received.clone()))?;
    registry.register(Box::new(reminders_sent.clone()))?;

    Ok(Self {
      registry,
      payments_recorded,
      gateway_orders_created,
      gateway_captures,
      webhooks_received,
      reminders_sent,
    })
  }

  /// Renders the registry in the Prometheus text exposition format.
  pub fn render(&self) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&self.registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_metrics_render() {
    let metrics = Metrics::new().unwrap();
    metrics
      .webhooks_received
      .with_label_values(&["accepted"])
      .inc();
    metrics
      .payments_recorded
      .with_label_values(&["paypal", "completed"])
      .inc();

    let rendered = metrics.render().unwrap();
    assert!(rendered.contains("pawdesk_webhooks_received_total"));
    assert!(rendered.contains("pawdesk_payments_recorded_total"));
  }
}
