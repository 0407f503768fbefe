use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::auth::Actor;
use crate::domain::billing::{BillingError, BillingService, GatewayLink};

#[derive(Debug)]
pub struct CreatePayPalOrderCommand {
  pub actor: Actor,
  pub invoice_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CreatePayPalOrderResponse {
  pub order_id: String,
  pub status: String,
  pub links: Vec<GatewayLink>,
}

pub struct CreatePayPalOrderUseCase {
  billing_service: Arc<BillingService>,
}

impl CreatePayPalOrderUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: CreatePayPalOrderCommand,
  ) -> Result<CreatePayPalOrderResponse, BillingError> {
    let order = self
      .billing_service
      .create_gateway_order(command.actor, command.invoice_id)
      .await?;

    Ok(CreatePayPalOrderResponse {
      order_id: order.order_id,
      status: order.status,
      links: order.links,
    })
  }
}
