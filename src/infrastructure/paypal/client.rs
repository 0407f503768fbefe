use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::billing::{
  BillingError, GatewayCapture, GatewayLink, GatewayOrder, ports::PaymentGateway,
};
use crate::infrastructure::config::PayPalConfig;

/// PayPal Orders v2 REST client.
///
/// Implements the two-phase checkout: an order is created over the open
/// balance, the customer approves it on PayPal's side, and the approved
/// order is captured into an actual funds transfer.
pub struct PayPalClient {
  http: Client,
  config: PayPalConfig,
  base_url: String,
}

#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
  intent: &'a str,
  purchase_units: Vec<PurchaseUnit<'a>>,
  application_context: ApplicationContext<'a>,
}

#[derive(Debug, Serialize)]
struct PurchaseUnit<'a> {
  reference_id: &'a str,
  description: String,
  amount: OrderAmount<'a>,
}

#[derive(Debug, Serialize)]
struct OrderAmount<'a> {
  currency_code: &'a str,
  value: String,
}

#[derive(Debug, Serialize)]
struct ApplicationContext<'a> {
  return_url: &'a str,
  cancel_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
  id: String,
  status: String,
  #[serde(default)]
  links: Vec<LinkDescription>,
  #[serde(default)]
  purchase_units: Vec<PurchaseUnitResponse>,
}

#[derive(Debug, Deserialize)]
struct LinkDescription {
  href: String,
  rel: String,
  method: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnitResponse {
  #[serde(default)]
  payments: Option<PaymentsResponse>,
}

#[derive(Debug, Deserialize)]
struct PaymentsResponse {
  #[serde(default)]
  captures: Vec<CaptureResponse>,
}

#[derive(Debug, Deserialize)]
struct CaptureResponse {
  id: String,
  status: String,
  amount: AmountResponse,
}

#[derive(Debug, Deserialize)]
struct AmountResponse {
  currency_code: String,
  value: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
  #[serde(default)]
  name: Option<String>,
  #[serde(default)]
  message: Option<String>,
}

impl PayPalClient {
  pub fn new(config: PayPalConfig) -> Self {
    let base_url = config.api_base_url().to_string();
    Self {
      http: Client::new(),
      config,
      base_url,
    }
  }

  /// Points the client at a different API base. Used by tests.
  #[cfg(test)]
  pub fn with_base_url(config: PayPalConfig, base_url: impl Into<String>) -> Self {
    Self {
      http: Client::new(),
      config,
      base_url: base_url.into(),
    }
  }

  // TODO: cache the access token until its expiry instead of fetching one
  // per API call.
  async fn access_token(&self) -> Result<String, BillingError> {
    let response = self
      .http
      .post(format!("{}/v1/oauth2/token", self.base_url))
      .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
      .form(&[("grant_type", "client_credentials")])
      .send()
      .await
      .map_err(|e| BillingError::Gateway(format!("Token request failed: {}", e)))?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      tracing::error!(%status, %body, "PayPal token request rejected");
      return Err(BillingError::Gateway(format!(
        "Token request rejected with status {}",
        status
      )));
    }

    let token: TokenResponse = response
      .json()
      .await
      .map_err(|e| BillingError::Gateway(format!("Invalid token response: {}", e)))?;

    Ok(token.access_token)
  }

  async fn parse_error(response: reqwest::Response) -> BillingError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed: ErrorResponse = serde_json::from_str(&body).unwrap_or(ErrorResponse {
      name: None,
      message: None,
    });

    tracing::error!(%status, %body, "PayPal API error");
    BillingError::Gateway(format!(
      "{}: {}",
      parsed.name.unwrap_or_else(|| status.to_string()),
      parsed.message.unwrap_or_else(|| "request failed".to_string()),
    ))
  }

  fn order_from_response(response: OrderResponse) -> GatewayOrder {
    GatewayOrder {
      order_id: response.id,
      status: response.status,
      links: response
        .links
        .into_iter()
        .map(|link| GatewayLink {
          href: link.href,
          rel: link.rel,
          method: link.method,
        })
        .collect(),
    }
  }
}

#[async_trait]
impl PaymentGateway for PayPalClient {
  async fn create_order(
    &self,
    invoice_number: &str,
    amount: Decimal,
  ) -> Result<GatewayOrder, BillingError> {
    let token = self.access_token().await?;

    let request = OrderRequest {
      intent: "CAPTURE",
      purchase_units: vec![PurchaseUnit {
        reference_id: invoice_number,
        description: format!("Rechnung #{}", invoice_number),
        amount: OrderAmount {
          currency_code: &self.config.currency,
          value: format!("{:.2}", amount),
        },
      }],
      application_context: ApplicationContext {
        return_url: &self.config.return_url,
        cancel_url: &self.config.cancel_url,
      },
    };

    let response = self
      .http
      .post(format!("{}/v2/checkout/orders", self.base_url))
      .bearer_auth(token)
      .json(&request)
      .send()
      .await
      .map_err(|e| BillingError::Gateway(format!("Order creation failed: {}", e)))?;

    if !response.status().is_success() {
      return Err(Self::parse_error(response).await);
    }

    let order: OrderResponse = response
      .json()
      .await
      .map_err(|e| BillingError::Gateway(format!("Invalid order response: {}", e)))?;

    tracing::info!(
      order_id = %order.id,
      %invoice_number,
      amount = %amount,
      "PayPal order created"
    );

    Ok(Self::order_from_response(order))
  }

  async fn capture_order(&self, order_id: &str) -> Result<GatewayCapture, BillingError> {
    let token = self.access_token().await?;

    let response = self
      .http
      .post(format!(
        "{}/v2/checkout/orders/{}/capture",
        self.base_url, order_id
      ))
      .bearer_auth(token)
      .header("Content-Type", "application/json")
      .send()
      .await
      .map_err(|e| BillingError::Gateway(format!("Capture request failed: {}", e)))?;

    if !response.status().is_success() {
      return Err(Self::parse_error(response).await);
    }

    let order: OrderResponse = response
      .json()
      .await
      .map_err(|e| BillingError::Gateway(format!("Invalid capture response: {}", e)))?;

    let capture = order
      .purchase_units
      .into_iter()
      .filter_map(|unit| unit.payments)
      .flat_map(|payments| payments.captures)
      .next()
      .ok_or_else(|| {
        BillingError::Gateway("No capture details in PayPal response".to_string())
      })?;

    let amount = Decimal::from_str(&capture.amount.value)
      .map_err(|e| BillingError::Gateway(format!("Invalid capture amount: {}", e)))?;

    tracing::info!(
      %order_id,
      transaction_id = %capture.id,
      status = %capture.status,
      %amount,
      "PayPal capture completed"
    );

    Ok(GatewayCapture {
      transaction_id: capture.id,
      amount,
      currency: capture.amount.currency_code,
      completed: capture.status == "COMPLETED",
      status: capture.status,
    })
  }

  async fn get_order(&self, order_id: &str) -> Result<GatewayOrder, BillingError> {
    let token = self.access_token().await?;

    let response = self
      .http
      .get(format!("{}/v2/checkout/orders/{}", self.base_url, order_id))
      .bearer_auth(token)
      .send()
      .await
      .map_err(|e| BillingError::Gateway(format!("Order lookup failed: {}", e)))?;

    if !response.status().is_success() {
      return Err(Self::parse_error(response).await);
    }

    let order: OrderResponse = response
      .json()
      .await
      .map_err(|e| BillingError::Gateway(format!("Invalid order response: {}", e)))?;

    Ok(Self::order_from_response(order))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::infrastructure::config::PayPalMode;
  use rust_decimal_macros::dec;
  use serde_json::json;
  use wiremock::matchers::{body_string_contains, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn test_config() -> PayPalConfig {
    PayPalConfig {
      client_id: "client-id".to_string(),
      client_secret: "client-secret".to_string(),
      mode: PayPalMode::Sandbox,
      webhook_id: "WH-123".to_string(),
      currency: "EUR".to_string(),
      return_url: "http://localhost:8080/payment/success".to_string(),
      cancel_url: "http://localhost:8080/payment/cancel".to_string(),
    }
  }

  async fn mock_token(server: &MockServer) {
    Mock::given(method("POST"))
      .and(path("/v1/oauth2/token"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "access_token": "test-token",
        "token_type": "Bearer",
        "expires_in": 32400,
      })))
      .mount(server)
      .await;
  }

  #[tokio::test]
  async fn test_create_order_sends_amount_and_reference() {
    let server = MockServer::start().await;
    mock_token(&server).await;

    Mock::given(method("POST"))
      .and(path("/v2/checkout/orders"))
      .and(body_string_contains("\"value\":\"197.50\""))
      .and(body_string_contains("R-2026-0001"))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({
        "id": "ORDER-1",
        "status": "CREATED",
        "links": [
          {"href": "https://sandbox.paypal.com/approve", "rel": "approve", "method": "GET"}
        ],
      })))
      .mount(&server)
      .await;

    let client = PayPalClient::with_base_url(test_config(), server.uri());
    let order = client
      .create_order("R-2026-0001", dec!(197.50))
      .await
      .unwrap();

    assert_eq!(order.order_id, "ORDER-1");
    assert_eq!(order.status, "CREATED");
    assert_eq!(order.links.len(), 1);
    assert_eq!(order.links[0].rel, "approve");
  }

  #[tokio::test]
  async fn test_create_order_surfaces_api_error() {
    let server = MockServer::start().await;
    mock_token(&server).await;

    Mock::given(method("POST"))
      .and(path("/v2/checkout/orders"))
      .respond_with(ResponseTemplate::new(422).set_body_json(json!({
        "name": "UNPROCESSABLE_ENTITY",
        "message": "The requested action could not be performed.",
      })))
      .mount(&server)
      .await;

    let client = PayPalClient::with_base_url(test_config(), server.uri());
    let result = client.create_order("R-2026-0001", dec!(10.00)).await;

    match result {
      Err(BillingError::Gateway(msg)) => assert!(msg.contains("UNPROCESSABLE_ENTITY")),
      other => panic!("Expected gateway error, got {:?}", other.map(|o| o.order_id)),
    }
  }

  #[tokio::test]
  async fn test_capture_order_extracts_transaction() {
    let server = MockServer::start().await;
    mock_token(&server).await;

    Mock::given(method("POST"))
      .and(path("/v2/checkout/orders/ORDER-1/capture"))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({
        "id": "ORDER-1",
        "status": "COMPLETED",
        "purchase_units": [{
          "payments": {
            "captures": [{
              "id": "TXN-999",
              "status": "COMPLETED",
              "amount": {"currency_code": "EUR", "value": "297.50"},
            }],
          },
        }],
      })))
      .mount(&server)
      .await;

    let client = PayPalClient::with_base_url(test_config(), server.uri());
    let capture = client.capture_order("ORDER-1").await.unwrap();

    assert_eq!(capture.transaction_id, "TXN-999");
    assert_eq!(capture.amount, dec!(297.50));
    assert_eq!(capture.currency, "EUR");
    assert!(capture.completed);
  }

  #[tokio::test]
  async fn test_capture_with_declined_status_is_not_completed() {
    let server = MockServer::start().await;
    mock_token(&server).await;

    Mock::given(method("POST"))
      .and(path("/v2/checkout/orders/ORDER-2/capture"))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({
        "id": "ORDER-2",
        "status": "COMPLETED",
        "purchase_units": [{
          "payments": {
            "captures": [{
              "id": "TXN-1000",
              "status": "DECLINED",
              "amount": {"currency_code": "EUR", "value": "50.00"},
            }],
          },
        }],
      })))
      .mount(&server)
      .await;

    let client = PayPalClient::with_base_url(test_config(), server.uri());
    let capture = client.capture_order("ORDER-2").await.unwrap();

    assert!(!capture.completed);
    assert_eq!(capture.status, "DECLINED");
  }

  #[tokio::test]
  async fn test_token_failure_is_gateway_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
      .and(path("/v1/oauth2/token"))
      .respond_with(ResponseTemplate::new(401))
      .mount(&server)
      .await;

    let client = PayPalClient::with_base_url(test_config(), server.uri());
    let result = client.get_order("ORDER-1").await;

    assert!(matches!(result, Err(BillingError::Gateway(_))));
  }
}
