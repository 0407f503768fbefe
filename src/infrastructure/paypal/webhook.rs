use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use lazy_static::lazy_static;
use regex::Regex;
use rsa::pkcs1v15::Pkcs1v15Sign;
use rsa::{BigUint, RsaPublicKey};
use sha2::{Digest, Sha256};
use thiserror::Error;
use x509_parser::prelude::{FromDer, X509Certificate};
use x509_parser::public_key::PublicKey;

lazy_static! {
  /// Only PayPal's own certificate endpoints are trusted. Anything else
  /// would let an attacker replay a valid-looking signature with their own
  /// certificate.
  static ref ALLOWED_CERT_URL: Regex =
    Regex::new(r"^https://api\.(sandbox\.)?paypal\.com/").unwrap();
}

#[derive(Debug, Error)]
pub enum WebhookConfigError {
  #[error("PayPal webhook id must be configured before webhooks can be verified")]
  MissingWebhookId,
}

/// Transport headers carried by every PayPal webhook delivery.
#[derive(Debug, Default, Clone)]
pub struct WebhookHeaders {
  pub transmission_id: Option<String>,
  pub transmission_time: Option<String>,
  pub transmission_sig: Option<String>,
  pub cert_url: Option<String>,
  pub auth_algo: Option<String>,
}

/// Verifies the authenticity of PayPal webhook deliveries.
///
/// The signature covers `transmission_id|transmission_time|webhook_id|
/// crc32(body)` and is checked against the RSA certificate PayPal serves
/// from its own domain. Every failure path degrades to a rejection: a bad
/// webhook must never take the receiver down.
///
/// Construction fails without a webhook id. Verification cannot work
/// without one, and accepting events unverified in that state would turn a
/// configuration gap into an open door.
pub struct PayPalWebhookVerifier {
  webhook_id: String,
  http: reqwest::Client,
}

impl PayPalWebhookVerifier {
  pub fn new(webhook_id: impl Into<String>) -> Result<Self, WebhookConfigError> {
    let webhook_id = webhook_id.into();
    if webhook_id.trim().is_empty() {
      return Err(WebhookConfigError::MissingWebhookId);
    }
    Ok(Self {
      webhook_id,
      http: reqwest::Client::new(),
    })
  }

  /// Verifies one webhook delivery. Boolean outcome only: `false` covers
  /// everything from missing headers to a broken certificate, each logged
  /// for audit.
  pub async fn verify(&self, headers: &WebhookHeaders, body: &[u8]) -> bool {
    let (Some(transmission_id), Some(transmission_time), Some(signature), Some(cert_url), Some(auth_algo)) = (
      headers.transmission_id.as_deref(),
      headers.transmission_time.as_deref(),
      headers.transmission_sig.as_deref(),
      headers.cert_url.as_deref(),
      headers.auth_algo.as_deref(),
    ) else {
      tracing::warn!("Webhook rejected: missing required signature headers");
      return false;
    };

    if !is_sha256_algo(auth_algo) {
      tracing::warn!(%auth_algo, "Webhook rejected: unsupported signing algorithm");
      return false;
    }

    if !is_allowed_cert_url(cert_url) {
      tracing::error!(%cert_url, "Webhook rejected: certificate URL is not a PayPal endpoint");
      return false;
    }

    let cert_pem = match self.fetch_certificate(cert_url).await {
      Ok(pem) => pem,
      Err(e) => {
        tracing::error!(%cert_url, error = %e, "Webhook rejected: certificate download failed");
        return false;
      }
    };

    let public_key = match extract_rsa_public_key(&cert_pem) {
      Ok(key) => key,
      Err(e) => {
        tracing::error!(%cert_url, error = %e, "Webhook rejected: unusable certificate");
        return false;
      }
    };

    let message = expected_message(transmission_id, transmission_time, &self.webhook_id, body);

    match verify_signature(&public_key, &message, signature) {
      Ok(true) => {
        tracing::info!(%transmission_id, "Webhook signature verified");
        true
      }
      Ok(false) => {
        tracing::error!(%transmission_id, "Webhook rejected: signature mismatch");
        false
      }
      Err(e) => {
        tracing::error!(%transmission_id, error = %e, "Webhook rejected: verification error");
        false
      }
    }
  }

  async fn fetch_certificate(&self, cert_url: &str) -> Result<String, String> {
    let response = self
      .http
      .get(cert_url)
      .send()
      .await
      .map_err(|e| e.to_string())?;

    if !response.status().is_success() {
      return Err(format!("certificate endpoint returned {}", response.status()));
    }

    response.text().await.map_err(|e| e.to_string())
  }
}

fn is_sha256_algo(auth_algo: &str) -> bool {
  auth_algo.to_uppercase().contains("SHA256")
}

fn is_allowed_cert_url(cert_url: &str) -> bool {
  ALLOWED_CERT_URL.is_match(cert_url)
}

/// The canonical string PayPal signs for each delivery.
fn expected_message(
  transmission_id: &str,
  transmission_time: &str,
  webhook_id: &str,
  body: &[u8],
) -> String {
  format!(
    "{}|{}|{}|{}",
    transmission_id,
    transmission_time,
    webhook_id,
    crc32fast::hash(body)
  )
}

fn extract_rsa_public_key(cert_pem: &str) -> Result<RsaPublicKey, String> {
  let pem = x509_parser::pem::parse_x509_pem(cert_pem.as_bytes())
    .map_err(|e| format!("invalid PEM: {}", e))?
    .1;

  let (_, certificate) =
    X509Certificate::from_der(&pem.contents).map_err(|e| format!("invalid certificate: {}", e))?;

  match certificate
    .public_key()
    .parsed()
    .map_err(|e| format!("invalid public key: {}", e))?
  {
    PublicKey::RSA(rsa_key) => RsaPublicKey::new(
      BigUint::from_bytes_be(rsa_key.modulus),
      BigUint::from_bytes_be(rsa_key.exponent),
    )
    .map_err(|e| format!("invalid RSA key: {}", e)),
    _ => Err("certificate does not carry an RSA key".to_string()),
  }
}

fn verify_signature(
  public_key: &RsaPublicKey,
  message: &str,
  signature_b64: &str,
) -> Result<bool, String> {
  let signature = BASE64
    .decode(signature_b64)
    .map_err(|e| format!("invalid base64 signature: {}", e))?;

  let digest = Sha256::digest(message.as_bytes());

  Ok(
    public_key
      .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &signature)
      .is_ok(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use rsa::RsaPrivateKey;

  fn headers(body_sig: &str) -> WebhookHeaders {
    WebhookHeaders {
      transmission_id: Some("tid-1".to_string()),
      transmission_time: Some("2026-02-01T10:00:00Z".to_string()),
      transmission_sig: Some(body_sig.to_string()),
      cert_url: Some("https://api.sandbox.paypal.com/v1/notifications/certs/CERT-1".to_string()),
      auth_algo: Some("SHA256withRSA".to_string()),
    }
  }

  fn sign(key: &RsaPrivateKey, message: &str) -> String {
    let digest = Sha256::digest(message.as_bytes());
    let signature = key
      .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
      .expect("signing failed");
    BASE64.encode(signature)
  }

  #[test]
  fn test_unconfigured_webhook_id_fails_construction() {
    // Unlike setups that silently accept all webhooks while the id is
    // unconfigured, construction refuses outright. Missing configuration
    // must fail at startup, not at verification time.
    assert!(matches!(
      PayPalWebhookVerifier::new(""),
      Err(WebhookConfigError::MissingWebhookId)
    ));
    assert!(matches!(
      PayPalWebhookVerifier::new("   "),
      Err(WebhookConfigError::MissingWebhookId)
    ));
    assert!(PayPalWebhookVerifier::new("WH-123").is_ok());
  }

  #[tokio::test]
  async fn test_missing_headers_are_rejected() {
    let verifier = PayPalWebhookVerifier::new("WH-123").unwrap();

    let mut incomplete = headers("sig");
    incomplete.transmission_sig = None;

    assert!(!verifier.verify(&incomplete, b"{}").await);
    assert!(!verifier.verify(&WebhookHeaders::default(), b"{}").await);
  }

  #[tokio::test]
  async fn test_foreign_cert_url_is_rejected() {
    let verifier = PayPalWebhookVerifier::new("WH-123").unwrap();

    let mut spoofed = headers("sig");
    spoofed.cert_url = Some("https://evil.example.com/cert.pem".to_string());

    assert!(!verifier.verify(&spoofed, b"{}").await);
  }

  #[test]
  fn test_cert_url_allow_list() {
    assert!(is_allowed_cert_url(
      "https://api.paypal.com/v1/notifications/certs/CERT-1"
    ));
    assert!(is_allowed_cert_url(
      "https://api.sandbox.paypal.com/v1/notifications/certs/CERT-1"
    ));
    assert!(!is_allowed_cert_url("http://api.paypal.com/cert"));
    assert!(!is_allowed_cert_url("https://api.paypal.com.evil.com/cert"));
    assert!(!is_allowed_cert_url("https://evil.com/api.paypal.com/"));
  }

  #[test]
  fn test_unsupported_algo_is_rejected() {
    assert!(is_sha256_algo("SHA256withRSA"));
    assert!(is_sha256_algo("sha256withrsa"));
    assert!(!is_sha256_algo("SHA1withRSA"));
    assert!(!is_sha256_algo("MD5"));
  }

  #[test]
  fn test_canonical_message_includes_body_crc() {
    let message = expected_message("tid-1", "2026-02-01T10:00:00Z", "WH-123", b"{\"a\":1}");
    let crc = crc32fast::hash(b"{\"a\":1}");
    assert_eq!(
      message,
      format!("tid-1|2026-02-01T10:00:00Z|WH-123|{}", crc)
    );
  }

  #[test]
  fn test_signature_over_different_body_fails() {
    let mut rng = rand::rngs::OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation failed");
    let public_key = RsaPublicKey::from(&private_key);

    let genuine = expected_message("tid-1", "2026-02-01T10:00:00Z", "WH-123", b"{\"amount\":10}");
    let signature = sign(&private_key, &genuine);

    // same signature, tampered body -> different crc -> mismatch
    let tampered = expected_message("tid-1", "2026-02-01T10:00:00Z", "WH-123", b"{\"amount\":99}");

    assert!(verify_signature(&public_key, &genuine, &signature).unwrap());
    assert!(!verify_signature(&public_key, &tampered, &signature).unwrap());
  }

  #[test]
  fn test_garbage_signature_is_an_error_not_a_panic() {
    let mut rng = rand::rngs::OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation failed");
    let public_key = RsaPublicKey::from(&private_key);

    assert!(verify_signature(&public_key, "message", "not-base64!!!").is_err());
    assert!(!verify_signature(&public_key, "message", &BASE64.encode(b"junk")).unwrap());
  }
}
