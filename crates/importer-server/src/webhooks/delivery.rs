//! Single webhook delivery attempts

use async_trait::async_trait;
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::ingest::WebhookConfig;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("Delivery failed: {0}")]
    Request(String),

    #[error("Subscription lookup failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Response to a delivery that reached the target
///
/// Non-2xx responses are receipts too; see [`DeliveryReceipt::is_success`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryReceipt {
    pub status_code: u16,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub body_excerpt: String,
}

impl DeliveryReceipt {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Sends one payload to one URL
#[async_trait]
pub trait WebhookDeliverer: Send + Sync {
    async fn deliver(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Delivers over HTTP with a per-attempt timeout and no retries
#[derive(Clone)]
pub struct HttpDeliverer {
    client: reqwest::Client,
    timeout: Duration,
    excerpt_len: usize,
}

impl HttpDeliverer {
    pub fn new(config: &WebhookConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("importer-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DeliveryError::Client(e.to_string()))?;

        Ok(Self {
            client,
            timeout: config.timeout(),
            excerpt_len: config.body_excerpt_len,
        })
    }
}

#[async_trait]
impl WebhookDeliverer for HttpDeliverer {
    async fn deliver(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let start = Instant::now();

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status_code = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        Ok(DeliveryReceipt {
            status_code,
            duration: start.elapsed(),
            body_excerpt: excerpt(&body, self.excerpt_len),
        })
    }
}

impl HttpDeliverer {
    fn classify(&self, err: reqwest::Error) -> DeliveryError {
        if err.is_timeout() {
            DeliveryError::Timeout(self.timeout)
        } else {
            DeliveryError::Request(err.to_string())
        }
    }
}

/// First `max_chars` characters of `body`
pub fn excerpt(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("héllo", 2), "hé");
        assert_eq!(excerpt("short", 300), "short");
    }

    #[tokio::test]
    async fn test_delivers_payload_and_truncates_body() {
        let server = MockServer::start().await;
        let payload = json!({"event": "import.completed", "data": {"rows": 3}});
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(&payload))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(500)))
            .expect(1)
            .mount(&server)
            .await;

        let deliverer = HttpDeliverer::new(&WebhookConfig::default()).unwrap();
        let receipt = deliverer
            .deliver(&format!("{}/hook", server.uri()), &payload)
            .await
            .unwrap();

        assert_eq!(receipt.status_code, 200);
        assert!(receipt.is_success());
        assert_eq!(receipt.body_excerpt.len(), 300);
    }

    #[tokio::test]
    async fn test_non_success_status_is_a_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let deliverer = HttpDeliverer::new(&WebhookConfig::default()).unwrap();
        let receipt = deliverer.deliver(&server.uri(), &json!({})).await.unwrap();

        assert_eq!(receipt.status_code, 503);
        assert!(!receipt.is_success());
        assert_eq!(receipt.body_excerpt, "down");
    }

    #[tokio::test]
    async fn test_slow_target_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let config = WebhookConfig {
            timeout_secs: 1,
            ..WebhookConfig::default()
        };
        let deliverer = HttpDeliverer::new(&config).unwrap();
        let err = deliverer.deliver(&server.uri(), &json!({})).await.unwrap_err();

        assert!(matches!(err, DeliveryError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_an_error() {
        let deliverer = HttpDeliverer::new(&WebhookConfig::default()).unwrap();
        let err = deliverer
            .deliver("http://127.0.0.1:1/hook", &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, DeliveryError::Request(_)));
    }
}
