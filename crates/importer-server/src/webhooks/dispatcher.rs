//! Event fan-out to webhook subscribers

use futures::future::join_all;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use super::delivery::{DeliveryReceipt, WebhookDeliverer};
use super::subscriptions::{SubscriptionSource, WebhookSubscription};

/// Result of one delivery attempt to one subscription
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    pub subscription_id: i64,
    pub url: String,
    /// Receipt, or the error message when the target was not reached
    pub result: Result<DeliveryReceipt, String>,
}

impl DeliveryOutcome {
    /// Reached the target and got a 2xx
    pub fn is_success(&self) -> bool {
        matches!(&self.result, Ok(receipt) if receipt.is_success())
    }
}

/// Looks up subscribers for an event and delivers to each of them
#[derive(Clone)]
pub struct WebhookDispatcher {
    subscriptions: Arc<dyn SubscriptionSource>,
    deliverer: Arc<dyn WebhookDeliverer>,
}

impl WebhookDispatcher {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionSource>,
        deliverer: Arc<dyn WebhookDeliverer>,
    ) -> Self {
        Self {
            subscriptions,
            deliverer,
        }
    }

    /// Deliver `data` to every enabled subscriber of `event_type`
    ///
    /// Each delivery runs in its own task and all of them are awaited. A
    /// failed lookup or delivery is logged and reported in the outcomes,
    /// never returned as an error.
    #[tracing::instrument(skip(self, data))]
    pub async fn fire(&self, event_type: &str, data: Value) -> Vec<DeliveryOutcome> {
        let subscriptions = match self.subscriptions.subscriptions_for(event_type).await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                warn!(error = %e, "Failed to load webhook subscriptions");
                return Vec::new();
            }
        };

        if subscriptions.is_empty() {
            return Vec::new();
        }

        let payload = Arc::new(json!({ "event": event_type, "data": data }));

        let tasks = subscriptions.into_iter().map(|subscription| {
            let deliverer = Arc::clone(&self.deliverer);
            let payload = Arc::clone(&payload);
            let id = subscription.id;
            let url = subscription.url.clone();
            let handle =
                tokio::spawn(async move { attempt(deliverer.as_ref(), &subscription, &payload).await });
            async move {
                match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => DeliveryOutcome {
                        subscription_id: id,
                        url,
                        result: Err(format!("delivery task failed: {}", e)),
                    },
                }
            }
        });

        let outcomes = join_all(tasks).await;

        let delivered = outcomes.iter().filter(|o| o.is_success()).count();
        info!(
            subscribers = outcomes.len(),
            delivered,
            failed = outcomes.len() - delivered,
            "Webhook fan-out finished"
        );

        outcomes
    }

    /// Deliver one event to one subscription, regardless of its event type
    /// or enabled flag
    pub async fn deliver_to(
        &self,
        subscription: &WebhookSubscription,
        event_type: &str,
        data: Value,
    ) -> DeliveryOutcome {
        let payload = json!({ "event": event_type, "data": data });
        attempt(self.deliverer.as_ref(), subscription, &payload).await
    }
}

async fn attempt(
    deliverer: &dyn WebhookDeliverer,
    subscription: &WebhookSubscription,
    payload: &Value,
) -> DeliveryOutcome {
    let result = match deliverer.deliver(&subscription.url, payload).await {
        Ok(receipt) => {
            if receipt.is_success() {
                info!(
                    subscription_id = subscription.id,
                    status = receipt.status_code,
                    duration_ms = receipt.duration.as_millis() as u64,
                    "Webhook delivered"
                );
            } else {
                warn!(
                    subscription_id = subscription.id,
                    status = receipt.status_code,
                    body = %receipt.body_excerpt,
                    "Webhook target returned non-success status"
                );
            }
            Ok(receipt)
        }
        Err(e) => {
            warn!(
                subscription_id = subscription.id,
                url = %subscription.url,
                error = %e,
                "Webhook delivery failed"
            );
            Err(e.to_string())
        }
    };

    DeliveryOutcome {
        subscription_id: subscription.id,
        url: subscription.url.clone(),
        result,
    }
}
