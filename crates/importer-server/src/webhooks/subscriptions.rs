//! Webhook subscription lookup

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::delivery::DeliveryError;

/// A registered webhook target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WebhookSubscription {
    pub id: i64,
    pub url: String,
    pub event_type: String,
    pub enabled: bool,
}

impl WebhookSubscription {
    pub fn new(id: i64, url: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            event_type: event_type.into(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Read-only view of the subscription table
#[async_trait]
pub trait SubscriptionSource: Send + Sync {
    /// Enabled subscriptions for `event_type`
    async fn subscriptions_for(
        &self,
        event_type: &str,
    ) -> Result<Vec<WebhookSubscription>, DeliveryError>;
}

#[derive(Clone)]
pub struct PgSubscriptionSource {
    db: PgPool,
}

impl PgSubscriptionSource {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubscriptionSource for PgSubscriptionSource {
    async fn subscriptions_for(
        &self,
        event_type: &str,
    ) -> Result<Vec<WebhookSubscription>, DeliveryError> {
        let subscriptions = sqlx::query_as::<_, WebhookSubscription>(
            r#"
            SELECT id, url, event_type, enabled
            FROM webhooks
            WHERE event_type = $1 AND enabled = TRUE
            ORDER BY id
            "#,
        )
        .bind(event_type)
        .fetch_all(&self.db)
        .await?;

        Ok(subscriptions)
    }
}

/// Fixed subscription list
#[derive(Debug, Clone, Default)]
pub struct StaticSubscriptions(pub Vec<WebhookSubscription>);

impl StaticSubscriptions {
    pub fn new(subscriptions: Vec<WebhookSubscription>) -> Self {
        Self(subscriptions)
    }
}

#[async_trait]
impl SubscriptionSource for StaticSubscriptions {
    async fn subscriptions_for(
        &self,
        event_type: &str,
    ) -> Result<Vec<WebhookSubscription>, DeliveryError> {
        Ok(self
            .0
            .iter()
            .filter(|s| s.enabled && s.event_type == event_type)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source_filters_enabled_and_event() {
        let source = StaticSubscriptions::new(vec![
            WebhookSubscription::new(1, "http://a", "import.completed"),
            WebhookSubscription::new(2, "http://b", "import.completed").disabled(),
            WebhookSubscription::new(3, "http://c", "other"),
        ]);

        let found = source.subscriptions_for("import.completed").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
    }
}
