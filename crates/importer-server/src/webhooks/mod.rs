//! Outbound webhook fan-out
//!
//! When an event fires, every enabled subscription for its event type gets
//! one delivery attempt carrying `{"event": <type>, "data": <payload>}`.
//! Deliveries run concurrently and independently; a failed delivery is
//! reported in its own [`DeliveryOutcome`] and never reaches the caller as
//! an error.

pub mod delivery;
pub mod dispatcher;
pub mod subscriptions;

pub use delivery::{DeliveryError, DeliveryReceipt, HttpDeliverer, WebhookDeliverer};
pub use dispatcher::{DeliveryOutcome, WebhookDispatcher};
pub use subscriptions::{
    PgSubscriptionSource, StaticSubscriptions, SubscriptionSource, WebhookSubscription,
};

/// Fired once per import that reaches `COMPLETED`
pub const IMPORT_COMPLETED: &str = "import.completed";

/// Fired by the subscription test endpoint
pub const TEST_EVENT: &str = "test";
