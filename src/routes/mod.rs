pub mod docs;
pub mod health;
pub mod subscriptions;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use docs::create_docs_routes;
pub use health::create_health_routes;
pub use subscriptions::{SubscriptionState, create_subscription_routes};

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    #[schema(example = "price must be >= 0")]
    pub error: String,
}
