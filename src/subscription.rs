//! Wire-facing request and response shapes for subscriptions.

use crate::database::entities::SubscriptionRecord;
use crate::utils::format_month;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of create and update requests
///
/// Missing fields decode to their empty value and are then rejected by
/// validation with a field-specific message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SubscriptionPayload {
    /// Name of the subscribed service
    #[schema(example = "Yandex Plus")]
    pub service_name: String,
    /// Monthly price, whole currency units
    #[schema(example = 400)]
    pub price: i64,
    /// Owner of the subscription
    #[schema(example = "60601fee-2bf1-4721-ae6f-7636e79a0cba")]
    pub user_id: String,
    /// First month, `YYYY-MM` or `MM-YYYY`
    #[schema(example = "07-2025")]
    pub start_date: String,
    /// Last month, `YYYY-MM` or `MM-YYYY`; omit for an open-ended subscription
    #[schema(example = "12-2025")]
    pub end_date: Option<String>,
}

/// A stored subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    pub id: String,
    pub service_name: String,
    pub price: i32,
    pub user_id: String,
    /// `YYYY-MM`
    pub start_date: String,
    /// `YYYY-MM`, absent for open-ended subscriptions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl From<SubscriptionRecord> for SubscriptionResponse {
    fn from(record: SubscriptionRecord) -> Self {
        Self {
            id: record.id.to_string(),
            service_name: record.service_name,
            price: record.price,
            user_id: record.user_id.to_string(),
            start_date: format_month(&record.start_date),
            end_date: record.end_date.as_ref().map(format_month),
        }
    }
}

/// Page of subscriptions
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionListResponse {
    pub items: Vec<SubscriptionResponse>,
    /// Effective page size
    pub limit: u64,
    /// Effective offset
    pub offset: u64,
}

/// Total cost over a range of months
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SummaryResponse {
    #[schema(example = 1200)]
    pub total: i64,
}

/// Acknowledgement for update and delete
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    #[schema(example = "updated")]
    pub status: String,
}

impl StatusResponse {
    pub fn updated() -> Self {
        Self {
            status: "updated".to_string(),
        }
    }

    pub fn deleted() -> Self {
        Self {
            status: "deleted".to_string(),
        }
    }
}
