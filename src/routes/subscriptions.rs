use crate::{
    database::{
        DatabaseError, ListFilter, SubscriptionStore, SummaryFilter,
        entities::SubscriptionRecord,
    },
    error::AppError,
    routes::ApiErrorResponse,
    subscription::{
        StatusResponse, SubscriptionListResponse, SubscriptionPayload, SubscriptionResponse,
        SummaryResponse,
    },
    utils::parse_month,
};
use axum::{
    Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::IntoParams;
use uuid::Uuid;

/// Storage handle shared by every subscription handler
pub type SubscriptionState = Arc<dyn SubscriptionStore>;

pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;

/// Query parameters for listing subscriptions
///
/// Values are kept as text so that malformed `limit`/`offset` fall back to
/// their defaults instead of failing the request.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSubscriptionsQuery {
    /// Owner UUID
    pub user_id: Option<String>,
    /// Case-insensitive substring of the service name
    pub service_name: Option<String>,
    /// Page size, 1..=100 (default 20)
    pub limit: Option<String>,
    /// Rows to skip (default 0)
    pub offset: Option<String>,
}

/// Query parameters for the cost summary
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    /// First month of the period, `YYYY-MM` or `MM-YYYY`
    pub start: Option<String>,
    /// Last month of the period, `YYYY-MM` or `MM-YYYY`
    pub end: Option<String>,
    /// Owner UUID
    pub user_id: Option<String>,
    /// Case-insensitive substring of the service name
    pub service_name: Option<String>,
}

/// Create subscription routes
pub fn create_subscription_routes() -> Router<SubscriptionState> {
    Router::new()
        .route(
            "/subscriptions",
            post(create_subscription).get(list_subscriptions),
        )
        .route(
            "/subscriptions/",
            post(create_subscription).get(list_subscriptions),
        )
        .route("/subscriptions/summary", get(subscriptions_summary))
        .route(
            "/subscriptions/{id}",
            get(get_subscription)
                .put(update_subscription)
                .delete(delete_subscription),
        )
}

/// Validated form of a create/update body
fn validate_payload(payload: SubscriptionPayload) -> Result<SubscriptionRecord, AppError> {
    if payload.service_name.is_empty() {
        return Err(bad_request("service_name is required"));
    }
    if payload.price < 0 {
        return Err(bad_request("price must be >= 0"));
    }
    let price = i32::try_from(payload.price).map_err(|_| bad_request("price is too large"))?;

    let user_id = Uuid::parse_str(&payload.user_id)
        .map_err(|_| bad_request("invalid user_id (uuid expected)"))?;

    let start_date = parse_month(&payload.start_date)
        .map_err(|_| bad_request("invalid start_date (YYYY-MM or MM-YYYY)"))?;

    let end_date = match payload.end_date.as_deref() {
        None | Some("") => None,
        Some(raw) => {
            let end_date = parse_month(raw)
                .map_err(|_| bad_request("invalid end_date (YYYY-MM or MM-YYYY)"))?;
            if end_date < start_date {
                return Err(bad_request("end_date must be >= start_date"));
            }
            Some(end_date)
        }
    };

    Ok(SubscriptionRecord::new(payload.service_name, price, user_id, start_date)
        .with_end_date(end_date))
}

fn bad_request(message: &str) -> AppError {
    AppError::BadRequest(message.to_string())
}

fn parse_path_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| bad_request("invalid id (uuid expected)"))
}

/// Empty query values count as absent
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_user_filter(value: Option<String>) -> Result<Option<Uuid>, AppError> {
    non_empty(value)
        .map(|raw| Uuid::parse_str(&raw).map_err(|_| bad_request("invalid user_id")))
        .transpose()
}

/// Page size in `1..=MAX_LIMIT`, anything else falls back to the default
fn effective_limit(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.parse::<i64>().ok())
        .filter(|n| *n > 0 && *n <= MAX_LIMIT as i64)
        .map(|n| n as u64)
        .unwrap_or(DEFAULT_LIMIT)
}

/// Non-negative offset, anything else falls back to zero
fn effective_offset(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.parse::<i64>().ok())
        .filter(|n| *n >= 0)
        .map(|n| n as u64)
        .unwrap_or(0)
}

fn decode_body(
    body: Result<Json<SubscriptionPayload>, JsonRejection>,
) -> Result<SubscriptionPayload, AppError> {
    body.map(|Json(payload)| payload)
        .map_err(|_| bad_request("invalid json"))
}

fn decode_query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    query
        .map(|Query(query)| query)
        .map_err(|_| bad_request("invalid query"))
}

/// Log a storage failure and turn it into an opaque server error
fn storage_failure(operation: &'static str) -> impl FnOnce(DatabaseError) -> AppError {
    move |e| {
        error!(error = %e, "{} failed", operation);
        AppError::Database(e)
    }
}

/// Create a subscription
#[utoipa::path(
    post,
    path = "/subscriptions/",
    summary = "Create subscription",
    description = "Creates a subscription record",
    request_body = SubscriptionPayload,
    responses(
        (status = 201, description = "Subscription created", body = SubscriptionResponse),
        (status = 400, description = "Invalid input", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "Subscriptions"
)]
pub async fn create_subscription(
    State(store): State<SubscriptionState>,
    body: Result<Json<SubscriptionPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), AppError> {
    let subscription = validate_payload(decode_body(body)?)?;

    let created = store
        .create(&subscription)
        .await
        .map_err(storage_failure("create subscription"))?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Get a subscription by id
#[utoipa::path(
    get,
    path = "/subscriptions/{id}",
    summary = "Get subscription",
    params(("id" = String, Path, description = "Subscription id (uuid)")),
    responses(
        (status = 200, description = "Subscription found", body = SubscriptionResponse),
        (status = 400, description = "Invalid id", body = ApiErrorResponse),
        (status = 404, description = "Subscription not found", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "Subscriptions"
)]
pub async fn get_subscription(
    State(store): State<SubscriptionState>,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let id = parse_path_id(&id)?;

    match store.get(id).await {
        Ok(record) => Ok(Json(record.into())),
        Err(DatabaseError::NotFound) => {
            Err(AppError::NotFound("subscription not found".to_string()))
        }
        Err(e) => Err(storage_failure("get subscription")(e)),
    }
}

/// Replace every field of a subscription
#[utoipa::path(
    put,
    path = "/subscriptions/{id}",
    summary = "Update subscription",
    description = "Overwrites all fields of the subscription with the given id. \
                   Updating an unknown id succeeds without effect.",
    params(("id" = String, Path, description = "Subscription id (uuid)")),
    request_body = SubscriptionPayload,
    responses(
        (status = 200, description = "Subscription updated", body = StatusResponse),
        (status = 400, description = "Invalid input", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "Subscriptions"
)]
pub async fn update_subscription(
    State(store): State<SubscriptionState>,
    Path(id): Path<String>,
    body: Result<Json<SubscriptionPayload>, JsonRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    let id = parse_path_id(&id)?;
    let subscription = validate_payload(decode_body(body)?)?.with_id(id);

    store
        .update(&subscription)
        .await
        .map_err(storage_failure("update subscription"))?;

    Ok(Json(StatusResponse::updated()))
}

/// Delete a subscription
#[utoipa::path(
    delete,
    path = "/subscriptions/{id}",
    summary = "Delete subscription",
    params(("id" = String, Path, description = "Subscription id (uuid)")),
    responses(
        (status = 200, description = "Subscription deleted", body = StatusResponse),
        (status = 400, description = "Invalid id", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "Subscriptions"
)]
pub async fn delete_subscription(
    State(store): State<SubscriptionState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let id = parse_path_id(&id)?;

    store
        .delete(id)
        .await
        .map_err(storage_failure("delete subscription"))?;

    Ok(Json(StatusResponse::deleted()))
}

/// List subscriptions
#[utoipa::path(
    get,
    path = "/subscriptions/",
    summary = "List subscriptions",
    description = "Newest first. Out-of-range limit/offset values fall back to their defaults.",
    params(ListSubscriptionsQuery),
    responses(
        (status = 200, description = "Page of subscriptions", body = SubscriptionListResponse),
        (status = 400, description = "Invalid filter", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "Subscriptions"
)]
pub async fn list_subscriptions(
    State(store): State<SubscriptionState>,
    query: Result<Query<ListSubscriptionsQuery>, QueryRejection>,
) -> Result<Json<SubscriptionListResponse>, AppError> {
    let query = decode_query(query)?;

    let filter = ListFilter {
        user_id: parse_user_filter(query.user_id)?,
        service_name: non_empty(query.service_name),
        limit: effective_limit(query.limit.as_deref()),
        offset: effective_offset(query.offset.as_deref()),
    };

    let records = store
        .list(&filter)
        .await
        .map_err(storage_failure("list subscriptions"))?;

    Ok(Json(SubscriptionListResponse {
        items: records.into_iter().map(Into::into).collect(),
        limit: filter.limit,
        offset: filter.offset,
    }))
}

/// Total subscription cost over a period
#[utoipa::path(
    get,
    path = "/subscriptions/summary",
    summary = "Cost summary",
    description = "Sums the price of every subscription once for each month of the inclusive \
                   period in which it is active.",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Total cost", body = SummaryResponse),
        (status = 400, description = "Invalid period or filter", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "Subscriptions"
)]
pub async fn subscriptions_summary(
    State(store): State<SubscriptionState>,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Json<SummaryResponse>, AppError> {
    let query = decode_query(query)?;

    let (Some(start), Some(end)) = (non_empty(query.start), non_empty(query.end)) else {
        return Err(bad_request(
            "start and end are required (YYYY-MM or MM-YYYY)",
        ));
    };
    let start = parse_month(&start).map_err(|_| bad_request("invalid start"))?;
    let end = parse_month(&end).map_err(|_| bad_request("invalid end"))?;
    if end < start {
        return Err(bad_request("end must be >= start"));
    }

    let filter = SummaryFilter {
        start,
        end,
        user_id: parse_user_filter(query.user_id)?,
        service_name: non_empty(query.service_name),
    };

    let total = store
        .summary(&filter)
        .await
        .map_err(storage_failure("summary"))?;

    Ok(Json(SummaryResponse { total }))
}
