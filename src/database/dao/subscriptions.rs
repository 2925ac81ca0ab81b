use crate::database::entities::{SubscriptionRecord, subscriptions};
use crate::database::{DatabaseError, DatabaseResult};
use crate::utils::month_index;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set, Statement, Value,
};
use uuid::Uuid;

/// Filters for listing subscriptions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub user_id: Option<Uuid>,
    /// Case-insensitive substring of the service name
    pub service_name: Option<String>,
    pub limit: u64,
    pub offset: u64,
}

/// Filters for the cost summary over an inclusive range of months
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryFilter {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub user_id: Option<Uuid>,
    pub service_name: Option<String>,
}

/// Persistence contract the HTTP handlers depend on
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert a new subscription; the id and timestamps of `subscription` are
    /// ignored and generated here. Returns the stored record.
    async fn create(&self, subscription: &SubscriptionRecord) -> DatabaseResult<SubscriptionRecord>;

    /// Fetch one subscription, `DatabaseError::NotFound` when absent
    async fn get(&self, id: Uuid) -> DatabaseResult<SubscriptionRecord>;

    /// Overwrite every mutable column of the row with `subscription.id`.
    /// Updating an id that does not exist is not an error.
    async fn update(&self, subscription: &SubscriptionRecord) -> DatabaseResult<()>;

    /// Delete by id, succeeding whether or not the row existed
    async fn delete(&self, id: Uuid) -> DatabaseResult<()>;

    /// Filtered page of subscriptions, newest first
    async fn list(&self, filter: &ListFilter) -> DatabaseResult<Vec<SubscriptionRecord>>;

    /// Sum of `price` over every (month, subscription) pair where the
    /// subscription is active in that month of the range
    async fn summary(&self, filter: &SummaryFilter) -> DatabaseResult<i64>;
}

/// `%pattern%` for a case-insensitive contains match. Wildcards inside the
/// pattern are passed through unescaped.
pub fn contains_pattern(service_name: &str) -> String {
    format!("%{}%", service_name.to_lowercase())
}

/// Subscriptions DAO for database operations
#[derive(Clone)]
pub struct SubscriptionsDao {
    db: DatabaseConnection,
}

impl SubscriptionsDao {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Build the single summary statement: a recursive series of month
    /// indices from `start` to `end`, joined against every subscription
    /// active in that month.
    ///
    /// Only the two range ends are bound, so the parameter count does not
    /// depend on the width of the range.
    fn summary_statement(backend: DatabaseBackend, filter: &SummaryFilter) -> Option<Statement> {
        let (start, end) = (month_index(&filter.start), month_index(&filter.end));
        if end < start {
            return None;
        }

        let mut values: Vec<Value> = Vec::with_capacity(4);
        let mut bind = |value: Value| {
            values.push(value);
            placeholder(backend, values.len())
        };

        let first = bind(start.into());
        let last = bind(end.into());
        let start_month = month_index_sql(backend, "s.start_date");
        let end_month = month_index_sql(backend, "s.end_date");

        let mut sql = format!(
            "WITH RECURSIVE months (m) AS ( \
               SELECT CAST({first} AS BIGINT) \
               UNION ALL \
               SELECT m + 1 FROM months WHERE m < {last}) \
             SELECT CAST(COALESCE(SUM(s.price), 0) AS BIGINT) AS total \
             FROM months \
             JOIN subscriptions s \
               ON {start_month} <= months.m \
              AND (s.end_date IS NULL OR {end_month} >= months.m) \
             WHERE 1 = 1"
        );

        if let Some(user_id) = filter.user_id {
            sql.push_str(&format!(" AND s.user_id = {}", bind(user_id.into())));
        }
        if let Some(ref service_name) = filter.service_name {
            sql.push_str(&format!(
                " AND LOWER(s.service_name) LIKE {}",
                bind(contains_pattern(service_name).into())
            ));
        }

        Some(Statement::from_sql_and_values(backend, sql, values))
    }
}

fn placeholder(backend: DatabaseBackend, index: usize) -> String {
    match backend {
        DatabaseBackend::Postgres => format!("${index}"),
        _ => "?".to_string(),
    }
}

/// SQL for the `year * 12 + month - 1` index of a timestamp column, matching
/// [`month_index`]
fn month_index_sql(backend: DatabaseBackend, column: &str) -> String {
    match backend {
        DatabaseBackend::Postgres => format!(
            "(CAST(EXTRACT(YEAR FROM {column} AT TIME ZONE 'UTC') AS BIGINT) * 12 \
              + CAST(EXTRACT(MONTH FROM {column} AT TIME ZONE 'UTC') AS BIGINT) - 1)"
        ),
        _ => format!(
            "(CAST(strftime('%Y', {column}) AS INTEGER) * 12 \
              + CAST(strftime('%m', {column}) AS INTEGER) - 1)"
        ),
    }
}

#[derive(Debug, FromQueryResult)]
struct SummaryRow {
    total: i64,
}

#[async_trait]
impl SubscriptionStore for SubscriptionsDao {
    async fn create(
        &self,
        subscription: &SubscriptionRecord,
    ) -> DatabaseResult<SubscriptionRecord> {
        let now = Utc::now();
        let active_model = subscriptions::ActiveModel {
            id: Set(Uuid::new_v4()),
            service_name: Set(subscription.service_name.clone()),
            price: Set(subscription.price),
            user_id: Set(subscription.user_id),
            start_date: Set(subscription.start_date),
            end_date: Set(subscription.end_date),
            created_at: Set(now),
            updated_at: Set(now),
        };

        active_model
            .insert(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))
    }

    async fn get(&self, id: Uuid) -> DatabaseResult<SubscriptionRecord> {
        subscriptions::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?
            .ok_or(DatabaseError::NotFound)
    }

    async fn update(&self, subscription: &SubscriptionRecord) -> DatabaseResult<()> {
        subscriptions::Entity::update_many()
            .col_expr(
                subscriptions::Column::ServiceName,
                Expr::value(subscription.service_name.clone()),
            )
            .col_expr(subscriptions::Column::Price, Expr::value(subscription.price))
            .col_expr(subscriptions::Column::UserId, Expr::value(subscription.user_id))
            .col_expr(
                subscriptions::Column::StartDate,
                Expr::value(subscription.start_date),
            )
            .col_expr(subscriptions::Column::EndDate, Expr::value(subscription.end_date))
            .col_expr(subscriptions::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(subscriptions::Column::Id.eq(subscription.id))
            .exec(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<()> {
        subscriptions::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(())
    }

    async fn list(&self, filter: &ListFilter) -> DatabaseResult<Vec<SubscriptionRecord>> {
        let mut select = subscriptions::Entity::find();

        if let Some(user_id) = filter.user_id {
            select = select.filter(subscriptions::Column::UserId.eq(user_id));
        }
        if let Some(ref service_name) = filter.service_name {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(subscriptions::Column::ServiceName)))
                    .like(contains_pattern(service_name)),
            );
        }

        select
            .order_by_desc(subscriptions::Column::CreatedAt)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))
    }

    async fn summary(&self, filter: &SummaryFilter) -> DatabaseResult<i64> {
        let Some(statement) = Self::summary_statement(self.db.get_database_backend(), filter)
        else {
            return Ok(0);
        };

        let row = SummaryRow::find_by_statement(statement)
            .one(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(row.map(|r| r.total).unwrap_or(0))
    }
}
