use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A paid subscription owned by a user, active from `start_date` through
/// `end_date` (open-ended when `end_date` is `None`).
///
/// Both dates are calendar months: the first day of the month, midnight UTC.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub service_name: String,
    pub price: i32,
    pub user_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Create a record with the mutable fields set; id and timestamps are
    /// assigned when it is stored.
    pub fn new(
        service_name: impl Into<String>,
        price: i32,
        user_id: Uuid,
        start_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            service_name: service_name.into(),
            price,
            user_id,
            start_date,
            end_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_end_date(mut self, end_date: Option<DateTime<Utc>>) -> Self {
        self.end_date = end_date;
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Whether the subscription is active during the month starting at `month`.
    pub fn covers_month(&self, month: &DateTime<Utc>) -> bool {
        self.start_date <= *month && self.end_date.is_none_or(|end| end >= *month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_month;

    #[test]
    fn test_covers_month_open_ended() {
        let record = Model::new("Netflix", 10, Uuid::new_v4(), parse_month("2024-02").unwrap());

        assert!(!record.covers_month(&parse_month("2024-01").unwrap()));
        assert!(record.covers_month(&parse_month("2024-02").unwrap()));
        assert!(record.covers_month(&parse_month("2030-12").unwrap()));
    }

    #[test]
    fn test_covers_month_bounded() {
        let record = Model::new("Spotify", 5, Uuid::new_v4(), parse_month("2024-01").unwrap())
            .with_end_date(Some(parse_month("2024-03").unwrap()));

        assert!(record.covers_month(&parse_month("2024-01").unwrap()));
        assert!(record.covers_month(&parse_month("2024-03").unwrap()));
        assert!(!record.covers_month(&parse_month("2024-04").unwrap()));
    }
}
