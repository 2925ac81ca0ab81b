use crate::database::entities::SubscriptionRecord;
use crate::database::{DatabaseError, DatabaseResult, ListFilter, SubscriptionStore, SummaryFilter};
use crate::utils::month_range;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{
    Arc, RwLock,
    atomic::{AtomicBool, Ordering},
};
use uuid::Uuid;

/// In-memory subscription store for exercising handlers without a database.
///
/// Mirrors the SQL semantics of `SubscriptionsDao`, including per-month
/// summation and unescaped `%`/`_` wildcards in name filters. Can be switched
/// into a failing mode to test storage error handling.
#[derive(Clone, Default)]
pub struct MockSubscriptionStore {
    records: Arc<RwLock<Vec<SubscriptionRecord>>>,
    failing: Arc<AtomicBool>,
}

impl MockSubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose every operation fails with a database error
    pub fn failing() -> Self {
        let store = Self::default();
        store.set_failing(true);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> DatabaseResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(DatabaseError::Database("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<SubscriptionRecord>> {
        self.records.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<SubscriptionRecord>> {
        self.records.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn matches_filters(
    record: &SubscriptionRecord,
    user_id: Option<Uuid>,
    service_name: Option<&str>,
) -> bool {
    user_id.is_none_or(|id| record.user_id == id)
        && service_name.is_none_or(|pattern| {
            like_match(
                &record.service_name.to_lowercase(),
                &format!("%{}%", pattern.to_lowercase()),
            )
        })
}

/// SQL `LIKE` matching where `%` is any run of characters and `_` any single
/// character.
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // matched[j] == text[..i] matches pattern[..j]
    let mut matched = vec![false; pattern.len() + 1];
    matched[0] = true;
    for j in 1..=pattern.len() {
        matched[j] = matched[j - 1] && pattern[j - 1] == '%';
    }

    for c in &text {
        let mut next = vec![false; pattern.len() + 1];
        for j in 1..=pattern.len() {
            next[j] = match pattern[j - 1] {
                '%' => next[j - 1] || matched[j],
                '_' => matched[j - 1],
                p => matched[j - 1] && p == *c,
            };
        }
        matched = next;
    }

    matched[pattern.len()]
}

#[async_trait]
impl SubscriptionStore for MockSubscriptionStore {
    async fn create(
        &self,
        subscription: &SubscriptionRecord,
    ) -> DatabaseResult<SubscriptionRecord> {
        self.check()?;

        let now = Utc::now();
        let record = SubscriptionRecord {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            ..subscription.clone()
        };
        self.write().push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> DatabaseResult<SubscriptionRecord> {
        self.check()?;

        self.read()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(DatabaseError::NotFound)
    }

    async fn update(&self, subscription: &SubscriptionRecord) -> DatabaseResult<()> {
        self.check()?;

        if let Some(record) = self.write().iter_mut().find(|r| r.id == subscription.id) {
            record.service_name = subscription.service_name.clone();
            record.price = subscription.price;
            record.user_id = subscription.user_id;
            record.start_date = subscription.start_date;
            record.end_date = subscription.end_date;
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<()> {
        self.check()?;

        self.write().retain(|r| r.id != id);
        Ok(())
    }

    async fn list(&self, filter: &ListFilter) -> DatabaseResult<Vec<SubscriptionRecord>> {
        self.check()?;

        let mut records: Vec<SubscriptionRecord> = self
            .read()
            .iter()
            .filter(|r| matches_filters(r, filter.user_id, filter.service_name.as_deref()))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(records
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn summary(&self, filter: &SummaryFilter) -> DatabaseResult<i64> {
        self.check()?;

        let records = self.read();
        let total = month_range(&filter.start, &filter.end)
            .iter()
            .flat_map(|month| {
                records.iter().filter(move |r| {
                    r.covers_month(month)
                        && matches_filters(r, filter.user_id, filter.service_name.as_deref())
                })
            })
            .map(|r| i64::from(r.price))
            .sum();

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_month;

    #[test]
    fn test_like_match() {
        assert!(like_match("netflix", "%flix%"));
        assert!(like_match("netflix", "%%"));
        assert!(like_match("netflix", "net_lix"));
        assert!(!like_match("netflix", "%hulu%"));
        assert!(!like_match("net", "net_"));
        assert!(like_match("", "%"));
    }

    #[tokio::test]
    async fn test_failing_store() {
        let store = MockSubscriptionStore::failing();
        assert!(matches!(
            store.get(Uuid::new_v4()).await,
            Err(DatabaseError::Database(_))
        ));

        store.set_failing(false);
        assert!(matches!(
            store.get(Uuid::new_v4()).await,
            Err(DatabaseError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_summary_matches_sql_semantics() {
        let store = MockSubscriptionStore::new();
        let user_id = Uuid::new_v4();
        let start = parse_month("2024-01").unwrap();
        let end = parse_month("2024-03").unwrap();

        store
            .create(&SubscriptionRecord::new("Open", 10, user_id, parse_month("2024-02").unwrap()))
            .await
            .unwrap();
        store
            .create(
                &SubscriptionRecord::new("Long", 5, user_id, parse_month("2023-01").unwrap())
                    .with_end_date(Some(parse_month("2024-12").unwrap())),
            )
            .await
            .unwrap();

        let filter = SummaryFilter {
            start,
            end,
            user_id: None,
            service_name: None,
        };
        assert_eq!(store.summary(&filter).await.unwrap(), 35);
    }
}
