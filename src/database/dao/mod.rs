pub mod subscriptions;

pub use subscriptions::{ListFilter, SubscriptionStore, SubscriptionsDao, SummaryFilter};
