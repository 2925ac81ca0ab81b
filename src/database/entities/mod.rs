pub mod subscriptions;

pub use subscriptions::Entity as Subscriptions;

pub type SubscriptionRecord = subscriptions::Model;
