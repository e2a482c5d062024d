pub mod connection;
pub mod dispatcher;

pub use connection::SubscriptionPolicy;
pub use dispatcher::{ConversationSubscription, Dispatcher, SubscriptionClosed};
