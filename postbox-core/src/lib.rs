//! Authenticated addressed messaging with live fanout
//!
//! Users log in for a signed, time-limited credential, send messages to
//! another user by id or email, list stored messages and subscribe to a
//! feed of messages sent after they subscribed.

pub mod auth;
pub mod broker;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod service;
pub mod shutdown;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use auth::{AccessGate, AuthContext, Identity, TokenService, UserDirectory};
pub use broker::{PublishReport, Subscription, SubscriptionBroker, SubscriptionId};
pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use logging::{init_logging, LogLevel};
pub use model::{MessageRecord, UserId};
pub use service::{LoginOutcome, MessagingService, SendMessage};
pub use store::MessageStore;
