//! The messaging operations exposed to transports
//!
//! [`MessagingService`] owns the store and broker and borrows the user
//! directory and token service. Every protected operation passes through the
//! [`AccessGate`] before any state is touched.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{
    AccessGate, AuthContext, InMemoryUserDirectory, TokenService, UserDirectory, UserRecord,
};
use crate::broker::{Subscription, SubscriptionBroker};
use crate::config::Config;
use crate::error::{ServiceError, ServiceResult};
use crate::health::{ComponentHealth, HealthReport};
use crate::metrics::{self as postbox_metrics, LOGIN_FAILURE, LOGIN_SUCCESS, MESSAGES_SENT};
use crate::model::{MessageRecord, UserId};
use crate::store::MessageStore;

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserRecord,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Input of [`MessagingService::send_message`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessage {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "receiverID", default)]
    pub receiver_id: Option<UserId>,
    #[serde(rename = "receiverEmail", default)]
    pub receiver_email: Option<String>,
}

impl SendMessage {
    pub fn to_email(message: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            receiver_id: None,
            receiver_email: Some(email.into()),
        }
    }

    pub fn to_user(message: impl Into<String>, user_id: impl Into<UserId>) -> Self {
        Self {
            message: message.into(),
            receiver_id: Some(user_id.into()),
            receiver_email: None,
        }
    }
}

pub struct MessagingService {
    directory: Arc<dyn UserDirectory>,
    tokens: Arc<TokenService>,
    gate: AccessGate,
    store: MessageStore,
    broker: SubscriptionBroker,
    started: Instant,
}

impl MessagingService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        tokens: Arc<TokenService>,
        broker: SubscriptionBroker,
    ) -> Self {
        Self {
            directory,
            gate: AccessGate::new(tokens.clone()),
            tokens,
            store: MessageStore::new(),
            broker,
            started: Instant::now(),
        }
    }

    /// Wire the default in-memory directory, token service and broker from `config`
    pub fn from_config(config: &Config) -> ServiceResult<Self> {
        let directory = InMemoryUserDirectory::from_seeds(&config.users)?;
        let tokens = TokenService::from_config(&config.auth)?;
        let broker = SubscriptionBroker::from_config(&config.broker);

        info!(
            users = config.users.len(),
            buffer = broker.buffer(),
            "Messaging service initialized"
        );
        Ok(Self::new(Arc::new(directory), Arc::new(tokens), broker))
    }

    pub fn broker(&self) -> &SubscriptionBroker {
        &self.broker
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Resolve a bearer credential; never fails
    pub fn authenticate(&self, bearer: Option<&str>) -> AuthContext {
        self.gate.resolve(bearer)
    }

    /// Exchange email and password for a credential
    ///
    /// Unknown email, wrong password and empty input are indistinguishable
    /// to the caller.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<LoginOutcome> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            postbox_metrics::record_counter(LOGIN_FAILURE, 1);
            return Err(ServiceError::InvalidCredentials);
        }

        let Some(user) = self.directory.authenticate(email, password).await? else {
            warn!(email = %email, "Login rejected");
            postbox_metrics::record_counter(LOGIN_FAILURE, 1);
            return Err(ServiceError::InvalidCredentials);
        };

        let issued = self.tokens.issue(&user.user_id, &user.email)?;
        info!(user_id = %user.user_id, "Login succeeded");
        postbox_metrics::record_counter(LOGIN_SUCCESS, 1);

        Ok(LoginOutcome {
            user,
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    /// Every stored record; open to anonymous callers
    pub async fn messages(&self) -> Vec<MessageRecord> {
        self.store.all_messages().await
    }

    pub async fn protected_messages(&self, ctx: &AuthContext) -> ServiceResult<Vec<MessageRecord>> {
        self.gate.require_authenticated(ctx)?;
        Ok(self.store.all_messages().await)
    }

    /// Store a message from the caller, then broadcast it to live subscribers
    pub async fn send_message(
        &self,
        ctx: &AuthContext,
        input: SendMessage,
    ) -> ServiceResult<MessageRecord> {
        let sender = self.gate.require_authenticated(ctx)?;

        let receiver_id = input.receiver_id.filter(|id| !id.as_str().is_empty());
        let receiver_email = input.receiver_email.filter(|email| !email.is_empty());
        if receiver_id.is_none() && receiver_email.is_none() {
            return Err(ServiceError::MissingReceiver);
        }
        if input.message.is_empty() {
            return Err(ServiceError::EmptyMessage);
        }

        let record = MessageRecord {
            message: input.message,
            sender_id: sender.user_id.clone(),
            sender_email: sender.email.clone(),
            receiver_id,
            receiver_email,
        };

        self.store.append(record.clone()).await;
        let report = self.broker.publish(&record);
        postbox_metrics::record_counter(MESSAGES_SENT, 1);

        info!(
            sender = %record.sender_id,
            delivered = report.delivered,
            disconnected = report.disconnected,
            "Message stored"
        );
        Ok(record)
    }

    /// Live feed of messages sent after this call; no backlog
    pub fn subscribe_new_messages(&self) -> Subscription {
        self.broker.subscribe()
    }

    pub async fn health(&self) -> HealthReport {
        let stored = self.store.len().await;
        let subscribers = self.broker.subscriber_count();
        let overflowed = self.broker.overflow_disconnects();

        let broker = if overflowed > 0 {
            ComponentHealth::degraded(
                "broker",
                format!("{subscribers} subscribers, {overflowed} disconnected on overflow"),
            )
        } else {
            ComponentHealth::healthy("broker").with_message(format!("{subscribers} subscribers"))
        };

        HealthReport::from_components(
            vec![
                ComponentHealth::healthy("store").with_message(format!("{stored} messages")),
                broker,
            ],
            self.started,
        )
    }
}
