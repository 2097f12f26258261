//! Shared setup for integration tests
//!
//! Built only on the public API: integration tests link the library without
//! `cfg(test)`, so the in-crate `test_utils` fixtures are not visible here.

use std::sync::Arc;
use std::time::Duration;

use argon2::Params;
use postbox_core::auth::{hash_password_with_params, InMemoryUserDirectory};
use postbox_core::config::UserSeed;
use postbox_core::{MessagingService, SubscriptionBroker, TokenService};

pub const PASSWORD: &str = "pw";

pub fn seed(user_id: &str, email: &str) -> UserSeed {
    let params = Params::new(1024, 1, 1, None).unwrap();
    UserSeed {
        user_id: Some(user_id.to_string()),
        email: email.to_string(),
        password_hash: hash_password_with_params(PASSWORD, params).unwrap(),
    }
}

pub fn service(buffer: usize) -> MessagingService {
    let directory =
        InMemoryUserDirectory::from_seeds(&[seed("u-a", "a@x.com"), seed("u-b", "b@x.com")])
            .unwrap();
    let tokens =
        TokenService::new("integration-secret", "postbox", Duration::from_secs(3600)).unwrap();
    MessagingService::new(
        Arc::new(directory),
        Arc::new(tokens),
        SubscriptionBroker::new(buffer),
    )
}
