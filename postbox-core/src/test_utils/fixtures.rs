//! Fixtures: seeded users, configs and services

use std::sync::Arc;
use std::time::Duration;

use argon2::Params;

use crate::auth::{hash_password_with_params, InMemoryUserDirectory, TokenService};
use crate::broker::SubscriptionBroker;
use crate::config::{Config, UserSeed};
use crate::model::{MessageRecord, UserId};
use crate::service::MessagingService;

pub const USER_A: &str = "a@x.com";
pub const USER_B: &str = "b@x.com";
pub const USER_A_ID: &str = "u-a";
pub const USER_B_ID: &str = "u-b";
pub const TEST_PASSWORD: &str = "pw";
pub const TEST_SECRET: &str = "test-signing-secret";

/// Argon2id hash with minimal cost so tests stay fast
pub fn cheap_hash(password: &str) -> String {
    let params = Params::new(1024, 1, 1, None).expect("valid argon2 params");
    hash_password_with_params(password, params).expect("hashing succeeds")
}

/// Seeds for `a@x.com` and `b@x.com`, both with password `pw`
pub fn test_seeds() -> Vec<UserSeed> {
    vec![
        UserSeed {
            user_id: Some(USER_A_ID.to_string()),
            email: USER_A.to_string(),
            password_hash: cheap_hash(TEST_PASSWORD),
        },
        UserSeed {
            user_id: Some(USER_B_ID.to_string()),
            email: USER_B.to_string(),
            password_hash: cheap_hash(TEST_PASSWORD),
        },
    ]
}

/// A config that passes validation, with the two test users seeded
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = TEST_SECRET.to_string();
    config.users = test_seeds();
    config
}

pub fn test_tokens() -> TokenService {
    TokenService::new(TEST_SECRET, "postbox", Duration::from_secs(3600))
        .expect("test secret is non-empty")
}

/// Service wired with the test users and a small broker buffer
pub fn test_service() -> MessagingService {
    test_service_with_buffer(16)
}

pub fn test_service_with_buffer(buffer: usize) -> MessagingService {
    let directory = InMemoryUserDirectory::from_seeds(&test_seeds()).expect("seeds are valid");
    MessagingService::new(
        Arc::new(directory),
        Arc::new(test_tokens()),
        SubscriptionBroker::new(buffer),
    )
}

/// A record from user A to user B
pub fn sample_record(text: &str) -> MessageRecord {
    MessageRecord {
        message: text.to_string(),
        sender_id: UserId::new(USER_A_ID),
        sender_email: USER_A.to_string(),
        receiver_id: Some(UserId::new(USER_B_ID)),
        receiver_email: None,
    }
}
