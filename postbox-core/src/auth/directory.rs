//! User directory: email lookup and password comparison
//!
//! The directory is an external collaborator of the messaging core; the core
//! only ever reads from it. [`InMemoryUserDirectory`] backs it with argon2
//! PHC hashes loaded from configuration.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::UserSeed;
use crate::model::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("Invalid password hash: {0}")]
    InvalidHash(String),

    #[error("Duplicate user email: {0}")]
    DuplicateEmail(String),

    #[error("Directory backend failure: {0}")]
    Backend(String),
}

/// A directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    #[serde(rename = "userID")]
    pub user_id: UserId,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Return the user only if `email` exists and `password` matches its hash
    ///
    /// `Ok(None)` covers both "no such user" and "wrong password" so callers
    /// cannot distinguish the two.
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, DirectoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DirectoryError>;
}

/// Hash `password` into an argon2id PHC string with default parameters
pub fn hash_password(password: &str) -> Result<String, DirectoryError> {
    hash_with(&Argon2::default(), password)
}

/// Hash with explicit cost parameters (cheap ones keep test suites fast)
pub fn hash_password_with_params(password: &str, params: Params) -> Result<String, DirectoryError> {
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);
    hash_with(&argon2, password)
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String, DirectoryError> {
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DirectoryError::InvalidHash(e.to_string()))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Directory held entirely in memory, keyed by normalized email
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from configuration seeds
    pub fn from_seeds(seeds: &[UserSeed]) -> Result<Self, DirectoryError> {
        let mut users = HashMap::with_capacity(seeds.len());
        for seed in seeds {
            let record = Self::record_from_seed(seed)?;
            let key = normalize_email(&record.email);
            if users.insert(key, record).is_some() {
                return Err(DirectoryError::DuplicateEmail(seed.email.clone()));
            }
        }
        Ok(Self {
            users: RwLock::new(users),
        })
    }

    fn record_from_seed(seed: &UserSeed) -> Result<UserRecord, DirectoryError> {
        PasswordHash::new(&seed.password_hash)
            .map_err(|e| DirectoryError::InvalidHash(format!("{}: {}", seed.email, e)))?;

        let user_id = seed
            .user_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(UserRecord {
            user_id: UserId(user_id),
            email: seed.email.trim().to_string(),
            password_hash: seed.password_hash.clone(),
        })
    }

    /// Add a user; fails if the email is already taken
    pub async fn insert(&self, seed: &UserSeed) -> Result<UserRecord, DirectoryError> {
        let record = Self::record_from_seed(seed)?;
        let mut users = self.users.write().await;
        let key = normalize_email(&record.email);
        if users.contains_key(&key) {
            return Err(DirectoryError::DuplicateEmail(seed.email.clone()));
        }
        users.insert(key, record.clone());
        Ok(record)
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        let Some(record) = self.find_by_email(email).await? else {
            return Ok(None);
        };

        let parsed_hash = PasswordHash::new(&record.password_hash)
            .map_err(|e| DirectoryError::InvalidHash(e.to_string()))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(Some(record)),
            Err(_) => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self.users.read().await.get(&normalize_email(email)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_hash(password: &str) -> String {
        hash_password_with_params(password, Params::new(1024, 1, 1, None).unwrap()).unwrap()
    }

    fn seed(email: &str, password: &str) -> UserSeed {
        UserSeed {
            user_id: None,
            email: email.to_string(),
            password_hash: cheap_hash(password),
        }
    }

    #[tokio::test]
    async fn test_authenticate_matches_password() {
        let directory = InMemoryUserDirectory::from_seeds(&[seed("a@x.com", "pw")]).unwrap();

        let user = directory.authenticate("a@x.com", "pw").await.unwrap();
        assert_eq!(user.map(|u| u.email), Some("a@x.com".to_string()));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let directory = InMemoryUserDirectory::from_seeds(&[seed("a@x.com", "pw")]).unwrap();

        assert_eq!(directory.authenticate("a@x.com", "nope").await, Ok(None));
        assert_eq!(directory.authenticate("z@x.com", "pw").await, Ok(None));
    }

    #[tokio::test]
    async fn test_email_lookup_is_normalized() {
        let directory = InMemoryUserDirectory::from_seeds(&[seed("A@X.com", "pw")]).unwrap();

        assert!(directory.find_by_email(" a@x.COM ").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_seed_user_id_is_kept_or_generated() {
        let mut with_id = seed("a@x.com", "pw");
        with_id.user_id = Some("u-a".to_string());
        let directory =
            InMemoryUserDirectory::from_seeds(&[with_id, seed("b@x.com", "pw")]).unwrap();

        let a = directory.find_by_email("a@x.com").await.unwrap().unwrap();
        let b = directory.find_by_email("b@x.com").await.unwrap().unwrap();
        assert_eq!(a.user_id, UserId::new("u-a"));
        assert!(Uuid::parse_str(b.user_id.as_str()).is_ok());
    }

    #[tokio::test]
    async fn test_duplicates_are_rejected() {
        let result =
            InMemoryUserDirectory::from_seeds(&[seed("a@x.com", "1"), seed("a@x.com", "2")]);
        assert!(matches!(result, Err(DirectoryError::DuplicateEmail(_))));

        let directory = InMemoryUserDirectory::new();
        directory.insert(&seed("a@x.com", "1")).await.unwrap();
        assert!(directory.insert(&seed("A@x.com", "2")).await.is_err());
        assert_eq!(directory.len().await, 1);
    }

    #[test]
    fn test_bad_hash_is_rejected() {
        let bad = UserSeed {
            user_id: None,
            email: "a@x.com".to_string(),
            password_hash: "hunter2".to_string(),
        };
        assert!(matches!(
            InMemoryUserDirectory::from_seeds(&[bad]),
            Err(DirectoryError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let record = UserRecord {
            user_id: UserId::new("u-a"),
            email: "a@x.com".to_string(),
            password_hash: cheap_hash("pw"),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"userID": "u-a", "email": "a@x.com"}));
    }
}
