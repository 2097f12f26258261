//! Authorization gate for protected operations

use std::sync::Arc;

use crate::auth::token::{Identity, TokenService};
use crate::error::{ServiceError, ServiceResult};

/// The caller as seen by a single operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    identity: Option<Identity>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

pub struct AccessGate {
    tokens: Arc<TokenService>,
}

impl AccessGate {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }

    /// Turn an optional bearer credential into a caller context
    ///
    /// Absent, blank and invalid credentials all produce an anonymous
    /// context; nothing here fails.
    pub fn resolve(&self, bearer: Option<&str>) -> AuthContext {
        match bearer.map(str::trim).filter(|token| !token.is_empty()) {
            Some(token) => AuthContext {
                identity: self.tokens.verify(token),
            },
            None => AuthContext::anonymous(),
        }
    }

    pub fn require_authenticated<'a>(&self, ctx: &'a AuthContext) -> ServiceResult<&'a Identity> {
        ctx.identity().ok_or(ServiceError::Unauthorized)
    }
}
