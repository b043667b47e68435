//! Resolve request credentials to a cart owner.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use souk_commerce::{AccountId, CommerceError, GuestToken, Owner};

/// Credentials carried by a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Bearer token issued by the identity provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer: Option<String>,
    /// Guest token previously minted for this client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_token: Option<GuestToken>,
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer: Some(token.into()),
            guest_token: None,
        }
    }

    pub fn guest(token: impl Into<String>) -> Self {
        Self {
            bearer: None,
            guest_token: Some(GuestToken::new(token)),
        }
    }

    fn present_guest(&self) -> Option<&GuestToken> {
        self.guest_token.as_ref().filter(|t| !t.is_blank())
    }
}

/// Verifies bearer tokens. Backed by the external identity provider.
#[async_trait]
pub trait BearerVerifier: Send + Sync {
    /// The account a token belongs to, or `None` if it is not valid.
    async fn verify(&self, token: &str) -> Option<AccountId>;
}

/// Accepts no bearer tokens; every request is a guest.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBearers;

#[async_trait]
impl BearerVerifier for NoBearers {
    async fn verify(&self, _token: &str) -> Option<AccountId> {
        None
    }
}

/// A fixed token table, for scripted sessions and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticBearers {
    tokens: HashMap<String, AccountId>,
}

impl StaticBearers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: impl Into<String>, account: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), AccountId::new(account));
        self
    }
}

#[async_trait]
impl BearerVerifier for StaticBearers {
    async fn verify(&self, token: &str) -> Option<AccountId> {
        self.tokens.get(token).cloned()
    }
}

/// Turns credentials into exactly one [`Owner`].
#[derive(Clone)]
pub struct IdentityResolver {
    verifier: Arc<dyn BearerVerifier>,
}

impl IdentityResolver {
    pub fn new(verifier: Arc<dyn BearerVerifier>) -> Self {
        Self { verifier }
    }

    /// A verified bearer wins; otherwise a guest token; otherwise an error.
    ///
    /// A bearer that fails verification is ignored, not rejected.
    pub async fn resolve(&self, credentials: &Credentials) -> Result<Owner, CommerceError> {
        if let Some(account) = self.account(credentials).await {
            return Ok(Owner::Account(account));
        }
        credentials
            .present_guest()
            .cloned()
            .map(Owner::Guest)
            .ok_or(CommerceError::OwnerRequired)
    }

    /// Like [`resolve`](Self::resolve), but mints a guest token when none is
    /// present. The caller must hand the minted token back to the client.
    pub async fn resolve_or_mint(&self, credentials: &Credentials) -> (Owner, Option<GuestToken>) {
        match self.resolve(credentials).await {
            Ok(owner) => (owner, None),
            Err(_) => {
                let token = GuestToken::generate();
                tracing::debug!("minted guest token");
                (Owner::Guest(token.clone()), Some(token))
            }
        }
    }

    /// The verified account, if any.
    pub async fn account(&self, credentials: &Credentials) -> Option<AccountId> {
        let bearer = credentials.bearer.as_deref().map(str::trim)?;
        if bearer.is_empty() {
            return None;
        }
        let account = self.verifier.verify(bearer).await;
        if account.is_none() {
            tracing::debug!("bearer token rejected; falling back to guest identity");
        }
        account
    }
}
