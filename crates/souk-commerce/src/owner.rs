//! Cart ownership.
//!
//! Every cart belongs to exactly one owner: a signed-in account, or an
//! anonymous guest identified by an opaque token the client keeps.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::AccountId;

/// An opaque guest token.
///
/// Tokens only scope a guest cart. They carry no authentication weight and
/// are never reused once minted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestToken(String);

impl GuestToken {
    /// Wrap a token received from a client.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Mint a fresh high-entropy token.
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::Rng;

        let bytes: [u8; 18] = rand::thread_rng().gen();
        Self(format!("guest_{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Blank tokens are treated as absent.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for GuestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GuestToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GuestToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The owner of a cart or an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Owner {
    /// A signed-in account.
    Account(AccountId),
    /// An anonymous shopper.
    Guest(GuestToken),
}

impl Owner {
    pub fn account(id: impl Into<String>) -> Self {
        Owner::Account(AccountId::new(id))
    }

    pub fn guest(token: impl Into<String>) -> Self {
        Owner::Guest(GuestToken::new(token))
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Owner::Guest(_))
    }

    pub fn account_id(&self) -> Option<&AccountId> {
        match self {
            Owner::Account(id) => Some(id),
            Owner::Guest(_) => None,
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Account(id) => write!(f, "account:{}", id),
            Owner::Guest(token) => write!(f, "guest:{}", token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_token_generation() {
        let a = GuestToken::generate();
        let b = GuestToken::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("guest_"));
        // 18 bytes encode to 24 base64 characters without padding
        assert_eq!(a.as_str().len(), "guest_".len() + 24);
    }

    #[test]
    fn test_owner_variants_never_collide() {
        let account = Owner::account("tok1");
        let guest = Owner::guest("tok1");
        assert_ne!(account, guest);
        assert_ne!(account.to_string(), guest.to_string());
    }

    #[test]
    fn test_owner_serialization() {
        let owner = Owner::account("5");
        let json = serde_json::to_value(&owner).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "account", "id": "5"}));

        let guest: Owner =
            serde_json::from_value(serde_json::json!({"kind": "guest", "id": "tok1"})).unwrap();
        assert_eq!(guest, Owner::guest("tok1"));
        assert!(guest.is_guest());
        assert!(guest.account_id().is_none());
    }

    #[test]
    fn test_blank_token() {
        assert!(GuestToken::new("  ").is_blank());
        assert!(!GuestToken::new("abc").is_blank());
    }
}
