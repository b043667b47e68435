//! Discount code validation.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use souk_commerce::discount::{DiscountCode, DiscountStacking};
use souk_commerce::{CommerceError, Money};
use souk_store::Store;

/// A priced discount for a given subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountQuote {
    pub code: DiscountCode,
    pub subtotal: Money,
    pub discount_amount: Money,
}

/// Validates codes against the live discount record. Never writes.
pub struct DiscountValidator<S> {
    store: Arc<S>,
    stacking: DiscountStacking,
}

impl<S> Clone for DiscountValidator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            stacking: self.stacking,
        }
    }
}

impl<S: Store> DiscountValidator<S> {
    pub fn new(store: Arc<S>, stacking: DiscountStacking) -> Self {
        Self { store, stacking }
    }

    pub fn stacking(&self) -> DiscountStacking {
        self.stacking
    }

    /// Price `code` against `subtotal`. Lookup is case-insensitive.
    pub async fn validate(&self, code: &str, subtotal: Money) -> Result<DiscountQuote, CommerceError> {
        let code = DiscountCode::new(code);
        if code.is_blank() {
            return Err(CommerceError::DiscountNotFound(code.to_string()));
        }

        let discount = self
            .store
            .discount(&code)
            .await?
            .ok_or_else(|| CommerceError::DiscountNotFound(code.to_string()))?;

        let discount_amount = discount
            .evaluate(subtotal, Utc::now(), self.stacking)
            .inspect_err(|e| tracing::debug!(code = %code, error = %e, "discount rejected"))?;

        Ok(DiscountQuote {
            code,
            subtotal,
            discount_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use souk_commerce::discount::{Discount, DiscountRejection};
    use souk_commerce::Percentage;
    use souk_store::MemoryStore;

    async fn validator(stacking: DiscountStacking) -> (Arc<MemoryStore>, DiscountValidator<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_discount(Discount::percentage("PROMO20", Percentage::percent(20)))
            .await
            .unwrap();
        store
            .upsert_discount(
                Discount::percentage("COMBO", Percentage::percent(10))
                    .with_amount_off(Money::new(300))
                    .with_min_purchase(Money::new(1000)),
            )
            .await
            .unwrap();
        let v = DiscountValidator::new(Arc::clone(&store), stacking);
        (store, v)
    }

    #[tokio::test]
    async fn test_case_insensitive_lookup() {
        let (_, v) = validator(DiscountStacking::Additive).await;
        let quote = v.validate(" promo20 ", Money::new(4000)).await.unwrap();
        assert_eq!(quote.code.as_str(), "PROMO20");
        assert_eq!(quote.discount_amount, Money::new(800));
    }

    #[tokio::test]
    async fn test_unknown_and_blank_codes() {
        let (_, v) = validator(DiscountStacking::Additive).await;
        assert!(matches!(
            v.validate("NOPE", Money::new(100)).await,
            Err(CommerceError::DiscountNotFound(_))
        ));
        assert!(matches!(
            v.validate("  ", Money::new(100)).await,
            Err(CommerceError::DiscountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_minimum_not_met() {
        let (_, v) = validator(DiscountStacking::Additive).await;
        let err = v.validate("combo", Money::new(999)).await.unwrap_err();
        assert_eq!(
            err,
            CommerceError::DiscountRejected(DiscountRejection::MinimumNotMet {
                minimum: Money::new(1000)
            })
        );
    }

    #[tokio::test]
    async fn test_stacking_policies() {
        let (_, additive) = validator(DiscountStacking::Additive).await;
        let (_, greatest) = validator(DiscountStacking::Greatest).await;

        let a = additive.validate("COMBO", Money::new(5000)).await.unwrap();
        let g = greatest.validate("COMBO", Money::new(5000)).await.unwrap();
        assert_eq!(a.discount_amount, Money::new(800));
        assert_eq!(g.discount_amount, Money::new(500));
    }

    #[tokio::test]
    async fn test_validation_is_pure() {
        let (store, v) = validator(DiscountStacking::Additive).await;
        for _ in 0..5 {
            let quote = v.validate("PROMO20", Money::new(4000)).await.unwrap();
            assert_eq!(quote.discount_amount, Money::new(800));
        }
        let d = store.discount(&DiscountCode::new("PROMO20")).await.unwrap().unwrap();
        assert_eq!(d.used_count, 0);
    }
}
