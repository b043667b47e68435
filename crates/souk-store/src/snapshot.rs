//! Serializable store contents, used to seed and inspect a [`MemoryStore`].
//!
//! [`MemoryStore`]: crate::MemoryStore

use serde::{Deserialize, Serialize};
use souk_commerce::discount::Discount;
use souk_commerce::order::Order;
use souk_commerce::{Cart, Product};

use crate::error::StoreResult;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub discounts: Vec<Discount>,
    #[serde(default)]
    pub carts: Vec<Cart>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl StoreSnapshot {
    pub fn from_json(json: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use crate::Store;
    use souk_commerce::discount::DiscountCode;
    use souk_commerce::{Money, Percentage, ProductId};

    const SEED: &str = r#"{
        "products": [
            {"id": "kaftan", "name": "Kaftan", "price": 2000, "stock": 3,
             "sizes": ["S", "M"]},
            {"id": "mug", "name": "Mug", "price": 500, "stock": 10, "is_active": false}
        ],
        "discounts": [
            {"code": "promo20", "percent_off": 20, "max_uses": 10}
        ]
    }"#;

    #[test]
    fn test_parse_seed() {
        let snapshot = StoreSnapshot::from_json(SEED).unwrap();
        assert_eq!(snapshot.products.len(), 2);
        assert!(snapshot.products[0].is_active);
        assert!(!snapshot.products[1].is_active);
        assert_eq!(snapshot.products[0].price, Money::new(2000));

        let discount = &snapshot.discounts[0];
        assert_eq!(discount.code, DiscountCode::new("PROMO20"));
        assert_eq!(discount.percent_off, Percentage::percent(20));
        assert!(discount.is_active);
        assert_eq!(discount.used_count, 0);
    }

    #[tokio::test]
    async fn test_seed_store() {
        let store = MemoryStore::from_snapshot(StoreSnapshot::from_json(SEED).unwrap());
        let kaftan = store.product(&ProductId::new("kaftan")).await.unwrap().unwrap();
        assert_eq!(kaftan.stock, 3);
        assert!(store
            .discount(&DiscountCode::new("Promo20"))
            .await
            .unwrap()
            .is_some());

        let out = store.snapshot().await;
        assert_eq!(out.products.len(), 2);
        let reparsed = StoreSnapshot::from_json(&out.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, out);
    }
}
