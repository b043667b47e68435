//! End-to-end storefront scenarios against the in-memory store.

use std::sync::Arc;

use serde_json::json;
use souk_checkout::{
    ChannelNotifier, CheckoutRequest, Credentials, Envelope, StaticBearers, Storefront,
    StorefrontConfig, WireRequest,
};
use souk_commerce::discount::{Discount, DiscountCode, DiscountRejection};
use souk_commerce::order::{Fulfillment, OrderStatus, PaymentReference};
use souk_commerce::{
    AccountId, CommerceError, ErrorKind, GuestToken, LineOptions, Money, Owner, Percentage,
    Product, ProductId,
};
use souk_store::{MemoryStore, Store};

async fn shop(stock: i64) -> (Arc<MemoryStore>, Storefront<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_product(Product::new(ProductId::new("a"), "Kaftan", Money::new(2000), stock))
        .await
        .unwrap();
    store
        .upsert_discount(Discount::percentage("PROMO20", Percentage::percent(20)))
        .await
        .unwrap();
    let shop = Storefront::new(Arc::clone(&store), &StorefrontConfig::default())
        .with_verifier(Arc::new(StaticBearers::new().with("bearer-5", "5")));
    (store, shop)
}

fn request(code: Option<&str>) -> CheckoutRequest {
    CheckoutRequest {
        fulfillment: Fulfillment {
            full_name: "Amina B".into(),
            email: "amina@example.dz".into(),
            shipping_address: "12 Rue Didouche, Alger".into(),
        },
        payment: PaymentReference {
            phone: "0550000000".into(),
            reference: "BM-991".into(),
        },
        discount_code: code.map(String::from),
        idempotency_key: None,
    }
}

async fn stock_of(store: &MemoryStore, id: &str) -> i64 {
    store.product(&ProductId::new(id)).await.unwrap().unwrap().stock
}

#[tokio::test]
async fn test_promo_scenario() {
    let (store, shop) = shop(5).await;
    let owner = Owner::account("5");
    shop.carts()
        .add(&owner, &ProductId::new("a"), 2, LineOptions::none())
        .await
        .unwrap();

    let quote = shop
        .discounts()
        .validate("PROMO20", shop.carts().subtotal(&owner).await.unwrap())
        .await
        .unwrap();
    assert_eq!(quote.discount_amount, Money::new(800));

    let order = shop
        .checkout()
        .checkout(&owner, request(Some("PROMO20")))
        .await
        .unwrap();
    assert_eq!(order.subtotal, Money::new(4000));
    assert_eq!(order.discount_amount, quote.discount_amount);
    assert_eq!(order.total, Money::new(3200));
    assert_eq!(order.total, order.subtotal.subtract_floor_zero(order.discount_amount));

    assert_eq!(stock_of(&store, "a").await, 3);
    assert!(shop.carts().list(&owner).await.unwrap().lines.is_empty());
    assert_eq!(shop.ledger().orders_for(&owner).await.unwrap().len(), 1);
    assert_eq!(
        shop.ledger().order(&order.order_number).await.unwrap().status,
        OrderStatus::Pending
    );
}

#[tokio::test]
async fn test_add_beyond_stock_keeps_quantity() {
    let (_, shop) = shop(3).await;
    let owner = Owner::guest("tok1");
    let a = ProductId::new("a");
    shop.carts().add(&owner, &a, 2, LineOptions::none()).await.unwrap();

    let err = shop.carts().add(&owner, &a, 2, LineOptions::none()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfStock);
    assert_eq!(shop.carts().list(&owner).await.unwrap().item_count, 2);
}

#[tokio::test]
async fn test_guest_cart_merges_on_login() {
    let (store, shop) = shop(5).await;
    let guest = GuestToken::new("tok1");
    let a = ProductId::new("a");
    shop.carts()
        .add(&Owner::Guest(guest.clone()), &a, 1, LineOptions::none())
        .await
        .unwrap();
    shop.carts()
        .add(&Owner::account("5"), &a, 1, LineOptions::none())
        .await
        .unwrap();

    let cart = shop.login(Some(&guest), AccountId::new("5")).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);
    assert!(store.cart(&Owner::Guest(guest)).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_unit_sells_once() {
    let (store, shop) = shop(1).await;
    let shop = Arc::new(shop);
    let a = ProductId::new("a");
    let buyers = [Owner::account("5"), Owner::guest("tok1")];
    for buyer in &buyers {
        shop.carts().add(buyer, &a, 1, LineOptions::none()).await.unwrap();
    }

    let mut handles = Vec::new();
    for buyer in buyers.clone() {
        let shop = Arc::clone(&shop);
        handles.push(tokio::spawn(async move {
            shop.checkout().checkout(&buyer, request(None)).await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(e) => assert!(matches!(e, CommerceError::OutOfStock { .. })),
        }
    }
    assert_eq!(placed, 1);
    assert_eq!(stock_of(&store, "a").await, 0);
    assert_eq!(store.orders().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_owner_checks_out_once() {
    let (store, shop) = shop(10).await;
    let shop = Arc::new(shop);
    let owner = Owner::account("5");
    shop.carts()
        .add(&owner, &ProductId::new("a"), 1, LineOptions::none())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let shop = Arc::clone(&shop);
        let owner = owner.clone();
        handles.push(tokio::spawn(async move {
            shop.checkout().checkout(&owner, request(None)).await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(e) => assert_eq!(e, CommerceError::EmptyCart),
        }
    }
    assert_eq!(placed, 1);
    assert_eq!(stock_of(&store, "a").await, 9);
    assert_eq!(store.orders().await.unwrap().len(), 1);
    assert!(shop.carts().list(&owner).await.unwrap().lines.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_discount_use_claimed_once() {
    let (store, shop) = shop(10).await;
    store
        .upsert_discount(Discount::percentage("ONCE", Percentage::percent(10)).with_max_uses(1))
        .await
        .unwrap();
    let shop = Arc::new(shop);
    let buyers = [Owner::account("5"), Owner::guest("tok1")];
    for buyer in &buyers {
        shop.carts()
            .add(buyer, &ProductId::new("a"), 1, LineOptions::none())
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for buyer in buyers.clone() {
        let shop = Arc::clone(&shop);
        handles.push(tokio::spawn(async move {
            shop.checkout().checkout(&buyer, request(Some("ONCE"))).await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(e) => assert_eq!(
                e,
                CommerceError::DiscountRejected(DiscountRejection::UsageExceeded)
            ),
        }
    }
    assert_eq!(placed, 1);
    let once = store.discount(&DiscountCode::new("ONCE")).await.unwrap().unwrap();
    assert_eq!(once.used_count, 1);
    assert_eq!(stock_of(&store, "a").await, 9);
}

#[tokio::test]
async fn test_failed_checkout_changes_nothing() {
    let (store, shop) = shop(5).await;
    store
        .upsert_discount(
            Discount::percentage("EXPIRED", Percentage::percent(50))
                .with_window(None, Some(chrono::Utc::now() - chrono::Duration::days(1))),
        )
        .await
        .unwrap();
    let owner = Owner::account("5");
    shop.carts()
        .add(&owner, &ProductId::new("a"), 2, LineOptions::none())
        .await
        .unwrap();

    let err = shop
        .checkout()
        .checkout(&owner, request(Some("EXPIRED")))
        .await
        .unwrap_err();
    assert_eq!(err, CommerceError::DiscountRejected(DiscountRejection::Expired));

    assert_eq!(stock_of(&store, "a").await, 5);
    assert_eq!(shop.carts().list(&owner).await.unwrap().item_count, 2);
    let expired = store.discount(&DiscountCode::new("EXPIRED")).await.unwrap().unwrap();
    assert_eq!(expired.used_count, 0);
    assert!(store.orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_percent_off_reads_as_whole_percent() {
    let store = Arc::new(MemoryStore::new());
    let discount: Discount =
        serde_json::from_value(json!({"code": "PROMO20", "percent_off": 20})).unwrap();
    store.upsert_discount(discount).await.unwrap();
    let shop = Storefront::new(store, &StorefrontConfig::default());

    let quote = shop.discounts().validate("promo20", Money::new(4000)).await.unwrap();
    assert_eq!(quote.discount_amount, Money::new(800));
}

#[tokio::test]
async fn test_discount_never_exceeds_subtotal() {
    let (store, shop) = shop(5).await;
    store
        .upsert_discount(Discount::fixed_amount("BIG", Money::new(10_000)))
        .await
        .unwrap();
    let owner = Owner::account("5");
    shop.carts()
        .add(&owner, &ProductId::new("a"), 1, LineOptions::none())
        .await
        .unwrap();

    let order = shop
        .checkout()
        .checkout(&owner, request(Some("big")))
        .await
        .unwrap();
    assert_eq!(order.discount_amount, Money::new(2000));
    assert_eq!(order.total, Money::zero());
}

#[tokio::test]
async fn test_price_edit_between_read_and_checkout_uses_live_price() {
    let (store, shop) = shop(5).await;
    let owner = Owner::account("5");
    shop.carts()
        .add(&owner, &ProductId::new("a"), 1, LineOptions::none())
        .await
        .unwrap();

    let mut a = store.product(&ProductId::new("a")).await.unwrap().unwrap();
    a.price = Money::new(2500);
    store.upsert_product(a).await.unwrap();

    let order = shop.checkout().checkout(&owner, request(None)).await.unwrap();
    assert_eq!(order.items[0].unit_price, Money::new(2500));
    assert_eq!(order.total, Money::new(2500));
}

#[tokio::test]
async fn test_order_status_lifecycle() {
    let (_, shop) = shop(5).await;
    let owner = Owner::account("5");
    shop.carts()
        .add(&owner, &ProductId::new("a"), 1, LineOptions::none())
        .await
        .unwrap();
    let order = shop.checkout().checkout(&owner, request(None)).await.unwrap();

    for next in [OrderStatus::Paid, OrderStatus::Shipped, OrderStatus::Delivered] {
        let updated = shop.admin().set_order_status(&order.order_number, next).await.unwrap();
        assert_eq!(updated.status, next);
    }
    for next in [OrderStatus::Pending, OrderStatus::Cancelled, OrderStatus::Paid] {
        assert!(shop
            .admin()
            .set_order_status(&order.order_number, next)
            .await
            .is_err());
    }
}

#[tokio::test]
async fn test_notifier_receives_order() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_product(Product::new(ProductId::new("a"), "Kaftan", Money::new(2000), 5))
        .await
        .unwrap();
    let (notifier, mut events) = ChannelNotifier::new();
    let shop = Storefront::new(store, &StorefrontConfig::default()).with_notifier(Arc::new(notifier));

    let owner = Owner::guest("tok1");
    shop.carts()
        .add(&owner, &ProductId::new("a"), 1, LineOptions::none())
        .await
        .unwrap();
    let order = shop.checkout().checkout(&owner, request(None)).await.unwrap();

    let event = events.recv().await.unwrap();
    assert_eq!(event.order_number, order.order_number);
    assert_eq!(event.items.len(), 1);
}

#[tokio::test]
async fn test_disabled_notifications_send_nothing() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_product(Product::new(ProductId::new("a"), "Kaftan", Money::new(2000), 5))
        .await
        .unwrap();
    let mut config = StorefrontConfig::default();
    config.notifications.enabled = false;
    let (notifier, mut events) = ChannelNotifier::new();
    let shop = Storefront::new(store, &config).with_notifier(Arc::new(notifier));

    let owner = Owner::guest("tok1");
    shop.carts()
        .add(&owner, &ProductId::new("a"), 1, LineOptions::none())
        .await
        .unwrap();
    shop.checkout().checkout(&owner, request(None)).await.unwrap();
    tokio::task::yield_now().await;
    assert!(events.try_recv().is_err());
}

fn envelope(credentials: Credentials, request: serde_json::Value) -> Envelope {
    Envelope {
        credentials,
        request: serde_json::from_value::<WireRequest>(request).unwrap(),
    }
}

#[tokio::test]
async fn test_wire_mints_guest_token_on_first_add() {
    let (_, shop) = shop(5).await;
    let response = shop
        .handle(envelope(
            Credentials::default(),
            json!({ "op": "add_item", "product_id": "a", "quantity": 1 }),
        ))
        .await;
    assert!(response.ok);
    let token = response.guest_token.unwrap();

    let listed = shop
        .handle(envelope(
            Credentials::guest(token.as_str()),
            json!({ "op": "list_cart" }),
        ))
        .await;
    assert!(listed.ok);
    assert!(listed.guest_token.is_none());
    let data = listed.data.unwrap();
    assert_eq!(data["item_count"], json!(1));
    assert_eq!(data["subtotal"], json!(2000));
}

#[tokio::test]
async fn test_wire_error_kinds() {
    let (_, shop) = shop(3).await;
    let guest = Credentials::guest("tok1");

    let cases = [
        (json!({ "op": "add_item", "product_id": "a", "quantity": 0 }), "validation"),
        (json!({ "op": "add_item", "product_id": "zzz", "quantity": 1 }), "not_found"),
        (json!({ "op": "add_item", "product_id": "a", "quantity": 4 }), "out_of_stock"),
        (json!({ "op": "validate_discount", "code": "NOPE", "subtotal": 100 }), "not_found"),
        (
            json!({
                "op": "checkout",
                "fulfillment": { "full_name": "A", "email": "a@b", "shipping_address": "x" },
                "payment": { "phone": "1", "reference": "r" }
            }),
            "validation",
        ),
    ];
    for (request, kind) in cases {
        let response = shop.handle(envelope(guest.clone(), request.clone())).await;
        assert!(!response.ok, "{request}");
        let error = serde_json::to_value(response.error.unwrap()).unwrap();
        assert_eq!(error["kind"], json!(kind), "{request}");
    }
}

#[tokio::test]
async fn test_wire_checkout_requires_owner() {
    let (_, shop) = shop(3).await;
    let response = shop
        .handle(envelope(
            Credentials::default(),
            serde_json::to_value(WireRequest::Checkout(request(None))).unwrap(),
        ))
        .await;
    assert!(!response.ok);
    assert_eq!(response.error.unwrap().kind, ErrorKind::Validation);
    assert!(response.guest_token.is_none());
}

#[tokio::test]
async fn test_wire_login_and_order_visibility() {
    let (_, shop) = shop(5).await;
    let guest = Credentials::guest("tok1");
    shop.handle(envelope(
        guest.clone(),
        json!({ "op": "add_item", "product_id": "a", "quantity": 2 }),
    ))
    .await;

    let signed_in = Credentials {
        bearer: Some("bearer-5".into()),
        guest_token: Some(GuestToken::new("tok1")),
    };
    let login = shop.handle(envelope(signed_in.clone(), json!({ "op": "login" }))).await;
    assert!(login.ok);
    assert_eq!(login.data.unwrap()["items"][0]["quantity"], json!(2));

    let placed = shop
        .handle(envelope(
            Credentials::bearer("bearer-5"),
            serde_json::to_value(WireRequest::Checkout(request(Some("PROMO20")))).unwrap(),
        ))
        .await;
    assert!(placed.ok);
    let data = placed.data.unwrap();
    assert_eq!(data["total"], json!(3200));
    let number = data["order_number"].as_str().unwrap().to_string();

    let mine = shop
        .handle(envelope(
            Credentials::bearer("bearer-5"),
            json!({ "op": "get_order", "order_number": number }),
        ))
        .await;
    assert!(mine.ok);

    let theirs = shop
        .handle(envelope(guest, json!({ "op": "get_order", "order_number": number })))
        .await;
    assert_eq!(theirs.error.unwrap().kind, ErrorKind::NotFound);

    let no_bearer = shop
        .handle(envelope(Credentials::guest("tok1"), json!({ "op": "login" })))
        .await;
    assert!(!no_bearer.ok);
}

#[tokio::test]
async fn test_wire_validate_uses_cart_subtotal() {
    let (_, shop) = shop(5).await;
    let guest = Credentials::guest("tok1");
    shop.handle(envelope(
        guest.clone(),
        json!({ "op": "add_item", "product_id": "a", "quantity": 2 }),
    ))
    .await;

    let response = shop
        .handle(envelope(guest, json!({ "op": "validate_discount", "code": "promo20" })))
        .await;
    let data = response.data.unwrap();
    assert_eq!(data["discount_amount"], json!(800));
    assert_eq!(data["code"], json!("PROMO20"));
}

#[tokio::test]
async fn test_store_outage_surfaces_as_infrastructure() {
    let (store, shop) = shop(5).await;
    store.set_offline(true);
    let response = shop
        .handle(envelope(Credentials::guest("tok1"), json!({ "op": "list_cart" })))
        .await;
    assert_eq!(response.error.unwrap().kind, ErrorKind::Infrastructure);
}

#[tokio::test]
async fn test_idempotent_checkout_over_wire() {
    let (store, shop) = shop(5).await;
    let owner = Credentials::guest("tok1");
    shop.handle(envelope(
        owner.clone(),
        json!({ "op": "add_item", "product_id": "a", "quantity": 1 }),
    ))
    .await;

    let mut req = request(None);
    req.idempotency_key = Some("retry-me".into());
    let body = serde_json::to_value(WireRequest::Checkout(req)).unwrap();

    let first = shop.handle(envelope(owner.clone(), body.clone())).await;
    let second = shop.handle(envelope(owner, body)).await;
    assert!(first.ok && second.ok);
    assert_eq!(
        first.data.unwrap()["order_number"],
        second.data.unwrap()["order_number"]
    );
    assert_eq!(store.orders().await.unwrap().len(), 1);
    assert_eq!(stock_of(&store, "a").await, 4);
}
