//! From a hydrated cart to a validated order draft.

use std::sync::Arc;

use duka_storefront::cart::storage::MemoryCartStorage;
use duka_storefront::cart::store::CartStore;
use duka_storefront::cart::{CartAction, ProductSnapshot};
use duka_storefront::checkout::{self, CheckoutError, OrderDraft};
use testresult::TestResult;
use uuid::Uuid;

fn product(id: u128, name: &str, price: i32, stock: i32) -> ProductSnapshot {
    ProductSnapshot {
        id: Uuid::from_u128(id),
        name: name.to_string(),
        price,
        image_url: "/placeholder.svg".to_string(),
        stock_quantity: stock,
    }
}

fn draft_from_cart(state: &duka_storefront::cart::CartState, token: Uuid) -> OrderDraft {
    let quote = checkout::quote(state);
    OrderDraft {
        customer_name: "Wanjiku Kamau".to_string(),
        customer_email: "wanjiku@example.com".to_string(),
        customer_phone: Some("+254700000000".to_string()),
        shipping_address: "Moi Avenue, Nairobi".to_string(),
        items: state.items().to_vec(),
        total_amount: quote.total,
        cart_token: Some(token),
    }
}

#[tokio::test]
async fn checkout_quotes_shipping_the_way_the_cart_page_promises() {
    let mut store = CartStore::open(MemoryCartStorage::new(), Uuid::new_v4()).await;
    store
        .apply(CartAction::Add(product(1, "Washing Machine", 18_000, 4)))
        .await;

    let below = checkout::quote(store.state());
    assert_eq!(below.shipping_fee, 150);
    assert_eq!(below.total, 18_150);

    store
        .apply(CartAction::Add(product(2, "Microwave", 7_000, 9)))
        .await;

    let above = checkout::quote(store.state());
    assert_eq!(above.subtotal, 25_000);
    assert_eq!(above.shipping_fee, 0);
    assert_eq!(above.total, 25_000);
}

#[tokio::test]
async fn a_cart_becomes_a_valid_draft_with_snapshot_prices() {
    let token = Uuid::new_v4();
    let mut store = CartStore::open(MemoryCartStorage::new(), token).await;
    store
        .apply(CartAction::Add(product(1, "Double Door Fridge", 55_000, 5)))
        .await;
    store
        .apply(CartAction::Add(product(2, "Electric Kettle", 3_500, 20)))
        .await;

    let draft = draft_from_cart(store.state(), token);
    assert_eq!(draft.validate(), Ok(()));
    assert_eq!(draft.total_amount, 58_500);
    assert_eq!(draft.expected_total(), draft.total_amount);

    let order_id = Uuid::new_v4();
    let rows = draft.order_items(order_id);
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.order_id == order_id));
    assert_eq!(rows[0].price, 55_000);
    assert_eq!(rows[1].price, 3_500);
}

#[tokio::test]
async fn the_order_keeps_the_price_the_shopper_saw() {
    // Kettle goes into the cart at 3,500...
    let mut store = CartStore::open(MemoryCartStorage::new(), Uuid::new_v4()).await;
    store
        .apply(CartAction::Add(product(2, "Electric Kettle", 3_500, 20)))
        .await;

    // ...then the catalog price moves to 4,200 before checkout. The cart
    // line and the order rows built from it still carry 3,500.
    let _repriced = product(2, "Electric Kettle", 4_200, 20);

    let draft = draft_from_cart(store.state(), Uuid::new_v4());
    let rows = draft.order_items(Uuid::new_v4());
    assert_eq!(rows[0].price, 3_500);
}

#[tokio::test]
async fn an_emptied_cart_cannot_be_ordered() -> TestResult {
    let storage = Arc::new(MemoryCartStorage::new());
    let token = Uuid::new_v4();

    let mut store = CartStore::open(Arc::clone(&storage), token).await;
    store
        .apply(CartAction::Add(product(1, "Toaster", 2_500, 6)))
        .await;
    store.apply(CartAction::Clear).await;

    let draft = draft_from_cart(store.state(), token);
    assert_eq!(draft.validate(), Err(CheckoutError::EmptyCart));

    // And the emptied state is what a new session sees.
    let reopened = CartStore::open(storage, token).await;
    assert!(reopened.state().is_empty());
    Ok(())
}
