//! Ties the pure reducer to a [`CartStorage`] backend.
//!
//! A store is opened per request: hydrate from the persisted snapshot first,
//! apply actions, and persist after every one. Hydration always goes through
//! [`CartAction::Load`], so whatever was on disk gets normalized before any
//! new action sees it. Persistence failures are logged and swallowed; the
//! in-memory cart keeps working and the next successful write catches up.

use std::mem;

use uuid::Uuid;

use super::storage::CartStorage;
use super::{CartAction, CartLineItem, CartState, reduce};

pub struct CartStore<S: CartStorage> {
    storage: S,
    token: Uuid,
    state: CartState,
}

impl<S: CartStorage> CartStore<S> {
    /// Loads the snapshot for `token` and rebuilds the cart from it. A
    /// missing, unreadable, or unloadable snapshot yields an empty cart
    /// rather than an error; shoppers never get locked out of their cart.
    pub async fn open(storage: S, token: Uuid) -> Self {
        let state = match storage.load(token).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<CartLineItem>>(&raw) {
                Ok(items) => reduce(CartState::default(), CartAction::Load(items)),
                Err(err) => {
                    tracing::debug!(%token, "Discarding unreadable cart snapshot: {err}");
                    CartState::default()
                }
            },
            Ok(None) => CartState::default(),
            Err(err) => {
                tracing::warn!(%token, "Cart snapshot load failed, starting empty: {err:#}");
                CartState::default()
            }
        };

        Self {
            storage,
            token,
            state,
        }
    }

    /// Runs one action through the reducer and persists the result.
    pub async fn apply(&mut self, action: CartAction) -> &CartState {
        self.state = reduce(mem::take(&mut self.state), action);
        self.persist().await;
        &self.state
    }

    async fn persist(&self) {
        let snapshot = match serde_json::to_string(self.state.items()) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(token = %self.token, "Failed to serialize cart snapshot: {err}");
                return;
            }
        };

        if let Err(err) = self.storage.save(self.token, snapshot).await {
            tracing::warn!(
                token = %self.token,
                "Cart snapshot write failed, continuing in memory: {err:#}"
            );
        }
    }

    pub fn state(&self) -> &CartState {
        &self.state
    }

    pub fn token(&self) -> Uuid {
        self.token
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::anyhow;
    use mockall::Sequence;
    use testresult::TestResult;

    use super::super::storage::{MemoryCartStorage, MockCartStorage};
    use super::super::{CartAction, ProductSnapshot};
    use super::*;

    fn snapshot(id: u128, price: i32, stock: i32) -> ProductSnapshot {
        ProductSnapshot {
            id: Uuid::from_u128(id),
            name: format!("product-{id}"),
            price,
            image_url: "/placeholder.svg".to_string(),
            stock_quantity: stock,
        }
    }

    #[tokio::test]
    async fn cart_survives_reopening_from_the_same_storage() {
        let storage = Arc::new(MemoryCartStorage::new());
        let token = Uuid::new_v4();

        let mut store = CartStore::open(Arc::clone(&storage), token).await;
        store.apply(CartAction::Add(snapshot(1, 55_000, 5))).await;
        store.apply(CartAction::Add(snapshot(2, 3_500, 20))).await;
        store
            .apply(CartAction::UpdateQuantity {
                product_id: Uuid::from_u128(2),
                quantity: 3,
            })
            .await;
        let expected = store.state().clone();
        drop(store);

        let reopened = CartStore::open(storage, token).await;

        assert_eq!(*reopened.state(), expected);
        assert_eq!(reopened.state().total(), 65_500);
    }

    #[tokio::test]
    async fn unknown_token_opens_an_empty_cart() {
        let store = CartStore::open(MemoryCartStorage::new(), Uuid::new_v4()).await;

        assert!(store.state().is_empty());
    }

    #[tokio::test]
    async fn garbage_snapshot_opens_an_empty_cart() -> TestResult {
        let storage = Arc::new(MemoryCartStorage::new());
        let token = Uuid::new_v4();
        storage.save(token, "definitely not json".to_string()).await?;

        let store = CartStore::open(storage, token).await;

        assert!(store.state().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn wrong_shaped_json_opens_an_empty_cart() -> TestResult {
        let storage = Arc::new(MemoryCartStorage::new());
        let token = Uuid::new_v4();
        storage
            .save(token, r#"{"items": "this is not a line item array"}"#.to_string())
            .await?;

        let store = CartStore::open(storage, token).await;

        assert!(store.state().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn persisted_lines_are_normalized_on_open() -> TestResult {
        let storage = Arc::new(MemoryCartStorage::new());
        let token = Uuid::new_v4();
        let raw = serde_json::json!([
            {"product": snapshot(1, 1000, 10), "quantity": 2},
            {"product": snapshot(1, 1000, 10), "quantity": 3},
            {"product": snapshot(2, 500, 10), "quantity": 0},
        ])
        .to_string();
        storage.save(token, raw).await?;

        let store = CartStore::open(storage, token).await;

        assert_eq!(store.state().items().len(), 1);
        assert_eq!(store.state().items()[0].quantity, 5);
        assert_eq!(store.state().total(), 5000);
        Ok(())
    }

    #[tokio::test]
    async fn storage_load_failure_opens_an_empty_cart() {
        let mut storage = MockCartStorage::new();
        storage
            .expect_load()
            .returning(|_| Err(anyhow!("connection refused")));

        let store = CartStore::open(storage, Uuid::new_v4()).await;

        assert!(store.state().is_empty());
    }

    #[tokio::test]
    async fn storage_save_failure_does_not_lose_the_in_memory_cart() {
        let mut storage = MockCartStorage::new();
        storage.expect_load().returning(|_| Ok(None));
        storage
            .expect_save()
            .returning(|_, _| Err(anyhow!("disk full")));

        let mut store = CartStore::open(storage, Uuid::new_v4()).await;
        store.apply(CartAction::Add(snapshot(1, 1000, 5))).await;

        assert_eq!(store.state().items().len(), 1);
        assert_eq!(store.state().total(), 1000);
    }

    #[tokio::test]
    async fn hydration_happens_before_any_write() {
        let mut seq = Sequence::new();
        let mut storage = MockCartStorage::new();
        storage
            .expect_load()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        storage
            .expect_save()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let mut store = CartStore::open(storage, Uuid::new_v4()).await;
        store.apply(CartAction::Add(snapshot(1, 1000, 5))).await;
    }

    #[tokio::test]
    async fn clearing_persists_an_empty_snapshot() -> TestResult {
        let storage = Arc::new(MemoryCartStorage::new());
        let token = Uuid::new_v4();

        let mut store = CartStore::open(Arc::clone(&storage), token).await;
        store.apply(CartAction::Add(snapshot(1, 1000, 5))).await;
        store.apply(CartAction::Clear).await;
        drop(store);

        assert_eq!(storage.load(token).await?, Some("[]".to_string()));
        Ok(())
    }
}
