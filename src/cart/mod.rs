//! The shopper's cart: a pure reducer over line items plus the persistence
//! wrapper in [`store`].
//!
//! A cart holds at most one line per product, every line has a quantity of at
//! least one, and the total is always re-derived from the lines — it is never
//! written directly. Products enter the cart as snapshots taken at add time;
//! later catalog changes do not touch lines already in a cart, which is also
//! what fixes the unit price an order eventually records.

pub mod storage;
pub mod store;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::ProductEntity;

/// Copy of the product fields the cart needs, captured when the shopper adds
/// the item. The stock ceiling enforced by the reducer comes from here, not
/// from the live catalog.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: i32,
    pub image_url: String,
    pub stock_quantity: i32,
}

impl From<&ProductEntity> for ProductSnapshot {
    fn from(product: &ProductEntity) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            stock_quantity: product.stock_quantity,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct CartLineItem {
    pub product: ProductSnapshot,
    pub quantity: i32,
}

impl CartLineItem {
    pub fn line_total(&self) -> i64 {
        i64::from(self.product.price) * i64::from(self.quantity)
    }
}

/// Everything that can happen to a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Merge-increment the line for this product, or append a new line.
    Add(ProductSnapshot),
    /// Drop the line for this product; absent products are a no-op.
    Remove(Uuid),
    /// Set an exact quantity; zero or less removes the line.
    UpdateQuantity { product_id: Uuid, quantity: i32 },
    /// Empty the cart.
    Clear,
    /// Replace the whole cart, normalizing the payload first. Used once per
    /// session to hydrate from the persisted snapshot.
    Load(Vec<CartLineItem>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    items: Vec<CartLineItem>,
    total: i64,
}

impl CartState {
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn from_items(items: Vec<CartLineItem>) -> Self {
        let total = items.iter().map(CartLineItem::line_total).sum();
        Self { items, total }
    }
}

/// Applies one action to the cart and returns the next state. Pure: all
/// persistence lives in [`store::CartStore`].
pub fn reduce(state: CartState, action: CartAction) -> CartState {
    match action {
        CartAction::Add(snapshot) => {
            let mut items = state.items;

            match items.iter_mut().find(|line| line.product.id == snapshot.id) {
                Some(line) => {
                    // The first-seen snapshot stays authoritative for the
                    // session, including its stock ceiling.
                    line.quantity = (line.quantity + 1).min(line.product.stock_quantity);
                }
                None if snapshot.stock_quantity >= 1 => {
                    items.push(CartLineItem {
                        product: snapshot,
                        quantity: 1,
                    });
                }
                // Out of stock at add time: nothing to put in the cart.
                None => {}
            }

            CartState::from_items(items)
        }

        CartAction::Remove(product_id) => {
            let mut items = state.items;
            items.retain(|line| line.product.id != product_id);
            CartState::from_items(items)
        }

        CartAction::UpdateQuantity {
            product_id,
            quantity,
        } => {
            if quantity <= 0 {
                return reduce(state, CartAction::Remove(product_id));
            }

            let mut items = state.items;
            if let Some(line) = items.iter_mut().find(|line| line.product.id == product_id) {
                line.quantity = quantity.min(line.product.stock_quantity);
            }

            CartState::from_items(items)
        }

        CartAction::Clear => CartState::default(),

        CartAction::Load(items) => CartState::from_items(normalize(items)),
    }
}

/// Brings an untrusted line-item payload back to a well-formed cart: lines
/// with nonsense prices or quantities are dropped, duplicate products are
/// merged into the first occurrence, and quantities are clamped to the
/// snapshot's stock ceiling. Persisted snapshots may predate schema changes
/// or have been edited by hand, so none of this is an error.
fn normalize(items: Vec<CartLineItem>) -> Vec<CartLineItem> {
    let mut normalized: Vec<CartLineItem> = Vec::with_capacity(items.len());

    for line in items {
        if line.product.price < 0 || line.quantity <= 0 {
            continue;
        }

        match normalized
            .iter_mut()
            .find(|kept| kept.product.id == line.product.id)
        {
            Some(kept) => {
                kept.quantity = kept
                    .quantity
                    .saturating_add(line.quantity)
                    .min(kept.product.stock_quantity);
            }
            None => {
                let quantity = line.quantity.min(line.product.stock_quantity);
                if quantity >= 1 {
                    normalized.push(CartLineItem {
                        quantity,
                        ..line
                    });
                }
            }
        }
    }

    normalized
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

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

    fn line(id: u128, price: i32, stock: i32, quantity: i32) -> CartLineItem {
        CartLineItem {
            product: snapshot(id, price, stock),
            quantity,
        }
    }

    fn recomputed_total(state: &CartState) -> i64 {
        state.items().iter().map(CartLineItem::line_total).sum()
    }

    #[test]
    fn adding_the_same_product_twice_merges_into_one_line() {
        let state = reduce(CartState::default(), CartAction::Add(snapshot(1, 1000, 10)));
        let state = reduce(state, CartAction::Add(snapshot(1, 1000, 10)));

        assert_eq!(state.items().len(), 1);
        assert_eq!(state.items()[0].quantity, 2);
        assert_eq!(state.total(), 2000);
    }

    #[test]
    fn merge_keeps_the_first_seen_snapshot() {
        // The catalog price moved between the two adds; the line keeps the
        // price it was added at.
        let state = reduce(CartState::default(), CartAction::Add(snapshot(1, 1000, 10)));
        let state = reduce(state, CartAction::Add(snapshot(1, 1200, 10)));

        assert_eq!(state.items().len(), 1);
        assert_eq!(state.items()[0].product.price, 1000);
        assert_eq!(state.total(), 2000);
    }

    #[test]
    fn add_stops_at_the_stock_ceiling() {
        let mut state = CartState::default();
        for _ in 0..5 {
            state = reduce(state, CartAction::Add(snapshot(1, 500, 2)));
        }

        assert_eq!(state.items()[0].quantity, 2);
        assert_eq!(state.total(), 1000);
    }

    #[test]
    fn adding_an_out_of_stock_product_is_a_noop() {
        let state = reduce(CartState::default(), CartAction::Add(snapshot(1, 500, 0)));

        assert!(state.is_empty());
        assert_eq!(state.total(), 0);
    }

    #[test]
    fn update_quantity_is_absolute_not_incremental() {
        let state = reduce(CartState::default(), CartAction::Add(snapshot(1, 3500, 10)));
        let state = reduce(
            state,
            CartAction::UpdateQuantity {
                product_id: Uuid::from_u128(1),
                quantity: 3,
            },
        );

        assert_eq!(state.items()[0].quantity, 3);
        assert_eq!(state.total(), 10_500);
    }

    #[test]
    fn update_quantity_clamps_to_stock() {
        let state = reduce(CartState::default(), CartAction::Add(snapshot(1, 100, 4)));
        let state = reduce(
            state,
            CartAction::UpdateQuantity {
                product_id: Uuid::from_u128(1),
                quantity: 9,
            },
        );

        assert_eq!(state.items()[0].quantity, 4);
    }

    #[test]
    fn update_quantity_to_zero_removes_the_line() {
        let state = reduce(CartState::default(), CartAction::Add(snapshot(1, 100, 5)));
        let state = reduce(
            state,
            CartAction::UpdateQuantity {
                product_id: Uuid::from_u128(1),
                quantity: 0,
            },
        );

        assert!(state.is_empty());
    }

    #[test]
    fn update_quantity_below_zero_removes_the_line() {
        let state = reduce(CartState::default(), CartAction::Add(snapshot(1, 100, 5)));
        let state = reduce(
            state,
            CartAction::UpdateQuantity {
                product_id: Uuid::from_u128(1),
                quantity: -1,
            },
        );

        assert!(state.is_empty());
    }

    #[test]
    fn update_quantity_for_an_unknown_product_is_a_noop() {
        let state = reduce(CartState::default(), CartAction::Add(snapshot(1, 100, 5)));
        let before = state.clone();
        let state = reduce(
            state,
            CartAction::UpdateQuantity {
                product_id: Uuid::from_u128(42),
                quantity: 3,
            },
        );

        assert_eq!(state, before);
    }

    #[test]
    fn removing_an_absent_product_is_a_noop() {
        let state = reduce(CartState::default(), CartAction::Add(snapshot(1, 100, 5)));
        let before = state.clone();
        let state = reduce(state, CartAction::Remove(Uuid::from_u128(42)));

        assert_eq!(state, before);
    }

    #[test]
    fn clear_empties_the_cart() {
        let state = reduce(CartState::default(), CartAction::Add(snapshot(1, 100, 5)));
        let state = reduce(state, CartAction::Clear);

        assert!(state.is_empty());
        assert_eq!(state.total(), 0);
    }

    #[test]
    fn load_merges_duplicate_lines_and_drops_invalid_ones() {
        let state = reduce(
            CartState::default(),
            CartAction::Load(vec![
                line(1, 1000, 10, 2),
                line(2, -50, 10, 1),
                line(3, 700, 10, 0),
                line(1, 1000, 10, 3),
            ]),
        );

        assert_eq!(state.items().len(), 1);
        assert_eq!(state.items()[0].quantity, 5);
        assert_eq!(state.total(), 5000);
    }

    #[test]
    fn load_clamps_quantities_to_stock() {
        let state = reduce(CartState::default(), CartAction::Load(vec![line(1, 100, 3, 9)]));

        assert_eq!(state.items()[0].quantity, 3);
    }

    #[test]
    fn load_drops_lines_that_clamp_to_nothing() {
        let state = reduce(CartState::default(), CartAction::Load(vec![line(1, 100, 0, 2)]));

        assert!(state.is_empty());
    }

    // The total must equal the recomputation from line items after every
    // single action, whatever the order of actions.
    #[test]
    fn total_matches_line_items_under_random_action_sequences() {
        let mut rng = StdRng::seed_from_u64(0xD00C);
        let products: Vec<ProductSnapshot> = (1..=6)
            .map(|id| snapshot(id, (id as i32) * 250, 8))
            .collect();

        let mut state = CartState::default();
        for _ in 0..2000 {
            let product = &products[rng.gen_range(0..products.len())];
            let action = match rng.gen_range(0..5) {
                0 => CartAction::Add(product.clone()),
                1 => CartAction::Remove(product.id),
                2 => CartAction::UpdateQuantity {
                    product_id: product.id,
                    quantity: rng.gen_range(-2..12),
                },
                3 => CartAction::Clear,
                _ => CartAction::Load(
                    (0..rng.gen_range(0..4))
                        .map(|i| CartLineItem {
                            product: products[i].clone(),
                            quantity: rng.gen_range(-1..5),
                        })
                        .collect(),
                ),
            };

            state = reduce(state, action);

            assert_eq!(state.total(), recomputed_total(&state));
            assert!(state.items().iter().all(|line| line.quantity >= 1));
        }
    }

    #[test]
    fn appliance_shopping_scenario() {
        let fridge = snapshot(1, 55_000, 5);
        let kettle = snapshot(2, 3_500, 20);

        let state = reduce(CartState::default(), CartAction::Add(fridge));
        let state = reduce(state, CartAction::Add(kettle.clone()));
        assert_eq!(state.total(), 58_500);

        let state = reduce(
            state,
            CartAction::UpdateQuantity {
                product_id: kettle.id,
                quantity: 3,
            },
        );
        assert_eq!(state.total(), 65_500);
    }
}
