//! Turns a cart into something an order can be written from: the shipping
//! rule, the quote shown to the shopper, and the submitted draft with its
//! validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::cart::{CartLineItem, CartState};
use crate::models::CreateOrderItemEntity;

/// Orders at or above this subtotal ship free.
pub const FREE_SHIPPING_THRESHOLD: i64 = 20_000;
/// Flat delivery fee below the threshold, in whole shillings.
pub const SHIPPING_FEE: i64 = 150;

pub fn shipping_fee(subtotal: i64) -> i64 {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        0
    } else {
        SHIPPING_FEE
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
pub struct Quote {
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub total: i64,
}

/// Prices a cart. An empty cart quotes to zero across the board; nobody pays
/// delivery on nothing.
pub fn quote(state: &CartState) -> Quote {
    if state.is_empty() {
        return Quote {
            subtotal: 0,
            shipping_fee: 0,
            total: 0,
        };
    }

    let subtotal = state.total();
    let shipping_fee = shipping_fee(subtotal);

    Quote {
        subtotal,
        shipping_fee,
        total: subtotal + shipping_fee,
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Cannot place an order with an empty cart")]
    EmptyCart,
    #[error("Invalid quantity {1} for product {0}")]
    InvalidQuantity(Uuid, i32),
    #[error("Invalid price {1} for product {0}")]
    InvalidPrice(Uuid, i32),
}

/// What the storefront submits at checkout. Field names follow the wire
/// contract, so the struct deserializes straight from the request body.
#[derive(Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub shipping_address: String,
    pub items: Vec<CartLineItem>,
    pub total_amount: i64,
    /// When present, the cart behind this token is emptied together with the
    /// order write.
    #[serde(default)]
    pub cart_token: Option<Uuid>,
}

impl OrderDraft {
    /// Checks the draft the way the storefront promises its shoppers: name,
    /// email, delivery address, and a non-empty item list are required, and
    /// every line must carry a sane quantity and price. Phone stays optional.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        if self.customer_name.trim().is_empty() {
            return Err(CheckoutError::MissingField("customerName"));
        }
        if self.customer_email.trim().is_empty() {
            return Err(CheckoutError::MissingField("customerEmail"));
        }
        if self.shipping_address.trim().is_empty() {
            return Err(CheckoutError::MissingField("shippingAddress"));
        }
        if self.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        for line in &self.items {
            if line.quantity < 1 {
                return Err(CheckoutError::InvalidQuantity(
                    line.product.id,
                    line.quantity,
                ));
            }
            if line.product.price < 0 {
                return Err(CheckoutError::InvalidPrice(
                    line.product.id,
                    line.product.price,
                ));
            }
        }

        Ok(())
    }

    pub fn subtotal(&self) -> i64 {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// The total this draft should carry under the current shipping rule.
    /// The submitted `total_amount` is compared against this server-side.
    pub fn expected_total(&self) -> i64 {
        let subtotal = self.subtotal();
        subtotal + shipping_fee(subtotal)
    }

    /// Line-item rows for the order, each carrying the price the product had
    /// in the cart. Later catalog price changes never touch these rows.
    pub fn order_items(&self, order_id: Uuid) -> Vec<CreateOrderItemEntity> {
        self.items
            .iter()
            .map(|line| CreateOrderItemEntity {
                order_id,
                product_id: line.product.id,
                quantity: line.quantity,
                price: line.product.price,
            })
            .collect()
    }
}
