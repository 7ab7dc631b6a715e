//! Order fulfilment states and the transitions the admin console may apply.
//!
//! The storefront writes `new` at checkout; every later change comes through
//! the admin API and has to follow the forward-only graph below. Arbitrary
//! jumps (shipping a cancelled order, "un-delivering") are rejected.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown order status '{0}'")]
pub struct UnknownOrderStatus(String);

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether an order in `self` may move to `next`.
    ///
    /// Fulfilment only moves forward one step at a time; cancellation is
    /// allowed from any non-terminal state. Writing the current status again
    /// is not a transition and is rejected like any other illegal jump.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        match (self, next) {
            (OrderStatus::New, OrderStatus::Processing)
            | (OrderStatus::Processing, OrderStatus::Shipped)
            | (OrderStatus::Shipped, OrderStatus::Delivered) => true,
            (current, OrderStatus::Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(OrderStatus::New),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownOrderStatus(other.to_string())),
        }
    }
}
