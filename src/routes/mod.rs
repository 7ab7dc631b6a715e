pub mod admin;
pub mod carts;
pub mod categories;
pub mod orders;
pub mod products;
