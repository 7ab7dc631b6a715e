//! Duka storefront service: catalog reads, server-side shopping carts, and
//! the order pipeline for a Kenyan home-appliance shop, plus the back-office
//! routes that move orders through their lifecycle.

pub mod aliases;
pub mod app_error;
pub mod app_state;
pub mod bootstrap;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod currency;
pub mod db;
pub mod middleware;
pub mod models;
pub mod order_status;
pub mod routes;
pub mod schema;
pub mod slug;
pub mod swagger;
