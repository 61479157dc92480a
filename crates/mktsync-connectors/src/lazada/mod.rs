//! Lazada Open Platform (`api.lazada.*/rest`).

mod client;
pub mod fields;

pub use client::{LazadaClient, LazadaEndpoints, ITEMS_BATCH, ORDERS_LIMIT, PRODUCTS_LIMIT};
