//! JST ERP open API (`asiaopenapi.jsterp.com`).

mod client;
pub mod fields;

pub use client::{InoutTimeField, JstAccess, JstClient, OrderTimeField, DETAIL_BATCH, PAGE_SIZE};
