//! YonSuite (Yonyou BIP) open API.

mod client;
pub mod fields;

pub use client::{YonsuiteClient, DEFAULT_PAGE_SIZE, DEFAULT_ROOT_ORG_CODE};
