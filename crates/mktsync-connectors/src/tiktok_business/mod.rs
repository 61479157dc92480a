//! TikTok Business (Marketing) API.

mod client;
pub mod fields;

pub use client::{advertiser_ids, TiktokBusinessClient, PAGE_SIZE};
