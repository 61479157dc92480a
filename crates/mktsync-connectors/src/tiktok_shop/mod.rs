//! TikTok Shop Partner API.

mod client;
pub mod fields;

pub use client::{
    AfterSale, ShopAccess, ShopReport, TiktokShopClient, AFTER_SALE_PAGE_SIZE, DETAIL_BATCH,
    PAGE_SIZE,
};
