//! Which entities a sync run visits, and in what order.

use mktsync_core::{EntityKind, Vendor};

use crate::pipeline::EntitySyncReport;

/// An ordered list of entity syncs for one vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncJob {
    pub vendor: Vendor,
    pub steps: Vec<EntityKind>,
}

impl SyncJob {
    /// Every entity of `vendor`, reference data first: warehouses and shops
    /// before products, products before orders, org units before the rest,
    /// and parents before children for TikTok Business.
    #[must_use]
    pub fn all(vendor: Vendor) -> Self {
        Self {
            vendor,
            steps: vendor.entities(),
        }
    }

    #[must_use]
    pub fn single(entity: EntityKind) -> Self {
        Self {
            vendor: entity.vendor(),
            steps: vec![entity],
        }
    }

    /// Whether the job continues after a step produced `report`. A step
    /// that ran out of page budget ends the job so the next run picks it up
    /// before moving on.
    #[must_use]
    pub fn continues_after(&self, report: &EntitySyncReport) -> bool {
        !report.has_more
    }
}
