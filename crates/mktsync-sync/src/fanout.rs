//! Bounded per-tenant parallelism.

use std::future::Future;
use std::pin::Pin;

use futures::stream::{self, StreamExt};
use mktsync_db::TenantRow;

use crate::SyncError;

/// Default number of tenants synced at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// What happened for one tenant.
#[derive(Debug)]
pub struct TenantOutcome<T> {
    pub tenant_id: i64,
    pub slug: String,
    pub result: Result<T, SyncError>,
}

/// Every tenant outcome of one fan-out, in completion order.
#[derive(Debug)]
pub struct FanoutSummary<T> {
    pub outcomes: Vec<TenantOutcome<T>>,
}

impl<T> FanoutSummary<T> {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// True when there was at least one tenant and none succeeded.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded() == 0
    }
}

/// Runs `work` once per tenant with at most `max_concurrent` in flight.
///
/// A tenant's error is captured in its [`TenantOutcome`] and logged; it never
/// cancels the other tenants.
pub async fn run_fanout<'a, T, F, Fut>(
    tenants: &'a [TenantRow],
    max_concurrent: usize,
    work: F,
) -> FanoutSummary<T>
where
    T: Send + 'a,
    F: Fn(&'a TenantRow) -> Fut + Send + 'a,
    Fut: Future<Output = Result<T, SyncError>> + Send + 'a,
{
    // Boxed as `dyn Send` so callers spawning this future don't hit the
    // higher-ranked lifetime inference limitation on the inner closure.
    let outcomes: Pin<Box<dyn Future<Output = Vec<TenantOutcome<T>>> + Send + 'a>> = Box::pin(
        stream::iter(tenants)
            .map(move |tenant| {
                let fut = work(tenant);
                async move {
                    let result = fut.await;
                    if let Err(e) = &result {
                        tracing::error!(tenant = %tenant.slug, error = %e, "tenant sync failed");
                    }
                    TenantOutcome {
                        tenant_id: tenant.id,
                        slug: tenant.slug.clone(),
                        result,
                    }
                }
            })
            .buffer_unordered(max_concurrent.max(1))
            .collect(),
    );
    let outcomes = outcomes.await;

    FanoutSummary { outcomes }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn tenant_row(id: i64, slug: &str) -> TenantRow {
        TenantRow {
            id,
            vendor: "lazada".to_owned(),
            slug: slug.to_owned(),
            name: slug.to_owned(),
            external_ref: None,
            app_key: None,
            app_secret: None,
            access_token: None,
            refresh_token: None,
            token_expires_at: None,
            refresh_expires_at: None,
            auth_status: "authorized".to_owned(),
            sync_since: None,
            is_active: true,
            settings: json!({}),
            last_sync_at: None,
            last_error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn never_exceeds_max_concurrent() {
        let tenants: Vec<TenantRow> = (1..=10).map(|i| tenant_row(i, &format!("t{i}"))).collect();
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let summary = run_fanout(&tenants, 3, |tenant| {
            let in_flight = &in_flight;
            let peak = &peak;
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(tenant.id)
            }
        })
        .await;

        assert_eq!(summary.succeeded(), 10);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_siblings() {
        let tenants = vec![
            tenant_row(1, "ok-a"),
            tenant_row(2, "broken"),
            tenant_row(3, "ok-b"),
        ];

        let summary = run_fanout(&tenants, 2, |tenant| async move {
            if tenant.slug == "broken" {
                Err(SyncError::NoTenants("broken".to_owned()))
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        assert!(!summary.all_failed());
        let broken = summary
            .outcomes
            .iter()
            .find(|o| o.slug == "broken")
            .unwrap();
        assert!(broken.result.is_err());
    }

    #[tokio::test]
    async fn all_failed_only_when_every_tenant_failed() {
        let tenants = vec![tenant_row(1, "a"), tenant_row(2, "b")];
        let summary = run_fanout(&tenants, 8, |_| async {
            Err::<(), _>(SyncError::NoTenants("x".to_owned()))
        })
        .await;
        assert!(summary.all_failed());

        let empty: FanoutSummary<()> = run_fanout(&[], 8, |_| async { Ok(()) }).await;
        assert!(!empty.all_failed());
    }
}
