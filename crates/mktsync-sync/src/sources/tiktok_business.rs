use async_trait::async_trait;
use mktsync_connectors::tiktok_business::{fields, TiktokBusinessClient};
use mktsync_connectors::{Cursor, Page};
use mktsync_core::{EntityKind, NormalizedRecord};
use serde_json::Value;

use crate::source::{RecordSource, SourcePage, SyncWindow, WatermarkMode};
use crate::SyncError;

/// Advertisers granted to the app, from the comma-separated list stored on
/// the tenant at authorisation time.
#[must_use]
pub fn split_advertiser_ids(external_ref: Option<&str>) -> Vec<String> {
    external_ref
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .collect()
}

pub struct TiktokAdvertiserSource<'a> {
    pub(crate) client: &'a TiktokBusinessClient,
    pub(crate) access_token: String,
    pub(crate) advertiser_ids: Vec<String>,
}

#[async_trait]
impl RecordSource for TiktokAdvertiserSource<'_> {
    fn entity(&self) -> EntityKind {
        EntityKind::TiktokBusinessAdvertiser
    }

    fn mode(&self) -> WatermarkMode {
        WatermarkMode::None
    }

    async fn fetch_page(
        &self,
        _cursor: &Cursor,
        _window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let rows = self
            .client
            .get_advertisers(&self.access_token, &self.advertiser_ids)
            .await?;
        Ok(SourcePage::from_rows(
            self.entity(),
            &rows,
            None,
            fields::normalize_advertiser,
        ))
    }
}

/// Position within the walk over every advertiser's pages, encoded as
/// `"{advertiser index}:{page}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AdvertiserPage {
    advertiser: usize,
    page: u32,
}

impl AdvertiserPage {
    const START: Self = Self {
        advertiser: 0,
        page: 1,
    };

    fn parse(cursor: &Cursor) -> Self {
        cursor
            .token()
            .and_then(|token| token.split_once(':'))
            .and_then(|(adv, page)| {
                Some(Self {
                    advertiser: adv.parse().ok()?,
                    page: page.parse().ok()?,
                })
            })
            .unwrap_or(Self::START)
    }

    fn to_cursor(self) -> Cursor {
        Cursor::Token(format!("{}:{}", self.advertiser, self.page))
    }

    /// Cursor after a page of this advertiser: its next page, or the first
    /// page of the next advertiser, or nothing once every advertiser is done.
    fn next(self, page: &Page<Value>, advertisers: usize) -> Option<Cursor> {
        if let Some(Cursor::Index(n)) = page.next {
            return Some(Self { page: n, ..self }.to_cursor());
        }
        let advertiser = self.advertiser + 1;
        (advertiser < advertisers).then(|| {
            Self {
                advertiser,
                page: 1,
            }
            .to_cursor()
        })
    }
}

/// Which advertiser-scoped list to walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdObject {
    Campaign,
    AdGroup,
    Ad,
}

/// Campaigns, ad groups or ads across every granted advertiser, refreshed in
/// full on each run.
pub struct TiktokAdObjectSource<'a> {
    pub(crate) client: &'a TiktokBusinessClient,
    pub(crate) access_token: String,
    pub(crate) advertiser_ids: Vec<String>,
    pub(crate) object: AdObject,
}

impl TiktokAdObjectSource<'_> {
    fn normalizer(&self) -> fn(&Value) -> Option<NormalizedRecord> {
        match self.object {
            AdObject::Campaign => fields::normalize_campaign,
            AdObject::AdGroup => fields::normalize_ad_group,
            AdObject::Ad => fields::normalize_ad,
        }
    }
}

#[async_trait]
impl RecordSource for TiktokAdObjectSource<'_> {
    fn entity(&self) -> EntityKind {
        match self.object {
            AdObject::Campaign => EntityKind::TiktokBusinessCampaign,
            AdObject::AdGroup => EntityKind::TiktokBusinessAdGroup,
            AdObject::Ad => EntityKind::TiktokBusinessAd,
        }
    }

    fn mode(&self) -> WatermarkMode {
        WatermarkMode::None
    }

    fn first_cursor(&self) -> Cursor {
        AdvertiserPage::START.to_cursor()
    }

    async fn fetch_page(
        &self,
        cursor: &Cursor,
        _window: &SyncWindow,
    ) -> Result<SourcePage, SyncError> {
        let mut position = AdvertiserPage::parse(cursor);
        // Advertisers with nothing to list are skipped so an empty page only
        // ever means the walk is over.
        loop {
            let Some(advertiser_id) = self.advertiser_ids.get(position.advertiser) else {
                return Ok(SourcePage::default());
            };
            let token = self.access_token.as_str();
            let page = position.page;
            let list = match self.object {
                AdObject::Campaign => {
                    self.client
                        .get_campaigns(token, advertiser_id, page, None)
                        .await?
                }
                AdObject::AdGroup => {
                    self.client
                        .get_ad_groups(token, advertiser_id, page, None)
                        .await?
                }
                AdObject::Ad => {
                    self.client
                        .get_ads(token, advertiser_id, page, None)
                        .await?
                }
            };
            let next = position.next(&list, self.advertiser_ids.len());
            if list.items.is_empty() {
                if let Some(cursor) = next {
                    position = AdvertiserPage::parse(&cursor);
                    continue;
                }
            }
            return Ok(SourcePage::from_rows(
                self.entity(),
                &list.items,
                next,
                self.normalizer(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_trims_advertiser_ids() {
        assert_eq!(split_advertiser_ids(Some("1, 2,,3")), vec!["1", "2", "3"]);
        assert!(split_advertiser_ids(None).is_empty());
    }

    #[test]
    fn cursor_walks_pages_then_advertisers() {
        let start = AdvertiserPage::parse(&Cursor::Token("garbage".to_owned()));
        assert_eq!(start, AdvertiserPage::START);

        let more = Page::new(Vec::<Value>::new(), Some(Cursor::Index(2)));
        assert_eq!(start.next(&more, 2), Some(Cursor::Token("0:2".to_owned())));

        let done = Page::last(Vec::<Value>::new());
        assert_eq!(start.next(&done, 2), Some(Cursor::Token("1:1".to_owned())));

        let last = AdvertiserPage {
            advertiser: 1,
            page: 3,
        };
        assert_eq!(last.next(&done, 2), None);
    }
}
