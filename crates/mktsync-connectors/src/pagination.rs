//! Vendor-neutral pagination.
//!
//! Vendors page three ways: by 1-based page index (JST, YonSuite, TikTok
//! Business, Lazada campaigns), by row offset (Lazada orders and products),
//! or by an opaque continuation token (TikTok Shop). Clients translate each
//! response into a [`Page`] whose `next` is `None` on the last page.

use mktsync_core::Watermark;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    Index(u32),
    Offset(u32),
    Token(String),
}

impl Cursor {
    /// Watermark form of this cursor, for resumable cursor-driven syncs.
    #[must_use]
    pub fn to_watermark(&self) -> Watermark {
        match self {
            Cursor::Index(n) => Watermark::Page(*n),
            Cursor::Offset(n) => Watermark::Offset(*n),
            Cursor::Token(t) => Watermark::Token(t.clone()),
        }
    }

    /// Cursor stored in a page, offset or token watermark. Timestamps carry
    /// no cursor; a resume point carries the cursor of its next page.
    #[must_use]
    pub fn from_watermark(watermark: &Watermark) -> Option<Self> {
        match watermark {
            Watermark::Page(n) => Some(Cursor::Index(*n)),
            Watermark::Offset(n) => Some(Cursor::Offset(*n)),
            Watermark::Token(t) => Some(Cursor::Token(t.clone())),
            Watermark::Resume(point) => Cursor::from_watermark(&point.next),
            Watermark::Timestamp(_) => None,
        }
    }

    #[must_use]
    pub fn index(&self) -> Option<u32> {
        match self {
            Cursor::Index(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn offset(&self) -> Option<u32> {
        match self {
            Cursor::Offset(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match self {
            Cursor::Token(t) => Some(t),
            _ => None,
        }
    }
}

/// One page of results and the cursor for the page after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<Cursor>,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, next: Option<Cursor>) -> Self {
        Self { items, next }
    }

    /// A final page.
    #[must_use]
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.next.is_none() || self.items.is_empty()
    }

    /// Re-wraps the items while keeping the cursor.
    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next: self.next,
        }
    }
}

/// Next index cursor for page-index APIs that report a page count.
#[must_use]
pub fn next_index(
    current: u32,
    total_pages: Option<u64>,
    returned: usize,
    page_size: u32,
) -> Option<Cursor> {
    if returned == 0 {
        return None;
    }
    match total_pages {
        Some(total) if u64::from(current) >= total => None,
        Some(_) => Some(Cursor::Index(current + 1)),
        None if returned < page_size as usize => None,
        None => Some(Cursor::Index(current + 1)),
    }
}

/// Next offset cursor for offset/limit APIs with an optional total.
#[must_use]
pub fn next_offset(offset: u32, limit: u32, returned: usize, total: Option<u64>) -> Option<Cursor> {
    if returned == 0 {
        return None;
    }
    let next = offset.saturating_add(limit);
    match total {
        Some(total) if u64::from(next) >= total => None,
        None if returned < limit as usize => None,
        _ => Some(Cursor::Offset(next)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_index_uses_total_pages_when_known() {
        assert_eq!(next_index(1, Some(3), 10, 10), Some(Cursor::Index(2)));
        assert_eq!(next_index(3, Some(3), 10, 10), None);
        assert_eq!(next_index(1, None, 4, 10), None);
        assert_eq!(next_index(1, None, 10, 10), Some(Cursor::Index(2)));
        assert_eq!(next_index(1, Some(9), 0, 10), None);
    }

    #[test]
    fn next_offset_respects_total() {
        assert_eq!(next_offset(0, 50, 50, Some(120)), Some(Cursor::Offset(50)));
        assert_eq!(next_offset(100, 50, 20, Some(120)), None);
        assert_eq!(next_offset(0, 50, 50, None), Some(Cursor::Offset(50)));
        assert_eq!(next_offset(0, 50, 49, None), None);
    }

    #[test]
    fn cursor_watermark_conversion() {
        assert_eq!(Cursor::Index(4).to_watermark(), Watermark::Page(4));
        assert_eq!(Cursor::Offset(50).to_watermark(), Watermark::Offset(50));
        assert_eq!(
            Cursor::from_watermark(&Watermark::Offset(50)),
            Some(Cursor::Offset(50))
        );
        assert_eq!(
            Cursor::from_watermark(&Watermark::Token("abc".into())),
            Some(Cursor::Token("abc".into()))
        );
    }
}
