use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Saved position of an incremental sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Watermark {
    /// Last processed source timestamp.
    Timestamp(DateTime<Utc>),
    /// Next page index to fetch.
    Page(u32),
    /// Next row offset to fetch.
    Offset(u32),
    /// Opaque next-page token issued by the vendor.
    Token(String),
    /// Pass interrupted part way; the next run continues it.
    Resume(Box<ResumePoint>),
}

/// Where an interrupted pass stopped.
///
/// The pass is continued with the same time range so offsets and page
/// tokens stay valid, and only once it completes does the entity's
/// timestamp move forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePoint {
    pub since: Option<DateTime<Utc>>,
    pub until: DateTime<Utc>,
    /// Page to fetch next: a `Page`, `Offset` or `Token` watermark.
    pub next: Watermark,
    /// Newest source timestamp stored so far in this pass.
    pub high_water: Option<DateTime<Utc>>,
}

impl Watermark {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Watermark::Timestamp(_) => "timestamp",
            Watermark::Page(_) => "page",
            Watermark::Offset(_) => "offset",
            Watermark::Token(_) => "token",
            Watermark::Resume(_) => "resume",
        }
    }

    /// Text form persisted alongside [`Watermark::kind`].
    #[must_use]
    pub fn value_string(&self) -> String {
        match self {
            Watermark::Timestamp(ts) => ts.to_rfc3339(),
            Watermark::Page(page) | Watermark::Offset(page) => page.to_string(),
            Watermark::Token(token) => token.clone(),
            // Serializing plain data with string keys cannot fail.
            Watermark::Resume(point) => serde_json::to_string(point).unwrap_or_default(),
        }
    }

    /// Rebuild a watermark from its persisted `(kind, value)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidWatermark`] for an unknown kind or a value
    /// that does not parse for its kind.
    pub fn from_parts(kind: &str, value: &str) -> Result<Self, CoreError> {
        let invalid = |reason: String| CoreError::InvalidWatermark {
            kind: kind.to_string(),
            value: value.to_string(),
            reason,
        };
        match kind {
            "timestamp" => DateTime::parse_from_rfc3339(value)
                .map(|ts| Watermark::Timestamp(ts.with_timezone(&Utc)))
                .map_err(|e| invalid(e.to_string())),
            "page" => value
                .parse::<u32>()
                .map(Watermark::Page)
                .map_err(|e| invalid(e.to_string())),
            "offset" => value
                .parse::<u32>()
                .map(Watermark::Offset)
                .map_err(|e| invalid(e.to_string())),
            "token" => Ok(Watermark::Token(value.to_string())),
            "resume" => serde_json::from_str::<ResumePoint>(value)
                .map(|point| Watermark::Resume(Box::new(point)))
                .map_err(|e| invalid(e.to_string())),
            _ => Err(invalid("unknown watermark kind".to_string())),
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Watermark::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_resume(&self) -> Option<&ResumePoint> {
        match self {
            Watermark::Resume(point) => Some(point),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Draft,
    Synced,
    Error,
}

impl SyncState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncState::Draft => "draft",
            SyncState::Synced => "synced",
            SyncState::Error => "error",
        }
    }
}

impl std::str::FromStr for SyncState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(SyncState::Draft),
            "synced" => Ok(SyncState::Synced),
            "error" => Ok(SyncState::Error),
            other => Err(CoreError::InvalidSyncState(other.to_string())),
        }
    }
}

/// Authorization state of a tenant's vendor credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    Pending,
    Authorized,
    Expired,
    Revoked,
    Error,
}

impl AuthStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AuthStatus::Pending => "pending",
            AuthStatus::Authorized => "authorized",
            AuthStatus::Expired => "expired",
            AuthStatus::Revoked => "revoked",
            AuthStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuthStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AuthStatus::Pending),
            "authorized" => Ok(AuthStatus::Authorized),
            "expired" => Ok(AuthStatus::Expired),
            "revoked" => Ok(AuthStatus::Revoked),
            "error" => Ok(AuthStatus::Error),
            other => Err(CoreError::InvalidAuthStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamp_watermark_parses_persisted_value() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
        let wm = Watermark::Timestamp(ts);
        assert_eq!(wm.kind(), "timestamp");
        let parsed = Watermark::from_parts(wm.kind(), &wm.value_string()).unwrap();
        assert_eq!(parsed.as_timestamp(), Some(ts));
    }

    #[test]
    fn page_watermark_rejects_non_numeric_value() {
        let err = Watermark::from_parts("page", "abc").unwrap_err();
        assert!(matches!(err, CoreError::InvalidWatermark { ref kind, .. } if kind == "page"));
    }

    #[test]
    fn unknown_watermark_kind_is_rejected() {
        assert!(Watermark::from_parts("cursor", "10").is_err());
    }

    #[test]
    fn token_watermark_keeps_value_verbatim() {
        let wm = Watermark::from_parts("token", "b2Zmc2V0PTEwMA==").unwrap();
        assert_eq!(wm, Watermark::Token("b2Zmc2V0PTEwMA==".to_string()));
        assert_eq!(wm.as_timestamp(), None);
    }

    #[test]
    fn resume_point_survives_storage() {
        let wm = Watermark::Resume(Box::new(ResumePoint {
            since: Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()),
            until: Utc.with_ymd_and_hms(2025, 3, 1, 0, 6, 0).unwrap(),
            next: Watermark::Offset(100),
            high_water: None,
        }));
        assert_eq!(wm.kind(), "resume");
        let parsed = Watermark::from_parts(wm.kind(), &wm.value_string()).unwrap();
        assert_eq!(parsed, wm);
        assert_eq!(parsed.as_resume().map(|p| &p.next), Some(&Watermark::Offset(100)));
    }

    #[test]
    fn malformed_resume_point_is_rejected() {
        assert!(Watermark::from_parts("resume", "{\"until\":1}").is_err());
    }

    #[test]
    fn sync_state_parses_known_values() {
        assert_eq!("synced".parse::<SyncState>().unwrap(), SyncState::Synced);
        assert!("done".parse::<SyncState>().is_err());
    }

    #[test]
    fn auth_status_display_matches_storage_value() {
        assert_eq!(AuthStatus::Authorized.to_string(), "authorized");
        assert_eq!("expired".parse::<AuthStatus>().unwrap(), AuthStatus::Expired);
    }
}
