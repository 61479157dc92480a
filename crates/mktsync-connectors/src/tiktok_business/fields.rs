//! TikTok Business field tables and record normalisation.
//!
//! Times arrive as `YYYY-MM-DD HH:MM:SS` text. Enum-like campaign fields are
//! folded to `OTHER` when TikTok returns a value outside the known set.

use mktsync_core::mapping::{lookup, map_fields, parse_datetime_str, Coercion, FieldMap, FieldSpec};
use mktsync_core::NormalizedRecord;
use serde_json::Value;

use crate::str_field;

use Coercion::{Bool, DateTimeString, Float, Integer, JsonText, OneOf, Text};

const OBJECTIVE_TYPES: &[&str] = &[
    "APP_PROMOTION",
    "WEB_CONVERSIONS",
    "REACH",
    "TRAFFIC",
    "VIDEO_VIEWS",
    "PRODUCT_SALES",
    "ENGAGEMENT",
    "LEAD_GENERATION",
    "RF_REACH",
    "TOPVIEW_REACH",
];
const APP_PROMOTION_TYPES: &[&str] = &[
    "APP_INSTALL",
    "APP_RETARGETING",
    "APP_PREREGISTRATION",
    "APP_POSTS_PROMOTION",
    "UNSET",
];
const CAMPAIGN_TYPES: &[&str] = &["REGULAR_CAMPAIGN", "IOS14_CAMPAIGN"];
const BID_ALIGN_TYPES: &[&str] = &["SAND", "SKAN"];
const RF_CAMPAIGN_TYPES: &[&str] = &["STANDARD", "PULSE", "TOPVIEW"];
const BID_TYPES: &[&str] = &["BID_TYPE_NO_BID", "BID_TYPE_CUSTOM"];
const DEEP_BID_TYPES: &[&str] = &[
    "DEFAULT",
    "MIN",
    "PACING",
    "VO_MIN_ROAS",
    "VO_HIGHEST_VALUE",
    "AEO",
];
const SALES_DESTINATIONS: &[&str] = &["TIKTOK_SHOP", "WEBSITE", "APP", "WEB_AND_APP"];
const PROFILE_PAGE_STATES: &[&str] = &["INVALID", "UNSET", "ON", "OFF"];
const PRODUCT_SOURCES: &[&str] = &["CATALOG", "STORE"];
const OPTIMIZATION_GOALS: &[&str] = &[
    "CLICK",
    "CONVERT",
    "INSTALL",
    "IN_APP_EVENT",
    "SHOW",
    "REACH",
    "LEAD_GENERATION",
    "CONVERSATION",
    "FOLLOWERS",
    "PAGE_VISIT",
    "VALUE",
    "AUTOMATIC_VALUE_OPTIMIZATION",
    "GMV",
    "PURCHASES",
    "INITIATE_CHECKOUTS",
    "MT_LIVE_ROOM",
    "PRODUCT_CLICK_IN_LIVE",
    "ENGAGED_VIEW",
    "ENGAGED_VIEW_FIFTEEN",
    "TRAFFIC_LANDING_PAGE_VIEW",
    "DESTINATION_VISIT",
    "PREFERRED_LEAD",
];
const BUDGET_MODES: &[&str] = &[
    "BUDGET_MODE_INFINITE",
    "BUDGET_MODE_TOTAL",
    "BUDGET_MODE_DAY",
    "BUDGET_MODE_DYNAMIC_DAILY_BUDGET",
];
const OPERATION_STATUSES: &[&str] = &["ENABLE", "DISABLE"];
const CAMPAIGN_SECONDARY_STATUSES: &[&str] = &[
    "CAMPAIGN_STATUS_DELETE",
    "CAMPAIGN_STATUS_ADVERTISER_AUDIT_DENY",
    "CAMPAIGN_STATUS_ADVERTISER_AUDIT",
    "ADVERTISER_CONTRACT_PENDING",
    "ADVERTISER_ACCOUNT_PUNISH",
    "CAMPAIGN_STATUS_BUDGET_EXCEED",
    "CAMPAIGN_STATUS_DISABLE",
    "CAMPAIGN_STATUS_AWAITING_RELEASE",
    "CAMPAIGN_STATUS_IDENTITY_USED_BY_GMV_MAX_AD",
    "CAMPAIGN_STATUS_ENABLE",
    "CAMPAIGN_STATUS_ALL",
    "CAMPAIGN_STATUS_NOT_DELETE",
    "CAMPAIGN_STATUS_TTS_TT_ASSET_UNAVAILABLE",
    "CAMPAIGN_STATUS_TTS_TT_IDENTITY_UNAVAILABLE",
    "CAMPAIGN_STATUS_TIKTOK_SHOP_UNAVAILABLE",
    "CAMPAIGN_STATUS_REVIEW_DISAPPROVED",
    "CAMPAIGN_STATUS_AD_UNAVAILABLE",
    "CAMPAIGN_STATUS_PRODUCT_UNAVAILABLE",
    "CAMPAIGN_STATUS_LIVE_GMV_MAX_AUTHORIZATION_CANCEL",
    "CAMPAIGN_STATUS_PRODUCT_GMV_MAX_AUTHORIZATION_CANCEL",
    "CAMPAIGN_STATUS_IDENTITY_USED_BY_LIVE_GMV_MAX",
    "CAMPAIGN_STATUS_PRODUCT_USED_BY_PRODUCT_GMV_MAX",
];

pub const ADVERTISER_FIELDS: &FieldMap = &[
    FieldSpec::same("advertiser_id", Text),
    FieldSpec::same("name", Text),
    FieldSpec::same("company", Text),
    FieldSpec::same("status", Text),
    FieldSpec::same("role", Text),
    FieldSpec::same("currency", Text),
    FieldSpec::same("timezone", Text),
    FieldSpec::same("country", Text),
    FieldSpec::same("balance", Float),
    FieldSpec::same("create_time", Coercion::UnixSeconds),
];

pub const CAMPAIGN_FIELDS: &FieldMap = &[
    FieldSpec::same("advertiser_id", Text),
    FieldSpec::same("campaign_id", Text),
    FieldSpec::same("campaign_name", Text),
    FieldSpec::same("campaign_system_origin", Text),
    FieldSpec::same("create_time", DateTimeString),
    FieldSpec::same("modify_time", DateTimeString),
    FieldSpec::same("objective", Text),
    FieldSpec::same("objective_type", OneOf(OBJECTIVE_TYPES)),
    FieldSpec::same("app_promotion_type", OneOf(APP_PROMOTION_TYPES)),
    FieldSpec::same("virtual_objective_type", Text),
    FieldSpec::same("sales_destination", OneOf(SALES_DESTINATIONS)),
    FieldSpec::same("is_search_campaign", Bool),
    FieldSpec::same("is_smart_performance_campaign", Bool),
    FieldSpec::same("campaign_type", OneOf(CAMPAIGN_TYPES)),
    FieldSpec::same("app_id", Text),
    FieldSpec::same("is_advanced_dedicated_campaign", Bool),
    FieldSpec::same("disable_skan_campaign", Bool),
    FieldSpec::same("bid_align_type", OneOf(BID_ALIGN_TYPES)),
    FieldSpec::same("campaign_app_profile_page_state", OneOf(PROFILE_PAGE_STATES)),
    FieldSpec::same("rf_campaign_type", OneOf(RF_CAMPAIGN_TYPES)),
    FieldSpec::same("campaign_product_source", OneOf(PRODUCT_SOURCES)),
    FieldSpec::same("catalog_enabled", Bool),
    FieldSpec::same("special_industries", JsonText),
    FieldSpec::same("budget_optimize_on", Bool),
    FieldSpec::same("bid_type", OneOf(BID_TYPES)),
    FieldSpec::same("deep_bid_type", OneOf(DEEP_BID_TYPES)),
    FieldSpec::same("roas_bid", Float),
    FieldSpec::same("optimization_goal", OneOf(OPTIMIZATION_GOALS)),
    FieldSpec::same("budget_mode", OneOf(BUDGET_MODES)),
    FieldSpec::same("budget", Float),
    FieldSpec::same("rta_id", Text),
    FieldSpec::same("rta_bid_enabled", Bool),
    FieldSpec::same("rta_product_selection_enabled", Bool),
    FieldSpec::same("operation_status", OneOf(OPERATION_STATUSES)),
    FieldSpec::same("secondary_status", OneOf(CAMPAIGN_SECONDARY_STATUSES)),
    FieldSpec::same("postback_window_mode", Text),
    FieldSpec::same("is_new_structure", Bool),
];

pub const AD_GROUP_FIELDS: &FieldMap = &[
    FieldSpec::same("advertiser_id", Text),
    FieldSpec::same("campaign_id", Text),
    FieldSpec::same("campaign_name", Text),
    FieldSpec::same("campaign_system_origin", Text),
    FieldSpec::same("is_smart_performance_campaign", Bool),
    FieldSpec::same("adgroup_id", Text),
    FieldSpec::same("adgroup_name", Text),
    FieldSpec::same("create_time", DateTimeString),
    FieldSpec::same("modify_time", DateTimeString),
    FieldSpec::same("shopping_ads_type", Text),
    FieldSpec::same("identity_id", Text),
    FieldSpec::same("identity_type", Text),
    FieldSpec::same("product_source", Text),
    FieldSpec::same("catalog_id", Text),
    FieldSpec::same("store_id", Text),
    FieldSpec::same("promotion_type", Text),
    FieldSpec::same("promotion_target_type", Text),
    FieldSpec::same("app_id", Text),
    FieldSpec::same("app_type", Text),
    FieldSpec::same("pixel_id", Text),
    FieldSpec::same("optimization_event", Text),
    FieldSpec::same("app_config", JsonText),
    FieldSpec::same("placement_type", Text),
    FieldSpec::same("placements", JsonText),
    FieldSpec::same("tiktok_subplacements", JsonText),
    FieldSpec::same("search_result_enabled", Bool),
    FieldSpec::same("automated_keywords_enabled", Bool),
    FieldSpec::same("search_keywords", JsonText),
    FieldSpec::same("comment_disabled", Bool),
    FieldSpec::same("video_download_disabled", Bool),
    FieldSpec::same("share_disabled", Bool),
    FieldSpec::same("audience_type", Text),
    FieldSpec::same("audience_rule", JsonText),
    FieldSpec::same("location_ids", JsonText),
    FieldSpec::same("zipcode_ids", JsonText),
    FieldSpec::same("languages", JsonText),
    FieldSpec::same("gender", Text),
    FieldSpec::same("age_groups", JsonText),
    FieldSpec::same("spending_power", Text),
    FieldSpec::same("household_income", JsonText),
    FieldSpec::same("audience_ids", JsonText),
    FieldSpec::same("excluded_audience_ids", JsonText),
    FieldSpec::same("smart_audience_enabled", Bool),
    FieldSpec::same("interest_category_ids", JsonText),
    FieldSpec::same("interest_keyword_ids", JsonText),
    FieldSpec::same("purchase_intention_keyword_ids", JsonText),
    FieldSpec::same("actions", JsonText),
    FieldSpec::same("smart_interest_behavior_enabled", Bool),
    FieldSpec::same("operating_systems", JsonText),
    FieldSpec::same("device_model_ids", JsonText),
    FieldSpec::same("network_types", JsonText),
    FieldSpec::same("carrier_ids", JsonText),
    FieldSpec::same("isp_ids", JsonText),
    FieldSpec::same("device_price_ranges", JsonText),
    FieldSpec::same("contextual_tag_ids", JsonText),
    FieldSpec::same("category_exclusion_ids", JsonText),
    FieldSpec::same("brand_safety_type", Text),
    FieldSpec::same("budget_mode", Text),
    FieldSpec::same("budget", Float),
    FieldSpec::same("scheduled_budget", Float),
    FieldSpec::same("schedule_type", Text),
    FieldSpec::same("schedule_start_time", DateTimeString),
    FieldSpec::same("schedule_end_time", DateTimeString),
    FieldSpec::same("schedule_infos", JsonText),
    FieldSpec::same("delivery_mode", Text),
    FieldSpec::same("dayparting", Text),
    FieldSpec::same("optimization_goal", Text),
    FieldSpec::same("secondary_optimization_event", Text),
    FieldSpec::same("frequency", Float),
    FieldSpec::same("frequency_schedule", Float),
    FieldSpec::same("bid_type", Text),
    FieldSpec::same("bid_price", Float),
    FieldSpec::same("conversion_bid_price", Float),
    FieldSpec::same("deep_bid_type", Text),
    FieldSpec::same("roas_bid", Float),
    FieldSpec::same("deep_cpa_bid", Float),
    FieldSpec::same("billing_event", Text),
    FieldSpec::same("pacing", Text),
    FieldSpec::same("operation_status", Text),
    FieldSpec::same("secondary_status", Text),
    FieldSpec::same("statistic_type", Text),
    FieldSpec::same("is_hfss", Bool),
    FieldSpec::same("creative_material_mode", Text),
    FieldSpec::same("feed_type", Text),
    FieldSpec::same("split_test_group_id", Text),
    FieldSpec::same("split_test_status", Text),
];

pub const AD_FIELDS: &FieldMap = &[
    FieldSpec::same("advertiser_id", Text),
    FieldSpec::same("campaign_id", Text),
    FieldSpec::same("campaign_name", Text),
    FieldSpec::same("campaign_system_origin", Text),
    FieldSpec::same("adgroup_id", Text),
    FieldSpec::same("adgroup_name", Text),
    FieldSpec::same("ad_id", Text),
    FieldSpec::same("ad_name", Text),
    FieldSpec::same("create_time", DateTimeString),
    FieldSpec::same("modify_time", DateTimeString),
    FieldSpec::same("identity_id", Text),
    FieldSpec::same("identity_type", Text),
    FieldSpec::same("catalog_id", Text),
    FieldSpec::same("product_specific_type", Text),
    FieldSpec::same("item_group_ids", JsonText),
    FieldSpec::same("product_set_id", Text),
    FieldSpec::same("sku_ids", JsonText),
    FieldSpec::same("vehicle_ids", JsonText),
    FieldSpec::same("showcase_products", JsonText),
    FieldSpec::same("ad_format", Text),
    FieldSpec::same("vertical_video_strategy", Text),
    FieldSpec::same("dynamic_format", Text),
    FieldSpec::same("video_id", Text),
    FieldSpec::same("image_ids", JsonText),
    FieldSpec::same("carousel_image_index", Integer),
    FieldSpec::same("end_card_cta", Text),
    FieldSpec::same("auto_disclaimer_types", JsonText),
    FieldSpec::same("product_display_field_list", JsonText),
    FieldSpec::same("music_id", Text),
    FieldSpec::same("tiktok_item_id", Text),
    FieldSpec::same("promotional_music_disabled", Bool),
    FieldSpec::same("dark_post_status", Text),
    FieldSpec::same("branded_content_disabled", Bool),
    FieldSpec::same("ad_text", Text),
    FieldSpec::same("ad_texts", JsonText),
    FieldSpec::same("call_to_action", Text),
    FieldSpec::same("call_to_action_id", Text),
    FieldSpec::same("card_id", Text),
    FieldSpec::same("landing_page_url", Text),
    FieldSpec::same("utm_params", JsonText),
    FieldSpec::same("page_id", Text),
    FieldSpec::same("deeplink", Text),
    FieldSpec::same("deeplink_type", Text),
    FieldSpec::same("deeplink_utm_params", JsonText),
    FieldSpec::same("fallback_type", Text),
    FieldSpec::same("disclaimer_type", Text),
    FieldSpec::same("disclaimer_text", JsonText),
    FieldSpec::same("disclaimer_clickable_texts", JsonText),
    FieldSpec::same("tracking_pixel_id", Text),
    FieldSpec::same("tracking_app_id", Text),
    FieldSpec::same("tracking_offline_event_set_ids", JsonText),
    FieldSpec::same("impression_tracking_url", Text),
    FieldSpec::same("click_tracking_url", Text),
    FieldSpec::same("playable_url", Text),
    FieldSpec::same("operation_status", Text),
    FieldSpec::same("secondary_status", Text),
    FieldSpec::same("creative_type", Text),
    FieldSpec::same("app_name", Text),
    FieldSpec::same("display_name", Text),
    FieldSpec::same("profile_image_url", Text),
    FieldSpec::same("creative_authorized", Bool),
    FieldSpec::same("is_aco", Bool),
    FieldSpec::same("is_new_structure", Bool),
    FieldSpec::same("optimization_event", Text),
];

fn normalize(
    raw: &Value,
    id_key: &str,
    map: &FieldMap,
    parent_key: Option<&str>,
) -> Option<NormalizedRecord> {
    let id = str_field(raw, id_key)?;
    let modified = lookup(raw, "modify_time")
        .and_then(Value::as_str)
        .and_then(parse_datetime_str);
    Some(
        NormalizedRecord::new(id, map_fields(raw, map), raw.clone())
            .with_updated_at(modified)
            .with_parent(parent_key.and_then(|key| str_field(raw, key))),
    )
}

#[must_use]
pub fn normalize_advertiser(raw: &Value) -> Option<NormalizedRecord> {
    normalize(raw, "advertiser_id", ADVERTISER_FIELDS, None)
}

#[must_use]
pub fn normalize_campaign(raw: &Value) -> Option<NormalizedRecord> {
    normalize(raw, "campaign_id", CAMPAIGN_FIELDS, Some("advertiser_id"))
}

/// Ad group, parented to its campaign.
#[must_use]
pub fn normalize_ad_group(raw: &Value) -> Option<NormalizedRecord> {
    normalize(raw, "adgroup_id", AD_GROUP_FIELDS, Some("campaign_id"))
}

/// Ad, parented to its ad group.
#[must_use]
pub fn normalize_ad(raw: &Value) -> Option<NormalizedRecord> {
    normalize(raw, "ad_id", AD_FIELDS, Some("adgroup_id"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn campaign_folds_unknown_enums_and_parses_times() {
        let raw = json!({
            "advertiser_id": "700",
            "campaign_id": 1_800_000_000_000_000_i64,
            "campaign_name": "Spring",
            "objective_type": "PRODUCT_SALES",
            "budget_mode": "BUDGET_MODE_SOMETHING_NEW",
            "special_industries": ["HOUSING"],
            "budget": "50.5",
            "create_time": "2025-06-15 12:27:17",
            "modify_time": "2025-06-16 08:00:00"
        });

        let record = normalize_campaign(&raw).unwrap();
        assert_eq!(record.external_id, "1800000000000000");
        assert_eq!(record.parent_external_id.as_deref(), Some("700"));
        assert_eq!(record.fields["objective_type"], "PRODUCT_SALES");
        assert_eq!(record.fields["budget_mode"], "OTHER");
        assert_eq!(record.fields["special_industries"], r#"["HOUSING"]"#);
        assert_eq!(record.fields["budget"], 50.5);
        assert_eq!(record.fields["create_time"], "2025-06-15T12:27:17Z");
        assert_eq!(
            record.source_updated_at.map(|d| d.to_rfc3339()),
            Some("2025-06-16T08:00:00+00:00".to_owned())
        );
    }

    #[test]
    fn ad_group_lists_become_json_text() {
        let raw = json!({
            "adgroup_id": "g1",
            "campaign_id": "c1",
            "placements": ["PLACEMENT_TIKTOK"],
            "age_groups": [],
            "schedule_end_time": ""
        });
        let record = normalize_ad_group(&raw).unwrap();
        assert_eq!(record.parent_external_id.as_deref(), Some("c1"));
        assert_eq!(record.fields["placements"], r#"["PLACEMENT_TIKTOK"]"#);
        assert_eq!(record.fields["age_groups"], "[]");
        assert_eq!(record.fields["schedule_end_time"], Value::Null);
    }

    #[test]
    fn ad_without_id_is_skipped() {
        assert!(normalize_ad(&json!({ "ad_name": "orphan" })).is_none());
    }
}
