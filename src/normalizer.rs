//! Record normalizer: raw feed ads of every creative shape into one schema.

use serde_json::Value;
use tracing::{error, info};

use crate::error::NormalizeError;
use crate::lang::detect_language;
use crate::locator::{is_populated, RawAdGroup};
use crate::model::{AdCandidate, DisplayFormat, MediaMix};

fn field(ad: &Value, key: &str) -> Value {
    ad.get(key).cloned().unwrap_or(Value::Null)
}

fn ad_label(ad: &Value) -> String {
    match ad.get("ad_archive_id") {
        Some(Value::String(id)) => id.clone(),
        Some(other) if !other.is_null() => other.to_string(),
        _ => "unknown".to_string(),
    }
}

fn cards(ad: &Value) -> &[Value] {
    ad.pointer("/snapshot/cards")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// VIDEO and IMAGE are fixed; multi-card formats are classified from their cards.
pub fn get_media_mix(ad: &Value, display_format: Option<DisplayFormat>) -> MediaMix {
    match display_format {
        Some(DisplayFormat::Video) => MediaMix::VideoOnly,
        Some(DisplayFormat::Image) => MediaMix::ImageOnly,
        Some(DisplayFormat::Dco) | Some(DisplayFormat::Carousel) => {
            let cards = cards(ad);
            let has_video = cards.iter().any(|card| card.get("video_hd_url").is_some_and(is_populated));
            let has_image = cards
                .iter()
                .any(|card| card.get("original_image_url").is_some_and(is_populated));
            MediaMix::from_flags(has_video, has_image)
        }
        None => MediaMix::None,
    }
}

/// Body of the first card for multi-card formats, `snapshot.body.text` otherwise.
///
/// `None` only when the path is missing. A value that is present is returned
/// as-is, `null` included, and left for the validator to judge.
pub fn get_ad_text(ad: &Value, display_format: Option<DisplayFormat>) -> Option<Value> {
    let text = if display_format.is_some_and(DisplayFormat::is_multi_card) {
        cards(ad).first()?.get("body")?
    } else {
        ad.pointer("/snapshot/body/text")?
    };
    Some(text.clone())
}

/// Normalize one raw ad.
///
/// `group_collation_count` is the running maximum of `collation_count` across
/// the ads of the current group processed so far; it is updated in place and
/// its new value becomes this ad's `grouped_ads_count`.
pub fn parse_ad(ad: &Value, group_collation_count: &mut i64) -> Result<AdCandidate, NormalizeError> {
    if !ad.is_object() {
        return Err(NormalizeError::NotAnObject);
    }

    let collation_count = ad.get("collation_count").and_then(Value::as_i64).unwrap_or(0);
    *group_collation_count = (*group_collation_count).max(collation_count);

    let raw_format = ad.pointer("/snapshot/display_format").cloned().unwrap_or(Value::Null);
    let display_format = raw_format.as_str().and_then(DisplayFormat::parse);

    let media_mix = get_media_mix(ad, display_format);

    let ad_text = get_ad_text(ad, display_format).unwrap_or_else(|| {
        error!("Couldn't find ad text in raw data {}", ad_label(ad));
        Value::String(String::new())
    });
    let ad_lang_code = detect_language(ad_text.as_str().unwrap_or_default());

    Ok(AdCandidate {
        ad_id: field(ad, "ad_archive_id"),
        is_active: field(ad, "is_active"),
        start_date_ts: field(ad, "start_date"),
        end_date_ts: field(ad, "end_date"),
        total_active_time_sec: field(ad, "total_active_time"),
        ad_group_id: field(ad, "collation_id"),
        grouped_ads_count: *group_collation_count,
        display_format: raw_format,
        media_mix,
        ad_text,
        ad_lang_code,
    })
}

/// Normalize every ad of one group. Ads that can't be parsed are logged and skipped.
pub fn parse_ad_group(ad_group: &[Value]) -> Vec<AdCandidate> {
    let mut group_collation_count = 0;

    ad_group
        .iter()
        .filter_map(|ad| match parse_ad(ad, &mut group_collation_count) {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                error!(ad_id = %ad_label(ad), "Error parsing ad: {}", e);
                None
            }
        })
        .collect()
}

/// Normalize all groups, each with its own running collation count.
pub fn normalize_groups(groups: &[RawAdGroup]) -> Vec<AdCandidate> {
    let parsed: Vec<AdCandidate> = groups.iter().flat_map(|group| parse_ad_group(group)).collect();
    info!("Parsed {} ads from {} ad groups", parsed.len(), groups.len());
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn image_ad() -> Value {
        json!({
            "ad_archive_id": "1001",
            "is_active": true,
            "start_date": 1700000000,
            "end_date": null,
            "total_active_time": null,
            "collation_id": "g-1",
            "collation_count": 3,
            "snapshot": { "display_format": "IMAGE", "body": { "text": "Buy now" } }
        })
    }

    fn card_ad(format: &str, cards: Value) -> Value {
        json!({
            "ad_archive_id": "2002",
            "is_active": true,
            "start_date": 1700000000,
            "snapshot": { "display_format": format, "cards": cards }
        })
    }

    #[test]
    fn test_image_ad() {
        let mut count = 0;
        let candidate = parse_ad(&image_ad(), &mut count).unwrap();

        assert_eq!(candidate.ad_id, json!("1001"));
        assert_eq!(candidate.media_mix, MediaMix::ImageOnly);
        assert_eq!(candidate.ad_text, "Buy now");
        assert_eq!(candidate.end_date_ts, Value::Null);
        assert_eq!(candidate.ad_group_id, json!("g-1"));
        assert_eq!(candidate.grouped_ads_count, 3);
        assert_eq!(candidate.ad_lang_code, detect_language("Buy now"));
    }

    #[test]
    fn test_video_ignores_cards() {
        let mut ad = card_ad("VIDEO", json!([{ "original_image_url": "https://img" }]));
        ad["snapshot"]["body"] = json!({ "text": "Watch this" });
        let candidate = parse_ad(&ad, &mut 0).unwrap();
        assert_eq!(candidate.media_mix, MediaMix::VideoOnly);
        assert_eq!(candidate.ad_text, "Watch this");
    }

    #[test]
    fn test_multi_card_media_mix() {
        let both = card_ad(
            "DCO",
            json!([
                { "body": "first", "video_hd_url": "https://video" },
                { "body": "second", "original_image_url": "https://img" }
            ]),
        );
        let images = card_ad("CAROUSEL", json!([{ "original_image_url": "https://img", "video_hd_url": "" }]));
        let empty = card_ad("CAROUSEL", json!([{ "body": "x", "video_hd_url": null }]));

        assert_eq!(parse_ad(&both, &mut 0).unwrap().media_mix, MediaMix::Both);
        assert_eq!(parse_ad(&images, &mut 0).unwrap().media_mix, MediaMix::ImageOnly);
        assert_eq!(parse_ad(&empty, &mut 0).unwrap().media_mix, MediaMix::None);
    }

    #[test]
    fn test_multi_card_text_is_first_card_only() {
        let ad = card_ad("DCO", json!([{ "body": "first card" }, { "body": "second card" }]));
        assert_eq!(parse_ad(&ad, &mut 0).unwrap().ad_text, "first card");

        let nested = card_ad("CAROUSEL", json!([{ "body": { "text": "nested body" } }]));
        assert_eq!(parse_ad(&nested, &mut 0).unwrap().ad_text, json!({ "text": "nested body" }));
    }

    #[test]
    fn test_missing_text_falls_back_to_empty() {
        let no_cards = card_ad("DCO", json!([]));
        let candidate = parse_ad(&no_cards, &mut 0).unwrap();
        assert_eq!(candidate.ad_text, "");
        assert_eq!(candidate.ad_lang_code, "undetected");

        let mut no_body = image_ad();
        no_body["snapshot"].as_object_mut().unwrap().remove("body");
        assert_eq!(parse_ad(&no_body, &mut 0).unwrap().ad_text, "");

        let mut body_not_object = image_ad();
        body_not_object["snapshot"]["body"] = json!(null);
        assert_eq!(parse_ad(&body_not_object, &mut 0).unwrap().ad_text, "");

        let card_without_body = card_ad("CAROUSEL", json!([{ "original_image_url": "https://img" }]));
        assert_eq!(parse_ad(&card_without_body, &mut 0).unwrap().ad_text, "");
    }

    #[test]
    fn test_present_but_mistyped_text_is_rejected() {
        let mut null_text = image_ad();
        null_text["snapshot"]["body"]["text"] = json!(null);
        let mut null_card_body = card_ad("DCO", json!([{ "body": null, "video_hd_url": "v" }]));
        null_card_body["ad_archive_id"] = json!("2003");
        let object_card_body = card_ad("CAROUSEL", json!([{ "body": { "text": "nested" } }]));

        let parsed = parse_ad_group(&[null_text, null_card_body, object_card_body]);
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].ad_text, Value::Null);
        assert_eq!(parsed[1].ad_text, Value::Null);
        assert!(parsed.iter().all(|c| c.ad_lang_code == "undetected"));

        let outcome = crate::validator::validate_all(parsed);
        assert!(outcome.valid.is_empty());
        assert_eq!(outcome.invalid.len(), 3);
        assert!(outcome
            .invalid
            .iter()
            .all(|invalid| invalid.reason.contains("ad_text must be a string")));
    }

    #[test]
    fn test_unknown_format_still_produces_candidate() {
        let mut ad = image_ad();
        ad["snapshot"]["display_format"] = json!("SHOPPING");
        let candidate = parse_ad(&ad, &mut 0).unwrap();
        assert_eq!(candidate.display_format, json!("SHOPPING"));
        assert_eq!(candidate.media_mix, MediaMix::None);
        assert_eq!(candidate.ad_text, "Buy now");
    }

    #[test]
    fn test_grouped_count_is_running_max_within_group() {
        let counts = [json!(2), json!(null), json!(5), json!(3)];
        let group: Vec<Value> = counts
            .iter()
            .enumerate()
            .map(|(i, count)| {
                let mut ad = image_ad();
                ad["ad_archive_id"] = json!(i.to_string());
                ad["collation_count"] = count.clone();
                ad
            })
            .collect();

        let grouped: Vec<i64> = parse_ad_group(&group).iter().map(|c| c.grouped_ads_count).collect();
        assert_eq!(grouped, vec![2, 2, 5, 5]);
        assert!(grouped.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_grouped_count_resets_per_group() {
        let mut big = image_ad();
        big["collation_count"] = json!(9);
        let mut small = image_ad();
        small["collation_count"] = json!(1);

        let parsed = normalize_groups(&[vec![big], vec![small]]);
        assert_eq!(parsed[0].grouped_ads_count, 9);
        assert_eq!(parsed[1].grouped_ads_count, 1);
    }

    #[test]
    fn test_bad_ad_is_skipped_siblings_proceed() {
        let group = vec![json!("not an ad"), image_ad(), json!(null)];
        let parsed = parse_ad_group(&group);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].ad_id, json!("1001"));
    }

    #[test]
    fn test_normalization_is_pure() {
        let ad = card_ad("DCO", json!([{ "body": "Same every time", "video_hd_url": "v" }]));
        assert_eq!(parse_ad(&ad, &mut 0).unwrap(), parse_ad(&ad, &mut 0).unwrap());
    }
}
