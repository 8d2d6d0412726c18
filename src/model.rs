use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Creative type assigned by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DisplayFormat {
    Video,
    Image,
    Dco,
    Carousel,
}

impl DisplayFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "VIDEO" => Some(DisplayFormat::Video),
            "IMAGE" => Some(DisplayFormat::Image),
            "DCO" => Some(DisplayFormat::Dco),
            "CAROUSEL" => Some(DisplayFormat::Carousel),
            _ => None,
        }
    }

    /// Formats whose text and media live in `snapshot.cards[]`.
    pub fn is_multi_card(self) -> bool {
        matches!(self, DisplayFormat::Dco | DisplayFormat::Carousel)
    }
}

/// Whether a creative carries video, image, both or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaMix {
    #[serde(rename = "video-only")]
    VideoOnly,
    #[serde(rename = "image-only")]
    ImageOnly,
    #[serde(rename = "both")]
    Both,
    #[serde(rename = "none")]
    None,
}

impl MediaMix {
    pub fn from_flags(has_video: bool, has_image: bool) -> Self {
        match (has_video, has_image) {
            (true, true) => MediaMix::Both,
            (true, false) => MediaMix::VideoOnly,
            (false, true) => MediaMix::ImageOnly,
            (false, false) => MediaMix::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaMix::VideoOnly => "video-only",
            MediaMix::ImageOnly => "image-only",
            MediaMix::Both => "both",
            MediaMix::None => "none",
        }
    }
}

impl fmt::Display for MediaMix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalizer output awaiting validation.
///
/// Fields copied straight from the feed (ad text included) keep their raw JSON
/// value so the validator can report exactly what arrived; derived fields are typed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdCandidate {
    pub ad_id: Value,
    pub is_active: Value,
    pub start_date_ts: Value,
    pub end_date_ts: Value,
    pub total_active_time_sec: Value,
    pub ad_group_id: Value,
    pub grouped_ads_count: i64,
    pub display_format: Value,
    pub media_mix: MediaMix,
    pub ad_text: Value,
    pub ad_lang_code: String,
}

/// A validated ad record. Field order is the dataset's column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAd {
    pub ad_id: String,
    pub is_active: bool,
    pub start_date_ts: i64,
    pub end_date_ts: Option<i64>,
    pub total_active_time_sec: Option<i64>,
    pub ad_group_id: Option<String>,
    pub grouped_ads_count: i64,
    pub display_format: DisplayFormat,
    pub media_mix: MediaMix,
    pub ad_text: String,
    pub ad_lang_code: String,
}

impl NormalizedAd {
    pub const CSV_HEADERS: [&'static str; 11] = [
        "ad_id",
        "is_active",
        "start_date_ts",
        "end_date_ts",
        "total_active_time_sec",
        "ad_group_id",
        "grouped_ads_count",
        "display_format",
        "media_mix",
        "ad_text",
        "ad_lang_code",
    ];
}

/// A candidate the validator rejected, kept for the validation report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidRecord {
    pub record: AdCandidate,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format_closed_set() {
        assert_eq!(DisplayFormat::parse("CAROUSEL"), Some(DisplayFormat::Carousel));
        assert_eq!(DisplayFormat::parse("carousel"), None);
        assert_eq!(DisplayFormat::parse("SHOPPING"), None);
        assert_eq!(serde_json::to_value(DisplayFormat::Dco).unwrap(), "DCO");
    }

    #[test]
    fn test_media_mix_labels() {
        assert_eq!(MediaMix::from_flags(true, true), MediaMix::Both);
        assert_eq!(MediaMix::from_flags(false, false), MediaMix::None);
        for mix in [MediaMix::VideoOnly, MediaMix::ImageOnly, MediaMix::Both, MediaMix::None] {
            assert_eq!(serde_json::to_value(mix).unwrap(), mix.as_str());
        }
    }
}
