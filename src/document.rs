//! The document shape stored in the search index.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Keyword flags describing what a status contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchableProperty {
    Image,
    Video,
    Audio,
    Media,
    Poll,
    Link,
    Embed,
    Sensitive,
    Reply,
}

impl SearchableProperty {
    pub const ALL: [SearchableProperty; 9] = [
        SearchableProperty::Image,
        SearchableProperty::Video,
        SearchableProperty::Audio,
        SearchableProperty::Media,
        SearchableProperty::Poll,
        SearchableProperty::Link,
        SearchableProperty::Embed,
        SearchableProperty::Sensitive,
        SearchableProperty::Reply,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchableProperty::Image => "image",
            SearchableProperty::Video => "video",
            SearchableProperty::Audio => "audio",
            SearchableProperty::Media => "media",
            SearchableProperty::Poll => "poll",
            SearchableProperty::Link => "link",
            SearchableProperty::Embed => "embed",
            SearchableProperty::Sensitive => "sensitive",
            SearchableProperty::Reply => "reply",
        }
    }
}

/// Earliest date the engine can store: `0000-01-01T00:00:00Z`.
pub fn min_indexable_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Latest date the engine can store: `9999-12-31T23:59:59Z`.
pub fn max_indexable_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Clamp a timestamp into the engine's representable date range.
///
/// Monotonic: `a <= b` implies `clamp_date(a) <= clamp_date(b)`.
pub fn clamp_date(datetime: DateTime<Utc>) -> DateTime<Utc> {
    datetime.clamp(min_indexable_date(), max_indexable_date())
}

/// The denormalized projection of a status written to the index.
///
/// `text` is indexed twice by the engine: lightly under `text` and with
/// heavy stemming under the `text.stemmed` sub-field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub id: i64,
    pub account_id: i64,
    pub text: String,
    pub tags: Vec<String>,
    pub searchable_by: Vec<i64>,
    pub language: Option<String>,
    pub properties: Vec<SearchableProperty>,
    pub created_at: DateTime<Utc>,
}

impl IndexDocument {
    /// The document as the JSON body sent to the engine.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "account_id": self.account_id,
            "text": self.text,
            "tags": self.tags,
            "searchable_by": self.searchable_by,
            "language": self.language,
            "properties": self.properties.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
            "created_at": format_date(&self.created_at),
        })
    }

    pub fn has_property(&self, property: SearchableProperty) -> bool {
        self.properties.contains(&property)
    }
}

/// Format a clamped date the way the engine's `date` type expects.
pub fn format_date(datetime: &DateTime<Utc>) -> String {
    datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_clamp_in_range_is_identity() {
        let now = Utc::now();
        assert_eq!(clamp_date(now), now);
    }

    #[test]
    fn test_clamp_out_of_range() {
        let ancient = Utc.with_ymd_and_hms(-500, 3, 1, 0, 0, 0).unwrap();
        let far = Utc.with_ymd_and_hms(12000, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(clamp_date(ancient), min_indexable_date());
        assert_eq!(clamp_date(far), max_indexable_date());
        assert_eq!(format_date(&clamp_date(ancient)), "0000-01-01T00:00:00Z");
        assert_eq!(format_date(&clamp_date(far)), "9999-12-31T23:59:59Z");
    }

    #[test]
    fn test_clamp_is_monotonic() {
        let base = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let samples = [
            DateTime::<Utc>::MIN_UTC,
            min_indexable_date() - Duration::seconds(1),
            min_indexable_date(),
            base,
            base + Duration::days(1),
            max_indexable_date(),
            max_indexable_date() + Duration::days(3),
            DateTime::<Utc>::MAX_UTC,
        ];
        for a in samples {
            for b in samples {
                if a <= b {
                    assert!(clamp_date(a) <= clamp_date(b));
                }
            }
        }
    }

    #[test]
    fn test_json_shape() {
        let doc = IndexDocument {
            id: 1,
            account_id: 2,
            text: "hello".into(),
            tags: vec!["Rust".into()],
            searchable_by: vec![2],
            language: None,
            properties: vec![SearchableProperty::Reply],
            created_at: Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
        };
        let json = doc.to_json();
        assert_eq!(json["properties"][0], "reply");
        assert_eq!(json["created_at"], "2024-05-06T07:08:09Z");
        assert!(json["language"].is_null());
    }
}
