use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Field accessors the feed needs from one entry shape.
///
/// Campus-corner posts and journalist stories share the wire format today, but
/// the controller only ever talks to entries through this trait.
pub trait FeedEntry: DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> i64;
    fn title(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn media(&self) -> &Media;

    fn city(&self) -> &str {
        ""
    }

    fn created_at(&self) -> Option<&str> {
        None
    }

    fn published_at(&self) -> Option<DateTime<Utc>> {
        self.created_at().and_then(parse_timestamp)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Media {
    #[serde(rename = "featureImage", default, deserialize_with = "de::images")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "de::optional_text")]
    pub video: Option<String>,
    #[serde(rename = "video_img", default, deserialize_with = "de::optional_text")]
    pub video_poster: Option<String>,
}

impl Media {
    /// Poster of the video first, then the first image.
    pub fn representative_image(&self) -> Option<&str> {
        self.video_poster
            .as_deref()
            .or_else(|| self.images.first().map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(deserialize_with = "de::id")]
    pub id: i64,
    #[serde(default, deserialize_with = "de::text")]
    pub title: String,
    #[serde(default, deserialize_with = "de::text")]
    pub name: String,
    #[serde(default, deserialize_with = "de::text")]
    pub description: String,
    #[serde(default, deserialize_with = "de::text")]
    pub city: String,
    #[serde(flatten)]
    pub media: Media,
    #[serde(default, deserialize_with = "de::optional_text")]
    pub created_at: Option<String>,
}

impl FeedEntry for Entry {
    fn id(&self) -> i64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn media(&self) -> &Media {
        &self.media
    }

    fn city(&self) -> &str {
        &self.city
    }

    fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }
}

/// Response body of a single-entry request: `{ success, data, last_id }`.
#[derive(Debug, Deserialize)]
pub struct Envelope<E> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<E>,
    #[serde(default, deserialize_with = "de::optional_id")]
    pub last_id: Option<i64>,
}

/// One successfully fetched entry plus the cursor for the one after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<E> {
    pub entry: E,
    pub next_id: Option<i64>,
}

impl<E> Envelope<E> {
    pub fn into_fetched(self) -> crate::error::Result<Fetched<E>> {
        match (self.success, self.data) {
            (true, Some(entry)) => Ok(Fetched {
                entry,
                next_id: self.last_id,
            }),
            _ => Err(crate::error::FeedError::Rejected),
        }
    }
}

/// Accepts RFC 3339 and the backend's `YYYY-MM-DD HH:MM:SS` (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

mod de {
    use log::warn;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        Text(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ImageField {
        List(Vec<Option<String>>),
        Text(String),
    }

    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::Text(s) => s.trim().parse().map_err(D::Error::custom),
        }
    }

    pub fn optional_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        match Option::<NumberOrString>::deserialize(deserializer)? {
            None => Ok(None),
            Some(NumberOrString::Number(n)) => Ok(Some(n)),
            Some(NumberOrString::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(NumberOrString::Text(s)) => s.trim().parse().map(Some).map_err(D::Error::custom),
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
    }

    pub fn optional_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }

    /// `featureImage` arrives as a list, a JSON-encoded list, or a bare path.
    pub fn images<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let paths = match Option::<ImageField>::deserialize(deserializer)? {
            None => Vec::new(),
            Some(ImageField::List(list)) => list,
            Some(ImageField::Text(text)) => {
                let text = text.trim();
                if text.starts_with('[') {
                    serde_json::from_str::<Vec<Option<String>>>(text).unwrap_or_else(|e| {
                        warn!("Ignoring malformed featureImage {:?}: {}", text, e);
                        Vec::new()
                    })
                } else {
                    vec![Some(text.to_string())]
                }
            }
        };

        Ok(paths
            .into_iter()
            .flatten()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    fn decode(value: serde_json::Value) -> Entry {
        serde_json::from_value(value).expect("entry should decode")
    }

    #[test]
    fn decodes_full_entry() {
        let entry = decode(json!({
            "id": 100,
            "title": "Budget session opens",
            "name": "R. Patel",
            "description": "<p>Opening day</p>",
            "city": "Surat",
            "featureImage": ["uploads/a.jpg", "uploads/b.jpg"],
            "video": "uploads/v.mp4",
            "video_img": "uploads/poster.jpg",
            "created_at": "2024-03-05 10:15:00"
        }));

        assert_eq!(entry.id, 100);
        assert_eq!(entry.city, "Surat");
        assert_eq!(entry.media.images, vec!["uploads/a.jpg", "uploads/b.jpg"]);
        assert_eq!(entry.media.video.as_deref(), Some("uploads/v.mp4"));
        assert_eq!(entry.media.representative_image(), Some("uploads/poster.jpg"));

        let published = entry.published_at().unwrap();
        assert_eq!((published.year(), published.month(), published.day()), (2024, 3, 5));
        assert_eq!(published.hour(), 10);
    }

    #[test]
    fn feature_image_accepts_encoded_string() {
        let entry = decode(json!({
            "id": "7",
            "featureImage": "[\"uploads/x.jpg\", \"\"]"
        }));
        assert_eq!(entry.id, 7);
        assert_eq!(entry.media.images, vec!["uploads/x.jpg"]);
        assert_eq!(entry.media.representative_image(), Some("uploads/x.jpg"));
    }

    #[test]
    fn feature_image_accepts_bare_path_and_null() {
        let bare = decode(json!({ "id": 1, "featureImage": "uploads/only.png" }));
        assert_eq!(bare.media.images, vec!["uploads/only.png"]);

        let none = decode(json!({ "id": 2, "featureImage": null, "title": null, "video_img": "" }));
        assert!(none.media.images.is_empty());
        assert_eq!(none.title, "");
        assert_eq!(none.media.representative_image(), None);
    }

    #[test]
    fn malformed_encoded_images_are_dropped() {
        let entry = decode(json!({ "id": 3, "featureImage": "[broken" }));
        assert!(entry.media.images.is_empty());
    }

    #[test]
    fn envelope_yields_entry_and_cursor() {
        let envelope: Envelope<Entry> = serde_json::from_value(json!({
            "success": true,
            "data": { "id": 100, "title": "A" },
            "last_id": "101"
        }))
        .unwrap();

        let fetched = envelope.into_fetched().unwrap();
        assert_eq!(fetched.entry.id, 100);
        assert_eq!(fetched.next_id, Some(101));
    }

    #[test]
    fn unsuccessful_or_empty_envelope_is_rejected() {
        let failed: Envelope<Entry> = serde_json::from_value(json!({ "success": false })).unwrap();
        assert!(failed.into_fetched().is_err());

        let empty: Envelope<Entry> =
            serde_json::from_value(json!({ "success": true, "data": null, "last_id": null })).unwrap();
        assert!(empty.into_fetched().is_err());
    }

    #[test]
    fn parses_rfc3339_timestamps() {
        let parsed = parse_timestamp("2024-01-02T03:04:05.000000Z").unwrap();
        assert_eq!(parsed.minute(), 4);
        assert!(parse_timestamp("yesterday").is_none());
    }
}
