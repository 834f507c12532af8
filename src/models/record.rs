use rusqlite::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

const TITLE_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 1000;
const USERNAME_MAX: usize = 100;
const URL_MAX: usize = 1000;
const IMAGE_MAX: usize = 1000;
const SOURCE_MAX: usize = 1000;
const VIDEO_ID_MAX: usize = 64;

/// One stored entry of a collection. The same shape is produced by every backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub username: String,
    pub url: String,
    pub source: Option<String>,
    pub image: String,
    #[serde(rename = "videoId", alias = "video_id")]
    pub video_id: Option<String>,
    pub updated_at: Option<String>,
}

/// Caller-supplied fields of a record; ids and timestamps are assigned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecordForm {
    pub title: String,
    pub description: String,
    pub username: String,
    pub url: String,
    pub source: Option<String>,
    pub image: String,
    #[serde(rename = "videoId", alias = "video_id")]
    pub video_id: Option<String>,
}

impl Record {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Record {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            username: row.get("username")?,
            url: row.get("url")?,
            source: row.get("source")?,
            image: row.get("image")?,
            video_id: row.get("video_id")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Build a record from one element of a collection file, field by field.
    /// Missing, null or non-string fields fall back to their defaults and the stored
    /// `id` is ignored, so one bad entry never hides the rest of the file.
    pub fn from_value(value: &Value, id: i64) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        Record {
            id,
            title: text("title").unwrap_or_default(),
            description: text("description").unwrap_or_default(),
            username: text("username").unwrap_or_default(),
            url: text("url").unwrap_or_default(),
            source: text("source"),
            image: text("image").unwrap_or_default(),
            video_id: text("videoId").or_else(|| text("video_id")),
            updated_at: text("updated_at"),
        }
    }

    pub fn to_form(&self) -> RecordForm {
        RecordForm {
            title: self.title.clone(),
            description: self.description.clone(),
            username: self.username.clone(),
            url: self.url.clone(),
            source: self.source.clone(),
            image: self.image.clone(),
            video_id: self.video_id.clone(),
        }
    }
}

impl RecordForm {
    /// Trim every field, clamp lengths, and turn blank optionals into `None`.
    pub fn normalized(&self) -> RecordForm {
        RecordForm {
            title: clamp(&self.title, TITLE_MAX),
            description: clamp(&self.description, DESCRIPTION_MAX),
            username: clamp(&self.username, USERNAME_MAX),
            url: clamp(&self.url, URL_MAX),
            source: optional(self.source.as_deref(), SOURCE_MAX),
            image: clamp(&self.image, IMAGE_MAX),
            video_id: optional(self.video_id.as_deref(), VIDEO_ID_MAX),
        }
    }

    /// Fails on the first required field that is empty.
    pub fn validate(&self) -> StoreResult<()> {
        let required = [
            ("title", &self.title),
            ("description", &self.description),
            ("username", &self.username),
            ("url", &self.url),
            ("image", &self.image),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(StoreError::Validation { field });
            }
        }
        Ok(())
    }

    /// Normalize, then validate. Everything that writes goes through here first.
    pub fn checked(&self) -> StoreResult<RecordForm> {
        let form = self.normalized();
        form.validate()?;
        Ok(form)
    }

    pub fn into_record(self, id: i64, updated_at: Option<String>) -> Record {
        Record {
            id,
            title: self.title,
            description: self.description,
            username: self.username,
            url: self.url,
            source: self.source,
            image: self.image,
            video_id: self.video_id,
            updated_at,
        }
    }
}

fn clamp(s: &str, max: usize) -> String {
    s.trim().chars().take(max).collect::<String>().trim_end().to_string()
}

fn optional(s: Option<&str>, max: usize) -> Option<String> {
    s.map(|v| clamp(v, max)).filter(|v| !v.is_empty())
}
