//! Domain records as read back from the store.
//!
//! Every record keeps the fields it does not model in `extra`, so a record
//! written by a newer form survives a round trip through an older reader.

use crate::store::Fields;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Reads any JSON scalar as a string. `null` and missing fields become `""`.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(value_to_string).unwrap_or_default())
}

pub(crate) fn value_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Treats an empty string the same as an absent one.
fn non_empty(value: Option<Value>) -> Option<String> {
    value.map(value_to_string).filter(|s| !s.is_empty())
}

/// The timestamp format the portal writes (`2024-05-01T10:00:00.000Z`).
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub society: String,
    /// Free-form date text as entered in the event form.
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    /// Hosted poster URL.
    #[serde(default, deserialize_with = "lenient_string")]
    pub media_path: String,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub society: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub media_path: String,
    #[serde(flatten)]
    pub extra: Fields,
}

/// A row of the `users` collection.
///
/// Older documents carry the club under `society`; readers only ever see
/// [`User::club`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawUser")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub club: Option<String>,
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    #[serde(default, deserialize_with = "lenient_string")]
    id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    email: String,
    #[serde(default, deserialize_with = "lenient_string")]
    name: String,
    #[serde(default)]
    club: Option<Value>,
    #[serde(default)]
    society: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    created_at: String,
    #[serde(flatten)]
    extra: Fields,
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        Self {
            id: raw.id,
            email: raw.email,
            name: raw.name,
            club: non_empty(raw.club).or_else(|| non_empty(raw.society)),
            created_at: raw.created_at,
            extra: raw.extra,
        }
    }
}

/// The fields persisted for a user created from the admin panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub club: String,
    pub created_at: String,
}

impl NewUser {
    /// Trims the name, trims and lower-cases the email and stamps `createdAt`.
    pub fn new(name: &str, email: &str, club: impl Into<String>) -> Self {
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
            club: club.into(),
            created_at: iso_timestamp(),
        }
    }
}

/// The normalized shape of a `societies` document.
///
/// `id` is `None` only for the placeholder returned when no society matches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocietyProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub about_text: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub background_image: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub hero_image: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub society: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: String,
}

/// The fields written by a society update, with both images as hosted URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedSocietyUpdate {
    pub about_text: String,
    pub background_image: String,
    pub hero_image: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image_url: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: String,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecomMember {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub media_path: String,
    #[serde(flatten)]
    pub extra: Fields,
}

/// Upcoming events carry no fixed schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpcomingEvent {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}
