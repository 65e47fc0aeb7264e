use serde::{Deserialize, Serialize};

/// Public profile of a user as reported by the identity service.
///
/// Owned upstream; fetched on demand and never persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRecord {
    pub id: String,
    pub display_name: Option<String>,
    pub profile_image_url: String,
}

/// Author data as rendered next to a post. `name` is always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    pub id: String,
    pub name: String,
    pub profile_image_url: String,
}

impl AuthorView {
    /// Returns `None` when the record has no usable display name.
    pub fn from_record(record: &AuthorRecord) -> Option<Self> {
        let name = record
            .display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())?;

        Some(Self {
            id: record.id.clone(),
            name: name.to_string(),
            profile_image_url: record.profile_image_url.clone(),
        })
    }
}
