use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "Uncategorized";

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// A single inventory record, exactly as it appears in the backing document.
///
/// `id` and `timestamp` are assigned at creation and never change. `image` is
/// either empty or a `/uploads/<file>` reference resolvable by the upload
/// store. Documents written before categories existed may omit `category`;
/// deserialization fills in the sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub quantity: u64,
    pub note1: String,
    pub note2: String,
    pub note3: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub image: String,
    pub timestamp: DateTime<Utc>,
}

/// Decoded text fields of a create/update form.
///
/// Fields arrive as raw strings; an absent field and an empty one are
/// indistinguishable on the wire, so both decode to `""`. Quantity stays a
/// string until the repository coerces it.
#[derive(Debug, Clone, Default)]
pub struct ItemDraft {
    pub name: String,
    pub quantity: String,
    pub note1: String,
    pub note2: String,
    pub note3: String,
    pub category: String,
}

/// Raw image payload lifted out of a multipart request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct SavedItemResponse {
    pub success: bool,
    pub item: Item,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
