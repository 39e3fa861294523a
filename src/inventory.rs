use crate::errors::{AppError, AppResult};
use crate::models::{Item, ItemDraft, DEFAULT_CATEGORY};
use crate::uploads::UploadStore;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// File-backed repository for the item collection.
///
/// The collection lives behind a single lock; every mutation holds it for the
/// whole read-modify-persist sequence, so mutations never interleave and the
/// backing document always reflects the last acknowledged state. Mutations
/// are applied to a working copy and only committed to memory after the
/// document rewrite succeeds.
#[derive(Clone)]
pub struct InventoryStore {
    items: Arc<Mutex<Vec<Item>>>,
    db_path: PathBuf,
    uploads: UploadStore,
}

impl InventoryStore {
    /// Loads the collection from `db_path`, or starts empty when the document
    /// does not exist yet. Runs before any request is served.
    pub async fn load(db_path: PathBuf, uploads: UploadStore) -> AppResult<Self> {
        let items: Vec<Item> = match tokio::fs::read(&db_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(error) => {
                return Err(AppError::Io(format!(
                    "read {}: {}",
                    db_path.display(),
                    error
                )))
            }
        };
        if !items.is_empty() {
            tracing::info!(count = items.len(), db = %db_path.display(), "loaded item collection");
        }
        Ok(Self {
            items: Arc::new(Mutex::new(items)),
            db_path,
            uploads,
        })
    }

    /// Current collection in insertion order. Read-only, repeatable.
    pub async fn list_all(&self) -> Vec<Item> {
        self.items.lock().await.clone()
    }

    /// Creates an item with a fresh unique id and defaults for missing
    /// fields, appends it, and rewrites the document before returning.
    pub async fn create(&self, draft: ItemDraft, image_ref: Option<String>) -> AppResult<Item> {
        let item = Item {
            id: new_item_id(),
            name: draft.name,
            quantity: parse_quantity(&draft.quantity).unwrap_or(0),
            note1: draft.note1,
            note2: draft.note2,
            note3: draft.note3,
            category: if draft.category.is_empty() {
                DEFAULT_CATEGORY.to_string()
            } else {
                draft.category
            },
            image: image_ref.unwrap_or_default(),
            timestamp: Utc::now(),
        };

        let mut items = self.items.lock().await;
        let mut next = items.clone();
        next.push(item.clone());
        self.persist(&next).await?;
        *items = next;

        tracing::info!(item_id = %item.id, name = %item.name, "item created");
        Ok(item)
    }

    /// Merges the non-empty fields of `draft` over the stored item and
    /// rewrites the document. When `image_ref` carries a freshly stored
    /// asset, the replaced file is released first; a failed release only
    /// logs, so the update still completes and the item never points at a
    /// deleted file.
    pub async fn update(
        &self,
        id: &str,
        draft: ItemDraft,
        image_ref: Option<String>,
    ) -> AppResult<Item> {
        let mut items = self.items.lock().await;
        let Some(index) = items.iter().position(|item| item.id == id) else {
            return Err(AppError::NotFound(format!("Item '{}' not found", id)));
        };

        let mut next = items.clone();
        {
            let item = &mut next[index];
            if let Some(new_ref) = image_ref {
                if !item.image.is_empty() {
                    if let Err(error) = self.uploads.remove(&item.image).await {
                        tracing::warn!(
                            item_id = %item.id,
                            image = %item.image,
                            error = %error,
                            "failed to remove replaced image"
                        );
                    }
                }
                item.image = new_ref;
            }
            merge_draft(item, &draft);
        }

        self.persist(&next).await?;
        let item = next[index].clone();
        *items = next;

        tracing::info!(item_id = %item.id, "item updated");
        Ok(item)
    }

    /// Removes the item and its image file, then rewrites the document.
    /// The image goes first: if the file cannot be deleted the operation
    /// aborts and the record keeps referencing a file that still exists.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let mut items = self.items.lock().await;
        let Some(index) = items.iter().position(|item| item.id == id) else {
            return Err(AppError::NotFound(format!("Item '{}' not found", id)));
        };

        if !items[index].image.is_empty() {
            self.uploads.remove(&items[index].image).await?;
        }

        let mut next = items.clone();
        let removed = next.remove(index);
        self.persist(&next).await?;
        *items = next;

        tracing::info!(item_id = %removed.id, "item deleted");
        Ok(())
    }

    /// Full rewrite of the backing document, pretty-printed. Writing to a
    /// temp file and renaming keeps a crash from leaving a torn document.
    async fn persist(&self, items: &[Item]) -> AppResult<()> {
        let bytes = serde_json::to_vec_pretty(items)?;
        let tmp_path = self.db_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|error| AppError::Io(format!("write {}: {}", tmp_path.display(), error)))?;
        tokio::fs::rename(&tmp_path, &self.db_path)
            .await
            .map_err(|error| {
                AppError::Io(format!("rename {}: {}", self.db_path.display(), error))
            })?;
        Ok(())
    }
}

fn new_item_id() -> String {
    format!("item_{}", Uuid::new_v4().simple())
}

fn parse_quantity(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

/// Merges non-empty draft fields over an existing item. An empty string is
/// indistinguishable from an omitted field, and a quantity that is missing,
/// unparseable, or zero leaves the stored value unchanged. Callers that need
/// to clear a field have no way to express it through this path.
fn merge_draft(item: &mut Item, draft: &ItemDraft) {
    if !draft.name.is_empty() {
        item.name = draft.name.clone();
    }
    if let Some(quantity) = parse_quantity(&draft.quantity).filter(|value| *value != 0) {
        item.quantity = quantity;
    }
    if !draft.note1.is_empty() {
        item.note1 = draft.note1.clone();
    }
    if !draft.note2.is_empty() {
        item.note2 = draft.note2.clone();
    }
    if !draft.note3.is_empty() {
        item.note3 = draft.note3.clone();
    }
    if !draft.category.is_empty() {
        item.category = draft.category.clone();
    }
}
