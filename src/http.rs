use crate::errors::AppError;
use crate::inventory::InventoryStore;
use crate::models::{
    DeletedResponse, ErrorResponse, ImageUpload, Item, ItemDraft, SavedItemResponse,
};
use crate::uploads::UploadStore;
use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub inventory: InventoryStore,
    pub uploads: UploadStore,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/api/items",
            get(list_items)
                .post(create_item)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/api/items/:id",
            put(update_item)
                .delete(delete_item)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .nest_service("/uploads", ServeDir::new(state.uploads.dir()))
        .route_service("/", ServeFile::new("public/index.html"))
        .route_service("/styles.css", ServeFile::new("public/styles.css"))
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn list_items(State(state): State<AppState>) -> Json<Vec<Item>> {
    Json(state.inventory.list_all().await)
}

async fn create_item(State(state): State<AppState>, multipart: Multipart) -> Response {
    let (draft, image) = match read_item_form(multipart).await {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    let image_ref = match store_image(&state.uploads, image).await {
        Ok(stored) => stored,
        Err(error) => return error_response(&error),
    };

    match state.inventory.create(draft, image_ref.clone()).await {
        Ok(item) => Json(SavedItemResponse {
            success: true,
            item,
        })
        .into_response(),
        Err(error) => {
            discard_stored_image(&state.uploads, image_ref).await;
            error_response(&error)
        }
    }
}

async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let (draft, image) = match read_item_form(multipart).await {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    let image_ref = match store_image(&state.uploads, image).await {
        Ok(stored) => stored,
        Err(error) => return error_response(&error),
    };

    match state.inventory.update(&id, draft, image_ref.clone()).await {
        Ok(item) => Json(SavedItemResponse {
            success: true,
            item,
        })
        .into_response(),
        Err(error) => {
            discard_stored_image(&state.uploads, image_ref).await;
            error_response(&error)
        }
    }
}

async fn delete_item(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.inventory.delete(&id).await {
        Ok(()) => Json(DeletedResponse { success: true }).into_response(),
        Err(error) => error_response(&error),
    }
}

/// Decodes the item form: known text fields into the draft, the optional
/// `image` file field into raw bytes plus the client filename. A file field
/// with no content counts as "no image", matching a browser form submitted
/// with an empty file input.
async fn read_item_form(
    mut multipart: Multipart,
) -> Result<(ItemDraft, Option<ImageUpload>), Response> {
    let mut draft = ItemDraft::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| bad_request(format!("invalid multipart payload: {error}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "name" => draft.name = read_text(field, "name").await?,
            "quantity" => draft.quantity = read_text(field, "quantity").await?,
            "note1" => draft.note1 = read_text(field, "note1").await?,
            "note2" => draft.note2 = read_text(field, "note2").await?,
            "note3" => draft.note3 = read_text(field, "note3").await?,
            "category" => draft.category = read_text(field, "category").await?,
            "image" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|error| bad_request(format!("invalid image field: {error}")))?;
                if !bytes.is_empty() {
                    image = Some(ImageUpload {
                        bytes: bytes.to_vec(),
                        filename,
                    });
                }
            }
            _ => {}
        }
    }

    Ok((draft, image))
}

async fn read_text(field: Field<'_>, name: &'static str) -> Result<String, Response> {
    field
        .text()
        .await
        .map_err(|error| bad_request(format!("invalid {name} field: {error}")))
}

// Storing the new asset must succeed before the repository runs; a dangling
// reference to a missing file is the one state the two stores may never
// produce.
async fn store_image(
    uploads: &UploadStore,
    image: Option<ImageUpload>,
) -> Result<Option<String>, AppError> {
    match image {
        Some(upload) => uploads
            .store(&upload.bytes, &upload.filename)
            .await
            .map(Some),
        None => Ok(None),
    }
}

// Compensation for a failed create/update: the asset was stored before the
// repository rejected the mutation, so it would otherwise be orphaned.
async fn discard_stored_image(uploads: &UploadStore, image_ref: Option<String>) {
    if let Some(asset_ref) = image_ref {
        if let Err(error) = uploads.remove(&asset_ref).await {
            tracing::warn!(image = %asset_ref, error = %error, "failed to discard stored image");
        }
    }
}

fn error_response(error: &AppError) -> Response {
    let status = match error {
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Io(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = match error {
        AppError::NotFound(_) => "Item not found".to_string(),
        other => other.to_string(),
    };
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: message,
        }),
    )
        .into_response()
}

fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            success: false,
            error: message,
        }),
    )
        .into_response()
}
