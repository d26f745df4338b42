//! Course material upload, listing, and deletion.
//!
//! Uploaded bytes go to the private course-materials bucket at
//! `{courseId}/{category}/{millis}-{uuid}.{ext}`; metadata lives at
//! `material:{id}` with memberships in the course-wide index and the
//! course+category index.

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use bytes::Bytes;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::models::{
    course_category_index, course_materials_index, material_key, AppState, ListMaterialsQuery,
    Material,
};
use crate::storage::{COURSE_MATERIALS, LIST_URL_TTL_SECS, UPLOAD_URL_TTL_SECS};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload-material", post(upload_material))
        .route("/course/{course_id}/materials", get(list_course_materials))
        .route("/material/{material_id}", delete(delete_material))
        // course-materials bucket limit plus multipart framing headroom
        .layer(DefaultBodyLimit::max(105 * 1024 * 1024))
        .with_state(state)
}

struct UploadedFile {
    original_name: String,
    content_type: Option<String>,
    bytes: Bytes,
}

async fn upload_material(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let mut file: Option<UploadedFile> = None;
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut category: Option<String> = None;
    let mut course_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(format!("Invalid multipart payload: {err}")))?
    {
        let read_err = |err| AppError::BadRequest(format!("Invalid multipart payload: {err}"));
        match field.name() {
            Some("file") => {
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(read_err)?;
                file = Some(UploadedFile {
                    original_name,
                    content_type,
                    bytes,
                });
            }
            Some("title") => title = Some(field.text().await.map_err(read_err)?),
            Some("description") => description = Some(field.text().await.map_err(read_err)?),
            Some("category") => category = Some(field.text().await.map_err(read_err)?),
            Some("courseId") => course_id = Some(field.text().await.map_err(read_err)?),
            _ => {}
        }
    }

    let missing = || {
        AppError::BadRequest(
            "Missing required fields: file, title, category, courseId".to_string(),
        )
    };
    let file = file.ok_or_else(missing)?;
    let title = title.filter(|t| !t.is_empty()).ok_or_else(missing)?;
    let category = category.filter(|c| !c.is_empty()).ok_or_else(missing)?;
    let course_id = course_id.filter(|c| !c.is_empty()).ok_or_else(missing)?;

    let content_type = file
        .content_type
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| {
            mime_guess::from_path(&file.original_name)
                .first_or_octet_stream()
                .to_string()
        });
    let extension = std::path::Path::new(&file.original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("bin");
    let object_path = format!(
        "{}/{}/{}-{}.{}",
        course_id,
        category,
        Utc::now().timestamp_millis(),
        Uuid::new_v4(),
        extension
    );

    let file_size = file.bytes.len() as u64;
    state
        .objects
        .upload(COURSE_MATERIALS, &object_path, file.bytes, &content_type)
        .await
        .map_err(|err| {
            error!("Upload error: {}", err);
            AppError::UploadFailed("Failed to upload file to storage".to_string())
        })?;

    let url = match state
        .objects
        .signed_url(COURSE_MATERIALS, &object_path, UPLOAD_URL_TTL_SECS)
        .await
    {
        Ok(url) => url,
        Err(err) => {
            warn!("Could not sign URL for {}: {}", object_path, err);
            String::new()
        }
    };

    let material = Material {
        id: Uuid::new_v4().to_string(),
        title,
        description: description.unwrap_or_default(),
        category: category.clone(),
        course_id: course_id.clone(),
        file_name: object_path.clone(),
        original_name: file.original_name,
        file_type: content_type,
        file_size,
        uploaded_by: user.id.clone(),
        uploaded_at: Utc::now(),
        url,
        path: object_path,
    };

    state
        .kv
        .set(&material_key(&material.id), serde_json::to_value(&material)?)
        .await?;

    state
        .indexes
        .add(&course_materials_index(&course_id), &material.id)
        .await?;
    state
        .indexes
        .add(&course_category_index(&course_id, &category), &material.id)
        .await?;

    info!(material_id = %material.id, course_id = %course_id, "Course material uploaded");

    Ok(Json(json!({
        "success": true,
        "material": material,
        "message": "Course material uploaded successfully"
    })))
}

/// Every listed item gets a freshly signed short-TTL URL; the long-TTL URL
/// stored at upload time is only the fallback and is never overwritten.
async fn list_course_materials(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(course_id): Path<String>,
    Query(query): Query<ListMaterialsQuery>,
) -> AppResult<Json<Value>> {
    let material_ids = match query.category.as_deref().filter(|c| !c.is_empty()) {
        Some(category) => {
            state
                .indexes
                .ids(&course_category_index(&course_id, category))
                .await?
        }
        None => state.indexes.ids(&course_materials_index(&course_id)).await?,
    };

    let mut materials = Vec::new();
    for material_id in material_ids {
        let Some(value) = state.kv.get(&material_key(&material_id)).await? else {
            continue;
        };
        let mut material: Material = serde_json::from_value(value)?;
        match state
            .objects
            .signed_url(COURSE_MATERIALS, &material.path, LIST_URL_TTL_SECS)
            .await
        {
            Ok(url) => material.url = url,
            Err(err) => warn!("Could not re-sign URL for {}: {}", material.path, err),
        }
        materials.push(material);
    }

    materials.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));

    Ok(Json(json!({
        "success": true,
        "total": materials.len(),
        "materials": materials
    })))
}

async fn delete_material(
    State(state): State<AppState>,
    user: AuthUser,
    Path(material_id): Path<String>,
) -> AppResult<Json<Value>> {
    let key = material_key(&material_id);
    let value = state
        .kv
        .get(&key)
        .await?
        .ok_or_else(|| AppError::NotFound("Material not found".to_string()))?;
    let material: Material = serde_json::from_value(value)?;

    if material.uploaded_by != user.id {
        return Err(AppError::Forbidden(
            "Unauthorized - You can only delete your own materials".to_string(),
        ));
    }

    // Best-effort: a failed object deletion is logged, the metadata still goes.
    if let Err(err) = state.objects.delete(COURSE_MATERIALS, &material.path).await {
        error!("Storage delete error: {}", err);
    }

    state.kv.delete(&key).await?;

    state
        .indexes
        .remove(&course_materials_index(&material.course_id), &material_id)
        .await?;
    state
        .indexes
        .remove(
            &course_category_index(&material.course_id, &material.category),
            &material_id,
        )
        .await?;

    info!(material_id = %material_id, "Course material deleted");

    Ok(Json(json!({
        "success": true,
        "message": "Course material deleted successfully"
    })))
}
