//! Blog post CRUD and listing.
//!
//! Posts live at `blog:post:{id}`; each post is also a member of the global
//! index, its author's index, and its category's index. Category changes move
//! the id between category indexes.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::models::{
    author_posts_index, blog_post_key, category_posts_index, AppState, BlogPost,
    CreateBlogPostRequest, ListPostsQuery, UpdateBlogPostRequest, ALL_POSTS_INDEX,
};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/blog-posts", get(list_blog_posts).post(create_blog_post))
        .route(
            "/blog-posts/{id}",
            get(get_blog_post)
                .put(update_blog_post)
                .delete(delete_blog_post),
        )
        .with_state(state)
}

async fn create_blog_post(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateBlogPostRequest>,
) -> AppResult<Json<Value>> {
    let now = Utc::now();
    let post = BlogPost {
        id: Uuid::new_v4().to_string(),
        title: payload.title,
        content: payload.content,
        excerpt: payload.excerpt.unwrap_or_default(),
        author_id: user.id.clone(),
        author_name: payload
            .author_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| user.display_name_or("Instructor")),
        author_avatar: payload
            .author_avatar
            .filter(|avatar| !avatar.is_empty())
            .or_else(|| user.avatar_url.clone())
            .unwrap_or_default(),
        media_type: payload.media_type.unwrap_or_default(),
        media_url: payload.media_url.unwrap_or_default(),
        thumbnail_url: payload.thumbnail_url.unwrap_or_default(),
        category: payload
            .category
            .filter(|category| !category.is_empty())
            .unwrap_or_else(|| "General".to_string()),
        views: 0,
        published: payload.published.unwrap_or(false),
        created_at: now,
        updated_at: now,
    };

    state
        .kv
        .set(&blog_post_key(&post.id), serde_json::to_value(&post)?)
        .await?;

    state.indexes.add(ALL_POSTS_INDEX, &post.id).await?;
    state
        .indexes
        .add(&author_posts_index(&post.author_id), &post.id)
        .await?;
    state
        .indexes
        .add(&category_posts_index(&post.category), &post.id)
        .await?;

    info!(post_id = %post.id, category = %post.category, "Blog post created");

    Ok(Json(json!({
        "success": true,
        "data": post,
        "message": "Blog post created successfully"
    })))
}

/// Filter precedence: author index, then category index (the `"All"`
/// sentinel falls through to the global index). Ids whose entity is gone are
/// skipped, never an error.
async fn list_blog_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> AppResult<Json<Value>> {
    let post_ids = if let Some(author_id) = query
        .author_id
        .as_deref()
        .filter(|author| !author.is_empty())
    {
        state.indexes.ids(&author_posts_index(author_id)).await?
    } else if let Some(category) = query
        .category
        .as_deref()
        .filter(|category| !category.is_empty() && *category != "All")
    {
        state.indexes.ids(&category_posts_index(category)).await?
    } else {
        state.indexes.ids(ALL_POSTS_INDEX).await?
    };

    let published_only = query.published.unwrap_or(true);

    let mut posts = Vec::new();
    for post_id in post_ids {
        let Some(value) = state.kv.get(&blog_post_key(&post_id)).await? else {
            continue;
        };
        let post: BlogPost = serde_json::from_value(value)?;
        if !published_only || post.published {
            posts.push(post);
        }
    }

    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(json!({
        "success": true,
        "total": posts.len(),
        "data": posts
    })))
}

/// Reads are mutating: every successful read persists `views + 1` before
/// responding. Concurrent readers of the same post can lose increments; the
/// counter is best-effort.
async fn get_blog_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Json<Value>> {
    let key = blog_post_key(&post_id);
    let value = state
        .kv
        .get(&key)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog post not found".to_string()))?;
    let mut post: BlogPost = serde_json::from_value(value)?;

    post.views += 1;
    state.kv.set(&key, serde_json::to_value(&post)?).await?;

    Ok(Json(json!({
        "success": true,
        "data": post
    })))
}

/// Partial update, author-only. Empty-string `title`/`content`/`category`
/// leave the field unchanged; the other fields overwrite whenever present,
/// which is how callers clear an excerpt or a media URL.
async fn update_blog_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<String>,
    Json(update): Json<UpdateBlogPostRequest>,
) -> AppResult<Json<Value>> {
    let key = blog_post_key(&post_id);
    let value = state
        .kv
        .get(&key)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog post not found".to_string()))?;
    let mut post: BlogPost = serde_json::from_value(value)?;

    if post.author_id != user.id {
        return Err(AppError::Forbidden(
            "Unauthorized - You can only edit your own posts".to_string(),
        ));
    }

    let old_category = post.category.clone();

    if let Some(title) = update.title.filter(|title| !title.is_empty()) {
        post.title = title;
    }
    if let Some(content) = update.content.filter(|content| !content.is_empty()) {
        post.content = content;
    }
    if let Some(excerpt) = update.excerpt {
        post.excerpt = excerpt;
    }
    if let Some(media_type) = update.media_type {
        post.media_type = media_type;
    }
    if let Some(media_url) = update.media_url {
        post.media_url = media_url;
    }
    if let Some(thumbnail_url) = update.thumbnail_url {
        post.thumbnail_url = thumbnail_url;
    }
    if let Some(category) = update.category.filter(|category| !category.is_empty()) {
        post.category = category;
    }
    if let Some(published) = update.published {
        post.published = published;
    }
    post.updated_at = Utc::now();

    state.kv.set(&key, serde_json::to_value(&post)?).await?;

    if post.category != old_category {
        state
            .indexes
            .move_entry(
                &category_posts_index(&old_category),
                &category_posts_index(&post.category),
                &post_id,
            )
            .await?;
        info!(post_id = %post_id, from = %old_category, to = %post.category, "Blog post moved between categories");
    }

    Ok(Json(json!({
        "success": true,
        "data": post,
        "message": "Blog post updated successfully"
    })))
}

async fn delete_blog_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<String>,
) -> AppResult<Json<Value>> {
    let key = blog_post_key(&post_id);
    let value = state
        .kv
        .get(&key)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog post not found".to_string()))?;
    let post: BlogPost = serde_json::from_value(value)?;

    if post.author_id != user.id {
        return Err(AppError::Forbidden(
            "Unauthorized - You can only delete your own posts".to_string(),
        ));
    }

    state.kv.delete(&key).await?;

    state.indexes.remove(ALL_POSTS_INDEX, &post_id).await?;
    state
        .indexes
        .remove(&author_posts_index(&post.author_id), &post_id)
        .await?;
    state
        .indexes
        .remove(&category_posts_index(&post.category), &post_id)
        .await?;

    info!(post_id = %post_id, "Blog post deleted");

    Ok(Json(json!({
        "success": true,
        "message": "Blog post deleted successfully"
    })))
}
