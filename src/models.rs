use std::sync::Arc;

use crate::config::Config;
use crate::index::IndexManager;
use crate::kv::KvStore;
use crate::middleware::auth::AuthVerifier;
use crate::storage::ObjectStore;
use crate::types::MediaType;

/// Shared handler state. Every collaborator is an injected capability so
/// tests can swap in in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    pub kv: Arc<dyn KvStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub auth: Arc<dyn AuthVerifier>,
    pub indexes: Arc<IndexManager>,
    pub config: Config,
}

// Persisted key layout: one KV entry per entity, JSON id-arrays for indexes.

pub const ALL_POSTS_INDEX: &str = "blog:all_posts";

pub fn blog_post_key(id: &str) -> String {
    format!("blog:post:{id}")
}

pub fn author_posts_index(author_id: &str) -> String {
    format!("blog:author:{author_id}:posts")
}

pub fn category_posts_index(category: &str) -> String {
    format!("blog:category:{category}:posts")
}

pub fn material_key(id: &str) -> String {
    format!("material:{id}")
}

pub fn course_materials_index(course_id: &str) -> String {
    format!("course:{course_id}:materials")
}

pub fn course_category_index(course_id: &str, category: &str) -> String {
    format!("course:{course_id}:{category}")
}

pub fn certificate_key(id: &str) -> String {
    format!("certificate:{id}")
}

pub fn user_certificates_index(user_id: &str) -> String {
    format!("user:{user_id}:certificates")
}

// Entities. Author/student fields are point-in-time snapshots taken at write
// time and never re-derived.

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub author_id: String,
    pub author_name: String,
    pub author_avatar: String,
    pub media_type: MediaType,
    pub media_url: String,
    pub thumbnail_url: String,
    pub category: String,
    pub views: u64,
    pub published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub course_id: String,
    /// Object path inside the course-materials bucket.
    pub file_name: String,
    pub original_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub uploaded_by: String,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
    /// Signed URL issued at upload time (long TTL). List/read paths issue a
    /// fresh short-TTL URL and only fall back to this one.
    pub url: String,
    pub path: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub course_name: String,
    pub student_name: String,
    /// Passed through from the caller as-is; not necessarily RFC 3339.
    pub completion_date: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub certificate_number: String,
}

// API request types

#[derive(Debug, serde::Deserialize)]
pub struct CreateBlogPostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_avatar: Option<String>,
    #[serde(default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub published: Option<bool>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct UpdateBlogPostRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub published: Option<bool>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ListPostsQuery {
    pub category: Option<String>,
    pub author_id: Option<String>,
    pub published: Option<bool>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct ListMaterialsQuery {
    pub category: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCertificateRequest {
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub completion_date: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}
