//! api::handlers
//!
//! One handler per route. Each extracts its arguments, runs the matching
//! [`Gateway`] operation on the blocking pool and returns its JSON shape.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiError;
use crate::gateway::{CommitQuery, FileChange, Gateway, GatewayError, Mutation, TagRequest};
use crate::translate::{
    BlameJson, BlobJson, CommitJson, CommitShaJson, HeadJson, ObjectJson, ObjectRefJson,
    RefJson, RepositoryJson, TagJson,
};

type Shared = State<Arc<Gateway>>;
type ApiResult<T> = Result<Json<T>, ApiError>;

/// Run a gateway operation off the async executor.
async fn blocking<T, F>(gateway: Arc<Gateway>, op: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Gateway) -> Result<T, GatewayError> + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || op(&gateway))
        .await
        .map_err(|e| ApiError::Internal(format!("operation task failed: {e}")))?;
    Ok(Json(outcome?))
}

// =============================================================================
// Request bodies and queries
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateRepoBody {
    pub name: String,
    #[serde(default)]
    pub hooks: Vec<String>,
}

/// `name` is the file's path inside the tree.
#[derive(Debug, Deserialize)]
pub struct WriteFileBody {
    pub name: String,
    pub data: String,
    pub encoding: Option<String>,
    pub user: String,
    pub email: String,
    pub message: String,
    pub from_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteFileBody {
    pub user: String,
    pub email: String,
    pub message: String,
    pub from_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefBody {
    #[serde(rename = "ref")]
    pub name: String,
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRefBody {
    pub sha: String,
    #[serde(default)]
    pub force: bool,
}

/// Start at `sha`, else at the head of `from_branch`, else at `HEAD`.
#[derive(Debug, Deserialize)]
pub struct CreateBranchBody {
    pub name: String,
    pub from_branch: Option<String>,
    pub sha: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DiffsQuery {
    #[serde(default)]
    pub diffs: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlameQuery {
    pub branch: Option<String>,
}

// =============================================================================
// Repositories
// =============================================================================

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /repos
pub async fn create_repository(
    State(gateway): Shared,
    body: Result<Json<CreateRepoBody>, JsonRejection>,
) -> ApiResult<RepositoryJson> {
    let Json(body) = body?;
    blocking(gateway, move |gw| gw.create_repository(&body.name, &body.hooks)).await
}

/// GET /repos/{repo}
pub async fn get_repository(
    State(gateway): Shared,
    Path(repo): Path<String>,
) -> ApiResult<RepositoryJson> {
    blocking(gateway, move |gw| gw.repository(&repo)).await
}

// =============================================================================
// Branches and files
// =============================================================================

/// GET /repos/{repo}/branches
pub async fn list_branches(
    State(gateway): Shared,
    Path(repo): Path<String>,
) -> ApiResult<Vec<HeadJson>> {
    blocking(gateway, move |gw| gw.branches(&repo)).await
}

/// POST /repos/{repo}/branches
pub async fn create_branch(
    State(gateway): Shared,
    Path(repo): Path<String>,
    body: Result<Json<CreateBranchBody>, JsonRejection>,
) -> ApiResult<HeadJson> {
    let Json(body) = body?;
    blocking(gateway, move |gw| {
        gw.create_branch(
            &repo,
            &body.name,
            body.from_branch.as_deref(),
            body.sha.as_deref(),
        )
    })
    .await
}

/// GET /repos/{repo}/branches/{branch}/files
pub async fn branch_root(
    State(gateway): Shared,
    Path((repo, branch)): Path<(String, String)>,
) -> ApiResult<ObjectJson> {
    blocking(gateway, move |gw| gw.tree(&repo, &branch).map(ObjectJson::Tree)).await
}

/// GET /repos/{repo}/branches/{branch}/files/{*path}
pub async fn branch_path(
    State(gateway): Shared,
    Path((repo, branch, path)): Path<(String, String, String)>,
) -> ApiResult<ObjectJson> {
    blocking(gateway, move |gw| gw.object_at(&repo, &branch, &path)).await
}

/// POST /repos/{repo}/branches/{branch}/files
pub async fn write_file(
    State(gateway): Shared,
    Path((repo, branch)): Path<(String, String)>,
    body: Result<Json<WriteFileBody>, JsonRejection>,
) -> ApiResult<CommitShaJson> {
    let Json(body) = body?;
    let change = FileChange {
        branch,
        path: body.name,
        mutation: Mutation::Upsert {
            content: body.data,
            encoding: body.encoding,
        },
        author_name: body.user,
        author_email: body.email,
        message: body.message,
        source_branch: body.from_branch,
    };
    blocking(gateway, move |gw| gw.commit_file_change(&repo, change)).await
}

/// DELETE /repos/{repo}/branches/{branch}/files/{*path}
pub async fn delete_file(
    State(gateway): Shared,
    Path((repo, branch, path)): Path<(String, String, String)>,
    body: Result<Json<DeleteFileBody>, JsonRejection>,
) -> ApiResult<CommitShaJson> {
    let Json(body) = body?;
    let change = FileChange {
        branch,
        path,
        mutation: Mutation::Delete,
        author_name: body.user,
        author_email: body.email,
        message: body.message,
        source_branch: body.from_branch,
    };
    blocking(gateway, move |gw| gw.commit_file_change(&repo, change)).await
}

/// GET /repos/{repo}/blobs/{sha}
pub async fn get_blob(
    State(gateway): Shared,
    Path((repo, sha)): Path<(String, String)>,
) -> ApiResult<BlobJson> {
    blocking(gateway, move |gw| gw.blob(&repo, &sha)).await
}

/// GET /repos/{repo}/trees/{sha}
pub async fn get_tree(
    State(gateway): Shared,
    Path((repo, sha)): Path<(String, String)>,
) -> ApiResult<ObjectJson> {
    blocking(gateway, move |gw| gw.tree_by_sha(&repo, &sha).map(ObjectJson::Tree)).await
}

// =============================================================================
// Refs and tags
// =============================================================================

/// GET /repos/{repo}/refs
pub async fn list_refs(
    State(gateway): Shared,
    Path(repo): Path<String>,
) -> ApiResult<Vec<RefJson>> {
    blocking(gateway, move |gw| gw.refs(&repo)).await
}

/// POST /repos/{repo}/refs
pub async fn create_ref(
    State(gateway): Shared,
    Path(repo): Path<String>,
    body: Result<Json<RefBody>, JsonRejection>,
) -> ApiResult<RefJson> {
    let Json(body) = body?;
    blocking(gateway, move |gw| gw.create_ref(&repo, &body.name, &body.sha)).await
}

/// GET /repos/{repo}/refs/{*ref}
pub async fn get_ref(
    State(gateway): Shared,
    Path((repo, name)): Path<(String, String)>,
) -> ApiResult<RefJson> {
    blocking(gateway, move |gw| gw.get_ref(&repo, &name)).await
}

/// PATCH /repos/{repo}/refs/{*ref}
pub async fn update_ref(
    State(gateway): Shared,
    Path((repo, name)): Path<(String, String)>,
    body: Result<Json<UpdateRefBody>, JsonRejection>,
) -> ApiResult<RefJson> {
    let Json(body) = body?;
    blocking(gateway, move |gw| gw.update_ref(&repo, &name, &body.sha, body.force)).await
}

/// GET /repos/{repo}/tags
pub async fn list_tags(
    State(gateway): Shared,
    Path(repo): Path<String>,
) -> ApiResult<Vec<TagJson>> {
    blocking(gateway, move |gw| gw.tags(&repo)).await
}

/// POST /repos/{repo}/tags
pub async fn create_tag(
    State(gateway): Shared,
    Path(repo): Path<String>,
    body: Result<Json<TagRequest>, JsonRejection>,
) -> ApiResult<ObjectRefJson> {
    let Json(request) = body?;
    blocking(gateway, move |gw| gw.create_tag(&repo, request)).await
}

/// GET /repos/{repo}/tags/{sha}
pub async fn get_tag(
    State(gateway): Shared,
    Path((repo, sha)): Path<(String, String)>,
) -> ApiResult<TagJson> {
    blocking(gateway, move |gw| gw.tag(&repo, &sha)).await
}

// =============================================================================
// History
// =============================================================================

/// GET /repos/{repo}/commits?start=&diffs=&order=
pub async fn list_commits(
    State(gateway): Shared,
    Path(repo): Path<String>,
    query: Result<Query<CommitQuery>, QueryRejection>,
) -> ApiResult<Vec<CommitJson>> {
    let Query(query) = query?;
    blocking(gateway, move |gw| gw.commits(&repo, &query)).await
}

/// GET /repos/{repo}/commits/{sha}?diffs=
pub async fn get_commit(
    State(gateway): Shared,
    Path((repo, sha)): Path<(String, String)>,
    query: Result<Query<DiffsQuery>, QueryRejection>,
) -> ApiResult<CommitJson> {
    let Query(query) = query?;
    blocking(gateway, move |gw| gw.commit(&repo, &sha, query.diffs)).await
}

/// GET /repos/{repo}/blame/{*path}?branch=
pub async fn blame(
    State(gateway): Shared,
    Path((repo, path)): Path<(String, String)>,
    query: Result<Query<BlameQuery>, QueryRejection>,
) -> ApiResult<BlameJson> {
    let Query(query) = query?;
    blocking(gateway, move |gw| {
        gw.blame(&repo, &path, query.branch.as_deref())
    })
    .await
}
