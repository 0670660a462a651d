use super::AppState;
use crate::error::StoreError;
use crate::tags::{
    add_tag, get_tag_ids, get_tag_names, require_tag, resolve_aliases, search_tags,
    sync_object_tags, PgTagStore, Tag, TagError, TagSyncReport,
};
use crate::{POSTS_API, TAGS_API};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{error, info};

impl IntoResponse for TagError {
    fn into_response(self) -> Response {
        let status_code = match self {
            TagError::Store(ref err) => {
                error!("Tag storage failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            TagError::NotFound(_) => StatusCode::NOT_FOUND,
            TagError::EmptyName => StatusCode::BAD_REQUEST,
            TagError::DuplicateName(_) => StatusCode::CONFLICT,
        };

        (status_code, self.to_string()).into_response()
    }
}

#[derive(Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    #[serde(default)]
    pub alias_of: i64,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct PostTagParams {
    #[serde(default)]
    pub alias: bool,
}

#[derive(Serialize, Deserialize)]
pub struct TagIdsBody {
    pub ids: Vec<i64>,
}

#[derive(Deserialize)]
pub struct SyncTagsRequest {
    pub tags: String,
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            format!("/{TAGS_API}").as_str(),
            get(list_tags).post(create_tag),
        )
        .route(format!("/{TAGS_API}/resolve").as_str(), post(resolve_tags))
        .route(format!("/{TAGS_API}/:id").as_str(), get(get_tag))
        .route(
            format!("/{POSTS_API}/:post_id/tags").as_str(),
            get(list_post_tag_ids).put(sync_post_tags),
        )
        .route(
            format!("/{POSTS_API}/:post_id/tags/names").as_str(),
            get(list_post_tag_names),
        )
}

async fn list_tags(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Tag>>, TagError> {
    let mut conn = state.conn()?;
    let mut store = PgTagStore::new(&mut conn);
    Ok(Json(search_tags(&mut store, params.q.trim())?))
}

async fn get_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<i64>,
) -> Result<Json<Tag>, TagError> {
    let mut conn = state.conn()?;
    let mut store = PgTagStore::new(&mut conn);
    Ok(Json(require_tag(&mut store, tag_id)?))
}

async fn create_tag(
    State(state): State<AppState>,
    Json(payload): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<Tag>), TagError> {
    if payload.name.trim().is_empty() {
        return Err(TagError::EmptyName);
    }

    let mut conn = state.conn()?;
    let mut store = PgTagStore::new(&mut conn);
    let tag = add_tag(&mut store, &payload.name, payload.alias_of)?;

    Ok((StatusCode::CREATED, Json(tag)))
}

async fn resolve_tags(
    State(state): State<AppState>,
    Json(payload): Json<TagIdsBody>,
) -> Result<Json<TagIdsBody>, TagError> {
    let ids: BTreeSet<i64> = payload.ids.into_iter().collect();

    let mut conn = state.conn()?;
    let mut store = PgTagStore::new(&mut conn);
    let resolved = resolve_aliases(&mut store, &ids)?;

    Ok(Json(TagIdsBody {
        ids: resolved.into_iter().collect(),
    }))
}

async fn list_post_tag_ids(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Query(params): Query<PostTagParams>,
) -> Result<Json<TagIdsBody>, TagError> {
    let mut conn = state.conn()?;
    let mut store = PgTagStore::new(&mut conn);
    let ids = get_tag_ids(&mut store, post_id, params.alias)?;

    Ok(Json(TagIdsBody {
        ids: ids.into_iter().collect(),
    }))
}

async fn list_post_tag_names(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<String>>, TagError> {
    let mut conn = state.conn()?;
    let mut store = PgTagStore::new(&mut conn);
    Ok(Json(get_tag_names(&mut store, post_id)?))
}

async fn sync_post_tags(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(payload): Json<SyncTagsRequest>,
) -> Result<Json<TagSyncReport>, TagError> {
    let mut pooled = state.conn()?;
    let conn: &mut PgConnection = &mut pooled;

    let report = conn.transaction::<_, StoreError, _>(|conn| {
        sync_object_tags(&mut PgTagStore::new(conn), post_id, &payload.tags)
    })?;

    info!(
        post_id,
        added = report.added.len(),
        removed = report.removed.len(),
        "post tags synchronized via API"
    );
    Ok(Json(report))
}
