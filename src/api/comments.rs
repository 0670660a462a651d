use super::AppState;
use crate::comments::{Comment, CommentError, CommentThread, CreateCommentRequest, ThreadQuery};
use crate::tree::TreeNode;
use crate::{COMMENTS_API, POSTS_API};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

pub const DEFAULT_RECENT_COMMENTS: i64 = 10;

impl IntoResponse for CommentError {
    fn into_response(self) -> Response {
        let status_code = match self {
            CommentError::Invalid(ref reason) => {
                warn!("Rejected comment: {}", reason);
                StatusCode::BAD_REQUEST
            }
            CommentError::NotFound(_) => StatusCode::NOT_FOUND,
            CommentError::DatabaseError(diesel::result::Error::NotFound) => StatusCode::NOT_FOUND,
            CommentError::DatabaseError(ref err) => {
                error!("Comment query failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            CommentError::Store(ref err) => {
                error!("Comment storage failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status_code, self.to_string()).into_response()
    }
}

#[derive(Serialize, Deserialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Serialize, Deserialize)]
pub struct AncestorResponse {
    pub id: i64,
    pub ancestor: i64,
}

#[derive(Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: usize,
}

#[derive(Deserialize)]
pub struct RecentParams {
    #[serde(default = "default_recent")]
    pub num: i64,
}

fn default_recent() -> i64 {
    DEFAULT_RECENT_COMMENTS
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(format!("/{COMMENTS_API}").as_str(), post(create_comment))
        .route(format!("/{COMMENTS_API}/count").as_str(), get(count_comments))
        .route(format!("/{COMMENTS_API}/recent").as_str(), get(recent_comments))
        .route(format!("/{COMMENTS_API}/threads").as_str(), get(comment_threads))
        .route(
            format!("/{COMMENTS_API}/:id").as_str(),
            get(get_comment).delete(delete_comment),
        )
        .route(
            format!("/{COMMENTS_API}/:id/children").as_str(),
            get(get_comment_children),
        )
        .route(
            format!("/{COMMENTS_API}/:id/ancestor").as_str(),
            get(get_comment_ancestor),
        )
        .route(
            format!("/{POSTS_API}/:post_id/comments/tree").as_str(),
            get(get_post_comment_tree),
        )
}

async fn create_comment(
    State(state): State<AppState>,
    Json(mut payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), CommentError> {
    // Reject malformed input before touching the pool.
    payload.validate()?;

    let mut conn = state.conn()?;
    let comment = Comment::create(&mut conn, payload)?;

    info!(id = comment.id, post_id = comment.post_id, "comment created via API");
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn count_comments(State(state): State<AppState>) -> Result<Json<CountResponse>, CommentError> {
    let mut conn = state.conn()?;
    let count = Comment::count_all(&mut conn)?;
    Ok(Json(CountResponse { count }))
}

async fn recent_comments(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<Comment>>, CommentError> {
    let mut conn = state.conn()?;
    Ok(Json(Comment::get_recent(&mut conn, params.num.max(0))?))
}

async fn comment_threads(
    State(state): State<AppState>,
    Query(query): Query<ThreadQuery>,
) -> Result<Json<Vec<CommentThread>>, CommentError> {
    let mut conn = state.conn()?;
    Ok(Json(Comment::get_threads(&mut conn, &query)?))
}

async fn get_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<i64>,
) -> Result<Json<Comment>, CommentError> {
    let mut conn = state.conn()?;
    let comment = Comment::get_by_id(&mut conn, comment_id).map_err(|err| match err {
        diesel::result::Error::NotFound => CommentError::NotFound(comment_id),
        _ => CommentError::DatabaseError(err),
    })?;
    Ok(Json(comment))
}

async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<i64>,
) -> Result<Json<DeleteResponse>, CommentError> {
    let mut conn = state.conn()?;
    let deleted = Comment::delete_with_children(&mut conn, comment_id)?;

    if deleted > 0 {
        Ok(Json(DeleteResponse { deleted }))
    } else {
        Err(CommentError::NotFound(comment_id))
    }
}

async fn get_comment_children(
    State(state): State<AppState>,
    Path(comment_id): Path<i64>,
) -> Result<Json<Vec<Comment>>, CommentError> {
    let mut conn = state.conn()?;
    Ok(Json(Comment::get_children(&mut conn, comment_id)?))
}

async fn get_comment_ancestor(
    State(state): State<AppState>,
    Path(comment_id): Path<i64>,
) -> Result<Json<AncestorResponse>, CommentError> {
    let mut conn = state.conn()?;
    let ancestor = Comment::get_ancestor(&mut conn, comment_id).map_err(|err| match err {
        diesel::result::Error::NotFound => CommentError::NotFound(comment_id),
        _ => CommentError::DatabaseError(err),
    })?;
    Ok(Json(AncestorResponse {
        id: comment_id,
        ancestor,
    }))
}

async fn get_post_comment_tree(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<TreeNode<Comment>>>, CommentError> {
    let mut conn = state.conn()?;
    Ok(Json(Comment::get_tree_for_post(&mut conn, post_id)?))
}
