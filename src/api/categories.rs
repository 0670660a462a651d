use super::AppState;
use crate::categories::Category;
use crate::error::StoreError;
use crate::tree::TreeNode;
use crate::CATEGORIES_API;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum CategoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Category not found: {0}")]
    NotFound(i64),

    #[error("Parent category does not exist: {0}")]
    InvalidParent(i64),
}

impl IntoResponse for CategoryError {
    fn into_response(self) -> Response {
        let status_code = match self {
            CategoryError::DatabaseError(ref err) => {
                error!("Category query failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            CategoryError::Store(ref err) => {
                error!("Category storage failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            CategoryError::NotFound(_) => StatusCode::NOT_FOUND,
            CategoryError::InvalidParent(_) => StatusCode::BAD_REQUEST,
        };

        (status_code, self.to_string()).into_response()
    }
}

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub parent: i64,
}

#[derive(Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: String,
    pub slug: String,
}

fn not_found_or(category_id: i64) -> impl FnOnce(diesel::result::Error) -> CategoryError {
    move |err| match err {
        diesel::result::Error::NotFound => CategoryError::NotFound(category_id),
        _ => CategoryError::DatabaseError(err),
    }
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            format!("/{CATEGORIES_API}").as_str(),
            get(list_categories).post(create_category),
        )
        .route(format!("/{CATEGORIES_API}/tree").as_str(), get(get_category_tree))
        .route(
            format!("/{CATEGORIES_API}/:id").as_str(),
            get(get_category).put(update_category),
        )
        .route(
            format!("/{CATEGORIES_API}/:id/children").as_str(),
            get(get_category_children),
        )
}

async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, CategoryError> {
    let mut conn = state.conn()?;
    Ok(Json(Category::get_all(&mut conn)?))
}

async fn get_category_tree(
    State(state): State<AppState>,
) -> Result<Json<Vec<TreeNode<Category>>>, CategoryError> {
    let mut conn = state.conn()?;
    Ok(Json(Category::get_tree(&mut conn)?))
}

async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> Result<Json<Category>, CategoryError> {
    let mut conn = state.conn()?;
    let category = Category::get_by_id(&mut conn, category_id).map_err(not_found_or(category_id))?;
    Ok(Json(category))
}

async fn get_category_children(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> Result<Json<Vec<Category>>, CategoryError> {
    let mut conn = state.conn()?;
    Ok(Json(Category::get_children(&mut conn, category_id)?))
}

async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), CategoryError> {
    let mut conn = state.conn()?;

    let category = Category::create(&mut conn, &payload.name, &payload.slug, payload.parent)
        .map_err(|err| match err {
            diesel::result::Error::NotFound => CategoryError::InvalidParent(payload.parent),
            _ => CategoryError::DatabaseError(err),
        })?;

    info!(id = category.id, "category created via API");
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, CategoryError> {
    let mut conn = state.conn()?;

    let category = Category::update(&mut conn, category_id, &payload.name, &payload.slug)
        .map_err(not_found_or(category_id))?;

    Ok(Json(category))
}
