use super::AppState;
use crate::error::StoreError;
use crate::options::BlogOption;
use crate::OPTIONS_API;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum OptionError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Option not found: {0}")]
    NotFound(String),
}

impl IntoResponse for OptionError {
    fn into_response(self) -> Response {
        let status_code = match self {
            OptionError::DatabaseError(ref err) => {
                error!("Option query failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            OptionError::Store(ref err) => {
                error!("Option storage failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            OptionError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        (status_code, self.to_string()).into_response()
    }
}

#[derive(Deserialize)]
pub struct SetOptionRequest {
    pub value: String,
}

pub fn create_router() -> Router<AppState> {
    Router::new().route(
        format!("/{OPTIONS_API}/:name").as_str(),
        get(get_option).put(set_option).delete(delete_option),
    )
}

async fn get_option(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<BlogOption>, OptionError> {
    let mut conn = state.conn()?;

    match BlogOption::get(&mut conn, &name)? {
        Some(value) => Ok(Json(BlogOption { name, value })),
        None => Err(OptionError::NotFound(name)),
    }
}

async fn set_option(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<SetOptionRequest>,
) -> Result<Json<BlogOption>, OptionError> {
    let mut conn = state.conn()?;
    Ok(Json(BlogOption::set(&mut conn, &name, &payload.value)?))
}

async fn delete_option(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, OptionError> {
    let mut conn = state.conn()?;

    if BlogOption::delete(&mut conn, &name)? > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(OptionError::NotFound(name))
    }
}
