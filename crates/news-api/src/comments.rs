use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use news_db::Database;
use news_db::models::CommentRow;
use news_types::api::TextRequest;

use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::identity::Identity;
use crate::policy::check_author;
use crate::posts::validate_text;
use crate::state::{AppState, run_db};

fn require_post(db: &Database, post_id: Uuid) -> Result<(), ApiError> {
    db.get_post(&post_id.to_string())?.ok_or(ApiError::NotFound("Post"))?;
    Ok(())
}

/// Load a comment through its post, so a comment id under the wrong post is a 404.
pub(crate) fn load_comment(db: &Database, post_id: Uuid, comment_id: Uuid) -> Result<CommentRow, ApiError> {
    require_post(db, post_id)?;
    db.get_comment(&comment_id.to_string())?
        .filter(|c| c.post_id == post_id.to_string())
        .ok_or(ApiError::NotFound("Comment"))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, move |db| {
        require_post(db, post_id)?;
        Ok(db.list_comments(&post_id.to_string())?)
    })
    .await?;

    Ok(Json(rows.into_iter().map(convert::comment).collect::<Vec<_>>()))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let row = run_db(&state, move |db| load_comment(db, post_id, comment_id)).await?;
    Ok(Json(convert::comment(row)))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    identity: Identity,
    Json(req): Json<TextRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_text(&req.text)?;

    let comment_id = Uuid::new_v4();
    let author_id = identity.id();

    let row = run_db(&state, move |db| {
        require_post(db, post_id)?;
        db.create_comment(&comment_id.to_string(), &req.text, &post_id.to_string(), &author_id.to_string())
            .map_err(ApiError::from_write)
    })
    .await?;

    info!("Comment {} on post {} by {}", comment_id, post_id, identity.username());

    Ok((StatusCode::CREATED, Json(convert::comment(row))))
}

pub async fn update_comment(
    State(state): State<AppState>,
    method: Method,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    identity: Identity,
    Json(req): Json<TextRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_text(&req.text)?;

    let actor = identity.id();

    let row = run_db(&state, move |db| {
        let current = load_comment(db, post_id, comment_id)?;
        check_author(&method, Some(actor), &current.author_id)?;
        db.update_comment(&current.id, &req.text)?
            .ok_or(ApiError::NotFound("Comment"))
    })
    .await?;

    Ok(Json(convert::comment(row)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    method: Method,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity.id();

    run_db(&state, move |db| {
        let current = load_comment(db, post_id, comment_id)?;
        check_author(&method, Some(actor), &current.author_id)?;
        db.delete_comment(&current.id)?;
        Ok(())
    })
    .await?;

    info!("Comment {} deleted by {}", comment_id, identity.username());

    Ok(StatusCode::NO_CONTENT)
}
