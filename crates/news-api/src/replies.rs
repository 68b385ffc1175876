use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use news_db::Database;
use news_db::models::ReplyRow;
use news_types::api::TextRequest;

use crate::comments::load_comment;
use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::identity::Identity;
use crate::policy::check_author;
use crate::posts::validate_text;
use crate::state::{AppState, run_db};

fn load_reply(db: &Database, post_id: Uuid, comment_id: Uuid, reply_id: Uuid) -> Result<ReplyRow, ApiError> {
    let comment = load_comment(db, post_id, comment_id)?;
    db.get_reply(&reply_id.to_string())?
        .filter(|r| r.comment_id == comment.id)
        .ok_or(ApiError::NotFound("Reply"))
}

pub async fn list_replies(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, move |db| {
        let comment = load_comment(db, post_id, comment_id)?;
        Ok(db.list_replies(&comment.id)?)
    })
    .await?;

    Ok(Json(rows.into_iter().map(convert::reply).collect::<Vec<_>>()))
}

pub async fn get_reply(
    State(state): State<AppState>,
    Path((post_id, comment_id, reply_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let row = run_db(&state, move |db| load_reply(db, post_id, comment_id, reply_id)).await?;
    Ok(Json(convert::reply(row)))
}

pub async fn create_reply(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    identity: Identity,
    Json(req): Json<TextRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_text(&req.text)?;

    let reply_id = Uuid::new_v4();
    let author_id = identity.id();

    let row = run_db(&state, move |db| {
        let comment = load_comment(db, post_id, comment_id)?;
        db.create_reply(&reply_id.to_string(), &req.text, &comment.id, &author_id.to_string())
            .map_err(ApiError::from_write)
    })
    .await?;

    info!("Reply {} to comment {} by {}", reply_id, comment_id, identity.username());

    Ok((StatusCode::CREATED, Json(convert::reply(row))))
}

pub async fn update_reply(
    State(state): State<AppState>,
    method: Method,
    Path((post_id, comment_id, reply_id)): Path<(Uuid, Uuid, Uuid)>,
    identity: Identity,
    Json(req): Json<TextRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_text(&req.text)?;

    let actor = identity.id();

    let row = run_db(&state, move |db| {
        let current = load_reply(db, post_id, comment_id, reply_id)?;
        check_author(&method, Some(actor), &current.author_id)?;
        db.update_reply(&current.id, &req.text)?
            .ok_or(ApiError::NotFound("Reply"))
    })
    .await?;

    Ok(Json(convert::reply(row)))
}

pub async fn delete_reply(
    State(state): State<AppState>,
    method: Method,
    Path((post_id, comment_id, reply_id)): Path<(Uuid, Uuid, Uuid)>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity.id();

    run_db(&state, move |db| {
        let current = load_reply(db, post_id, comment_id, reply_id)?;
        check_author(&method, Some(actor), &current.author_id)?;
        db.delete_reply(&current.id)?;
        Ok(())
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
