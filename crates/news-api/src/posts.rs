use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use news_types::api::{CreatePostRequest, Page, PageQuery, UpdatePostRequest};

use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::identity::Identity;
use crate::policy::check_author;
use crate::state::{AppState, run_db};
use crate::validators::validate_channel_write;

pub(crate) fn validate_text(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::invalid("Text must not be empty"));
    }
    Ok(())
}

/// Newest first, paginated.
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let query = query.clamped();

    let (count, rows, reactions) = run_db(&state, move |db| {
        let count = db.count_posts()?;
        let rows = db.list_posts(query.limit, query.offset)?;
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let reactions = db.list_reactions_for_posts(&ids)?;
        Ok((count, rows, reactions))
    })
    .await?;

    Ok(Json(Page {
        count,
        limit: query.limit,
        offset: query.offset,
        results: convert::posts(rows, reactions),
    }))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (row, reactions) = run_db(&state, move |db| {
        let id = post_id.to_string();
        let row = db.get_post(&id)?.ok_or(ApiError::NotFound("Post"))?;
        let reactions = db.list_post_reactions(&id)?;
        Ok((row, reactions))
    })
    .await?;

    Ok(Json(convert::post(row, convert::group_reactions(&reactions))))
}

pub async fn create_post(
    State(state): State<AppState>,
    method: Method,
    identity: Identity,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_text(&req.text)?;

    let post_id = Uuid::new_v4();
    let actor = identity.id();

    let row = run_db(&state, move |db| {
        let channel = db
            .get_channel(&req.channel.to_string())?
            .ok_or(ApiError::NotFound("Channel"))?;

        if let Err(e) = validate_channel_write(actor, &channel, &method) {
            warn!("User {} tried to publish into channel '{}'", actor, channel.title);
            return Err(e);
        }

        db.create_post(&post_id.to_string(), &req.text, &channel.id, &actor.to_string())
            .map_err(ApiError::from_write)
    })
    .await?;

    info!("Post {} published by {}", post_id, identity.username());

    Ok((StatusCode::CREATED, Json(convert::post(row, vec![]))))
}

pub async fn update_post(
    State(state): State<AppState>,
    method: Method,
    Path(post_id): Path<Uuid>,
    identity: Identity,
    Json(req): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(text) = &req.text {
        validate_text(text)?;
    }

    let actor = identity.id();

    let (row, reactions) = run_db(&state, move |db| {
        let id = post_id.to_string();
        let current = db.get_post(&id)?.ok_or(ApiError::NotFound("Post"))?;
        check_author(&method, Some(actor), &current.author_id)?;

        // The post must still sit in a channel its author owns afterwards
        let target_id = req
            .channel
            .map(|c| c.to_string())
            .unwrap_or_else(|| current.channel_id.clone());
        let target = db.get_channel(&target_id)?.ok_or(ApiError::NotFound("Channel"))?;
        validate_channel_write(actor, &target, &method)?;

        let row = db
            .update_post(&id, req.text.as_deref(), Some(&target.id))
            .map_err(ApiError::from_write)?
            .ok_or(ApiError::NotFound("Post"))?;
        let reactions = db.list_post_reactions(&id)?;
        Ok((row, reactions))
    })
    .await?;

    info!("Post {} updated by {}", post_id, identity.username());

    Ok(Json(convert::post(row, convert::group_reactions(&reactions))))
}

pub async fn delete_post(
    State(state): State<AppState>,
    method: Method,
    Path(post_id): Path<Uuid>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity.id();

    run_db(&state, move |db| {
        let id = post_id.to_string();
        let current = db.get_post(&id)?.ok_or(ApiError::NotFound("Post"))?;
        check_author(&method, Some(actor), &current.author_id)?;
        db.delete_post(&id)?;
        Ok(())
    })
    .await?;

    info!("Post {} deleted by {}", post_id, identity.username());

    Ok(StatusCode::NO_CONTENT)
}
