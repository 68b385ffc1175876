use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use news_types::api::ReactionRequest;

use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::identity::Identity;
use crate::state::{AppState, run_db};
use crate::validators::{ReactionValidator, RelationshipValidator};

pub async fn list_reactions(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, move |db| {
        let id = post_id.to_string();
        db.get_post(&id)?.ok_or(ApiError::NotFound("Post"))?;
        Ok(db.list_post_reactions(&id)?)
    })
    .await?;

    Ok(Json(convert::group_reactions(&rows)))
}

pub async fn add_reaction(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    identity: Identity,
    Json(req): Json<ReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = identity.id();
    let reaction_id = Uuid::new_v4();

    let row = run_db(&state, move |db| {
        let id = post_id.to_string();
        db.get_post(&id)?.ok_or(ApiError::NotFound("Post"))?;

        ReactionValidator::new(db).validate_create(user, &req.emoji)?;

        db.create_reaction(&reaction_id.to_string(), &id, &user.to_string(), req.emoji)
            .map_err(ApiError::from_write)
    })
    .await?;

    info!("{} reacted {} to post {}", identity.username(), row.emoji, post_id);

    Ok((StatusCode::CREATED, Json(convert::reaction(row))))
}

/// Removes the caller's reaction with the given emoji. Reactions are unique
/// per (user, emoji), so this clears it whichever post it was left on.
pub async fn remove_reaction(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    identity: Identity,
    Json(req): Json<ReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = identity.id();
    let emoji = req.emoji;

    run_db(&state, move |db| {
        db.get_post(&post_id.to_string())?.ok_or(ApiError::NotFound("Post"))?;

        ReactionValidator::new(db).validate_remove(user, &emoji)?;

        db.delete_reaction(&user.to_string(), emoji)?;
        Ok(())
    })
    .await?;

    info!("{} removed {} reaction", identity.username(), emoji);

    Ok(StatusCode::NO_CONTENT)
}
