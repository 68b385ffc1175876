//! Channel subscriptions. Subscribing to a channel follows its author, and the
//! subscription feed is every post in every channel of a followed author.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use news_db::Database;
use news_db::models::ChannelRow;
use news_types::api::{FollowQuery, FollowResponse, Page, PageQuery};

use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::identity::Identity;
use crate::state::{AppState, run_db};
use crate::validators::{FollowValidator, RelationshipValidator};

fn channel_author(db: &Database, channel_id: Uuid) -> Result<(ChannelRow, Uuid), ApiError> {
    let channel = db
        .get_channel(&channel_id.to_string())?
        .ok_or(ApiError::NotFound("Channel"))?;
    let author: Uuid = channel
        .author_id
        .parse()
        .map_err(|e: uuid::Error| ApiError::Internal(e.into()))?;
    Ok((channel, author))
}

/// POST /channels/{channel_id}/subscribe
pub async fn subscribe(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let follower = identity.id();
    let follow_id = Uuid::new_v4();

    let channel = run_db(&state, move |db| {
        let (channel, author) = channel_author(db, channel_id)?;

        if let Err(e) = FollowValidator::new(db).validate_create(follower, &author) {
            warn!("Subscribe to '{}' by {} rejected: {}", channel.title, follower, e);
            return Err(e);
        }

        db.create_follow(&follow_id.to_string(), &follower.to_string(), &author.to_string())
            .map_err(ApiError::from_write)?;
        Ok(channel)
    })
    .await?;

    info!("{} subscribed to {}", identity.username(), channel.author_username);

    Ok((
        StatusCode::CREATED,
        Json(FollowResponse {
            user: identity.username().to_string(),
            following: channel.author_username,
        }),
    ))
}

/// DELETE /channels/{channel_id}/subscribe
pub async fn unsubscribe(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let follower = identity.id();

    let channel = run_db(&state, move |db| {
        let (channel, author) = channel_author(db, channel_id)?;

        FollowValidator::new(db).validate_remove(follower, &author)?;

        db.delete_follow(&follower.to_string(), &author.to_string())?;
        Ok(channel)
    })
    .await?;

    info!("{} unsubscribed from {}", identity.username(), channel.author_username);

    Ok(StatusCode::NO_CONTENT)
}

/// GET /users/subscriptions
pub async fn list_subscriptions(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let follower = identity.id().to_string();
    let rows = run_db(&state, move |db| Ok(db.list_followed_channels(&follower)?)).await?;

    Ok(Json(rows.into_iter().map(convert::channel).collect::<Vec<_>>()))
}

/// GET /users/subscriptions/feed
pub async fn feed(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let query = query.clamped();
    let follower = identity.id().to_string();

    let (count, rows, reactions) = run_db(&state, move |db| {
        let count = db.count_feed(&follower)?;
        let rows = db.list_feed(&follower, query.limit, query.offset)?;
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

/// GET /users/follows?search=
pub async fn list_follows(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<FollowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let follower = identity.id().to_string();
    let search = query.search.filter(|s| !s.trim().is_empty());

    let rows = run_db(&state, move |db| Ok(db.list_follows(&follower, search.as_deref())?)).await?;

    Ok(Json(rows.into_iter().map(convert::follow).collect::<Vec<_>>()))
}
