use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use news_types::api::{
    ChannelDetailResponse, CreateChannelRequest, Page, PageQuery, UpdateChannelRequest,
};

use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::identity::Identity;
use crate::policy::check_author;
use crate::state::{AppState, run_db};

const MAX_TITLE_LEN: usize = 200;

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::invalid("Channel title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::invalid(format!(
            "Channel title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ApiError> {
    if description.trim().is_empty() {
        return Err(ApiError::invalid("Channel description must not be empty"));
    }
    Ok(())
}

pub async fn list_channels(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let query = query.clamped();

    let (count, rows) = run_db(&state, move |db| {
        Ok((db.count_channels()?, db.list_channels(query.limit, query.offset)?))
    })
    .await?;

    Ok(Json(Page {
        count,
        limit: query.limit,
        offset: query.offset,
        results: rows.into_iter().map(convert::channel).collect(),
    }))
}

pub async fn get_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (row, posts) = run_db(&state, move |db| {
        let id = channel_id.to_string();
        let row = db.get_channel(&id)?.ok_or(ApiError::NotFound("Channel"))?;
        let posts = db.list_channel_posts(&id)?;
        Ok((row, posts))
    })
    .await?;

    Ok(Json(ChannelDetailResponse {
        channel: convert::channel(row),
        posts: posts.into_iter().map(convert::post_summary).collect(),
    }))
}

pub async fn create_channel(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<CreateChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_title(&req.title)?;
    validate_description(&req.description)?;

    let channel_id = Uuid::new_v4();
    let author_id = identity.id();

    let row = run_db(&state, move |db| {
        if db.channel_title_taken(&req.title, None)? {
            return Err(ApiError::DuplicateTitle);
        }
        db.create_channel(
            &channel_id.to_string(),
            &req.title,
            &req.description,
            req.avatar.as_deref(),
            &author_id.to_string(),
        )
        .map_err(ApiError::from_write)
    })
    .await?;

    info!("Channel '{}' ({}) created by {}", row.title, channel_id, identity.username());

    Ok((StatusCode::CREATED, Json(convert::channel(row))))
}

pub async fn update_channel(
    State(state): State<AppState>,
    method: Method,
    Path(channel_id): Path<Uuid>,
    identity: Identity,
    Json(req): Json<UpdateChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(title) = &req.title {
        validate_title(title)?;
    }
    if let Some(description) = &req.description {
        validate_description(description)?;
    }

    let actor = identity.id();

    let row = run_db(&state, move |db| {
        let id = channel_id.to_string();
        let current = db.get_channel(&id)?.ok_or(ApiError::NotFound("Channel"))?;
        check_author(&method, Some(actor), &current.author_id)?;

        if let Some(title) = &req.title
            && db.channel_title_taken(title, Some(&id))?
        {
            return Err(ApiError::DuplicateTitle);
        }

        db.update_channel(&id, req.title.as_deref(), req.description.as_deref(), req.avatar.as_deref())
            .map_err(ApiError::from_write)?
            .ok_or(ApiError::NotFound("Channel"))
    })
    .await?;

    info!("Channel {} updated by {}", channel_id, identity.username());

    Ok(Json(convert::channel(row)))
}

pub async fn delete_channel(
    State(state): State<AppState>,
    method: Method,
    Path(channel_id): Path<Uuid>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let actor = identity.id();

    run_db(&state, move |db| {
        let id = channel_id.to_string();
        let current = db.get_channel(&id)?.ok_or(ApiError::NotFound("Channel"))?;
        check_author(&method, Some(actor), &current.author_id)?;
        db.delete_channel(&id)?;
        Ok(())
    })
    .await?;

    info!("Channel {} deleted by {}", channel_id, identity.username());

    Ok(StatusCode::NO_CONTENT)
}
