use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Emoji;

// -- JWT Claims --

/// JWT claims issued at login/registration and checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Pagination --

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

impl PageQuery {
    pub fn clamped(self) -> Self {
        Self {
            limit: self.limit.clamp(1, MAX_PAGE_LIMIT),
            offset: self.offset,
        }
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub limit: u32,
    pub offset: u32,
    pub results: Vec<T>,
}

// -- Channels --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChannelRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateChannelRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `""` removes the current avatar.
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub avatar: Option<String>,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// Single-channel view, carrying a short summary of every post in it.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelDetailResponse {
    #[serde(flatten)]
    pub channel: ChannelResponse,
    pub posts: Vec<PostSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: Uuid,
    pub text: String,
    pub pub_date: DateTime<Utc>,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub text: String,
    pub channel: Uuid,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePostRequest {
    pub text: Option<String>,
    pub channel: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub channel: Uuid,
    pub author: String,
    pub reactions: Vec<ReactionGroup>,
}

// -- Comments & replies --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub text: String,
    pub created: DateTime<Utc>,
    pub author: String,
    pub post: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplyResponse {
    pub id: Uuid,
    pub text: String,
    pub created: DateTime<Utc>,
    pub author: String,
    pub comment: Uuid,
}

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactionRequest {
    pub emoji: Emoji,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReactionResponse {
    pub id: Uuid,
    pub emoji: Emoji,
    pub user: String,
    pub post: Uuid,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionGroup {
    pub emoji: Emoji,
    pub symbol: String,
    pub count: usize,
    pub users: Vec<String>,
}

// -- Follows --

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowResponse {
    pub user: String,
    pub following: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FollowQuery {
    pub search: Option<String>,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
