//! Database row types, mapping directly to SQLite rows.
//! Distinct from news-types API models to keep the DB layer independent.
//! Author/user columns come joined with the username.

use news_types::models::Emoji;

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct ChannelRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub avatar: Option<String>,
    pub author_id: String,
    pub author_username: String,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub text: String,
    pub channel_id: String,
    pub author_id: String,
    pub author_username: String,
    pub pub_date: String,
}

pub struct CommentRow {
    pub id: String,
    pub text: String,
    pub post_id: String,
    pub author_id: String,
    pub author_username: String,
    pub created_at: String,
}

pub struct ReplyRow {
    pub id: String,
    pub text: String,
    pub comment_id: String,
    pub author_id: String,
    pub author_username: String,
    pub created_at: String,
}

pub struct ReactionRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub username: String,
    pub emoji: Emoji,
    pub created_at: String,
}

pub struct FollowRow {
    pub id: String,
    pub follower_id: String,
    pub follower_username: String,
    pub followed_id: String,
    pub followed_username: String,
    pub created_at: String,
}
