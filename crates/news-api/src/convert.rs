//! Row → response mapping.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use news_db::models::{ChannelRow, CommentRow, FollowRow, PostRow, ReactionRow, ReplyRow};
use news_types::api::{
    ChannelResponse, CommentResponse, FollowResponse, PostResponse, PostSummary, ReactionGroup,
    ReactionResponse, ReplyResponse,
};
use news_types::models::Emoji;

pub(crate) fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} id '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand in the sqlite shell use datetime('now')
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub(crate) fn channel(row: ChannelRow) -> ChannelResponse {
    ChannelResponse {
        id: parse_id(&row.id, "channel"),
        title: row.title,
        description: row.description,
        avatar: row.avatar,
        author: row.author_username,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub(crate) fn post_summary(row: PostRow) -> PostSummary {
    PostSummary {
        id: parse_id(&row.id, "post"),
        text: row.text,
        pub_date: parse_timestamp(&row.pub_date),
    }
}

pub(crate) fn post(row: PostRow, reactions: Vec<ReactionGroup>) -> PostResponse {
    PostResponse {
        id: parse_id(&row.id, "post"),
        text: row.text,
        pub_date: parse_timestamp(&row.pub_date),
        channel: parse_id(&row.channel_id, "channel"),
        author: row.author_username,
        reactions,
    }
}

/// Attach grouped reactions to each post of a page.
pub(crate) fn posts(rows: Vec<PostRow>, reaction_rows: Vec<ReactionRow>) -> Vec<PostResponse> {
    let mut by_post: BTreeMap<String, Vec<ReactionRow>> = BTreeMap::new();
    for r in reaction_rows {
        by_post.entry(r.post_id.clone()).or_default().push(r);
    }

    rows.into_iter()
        .map(|row| {
            let groups = by_post.remove(&row.id).map(|rs| group_reactions(&rs)).unwrap_or_default();
            post(row, groups)
        })
        .collect()
}

pub(crate) fn comment(row: CommentRow) -> CommentResponse {
    CommentResponse {
        id: parse_id(&row.id, "comment"),
        text: row.text,
        created: parse_timestamp(&row.created_at),
        author: row.author_username,
        post: parse_id(&row.post_id, "post"),
    }
}

pub(crate) fn reply(row: ReplyRow) -> ReplyResponse {
    ReplyResponse {
        id: parse_id(&row.id, "reply"),
        text: row.text,
        created: parse_timestamp(&row.created_at),
        author: row.author_username,
        comment: parse_id(&row.comment_id, "comment"),
    }
}

pub(crate) fn reaction(row: ReactionRow) -> ReactionResponse {
    ReactionResponse {
        id: parse_id(&row.id, "reaction"),
        emoji: row.emoji,
        user: row.username,
        post: parse_id(&row.post_id, "post"),
        created: parse_timestamp(&row.created_at),
    }
}

pub(crate) fn follow(row: FollowRow) -> FollowResponse {
    FollowResponse {
        user: row.follower_username,
        following: row.followed_username,
    }
}

/// Group by emoji, in enumeration order.
pub(crate) fn group_reactions(rows: &[ReactionRow]) -> Vec<ReactionGroup> {
    let mut groups: BTreeMap<Emoji, Vec<String>> = BTreeMap::new();
    for r in rows {
        groups.entry(r.emoji).or_default().push(r.username.clone());
    }

    groups
        .into_iter()
        .map(|(emoji, users)| ReactionGroup {
            emoji,
            symbol: emoji.symbol().to_string(),
            count: users.len(),
            users,
        })
        .collect()
}
