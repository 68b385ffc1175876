use crate::models::{ChannelRow, CommentRow, PostRow, ReplyRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

const USER_SELECT: &str = "SELECT id, username, password, created_at FROM users";

const CHANNEL_SELECT: &str = "SELECT c.id, c.title, c.description, c.avatar, c.author_id, u.username, c.created_at
     FROM channels c
     JOIN users u ON c.author_id = u.id";

const POST_SELECT: &str = "SELECT p.id, p.text, p.channel_id, p.author_id, u.username, p.pub_date
     FROM posts p
     JOIN users u ON p.author_id = u.id";

const COMMENT_SELECT: &str = "SELECT m.id, m.text, m.post_id, m.author_id, u.username, m.created_at
     FROM comments m
     JOIN users u ON m.author_id = u.id";

const REPLY_SELECT: &str = "SELECT r.id, r.text, r.comment_id, r.author_id, u.username, r.created_at
     FROM replies r
     JOIN users u ON r.author_id = u.id";

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("{USER_SELECT} WHERE username = ?1");
            Ok(conn.query_row(&sql, [username], user_from_row).optional()?)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("{USER_SELECT} WHERE id = ?1");
            Ok(conn.query_row(&sql, [id], user_from_row).optional()?)
        })
    }

    // -- Channels --

    pub fn create_channel(
        &self,
        id: &str,
        title: &str,
        description: &str,
        avatar: Option<&str>,
        author_id: &str,
    ) -> Result<ChannelRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO channels (id, title, description, avatar, author_id) VALUES (?1, ?2, ?3, NULLIF(?4, ''), ?5)",
                params![id, title, description, avatar, author_id],
            )?;
            query_channel(conn, id)?.ok_or_else(|| anyhow::anyhow!("Channel vanished after insert: {}", id))
        })
    }

    pub fn get_channel(&self, id: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| query_channel(conn, id))
    }

    pub fn list_channels(&self, limit: u32, offset: u32) -> Result<Vec<ChannelRow>> {
        self.with_conn(|conn| {
            let sql = format!("{CHANNEL_SELECT} ORDER BY c.title LIMIT ?1 OFFSET ?2");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![limit, offset], channel_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_channels(&self) -> Result<u64> {
        self.with_conn(|conn| count(conn, "SELECT COUNT(*) FROM channels", params![]))
    }

    /// Whether `title` is used by a channel other than `except_id`.
    pub fn channel_title_taken(&self, title: &str, except_id: Option<&str>) -> Result<bool> {
        self.with_conn(|conn| {
            let taken = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM channels WHERE title = ?1 AND (?2 IS NULL OR id <> ?2))",
                params![title, except_id],
                |row| row.get(0),
            )?;
            Ok(taken)
        })
    }

    /// Fields left as `None` keep their current value. An empty avatar clears it.
    pub fn update_channel(
        &self,
        id: &str,
        title: Option<&str>,
        description: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<Option<ChannelRow>> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE channels
                 SET title = COALESCE(?2, title),
                     description = COALESCE(?3, description),
                     avatar = CASE WHEN ?4 IS NULL THEN avatar ELSE NULLIF(?4, '') END
                 WHERE id = ?1",
                params![id, title, description, avatar],
            )?;
            query_channel(conn, id)
        })
    }

    /// Removes the channel and, by cascade, its posts. Returns false if absent.
    pub fn delete_channel(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| Ok(conn.execute("DELETE FROM channels WHERE id = ?1", [id])? > 0))
    }

    /// Channels whose author `follower_id` follows.
    pub fn list_followed_channels(&self, follower_id: &str) -> Result<Vec<ChannelRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{CHANNEL_SELECT}
                 JOIN follows f ON f.followed_id = c.author_id
                 WHERE f.follower_id = ?1
                 ORDER BY c.title"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([follower_id], channel_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Posts --

    pub fn create_post(&self, id: &str, text: &str, channel_id: &str, author_id: &str) -> Result<PostRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, text, channel_id, author_id) VALUES (?1, ?2, ?3, ?4)",
                params![id, text, channel_id, author_id],
            )?;
            query_post(conn, id)?.ok_or_else(|| anyhow::anyhow!("Post vanished after insert: {}", id))
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| query_post(conn, id))
    }

    /// Newest first.
    pub fn list_posts(&self, limit: u32, offset: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{POST_SELECT} ORDER BY p.pub_date DESC, p.rowid DESC LIMIT ?1 OFFSET ?2");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![limit, offset], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_posts(&self) -> Result<u64> {
        self.with_conn(|conn| count(conn, "SELECT COUNT(*) FROM posts", params![]))
    }

    pub fn list_channel_posts(&self, channel_id: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{POST_SELECT} WHERE p.channel_id = ?1 ORDER BY p.pub_date DESC, p.rowid DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([channel_id], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Posts in channels whose authors `follower_id` follows, newest first.
    pub fn list_feed(&self, follower_id: &str, limit: u32, offset: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{POST_SELECT}
                 JOIN channels c ON p.channel_id = c.id
                 JOIN follows f ON f.followed_id = c.author_id
                 WHERE f.follower_id = ?1
                 ORDER BY p.pub_date DESC, p.rowid DESC
                 LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![follower_id, limit, offset], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_feed(&self, follower_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            count(
                conn,
                "SELECT COUNT(*)
                 FROM posts p
                 JOIN channels c ON p.channel_id = c.id
                 JOIN follows f ON f.followed_id = c.author_id
                 WHERE f.follower_id = ?1",
                [follower_id],
            )
        })
    }

    pub fn update_post(&self, id: &str, text: Option<&str>, channel_id: Option<&str>) -> Result<Option<PostRow>> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE posts SET text = COALESCE(?2, text), channel_id = COALESCE(?3, channel_id) WHERE id = ?1",
                params![id, text, channel_id],
            )?;
            query_post(conn, id)
        })
    }

    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| Ok(conn.execute("DELETE FROM posts WHERE id = ?1", [id])? > 0))
    }

    // -- Comments --

    pub fn create_comment(&self, id: &str, text: &str, post_id: &str, author_id: &str) -> Result<CommentRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, text, post_id, author_id) VALUES (?1, ?2, ?3, ?4)",
                params![id, text, post_id, author_id],
            )?;
            query_comment(conn, id)?.ok_or_else(|| anyhow::anyhow!("Comment vanished after insert: {}", id))
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| query_comment(conn, id))
    }

    pub fn list_comments(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!("{COMMENT_SELECT} WHERE m.post_id = ?1 ORDER BY m.created_at, m.rowid");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([post_id], comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Only the text is mutable; author and post are fixed at creation.
    pub fn update_comment(&self, id: &str, text: &str) -> Result<Option<CommentRow>> {
        self.with_conn_mut(|conn| {
            conn.execute("UPDATE comments SET text = ?2 WHERE id = ?1", params![id, text])?;
            query_comment(conn, id)
        })
    }

    pub fn delete_comment(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| Ok(conn.execute("DELETE FROM comments WHERE id = ?1", [id])? > 0))
    }

    // -- Replies --

    pub fn create_reply(&self, id: &str, text: &str, comment_id: &str, author_id: &str) -> Result<ReplyRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO replies (id, text, comment_id, author_id) VALUES (?1, ?2, ?3, ?4)",
                params![id, text, comment_id, author_id],
            )?;
            query_reply(conn, id)?.ok_or_else(|| anyhow::anyhow!("Reply vanished after insert: {}", id))
        })
    }

    pub fn get_reply(&self, id: &str) -> Result<Option<ReplyRow>> {
        self.with_conn(|conn| query_reply(conn, id))
    }

    pub fn list_replies(&self, comment_id: &str) -> Result<Vec<ReplyRow>> {
        self.with_conn(|conn| {
            let sql = format!("{REPLY_SELECT} WHERE r.comment_id = ?1 ORDER BY r.created_at, r.rowid");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([comment_id], reply_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_reply(&self, id: &str, text: &str) -> Result<Option<ReplyRow>> {
        self.with_conn_mut(|conn| {
            conn.execute("UPDATE replies SET text = ?2 WHERE id = ?1", params![id, text])?;
            query_reply(conn, id)
        })
    }

    pub fn delete_reply(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| Ok(conn.execute("DELETE FROM replies WHERE id = ?1", [id])? > 0))
    }
}

fn count<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<u64> {
    let n: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    Ok(n as u64)
}

fn query_channel(conn: &Connection, id: &str) -> Result<Option<ChannelRow>> {
    let sql = format!("{CHANNEL_SELECT} WHERE c.id = ?1");
    Ok(conn.query_row(&sql, [id], channel_from_row).optional()?)
}

fn query_post(conn: &Connection, id: &str) -> Result<Option<PostRow>> {
    let sql = format!("{POST_SELECT} WHERE p.id = ?1");
    Ok(conn.query_row(&sql, [id], post_from_row).optional()?)
}

fn query_comment(conn: &Connection, id: &str) -> Result<Option<CommentRow>> {
    let sql = format!("{COMMENT_SELECT} WHERE m.id = ?1");
    Ok(conn.query_row(&sql, [id], comment_from_row).optional()?)
}

fn query_reply(conn: &Connection, id: &str) -> Result<Option<ReplyRow>> {
    let sql = format!("{REPLY_SELECT} WHERE r.id = ?1");
    Ok(conn.query_row(&sql, [id], reply_from_row).optional()?)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<ChannelRow> {
    Ok(ChannelRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        avatar: row.get(3)?,
        author_id: row.get(4)?,
        author_username: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        text: row.get(1)?,
        channel_id: row.get(2)?,
        author_id: row.get(3)?,
        author_username: row.get(4)?,
        pub_date: row.get(5)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        text: row.get(1)?,
        post_id: row.get(2)?,
        author_id: row.get(3)?,
        author_username: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn reply_from_row(row: &Row<'_>) -> rusqlite::Result<ReplyRow> {
    Ok(ReplyRow {
        id: row.get(0)?,
        text: row.get(1)?,
        comment_id: row.get(2)?,
        author_id: row.get(3)?,
        author_username: row.get(4)?,
        created_at: row.get(5)?,
    })
}
