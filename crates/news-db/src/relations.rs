//! Follow and reaction rows: the two relationship kinds that are toggled
//! (created or destroyed) rather than updated.

use crate::models::{FollowRow, ReactionRow};
use crate::Database;
use anyhow::Result;
use news_types::models::Emoji;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Row, params};

/// Existence checks the relationship validators read through.
pub trait RelationStore {
    fn follow_exists(&self, follower_id: &str, followed_id: &str) -> Result<bool>;

    /// Scoped to (user, emoji) across all posts.
    fn reaction_exists(&self, user_id: &str, emoji: Emoji) -> Result<bool>;
}

impl RelationStore for Database {
    fn follow_exists(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND followed_id = ?2)",
                [follower_id, followed_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    fn reaction_exists(&self, user_id: &str, emoji: Emoji) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM reactions WHERE user_id = ?1 AND emoji = ?2)",
                params![user_id, StoredEmoji(emoji)],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }
}

impl Database {
    // -- Follows --

    pub fn create_follow(&self, id: &str, follower_id: &str, followed_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO follows (id, follower_id, followed_id) VALUES (?1, ?2, ?3)",
                [id, follower_id, followed_id],
            )?;
            Ok(())
        })
    }

    /// Returns the number of rows removed (0 or 1).
    pub fn delete_follow(&self, follower_id: &str, followed_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                [follower_id, followed_id],
            )?;
            Ok(n)
        })
    }

    /// Follows of `follower_id`, optionally filtered by a case-insensitive
    /// substring of the followed username.
    pub fn list_follows(&self, follower_id: &str, search: Option<&str>) -> Result<Vec<FollowRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT f.id, f.follower_id, a.username, f.followed_id, b.username, f.created_at
                 FROM follows f
                 JOIN users a ON f.follower_id = a.id
                 JOIN users b ON f.followed_id = b.id
                 WHERE f.follower_id = ?1
                   AND (?2 IS NULL OR instr(lower(b.username), lower(?2)) > 0)
                 ORDER BY b.username",
            )?;
            let rows = stmt
                .query_map(params![follower_id, search], follow_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Reactions --

    pub fn create_reaction(&self, id: &str, post_id: &str, user_id: &str, emoji: Emoji) -> Result<ReactionRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO reactions (id, post_id, user_id, emoji) VALUES (?1, ?2, ?3, ?4)",
                params![id, post_id, user_id, StoredEmoji(emoji)],
            )?;
            let row = conn.query_row(
                "SELECT r.id, r.post_id, r.user_id, u.username, r.emoji, r.created_at
                 FROM reactions r
                 JOIN users u ON r.user_id = u.id
                 WHERE r.id = ?1",
                [id],
                reaction_from_row,
            )?;
            Ok(row)
        })
    }

    /// Removes the user's reaction with `emoji`, wherever it was placed.
    pub fn delete_reaction(&self, user_id: &str, emoji: Emoji) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM reactions WHERE user_id = ?1 AND emoji = ?2",
                params![user_id, StoredEmoji(emoji)],
            )?;
            Ok(n)
        })
    }

    pub fn list_post_reactions(&self, post_id: &str) -> Result<Vec<ReactionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.post_id, r.user_id, u.username, r.emoji, r.created_at
                 FROM reactions r
                 JOIN users u ON r.user_id = u.id
                 WHERE r.post_id = ?1
                 ORDER BY r.created_at, r.rowid",
            )?;
            let rows = stmt
                .query_map([post_id], reaction_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch reactions for a page of posts.
    pub fn list_reactions_for_posts(&self, post_ids: &[String]) -> Result<Vec<ReactionRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT r.id, r.post_id, r.user_id, u.username, r.emoji, r.created_at
                 FROM reactions r
                 JOIN users u ON r.user_id = u.id
                 WHERE r.post_id IN ({})
                 ORDER BY r.created_at, r.rowid",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn ToSql> = post_ids.iter().map(|id| id as &dyn ToSql).collect();

            let rows = stmt
                .query_map(params.as_slice(), reaction_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

/// Emoji column codec: stored by name.
struct StoredEmoji(Emoji);

impl ToSql for StoredEmoji {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.name()))
    }
}

impl FromSql for StoredEmoji {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map(StoredEmoji)
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

fn reaction_from_row(row: &Row<'_>) -> rusqlite::Result<ReactionRow> {
    Ok(ReactionRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        user_id: row.get(2)?,
        username: row.get(3)?,
        emoji: row.get::<_, StoredEmoji>(4)?.0,
        created_at: row.get(5)?,
    })
}

fn follow_from_row(row: &Row<'_>) -> rusqlite::Result<FollowRow> {
    Ok(FollowRow {
        id: row.get(0)?,
        follower_id: row.get(1)?,
        follower_username: row.get(2)?,
        followed_id: row.get(3)?,
        followed_username: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_constraint_violation;
    use crate::queries::tests::seed_user;

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "u1", "alice");
        seed_user(&db, "u2", "bob");
        seed_user(&db, "u3", "Carol");
        db.create_channel("c1", "News", "", None, "u1").unwrap();
        db.create_post("p1", "one", "c1", "u1").unwrap();
        db.create_post("p2", "two", "c1", "u1").unwrap();
        db
    }

    #[test]
    fn follow_round_trip() {
        let db = seeded();
        assert!(!db.follow_exists("u2", "u1").unwrap());

        db.create_follow("f1", "u2", "u1").unwrap();
        assert!(db.follow_exists("u2", "u1").unwrap());
        // Direction matters
        assert!(!db.follow_exists("u1", "u2").unwrap());

        assert_eq!(db.delete_follow("u2", "u1").unwrap(), 1);
        assert_eq!(db.delete_follow("u2", "u1").unwrap(), 0);
    }

    #[test]
    fn storage_rejects_duplicate_and_self_follows() {
        let db = seeded();
        db.create_follow("f1", "u2", "u1").unwrap();

        let dup = db.create_follow("f2", "u2", "u1").unwrap_err();
        assert!(is_constraint_violation(&dup));

        let own = db.create_follow("f3", "u1", "u1").unwrap_err();
        assert!(is_constraint_violation(&own));
    }

    #[test]
    fn follow_search_is_case_insensitive() {
        let db = seeded();
        db.create_follow("f1", "u2", "u1").unwrap();
        db.create_follow("f2", "u2", "u3").unwrap();

        let all = db.list_follows("u2", None).unwrap();
        assert_eq!(all.len(), 2);

        let carol = db.list_follows("u2", Some("caR")).unwrap();
        assert_eq!(carol.len(), 1);
        assert_eq!(carol[0].followed_username, "Carol");
        assert_eq!(carol[0].follower_username, "bob");
    }

    #[test]
    fn reaction_uniqueness_spans_posts() {
        let db = seeded();
        let row = db.create_reaction("r1", "p1", "u2", Emoji::Fire).unwrap();
        assert_eq!(row.emoji, Emoji::Fire);
        assert_eq!(row.username, "bob");

        assert!(db.reaction_exists("u2", Emoji::Fire).unwrap());
        assert!(!db.reaction_exists("u2", Emoji::Like).unwrap());

        let err = db.create_reaction("r2", "p2", "u2", Emoji::Fire).err().unwrap();
        assert!(is_constraint_violation(&err));

        db.create_reaction("r3", "p2", "u2", Emoji::Like).unwrap();
        assert_eq!(db.list_post_reactions("p2").unwrap().len(), 1);

        let batch = db
            .list_reactions_for_posts(&["p1".to_string(), "p2".to_string()])
            .unwrap();
        assert_eq!(batch.len(), 2);

        assert_eq!(db.delete_reaction("u2", Emoji::Fire).unwrap(), 1);
        assert_eq!(db.delete_reaction("u2", Emoji::Fire).unwrap(), 0);
    }

    #[test]
    fn feed_follows_channel_authors() {
        let db = seeded();
        db.create_channel("c2", "Other", "", None, "u3").unwrap();
        db.create_post("p3", "carol's", "c2", "u3").unwrap();

        assert_eq!(db.count_feed("u2").unwrap(), 0);

        db.create_follow("f1", "u2", "u1").unwrap();
        let feed = db.list_feed("u2", 10, 0).unwrap();
        let ids: Vec<_> = feed.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1"]);
        assert_eq!(db.count_feed("u2").unwrap(), 2);

        let channels = db.list_followed_channels("u2").unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].id, "c1");
    }
}
