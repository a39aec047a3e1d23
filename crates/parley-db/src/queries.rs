use crate::Database;
use crate::models::{ChannelRow, MessageRow, UserRow};
use anyhow::Result;
use parley_types::PUBLIC_CHANNEL_ID;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str, name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, name) VALUES (?1, ?2, ?3, ?4)",
                (id, username, password_hash, name),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Channels --

    pub fn create_channel(&self, id: &str, name: Option<&str>, channel_type: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO channels (id, name, type) VALUES (?1, ?2, ?3)",
                (id, name, channel_type),
            )?;
            Ok(())
        })
    }

    pub fn get_channel(&self, id: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, type, created_at FROM channels WHERE id = ?1")?;
            let row = stmt
                .query_row([id], |row| {
                    Ok(ChannelRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        channel_type: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn rename_channel(&self, id: &str, name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE channels SET name = ?1 WHERE id = ?2", (name, id))?;
            Ok(())
        })
    }

    /// Idempotent public-channel bootstrap. The fixed primary key means
    /// calling this any number of times leaves exactly one public channel.
    /// Returns true if this call created it.
    pub fn ensure_public_channel(&self) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO channels (id, name, type) VALUES (?1, 'Public Chat', 'public_chat')",
                [PUBLIC_CHANNEL_ID],
            )?;
            Ok(inserted > 0)
        })
    }

    /// Channels the user is an explicit member of (group chats and DMs).
    /// The public channel has no membership rows and is not listed.
    pub fn channels_for_user(&self, user_id: &str) -> Result<Vec<ChannelRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.name, c.type, c.created_at
                 FROM channels c
                 JOIN channel_members m ON m.channel_id = c.id
                 WHERE m.user_id = ?1
                 ORDER BY c.created_at",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ChannelRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        channel_type: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Memberships --

    pub fn membership_exists(&self, user_id: &str, channel_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM channel_members WHERE user_id = ?1 AND channel_id = ?2",
                (user_id, channel_id),
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn create_membership(&self, user_id: &str, channel_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO channel_members (user_id, channel_id) VALUES (?1, ?2)",
                (user_id, channel_id),
            )?;
            Ok(())
        })
    }

    pub fn delete_membership(&self, user_id: &str, channel_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM channel_members WHERE user_id = ?1 AND channel_id = ?2",
                (user_id, channel_id),
            )?;
            Ok(())
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        content: &str,
        author_id: &str,
        channel_id: &str,
        created_at: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, content, author_id, channel_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, content, author_id, channel_id, created_at],
            )?;
            Ok(())
        })
    }

    /// Full history for a channel, oldest first.
    pub fn get_messages(&self, channel_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            // JOIN users to fetch the author name in a single query
            let mut stmt = conn.prepare(
                "SELECT m.id, m.content, m.author_id, u.name, m.channel_id, m.created_at
                 FROM messages m
                 LEFT JOIN users u ON m.author_id = u.id
                 WHERE m.channel_id = ?1
                 ORDER BY m.created_at ASC",
            )?;
            let rows = stmt
                .query_map([channel_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        content: row.get(1)?,
                        author_id: row.get(2)?,
                        author_name: row
                            .get::<_, Option<String>>(3)?
                            .unwrap_or_else(|| "unknown".to_string()),
                        channel_id: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, password, name, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                name: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;
    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
