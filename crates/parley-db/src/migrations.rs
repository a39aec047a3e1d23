use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            name        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS channels (
            id          TEXT PRIMARY KEY,
            name        TEXT,
            type        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS channel_members (
            user_id     TEXT NOT NULL REFERENCES users(id),
            channel_id  TEXT NOT NULL REFERENCES channels(id),
            UNIQUE(user_id, channel_id)
        );

        CREATE INDEX IF NOT EXISTS idx_members_channel
            ON channel_members(channel_id);

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            content     TEXT NOT NULL,
            author_id   TEXT NOT NULL REFERENCES users(id),
            channel_id  TEXT NOT NULL REFERENCES channels(id),
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_channel
            ON messages(channel_id, created_at);

        -- Seed the public channel under its well-known id. The fixed
        -- primary key keeps repeated bootstraps from ever creating a
        -- second public channel.
        INSERT OR IGNORE INTO channels (id, name, type)
            VALUES ('public-chat', 'Public Chat', 'public_chat');
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
