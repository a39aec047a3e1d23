/// Database row types — these map directly to SQLite rows.
/// Distinct from parley-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub name: String,
    pub created_at: String,
}

pub struct ChannelRow {
    pub id: String,
    pub name: Option<String>,
    pub channel_type: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    pub channel_id: String,
    pub created_at: i64,
}
