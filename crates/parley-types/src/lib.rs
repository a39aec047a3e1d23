pub mod api;
pub mod events;
pub mod models;

/// Well-known id of the one public channel. Resolvable without a store
/// lookup; seeded at startup.
pub const PUBLIC_CHANNEL_ID: &str = "public-chat";
