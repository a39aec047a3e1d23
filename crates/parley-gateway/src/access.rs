use anyhow::Result;
use uuid::Uuid;

use parley_db::Database;
use parley_types::PUBLIC_CHANNEL_ID;
use parley_types::models::ChannelType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied,
    ChannelNotFound,
}

/// Channel visibility predicate. Re-reads membership on every call so
/// membership edits take effect on the next evaluation.
///
/// The public channel's well-known id short-circuits to Granted without
/// touching the store; unknown stored channel types fail closed.
pub fn check_access(db: &Database, user_id: Uuid, channel_id: &str) -> Result<Access> {
    if channel_id == PUBLIC_CHANNEL_ID {
        return Ok(Access::Granted);
    }

    let Some(channel) = db.get_channel(channel_id)? else {
        return Ok(Access::ChannelNotFound);
    };

    match ChannelType::parse(&channel.channel_type) {
        Some(ChannelType::PublicChat) => Ok(Access::Granted),
        Some(ChannelType::GroupChat) | Some(ChannelType::Dm) => {
            if db.membership_exists(&user_id.to_string(), &channel.id)? {
                Ok(Access::Granted)
            } else {
                Ok(Access::Denied)
            }
        }
        None => Ok(Access::Denied),
    }
}
