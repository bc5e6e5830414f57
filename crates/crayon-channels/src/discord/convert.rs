use chrono::{DateTime, Utc};
use crayon_common::{ChannelMessage, IncomingMessage};
use serenity::all::{Message, UserId};

/// First millisecond of 2015, the zero point of Discord snowflakes.
pub const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Creation time encoded in a Discord snowflake id.
pub fn snowflake_timestamp(id: u64) -> DateTime<Utc> {
    let millis = (id >> 22).saturating_add(DISCORD_EPOCH_MS);
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// A message counts as addressed to the bot when it mentions the bot or
/// replies to one of the bot's messages.
pub fn addresses_bot(
    mentioned: impl IntoIterator<Item = u64>,
    replied_to_author: Option<u64>,
    bot_id: u64,
) -> bool {
    replied_to_author == Some(bot_id) || mentioned.into_iter().any(|id| id == bot_id)
}

/// Rewrite `<@id>` / `<@!id>` mention markup for the bot as `@name`, so the
/// model can still see who a message was aimed at.
pub fn name_bot_mention(content: &str, bot_id: u64, bot_name: &str) -> String {
    let handle = format!("@{bot_name}");
    content
        .replace(&format!("<@!{bot_id}>"), &handle)
        .replace(&format!("<@{bot_id}>"), &handle)
        .trim()
        .to_string()
}

pub fn incoming_from_discord(msg: &Message, bot_id: UserId, bot_name: &str) -> IncomingMessage {
    let bot = bot_id.get();
    let mentions_bot = addresses_bot(
        msg.mentions.iter().map(|u| u.id.get()),
        msg.referenced_message.as_ref().map(|m| m.author.id.get()),
        bot,
    );

    IncomingMessage {
        id: msg.id.to_string(),
        channel_id: msg.channel_id.to_string(),
        guild_id: msg.guild_id.map(|g| g.to_string()),
        author_id: msg.author.id.to_string(),
        author_name: msg.author.name.clone(),
        content: name_bot_mention(&msg.content, bot, bot_name),
        mentions_bot,
        timestamp: snowflake_timestamp(msg.id.get()),
    }
}

pub fn history_entry(msg: &Message, bot_id: UserId, bot_name: &str) -> ChannelMessage {
    ChannelMessage {
        id: msg.id.to_string(),
        author_id: msg.author.id.to_string(),
        content: name_bot_mention(&msg.content, bot_id.get(), bot_name),
        timestamp: snowflake_timestamp(msg.id.get()),
        from_self: msg.author.id == bot_id,
    }
}
