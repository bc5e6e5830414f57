use std::sync::Arc;
use std::time::Duration;

use crayon_common::{Error, with_timeout};
use serenity::all::{Channel, ChannelId, Context, Message};
use tracing::{info, warn};

use crate::chunk::{MAX_MESSAGE_LEN, send_chunked};
use crate::traits::ChannelSender;

/// A literal text command, recognised before any LLM involvement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// List the channels of the current server.
    Channels,
    /// Relay `text` into another channel.
    Send { channel_id: &'a str, text: &'a str },
    /// `send` with missing arguments.
    SendUsage,
}

pub fn parse<'a>(content: &'a str, prefix: &str) -> Option<Command<'a>> {
    let body = content.trim().strip_prefix(prefix)?;
    if body == "channels" {
        return Some(Command::Channels);
    }

    let args = body.strip_prefix("send ")?;
    match args.split_once(' ') {
        Some((channel_id, text)) if !channel_id.is_empty() && !text.trim().is_empty() => {
            Some(Command::Send { channel_id, text })
        }
        _ => Some(Command::SendUsage),
    }
}

pub fn send_usage(prefix: &str) -> String {
    format!("Usage: {prefix}send <channelId> <message>")
}

pub fn format_channel_list<'a>(channels: impl IntoIterator<Item = (&'a str, u64)>) -> String {
    let mut list = String::from("Channels in this server:\n");
    for (name, id) in channels {
        list.push_str(&format!("- {name} ({id})\n"));
    }
    list
}

pub async fn execute(
    ctx: &Context,
    msg: &Message,
    command: Command<'_>,
    prefix: &str,
    reply_to: &Arc<dyn ChannelSender>,
    timeout: Duration,
) {
    let reply = match command {
        Command::Channels => list_channels(ctx, msg, timeout).await,
        Command::SendUsage => send_usage(prefix),
        Command::Send { channel_id, text } => relay(ctx, channel_id, text, timeout).await,
    };

    send_chunked(
        reply_to.as_ref(),
        &msg.channel_id.to_string(),
        &reply,
        MAX_MESSAGE_LEN,
        timeout,
    )
    .await;
}

fn discord_err(e: serenity::Error) -> Error {
    Error::Channel(e.to_string())
}

async fn list_channels(ctx: &Context, msg: &Message, timeout: Duration) -> String {
    let Some(guild_id) = msg.guild_id else {
        return "Could not retrieve channels.".to_string();
    };

    let fetch = async { guild_id.channels(ctx).await.map_err(discord_err) };
    match with_timeout("list channels", timeout, fetch).await {
        Ok(channels) => {
            let mut channels: Vec<_> = channels.into_values().collect();
            channels.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
            format_channel_list(channels.iter().map(|c| (c.name.as_str(), c.id.get())))
        }
        Err(e) => {
            warn!(guild = %guild_id, "failed to list channels: {e}");
            "Could not retrieve channels.".to_string()
        }
    }
}

async fn relay(ctx: &Context, channel_id: &str, text: &str, timeout: Duration) -> String {
    let not_found = format!("Channel {channel_id} not found or not a text channel.");
    let Some(id) = channel_id.parse::<u64>().ok().filter(|id| *id != 0) else {
        return not_found;
    };

    let resolve = async { ChannelId::new(id).to_channel(ctx).await.map_err(discord_err) };
    let target = match with_timeout("resolve channel", timeout, resolve).await {
        Ok(Channel::Guild(channel)) if channel.is_text_based() => channel,
        Ok(_) => return not_found,
        Err(e) => {
            warn!(channel = id, "failed to resolve relay target: {e}");
            return not_found;
        }
    };

    let send = async { target.say(ctx, text).await.map_err(discord_err) };
    match with_timeout("relay message", timeout, send).await {
        Ok(_) => {
            info!(channel = id, "relayed message");
            format!("Sent message to channel {channel_id}")
        }
        Err(e) => {
            warn!(channel = id, "could not relay message: {e}");
            format!("Could not send message to channel {channel_id}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_command_is_exact() {
        assert_eq!(parse("!channels", "!"), Some(Command::Channels));
        assert_eq!(parse("!channels please", "!"), None);
        assert_eq!(parse("channels", "!"), None);
    }

    #[test]
    fn send_command_splits_id_and_text() {
        assert_eq!(
            parse("!send 123 hello there  friend", "!"),
            Some(Command::Send {
                channel_id: "123",
                text: "hello there  friend"
            })
        );
    }

    #[test]
    fn send_without_text_asks_for_usage() {
        assert_eq!(parse("!send 123", "!"), Some(Command::SendUsage));
        assert_eq!(parse("!send  hello", "!"), Some(Command::SendUsage));
        assert_eq!(send_usage("!"), "Usage: !send <channelId> <message>");
    }

    #[test]
    fn plain_chat_is_not_a_command() {
        assert_eq!(parse("what's the weather?", "!"), None);
        assert_eq!(parse("!sending love", "!"), None);
    }

    #[test]
    fn custom_prefix_is_honoured() {
        assert_eq!(parse("?channels", "?"), Some(Command::Channels));
        assert_eq!(parse("!channels", "?"), None);
    }

    #[test]
    fn channel_list_formats_name_and_id() {
        let list = format_channel_list([("general", 1u64), ("bot-dev", 2)]);
        assert_eq!(list, "Channels in this server:\n- general (1)\n- bot-dev (2)\n");
    }
}
