use std::time::Duration;

use crayon_common::with_timeout;
use tracing::{debug, warn};

use crate::traits::ChannelSender;

/// Discord's per-message payload limit, in characters.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Split `text` into consecutive segments of at most `max_chars` characters.
///
/// Counts Unicode scalar values, so a code point is never cut in half. The
/// segments concatenate back to the input; empty input gives no segments.
pub fn split_message(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut segments = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let cut = rest
            .char_indices()
            .nth(max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(cut);
        segments.push(head);
        rest = tail;
    }

    segments
}

/// Send `text` in order as one message per segment.
///
/// A failed or timed-out segment is logged and the remaining ones are still
/// attempted. Returns how many segments were delivered.
pub async fn send_chunked<S>(
    sender: &S,
    channel_id: &str,
    text: &str,
    max_chars: usize,
    timeout: Duration,
) -> usize
where
    S: ChannelSender + ?Sized,
{
    let segments = split_message(text, max_chars);
    let total = segments.len();
    let mut delivered = 0;

    for (index, segment) in segments.into_iter().enumerate() {
        match with_timeout("send message", timeout, sender.send_text(channel_id, segment)).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!(
                channel = channel_id,
                segment = index + 1,
                total,
                "failed to send segment: {e}"
            ),
        }
    }

    debug!(channel = channel_id, delivered, total, "reply delivered");
    delivered
}
