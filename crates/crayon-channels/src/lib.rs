pub mod chunk;
pub mod history;
pub mod traits;

#[cfg(feature = "discord")]
pub mod discord;

pub use chunk::{MAX_MESSAGE_LEN, send_chunked, split_message};
pub use history::{DEFAULT_HISTORY_WINDOW, HistoryFetcher};
pub use traits::{
    ChannelHistory, ChannelLifecycle, ChannelSender, ChannelStatus, ChatPlatform, MessageHandler,
};
