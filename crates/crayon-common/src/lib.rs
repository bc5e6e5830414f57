pub mod conversation;
pub mod error;
pub mod message;
pub mod timeout;

pub use conversation::{ChatMessage, ChatRole, ConversationHistory};
pub use error::{Error, Result};
pub use message::{ChannelMessage, IncomingMessage};
pub use timeout::with_timeout;
