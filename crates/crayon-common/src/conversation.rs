use serde::{Deserialize, Serialize};

/// Who produced a turn. The bot's own messages are `Model`, everyone else is `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// A channel snapshot ordered oldest first.
///
/// Never starts with a `Model` turn: an exchange with the LLM has to open with
/// a user turn, so leading model turns are dropped on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        let first_user = messages
            .iter()
            .position(|m| m.role == ChatRole::User)
            .unwrap_or(messages.len());
        let mut messages = messages;
        messages.drain(..first_user);
        Self { messages }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Turns to seed an exchange with, led by `instruction` as a synthetic user
    /// turn unless the history already opens with exactly that text.
    pub fn seeded_with(&self, instruction: &str) -> Vec<ChatMessage> {
        let already_seeded = self
            .messages
            .first()
            .is_some_and(|m| m.role == ChatRole::User && m.text == instruction);

        let mut seeded = Vec::with_capacity(self.messages.len() + 1);
        if !already_seeded {
            seeded.push(ChatMessage::user(instruction));
        }
        seeded.extend(self.messages.iter().cloned());
        seeded
    }

    /// Drop the newest turn when it is the user utterance about to be submitted,
    /// so the exchange does not see the same message twice.
    pub fn without_trailing_utterance(&self, utterance: &str) -> Self {
        let mut messages = self.messages.clone();
        if messages
            .last()
            .is_some_and(|m| m.role == ChatRole::User && m.text == utterance)
        {
            messages.pop();
        }
        Self::new(messages)
    }

    /// Render the history as a plain transcript, one `role: text` line per turn.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| {
                let who = match m.role {
                    ChatRole::User => "user",
                    ChatRole::Model => "assistant",
                };
                format!("{who}: {}", m.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Vec<ChatMessage>> for ConversationHistory {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self::new(messages)
    }
}
