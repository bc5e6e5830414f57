//! Fixed instruction texts sent to the model.

/// Persona used when no `system_prompt.txt` is available.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Crayon-chan, a friendly and playful member of \
this Discord server. Keep answers short and conversational, match the tone of the channel, \
and use the tools you are given when a question needs live data such as the weather.";

/// Instruction for the respond / stay-silent classification call.
pub const DECISION_INSTRUCTION: &str = "You decide whether the assistant should post a reply \
in a group chat. You are shown the most recent messages, oldest first; lines starting with \
\"assistant:\" were written by the assistant itself.\n\
Answer should_respond = true when the latest message directly addresses the assistant, asks \
it a follow-up to something it said, or clearly invites it to join in.\n\
Answer should_respond = false when people tell the assistant to stay out of it, when the \
chatter is between other people or off-topic for the assistant, or when nothing in the latest \
messages is aimed at it.\n\
Give a one-sentence reason.";

/// Builds the prompt for turning a tool's structured result into prose.
pub fn synthesis_prompt(tool_name: &str, data: &serde_json::Value) -> String {
    let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
    format!(
        "The `{tool_name}` tool returned this structured data:\n\n{pretty}\n\n\
         Write a short prose summary of it for the chat. Keep the tone light and cheerful, \
         use the conversation so far for context, and do not mention tools or JSON."
    )
}

/// Wraps a transcript for the classification call.
pub fn decision_prompt(transcript: &str) -> String {
    format!("Recent messages:\n{transcript}\n\nShould the assistant respond to the latest message?")
}
