//! Chat messages and conversation assembly.

use serde::{Deserialize, Serialize};

/// System message used when the caller does not supply one.
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are an expert taxonomy creator.";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role/content pair in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Input to a chat completion: a bare prompt or an existing conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Prompt(String),
    Messages(Vec<Message>),
}

impl From<&str> for ChatInput {
    fn from(prompt: &str) -> Self {
        ChatInput::Prompt(prompt.to_string())
    }
}

impl From<String> for ChatInput {
    fn from(prompt: String) -> Self {
        ChatInput::Prompt(prompt)
    }
}

impl From<Vec<Message>> for ChatInput {
    fn from(messages: Vec<Message>) -> Self {
        ChatInput::Messages(messages)
    }
}

/// Put a system message in front of the input.
///
/// A prompt becomes `[system, user(prompt)]`; a conversation keeps its
/// messages after the system message.
pub fn build_conversation(input: impl Into<ChatInput>, system_message: &str) -> Vec<Message> {
    let system = Message::system(system_message);
    match input.into() {
        ChatInput::Prompt(prompt) => vec![system, Message::user(prompt)],
        ChatInput::Messages(messages) => {
            let mut conversation = Vec::with_capacity(messages.len() + 1);
            conversation.push(system);
            conversation.extend(messages);
            conversation
        }
    }
}
