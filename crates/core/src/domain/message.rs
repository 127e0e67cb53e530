use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::code_block::CodeBlock;
use crate::error::CoreError;

/// Prefix of client-generated ids for messages not yet seen by the server.
pub const TEMP_ID_PREFIX: &str = "temp-";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::UnknownRole(s.to_string()))
    }
}

/// How the assistant classified a turn: a clarifying question or generated code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MessageAction {
    Ask,
    #[default]
    Generate,
}

impl MessageAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ask => "ask",
            Self::Generate => "generate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ask" => Some(Self::Ask),
            "generate" => Some(Self::Generate),
            _ => None,
        }
    }
}

impl FromStr for MessageAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::UnknownAction(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub code_blocks: Vec<CodeBlock>,
    #[serde(default)]
    pub action: MessageAction,
    #[serde(default)]
    pub questions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Locally inserted user message shown before the server answers.
    pub fn optimistic_user(content: impl Into<String>) -> Self {
        Self {
            id: format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4()),
            role: Role::User,
            content: content.into(),
            code_blocks: Vec::new(),
            action: MessageAction::Generate,
            questions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_optimistic(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Follow-up questions, only when the assistant asked for clarification.
    pub fn follow_up_questions(&self) -> &[String] {
        if self.is_assistant() && self.action == MessageAction::Ask {
            &self.questions
        } else {
            &[]
        }
    }

    /// Server-supplied code blocks, falling back to blocks parsed from the
    /// content for assistant replies that arrived without any.
    pub fn effective_code_blocks(&self) -> Vec<CodeBlock> {
        if !self.code_blocks.is_empty() || !self.is_assistant() {
            return self.code_blocks.clone();
        }
        CodeBlock::extract(&self.content)
    }
}
