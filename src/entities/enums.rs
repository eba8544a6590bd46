//! Enumerazioni - Enumerated types used by the entities

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Personal,
    Group,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Personal => "PERSONAL",
            ChatKind::Group => "GROUP",
        }
    }
}

impl FromStr for ChatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PERSONAL" => Ok(ChatKind::Personal),
            "GROUP" => Ok(ChatKind::Group),
            other => Err(format!("unknown chat kind: {}", other)),
        }
    }
}

/// Presence state announced on the personal channel
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Offline,
}
