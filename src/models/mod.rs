use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifies one persisted conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SessionKey(pub String);

impl SessionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted group: its title and the full-document ordinals of its members.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SavedGroup {
    pub name: String,
    pub indices: Vec<usize>,
}

impl SavedGroup {
    pub fn new(name: impl Into<String>, indices: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            indices,
        }
    }
}

/// Value stored under the persistence root key: session key -> groups.
pub type SavedGroupMap = BTreeMap<String, Vec<SavedGroup>>;

/// Who authored a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub enum Role {
    #[strum(serialize = "User")]
    User,
    #[strum(serialize = "Model")]
    Model,
}

impl Role {
    pub fn icon(self) -> &'static str {
        match self {
            Role::User => "👤",
            Role::Model => "🤖",
        }
    }
}

/// Full grouping for a session, produced by every mutation and handed to the store.
///
/// Writes are fire-and-forget: callers spawn the save and return control to the
/// user immediately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveRequest {
    pub session: Option<SessionKey>,
    pub groups: Vec<SavedGroup>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub top: i32,
    pub height: i32,
    pub client_height: i32,
}

impl ScrollMetrics {
    pub fn at_end(&self) -> bool {
        self.top + self.client_height >= self.height - 1
    }
}
