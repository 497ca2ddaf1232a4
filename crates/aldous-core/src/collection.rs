//! The fixed set of collections in the Aldous database.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the five collections the tooling is allowed to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Configured AI agents.
    Agents,
    /// Derived risk analyses, one per subject.
    Analyses,
    /// Conversation sessions between a subject and an agent.
    ChatSessions,
    /// Subject profiles.
    Profiles,
    /// Authenticated users of the dashboard.
    Users,
}

impl Collection {
    /// Every recognised collection, in name order.
    pub const ALL: [Self; 5] = [
        Self::Agents,
        Self::Analyses,
        Self::ChatSessions,
        Self::Profiles,
        Self::Users,
    ];

    /// The collection name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agents => "agents",
            Self::Analyses => "analyses",
            Self::ChatSessions => "chatsessions",
            Self::Profiles => "profiles",
            Self::Users => "users",
        }
    }

    /// Comma-separated list of every valid name, for error messages.
    #[must_use]
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = UnknownCollection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCollection(s.to_string()))
    }
}

/// A collection name outside the fixed five.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid collection '{0}'; valid collections: {names}", names = Collection::valid_names())]
pub struct UnknownCollection(pub String);
