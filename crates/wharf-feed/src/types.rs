use serde::{Deserialize, Serialize};

use crate::score::SCORE_RESOLUTION;

/// Replication action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Update,
    Delete,
    Resync,
}

/// One replication instruction for a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub package: String,
    pub time: i64,
}

impl FeedAction {
    pub(crate) fn from_score(action_type: ActionType, package: String, score: i64) -> Self {
        Self {
            action_type,
            package,
            time: score / SCORE_RESOLUTION,
        }
    }

    /// The wildcard action telling a client to discard local state and
    /// refetch the whole catalog.
    pub(crate) fn resync(head: i64) -> Self {
        Self::from_score(ActionType::Resync, "*".to_string(), head)
    }
}

/// Reply envelope of a feed query.
///
/// `timestamp` is the current head score; a client always advances its
/// cursor to it, even when `actions` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedResponse {
    pub actions: Vec<FeedAction>,
    pub timestamp: i64,
}
