use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// A community poll.
///
/// Options keep their submission order and each carries a vote counter
/// that only ever increases. A member votes at most once per poll; the
/// store enforces this with a uniqueness constraint on (poll, member).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: Uuid,
    pub question: String,
    pub author_id: Uuid,
    pub options: Vec<PollOption>,
    pub status: PollStatus,
    /// Votes are rejected after this instant even while status is `Active`.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One choice within a poll, identified by its position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
    pub index: u32,
    pub label: String,
    pub votes: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    Active,
    Closed,
}

impl PollStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl Poll {
    /// Whether the poll still accepts votes at `now`.
    pub fn open_for_votes(&self, now: DateTime<Utc>) -> bool {
        self.status == PollStatus::Active && self.expires_at.map_or(true, |at| now < at)
    }

    /// The state name a vote guard should report when voting is blocked.
    pub fn blocked_state(&self, now: DateTime<Utc>) -> &'static str {
        if self.status == PollStatus::Closed {
            "closed"
        } else if self.expires_at.is_some_and(|at| now >= at) {
            "expired"
        } else {
            "active"
        }
    }
}

/// Input for creating a poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePollInput {
    pub question: String,
    pub options: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreatePollInput {
    pub fn validate(&self) -> Result<(), Error> {
        if self.question.trim().is_empty() {
            return Err(Error::validation("question must not be empty"));
        }
        if self.options.len() < 2 {
            return Err(Error::validation("a poll needs at least two options"));
        }
        if self.options.iter().any(|o| o.trim().is_empty()) {
            return Err(Error::validation("poll options must not be empty"));
        }
        Ok(())
    }
}

/// Input for casting a vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteInput {
    pub option: u32,
}

/// A poll as seen by a particular viewer, carrying whether (and how)
/// they already voted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollView {
    #[serde(flatten)]
    pub poll: Poll,
    pub has_voted: bool,
    pub voted_option: Option<u32>,
}
