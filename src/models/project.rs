use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

use super::member::Committee;

/// A member-proposed club project.
///
/// Projects move through an explicit lifecycle: submitted as `Pending`,
/// an admin either approves them (assigning the point value the project
/// will pay out) or rejects them with a reason. Approved projects can be
/// edited and eventually completed, at which point the point value is
/// credited to every member who joined. `Rejected` and `Completed` are
/// terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub description: String,
    /// Committee the project belongs to, for filtering on the projects page.
    pub committee: Committee,
    /// How many members the project needs. The joined set never grows past this.
    pub required_members: u32,
    /// Target completion date.
    pub timeframe: NaiveDate,
    /// Optional link to the project's repository.
    pub repo_link: Option<String>,
    #[serde(flatten)]
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The lifecycle state of a project.
///
/// Modeled as a tagged variant so illegal combinations (completed but
/// never approved, rejected and completed at once) are unrepresentable.
/// The point value lives inside `Approved`/`Completed`: it only exists
/// once an admin has assigned it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProjectStatus {
    Pending,
    Approved { points: u32 },
    Rejected { reason: Option<String> },
    Completed { points: u32 },
}

impl ProjectStatus {
    /// Approve a pending project, assigning its point value.
    pub fn approve(&self, points: u32) -> Result<Self, Error> {
        match self {
            Self::Pending => Ok(Self::Approved { points }),
            _ => Err(self.transition_error("approve")),
        }
    }

    /// Reject a pending project. Terminal.
    pub fn reject(&self, reason: Option<String>) -> Result<Self, Error> {
        match self {
            Self::Pending => Ok(Self::Rejected { reason }),
            _ => Err(self.transition_error("reject")),
        }
    }

    /// Complete an approved project, making its point value payable. Terminal.
    pub fn complete(&self) -> Result<Self, Error> {
        match self {
            Self::Approved { points } => Ok(Self::Completed { points: *points }),
            _ => Err(self.transition_error("complete")),
        }
    }

    /// Only approved projects can be edited: pending ones are edited by
    /// re-submission, terminal ones not at all.
    pub fn editable(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }

    /// Members can join until the project reaches a terminal state.
    pub fn joinable(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved { .. })
    }

    /// Completed projects back awarded points and cannot be deleted.
    pub fn deletable(&self) -> bool {
        !matches!(self, Self::Completed { .. })
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved { .. } | Self::Completed { .. })
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// The assigned point value, once an admin has set one.
    pub fn points(&self) -> Option<u32> {
        match self {
            Self::Pending | Self::Rejected { .. } => None,
            Self::Approved { points } | Self::Completed { points } => Some(*points),
        }
    }

    pub fn transition_error(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            entity: "project",
            action,
            state: self.as_str(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved { .. } => "approved",
            Self::Rejected { .. } => "rejected",
            Self::Completed { .. } => "completed",
        }
    }

    /// Rebuild the tagged state from its database columns.
    pub fn decode(status: &str, points: Option<u32>, reason: Option<String>) -> Self {
        match status {
            "approved" => Self::Approved {
                points: points.unwrap_or(0),
            },
            "rejected" => Self::Rejected { reason },
            "completed" => Self::Completed {
                points: points.unwrap_or(0),
            },
            _ => Self::Pending,
        }
    }
}

/// Input for submitting a new project. Submissions always start `Pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitProjectInput {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub committee: Committee,
    pub required_members: u32,
    pub timeframe: NaiveDate,
    pub repo_link: Option<String>,
}

impl SubmitProjectInput {
    /// Check submission preconditions. Runs before anything is persisted.
    pub fn validate(&self) -> Result<(), Error> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("title must not be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(Error::validation("description must not be empty"));
        }
        if self.required_members < 1 {
            return Err(Error::validation("a project needs at least one member"));
        }
        Ok(())
    }
}

/// Input for editing an approved project. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub points: Option<u32>,
    pub required_members: Option<u32>,
    pub timeframe: Option<NaiveDate>,
    pub repo_link: Option<String>,
}

/// Input for approving a pending project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveProjectInput {
    /// Point value paid to each joined member on completion.
    pub points: u32,
}

/// Input for rejecting a pending project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectProjectInput {
    /// Why the project was turned down. Optional, but shown to the author.
    pub reason: Option<String>,
}

/// A project together with the members who joined it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectWithMembers {
    #[serde(flatten)]
    pub project: Project,
    pub members: Vec<Uuid>,
}
