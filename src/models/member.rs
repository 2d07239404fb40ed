use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rank::Rank;

/// A registered club member.
///
/// Points accumulate through completed projects and only move downward
/// through an explicit admin override. Memo tokens are a separate
/// allowance spent on gallery posts and never interact with points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub points: u32,
    pub role: Role,
    pub committee: Committee,
    pub memo_tokens: u32,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A member's role within the club.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    Head,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Head => "head",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Self::Member),
            "head" => Some(Self::Head),
            _ => None,
        }
    }
}

/// The committee a member (or project) belongs to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Committee {
    #[default]
    None,
    Pr,
    Eca,
    Coding,
    Graphics,
    Bod,
}

impl Committee {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pr => "pr",
            Self::Eca => "eca",
            Self::Coding => "coding",
            Self::Graphics => "graphics",
            Self::Bod => "bod",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "pr" => Some(Self::Pr),
            "eca" => Some(Self::Eca),
            "coding" => Some(Self::Coding),
            "graphics" => Some(Self::Graphics),
            "bod" => Some(Self::Bod),
            _ => None,
        }
    }
}

/// Input for registering a new member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMemberInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub committee: Committee,
    #[serde(default)]
    pub is_admin: bool,
}

/// Input for updating a member. All fields are optional for partial updates.
///
/// `points` here is the admin override: the only sanctioned way a point
/// total can decrease. Everything else about points goes through project
/// completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMemberInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub points: Option<u32>,
    pub role: Option<Role>,
    pub committee: Option<Committee>,
    pub memo_tokens: Option<u32>,
    pub is_admin: Option<bool>,
}

/// A member with their derived rank, used for profile and leaderboard
/// responses. The rank is recomputed on every read, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberWithRank {
    #[serde(flatten)]
    pub member: Member,
    pub rank: Rank,
    /// Point total at which the member reaches the next tier, if any.
    pub next_rank_at: Option<u32>,
}

impl From<Member> for MemberWithRank {
    fn from(member: Member) -> Self {
        let rank = Rank::for_points(member.points);
        Self {
            rank,
            next_rank_at: rank.next_threshold(),
            member,
        }
    }
}
