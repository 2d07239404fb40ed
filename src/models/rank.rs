use serde::{Deserialize, Serialize};

/// A member's rank, derived from their accumulated point total.
///
/// Ranks are never stored; they are recomputed wherever a point total is
/// displayed (member pages, leaderboard, badges), so a stale rank cannot
/// survive a points change. Tier boundaries are inclusive on the lower
/// bound: 100 points is `Explorer`, not `Newbie`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Newbie,
    Explorer,
    Builder,
    Developer,
    Hacker,
}

/// Lower bound of each tier, ascending. The first tier starts at zero.
const TIERS: &[(Rank, u32)] = &[
    (Rank::Newbie, 0),
    (Rank::Explorer, 100),
    (Rank::Builder, 350),
    (Rank::Developer, 650),
    (Rank::Hacker, 1000),
];

impl Rank {
    /// Classify a point total into its tier.
    pub fn for_points(points: u32) -> Self {
        TIERS
            .iter()
            .rev()
            .find(|(_, floor)| points >= *floor)
            .map(|(rank, _)| *rank)
            .unwrap_or(Rank::Newbie)
    }

    /// Display name for badges.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Newbie => "Newbie",
            Self::Explorer => "Explorer",
            Self::Builder => "Builder",
            Self::Developer => "Developer",
            Self::Hacker => "Hacker",
        }
    }

    /// Minimum point total for this tier.
    pub fn min_points(&self) -> u32 {
        TIERS
            .iter()
            .find(|(rank, _)| rank == self)
            .map(|(_, floor)| *floor)
            .unwrap_or(0)
    }

    /// Point total at which the next tier begins, or `None` at the top.
    pub fn next_threshold(&self) -> Option<u32> {
        TIERS
            .iter()
            .find(|(_, floor)| *floor > self.min_points())
            .map(|(_, floor)| *floor)
    }
}
