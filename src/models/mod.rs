//! Domain models for the club portal.
//!
//! # Core Concepts
//!
//! - [`Member`]: a registered club member with a point total, role,
//!   committee, and memo-token allowance.
//! - [`Project`]: a member-proposed project moving through an explicit
//!   lifecycle (`Pending → Approved → Completed`, or `Pending → Rejected`).
//!   Completing a project pays its point value out to everyone who joined.
//! - [`Poll`]: a community poll with ordered options and a
//!   one-vote-per-member rule.
//! - [`Rank`]: a tier derived purely from a point total. Never persisted,
//!   always recomputed for display.

mod member;
mod poll;
mod project;
mod rank;

pub use member::*;
pub use poll::*;
pub use project::*;
pub use rank::*;
