//! # Teams
//!
//! In-memory team management exposed through the team tools.

pub mod models;
pub mod repository;

pub use models::{CreateTeamRequest, Team, UpdateTeamRequest};
pub use repository::{InMemoryTeamRepository, TeamError, TeamRepository, TeamResult};
