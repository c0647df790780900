//! Team storage.
//!
//! [`InMemoryTeamRepository`] keeps teams for the lifetime of the process.
//! Name uniqueness is checked and the team inserted under one write lock.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::models::{CreateTeamRequest, Team, UpdateTeamRequest};
use crate::errors::AppError;

#[derive(Debug, thiserror::Error)]
pub enum TeamError {
    #[error("Team not found: {0}")]
    NotFound(String),

    #[error("Team already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid team request: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

impl From<TeamError> for AppError {
    fn from(error: TeamError) -> Self {
        match error {
            TeamError::NotFound(id) => AppError::not_found("team", id),
            TeamError::AlreadyExists(name) => AppError::already_exists("team", name),
            TeamError::Invalid(errors) => AppError::from(errors),
        }
    }
}

pub type TeamResult<T> = std::result::Result<T, TeamError>;

#[async_trait]
pub trait TeamRepository: Send + Sync {
    async fn create(&self, request: CreateTeamRequest) -> TeamResult<Team>;

    async fn get_by_id(&self, id: &str) -> TeamResult<Option<Team>>;

    async fn get_by_name(&self, name: &str) -> TeamResult<Option<Team>>;

    /// All teams, oldest first
    async fn list_all(&self) -> TeamResult<Vec<Team>>;

    async fn update(&self, id: &str, request: UpdateTeamRequest) -> TeamResult<Team>;

    /// Returns whether a team was removed.
    async fn delete(&self, id: &str) -> TeamResult<bool>;

    async fn exists_by_name(&self, name: &str) -> TeamResult<bool>;
}

#[derive(Debug, Default)]
struct TeamStore {
    teams: HashMap<String, (u64, Team)>,
    next_seq: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryTeamRepository {
    store: RwLock<TeamStore>,
}

impl InMemoryTeamRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TeamRepository for InMemoryTeamRepository {
    async fn create(&self, request: CreateTeamRequest) -> TeamResult<Team> {
        request.check()?;

        let mut store = self.store.write().await;
        if store.teams.values().any(|(_, team)| team.name == request.name) {
            return Err(TeamError::AlreadyExists(request.name));
        }

        let now = Utc::now();
        let team = Team {
            id: Uuid::new_v4().to_string(),
            name: request.name,
            description: request.description,
            members: request.members,
            created_at: now,
            updated_at: now,
        };

        let seq = store.next_seq;
        store.next_seq += 1;
        store.teams.insert(team.id.clone(), (seq, team.clone()));

        info!(team_id = %team.id, team_name = %team.name, "Created team");
        Ok(team)
    }

    async fn get_by_id(&self, id: &str) -> TeamResult<Option<Team>> {
        Ok(self.store.read().await.teams.get(id).map(|(_, team)| team.clone()))
    }

    async fn get_by_name(&self, name: &str) -> TeamResult<Option<Team>> {
        let store = self.store.read().await;
        Ok(store.teams.values().find(|(_, team)| team.name == name).map(|(_, team)| team.clone()))
    }

    async fn list_all(&self) -> TeamResult<Vec<Team>> {
        let store = self.store.read().await;
        let mut entries: Vec<&(u64, Team)> = store.teams.values().collect();
        entries.sort_by(|(a_seq, a), (b_seq, b)| {
            a.created_at.cmp(&b.created_at).then(a_seq.cmp(b_seq))
        });
        Ok(entries.into_iter().map(|(_, team)| team.clone()).collect())
    }

    async fn update(&self, id: &str, request: UpdateTeamRequest) -> TeamResult<Team> {
        request.check()?;

        let mut store = self.store.write().await;
        let (_, team) =
            store.teams.get_mut(id).ok_or_else(|| TeamError::NotFound(id.to_string()))?;

        if let Some(description) = request.description {
            team.description = Some(description);
        }
        if let Some(members) = request.members {
            team.members = members;
        }
        team.updated_at = Utc::now();

        debug!(team_id = %id, "Updated team");
        Ok(team.clone())
    }

    async fn delete(&self, id: &str) -> TeamResult<bool> {
        let removed = self.store.write().await.teams.remove(id).is_some();
        if removed {
            info!(team_id = %id, "Deleted team");
        }
        Ok(removed)
    }

    async fn exists_by_name(&self, name: &str) -> TeamResult<bool> {
        Ok(self.get_by_name(name).await?.is_some())
    }
}
