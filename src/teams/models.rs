//! Team domain models and request types.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::{Validate, ValidationError, ValidationErrors};

lazy_static! {
    static ref TEAM_NAME_REGEX: Regex =
        Regex::new(r"^[a-zA-Z0-9_-]+$").expect("TEAM_NAME_REGEX should be a valid regex pattern");
}

/// A group of developers. Teams exist only in this server, not in the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub members: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateTeamRequest {
    #[validate(
        length(min = 3, max = 255, message = "Team name must be between 3 and 255 characters"),
        custom(function = "validate_team_name")
    )]
    pub name: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    pub members: Vec<String>,
}

impl CreateTeamRequest {
    /// Field rules plus member uniqueness.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = match Validate::validate(self) {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        if let Err(e) = validate_unique_members(&self.members) {
            errors.add("members", e);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Partial update; absent fields are left unchanged and `members` replaces the list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateTeamRequest {
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub members: Option<Vec<String>>,
}

impl UpdateTeamRequest {
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = match Validate::validate(self) {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        if let Some(Err(e)) = self.members.as_deref().map(validate_unique_members) {
            errors.add("members", e);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.members.is_none()
    }
}

fn validate_team_name(name: &str) -> Result<(), ValidationError> {
    if !TEAM_NAME_REGEX.is_match(name) {
        let mut error = ValidationError::new("invalid_team_name");
        error.message =
            Some("Team name may only contain letters, digits, hyphens and underscores".into());
        return Err(error);
    }
    if name.starts_with(['-', '_']) || name.ends_with(['-', '_']) {
        let mut error = ValidationError::new("invalid_team_name_boundary");
        error.message = Some("Team name must not start or end with a hyphen or underscore".into());
        return Err(error);
    }
    Ok(())
}

fn validate_unique_members(members: &[String]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    if members.iter().all(|m| seen.insert(m)) {
        Ok(())
    } else {
        let mut error = ValidationError::new("duplicate_members");
        error.message = Some("Duplicate members not allowed".into());
        Err(error)
    }
}
