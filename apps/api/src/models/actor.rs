use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Platform roles in strict ascending order of authority.
///
/// Authorization checks compare ranks, never role names, so a role added
/// above `Reviewer` later automatically gains approval rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Observer,
    Contributor,
    ReviewerCandidate,
    Reviewer,
    Administrator,
}

impl Role {
    pub fn rank(self) -> u8 {
        match self {
            Role::Observer => 1,
            Role::Contributor => 2,
            Role::ReviewerCandidate => 3,
            Role::Reviewer => 4,
            Role::Administrator => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Observer => "observer",
            Role::Contributor => "contributor",
            Role::ReviewerCandidate => "reviewer_candidate",
            Role::Reviewer => "reviewer",
            Role::Administrator => "administrator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "observer" => Some(Role::Observer),
            "contributor" => Some(Role::Contributor),
            "reviewer_candidate" => Some(Role::ReviewerCandidate),
            "reviewer" => Some(Role::Reviewer),
            "administrator" => Some(Role::Administrator),
            _ => None,
        }
    }
}

/// The identity performing a lifecycle operation.
///
/// Always passed explicitly; the core never reads ambient session state.
/// Over HTTP it arrives in `x-actor-id`, `x-actor-name` and `x-actor-role`
/// headers set by the upstream auth gateway.
#[derive(Debug, Clone, Serialize)]
pub struct Actor {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("Missing or invalid '{name}' header")))
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_str(parts, "x-actor-id")?
            .parse::<i64>()
            .map_err(|_| AppError::Unauthorized("'x-actor-id' must be an integer".to_string()))?;
        let username = header_str(parts, "x-actor-name")?.to_string();
        let role_raw = header_str(parts, "x-actor-role")?;
        let role = Role::parse(role_raw).ok_or_else(|| {
            AppError::Unauthorized(format!("Unknown role '{role_raw}' in 'x-actor-role' header"))
        })?;

        Ok(Actor { id, username, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_order_is_total() {
        assert!(Role::Observer < Role::Contributor);
        assert!(Role::Contributor < Role::ReviewerCandidate);
        assert!(Role::ReviewerCandidate < Role::Reviewer);
        assert!(Role::Reviewer < Role::Administrator);
    }

    #[test]
    fn test_rank_comparison_not_string_equality() {
        // An administrator clears every reviewer gate by rank alone.
        assert!(Role::Administrator >= Role::Reviewer);
        assert!(Role::ReviewerCandidate < Role::Reviewer);
    }

    #[test]
    fn test_parse_round_trip() {
        for role in [
            Role::Observer,
            Role::Contributor,
            Role::ReviewerCandidate,
            Role::Reviewer,
            Role::Administrator,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }
}
