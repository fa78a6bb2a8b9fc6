use crate::domain;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// DTO for a team
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct Team {
    #[schema(example = 3)]
    pub id: i32,
    #[schema(example = "Platform")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<domain::team::Team> for Team {
    fn from(value: domain::team::Team) -> Self {
        Team {
            id: value.id,
            name: value.name,
            created_at: value.created_at,
        }
    }
}

/// DTO for a team listed for one of its members
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct TeamSummary {
    #[schema(example = 3)]
    pub id: i32,
    #[schema(example = "Platform")]
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Whether the requesting user is this team's admin
    pub is_admin: bool,
}

impl From<domain::team::TeamSummary> for TeamSummary {
    fn from(value: domain::team::TeamSummary) -> Self {
        TeamSummary {
            id: value.id,
            name: value.name,
            created_at: value.created_at,
            is_admin: value.is_admin,
        }
    }
}

/// DTO for creating a team. The given user becomes the team's admin.
#[derive(Deserialize, Display, Validate, ToSchema)]
#[display("{name} (admin: user {admin_user_id})")]
#[cfg_attr(test, derive(Serialize))]
pub struct NewTeam {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Platform")]
    pub name: String,
    #[schema(example = 7)]
    pub admin_user_id: i32,
}

impl From<NewTeam> for domain::team::NewTeam {
    fn from(value: NewTeam) -> Self {
        domain::team::NewTeam {
            name: value.name,
            creator_user_id: value.admin_user_id,
        }
    }
}

/// DTO identifying who is performing a request with no other payload
#[derive(Deserialize, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct TeamActor {
    #[schema(example = 7)]
    pub actor_user_id: i32,
}

/// Query parameters identifying the user a listing is for
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RequestingUser {
    /// ID of the user making the request
    pub user_id: i32,
}
