use crate::domain;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// DTO for a user that can be added to teams
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct User {
    #[schema(example = 4)]
    pub id: i32,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "john@example.com")]
    pub email: Option<String>,
    #[schema(example = "John Doe")]
    pub full_name: String,
}

impl From<domain::user::TeamUser> for User {
    fn from(value: domain::user::TeamUser) -> Self {
        User {
            id: value.id,
            username: value.username,
            email: value.email,
            full_name: value.full_name,
        }
    }
}

/// Query parameters for searching users
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserSearch {
    /// Text to look for in usernames, emails, and full names. Lists users when omitted.
    #[serde(default)]
    pub query: String,
}
