use crate::domain;
use crate::domain::membership::MemberTarget;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// DTO for a member of a team
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct TeamMember {
    #[schema(example = 4)]
    pub id: i32,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "john@example.com")]
    pub email: Option<String>,
    #[schema(example = "John Doe")]
    pub full_name: String,
    /// The full name, or the username when no full name is set
    #[schema(example = "John Doe")]
    pub display_name: String,
    pub is_admin: bool,
}

impl From<domain::membership::TeamMember> for TeamMember {
    fn from(value: domain::membership::TeamMember) -> Self {
        let display_name = value.display_name().to_owned();

        TeamMember {
            id: value.user_id,
            username: value.username,
            email: value.email,
            full_name: value.full_name,
            display_name,
            is_admin: value.is_admin,
        }
    }
}

/// DTO for adding a member to a team. Exactly one of `user_id` and `user_identifier` should be
/// provided, where `user_identifier` is an exact username or email address.
#[derive(Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct NewMember {
    #[schema(example = 7)]
    pub actor_user_id: i32,
    #[schema(example = 12)]
    pub user_id: Option<i32>,
    #[validate(length(max = 255))]
    #[schema(example = "jdoe")]
    pub user_identifier: Option<String>,
}

impl NewMember {
    /// Works out which user the request is adding, if the request names exactly one
    pub fn target(&self) -> Result<MemberTarget, domain::Error> {
        match (self.user_id, &self.user_identifier) {
            (Some(user_id), None) => Ok(MemberTarget::UserId(user_id)),
            (None, Some(identifier)) => Ok(MemberTarget::Identifier(identifier.clone())),
            (None, None) => Err(domain::Error::InvalidInput(
                "either user_id or user_identifier is required".to_owned(),
            )),
            (Some(_), Some(_)) => Err(domain::Error::InvalidInput(
                "only one of user_id and user_identifier may be given".to_owned(),
            )),
        }
    }
}

/// DTO for handing a team's admin rights to another member
#[derive(Deserialize, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct AdminTransfer {
    #[schema(example = 7)]
    pub actor_user_id: i32,
    #[schema(example = 12)]
    pub new_admin_user_id: i32,
}
