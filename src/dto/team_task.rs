use crate::domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// DTO for a task belonging to a team
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct TeamTask {
    #[schema(example = 10)]
    pub id: i32,
    #[schema(example = 3)]
    pub team_id: i32,
    #[schema(example = "Rotate the signing keys")]
    pub title: String,
    #[schema(example = "Todo")]
    pub status: String,
    #[schema(example = 12)]
    pub assigned_user_id: i32,
    #[schema(example = 7)]
    pub created_by: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<domain::team_task::TeamTask> for TeamTask {
    fn from(value: domain::team_task::TeamTask) -> Self {
        TeamTask {
            id: value.id,
            team_id: value.team_id,
            title: value.title,
            status: value.status.to_string(),
            assigned_user_id: value.assigned_user_id,
            created_by: value.created_by,
            updated_at: value.updated_at,
        }
    }
}

/// DTO for a team task listed along with the names of its assignee and creator
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct TeamTaskDetails {
    #[schema(example = 10)]
    pub id: i32,
    #[schema(example = 3)]
    pub team_id: i32,
    #[schema(example = "Rotate the signing keys")]
    pub title: String,
    #[schema(example = "Doing")]
    pub status: String,
    #[schema(example = 12)]
    pub assigned_user_id: i32,
    #[schema(example = "Jane Roe")]
    pub assigned_user_name: String,
    #[schema(example = 7)]
    pub created_by: i32,
    #[schema(example = "John Doe")]
    pub created_by_name: String,
    pub updated_at: DateTime<Utc>,
}

impl From<domain::team_task::TeamTaskDetails> for TeamTaskDetails {
    fn from(value: domain::team_task::TeamTaskDetails) -> Self {
        let task = value.task;

        TeamTaskDetails {
            id: task.id,
            team_id: task.team_id,
            title: task.title,
            status: task.status.to_string(),
            assigned_user_id: task.assigned_user_id,
            assigned_user_name: value.assigned_user_name,
            created_by: task.created_by,
            created_by_name: value.created_by_name,
            updated_at: task.updated_at,
        }
    }
}

/// DTO for creating a team task
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct NewTeamTask {
    #[schema(example = 7)]
    pub actor_user_id: i32,
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Rotate the signing keys")]
    pub title: String,
    #[schema(example = 12)]
    pub assigned_user_id: i32,
    /// One of "Todo", "Doing", or "Done". Defaults to "Todo".
    #[schema(example = "Todo")]
    pub status: Option<String>,
}

impl From<NewTeamTask> for domain::team_task::NewTeamTask {
    fn from(value: NewTeamTask) -> Self {
        domain::team_task::NewTeamTask {
            title: value.title,
            assigned_user_id: value.assigned_user_id,
            status: value.status,
        }
    }
}

/// DTO for moving a team task to a new status
#[derive(Debug, Deserialize, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct TaskStatusUpdate {
    #[schema(example = 12)]
    pub actor_user_id: i32,
    /// One of "Todo", "Doing", or "Done"
    #[schema(example = "Done")]
    pub status: String,
}
