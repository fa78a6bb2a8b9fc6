use utoipa::OpenApi;

pub mod membership;
pub mod team;
pub mod team_task;
pub mod user;

#[derive(OpenApi)]
#[openapi(components(
    schemas(
        team::Team,
        team::TeamSummary,
        team::NewTeam,
        team::TeamActor,
        membership::TeamMember,
        membership::NewMember,
        membership::AdminTransfer,
        team_task::TeamTask,
        team_task::TeamTaskDetails,
        team_task::NewTeamTask,
        team_task::TaskStatusUpdate,
        user::User,
    ),
    responses(crate::routing_utils::BasicErrorResponse),
))]
/// Captures OpenAPI schemas and canned responses defined in the DTO module
pub struct OpenApiSchemas;
