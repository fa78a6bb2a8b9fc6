use crate::external_connections::{ExternalConnectivity, TransactableExternalConnectivity};
use crate::routing_utils::{
    BasicErrorResponse, DomainErrorResponse, Json, Query, ValidationErrorResponse,
};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::ErrorResponse;
use axum::routing::{delete, get};
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(get_teams, create_team, delete_team))]
/// Defines the OpenAPI documentation for the teams API
pub struct TeamsApi;
/// Constant used to group team endpoints in OpenAPI documentation
pub const TEAM_API_GROUP: &str = "Teams";

/// Builds a router for creating, listing, and deleting teams
pub fn team_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/teams",
            get(
                |State(app_state): AppState, Query(requester): Query<dto::team::RequestingUser>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let team_service = domain::team::TeamService;

                    get_teams(requester.user_id, &mut ext_cxn, &team_service).await
                },
            )
            .post(
                |State(app_state): AppState, Json(new_team): Json<dto::team::NewTeam>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let team_service = domain::team::TeamService;

                    create_team(new_team, &mut ext_cxn, &team_service).await
                },
            ),
        )
        .route(
            "/teams/:team_id",
            delete(
                |State(app_state): AppState,
                 Path(team_id): Path<i32>,
                 Json(actor): Json<dto::team::TeamActor>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let team_service = domain::team::TeamService;

                    delete_team(team_id, actor, &mut ext_cxn, &team_service).await
                },
            ),
        )
}

#[utoipa::path(
    get,
    path = "/teams",
    tag = TEAM_API_GROUP,
    params(dto::team::RequestingUser),
    responses(
        (status = 200, description = "Teams the user belongs to, newest first", body = Vec<dto::team::TeamSummary>),
        (status = 400, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Lists the teams a user belongs to
async fn get_teams(
    user_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    team_service: &impl domain::team::driving_ports::TeamPort,
) -> Result<Json<Vec<dto::team::TeamSummary>>, ErrorResponse> {
    info!("Requested teams for user {user_id}");
    let team_reader = persistence::db_team_driven_ports::DbTeamReader;

    let teams = team_service
        .teams_for_user(user_id, &mut *ext_cxn, &team_reader)
        .await
        .map_err(DomainErrorResponse::from)?;

    Ok(Json(
        teams
            .into_iter()
            .map(dto::team::TeamSummary::from)
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/teams",
    tag = TEAM_API_GROUP,
    request_body = dto::team::NewTeam,
    responses(
        (status = 201, description = "Team created with the given user as its admin", body = dto::team::Team),
        (status = 400, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Creates a team
async fn create_team(
    new_team: dto::team::NewTeam,
    ext_cxn: &mut impl TransactableExternalConnectivity,
    team_service: &impl domain::team::driving_ports::TeamPort,
) -> Result<(StatusCode, Json<dto::team::Team>), ErrorResponse> {
    info!("Attempt to create team: {new_team}");
    new_team
        .validate()
        .map_err(ValidationErrorResponse::from)?;

    let user_detect = persistence::db_user_driven_ports::DbDetectUser;
    let team_write = persistence::db_team_driven_ports::DbTeamWriter;
    let member_write = persistence::db_membership_driven_ports::DbMembershipWriter;
    let domain_team = domain::team::NewTeam::from(new_team);

    let created_team = team_service
        .create_team(
            &domain_team,
            &mut *ext_cxn,
            &user_detect,
            &team_write,
            &member_write,
        )
        .await
        .map_err(DomainErrorResponse::from)?;

    Ok((StatusCode::CREATED, Json(created_team.into())))
}

#[utoipa::path(
    delete,
    path = "/teams/{team_id}",
    tag = TEAM_API_GROUP,
    params(("team_id" = i32, Path, description = "ID of the team to delete")),
    request_body = dto::team::TeamActor,
    responses(
        (status = 204, description = "Team and everything in it was deleted"),
        (status = 403, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Deletes a team along with its memberships and tasks
async fn delete_team(
    team_id: i32,
    actor: dto::team::TeamActor,
    ext_cxn: &mut impl TransactableExternalConnectivity,
    team_service: &impl domain::team::driving_ports::TeamPort,
) -> Result<StatusCode, ErrorResponse> {
    info!("User {} deleting team {team_id}", actor.actor_user_id);
    let team_read = persistence::db_team_driven_ports::DbTeamReader;
    let team_write = persistence::db_team_driven_ports::DbTeamWriter;
    let member_read = persistence::db_membership_driven_ports::DbMembershipReader;
    let member_write = persistence::db_membership_driven_ports::DbMembershipWriter;
    let task_write = persistence::db_team_task_driven_ports::DbTeamTaskWriter;

    team_service
        .delete_team(
            team_id,
            actor.actor_user_id,
            &mut *ext_cxn,
            &team_read,
            &member_read,
            &team_write,
            &member_write,
            &task_write,
        )
        .await
        .map_err(DomainErrorResponse::from)?;

    Ok(StatusCode::NO_CONTENT)
}
