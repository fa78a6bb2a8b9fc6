use crate::external_connections::{ExternalConnectivity, TransactableExternalConnectivity};
use crate::routing_utils::{
    BasicErrorResponse, DomainErrorResponse, Json, Query, ValidationErrorResponse,
};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::ErrorResponse;
use axum::routing::{delete, get, put};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(list_members, add_member, remove_member, transfer_admin))]
/// Defines the OpenAPI documentation for the team membership API
pub struct MembershipApi;
/// Constant used to group membership endpoints in OpenAPI documentation
pub const MEMBERSHIP_API_GROUP: &str = "Team Members";

#[derive(Deserialize)]
struct MemberPath {
    team_id: i32,
    user_id: i32,
}

/// Builds a router for managing who belongs to a team and who administers it
pub fn membership_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/teams/:team_id/members",
            get(
                |State(app_state): AppState,
                 Path(team_id): Path<i32>,
                 Query(requester): Query<dto::team::RequestingUser>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let membership_service = domain::membership::MembershipService;

                    list_members(team_id, requester.user_id, &mut ext_cxn, &membership_service).await
                },
            )
            .post(
                |State(app_state): AppState,
                 Path(team_id): Path<i32>,
                 Json(new_member): Json<dto::membership::NewMember>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let membership_service = domain::membership::MembershipService;

                    add_member(team_id, new_member, &mut ext_cxn, &membership_service).await
                },
            ),
        )
        .route(
            "/teams/:team_id/members/:user_id",
            delete(
                |State(app_state): AppState,
                 Path(path): Path<MemberPath>,
                 Json(actor): Json<dto::team::TeamActor>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let membership_service = domain::membership::MembershipService;

                    remove_member(path, actor, &mut ext_cxn, &membership_service).await
                },
            ),
        )
        .route(
            "/teams/:team_id/admin",
            put(
                |State(app_state): AppState,
                 Path(team_id): Path<i32>,
                 Json(transfer): Json<dto::membership::AdminTransfer>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let membership_service = domain::membership::MembershipService;

                    transfer_admin(team_id, transfer, &mut ext_cxn, &membership_service).await
                },
            ),
        )
}

#[utoipa::path(
    get,
    path = "/teams/{team_id}/members",
    tag = MEMBERSHIP_API_GROUP,
    params(
        ("team_id" = i32, Path, description = "ID of the team"),
        dto::team::RequestingUser,
    ),
    responses(
        (status = 200, description = "The team's members, admin first", body = Vec<dto::membership::TeamMember>),
        (status = 403, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Lists the members of a team
async fn list_members(
    team_id: i32,
    requester_user_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    membership_service: &impl domain::membership::driving_ports::MembershipPort,
) -> Result<Json<Vec<dto::membership::TeamMember>>, ErrorResponse> {
    info!("User {requester_user_id} listing members of team {team_id}");
    let team_read = persistence::db_team_driven_ports::DbTeamReader;
    let member_read = persistence::db_membership_driven_ports::DbMembershipReader;

    let members = membership_service
        .list_members(
            team_id,
            requester_user_id,
            &mut *ext_cxn,
            &team_read,
            &member_read,
        )
        .await
        .map_err(DomainErrorResponse::from)?;

    Ok(Json(
        members
            .into_iter()
            .map(dto::membership::TeamMember::from)
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/teams/{team_id}/members",
    tag = MEMBERSHIP_API_GROUP,
    params(("team_id" = i32, Path, description = "ID of the team")),
    request_body = dto::membership::NewMember,
    responses(
        (status = 201, description = "User was added as a regular member", body = dto::membership::TeamMember),
        (status = 400, response = BasicErrorResponse),
        (status = 403, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 409, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Adds a user to a team by user ID, username, or email
async fn add_member(
    team_id: i32,
    new_member: dto::membership::NewMember,
    ext_cxn: &mut impl ExternalConnectivity,
    membership_service: &impl domain::membership::driving_ports::MembershipPort,
) -> Result<(StatusCode, Json<dto::membership::TeamMember>), ErrorResponse> {
    info!(
        "User {} adding a member to team {team_id}",
        new_member.actor_user_id
    );
    new_member
        .validate()
        .map_err(ValidationErrorResponse::from)?;
    let target = new_member.target().map_err(DomainErrorResponse::from)?;

    let team_read = persistence::db_team_driven_ports::DbTeamReader;
    let user_read = persistence::db_user_driven_ports::DbReadUsers;
    let member_read = persistence::db_membership_driven_ports::DbMembershipReader;
    let member_write = persistence::db_membership_driven_ports::DbMembershipWriter;

    let added_member = membership_service
        .add_member(
            team_id,
            new_member.actor_user_id,
            &target,
            &mut *ext_cxn,
            &team_read,
            &user_read,
            &member_read,
            &member_write,
        )
        .await
        .map_err(DomainErrorResponse::from)?;

    Ok((StatusCode::CREATED, Json(added_member.into())))
}

#[utoipa::path(
    delete,
    path = "/teams/{team_id}/members/{user_id}",
    tag = MEMBERSHIP_API_GROUP,
    params(
        ("team_id" = i32, Path, description = "ID of the team"),
        ("user_id" = i32, Path, description = "ID of the member to remove"),
    ),
    request_body = dto::team::TeamActor,
    responses(
        (status = 204, description = "Member was removed"),
        (status = 400, response = BasicErrorResponse),
        (status = 403, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 409, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Removes a member from a team
async fn remove_member(
    path: MemberPath,
    actor: dto::team::TeamActor,
    ext_cxn: &mut impl TransactableExternalConnectivity,
    membership_service: &impl domain::membership::driving_ports::MembershipPort,
) -> Result<StatusCode, ErrorResponse> {
    info!(
        "User {} removing user {} from team {}",
        actor.actor_user_id, path.user_id, path.team_id
    );
    let team_read = persistence::db_team_driven_ports::DbTeamReader;
    let member_read = persistence::db_membership_driven_ports::DbMembershipReader;
    let member_write = persistence::db_membership_driven_ports::DbMembershipWriter;
    let task_write = persistence::db_team_task_driven_ports::DbTeamTaskWriter;

    membership_service
        .remove_member(
            path.team_id,
            actor.actor_user_id,
            path.user_id,
            &mut *ext_cxn,
            &team_read,
            &member_read,
            &member_write,
            &task_write,
        )
        .await
        .map_err(DomainErrorResponse::from)?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/teams/{team_id}/admin",
    tag = MEMBERSHIP_API_GROUP,
    params(("team_id" = i32, Path, description = "ID of the team")),
    request_body = dto::membership::AdminTransfer,
    responses(
        (status = 204, description = "Admin rights moved to the new member"),
        (status = 400, response = BasicErrorResponse),
        (status = 403, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 409, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Hands the team's admin rights to another member
async fn transfer_admin(
    team_id: i32,
    transfer: dto::membership::AdminTransfer,
    ext_cxn: &mut impl TransactableExternalConnectivity,
    membership_service: &impl domain::membership::driving_ports::MembershipPort,
) -> Result<StatusCode, ErrorResponse> {
    info!(
        "User {} transferring admin of team {team_id} to user {}",
        transfer.actor_user_id, transfer.new_admin_user_id
    );
    let team_read = persistence::db_team_driven_ports::DbTeamReader;
    let member_read = persistence::db_membership_driven_ports::DbMembershipReader;
    let member_write = persistence::db_membership_driven_ports::DbMembershipWriter;

    membership_service
        .transfer_admin(
            team_id,
            transfer.actor_user_id,
            transfer.new_admin_user_id,
            &mut *ext_cxn,
            &team_read,
            &member_read,
            &member_write,
        )
        .await
        .map_err(DomainErrorResponse::from)?;

    Ok(StatusCode::NO_CONTENT)
}
