use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{
    BasicErrorResponse, DomainErrorResponse, Json, Query, ValidationErrorResponse,
};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::ErrorResponse;
use axum::routing::{get, put};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(get_tasks, create_task, update_task_status))]
/// Defines the OpenAPI documentation for the team task API
pub struct TeamTasksApi;
/// Constant used to group team task endpoints in OpenAPI documentation
pub const TEAM_TASK_API_GROUP: &str = "Team Tasks";

#[derive(Deserialize)]
struct TaskPath {
    team_id: i32,
    task_id: i32,
}

/// Builds a router for the tasks that live inside a team
pub fn team_task_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/teams/:team_id/tasks",
            get(
                |State(app_state): AppState,
                 Path(team_id): Path<i32>,
                 Query(requester): Query<dto::team::RequestingUser>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::team_task::TeamTaskService;

                    get_tasks(team_id, requester.user_id, &mut ext_cxn, &task_service).await
                },
            )
            .post(
                |State(app_state): AppState,
                 Path(team_id): Path<i32>,
                 Json(new_task): Json<dto::team_task::NewTeamTask>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::team_task::TeamTaskService;

                    create_task(team_id, new_task, &mut ext_cxn, &task_service).await
                },
            ),
        )
        .route(
            "/teams/:team_id/tasks/:task_id/status",
            put(
                |State(app_state): AppState,
                 Path(path): Path<TaskPath>,
                 Json(update): Json<dto::team_task::TaskStatusUpdate>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::team_task::TeamTaskService;

                    update_task_status(path, update, &mut ext_cxn, &task_service).await
                },
            ),
        )
}

#[utoipa::path(
    get,
    path = "/teams/{team_id}/tasks",
    tag = TEAM_TASK_API_GROUP,
    params(
        ("team_id" = i32, Path, description = "ID of the team"),
        dto::team::RequestingUser,
    ),
    responses(
        (status = 200, description = "The team's tasks, most recently updated first", body = Vec<dto::team_task::TeamTaskDetails>),
        (status = 403, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Lists a team's tasks
async fn get_tasks(
    team_id: i32,
    requester_user_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl domain::team_task::driving_ports::TeamTaskPort,
) -> Result<Json<Vec<dto::team_task::TeamTaskDetails>>, ErrorResponse> {
    info!("User {requester_user_id} listing tasks of team {team_id}");
    let team_read = persistence::db_team_driven_ports::DbTeamReader;
    let member_read = persistence::db_membership_driven_ports::DbMembershipReader;
    let task_read = persistence::db_team_task_driven_ports::DbTeamTaskReader;

    let tasks = task_service
        .list_tasks(
            team_id,
            requester_user_id,
            &mut *ext_cxn,
            &team_read,
            &member_read,
            &task_read,
        )
        .await
        .map_err(DomainErrorResponse::from)?;

    Ok(Json(
        tasks
            .into_iter()
            .map(dto::team_task::TeamTaskDetails::from)
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/teams/{team_id}/tasks",
    tag = TEAM_TASK_API_GROUP,
    params(("team_id" = i32, Path, description = "ID of the team")),
    request_body = dto::team_task::NewTeamTask,
    responses(
        (status = 201, description = "Task was created", body = dto::team_task::TeamTask),
        (status = 400, response = BasicErrorResponse),
        (status = 403, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Creates a task in a team and assigns it to one of the team's members
async fn create_task(
    team_id: i32,
    new_task: dto::team_task::NewTeamTask,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl domain::team_task::driving_ports::TeamTaskPort,
) -> Result<(StatusCode, Json<dto::team_task::TeamTask>), ErrorResponse> {
    info!(
        "User {} creating task in team {team_id} for user {}",
        new_task.actor_user_id, new_task.assigned_user_id
    );
    new_task
        .validate()
        .map_err(ValidationErrorResponse::from)?;

    let team_read = persistence::db_team_driven_ports::DbTeamReader;
    let member_read = persistence::db_membership_driven_ports::DbMembershipReader;
    let task_write = persistence::db_team_task_driven_ports::DbTeamTaskWriter;
    let actor_user_id = new_task.actor_user_id;
    let domain_task = domain::team_task::NewTeamTask::from(new_task);

    let created_task = task_service
        .create_task(
            team_id,
            actor_user_id,
            &domain_task,
            &mut *ext_cxn,
            &team_read,
            &member_read,
            &task_write,
        )
        .await
        .map_err(DomainErrorResponse::from)?;

    Ok((StatusCode::CREATED, Json(created_task.into())))
}

#[utoipa::path(
    put,
    path = "/teams/{team_id}/tasks/{task_id}/status",
    tag = TEAM_TASK_API_GROUP,
    params(
        ("team_id" = i32, Path, description = "ID of the team"),
        ("task_id" = i32, Path, description = "ID of the task to update"),
    ),
    request_body = dto::team_task::TaskStatusUpdate,
    responses(
        (status = 204, description = "Task status was updated"),
        (status = 400, response = BasicErrorResponse),
        (status = 403, response = BasicErrorResponse),
        (status = 404, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Moves a task to a new status
async fn update_task_status(
    path: TaskPath,
    update: dto::team_task::TaskStatusUpdate,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl domain::team_task::driving_ports::TeamTaskPort,
) -> Result<StatusCode, ErrorResponse> {
    info!(
        "User {} moving task {} in team {} to {}",
        update.actor_user_id, path.task_id, path.team_id, update.status
    );
    let team_read = persistence::db_team_driven_ports::DbTeamReader;
    let member_read = persistence::db_membership_driven_ports::DbMembershipReader;
    let task_read = persistence::db_team_task_driven_ports::DbTeamTaskReader;
    let task_write = persistence::db_team_task_driven_ports::DbTeamTaskWriter;

    task_service
        .update_task_status(
            path.team_id,
            update.actor_user_id,
            path.task_id,
            &update.status,
            &mut *ext_cxn,
            &team_read,
            &member_read,
            &task_read,
            &task_write,
        )
        .await
        .map_err(DomainErrorResponse::from)?;

    Ok(StatusCode::NO_CONTENT)
}
