use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{BasicErrorResponse, GenericErrorResponse, Json, Query};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::State;
use axum::response::ErrorResponse;
use axum::routing::get;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(paths(search_users))]
/// Defines the OpenAPI documentation for the user API
pub struct UsersApi;
/// Constant used to group user endpoints in OpenAPI documentation
pub const USER_API_GROUP: &str = "Users";

/// Builds a router for all the user routes
pub fn user_routes() -> Router<Arc<SharedData>> {
    Router::new().route(
        "/users/search",
        get(
            |State(app_state): AppState, Query(search): Query<dto::user::UserSearch>| async move {
                let mut ext_cxn = app_state.ext_cxn.clone();
                let user_service = domain::user::UserService;

                search_users(&search.query, &mut ext_cxn, &user_service).await
            },
        ),
    )
}

#[utoipa::path(
    get,
    path = "/users/search",
    tag = USER_API_GROUP,
    params(dto::user::UserSearch),
    responses(
        (status = 200, description = "Up to 20 users matching the query, ordered by username", body = Vec<dto::user::User>),
        (status = 400, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Finds users by username, email, or full name so they can be added to teams
async fn search_users(
    query: &str,
    ext_cxn: &mut impl ExternalConnectivity,
    user_service: &impl domain::user::driving_ports::UserPort,
) -> Result<Json<Vec<dto::user::User>>, ErrorResponse> {
    info!("Searching users for \"{query}\"");
    let user_reader = persistence::db_user_driven_ports::DbReadUsers;

    let users = user_service
        .search_users(query, &mut *ext_cxn, &user_reader)
        .await
        .map_err(GenericErrorResponse)?;

    Ok(Json(users.into_iter().map(dto::user::User::from).collect()))
}
