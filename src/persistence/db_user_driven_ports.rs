use super::Count;
use crate::domain;
use crate::domain::user::TeamUser;
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::Context;
use sqlx::{FromRow, query_as};

pub struct DbDetectUser;

impl domain::user::driven_ports::DetectUser for DbDetectUser {
    async fn user_exists(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let user_with_id_count =
            query_as::<_, Count>("SELECT count(*) AS count FROM users u WHERE u.id = $1")
                .bind(user_id)
                .fetch_one(connection.borrow_connection())
                .await
                .context("Detecting user with ID")?;

        Ok(user_with_id_count.count()? > 0)
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i32,
    username: String,
    email: Option<String>,
    full_name: String,
}

impl From<UserRow> for TeamUser {
    fn from(value: UserRow) -> Self {
        TeamUser {
            id: value.id,
            username: value.username,
            email: value.email,
            full_name: value.full_name,
        }
    }
}

/// Escapes LIKE wildcards in user input and wraps it for a substring match
fn substring_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");

    format!("%{escaped}%")
}

pub struct DbReadUsers;

impl domain::user::driven_ports::UserReader for DbReadUsers {
    async fn user_by_id(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<TeamUser>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let user = query_as::<_, UserRow>(
            "SELECT u.id, u.username, u.email, u.full_name FROM users u WHERE u.id = $1",
        )
        .bind(id)
        .fetch_optional(cxn_handle.borrow_connection())
        .await
        .context("Fetching a user by id")?;

        Ok(user.map(TeamUser::from))
    }

    async fn user_by_identifier(
        &self,
        identifier: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<TeamUser>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let user = query_as::<_, UserRow>(
            "SELECT u.id, u.username, u.email, u.full_name FROM users u \
             WHERE u.username = $1 OR u.email = $1 \
             ORDER BY (u.username = $1) DESC, u.id \
             LIMIT 1",
        )
        .bind(identifier)
        .fetch_optional(cxn_handle.borrow_connection())
        .await
        .context("Fetching a user by username or email")?;

        Ok(user.map(TeamUser::from))
    }

    async fn search_users(
        &self,
        query: &str,
        limit: i64,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<TeamUser>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let users = query_as::<_, UserRow>(
            "SELECT u.id, u.username, u.email, u.full_name FROM users u \
             WHERE u.username ILIKE $1 OR u.email ILIKE $1 OR u.full_name ILIKE $1 \
             ORDER BY u.username \
             LIMIT $2",
        )
        .bind(substring_pattern(query))
        .bind(limit)
        .fetch_all(cxn_handle.borrow_connection())
        .await
        .context("Searching users")?
        .into_iter()
        .map(TeamUser::from)
        .collect();

        Ok(users)
    }
}
