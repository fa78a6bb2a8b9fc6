use crate::domain::{Error, Missing};
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use tracing::error;

/// The most users a single search will return
pub const USER_SEARCH_LIMIT: i64 = 20;

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct TeamUser {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub full_name: String,
}

impl TeamUser {
    /// The name to show for this user: their full name, or their username if no full name was given
    pub fn display_name(&self) -> &str {
        display_name(&self.full_name, &self.username)
    }
}

/// Picks the full name when one is present and falls back to the username otherwise
pub fn display_name<'name>(full_name: &'name str, username: &'name str) -> &'name str {
    if full_name.trim().is_empty() {
        username
    } else {
        full_name
    }
}

pub mod driven_ports {
    use super::*;

    pub trait UserReader: Sync {
        async fn user_by_id(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<TeamUser>, anyhow::Error>;

        /// Finds a user whose username or email is exactly `identifier`. Username matches win over
        /// email matches, and the lowest user ID wins among equals.
        async fn user_by_identifier(
            &self,
            identifier: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<TeamUser>, anyhow::Error>;

        /// Case-insensitive substring search over username, email and full name, ordered by username
        async fn search_users(
            &self,
            query: &str,
            limit: i64,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<TeamUser>, anyhow::Error>;
    }

    pub trait DetectUser: Sync {
        async fn user_exists(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;

    pub trait UserPort {
        async fn search_users(
            &self,
            query: &str,
            ext_cxn: &mut impl ExternalConnectivity,
            u_reader: &impl driven_ports::UserReader,
        ) -> Result<Vec<TeamUser>, anyhow::Error>;
    }
}

pub struct UserService;

/// Fails with [Error::DoesNotExist] if there's no user with the given ID
pub(super) async fn verify_user_exists(
    id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    u_detect: &impl driven_ports::DetectUser,
) -> Result<(), Error> {
    let does_user_exist = u_detect
        .user_exists(id, ext_cxn)
        .await
        .context("checking whether a user exists")?;

    if does_user_exist {
        Ok(())
    } else {
        Err(Error::DoesNotExist(Missing::User(id)))
    }
}

impl driving_ports::UserPort for UserService {
    async fn search_users(
        &self,
        query: &str,
        ext_cxn: &mut impl ExternalConnectivity,
        u_reader: &impl driven_ports::UserReader,
    ) -> Result<Vec<TeamUser>, anyhow::Error> {
        let search_result = u_reader
            .search_users(query.trim(), USER_SEARCH_LIMIT, ext_cxn)
            .await;
        if let Err(ref port_err) = search_result {
            error!("User search failure: {port_err}");
        }

        search_result.context("Searching for users")
    }
}
