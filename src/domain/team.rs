use crate::domain;
use crate::domain::membership::Membership;
use crate::domain::membership::driven_ports::{MembershipReader, MembershipWriter};
use crate::domain::team_task::driven_ports::TeamTaskWriter;
use crate::domain::user::driven_ports::DetectUser;
use crate::domain::{Error, Missing};
use crate::external_connections::{
    ExternalConnectivity, Transactable, TransactableExternalConnectivity, TransactionHandle,
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use tracing::{error, info};

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Team {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A team as seen by one of its members, including whether that member is the team's admin
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct TeamSummary {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub is_admin: bool,
}

#[derive(Debug)]
#[cfg_attr(test, derive(Clone))]
pub struct NewTeam {
    pub name: String,
    pub creator_user_id: i32,
}

pub mod driven_ports {
    use super::*;

    pub trait TeamReader: Sync {
        async fn team_by_id(
            &self,
            team_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<Team>, anyhow::Error>;

        async fn teams_for_user(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<TeamSummary>, anyhow::Error>;
    }

    pub trait TeamWriter: Sync {
        async fn create_team(
            &self,
            name: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Team, anyhow::Error>;

        async fn delete_team(
            &self,
            team_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;

    pub trait TeamPort {
        /// Creates a team and makes its creator the admin. Both writes happen in one transaction.
        async fn create_team(
            &self,
            new_team: &NewTeam,
            ext_cxn: &mut impl TransactableExternalConnectivity,
            u_detect: &impl DetectUser,
            team_write: &impl driven_ports::TeamWriter,
            member_write: &impl MembershipWriter,
        ) -> Result<Team, Error>;

        /// Deletes a team's tasks, memberships, and then the team itself in one transaction.
        /// Only the team admin may do this.
        async fn delete_team(
            &self,
            team_id: i32,
            actor_user_id: i32,
            ext_cxn: &mut impl TransactableExternalConnectivity,
            team_read: &impl driven_ports::TeamReader,
            member_read: &impl MembershipReader,
            team_write: &impl driven_ports::TeamWriter,
            member_write: &impl MembershipWriter,
            task_write: &impl TeamTaskWriter,
        ) -> Result<(), Error>;

        /// Lists every team the user belongs to, most recently created first
        async fn teams_for_user(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            team_read: &impl driven_ports::TeamReader,
        ) -> Result<Vec<TeamSummary>, Error>;
    }
}

/// Fails with [Error::DoesNotExist] if there's no team with the given ID
pub(super) async fn verify_team_exists(
    team_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    team_read: &impl driven_ports::TeamReader,
) -> Result<Team, Error> {
    team_read
        .team_by_id(team_id, ext_cxn)
        .await
        .context("looking up team")?
        .ok_or(Error::DoesNotExist(Missing::Team(team_id)))
}

pub struct TeamService;

impl driving_ports::TeamPort for TeamService {
    async fn create_team(
        &self,
        new_team: &NewTeam,
        ext_cxn: &mut impl TransactableExternalConnectivity,
        u_detect: &impl DetectUser,
        team_write: &impl driven_ports::TeamWriter,
        member_write: &impl MembershipWriter,
    ) -> Result<Team, Error> {
        let name = new_team.name.trim();
        if name.is_empty() {
            return Err(Error::invalid("a team name is required"));
        }

        domain::user::verify_user_exists(new_team.creator_user_id, &mut *ext_cxn, u_detect).await?;

        let mut txn = ext_cxn
            .start_transaction()
            .await
            .context("starting team creation transaction")?;
        let team = team_write
            .create_team(name, &mut txn)
            .await
            .context("inserting new team")?;
        let admin_membership = Membership {
            team_id: team.id,
            user_id: new_team.creator_user_id,
            is_admin: true,
        };
        let inserted = member_write
            .add_membership(&admin_membership, &mut txn)
            .await
            .context("adding team creator as admin")?;
        if !inserted {
            error!(
                "Admin membership for new team {} was not inserted, rolling back",
                team.id
            );
            return Err(Error::conflict(
                "the team's creator could not be made its admin",
            ));
        }
        txn.commit().await.context("committing new team")?;

        info!(
            "User {} created team {}",
            new_team.creator_user_id, team.id
        );
        Ok(team)
    }

    async fn delete_team(
        &self,
        team_id: i32,
        actor_user_id: i32,
        ext_cxn: &mut impl TransactableExternalConnectivity,
        team_read: &impl driven_ports::TeamReader,
        member_read: &impl MembershipReader,
        team_write: &impl driven_ports::TeamWriter,
        member_write: &impl MembershipWriter,
        task_write: &impl TeamTaskWriter,
    ) -> Result<(), Error> {
        verify_team_exists(team_id, &mut *ext_cxn, team_read).await?;
        domain::access::require_admin(
            team_id,
            actor_user_id,
            "delete the team",
            &mut *ext_cxn,
            member_read,
        )
        .await?;

        let mut txn = ext_cxn
            .start_transaction()
            .await
            .context("starting team deletion transaction")?;
        task_write
            .delete_tasks_for_team(team_id, &mut txn)
            .await
            .context("deleting team tasks")?;
        member_write
            .remove_all_memberships(team_id, &mut txn)
            .await
            .context("deleting team memberships")?;
        team_write
            .delete_team(team_id, &mut txn)
            .await
            .context("deleting team")?;
        txn.commit().await.context("committing team deletion")?;

        info!("User {actor_user_id} deleted team {team_id}");
        Ok(())
    }

    async fn teams_for_user(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        team_read: &impl driven_ports::TeamReader,
    ) -> Result<Vec<TeamSummary>, Error> {
        let mut teams = team_read
            .teams_for_user(user_id, ext_cxn)
            .await
            .context("fetching teams for user")?;
        teams.sort_by_key(|team| Reverse((team.created_at, team.id)));

        Ok(teams)
    }
}
