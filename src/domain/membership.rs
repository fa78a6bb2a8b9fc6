use crate::domain;
use crate::domain::team::driven_ports::TeamReader;
use crate::domain::team_task::driven_ports::TeamTaskWriter;
use crate::domain::user::TeamUser;
use crate::domain::user::driven_ports::UserReader;
use crate::domain::{Error, Missing};
use crate::external_connections::{
    ExternalConnectivity, Transactable, TransactableExternalConnectivity, TransactionHandle,
};
use anyhow::Context;
use std::cmp::Reverse;
use tracing::{error, info};

/// A user's role within a single team
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Membership {
    pub team_id: i32,
    pub user_id: i32,
    pub is_admin: bool,
}

/// A team's member along with the details needed to show them in a roster
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct TeamMember {
    pub user_id: i32,
    pub username: String,
    pub email: Option<String>,
    pub full_name: String,
    pub is_admin: bool,
}

impl TeamMember {
    pub fn from_user(user: TeamUser, is_admin: bool) -> Self {
        TeamMember {
            user_id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            is_admin,
        }
    }

    pub fn display_name(&self) -> &str {
        domain::user::display_name(&self.full_name, &self.username)
    }
}

/// Identifies the user to add to a team
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum MemberTarget {
    UserId(i32),
    /// A username or email address, matched exactly
    Identifier(String),
}

pub mod driven_ports {
    use super::*;

    pub trait MembershipReader: Sync {
        async fn membership_of(
            &self,
            team_id: i32,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<Membership>, anyhow::Error>;

        async fn members_of_team(
            &self,
            team_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<TeamMember>, anyhow::Error>;

        async fn admin_count(
            &self,
            team_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i64, anyhow::Error>;
    }

    pub trait MembershipWriter: Sync {
        /// Inserts the membership, returning false if the user was already on the team
        async fn add_membership(
            &self,
            membership: &Membership,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;

        /// Removes a single membership, returning false if there was nothing to remove
        async fn remove_membership(
            &self,
            team_id: i32,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;

        async fn remove_all_memberships(
            &self,
            team_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;

        /// Drops admin rights from every member of the team
        async fn clear_admins(
            &self,
            team_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;

        /// Grants admin rights to one member, returning false if the user isn't on the team
        async fn grant_admin(
            &self,
            team_id: i32,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;

    pub trait MembershipPort {
        /// Adds a user to the team as a regular member. Only the admin may add members.
        async fn add_member(
            &self,
            team_id: i32,
            actor_user_id: i32,
            target: &MemberTarget,
            ext_cxn: &mut impl ExternalConnectivity,
            team_read: &impl TeamReader,
            u_reader: &impl UserReader,
            member_read: &impl driven_ports::MembershipReader,
            member_write: &impl driven_ports::MembershipWriter,
        ) -> Result<TeamMember, Error>;

        /// Removes a non-admin member from the team. The admin cannot remove themselves, they must
        /// hand admin rights to someone else first. Tasks assigned to the removed member are
        /// handed to the admin who removed them.
        async fn remove_member(
            &self,
            team_id: i32,
            actor_user_id: i32,
            target_user_id: i32,
            ext_cxn: &mut impl TransactableExternalConnectivity,
            team_read: &impl TeamReader,
            member_read: &impl driven_ports::MembershipReader,
            member_write: &impl driven_ports::MembershipWriter,
            task_write: &impl TeamTaskWriter,
        ) -> Result<(), Error>;

        /// Moves admin rights from the current admin to another existing member
        async fn transfer_admin(
            &self,
            team_id: i32,
            actor_user_id: i32,
            new_admin_user_id: i32,
            ext_cxn: &mut impl TransactableExternalConnectivity,
            team_read: &impl TeamReader,
            member_read: &impl driven_ports::MembershipReader,
            member_write: &impl driven_ports::MembershipWriter,
        ) -> Result<(), Error>;

        /// Lists the team's members, admin first and then by name. Any member may do this.
        async fn list_members(
            &self,
            team_id: i32,
            requester_user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            team_read: &impl TeamReader,
            member_read: &impl driven_ports::MembershipReader,
        ) -> Result<Vec<TeamMember>, Error>;
    }
}

/// Resolves an add-member target into the user it refers to
async fn resolve_target(
    target: &MemberTarget,
    ext_cxn: &mut impl ExternalConnectivity,
    u_reader: &impl UserReader,
) -> Result<TeamUser, Error> {
    match target {
        MemberTarget::UserId(user_id) => u_reader
            .user_by_id(*user_id, ext_cxn)
            .await
            .context("looking up user to add by ID")?
            .ok_or(Error::DoesNotExist(Missing::User(*user_id))),
        MemberTarget::Identifier(identifier) => u_reader
            .user_by_identifier(identifier.trim(), ext_cxn)
            .await
            .context("looking up user to add by identifier")?
            .ok_or(Error::DoesNotExist(Missing::UserMatching(
                "that username or email",
            ))),
    }
}

/// Confirms the team has exactly one admin, as every team must
async fn verify_single_admin(
    team_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    member_read: &impl driven_ports::MembershipReader,
) -> Result<(), Error> {
    let admin_count = member_read
        .admin_count(team_id, ext_cxn)
        .await
        .context("counting team admins")?;

    if admin_count == 1 {
        Ok(())
    } else {
        error!("Team {team_id} would be left with {admin_count} admins, refusing the change");
        Err(Error::conflict("a team must have exactly one admin"))
    }
}

pub struct MembershipService;

impl driving_ports::MembershipPort for MembershipService {
    async fn add_member(
        &self,
        team_id: i32,
        actor_user_id: i32,
        target: &MemberTarget,
        ext_cxn: &mut impl ExternalConnectivity,
        team_read: &impl TeamReader,
        u_reader: &impl UserReader,
        member_read: &impl driven_ports::MembershipReader,
        member_write: &impl driven_ports::MembershipWriter,
    ) -> Result<TeamMember, Error> {
        if let MemberTarget::Identifier(identifier) = target {
            if identifier.trim().is_empty() {
                return Err(Error::invalid("a username or email is required"));
            }
        }

        domain::team::verify_team_exists(team_id, &mut *ext_cxn, team_read).await?;
        domain::access::require_admin(
            team_id,
            actor_user_id,
            "add members",
            &mut *ext_cxn,
            member_read,
        )
        .await?;

        let user = resolve_target(target, &mut *ext_cxn, u_reader).await?;
        if domain::access::is_member(team_id, user.id, &mut *ext_cxn, member_read).await? {
            return Err(Error::conflict(format!(
                "{} is already a member of this team",
                user.username
            )));
        }

        let membership = Membership {
            team_id,
            user_id: user.id,
            is_admin: false,
        };
        let inserted = member_write
            .add_membership(&membership, &mut *ext_cxn)
            .await
            .context("adding team member")?;
        if !inserted {
            // Lost a race with a concurrent add of the same user
            return Err(Error::conflict(format!(
                "{} is already a member of this team",
                user.username
            )));
        }

        info!("User {actor_user_id} added user {} to team {team_id}", user.id);
        Ok(TeamMember::from_user(user, false))
    }

    async fn remove_member(
        &self,
        team_id: i32,
        actor_user_id: i32,
        target_user_id: i32,
        ext_cxn: &mut impl TransactableExternalConnectivity,
        team_read: &impl TeamReader,
        member_read: &impl driven_ports::MembershipReader,
        member_write: &impl driven_ports::MembershipWriter,
        task_write: &impl TeamTaskWriter,
    ) -> Result<(), Error> {
        if target_user_id == actor_user_id {
            return Err(Error::invalid(
                "the admin cannot remove themselves; transfer admin rights first",
            ));
        }

        domain::team::verify_team_exists(team_id, &mut *ext_cxn, team_read).await?;
        domain::access::require_admin(
            team_id,
            actor_user_id,
            "remove members",
            &mut *ext_cxn,
            member_read,
        )
        .await?;
        if domain::access::membership_of(team_id, target_user_id, &mut *ext_cxn, member_read)
            .await?
            .is_none()
        {
            return Err(Error::DoesNotExist(Missing::Member(target_user_id)));
        }

        let mut txn = ext_cxn
            .start_transaction()
            .await
            .context("starting member removal transaction")?;
        let removed = member_write
            .remove_membership(team_id, target_user_id, &mut txn)
            .await
            .context("removing team member")?;
        if !removed {
            return Err(Error::DoesNotExist(Missing::Member(target_user_id)));
        }
        let reassigned = task_write
            .reassign_tasks(team_id, target_user_id, actor_user_id, &mut txn)
            .await
            .context("reassigning the removed member's tasks")?;
        verify_single_admin(team_id, &mut txn, member_read).await?;
        txn.commit().await.context("committing member removal")?;

        info!(
            "User {actor_user_id} removed user {target_user_id} from team {team_id}, taking over {reassigned} task(s)"
        );
        Ok(())
    }

    async fn transfer_admin(
        &self,
        team_id: i32,
        actor_user_id: i32,
        new_admin_user_id: i32,
        ext_cxn: &mut impl TransactableExternalConnectivity,
        team_read: &impl TeamReader,
        member_read: &impl driven_ports::MembershipReader,
        member_write: &impl driven_ports::MembershipWriter,
    ) -> Result<(), Error> {
        domain::team::verify_team_exists(team_id, &mut *ext_cxn, team_read).await?;
        domain::access::require_admin(
            team_id,
            actor_user_id,
            "transfer admin rights",
            &mut *ext_cxn,
            member_read,
        )
        .await?;
        if !domain::access::is_member(team_id, new_admin_user_id, &mut *ext_cxn, member_read).await? {
            return Err(Error::invalid(format!(
                "user {new_admin_user_id} must be a team member to become its admin"
            )));
        }

        let mut txn = ext_cxn
            .start_transaction()
            .await
            .context("starting admin transfer transaction")?;
        member_write
            .clear_admins(team_id, &mut txn)
            .await
            .context("clearing team admins")?;
        let granted = member_write
            .grant_admin(team_id, new_admin_user_id, &mut txn)
            .await
            .context("granting admin to new member")?;
        if !granted {
            return Err(Error::conflict(format!(
                "user {new_admin_user_id} left the team before becoming its admin"
            )));
        }
        verify_single_admin(team_id, &mut txn, member_read).await?;
        txn.commit().await.context("committing admin transfer")?;

        info!(
            "User {actor_user_id} transferred admin of team {team_id} to user {new_admin_user_id}"
        );
        Ok(())
    }

    async fn list_members(
        &self,
        team_id: i32,
        requester_user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        team_read: &impl TeamReader,
        member_read: &impl driven_ports::MembershipReader,
    ) -> Result<Vec<TeamMember>, Error> {
        domain::team::verify_team_exists(team_id, &mut *ext_cxn, team_read).await?;
        domain::access::require_member(
            team_id,
            requester_user_id,
            "view the member list",
            &mut *ext_cxn,
            member_read,
        )
        .await?;

        let mut members = member_read
            .members_of_team(team_id, &mut *ext_cxn)
            .await
            .context("fetching team members")?;
        members.sort_by(|a, b| {
            Reverse(a.is_admin)
                .cmp(&Reverse(b.is_admin))
                .then_with(|| {
                    a.display_name()
                        .to_lowercase()
                        .cmp(&b.display_name().to_lowercase())
                })
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        Ok(members)
    }
}
