//! Authorization predicates for team-scoped operations. Every role check made by the team,
//! membership, and team task services goes through the functions in this module.

use crate::domain::Error;
use crate::domain::membership::Membership;
use crate::domain::membership::driven_ports::MembershipReader;
use crate::domain::team_task::TeamTask;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;

/// Looks up the membership a user holds in a team, if any
pub async fn membership_of(
    team_id: i32,
    user_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    member_read: &impl MembershipReader,
) -> Result<Option<Membership>, anyhow::Error> {
    member_read
        .membership_of(team_id, user_id, ext_cxn)
        .await
        .context("looking up team membership")
}

/// True if the user is the team's admin
pub async fn is_admin(
    team_id: i32,
    user_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    member_read: &impl MembershipReader,
) -> Result<bool, anyhow::Error> {
    let membership = membership_of(team_id, user_id, ext_cxn, member_read).await?;

    Ok(membership.is_some_and(|member| member.is_admin))
}

/// True if the user belongs to the team in any role
pub async fn is_member(
    team_id: i32,
    user_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    member_read: &impl MembershipReader,
) -> Result<bool, anyhow::Error> {
    let membership = membership_of(team_id, user_id, ext_cxn, member_read).await?;

    Ok(membership.is_some())
}

/// True if the user may change the given task: they must still belong to the task's team, and
/// either be assigned to the task or administer the team
pub async fn is_assignee_or_admin(
    user_id: i32,
    task: &TeamTask,
    ext_cxn: &mut impl ExternalConnectivity,
    member_read: &impl MembershipReader,
) -> Result<bool, anyhow::Error> {
    let membership = membership_of(task.team_id, user_id, ext_cxn, member_read).await?;

    Ok(membership.is_some_and(|member| member.is_admin || task.assigned_user_id == user_id))
}

/// Fails with [Error::NotPermitted] unless the user is the team's admin. `action` describes
/// what was attempted and ends up in the error message.
pub async fn require_admin(
    team_id: i32,
    user_id: i32,
    action: &str,
    ext_cxn: &mut impl ExternalConnectivity,
    member_read: &impl MembershipReader,
) -> Result<(), Error> {
    if is_admin(team_id, user_id, ext_cxn, member_read).await? {
        Ok(())
    } else {
        Err(Error::not_permitted(format!(
            "only the team admin can {action}"
        )))
    }
}

/// Fails with [Error::NotPermitted] unless the user is a member of the team
pub async fn require_member(
    team_id: i32,
    user_id: i32,
    action: &str,
    ext_cxn: &mut impl ExternalConnectivity,
    member_read: &impl MembershipReader,
) -> Result<(), Error> {
    if is_member(team_id, user_id, ext_cxn, member_read).await? {
        Ok(())
    } else {
        Err(Error::not_permitted(format!(
            "only team members can {action}"
        )))
    }
}
