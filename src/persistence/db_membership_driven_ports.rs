use super::Count;
use crate::domain;
use crate::domain::membership::{Membership, TeamMember};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::Context;
use sqlx::{FromRow, query, query_as};

#[derive(FromRow)]
struct MembershipRow {
    team_id: i32,
    user_id: i32,
    is_admin: bool,
}

impl From<MembershipRow> for Membership {
    fn from(value: MembershipRow) -> Self {
        Membership {
            team_id: value.team_id,
            user_id: value.user_id,
            is_admin: value.is_admin,
        }
    }
}

#[derive(FromRow)]
struct TeamMemberRow {
    user_id: i32,
    username: String,
    email: Option<String>,
    full_name: String,
    is_admin: bool,
}

impl From<TeamMemberRow> for TeamMember {
    fn from(value: TeamMemberRow) -> Self {
        TeamMember {
            user_id: value.user_id,
            username: value.username,
            email: value.email,
            full_name: value.full_name,
            is_admin: value.is_admin,
        }
    }
}

pub struct DbMembershipReader;

impl domain::membership::driven_ports::MembershipReader for DbMembershipReader {
    async fn membership_of(
        &self,
        team_id: i32,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<Membership>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let membership = query_as::<_, MembershipRow>(
            "SELECT tm.team_id, tm.user_id, tm.is_admin FROM team_members tm \
             WHERE tm.team_id = $1 AND tm.user_id = $2",
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(cxn_handle.borrow_connection())
        .await
        .context("Fetching team membership")?;

        Ok(membership.map(Membership::from))
    }

    async fn members_of_team(
        &self,
        team_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<TeamMember>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let members = query_as::<_, TeamMemberRow>(
            "SELECT u.id AS user_id, u.username, u.email, u.full_name, tm.is_admin \
             FROM team_members tm JOIN users u ON u.id = tm.user_id \
             WHERE tm.team_id = $1 \
             ORDER BY tm.is_admin DESC, lower(COALESCE(NULLIF(trim(u.full_name), ''), u.username)), u.id",
        )
        .bind(team_id)
        .fetch_all(cxn_handle.borrow_connection())
        .await
        .context("Fetching team members")?
        .into_iter()
        .map(TeamMember::from)
        .collect();

        Ok(members)
    }

    async fn admin_count(
        &self,
        team_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i64, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let admins = query_as::<_, Count>(
            "SELECT count(*) AS count FROM team_members tm WHERE tm.team_id = $1 AND tm.is_admin",
        )
        .bind(team_id)
        .fetch_one(cxn_handle.borrow_connection())
        .await
        .context("Counting team admins")?;

        admins.count()
    }
}

pub struct DbMembershipWriter;

impl domain::membership::driven_ports::MembershipWriter for DbMembershipWriter {
    async fn add_membership(
        &self,
        membership: &Membership,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let insert_result = query(
            "INSERT INTO team_members(team_id, user_id, is_admin) VALUES ($1, $2, $3) \
             ON CONFLICT (team_id, user_id) DO NOTHING",
        )
        .bind(membership.team_id)
        .bind(membership.user_id)
        .bind(membership.is_admin)
        .execute(cxn_handle.borrow_connection())
        .await
        .context("Inserting team membership")?;

        Ok(insert_result.rows_affected() > 0)
    }

    async fn remove_membership(
        &self,
        team_id: i32,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let delete_result =
            query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
                .bind(team_id)
                .bind(user_id)
                .execute(cxn_handle.borrow_connection())
                .await
                .context("Deleting team membership")?;

        Ok(delete_result.rows_affected() > 0)
    }

    async fn remove_all_memberships(
        &self,
        team_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        query("DELETE FROM team_members WHERE team_id = $1")
            .bind(team_id)
            .execute(cxn_handle.borrow_connection())
            .await
            .context("Deleting all memberships of team")?;

        Ok(())
    }

    async fn clear_admins(
        &self,
        team_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        query("UPDATE team_members SET is_admin = FALSE WHERE team_id = $1 AND is_admin")
            .bind(team_id)
            .execute(cxn_handle.borrow_connection())
            .await
            .context("Clearing team admins")?;

        Ok(())
    }

    async fn grant_admin(
        &self,
        team_id: i32,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let update_result =
            query("UPDATE team_members SET is_admin = TRUE WHERE team_id = $1 AND user_id = $2")
                .bind(team_id)
                .bind(user_id)
                .execute(cxn_handle.borrow_connection())
                .await
                .context("Granting team admin")?;

        Ok(update_result.rows_affected() > 0)
    }
}
