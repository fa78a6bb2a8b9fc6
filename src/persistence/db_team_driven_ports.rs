use crate::domain;
use crate::domain::team::{Team, TeamSummary};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, query, query_as};

#[derive(FromRow)]
struct TeamRow {
    id: i32,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<TeamRow> for Team {
    fn from(value: TeamRow) -> Self {
        Team {
            id: value.id,
            name: value.name,
            created_at: value.created_at,
        }
    }
}

#[derive(FromRow)]
struct TeamSummaryRow {
    id: i32,
    name: String,
    created_at: DateTime<Utc>,
    is_admin: bool,
}

impl From<TeamSummaryRow> for TeamSummary {
    fn from(value: TeamSummaryRow) -> Self {
        TeamSummary {
            id: value.id,
            name: value.name,
            created_at: value.created_at,
            is_admin: value.is_admin,
        }
    }
}

pub struct DbTeamReader;

impl domain::team::driven_ports::TeamReader for DbTeamReader {
    async fn team_by_id(
        &self,
        team_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<Team>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let team = query_as::<_, TeamRow>(
            "SELECT t.id, t.name, t.created_at FROM teams t WHERE t.id = $1",
        )
        .bind(team_id)
        .fetch_optional(cxn_handle.borrow_connection())
        .await
        .context("Fetching team by id")?;

        Ok(team.map(Team::from))
    }

    async fn teams_for_user(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<TeamSummary>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let teams = query_as::<_, TeamSummaryRow>(
            "SELECT t.id, t.name, t.created_at, tm.is_admin \
             FROM teams t JOIN team_members tm ON tm.team_id = t.id \
             WHERE tm.user_id = $1 \
             ORDER BY t.created_at DESC, t.id DESC",
        )
        .bind(user_id)
        .fetch_all(cxn_handle.borrow_connection())
        .await
        .context("Fetching teams for user")?
        .into_iter()
        .map(TeamSummary::from)
        .collect();

        Ok(teams)
    }
}

pub struct DbTeamWriter;

impl domain::team::driven_ports::TeamWriter for DbTeamWriter {
    async fn create_team(
        &self,
        name: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Team, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let team = query_as::<_, TeamRow>(
            "INSERT INTO teams(name) VALUES ($1) RETURNING teams.id, teams.name, teams.created_at",
        )
        .bind(name)
        .fetch_one(cxn_handle.borrow_connection())
        .await
        .context("Inserting new team")?;

        Ok(team.into())
    }

    async fn delete_team(
        &self,
        team_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        query("DELETE FROM teams WHERE id = $1")
            .bind(team_id)
            .execute(cxn_handle.borrow_connection())
            .await
            .context("Deleting team")?;

        Ok(())
    }
}
