use crate::domain;
use crate::domain::team_task::driven_ports::TaskInsert;
use crate::domain::team_task::{TaskStatus, TeamTask, TeamTaskDetails};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, query, query_as};

#[derive(FromRow)]
struct TeamTaskRow {
    id: i32,
    team_id: i32,
    title: String,
    status: String,
    assigned_user_id: i32,
    created_by: i32,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TeamTaskRow> for TeamTask {
    type Error = anyhow::Error;

    fn try_from(value: TeamTaskRow) -> Result<Self, Self::Error> {
        let status = value
            .status
            .parse::<TaskStatus>()
            .with_context(|| format!("Task {} has an unreadable status", value.id))?;

        Ok(TeamTask {
            id: value.id,
            team_id: value.team_id,
            title: value.title,
            status,
            assigned_user_id: value.assigned_user_id,
            created_by: value.created_by,
            updated_at: value.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TeamTaskDetailsRow {
    #[sqlx(flatten)]
    task: TeamTaskRow,
    assigned_user_name: String,
    created_by_name: String,
}

impl TryFrom<TeamTaskDetailsRow> for TeamTaskDetails {
    type Error = anyhow::Error;

    fn try_from(value: TeamTaskDetailsRow) -> Result<Self, Self::Error> {
        Ok(TeamTaskDetails {
            task: value.task.try_into()?,
            assigned_user_name: value.assigned_user_name,
            created_by_name: value.created_by_name,
        })
    }
}

const TASK_COLUMNS: &str =
    "tt.id, tt.team_id, tt.title, tt.status, tt.assigned_user_id, tt.created_by, tt.updated_at";

pub struct DbTeamTaskReader;

impl domain::team_task::driven_ports::TeamTaskReader for DbTeamTaskReader {
    async fn tasks_for_team(
        &self,
        team_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<TeamTaskDetails>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let sql = format!(
            "SELECT {TASK_COLUMNS}, \
             COALESCE(NULLIF(trim(assignee.full_name), ''), assignee.username) AS assigned_user_name, \
             COALESCE(NULLIF(trim(creator.full_name), ''), creator.username) AS created_by_name \
             FROM team_tasks tt \
             JOIN users assignee ON assignee.id = tt.assigned_user_id \
             JOIN users creator ON creator.id = tt.created_by \
             WHERE tt.team_id = $1 \
             ORDER BY tt.updated_at DESC, tt.id DESC"
        );
        let rows = query_as::<_, TeamTaskDetailsRow>(&sql)
            .bind(team_id)
            .fetch_all(cxn_handle.borrow_connection())
            .await
            .context("Fetching tasks for team")?;

        rows.into_iter().map(TeamTaskDetails::try_from).collect()
    }

    async fn task_in_team(
        &self,
        team_id: i32,
        task_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<TeamTask>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let sql = format!("SELECT {TASK_COLUMNS} FROM team_tasks tt WHERE tt.id = $1 AND tt.team_id = $2");
        let row = query_as::<_, TeamTaskRow>(&sql)
            .bind(task_id)
            .bind(team_id)
            .fetch_optional(cxn_handle.borrow_connection())
            .await
            .context("Fetching task within team")?;

        row.map(TeamTask::try_from).transpose()
    }
}

pub struct DbTeamTaskWriter;

impl domain::team_task::driven_ports::TeamTaskWriter for DbTeamTaskWriter {
    async fn create_task(
        &self,
        task: &TaskInsert<'_>,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<TeamTask, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let row = query_as::<_, TeamTaskRow>(
            "INSERT INTO team_tasks(team_id, title, status, assigned_user_id, created_by) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, team_id, title, status, assigned_user_id, created_by, updated_at",
        )
        .bind(task.team_id)
        .bind(task.title)
        .bind(task.status.as_str())
        .bind(task.assigned_user_id)
        .bind(task.created_by)
        .fetch_one(cxn_handle.borrow_connection())
        .await
        .context("Inserting new team task")?;

        row.try_into()
    }

    async fn update_task_status(
        &self,
        team_id: i32,
        task_id: i32,
        status: TaskStatus,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let update_result = query(
            "UPDATE team_tasks SET status = $1, updated_at = now() WHERE id = $2 AND team_id = $3",
        )
        .bind(status.as_str())
        .bind(task_id)
        .bind(team_id)
        .execute(cxn_handle.borrow_connection())
        .await
        .context("Updating team task status")?;

        Ok(update_result.rows_affected() > 0)
    }

    async fn reassign_tasks(
        &self,
        team_id: i32,
        from_user_id: i32,
        to_user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<u64, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let update_result = query(
            "UPDATE team_tasks SET assigned_user_id = $1, updated_at = now() WHERE team_id = $2 AND assigned_user_id = $3",
        )
        .bind(to_user_id)
        .bind(team_id)
        .bind(from_user_id)
        .execute(cxn_handle.borrow_connection())
        .await
        .context("Reassigning team tasks")?;

        Ok(update_result.rows_affected())
    }

    async fn delete_tasks_for_team(
        &self,
        team_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        query("DELETE FROM team_tasks WHERE team_id = $1")
            .bind(team_id)
            .execute(cxn_handle.borrow_connection())
            .await
            .context("Deleting tasks for team")?;

        Ok(())
    }
}
