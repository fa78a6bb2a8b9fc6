use crate::domain;
use crate::domain::membership::driven_ports::MembershipReader;
use crate::domain::team::driven_ports::TeamReader;
use crate::domain::{Error, Missing};
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing::{info, warn};

/// Where a team task is in its lifecycle. Any state may move to any other state.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum TaskStatus {
    Todo,
    Doing,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "Todo",
            Self::Doing => "Doing",
            Self::Done => "Done",
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Todo" => Ok(Self::Todo),
            "Doing" => Ok(Self::Doing),
            "Done" => Ok(Self::Done),
            other => Err(Error::invalid(format!(
                "\"{other}\" is not a valid status, expected one of Todo, Doing, Done"
            ))),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct TeamTask {
    pub id: i32,
    pub team_id: i32,
    pub title: String,
    pub status: TaskStatus,
    pub assigned_user_id: i32,
    pub created_by: i32,
    pub updated_at: DateTime<Utc>,
}

/// A team task with the names of the people involved in it
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct TeamTaskDetails {
    pub task: TeamTask,
    pub assigned_user_name: String,
    pub created_by_name: String,
}

#[derive(Debug)]
#[cfg_attr(test, derive(Clone))]
pub struct NewTeamTask {
    pub title: String,
    pub assigned_user_id: i32,
    /// Defaults to [TaskStatus::Todo] when not provided
    pub status: Option<String>,
}

pub mod driven_ports {
    use super::*;

    /// A validated task ready to be written to storage
    pub struct TaskInsert<'title> {
        pub team_id: i32,
        pub title: &'title str,
        pub status: TaskStatus,
        pub assigned_user_id: i32,
        pub created_by: i32,
    }

    pub trait TeamTaskReader: Sync {
        async fn tasks_for_team(
            &self,
            team_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<TeamTaskDetails>, anyhow::Error>;

        /// Fetches a task only if it belongs to the given team
        async fn task_in_team(
            &self,
            team_id: i32,
            task_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<TeamTask>, anyhow::Error>;
    }

    pub trait TeamTaskWriter: Sync {
        async fn create_task(
            &self,
            task: &TaskInsert<'_>,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<TeamTask, anyhow::Error>;

        /// Sets a task's status, matching on both task and team ID. Returns false if no task matched.
        async fn update_task_status(
            &self,
            team_id: i32,
            task_id: i32,
            status: TaskStatus,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;

        /// Hands every task in the team assigned to `from_user_id` over to `to_user_id`. Returns how many moved.
        async fn reassign_tasks(
            &self,
            team_id: i32,
            from_user_id: i32,
            to_user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<u64, anyhow::Error>;

        async fn delete_tasks_for_team(
            &self,
            team_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;

    pub trait TeamTaskPort {
        /// Creates a task assigned to a member of the team. Only the team admin may create tasks.
        async fn create_task(
            &self,
            team_id: i32,
            actor_user_id: i32,
            task: &NewTeamTask,
            ext_cxn: &mut impl ExternalConnectivity,
            team_read: &impl TeamReader,
            member_read: &impl MembershipReader,
            task_write: &impl driven_ports::TeamTaskWriter,
        ) -> Result<TeamTask, Error>;

        /// Lists the team's tasks, most recently updated first. Any member may do this.
        async fn list_tasks(
            &self,
            team_id: i32,
            requester_user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            team_read: &impl TeamReader,
            member_read: &impl MembershipReader,
            task_read: &impl driven_ports::TeamTaskReader,
        ) -> Result<Vec<TeamTaskDetails>, Error>;

        /// Moves a task to a new status. Allowed for the team admin and the task's assignee.
        async fn update_task_status(
            &self,
            team_id: i32,
            actor_user_id: i32,
            task_id: i32,
            new_status: &str,
            ext_cxn: &mut impl ExternalConnectivity,
            team_read: &impl TeamReader,
            member_read: &impl MembershipReader,
            task_read: &impl driven_ports::TeamTaskReader,
            task_write: &impl driven_ports::TeamTaskWriter,
        ) -> Result<(), Error>;
    }
}

pub struct TeamTaskService;

impl driving_ports::TeamTaskPort for TeamTaskService {
    async fn create_task(
        &self,
        team_id: i32,
        actor_user_id: i32,
        task: &NewTeamTask,
        ext_cxn: &mut impl ExternalConnectivity,
        team_read: &impl TeamReader,
        member_read: &impl MembershipReader,
        task_write: &impl driven_ports::TeamTaskWriter,
    ) -> Result<TeamTask, Error> {
        let title = task.title.trim();
        if title.is_empty() {
            return Err(Error::invalid("a task title is required"));
        }
        let status = match task.status.as_deref() {
            Some(status) => status.parse::<TaskStatus>()?,
            None => TaskStatus::Todo,
        };

        domain::team::verify_team_exists(team_id, &mut *ext_cxn, team_read).await?;
        domain::access::require_admin(
            team_id,
            actor_user_id,
            "create tasks",
            &mut *ext_cxn,
            member_read,
        )
        .await?;
        if !domain::access::is_member(team_id, task.assigned_user_id, &mut *ext_cxn, member_read)
            .await?
        {
            return Err(Error::invalid(format!(
                "tasks can only be assigned to team members, and user {} is not one",
                task.assigned_user_id
            )));
        }

        let insert = driven_ports::TaskInsert {
            team_id,
            title,
            status,
            assigned_user_id: task.assigned_user_id,
            created_by: actor_user_id,
        };
        let created_task = task_write
            .create_task(&insert, &mut *ext_cxn)
            .await
            .context("inserting team task")?;

        info!(
            "User {actor_user_id} created task {} in team {team_id}",
            created_task.id
        );
        Ok(created_task)
    }

    async fn list_tasks(
        &self,
        team_id: i32,
        requester_user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        team_read: &impl TeamReader,
        member_read: &impl MembershipReader,
        task_read: &impl driven_ports::TeamTaskReader,
    ) -> Result<Vec<TeamTaskDetails>, Error> {
        domain::team::verify_team_exists(team_id, &mut *ext_cxn, team_read).await?;
        domain::access::require_member(
            team_id,
            requester_user_id,
            "view team tasks",
            &mut *ext_cxn,
            member_read,
        )
        .await?;

        let mut tasks = task_read
            .tasks_for_team(team_id, &mut *ext_cxn)
            .await
            .context("fetching team tasks")?;
        tasks.sort_by_key(|details| Reverse((details.task.updated_at, details.task.id)));

        Ok(tasks)
    }

    async fn update_task_status(
        &self,
        team_id: i32,
        actor_user_id: i32,
        task_id: i32,
        new_status: &str,
        ext_cxn: &mut impl ExternalConnectivity,
        team_read: &impl TeamReader,
        member_read: &impl MembershipReader,
        task_read: &impl driven_ports::TeamTaskReader,
        task_write: &impl driven_ports::TeamTaskWriter,
    ) -> Result<(), Error> {
        let status = new_status.parse::<TaskStatus>()?;

        domain::team::verify_team_exists(team_id, &mut *ext_cxn, team_read).await?;
        let task = task_read
            .task_in_team(team_id, task_id, &mut *ext_cxn)
            .await
            .context("looking up team task")?
            .ok_or(Error::DoesNotExist(Missing::Task(task_id)))?;
        if !domain::access::is_assignee_or_admin(actor_user_id, &task, &mut *ext_cxn, member_read)
            .await?
        {
            return Err(Error::not_permitted(
                "only the team admin or the task's assignee can change its status",
            ));
        }

        let updated = task_write
            .update_task_status(team_id, task_id, status, &mut *ext_cxn)
            .await
            .context("updating team task status")?;
        if updated {
            info!("User {actor_user_id} moved task {task_id} in team {team_id} to {status}");
        } else {
            warn!("Task {task_id} in team {team_id} vanished before its status could be updated");
        }

        Ok(())
    }
}
