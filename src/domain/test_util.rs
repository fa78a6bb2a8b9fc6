use crate::domain::membership::driven_ports::{MembershipReader, MembershipWriter};
use crate::domain::membership::{Membership, TeamMember};
use crate::domain::team::driven_ports::{TeamReader, TeamWriter};
use crate::domain::team::{Team, TeamSummary};
use crate::domain::team_task::driven_ports::{TaskInsert, TeamTaskReader, TeamTaskWriter};
use crate::domain::team_task::{TaskStatus, TeamTask, TeamTaskDetails};
use crate::domain::user::driven_ports::{DetectUser, UserReader};
use crate::domain::user::test_util::NewUser;
use crate::domain::user::{self, TeamUser};
use crate::external_connections::ExternalConnectivity;
use anyhow::anyhow;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::RwLock;

/// Connectivity represents the "connected" state of a mocked driven port and provides
/// common behavior for returning an error if the port is configured to be in a disconnected state.
pub enum Connectivity {
    Connected,
    Disconnected,
}

impl Connectivity {
    /// Return an error if connectivity is in a "disconnected" state
    pub fn blow_up_if_disconnected(&self) -> Result<(), anyhow::Error> {
        match self {
            Self::Connected => Ok(()),
            Self::Disconnected => Err(anyhow!("could not connect to service!")),
        }
    }
}

/// FakeImplementation helps mock a function and capture the arguments it's called with.
/// Mock services wrap these in a [std::sync::Mutex] so they can be updated through `&self`.
///
/// * [Args] represents the arguments passed to the function that should be captured on a call
/// * [Ret] represents the type of the function's return value
pub struct FakeImplementation<Args, Ret> {
    saved_arguments: Vec<Args>,
    return_value: Option<Ret>,
}

impl<Args, Ret> FakeImplementation<Args, Ret> {
    pub fn new() -> FakeImplementation<Args, Ret> {
        FakeImplementation {
            saved_arguments: Vec::new(),
            return_value: None,
        }
    }

    /// Saves arguments from a single invocation of the FakeImplementation
    pub fn save_arguments(&mut self, arguments: Args) {
        self.saved_arguments.push(arguments)
    }

    /// Returns the list of arguments passed on every call to this FakeImplementation
    pub fn calls(&self) -> &[Args] {
        self.saved_arguments.as_slice()
    }
}

impl<Args, Success, Fail> FakeImplementation<Args, Result<Success, Fail>>
where
    Success: Clone,
    Fail: Clone,
{
    /// Set the result that should be returned when this FakeImplementation is invoked
    pub fn set_returned_result(&mut self, return_value: Result<Success, Fail>) {
        self.return_value = Some(return_value)
    }

    /// Retrieve the result that should be returned when this FakeImplementation is invoked (for [Result]s)
    pub fn return_value_result(&self) -> Result<Success, Fail> {
        match self.return_value {
            Some(Ok(ref ok_result)) => Ok(ok_result.clone()),
            Some(Err(ref err)) => Err(err.clone()),
            None => panic!("Tried to return from a function where the return value wasn't set!"),
        }
    }
}

impl<Args, Success> FakeImplementation<Args, anyhow::Result<Success>>
where
    Success: Clone,
{
    /// Set the result that should be returned when this FakeImplementation is invoked.
    /// [anyhow::Error] does not implement [Clone], so errors are stored by message.
    pub fn set_returned_anyhow(&mut self, return_value: anyhow::Result<Success>) {
        match return_value {
            Ok(ok_result) => self.return_value = Some(Ok(ok_result)),
            Err(err) => self.return_value = Some(Err(anyhow!(format!("{}", err)))),
        }
    }

    /// Retrieve the result that should be returned when this FakeImplementation is invoked (for [anyhow::Result]s)
    pub fn return_value_anyhow(&self) -> anyhow::Result<Success> {
        match self.return_value {
            None => panic!("Tried to return from a function where the value wasn't set!"),
            Some(Ok(ref ok_result)) => Ok(ok_result.clone()),
            Some(Err(ref err)) => Err(anyhow!(format!("{}", err))),
        }
    }
}

/// An in-memory stand-in for every driven port the team services use. Each write advances a
/// logical clock so ordering by timestamp is deterministic.
pub struct InMemoryTeamPersistence {
    pub users: Vec<TeamUser>,
    pub teams: Vec<Team>,
    pub memberships: Vec<Membership>,
    pub tasks: Vec<TeamTask>,
    pub connectivity: Connectivity,
    /// Lets membership writes fail while reads keep working
    pub membership_write_connectivity: Connectivity,
    highest_team_id: i32,
    highest_task_id: i32,
    clock_ticks: i64,
}

impl InMemoryTeamPersistence {
    pub fn new() -> InMemoryTeamPersistence {
        Self::new_with_team_users(Vec::new())
    }

    pub fn new_locked() -> RwLock<InMemoryTeamPersistence> {
        RwLock::new(Self::new())
    }

    /// Seeds users with IDs 1, 2, 3, ... in the order given
    pub fn new_with_users(users: &[NewUser]) -> InMemoryTeamPersistence {
        let users = users
            .iter()
            .enumerate()
            .map(|(index, new_user)| TeamUser {
                id: index as i32 + 1,
                username: new_user.username.to_owned(),
                email: new_user.email.map(str::to_owned),
                full_name: new_user.full_name.to_owned(),
            })
            .collect();

        Self::new_with_team_users(users)
    }

    /// Seeds users 1 through `count`, see [user::test_util::numbered_users]
    pub fn new_with_numbered_users(count: usize) -> InMemoryTeamPersistence {
        Self::new_with_team_users(user::test_util::numbered_users(count))
    }

    fn new_with_team_users(users: Vec<TeamUser>) -> InMemoryTeamPersistence {
        InMemoryTeamPersistence {
            users,
            teams: Vec::new(),
            memberships: Vec::new(),
            tasks: Vec::new(),
            connectivity: Connectivity::Connected,
            membership_write_connectivity: Connectivity::Connected,
            highest_team_id: 0,
            highest_task_id: 0,
            clock_ticks: 0,
        }
    }

    fn tick(&mut self) -> DateTime<Utc> {
        self.clock_ticks += 1;
        DateTime::<Utc>::default() + TimeDelta::seconds(self.clock_ticks)
    }

    fn insert_team(&mut self, name: &str) -> Team {
        self.highest_team_id += 1;
        let team = Team {
            id: self.highest_team_id,
            name: name.to_owned(),
            created_at: self.tick(),
        };
        self.teams.push(team.clone());

        team
    }

    /// Creates a team administered by `admin_user_id` and returns its ID
    pub fn seed_team(&mut self, name: &str, admin_user_id: i32) -> i32 {
        let team = self.insert_team(name);
        self.memberships.push(Membership {
            team_id: team.id,
            user_id: admin_user_id,
            is_admin: true,
        });

        team.id
    }

    pub fn seed_member(&mut self, team_id: i32, user_id: i32) {
        self.memberships.push(Membership {
            team_id,
            user_id,
            is_admin: false,
        });
    }

    /// Adds a task to a team and returns its ID
    pub fn seed_task(
        &mut self,
        team_id: i32,
        title: &str,
        assigned_user_id: i32,
        created_by: i32,
        status: TaskStatus,
    ) -> i32 {
        self.highest_task_id += 1;
        let task = TeamTask {
            id: self.highest_task_id,
            team_id,
            title: title.to_owned(),
            status,
            assigned_user_id,
            created_by,
            updated_at: self.tick(),
        };
        self.tasks.push(task);

        self.highest_task_id
    }

    pub fn admin_count_for(&self, team_id: i32) -> usize {
        self.memberships
            .iter()
            .filter(|member| member.team_id == team_id && member.is_admin)
            .count()
    }

    fn user(&self, user_id: i32) -> Option<&TeamUser> {
        self.users.iter().find(|user| user.id == user_id)
    }

    fn name_of(&self, user_id: i32) -> String {
        self.user(user_id)
            .map(|user| user.display_name().to_owned())
            .unwrap_or_default()
    }

    fn blow_up_on_membership_write(&self) -> Result<(), anyhow::Error> {
        self.connectivity.blow_up_if_disconnected()?;
        self.membership_write_connectivity.blow_up_if_disconnected()
    }
}

impl UserReader for RwLock<InMemoryTeamPersistence> {
    async fn user_by_id(
        &self,
        id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Option<TeamUser>, anyhow::Error> {
        let persistence = self.read().expect("user persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;

        Ok(persistence.user(id).cloned())
    }

    async fn user_by_identifier(
        &self,
        identifier: &str,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Option<TeamUser>, anyhow::Error> {
        let persistence = self.read().expect("user persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;

        let by_username = persistence
            .users
            .iter()
            .filter(|user| user.username == identifier)
            .min_by_key(|user| user.id);
        let by_email = || {
            persistence
                .users
                .iter()
                .filter(|user| user.email.as_deref() == Some(identifier))
                .min_by_key(|user| user.id)
        };

        Ok(by_username.or_else(by_email).cloned())
    }

    async fn search_users(
        &self,
        query: &str,
        limit: i64,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Vec<TeamUser>, anyhow::Error> {
        let persistence = self.read().expect("user persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;

        let query = query.to_lowercase();
        let mut matches: Vec<TeamUser> = persistence
            .users
            .iter()
            .filter(|user| {
                user.username.to_lowercase().contains(&query)
                    || user.full_name.to_lowercase().contains(&query)
                    || user
                        .email
                        .as_ref()
                        .is_some_and(|email| email.to_lowercase().contains(&query))
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.username.cmp(&b.username));
        matches.truncate(usize::try_from(limit).unwrap_or(0));

        Ok(matches)
    }
}

impl DetectUser for RwLock<InMemoryTeamPersistence> {
    async fn user_exists(
        &self,
        user_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let persistence = self.read().expect("user persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;

        Ok(persistence.user(user_id).is_some())
    }
}

impl TeamReader for RwLock<InMemoryTeamPersistence> {
    async fn team_by_id(
        &self,
        team_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Option<Team>, anyhow::Error> {
        let persistence = self.read().expect("team persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;

        Ok(persistence
            .teams
            .iter()
            .find(|team| team.id == team_id)
            .cloned())
    }

    async fn teams_for_user(
        &self,
        user_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Vec<TeamSummary>, anyhow::Error> {
        let persistence = self.read().expect("team persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;

        let summaries = persistence
            .memberships
            .iter()
            .filter(|member| member.user_id == user_id)
            .filter_map(|member| {
                persistence
                    .teams
                    .iter()
                    .find(|team| team.id == member.team_id)
                    .map(|team| TeamSummary {
                        id: team.id,
                        name: team.name.clone(),
                        created_at: team.created_at,
                        is_admin: member.is_admin,
                    })
            })
            .collect();

        Ok(summaries)
    }
}

impl TeamWriter for RwLock<InMemoryTeamPersistence> {
    async fn create_team(
        &self,
        name: &str,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Team, anyhow::Error> {
        let mut persistence = self.write().expect("team persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;

        Ok(persistence.insert_team(name))
    }

    async fn delete_team(
        &self,
        team_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut persistence = self.write().expect("team persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;
        persistence.teams.retain(|team| team.id != team_id);

        Ok(())
    }
}

impl MembershipReader for RwLock<InMemoryTeamPersistence> {
    async fn membership_of(
        &self,
        team_id: i32,
        user_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Option<Membership>, anyhow::Error> {
        let persistence = self.read().expect("membership persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;

        Ok(persistence
            .memberships
            .iter()
            .find(|member| member.team_id == team_id && member.user_id == user_id)
            .cloned())
    }

    async fn members_of_team(
        &self,
        team_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Vec<TeamMember>, anyhow::Error> {
        let persistence = self.read().expect("membership persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;

        let members = persistence
            .memberships
            .iter()
            .filter(|member| member.team_id == team_id)
            .filter_map(|member| {
                persistence
                    .user(member.user_id)
                    .map(|user| TeamMember::from_user(user.clone(), member.is_admin))
            })
            .collect();

        Ok(members)
    }

    async fn admin_count(
        &self,
        team_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<i64, anyhow::Error> {
        let persistence = self.read().expect("membership persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;

        Ok(persistence.admin_count_for(team_id) as i64)
    }
}

impl MembershipWriter for RwLock<InMemoryTeamPersistence> {
    async fn add_membership(
        &self,
        membership: &Membership,
        _: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut persistence = self.write().expect("membership persist rwlock poisoned");
        persistence.blow_up_on_membership_write()?;

        let already_member = persistence.memberships.iter().any(|member| {
            member.team_id == membership.team_id && member.user_id == membership.user_id
        });
        if already_member {
            return Ok(false);
        }
        persistence.memberships.push(membership.clone());

        Ok(true)
    }

    async fn remove_membership(
        &self,
        team_id: i32,
        user_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut persistence = self.write().expect("membership persist rwlock poisoned");
        persistence.blow_up_on_membership_write()?;

        let count_before = persistence.memberships.len();
        persistence
            .memberships
            .retain(|member| !(member.team_id == team_id && member.user_id == user_id));

        Ok(persistence.memberships.len() < count_before)
    }

    async fn remove_all_memberships(
        &self,
        team_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut persistence = self.write().expect("membership persist rwlock poisoned");
        persistence.blow_up_on_membership_write()?;
        persistence
            .memberships
            .retain(|member| member.team_id != team_id);

        Ok(())
    }

    async fn clear_admins(
        &self,
        team_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut persistence = self.write().expect("membership persist rwlock poisoned");
        persistence.blow_up_on_membership_write()?;
        persistence
            .memberships
            .iter_mut()
            .filter(|member| member.team_id == team_id)
            .for_each(|member| member.is_admin = false);

        Ok(())
    }

    async fn grant_admin(
        &self,
        team_id: i32,
        user_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut persistence = self.write().expect("membership persist rwlock poisoned");
        persistence.blow_up_on_membership_write()?;

        match persistence
            .memberships
            .iter_mut()
            .find(|member| member.team_id == team_id && member.user_id == user_id)
        {
            Some(member) => {
                member.is_admin = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl TeamTaskReader for RwLock<InMemoryTeamPersistence> {
    async fn tasks_for_team(
        &self,
        team_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Vec<TeamTaskDetails>, anyhow::Error> {
        let persistence = self.read().expect("task persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;

        let tasks = persistence
            .tasks
            .iter()
            .filter(|task| task.team_id == team_id)
            .map(|task| TeamTaskDetails {
                task: task.clone(),
                assigned_user_name: persistence.name_of(task.assigned_user_id),
                created_by_name: persistence.name_of(task.created_by),
            })
            .collect();

        Ok(tasks)
    }

    async fn task_in_team(
        &self,
        team_id: i32,
        task_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<Option<TeamTask>, anyhow::Error> {
        let persistence = self.read().expect("task persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;

        Ok(persistence
            .tasks
            .iter()
            .find(|task| task.id == task_id && task.team_id == team_id)
            .cloned())
    }
}

impl TeamTaskWriter for RwLock<InMemoryTeamPersistence> {
    async fn create_task(
        &self,
        task: &TaskInsert<'_>,
        _: &mut impl ExternalConnectivity,
    ) -> Result<TeamTask, anyhow::Error> {
        let mut persistence = self.write().expect("task persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;

        let task_id = persistence.seed_task(
            task.team_id,
            task.title,
            task.assigned_user_id,
            task.created_by,
            task.status,
        );
        let created = persistence
            .tasks
            .iter()
            .find(|stored| stored.id == task_id)
            .cloned()
            .ok_or_else(|| anyhow!("task {task_id} vanished after insert"))?;

        Ok(created)
    }

    async fn update_task_status(
        &self,
        team_id: i32,
        task_id: i32,
        status: TaskStatus,
        _: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut persistence = self.write().expect("task persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;

        let updated_at = persistence.tick();
        match persistence
            .tasks
            .iter_mut()
            .find(|task| task.id == task_id && task.team_id == team_id)
        {
            Some(task) => {
                task.status = status;
                task.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reassign_tasks(
        &self,
        team_id: i32,
        from_user_id: i32,
        to_user_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<u64, anyhow::Error> {
        let mut persistence = self.write().expect("task persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;

        let updated_at = persistence.tick();
        let mut moved = 0;
        for task in persistence
            .tasks
            .iter_mut()
            .filter(|task| task.team_id == team_id && task.assigned_user_id == from_user_id)
        {
            task.assigned_user_id = to_user_id;
            task.updated_at = updated_at;
            moved += 1;
        }

        Ok(moved)
    }

    async fn delete_tasks_for_team(
        &self,
        team_id: i32,
        _: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut persistence = self.write().expect("task persist rwlock poisoned");
        persistence.connectivity.blow_up_if_disconnected()?;
        persistence.tasks.retain(|task| task.team_id != team_id);

        Ok(())
    }
}
