pub mod membership;
pub mod swagger_main;
pub mod team;
pub mod team_task;
pub mod user;

#[cfg(test)]
pub mod test_util;
